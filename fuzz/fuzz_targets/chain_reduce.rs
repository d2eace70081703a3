#![no_main]
use libfuzzer_sys::fuzz_target;
use modkit::{compose, Event, Module, Reducer};
use serde_json::{json, Value};

fuzz_target!(|data: &[u8]| {
    // Fuzz chain reduction over arbitrary state trees

    let Ok(state) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    let silent = Module::builder("silent")
        .reducer_fn(|slice: Value, _: &Event| slice)
        .build();
    let writer = Module::builder("writer")
        .reducer_fn(|_: Value, _: &Event| json!(1))
        .build();
    let chain = compose(&[silent, writer]);
    let next = chain.reduce(state.clone(), &Event::app("ANY", Value::Null));

    // The chain always yields an object tree with the writer's slice set.
    assert!(next.is_object());
    assert_eq!(next["writer"], json!(1));
    // Slices of an object tree that no module owns pass through untouched.
    if let Value::Object(original) = &state {
        for (k, v) in original {
            if k != "writer" {
                assert_eq!(next.get(k), Some(v));
            }
        }
    }
});
