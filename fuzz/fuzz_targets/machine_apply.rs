#![no_main]
use libfuzzer_sys::fuzz_target;
use modkit::{Event, Machine, Outcome};
use serde_json::{json, Value};

fuzz_target!(|data: &[u8]| {
    // Fuzz machine dispatch with arbitrary event kinds and payloads

    if data.len() < 2 {
        return;
    }
    let split = 1 + (data[0] as usize % (data.len() - 1));
    let kind = String::from_utf8_lossy(&data[1..split]).into_owned();
    let payload_bytes = &data[split..];
    let payload = serde_json::from_slice::<Value>(payload_bytes)
        .unwrap_or_else(|_| json!(String::from_utf8_lossy(payload_bytes).into_owned()));

    let machine = Machine::builder("fuzz")
        .on_event("ADD", |payload, _| {
            let add = payload.get("value").and_then(Value::as_i64).unwrap_or(0);
            Outcome::transform(move |slice| {
                let total = slice.pointer("/total").and_then(Value::as_i64).unwrap_or(0);
                json!({ "total": total.wrapping_add(add) })
            })
        })
        .on_event("SET", |payload, _| Outcome::replace(payload.clone()))
        .on_event("NOP", |_, _| Outcome::noop())
        .at("fuzz")
        .build();

    let state = json!({ "fuzz": { "total": 0 }, "other": true });
    let next = machine.apply(state.clone(), &Event::app(kind.clone(), payload));

    // Dispatch is by exact kind: anything else must be a no-op.
    if kind != "ADD" && kind != "SET" && kind != "NOP" {
        assert_eq!(next, state);
    }
    // A scoped machine never touches foreign slices.
    assert_eq!(next["other"], json!(true));
});
