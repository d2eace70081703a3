//! Tests for machine-built reducers

use modkit::{Event, EventType, Machine, Module, Outcome};
use serde_json::{json, Value};

mod common;
use common::counter_machine;

#[test]
fn test_transform_outcome_adds_to_slice() {
    let machine = counter_machine("counter");
    let next = machine.apply(
        json!({ "total": 1 }),
        &Event::app("ADD", json!({ "value": 4 })),
    );
    assert_eq!(next, json!({ "total": 5 }));
}

#[test]
fn test_replace_outcome_overwrites_slice() {
    let machine = counter_machine("counter");
    let next = machine.apply(json!({ "total": 41 }), &Event::app("RESET", Value::Null));
    assert_eq!(next, json!({ "total": 0 }));
}

#[test]
fn test_noop_outcome_keeps_slice() {
    let machine = counter_machine("counter");
    let state = json!({ "total": 41 });
    let next = machine.apply(state.clone(), &Event::app("NOOP", json!("ignored")));
    assert_eq!(next, state);
}

#[test]
fn test_unknown_event_kind_is_ignored() {
    let machine = counter_machine("counter");
    let state = json!({ "total": 3 });
    let next = machine.apply(state.clone(), &Event::app("NEVER_REGISTERED", json!(true)));
    assert_eq!(next, state);
}

#[test]
fn test_handler_sees_payload_and_event() {
    let machine = Machine::builder("audit")
        .on_event("TAG", |payload, event| {
            assert_eq!(event.name(), "TAG");
            let tag = payload.clone();
            Outcome::transform(move |_| json!({ "tag": tag }))
        })
        .build();
    let next = machine.apply(Value::Null, &Event::app("TAG", json!("release")));
    assert_eq!(next, json!({ "tag": "release" }));
}

#[test]
fn test_activation_payload_is_module_key() {
    let machine = Machine::builder("session")
        .on_activation(|payload, _| {
            assert_eq!(payload, &json!("session"));
            Outcome::replace(json!({ "ready": true }))
        })
        .build();
    let session = Module::builder("session").build();
    let next = machine.apply(Value::Null, &Event::activation_complete(session));
    assert_eq!(next, json!({ "ready": true }));
}

#[test]
fn test_foreign_activation_is_ignored() {
    let machine = Machine::builder("session")
        .on_activation(|_, _| Outcome::replace(json!({ "ready": true })))
        .build();
    let other = Module::builder("other").build();
    let next = machine.apply(Value::Null, &Event::activation_complete(other));
    assert_eq!(next, Value::Null);
}

#[test]
fn test_on_accepts_explicit_event_types() {
    let machine = Machine::builder("mixed")
        .on(EventType::ActivationComplete, |_, _| {
            Outcome::replace(json!({ "phase": "up" }))
        })
        .on(EventType::app("DOWN"), |_, _| {
            Outcome::replace(json!({ "phase": "down" }))
        })
        .build();
    let owner = Module::builder("mixed").build();
    let next = machine.apply(Value::Null, &Event::activation_complete(owner));
    assert_eq!(next, json!({ "phase": "up" }));
    let next = machine.apply(next, &Event::app("DOWN", Value::Null));
    assert_eq!(next, json!({ "phase": "down" }));
}

#[test]
fn test_scoped_machine_leaves_rest_of_tree_alone() {
    let machine = Machine::builder("counter")
        .on_event("ADD", |payload, _| {
            let add = payload.get("value").and_then(Value::as_i64).unwrap_or(0);
            Outcome::transform(move |slice| {
                let total = slice.pointer("/total").and_then(Value::as_i64).unwrap_or(0);
                json!({ "total": total + add })
            })
        })
        .at("counter")
        .build();
    let state = json!({ "counter": { "total": 1 }, "session": { "ready": true } });
    let next = machine.apply(state, &Event::app("ADD", json!({ "value": 4 })));
    assert_eq!(
        next,
        json!({ "counter": { "total": 5 }, "session": { "ready": true } })
    );
}

#[test]
fn test_scoped_machine_gets_null_for_missing_slice() {
    let machine = Machine::builder("counter")
        .on_event("INIT", |_, _| {
            Outcome::transform(|slice| {
                assert_eq!(slice, Value::Null);
                json!({ "total": 0 })
            })
        })
        .at("counter")
        .build();
    let next = machine.apply(json!({}), &Event::app("INIT", Value::Null));
    assert_eq!(next, json!({ "counter": { "total": 0 } }));
}

#[test]
fn test_scoped_noop_does_not_materialize_slice() {
    let machine = Machine::builder("counter")
        .on_event("PING", |_, _| Outcome::noop())
        .at("counter")
        .build();
    let next = machine.apply(json!({ "other": 1 }), &Event::app("PING", Value::Null));
    assert_eq!(next, json!({ "other": 1 }));
}
