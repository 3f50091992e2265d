mod common;

use trestle_engine::{Origin, PropKey};
use trestle_host::{HostError, HostValue};

use common::new_bridge;

#[test]
fn evaluation_result_crosses_as_host_values() {
    let mut bridge = new_bridge();
    let out = bridge
        .eval(r#"{"name": "trestle", "nums": [1, 2.5], "on": true, "gap": null}"#, &Origin::default())
        .unwrap();

    let HostValue::Map(map) = out else {
        panic!("expected a mapping, got {out:?}");
    };
    assert_eq!(map.try_get("name").unwrap(), HostValue::str("trestle"));
    assert_eq!(map.try_get("on").unwrap(), HostValue::Bool(true));
    assert_eq!(map.try_get("gap").unwrap(), HostValue::Null);

    let HostValue::List(nums) = map.try_get("nums").unwrap() else {
        panic!("expected a list");
    };
    assert_eq!(nums.snapshot(), vec![HostValue::Int(1), HostValue::Float(2.5)]);
}

#[test]
fn evaluation_failures_translate_with_position_metadata() {
    let mut bridge = new_bridge();
    let err = bridge.eval("not json", &Origin::new("input.js", 12)).unwrap_err();
    let HostError::Engine(message) = &err else {
        panic!("expected a translated engine error, got {err}");
    };
    assert!(message.contains("input.js:12"), "{message}");
}

#[test]
fn missing_keys_surface_as_key_errors() {
    let mut bridge = new_bridge();
    let HostValue::Map(map) = bridge.eval(r#"{"a": 1}"#, &Origin::default()).unwrap() else {
        panic!("expected a mapping");
    };
    let err = map.try_get("b").unwrap_err();
    assert!(matches!(err, HostError::Key(_)), "{err}");
}

#[test]
fn timer_globals_are_installed_at_startup() {
    let bridge = new_bridge();
    let globals = bridge.globals();
    let heap = bridge.rt().heap.borrow();
    assert!(heap.has_prop(&globals, &PropKey::str("setTimeout")).unwrap());
    assert!(heap.has_prop(&globals, &PropKey::str("clearTimeout")).unwrap());
}

#[test]
fn results_survive_collection_passes() {
    let mut bridge = new_bridge();
    let out = bridge.eval(r#"{"k": [10, 20]}"#, &Origin::default()).unwrap();
    bridge.collect();
    bridge.collect();

    // Materialized host values are independent of the engine heap.
    let HostValue::Map(map) = out else { panic!("expected a mapping") };
    let HostValue::List(list) = map.try_get("k").unwrap() else {
        panic!("expected a list");
    };
    assert_eq!(list.len(), 2);
}

#[test]
fn host_state_is_scriptable_through_the_globals() {
    let mut bridge = new_bridge();
    let shared = trestle_host::MapRef::empty();
    shared.insert("count", HostValue::Int(1));

    {
        let proxy = bridge.to_engine_value(&HostValue::Map(shared.clone())).unwrap();
        let globals = bridge.globals();
        let mut heap = bridge.rt().heap.borrow_mut();
        heap.set_prop(&globals, &PropKey::str("shared"), proxy).unwrap();
    }

    // Engine-side mutation of the global lands in the host container.
    {
        let globals = bridge.globals();
        let mut heap = bridge.rt().heap.borrow_mut();
        let proxy = heap.get_prop(&globals, &PropKey::str("shared")).unwrap();
        heap.set_prop(&proxy, &PropKey::str("count"), trestle_engine::EngineValue::Num(2.0))
            .unwrap();
    }
    assert_eq!(shared.get("count"), Some(HostValue::Float(2.0)));

    bridge.collect();
    assert_eq!(shared.get("count"), Some(HostValue::Float(2.0)));
}

#[test]
fn dropping_the_context_frees_the_engine_heap() {
    let bridge = new_bridge();
    // The timer globals are closures on the heap holding runtime-state
    // clones; teardown must still let the heap cell itself die.
    let weak_heap = std::rc::Rc::downgrade(&bridge.rt().heap);
    drop(bridge);
    assert!(weak_heap.upgrade().is_none());
}

#[test]
fn context_teardown_releases_liveness_roots() {
    let bridge = new_bridge();
    let rt = bridge.rt().clone();
    let engine_fn = {
        let mut heap = rt.heap.borrow_mut();
        heap.new_function("f", |_, _| Ok(trestle_engine::EngineValue::Undefined))
    };
    let wrapper = bridge.to_host_value(&engine_fn).unwrap();
    assert_eq!(rt.liveness.borrow().len(), 1);

    drop(bridge);
    assert_eq!(rt.liveness.borrow().len(), 0);
    assert_eq!(rt.heap.borrow().root_count(), 0);
    drop(wrapper);
}
