mod common;

use num_bigint::BigInt;
use proptest::prelude::*;
use trestle_engine::{EngineKind, EngineValue, PropKey};
use trestle_host::{HostValue, ListRef, MapRef};

use common::new_bridge;

#[test]
fn scalars_survive_the_round_trip() {
    let bridge = new_bridge();
    for value in [
        HostValue::Null,
        HostValue::Bool(true),
        HostValue::Int(42),
        HostValue::Float(2.75),
        HostValue::str("hello"),
        HostValue::Date(1_693_000_000_000),
    ] {
        let engine = bridge.to_engine_value(&value).unwrap();
        let back = bridge.to_host_value(&engine).unwrap();
        assert_eq!(back, value, "round trip of {value:?}");
    }
}

#[test]
fn edge_scalars_survive_the_round_trip() {
    let bridge = new_bridge();
    for value in [
        HostValue::Int(0),
        HostValue::Int(-1),
        HostValue::Int(trestle_engine::MAX_SAFE_INTEGER),
        HostValue::Int(-trestle_engine::MAX_SAFE_INTEGER),
        HostValue::Int(trestle_engine::MAX_SAFE_INTEGER + 1),
        HostValue::str(""),
        HostValue::str("żółw 🐢"),
        HostValue::Date(0),
        HostValue::Date(253_402_300_799_000),
    ] {
        let engine = bridge.to_engine_value(&value).unwrap();
        let back = bridge.to_host_value(&engine).unwrap();
        assert_eq!(back, value, "round trip of {value:?}");
    }
}

#[test]
fn one_past_max_safe_promotes_to_bigint() {
    let bridge = new_bridge();
    let engine = bridge
        .to_engine_value(&HostValue::Int(trestle_engine::MAX_SAFE_INTEGER + 1))
        .unwrap();
    assert!(matches!(engine, EngineValue::Big(_)));
    let engine = bridge
        .to_engine_value(&HostValue::Int(trestle_engine::MAX_SAFE_INTEGER))
        .unwrap();
    assert!(matches!(engine, EngineValue::Num(_)));
}

#[test]
fn small_ints_cross_as_numbers() {
    let bridge = new_bridge();
    let engine = bridge.to_engine_value(&HostValue::Int(7)).unwrap();
    assert!(matches!(engine, EngineValue::Num(n) if n == 7.0));
}

#[test]
fn large_ints_cross_as_bigints_without_precision_loss() {
    let bridge = new_bridge();
    let engine = bridge.to_engine_value(&HostValue::Int(i64::MAX)).unwrap();
    assert!(matches!(&engine, EngineValue::Big(b) if **b == BigInt::from(i64::MAX)));
    let back = bridge.to_host_value(&engine).unwrap();
    assert_eq!(back, HostValue::Int(i64::MAX));
}

#[test]
fn oversized_bigints_stay_bigints_both_ways() {
    let bridge = new_bridge();
    let huge = BigInt::from(i64::MAX) * BigInt::from(1000);
    let engine = bridge.to_engine_value(&HostValue::big(huge.clone())).unwrap();
    let back = bridge.to_host_value(&engine).unwrap();
    assert_eq!(back, HostValue::big(huge));
}

#[test]
fn undefined_and_null_both_come_back_as_null() {
    let bridge = new_bridge();
    assert_eq!(bridge.to_host_value(&EngineValue::Undefined).unwrap(), HostValue::Null);
    assert_eq!(bridge.to_host_value(&EngineValue::Null).unwrap(), HostValue::Null);
}

#[test]
fn host_containers_cross_as_proxies_and_alias_back() {
    let bridge = new_bridge();
    let list = ListRef::new(vec![HostValue::Int(1), HostValue::Int(2)]);
    let engine = bridge.to_engine_value(&HostValue::List(list.clone())).unwrap();
    {
        let heap = bridge.rt().heap.borrow();
        assert_eq!(engine.kind(&heap), EngineKind::Proxy);
    }

    // Crossing back yields the original container, not a copy.
    let back = bridge.to_host_value(&engine).unwrap();
    let HostValue::List(back_list) = back else {
        panic!("expected a list back");
    };
    assert_eq!(back_list.id(), list.id());
    back_list.push(HostValue::Int(3));
    assert_eq!(list.len(), 3);
}

#[test]
fn host_mappings_alias_back_too() {
    let bridge = new_bridge();
    let map = MapRef::empty();
    map.insert("k", HostValue::Int(1));
    let engine = bridge.to_engine_value(&HostValue::Map(map.clone())).unwrap();
    let HostValue::Map(back) = bridge.to_host_value(&engine).unwrap() else {
        panic!("expected a mapping back");
    };
    assert_eq!(back.id(), map.id());
}

#[test]
fn engine_arrays_materialize_eagerly_as_host_lists() {
    let bridge = new_bridge();
    let engine = {
        let mut heap = bridge.rt().heap.borrow_mut();
        heap.new_array(vec![EngineValue::Num(1.0), EngineValue::str("two")])
    };
    let HostValue::List(list) = bridge.to_host_value(&engine).unwrap() else {
        panic!("expected a list");
    };
    assert_eq!(
        list.snapshot(),
        vec![HostValue::Float(1.0), HostValue::str("two")]
    );

    // Materialized, not a view: later engine-side mutation is not seen.
    {
        let mut heap = bridge.rt().heap.borrow_mut();
        heap.set_prop(&engine, &PropKey::Index(0), EngineValue::Num(9.0)).unwrap();
    }
    assert_eq!(list.get(0).unwrap(), HostValue::Float(1.0));
}

#[test]
fn host_functions_are_callable_from_the_engine() {
    let bridge = new_bridge();
    let double = HostValue::Func(trestle_host::FuncRef::new("double", |args| {
        match args.first() {
            Some(HostValue::Float(n)) => Ok(HostValue::Float(n * 2.0)),
            other => Err(trestle_host::HostError::Type(format!("{other:?}"))),
        }
    }));
    let engine_fn = bridge.to_engine_value(&double).unwrap();
    let mut heap = bridge.rt().heap.borrow_mut();
    assert!(engine_fn.is_function(&heap));
    let out = heap.call(&engine_fn, &[EngineValue::Num(21.0)]).unwrap();
    assert!(matches!(out, EngineValue::Num(n) if n == 42.0));
}

#[test]
fn engine_functions_are_callable_from_the_host() {
    let bridge = new_bridge();
    let engine_fn = {
        let mut heap = bridge.rt().heap.borrow_mut();
        heap.new_function("greet", |_, args| {
            let name = match args.first() {
                Some(EngineValue::Str(s)) => s.to_string(),
                _ => "world".to_string(),
            };
            Ok(EngineValue::str(&format!("hi {name}")))
        })
    };
    let HostValue::Func(wrapper) = bridge.to_host_value(&engine_fn).unwrap() else {
        panic!("expected a callable");
    };
    assert_eq!(wrapper.name(), "greet");
    let out = wrapper.invoke(&[HostValue::str("trestle")]).unwrap();
    assert_eq!(out, HostValue::str("hi trestle"));
}

#[test]
fn engine_failures_translate_to_host_errors() {
    let bridge = new_bridge();
    let engine_fn = {
        let mut heap = bridge.rt().heap.borrow_mut();
        heap.new_function("boom", |_, _| {
            Err(trestle_engine::EngineError::Type("boom".into()))
        })
    };
    let HostValue::Func(wrapper) = bridge.to_host_value(&engine_fn).unwrap() else {
        panic!("expected a callable");
    };
    let err = wrapper.invoke(&[]).unwrap_err();
    assert!(matches!(err, trestle_host::HostError::Engine(_)), "{err}");
}

proptest! {
    #[test]
    fn floats_round_trip_exactly(x in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
        let bridge = new_bridge();
        let engine = bridge.to_engine_value(&HostValue::Float(x)).unwrap();
        prop_assert_eq!(bridge.to_host_value(&engine).unwrap(), HostValue::Float(x));
    }

    #[test]
    fn safe_range_ints_stay_numerically_equal(i in -(1i64 << 53)..(1i64 << 53)) {
        let bridge = new_bridge();
        let engine = bridge.to_engine_value(&HostValue::Int(i)).unwrap();
        prop_assert_eq!(bridge.to_host_value(&engine).unwrap(), HostValue::Int(i));
    }
}
