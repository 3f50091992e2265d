use std::cell::Cell;
use std::rc::Rc;

use trestle_engine::{EngineValue, Heap, PropKey, Props};

#[test]
fn unreachable_objects_are_swept() {
    let mut heap = Heap::new();
    let kept = heap.new_array(vec![]);
    let root = heap.root(kept.clone());
    let dropped = heap.new_array(vec![]);

    heap.collect();
    assert!(heap.is_live(kept.as_obj_id().unwrap()));
    assert!(!heap.is_live(dropped.as_obj_id().unwrap()));

    heap.unroot(root);
    heap.collect();
    assert!(!heap.is_live(kept.as_obj_id().unwrap()));
}

#[test]
fn marking_traverses_container_children() {
    let mut heap = Heap::new();
    let inner = heap.new_array(vec![EngineValue::Num(1.0)]);
    let mut props = Props::default();
    props.insert(Rc::from("inner"), inner.clone());
    let outer = heap.new_object(props);
    let _root = heap.root(outer);

    heap.collect();
    assert!(heap.is_live(inner.as_obj_id().unwrap()));
}

#[test]
fn bound_functions_keep_target_and_bound_values_alive() {
    let mut heap = Heap::new();
    let target = heap.new_function("f", |_, _| Ok(EngineValue::Undefined));
    let extra = heap.new_array(vec![]);
    let bound = heap.new_bound(target.clone(), vec![extra.clone()]);
    let _root = heap.root(bound);

    heap.collect();
    assert!(heap.is_live(target.as_obj_id().unwrap()));
    assert!(heap.is_live(extra.as_obj_id().unwrap()));
}

#[test]
fn bound_next_method_keeps_its_iterator_alive() {
    let mut heap = Heap::new();
    let arr = heap.new_array(vec![EngineValue::Num(5.0)]);
    let iter = heap.iterate(&arr).unwrap();
    let next = heap.get_prop(&iter, &PropKey::str("next")).unwrap();
    let _root = heap.root(next.clone());

    // Only the method is rooted; the iterator and its backing array ride
    // along through the traced captures.
    heap.collect();
    assert!(heap.is_live(iter.as_obj_id().unwrap()));
    assert!(heap.is_live(arr.as_obj_id().unwrap()));

    let step = heap.call(&next, &[]).unwrap();
    let value = heap.get_prop(&step, &PropKey::str("value")).unwrap();
    assert!(matches!(value, EngineValue::Num(n) if n == 5.0));
}

#[test]
fn array_iterator_keeps_its_backing_array_alive() {
    let mut heap = Heap::new();
    let arr = heap.new_array(vec![EngineValue::Num(1.0), EngineValue::Num(2.0)]);
    let arr_id = arr.as_obj_id().unwrap();
    let iter = heap.iterate(&arr).unwrap();
    let _root = heap.root(iter.clone());
    drop(arr);

    heap.collect();
    assert!(heap.is_live(arr_id), "the iterator's capture must trace the array");

    let step = heap.iter_next(&iter).unwrap();
    let value = heap.get_prop(&step, &PropKey::str("value")).unwrap();
    assert!(matches!(value, EngineValue::Num(n) if n == 1.0));
}

#[test]
fn double_unroot_is_a_no_op() {
    let mut heap = Heap::new();
    let a = heap.new_array(vec![]);
    let root_a = heap.root(a);
    heap.unroot(root_a);
    heap.unroot(root_a);
    assert_eq!(heap.root_count(), 0);

    // The freed slot is reused exactly once.
    let b = heap.new_array(vec![]);
    let root_b = heap.root(b.clone());
    assert_eq!(heap.root_count(), 1);
    heap.collect();
    assert!(heap.is_live(b.as_obj_id().unwrap()));
    heap.unroot(root_b);
}

#[test]
fn slot_reuse_goes_through_the_free_list() {
    let mut heap = Heap::new();
    let dead = heap.new_array(vec![]);
    let dead_id = dead.as_obj_id().unwrap();
    heap.collect();
    let reused = heap.new_array(vec![]);
    assert_eq!(reused.as_obj_id().unwrap(), dead_id);
}

#[test]
fn hooks_run_before_marking_and_may_unroot() {
    let mut heap = Heap::new();
    let victim = heap.new_array(vec![]);
    let root = heap.root(victim.clone());

    let ran = Rc::new(Cell::new(0));
    let ran_hook = Rc::clone(&ran);
    heap.add_gc_hook(Box::new(move |heap| {
        ran_hook.set(ran_hook.get() + 1);
        heap.unroot(root);
    }));

    heap.collect();
    assert_eq!(ran.get(), 1);
    // The hook dropped the root before marking, so the pass already swept it.
    assert!(!heap.is_live(victim.as_obj_id().unwrap()));

    heap.collect();
    assert_eq!(ran.get(), 2, "hooks persist across passes");
}

#[test]
fn nested_collect_from_a_hook_is_ignored() {
    let mut heap = Heap::new();
    heap.add_gc_hook(Box::new(|heap| heap.collect()));
    heap.collect();
}

#[test]
fn root_count_tracks_live_roots() {
    let mut heap = Heap::new();
    assert_eq!(heap.root_count(), 0);
    let a = heap.root(EngineValue::Num(1.0));
    let b = heap.root(EngineValue::Num(2.0));
    assert_eq!(heap.root_count(), 2);
    heap.unroot(a);
    assert_eq!(heap.root_count(), 1);
    assert!(heap.root_value(b).is_some());
    assert!(heap.root_value(a).is_none());
}
