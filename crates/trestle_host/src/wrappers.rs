//! Per-kind wrappers over host values.
//!
//! Each wrapper owns exactly one underlying reference. A wrapper is either
//! constructed over a freshly created value (`new`) or made to adopt an
//! existing reference, incrementing its count (`adopt`). Containers also
//! offer non-owning `Weak` downgrades so a view can be built over them
//! without extending their lifetime.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::errors::{messages, HostError};
use crate::iter::HostIterate;
use crate::value::{HostId, HostValue};

/// Ordered string-keyed mapping storage.
pub type MapStorage = IndexMap<Rc<str>, HostValue, ahash::RandomState>;

// ============================================================================
// List
// ============================================================================

/// Wrapper owning one reference to a host list.
#[derive(Clone)]
pub struct ListRef(Rc<RefCell<Vec<HostValue>>>);

/// Non-owning handle to a host list.
#[derive(Clone)]
pub struct ListWeak(Weak<RefCell<Vec<HostValue>>>);

impl ListRef {
    /// Wrap a freshly created list.
    pub fn new(items: Vec<HostValue>) -> Self {
        ListRef(Rc::new(RefCell::new(items)))
    }

    /// Adopt an existing reference, incrementing its count.
    pub fn adopt(other: &ListRef) -> Self {
        ListRef(Rc::clone(&other.0))
    }

    pub fn id(&self) -> HostId {
        HostId(Rc::as_ptr(&self.0) as usize)
    }

    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn downgrade(&self) -> ListWeak {
        ListWeak(Rc::downgrade(&self.0))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Result<HostValue, HostError> {
        self.0.borrow().get(index).cloned().ok_or(HostError::Index {
            index,
            len: self.0.borrow().len(),
        })
    }

    pub fn set(&self, index: usize, value: HostValue) -> Result<(), HostError> {
        let mut items = self.0.borrow_mut();
        let len = items.len();
        match items.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(HostError::Index { index, len }),
        }
    }

    pub fn push(&self, value: HostValue) {
        self.0.borrow_mut().push(value);
    }

    /// Sort scalars in place; values without a natural order keep their
    /// relative positions.
    pub fn sort(&self) {
        self.0.borrow_mut().sort_by(scalar_order);
    }

    pub fn snapshot(&self) -> Vec<HostValue> {
        self.0.borrow().clone()
    }
}

impl ListWeak {
    pub fn upgrade(&self) -> Option<ListRef> {
        self.0.upgrade().map(ListRef)
    }
}

fn scalar_order(a: &HostValue, b: &HostValue) -> Ordering {
    use HostValue::*;
    match (a, b) {
        (Int(x), Int(y)) => x.cmp(y),
        (Float(x), Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Int(x), Float(y)) => (*x as f64).partial_cmp(y).unwrap_or(Ordering::Equal),
        (Float(x), Int(y)) => x.partial_cmp(&(*y as f64)).unwrap_or(Ordering::Equal),
        (Str(x), Str(y)) => x.cmp(y),
        (Date(x), Date(y)) => x.cmp(y),
        (Bool(x), Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

// ============================================================================
// Mapping
// ============================================================================

/// Wrapper owning one reference to a host mapping.
#[derive(Clone)]
pub struct MapRef(Rc<RefCell<MapStorage>>);

/// Non-owning handle to a host mapping.
#[derive(Clone)]
pub struct MapWeak(Weak<RefCell<MapStorage>>);

impl MapRef {
    pub fn new(entries: MapStorage) -> Self {
        MapRef(Rc::new(RefCell::new(entries)))
    }

    pub fn empty() -> Self {
        MapRef(Rc::new(RefCell::new(MapStorage::default())))
    }

    pub fn adopt(other: &MapRef) -> Self {
        MapRef(Rc::clone(&other.0))
    }

    pub fn id(&self) -> HostId {
        HostId(Rc::as_ptr(&self.0) as usize)
    }

    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn downgrade(&self) -> MapWeak {
        MapWeak(Rc::downgrade(&self.0))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, key: &str) -> Option<HostValue> {
        self.0.borrow().get(key).cloned()
    }

    pub fn try_get(&self, key: &str) -> Result<HostValue, HostError> {
        self.get(key)
            .ok_or_else(|| HostError::Key(format!("{}: {key:?}", messages::KEY_NOT_FOUND)))
    }

    pub fn insert(&self, key: &str, value: HostValue) {
        self.0.borrow_mut().insert(Rc::from(key), value);
    }

    pub fn remove(&self, key: &str) -> Option<HostValue> {
        self.0.borrow_mut().shift_remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.0.borrow().keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(Rc<str>, HostValue)> {
        self.0
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl MapWeak {
    pub fn upgrade(&self) -> Option<MapRef> {
        self.0.upgrade().map(MapRef)
    }
}

// ============================================================================
// Callable
// ============================================================================

struct HostFn {
    name: Rc<str>,
    body: Box<dyn Fn(&[HostValue]) -> Result<HostValue, HostError>>,
}

/// Wrapper owning one reference to a host callable.
#[derive(Clone)]
pub struct FuncRef(Rc<HostFn>);

impl FuncRef {
    pub fn new(
        name: &str,
        body: impl Fn(&[HostValue]) -> Result<HostValue, HostError> + 'static,
    ) -> Self {
        FuncRef(Rc::new(HostFn {
            name: Rc::from(name),
            body: Box::new(body),
        }))
    }

    pub fn adopt(other: &FuncRef) -> Self {
        FuncRef(Rc::clone(&other.0))
    }

    pub fn id(&self) -> HostId {
        HostId(Rc::as_ptr(&self.0) as usize)
    }

    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn invoke(&self, args: &[HostValue]) -> Result<HostValue, HostError> {
        (self.0.body)(args)
    }
}

// ============================================================================
// Iterable
// ============================================================================

/// Wrapper owning one reference to a host iterator object.
#[derive(Clone)]
pub struct IterRef(Rc<RefCell<dyn HostIterate>>);

impl IterRef {
    pub fn new(iter: impl HostIterate + 'static) -> Self {
        IterRef(Rc::new(RefCell::new(iter)))
    }

    pub fn adopt(other: &IterRef) -> Self {
        IterRef(Rc::clone(&other.0))
    }

    pub fn id(&self) -> HostId {
        HostId(Rc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Pull the next element. `Ok(None)` is the exhaustion sentinel, never an
    /// error.
    pub fn advance(&self) -> Result<Option<HostValue>, HostError> {
        self.0.borrow_mut().advance()
    }
}
