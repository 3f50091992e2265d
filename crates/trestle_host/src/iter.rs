//! Host iterator protocol.

use std::rc::Rc;

use crate::errors::HostError;
use crate::value::HostValue;
use crate::wrappers::{ListRef, MapRef};

/// One-shot, lazily advancing iterator over host values.
///
/// `Ok(None)` signals exhaustion. Implementations should reserve
/// `HostError::Internal` for transient internal faults; the bridge swallows
/// that class during iteration and treats it as exhaustion.
pub trait HostIterate {
    fn advance(&mut self) -> Result<Option<HostValue>, HostError>;
}

/// Index-walking iterator holding a reference to the backing list (the
/// iterator references the container, so mutations made while iterating are
/// observed).
pub struct ListIter {
    list: ListRef,
    index: usize,
}

impl ListIter {
    pub fn over(list: &ListRef) -> Self {
        ListIter {
            list: ListRef::adopt(list),
            index: 0,
        }
    }
}

impl HostIterate for ListIter {
    fn advance(&mut self) -> Result<Option<HostValue>, HostError> {
        if self.index >= self.list.len() {
            return Ok(None);
        }
        let item = self.list.get(self.index)?;
        self.index += 1;
        Ok(Some(item))
    }
}

/// Iterator over a mapping's own keys, snapshotted in insertion order at
/// creation time.
pub struct MapKeysIter {
    keys: Vec<Rc<str>>,
    index: usize,
}

impl MapKeysIter {
    pub fn over(map: &MapRef) -> Self {
        MapKeysIter {
            keys: map.keys(),
            index: 0,
        }
    }
}

impl HostIterate for MapKeysIter {
    fn advance(&mut self) -> Result<Option<HostValue>, HostError> {
        match self.keys.get(self.index) {
            Some(key) => {
                self.index += 1;
                Ok(Some(HostValue::Str(key.clone())))
            }
            None => Ok(None),
        }
    }
}
