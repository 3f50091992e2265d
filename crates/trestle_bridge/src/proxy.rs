//! Lazy proxies exposing host containers to the engine.
//!
//! A host list or mapping crossing into the engine is not copied; the
//! engine receives a proxy whose traps re-derive every answer from the live
//! backing container. The proxy holds a non-owning handle: it must never
//! extend the container's lifetime, and once the container is gone every
//! trap reports the proxy as detached instead of touching freed storage.

use std::any::Any;

use trestle_engine::{EngineError, EngineValue, Heap, PropKey, ProxyHandler};
use trestle_host::{HostValue, IterRef, ListIter, ListRef, ListWeak, MapKeysIter, MapRef, MapWeak};

use crate::context::BridgeRt;
use crate::factory::{to_engine, to_host, wrap_host_iter};

#[derive(Clone)]
enum Backing {
    List(ListWeak),
    Map(MapWeak),
}

/// Proxy trap handler backed by a live host container.
#[derive(Clone)]
pub struct ContainerProxy {
    rt: BridgeRt,
    backing: Backing,
}

impl ContainerProxy {
    pub fn for_list(rt: &BridgeRt, list: &ListRef) -> Self {
        ContainerProxy {
            rt: rt.clone(),
            backing: Backing::List(list.downgrade()),
        }
    }

    pub fn for_map(rt: &BridgeRt, map: &MapRef) -> Self {
        ContainerProxy {
            rt: rt.clone(),
            backing: Backing::Map(map.downgrade()),
        }
    }

    /// A strong reference to the backing container, if it is still alive.
    /// Crossing a proxied container back to the host hands out the original
    /// container through this, never a copy.
    pub fn backing_host_value(&self) -> Option<HostValue> {
        match &self.backing {
            Backing::List(weak) => weak.upgrade().map(HostValue::List),
            Backing::Map(weak) => weak.upgrade().map(HostValue::Map),
        }
    }

    fn list(&self) -> Result<ListRef, EngineError> {
        match &self.backing {
            Backing::List(weak) => weak
                .upgrade()
                .ok_or_else(|| EngineError::Detached("list".into())),
            Backing::Map(_) => Err(EngineError::Type("not a sequence proxy".into())),
        }
    }

    fn map(&self) -> Result<MapRef, EngineError> {
        match &self.backing {
            Backing::Map(weak) => weak
                .upgrade()
                .ok_or_else(|| EngineError::Detached("mapping".into())),
            Backing::List(_) => Err(EngineError::Type("not a mapping proxy".into())),
        }
    }

    /// `values()`-style method object: every call mints a fresh iterator.
    fn values_fn(&self, heap: &mut Heap) -> EngineValue {
        let this = self.clone();
        heap.new_function("values", move |heap, _args| this.iterate(heap))
    }
}

impl ProxyHandler for ContainerProxy {
    fn get(&self, heap: &mut Heap, key: &PropKey) -> Result<EngineValue, EngineError> {
        // Resolve the backing first so a detached proxy fails on every
        // trap, then serve protocol keys so backing data can never shadow
        // the iteration machinery.
        match &self.backing {
            Backing::List(_) => {
                let list = self.list()?;
                match key {
                    PropKey::IterSymbol => Ok(self.values_fn(heap)),
                    PropKey::Str(k) if &**k == "length" => {
                        Ok(EngineValue::Num(list.len() as f64))
                    }
                    PropKey::Index(i) => match list.get(*i) {
                        Ok(item) => to_engine(&self.rt, heap, &item),
                        Err(_) => Ok(EngineValue::Undefined),
                    },
                    _ => Ok(EngineValue::Undefined),
                }
            }
            Backing::Map(_) => {
                let map = self.map()?;
                match key {
                    PropKey::IterSymbol => Ok(self.values_fn(heap)),
                    PropKey::Str(k) => match map.get(k.as_ref()) {
                        Some(item) => to_engine(&self.rt, heap, &item),
                        None => Ok(EngineValue::Undefined),
                    },
                    _ => Ok(EngineValue::Undefined),
                }
            }
        }
    }

    fn set(&self, heap: &mut Heap, key: &PropKey, value: EngineValue) -> Result<(), EngineError> {
        match &self.backing {
            Backing::List(_) => {
                let list = self.list()?;
                let PropKey::Index(i) = key else {
                    return Err(EngineError::Property(format!(
                        "cannot assign key {key} on sequence proxy"
                    )));
                };
                let host = to_host(&self.rt, heap, &value)?;
                if *i == list.len() {
                    list.push(host);
                    Ok(())
                } else {
                    list.set(*i, host)
                        .map_err(|err| EngineError::Host(err.to_string()))
                }
            }
            Backing::Map(_) => {
                let map = self.map()?;
                let PropKey::Str(k) = key else {
                    return Err(EngineError::Property(format!(
                        "cannot assign key {key} on mapping proxy"
                    )));
                };
                let host = to_host(&self.rt, heap, &value)?;
                map.insert(k.as_ref(), host);
                Ok(())
            }
        }
    }

    fn has(&self, key: &PropKey) -> Result<bool, EngineError> {
        match &self.backing {
            Backing::List(_) => {
                let list = self.list()?;
                Ok(match key {
                    PropKey::Index(i) => *i < list.len(),
                    PropKey::Str(k) => &**k == "length",
                    PropKey::IterSymbol => true,
                })
            }
            Backing::Map(_) => {
                let map = self.map()?;
                Ok(match key {
                    PropKey::Str(k) => map.contains(k.as_ref()),
                    PropKey::IterSymbol => true,
                    PropKey::Index(_) => false,
                })
            }
        }
    }

    fn own_keys(&self) -> Result<Vec<PropKey>, EngineError> {
        match &self.backing {
            Backing::List(_) => Ok((0..self.list()?.len()).map(PropKey::Index).collect()),
            Backing::Map(_) => Ok(self
                .map()?
                .keys()
                .into_iter()
                .map(PropKey::Str)
                .collect()),
        }
    }

    fn length(&self) -> Result<Option<usize>, EngineError> {
        match &self.backing {
            Backing::List(_) => Ok(Some(self.list()?.len())),
            Backing::Map(_) => Ok(Some(self.map()?.len())),
        }
    }

    fn iterate(&self, heap: &mut Heap) -> Result<EngineValue, EngineError> {
        // Fresh iterator per request; concurrent iterations stay
        // independent. Sequences iterate elements against the live backing
        // store, mappings iterate a key snapshot.
        let iter = match &self.backing {
            Backing::List(_) => IterRef::new(ListIter::over(&self.list()?)),
            Backing::Map(_) => IterRef::new(MapKeysIter::over(&self.map()?)),
        };
        Ok(wrap_host_iter(&self.rt, heap, iter))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
