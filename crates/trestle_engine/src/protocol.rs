//! The engine object protocol: property access, enumeration, calls and the
//! iteration protocol, with proxy objects trapped through [`ProxyHandler`].

use std::rc::Rc;

use crate::errors::EngineError;
use crate::heap::Heap;
use crate::object::{FunctionObj, GcObject, IteratorObj, NativeFn, Props};
use crate::proxy::ProxyHandler;
use crate::value::EngineValue;

/// A property key as seen by the object protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropKey {
    Str(Rc<str>),
    Index(usize),
    /// The well-known iteration key (the engine's iterator symbol).
    IterSymbol,
}

impl PropKey {
    pub fn str(s: &str) -> PropKey {
        PropKey::Str(Rc::from(s))
    }
}

impl std::fmt::Display for PropKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropKey::Str(s) => write!(f, "{s}"),
            PropKey::Index(i) => write!(f, "{i}"),
            PropKey::IterSymbol => write!(f, "@@iterator"),
        }
    }
}

enum GetPath {
    Proxy(Rc<dyn ProxyHandler>),
    IterNext,
}

impl Heap {
    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    pub fn new_object(&mut self, props: Props) -> EngineValue {
        EngineValue::Obj(self.alloc(GcObject::Object(props)))
    }

    pub fn new_array(&mut self, items: Vec<EngineValue>) -> EngineValue {
        EngineValue::Obj(self.alloc(GcObject::Array(items)))
    }

    pub fn new_date(&mut self, epoch_ms: i64) -> EngineValue {
        EngineValue::Obj(self.alloc(GcObject::Date(epoch_ms)))
    }

    pub fn new_function(
        &mut self,
        name: &str,
        call: impl Fn(&mut Heap, &[EngineValue]) -> Result<EngineValue, EngineError> + 'static,
    ) -> EngineValue {
        self.new_closure(name, Vec::new(), call)
    }

    /// A native function whose body closes over engine values; the captures
    /// are traced through the function object, so the backing values stay
    /// alive for as long as the function does.
    pub fn new_closure(
        &mut self,
        name: &str,
        captures: Vec<EngineValue>,
        call: impl Fn(&mut Heap, &[EngineValue]) -> Result<EngineValue, EngineError> + 'static,
    ) -> EngineValue {
        EngineValue::Obj(self.alloc(GcObject::Function(FunctionObj {
            name: Rc::from(name),
            call: Rc::new(call),
            captures,
        })))
    }

    pub fn new_bound(&mut self, target: EngineValue, bound: Vec<EngineValue>) -> EngineValue {
        EngineValue::Obj(self.alloc(GcObject::Bound { target, bound }))
    }

    pub fn new_proxy(&mut self, handler: Rc<dyn ProxyHandler>) -> EngineValue {
        EngineValue::Obj(self.alloc(GcObject::Proxy(handler)))
    }

    pub fn new_native_iter(
        &mut self,
        advance: impl FnMut(&mut Heap) -> Result<Option<EngineValue>, EngineError> + 'static,
    ) -> EngineValue {
        self.new_iter_over(Vec::new(), advance)
    }

    /// A native iterator whose advance body closes over engine values; the
    /// captures are traced through the iterator object.
    pub fn new_iter_over(
        &mut self,
        captures: Vec<EngineValue>,
        advance: impl FnMut(&mut Heap) -> Result<Option<EngineValue>, EngineError> + 'static,
    ) -> EngineValue {
        EngineValue::Obj(self.alloc(GcObject::Iterator(IteratorObj {
            advance: Rc::new(std::cell::RefCell::new(advance)),
            captures,
        })))
    }

    /// Build a `{done, value}` iteration-protocol result object.
    pub fn iter_result(&mut self, done: bool, value: EngineValue) -> EngineValue {
        let mut props = Props::default();
        props.insert(Rc::from("done"), EngineValue::Bool(done));
        props.insert(Rc::from("value"), value);
        self.new_object(props)
    }

    // ------------------------------------------------------------------
    // Property access
    // ------------------------------------------------------------------

    pub fn get_prop(
        &mut self,
        target: &EngineValue,
        key: &PropKey,
    ) -> Result<EngineValue, EngineError> {
        let id = match target {
            EngineValue::Undefined | EngineValue::Null => {
                return Err(EngineError::Property(format!(
                    "cannot read {key} of {target:?}"
                )));
            }
            EngineValue::Str(s) => {
                return Ok(match key {
                    PropKey::Str(k) if &**k == "length" => {
                        EngineValue::Num(s.chars().count() as f64)
                    }
                    _ => EngineValue::Undefined,
                });
            }
            EngineValue::Obj(id) => *id,
            _ => return Ok(EngineValue::Undefined),
        };

        let path = match self.get(id) {
            GcObject::Proxy(handler) => GetPath::Proxy(Rc::clone(handler)),
            GcObject::Iterator(_) => {
                if matches!(key, PropKey::Str(k) if &**k == "next") {
                    GetPath::IterNext
                } else {
                    return Ok(EngineValue::Undefined);
                }
            }
            GcObject::Object(props) => {
                return Ok(match key {
                    PropKey::Str(k) => props.get(k).cloned().unwrap_or(EngineValue::Undefined),
                    _ => EngineValue::Undefined,
                });
            }
            GcObject::Array(items) => {
                return Ok(match key {
                    PropKey::Index(i) => items.get(*i).cloned().unwrap_or(EngineValue::Undefined),
                    PropKey::Str(k) if &**k == "length" => EngineValue::Num(items.len() as f64),
                    _ => EngineValue::Undefined,
                });
            }
            GcObject::Date(_) | GcObject::Function(_) | GcObject::Bound { .. } => {
                return Ok(EngineValue::Undefined);
            }
        };

        match path {
            GetPath::Proxy(handler) => handler.get(self, key),
            GetPath::IterNext => {
                let iter = target.clone();
                // The bound method keeps its iterator alive via the capture.
                Ok(self.new_closure("next", vec![target.clone()], move |heap, _args| {
                    heap.iter_next(&iter)
                }))
            }
        }
    }

    pub fn set_prop(
        &mut self,
        target: &EngineValue,
        key: &PropKey,
        value: EngineValue,
    ) -> Result<(), EngineError> {
        let Some(id) = target.as_obj_id() else {
            return Err(EngineError::Property(format!(
                "cannot assign {key} on {target:?}"
            )));
        };

        if let GcObject::Proxy(handler) = self.get(id) {
            let handler = Rc::clone(handler);
            return handler.set(self, key, value);
        }

        match self.get_mut(id) {
            GcObject::Object(props) => match key {
                PropKey::Str(k) => {
                    props.insert(k.clone(), value);
                    Ok(())
                }
                _ => Err(EngineError::Property(format!(
                    "cannot assign key {key} on plain object"
                ))),
            },
            GcObject::Array(items) => match key {
                PropKey::Index(i) => {
                    if *i < items.len() {
                        items[*i] = value;
                    } else {
                        items.resize(*i, EngineValue::Undefined);
                        items.push(value);
                    }
                    Ok(())
                }
                _ => Err(EngineError::Property(format!(
                    "cannot assign key {key} on array"
                ))),
            },
            _ => Err(EngineError::Property(format!(
                "cannot assign {key} on this object"
            ))),
        }
    }

    pub fn has_prop(&self, target: &EngineValue, key: &PropKey) -> Result<bool, EngineError> {
        let Some(id) = target.as_obj_id() else {
            return Ok(false);
        };
        match self.get(id) {
            GcObject::Proxy(handler) => handler.has(key),
            GcObject::Object(props) => Ok(matches!(key, PropKey::Str(k) if props.contains_key(k))),
            GcObject::Array(items) => Ok(match key {
                PropKey::Index(i) => *i < items.len(),
                PropKey::Str(k) => &**k == "length",
                PropKey::IterSymbol => true,
            }),
            GcObject::Iterator(_) => Ok(matches!(key, PropKey::Str(k) if &**k == "next")),
            _ => Ok(false),
        }
    }

    /// Own-property enumeration, in insertion order for plain objects.
    pub fn own_keys(&self, target: &EngineValue) -> Result<Vec<PropKey>, EngineError> {
        let Some(id) = target.as_obj_id() else {
            return Ok(Vec::new());
        };
        match self.get(id) {
            GcObject::Proxy(handler) => handler.own_keys(),
            GcObject::Object(props) => Ok(props.keys().map(|k| PropKey::Str(k.clone())).collect()),
            GcObject::Array(items) => Ok((0..items.len()).map(PropKey::Index).collect()),
            _ => Ok(Vec::new()),
        }
    }

    pub fn length(&self, target: &EngineValue) -> Result<Option<usize>, EngineError> {
        match target {
            EngineValue::Str(s) => Ok(Some(s.chars().count())),
            EngineValue::Obj(id) => match self.get(*id) {
                GcObject::Array(items) => Ok(Some(items.len())),
                GcObject::Proxy(handler) => handler.length(),
                _ => Ok(None),
            },
            _ => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    pub fn call(
        &mut self,
        callee: &EngineValue,
        args: &[EngineValue],
    ) -> Result<EngineValue, EngineError> {
        enum CallPath {
            Native(NativeFn),
            Bound(EngineValue, Vec<EngineValue>),
        }

        let Some(id) = callee.as_obj_id() else {
            return Err(EngineError::Type(format!("{callee:?} is not callable")));
        };
        let path = match self.get(id) {
            GcObject::Function(f) => CallPath::Native(Rc::clone(&f.call)),
            GcObject::Bound { target, bound } => CallPath::Bound(target.clone(), bound.clone()),
            _ => return Err(EngineError::Type(format!("{callee:?} is not callable"))),
        };
        match path {
            CallPath::Native(f) => f(self, args),
            CallPath::Bound(target, mut bound) => {
                bound.extend_from_slice(args);
                self.call(&target, &bound)
            }
        }
    }

    // ------------------------------------------------------------------
    // Iteration protocol
    // ------------------------------------------------------------------

    /// Resolve the default iterator for `target`. Idempotent for iterables:
    /// every call on an array or proxy mints an independent iterator.
    pub fn iterate(&mut self, target: &EngineValue) -> Result<EngineValue, EngineError> {
        let Some(id) = target.as_obj_id() else {
            return Err(EngineError::NotIterable(format!("{target:?}")));
        };
        match self.get(id) {
            GcObject::Iterator(_) => Ok(target.clone()),
            GcObject::Proxy(handler) => {
                let handler = Rc::clone(handler);
                handler.iterate(self)
            }
            GcObject::Array(_) => {
                let mut index = 0usize;
                // The capture keeps the backing array (and its slot) alive.
                Ok(self.new_iter_over(vec![target.clone()], move |heap| {
                    let GcObject::Array(items) = heap.get(id) else {
                        return Err(EngineError::Type("array iterator target changed".into()));
                    };
                    match items.get(index) {
                        Some(v) => {
                            let v = v.clone();
                            index += 1;
                            Ok(Some(v))
                        }
                        None => Ok(None),
                    }
                }))
            }
            _ => Err(EngineError::NotIterable(format!("{target:?}"))),
        }
    }

    /// Advance an iterator, producing a `{done, value}` result object.
    pub fn iter_next(&mut self, iter: &EngineValue) -> Result<EngineValue, EngineError> {
        let Some(id) = iter.as_obj_id() else {
            return Err(EngineError::Type(format!("{iter:?} is not an iterator")));
        };
        let advance = match self.get(id) {
            GcObject::Iterator(it) => Rc::clone(&it.advance),
            _ => return Err(EngineError::Type(format!("{iter:?} is not an iterator"))),
        };
        let step = {
            let mut advance = advance.borrow_mut();
            (&mut *advance)(self)?
        };
        Ok(match step {
            Some(value) => self.iter_result(false, value),
            None => self.iter_result(true, EngineValue::Undefined),
        })
    }
}
