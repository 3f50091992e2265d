//! Heap-managed engine objects.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::errors::EngineError;
use crate::heap::Heap;
use crate::proxy::ProxyHandler;
use crate::value::EngineValue;

/// Own properties of a plain object, in insertion order.
pub type Props = IndexMap<Rc<str>, EngineValue, ahash::RandomState>;

/// Body of a callable engine object. Script-compiled functions are closed
/// over by the evaluator collaborator and arrive here in the same shape as
/// bridge-installed natives.
pub type NativeFn = Rc<dyn Fn(&mut Heap, &[EngineValue]) -> Result<EngineValue, EngineError>>;

/// Advance function of a native iterator; `Ok(None)` signals exhaustion.
pub type NativeIterFn =
    Rc<RefCell<dyn FnMut(&mut Heap) -> Result<Option<EngineValue>, EngineError>>>;

pub struct FunctionObj {
    pub name: Rc<str>,
    pub call: NativeFn,
    /// Engine values the body closes over, traced through this object.
    pub captures: Vec<EngineValue>,
}

pub struct IteratorObj {
    pub advance: NativeIterFn,
    /// Engine values the advance body closes over, traced through this
    /// object.
    pub captures: Vec<EngineValue>,
}

/// A traced heap object.
///
/// Proxy bodies are opaque to the collector and must keep anything they
/// reference alive outside the heap. Function and iterator bodies declare
/// the engine values they close over in `captures`, which the marker
/// traces; holding a bare `ObjectId` in a closure without listing the
/// value there is unsound.
pub enum GcObject {
    Object(Props),
    Array(Vec<EngineValue>),
    /// Milliseconds since the Unix epoch.
    Date(i64),
    Function(FunctionObj),
    /// A callable with arguments bound ahead of invocation-time arguments.
    Bound {
        target: EngineValue,
        bound: Vec<EngineValue>,
    },
    Proxy(Rc<dyn ProxyHandler>),
    Iterator(IteratorObj),
}

impl GcObject {
    /// Rough per-object size used for the collection threshold.
    pub fn size(&self) -> usize {
        let base = std::mem::size_of::<GcObject>();
        let deep = match self {
            GcObject::Object(props) => {
                props.capacity()
                    * (std::mem::size_of::<Rc<str>>() + std::mem::size_of::<EngineValue>() + 16)
            }
            GcObject::Array(items) => items.capacity() * std::mem::size_of::<EngineValue>(),
            GcObject::Bound { bound, .. } => bound.capacity() * std::mem::size_of::<EngineValue>(),
            GcObject::Date(_) => 0,
            GcObject::Function(f) => 64 + f.captures.capacity() * std::mem::size_of::<EngineValue>(),
            GcObject::Iterator(it) => {
                64 + it.captures.capacity() * std::mem::size_of::<EngineValue>()
            }
            GcObject::Proxy(_) => 64,
        };
        base + deep
    }
}
