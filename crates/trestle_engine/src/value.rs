//! Engine value representation.
//!
//! Immediates are stored inline; everything with identity lives on the
//! traced [`Heap`](crate::heap::Heap) behind an [`ObjectId`].

use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;

use crate::heap::{Heap, ObjectId};
use crate::object::GcObject;

/// Largest integer exactly representable in an engine number.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// The closed set of engine value kinds, as reported by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    Undefined,
    Null,
    Bool,
    Number,
    BigInt,
    String,
    Object,
    Array,
    Date,
    Function,
    Proxy,
    Iterator,
}

#[derive(Clone)]
pub enum EngineValue {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Big(Rc<BigInt>),
    Str(Rc<str>),
    Obj(ObjectId),
}

impl EngineValue {
    pub fn str(s: &str) -> EngineValue {
        EngineValue::Str(Rc::from(s))
    }

    pub fn big(i: BigInt) -> EngineValue {
        EngineValue::Big(Rc::new(i))
    }

    /// Kind dispatch; heap-resident values report the kind of the object
    /// they reference.
    pub fn kind(&self, heap: &Heap) -> EngineKind {
        match self {
            EngineValue::Undefined => EngineKind::Undefined,
            EngineValue::Null => EngineKind::Null,
            EngineValue::Bool(_) => EngineKind::Bool,
            EngineValue::Num(_) => EngineKind::Number,
            EngineValue::Big(_) => EngineKind::BigInt,
            EngineValue::Str(_) => EngineKind::String,
            EngineValue::Obj(id) => match heap.get(*id) {
                GcObject::Object(_) => EngineKind::Object,
                GcObject::Array(_) => EngineKind::Array,
                GcObject::Date(_) => EngineKind::Date,
                GcObject::Function(_) | GcObject::Bound { .. } => EngineKind::Function,
                GcObject::Proxy(_) => EngineKind::Proxy,
                GcObject::Iterator(_) => EngineKind::Iterator,
            },
        }
    }

    pub fn as_obj_id(&self) -> Option<ObjectId> {
        match self {
            EngineValue::Obj(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_function(&self, heap: &Heap) -> bool {
        matches!(self.kind(heap), EngineKind::Function)
    }

    pub fn truthy(&self) -> bool {
        match self {
            EngineValue::Undefined | EngineValue::Null => false,
            EngineValue::Bool(b) => *b,
            EngineValue::Num(n) => *n != 0.0 && !n.is_nan(),
            EngineValue::Big(b) => **b != BigInt::from(0),
            EngineValue::Str(s) => !s.is_empty(),
            EngineValue::Obj(_) => true,
        }
    }
}

impl fmt::Debug for EngineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineValue::Undefined => write!(f, "undefined"),
            EngineValue::Null => write!(f, "null"),
            EngineValue::Bool(b) => write!(f, "{b}"),
            EngineValue::Num(n) => write!(f, "{n:?}"),
            EngineValue::Big(b) => write!(f, "{b}n"),
            EngineValue::Str(s) => write!(f, "{s:?}"),
            EngineValue::Obj(id) => write!(f, "obj#{}", id.0),
        }
    }
}
