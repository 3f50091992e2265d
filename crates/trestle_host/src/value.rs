//! Host runtime value representation.
//!
//! The host side of the bridge is a dynamically-typed, reference-counted
//! object system: containers and callables are `Rc`-backed, scalars are
//! immediate. `Rc::strong_count` is the reference-count signal the liveness
//! bridge observes, and the `Rc` allocation address is object identity.

use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::wrappers::{FuncRef, IterRef, ListRef, MapRef};

/// Stable identity of a reference-counted host object.
///
/// Derived from the `Rc` allocation address; only meaningful while at least
/// one strong reference is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostId(pub usize);

/// The closed set of host value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Date,
    List,
    Mapping,
    Function,
    Iterable,
    BigInt,
}

/// A host runtime value.
///
/// Scalars are stored inline; list, mapping, function and iterable values
/// hold a strong reference into the host's refcounted object graph.
#[derive(Clone)]
pub enum HostValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Arbitrary-precision integer, beyond `i64`.
    Big(Rc<BigInt>),
    Str(Rc<str>),
    /// Milliseconds since the Unix epoch.
    Date(i64),
    List(ListRef),
    Map(MapRef),
    Func(FuncRef),
    Iter(IterRef),
}

impl HostValue {
    pub fn kind(&self) -> HostKind {
        match self {
            HostValue::Null => HostKind::Null,
            HostValue::Bool(_) => HostKind::Bool,
            HostValue::Int(_) => HostKind::Int,
            HostValue::Float(_) => HostKind::Float,
            HostValue::Big(_) => HostKind::BigInt,
            HostValue::Str(_) => HostKind::String,
            HostValue::Date(_) => HostKind::Date,
            HostValue::List(_) => HostKind::List,
            HostValue::Map(_) => HostKind::Mapping,
            HostValue::Func(_) => HostKind::Function,
            HostValue::Iter(_) => HostKind::Iterable,
        }
    }

    pub fn str(s: &str) -> HostValue {
        HostValue::Str(Rc::from(s))
    }

    pub fn big(i: BigInt) -> HostValue {
        HostValue::Big(Rc::new(i))
    }

    /// Object identity, for identity-bearing (refcounted) kinds only.
    pub fn identity(&self) -> Option<HostId> {
        match self {
            HostValue::List(l) => Some(l.id()),
            HostValue::Map(m) => Some(m.id()),
            HostValue::Func(f) => Some(f.id()),
            HostValue::Iter(i) => Some(i.id()),
            _ => None,
        }
    }

    /// The reference-count signal for identity-bearing kinds.
    pub fn ref_count(&self) -> Option<usize> {
        match self {
            HostValue::List(l) => Some(l.strong_count()),
            HostValue::Map(m) => Some(m.strong_count()),
            HostValue::Func(f) => Some(f.strong_count()),
            HostValue::Iter(i) => Some(i.strong_count()),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, HostValue::Func(_))
    }
}

// Scalar comparisons are numeric across Int/Float/BigInt so that values
// surviving a boundary crossing (which may change the concrete kind but not
// the number) still compare equal. Identity-bearing kinds compare by object
// identity.
impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        use HostValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => *a as f64 == *b,
            (Big(a), Big(b)) => a == b,
            (Big(a), Int(b)) | (Int(b), Big(a)) => **a == BigInt::from(*b),
            (Big(a), Float(b)) | (Float(b), Big(a)) => a.to_f64() == Some(*b),
            (Str(a), Str(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (List(a), List(b)) => a.id() == b.id(),
            (Map(a), Map(b)) => a.id() == b.id(),
            (Func(a), Func(b)) => a.id() == b.id(),
            (Iter(a), Iter(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => write!(f, "null"),
            HostValue::Bool(b) => write!(f, "{b}"),
            HostValue::Int(i) => write!(f, "{i}"),
            HostValue::Float(x) => write!(f, "{x:?}"),
            HostValue::Big(b) => write!(f, "{b}n"),
            HostValue::Str(s) => write!(f, "{s:?}"),
            HostValue::Date(ms) => write!(f, "Date({ms})"),
            HostValue::List(l) => write!(f, "List#{:x}(len={})", l.id().0, l.len()),
            HostValue::Map(m) => write!(f, "Map#{:x}(len={})", m.id().0, m.len()),
            HostValue::Func(func) => write!(f, "Func#{:x}({})", func.id().0, func.name()),
            HostValue::Iter(i) => write!(f, "Iter#{:x}", i.id().0),
        }
    }
}
