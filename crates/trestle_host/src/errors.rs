//! Host-side error taxonomy.

use thiserror::Error;

/// Common error message constants used at call boundaries.
pub mod messages {
    pub const NOT_CALLABLE: &str = "Not a callable";
    pub const NOT_A_LIST: &str = "Not a list";
    pub const NOT_A_MAPPING: &str = "Not a mapping";
    pub const NOT_AN_ITERABLE: &str = "Not an iterable";
    pub const NO_IDENTITY: &str = "Value has no object identity";
    pub const INDEX_OUT_OF_BOUNDS: &str = "Index out of bounds";
    pub const KEY_NOT_FOUND: &str = "Key not found";
}

/// Errors raised on the host side of the bridge.
///
/// `Internal` is the narrowly-scoped benign transient class: it is swallowed
/// during iteration advance and treated as exhaustion, and propagates
/// normally everywhere else.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HostError {
    /// Argument-contract violation, reported immediately at the call boundary.
    #[error("type error: {0}")]
    Type(String),
    /// Missing mapping key.
    #[error("key error: {0}")]
    Key(String),
    /// Sequence index out of range.
    #[error("index error: index {index} out of bounds for length {len}")]
    Index { index: usize, len: usize },
    /// Failure raised while invoking a host callable.
    #[error("call error: {0}")]
    Call(String),
    /// An engine-level failure, already translated for host consumption.
    #[error("engine error: {0}")]
    Engine(String),
    /// Benign transient internal failure (see type docs).
    #[error("internal error: {0}")]
    Internal(String),
    /// Fatal initialization failure; nothing partially-initialized survives.
    #[error("initialization failed: {0}")]
    Init(String),
}
