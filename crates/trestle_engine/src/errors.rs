//! Engine-level failures.
//!
//! Everything here stays on the engine side of the boundary; the bridge
//! translates before anything crosses into the host.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Compilation or evaluation failure, with source position metadata.
    #[error("{file}:{line}: {message}")]
    Eval {
        message: String,
        file: String,
        line: u32,
    },
    /// Wrong kind of value at a call boundary.
    #[error("type error: {0}")]
    Type(String),
    /// Property access failure.
    #[error("property error: {0}")]
    Property(String),
    /// Iteration requested on a non-iterable value.
    #[error("not iterable: {0}")]
    NotIterable(String),
    /// A lazy proxy's backing container no longer exists.
    #[error("backing container detached: {0}")]
    Detached(String),
    /// A failure propagated out of a host callable or container.
    #[error("host fault: {0}")]
    Host(String),
}
