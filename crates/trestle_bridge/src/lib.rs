//! Cross-runtime memory bridge between the refcounted host value system
//! (`trestle_host`) and the traced engine object system (`trestle_engine`).
//!
//! Four coordinated pieces:
//!
//! - the type factory ([`to_engine`]/[`to_host`]): bidirectional conversion
//!   of values crossing the boundary;
//! - the liveness table ([`LivenessTable`]): keeps engine objects alive
//!   exactly as long as host references to their wrappers exist, pruned
//!   from a collection-cycle hook;
//! - the container proxy ([`ContainerProxy`]): engine view over live host
//!   lists and mappings, no copies;
//! - the callback scheduler ([`CallbackScheduler`] and the
//!   `setTimeout`/`clearTimeout` globals): deferred cross-boundary calls
//!   posted to the host run loop.
//!
//! [`Bridge`] ties them together around one engine heap.

pub mod context;
pub mod factory;
pub mod liveness;
pub mod proxy;
pub mod sched;

pub use context::{Bridge, BridgeRt, DefaultTranslator, TranslateError};
pub use factory::{to_engine, to_host};
pub use liveness::LivenessTable;
pub use proxy::ContainerProxy;
pub use sched::{install_timer_globals, AsyncHandle, CallbackScheduler};
