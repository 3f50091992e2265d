//! Host-side ("Runtime A") value system for the Trestle bridge.
//!
//! A dynamically-typed, reference-counted object model: tagged values,
//! per-kind wrappers, the host iterator protocol, and the cooperative run
//! loop deferred callbacks are posted to. The engine side lives in
//! `trestle_engine`; everything that crosses between the two lives in
//! `trestle_bridge`.

pub mod errors;
pub mod event_loop;
pub mod iter;
pub mod value;
pub mod wrappers;

pub use errors::{messages, HostError};
pub use event_loop::{Clock, ManualClock, RunLoop, SystemClock, Task};
pub use iter::{HostIterate, ListIter, MapKeysIter};
pub use value::{HostId, HostKind, HostValue};
pub use wrappers::{FuncRef, IterRef, ListRef, ListWeak, MapRef, MapStorage, MapWeak};
