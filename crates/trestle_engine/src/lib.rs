//! Engine-side ("Runtime B") object model for the Trestle bridge.
//!
//! A tracing-garbage-collected object system: tagged values, a mark/sweep
//! heap with explicit rooted handles and collection-cycle hooks, the object
//! protocol (property access, calls, iteration), proxy trap handlers, and
//! the evaluator collaborator interface. The compiler/evaluator itself is
//! out of scope; it plugs in behind [`Evaluator`].

pub mod errors;
pub mod eval;
pub mod heap;
pub mod object;
pub mod protocol;
pub mod proxy;
pub mod value;

pub use errors::EngineError;
pub use eval::{Evaluator, Origin};
pub use heap::{Heap, ObjectId, RootId};
pub use object::{GcObject, NativeFn, Props};
pub use protocol::PropKey;
pub use proxy::ProxyHandler;
pub use value::{EngineKind, EngineValue, MAX_SAFE_INTEGER};
