//! Proxy trap capability interface.

use std::any::Any;

use crate::errors::EngineError;
use crate::heap::Heap;
use crate::protocol::PropKey;
use crate::value::EngineValue;

/// Trap handlers for a proxy object: one fixed capability table covering
/// property lookup, mutation, existence, own-key enumeration, length and
/// iteration. Implementations are backed by an injected accessor (the bridge
/// backs them with host containers) and must re-derive every answer from the
/// live backing store rather than caching.
pub trait ProxyHandler {
    fn get(&self, heap: &mut Heap, key: &PropKey) -> Result<EngineValue, EngineError>;
    fn set(&self, heap: &mut Heap, key: &PropKey, value: EngineValue) -> Result<(), EngineError>;
    fn has(&self, key: &PropKey) -> Result<bool, EngineError>;
    fn own_keys(&self) -> Result<Vec<PropKey>, EngineError>;
    fn length(&self) -> Result<Option<usize>, EngineError>;
    /// Mint a fresh, independent default iterator over the backing store.
    fn iterate(&self, heap: &mut Heap) -> Result<EngineValue, EngineError>;
    /// Concrete-type escape hatch, letting an embedder recover the handler
    /// it installed (and through it the backing store) from a proxy value.
    fn as_any(&self) -> &dyn Any;
}
