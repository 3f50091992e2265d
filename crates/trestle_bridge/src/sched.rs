//! Deferred-callback scheduling across the boundary.
//!
//! Host-side surface: [`CallbackScheduler`] registers a callable with a
//! delay in seconds and hands back an [`AsyncHandle`]. Engine-side surface:
//! the `setTimeout`/`clearTimeout` globals, taking the delay in
//! milliseconds and using the handle's numeric id as the timer token.
//! Both post into the host run loop; nothing here spawns threads.

use std::time::Duration;

use trestle_engine::{EngineError, EngineValue, Heap, PropKey};
use trestle_host::{messages, FuncRef, HostError, HostValue};

use crate::context::BridgeRt;
use crate::factory::to_host;

/// Cancellation token for a registered deferred callback.
///
/// The numeric id is unique for the lifetime of the process, so a stale
/// handle can never cancel a later registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AsyncHandle {
    id: u64,
}

impl AsyncHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Host-facing registration surface over the run loop.
#[derive(Clone)]
pub struct CallbackScheduler {
    rt: BridgeRt,
}

impl CallbackScheduler {
    pub fn new(rt: &BridgeRt) -> Self {
        CallbackScheduler { rt: rt.clone() }
    }

    /// Schedule `callable(bound_args...)` after `delay_seconds`. Negative
    /// and non-finite delays clamp to zero. Non-callables are rejected.
    pub fn register(
        &self,
        callable: &HostValue,
        delay_seconds: f64,
        bound_args: &[HostValue],
    ) -> Result<AsyncHandle, HostError> {
        let HostValue::Func(job) = callable else {
            return Err(HostError::Type(messages::NOT_CALLABLE.to_string()));
        };
        // NaN and negative clamp to zero, oversized finite delays saturate.
        let delay = if delay_seconds > 0.0 {
            Duration::try_from_secs_f64(delay_seconds).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        let id = self
            .rt
            .run_loop
            .borrow_mut()
            .schedule(FuncRef::adopt(job), delay, bound_args.to_vec());
        tracing::debug!(id, delay_s = delay.as_secs_f64(), "deferred callback registered");
        Ok(AsyncHandle { id })
    }

    /// Cancel a pending registration. Unknown, already-fired and
    /// already-cancelled handles are silent no-ops.
    pub fn cancel(&self, handle: AsyncHandle) {
        self.cancel_id(handle.id);
    }

    pub fn cancel_id(&self, id: u64) {
        self.rt.run_loop.borrow_mut().cancel(id);
    }

    pub fn is_pending(&self, handle: AsyncHandle) -> bool {
        self.rt.run_loop.borrow().is_pending(handle.id)
    }

    pub fn pending_len(&self) -> usize {
        self.rt.run_loop.borrow().pending_len()
    }
}

/// Define `setTimeout` and `clearTimeout` on the engine's global object.
pub fn install_timer_globals(
    rt: &BridgeRt,
    heap: &mut Heap,
    globals: &EngineValue,
) -> Result<(), EngineError> {
    let sched = CallbackScheduler::new(rt);
    let set_rt = rt.clone();
    let set_sched = sched.clone();
    let set_timeout = heap.new_function("setTimeout", move |heap, args| {
        let job = args.first().cloned().unwrap_or(EngineValue::Undefined);
        if !job.is_function(heap) {
            return Err(EngineError::Type(
                "The first parameter to setTimeout() must be a function".into(),
            ));
        }
        // Delay is in milliseconds; omitted, non-numeric and negative
        // delays all clamp to zero.
        let delay_ms = match args.get(1) {
            Some(EngineValue::Num(n)) if n.is_finite() => n.max(0.0),
            _ => 0.0,
        };
        // The engine callable crosses as a host wrapper, so a pending timer
        // keeps it rooted until it fires.
        let host_job = to_host(&set_rt, heap, &job)?;
        let mut bound = Vec::new();
        for arg in args.iter().skip(2) {
            bound.push(to_host(&set_rt, heap, arg)?);
        }
        let handle = set_sched
            .register(&host_job, delay_ms / 1000.0, &bound)
            .map_err(|err| EngineError::Host(err.to_string()))?;
        Ok(EngineValue::Num(handle.id() as f64))
    });
    heap.set_prop(globals, &PropKey::str("setTimeout"), set_timeout)?;

    let clear_timeout = heap.new_function("clearTimeout", move |_heap, args| {
        // Anything that is not a live timer id silently does nothing.
        if let Some(EngineValue::Num(n)) = args.first() {
            if n.fract() == 0.0 && *n >= 0.0 && *n <= u64::MAX as f64 {
                sched.cancel_id(*n as u64);
            }
        }
        Ok(EngineValue::Undefined)
    });
    heap.set_prop(globals, &PropKey::str("clearTimeout"), clear_timeout)?;
    Ok(())
}
