//! The bridge context: shared runtime state and the embedder-facing entry
//! points.

use std::cell::RefCell;
use std::rc::Rc;

use trestle_engine::{EngineError, EngineValue, Evaluator, Heap, Origin, Props, RootId};
use trestle_host::{Clock, HostError, HostValue, RunLoop, SystemClock};

use crate::factory;
use crate::liveness::LivenessTable;
use crate::sched::{install_timer_globals, CallbackScheduler};

/// Renders engine-level failures into host-level ones at the boundary.
pub trait TranslateError {
    fn translate(&self, err: &EngineError) -> HostError;
}

pub struct DefaultTranslator;

impl TranslateError for DefaultTranslator {
    fn translate(&self, err: &EngineError) -> HostError {
        HostError::Engine(err.to_string())
    }
}

/// Shared bridge runtime state, cloned into every trampoline and proxy.
///
/// Interior mutability note: `heap` is borrowed mutably for the duration of
/// any engine entry, so host-to-engine trampolines take it with
/// `try_borrow_mut` and report a call-boundary error on re-entrancy rather
/// than aborting.
#[derive(Clone)]
pub struct BridgeRt {
    pub heap: Rc<RefCell<Heap>>,
    pub liveness: Rc<RefCell<LivenessTable>>,
    pub run_loop: Rc<RefCell<RunLoop>>,
    pub translator: Rc<dyn TranslateError>,
}

/// One embedded engine plus everything shared across the boundary: the
/// traced heap, the liveness table, the run loop and the global object.
pub struct Bridge {
    rt: BridgeRt,
    evaluator: Box<dyn Evaluator>,
    scheduler: CallbackScheduler,
    globals: RootId,
}

impl Bridge {
    /// Build a context over the system clock. Initialization is stepwise
    /// and fallible; on failure nothing reachable is left behind.
    pub fn new(evaluator: Box<dyn Evaluator>) -> Result<Bridge, HostError> {
        Bridge::with_clock(evaluator, Rc::new(SystemClock))
    }

    pub fn with_clock(
        evaluator: Box<dyn Evaluator>,
        clock: Rc<dyn Clock>,
    ) -> Result<Bridge, HostError> {
        let rt = BridgeRt {
            heap: Rc::new(RefCell::new(Heap::new())),
            liveness: Rc::new(RefCell::new(LivenessTable::new())),
            run_loop: Rc::new(RefCell::new(RunLoop::new(clock))),
            translator: Rc::new(DefaultTranslator),
        };
        let scheduler = CallbackScheduler::new(&rt);

        let globals = {
            let mut heap = rt.heap.borrow_mut();
            let globals = heap.new_object(Props::default());
            let root = heap.root(globals.clone());
            install_timer_globals(&rt, &mut heap, &globals)
                .map_err(|err| HostError::Init(format!("could not define timer globals: {err}")))?;

            // The liveness table participates in every collection pass.
            let liveness = Rc::clone(&rt.liveness);
            heap.add_gc_hook(Box::new(move |heap| {
                liveness.borrow_mut().on_collection_cycle_begin(heap);
            }));
            root
        };

        tracing::debug!("bridge context initialized");
        Ok(Bridge {
            rt,
            evaluator,
            scheduler,
            globals,
        })
    }

    pub fn rt(&self) -> &BridgeRt {
        &self.rt
    }

    pub fn scheduler(&self) -> &CallbackScheduler {
        &self.scheduler
    }

    /// The engine's global object. Rooted for the context's lifetime.
    pub fn globals(&self) -> EngineValue {
        self.rt
            .heap
            .borrow()
            .root_value(self.globals)
            .expect("globals stay rooted for the context lifetime")
    }

    /// Evaluate engine source and convert the completion value to a host
    /// value. Engine failures come back translated, never panicking.
    pub fn eval(&mut self, source: &str, origin: &Origin) -> Result<HostValue, HostError> {
        let globals = self.globals();
        let mut heap = self.rt.heap.borrow_mut();
        let value = self
            .evaluator
            .eval(&mut heap, &globals, source, origin)
            .map_err(|err| self.rt.translator.translate(&err))?;
        // Conversion roots any callables in the result, so the completion
        // value survives later collection passes.
        factory::to_host(&self.rt, &mut heap, &value)
            .map_err(|err| self.rt.translator.translate(&err))
    }

    /// Convert a host value for engine consumption.
    pub fn to_engine_value(&self, value: &HostValue) -> Result<EngineValue, HostError> {
        let mut heap = self.rt.heap.borrow_mut();
        factory::to_engine(&self.rt, &mut heap, value)
            .map_err(|err| self.rt.translator.translate(&err))
    }

    /// Convert an engine value for host consumption.
    pub fn to_host_value(&self, value: &EngineValue) -> Result<HostValue, HostError> {
        let mut heap = self.rt.heap.borrow_mut();
        factory::to_host(&self.rt, &mut heap, value)
            .map_err(|err| self.rt.translator.translate(&err))
    }

    /// Run one collection pass (cycle hooks, mark, sweep).
    pub fn collect(&mut self) {
        self.rt.heap.borrow_mut().collect();
    }

    /// Fire every due deferred callback, returning how many ran. Tasks are
    /// taken off the loop before firing, so callbacks may schedule and
    /// cancel freely.
    pub fn run_pending(&mut self) -> usize {
        let mut fired = 0;
        loop {
            let task = self.rt.run_loop.borrow_mut().take_due();
            let Some(task) = task else { break };
            let id = task.id;
            if let Err(err) = task.fire() {
                tracing::warn!(id, %err, "deferred callback failed");
            }
            fired += 1;
        }
        fired
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        // Teardown in reverse acquisition order: globals root first, then
        // every liveness-held root, then the heap's objects. Trampolines
        // and timer globals living on the heap hold runtime-state clones
        // (and through them the heap cell itself), so the slots must be
        // emptied here or the heap would keep itself alive.
        let mut heap = self.rt.heap.borrow_mut();
        heap.unroot(self.globals);
        self.rt.liveness.borrow_mut().release_all(&mut heap);
        heap.clear();
        tracing::debug!("bridge context torn down");
    }
}
