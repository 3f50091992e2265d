//! Clock capability and the host's cooperative run loop.
//!
//! The run loop is a single-threaded task queue, not an OS timer: callers
//! pump it cooperatively. Tasks are popped with [`RunLoop::take_due`] so the
//! loop borrow is released before the job runs, which keeps cancellation
//! safe from inside another deferred callback.

use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::errors::HostError;
use crate::value::HostValue;
use crate::wrappers::FuncRef;

pub trait Clock {
    fn unix_millis(&self) -> i64;
    fn mono_micros(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    fn mono_micros(&self) -> i64 {
        static START: OnceLock<Instant> = OnceLock::new();
        let start = START.get_or_init(Instant::now);
        start.elapsed().as_micros() as i64
    }
}

/// Hand-driven clock for deterministic scheduling tests.
pub struct ManualClock {
    micros: Cell<i64>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock { micros: Cell::new(0) }
    }

    pub fn advance(&self, by: Duration) {
        self.micros.set(self.micros.get() + by.as_micros() as i64);
    }
}

impl Clock for ManualClock {
    fn unix_millis(&self) -> i64 {
        self.micros.get() / 1000
    }

    fn mono_micros(&self) -> i64 {
        self.micros.get()
    }
}

// Task ids are unique for the lifetime of the process and double as the
// externally visible cancellation token.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> u64 {
    NEXT_TASK_ID.fetch_add(1, AtomicOrdering::Relaxed)
}

/// A deferred callable popped off the run loop, ready to fire.
pub struct Task {
    pub id: u64,
    job: FuncRef,
    args: Vec<HostValue>,
}

impl Task {
    pub fn fire(self) -> Result<HostValue, HostError> {
        self.job.invoke(&self.args)
    }
}

struct Pending {
    fire_at: i64,
    seq: u64,
    task: Task,
}

// Min-ordering by (fire_at, seq) under std's max-heap.
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.fire_at, other.seq).cmp(&(self.fire_at, self.seq))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for Pending {}

/// Single-threaded cooperative run loop with delayed tasks.
pub struct RunLoop {
    clock: Rc<dyn Clock>,
    queue: BinaryHeap<Pending>,
    live: hashbrown::HashSet<u64, ahash::RandomState>,
    cancelled: hashbrown::HashSet<u64, ahash::RandomState>,
    seq: u64,
}

impl RunLoop {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        RunLoop {
            clock,
            queue: BinaryHeap::new(),
            live: hashbrown::HashSet::default(),
            cancelled: hashbrown::HashSet::default(),
            seq: 0,
        }
    }

    /// Schedule `job(args...)` after `delay`, returning the task id.
    /// Delays beyond the clock's range saturate rather than wrapping into
    /// the past.
    pub fn schedule(&mut self, job: FuncRef, delay: Duration, args: Vec<HostValue>) -> u64 {
        let id = next_task_id();
        let delay_us = i64::try_from(delay.as_micros()).unwrap_or(i64::MAX);
        let fire_at = self.clock.mono_micros().saturating_add(delay_us);
        self.seq += 1;
        self.live.insert(id);
        self.queue.push(Pending {
            fire_at,
            seq: self.seq,
            task: Task { id, job, args },
        });
        tracing::trace!(id, delay_us, "task scheduled");
        id
    }

    /// Cancel a pending task. Unknown and already-fired ids are no-ops.
    pub fn cancel(&mut self, id: u64) {
        if self.live.remove(&id) {
            self.cancelled.insert(id);
            tracing::trace!(id, "task cancelled");
        }
    }

    pub fn is_pending(&self, id: u64) -> bool {
        self.live.contains(&id)
    }

    pub fn pending_len(&self) -> usize {
        self.live.len()
    }

    /// Pop the next due, non-cancelled task without invoking it.
    pub fn take_due(&mut self) -> Option<Task> {
        let now = self.clock.mono_micros();
        while let Some(head) = self.queue.peek() {
            if head.fire_at > now {
                return None;
            }
            let pending = self.queue.pop().expect("peeked entry exists");
            if self.cancelled.remove(&pending.task.id) {
                continue;
            }
            self.live.remove(&pending.task.id);
            return Some(pending.task);
        }
        None
    }

    /// Fire every due task inline, returning how many ran. Job failures are
    /// reported and do not stop the pump.
    pub fn run_due(&mut self) -> usize {
        let mut fired = 0;
        while let Some(task) = self.take_due() {
            let id = task.id;
            if let Err(err) = task.fire() {
                tracing::warn!(id, %err, "deferred callback failed");
            }
            fired += 1;
        }
        fired
    }
}
