//! Tracing heap with explicit roots and collection-cycle hooks.

use crate::object::GcObject;
use crate::value::EngineValue;

/// Handle to a heap-allocated object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub usize);

/// A rooted-value handle: an explicit keep-alive registration that prevents
/// the collector from reclaiming the referenced value until unrooted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootId(pub usize);

/// Hook invoked once at the start of each collection pass, before marking.
pub type GcHook = Box<dyn FnMut(&mut Heap)>;

pub struct Heap {
    objects: Vec<Option<GcObject>>,
    free_list: Vec<usize>,
    marks: Vec<u64>,
    roots: Vec<Option<EngineValue>>,
    root_free: Vec<usize>,
    hooks: Vec<GcHook>,
    collecting: bool,
    alloc_count: usize,
    gc_threshold: usize,
    alloc_bytes: usize,
    gc_threshold_bytes: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self {
            objects: Vec::with_capacity(256),
            free_list: Vec::new(),
            marks: Vec::new(),
            roots: Vec::new(),
            root_free: Vec::new(),
            hooks: Vec::new(),
            collecting: false,
            alloc_count: 0,
            gc_threshold: 10000,
            alloc_bytes: 0,
            gc_threshold_bytes: 8 * 1024 * 1024,
        }
    }

    /// Allocate a managed object on the heap.
    pub fn alloc(&mut self, obj: GcObject) -> ObjectId {
        self.alloc_count += 1;
        self.alloc_bytes += obj.size();

        if let Some(id) = self.free_list.pop() {
            self.objects[id] = Some(obj);
            ObjectId(id)
        } else {
            let id = self.objects.len();
            self.objects.push(Some(obj));
            ObjectId(id)
        }
    }

    pub fn should_gc(&self) -> bool {
        self.alloc_count >= self.gc_threshold || self.alloc_bytes >= self.gc_threshold_bytes
    }

    pub fn get(&self, id: ObjectId) -> &GcObject {
        self.objects[id.0]
            .as_ref()
            .expect("object was garbage collected")
    }

    pub fn get_mut(&mut self, id: ObjectId) -> &mut GcObject {
        self.objects[id.0]
            .as_mut()
            .expect("object was garbage collected")
    }

    pub fn is_live(&self, id: ObjectId) -> bool {
        self.objects.get(id.0).is_some_and(|slot| slot.is_some())
    }

    pub fn live_count(&self) -> usize {
        self.objects.iter().filter(|slot| slot.is_some()).count()
    }

    // ------------------------------------------------------------------
    // Roots
    // ------------------------------------------------------------------

    /// Register `value` as a GC root. The value survives every collection
    /// pass until [`Heap::unroot`] destroys the handle.
    pub fn root(&mut self, value: EngineValue) -> RootId {
        if let Some(slot) = self.root_free.pop() {
            self.roots[slot] = Some(value);
            RootId(slot)
        } else {
            let slot = self.roots.len();
            self.roots.push(Some(value));
            RootId(slot)
        }
    }

    /// Destroy a rooted handle, releasing its keep-alive. Double-unroot is a
    /// no-op.
    pub fn unroot(&mut self, root: RootId) {
        if let Some(slot) = self.roots.get_mut(root.0) {
            if slot.take().is_some() {
                self.root_free.push(root.0);
            }
        }
    }

    pub fn root_value(&self, root: RootId) -> Option<EngineValue> {
        self.roots.get(root.0).and_then(|slot| slot.clone())
    }

    pub fn root_count(&self) -> usize {
        self.roots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Register a collection-cycle hook; it runs at the beginning of every
    /// pass, before any marking.
    pub fn add_gc_hook(&mut self, hook: GcHook) {
        self.hooks.push(hook);
    }

    /// Drop every object, root and hook unconditionally. Used at context
    /// teardown: heap objects may hold strong references back to the heap
    /// cell, and only emptying the slots breaks that cycle. All outstanding
    /// ids and root handles become invalid.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.free_list.clear();
        self.marks.clear();
        self.roots.clear();
        self.root_free.clear();
        self.hooks.clear();
        self.alloc_count = 0;
        self.alloc_bytes = 0;
    }

    // ------------------------------------------------------------------
    // Collection
    // ------------------------------------------------------------------

    /// Run one collection pass: cycle-begin hooks, then mark from roots,
    /// then sweep. Re-entrant calls (from inside a hook) are ignored.
    pub fn collect(&mut self) {
        if self.collecting {
            return;
        }
        self.collecting = true;

        // Hooks may unroot handles but must not allocate or nest a pass.
        let mut hooks = std::mem::take(&mut self.hooks);
        for hook in hooks.iter_mut() {
            hook(self);
        }
        hooks.extend(std::mem::take(&mut self.hooks));
        self.hooks = hooks;

        self.mark_from_roots();
        let swept = self.sweep();

        self.alloc_count = 0;
        self.alloc_bytes = 0;
        self.collecting = false;
        tracing::debug!(swept, live = self.live_count(), "collection pass finished");
    }

    fn is_marked(&self, id: usize) -> bool {
        let word = id >> 6;
        let bit = id & 63;
        self.marks.get(word).is_some_and(|w| (w & (1 << bit)) != 0)
    }

    fn set_mark(&mut self, id: usize) -> bool {
        let word = id >> 6;
        let bit = id & 63;
        if word >= self.marks.len() {
            self.marks.resize(word + 1, 0);
        }
        let w = &mut self.marks[word];
        let mask = 1 << bit;
        if (*w & mask) != 0 {
            return false;
        }
        *w |= mask;
        true
    }

    fn mark_from_roots(&mut self) {
        self.marks.clear();

        let mut pending: Vec<EngineValue> = self.roots.iter().flatten().cloned().collect();

        while let Some(value) = pending.pop() {
            let EngineValue::Obj(id) = value else {
                continue;
            };
            if id.0 >= self.objects.len() || !self.set_mark(id.0) {
                continue;
            }
            match &self.objects[id.0] {
                Some(GcObject::Object(props)) => {
                    for child in props.values() {
                        pending.push(child.clone());
                    }
                }
                Some(GcObject::Array(items)) => {
                    for child in items {
                        pending.push(child.clone());
                    }
                }
                Some(GcObject::Bound { target, bound }) => {
                    pending.push(target.clone());
                    for child in bound {
                        pending.push(child.clone());
                    }
                }
                Some(GcObject::Function(f)) => {
                    for child in &f.captures {
                        pending.push(child.clone());
                    }
                }
                Some(GcObject::Iterator(it)) => {
                    for child in &it.captures {
                        pending.push(child.clone());
                    }
                }
                // Opaque bodies: anything they reference must outlive them.
                Some(GcObject::Date(_)) | Some(GcObject::Proxy(_)) => {}
                None => {}
            }
        }
    }

    fn sweep(&mut self) -> usize {
        let mut swept = 0;
        for i in 0..self.objects.len() {
            if self.objects[i].is_some() && !self.is_marked(i) {
                self.objects[i] = None;
                self.free_list.push(i);
                swept += 1;
            }
        }
        swept
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
