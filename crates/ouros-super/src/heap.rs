use std::{cell::Cell, collections::BTreeMap, marker::PhantomData, mem::ManuallyDrop};

use crate::{
    resource::{DEFAULT_GC_INTERVAL, ResourceError, ResourceTracker},
    types::{
        BoundMethod, ClassMethod, ClassObject, Function, HostDescriptor, Instance, Property, PyTrait, StaticMethod,
        SuperProxy,
    },
    value::Value,
};

/// Snapshot of heap state at a point in time.
///
/// The `objects_by_type` map uses `BTreeMap` for deterministic iteration order,
/// making snapshots suitable for display and comparison without sort overhead.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct HeapStats {
    /// Total number of live objects on the heap.
    pub live_objects: usize,
    /// Number of free (recycled) slots available for reuse.
    pub free_slots: usize,
    /// Total heap capacity (live + free).
    pub total_slots: usize,
    /// Breakdown of live objects by `HeapData` variant name.
    ///
    /// Keys are static variant names (e.g., "SuperProxy", "Instance", "ClassObject").
    pub objects_by_type: BTreeMap<&'static str, usize>,
    /// Number of dynamically interned strings in the runtime's interner.
    pub interned_strings: usize,
    /// Resource tracker allocation count, if using `LimitedTracker`.
    pub tracker_allocations: Option<usize>,
    /// Resource tracker memory usage in bytes, if using `LimitedTracker`.
    pub tracker_memory_bytes: Option<usize>,
}

impl HeapStats {
    /// Number of live objects of the given kind, zero when none are alive.
    #[must_use]
    pub fn count_of(&self, kind: &str) -> usize {
        self.objects_by_type.get(kind).copied().unwrap_or(0)
    }
}

/// Unique identifier for values stored inside the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct HeapId(usize);

impl HeapId {
    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// HeapData captures every runtime object that must live in the arena.
///
/// The variant name doubles as the kind reported by [`HeapStats`].
#[derive(Debug, strum::IntoStaticStr)]
pub(crate) enum HeapData {
    Str(String),
    ClassObject(ClassObject),
    Instance(Instance),
    SuperProxy(SuperProxy),
    Function(Function),
    BoundMethod(BoundMethod),
    StaticMethod(StaticMethod),
    ClassMethod(ClassMethod),
    Property(Property),
    HostDescriptor(HostDescriptor),
}

impl HeapData {
    fn py_estimate_size(&self) -> usize {
        match self {
            Self::Str(s) => std::mem::size_of::<String>() + s.len(),
            Self::ClassObject(cls) => cls.py_estimate_size(),
            Self::Instance(inst) => inst.py_estimate_size(),
            Self::SuperProxy(proxy) => proxy.py_estimate_size(),
            Self::Function(func) => func.py_estimate_size(),
            Self::BoundMethod(method) => method.py_estimate_size(),
            Self::StaticMethod(method) => method.py_estimate_size(),
            Self::ClassMethod(method) => method.py_estimate_size(),
            Self::Property(prop) => prop.py_estimate_size(),
            Self::HostDescriptor(desc) => desc.py_estimate_size(),
        }
    }

    /// Pushes the ids of every heap entry this object holds a share of.
    ///
    /// Used both when the object is freed (each id is dec_ref'd once) and by the
    /// cycle collector's mark phase.
    fn py_ref_ids(&self, stack: &mut Vec<HeapId>) {
        match self {
            Self::Str(_) => {}
            Self::ClassObject(cls) => cls.py_ref_ids(stack),
            Self::Instance(inst) => inst.py_ref_ids(stack),
            Self::SuperProxy(proxy) => proxy.py_ref_ids(stack),
            Self::Function(func) => func.py_ref_ids(stack),
            Self::BoundMethod(method) => method.py_ref_ids(stack),
            Self::StaticMethod(method) => method.py_ref_ids(stack),
            Self::ClassMethod(method) => method.py_ref_ids(stack),
            Self::Property(prop) => prop.py_ref_ids(stack),
            Self::HostDescriptor(desc) => desc.py_ref_ids(stack),
        }
    }

    fn has_refs(&self) -> bool {
        !matches!(self, Self::Str(_) | Self::Function(_) | Self::HostDescriptor(_))
    }
}

/// A single entry inside the heap arena.
///
/// The refcount uses `Cell` so shares can be taken through `&Heap`, which keeps MRO
/// scans and attribute lookups free of borrow conflicts.
#[derive(Debug)]
struct HeapValue {
    refcount: Cell<usize>,
    data: HeapData,
}

/// Reference-counted arena that backs all heap-only runtime values.
///
/// Uses a free list to reuse slots from freed values. When a value is freed via
/// `dec_ref`, its slot ID is added to the free list; new allocations pop from the
/// free list when available, otherwise append.
///
/// Generic over `T: ResourceTracker` to support different resource tracking strategies.
/// When `T = NoLimitTracker` (the default), all resource checks compile away to no-ops.
#[derive(Debug)]
pub(crate) struct Heap<T: ResourceTracker> {
    entries: Vec<Option<HeapValue>>,
    /// IDs of freed slots available for reuse. Populated by `dec_ref`, consumed by `allocate`.
    free_list: Vec<HeapId>,
    /// Resource tracker for enforcing limits and scheduling GC.
    tracker: T,
    /// True if reference cycles may exist. Set when an object holding refs is allocated
    /// or mutated, cleared after GC completes.
    may_have_cycles: bool,
    /// Number of allocations since the last GC.
    allocations_since_gc: usize,
}

impl<T: ResourceTracker> Heap<T> {
    /// Creates a new heap with the given initial capacity and resource tracker.
    pub fn new(capacity: usize, tracker: T) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            tracker,
            may_have_cycles: false,
            allocations_since_gc: 0,
        }
    }

    /// Allocates a new heap entry with a refcount of one, owned by the caller.
    ///
    /// Returns `Err(ResourceError)` if allocation would exceed configured limits. On
    /// failure the shares held by `data` are released, so callers can hand over
    /// owned children unconditionally.
    pub fn allocate(&mut self, data: HeapData) -> Result<HeapId, ResourceError> {
        if let Err(err) = self.tracker.on_allocate(|| data.py_estimate_size()) {
            let mut child_ids = Vec::new();
            data.py_ref_ids(&mut child_ids);
            drop(data);
            for child_id in child_ids {
                self.dec_ref(child_id);
            }
            return Err(err);
        }
        self.allocations_since_gc = self.allocations_since_gc.wrapping_add(1);
        if data.has_refs() {
            self.may_have_cycles = true;
        }

        let new_entry = HeapValue {
            refcount: Cell::new(1),
            data,
        };

        let id = if let Some(id) = self.free_list.pop() {
            self.entries[id.index()] = Some(new_entry);
            id
        } else {
            let id = HeapId(self.entries.len());
            self.entries.push(Some(new_entry));
            id
        };
        Ok(id)
    }

    /// Increments the reference count for an existing heap entry.
    ///
    /// # Panics
    /// Panics if the value ID is invalid or the value has already been freed.
    pub fn inc_ref(&self, id: HeapId) {
        let value = self.entry(id, "Heap::inc_ref");
        value.refcount.set(value.refcount.get() + 1);
    }

    /// Decrements the reference count and frees the value (plus children) once it hits zero.
    ///
    /// Children are released recursively after the entry's slot has been vacated, so
    /// a child whose release frees further objects never observes a half-dead parent.
    ///
    /// # Panics
    /// Panics if the value ID is invalid or the value has already been freed.
    pub fn dec_ref(&mut self, id: HeapId) {
        let value = {
            let slot = self.entries.get_mut(id.index()).expect("Heap::dec_ref: slot missing");
            let entry = slot.as_mut().expect("Heap::dec_ref: object already freed");
            let count = entry.refcount.get();
            if count > 1 {
                entry.refcount.set(count - 1);
                return;
            }
            slot.take().expect("Heap::dec_ref: object already freed")
        };

        self.free_list.push(id);
        self.tracker.on_free(|| value.data.py_estimate_size());

        let mut child_ids = Vec::new();
        value.data.py_ref_ids(&mut child_ids);
        drop(value);
        for child_id in child_ids {
            self.dec_ref(child_id);
        }
    }

    fn entry(&self, id: HeapId, caller: &str) -> &HeapValue {
        match self.entries.get(id.index()) {
            Some(Some(value)) => value,
            Some(None) => panic!("{caller}: object already freed"),
            None => panic!("{caller}: slot missing"),
        }
    }

    /// Returns an immutable reference to the heap data stored at the given ID.
    ///
    /// # Panics
    /// Panics if the value ID is invalid or the value has already been freed.
    #[must_use]
    pub fn get(&self, id: HeapId) -> &HeapData {
        &self.entry(id, "Heap::get").data
    }

    /// Returns a mutable reference to the heap data stored at the given ID.
    ///
    /// # Panics
    /// Panics if the value ID is invalid or the value has already been freed.
    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        match self.entries.get_mut(id.index()) {
            Some(Some(value)) => &mut value.data,
            Some(None) => panic!("Heap::get_mut: object already freed"),
            None => panic!("Heap::get_mut: slot missing"),
        }
    }

    /// Returns the heap data if the entry is still alive.
    #[must_use]
    pub fn get_if_live(&self, id: HeapId) -> Option<&HeapData> {
        self.entries.get(id.index()).and_then(Option::as_ref).map(|value| &value.data)
    }

    #[must_use]
    pub fn is_live(&self, id: HeapId) -> bool {
        self.get_if_live(id).is_some()
    }

    /// Returns the reference count for the heap entry at the given ID.
    ///
    /// # Panics
    /// Panics if the value ID is invalid or the value has already been freed.
    #[must_use]
    pub fn get_refcount(&self, id: HeapId) -> usize {
        self.entry(id, "Heap::get_refcount").refcount.get()
    }

    /// Returns the ids of every heap entry the given object holds a share of.
    #[must_use]
    pub fn ref_ids_of(&self, id: HeapId) -> Vec<HeapId> {
        let mut ids = Vec::new();
        self.get(id).py_ref_ids(&mut ids);
        ids
    }

    /// Records that a mutation may have introduced a reference cycle.
    pub fn mark_potential_cycle(&mut self) {
        self.may_have_cycles = true;
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Returns whether enough allocations happened since the last collection for
    /// a cycle collection to be worthwhile.
    #[must_use]
    pub fn should_gc(&self) -> bool {
        self.may_have_cycles && self.allocations_since_gc >= self.tracker.gc_interval().unwrap_or(DEFAULT_GC_INTERVAL)
    }

    /// Ids of the entries referenced from outside the heap.
    fn external_roots(&self) -> Vec<HeapId> {
        let mut incoming = vec![0usize; self.entries.len()];
        let mut children = Vec::new();
        for entry in self.entries.iter().flatten() {
            children.clear();
            entry.data.py_ref_ids(&mut children);
            for child in &children {
                incoming[child.index()] += 1;
            }
        }
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                slot.as_ref()
                    .filter(|entry| entry.refcount.get() > incoming[idx])
                    .map(|_| HeapId(idx))
            })
            .collect()
    }

    /// Returns a snapshot of the heap's current state.
    #[must_use]
    pub fn heap_stats(&self, interned_strings: usize) -> HeapStats {
        let mut objects_by_type = BTreeMap::new();
        let mut live_objects = 0;
        for value in self.entries.iter().flatten() {
            live_objects += 1;
            let kind: &'static str = (&value.data).into();
            *objects_by_type.entry(kind).or_insert(0) += 1;
        }
        HeapStats {
            live_objects,
            free_slots: self.free_list.len(),
            total_slots: self.entries.len(),
            objects_by_type,
            interned_strings,
            tracker_allocations: self.tracker.allocation_count(),
            tracker_memory_bytes: self.tracker.current_memory_bytes(),
        }
    }

    /// Runs mark-sweep garbage collection to free unreachable cycles.
    ///
    /// Roots are found from the reference counts: an entry whose count exceeds the
    /// number of references it receives from other heap entries is held from
    /// outside the heap (a host value, a share held across a call) and must
    /// survive. Everything reachable from the roots through each object's
    /// reference traversal is kept, every other entry is freed. References that
    /// swept objects hold to surviving objects are released, so survivors end with
    /// the counts they would have had if the garbage had been freed by reference
    /// counting.
    ///
    /// Returns the number of freed entries.
    pub fn collect_garbage(&mut self) -> usize {
        let mut work_list = self.external_roots();
        let mut reachable: Vec<bool> = vec![false; self.entries.len()];

        while let Some(id) = work_list.pop() {
            let idx = id.index();
            if idx >= reachable.len() || reachable[idx] {
                continue;
            }
            reachable[idx] = true;
            if let Some(Some(entry)) = self.entries.get(idx) {
                entry.data.py_ref_ids(&mut work_list);
            }
        }

        // sweep: vacate every unreachable slot first, then settle outgoing references
        let mut outgoing = Vec::new();
        let mut freed = 0;
        for (idx, slot) in self.entries.iter_mut().enumerate() {
            if reachable[idx] {
                continue;
            }
            if let Some(value) = slot.take() {
                self.tracker.on_free(|| value.data.py_estimate_size());
                value.data.py_ref_ids(&mut outgoing);
                self.free_list.push(HeapId(idx));
                freed += 1;
            }
        }
        for id in outgoing {
            if self.is_live(id) {
                self.dec_ref(id);
            }
        }

        self.may_have_cycles = false;
        self.allocations_since_gc = 0;
        freed
    }
}

/// Types that give access to a heap, so cleanup helpers work both on a bare
/// [`Heap`] and on the runtime that owns one.
pub(crate) trait ContainsHeap<T: ResourceTracker> {
    fn heap_mut(&mut self) -> &mut Heap<T>;
}

impl<T: ResourceTracker> ContainsHeap<T> for Heap<T> {
    #[inline]
    fn heap_mut(&mut self) -> &mut Self {
        self
    }
}

/// Trait for types that require heap access for proper cleanup.
///
/// Rust's standard `Drop` trait cannot decrement heap reference counts because it has no
/// access to the `Heap`. This trait provides an explicit drop-with-heap method so that
/// ref-counted values (and containers of them) can properly decrement their counts when
/// they are no longer needed.
///
/// **All types implementing this trait must be cleaned up on every code path.** A missed
/// call on any branch leaks reference counts. Prefer [`defer_drop!`] or [`HeapGuard`] to
/// guarantee cleanup automatically.
pub(crate) trait DropWithHeap<T: ResourceTracker> {
    /// Consume `self` and decrement reference counts for any heap-allocated values contained within.
    fn drop_with_heap(self, heap: &mut Heap<T>);
}

impl<T: ResourceTracker> DropWithHeap<T> for Value {
    #[inline]
    fn drop_with_heap(self, heap: &mut Heap<T>) {
        Self::drop_with_heap(self, heap);
    }
}

impl<T: ResourceTracker, U: DropWithHeap<T>> DropWithHeap<T> for Option<U> {
    #[inline]
    fn drop_with_heap(self, heap: &mut Heap<T>) {
        if let Some(value) = self {
            value.drop_with_heap(heap);
        }
    }
}

/// RAII guard that ensures a [`DropWithHeap`] value is cleaned up on every code path.
///
/// The guard's `Drop` impl calls [`DropWithHeap::drop_with_heap`] automatically, so
/// cleanup happens whether the scope exits normally, via `?`, or any other branch.
///
/// On the normal path, the guarded value is borrowed via [`as_parts`](Self::as_parts).
pub(crate) struct HeapGuard<'a, T: ResourceTracker, H: ContainsHeap<T>, V: DropWithHeap<T>> {
    // manually dropped because it needs to be dropped by move.
    value: ManuallyDrop<V>,
    heap: &'a mut H,
    _tracker: PhantomData<T>,
}

impl<'a, T: ResourceTracker, H: ContainsHeap<T>, V: DropWithHeap<T>> HeapGuard<'a, T, H, V> {
    /// Creates a new `HeapGuard` for the given value and heap.
    #[inline]
    pub fn new(value: V, heap: &'a mut H) -> Self {
        Self {
            value: ManuallyDrop::new(value),
            heap,
            _tracker: PhantomData,
        }
    }

    /// Borrows the value (immutably) and heap (mutably) out of the guard.
    ///
    /// This is what [`defer_drop!`] calls internally.
    #[inline]
    pub fn as_parts(&mut self) -> (&V, &mut H) {
        (&self.value, self.heap)
    }
}

impl<T: ResourceTracker, H: ContainsHeap<T>, V: DropWithHeap<T>> Drop for HeapGuard<'_, T, H, V> {
    fn drop(&mut self) {
        // SAFETY: value is never manually dropped until this point
        unsafe { ManuallyDrop::take(&mut self.value) }.drop_with_heap(self.heap.heap_mut());
    }
}

/// The preferred way to ensure a [`DropWithHeap`] value is cleaned up on every code path.
///
/// Creates a [`HeapGuard`] and immediately rebinds `$value` as `&V` and `$heap` as
/// `&mut H` via [`HeapGuard::as_parts`]. The original owned value is moved into the
/// guard, which will call [`DropWithHeap::drop_with_heap`] when scope exits.
///
/// # Limitation
///
/// The macro rebinds `$heap` as a new `let` binding, so it cannot be used when `$heap`
/// is `self`. In `&mut self` methods, first assign `let this = self;` and pass `this`.
#[macro_export]
macro_rules! defer_drop {
    ($value:ident, $heap:ident) => {
        let mut _guard = $crate::heap::HeapGuard::new($value, $heap);
        #[allow(
            clippy::allow_attributes,
            reason = "the reborrowed parts may not both be used in every case, so allow unused vars to avoid warnings"
        )]
        #[allow(unused_variables)]
        let ($value, $heap) = _guard.as_parts();
    };
}
