use crate::{
    builtins::Builtins,
    heap::{Heap, HeapId},
    intern::StringId,
    resource::ResourceTracker,
    types::MemberDescriptor,
};

/// Primary value type representing Python objects at runtime.
///
/// Immediate values (None, bools, ints, interned strings, native methods and
/// member descriptors) are stored inline. Everything else lives in the heap arena
/// and is referenced by `Ref(HeapId)`.
///
/// NOTE: `Clone` is intentionally NOT derived. A `Ref` holds one share of the
/// referenced heap entry, so copies must go through `clone_with_heap()` and
/// disposal through `drop_with_heap()` to keep reference counts right.
#[derive(Debug)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    InternString(StringId),
    /// A native method of one of the builtin classes.
    Builtin(Builtins),
    /// A read-only member of a builtin class (`__class__`, `__thisclass__`, ...).
    Member(MemberDescriptor),
    Ref(HeapId),
}

impl Value {
    /// Clones this value, taking a new share of heap-backed values.
    #[must_use]
    pub(crate) fn clone_with_heap(&self, heap: &Heap<impl ResourceTracker>) -> Self {
        if let Self::Ref(id) = self {
            heap.inc_ref(*id);
        }
        self.copy_for_extend()
    }

    /// Bitwise copy of the value without touching reference counts.
    ///
    /// Only sound when the caller balances the count itself, e.g. right after an
    /// explicit `inc_ref` or when the copy is used for identity checks only.
    #[must_use]
    pub(crate) fn copy_for_extend(&self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Bool(b) => Self::Bool(*b),
            Self::Int(i) => Self::Int(*i),
            Self::InternString(id) => Self::InternString(*id),
            Self::Builtin(b) => Self::Builtin(*b),
            Self::Member(m) => Self::Member(*m),
            Self::Ref(id) => Self::Ref(*id),
        }
    }

    /// Releases this value's share of its heap entry, if any.
    #[inline]
    pub(crate) fn drop_with_heap(self, heap: &mut Heap<impl ResourceTracker>) {
        if let Self::Ref(id) = self {
            heap.dec_ref(id);
        }
    }

    /// Returns the heap id for heap-backed values.
    #[inline]
    #[must_use]
    pub fn ref_id(&self) -> Option<HeapId> {
        match self {
            Self::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// Python identity (`is`): same heap entry, or equal immediates.
    #[must_use]
    pub fn is(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Ref(a), Self::Ref(b)) => a == b,
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::InternString(a), Self::InternString(b)) => a == b,
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Member(a), Self::Member(b)) => a == b,
            _ => false,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
