//! The `super` proxy object.
//!
//! A proxy records three things:
//!
//! | Field | Python name | Meaning |
//! |-------|-------------|---------|
//! | `this_type` | `__thisclass__` | the reference class; lookups start strictly after it in the MRO |
//! | `binding.obj` | `__self__` | the object lookups are performed on behalf of |
//! | `binding.obj_type` | `__self_class__` | the type whose MRO is scanned |
//!
//! The object and its type are present or absent together, which the
//! `Option<SuperBound>` encodes directly. The proxy holds one share of each present
//! field. A proxy whose runtime type is a user subclass of `super` additionally
//! holds a share of that subclass, like any other object header would.

use crate::{
    heap::{DropWithHeap, Heap, HeapId},
    resource::ResourceTracker,
    types::PyTrait,
    value::Value,
};

/// How a proxy is bound, as reported by introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuperBinding {
    /// `super(C)`: no object, attribute lookups fall back to the proxy itself.
    Unbound,
    /// `super(C, obj)` where `obj` is an instance of a subclass of `C`.
    Instance,
    /// `super(C, D)` where `D` is `C` or a subclass: class-level usage, descriptors
    /// found through the proxy are invoked without an instance.
    Type,
}

/// The bound half of a proxy: the object and the type whose MRO is scanned.
#[derive(Debug)]
pub(crate) struct SuperBound {
    /// The object lookups are performed on behalf of (owned share).
    pub obj: Value,
    /// Either `obj` itself (class-bound) or a class of which `obj` is an instance
    /// (owned share). Always `this_type` or one of its subclasses.
    pub obj_type: HeapId,
}

impl<T: ResourceTracker> DropWithHeap<T> for SuperBound {
    fn drop_with_heap(self, heap: &mut Heap<T>) {
        self.obj.drop_with_heap(heap);
        heap.dec_ref(self.obj_type);
    }
}

impl SuperBound {
    /// Whether the proxy is bound to a class rather than an instance.
    #[must_use]
    pub fn is_class_bound(&self) -> bool {
        self.obj.ref_id() == Some(self.obj_type)
    }
}

#[derive(Debug)]
pub(crate) struct SuperProxy {
    /// The reference class (owned share).
    this_type: HeapId,
    binding: Option<SuperBound>,
    /// Runtime type when it is a user subclass of `super` (owned share).
    /// `None` for instances of `super` itself.
    subtype: Option<HeapId>,
}

impl SuperProxy {
    /// Creates a proxy; every id and value passed in must carry a share for the proxy.
    #[must_use]
    pub fn new(this_type: HeapId, binding: Option<SuperBound>, subtype: Option<HeapId>) -> Self {
        Self {
            this_type,
            binding,
            subtype,
        }
    }

    #[must_use]
    pub fn this_type(&self) -> HeapId {
        self.this_type
    }

    #[must_use]
    pub fn binding(&self) -> Option<&SuperBound> {
        self.binding.as_ref()
    }

    #[must_use]
    pub fn obj(&self) -> Option<&Value> {
        self.binding.as_ref().map(|bound| &bound.obj)
    }

    #[must_use]
    pub fn obj_type(&self) -> Option<HeapId> {
        self.binding.as_ref().map(|bound| bound.obj_type)
    }

    #[must_use]
    pub fn subtype(&self) -> Option<HeapId> {
        self.subtype
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    #[must_use]
    pub fn binding_kind(&self) -> SuperBinding {
        match &self.binding {
            None => SuperBinding::Unbound,
            Some(bound) if bound.is_class_bound() => SuperBinding::Type,
            Some(_) => SuperBinding::Instance,
        }
    }

    /// Swaps in new fields and hands back the old ones.
    ///
    /// The new fields must already carry their shares; the caller releases the
    /// returned fields only after this call, so the proxy is never observed with
    /// released fields.
    #[must_use]
    pub fn replace_fields(&mut self, this_type: HeapId, binding: Option<SuperBound>) -> (HeapId, Option<SuperBound>) {
        let old_type = std::mem::replace(&mut self.this_type, this_type);
        let old_binding = std::mem::replace(&mut self.binding, binding);
        (old_type, old_binding)
    }

    /// Offers the three fields to `visit`, in the order reference class, bound
    /// object, bound type.
    ///
    /// Exactly three calls are made for every proxy. Absent fields, and bound
    /// objects that are immediates rather than heap entries, are offered as `None`.
    pub fn traverse(&self, mut visit: impl FnMut(Option<HeapId>)) {
        visit(Some(self.this_type));
        visit(self.binding.as_ref().and_then(|bound| bound.obj.ref_id()));
        visit(self.binding.as_ref().map(|bound| bound.obj_type));
    }
}

impl PyTrait for SuperProxy {
    fn py_estimate_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn py_ref_ids(&self, stack: &mut Vec<HeapId>) {
        self.traverse(|field| stack.extend(field));
        stack.extend(self.subtype);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{heap::HeapData, resource::NoLimitTracker};

    fn class_id(heap: &mut Heap<NoLimitTracker>) -> HeapId {
        heap.allocate(HeapData::Str("cls".to_owned())).unwrap()
    }

    #[test]
    fn traverse_visits_three_fields_when_bound() {
        let mut heap = Heap::new(8, NoLimitTracker);
        let this_type = class_id(&mut heap);
        let obj = class_id(&mut heap);
        let obj_type = class_id(&mut heap);
        let proxy = SuperProxy::new(
            this_type,
            Some(SuperBound {
                obj: Value::Ref(obj),
                obj_type,
            }),
            None,
        );
        let mut seen = Vec::new();
        proxy.traverse(|field| seen.push(field));
        assert_eq!(seen, vec![Some(this_type), Some(obj), Some(obj_type)]);
        assert_eq!(proxy.binding_kind(), SuperBinding::Instance);
    }

    #[test]
    fn traverse_offers_absent_fields_as_none() {
        let mut heap = Heap::new(8, NoLimitTracker);
        let this_type = class_id(&mut heap);
        let proxy = SuperProxy::new(this_type, None, None);
        let mut seen = Vec::new();
        proxy.traverse(|field| seen.push(field));
        assert_eq!(seen, vec![Some(this_type), None, None]);

        let mut ids = Vec::new();
        proxy.py_ref_ids(&mut ids);
        assert_eq!(ids, vec![this_type], "unbound proxy owns only its reference class");
    }

    #[test]
    fn class_bound_proxy_reports_type_binding() {
        let mut heap = Heap::new(8, NoLimitTracker);
        let this_type = class_id(&mut heap);
        let derived = class_id(&mut heap);
        let proxy = SuperProxy::new(
            this_type,
            Some(SuperBound {
                obj: Value::Ref(derived),
                obj_type: derived,
            }),
            None,
        );
        assert_eq!(proxy.binding_kind(), SuperBinding::Type);
    }

    #[test]
    fn subtype_header_is_owned_in_addition_to_fields() {
        let mut heap = Heap::new(8, NoLimitTracker);
        let this_type = class_id(&mut heap);
        let subtype = class_id(&mut heap);
        let proxy = SuperProxy::new(this_type, None, Some(subtype));
        let mut ids = Vec::new();
        proxy.py_ref_ids(&mut ids);
        assert_eq!(ids, vec![this_type, subtype]);
    }
}
