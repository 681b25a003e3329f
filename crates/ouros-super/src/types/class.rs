use indexmap::IndexMap;

use crate::{heap::HeapId, intern::StringId, types::PyTrait, value::Value};

/// A Python class object.
///
/// Contains the class name, the linearized MRO and a namespace holding class
/// attributes and method definitions. The MRO is supplied by whoever creates the
/// class; linearization is not this crate's concern.
///
/// Ownership: the class holds a share of every MRO entry after itself (which
/// covers all bases) and of every namespace value.
#[derive(Debug)]
pub(crate) struct ClassObject {
    /// The class name (e.g., "Base", "Derived").
    name: String,
    /// Class namespace, keys are interned attribute names.
    namespace: IndexMap<StringId, Value>,
    /// Method Resolution Order, most-derived first.
    /// `mro[0]` is this class itself once the class has been allocated.
    mro: Vec<HeapId>,
    /// Whether `mro[0]` is the class's own (unowned) id.
    has_self_id: bool,
}

impl ClassObject {
    /// Creates a class whose MRO is `ancestors` preceded by itself.
    ///
    /// The caller must own one share of each ancestor for the new class, and must
    /// call [`set_self_id`](Self::set_self_id) right after allocating it.
    #[must_use]
    pub fn new(name: impl Into<String>, ancestors: Vec<HeapId>) -> Self {
        Self {
            name: name.into(),
            namespace: IndexMap::new(),
            mro: ancestors,
            has_self_id: false,
        }
    }

    /// Records the class's own heap id as the head of its MRO.
    pub fn set_self_id(&mut self, id: HeapId) {
        self.mro.insert(0, id);
        self.has_self_id = true;
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn mro(&self) -> &[HeapId] {
        &self.mro
    }

    /// Whether `other` appears in this class's MRO (including the class itself).
    #[must_use]
    pub fn is_subclass_of(&self, other: HeapId) -> bool {
        self.mro.contains(&other)
    }

    /// Local (non-inherited) attribute lookup.
    #[must_use]
    pub fn lookup_local(&self, name: StringId) -> Option<&Value> {
        self.namespace.get(&name)
    }

    /// Stores an attribute, returning the replaced value for the caller to release.
    pub fn set_attr(&mut self, name: StringId, value: Value) -> Option<Value> {
        self.namespace.insert(name, value)
    }
}

impl PyTrait for ClassObject {
    fn py_estimate_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.name.len()
            + self.mro.len() * std::mem::size_of::<HeapId>()
            + self.namespace.len() * std::mem::size_of::<(StringId, Value)>()
    }

    fn py_ref_ids(&self, stack: &mut Vec<HeapId>) {
        stack.extend(self.mro.iter().skip(usize::from(self.has_self_id)).copied());
        stack.extend(self.namespace.values().filter_map(Value::ref_id));
    }
}

/// An instance of a user class.
///
/// Attribute lookup goes through data descriptors of the class first, then the
/// instance attributes, then the rest of the class namespace.
#[derive(Debug)]
pub(crate) struct Instance {
    /// HeapId of the ClassObject this instance belongs to (owned share).
    class_id: HeapId,
    /// Instance attributes (`self.__dict__`).
    attrs: IndexMap<StringId, Value>,
}

impl Instance {
    #[must_use]
    pub fn new(class_id: HeapId) -> Self {
        Self {
            class_id,
            attrs: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn class_id(&self) -> HeapId {
        self.class_id
    }

    #[must_use]
    pub fn get_attr(&self, name: StringId) -> Option<&Value> {
        self.attrs.get(&name)
    }

    /// Stores an attribute, returning the replaced value for the caller to release.
    pub fn set_attr(&mut self, name: StringId, value: Value) -> Option<Value> {
        self.attrs.insert(name, value)
    }
}

impl PyTrait for Instance {
    fn py_estimate_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.attrs.len() * std::mem::size_of::<(StringId, Value)>()
    }

    fn py_ref_ids(&self, stack: &mut Vec<HeapId>) {
        stack.push(self.class_id);
        stack.extend(self.attrs.values().filter_map(Value::ref_id));
    }
}
