//! Builtin classes and their native methods.
//!
//! The runtime bootstraps a small fixed set of classes so that every value has a
//! type with an MRO: `object`, `type`, `super`, the immediate types and the
//! descriptor types. Each class keeps one share held by [`BuiltinClasses`] for
//! the lifetime of the runtime.

use strum::{Display, IntoStaticStr};

use crate::{
    heap::{Heap, HeapData, HeapId},
    intern::{StaticStrings, StringId},
    resource::{ResourceError, ResourceTracker},
    types::{ClassObject, MemberDescriptor},
    value::Value,
};

/// Native methods installed in builtin class namespaces.
///
/// They behave like functions under the descriptor protocol: looked up through an
/// instance they bind to it, looked up through the class they come back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, serde::Serialize, serde::Deserialize)]
pub enum Builtins {
    /// `object.__init__`: accepts and ignores its arguments.
    #[strum(serialize = "__init__")]
    ObjectInit,
    /// `object.__repr__`: `<Name object>`.
    #[strum(serialize = "__repr__")]
    ObjectRepr,
    /// `super.__init__(type, obj=None)`: re-initializes a proxy in place.
    #[strum(serialize = "__init__")]
    SuperInit,
    /// `super.__get__(obj, type=None)`: the binder.
    #[strum(serialize = "__get__")]
    SuperGet,
    /// `super.__repr__`.
    #[strum(serialize = "__repr__")]
    SuperRepr,
}

impl Builtins {
    /// Name of the class the method is defined on.
    #[must_use]
    pub fn owner_name(self) -> &'static str {
        match self {
            Self::ObjectInit | Self::ObjectRepr => "object",
            Self::SuperInit | Self::SuperGet | Self::SuperRepr => "super",
        }
    }
}

/// Heap ids of the bootstrapped builtin classes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BuiltinClasses {
    pub object: HeapId,
    pub type_: HeapId,
    pub super_: HeapId,
    pub none_type: HeapId,
    pub bool_: HeapId,
    pub int: HeapId,
    pub str_: HeapId,
    pub function: HeapId,
    pub builtin_function: HeapId,
    pub method: HeapId,
    pub staticmethod: HeapId,
    pub classmethod: HeapId,
    pub property: HeapId,
    pub member_descriptor: HeapId,
    pub getset_descriptor: HeapId,
}

impl BuiltinClasses {
    pub fn bootstrap(heap: &mut Heap<impl ResourceTracker>) -> Result<Self, ResourceError> {
        let object = allocate_class(
            heap,
            StaticStrings::Object,
            Vec::new(),
            vec![
                (StaticStrings::DunderClass, Value::Member(MemberDescriptor::ObjectClass)),
                (StaticStrings::DunderInit, Value::Builtin(Builtins::ObjectInit)),
                (StaticStrings::DunderRepr, Value::Builtin(Builtins::ObjectRepr)),
            ],
        )?;

        let type_ = derive_from(
            heap,
            StaticStrings::Type,
            object,
            vec![(StaticStrings::DunderName, Value::Member(MemberDescriptor::TypeName))],
        )?;
        let super_ = derive_from(
            heap,
            StaticStrings::Super,
            object,
            vec![
                (StaticStrings::DunderInit, Value::Builtin(Builtins::SuperInit)),
                (StaticStrings::DunderGet, Value::Builtin(Builtins::SuperGet)),
                (StaticStrings::DunderRepr, Value::Builtin(Builtins::SuperRepr)),
                (
                    StaticStrings::DunderThisclass,
                    Value::Member(MemberDescriptor::SuperThisClass),
                ),
                (StaticStrings::DunderSelf, Value::Member(MemberDescriptor::SuperSelf)),
                (
                    StaticStrings::DunderSelfClass,
                    Value::Member(MemberDescriptor::SuperSelfClass),
                ),
            ],
        )?;
        let int = derive_from(heap, StaticStrings::Int, object, Vec::new())?;
        let bool_ = derive_from(heap, StaticStrings::Bool, int, Vec::new())?;
        let method = derive_from(
            heap,
            StaticStrings::Method,
            object,
            vec![
                (StaticStrings::DunderFunc, Value::Member(MemberDescriptor::MethodFunc)),
                (StaticStrings::DunderSelf, Value::Member(MemberDescriptor::MethodSelf)),
            ],
        )?;

        Ok(Self {
            object,
            type_,
            super_,
            none_type: derive_from(heap, StaticStrings::NoneType, object, Vec::new())?,
            bool_,
            int,
            str_: derive_from(heap, StaticStrings::Str, object, Vec::new())?,
            function: derive_from(heap, StaticStrings::Function, object, Vec::new())?,
            builtin_function: derive_from(heap, StaticStrings::BuiltinFunctionOrMethod, object, Vec::new())?,
            method,
            staticmethod: derive_from(heap, StaticStrings::Staticmethod, object, Vec::new())?,
            classmethod: derive_from(heap, StaticStrings::Classmethod, object, Vec::new())?,
            property: derive_from(heap, StaticStrings::Property, object, Vec::new())?,
            member_descriptor: derive_from(heap, StaticStrings::MemberDescriptor, object, Vec::new())?,
            getset_descriptor: derive_from(heap, StaticStrings::GetsetDescriptor, object, Vec::new())?,
        })
    }

    /// All builtin class ids. The shares held here keep them alive through collections.
    #[must_use]
    pub fn ids(&self) -> [HeapId; 15] {
        [
            self.object,
            self.type_,
            self.super_,
            self.none_type,
            self.bool_,
            self.int,
            self.str_,
            self.function,
            self.builtin_function,
            self.method,
            self.staticmethod,
            self.classmethod,
            self.property,
            self.member_descriptor,
            self.getset_descriptor,
        ]
    }

    /// Whether `id` is one of the builtin classes.
    #[must_use]
    pub fn contains(&self, id: HeapId) -> bool {
        self.ids().contains(&id)
    }
}

/// Allocates a builtin class deriving from a single builtin base.
fn derive_from(
    heap: &mut Heap<impl ResourceTracker>,
    name: StaticStrings,
    base: HeapId,
    namespace: Vec<(StaticStrings, Value)>,
) -> Result<HeapId, ResourceError> {
    let HeapData::ClassObject(base_cls) = heap.get(base) else {
        unreachable!("builtin base is always a class");
    };
    let ancestors = base_cls.mro().to_vec();
    for &ancestor in &ancestors {
        heap.inc_ref(ancestor);
    }
    allocate_class(heap, name, ancestors, namespace)
}

fn allocate_class(
    heap: &mut Heap<impl ResourceTracker>,
    name: StaticStrings,
    ancestors: Vec<HeapId>,
    namespace: Vec<(StaticStrings, Value)>,
) -> Result<HeapId, ResourceError> {
    let mut cls = ClassObject::new(name.as_str(), ancestors);
    for (attr, value) in namespace {
        // namespace values of builtin classes are immediates, nothing to release
        let _ = cls.set_attr(StringId::from(attr), value);
    }
    let id = heap.allocate(HeapData::ClassObject(cls))?;
    if let HeapData::ClassObject(cls) = heap.get_mut(id) {
        cls.set_self_id(id);
    }
    Ok(id)
}
