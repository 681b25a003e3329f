use strum::{Display, IntoStaticStr};

/// Read-only members exposed by builtin classes.
///
/// Members are data descriptors: they take precedence over instance attributes and
/// reject assignment. Reading one through its class (no instance) yields the
/// descriptor itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, serde::Serialize, serde::Deserialize)]
pub enum MemberDescriptor {
    /// `object.__class__`: the runtime type of the instance.
    #[strum(serialize = "__class__")]
    ObjectClass,
    /// `super.__thisclass__`: the reference class.
    #[strum(serialize = "__thisclass__")]
    SuperThisClass,
    /// `super.__self__`: the bound object, `None` when unbound.
    #[strum(serialize = "__self__")]
    SuperSelf,
    /// `super.__self_class__`: the bound type, `None` when unbound.
    #[strum(serialize = "__self_class__")]
    SuperSelfClass,
    /// `method.__func__`.
    #[strum(serialize = "__func__")]
    MethodFunc,
    /// `method.__self__`.
    #[strum(serialize = "__self__")]
    MethodSelf,
    /// `type.__name__`: the class name as a string.
    #[strum(serialize = "__name__")]
    TypeName,
}

impl MemberDescriptor {
    /// Computed attributes (`getset_descriptor`) as opposed to slot members.
    #[must_use]
    pub fn is_getset(self) -> bool {
        matches!(self, Self::ObjectClass | Self::TypeName)
    }

    /// Name of the builtin class that owns this member, used in error messages.
    #[must_use]
    pub fn owner_name(self) -> &'static str {
        match self {
            Self::ObjectClass => "object",
            Self::SuperThisClass | Self::SuperSelf | Self::SuperSelfClass => "super",
            Self::MethodFunc | Self::MethodSelf => "method",
            Self::TypeName => "type",
        }
    }
}
