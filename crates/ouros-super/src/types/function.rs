//! Callable objects and the descriptor kinds built on top of them.
//!
//! Every kind here takes part in the descriptor get-protocol implemented by
//! `Runtime::descriptor_get`: functions bind to instances, static methods unwrap,
//! class methods bind to the owner, properties call their getter and host
//! descriptors run arbitrary host code.

use crate::{heap::HeapId, types::PyTrait, value::Value};

/// Index into the runtime's table of registered host functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct HostFunctionId(pub(crate) usize);

/// Index into the runtime's table of registered host descriptor getters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct HostGetterId(pub(crate) usize);

/// A plain Python function.
///
/// The body is either a registered host function or absent, in which case calling
/// the function returns `None` (a `def f(self): pass`).
#[derive(Debug)]
pub(crate) struct Function {
    name: String,
    body: Option<HostFunctionId>,
}

impl Function {
    #[must_use]
    pub fn new(name: impl Into<String>, body: Option<HostFunctionId>) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn body(&self) -> Option<HostFunctionId> {
        self.body
    }
}

impl PyTrait for Function {
    fn py_estimate_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.name.len()
    }

    fn py_ref_ids(&self, _stack: &mut Vec<HeapId>) {}
}

/// A function bound to its first argument.
#[derive(Debug)]
pub(crate) struct BoundMethod {
    func: Value,
    self_arg: Value,
}

impl BoundMethod {
    /// Both values must carry a share owned by the new method.
    #[must_use]
    pub fn new(func: Value, self_arg: Value) -> Self {
        Self { func, self_arg }
    }

    #[must_use]
    pub fn func(&self) -> &Value {
        &self.func
    }

    #[must_use]
    pub fn self_arg(&self) -> &Value {
        &self.self_arg
    }
}

impl PyTrait for BoundMethod {
    fn py_estimate_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn py_ref_ids(&self, stack: &mut Vec<HeapId>) {
        stack.extend(self.func.ref_id());
        stack.extend(self.self_arg.ref_id());
    }
}

/// `staticmethod(func)`: attribute access yields `func` unchanged.
#[derive(Debug)]
pub(crate) struct StaticMethod {
    func: Value,
}

impl StaticMethod {
    #[must_use]
    pub fn new(func: Value) -> Self {
        Self { func }
    }

    #[must_use]
    pub fn func(&self) -> &Value {
        &self.func
    }
}

impl PyTrait for StaticMethod {
    fn py_estimate_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn py_ref_ids(&self, stack: &mut Vec<HeapId>) {
        stack.extend(self.func.ref_id());
    }
}

/// `classmethod(func)`: attribute access binds `func` to the owner class.
#[derive(Debug)]
pub(crate) struct ClassMethod {
    func: Value,
}

impl ClassMethod {
    #[must_use]
    pub fn new(func: Value) -> Self {
        Self { func }
    }

    #[must_use]
    pub fn func(&self) -> &Value {
        &self.func
    }
}

impl PyTrait for ClassMethod {
    fn py_estimate_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn py_ref_ids(&self, stack: &mut Vec<HeapId>) {
        stack.extend(self.func.ref_id());
    }
}

/// A read-only `property`: a data descriptor calling `fget(instance)`.
#[derive(Debug)]
pub(crate) struct Property {
    fget: Value,
}

impl Property {
    #[must_use]
    pub fn new(fget: Value) -> Self {
        Self { fget }
    }

    #[must_use]
    pub fn fget(&self) -> &Value {
        &self.fget
    }
}

impl PyTrait for Property {
    fn py_estimate_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn py_ref_ids(&self, stack: &mut Vec<HeapId>) {
        stack.extend(self.fget.ref_id());
    }
}

/// A non-data descriptor whose `__get__` is implemented by host code.
///
/// The getter may re-enter the runtime arbitrarily, which is what makes
/// attribute resolution re-entrant.
#[derive(Debug)]
pub(crate) struct HostDescriptor {
    name: String,
    getter: HostGetterId,
}

impl HostDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, getter: HostGetterId) -> Self {
        Self {
            name: name.into(),
            getter,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn getter(&self) -> HostGetterId {
        self.getter
    }
}

impl PyTrait for HostDescriptor {
    fn py_estimate_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.name.len()
    }

    fn py_ref_ids(&self, _stack: &mut Vec<HeapId>) {}
}
