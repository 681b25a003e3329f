//! The `super` proxy: public entry points.
//!
//! The resolver, binder and validator live in the submodules and are written once
//! against [`RunResult`]. Each entry point here exists in a generic `*_with` form
//! taking an [`ExceptionStyle`], plus the convenience wrappers the two calling
//! conventions use:
//!
//! | Entry point | Convention |
//! |-------------|------------|
//! | [`Runtime::construct_super`], [`Runtime::reinit_super`], [`Runtime::super_check`] | internal (`Result`) |
//! | [`Runtime::super_getattr`], [`Runtime::super_descriptor_get`] | internal (`Result`) |
//! | [`Runtime::super_getattro`], [`Runtime::super_descr_get`] | boundary (`ErrorSlot` + `None`) |

mod check;
mod descr;
mod getattr;
mod init;

use crate::{
    exception_private::{ExcType, RunError, RunResult},
    exception_public::Exception,
    exception_style::{Capi, Cxx, ErrorSlot, ExceptionStyle},
    heap::{HeapData, HeapId},
    resource::ResourceTracker,
    runtime::{Runtime, class_name_in},
    tracer::RuntimeTracer,
    types::SuperBinding,
    value::Value,
};

impl<T: ResourceTracker, Tr: RuntimeTracer> Runtime<T, Tr> {
    /// Hands `result` to `style`, reporting failures recorded at the boundary.
    fn deliver<S: ExceptionStyle, V>(&mut self, style: &mut S, entry: &str, result: RunResult<V>) -> S::Output<V> {
        if S::SETS_SLOT
            && let Err(err) = &result
        {
            self.tracer.on_boundary_error(entry, &err.clone().into_exception());
        }
        style.deliver(result)
    }

    fn proxy_id(&self, proxy: &Value) -> RunResult<HeapId> {
        match proxy.ref_id() {
            Some(id) if matches!(self.heap.get(id), HeapData::SuperProxy(_)) => Ok(id),
            _ => Err(ExcType::type_error(format!(
                "expected a 'super' object, got '{}'",
                self.type_name(proxy)
            ))),
        }
    }

    /// `super(this_type, obj)` delivered through `style`.
    pub fn construct_super_with<S: ExceptionStyle>(
        &mut self,
        style: &mut S,
        this_type: &Value,
        obj: Option<&Value>,
    ) -> S::Output<Value> {
        let result = self.new_super(this_type, obj, None).map(Value::Ref);
        self.deliver(style, "construct_super", result)
    }

    /// `super(this_type, obj).name` delivered through `style`.
    pub fn super_getattr_with<S: ExceptionStyle>(&mut self, style: &mut S, proxy: &Value, name: &str) -> S::Output<Value> {
        let result = self.proxy_id(proxy).and_then(|proxy_id| match self.interns.lookup(name) {
            Some(name) => self.super_getattribute(proxy_id, name),
            // every namespace key is interned, so an unknown name cannot be found
            None => Err(ExcType::attribute_error(self.type_name(proxy), name)),
        });
        self.deliver(style, "super_getattro", result)
    }

    /// `proxy.__get__(instance, owner)` delivered through `style`.
    ///
    /// `owner` is part of the protocol but does not influence the result.
    pub fn super_descr_get_with<S: ExceptionStyle>(
        &mut self,
        style: &mut S,
        proxy: &Value,
        instance: Option<&Value>,
        _owner: Option<&Value>,
    ) -> S::Output<Value> {
        let result = self
            .proxy_id(proxy)
            .and_then(|proxy_id| self.super_get(proxy_id, instance));
        self.deliver(style, "super_descr_get", result)
    }

    /// The validator delivered through `style`: the type a proxy with reference
    /// class `this_type` bound to `obj` would scan.
    pub fn super_check_with<S: ExceptionStyle>(&mut self, style: &mut S, this_type: &Value, obj: &Value) -> S::Output<Value> {
        let result = match self.class_id_of(this_type) {
            Some(this_type) => self.check_super_binding(this_type, obj).map(Value::Ref),
            None => Err(ExcType::type_error_super_arg_not_type(
                self.type_name(this_type),
            )),
        };
        self.deliver(style, "super_check", result)
    }

    // ------------------------------------------------------------------
    // Internal convention
    // ------------------------------------------------------------------

    /// `super(this_type, obj)`; `None` (or a `None` value) builds an unbound proxy.
    pub fn construct_super(&mut self, this_type: &Value, obj: Option<&Value>) -> Result<Value, Exception> {
        self.construct_super_with(&mut Cxx, this_type, obj)
    }

    /// `proxy.__init__(this_type, obj)`: atomically replaces the proxy's fields.
    ///
    /// On failure the proxy is left unchanged.
    pub fn reinit_super(&mut self, proxy: &Value, this_type: &Value, obj: Option<&Value>) -> Result<(), Exception> {
        self.proxy_id(proxy)
            .and_then(|proxy_id| self.super_init(proxy_id, this_type, obj))
            .map_err(RunError::into_exception)
    }

    pub fn super_getattr(&mut self, proxy: &Value, name: &str) -> Result<Value, Exception> {
        self.super_getattr_with(&mut Cxx, proxy, name)
    }

    pub fn super_descriptor_get(
        &mut self,
        proxy: &Value,
        instance: Option<&Value>,
        owner: Option<&Value>,
    ) -> Result<Value, Exception> {
        self.super_descr_get_with(&mut Cxx, proxy, instance, owner)
    }

    /// Returns the binding type as a new share, or the `TypeError` the validator raises.
    pub fn super_check(&mut self, this_type: &Value, obj: &Value) -> Result<Value, Exception> {
        self.super_check_with(&mut Cxx, this_type, obj)
    }

    /// The zero-argument `super()` of a method frame.
    ///
    /// `class_cell` is the method's `__class__` cell, `first_arg` its first
    /// positional argument; either may be missing.
    pub fn super_from_frame(&mut self, class_cell: Option<&Value>, first_arg: Option<&Value>) -> Result<Value, Exception> {
        self.super_from_frame_impl(class_cell, first_arg)
            .map_err(RunError::into_exception)
    }

    // ------------------------------------------------------------------
    // Boundary convention
    // ------------------------------------------------------------------

    /// Attribute lookup for the boundary: on failure the error is stored in `slot`
    /// and `None` is returned; nothing propagates past this call.
    pub fn super_getattro(&mut self, slot: &mut ErrorSlot, proxy: &Value, name: &str) -> Option<Value> {
        self.super_getattr_with(&mut Capi::new(slot), proxy, name)
    }

    /// Descriptor get for the boundary, same conventions as [`super_getattro`](Self::super_getattro).
    pub fn super_descr_get(
        &mut self,
        slot: &mut ErrorSlot,
        proxy: &Value,
        instance: Option<&Value>,
        owner: Option<&Value>,
    ) -> Option<Value> {
        self.super_descr_get_with(&mut Capi::new(slot), proxy, instance, owner)
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// `<super: <class 'C'>, <D object>>`, or `<super: <class 'C'>, <NULL>>` when unbound.
    pub fn super_repr(&self, proxy: &Value) -> Result<String, Exception> {
        self.proxy_id(proxy)
            .map(|proxy_id| self.super_display(proxy_id))
            .map_err(RunError::into_exception)
    }

    /// How the proxy is bound.
    pub fn super_binding(&self, proxy: &Value) -> Result<SuperBinding, Exception> {
        let proxy_id = self.proxy_id(proxy).map_err(RunError::into_exception)?;
        match self.heap.get(proxy_id) {
            HeapData::SuperProxy(proxy) => Ok(proxy.binding_kind()),
            _ => Err(RunError::internal("proxy_id returned a non-proxy").into_exception()),
        }
    }

    pub(crate) fn super_display(&self, proxy_id: HeapId) -> String {
        let HeapData::SuperProxy(proxy) = self.heap.get(proxy_id) else {
            return "<super: <NULL>>".to_owned();
        };
        let this_type = class_name_in(&self.heap, proxy.this_type());
        match proxy.obj_type() {
            Some(obj_type) => format!(
                "<super: <class '{this_type}'>, <{} object>>",
                class_name_in(&self.heap, obj_type)
            ),
            None => format!("<super: <class '{this_type}'>, <NULL>>"),
        }
    }
}
