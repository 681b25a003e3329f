//! Binder: the descriptor get-protocol of `super` proxies.
//!
//! A proxy stored as a class attribute binds like a method: reading it through
//! an instance produces a proxy bound to that instance.

use crate::{
    exception_private::{RunError, RunResult},
    heap::{HeapData, HeapId},
    resource::ResourceTracker,
    runtime::Runtime,
    tracer::{BindOutcome, RuntimeTracer},
    types::{SuperProxy, super_proxy::SuperBound},
    value::Value,
};

impl<T: ResourceTracker, Tr: RuntimeTracer> Runtime<T, Tr> {
    /// `proxy.__get__(instance, owner)`, returning a new share.
    ///
    /// An absent or `None` instance, or an already bound proxy, yields the proxy
    /// itself. User subclasses of `super` are rebuilt by calling the subclass with
    /// `(this_type, instance)`.
    pub(crate) fn super_get(&mut self, proxy_id: HeapId, instance: Option<&Value>) -> RunResult<Value> {
        let HeapData::SuperProxy(proxy) = self.heap.get(proxy_id) else {
            return Err(RunError::internal("super binder on a non-proxy"));
        };
        let this_type = proxy.this_type();
        let subtype = proxy.subtype();

        let Some(obj) = instance.filter(|obj| !obj.is_none() && !proxy.is_bound()) else {
            self.heap.inc_ref(proxy_id);
            self.tracer.on_bind(BindOutcome::Reused);
            return Ok(Value::Ref(proxy_id));
        };

        // the validator and the subtype constructor may re-enter and reassign the proxy
        self.heap.inc_ref(this_type);

        if let Some(subtype) = subtype {
            self.tracer.on_bind(BindOutcome::Subtype);
            self.heap.inc_ref(subtype);
            let args = [Value::Ref(this_type), obj.copy_for_extend()];
            let result = self.with_reentry(|rt| rt.call_value(&Value::Ref(subtype), &args));
            self.heap.dec_ref(subtype);
            self.heap.dec_ref(this_type);
            return result;
        }

        let obj_type = match self.check_super_binding(this_type, obj) {
            Ok(obj_type) => obj_type,
            Err(err) => {
                self.heap.dec_ref(this_type);
                return Err(err);
            }
        };
        self.tracer.on_bind(BindOutcome::Fresh);

        let bound = SuperBound {
            obj: obj.clone_with_heap(&self.heap),
            obj_type,
        };
        let proxy = SuperProxy::new(this_type, Some(bound), None);
        let binding = proxy.binding_kind();
        let id = self.alloc(HeapData::SuperProxy(proxy))?;
        self.tracer.on_init(false, binding);
        Ok(Value::Ref(id))
    }
}
