//! Validator: decides which type a proxy bound to a candidate object scans.

use crate::{
    exception_private::{ExcType, RunResult},
    heap::HeapId,
    resource::ResourceTracker,
    runtime::Runtime,
    tracer::RuntimeTracer,
    value::Value,
};

impl<T: ResourceTracker, Tr: RuntimeTracer> Runtime<T, Tr> {
    /// Returns the binding type for `obj` under reference class `this_type`, as a
    /// new share.
    ///
    /// Rules, first match wins:
    /// 1. `obj` is a class deriving from `this_type`: `obj` itself (class binding).
    /// 2. `type(obj)` derives from `this_type`: `type(obj)`.
    /// 3. With the `apparent-class-override` feature only: `obj.__class__` when it
    ///    is a class other than `type(obj)`. This legacy branch performs no
    ///    subtype check.
    ///
    /// Anything else is a `TypeError`.
    pub(crate) fn check_super_binding(&mut self, this_type: HeapId, obj: &Value) -> RunResult<HeapId> {
        if let Some(cls) = self.class_id_of(obj)
            && self.is_subtype(cls, this_type)
        {
            self.heap.inc_ref(cls);
            return Ok(cls);
        }

        let obj_type = self.type_of(obj);
        if self.is_subtype(obj_type, this_type) {
            self.heap.inc_ref(obj_type);
            return Ok(obj_type);
        }

        #[cfg(feature = "apparent-class-override")]
        if let Some(apparent) = self.apparent_class(obj, obj_type)? {
            return Ok(apparent);
        }

        Err(ExcType::type_error_super_obj())
    }

    /// Reads `obj.__class__`; returns it (with a share) when it is a class that
    /// differs from the runtime type. A missing attribute is not an error.
    #[cfg(feature = "apparent-class-override")]
    fn apparent_class(&mut self, obj: &Value, obj_type: HeapId) -> RunResult<Option<HeapId>> {
        use crate::intern::StaticStrings;

        let attr = match self.getattr_value(obj, StaticStrings::DunderClass.into()) {
            Ok(attr) => attr,
            Err(err) if err.is_exception_type(ExcType::AttributeError) => return Ok(None),
            Err(err) => return Err(err),
        };
        let apparent = self.class_id_of(&attr).filter(|&cls| cls != obj_type);
        if let Some(cls) = apparent {
            self.heap.inc_ref(cls);
            let name = self.class_name(cls).to_owned();
            self.tracer.on_apparent_class_override(&name);
        }
        attr.drop_with_heap(&mut self.heap);
        Ok(apparent)
    }
}
