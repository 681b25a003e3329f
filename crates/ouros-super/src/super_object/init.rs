//! Construction and re-initialization of `super` proxies.

use crate::{
    builtins::Builtins,
    exception_private::{ExcType, RunError, RunResult},
    heap::{DropWithHeap, HeapData, HeapId},
    intern::StaticStrings,
    resource::ResourceTracker,
    runtime::Runtime,
    tracer::RuntimeTracer,
    types::{SuperProxy, super_proxy::SuperBound},
    value::Value,
};

impl<T: ResourceTracker, Tr: RuntimeTracer> Runtime<T, Tr> {
    /// The reference class argument of `super(type, obj)`.
    fn super_type_arg(&self, this_type: &Value) -> RunResult<HeapId> {
        self.class_id_of(this_type)
            .ok_or_else(|| ExcType::type_error_super_arg_not_type(self.type_name(this_type)))
    }

    /// Validates `obj` and acquires every share the new fields need.
    ///
    /// Nothing is acquired when validation fails.
    fn acquire_super_fields(&mut self, this_type: HeapId, obj: Option<&Value>) -> RunResult<Option<SuperBound>> {
        self.heap.inc_ref(this_type);
        let Some(obj) = obj.filter(|obj| !obj.is_none()) else {
            return Ok(None);
        };
        match self.check_super_binding(this_type, obj) {
            Ok(obj_type) => Ok(Some(SuperBound {
                obj: obj.clone_with_heap(&self.heap),
                obj_type,
            })),
            Err(err) => {
                self.heap.dec_ref(this_type);
                Err(err)
            }
        }
    }

    /// `super(this_type, obj)`: allocates a proxy; `obj` of `None` builds an unbound one.
    ///
    /// `subtype` is the runtime type for instances of user subclasses of `super`.
    pub(crate) fn new_super(&mut self, this_type: &Value, obj: Option<&Value>, subtype: Option<HeapId>) -> RunResult<HeapId> {
        let this_type = self.super_type_arg(this_type)?;
        let binding = self.acquire_super_fields(this_type, obj)?;
        if let Some(subtype) = subtype {
            self.heap.inc_ref(subtype);
        }
        let proxy = SuperProxy::new(this_type, binding, subtype);
        let binding = proxy.binding_kind();
        let id = self.alloc(HeapData::SuperProxy(proxy))?;
        self.tracer.on_init(false, binding);
        Ok(id)
    }

    /// `proxy.__init__(this_type, obj)`: replaces all three fields in place.
    ///
    /// The new fields are validated and acquired before anything changes, and the
    /// old fields are released only after the proxy holds the new ones.
    pub(crate) fn super_init(&mut self, proxy_id: HeapId, this_type: &Value, obj: Option<&Value>) -> RunResult<()> {
        let this_type = self.super_type_arg(this_type)?;
        let binding = self.acquire_super_fields(this_type, obj)?;

        let HeapData::SuperProxy(proxy) = self.heap.get_mut(proxy_id) else {
            self.heap.dec_ref(this_type);
            binding.drop_with_heap(&mut self.heap);
            return Err(RunError::internal("super re-init on a non-proxy"));
        };
        let (old_type, old_binding) = proxy.replace_fields(this_type, binding);
        let kind = proxy.binding_kind();
        self.heap.mark_potential_cycle();

        self.heap.dec_ref(old_type);
        old_binding.drop_with_heap(&mut self.heap);
        self.tracer.on_init(true, kind);
        Ok(())
    }

    /// Calls `super` or one of its subclasses with positional arguments.
    ///
    /// An `__init__` override on a subclass runs after the fields are set.
    pub(crate) fn instantiate_super(&mut self, cls: HeapId, args: &[Value]) -> RunResult<Value> {
        let (this_type, obj) = match args {
            [] => return Err(ExcType::runtime_error("super(): no arguments")),
            [this_type] => (this_type, None),
            [this_type, obj] => (this_type, Some(obj)),
            _ => return Err(ExcType::type_error_at_most("super", 2, args.len())),
        };
        let subtype = (cls != self.builtins.super_).then_some(cls);
        let proxy = Value::Ref(self.new_super(this_type, obj, subtype)?);

        let Some(subtype) = subtype else {
            return Ok(proxy);
        };
        let init = self.mro_lookup(subtype, StaticStrings::DunderInit.into());
        let outcome = match &init {
            None | Some(Value::Builtin(Builtins::SuperInit)) => Ok(()),
            Some(init) => self.descriptor_get(init, Some(&proxy), subtype).and_then(|bound| {
                let result = self.call_value(&bound, args);
                bound.drop_with_heap(&mut self.heap);
                result.map(|ret| ret.drop_with_heap(&mut self.heap))
            }),
        };
        init.drop_with_heap(&mut self.heap);

        match outcome {
            Ok(()) => Ok(proxy),
            Err(err) => {
                proxy.drop_with_heap(&mut self.heap);
                Err(err)
            }
        }
    }

    /// The zero-argument form: what `super()` evaluates to inside a method whose
    /// `__class__` cell is `class_cell` and whose first argument is `first_arg`.
    pub(crate) fn super_from_frame_impl(&mut self, class_cell: Option<&Value>, first_arg: Option<&Value>) -> RunResult<Value> {
        let Some(first_arg) = first_arg else {
            return Err(ExcType::runtime_error("super(): no arguments"));
        };
        let Some(class_cell) = class_cell else {
            return Err(ExcType::runtime_error("super(): __class__ cell not found"));
        };
        if self.class_id_of(class_cell).is_none() {
            return Err(ExcType::runtime_error(format!(
                "super(): __class__ is not a type ({})",
                self.type_name(class_cell)
            )));
        }
        self.new_super(class_cell, Some(first_arg), None).map(Value::Ref)
    }
}
