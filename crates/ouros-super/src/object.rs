//! Generic object protocol: the descriptor get-protocol, attribute lookup, calls
//! and `repr`.
//!
//! Every attribute value goes through [`Runtime::descriptor_get`] before it is
//! handed out. Plain values implement it as identity, so lookups never need to
//! special-case whether the value they found is a descriptor.

use crate::{
    builtins::Builtins,
    exception_private::{ExcType, RunError, RunResult},
    heap::{DropWithHeap, HeapData, HeapId},
    intern::{StaticStrings, StringId},
    resource::ResourceTracker,
    runtime::Runtime,
    tracer::RuntimeTracer,
    types::{BoundMethod, HostGetterId, MemberDescriptor},
    value::Value,
};

/// How a value behaves when it is found on a type during attribute lookup.
///
/// Variants carrying a value hold a share of it.
#[derive(Debug)]
enum Descriptor {
    /// Returned unchanged.
    Plain,
    /// Functions and native methods: bind to the instance.
    Method,
    Member(MemberDescriptor),
    Static(Value),
    Class(Value),
    Property(Value),
    /// A `super` proxy: the binder.
    Super(HeapId),
    Host(HostGetterId),
}

impl<T: ResourceTracker, Tr: RuntimeTracer> Runtime<T, Tr> {
    fn classify(&self, value: &Value) -> Descriptor {
        match value {
            Value::Builtin(_) => Descriptor::Method,
            Value::Member(member) => Descriptor::Member(*member),
            Value::Ref(id) => match self.heap.get(*id) {
                HeapData::Function(_) => Descriptor::Method,
                HeapData::StaticMethod(method) => Descriptor::Static(method.func().clone_with_heap(&self.heap)),
                HeapData::ClassMethod(method) => Descriptor::Class(method.func().clone_with_heap(&self.heap)),
                HeapData::Property(prop) => Descriptor::Property(prop.fget().clone_with_heap(&self.heap)),
                HeapData::SuperProxy(_) => Descriptor::Super(*id),
                HeapData::HostDescriptor(desc) => Descriptor::Host(desc.getter()),
                _ => Descriptor::Plain,
            },
            _ => Descriptor::Plain,
        }
    }

    /// Data descriptors take precedence over instance attributes and reject assignment.
    pub(crate) fn is_data_descriptor(&self, value: &Value) -> bool {
        match value {
            Value::Member(_) => true,
            Value::Ref(id) => matches!(self.heap.get(*id), HeapData::Property(_)),
            _ => false,
        }
    }

    /// Applies the descriptor get-protocol to `value` found on `owner`.
    ///
    /// `instance` is `None` for class-level access. The result is a new share; the
    /// caller keeps its share of `value`. Host descriptors and properties run host
    /// code, so anything not held by the caller may change during this call.
    pub(crate) fn descriptor_get(&mut self, value: &Value, instance: Option<&Value>, owner: HeapId) -> RunResult<Value> {
        match self.classify(value) {
            Descriptor::Plain => Ok(value.clone_with_heap(&self.heap)),
            Descriptor::Method => match instance {
                Some(instance) => self.bind_method(value, instance),
                None => Ok(value.clone_with_heap(&self.heap)),
            },
            Descriptor::Member(member) => match instance {
                Some(instance) => self.member_get(member, instance),
                None => Ok(value.clone_with_heap(&self.heap)),
            },
            Descriptor::Static(func) => Ok(func),
            Descriptor::Class(func) => {
                let result = self.bind_method(&func, &Value::Ref(owner));
                func.drop_with_heap(&mut self.heap);
                result
            }
            Descriptor::Property(fget) => {
                let result = match instance {
                    Some(instance) => self.call_value(&fget, &[instance.copy_for_extend()]),
                    None => Ok(value.clone_with_heap(&self.heap)),
                };
                fget.drop_with_heap(&mut self.heap);
                result
            }
            Descriptor::Super(proxy_id) => self.super_get(proxy_id, instance),
            Descriptor::Host(getter) => self.call_host_getter(getter, instance, owner),
        }
    }

    pub(crate) fn bind_method(&mut self, func: &Value, self_arg: &Value) -> RunResult<Value> {
        let method = BoundMethod::new(func.clone_with_heap(&self.heap), self_arg.clone_with_heap(&self.heap));
        self.alloc(HeapData::BoundMethod(method)).map(Value::Ref)
    }

    fn member_get(&mut self, member: MemberDescriptor, instance: &Value) -> RunResult<Value> {
        if member == MemberDescriptor::TypeName
            && let Some(cls) = self.class_id_of(instance)
        {
            let name = self.class_name(cls).to_owned();
            return self.alloc_str(name);
        }
        let heap = &self.heap;
        let data = instance.ref_id().map(|id| heap.get(id));
        let result = match (member, data) {
            (MemberDescriptor::ObjectClass, _) => {
                let ty = self.type_of(instance);
                heap.inc_ref(ty);
                Some(Value::Ref(ty))
            }
            (MemberDescriptor::SuperThisClass, Some(HeapData::SuperProxy(proxy))) => {
                heap.inc_ref(proxy.this_type());
                Some(Value::Ref(proxy.this_type()))
            }
            (MemberDescriptor::SuperSelf, Some(HeapData::SuperProxy(proxy))) => Some(
                proxy
                    .obj()
                    .map_or(Value::None, |obj| obj.clone_with_heap(heap)),
            ),
            (MemberDescriptor::SuperSelfClass, Some(HeapData::SuperProxy(proxy))) => {
                Some(proxy.obj_type().map_or(Value::None, |ty| {
                    heap.inc_ref(ty);
                    Value::Ref(ty)
                }))
            }
            (MemberDescriptor::MethodFunc, Some(HeapData::BoundMethod(method))) => {
                Some(method.func().clone_with_heap(heap))
            }
            (MemberDescriptor::MethodSelf, Some(HeapData::BoundMethod(method))) => {
                Some(method.self_arg().clone_with_heap(heap))
            }
            _ => None,
        };
        result.ok_or_else(|| {
            ExcType::type_error(format!(
                "descriptor '{member}' for '{}' objects doesn't apply to a '{}' object",
                member.owner_name(),
                self.type_name(instance)
            ))
        })
    }

    // ------------------------------------------------------------------
    // Attribute lookup
    // ------------------------------------------------------------------

    /// `getattr(obj, name)`.
    pub(crate) fn getattr_value(&mut self, obj: &Value, name: StringId) -> RunResult<Value> {
        if let Some(id) = obj.ref_id() {
            match self.heap.get(id) {
                HeapData::SuperProxy(_) => return self.super_getattribute(id, name),
                HeapData::ClassObject(_) => return self.class_getattr(id, name),
                _ => {}
            }
        }
        self.generic_getattr(obj, name)
    }

    /// Generic attribute lookup on a non-class object: data descriptors on the
    /// type, then the instance dictionary, then everything else on the type.
    pub(crate) fn generic_getattr(&mut self, obj: &Value, name: StringId) -> RunResult<Value> {
        // the instance holds its class, and the caller holds the instance
        let ty = self.type_of(obj);
        let found = self.mro_lookup(ty, name);

        if let Some(desc) = &found
            && self.is_data_descriptor(desc)
        {
            let result = self.descriptor_get(desc, Some(obj), ty);
            found.drop_with_heap(&mut self.heap);
            return result;
        }

        if let Some(id) = obj.ref_id()
            && let HeapData::Instance(inst) = self.heap.get(id)
            && let Some(attr) = inst.get_attr(name)
        {
            let attr = attr.clone_with_heap(&self.heap);
            found.drop_with_heap(&mut self.heap);
            return Ok(attr);
        }

        match found {
            Some(found) => {
                let result = self.descriptor_get(&found, Some(obj), ty);
                found.drop_with_heap(&mut self.heap);
                result
            }
            None => Err(ExcType::attribute_error(self.type_name(obj), self.interns.get_str(name))),
        }
    }

    /// Attribute lookup on a class: data descriptors of `type`, then the class's
    /// MRO (descriptors invoked without an instance), then the rest of `type`.
    fn class_getattr(&mut self, cls: HeapId, name: StringId) -> RunResult<Value> {
        let meta = self.builtins.type_;
        let meta_attr = self.mro_lookup(meta, name);
        let cls_value = Value::Ref(cls);

        if let Some(desc) = &meta_attr
            && self.is_data_descriptor(desc)
        {
            let result = self.descriptor_get(desc, Some(&cls_value), meta);
            meta_attr.drop_with_heap(&mut self.heap);
            return result;
        }

        if let Some(found) = self.mro_lookup(cls, name) {
            meta_attr.drop_with_heap(&mut self.heap);
            let result = self.descriptor_get(&found, None, cls);
            found.drop_with_heap(&mut self.heap);
            return result;
        }

        match meta_attr {
            Some(attr) => {
                let result = self.descriptor_get(&attr, Some(&cls_value), meta);
                attr.drop_with_heap(&mut self.heap);
                result
            }
            None => Err(ExcType::attribute_error_type(
                self.class_name(cls),
                self.interns.get_str(name),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    /// Calls `callable` with borrowed arguments, returning a new share.
    pub(crate) fn call_value(&mut self, callable: &Value, args: &[Value]) -> RunResult<Value> {
        let id = match callable {
            Value::Builtin(builtin) => return self.call_builtin(*builtin, args),
            Value::Ref(id) => *id,
            _ => return Err(ExcType::type_error_not_callable(self.type_name(callable))),
        };
        match self.heap.get(id) {
            HeapData::Function(func) => match func.body() {
                Some(body) => self.call_host_function(body, args),
                None => Ok(Value::None),
            },
            HeapData::BoundMethod(method) => {
                let func = method.func().clone_with_heap(&self.heap);
                let self_arg = method.self_arg().clone_with_heap(&self.heap);
                let mut full_args = Vec::with_capacity(args.len() + 1);
                full_args.push(self_arg.copy_for_extend());
                full_args.extend(args.iter().map(Value::copy_for_extend));
                let result = self.call_value(&func, &full_args);
                func.drop_with_heap(&mut self.heap);
                self_arg.drop_with_heap(&mut self.heap);
                result
            }
            HeapData::ClassObject(_) => self.call_class(id, args),
            _ => Err(ExcType::type_error_not_callable(self.type_name(callable))),
        }
    }

    /// Calls a class: `super` and its subclasses build proxies, other classes
    /// build an instance and run `__init__` on it.
    fn call_class(&mut self, cls: HeapId, args: &[Value]) -> RunResult<Value> {
        if self.is_subtype(cls, self.builtins.super_) {
            return self.instantiate_super(cls, args);
        }
        let instance = self.instantiate(&Value::Ref(cls))?;
        let init = self
            .mro_lookup(cls, StaticStrings::DunderInit.into())
            .unwrap_or(Value::Builtin(Builtins::ObjectInit));

        let outcome = if matches!(init, Value::Builtin(Builtins::ObjectInit)) {
            if args.is_empty() {
                Ok(())
            } else {
                Err(ExcType::type_error(format!("{}() takes no arguments", self.class_name(cls))))
            }
        } else {
            self.descriptor_get(&init, Some(&instance), cls).and_then(|bound| {
                let result = self.call_value(&bound, args);
                bound.drop_with_heap(&mut self.heap);
                result.map(|ret| ret.drop_with_heap(&mut self.heap))
            })
        };
        init.drop_with_heap(&mut self.heap);

        match outcome {
            Ok(()) => Ok(instance),
            Err(err) => {
                instance.drop_with_heap(&mut self.heap);
                Err(err)
            }
        }
    }

    fn call_builtin(&mut self, builtin: Builtins, args: &[Value]) -> RunResult<Value> {
        match builtin {
            Builtins::ObjectInit => Ok(Value::None),
            Builtins::ObjectRepr => {
                let Some(obj) = args.first() else {
                    return Err(descriptor_needs_argument(builtin));
                };
                let repr = format!("<{} object>", self.type_name(obj));
                self.alloc_str(repr)
            }
            Builtins::SuperInit => {
                let Some((proxy, rest)) = args.split_first() else {
                    return Err(descriptor_needs_argument(builtin));
                };
                let proxy_id = self.expect_proxy(proxy, builtin)?;
                match rest {
                    [] => Err(ExcType::runtime_error("super(): no arguments")),
                    [this_type] => self.super_init(proxy_id, this_type, None).map(|()| Value::None),
                    [this_type, obj] => self.super_init(proxy_id, this_type, Some(obj)).map(|()| Value::None),
                    _ => Err(ExcType::type_error_at_most("super", 2, rest.len())),
                }
            }
            Builtins::SuperGet => {
                let Some((proxy, rest)) = args.split_first() else {
                    return Err(descriptor_needs_argument(builtin));
                };
                let proxy_id = self.expect_proxy(proxy, builtin)?;
                match rest {
                    [] => Err(ExcType::type_error_at_least("__get__", 1, 0)),
                    [obj] | [obj, _] => self.super_get(proxy_id, Some(obj)),
                    _ => Err(ExcType::type_error_at_most("__get__", 2, rest.len())),
                }
            }
            Builtins::SuperRepr => {
                let Some(proxy) = args.first() else {
                    return Err(descriptor_needs_argument(builtin));
                };
                let proxy_id = self.expect_proxy(proxy, builtin)?;
                let display = self.super_display(proxy_id);
                self.alloc_str(display)
            }
        }
    }

    /// The heap id of `value` when it is a `super` proxy (or a subclass instance).
    pub(crate) fn expect_proxy(&self, value: &Value, method: Builtins) -> RunResult<HeapId> {
        match value.ref_id() {
            Some(id) if matches!(self.heap.get(id), HeapData::SuperProxy(_)) => Ok(id),
            _ => Err(ExcType::type_error(format!(
                "descriptor '{method}' requires a '{}' object but received a '{}'",
                method.owner_name(),
                self.type_name(value)
            ))),
        }
    }

    // ------------------------------------------------------------------
    // repr
    // ------------------------------------------------------------------

    pub(crate) fn repr_value(&mut self, value: &Value) -> RunResult<String> {
        let id = match value {
            Value::None => return Ok("None".to_owned()),
            Value::Bool(true) => return Ok("True".to_owned()),
            Value::Bool(false) => return Ok("False".to_owned()),
            Value::Int(i) => return Ok(i.to_string()),
            Value::InternString(s) => return Ok(format!("'{}'", self.interns.get_str(*s))),
            Value::Builtin(builtin) => {
                return Ok(format!("<method '{builtin}' of '{}' objects>", builtin.owner_name()));
            }
            Value::Member(member) if member.is_getset() => {
                return Ok(format!("<attribute '{member}' of '{}' objects>", member.owner_name()));
            }
            Value::Member(member) => {
                return Ok(format!("<member '{member}' of '{}' objects>", member.owner_name()));
            }
            Value::Ref(id) => *id,
        };
        let repr = match self.heap.get(id) {
            HeapData::Str(s) => format!("'{s}'"),
            HeapData::ClassObject(cls) => format!("<class '{}'>", cls.name()),
            HeapData::SuperProxy(_) => self.super_display(id),
            HeapData::Function(func) => format!("<function {}>", func.name()),
            HeapData::BoundMethod(method) => {
                let func_name = match method.func() {
                    Value::Builtin(builtin) => builtin.to_string(),
                    Value::Ref(func) => match self.heap.get(*func) {
                        HeapData::Function(func) => func.name().to_owned(),
                        _ => "?".to_owned(),
                    },
                    _ => "?".to_owned(),
                };
                format!("<bound method {func_name} of <{} object>>", self.type_name(method.self_arg()))
            }
            HeapData::StaticMethod(_) => "<staticmethod object>".to_owned(),
            HeapData::ClassMethod(_) => "<classmethod object>".to_owned(),
            HeapData::Property(_) => "<property object>".to_owned(),
            HeapData::HostDescriptor(desc) => format!("<attribute '{}' of host objects>", desc.name()),
            HeapData::Instance(inst) => {
                let cls = inst.class_id();
                return self.instance_repr(value, cls);
            }
        };
        Ok(repr)
    }

    /// Runs `__repr__` of an instance's class, honoring overrides.
    fn instance_repr(&mut self, instance: &Value, cls: HeapId) -> RunResult<String> {
        let method = self.mro_lookup(cls, StaticStrings::DunderRepr.into());
        let result = match &method {
            None | Some(Value::Builtin(Builtins::ObjectRepr)) => Ok(format!("<{} object>", self.class_name(cls))),
            Some(method) => self.descriptor_get(method, Some(instance), cls).and_then(|bound| {
                let ret = self.call_value(&bound, &[]);
                bound.drop_with_heap(&mut self.heap);
                let ret = ret?;
                let text = self.str_value(&ret).map(str::to_owned);
                let result = text.ok_or_else(|| {
                    ExcType::type_error(format!("__repr__ returned non-string (type {})", self.type_name(&ret)))
                });
                ret.drop_with_heap(&mut self.heap);
                result
            }),
        };
        method.drop_with_heap(&mut self.heap);
        result
    }
}

fn descriptor_needs_argument(builtin: Builtins) -> RunError {
    ExcType::type_error(format!(
        "descriptor '{builtin}' of '{}' object needs an argument",
        builtin.owner_name()
    ))
}
