//! The runtime that owns the heap, the interner, the builtin classes and the
//! host hooks, and the public API host code drives it through.
//!
//! Values handed out by the runtime carry one share each. Host code returns them
//! with [`Runtime::release`] (or passes them to an API that consumes them) and
//! duplicates them with [`Runtime::clone_value`].

use std::{fmt, rc::Rc};

use smallvec::SmallVec;

use crate::{
    builtins::BuiltinClasses,
    exception_private::{ExcType, RunError, RunResult},
    exception_public::Exception,
    heap::{ContainsHeap, DropWithHeap, Heap, HeapData, HeapId, HeapStats},
    intern::{Interns, StringId},
    resource::{NoLimitTracker, ResourceTracker},
    tracer::{NoopTracer, RuntimeTracer},
    types::{
        ClassMethod, ClassObject, Function, HostDescriptor, HostFunctionId, HostGetterId, Instance, Property,
        StaticMethod,
    },
    value::Value,
};

/// Host code callable from Python: receives the runtime and the borrowed positional
/// arguments, returns an owned value.
pub type HostFunction<T, Tr> = dyn Fn(&mut Runtime<T, Tr>, &[Value]) -> Result<Value, Exception>;

/// Host implementation of a descriptor's `__get__`: receives the runtime, the
/// instance (`None` for class-level access) and the owner class, returns an owned value.
pub type HostGetter<T, Tr> = dyn Fn(&mut Runtime<T, Tr>, Option<&Value>, &Value) -> Result<Value, Exception>;

/// A single-threaded object runtime hosting `super` proxies.
///
/// Generic over the resource tracker and the tracer; the defaults compile every
/// limit check and trace hook away.
pub struct Runtime<T: ResourceTracker = NoLimitTracker, Tr: RuntimeTracer = NoopTracer> {
    pub(crate) heap: Heap<T>,
    pub(crate) interns: Interns,
    pub(crate) builtins: BuiltinClasses,
    pub(crate) tracer: Tr,
    host_functions: Vec<Rc<HostFunction<T, Tr>>>,
    host_getters: Vec<Rc<HostGetter<T, Tr>>>,
    /// Current host re-entry depth.
    depth: usize,
}

impl<T: ResourceTracker, Tr: RuntimeTracer> fmt::Debug for Runtime<T, Tr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("heap", &self.heap)
            .field("builtins", &self.builtins)
            .field("tracer", &self.tracer)
            .field("host_functions", &self.host_functions.len())
            .field("host_getters", &self.host_getters.len())
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

/// Name of a class stored in `heap`, borrowing only the heap so callers can
/// hand it to the tracer.
pub(crate) fn class_name_in<T: ResourceTracker>(heap: &Heap<T>, cls: HeapId) -> &str {
    match heap.get(cls) {
        HeapData::ClassObject(cls) => cls.name(),
        _ => "?",
    }
}

impl Runtime {
    /// Creates a runtime with no resource limits and no tracing.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(NoLimitTracker, NoopTracer)
            .unwrap_or_else(|_| unreachable!("bootstrap cannot exceed limits that do not exist"))
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ResourceTracker, Tr: RuntimeTracer> ContainsHeap<T> for Runtime<T, Tr> {
    #[inline]
    fn heap_mut(&mut self) -> &mut Heap<T> {
        &mut self.heap
    }
}

impl<T: ResourceTracker, Tr: RuntimeTracer> Runtime<T, Tr> {
    /// Creates a runtime with the given resource tracker and tracer.
    ///
    /// Fails with `MemoryError` when the tracker's limits are too tight to
    /// bootstrap the builtin classes.
    pub fn with_parts(tracker: T, tracer: Tr) -> Result<Self, Exception> {
        let mut heap = Heap::new(64, tracker);
        let builtins = BuiltinClasses::bootstrap(&mut heap).map_err(|err| RunError::from(err).into_exception())?;
        Ok(Self {
            heap,
            interns: Interns::new(),
            builtins,
            tracer,
            host_functions: Vec::new(),
            host_getters: Vec::new(),
            depth: 0,
        })
    }

    pub fn tracer(&self) -> &Tr {
        &self.tracer
    }

    pub fn tracer_mut(&mut self) -> &mut Tr {
        &mut self.tracer
    }

    // ------------------------------------------------------------------
    // Type system
    // ------------------------------------------------------------------

    /// The runtime type of a value (no share taken).
    pub(crate) fn type_of(&self, value: &Value) -> HeapId {
        let b = &self.builtins;
        match value {
            Value::None => b.none_type,
            Value::Bool(_) => b.bool_,
            Value::Int(_) => b.int,
            Value::InternString(_) => b.str_,
            Value::Builtin(_) => b.builtin_function,
            Value::Member(member) => {
                if member.is_getset() {
                    b.getset_descriptor
                } else {
                    b.member_descriptor
                }
            }
            Value::Ref(id) => match self.heap.get(*id) {
                HeapData::Str(_) => b.str_,
                HeapData::ClassObject(_) => b.type_,
                HeapData::Instance(inst) => inst.class_id(),
                HeapData::SuperProxy(proxy) => proxy.subtype().unwrap_or(b.super_),
                HeapData::Function(_) => b.function,
                HeapData::BoundMethod(_) => b.method,
                HeapData::StaticMethod(_) => b.staticmethod,
                HeapData::ClassMethod(_) => b.classmethod,
                HeapData::Property(_) => b.property,
                HeapData::HostDescriptor(_) => b.getset_descriptor,
            },
        }
    }

    pub(crate) fn as_class(&self, id: HeapId) -> Option<&ClassObject> {
        match self.heap.get(id) {
            HeapData::ClassObject(cls) => Some(cls),
            _ => None,
        }
    }

    /// The heap id of `value` when it is a class object.
    pub(crate) fn class_id_of(&self, value: &Value) -> Option<HeapId> {
        value.ref_id().filter(|&id| self.as_class(id).is_some())
    }

    /// Whether `sub` is `sup` or one of its subclasses.
    pub(crate) fn is_subtype(&self, sub: HeapId, sup: HeapId) -> bool {
        self.as_class(sub).is_some_and(|cls| cls.is_subclass_of(sup))
    }

    /// The MRO of a class, empty for anything else.
    pub(crate) fn mro(&self, cls: HeapId) -> &[HeapId] {
        self.as_class(cls).map_or(&[][..], ClassObject::mro)
    }

    /// Local (non-inherited) attribute lookup, borrowing the stored value.
    pub(crate) fn lookup_local(&self, cls: HeapId, name: StringId) -> Option<&Value> {
        self.as_class(cls).and_then(|cls| cls.lookup_local(name))
    }

    /// Inherited attribute lookup along the MRO of `cls`, returning a new share.
    pub(crate) fn mro_lookup(&self, cls: HeapId, name: StringId) -> Option<Value> {
        self.mro(cls)
            .iter()
            .find_map(|&c| self.lookup_local(c, name))
            .map(|value| value.clone_with_heap(&self.heap))
    }

    pub(crate) fn class_name(&self, cls: HeapId) -> &str {
        class_name_in(&self.heap, cls)
    }

    /// Name of the runtime type of `value`, as used in error messages.
    #[must_use]
    pub fn type_name(&self, value: &Value) -> &str {
        self.class_name(self.type_of(value))
    }

    // ------------------------------------------------------------------
    // Host re-entry
    // ------------------------------------------------------------------

    /// Runs `f` one re-entry level deeper, failing with `RecursionError` past the
    /// tracker's depth limit.
    pub(crate) fn with_reentry<R>(&mut self, f: impl FnOnce(&mut Self) -> RunResult<R>) -> RunResult<R> {
        self.heap.tracker().check_recursion_depth(self.depth)?;
        self.depth += 1;
        self.tracer.on_host_enter(self.depth);
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub(crate) fn call_host_function(&mut self, id: HostFunctionId, args: &[Value]) -> RunResult<Value> {
        let Some(func) = self.host_functions.get(id.0).map(Rc::clone) else {
            return Err(RunError::internal("unknown host function id"));
        };
        self.with_reentry(|rt| func(rt, args).map_err(RunError::from))
    }

    pub(crate) fn call_host_getter(&mut self, id: HostGetterId, instance: Option<&Value>, owner: HeapId) -> RunResult<Value> {
        let Some(getter) = self.host_getters.get(id.0).map(Rc::clone) else {
            return Err(RunError::internal("unknown host getter id"));
        };
        // the caller holds the instance and the owner for the duration of the call
        let owner = Value::Ref(owner);
        self.with_reentry(|rt| getter(rt, instance, &owner).map_err(RunError::from))
    }

    /// Current host re-entry depth.
    #[must_use]
    pub fn reentry_depth(&self) -> usize {
        self.depth
    }

    // ------------------------------------------------------------------
    // Allocation helpers
    // ------------------------------------------------------------------

    pub(crate) fn alloc(&mut self, data: HeapData) -> RunResult<HeapId> {
        Ok(self.heap.allocate(data)?)
    }

    pub(crate) fn alloc_str(&mut self, s: impl Into<String>) -> RunResult<Value> {
        self.alloc(HeapData::Str(s.into())).map(Value::Ref)
    }

    fn expect_class(&self, value: &Value) -> RunResult<HeapId> {
        self.class_id_of(value)
            .ok_or_else(|| ExcType::type_error(format!("expected a class, got '{}'", self.type_name(value))))
    }

    fn create_class(&mut self, name: &str, bases: &[&Value], ancestors: Option<&[&Value]>) -> RunResult<HeapId> {
        let base_ids = bases
            .iter()
            .map(|base| self.expect_class(base))
            .collect::<RunResult<SmallVec<[HeapId; 2]>>>()?;
        if base_ids.contains(&self.builtins.type_) {
            return Err(ExcType::type_error("metaclasses are not supported"));
        }

        let mut ancestors = match ancestors {
            Some(explicit) => {
                let ids = explicit
                    .iter()
                    .map(|cls| self.expect_class(cls))
                    .collect::<RunResult<Vec<_>>>()?;
                if let Some(missing) = base_ids.iter().find(|base| !ids.contains(base)) {
                    return Err(ExcType::type_error(format!(
                        "base '{}' is missing from the MRO of '{name}'",
                        self.class_name(*missing)
                    )));
                }
                ids
            }
            None => match base_ids.as_slice() {
                [] => Vec::new(),
                [base] => self.mro(*base).to_vec(),
                _ => {
                    return Err(ExcType::type_error(
                        "multiple bases need an explicit MRO, use new_class_with_mro",
                    ));
                }
            },
        };
        if !ancestors.contains(&self.builtins.object) {
            ancestors.push(self.builtins.object);
        }
        for &ancestor in &ancestors {
            self.heap.inc_ref(ancestor);
        }
        let id = self.alloc(HeapData::ClassObject(ClassObject::new(name, ancestors)))?;
        if let HeapData::ClassObject(cls) = self.heap.get_mut(id) {
            cls.set_self_id(id);
        }
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Public API: classes and objects
    // ------------------------------------------------------------------

    /// Creates a class deriving from at most one base (`object` when `bases` is empty).
    ///
    /// Its MRO is the class followed by the base's MRO. Classes with several bases
    /// need [`new_class_with_mro`](Self::new_class_with_mro).
    pub fn new_class(&mut self, name: &str, bases: &[&Value]) -> Result<Value, Exception> {
        self.create_class(name, bases, None)
            .map(Value::Ref)
            .map_err(RunError::into_exception)
    }

    /// Creates a class with an explicit, already linearized MRO.
    ///
    /// `mro` lists the ancestors after the class itself, most-derived first; it must
    /// contain every base. `object` is appended when missing.
    pub fn new_class_with_mro(&mut self, name: &str, bases: &[&Value], mro: &[&Value]) -> Result<Value, Exception> {
        self.create_class(name, bases, Some(mro))
            .map(Value::Ref)
            .map_err(RunError::into_exception)
    }

    /// Stores `value` in the namespace of `cls`, consuming it.
    pub fn set_class_attr(&mut self, cls: &Value, name: &str, value: Value) -> Result<(), Exception> {
        let name = self.interns.intern(name);
        self.store_class_attr(cls, name, value).map_err(RunError::into_exception)
    }

    fn store_class_attr(&mut self, cls: &Value, name: StringId, value: Value) -> RunResult<()> {
        let cls_id = match self.class_id_of(cls) {
            Some(id) if self.builtins.contains(id) => {
                let err = ExcType::type_error(format!(
                    "cannot set '{}' attribute of immutable type '{}'",
                    self.interns.get_str(name),
                    self.class_name(id)
                ));
                value.drop_with_heap(&mut self.heap);
                return Err(err);
            }
            Some(id) => id,
            None => {
                let err = ExcType::type_error(format!("expected a class, got '{}'", self.type_name(cls)));
                value.drop_with_heap(&mut self.heap);
                return Err(err);
            }
        };
        let HeapData::ClassObject(class) = self.heap.get_mut(cls_id) else {
            unreachable!("class_id_of only returns classes");
        };
        let old = class.set_attr(name, value);
        self.heap.mark_potential_cycle();
        old.drop_with_heap(&mut self.heap);
        Ok(())
    }

    /// Allocates an instance of `cls` without running `__init__`.
    ///
    /// Use [`call`](Self::call) on the class to construct an instance the way Python does.
    pub fn new_instance(&mut self, cls: &Value) -> Result<Value, Exception> {
        self.instantiate(cls).map_err(RunError::into_exception)
    }

    pub(crate) fn instantiate(&mut self, cls: &Value) -> RunResult<Value> {
        let cls_id = self.expect_class(cls)?;
        if self.builtins.contains(cls_id) && cls_id != self.builtins.object {
            return Err(ExcType::type_error(format!(
                "cannot create '{}' instances",
                self.class_name(cls_id)
            )));
        }
        if self.is_subtype(cls_id, self.builtins.super_) {
            return Err(ExcType::type_error(
                "super subclasses are instantiated by calling the class",
            ));
        }
        self.heap.inc_ref(cls_id);
        self.alloc(HeapData::Instance(Instance::new(cls_id))).map(Value::Ref)
    }

    /// Sets an attribute on an object, consuming `value`.
    ///
    /// Data descriptors found on the type (members, properties) reject the
    /// assignment; instances store into their dictionary; classes store into
    /// their namespace.
    pub fn set_attr(&mut self, obj: &Value, name: &str, value: Value) -> Result<(), Exception> {
        let name = self.interns.intern(name);
        self.store_attr(obj, name, value).map_err(RunError::into_exception)
    }

    fn store_attr(&mut self, obj: &Value, name: StringId, value: Value) -> RunResult<()> {
        if self.class_id_of(obj).is_some() {
            return self.store_class_attr(obj, name, value);
        }
        let ty = self.type_of(obj);
        if let Some(found) = self.mro_lookup(ty, name) {
            let readonly = self.is_data_descriptor(&found);
            found.drop_with_heap(&mut self.heap);
            if readonly {
                let attr = self.interns.get_str(name);
                let err = ExcType::attribute_error_readonly(attr, self.class_name(ty));
                value.drop_with_heap(&mut self.heap);
                return Err(err);
            }
        }
        if let Some(id) = obj.ref_id()
            && let HeapData::Instance(inst) = self.heap.get_mut(id)
        {
            let old = inst.set_attr(name, value);
            self.heap.mark_potential_cycle();
            old.drop_with_heap(&mut self.heap);
            return Ok(());
        }
        let err = ExcType::attribute_error(self.type_name(obj), self.interns.get_str(name));
        value.drop_with_heap(&mut self.heap);
        Err(err)
    }

    /// Looks up an attribute the way `obj.name` would.
    pub fn get_attr(&mut self, obj: &Value, name: &str) -> Result<Value, Exception> {
        let name = self.interns.intern(name);
        self.getattr_value(obj, name).map_err(RunError::into_exception)
    }

    /// Calls `callable` with borrowed positional arguments.
    pub fn call(&mut self, callable: &Value, args: &[&Value]) -> Result<Value, Exception> {
        // borrowed views, the caller keeps its shares
        let args: Vec<Value> = args.iter().map(|arg| arg.copy_for_extend()).collect();
        self.call_value(callable, &args).map_err(RunError::into_exception)
    }

    /// `repr(value)`.
    pub fn repr(&mut self, value: &Value) -> Result<String, Exception> {
        self.repr_value(value).map_err(RunError::into_exception)
    }

    /// The runtime type of `value`, as a new share.
    #[must_use]
    pub fn type_of_value(&self, value: &Value) -> Value {
        let ty = self.type_of(value);
        self.heap.inc_ref(ty);
        Value::Ref(ty)
    }

    /// Whether `obj` is an instance of `cls` (or of one of its subclasses).
    #[must_use]
    pub fn is_instance(&self, obj: &Value, cls: &Value) -> bool {
        self.class_id_of(cls)
            .is_some_and(|cls| self.is_subtype(self.type_of(obj), cls))
    }

    /// The name of a class, `None` for anything else.
    #[must_use]
    pub fn class_name_of(&self, cls: &Value) -> Option<&str> {
        self.class_id_of(cls).map(|id| self.class_name(id))
    }

    // ------------------------------------------------------------------
    // Public API: callables and descriptors
    // ------------------------------------------------------------------

    /// Registers a host function so several function objects can share it.
    pub fn register_host_function(
        &mut self,
        func: impl Fn(&mut Self, &[Value]) -> Result<Value, Exception> + 'static,
    ) -> HostFunctionId {
        self.host_functions.push(Rc::new(func));
        HostFunctionId(self.host_functions.len() - 1)
    }

    /// Creates a function object. A function without a body returns `None` when called.
    pub fn new_function(&mut self, name: &str, body: Option<HostFunctionId>) -> Result<Value, Exception> {
        self.alloc(HeapData::Function(Function::new(name, body)))
            .map(Value::Ref)
            .map_err(RunError::into_exception)
    }

    /// Registers `func` and wraps it in a new function object.
    pub fn new_host_function(
        &mut self,
        name: &str,
        func: impl Fn(&mut Self, &[Value]) -> Result<Value, Exception> + 'static,
    ) -> Result<Value, Exception> {
        let id = self.register_host_function(func);
        self.new_function(name, Some(id))
    }

    /// Creates a non-data descriptor whose `__get__` runs `getter`.
    ///
    /// The getter may re-enter the runtime in any way, including re-initializing
    /// the `super` proxy through which it was found.
    pub fn new_host_descriptor(
        &mut self,
        name: &str,
        getter: impl Fn(&mut Self, Option<&Value>, &Value) -> Result<Value, Exception> + 'static,
    ) -> Result<Value, Exception> {
        self.host_getters.push(Rc::new(getter));
        let id = HostGetterId(self.host_getters.len() - 1);
        self.alloc(HeapData::HostDescriptor(HostDescriptor::new(name, id)))
            .map(Value::Ref)
            .map_err(RunError::into_exception)
    }

    /// `staticmethod(func)`, consuming `func`.
    pub fn new_static_method(&mut self, func: Value) -> Result<Value, Exception> {
        self.alloc(HeapData::StaticMethod(StaticMethod::new(func)))
            .map(Value::Ref)
            .map_err(RunError::into_exception)
    }

    /// `classmethod(func)`, consuming `func`.
    pub fn new_class_method(&mut self, func: Value) -> Result<Value, Exception> {
        self.alloc(HeapData::ClassMethod(ClassMethod::new(func)))
            .map(Value::Ref)
            .map_err(RunError::into_exception)
    }

    /// A read-only `property(fget)`, consuming `fget`.
    pub fn new_property(&mut self, fget: Value) -> Result<Value, Exception> {
        self.alloc(HeapData::Property(Property::new(fget)))
            .map(Value::Ref)
            .map_err(RunError::into_exception)
    }

    // ------------------------------------------------------------------
    // Public API: strings
    // ------------------------------------------------------------------

    /// Allocates a heap string.
    pub fn new_str(&mut self, s: &str) -> Result<Value, Exception> {
        self.alloc_str(s).map_err(RunError::into_exception)
    }

    /// An interned string; interned strings live as long as the runtime.
    pub fn intern_str(&mut self, s: &str) -> Value {
        Value::InternString(self.interns.intern(s))
    }

    /// The text of a string value, `None` for non-strings.
    #[must_use]
    pub fn str_value<'a>(&'a self, value: &Value) -> Option<&'a str> {
        match value {
            Value::InternString(id) => Some(self.interns.get_str(*id)),
            Value::Ref(id) => match self.heap.get(*id) {
                HeapData::Str(s) => Some(s.as_str()),
                _ => None,
            },
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Public API: reference counting and collection
    // ------------------------------------------------------------------

    /// Takes a new share of `value`.
    #[must_use]
    pub fn clone_value(&self, value: &Value) -> Value {
        value.clone_with_heap(&self.heap)
    }

    /// Returns a share obtained from the runtime.
    pub fn release(&mut self, value: Value) {
        value.drop_with_heap(&mut self.heap);
    }

    /// Reference count of a heap-backed value, `None` for immediates and freed entries.
    #[must_use]
    pub fn refcount(&self, value: &Value) -> Option<usize> {
        value
            .ref_id()
            .filter(|&id| self.heap.is_live(id))
            .map(|id| self.heap.get_refcount(id))
    }

    /// Whether a heap-backed value is still allocated; immediates are always live.
    #[must_use]
    pub fn is_live(&self, value: &Value) -> bool {
        value.ref_id().is_none_or(|id| self.heap.is_live(id))
    }

    /// The ids of the heap entries `value` holds a share of, in traversal order.
    #[must_use]
    pub fn referents(&self, value: &Value) -> Vec<HeapId> {
        match value.ref_id() {
            Some(id) if self.heap.is_live(id) => self.heap.ref_ids_of(id),
            _ => Vec::new(),
        }
    }

    /// Returns a snapshot of the heap.
    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.heap_stats(self.interns.interned_string_count())
    }

    /// Whether enough allocations happened since the last collection to run one.
    #[must_use]
    pub fn should_gc(&self) -> bool {
        self.heap.should_gc()
    }

    /// Frees every reference cycle nothing outside the heap can reach.
    ///
    /// Values held by the host, by host closures or by a lookup in progress carry
    /// shares the heap cannot account for, which keeps them (and everything they
    /// reach) alive. Safe to call from host code re-entered during a lookup.
    /// Returns the number of freed entries.
    pub fn collect_garbage(&mut self) -> usize {
        self.heap.collect_garbage()
    }

    // ------------------------------------------------------------------
    // Public API: builtin classes
    // ------------------------------------------------------------------

    fn builtin_value(&self, id: HeapId) -> Value {
        self.heap.inc_ref(id);
        Value::Ref(id)
    }

    #[must_use]
    pub fn object_class(&self) -> Value {
        self.builtin_value(self.builtins.object)
    }

    #[must_use]
    pub fn type_class(&self) -> Value {
        self.builtin_value(self.builtins.type_)
    }

    /// The `super` class; calling it constructs proxies, subclassing it is allowed.
    #[must_use]
    pub fn super_class(&self) -> Value {
        self.builtin_value(self.builtins.super_)
    }

    #[must_use]
    pub fn int_class(&self) -> Value {
        self.builtin_value(self.builtins.int)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{LimitedTracker, ResourceLimits};

    #[test]
    fn class_mro_follows_single_base() {
        let mut rt = Runtime::new();
        let a = rt.new_class("A", &[]).unwrap();
        let b = rt.new_class("B", &[&a]).unwrap();
        let b_id = b.ref_id().unwrap();
        let names: Vec<&str> = rt.mro(b_id).iter().map(|&id| rt.class_name(id)).collect();
        assert_eq!(names, vec!["B", "A", "object"]);
        rt.release(b);
        rt.release(a);
    }

    #[test]
    fn multiple_bases_need_explicit_mro() {
        let mut rt = Runtime::new();
        let a = rt.new_class("A", &[]).unwrap();
        let b = rt.new_class("B", &[]).unwrap();
        let err = rt.new_class("C", &[&a, &b]).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::TypeError);
        let c = rt.new_class_with_mro("C", &[&a, &b], &[&a, &b]).unwrap();
        let names: Vec<&str> = rt.mro(c.ref_id().unwrap()).iter().map(|&id| rt.class_name(id)).collect();
        assert_eq!(names, vec!["C", "A", "B", "object"]);
        for value in [c, b, a] {
            rt.release(value);
        }
    }

    #[test]
    fn releasing_a_class_releases_its_ancestors() {
        let mut rt = Runtime::new();
        let a = rt.new_class("A", &[]).unwrap();
        let b = rt.new_class("B", &[&a]).unwrap();
        assert_eq!(rt.refcount(&a), Some(2));
        rt.release(b);
        assert_eq!(rt.refcount(&a), Some(1));
        rt.release(a);
        assert_eq!(rt.heap_stats().count_of("ClassObject"), 15, "only builtins remain");
    }

    #[test]
    fn host_reentry_is_depth_limited() {
        let limits = ResourceLimits::new().max_recursion_depth(Some(3));
        let mut rt = Runtime::with_parts(LimitedTracker::new(limits), NoopTracer).unwrap();
        let recurse = rt
            .new_host_function("recurse", |rt, args| rt.call(&args[0], &[&args[0]]))
            .unwrap();
        let err = rt.call(&recurse, &[&recurse]).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::RecursionError);
        assert_eq!(rt.reentry_depth(), 0, "depth unwinds after failure");
        rt.release(recurse);
    }

    #[test]
    fn tight_limits_fail_bootstrap() {
        let limits = ResourceLimits::new().max_allocations(2);
        let err = Runtime::with_parts(LimitedTracker::new(limits), NoopTracer).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::MemoryError);
    }
}
