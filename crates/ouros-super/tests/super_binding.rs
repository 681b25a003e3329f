//! Tests for the binding validator and the descriptor get-protocol of proxies.
//!
//! The validator decides which type a proxy bound to an object scans; the binder
//! turns an unbound proxy stored on a class into a bound one when read through an
//! instance.

use ouros_super::{ExcType, Runtime, SuperBinding, Value};

const SUPER_OBJ_ERROR: &str = "super(type, obj): obj must be an instance or subtype of type";

/// `Base`, `Derived(Base)` and an unrelated class, plus one instance of each.
struct Hierarchy {
    base: Value,
    derived: Value,
    other: Value,
    derived_obj: Value,
    other_obj: Value,
}

impl Hierarchy {
    fn new(rt: &mut Runtime) -> Self {
        let base = rt.new_class("Base", &[]).unwrap();
        let derived = rt.new_class("Derived", &[&base]).unwrap();
        let other = rt.new_class("Other", &[]).unwrap();
        let derived_obj = rt.call(&derived, &[]).unwrap();
        let other_obj = rt.call(&other, &[]).unwrap();
        Self {
            base,
            derived,
            other,
            derived_obj,
            other_obj,
        }
    }

    fn release(self, rt: &mut Runtime) {
        for value in [self.other_obj, self.derived_obj, self.other, self.derived, self.base] {
            rt.release(value);
        }
    }
}

// =============================================================================
// 1. Validator
// =============================================================================

/// An instance of a subclass binds to its runtime type.
#[test]
fn check_instance_of_subclass_returns_its_type() {
    let mut rt = Runtime::new();
    let h = Hierarchy::new(&mut rt);

    let ty = rt.super_check(&h.base, &h.derived_obj).unwrap();
    assert!(ty.is(&h.derived), "binding type should be Derived");

    rt.release(ty);
    h.release(&mut rt);
}

/// A class deriving from the reference class binds to itself, including the
/// reference class.
#[test]
fn check_subclass_returns_the_class_itself() {
    let mut rt = Runtime::new();
    let h = Hierarchy::new(&mut rt);

    let ty = rt.super_check(&h.base, &h.derived).unwrap();
    assert!(ty.is(&h.derived));
    let same = rt.super_check(&h.base, &h.base).unwrap();
    assert!(same.is(&h.base), "a class is a subclass of itself");

    rt.release(same);
    rt.release(ty);
    h.release(&mut rt);
}

/// Objects unrelated to the reference class are rejected.
#[test]
fn check_rejects_unrelated_objects() {
    let mut rt = Runtime::new();
    let h = Hierarchy::new(&mut rt);

    for candidate in [&h.other_obj, &h.other, &Value::Int(3)] {
        let err = rt.super_check(&h.derived, candidate).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::TypeError);
        assert_eq!(err.message(), Some(SUPER_OBJ_ERROR));
    }
    let err = rt.super_check(&h.derived, &h.base).unwrap_err();
    assert_eq!(err.message(), Some(SUPER_OBJ_ERROR), "a base class is not a subtype");

    h.release(&mut rt);
}

/// Builtin values bind through their builtin types.
#[test]
fn check_accepts_builtin_values() {
    let mut rt = Runtime::new();
    let int_class = rt.int_class();

    let ty = rt.super_check(&int_class, &Value::Int(3)).unwrap();
    assert!(ty.is(&int_class));
    let bool_ty = rt.super_check(&int_class, &Value::Bool(true)).unwrap();
    assert_eq!(rt.class_name_of(&bool_ty), Some("bool"), "bool derives from int");

    for value in [bool_ty, ty, int_class] {
        rt.release(value);
    }
}

/// A non-class reference type is rejected before any binding check.
#[test]
fn check_rejects_non_class_reference() {
    let mut rt = Runtime::new();
    let h = Hierarchy::new(&mut rt);

    let err = rt.super_check(&Value::Int(1), &h.derived_obj).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: must be type, not int");

    h.release(&mut rt);
}

// =============================================================================
// 2. Binder
// =============================================================================

/// Binding an unbound proxy to an instance creates a new, instance-bound proxy.
#[test]
fn unbound_proxy_binds_to_instance() {
    let mut rt = Runtime::new();
    let h = Hierarchy::new(&mut rt);
    let unbound = rt.construct_super(&h.base, None).unwrap();
    let unbound_refs = rt.refcount(&unbound);

    let bound = rt
        .super_descriptor_get(&unbound, Some(&h.derived_obj), Some(&h.derived))
        .unwrap();
    assert!(!bound.is(&unbound), "binding must produce a fresh proxy");
    assert_eq!(rt.refcount(&unbound), unbound_refs, "original proxy is untouched");
    assert_eq!(rt.super_binding(&bound).unwrap(), SuperBinding::Instance);
    assert_eq!(rt.super_binding(&unbound).unwrap(), SuperBinding::Unbound);

    let self_obj = rt.super_getattr(&bound, "__self__").unwrap();
    assert!(self_obj.is(&h.derived_obj));
    let this_class = rt.super_getattr(&bound, "__thisclass__").unwrap();
    assert!(this_class.is(&h.base));

    for value in [this_class, self_obj, bound, unbound] {
        rt.release(value);
    }
    h.release(&mut rt);
}

/// An already bound proxy is returned as-is with one more share.
#[test]
fn bound_proxy_is_reused() {
    let mut rt = Runtime::new();
    let h = Hierarchy::new(&mut rt);
    let bound = rt.construct_super(&h.base, Some(&h.derived_obj)).unwrap();
    let before = rt.refcount(&bound).unwrap();
    let proxies_before = rt.heap_stats().count_of("SuperProxy");

    let again = rt.super_descriptor_get(&bound, Some(&h.derived_obj), None).unwrap();
    assert!(again.is(&bound), "same proxy returned");
    assert_eq!(rt.refcount(&bound), Some(before + 1));
    assert_eq!(rt.heap_stats().count_of("SuperProxy"), proxies_before, "no allocation");

    rt.release(again);
    rt.release(bound);
    h.release(&mut rt);
}

/// A missing or `None` instance returns the proxy itself.
#[test]
fn missing_instance_returns_same_proxy() {
    let mut rt = Runtime::new();
    let h = Hierarchy::new(&mut rt);
    let unbound = rt.construct_super(&h.base, None).unwrap();

    let no_instance = rt.super_descriptor_get(&unbound, None, Some(&h.derived)).unwrap();
    assert!(no_instance.is(&unbound));
    let none_instance = rt.super_descriptor_get(&unbound, Some(&Value::None), None).unwrap();
    assert!(none_instance.is(&unbound));
    assert_eq!(rt.refcount(&unbound), Some(3));

    for value in [none_instance, no_instance, unbound] {
        rt.release(value);
    }
    h.release(&mut rt);
}

/// Binding to an object outside the reference class's hierarchy fails.
#[test]
fn binding_to_unrelated_instance_fails() {
    let mut rt = Runtime::new();
    let h = Hierarchy::new(&mut rt);
    let unbound = rt.construct_super(&h.base, None).unwrap();
    let live_before = rt.heap_stats().live_objects;
    let base_refs = rt.refcount(&h.base);

    let err = rt.super_descriptor_get(&unbound, Some(&h.other_obj), None).unwrap_err();
    assert_eq!(err.message(), Some(SUPER_OBJ_ERROR));
    assert_eq!(rt.heap_stats().live_objects, live_before, "failed bind allocates nothing");
    assert_eq!(rt.refcount(&h.base), base_refs, "shares taken during the failed bind are released");

    rt.release(unbound);
    h.release(&mut rt);
}

/// A proxy stored as a class attribute binds to the instance it is read through.
#[test]
fn class_attribute_proxy_binds_on_access() {
    let mut rt = Runtime::new();
    let h = Hierarchy::new(&mut rt);
    let greeting = rt.intern_str("from Base");
    rt.set_class_attr(&h.base, "greet", greeting).unwrap();
    let unbound = rt.construct_super(&h.derived, None).unwrap();
    let stored = rt.clone_value(&unbound);
    rt.set_class_attr(&h.derived, "_super", stored).unwrap();

    let bound = rt.get_attr(&h.derived_obj, "_super").unwrap();
    assert_eq!(rt.super_binding(&bound).unwrap(), SuperBinding::Instance);
    assert_eq!(rt.super_repr(&bound).unwrap(), "<super: <class 'Derived'>, <Derived object>>");
    let found = rt.super_getattr(&bound, "greet").unwrap();
    assert_eq!(rt.str_value(&found), Some("from Base"));

    let through_class = rt.get_attr(&h.derived, "_super").unwrap();
    assert!(through_class.is(&unbound), "class access passes no instance");

    for value in [through_class, found, bound, unbound] {
        rt.release(value);
    }
    h.release(&mut rt);
}

/// `super.__get__` called as a method behaves like the descriptor entry point.
#[test]
fn dunder_get_method_binds() {
    let mut rt = Runtime::new();
    let h = Hierarchy::new(&mut rt);
    let unbound = rt.construct_super(&h.base, None).unwrap();

    let get = rt.get_attr(&unbound, "__get__").unwrap();
    let bound = rt.call(&get, &[&h.derived_obj]).unwrap();
    assert_eq!(rt.super_binding(&bound).unwrap(), SuperBinding::Instance);

    let err = rt.call(&get, &[]).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::TypeError);

    for value in [bound, get, unbound] {
        rt.release(value);
    }
    h.release(&mut rt);
}
