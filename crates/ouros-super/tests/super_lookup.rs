//! Tests for attribute resolution through `super` proxies.
//!
//! Covers the MRO scan starting strictly after the reference class, the descriptor
//! get-protocol applied to hits, and the fallback to the proxy's own attributes.

use ouros_super::{ExcType, Runtime, Value};

/// Classes of the diamond `D(B, C)`, `B(A)`, `C(A)` with MRO `[D, B, C, A, object]`.
struct Diamond {
    a: Value,
    b: Value,
    c: Value,
    d: Value,
}

impl Diamond {
    fn new(rt: &mut Runtime) -> Self {
        let a = rt.new_class("A", &[]).unwrap();
        let b = rt.new_class("B", &[&a]).unwrap();
        let c = rt.new_class("C", &[&a]).unwrap();
        let d = rt.new_class_with_mro("D", &[&b, &c], &[&b, &c, &a]).unwrap();
        Self { a, b, c, d }
    }

    fn release(self, rt: &mut Runtime) {
        for cls in [self.d, self.c, self.b, self.a] {
            rt.release(cls);
        }
    }
}

fn set_str(rt: &mut Runtime, cls: &Value, name: &str, text: &str) {
    let value = rt.intern_str(text);
    rt.set_class_attr(cls, name, value).unwrap();
}

// =============================================================================
// 1. MRO scan
// =============================================================================

/// With `m` on B and A, `super(C, d).m` skips B (before C in the MRO) and finds A's.
#[test]
fn scan_starts_strictly_after_reference_class() {
    let mut rt = Runtime::new();
    let h = Diamond::new(&mut rt);
    set_str(&mut rt, &h.b, "m", "B.m");
    set_str(&mut rt, &h.a, "m", "A.m");

    let d = rt.call(&h.d, &[]).unwrap();
    let proxy = rt.construct_super(&h.c, Some(&d)).unwrap();
    let found = rt.super_getattr(&proxy, "m").unwrap();
    assert_eq!(rt.str_value(&found), Some("A.m"), "B precedes C in the MRO and must be skipped");

    let from_d = rt.construct_super(&h.d, Some(&d)).unwrap();
    let found_b = rt.super_getattr(&from_d, "m").unwrap();
    assert_eq!(rt.str_value(&found_b), Some("B.m"), "scan after D starts at B");

    for value in [found_b, from_d, found, proxy, d] {
        rt.release(value);
    }
    h.release(&mut rt);
}

/// The reference class's own namespace is never consulted.
#[test]
fn reference_class_namespace_is_skipped() {
    let mut rt = Runtime::new();
    let h = Diamond::new(&mut rt);
    set_str(&mut rt, &h.c, "only_on_c", "C");

    let d = rt.call(&h.d, &[]).unwrap();
    let proxy = rt.construct_super(&h.c, Some(&d)).unwrap();
    let err = rt.super_getattr(&proxy, "only_on_c").unwrap_err();
    assert_eq!(err.exc_type(), ExcType::AttributeError);
    assert_eq!(err.message(), Some("'super' object has no attribute 'only_on_c'"));

    rt.release(proxy);
    rt.release(d);
    h.release(&mut rt);
}

// =============================================================================
// 2. Descriptor get-protocol on hits
// =============================================================================

/// Functions found through an instance-bound proxy are bound to the instance.
#[test]
fn functions_bind_to_the_bound_object() {
    let mut rt = Runtime::new();
    let h = Diamond::new(&mut rt);
    let method = rt
        .new_host_function("m", |rt, args| {
            let text = format!("A.m on {}", rt.type_name(&args[0]));
            rt.new_str(&text)
        })
        .unwrap();
    rt.set_class_attr(&h.a, "m", method).unwrap();

    let d = rt.call(&h.d, &[]).unwrap();
    let proxy = rt.construct_super(&h.b, Some(&d)).unwrap();
    let bound = rt.super_getattr(&proxy, "m").unwrap();
    assert_eq!(rt.type_name(&bound), "method");

    let self_arg = rt.get_attr(&bound, "__self__").unwrap();
    assert!(self_arg.is(&d), "bound method's __self__ is the proxy's bound object");

    let result = rt.call(&bound, &[]).unwrap();
    assert_eq!(rt.str_value(&result), Some("A.m on D"));

    for value in [result, self_arg, bound, proxy, d] {
        rt.release(value);
    }
    h.release(&mut rt);
}

/// A class-bound proxy passes no instance: functions come back unbound, class
/// methods bind to the bound class.
#[test]
fn class_bound_proxy_invokes_descriptors_without_instance() {
    let mut rt = Runtime::new();
    let h = Diamond::new(&mut rt);
    let func = rt.new_function("plain", None).unwrap();
    let func_share = rt.clone_value(&func);
    rt.set_class_attr(&h.a, "plain", func_share).unwrap();
    let cm_body = rt
        .new_host_function("cm", |rt, args| {
            let name = rt.class_name_of(&args[0]).unwrap_or("?").to_owned();
            rt.new_str(&name)
        })
        .unwrap();
    let cm = rt.new_class_method(cm_body).unwrap();
    rt.set_class_attr(&h.a, "cm", cm).unwrap();

    let proxy = rt.construct_super(&h.b, Some(&h.d)).unwrap();
    assert_eq!(rt.super_binding(&proxy).unwrap(), ouros_super::SuperBinding::Type);

    let plain = rt.super_getattr(&proxy, "plain").unwrap();
    assert!(plain.is(&func), "function is returned as-is without an instance");

    let bound_cm = rt.super_getattr(&proxy, "cm").unwrap();
    let name = rt.call(&bound_cm, &[]).unwrap();
    assert_eq!(rt.str_value(&name), Some("D"), "class method binds to the bound type");

    for value in [name, bound_cm, plain, proxy, func] {
        rt.release(value);
    }
    h.release(&mut rt);
}

/// Static methods unwrap and properties call their getter with the bound object.
#[test]
fn static_methods_and_properties_resolve_through_proxy() {
    let mut rt = Runtime::new();
    let h = Diamond::new(&mut rt);
    let sm_body = rt.new_host_function("sm", |_, args| Ok(Value::Int(args.len() as i64 + 40))).unwrap();
    let sm = rt.new_static_method(sm_body).unwrap();
    rt.set_class_attr(&h.a, "sm", sm).unwrap();
    let getter = rt
        .new_host_function("p", |rt, args| {
            let text = format!("prop of {}", rt.type_name(&args[0]));
            rt.new_str(&text)
        })
        .unwrap();
    let prop = rt.new_property(getter).unwrap();
    rt.set_class_attr(&h.a, "p", prop).unwrap();

    let d = rt.call(&h.d, &[]).unwrap();
    let proxy = rt.construct_super(&h.c, Some(&d)).unwrap();

    let sm = rt.super_getattr(&proxy, "sm").unwrap();
    assert_eq!(rt.type_name(&sm), "function", "static method unwraps to the function");
    let result = rt.call(&sm, &[&Value::Int(1), &Value::Int(2)]).unwrap();
    assert!(result.is(&Value::Int(42)));

    let prop_value = rt.super_getattr(&proxy, "p").unwrap();
    assert_eq!(rt.str_value(&prop_value), Some("prop of D"));

    for value in [prop_value, result, sm, proxy, d] {
        rt.release(value);
    }
    h.release(&mut rt);
}

/// Errors raised by a descriptor propagate out of the lookup unchanged.
#[test]
fn descriptor_errors_propagate() {
    let mut rt = Runtime::new();
    let h = Diamond::new(&mut rt);
    let getter = rt
        .new_host_function("broken", |_, _| {
            Err(ouros_super::Exception::with_message(ExcType::ValueError, "no value here"))
        })
        .unwrap();
    let prop = rt.new_property(getter).unwrap();
    rt.set_class_attr(&h.a, "broken", prop).unwrap();

    let d = rt.call(&h.d, &[]).unwrap();
    let proxy = rt.construct_super(&h.b, Some(&d)).unwrap();
    let err = rt.super_getattr(&proxy, "broken").unwrap_err();
    assert_eq!(err.to_string(), "ValueError: no value here");

    rt.release(proxy);
    rt.release(d);
    h.release(&mut rt);
}

// =============================================================================
// 3. Fallback to the proxy's own attributes
// =============================================================================

/// Attributes missing from the scan but defined on `super` come from the proxy.
#[test]
fn fallback_finds_proxy_members() {
    let mut rt = Runtime::new();
    let h = Diamond::new(&mut rt);
    let d = rt.call(&h.d, &[]).unwrap();
    let proxy = rt.construct_super(&h.c, Some(&d)).unwrap();

    let this_class = rt.super_getattr(&proxy, "__thisclass__").unwrap();
    assert!(this_class.is(&h.c));
    let self_obj = rt.super_getattr(&proxy, "__self__").unwrap();
    assert!(self_obj.is(&d));
    let self_class = rt.super_getattr(&proxy, "__self_class__").unwrap();
    assert!(self_class.is(&h.d));

    for value in [self_class, self_obj, this_class, proxy, d] {
        rt.release(value);
    }
    h.release(&mut rt);
}

/// An unbound proxy skips the scan; `__repr__` comes from `super`.
#[test]
fn unbound_proxy_uses_its_own_repr() {
    let mut rt = Runtime::new();
    let base = rt.new_class("Base", &[]).unwrap();
    let proxy = rt.construct_super(&base, None).unwrap();

    let repr = rt.super_getattr(&proxy, "__repr__").unwrap();
    let text = rt.call(&repr, &[]).unwrap();
    assert_eq!(rt.str_value(&text), Some("<super: <class 'Base'>, <NULL>>"));

    let self_obj = rt.super_getattr(&proxy, "__self__").unwrap();
    assert!(self_obj.is_none(), "unbound proxy reports __self__ as None");

    for value in [self_obj, text, repr, proxy, base] {
        rt.release(value);
    }
}

/// `__class__` describes the proxy, never the proxied object.
#[test]
fn apparent_class_is_the_proxy_type() {
    let mut rt = Runtime::new();
    let h = Diamond::new(&mut rt);
    let d = rt.call(&h.d, &[]).unwrap();
    let proxy = rt.construct_super(&h.b, Some(&d)).unwrap();

    let cls = rt.super_getattr(&proxy, "__class__").unwrap();
    assert_eq!(rt.class_name_of(&cls), Some("super"));

    for value in [cls, proxy, d] {
        rt.release(value);
    }
    h.release(&mut rt);
}

/// Instance attributes of the bound object are invisible to the proxy.
#[test]
fn instance_dict_is_not_consulted() {
    let mut rt = Runtime::new();
    let h = Diamond::new(&mut rt);
    let d = rt.call(&h.d, &[]).unwrap();
    rt.set_attr(&d, "x", Value::Int(1)).unwrap();
    let direct = rt.get_attr(&d, "x").unwrap();
    assert!(direct.is(&Value::Int(1)));

    let proxy = rt.construct_super(&h.b, Some(&d)).unwrap();
    let err = rt.super_getattr(&proxy, "x").unwrap_err();
    assert_eq!(err.exc_type(), ExcType::AttributeError);

    rt.release(proxy);
    rt.release(d);
    h.release(&mut rt);
}

/// Generic attribute access on a proxy value goes through the resolver too.
#[test]
fn get_attr_on_proxy_dispatches_to_resolver() {
    let mut rt = Runtime::new();
    let h = Diamond::new(&mut rt);
    set_str(&mut rt, &h.a, "m", "A.m");
    let d = rt.call(&h.d, &[]).unwrap();
    let proxy = rt.construct_super(&h.c, Some(&d)).unwrap();

    let found = rt.get_attr(&proxy, "m").unwrap();
    assert_eq!(rt.str_value(&found), Some("A.m"));

    for value in [found, proxy, d] {
        rt.release(value);
    }
    h.release(&mut rt);
}

/// Failed lookups of names no class defines leave the interner untouched.
#[test]
fn unknown_names_are_not_interned() {
    let mut rt = Runtime::new();
    let h = Diamond::new(&mut rt);
    let d = rt.call(&h.d, &[]).unwrap();
    let proxy = rt.construct_super(&h.c, Some(&d)).unwrap();
    let interned = rt.heap_stats().interned_strings;

    for i in 0..5 {
        let err = rt.super_getattr(&proxy, &format!("never_defined_{i}")).unwrap_err();
        assert_eq!(err.to_string(), format!("AttributeError: 'super' object has no attribute 'never_defined_{i}'"));
    }
    assert_eq!(rt.heap_stats().interned_strings, interned, "interner did not grow");

    for value in [proxy, d] {
        rt.release(value);
    }
    h.release(&mut rt);
}
