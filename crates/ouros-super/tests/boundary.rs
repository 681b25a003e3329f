//! Tests for the boundary calling convention.
//!
//! Boundary entry points never propagate: a failure is stored in the caller's
//! [`ErrorSlot`] and `None` is returned. The generic `*_with` forms accept either
//! convention.

use ouros_super::{Capi, Cxx, ErrorSlot, ExcType, Runtime, Value};

fn setup(rt: &mut Runtime) -> [Value; 4] {
    let base = rt.new_class("Base", &[]).unwrap();
    let derived = rt.new_class("Derived", &[&base]).unwrap();
    let greeting = rt.intern_str("hi");
    rt.set_class_attr(&base, "greet", greeting).unwrap();
    let x = rt.call(&derived, &[]).unwrap();
    let proxy = rt.construct_super(&derived, Some(&x)).unwrap();
    [proxy, x, derived, base]
}

// =============================================================================
// 1. Attribute lookup
// =============================================================================

/// A failing lookup returns the sentinel and records the error.
#[test]
fn failed_getattro_sets_slot() {
    let mut rt = Runtime::new();
    let values = setup(&mut rt);
    let mut slot = ErrorSlot::new();

    let result = rt.super_getattro(&mut slot, &values[0], "missing");
    assert!(result.is_none(), "sentinel returned");
    let err = slot.take().expect("error recorded");
    assert_eq!(err.exc_type(), ExcType::AttributeError);
    assert_eq!(err.message(), Some("'super' object has no attribute 'missing'"));
    assert!(!slot.is_set(), "take leaves the slot clean");

    for value in values {
        rt.release(value);
    }
}

/// After a failure is consumed, the next boundary call starts clean and succeeds.
#[test]
fn reentry_after_failure_succeeds() {
    let mut rt = Runtime::new();
    let values = setup(&mut rt);
    let mut slot = ErrorSlot::new();

    assert!(rt.super_getattro(&mut slot, &values[0], "missing").is_none());
    slot.clear();

    let found = rt.super_getattro(&mut slot, &values[0], "greet").expect("lookup succeeds");
    assert_eq!(rt.str_value(&found), Some("hi"));
    assert!(!slot.is_set(), "success leaves the slot untouched");

    rt.release(found);
    for value in values {
        rt.release(value);
    }
}

/// A later failure replaces the pending error, so the slot describes the call
/// that just returned the sentinel.
#[test]
fn latest_error_replaces_pending() {
    let mut rt = Runtime::new();
    let values = setup(&mut rt);
    let mut slot = ErrorSlot::new();

    assert!(rt.super_getattro(&mut slot, &values[0], "first").is_none());
    assert!(rt.super_getattro(&mut slot, &values[1], "greet").is_none());
    let err = slot.take().unwrap();
    assert_eq!(err.exc_type(), ExcType::TypeError);
    assert_eq!(err.message(), Some("expected a 'super' object, got 'Derived'"));
    assert!(!slot.is_set());

    for value in values {
        rt.release(value);
    }
}

/// Passing something that is not a proxy is reported through the slot too.
#[test]
fn non_proxy_is_a_type_error() {
    let mut rt = Runtime::new();
    let values = setup(&mut rt);
    let mut slot = ErrorSlot::new();

    assert!(rt.super_getattro(&mut slot, &Value::Int(1), "greet").is_none());
    let err = slot.take().unwrap();
    assert_eq!(err.to_string(), "TypeError: expected a 'super' object, got 'int'");

    for value in values {
        rt.release(value);
    }
}

// =============================================================================
// 2. Descriptor get
// =============================================================================

/// Binding to an unrelated object records the validator's error.
#[test]
fn failed_descr_get_sets_slot() {
    let mut rt = Runtime::new();
    let values = setup(&mut rt);
    let other = rt.new_class("Other", &[]).unwrap();
    let y = rt.call(&other, &[]).unwrap();
    let unbound = rt.construct_super(&values[3], None).unwrap();
    let mut slot = ErrorSlot::new();

    assert!(rt.super_descr_get(&mut slot, &unbound, Some(&y), None).is_none());
    let err = slot.take().unwrap();
    assert_eq!(
        err.message(),
        Some("super(type, obj): obj must be an instance or subtype of type")
    );

    let bound = rt
        .super_descr_get(&mut slot, &unbound, Some(&values[1]), Some(&values[2]))
        .expect("binding to an instance of Derived succeeds");
    assert!(!slot.is_set());

    for value in [bound, unbound, y, other] {
        rt.release(value);
    }
    for value in values {
        rt.release(value);
    }
}

// =============================================================================
// 3. Generic entry points
// =============================================================================

/// The same entry point delivers through either convention.
#[test]
fn generic_entry_points_follow_the_style() {
    let mut rt = Runtime::new();
    let values = setup(&mut rt);

    let err = rt.super_getattr_with(&mut Cxx, &values[0], "missing").unwrap_err();
    assert_eq!(err.exc_type(), ExcType::AttributeError);

    let mut slot = ErrorSlot::new();
    let mut capi = Capi::new(&mut slot);
    assert!(rt.super_getattr_with(&mut capi, &values[0], "missing").is_none());
    assert_eq!(capi.pending().map(|err| err.exc_type()), Some(ExcType::AttributeError));
    assert!(slot.is_set());
    slot.clear();

    let mut capi = Capi::new(&mut slot);
    let checked = rt
        .super_check_with(&mut capi, &values[3], &values[1])
        .expect("Derived instance validates against Base");
    assert!(checked.is(&values[2]));
    let proxy = rt
        .construct_super_with(&mut Capi::new(&mut slot), &Value::None, None);
    assert!(proxy.is_none());
    assert_eq!(slot.take().unwrap().message(), Some("must be type, not NoneType"));

    rt.release(checked);
    for value in values {
        rt.release(value);
    }
}
