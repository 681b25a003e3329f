//! Tests for the events the proxy reports to a [`RuntimeTracer`].

use ouros_super::{
    BindOutcome, ErrorSlot, ExcType, Exception, LookupSkip, NoLimitTracker, RecordingTracer, Runtime, SuperBinding,
    TraceEvent, Value,
};
use pretty_assertions::assert_eq;

type TracedRuntime = Runtime<NoLimitTracker, RecordingTracer>;

/// `A` with a plain attribute `m`, `B(A)`, `C(B)` and an instance of `C`.
fn traced() -> (TracedRuntime, [Value; 4]) {
    let mut rt = Runtime::with_parts(NoLimitTracker, RecordingTracer::new()).unwrap();
    let a = rt.new_class("A", &[]).unwrap();
    let b = rt.new_class("B", &[&a]).unwrap();
    let c = rt.new_class("C", &[&b]).unwrap();
    let m = rt.intern_str("A.m");
    rt.set_class_attr(&a, "m", m).unwrap();
    let obj = rt.call(&c, &[]).unwrap();
    rt.tracer_mut().clear();
    (rt, [obj, c, b, a])
}

fn release_all(rt: &mut TracedRuntime, values: impl IntoIterator<Item = Value>) {
    for value in values {
        rt.release(value);
    }
}

// =============================================================================
// 1. Lookup events
// =============================================================================

/// A hit reports the defining class and its MRO position.
#[test]
fn mro_hit_is_recorded() {
    let (mut rt, values) = traced();
    let [obj, _, b, _] = &values;
    let proxy = rt.construct_super(b, Some(obj)).unwrap();
    let found = rt.super_getattr(&proxy, "m").unwrap();

    assert_eq!(
        rt.tracer().events(),
        &[
            TraceEvent::Init {
                reinit: false,
                binding: SuperBinding::Instance,
            },
            TraceEvent::SuperLookup {
                attr: "m".to_owned(),
                skip: None,
            },
            TraceEvent::MroHit {
                attr: "m".to_owned(),
                class_name: "A".to_owned(),
                mro_index: 2,
            },
        ]
    );

    release_all(&mut rt, [found, proxy]);
    release_all(&mut rt, values);
}

/// Skipped scans and fallbacks are reported with their reason.
#[test]
fn skips_and_fallbacks_are_recorded() {
    let (mut rt, values) = traced();
    let [obj, _, b, _] = &values;
    let bound = rt.construct_super(b, Some(obj)).unwrap();
    let unbound = rt.construct_super(b, None).unwrap();
    rt.tracer_mut().clear();

    let cls = rt.super_getattr(&bound, "__class__").unwrap();
    let this_class = rt.super_getattr(&unbound, "__thisclass__").unwrap();

    assert_eq!(
        rt.tracer().events(),
        &[
            TraceEvent::SuperLookup {
                attr: "__class__".to_owned(),
                skip: Some(LookupSkip::ApparentClass),
            },
            TraceEvent::Fallback {
                attr: "__class__".to_owned(),
            },
            TraceEvent::SuperLookup {
                attr: "__thisclass__".to_owned(),
                skip: Some(LookupSkip::Unbound),
            },
            TraceEvent::Fallback {
                attr: "__thisclass__".to_owned(),
            },
        ]
    );

    release_all(&mut rt, [this_class, cls, unbound, bound]);
    release_all(&mut rt, values);
}

// =============================================================================
// 2. Binding and initialization
// =============================================================================

/// The binder reports reuse and fresh allocation.
#[test]
fn bind_outcomes_are_recorded() {
    let (mut rt, values) = traced();
    let [obj, _, b, _] = &values;
    let unbound = rt.construct_super(b, None).unwrap();
    rt.tracer_mut().clear();

    let same = rt.super_descriptor_get(&unbound, None, None).unwrap();
    let bound = rt.super_descriptor_get(&unbound, Some(obj), None).unwrap();
    rt.reinit_super(&bound, b, None).unwrap();

    assert_eq!(
        rt.tracer().events(),
        &[
            TraceEvent::Bind {
                outcome: BindOutcome::Reused,
            },
            TraceEvent::Bind {
                outcome: BindOutcome::Fresh,
            },
            TraceEvent::Init {
                reinit: false,
                binding: SuperBinding::Instance,
            },
            TraceEvent::Init {
                reinit: true,
                binding: SuperBinding::Unbound,
            },
        ]
    );

    release_all(&mut rt, [bound, same, unbound]);
    release_all(&mut rt, values);
}

// =============================================================================
// 3. Boundary and host events
// =============================================================================

/// Boundary failures are traced; internal-convention failures are not.
#[test]
fn boundary_errors_are_recorded() {
    let (mut rt, values) = traced();
    let [obj, _, b, _] = &values;
    let proxy = rt.construct_super(b, Some(obj)).unwrap();
    let _ = rt.super_getattr(&proxy, "missing").unwrap_err();
    rt.tracer_mut().clear();

    let mut slot = ErrorSlot::new();
    assert!(rt.super_getattro(&mut slot, &proxy, "missing").is_none());

    let expected = Exception::with_message(ExcType::AttributeError, "'super' object has no attribute 'missing'");
    assert_eq!(
        rt.tracer().events().last(),
        Some(&TraceEvent::BoundaryError {
            entry: "super_getattro".to_owned(),
            exception: expected.clone(),
        })
    );
    assert_eq!(slot.take(), Some(expected));

    let json = rt.tracer().to_json_lines();
    let last = json.lines().last().unwrap();
    assert!(
        last.starts_with(r#"{"event":"boundary_error","entry":"super_getattro""#),
        "unexpected json line: {last}"
    );

    release_all(&mut rt, [proxy]);
    release_all(&mut rt, values);
}

/// Host code reached through a proxy lookup is reported with its depth.
#[test]
fn host_entry_is_recorded() {
    let (mut rt, values) = traced();
    let [obj, _, b, a] = &values;
    let getter = rt
        .new_host_function("p", |rt, args| {
            let text = format!("p of {}", rt.type_name(&args[0]));
            rt.new_str(&text)
        })
        .unwrap();
    let prop = rt.new_property(getter).unwrap();
    rt.set_class_attr(a, "p", prop).unwrap();
    let proxy = rt.construct_super(b, Some(obj)).unwrap();
    rt.tracer_mut().clear();

    let found = rt.super_getattr(&proxy, "p").unwrap();
    assert_eq!(rt.str_value(&found), Some("p of C"));
    assert_eq!(
        rt.tracer().events().last(),
        Some(&TraceEvent::HostEnter { depth: 1 })
    );
    assert_eq!(rt.reentry_depth(), 0);

    release_all(&mut rt, [found, proxy]);
    release_all(&mut rt, values);
}

/// Recorded lookups render as one JSON object per line.
#[test]
fn events_export_as_json_lines() {
    let (mut rt, values) = traced();
    let [obj, _, b, _] = &values;
    let proxy = rt.construct_super(b, Some(obj)).unwrap();
    let found = rt.super_getattr(&proxy, "m").unwrap();

    assert_eq!(
        rt.tracer().to_json_lines(),
        concat!(
            r#"{"event":"init","reinit":false,"binding":"instance"}"#,
            "\n",
            r#"{"event":"super_lookup","attr":"m","skip":null}"#,
            "\n",
            r#"{"event":"mro_hit","attr":"m","class_name":"A","mro_index":2}"#,
            "\n",
        )
    );

    release_all(&mut rt, [found, proxy]);
    release_all(&mut rt, values);
}
