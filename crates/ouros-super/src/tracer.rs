//! Runtime tracing infrastructure.
//!
//! A trait-based tracing system with zero-cost defaults. When using [`NoopTracer`],
//! every hook compiles away through monomorphization, the same way
//! [`NoLimitTracker`](crate::resource::NoLimitTracker) eliminates resource checks.
//!
//! # Architecture
//!
//! The [`RuntimeTracer`] trait defines hook points at the decisions the super
//! proxy makes: where a lookup starts, where in the MRO it hits, how a proxy is
//! bound, and when an error crosses the boundary into an [`ErrorSlot`](crate::ErrorSlot).
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Zero-cost no-op (production default) |
//! | [`StderrTracer`] | Human-readable event log to stderr |
//! | [`RecordingTracer`] | Full event recording, exportable as JSON lines |
//!
//! # Usage
//!
//! ```ignore
//! // Production (zero overhead):
//! let mut rt = Runtime::new();
//!
//! // Post-mortem:
//! let mut rt = Runtime::with_parts(NoLimitTracker, RecordingTracer::new())?;
//! // ... resolve attributes ...
//! println!("{}", rt.tracer().to_json_lines());
//! ```

use serde::Serialize;

use crate::{exception_public::Exception, types::SuperBinding};

/// Why a super lookup skipped the MRO scan and went straight to the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupSkip {
    /// The proxy is unbound, there is no MRO to scan.
    Unbound,
    /// `__class__` must describe the proxy itself.
    ApparentClass,
}

/// How the binder produced its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindOutcome {
    /// Already bound or no instance given: the same proxy was returned.
    Reused,
    /// The proxy's type is a user subclass of `super`, whose constructor was called.
    Subtype,
    /// A new proxy was validated and allocated.
    Fresh,
}

/// Trace event recorded by [`RecordingTracer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// A super attribute lookup started.
    SuperLookup {
        attr: String,
        /// Set when the MRO scan is skipped.
        skip: Option<LookupSkip>,
    },
    /// The MRO scan found the attribute.
    MroHit {
        attr: String,
        /// Name of the class whose namespace held the attribute.
        class_name: String,
        /// Position of that class in the bound type's MRO.
        mro_index: usize,
    },
    /// Generic lookup on the proxy itself.
    Fallback { attr: String },
    /// The descriptor get-protocol was applied to a proxy.
    Bind { outcome: BindOutcome },
    /// A proxy's fields were set, either at construction or by re-init.
    Init { reinit: bool, binding: SuperBinding },
    /// The validator accepted a candidate through its `__class__` attribute.
    ApparentClassOverride { class_name: String },
    /// A failure was recorded in the error slot at a boundary entry point.
    BoundaryError { entry: String, exception: Exception },
    /// Host code is about to be entered.
    HostEnter { depth: usize },
}

/// Trait for runtime tracing.
///
/// All methods have default no-op implementations, so [`NoopTracer`] requires zero
/// lines of code. Implementations only override the hooks they care about.
pub trait RuntimeTracer: std::fmt::Debug {
    /// Called when a super attribute lookup starts.
    ///
    /// # Arguments
    /// * `attr` - The attribute name
    /// * `skip` - Set when the MRO scan is skipped entirely
    #[inline(always)]
    fn on_super_lookup(&mut self, _attr: &str, _skip: Option<LookupSkip>) {}

    /// Called when the MRO scan finds the attribute in a class namespace.
    #[inline(always)]
    fn on_mro_hit(&mut self, _attr: &str, _class_name: &str, _mro_index: usize) {}

    /// Called when a lookup falls back to generic attribute lookup on the proxy.
    #[inline(always)]
    fn on_fallback(&mut self, _attr: &str) {}

    /// Called when the binder returns.
    #[inline(always)]
    fn on_bind(&mut self, _outcome: BindOutcome) {}

    /// Called after a proxy's fields have been set.
    ///
    /// # Arguments
    /// * `reinit` - True when an existing proxy was re-initialized in place
    /// * `binding` - The resulting binding kind
    #[inline(always)]
    fn on_init(&mut self, _reinit: bool, _binding: SuperBinding) {}

    /// Called when the validator's apparent-class branch accepts a candidate.
    #[inline(always)]
    fn on_apparent_class_override(&mut self, _class_name: &str) {}

    /// Called when a boundary entry point records a failure in its error slot.
    #[inline(always)]
    fn on_boundary_error(&mut self, _entry: &str, _exception: &Exception) {}

    /// Called before host code runs.
    ///
    /// # Arguments
    /// * `depth` - Re-entry depth after entering
    #[inline(always)]
    fn on_host_enter(&mut self, _depth: usize) {}
}

// ============================================================================
// NoopTracer
// ============================================================================

/// A tracer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl RuntimeTracer for NoopTracer {}

// ============================================================================
// StderrTracer
// ============================================================================

/// Tracer that prints a human-readable event log to stderr.
///
/// Output format:
/// ```text
///   >>> SUPER LOOKUP greet
///   +++ MRO HIT greet in A [3]
///   ... BIND fresh
/// ```
#[derive(Debug, Default)]
pub struct StderrTracer {
    /// Maximum number of lines to print before stopping. None = unlimited.
    limit: Option<usize>,
    count: usize,
}

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracer that goes quiet after `limit` lines.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            count: 0,
        }
    }

    fn emit(&mut self, line: std::fmt::Arguments<'_>) {
        if self.limit.is_some_and(|limit| self.count >= limit) {
            return;
        }
        eprintln!("{line}");
        self.count += 1;
        if let Some(limit) = self.limit
            && self.count == limit
        {
            eprintln!("--- trace limit reached ({limit} events) ---");
        }
    }
}

impl RuntimeTracer for StderrTracer {
    fn on_super_lookup(&mut self, attr: &str, skip: Option<LookupSkip>) {
        match skip {
            Some(reason) => self.emit(format_args!("  >>> SUPER LOOKUP {attr} (skip: {reason:?})")),
            None => self.emit(format_args!("  >>> SUPER LOOKUP {attr}")),
        }
    }

    fn on_mro_hit(&mut self, attr: &str, class_name: &str, mro_index: usize) {
        self.emit(format_args!("  +++ MRO HIT {attr} in {class_name} [{mro_index}]"));
    }

    fn on_fallback(&mut self, attr: &str) {
        self.emit(format_args!("  --- FALLBACK {attr}"));
    }

    fn on_bind(&mut self, outcome: BindOutcome) {
        self.emit(format_args!("  ... BIND {outcome:?}"));
    }

    fn on_init(&mut self, reinit: bool, binding: SuperBinding) {
        let kind = if reinit { "REINIT" } else { "INIT" };
        self.emit(format_args!("  ... {kind} {binding:?}"));
    }

    fn on_apparent_class_override(&mut self, class_name: &str) {
        self.emit(format_args!("  !!! APPARENT CLASS {class_name}"));
    }

    fn on_boundary_error(&mut self, entry: &str, exception: &Exception) {
        self.emit(format_args!("  !!! {entry}: {exception}"));
    }

    fn on_host_enter(&mut self, depth: usize) {
        self.emit(format_args!("  >>> HOST depth={depth}"));
    }
}

// ============================================================================
// RecordingTracer
// ============================================================================

/// Tracer that records every event for post-mortem analysis.
///
/// Allocates per event, so use it for debugging and tests rather than production.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    /// All recorded events in chronological order.
    events: Vec<TraceEvent>,
    /// Optional limit on number of events recorded.
    limit: Option<usize>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recording tracer that stops recording after `limit` events.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            events: Vec::with_capacity(limit.min(1024)),
            limit: Some(limit),
        }
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }

    /// Drops all recorded events, keeping the limit.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Renders the recorded events as JSON lines, one object per event.
    #[must_use]
    pub fn to_json_lines(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            // TraceEvent has only string, integer and unit-enum fields
            if let Ok(line) = serde_json::to_string(event) {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }

    fn record(&mut self, event: TraceEvent) {
        if self.limit.is_some_and(|limit| self.events.len() >= limit) {
            return;
        }
        self.events.push(event);
    }
}

impl RuntimeTracer for RecordingTracer {
    fn on_super_lookup(&mut self, attr: &str, skip: Option<LookupSkip>) {
        self.record(TraceEvent::SuperLookup {
            attr: attr.to_owned(),
            skip,
        });
    }

    fn on_mro_hit(&mut self, attr: &str, class_name: &str, mro_index: usize) {
        self.record(TraceEvent::MroHit {
            attr: attr.to_owned(),
            class_name: class_name.to_owned(),
            mro_index,
        });
    }

    fn on_fallback(&mut self, attr: &str) {
        self.record(TraceEvent::Fallback { attr: attr.to_owned() });
    }

    fn on_bind(&mut self, outcome: BindOutcome) {
        self.record(TraceEvent::Bind { outcome });
    }

    fn on_init(&mut self, reinit: bool, binding: SuperBinding) {
        self.record(TraceEvent::Init { reinit, binding });
    }

    fn on_apparent_class_override(&mut self, class_name: &str) {
        self.record(TraceEvent::ApparentClassOverride {
            class_name: class_name.to_owned(),
        });
    }

    fn on_boundary_error(&mut self, entry: &str, exception: &Exception) {
        self.record(TraceEvent::BoundaryError {
            entry: entry.to_owned(),
            exception: exception.clone(),
        });
    }

    fn on_host_enter(&mut self, depth: usize) {
        self.record(TraceEvent::HostEnter { depth });
    }
}
