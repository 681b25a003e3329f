#![doc = include_str!("../../../README.md")]
// first to include defer_drop macro
mod heap;

mod builtins;
mod exception_private;
mod exception_public;
mod exception_style;
mod intern;
mod object;
mod resource;
mod runtime;
mod super_object;
pub mod tracer;
mod types;
mod value;

pub use crate::{
    builtins::Builtins,
    exception_private::ExcType,
    exception_public::Exception,
    exception_style::{Capi, Cxx, ErrorSlot, ExceptionStyle},
    heap::{HeapId, HeapStats},
    intern::StringId,
    resource::{
        DEFAULT_GC_INTERVAL, DEFAULT_MAX_RECURSION_DEPTH, LimitedTracker, NoLimitTracker, ResourceError,
        ResourceLimits, ResourceTracker,
    },
    runtime::{HostFunction, HostGetter, Runtime},
    tracer::{BindOutcome, LookupSkip, NoopTracer, RecordingTracer, RuntimeTracer, StderrTracer, TraceEvent},
    types::{HostFunctionId, HostGetterId, MemberDescriptor, SuperBinding},
    value::Value,
};
