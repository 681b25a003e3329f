pub(crate) mod class;
pub(crate) mod function;
pub(crate) mod member;
pub(crate) mod super_proxy;

pub(crate) use class::{ClassObject, Instance};
pub(crate) use function::{BoundMethod, ClassMethod, Function, HostDescriptor, Property, StaticMethod};
pub use function::{HostFunctionId, HostGetterId};
pub use member::MemberDescriptor;
pub(crate) use super_proxy::SuperProxy;
pub use super_proxy::SuperBinding;

use crate::heap::HeapId;

/// Behaviour shared by every object stored in the heap arena.
pub(crate) trait PyTrait {
    /// Approximate size in bytes, reported to the resource tracker.
    fn py_estimate_size(&self) -> usize;

    /// Pushes the id of every heap entry this object holds a share of.
    ///
    /// The heap releases exactly these ids when the object is freed, and the cycle
    /// collector follows exactly these ids when marking.
    fn py_ref_ids(&self, stack: &mut Vec<HeapId>);
}
