//! Attribute resolver: `super(C, obj).name`.
//!
//! Scans the MRO of the bound type strictly after the reference class, applies the
//! descriptor get-protocol to the first hit, and otherwise falls back to generic
//! lookup on the proxy itself.

use crate::{
    defer_drop,
    exception_private::{RunError, RunResult},
    heap::{HeapData, HeapId},
    intern::{StaticStrings, StringId},
    resource::ResourceTracker,
    runtime::{Runtime, class_name_in},
    tracer::{LookupSkip, RuntimeTracer},
    value::Value,
};

/// A hit of the MRO scan.
#[derive(Debug)]
struct SuperLookup {
    /// The attribute as stored in the class namespace (owned share).
    value: Value,
    defining_class: HeapId,
    mro_index: usize,
}

impl<T: ResourceTracker, Tr: RuntimeTracer> Runtime<T, Tr> {
    pub(crate) fn super_getattribute(&mut self, proxy_id: HeapId, name: StringId) -> RunResult<Value> {
        let HeapData::SuperProxy(proxy) = self.heap.get(proxy_id) else {
            return Err(RunError::internal("super attribute lookup on a non-proxy"));
        };
        let skip = match proxy.binding() {
            None => Some(LookupSkip::Unbound),
            Some(_) if name == StaticStrings::DunderClass => Some(LookupSkip::ApparentClass),
            Some(_) => None,
        };
        self.tracer.on_super_lookup(self.interns.get_str(name), skip);

        let (this_type, obj, obj_type) = match proxy.binding() {
            Some(bound) if skip.is_none() => {
                // shares held across the descriptor call, which may re-initialize the proxy
                let obj = bound.obj.clone_with_heap(&self.heap);
                self.heap.inc_ref(bound.obj_type);
                (proxy.this_type(), obj, bound.obj_type)
            }
            _ => return self.super_fallback(proxy_id, name),
        };
        let class_bound = obj.ref_id() == Some(obj_type);

        let result = match self.scan_after(obj_type, this_type, name) {
            Some(hit) => {
                let attr = self.interns.get_str(name);
                let class_name = class_name_in(&self.heap, hit.defining_class);
                self.tracer.on_mro_hit(attr, class_name, hit.mro_index);

                let instance = if class_bound { None } else { Some(&obj) };
                let value = hit.value;
                let this = &mut *self;
                defer_drop!(value, this);
                Some(this.descriptor_get(value, instance, obj_type))
            }
            None => None,
        };
        obj.drop_with_heap(&mut self.heap);
        self.heap.dec_ref(obj_type);

        match result {
            Some(result) => result,
            None => self.super_fallback(proxy_id, name),
        }
    }

    /// Local lookups in each class of `obj_type`'s MRO after `this_type`.
    ///
    /// A reference class missing from the MRO yields an empty scan.
    fn scan_after(&self, obj_type: HeapId, this_type: HeapId, name: StringId) -> Option<SuperLookup> {
        let mro = self.mro(obj_type);
        let start = mro.iter().position(|&cls| cls == this_type).map_or(mro.len(), |index| index + 1);
        mro.iter().enumerate().skip(start).find_map(|(mro_index, &cls)| {
            self.lookup_local(cls, name).map(|value| SuperLookup {
                value: value.clone_with_heap(&self.heap),
                defining_class: cls,
                mro_index,
            })
        })
    }

    /// Generic attribute lookup on the proxy object itself.
    fn super_fallback(&mut self, proxy_id: HeapId, name: StringId) -> RunResult<Value> {
        self.tracer.on_fallback(self.interns.get_str(name));
        self.generic_getattr(&Value::Ref(proxy_id), name)
    }
}
