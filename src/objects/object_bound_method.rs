use crate::objects::object::{Object, ObjectKind};
use crate::objects::object_closure::ObjClosure;
use crate::value::Value;

/// A method closure with its receiver already attached, produced by property
/// access on an instance and by `super.method` lookups.
#[repr(C)]
pub struct ObjBoundMethod {
    pub object: Object,
    pub receiver: Value,
    pub method: *mut ObjClosure,
}

impl ObjBoundMethod {
    pub fn new(receiver: Value, method: *mut ObjClosure) -> Box<ObjBoundMethod> {
        Box::new(ObjBoundMethod { object: Object::new(ObjectKind::BoundMethod), receiver, method })
    }
}
