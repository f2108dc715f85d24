use crate::objects::object::{Object, ObjectKind};
use crate::objects::object_function::ObjFunction;
use crate::objects::object_upvalue::ObjUpvalue;

/// Runtime pairing of a function with the upvalues captured from enclosing
/// scopes. Non-owning reference to the function; owning references to upvalues.
#[repr(C)]
pub struct ObjClosure {
    pub object: Object,
    pub function: *mut ObjFunction,
    pub upvalues: Vec<*mut ObjUpvalue>,
}

impl ObjClosure {
    pub fn new(function: *mut ObjFunction) -> Box<ObjClosure> {
        let upvalue_count = unsafe { (*function).upvalue_count };
        Box::new(ObjClosure {
            object: Object::new(ObjectKind::Closure),
            function,
            upvalues: vec![std::ptr::null_mut(); upvalue_count],
        })
    }
}
