use crate::error::RuntimeError;
use crate::objects::object::{Object, ObjectKind};
use crate::value::Value;

/// `(argc, args) -> Value` native function pointer, per the spec's built-in
/// native signature. `args` is the slice of argument values on the VM stack.
pub type NativeFn = fn(args: &[Value]) -> Result<Value, RuntimeError>;

#[repr(C)]
pub struct ObjNative {
    pub object: Object,
    pub name: String,
    pub arity: u8,
    pub function: NativeFn,
}

impl ObjNative {
    pub fn new(name: String, arity: u8, function: NativeFn) -> Box<ObjNative> {
        Box::new(ObjNative { object: Object::new(ObjectKind::Native), name, arity, function })
    }
}
