use crate::chunk::Chunk;
use crate::objects::object::{Object, ObjectKind};
use crate::objects::object_string::ObjString;

/// A compiled function body: arity, the upvalues it expects to be wrapped in
/// a closure with, an optional name (nameless for the top-level script), and
/// its own chunk of bytecode.
#[repr(C)]
pub struct ObjFunction {
    pub object: Object,
    pub arity: u8,
    pub upvalue_count: usize,
    pub name: *mut ObjString,
    pub chunk: Box<Chunk>,
}

impl ObjFunction {
    pub fn new(name: *mut ObjString) -> Box<ObjFunction> {
        Box::new(ObjFunction {
            object: Object::new(ObjectKind::Function),
            arity: 0,
            upvalue_count: 0,
            name,
            chunk: Chunk::new(),
        })
    }

    pub fn display_name(&self) -> String {
        if self.name.is_null() {
            "<script>".to_string()
        } else {
            unsafe { format!("<fn {}>", (*self.name).chars) }
        }
    }
}
