use crate::objects::object::{Object, ObjectKind};
use crate::objects::object_string::ObjString;
use crate::table::Table;

/// Name plus a methods table (string -> closure value). No field slots of its
/// own; instances own their fields.
#[repr(C)]
pub struct ObjClass {
    pub object: Object,
    pub name: *mut ObjString,
    pub methods: Table,
}

impl ObjClass {
    pub fn new(name: *mut ObjString) -> Box<ObjClass> {
        Box::new(ObjClass { object: Object::new(ObjectKind::Class), name, methods: Table::new() })
    }
}
