use crate::objects::object::{Object, ObjectKind};
use crate::objects::object_class::ObjClass;
use crate::table::Table;

/// A class reference plus an open fields table. Two instances are only equal
/// to each other by identity, never by structural field equality.
#[repr(C)]
pub struct ObjInstance {
    pub object: Object,
    pub class: *mut ObjClass,
    pub fields: Table,
}

impl ObjInstance {
    pub fn new(class: *mut ObjClass) -> Box<ObjInstance> {
        Box::new(ObjInstance { object: Object::new(ObjectKind::Instance), class, fields: Table::new() })
    }
}
