use crate::objects::object::{Object, ObjectKind};
use crate::value::Value;

/// Either *open* (aliases a live stack slot via `location`) or *closed* (owns
/// its own copy in `closed`, with `location` repointed at `&closed`).
#[repr(C)]
pub struct ObjUpvalue {
    pub object: Object,
    pub location: *mut Value,
    pub closed: Value,
    /// Threads all currently-open upvalues in descending stack-address order.
    pub next_open: *mut ObjUpvalue,
}

impl ObjUpvalue {
    pub fn new(location: *mut Value) -> Box<ObjUpvalue> {
        Box::new(ObjUpvalue {
            object: Object::new(ObjectKind::Upvalue),
            location,
            closed: Value::Nil,
            next_open: std::ptr::null_mut(),
        })
    }

    pub fn close(&mut self) {
        self.closed = unsafe { *self.location };
        self.location = &mut self.closed as *mut Value;
    }
}
