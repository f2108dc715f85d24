use strum_macros::Display;

use crate::objects::{
    object_bound_method::ObjBoundMethod, object_class::ObjClass, object_closure::ObjClosure,
    object_function::ObjFunction, object_instance::ObjInstance, object_native::ObjNative,
    object_string::ObjString, object_upvalue::ObjUpvalue,
};

/// Discriminant carried in every heap object's header, mirroring clox's `ObjType`.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    String,
    Function,
    Closure,
    Upvalue,
    Class,
    Instance,
    BoundMethod,
    Native,
}

/// Common header every heap object carries. Concrete object structs put this
/// as their first field (`#[repr(C)]`) so a `*mut Object` can be reinterpreted
/// as the concrete type once `kind` has been checked.
#[repr(C)]
pub struct Object {
    pub kind: ObjectKind,
    pub marked: bool,
    /// Intrusive link threading every live object into the VM's "objects list".
    pub next: *mut Object,
}

impl Object {
    pub fn new(kind: ObjectKind) -> Self {
        Object { kind, marked: false, next: std::ptr::null_mut() }
    }

    /// Size in bytes of the concrete object this header belongs to, for GC bookkeeping.
    ///
    /// # Safety
    /// `self` must be the header of a live, fully-initialized object of `self.kind`.
    pub unsafe fn deep_size(&self) -> usize {
        match self.kind {
            ObjectKind::String => {
                let s = self.as_string();
                std::mem::size_of::<ObjString>() + s.chars.len()
            }
            ObjectKind::Function => std::mem::size_of::<ObjFunction>(),
            ObjectKind::Closure => {
                let c = self.as_closure();
                std::mem::size_of::<ObjClosure>() + c.upvalues.len() * std::mem::size_of::<*mut ObjUpvalue>()
            }
            ObjectKind::Upvalue => std::mem::size_of::<ObjUpvalue>(),
            ObjectKind::Class => std::mem::size_of::<ObjClass>(),
            ObjectKind::Instance => std::mem::size_of::<ObjInstance>(),
            ObjectKind::BoundMethod => std::mem::size_of::<ObjBoundMethod>(),
            ObjectKind::Native => std::mem::size_of::<ObjNative>(),
        }
    }

    /// # Safety
    /// `self.kind` must be `ObjectKind::String`.
    pub unsafe fn as_string(&self) -> &ObjString {
        &*(self as *const Object as *const ObjString)
    }

    /// # Safety
    /// `self.kind` must be `ObjectKind::Function`.
    pub unsafe fn as_function(&self) -> &ObjFunction {
        &*(self as *const Object as *const ObjFunction)
    }

    /// # Safety
    /// `self.kind` must be `ObjectKind::Function`.
    pub unsafe fn as_function_mut(&mut self) -> &mut ObjFunction {
        &mut *(self as *mut Object as *mut ObjFunction)
    }

    /// # Safety
    /// `self.kind` must be `ObjectKind::Closure`.
    pub unsafe fn as_closure(&self) -> &ObjClosure {
        &*(self as *const Object as *const ObjClosure)
    }

    /// # Safety
    /// `self.kind` must be `ObjectKind::Closure`.
    pub unsafe fn as_closure_mut(&mut self) -> &mut ObjClosure {
        &mut *(self as *mut Object as *mut ObjClosure)
    }

    /// # Safety
    /// `self.kind` must be `ObjectKind::Upvalue`.
    pub unsafe fn as_upvalue(&self) -> &ObjUpvalue {
        &*(self as *const Object as *const ObjUpvalue)
    }

    /// # Safety
    /// `self.kind` must be `ObjectKind::Upvalue`.
    pub unsafe fn as_upvalue_mut(&mut self) -> &mut ObjUpvalue {
        &mut *(self as *mut Object as *mut ObjUpvalue)
    }

    /// # Safety
    /// `self.kind` must be `ObjectKind::Class`.
    pub unsafe fn as_class(&self) -> &ObjClass {
        &*(self as *const Object as *const ObjClass)
    }

    /// # Safety
    /// `self.kind` must be `ObjectKind::Class`.
    pub unsafe fn as_class_mut(&mut self) -> &mut ObjClass {
        &mut *(self as *mut Object as *mut ObjClass)
    }

    /// # Safety
    /// `self.kind` must be `ObjectKind::Instance`.
    pub unsafe fn as_instance(&self) -> &ObjInstance {
        &*(self as *const Object as *const ObjInstance)
    }

    /// # Safety
    /// `self.kind` must be `ObjectKind::Instance`.
    pub unsafe fn as_instance_mut(&mut self) -> &mut ObjInstance {
        &mut *(self as *mut Object as *mut ObjInstance)
    }

    /// # Safety
    /// `self.kind` must be `ObjectKind::BoundMethod`.
    pub unsafe fn as_bound_method(&self) -> &ObjBoundMethod {
        &*(self as *const Object as *const ObjBoundMethod)
    }

    /// # Safety
    /// `self.kind` must be `ObjectKind::Native`.
    pub unsafe fn as_native(&self) -> &ObjNative {
        &*(self as *const Object as *const ObjNative)
    }
}

#[cfg(feature = "trace_objects")]
pub(crate) mod debug_feature {
    use super::*;

    pub fn trace_free(obj: &Object) {
        match obj.kind {
            ObjectKind::String => eprintln!("free {} '{}'", obj.kind, unsafe { obj.as_string().chars.as_str() }),
            other => eprintln!("free {}", other),
        }
    }
}

#[cfg(not(feature = "trace_objects"))]
pub(crate) mod debug_feature {
    use super::*;
    pub fn trace_free(_obj: &Object) {}
}
