use crate::objects::object::{debug_feature, Object, ObjectKind};
use crate::objects::object_bound_method::ObjBoundMethod;
use crate::objects::object_class::ObjClass;
use crate::objects::object_closure::ObjClosure;
use crate::objects::object_function::ObjFunction;
use crate::objects::object_instance::ObjInstance;
use crate::objects::object_native::{NativeFn, ObjNative};
use crate::objects::object_string::ObjString;
use crate::objects::object_upvalue::ObjUpvalue;
use crate::value::Value;

/// Anything that can be threaded into the objects list, i.e. carries an
/// `Object` header as its first field.
trait HeapObject {
    fn header_mut(&mut self) -> &mut Object;
}

macro_rules! impl_heap_object {
    ($ty:ty) => {
        impl HeapObject for $ty {
            fn header_mut(&mut self) -> &mut Object {
                &mut self.object
            }
        }
    };
}

impl_heap_object!(ObjString);
impl_heap_object!(ObjFunction);
impl_heap_object!(ObjClosure);
impl_heap_object!(ObjUpvalue);
impl_heap_object!(ObjClass);
impl_heap_object!(ObjInstance);
impl_heap_object!(ObjBoundMethod);
impl_heap_object!(ObjNative);

/// Owns the intrusive singly-linked list of every live heap object ("objects
/// list" in the spec), head-first insertion, rooted here rather than in the VM
/// directly so the VM can hand it to the GC without splitting borrows.
pub struct ObjectManager {
    head: *mut Object,
    pub bytes_allocated: usize,
}

impl ObjectManager {
    pub fn new() -> Self {
        ObjectManager { head: std::ptr::null_mut(), bytes_allocated: 0 }
    }

    pub fn head(&self) -> *mut Object {
        self.head
    }

    fn link<T: HeapObject>(&mut self, mut boxed: Box<T>) -> *mut T {
        boxed.header_mut().next = self.head;
        let ptr = Box::into_raw(boxed);
        self.head = ptr as *mut Object;
        unsafe {
            self.bytes_allocated += (*self.head).deep_size();
        }
        ptr
    }

    pub fn alloc_string(&mut self, chars: String) -> *mut ObjString {
        self.link(ObjString::new(chars))
    }

    pub fn alloc_function(&mut self, name: *mut ObjString) -> *mut ObjFunction {
        self.link(ObjFunction::new(name))
    }

    pub fn alloc_closure(&mut self, function: *mut ObjFunction) -> *mut ObjClosure {
        self.link(ObjClosure::new(function))
    }

    pub fn alloc_upvalue(&mut self, location: *mut Value) -> *mut ObjUpvalue {
        self.link(ObjUpvalue::new(location))
    }

    pub fn alloc_class(&mut self, name: *mut ObjString) -> *mut ObjClass {
        self.link(ObjClass::new(name))
    }

    pub fn alloc_instance(&mut self, class: *mut ObjClass) -> *mut ObjInstance {
        self.link(ObjInstance::new(class))
    }

    pub fn alloc_bound_method(&mut self, receiver: Value, method: *mut ObjClosure) -> *mut ObjBoundMethod {
        self.link(ObjBoundMethod::new(receiver, method))
    }

    pub fn alloc_native(&mut self, name: String, arity: u8, function: NativeFn) -> *mut ObjNative {
        self.link(ObjNative::new(name, arity, function))
    }

    /// Walk the objects list, freeing every node whose mark bit is clear and
    /// clearing the mark bit on every node that survives.
    pub fn sweep(&mut self) -> usize {
        let mut freed_bytes = 0usize;
        let mut prev: *mut Object = std::ptr::null_mut();
        let mut current = self.head;
        unsafe {
            while !current.is_null() {
                if (*current).marked {
                    (*current).marked = false;
                    prev = current;
                    current = (*current).next;
                } else {
                    let unreached = current;
                    current = (*current).next;
                    if prev.is_null() {
                        self.head = current;
                    } else {
                        (*prev).next = current;
                    }
                    freed_bytes += (*unreached).deep_size();
                    debug_feature::trace_free(&*unreached);
                    free_object(unreached);
                }
            }
        }
        self.bytes_allocated -= freed_bytes;
        freed_bytes
    }

    pub fn iter(&self) -> ObjectIter {
        ObjectIter { current: self.head }
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }
}

impl Drop for ObjectManager {
    fn drop(&mut self) {
        let mut current = self.head;
        unsafe {
            while !current.is_null() {
                let next = (*current).next;
                free_object(current);
                current = next;
            }
        }
        self.head = std::ptr::null_mut();
    }
}

/// # Safety
/// `ptr` must point at a live, fully-initialized object of `(*ptr).kind`
/// that has not already been freed, and must not be used again afterward.
unsafe fn free_object(ptr: *mut Object) {
    match (*ptr).kind {
        ObjectKind::String => drop(Box::from_raw(ptr as *mut ObjString)),
        ObjectKind::Function => drop(Box::from_raw(ptr as *mut ObjFunction)),
        ObjectKind::Closure => drop(Box::from_raw(ptr as *mut ObjClosure)),
        ObjectKind::Upvalue => drop(Box::from_raw(ptr as *mut ObjUpvalue)),
        ObjectKind::Class => drop(Box::from_raw(ptr as *mut ObjClass)),
        ObjectKind::Instance => drop(Box::from_raw(ptr as *mut ObjInstance)),
        ObjectKind::BoundMethod => drop(Box::from_raw(ptr as *mut ObjBoundMethod)),
        ObjectKind::Native => drop(Box::from_raw(ptr as *mut ObjNative)),
    }
}

pub struct ObjectIter {
    current: *mut Object,
}

impl Iterator for ObjectIter {
    type Item = *mut Object;

    fn next(&mut self) -> Option<*mut Object> {
        if self.current.is_null() {
            return None;
        }
        let item = self.current;
        self.current = unsafe { (*item).next };
        Some(item)
    }
}
