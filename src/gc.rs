use crate::objects::{Object, ObjectKind, ObjectManager};
use crate::table::Table;
use crate::value::Value;

const HEAP_GROWTH_FACTOR: usize = 2;
const INITIAL_NEXT_GC: usize = 1024 * 1024;

macro_rules! gc_trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "gc_log")]
        eprintln!($($arg)*);
    };
}

/// Mark-and-sweep collector. Holds no objects itself; `objects` is owned by
/// the VM and handed in for each collection so the VM can keep allocating
/// through `ObjectManager` without the collector getting in the way.
pub struct GarbageCollector {
    gray_stack: Vec<*mut Object>,
    pub next_gc: usize,
}

impl GarbageCollector {
    pub fn new() -> GarbageCollector {
        GarbageCollector { gray_stack: Vec::new(), next_gc: INITIAL_NEXT_GC }
    }

    pub fn should_collect(&self, bytes_allocated: usize) -> bool {
        bytes_allocated > self.next_gc
    }

    pub fn mark_value(&mut self, value: Value) {
        if let Value::Obj(ptr) = value {
            self.mark_object(ptr);
        }
    }

    /// Sets the mark bit and pushes onto the gray worklist, unless already
    /// marked (including null, which callers may pass for unset slots).
    pub fn mark_object(&mut self, ptr: *mut Object) {
        if ptr.is_null() {
            return;
        }
        unsafe {
            if (*ptr).marked {
                return;
            }
            (*ptr).marked = true;
            gc_trace!("gc mark {:?} {}", ptr, (*ptr).kind);
        }
        self.gray_stack.push(ptr);
    }

    fn mark_table(&mut self, table: &Table) {
        for (key, value) in table.iter() {
            self.mark_object(key as *mut Object);
            self.mark_value(value);
        }
    }

    /// Pops the gray worklist until empty, marking every object each popped
    /// object refers to (turning it black by virtue of leaving the stack).
    fn trace_references(&mut self) {
        while let Some(ptr) = self.gray_stack.pop() {
            self.blacken_object(ptr);
        }
    }

    fn blacken_object(&mut self, ptr: *mut Object) {
        unsafe {
            gc_trace!("gc blacken {:?} {}", ptr, (*ptr).kind);
            match (*ptr).kind {
                ObjectKind::String | ObjectKind::Native => {}
                ObjectKind::Upvalue => {
                    self.mark_value((*ptr).as_upvalue().closed);
                }
                ObjectKind::Function => {
                    let function = (*ptr).as_function();
                    self.mark_object(function.name as *mut Object);
                    for constant in function.chunk.constants.iter() {
                        self.mark_value(*constant);
                    }
                }
                ObjectKind::Closure => {
                    let closure = (*ptr).as_closure();
                    self.mark_object(closure.function as *mut Object);
                    for upvalue in closure.upvalues.iter() {
                        self.mark_object(*upvalue as *mut Object);
                    }
                }
                ObjectKind::Class => {
                    let class = (*ptr).as_class();
                    self.mark_object(class.name as *mut Object);
                    self.mark_table(&class.methods);
                }
                ObjectKind::Instance => {
                    let instance = (*ptr).as_instance();
                    self.mark_object(instance.class as *mut Object);
                    self.mark_table(&instance.fields);
                }
                ObjectKind::BoundMethod => {
                    let bound = (*ptr).as_bound_method();
                    self.mark_value(bound.receiver);
                    self.mark_object(bound.method as *mut Object);
                }
            }
        }
    }

    /// Runs a full collection: the caller marks every root it knows about
    /// (stack slots, call-frame closures, open upvalues, globals, compiler
    /// roots) by repeated calls to `mark_value`/`mark_object` before invoking
    /// this, which then traces and sweeps.
    pub fn collect(&mut self, objects: &mut ObjectManager, strings: &mut Table) -> usize {
        gc_trace!("-- gc begin");
        self.trace_references();
        strings.remove_unmarked_keys();
        let freed = objects.sweep();
        self.next_gc = objects.bytes_allocated.max(INITIAL_NEXT_GC) * HEAP_GROWTH_FACTOR;
        gc_trace!("-- gc end, freed {freed} bytes, next at {}", self.next_gc);
        freed
    }
}

impl Default for GarbageCollector {
    fn default() -> Self {
        GarbageCollector::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ObjectManager;

    #[test]
    fn collects_unreachable_strings() {
        let mut objects = ObjectManager::new();
        let mut strings = Table::new();
        let mut gc = GarbageCollector::new();

        let kept = objects.alloc_string("kept".to_string());
        let _garbage = objects.alloc_string("garbage".to_string());

        gc.mark_object(kept as *mut Object);
        gc.collect(&mut objects, &mut strings);

        assert_eq!(objects.count(), 1);
        let remaining = objects.iter().next().unwrap();
        assert_eq!(unsafe { (*remaining).as_string().chars.as_str() }, "kept");
    }

    #[test]
    fn marks_transitively_through_closure_and_upvalue() {
        let mut objects = ObjectManager::new();
        let mut strings = Table::new();
        let mut gc = GarbageCollector::new();

        let name = objects.alloc_string("f".to_string());
        let function = objects.alloc_function(name);
        unsafe { (*function).upvalue_count = 1 };
        let closure = objects.alloc_closure(function);
        let slot_value = Box::into_raw(Box::new(Value::Number(7.0)));
        let upvalue = objects.alloc_upvalue(slot_value);
        unsafe { (&mut (*closure).upvalues)[0] = upvalue };

        gc.mark_object(closure as *mut Object);
        gc.collect(&mut objects, &mut strings);

        assert!(objects.iter().any(|o| o == function as *mut Object));
        assert!(objects.iter().any(|o| o == upvalue as *mut Object));
        assert!(objects.iter().any(|o| o == name as *mut Object));
        unsafe {
            drop(Box::from_raw(slot_value));
        }
    }

    #[test]
    fn next_gc_grows_after_collection() {
        let mut objects = ObjectManager::new();
        let mut strings = Table::new();
        let mut gc = GarbageCollector::new();
        let before = gc.next_gc;
        objects.alloc_string("x".to_string());
        gc.collect(&mut objects, &mut strings);
        assert!(gc.next_gc >= before);
    }
}
