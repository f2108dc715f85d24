pub mod object;
pub mod object_bound_method;
pub mod object_class;
pub mod object_closure;
pub mod object_function;
pub mod object_instance;
pub mod object_manager;
pub mod object_native;
pub mod object_string;
pub mod object_upvalue;

pub use object::{Object, ObjectKind};
pub use object_bound_method::ObjBoundMethod;
pub use object_class::ObjClass;
pub use object_closure::ObjClosure;
pub use object_function::ObjFunction;
pub use object_instance::ObjInstance;
pub use object_manager::ObjectManager;
pub use object_native::ObjNative;
pub use object_string::ObjString;
pub use object_upvalue::ObjUpvalue;
