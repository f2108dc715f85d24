use std::fmt;

use crate::objects::{Object, ObjectKind};

/// Tagged value. `Obj` never owns its referent — heap lifetime is governed
/// entirely by the GC's reachability analysis, not by this handle.
#[derive(Debug, Clone, Copy)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Obj(*mut Object),
}

impl Value {
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil) || matches!(self, Value::Bool(false))
    }

    pub fn is_object_kind(&self, kind: ObjectKind) -> bool {
        match self {
            Value::Obj(ptr) => unsafe { (**ptr).kind == kind },
            _ => false,
        }
    }

    pub fn as_object(&self) -> Option<*mut Object> {
        match self {
            Value::Obj(ptr) => Some(*ptr),
            _ => None,
        }
    }
}

/// Values of different variants are never equal; numbers follow IEEE-754
/// (so `NaN != NaN`); objects other than strings compare by identity; strings
/// compare by identity too, which is sound because they are always interned.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Obj(a), Value::Obj(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Obj(ptr) => unsafe { fmt_object(&**ptr, f) },
        }
    }
}

/// Integral doubles print with no trailing `.0`; everything else prints with
/// the shortest representation Rust's own formatter produces, matching clox's
/// `printValue`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// # Safety
/// `obj` must be a live, fully-initialized object of `obj.kind`.
unsafe fn fmt_object(obj: &Object, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match obj.kind {
        ObjectKind::String => write!(f, "{}", obj.as_string().chars),
        ObjectKind::Function => write!(f, "{}", obj.as_function().display_name()),
        ObjectKind::Closure => write!(f, "{}", (*obj.as_closure().function).display_name()),
        ObjectKind::Upvalue => write!(f, "upvalue"),
        ObjectKind::Class => write!(f, "{}", (*obj.as_class().name).chars),
        ObjectKind::Instance => {
            let instance = obj.as_instance();
            let class_name = &(*(*instance.class).name).chars;
            write!(f, "{class_name} instance")
        }
        ObjectKind::BoundMethod => {
            let bound = obj.as_bound_method();
            write!(f, "{}", (*(*bound.method).function).display_name())
        }
        ObjectKind::Native => write!(f, "<native fn>"),
    }
}
