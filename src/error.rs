use strum_macros::Display;

/// The three-valued result of `VM::interpret`, per the external interface contract.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

impl InterpretResult {
    /// Host process exit code for this result. `64`/`74` are assigned by the
    /// CLI itself (usage errors, I/O errors) and have no `InterpretResult` here.
    pub fn exit_code(self) -> i32 {
        match self {
            InterpretResult::Ok => 0,
            InterpretResult::CompileError => 65,
            InterpretResult::RuntimeError => 70,
        }
    }
}

/// A single compile-time diagnostic, already formatted the way the parser reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub line: u32,
    pub message: String,
}

/// A runtime fault. `line` is the source line active when the fault was
/// raised; the VM fills it in from the current frame when the error doesn't
/// already know it (e.g. one raised inside a native function).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub message: String,
    pub line: u32,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        RuntimeError { message: message.into(), line: 0 }
    }

    pub fn at(line: u32, message: impl Into<String>) -> Self {
        RuntimeError { message: message.into(), line }
    }
}
