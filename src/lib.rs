pub mod call_frame;
pub mod chunk;
pub mod compiler;
pub mod debug;
pub mod error;
pub mod gc;
pub mod natives;
pub mod objects;
pub mod scanner;
pub mod table;
pub mod value;
pub mod vm;

pub use error::InterpretResult;
pub use vm::VM;

/// Runs `source` against a fresh VM and returns the three-valued result
/// described by the interpreter's external contract.
pub fn run(source: &str) -> InterpretResult {
    let mut vm = VM::new();
    vm.interpret(source)
}
