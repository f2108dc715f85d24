use std::io::{self, Write};

use crate::call_frame::CallFrame;
use crate::chunk::OpCode;
use crate::compiler::Compiler;
use crate::error::{InterpretResult, RuntimeError};
use crate::gc::GarbageCollector;
use crate::natives::NATIVES;
use crate::objects::object_string::fnv1a_hash;
use crate::objects::{ObjClass, ObjClosure, ObjFunction, ObjString, ObjUpvalue, Object, ObjectKind, ObjectManager};
use crate::table::Table;
use crate::value::Value;

const FRAMES_MAX: usize = 64;
const STACK_MAX: usize = FRAMES_MAX * 256;

/// Bytecode interpreter: a fixed-capacity value stack (so raw upvalue pointers
/// into it stay valid across pushes/pops), a call-frame stack, globals, the
/// string intern table, the heap it all points into, and the sink `print`
/// writes to (real stdout outside tests, an in-memory buffer inside them).
pub struct VM<W: Write = io::Stdout> {
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: Table,
    strings: Table,
    objects: ObjectManager,
    gc: GarbageCollector,
    open_upvalues: *mut ObjUpvalue,
    init_string: *mut ObjString,
    output: W,
}

impl VM {
    pub fn new() -> VM {
        VM::with_output(io::stdout())
    }
}

impl<W: Write> VM<W> {
    pub fn with_output(output: W) -> VM<W> {
        let mut objects = ObjectManager::new();
        let mut strings = Table::new();
        let init_string = objects.alloc_string("init".to_string());
        strings.set(init_string, Value::Nil);

        let mut vm = VM {
            stack: Vec::with_capacity(STACK_MAX),
            frames: Vec::with_capacity(FRAMES_MAX),
            globals: Table::new(),
            strings,
            objects,
            gc: GarbageCollector::new(),
            open_upvalues: std::ptr::null_mut(),
            init_string,
            output,
        };
        vm.define_natives();
        vm
    }

    /// Consumes the VM and hands back its output sink, for tests that need
    /// to inspect exactly what `print` wrote.
    pub fn into_output(self) -> W {
        self.output
    }

    fn define_natives(&mut self) {
        for &(name, arity, function) in NATIVES {
            let native = self.objects.alloc_native(name.to_string(), arity, function);
            let key = self.intern(name);
            self.globals.set(key, Value::Obj(native as *mut Object));
        }
    }

    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        let function = match Compiler::compile(source, &mut self.objects, &mut self.strings, &mut self.gc) {
            Ok(function) => function,
            Err(_errors) => return InterpretResult::CompileError,
        };

        #[cfg(feature = "print_code")]
        crate::debug::disassemble_chunk(unsafe { &(*function).chunk }, "<script>");

        self.push(Value::Obj(function as *mut Object));
        let closure = self.maybe_collect_alloc(|vm| vm.objects.alloc_closure(function));
        self.pop();
        self.push(Value::Obj(closure as *mut Object));
        self.frames.push(CallFrame::new(closure, 0));

        match self.run() {
            Ok(()) => InterpretResult::Ok,
            Err(err) => {
                self.report_runtime_error(&err);
                self.reset_stack();
                InterpretResult::RuntimeError
            }
        }
    }

    fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            #[cfg(feature = "trace_execution")]
            self.trace_instruction();

            let byte = self.read_byte();
            let instruction = OpCode::from_byte(byte).unwrap_or_else(|| panic!("invalid opcode byte {byte}"));

            match instruction {
                OpCode::Constant => {
                    let value = self.read_constant();
                    self.push(value);
                }
                OpCode::Nil => self.push(Value::Nil),
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.current_frame().stack_base;
                    self.push(self.stack[base + slot]);
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.current_frame().stack_base;
                    self.stack[base + slot] = self.peek(0);
                }
                OpCode::GetGlobal => {
                    let name = self.read_string();
                    match self.globals.get(name) {
                        Some(value) => self.push(value),
                        None => return Err(self.runtime_error(format!("Undefined variable '{}'.", self.chars_of(name)))),
                    }
                }
                OpCode::DefineGlobal => {
                    let name = self.read_string();
                    let value = self.peek(0);
                    self.globals.set(name, value);
                    self.pop();
                }
                OpCode::SetGlobal => {
                    let name = self.read_string();
                    let value = self.peek(0);
                    if self.globals.set(name, value) {
                        self.globals.delete(name);
                        return Err(self.runtime_error(format!("Undefined variable '{}'.", self.chars_of(name))));
                    }
                }
                OpCode::GetUpvalue => {
                    let slot = self.read_byte() as usize;
                    let upvalue = unsafe { (&(*self.current_frame().closure).upvalues)[slot] };
                    self.push(unsafe { *(*upvalue).location });
                }
                OpCode::SetUpvalue => {
                    let slot = self.read_byte() as usize;
                    let upvalue = unsafe { (&(*self.current_frame().closure).upvalues)[slot] };
                    let value = self.peek(0);
                    unsafe {
                        *(*upvalue).location = value;
                    }
                }
                OpCode::GetProperty => {
                    let name = self.read_string();
                    let instance_ptr = match self.peek(0) {
                        Value::Obj(ptr) if unsafe { (*ptr).kind } == ObjectKind::Instance => ptr,
                        _ => return Err(self.runtime_error("Only instances have properties.")),
                    };
                    let instance = unsafe { (*instance_ptr).as_instance() };
                    if let Some(value) = instance.fields.get(name) {
                        self.pop();
                        self.push(value);
                    } else {
                        let class = instance.class;
                        self.bind_method(class, name)?;
                    }
                }
                OpCode::SetProperty => {
                    let name = self.read_string();
                    let instance_ptr = match self.peek(1) {
                        Value::Obj(ptr) if unsafe { (*ptr).kind } == ObjectKind::Instance => ptr,
                        _ => return Err(self.runtime_error("Only instances have fields.")),
                    };
                    let value = self.peek(0);
                    unsafe { (*instance_ptr).as_instance_mut().fields.set(name, value) };
                    let value = self.pop();
                    self.pop();
                    self.push(value);
                }
                OpCode::GetSuper => {
                    let name = self.read_string();
                    let superclass = self.pop();
                    let class = self.as_class_ptr(superclass)?;
                    self.bind_method(class, name)?;
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b));
                }
                OpCode::Greater => self.binary_compare(|a, b| a > b)?,
                OpCode::Less => self.binary_compare(|a, b| a < b)?,
                OpCode::Add => self.add()?,
                OpCode::Subtract => self.binary_number(|a, b| a - b)?,
                OpCode::Multiply => self.binary_number(|a, b| a * b)?,
                OpCode::Divide => self.binary_number(|a, b| a / b)?,
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(value.is_falsey()));
                }
                OpCode::Negate => match self.peek(0) {
                    Value::Number(n) => {
                        self.pop();
                        self.push(Value::Number(-n));
                    }
                    _ => return Err(self.runtime_error("Operand must be a number.")),
                },
                OpCode::Print => {
                    let value = self.pop();
                    writeln!(self.output, "{value}").expect("write to output failed");
                }
                OpCode::Jump => {
                    let offset = self.read_short();
                    self.current_frame_mut().ip += offset as usize;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_short();
                    if self.peek(0).is_falsey() {
                        self.current_frame_mut().ip += offset as usize;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_short();
                    self.current_frame_mut().ip -= offset as usize;
                }
                OpCode::Call => {
                    let arg_count = self.read_byte();
                    let callee = self.peek(arg_count as usize);
                    self.call_value(callee, arg_count)?;
                }
                OpCode::Invoke => {
                    let name = self.read_string();
                    let arg_count = self.read_byte();
                    self.invoke(name, arg_count)?;
                }
                OpCode::SuperInvoke => {
                    let name = self.read_string();
                    let arg_count = self.read_byte();
                    let superclass = self.pop();
                    let class = self.as_class_ptr(superclass)?;
                    self.invoke_from_class(class, name, arg_count)?;
                }
                OpCode::Closure => {
                    let function_ptr = match self.read_constant() {
                        Value::Obj(ptr) => ptr as *mut ObjFunction,
                        _ => panic!("CLOSURE constant is not a function"),
                    };
                    let upvalue_count = unsafe { (*function_ptr).upvalue_count };
                    let closure = self.maybe_collect_alloc(|vm| vm.objects.alloc_closure(function_ptr));
                    self.push(Value::Obj(closure as *mut Object));
                    for i in 0..upvalue_count {
                        let is_local = self.read_byte();
                        let index = self.read_byte();
                        let upvalue_ptr = if is_local == 1 {
                            let base = self.current_frame().stack_base;
                            self.capture_upvalue(base + index as usize)
                        } else {
                            unsafe { (&(*self.current_frame().closure).upvalues)[index as usize] }
                        };
                        unsafe { (&mut (*closure).upvalues)[i] = upvalue_ptr };
                    }
                }
                OpCode::CloseUpvalue => {
                    let top = self.stack.len() - 1;
                    self.close_upvalues(top);
                    self.pop();
                }
                OpCode::Return => {
                    let result = self.pop();
                    let base = self.current_frame().stack_base;
                    self.close_upvalues(base);
                    self.frames.pop();
                    if self.frames.is_empty() {
                        self.pop();
                        return Ok(());
                    }
                    self.stack.truncate(base);
                    self.push(result);
                }
                OpCode::Class => {
                    let name = self.read_string();
                    let class = self.maybe_collect_alloc(|vm| vm.objects.alloc_class(name));
                    self.push(Value::Obj(class as *mut Object));
                }
                OpCode::Inherit => {
                    let superclass_ptr = self.as_class_ptr(self.peek(1))?;
                    let subclass_ptr = match self.peek(0) {
                        Value::Obj(ptr) => ptr as *mut ObjClass,
                        _ => panic!("INHERIT target is not a class"),
                    };
                    unsafe {
                        let superclass = &(*superclass_ptr);
                        let subclass = &mut *subclass_ptr;
                        superclass.methods.add_all(&mut subclass.methods);
                    }
                    self.pop();
                }
                OpCode::Method => {
                    let name = self.read_string();
                    self.define_method(name);
                }
            }
        }
    }

    // --- calls ---------------------------------------------------------------

    fn call_value(&mut self, callee: Value, arg_count: u8) -> Result<(), RuntimeError> {
        if let Value::Obj(ptr) = callee {
            match unsafe { (*ptr).kind } {
                ObjectKind::BoundMethod => {
                    let bound = unsafe { (*ptr).as_bound_method() };
                    let receiver = bound.receiver;
                    let method = bound.method;
                    let base = self.stack.len() - 1 - arg_count as usize;
                    self.stack[base] = receiver;
                    return self.call_closure(method, arg_count);
                }
                ObjectKind::Class => {
                    let class_ptr = ptr as *mut ObjClass;
                    let instance = self.maybe_collect_alloc(|vm| vm.objects.alloc_instance(class_ptr));
                    let base = self.stack.len() - 1 - arg_count as usize;
                    self.stack[base] = Value::Obj(instance as *mut Object);
                    let initializer = unsafe { (*class_ptr).methods.get(self.init_string) };
                    return match initializer {
                        Some(Value::Obj(init_ptr)) => self.call_closure(init_ptr as *mut ObjClosure, arg_count),
                        _ => {
                            if arg_count != 0 {
                                return Err(self.runtime_error(format!("Expected 0 arguments but got {arg_count}.")));
                            }
                            Ok(())
                        }
                    };
                }
                ObjectKind::Closure => return self.call_closure(ptr as *mut ObjClosure, arg_count),
                ObjectKind::Native => {
                    let native = unsafe { (*ptr).as_native() };
                    let base = self.stack.len() - arg_count as usize;
                    let result = (native.function)(&self.stack[base..]);
                    self.stack.truncate(base - 1);
                    return match result {
                        Ok(value) => {
                            self.push(value);
                            Ok(())
                        }
                        Err(err) => Err(self.runtime_error(err.message)),
                    };
                }
                _ => {}
            }
        }
        Err(self.runtime_error("Can only call functions and classes."))
    }

    fn call_closure(&mut self, closure: *mut ObjClosure, arg_count: u8) -> Result<(), RuntimeError> {
        let function = unsafe { (*closure).function };
        let arity = unsafe { (*function).arity };
        if arg_count != arity {
            return Err(self.runtime_error(format!("Expected {arity} arguments but got {arg_count}.")));
        }
        if self.frames.len() == FRAMES_MAX {
            return Err(self.runtime_error("Stack overflow."));
        }
        let base = self.stack.len() - arg_count as usize - 1;
        self.frames.push(CallFrame::new(closure, base));
        Ok(())
    }

    fn invoke(&mut self, name: *mut ObjString, arg_count: u8) -> Result<(), RuntimeError> {
        let instance_ptr = match self.peek(arg_count as usize) {
            Value::Obj(ptr) if unsafe { (*ptr).kind } == ObjectKind::Instance => ptr,
            _ => return Err(self.runtime_error("Only instances have methods.")),
        };
        let instance = unsafe { (*instance_ptr).as_instance() };
        if let Some(value) = instance.fields.get(name) {
            let base = self.stack.len() - 1 - arg_count as usize;
            self.stack[base] = value;
            return self.call_value(value, arg_count);
        }
        self.invoke_from_class(instance.class, name, arg_count)
    }

    fn invoke_from_class(&mut self, class: *mut ObjClass, name: *mut ObjString, arg_count: u8) -> Result<(), RuntimeError> {
        match unsafe { (*class).methods.get(name) } {
            Some(Value::Obj(ptr)) => self.call_closure(ptr as *mut ObjClosure, arg_count),
            _ => Err(self.runtime_error(format!("Undefined property '{}'.", self.chars_of(name)))),
        }
    }

    fn bind_method(&mut self, class: *mut ObjClass, name: *mut ObjString) -> Result<(), RuntimeError> {
        let method_ptr = match unsafe { (*class).methods.get(name) } {
            Some(Value::Obj(ptr)) => ptr as *mut ObjClosure,
            _ => return Err(self.runtime_error(format!("Undefined property '{}'.", self.chars_of(name)))),
        };
        let receiver = self.peek(0);
        let bound = self.maybe_collect_alloc(|vm| vm.objects.alloc_bound_method(receiver, method_ptr));
        self.pop();
        self.push(Value::Obj(bound as *mut Object));
        Ok(())
    }

    fn define_method(&mut self, name: *mut ObjString) {
        let method = self.peek(0);
        let class_ptr = match self.peek(1) {
            Value::Obj(ptr) => ptr as *mut ObjClass,
            _ => panic!("METHOD target is not a class"),
        };
        unsafe { (*class_ptr).methods.set(name, method) };
        self.pop();
    }

    fn as_class_ptr(&self, value: Value) -> Result<*mut ObjClass, RuntimeError> {
        match value {
            Value::Obj(ptr) if unsafe { (*ptr).kind } == ObjectKind::Class => Ok(ptr as *mut ObjClass),
            _ => Err(self.runtime_error("Superclass must be a class.")),
        }
    }

    // --- arithmetic ------------------------------------------------------------

    fn binary_number(&mut self, op: impl Fn(f64, f64) -> f64) -> Result<(), RuntimeError> {
        match (self.peek(1), self.peek(0)) {
            (Value::Number(a), Value::Number(b)) => {
                self.pop();
                self.pop();
                self.push(Value::Number(op(a, b)));
                Ok(())
            }
            _ => Err(self.runtime_error("Operands must be numbers.")),
        }
    }

    fn binary_compare(&mut self, op: impl Fn(f64, f64) -> bool) -> Result<(), RuntimeError> {
        match (self.peek(1), self.peek(0)) {
            (Value::Number(a), Value::Number(b)) => {
                self.pop();
                self.pop();
                self.push(Value::Bool(op(a, b)));
                Ok(())
            }
            _ => Err(self.runtime_error("Operands must be numbers.")),
        }
    }

    fn add(&mut self) -> Result<(), RuntimeError> {
        match (self.peek(1), self.peek(0)) {
            (Value::Number(a), Value::Number(b)) => {
                self.pop();
                self.pop();
                self.push(Value::Number(a + b));
            }
            (Value::Obj(a), Value::Obj(b))
                if unsafe { (*a).kind } == ObjectKind::String && unsafe { (*b).kind } == ObjectKind::String =>
            {
                let concatenated = unsafe { format!("{}{}", (*a).as_string().chars, (*b).as_string().chars) };
                self.pop();
                self.pop();
                let value = self.intern_value(&concatenated);
                self.push(value);
            }
            _ => return Err(self.runtime_error("Operands must be two numbers or two strings.")),
        }
        Ok(())
    }

    // --- string interning --------------------------------------------------------

    fn intern(&mut self, text: &str) -> *mut ObjString {
        let hash = fnv1a_hash(text.as_bytes());
        if let Some(existing) = self.strings.find_string(text, hash) {
            return existing;
        }
        let ptr = self.maybe_collect_alloc(|vm| vm.objects.alloc_string(text.to_string()));
        self.strings.set(ptr, Value::Nil);
        ptr
    }

    fn intern_value(&mut self, text: &str) -> Value {
        Value::Obj(self.intern(text) as *mut Object)
    }

    fn chars_of(&self, string: *mut ObjString) -> String {
        unsafe { (*string).chars.clone() }
    }

    // --- upvalues ------------------------------------------------------------

    fn capture_upvalue(&mut self, stack_index: usize) -> *mut ObjUpvalue {
        let target = unsafe { self.stack.as_mut_ptr().add(stack_index) };

        let mut prev: *mut ObjUpvalue = std::ptr::null_mut();
        let mut current = self.open_upvalues;
        while !current.is_null() && unsafe { (*current).location } > target {
            prev = current;
            current = unsafe { (*current).next_open };
        }

        if !current.is_null() && unsafe { (*current).location } == target {
            return current;
        }

        let created = self.maybe_collect_alloc(|vm| vm.objects.alloc_upvalue(target));
        unsafe { (*created).next_open = current };
        if prev.is_null() {
            self.open_upvalues = created;
        } else {
            unsafe { (*prev).next_open = created };
        }
        created
    }

    fn close_upvalues(&mut self, stack_index: usize) {
        let threshold = unsafe { self.stack.as_mut_ptr().add(stack_index) };
        while !self.open_upvalues.is_null() && unsafe { (*self.open_upvalues).location } >= threshold {
            let upvalue = self.open_upvalues;
            unsafe {
                (*upvalue).close();
                self.open_upvalues = (*upvalue).next_open;
            }
        }
    }

    // --- garbage collection --------------------------------------------------

    fn maybe_collect_alloc<T>(&mut self, alloc: impl FnOnce(&mut Self) -> T) -> T {
        self.collect_garbage_if_needed();
        alloc(self)
    }

    fn collect_garbage_if_needed(&mut self) {
        if cfg!(feature = "stress_gc") || self.gc.should_collect(self.objects.bytes_allocated) {
            self.collect_garbage();
        }
    }

    fn collect_garbage(&mut self) {
        self.mark_roots();
        self.gc.collect(&mut self.objects, &mut self.strings);
    }

    /// Compilation has already finished and handed back a `*mut ObjFunction`
    /// by the time this runs (the compiler roots its own in-progress state
    /// itself, via `Compiler::mark_roots`), so there is nothing left over
    /// from the compile phase to mark here beyond what the running script
    /// keeps reachable.
    fn mark_roots(&mut self) {
        for &value in self.stack.iter() {
            self.gc.mark_value(value);
        }
        for frame in self.frames.iter() {
            self.gc.mark_object(frame.closure as *mut Object);
        }
        let mut upvalue = self.open_upvalues;
        while !upvalue.is_null() {
            self.gc.mark_object(upvalue as *mut Object);
            upvalue = unsafe { (*upvalue).next_open };
        }
        for (key, value) in self.globals.iter() {
            self.gc.mark_object(key as *mut Object);
            self.gc.mark_value(value);
        }
        self.gc.mark_object(self.init_string as *mut Object);
    }

    // --- stack -----------------------------------------------------------------

    fn push(&mut self, value: Value) {
        assert!(self.stack.len() < STACK_MAX, "stack overflow");
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("stack underflow")
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    fn current_frame(&self) -> &CallFrame {
        self.frames.last().expect("no active call frame")
    }

    fn current_frame_mut(&mut self) -> &mut CallFrame {
        self.frames.last_mut().expect("no active call frame")
    }

    // --- bytecode reading --------------------------------------------------------

    fn read_byte(&mut self) -> u8 {
        let ip = self.current_frame().ip;
        let function = unsafe { (*self.current_frame().closure).function };
        let byte = unsafe { (*function).chunk.read_byte(ip) };
        self.current_frame_mut().ip += 1;
        byte
    }

    fn read_short(&mut self) -> u16 {
        let hi = self.read_byte() as u16;
        let lo = self.read_byte() as u16;
        (hi << 8) | lo
    }

    fn read_constant(&mut self) -> Value {
        let index = self.read_byte() as usize;
        let function = unsafe { (*self.current_frame().closure).function };
        unsafe { (*function).chunk.get_constant(index) }
    }

    fn read_string(&mut self) -> *mut ObjString {
        match self.read_constant() {
            Value::Obj(ptr) => ptr as *mut ObjString,
            _ => panic!("constant is not a string"),
        }
    }

    // --- errors --------------------------------------------------------------

    fn runtime_error(&self, message: impl Into<String>) -> RuntimeError {
        let line = self
            .frames
            .last()
            .map(|frame| unsafe { (*(*frame.closure).function).chunk.line_at(frame.ip.saturating_sub(1)) })
            .unwrap_or(0);
        RuntimeError::at(line, message)
    }

    fn report_runtime_error(&self, err: &RuntimeError) {
        eprintln!("{}", err.message);
        for frame in self.frames.iter().rev() {
            let function = unsafe { (*frame.closure).function };
            let line = unsafe { (*function).chunk.line_at(frame.ip.saturating_sub(1)) };
            eprintln!("[line {line}] in {}", unsafe { (*function).display_name() });
        }
    }

    fn reset_stack(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues = std::ptr::null_mut();
    }

    #[cfg(feature = "trace_execution")]
    fn trace_instruction(&self) {
        print!("          ");
        for value in self.stack.iter() {
            print!("[ {value} ]");
        }
        println!();
        let function = unsafe { (*self.current_frame().closure).function };
        unsafe { crate::debug::disassemble_instruction(&(*function).chunk, self.current_frame().ip) };
    }
}

impl Default for VM {
    fn default() -> Self {
        VM::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InterpretResult;

    fn run(source: &str) -> InterpretResult {
        VM::new().interpret(source)
    }

    #[test]
    fn evaluates_arithmetic() {
        assert_eq!(run("print 1 + 2 * 3;"), InterpretResult::Ok);
    }

    #[test]
    fn concatenates_strings() {
        assert_eq!(run("print \"foo\" + \"bar\";"), InterpretResult::Ok);
    }

    #[test]
    fn closures_capture_outer_locals_by_reference() {
        let source = "
            fun makeCounter() {
                var count = 0;
                fun increment() {
                    count = count + 1;
                    return count;
                }
                return increment;
            }
            var counter = makeCounter();
            print counter();
            print counter();
        ";
        assert_eq!(run(source), InterpretResult::Ok);
    }

    #[test]
    fn classes_support_inheritance_and_super() {
        let source = "
            class Animal {
                speak() { return \"...\"; }
            }
            class Dog < Animal {
                speak() { return \"Woof: \" + super.speak(); }
            }
            var dog = Dog();
            print dog.speak();
        ";
        assert_eq!(run(source), InterpretResult::Ok);
    }

    #[test]
    fn initializer_returns_this_implicitly() {
        let source = "
            class Box {
                init(value) { this.value = value; }
            }
            var b = Box(5);
            print b.value;
        ";
        assert_eq!(run(source), InterpretResult::Ok);
    }

    #[test]
    fn undefined_variable_is_a_runtime_error() {
        assert_eq!(run("print undefined_name;"), InterpretResult::RuntimeError);
    }

    #[test]
    fn calling_a_non_callable_value_is_a_runtime_error() {
        assert_eq!(run("var x = 1; x();"), InterpretResult::RuntimeError);
    }

    #[test]
    fn stress_gc_keeps_reachable_values_alive() {
        let source = "
            var total = 0;
            for (var i = 0; i < 50; i = i + 1) {
                var s = \"item\" + \"-\" + \"x\";
                total = total + 1;
            }
            print total;
        ";
        assert_eq!(run(source), InterpretResult::Ok);
    }
}
