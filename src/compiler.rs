use crate::chunk::{Chunk, OpCode};
use crate::error::CompileError;
use crate::gc::GarbageCollector;
use crate::objects::object_manager::ObjectManager;
use crate::objects::object_string::fnv1a_hash;
use crate::objects::{ObjFunction, Object};
use crate::scanner::{Scanner, Token, TokenType};
use crate::table::Table;
use crate::value::Value;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    fn higher(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

type ParseFn = fn(&mut Compiler<'_>, bool);

#[derive(Clone, Copy)]
struct ParseRule {
    prefix: Option<ParseFn>,
    infix: Option<ParseFn>,
    precedence: Precedence,
}

const EMPTY_RULE: ParseRule = ParseRule { prefix: None, infix: None, precedence: Precedence::None };

const RULES: [ParseRule; TokenType::Eof as usize + 1] = {
    let mut rules = [EMPTY_RULE; TokenType::Eof as usize + 1];

    rules[TokenType::LeftParen as usize] = ParseRule {
        prefix: Some(|c: &mut Compiler<'_>, b: bool| c.grouping(b)),
        infix: Some(|c: &mut Compiler<'_>, b: bool| c.call(b)),
        precedence: Precedence::Call,
    };
    rules[TokenType::Dot as usize] = ParseRule {
        prefix: None,
        infix: Some(|c: &mut Compiler<'_>, b: bool| c.dot(b)),
        precedence: Precedence::Call,
    };
    rules[TokenType::Minus as usize] = ParseRule {
        prefix: Some(|c: &mut Compiler<'_>, b: bool| c.unary(b)),
        infix: Some(|c: &mut Compiler<'_>, b: bool| c.binary(b)),
        precedence: Precedence::Term,
    };
    rules[TokenType::Plus as usize] = ParseRule {
        prefix: None,
        infix: Some(|c: &mut Compiler<'_>, b: bool| c.binary(b)),
        precedence: Precedence::Term,
    };
    rules[TokenType::Slash as usize] = ParseRule {
        prefix: None,
        infix: Some(|c: &mut Compiler<'_>, b: bool| c.binary(b)),
        precedence: Precedence::Factor,
    };
    rules[TokenType::Star as usize] = ParseRule {
        prefix: None,
        infix: Some(|c: &mut Compiler<'_>, b: bool| c.binary(b)),
        precedence: Precedence::Factor,
    };
    rules[TokenType::Bang as usize] = ParseRule {
        prefix: Some(|c: &mut Compiler<'_>, b: bool| c.unary(b)),
        infix: None,
        precedence: Precedence::None,
    };
    rules[TokenType::BangEqual as usize] = ParseRule {
        prefix: None,
        infix: Some(|c: &mut Compiler<'_>, b: bool| c.binary(b)),
        precedence: Precedence::Equality,
    };
    rules[TokenType::EqualEqual as usize] = ParseRule {
        prefix: None,
        infix: Some(|c: &mut Compiler<'_>, b: bool| c.binary(b)),
        precedence: Precedence::Equality,
    };
    rules[TokenType::Greater as usize] = ParseRule {
        prefix: None,
        infix: Some(|c: &mut Compiler<'_>, b: bool| c.binary(b)),
        precedence: Precedence::Comparison,
    };
    rules[TokenType::GreaterEqual as usize] = ParseRule {
        prefix: None,
        infix: Some(|c: &mut Compiler<'_>, b: bool| c.binary(b)),
        precedence: Precedence::Comparison,
    };
    rules[TokenType::Less as usize] = ParseRule {
        prefix: None,
        infix: Some(|c: &mut Compiler<'_>, b: bool| c.binary(b)),
        precedence: Precedence::Comparison,
    };
    rules[TokenType::LessEqual as usize] = ParseRule {
        prefix: None,
        infix: Some(|c: &mut Compiler<'_>, b: bool| c.binary(b)),
        precedence: Precedence::Comparison,
    };
    rules[TokenType::Identifier as usize] = ParseRule {
        prefix: Some(|c: &mut Compiler<'_>, b: bool| c.variable(b)),
        infix: None,
        precedence: Precedence::None,
    };
    rules[TokenType::String as usize] = ParseRule {
        prefix: Some(|c: &mut Compiler<'_>, b: bool| c.string(b)),
        infix: None,
        precedence: Precedence::None,
    };
    rules[TokenType::Number as usize] = ParseRule {
        prefix: Some(|c: &mut Compiler<'_>, b: bool| c.number(b)),
        infix: None,
        precedence: Precedence::None,
    };
    rules[TokenType::And as usize] = ParseRule {
        prefix: None,
        infix: Some(|c: &mut Compiler<'_>, b: bool| c.and_(b)),
        precedence: Precedence::And,
    };
    rules[TokenType::Or as usize] = ParseRule {
        prefix: None,
        infix: Some(|c: &mut Compiler<'_>, b: bool| c.or_(b)),
        precedence: Precedence::Or,
    };
    rules[TokenType::False as usize] = ParseRule {
        prefix: Some(|c: &mut Compiler<'_>, b: bool| c.literal(b)),
        infix: None,
        precedence: Precedence::None,
    };
    rules[TokenType::True as usize] = ParseRule {
        prefix: Some(|c: &mut Compiler<'_>, b: bool| c.literal(b)),
        infix: None,
        precedence: Precedence::None,
    };
    rules[TokenType::Nil as usize] = ParseRule {
        prefix: Some(|c: &mut Compiler<'_>, b: bool| c.literal(b)),
        infix: None,
        precedence: Precedence::None,
    };
    rules[TokenType::This as usize] = ParseRule {
        prefix: Some(|c: &mut Compiler<'_>, b: bool| c.this_(b)),
        infix: None,
        precedence: Precedence::None,
    };
    rules[TokenType::Super as usize] = ParseRule {
        prefix: Some(|c: &mut Compiler<'_>, b: bool| c.super_(b)),
        infix: None,
        precedence: Precedence::None,
    };

    rules
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    Script,
    Function,
    Method,
    Initializer,
}

struct Local<'a> {
    name: Token<'a>,
    depth: i32,
    is_captured: bool,
}

#[derive(Clone, Copy)]
struct UpvalueRef {
    index: u8,
    is_local: bool,
}

/// One nested function's worth of compile state: the function object being
/// built, its locals, and the upvalues it captures from its enclosing scope.
struct FunctionScope<'a> {
    function: *mut ObjFunction,
    function_type: FunctionType,
    locals: Vec<Local<'a>>,
    upvalues: Vec<UpvalueRef>,
    scope_depth: i32,
}

struct ClassScope {
    has_superclass: bool,
}

/// Single-pass Pratt parser. Owns the scanner and a stack of `FunctionScope`s
/// mirroring the chain of enclosing function compilations; emits bytecode
/// directly into the innermost scope's chunk as it parses.
pub struct Compiler<'a> {
    current: Token<'a>,
    previous: Token<'a>,
    scanner: Scanner<'a>,
    had_error: bool,
    panic_mode: bool,
    scopes: Vec<FunctionScope<'a>>,
    classes: Vec<ClassScope>,
    objects: &'a mut ObjectManager,
    strings: &'a mut Table,
    gc: &'a mut GarbageCollector,
    errors: Vec<CompileError>,
}

impl<'a> Compiler<'a> {
    pub fn compile(
        source: &'a str,
        objects: &'a mut ObjectManager,
        strings: &'a mut Table,
        gc: &'a mut GarbageCollector,
    ) -> Result<*mut ObjFunction, Vec<CompileError>> {
        let mut compiler = Compiler {
            current: Token { token_type: TokenType::Eof, lexeme: "", line: 0 },
            previous: Token { token_type: TokenType::Eof, lexeme: "", line: 0 },
            scanner: Scanner::new(source),
            had_error: false,
            panic_mode: false,
            scopes: Vec::new(),
            classes: Vec::new(),
            objects,
            strings,
            gc,
            errors: Vec::new(),
        };

        compiler.begin_function_scope(FunctionType::Script, "");
        compiler.advance();
        while !compiler.match_token(TokenType::Eof) {
            compiler.declaration();
        }
        compiler.consume(TokenType::Eof, "Expect end of expression.");

        let (function, _upvalues) = compiler.end_function_scope();

        if compiler.had_error {
            Err(compiler.errors)
        } else {
            Ok(function)
        }
    }

    fn current_scope(&self) -> &FunctionScope<'a> {
        self.scopes.last().expect("compiler has no active function scope")
    }

    fn current_scope_mut(&mut self) -> &mut FunctionScope<'a> {
        self.scopes.last_mut().expect("compiler has no active function scope")
    }

    fn current_chunk(&self) -> &Chunk {
        unsafe { &(*self.current_scope().function).chunk }
    }

    fn current_chunk_mut(&mut self) -> &mut Chunk {
        unsafe { &mut (*self.current_scope().function).chunk }
    }

    fn begin_function_scope(&mut self, function_type: FunctionType, name: &str) {
        // Allocate the function nameless and push its scope before naming it,
        // so it is already reachable (via `self.scopes`) by the time the name
        // string is allocated below — no unrooted object is ever live across
        // an allocation that could trigger a collection.
        let function = self.maybe_collect_alloc(|c| c.objects.alloc_function(std::ptr::null_mut()));

        let slot0 = if function_type == FunctionType::Function {
            Token { token_type: TokenType::Identifier, lexeme: "", line: 0 }
        } else {
            Token { token_type: TokenType::This, lexeme: "this", line: 0 }
        };

        self.scopes.push(FunctionScope {
            function,
            function_type,
            locals: vec![Local { name: slot0, depth: 0, is_captured: false }],
            upvalues: Vec::new(),
            scope_depth: 0,
        });

        if function_type != FunctionType::Script {
            let name_ptr = self.maybe_collect_alloc(|c| c.objects.alloc_string(name.to_string()));
            unsafe { (*function).name = name_ptr };
        }
    }

    fn end_function_scope(&mut self) -> (*mut ObjFunction, Vec<UpvalueRef>) {
        self.emit_return();
        let scope = self.scopes.pop().expect("scope stack underflow");
        unsafe {
            (*scope.function).upvalue_count = scope.upvalues.len();
        }
        (scope.function, scope.upvalues)
    }

    // --- token stream -----------------------------------------------------

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.token_type != TokenType::Error {
                break;
            }
            self.error_at_current(self.current.lexeme);
        }
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.current.token_type == token_type
    }

    fn match_token(&mut self, token_type: TokenType) -> bool {
        if !self.check(token_type) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, token_type: TokenType, message: &str) {
        if self.current.token_type == token_type {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    // --- bytecode emission --------------------------------------------------

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.current_chunk_mut().write(byte, line);
    }

    fn emit_bytes(&mut self, a: u8, b: u8) {
        self.emit_byte(a);
        self.emit_byte(b);
    }

    fn emit_constant(&mut self, value: Value) {
        let constant = self.make_constant(value);
        self.emit_bytes(OpCode::Constant.to_byte(), constant);
    }

    fn emit_return(&mut self) {
        if self.current_scope().function_type == FunctionType::Initializer {
            self.emit_bytes(OpCode::GetLocal.to_byte(), 0);
        } else {
            self.emit_byte(OpCode::Nil.to_byte());
        }
        self.emit_byte(OpCode::Return.to_byte());
    }

    fn emit_jump(&mut self, instruction: u8) -> usize {
        self.emit_byte(instruction);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.current_chunk().len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        let jump = self.current_chunk().len() - offset - 2;
        if jump > u16::MAX as usize {
            self.error("Too much code to jump over.");
        }
        let hi = ((jump >> 8) & 0xff) as u8;
        let lo = (jump & 0xff) as u8;
        self.current_chunk_mut().write_at(offset, hi);
        self.current_chunk_mut().write_at(offset + 1, lo);
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_byte(OpCode::Loop.to_byte());
        let offset = self.current_chunk().len() - loop_start + 2;
        if offset > u16::MAX as usize {
            self.error("Loop body too large.");
        }
        self.emit_byte(((offset >> 8) & 0xff) as u8);
        self.emit_byte((offset & 0xff) as u8);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        if let Some(index) = self.current_chunk().find_constant(value) {
            return index as u8;
        }
        let index = self.current_chunk_mut().add_constant(value);
        if index > u8::MAX as usize {
            self.error("Too many constants in one chunk.");
            return 0;
        }
        index as u8
    }

    /// Interns `text`, allocating a fresh `ObjString` only on a pool miss.
    fn intern_string(&mut self, text: &str) -> Value {
        let hash = fnv1a_hash(text.as_bytes());
        if let Some(existing) = self.strings.find_string(text, hash) {
            return Value::Obj(existing as *mut Object);
        }
        let ptr = self.maybe_collect_alloc(|c| c.objects.alloc_string(text.to_string()));
        self.strings.set(ptr, Value::Nil);
        Value::Obj(ptr as *mut Object)
    }

    // --- garbage collection --------------------------------------------------

    /// Mirrors `VM::maybe_collect_alloc`: every heap allocation the compiler
    /// makes runs the same threshold check the VM runs, so a long top-level
    /// script full of string and function literals can be collected against
    /// mid-compile instead of only once `run()` starts.
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
        self.gc.collect(self.objects, self.strings);
    }

    /// Roots are every function currently under construction (the whole
    /// `self.scopes` chain, innermost to outermost): marking each one
    /// transitively marks its chunk's constants, which is every object the
    /// compiler has finished building and attached so far.
    fn mark_roots(&mut self) {
        for scope in self.scopes.iter() {
            self.gc.mark_object(scope.function as *mut Object);
        }
    }

    fn identifier_constant(&mut self, name: Token) -> u8 {
        let value = self.intern_string(name.lexeme);
        self.make_constant(value)
    }

    // --- declarations and statements ---------------------------------------

    fn declaration(&mut self) {
        if self.match_token(TokenType::Class) {
            self.class_declaration();
        } else if self.match_token(TokenType::Fun) {
            self.function_declaration();
        } else if self.match_token(TokenType::Var) {
            self.variable_declaration();
        } else {
            self.statement();
        }

        if self.panic_mode {
            self.synchronize();
        }
    }

    fn class_declaration(&mut self) {
        self.consume(TokenType::Identifier, "Expect class name.");
        let class_name = self.previous;
        let name_constant = self.identifier_constant(class_name);
        self.declare_variable();

        self.emit_bytes(OpCode::Class.to_byte(), name_constant);
        self.define_variable(name_constant);

        self.classes.push(ClassScope { has_superclass: false });

        if self.match_token(TokenType::Less) {
            self.consume(TokenType::Identifier, "Expect superclass name.");
            self.variable(false);

            if class_name.lexeme == self.previous.lexeme {
                self.error("A class can't inherit from itself.");
            }

            self.begin_scope();
            self.add_local(Self::synthetic_token("super"));
            self.define_variable(0);

            self.named_variable(class_name, false);
            self.emit_byte(OpCode::Inherit.to_byte());
            self.classes.last_mut().unwrap().has_superclass = true;
        }

        self.named_variable(class_name, false);
        self.consume(TokenType::LeftBrace, "Expect '{' before class body.");
        while !self.check(TokenType::RightBrace) && !self.check(TokenType::Eof) {
            self.method();
        }
        self.consume(TokenType::RightBrace, "Expect '}' after class body.");
        self.emit_byte(OpCode::Pop.to_byte());

        if self.classes.last().unwrap().has_superclass {
            self.end_scope();
        }
        self.classes.pop();
    }

    fn method(&mut self) {
        self.consume(TokenType::Identifier, "Expect method name.");
        let name = self.previous;
        let constant = self.identifier_constant(name);
        let function_type = if name.lexeme == "init" { FunctionType::Initializer } else { FunctionType::Method };
        self.function(function_type);
        self.emit_bytes(OpCode::Method.to_byte(), constant);
    }

    fn function_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        self.mark_initialized();
        self.function(FunctionType::Function);
        self.define_variable(global);
    }

    fn function(&mut self, function_type: FunctionType) {
        let name = self.previous.lexeme;
        self.begin_function_scope(function_type, name);

        self.begin_scope();
        self.consume(TokenType::LeftParen, "Expect '(' after function name.");
        let mut arity: u32 = 0;
        if !self.check(TokenType::RightParen) {
            loop {
                arity += 1;
                if arity > 255 {
                    self.error("Can't have more than 255 parameters.");
                }
                let constant = self.parse_variable("Expect parameter name.");
                self.define_variable(constant);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        unsafe {
            (*self.current_scope().function).arity = arity.min(255) as u8;
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.");
        self.consume(TokenType::LeftBrace, "Expect '{' before function body.");
        self.block();

        let (function, upvalues) = self.end_function_scope();

        let constant = self.make_constant(Value::Obj(function as *mut Object));
        self.emit_bytes(OpCode::Closure.to_byte(), constant);
        for upvalue in upvalues {
            self.emit_byte(if upvalue.is_local { 1 } else { 0 });
            self.emit_byte(upvalue.index);
        }
    }

    fn variable_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");
        if self.match_token(TokenType::Equal) {
            self.expression();
        } else {
            self.emit_byte(OpCode::Nil.to_byte());
        }
        self.consume(TokenType::Semicolon, "Expect ';' after variable declaration.");
        self.define_variable(global);
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenType::Identifier, message);
        self.declare_variable();
        if self.current_scope().scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(self.previous)
    }

    fn declare_variable(&mut self) {
        if self.current_scope().scope_depth == 0 {
            return;
        }

        let name = self.previous;
        let scope_depth = self.current_scope().scope_depth;
        let mut duplicate = false;
        for local in self.current_scope().locals.iter().rev() {
            if local.depth != -1 && local.depth < scope_depth {
                break;
            }
            if local.name.lexeme == name.lexeme {
                duplicate = true;
                break;
            }
        }
        if duplicate {
            self.error("Already a variable with this name in this scope.");
        }
        self.add_local(name);
    }

    fn add_local(&mut self, name: Token<'a>) {
        if self.current_scope().locals.len() >= 256 {
            self.error("Too many local variables in function.");
            return;
        }
        self.current_scope_mut().locals.push(Local { name, depth: -1, is_captured: false });
    }

    fn define_variable(&mut self, global: u8) {
        if self.current_scope().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_bytes(OpCode::DefineGlobal.to_byte(), global);
    }

    fn mark_initialized(&mut self) {
        let scope_depth = self.current_scope().scope_depth;
        if scope_depth == 0 {
            return;
        }
        self.current_scope_mut().locals.last_mut().unwrap().depth = scope_depth;
    }

    fn statement(&mut self) {
        if self.match_token(TokenType::Print) {
            self.print_statement();
        } else if self.match_token(TokenType::If) {
            self.if_statement();
        } else if self.match_token(TokenType::Return) {
            self.return_statement();
        } else if self.match_token(TokenType::While) {
            self.while_statement();
        } else if self.match_token(TokenType::For) {
            self.for_statement();
        } else if self.match_token(TokenType::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenType::Semicolon, "Expect ';' after value.");
        self.emit_byte(OpCode::Print.to_byte());
    }

    fn return_statement(&mut self) {
        if self.current_scope().function_type == FunctionType::Script {
            self.error("Can't return from top-level code.");
        }

        if self.match_token(TokenType::Semicolon) {
            self.emit_return();
        } else {
            if self.current_scope().function_type == FunctionType::Initializer {
                self.error("Can't return a value from an initializer.");
            }
            self.expression();
            self.consume(TokenType::Semicolon, "Expect ';' after return value.");
            self.emit_byte(OpCode::Return.to_byte());
        }
    }

    fn if_statement(&mut self) {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse.to_byte());
        self.emit_byte(OpCode::Pop.to_byte());
        self.statement();

        let else_jump = self.emit_jump(OpCode::Jump.to_byte());
        self.patch_jump(then_jump);
        self.emit_byte(OpCode::Pop.to_byte());

        if self.match_token(TokenType::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.current_chunk().len();
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse.to_byte());
        self.emit_byte(OpCode::Pop.to_byte());
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_byte(OpCode::Pop.to_byte());
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.");
        if self.match_token(TokenType::Semicolon) {
            // no initializer clause
        } else if self.match_token(TokenType::Var) {
            self.variable_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.current_chunk().len();
        let mut exit_jump: Option<usize> = None;
        if !self.match_token(TokenType::Semicolon) {
            self.expression();
            self.consume(TokenType::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse.to_byte()));
            self.emit_byte(OpCode::Pop.to_byte());
        }

        if !self.match_token(TokenType::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump.to_byte());
            let increment_start = self.current_chunk().len();
            self.expression();
            self.emit_byte(OpCode::Pop.to_byte());
            self.consume(TokenType::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_byte(OpCode::Pop.to_byte());
        }
        self.end_scope();
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenType::Semicolon, "Expect ';' after expression.");
        self.emit_byte(OpCode::Pop.to_byte());
    }

    fn block(&mut self) {
        while !self.check(TokenType::RightBrace) && !self.check(TokenType::Eof) {
            self.declaration();
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.");
    }

    fn begin_scope(&mut self) {
        self.current_scope_mut().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        let scope_depth = {
            let scope = self.current_scope_mut();
            scope.scope_depth -= 1;
            scope.scope_depth
        };

        loop {
            let should_pop = matches!(self.current_scope().locals.last(), Some(local) if local.depth > scope_depth);
            if !should_pop {
                break;
            }
            let is_captured = self.current_scope_mut().locals.pop().unwrap().is_captured;
            if is_captured {
                self.emit_byte(OpCode::CloseUpvalue.to_byte());
            } else {
                self.emit_byte(OpCode::Pop.to_byte());
            }
        }
    }

    // --- expressions --------------------------------------------------------

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let can_assign = precedence <= Precedence::Assignment;

        match RULES[self.previous.token_type as usize].prefix {
            Some(rule) => rule(self, can_assign),
            None => {
                self.error("Expect expression.");
                return;
            }
        }

        while precedence <= RULES[self.current.token_type as usize].precedence {
            self.advance();
            match RULES[self.previous.token_type as usize].infix {
                Some(rule) => rule(self, can_assign),
                None => {
                    self.error("Expect infix parse function.");
                    return;
                }
            }
        }

        if can_assign && self.match_token(TokenType::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self, _can_assign: bool) {
        let operator = self.previous.token_type;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenType::Bang => self.emit_byte(OpCode::Not.to_byte()),
            TokenType::Minus => self.emit_byte(OpCode::Negate.to_byte()),
            _ => unreachable!("not a unary operator: {operator}"),
        }
    }

    fn binary(&mut self, _can_assign: bool) {
        let operator = self.previous.token_type;
        let rule = RULES[operator as usize];
        self.parse_precedence(rule.precedence.higher());

        match operator {
            TokenType::BangEqual => self.emit_bytes(OpCode::Equal.to_byte(), OpCode::Not.to_byte()),
            TokenType::EqualEqual => self.emit_byte(OpCode::Equal.to_byte()),
            TokenType::Greater => self.emit_byte(OpCode::Greater.to_byte()),
            TokenType::GreaterEqual => self.emit_bytes(OpCode::Less.to_byte(), OpCode::Not.to_byte()),
            TokenType::Less => self.emit_byte(OpCode::Less.to_byte()),
            TokenType::LessEqual => self.emit_bytes(OpCode::Greater.to_byte(), OpCode::Not.to_byte()),
            TokenType::Plus => self.emit_byte(OpCode::Add.to_byte()),
            TokenType::Minus => self.emit_byte(OpCode::Subtract.to_byte()),
            TokenType::Star => self.emit_byte(OpCode::Multiply.to_byte()),
            TokenType::Slash => self.emit_byte(OpCode::Divide.to_byte()),
            _ => unreachable!("not a binary operator: {operator}"),
        }
    }

    fn literal(&mut self, _can_assign: bool) {
        match self.previous.token_type {
            TokenType::False => self.emit_byte(OpCode::False.to_byte()),
            TokenType::True => self.emit_byte(OpCode::True.to_byte()),
            TokenType::Nil => self.emit_byte(OpCode::Nil.to_byte()),
            other => unreachable!("not a literal token: {other}"),
        }
    }

    fn number(&mut self, _can_assign: bool) {
        let value: f64 = self.previous.lexeme.parse().unwrap_or(0.0);
        self.emit_constant(Value::Number(value));
    }

    fn string(&mut self, _can_assign: bool) {
        let lexeme = self.previous.lexeme;
        let content = &lexeme[1..lexeme.len() - 1];
        let value = self.intern_string(content);
        self.emit_constant(value);
    }

    fn variable(&mut self, can_assign: bool) {
        self.named_variable(self.previous, can_assign);
    }

    fn named_variable(&mut self, name: Token<'a>, can_assign: bool) {
        let scope_index = self.scopes.len() - 1;
        let mut get_op = OpCode::GetLocal;
        let mut set_op = OpCode::SetLocal;
        let mut index = self.resolve_local(scope_index, name.lexeme);
        if index == -1 {
            index = self.resolve_upvalue(scope_index, name.lexeme);
            if index == -1 {
                index = self.identifier_constant(name) as i32;
                get_op = OpCode::GetGlobal;
                set_op = OpCode::SetGlobal;
            } else {
                get_op = OpCode::GetUpvalue;
                set_op = OpCode::SetUpvalue;
            }
        }

        if can_assign && self.match_token(TokenType::Equal) {
            self.expression();
            self.emit_bytes(set_op.to_byte(), index as u8);
        } else {
            self.emit_bytes(get_op.to_byte(), index as u8);
        }
    }

    fn resolve_local(&mut self, scope_index: usize, name: &str) -> i32 {
        let scope = &self.scopes[scope_index];
        for (i, local) in scope.locals.iter().enumerate().rev() {
            if local.name.lexeme == name {
                if local.depth == -1 {
                    self.error("Can't read local variable in its own initializer.");
                }
                return i as i32;
            }
        }
        -1
    }

    fn resolve_upvalue(&mut self, scope_index: usize, name: &str) -> i32 {
        if scope_index == 0 {
            return -1;
        }

        let local = self.resolve_local(scope_index - 1, name);
        if local != -1 {
            self.scopes[scope_index - 1].locals[local as usize].is_captured = true;
            return self.add_upvalue(scope_index, local as u8, true) as i32;
        }

        let upvalue = self.resolve_upvalue(scope_index - 1, name);
        if upvalue != -1 {
            return self.add_upvalue(scope_index, upvalue as u8, false) as i32;
        }

        -1
    }

    fn add_upvalue(&mut self, scope_index: usize, index: u8, is_local: bool) -> usize {
        let scope = &mut self.scopes[scope_index];
        for (i, upvalue) in scope.upvalues.iter().enumerate() {
            if upvalue.index == index && upvalue.is_local == is_local {
                return i;
            }
        }
        if scope.upvalues.len() >= 256 {
            self.error("Too many closure variables in function.");
            return 0;
        }
        scope.upvalues.push(UpvalueRef { index, is_local });
        scope.upvalues.len() - 1
    }

    fn and_(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse.to_byte());
        self.emit_byte(OpCode::Pop.to_byte());
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or_(&mut self, _can_assign: bool) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse.to_byte());
        let end_jump = self.emit_jump(OpCode::Jump.to_byte());
        self.patch_jump(else_jump);
        self.emit_byte(OpCode::Pop.to_byte());
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn call(&mut self, _can_assign: bool) {
        let arg_count = self.argument_list();
        self.emit_bytes(OpCode::Call.to_byte(), arg_count);
    }

    fn argument_list(&mut self) -> u8 {
        let mut count: u32 = 0;
        if !self.check(TokenType::RightParen) {
            loop {
                self.expression();
                if count >= 255 {
                    self.error("Can't have more than 255 arguments.");
                }
                count += 1;
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after arguments.");
        count as u8
    }

    fn dot(&mut self, can_assign: bool) {
        self.consume(TokenType::Identifier, "Expect property name after '.'.");
        let name = self.identifier_constant(self.previous);

        if can_assign && self.match_token(TokenType::Equal) {
            self.expression();
            self.emit_bytes(OpCode::SetProperty.to_byte(), name);
        } else if self.match_token(TokenType::LeftParen) {
            let arg_count = self.argument_list();
            self.emit_bytes(OpCode::Invoke.to_byte(), name);
            self.emit_byte(arg_count);
        } else {
            self.emit_bytes(OpCode::GetProperty.to_byte(), name);
        }
    }

    fn this_(&mut self, _can_assign: bool) {
        if self.classes.is_empty() {
            self.error("Can't use 'this' outside of a class.");
            return;
        }
        self.variable(false);
    }

    fn super_(&mut self, _can_assign: bool) {
        if self.classes.is_empty() {
            self.error("Can't use 'super' outside of a class.");
        } else if !self.classes.last().unwrap().has_superclass {
            self.error("Can't use 'super' in a class with no superclass.");
        }

        self.consume(TokenType::Dot, "Expect '.' after 'super'.");
        self.consume(TokenType::Identifier, "Expect superclass method name.");
        let name = self.identifier_constant(self.previous);

        self.named_variable(Self::synthetic_token("this"), false);
        if self.match_token(TokenType::LeftParen) {
            let arg_count = self.argument_list();
            self.named_variable(Self::synthetic_token("super"), false);
            self.emit_bytes(OpCode::SuperInvoke.to_byte(), name);
            self.emit_byte(arg_count);
        } else {
            self.named_variable(Self::synthetic_token("super"), false);
            self.emit_bytes(OpCode::GetSuper.to_byte(), name);
        }
    }

    fn synthetic_token(text: &'static str) -> Token<'static> {
        Token { token_type: TokenType::Identifier, lexeme: text, line: 0 }
    }

    // --- error reporting ------------------------------------------------------

    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    fn error_at(&mut self, token: Token, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;

        let mut rendered = format!("[line {}] Error", token.line);
        match token.token_type {
            TokenType::Eof => rendered.push_str(" at end"),
            TokenType::Error => {}
            _ => rendered.push_str(&format!(" at '{}'", token.lexeme)),
        }
        rendered.push_str(&format!(": {message}"));
        eprintln!("{rendered}");

        self.errors.push(CompileError { line: token.line, message: message.to_string() });
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.token_type != TokenType::Eof {
            if self.previous.token_type == TokenType::Semicolon {
                return;
            }
            match self.current.token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {}
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::OpCode;

    fn compile_ok(source: &str) -> *mut ObjFunction {
        let mut objects = ObjectManager::new();
        let mut strings = Table::new();
        let mut gc = GarbageCollector::new();
        Compiler::compile(source, &mut objects, &mut strings, &mut gc).expect("expected successful compile")
    }

    #[test]
    fn compiles_arithmetic_precedence() {
        let function = compile_ok("!(5 - 4 > 3 * 2 == !nil);");
        let chunk = unsafe { &(*function).chunk };
        assert_eq!(chunk.read_byte(0), OpCode::Constant.to_byte());
        assert_eq!(chunk.read_byte(4), OpCode::Subtract.to_byte());
        assert_eq!(chunk.read_byte(9), OpCode::Multiply.to_byte());
        assert_eq!(chunk.read_byte(10), OpCode::Greater.to_byte());
        assert_eq!(chunk.read_byte(13), OpCode::Equal.to_byte());
        assert_eq!(chunk.read_byte(14), OpCode::Not.to_byte());
        assert_eq!(chunk.read_byte(15), OpCode::Pop.to_byte());
    }

    #[test]
    fn interns_identical_string_literals() {
        let mut objects = ObjectManager::new();
        let mut strings = Table::new();
        let mut gc = GarbageCollector::new();
        Compiler::compile("\"hi\"; \"hi\";", &mut objects, &mut strings, &mut gc).unwrap();
        assert_eq!(strings.len(), 1);
    }

    #[test]
    fn reports_error_for_self_initializing_local() {
        let mut objects = ObjectManager::new();
        let mut strings = Table::new();
        let mut gc = GarbageCollector::new();
        let result = Compiler::compile("{ var a = a; }", &mut objects, &mut strings, &mut gc);
        assert!(result.is_err());
    }

    #[test]
    fn reports_error_returning_from_top_level() {
        let mut objects = ObjectManager::new();
        let mut strings = Table::new();
        let mut gc = GarbageCollector::new();
        let result = Compiler::compile("return 1;", &mut objects, &mut strings, &mut gc);
        assert!(result.is_err());
    }

    #[test]
    fn compiles_closures_capturing_outer_locals() {
        let function = compile_ok(
            "fun outer() {
                 var x = 1;
                 fun inner() { return x; }
                 return inner;
             }",
        );
        assert!(!function.is_null());
    }

    #[test]
    fn compiles_class_with_inheritance_and_super() {
        let result = compile_ok(
            "class A { greet() { return \"a\"; } }
             class B < A {
                 greet() { return super.greet(); }
             }",
        );
        assert!(!result.is_null());
    }

    #[test]
    fn rejects_self_inheriting_class() {
        let mut objects = ObjectManager::new();
        let mut strings = Table::new();
        let mut gc = GarbageCollector::new();
        let result = Compiler::compile("class A < A {}", &mut objects, &mut strings, &mut gc);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_value_return_from_initializer() {
        let mut objects = ObjectManager::new();
        let mut strings = Table::new();
        let mut gc = GarbageCollector::new();
        let result = Compiler::compile("class A { init() { return 1; } }", &mut objects, &mut strings, &mut gc);
        assert!(result.is_err());
    }

    /// Forces a collection before every single heap allocation the compiler
    /// makes (by zeroing `next_gc`), so a function whose name or nested
    /// closures are swept out from under it would show up as a dangling
    /// pointer — `compile_ok`'s panics on a bad `*mut ObjFunction` read would
    /// catch that; reaching the end intact shows every compiler-side alloc
    /// is rooted via `Compiler::mark_roots`.
    #[test]
    fn compiles_under_forced_gc_pressure() {
        let mut objects = ObjectManager::new();
        let mut strings = Table::new();
        let mut gc = GarbageCollector::new();
        gc.next_gc = 0;

        let function = Compiler::compile(
            "class Base {
                 greet() { return \"hi\" + \"!\"; }
             }
             class Sub < Base {
                 greet() {
                     fun helper() { return super.greet(); }
                     return helper();
                 }
             }
             fun build() {
                 var tag = \"closure\";
                 fun inner() { return tag; }
                 return inner;
             }",
            &mut objects,
            &mut strings,
            &mut gc,
        )
        .expect("expected successful compile under constant GC pressure");

        assert!(!function.is_null());
        assert_eq!(unsafe { (*function).display_name() }, "<script>");
    }
}
