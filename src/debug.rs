use crate::chunk::{Chunk, OpCode};

/// Prints every instruction in `chunk` in clox's disassembler format. Gated
/// call sites live in the compiler (`print_code`) and VM (`trace_execution`);
/// this module itself carries no feature gate so both can share it.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) {
    println!("== {name} ==");
    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset);
    }
}

pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> usize {
    print!("{offset:04} ");
    if offset > 0 && chunk.line_at(offset) == chunk.line_at(offset - 1) {
        print!("   | ");
    } else {
        print!("{:4} ", chunk.line_at(offset));
    }

    let byte = chunk.read_byte(offset);
    let instruction = match OpCode::from_byte(byte) {
        Some(instruction) => instruction,
        None => {
            println!("Unknown opcode {byte}");
            return offset + 1;
        }
    };

    match instruction {
        OpCode::Constant => constant_instruction("OP_CONSTANT", chunk, offset),
        OpCode::Nil => simple_instruction("OP_NIL", offset),
        OpCode::True => simple_instruction("OP_TRUE", offset),
        OpCode::False => simple_instruction("OP_FALSE", offset),
        OpCode::Pop => simple_instruction("OP_POP", offset),
        OpCode::GetLocal => byte_instruction("OP_GET_LOCAL", chunk, offset),
        OpCode::SetLocal => byte_instruction("OP_SET_LOCAL", chunk, offset),
        OpCode::GetGlobal => constant_instruction("OP_GET_GLOBAL", chunk, offset),
        OpCode::SetGlobal => constant_instruction("OP_SET_GLOBAL", chunk, offset),
        OpCode::DefineGlobal => constant_instruction("OP_DEFINE_GLOBAL", chunk, offset),
        OpCode::GetUpvalue => byte_instruction("OP_GET_UPVALUE", chunk, offset),
        OpCode::SetUpvalue => byte_instruction("OP_SET_UPVALUE", chunk, offset),
        OpCode::GetProperty => constant_instruction("OP_GET_PROPERTY", chunk, offset),
        OpCode::SetProperty => constant_instruction("OP_SET_PROPERTY", chunk, offset),
        OpCode::GetSuper => constant_instruction("OP_GET_SUPER", chunk, offset),
        OpCode::Equal => simple_instruction("OP_EQUAL", offset),
        OpCode::Greater => simple_instruction("OP_GREATER", offset),
        OpCode::Less => simple_instruction("OP_LESS", offset),
        OpCode::Add => simple_instruction("OP_ADD", offset),
        OpCode::Subtract => simple_instruction("OP_SUBTRACT", offset),
        OpCode::Multiply => simple_instruction("OP_MULTIPLY", offset),
        OpCode::Divide => simple_instruction("OP_DIVIDE", offset),
        OpCode::Not => simple_instruction("OP_NOT", offset),
        OpCode::Negate => simple_instruction("OP_NEGATE", offset),
        OpCode::Print => simple_instruction("OP_PRINT", offset),
        OpCode::Jump => jump_instruction("OP_JUMP", 1, chunk, offset),
        OpCode::JumpIfFalse => jump_instruction("OP_JUMP_IF_FALSE", 1, chunk, offset),
        OpCode::Loop => jump_instruction("OP_LOOP", -1, chunk, offset),
        OpCode::Call => byte_instruction("OP_CALL", chunk, offset),
        OpCode::Invoke => invoke_instruction("OP_INVOKE", chunk, offset),
        OpCode::SuperInvoke => invoke_instruction("OP_SUPER_INVOKE", chunk, offset),
        OpCode::Closure => closure_instruction(chunk, offset),
        OpCode::CloseUpvalue => simple_instruction("OP_CLOSE_UPVALUE", offset),
        OpCode::Return => simple_instruction("OP_RETURN", offset),
        OpCode::Class => constant_instruction("OP_CLASS", chunk, offset),
        OpCode::Inherit => simple_instruction("OP_INHERIT", offset),
        OpCode::Method => constant_instruction("OP_METHOD", chunk, offset),
    }
}

fn simple_instruction(name: &str, offset: usize) -> usize {
    println!("{name}");
    offset + 1
}

fn byte_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    let slot = chunk.read_byte(offset + 1);
    println!("{name:-16} {slot:4}");
    offset + 2
}

fn constant_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    let index = chunk.read_byte(offset + 1) as usize;
    println!("{name:-16} {index:4} '{}'", chunk.get_constant(index));
    offset + 2
}

fn jump_instruction(name: &str, sign: i32, chunk: &Chunk, offset: usize) -> usize {
    let hi = chunk.read_byte(offset + 1) as u16;
    let lo = chunk.read_byte(offset + 2) as u16;
    let jump = (hi << 8) | lo;
    let target = offset as i64 + 3 + sign as i64 * jump as i64;
    println!("{name:-16} {offset:4} -> {target}");
    offset + 3
}

fn invoke_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    let constant = chunk.read_byte(offset + 1) as usize;
    let arg_count = chunk.read_byte(offset + 2);
    println!("{name:-16} ({arg_count} args) {constant:4} '{}'", chunk.get_constant(constant));
    offset + 3
}

fn closure_instruction(chunk: &Chunk, offset: usize) -> usize {
    let mut offset = offset + 1;
    let constant = chunk.read_byte(offset) as usize;
    offset += 1;
    println!("{:-16} {constant:4} '{}'", "OP_CLOSURE", chunk.get_constant(constant));

    let upvalue_count = match chunk.get_constant(constant) {
        crate::value::Value::Obj(ptr) => unsafe { (*ptr).as_function().upvalue_count },
        _ => 0,
    };
    for _ in 0..upvalue_count {
        let is_local = chunk.read_byte(offset);
        let index = chunk.read_byte(offset + 1);
        println!(
            "{offset:04}      |                     {} {index}",
            if is_local == 1 { "local" } else { "upvalue" }
        );
        offset += 2;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn disassembles_a_constant_and_return() {
        let mut chunk = Chunk::new();
        let index = chunk.add_constant(Value::Number(1.5));
        chunk.write(OpCode::Constant.to_byte(), 1);
        chunk.write(index as u8, 1);
        chunk.write(OpCode::Return.to_byte(), 1);

        assert_eq!(disassemble_instruction(&chunk, 0), 2);
        assert_eq!(disassemble_instruction(&chunk, 2), 3);
    }

    #[test]
    fn disassembles_a_forward_jump() {
        let mut chunk = Chunk::new();
        chunk.write(OpCode::JumpIfFalse.to_byte(), 1);
        chunk.write(0, 1);
        chunk.write(3, 1);
        chunk.write(OpCode::Pop.to_byte(), 1);

        assert_eq!(disassemble_instruction(&chunk, 0), 3);
    }
}
