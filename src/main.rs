use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use embervm::{InterpretResult, VM};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => repl(),
        2 => run_file(&args[1]),
        _ => {
            eprintln!("Usage: ember [path]");
            ExitCode::from(64)
        }
    }
}

fn repl() -> ExitCode {
    let mut vm = VM::new();
    let mut line = String::new();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return ExitCode::from(74);
        }
        line.clear();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                println!();
                return ExitCode::SUCCESS;
            }
            Ok(_) => {
                vm.interpret(&line);
            }
            Err(_) => return ExitCode::from(74),
        }
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Could not read file \"{path}\": {err}");
            return ExitCode::from(74);
        }
    };

    let mut vm = VM::new();
    exit_code_for(vm.interpret(&source))
}

fn exit_code_for(result: InterpretResult) -> ExitCode {
    ExitCode::from(result.exit_code() as u8)
}
