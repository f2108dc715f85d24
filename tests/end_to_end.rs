use embervm::{InterpretResult, VM};

fn run(source: &str) -> (InterpretResult, String) {
    let mut vm = VM::with_output(Vec::new());
    let result = vm.interpret(source);
    let output = String::from_utf8(vm.into_output()).expect("print output is not valid utf-8");
    (result, output)
}

#[test]
fn arithmetic_precedence() {
    let (result, output) = run("print 1 + 2 * 3;");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(output, "7\n");
}

#[test]
fn string_concatenation() {
    let (result, output) = run("var a = \"foo\"; var b = \"bar\"; print a + b;");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(output, "foobar\n");
}

#[test]
fn closures_capture_loop_state_across_calls() {
    let source = "
        fun makeCounter() {
            var i = 0;
            fun count() {
                i = i + 1;
                print i;
            }
            return count;
        }
        var c = makeCounter();
        c();
        c();
        c();
    ";
    let (result, output) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(output, "1\n2\n3\n");
}

#[test]
fn inheritance_dispatches_through_super() {
    let source = "
        class Doughnut {
            cook() { print \"fry\"; }
        }
        class Cruller < Doughnut {
            cook() {
                super.cook();
                print \"glaze\";
            }
        }
        Cruller().cook();
    ";
    let (result, output) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(output, "fry\nglaze\n");
}

#[test]
fn initializer_implicitly_returns_this() {
    let source = "
        class A {
            init(x) { this.x = x; }
        }
        print A(42).x;
    ";
    let (result, output) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(output, "42\n");
}

#[test]
fn undefined_global_is_a_runtime_error() {
    let (result, output) = run("print a;");
    assert_eq!(result, InterpretResult::RuntimeError);
    assert_eq!(output, "", "a runtime error must abort before the print executes");
}

#[test]
fn distinct_instances_are_not_equal() {
    let source = "
        class C {}
        var a = C();
        var b = C();
        print a == b;
    ";
    let (result, output) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(output, "false\n");
}

#[test]
fn wrong_arity_call_is_a_runtime_error() {
    let source = "
        fun add(a, b) { return a + b; }
        add(1);
    ";
    assert_eq!(run(source).0, InterpretResult::RuntimeError);
}

#[test]
fn self_inheriting_class_is_a_compile_error() {
    assert_eq!(run("class Oops < Oops {}").0, InterpretResult::CompileError);
}

#[test]
fn returning_a_value_from_an_initializer_is_a_compile_error() {
    let source = "
        class Box {
            init() { return 1; }
        }
    ";
    assert_eq!(run(source).0, InterpretResult::CompileError);
}

#[test]
fn calling_a_field_that_is_not_a_function_is_a_runtime_error() {
    let source = "
        class Box {}
        var b = Box();
        b.value = 1;
        b.value();
    ";
    assert_eq!(run(source).0, InterpretResult::RuntimeError);
}

#[test]
fn native_clock_is_callable() {
    let (result, output) = run("print clock() >= 0;");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(output, "true\n");
}
