//! Integration tests for the Jack compiler.
//!
//! Programs modelled on the classic nand2tetris test suite are compiled from
//! source and from temporary directories, and the VM output is checked either
//! exactly or by the patterns each feature must produce.

use jackc::{
    CompileError, CompileOptions, ErrorCategory, compile_directory, compile_file, compile_source,
    write_result,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

// =============================================================================
// Helper Functions
// =============================================================================

fn compile_ok(source: &str, filename: &str) -> String {
    let result = compile_source(source, filename, CompileOptions::default());
    assert!(
        result.is_ok(),
        "Compilation failed for {}: {:?}",
        filename,
        result.error
    );
    result.vm_code
}

fn compile_err(source: &str) -> CompileError {
    let result = compile_source(source, "Main", CompileOptions::default());
    assert!(result.vm_code.is_empty());
    result.error.expect("compilation should fail")
}

fn vm_lines(vm: &str) -> Vec<&str> {
    vm.lines().collect()
}

fn write_program(dir: &Path, files: &[(&str, &str)]) {
    for (name, source) in files {
        fs::write(dir.join(name), source).unwrap();
    }
}

const SQUARE: &str = r#"
/** A square with a position and size. */
class Square {
    field int x, y;
    field int size;

    constructor Square new(int ax, int ay, int asize) {
        let x = ax;
        let y = ay;
        let size = asize;
        do draw();
        return this;
    }

    method void dispose() {
        do Memory.deAlloc(this);
        return;
    }

    method void draw() {
        do Screen.setColor(true);
        do Screen.drawRectangle(x, y, x + size, y + size);
        return;
    }

    method void incSize() {
        if (((y + size) < 254) & ((x + size) < 510)) {
            let size = size + 2;
            do draw();
        }
        return;
    }
}
"#;

const SQUARE_GAME: &str = r#"
class SquareGame {
    field Square square;
    field int direction;
    static SquareGame instance;

    constructor SquareGame new() {
        let square = Square.new(0, 0, 30);
        let direction = 0;
        return this;
    }

    method void dispose() {
        do square.dispose();
        do Memory.deAlloc(this);
        return;
    }

    method void moveSquare() {
        if (direction = 1) { do square.incSize(); }
        do Sys.wait(5);
        return;
    }

    function void run() {
        let instance = SquareGame.new();
        do instance.moveSquare();
        return;
    }
}
"#;

const MAIN: &str = r#"
class Main {
    function void main() {
        do SquareGame.run();
        return;
    }
}
"#;

// =============================================================================
// Test 1: Seven - Simple arithmetic and function calls
// =============================================================================

#[test]
fn test_seven() {
    let source = r#"
class Main {
    function void main() {
        do Output.printInt(1 + (2 * 3));
        return;
    }
}
"#;

    let vm = compile_ok(source, "Main");
    assert_eq!(
        vm_lines(&vm),
        [
            "function Main.main 0",
            "push constant 1",
            "push constant 2",
            "push constant 3",
            "call Math.multiply 2",
            "add",
            "call Output.printInt 1",
            "pop temp 0",
            "push constant 0",
            "return",
        ]
    );
}

#[test]
fn test_seven_without_parentheses_is_left_to_right() {
    let source = "class Main { function void main() { do Output.printInt(1 + 2 * 3); return; } }";
    let vm = compile_ok(source, "Main");
    assert!(vm.contains("push constant 1\npush constant 2\nadd\npush constant 3\ncall Math.multiply 2\n"));
}

// =============================================================================
// Test 2: ConvertToBin - Procedural features (loops, conditionals, functions)
// =============================================================================

#[test]
fn test_convert_to_bin() {
    let source = r#"
class Main {
    function void main() {
        var int value;
        do Main.fillMemory(8001, 16, -1);
        let value = Memory.peek(8000);
        do Main.convert(value);
        return;
    }

    function void convert(int value) {
        var int mask, position;
        var boolean loop;

        let loop = true;
        while (loop) {
            let position = position + 1;
            let mask = Main.nextMask(mask);
            if (~(position > 16)) {
                if (~((value & mask) = 0)) {
                    do Memory.poke(8000 + position, 1);
                } else {
                    do Memory.poke(8000 + position, 0);
                }
            } else {
                let loop = false;
            }
        }
        return;
    }

    function int nextMask(int mask) {
        if (mask = 0) {
            return 1;
        } else {
            return mask * 2;
        }
    }

    function void fillMemory(int address, int length, int value) {
        while (length > 0) {
            do Memory.poke(address, value);
            let length = length - 1;
            let address = address + 1;
        }
        return;
    }
}
"#;

    let vm = compile_ok(source, "Main");
    let lines = vm_lines(&vm);

    assert!(lines.contains(&"function Main.convert 3"));
    assert!(lines.contains(&"function Main.nextMask 0"));
    assert!(lines.contains(&"function Main.fillMemory 0"));
    assert!(vm.contains("push constant 1\nneg\ncall Main.fillMemory 3\n"));
    assert!(vm.contains("push constant 0\nnot\npop local 2\n"));

    // Counters run across the whole class.
    for label in [
        "label WHILE_EXP0",
        "label WHILE_END0",
        "label WHILE_EXP1",
        "label WHILE_END1",
        "label IF_FALSE0",
        "label IF_FALSE1",
        "label IF_FALSE2",
        "label IF_END2",
    ] {
        assert_eq!(lines.iter().filter(|l| **l == label).count(), 1, "{}", label);
    }

    // Non-void function: no injected zero before its returns.
    let next_mask = vm
        .split("function ")
        .find(|f| f.starts_with("Main.nextMask"))
        .unwrap();
    assert!(!next_mask.contains("push constant 0\nreturn"));
}

#[test]
fn test_while_loop_structure() {
    let source = r#"
class Main {
    function void main() {
        var int i;
        while (i < 10) {
            let i = i + 1;
        }
        return;
    }
}
"#;

    let vm = compile_ok(source, "Main");
    let label_pos = vm.find("label WHILE_EXP0").unwrap();
    let if_goto_pos = vm.find("if-goto WHILE_END0").unwrap();
    let goto_pos = vm.find("goto WHILE_EXP0\n").unwrap();
    let end_pos = vm.find("label WHILE_END0").unwrap();

    assert!(label_pos < if_goto_pos);
    assert!(if_goto_pos < goto_pos);
    assert!(goto_pos < end_pos);
}

// =============================================================================
// Test 3: Square - OOP (constructors, methods, fields)
// =============================================================================

#[test]
fn test_square_constructor() {
    let vm = compile_ok(SQUARE, "Square");
    assert!(vm.starts_with(
        "function Square.new 0\n\
         push constant 3\n\
         call Memory.alloc 1\n\
         pop pointer 0\n\
         push argument 0\n\
         pop this 0\n\
         push argument 1\n\
         pop this 1\n\
         push argument 2\n\
         pop this 2\n\
         push pointer 0\n\
         call Square.draw 1\n\
         pop temp 0\n\
         push pointer 0\n\
         return\n"
    ));
}

#[test]
fn test_square_method_this_setup() {
    let vm = compile_ok(SQUARE, "Square");
    let method_count = vm.matches("push argument 0\npop pointer 0").count();
    assert_eq!(method_count, 3);
}

#[test]
fn test_square_draw_argument_count() {
    let vm = compile_ok(SQUARE, "Square");
    assert!(vm.contains("push constant 0\nnot\ncall Screen.setColor 1\n"));
    assert!(vm.contains("call Screen.drawRectangle 4\n"));
    assert!(vm.contains("push pointer 0\ncall Memory.deAlloc 1\n"));
}

#[test]
fn test_square_game_object_calls() {
    let vm = compile_ok(SQUARE_GAME, "SquareGame");

    // Field of class type: receiver pushed from `this`, call qualified by type.
    assert!(vm.contains("push this 0\ncall Square.dispose 1\n"));
    assert!(vm.contains("push this 0\ncall Square.incSize 1\n"));
    // Static of class type.
    assert!(vm.contains("call SquareGame.new 0\npop static 0\n"));
    assert!(vm.contains("push static 0\ncall SquareGame.moveSquare 1\n"));
    // Class-qualified calls carry no receiver.
    assert!(vm.contains("push constant 0\npush constant 0\npush constant 30\ncall Square.new 3\n"));
    assert!(vm.contains("call Sys.wait 1\n"));
    // Two fields allocated.
    assert!(vm.contains("push constant 2\ncall Memory.alloc 1\n"));
}

// =============================================================================
// Test 4: Average - Arrays and strings
// =============================================================================

#[test]
fn test_average() {
    let source = r#"
class Main {
    function void main() {
        var Array a;
        var int length;
        var int i, sum;

        let length = Keyboard.readInt("How many?");
        let a = Array.new(length);
        let i = 0;
        while (i < length) {
            let a[i] = Keyboard.readInt("Num");
            let sum = sum + a[i];
            let i = i + 1;
        }
        do Output.printInt(sum / length);
        return;
    }
}
"#;

    let vm = compile_ok(source, "Main");
    assert!(vm.starts_with("function Main.main 4\n"));
    assert!(vm.contains(
        "push constant 3\n\
         call String.new 1\n\
         push constant 78\n\
         call String.appendChar 2\n\
         push constant 117\n\
         call String.appendChar 2\n\
         push constant 109\n\
         call String.appendChar 2\n\
         call Keyboard.readInt 1\n"
    ));
    assert!(vm.contains("push local 1\ncall Array.new 1\npop local 0\n"));
    // Array write: address, value, then store through `that`.
    assert!(vm.contains(
        "push local 0\n\
         push local 2\n\
         add\n"
    ));
    assert!(vm.contains(
        "call Keyboard.readInt 1\n\
         pop temp 0\n\
         pop pointer 1\n\
         push temp 0\n\
         pop that 0\n"
    ));
    // Array read.
    assert!(vm.contains(
        "push local 3\n\
         push local 0\n\
         push local 2\n\
         add\n\
         pop pointer 1\n\
         push that 0\n\
         add\n\
         pop local 3\n"
    ));
    assert!(vm.contains("call Math.divide 2\n"));
}

#[test]
fn test_array_store_exact() {
    let source = r#"
class Main {
    function void set(int i) {
        var Array a;
        let a[i] = 5;
        return;
    }
}
"#;

    let vm = compile_ok(source, "Main");
    assert_eq!(
        vm_lines(&vm),
        [
            "function Main.set 1",
            "push local 0",
            "push argument 0",
            "add",
            "push constant 5",
            "pop temp 0",
            "pop pointer 1",
            "push temp 0",
            "pop that 0",
            "push constant 0",
            "return",
        ]
    );
}

// =============================================================================
// Test 5: ComplexArrays - Nested array access
// =============================================================================

#[test]
fn test_complex_arrays_nested_access() {
    let source = r#"
class Main {
    function void main() {
        var Array a, b;
        let a = Array.new(10);
        let b = Array.new(5);
        let a[b[a[3]]] = a[a[b[1]]];
        return;
    }
}
"#;

    let vm = compile_ok(source, "Main");
    // Five reads through `that` and one store.
    assert_eq!(vm.matches("pop pointer 1").count(), 6);
    assert_eq!(vm.matches("push that 0").count(), 5);
    assert_eq!(vm.matches("pop that 0").count(), 1);
    // The right-hand side is fully evaluated before the store sequence.
    let store = vm.find("pop temp 0\npop pointer 1\npush temp 0\npop that 0").unwrap();
    assert_eq!(vm[..store].matches("push that 0").count(), 5);
}

// =============================================================================
// Test 6: Multi-class programs from a directory
// =============================================================================

#[test]
fn test_compile_directory_sorted() {
    let dir = tempfile::tempdir().unwrap();
    write_program(
        dir.path(),
        &[
            ("SquareGame.jack", SQUARE_GAME),
            ("Main.jack", MAIN),
            ("Square.jack", SQUARE),
            ("notes.txt", "not jack"),
        ],
    );

    let results = compile_directory(dir.path(), CompileOptions::default());
    let names: Vec<_> = results.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, ["Main", "Square", "SquareGame"]);
    assert!(results.iter().all(|r| r.is_ok()));

    for result in &results {
        write_result(result, dir.path()).unwrap();
    }
    let main_vm = fs::read_to_string(dir.path().join("Main.vm")).unwrap();
    assert_eq!(
        main_vm,
        "function Main.main 0\ncall SquareGame.run 0\npop temp 0\npush constant 0\nreturn\n"
    );
    assert!(dir.path().join("Square.vm").exists());
    assert!(dir.path().join("SquareGame.vm").exists());
    assert!(!dir.path().join("notes.vm").exists());
}

#[test]
fn test_failed_unit_writes_no_output() {
    let dir = tempfile::tempdir().unwrap();
    write_program(
        dir.path(),
        &[
            ("Main.jack", MAIN),
            (
                "Broken.jack",
                "class Broken { function void f() { let z = 1; return; } }",
            ),
        ],
    );

    let results = compile_directory(dir.path(), CompileOptions::default());
    assert_eq!(results.len(), 2);
    for result in &results {
        if result.is_ok() {
            write_result(result, dir.path()).unwrap();
        } else {
            assert!(write_result(result, dir.path()).is_err());
        }
    }

    assert!(dir.path().join("Main.vm").exists());
    assert!(!dir.path().join("Broken.vm").exists());
}

#[test]
fn test_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert!(compile_directory(dir.path(), CompileOptions::default()).is_empty());
}

#[test]
fn test_compile_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = compile_file(&dir.path().join("Nope.jack"), CompileOptions::default());
    assert_eq!(result.filename, "Nope");
    assert_eq!(result.error.unwrap().category(), ErrorCategory::Io);
}

#[test]
fn test_compile_file_uses_stem() {
    let dir = tempfile::tempdir().unwrap();
    write_program(dir.path(), &[("Main.jack", MAIN)]);
    let result = compile_file(&dir.path().join("Main.jack"), CompileOptions::default());
    assert!(result.is_ok());
    assert_eq!(result.filename, "Main");
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_recompilation_is_byte_identical() {
    for (source, name) in [(SQUARE, "Square"), (SQUARE_GAME, "SquareGame"), (MAIN, "Main")] {
        assert_eq!(compile_ok(source, name), compile_ok(source, name));
    }
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_undefined_variable_error() {
    let err = compile_err(
        r#"
class Main {
    function void main() {
        let z = 1;
        return;
    }
}
"#,
    );
    assert_eq!(err.category(), ErrorCategory::Semantic);
    assert!(err.to_string().contains("Undefined variable 'z'"));
    assert_eq!(err.span().unwrap().line, 4);
}

#[test]
fn test_duplicate_variable_error() {
    let err = compile_err("class Main { function void f() { var int x; var int x; return; } }");
    assert!(matches!(err, CompileError::DuplicateDefinition { ref name, .. } if name == "x"));
    assert_eq!(err.category(), ErrorCategory::Semantic);
}

#[test]
fn test_lexical_error() {
    let err = compile_err("class Main { function void f() { let x = #; } }");
    assert_eq!(err.category(), ErrorCategory::Lexical);
}

#[test]
fn test_unterminated_string_error() {
    let err = compile_err("class Main { function void f() { do Output.printString(\"oops); } }");
    assert_eq!(err.category(), ErrorCategory::Lexical);
}

#[test]
fn test_syntax_error_reports_expected() {
    let err = compile_err("class Main { function void f() { let x 5; } }");
    match err {
        CompileError::Syntax { expected, .. } => assert_eq!(expected, ["="]),
        other => panic!("expected syntax error, got {:?}", other),
    }
}

#[test]
fn test_diagnostic_rendering() {
    let source = "class Main {\n  function void f() {\n    let q = 1;\n    return;\n  }\n}\n";
    let result = compile_source(source, "Main", CompileOptions::default());
    let err = result.error.as_ref().unwrap();
    let rendered = jackc::format_error(err, &result.source, "Main.jack");
    assert!(rendered.contains("--> Main.jack:3:9"));
    assert!(rendered.contains("let q = 1;"));
}

#[test]
fn test_comments_and_whitespace_ignored() {
    let source = r#"
// leading comment
class Main { /* block
   comment */
    function void main() { // trailing
        /** doc */ return;
    }
}
"#;
    let vm = compile_ok(source, "Main");
    assert_eq!(vm, "function Main.main 0\npush constant 0\nreturn\n");
}
