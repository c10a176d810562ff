//! End-to-end pipeline scenarios: whole programs through
//! `compile`, checked against the shape of the assembly they must produce
//! and against the error positions they must report.

use tinytc::error::CompileError;
use tinytc::compile;

#[test]
fn print_a_variable() {
  let asm = compile("VAR x, 42\nPRINT x\nHALT\n").expect("compile failed");
  assert!(asm.contains("x dq 42"));
  assert!(asm.contains("mov r15, [x]"));
  assert!(asm.contains("call print_int"));
  assert!(asm.contains("print_int:"));
  // Exit for HALT plus the final epilogue.
  assert_eq!(asm.matches("mov rax, 60").count(), 2);
}

#[test]
fn sum_one_to_n_with_a_while_loop() {
  let source = "VAR n, 100\nVAR sum, 0\nVAR i, 1\nWHILE i <= n\nLOAD R1, sum\nLOAD R2, i\nADD R3, R1, R2\nSET sum, R3\nINC i\nENDWHILE\nPRINT sum\nHALT\n";
  let asm = compile(source).expect("compile failed");
  assert!(asm.contains("n dq 100"));
  assert!(asm.contains("sum dq 0"));
  assert!(asm.contains("while_start_0:"));
  // `<=` fails on `jg`.
  assert!(asm.contains("jg while_end_0"));
  assert!(asm.contains("mov rcx, rax"));
  assert!(asm.contains("add rcx, rbx"));
  assert!(asm.contains("mov qword [sum], rcx"));
  assert!(asm.contains("inc qword [i]"));
  assert!(asm.contains("jmp while_start_0"));
}

#[test]
fn ascending_for_loop() {
  let asm = compile("FOR i FROM 1 TO 5\nPRINT i\nENDFOR\nHALT\n").expect("compile failed");
  assert!(asm.contains("i resq 1"));
  assert!(asm.contains("mov qword [i], 1"));
  assert!(asm.contains("jg for_end_0"));
  assert!(asm.contains("inc qword [i]"));
  assert!(asm.contains("mov r15, [i]"));
}

#[test]
fn descending_for_loop() {
  let asm =
    compile("FOR i FROM 5 TO 1 STEP -1\nPRINT i\nENDFOR\nHALT\n").expect("compile failed");
  assert!(asm.contains("mov qword [i], 5"));
  assert!(asm.contains("mov r11, 1"));
  assert!(asm.contains("jl for_end_0"));
  assert!(asm.contains("dec qword [i]"));
}

#[test]
fn repeat_runs_before_testing() {
  let asm =
    compile("VAR x, 0\nREPEAT\nINC x\nPRINT x\nUNTIL x >= 3\nHALT\n").expect("compile failed");
  let start = asm.find("repeat_start_0:").expect("missing repeat label");
  let body = asm[start..].find("inc qword [x]").expect("missing body");
  let test = asm[start..].find("jl repeat_start_0").expect("missing back edge");
  assert!(body < test, "body must precede the exit test:\n{asm}");
}

#[test]
fn integer_division() {
  let asm =
    compile("LOAD R1, 20\nLOAD R2, 6\nDIV R3, R1, R2\nPRINT R3\nHALT\n").expect("compile failed");
  assert!(asm.contains("cqo"));
  assert!(asm.contains("idiv rbx"));
  assert!(asm.contains("mov rcx, rax"));
  assert!(asm.contains("mov r15, rcx"));
}

#[test]
fn compile_is_deterministic_across_runs() {
  let source = "VAR total, 0\nFOR i FROM 1 TO 10\nLOAD R1, total\nLOAD R2, i\nADD R1, R1, R2\nSET total, R1\nENDFOR\nPRINT total\nHALT\n";
  let first = compile(source).expect("compile failed");
  let second = compile(source).expect("compile failed");
  assert_eq!(first, second);
}

#[test]
fn lexical_errors_carry_positions() {
  let err = compile("VAR 1bad\n").expect_err("expected an error");
  assert!(matches!(err, CompileError::Lexical { .. }));
  assert_eq!((err.line(), err.column()), (1, 5));
  assert!(err.to_string().starts_with("lexical error at 1:5"));
}

#[test]
fn unclosed_block_is_a_syntax_error_at_eof() {
  let err = compile("IF R1 > 10\nPRINT R1").expect_err("expected an error");
  assert!(matches!(err, CompileError::Syntax { .. }));
  assert!(err.line() >= 1 && err.column() >= 1);
}

#[test]
fn r9_is_not_a_register() {
  let err = compile("LOAD R9, 1\n").expect_err("expected an error");
  assert!(matches!(err, CompileError::Syntax { .. }));
  assert_eq!((err.line(), err.column()), (1, 6));
  assert!(err.message().contains("expected register"));
}

#[test]
fn empty_if_is_legal_and_produces_only_labels() {
  let asm = compile("IF R1 > 10\nENDIF\nHALT\n").expect("compile failed");
  assert!(asm.contains("else_0:"));
  assert!(asm.contains("endif_0:"));
}

#[test]
fn functions_and_stack_round_trip() {
  let source = "VAR x, 5\nFUNC add_ten\nPUSH R2\nLOAD R2, 10\nADD R1, R1, R2\nPOP R2\nRET R1\nENDFUNC\nLOAD R1, x\nCALL add_ten\nPRINT R1\nHALT\n";
  let asm = compile(source).expect("compile failed");
  assert!(asm.contains("add_ten:"));
  assert!(asm.contains("push rbx"));
  assert!(asm.contains("pop rbx"));
  assert!(asm.contains("call add_ten"));
  // The function body must sit past the program's exit.
  let exit = asm.find("mov rax, 60").expect("missing exit");
  let func = asm.find("add_ten:").expect("missing function");
  assert!(func > exit);
}
