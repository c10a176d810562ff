//! Emitter tests: register mapping, section layout, control-flow lowering,
//! and the structural invariants of the generated assembly.

use tinytc::compile;

fn asm(source: &str) -> String {
  compile(source).expect("compile failed")
}

/// Collect every label definition in the output (lines ending in `:`).
fn labels(asm: &str) -> Vec<String> {
  asm
    .lines()
    .filter(|line| line.ends_with(':'))
    .map(|line| line.trim_end_matches(':').to_string())
    .collect()
}

#[test]
fn register_mapping() {
  let asm = asm("LOAD R1, 1\nLOAD R2, 2\nLOAD R3, 3\nLOAD R4, 4\nLOAD R5, 5\nLOAD R6, 6\nLOAD R7, 7\nLOAD R8, 8\n");
  for line in [
    "mov rax, 1",
    "mov rbx, 2",
    "mov rcx, 3",
    "mov rdx, 4",
    "mov rsi, 5",
    "mov rdi, 6",
    "mov r8, 7",
    "mov r9, 8",
  ] {
    assert!(asm.contains(line), "missing {line:?} in:\n{asm}");
  }
}

#[test]
fn initialized_variables_go_to_data() {
  let asm = asm("VAR x, 42\n");
  assert!(asm.contains("section .data"));
  assert!(asm.contains("    x dq 42"));
  assert!(!asm.contains("section .bss"));
}

#[test]
fn uninitialized_variables_go_to_bss() {
  let asm = asm("VAR y\n");
  assert!(asm.contains("section .bss"));
  assert!(asm.contains("    y resq 1"));
  assert!(!asm.contains("section .data"));
}

#[test]
fn identical_redeclaration_emits_one_definition() {
  let asm = asm("VAR x, 7\nVAR x, 7\n");
  assert_eq!(asm.matches("x dq 7").count(), 1);
}

#[test]
fn sections_appear_in_order() {
  let asm = asm("VAR a, 1\nVAR b\nLOAD R1, a\n");
  let data = asm.find("section .data").expect("missing .data");
  let bss = asm.find("section .bss").expect("missing .bss");
  let text = asm.find("section .text").expect("missing .text");
  assert!(data < bss && bss < text);
  assert!(asm.contains("    global _start"));
  assert!(asm.contains("_start:"));
}

#[test]
fn data_movement_forms() {
  let asm = asm("VAR x, 1\nLOAD R2, x\nLOAD R3, R2\nSET x, R3\nSET x, 7\nMOVE R4, R3\n");
  assert!(asm.contains("mov rbx, [x]"));
  assert!(asm.contains("mov rcx, rbx"));
  assert!(asm.contains("mov qword [x], rcx"));
  assert!(asm.contains("mov qword [x], 7"));
  assert!(asm.contains("mov rdx, rcx"));
}

#[test]
fn add_skips_move_when_dest_is_left() {
  let asm = asm("ADD R1, R1, R2\n");
  assert!(asm.contains("add rax, rbx"));
  assert!(!asm.contains("mov rax, rax"));
}

#[test]
fn sub_handles_dest_aliasing_right() {
  let asm = asm("SUB R1, R2, R1\n");
  assert!(asm.contains("neg rax"));
  assert!(asm.contains("add rax, rbx"));
}

#[test]
fn mul_uses_three_operand_form_for_immediates() {
  let asm = asm("MUL R2, R1, 10\n");
  assert!(asm.contains("imul rbx, rax, 10"));
}

#[test]
fn mul_handles_dest_aliasing_right() {
  let asm = asm("MUL R2, R1, R2\n");
  assert!(asm.contains("imul rbx, rax"));
  assert!(!asm.contains("mov rbx, rax"));
}

#[test]
fn div_saves_only_what_it_clobbers() {
  let asm = asm("DIV R3, R1, R2\n");
  let expected = [
    "push rdx",
    "push rax",
    "cqo",
    "idiv rbx",
    "mov rcx, rax",
    "pop rax",
    "pop rdx",
  ];
  let mut from = 0;
  for line in expected {
    let at = asm[from..]
      .find(line)
      .unwrap_or_else(|| panic!("missing {line:?} after offset {from} in:\n{asm}"));
    from += at + line.len();
  }
}

#[test]
fn div_into_rax_skips_the_rax_save() {
  let asm = asm("DIV R1, R1, R2\n");
  assert!(asm.contains("push rdx"));
  assert!(!asm.contains("push rax"));
  assert!(!asm.contains("mov rax, rax"));
}

#[test]
fn div_materializes_immediate_divisors() {
  let asm = asm("DIV R3, R1, 6\n");
  assert!(asm.contains("mov r10, 6"));
  assert!(asm.contains("idiv r10"));
}

#[test]
fn div_copies_a_divisor_living_in_rdx() {
  let asm = asm("DIV R2, R1, R4\n");
  assert!(asm.contains("mov r10, rdx"));
  assert!(asm.contains("idiv r10"));
}

#[test]
fn unary_and_not_and_shift() {
  let asm = asm("VAR x, 1\nINC R1\nDEC x\nNOT R2\nSHL R3, R4, 3\nSHR R5, R5, 1\n");
  assert!(asm.contains("inc rax"));
  assert!(asm.contains("dec qword [x]"));
  assert!(asm.contains("not rbx"));
  assert!(asm.contains("mov rcx, rdx"));
  assert!(asm.contains("shl rcx, 3"));
  assert!(asm.contains("shr rsi, 1"));
}

#[test]
fn wide_immediates_are_materialized() {
  let asm = asm("VAR x\nSET x, 4294967296\n");
  assert!(asm.contains("mov r10, 4294967296"));
  assert!(asm.contains("mov qword [x], r10"));
}

#[test]
fn if_without_else_still_emits_both_labels() {
  let asm = asm("IF R1 == 5\nNOP\nENDIF\n");
  assert!(asm.contains("mov r10, rax"));
  assert!(asm.contains("mov r11, 5"));
  assert!(asm.contains("cmp r10, r11"));
  assert!(asm.contains("jne else_0"));
  assert!(asm.contains("else_0:"));
  assert!(asm.contains("endif_0:"));
  assert!(!asm.contains("jmp endif_0"));
}

#[test]
fn if_with_else_jumps_over_the_else_arm() {
  let asm = asm("IF R1 != 0\nINC R2\nELSE\nDEC R2\nENDIF\n");
  assert!(asm.contains("je else_0"));
  assert!(asm.contains("jmp endif_0"));
  let else_at = asm.find("else_0:").expect("missing else label");
  assert!(asm[else_at..].contains("dec rbx"));
}

#[test]
fn condition_false_jumps_are_inverted_and_signed() {
  for (source, jump) in [
    ("IF R1 == 0\nENDIF\n", "jne else_0"),
    ("IF R1 != 0\nENDIF\n", "je else_0"),
    ("IF R1 > 0\nENDIF\n", "jle else_0"),
    ("IF R1 < 0\nENDIF\n", "jge else_0"),
    ("IF R1 >= 0\nENDIF\n", "jl else_0"),
    ("IF R1 <= 0\nENDIF\n", "jg else_0"),
  ] {
    let asm = asm(source);
    assert!(asm.contains(jump), "missing {jump:?} for {source:?}");
  }
}

#[test]
fn while_loop_shape() {
  let asm = asm("VAR i, 0\nWHILE i < 3\nINC i\nENDWHILE\n");
  let start = asm.find("while_start_0:").expect("missing start label");
  let end = asm.find("while_end_0:").expect("missing end label");
  assert!(start < end);
  assert!(asm.contains("jge while_end_0"));
  assert!(asm.contains("jmp while_start_0"));
}

#[test]
fn for_ascending_uses_strict_greater_exit_and_inc() {
  let asm = asm("FOR i FROM 1 TO 5\nNOP\nENDFOR\n");
  assert!(asm.contains("    i resq 1"), "counter must be implicitly declared");
  assert!(asm.contains("mov qword [i], 1"));
  assert!(asm.contains("mov r10, [i]"));
  assert!(asm.contains("mov r11, 5"));
  assert!(asm.contains("jg for_end_0"));
  assert!(asm.contains("inc qword [i]"));
  assert!(asm.contains("jmp for_start_0"));
}

#[test]
fn for_descending_uses_strict_less_exit_and_dec() {
  let asm = asm("FOR i FROM 5 TO 1 STEP -1\nNOP\nENDFOR\n");
  assert!(asm.contains("jl for_end_0"));
  assert!(asm.contains("dec qword [i]"));
}

#[test]
fn for_non_unit_step_uses_add() {
  let asm = asm("FOR i FROM 0 TO 100 STEP 10\nNOP\nENDFOR\n");
  assert!(asm.contains("add qword [i], 10"));
}

#[test]
fn for_does_not_redeclare_an_existing_counter() {
  let asm = asm("VAR i, 0\nFOR i FROM 1 TO 3\nNOP\nENDFOR\n");
  assert!(asm.contains("i dq 0"));
  assert!(!asm.contains("i resq 1"));
}

#[test]
fn loop_exits_when_counter_reaches_limit() {
  let asm = asm("VAR i, 0\nLOOP i, 5\nINC i\nENDLOOP\n");
  assert!(asm.contains("loop_start_0:"));
  assert!(asm.contains("mov r10, [i]"));
  assert!(asm.contains("mov r11, 5"));
  assert!(asm.contains("jge loop_end_0"));
  assert!(asm.contains("jmp loop_start_0"));
}

#[test]
fn repeat_jumps_back_while_condition_is_false() {
  let asm = asm("VAR x, 0\nREPEAT\nINC x\nUNTIL x >= 3\n");
  assert!(asm.contains("repeat_start_0:"));
  // `>=` is false on `jl`, which re-enters the body.
  assert!(asm.contains("jl repeat_start_0"));
  assert!(!asm.contains("repeat_end"));
}

#[test]
fn label_numbering_is_monotonic_in_encounter_order() {
  let asm = asm("IF R1 > 0\nWHILE R2 < 9\nNOP\nENDWHILE\nENDIF\nIF R3 == 0\nENDIF\n");
  assert!(asm.contains("else_0:"));
  assert!(asm.contains("while_start_1:"));
  assert!(asm.contains("else_2:"));
}

#[test]
fn every_emitted_label_is_unique() {
  let asm = asm(
    "VAR x, 0\nIF x > 0\nNOP\nELSE\nNOP\nENDIF\nWHILE x < 5\nINC x\nENDWHILE\nFOR i FROM 1 TO 3\nPRINT i\nENDFOR\nREPEAT\nINC x\nUNTIL x >= 9\nINPUT R1\nHALT\n",
  );
  let labels = labels(&asm);
  let mut seen = std::collections::HashSet::new();
  for label in &labels {
    assert!(seen.insert(label), "duplicate label {label:?} in:\n{asm}");
  }
}

#[test]
fn scratch_registers_stay_out_of_plain_code() {
  // No conditions, division, I/O, or wide immediates: the reserved
  // scratches must not appear at all.
  let asm = asm("LOAD R1, 5\nADD R2, R1, 3\nMOVE R3, R2\nPUSH R3\nPOP R4\nHALT\n");
  assert!(!asm.contains("r10"));
  assert!(!asm.contains("r11"));
  assert!(!asm.contains("r15"));
}

#[test]
fn functions_are_placed_after_the_exit_epilogue() {
  let asm = asm("FUNC double\nADD R1, R1, R1\nRET\nENDFUNC\nLOAD R1, 21\nCALL double\nHALT\n");
  let exit = asm.find("mov rax, 60").expect("missing exit");
  let func = asm.find("double:").expect("missing function label");
  assert!(func > exit, "function body must follow the epilogue:\n{asm}");
  assert!(asm.contains("call double"));
}

#[test]
fn function_bodies_get_a_trailing_ret() {
  let asm = asm("FUNC f\nINC R1\nENDFUNC\n");
  let func = asm.find("f:").expect("missing function label");
  assert!(asm[func..].contains("ret"));
}

#[test]
fn return_with_value_moves_into_rax() {
  let asm = asm("FUNC f\nRET R3\nENDFUNC\n");
  assert!(asm.contains("mov rax, rcx"));
  assert_eq!(asm.matches("    ret").count(), 1);
}

#[test]
fn print_loads_r15_and_emits_the_helper_once() {
  let asm = asm("VAR x, 1\nPRINT x\nPRINT R2\nPRINT 7\n");
  assert!(asm.contains("mov r15, [x]"));
  assert!(asm.contains("mov r15, rbx"));
  assert!(asm.contains("mov r15, 7"));
  assert_eq!(asm.matches("call print_int").count(), 3);
  assert_eq!(asm.matches("print_int:").count(), 1);
  assert!(asm.contains("newline db 10"));
  assert!(asm.contains("digit_buffer times 24 db 0"));
}

#[test]
fn input_stores_r15_into_the_target() {
  let asm = asm("VAR x\nINPUT R1\nINPUT x\n");
  assert!(asm.contains("call read_int"));
  assert!(asm.contains("mov rax, r15"));
  assert!(asm.contains("mov [x], r15"));
  assert!(asm.contains("read_int:"));
  assert!(asm.contains("input_buffer times 32 db 0"));
}

#[test]
fn helpers_are_emitted_only_when_used() {
  let asm = asm("LOAD R1, 5\nHALT\n");
  assert!(!asm.contains("print_int"));
  assert!(!asm.contains("read_int"));
  assert!(!asm.contains("section .data"));
}

#[test]
fn halt_and_final_epilogue_both_exit() {
  let asm = asm("HALT\n");
  assert_eq!(asm.matches("mov rax, 60").count(), 2);
  assert!(asm.contains("mov rdi, 0"));
  assert!(asm.contains("syscall"));
}

#[test]
fn io_helpers_preserve_user_registers() {
  let asm = asm("PRINT 1\nINPUT R1\n");
  for helper in ["print_int:", "read_int:"] {
    let at = asm.find(helper).expect("missing helper");
    let body = &asm[at..];
    for reg in ["rax", "rcx", "rdx", "rsi", "rdi"] {
      assert!(body.contains(&format!("push {reg}")), "{helper} must save {reg}");
      assert!(body.contains(&format!("pop {reg}")), "{helper} must restore {reg}");
    }
  }
}

#[test]
fn compilation_is_deterministic() {
  let source = "VAR x, 1\nFOR i FROM 1 TO 9\nADD R1, R1, R2\nIF R1 > 5\nPRINT R1\nENDIF\nENDFOR\nHALT\n";
  assert_eq!(asm(source), asm(source));
}
