//! Code generation: lower the parsed program into NASM x86-64 assembly.
//!
//! The emitter walks the statement tree once, appending to separate
//! `.data`, `.bss`, and `.text` buffers that are stitched together at the
//! end. Virtual registers map 1:1 onto fixed physical registers; `r10` and
//! `r11` are reserved for condition evaluation and immediate
//! materialization, `r15` carries I/O helper arguments, and `r12`..`r14`
//! never appear outside the helper subroutines. Function bodies are
//! deferred into their own buffer and placed after the exit epilogue so
//! straight-line execution cannot fall into them.

use crate::parser::{
  ArithOp, BitOp, Condition, Operand, Place, Program, Reg, RegImm, RelOp, ShiftOp, Stmt, UnaryOp,
};
use indexmap::IndexSet;

const SYS_READ: u32 = 0;
const SYS_WRITE: u32 = 1;
const SYS_EXIT: u32 = 60;
const STDIN: u32 = 0;
const STDOUT: u32 = 1;

// 19 digits, a sign, and slack for the backward-filling converter.
const DIGIT_BUFFER_SIZE: usize = 24;
const INPUT_BUFFER_SIZE: usize = 32;

/// Map a virtual register onto its fixed physical register.
fn phys(reg: Reg) -> &'static str {
  match reg.index() {
    1 => "rax",
    2 => "rbx",
    3 => "rcx",
    4 => "rdx",
    5 => "rsi",
    6 => "rdi",
    7 => "r8",
    8 => "r9",
    index => unreachable!("register index {index} out of range"),
  }
}

/// True when `value` survives NASM's sign-extended 32-bit immediate forms
/// (memory stores, `imul`, `add`). Wider values go through `r10`.
fn fits_imm32(value: i64) -> bool {
  i32::try_from(value).is_ok()
}

/// Emit NASM assembly for a program. Infallible: anything the language
/// cannot express was rejected by the scanner or parser, and unresolved
/// names are deliberately left to the assembler.
pub fn emit(program: &Program) -> String {
  let mut emitter = Emitter::new();
  for stmt in &program.stmts {
    emitter.emit_stmt(stmt);
  }
  emitter.emit_exit();
  emitter.finish()
}

struct Emitter {
  data: String,
  bss: String,
  text: String,
  funcs: String,
  label_seq: usize,
  vars: IndexSet<String>,
  in_func: bool,
  needs_print_int: bool,
  needs_read_int: bool,
}

impl Emitter {
  fn new() -> Self {
    Self {
      data: String::new(),
      bss: String::new(),
      text: String::new(),
      funcs: String::new(),
      label_seq: 0,
      vars: IndexSet::new(),
      in_func: false,
      needs_print_int: false,
      needs_read_int: false,
    }
  }

  /// The buffer statements are currently lowered into: the main program
  /// text, or the deferred function-body area.
  fn out(&mut self) -> &mut String {
    if self.in_func {
      &mut self.funcs
    } else {
      &mut self.text
    }
  }

  fn emit(&mut self, instruction: impl AsRef<str>) {
    let out = self.out();
    out.push_str("    ");
    out.push_str(instruction.as_ref());
    out.push('\n');
  }

  fn emit_label(&mut self, label: &str) {
    let out = self.out();
    out.push_str(label);
    out.push_str(":\n");
  }

  /// Claim the next label suffix. One per block construct, in statement
  /// encounter order, so repeated compiles number identically.
  fn next_label(&mut self) -> usize {
    let n = self.label_seq;
    self.label_seq += 1;
    n
  }

  /// Register a variable once; later declarations of the same name are
  /// no-ops (the parser has already rejected conflicting initializers).
  /// Insertion order is emission order, so `.data` and `.bss` read in
  /// declaration order.
  fn declare_var(&mut self, name: &str, init: Option<i64>) {
    if self.vars.contains(name) {
      return;
    }
    match init {
      Some(value) => self.data.push_str(&format!("    {name} dq {value}\n")),
      None => self.bss.push_str(&format!("    {name} resq 1\n")),
    }
    self.vars.insert(name.to_string());
  }

  // ----- Statements -----

  fn emit_stmt(&mut self, stmt: &Stmt) {
    match stmt {
      Stmt::VarDecl { name, init } => self.declare_var(name, *init),
      Stmt::Load { dest, src } => self.emit_load(*dest, src),
      Stmt::Set { dest, src } => self.emit_set(dest, *src),
      Stmt::Move { dest, src } => self.emit(format!("mov {}, {}", phys(*dest), phys(*src))),
      Stmt::Arith {
        op,
        dest,
        left,
        right,
      } => self.emit_arith(*op, *dest, *left, *right),
      Stmt::Unary { op, target } => self.emit_unary(*op, target),
      Stmt::Bitwise {
        op,
        dest,
        left,
        right,
      } => self.emit_bitwise(*op, *dest, *left, *right),
      Stmt::Not { reg } => self.emit(format!("not {}", phys(*reg))),
      Stmt::Shift {
        op,
        dest,
        src,
        count,
      } => self.emit_shift(*op, *dest, *src, *count),
      Stmt::If {
        cond,
        then_body,
        else_body,
      } => self.emit_if(cond, then_body, else_body.as_deref()),
      Stmt::While { cond, body } => self.emit_while(cond, body),
      Stmt::For {
        var,
        start,
        end,
        step,
        body,
      } => self.emit_for(var, *start, *end, *step, body),
      Stmt::Loop {
        counter,
        limit,
        body,
      } => self.emit_loop(counter, *limit, body),
      Stmt::Repeat { body, cond } => self.emit_repeat(body, cond),
      Stmt::FuncDef { name, body } => self.emit_func(name, body),
      Stmt::Call { name } => self.emit(format!("call {name}")),
      Stmt::Return { value } => {
        match value {
          Some(reg) if phys(*reg) != "rax" => self.emit(format!("mov rax, {}", phys(*reg))),
          _ => {}
        }
        self.emit("ret");
      }
      Stmt::Push { reg } => self.emit(format!("push {}", phys(*reg))),
      Stmt::Pop { reg } => self.emit(format!("pop {}", phys(*reg))),
      Stmt::Print { value } => self.emit_print(value),
      Stmt::Input { target } => self.emit_input(target),
      Stmt::Halt => self.emit_exit(),
      Stmt::Nop => self.emit("nop"),
    }
  }

  fn emit_load(&mut self, dest: Reg, src: &Operand) {
    let dest = phys(dest);
    match src {
      Operand::Imm(value) => self.emit(format!("mov {dest}, {value}")),
      Operand::Var(name) => self.emit(format!("mov {dest}, [{name}]")),
      Operand::Register(reg) => self.emit(format!("mov {dest}, {}", phys(*reg))),
    }
  }

  fn emit_set(&mut self, dest: &str, src: RegImm) {
    match src {
      RegImm::Register(reg) => self.emit(format!("mov qword [{dest}], {}", phys(reg))),
      RegImm::Imm(value) if fits_imm32(value) => {
        self.emit(format!("mov qword [{dest}], {value}"));
      }
      RegImm::Imm(value) => {
        self.emit(format!("mov r10, {value}"));
        self.emit(format!("mov qword [{dest}], r10"));
      }
    }
  }

  /// ADD/SUB and the two-operand `imul` destroy their destination, so the
  /// lowering has to watch for the right operand aliasing it.
  fn emit_arith(&mut self, op: ArithOp, dest: Reg, left: Reg, right: RegImm) {
    if op == ArithOp::Div {
      return self.emit_div(dest, left, right);
    }

    let mnemonic = match op {
      ArithOp::Add => "add",
      ArithOp::Sub => "sub",
      ArithOp::Mul => "imul",
      ArithOp::Div => unreachable!(),
    };
    let d = phys(dest);
    let l = phys(left);

    match right {
      RegImm::Register(right) => {
        let r = phys(right);
        if d == l {
          self.emit(format!("{mnemonic} {d}, {r}"));
        } else if d == r {
          match op {
            // add/imul/and-style operations commute.
            ArithOp::Add | ArithOp::Mul => self.emit(format!("{mnemonic} {d}, {l}")),
            // d = l - d without a scratch register.
            ArithOp::Sub => {
              self.emit(format!("neg {d}"));
              self.emit(format!("add {d}, {l}"));
            }
            ArithOp::Div => unreachable!(),
          }
        } else {
          self.emit(format!("mov {d}, {l}"));
          self.emit(format!("{mnemonic} {d}, {r}"));
        }
      }
      RegImm::Imm(value) => match op {
        ArithOp::Mul if fits_imm32(value) => {
          self.emit(format!("imul {d}, {l}, {value}"));
        }
        _ => {
          if d != l {
            self.emit(format!("mov {d}, {l}"));
          }
          if fits_imm32(value) {
            self.emit(format!("{mnemonic} {d}, {value}"));
          } else {
            self.emit(format!("mov r10, {value}"));
            self.emit(format!("{mnemonic} {d}, r10"));
          }
        }
      },
    }
  }

  /// Signed division through `rax`/`rdx`. Only the implicit registers the
  /// instruction clobbers and does not also hand back as the result are
  /// saved around it. An immediate divisor, or one living in `rax`/`rdx`,
  /// is moved to `r10` before those registers are overwritten.
  fn emit_div(&mut self, dest: Reg, left: Reg, right: RegImm) {
    let d = phys(dest);
    let l = phys(left);

    if d != "rdx" {
      self.emit("push rdx");
    }
    if d != "rax" {
      self.emit("push rax");
    }

    let divisor = match right {
      RegImm::Imm(value) => {
        self.emit(format!("mov r10, {value}"));
        "r10"
      }
      RegImm::Register(reg) => {
        let r = phys(reg);
        if r == "rax" || r == "rdx" {
          self.emit(format!("mov r10, {r}"));
          "r10"
        } else {
          r
        }
      }
    };

    if l != "rax" {
      self.emit(format!("mov rax, {l}"));
    }
    self.emit("cqo");
    self.emit(format!("idiv {divisor}"));
    if d != "rax" {
      self.emit(format!("mov {d}, rax"));
    }

    if d != "rax" {
      self.emit("pop rax");
    }
    if d != "rdx" {
      self.emit("pop rdx");
    }
  }

  fn emit_unary(&mut self, op: UnaryOp, target: &Place) {
    let mnemonic = match op {
      UnaryOp::Inc => "inc",
      UnaryOp::Dec => "dec",
    };
    match target {
      Place::Register(reg) => self.emit(format!("{mnemonic} {}", phys(*reg))),
      Place::Var(name) => self.emit(format!("{mnemonic} qword [{name}]")),
    }
  }

  fn emit_bitwise(&mut self, op: BitOp, dest: Reg, left: Reg, right: Reg) {
    let mnemonic = match op {
      BitOp::And => "and",
      BitOp::Or => "or",
      BitOp::Xor => "xor",
    };
    let d = phys(dest);
    let l = phys(left);
    let r = phys(right);

    if d == l {
      self.emit(format!("{mnemonic} {d}, {r}"));
    } else if d == r {
      // All three operations commute.
      self.emit(format!("{mnemonic} {d}, {l}"));
    } else {
      self.emit(format!("mov {d}, {l}"));
      self.emit(format!("{mnemonic} {d}, {r}"));
    }
  }

  fn emit_shift(&mut self, op: ShiftOp, dest: Reg, src: Reg, count: i64) {
    let mnemonic = match op {
      ShiftOp::Shl => "shl",
      ShiftOp::Shr => "shr",
    };
    let d = phys(dest);
    let s = phys(src);
    if d != s {
      self.emit(format!("mov {d}, {s}"));
    }
    self.emit(format!("{mnemonic} {d}, {count}"));
  }

  // ----- Control flow -----

  /// Lower a condition to a compare-and-jump that transfers control to
  /// `false_label` iff the condition is false. Signed comparisons
  /// throughout.
  fn emit_condition(&mut self, cond: &Condition, false_label: &str) {
    match &cond.left {
      Place::Register(reg) => self.emit(format!("mov r10, {}", phys(*reg))),
      Place::Var(name) => self.emit(format!("mov r10, [{name}]")),
    }
    match &cond.right {
      Operand::Register(reg) => self.emit(format!("mov r11, {}", phys(*reg))),
      Operand::Var(name) => self.emit(format!("mov r11, [{name}]")),
      Operand::Imm(value) => self.emit(format!("mov r11, {value}")),
    }
    self.emit("cmp r10, r11");
    let jump = match cond.op {
      RelOp::Eq => "jne",
      RelOp::Ne => "je",
      RelOp::Gt => "jle",
      RelOp::Lt => "jge",
      RelOp::Ge => "jl",
      RelOp::Le => "jg",
    };
    self.emit(format!("{jump} {false_label}"));
  }

  fn emit_if(&mut self, cond: &Condition, then_body: &[Stmt], else_body: Option<&[Stmt]>) {
    let n = self.next_label();
    let else_label = format!("else_{n}");
    let endif_label = format!("endif_{n}");

    self.emit_condition(cond, &else_label);
    for stmt in then_body {
      self.emit_stmt(stmt);
    }
    if else_body.is_some() {
      self.emit(format!("jmp {endif_label}"));
    }
    self.emit_label(&else_label);
    if let Some(else_body) = else_body {
      for stmt in else_body {
        self.emit_stmt(stmt);
      }
    }
    self.emit_label(&endif_label);
  }

  fn emit_while(&mut self, cond: &Condition, body: &[Stmt]) {
    let n = self.next_label();
    let start_label = format!("while_start_{n}");
    let end_label = format!("while_end_{n}");

    self.emit_label(&start_label);
    self.emit_condition(cond, &end_label);
    for stmt in body {
      self.emit_stmt(stmt);
    }
    self.emit(format!("jmp {start_label}"));
    self.emit_label(&end_label);
  }

  /// `FOR` runs its counter over `[start, end]`, both ends inclusive; the
  /// exit comparison is strict and its direction follows the step sign. An
  /// undeclared counter is implicitly declared in `.bss`.
  fn emit_for(&mut self, var: &str, start: i64, end: i64, step: i64, body: &[Stmt]) {
    let n = self.next_label();
    let start_label = format!("for_start_{n}");
    let end_label = format!("for_end_{n}");

    self.declare_var(var, None);

    if fits_imm32(start) {
      self.emit(format!("mov qword [{var}], {start}"));
    } else {
      self.emit(format!("mov r10, {start}"));
      self.emit(format!("mov qword [{var}], r10"));
    }

    self.emit_label(&start_label);
    self.emit(format!("mov r10, [{var}]"));
    self.emit(format!("mov r11, {end}"));
    self.emit("cmp r10, r11");
    if step > 0 {
      self.emit(format!("jg {end_label}"));
    } else {
      self.emit(format!("jl {end_label}"));
    }

    for stmt in body {
      self.emit_stmt(stmt);
    }

    match step {
      1 => self.emit(format!("inc qword [{var}]")),
      -1 => self.emit(format!("dec qword [{var}]")),
      step if fits_imm32(step) => self.emit(format!("add qword [{var}], {step}")),
      step => {
        self.emit(format!("mov r10, {step}"));
        self.emit(format!("add qword [{var}], r10"));
      }
    }
    self.emit(format!("jmp {start_label}"));
    self.emit_label(&end_label);
  }

  /// `LOOP` repeats while `counter < limit`; advancing the counter is the
  /// body's responsibility, and so is declaring it.
  fn emit_loop(&mut self, counter: &str, limit: i64, body: &[Stmt]) {
    let n = self.next_label();
    let start_label = format!("loop_start_{n}");
    let end_label = format!("loop_end_{n}");

    self.emit_label(&start_label);
    self.emit(format!("mov r10, [{counter}]"));
    self.emit(format!("mov r11, {limit}"));
    self.emit("cmp r10, r11");
    self.emit(format!("jge {end_label}"));

    for stmt in body {
      self.emit_stmt(stmt);
    }
    self.emit(format!("jmp {start_label}"));
    self.emit_label(&end_label);
  }

  /// `REPEAT`/`UNTIL`: the body runs at least once, and the condition's
  /// false branch points back to the start.
  fn emit_repeat(&mut self, body: &[Stmt], cond: &Condition) {
    let n = self.next_label();
    let start_label = format!("repeat_start_{n}");

    self.emit_label(&start_label);
    for stmt in body {
      self.emit_stmt(stmt);
    }
    self.emit_condition(cond, &start_label);
  }

  // ----- Functions -----

  fn emit_func(&mut self, name: &str, body: &[Stmt]) {
    self.in_func = true;
    self.funcs.push('\n');
    self.emit_label(name);
    for stmt in body {
      self.emit_stmt(stmt);
    }
    if !matches!(body.last(), Some(Stmt::Return { .. })) {
      self.emit("ret");
    }
    self.in_func = false;
  }

  // ----- I/O -----

  fn emit_print(&mut self, value: &Operand) {
    self.needs_print_int = true;
    match value {
      Operand::Imm(imm) => self.emit(format!("mov r15, {imm}")),
      Operand::Var(name) => self.emit(format!("mov r15, [{name}]")),
      Operand::Register(reg) => self.emit(format!("mov r15, {}", phys(*reg))),
    }
    self.emit("call print_int");
  }

  fn emit_input(&mut self, target: &Place) {
    self.needs_read_int = true;
    self.emit("call read_int");
    match target {
      Place::Register(reg) => self.emit(format!("mov {}, r15", phys(*reg))),
      Place::Var(name) => self.emit(format!("mov [{name}], r15")),
    }
  }

  /// Exit epilogue; emitted for `HALT` and once more after the last
  /// program statement.
  fn emit_exit(&mut self) {
    self.emit(format!("mov rax, {SYS_EXIT}"));
    self.emit("mov rdi, 0");
    self.emit("syscall");
  }

  // ----- Final assembly -----

  fn finish(self) -> String {
    let mut out = String::new();

    let has_data = !self.data.is_empty() || self.needs_print_int || self.needs_read_int;
    if has_data {
      out.push_str("section .data\n");
      out.push_str(&self.data);
      if self.needs_print_int {
        out.push_str("    newline db 10\n");
        out.push_str(&format!("    digit_buffer times {DIGIT_BUFFER_SIZE} db 0\n"));
      }
      if self.needs_read_int {
        out.push_str(&format!("    input_buffer times {INPUT_BUFFER_SIZE} db 0\n"));
      }
      out.push('\n');
    }

    if !self.bss.is_empty() {
      out.push_str("section .bss\n");
      out.push_str(&self.bss);
      out.push('\n');
    }

    out.push_str("section .text\n");
    out.push_str("    global _start\n");
    out.push('\n');
    out.push_str("_start:\n");
    out.push_str(&self.text);
    out.push_str(&self.funcs);

    if self.needs_print_int {
      out.push('\n');
      push_print_int(&mut out);
    }
    if self.needs_read_int {
      out.push('\n');
      push_read_int(&mut out);
    }

    out
  }
}

/// `print_int`: write the signed decimal form of `r15` and a trailing
/// newline to stdout. Digits are produced backwards into `digit_buffer`
/// by repeated division; the value is negated into its magnitude first and
/// divided unsigned, which keeps `i64::MIN` correct. Every user-visible
/// register the routine or the syscalls touch is saved around the work;
/// `r10`..`r14` are helper-internal temporaries.
fn push_print_int(out: &mut String) {
  out.push_str(&format!(
    "\
print_int:
    push rax
    push rcx
    push rdx
    push rsi
    push rdi
    mov r10, r15
    mov r11, 10
    lea r12, [digit_buffer + {buffer_end}]
    xor r13, r13
    test r10, r10
    jns .convert
    neg r10
    mov r13, 1
.convert:
    mov rax, r10
    xor rdx, rdx
    div r11
    mov r10, rax
    add dl, '0'
    mov [r12], dl
    dec r12
    test r10, r10
    jnz .convert
    test r13, r13
    jz .write
    mov byte [r12], '-'
    dec r12
.write:
    inc r12
    mov rdx, digit_buffer + {buffer_size}
    sub rdx, r12
    mov rsi, r12
    mov rax, {sys_write}
    mov rdi, {stdout}
    syscall
    mov rax, {sys_write}
    mov rdi, {stdout}
    lea rsi, [newline]
    mov rdx, 1
    syscall
    pop rdi
    pop rsi
    pop rdx
    pop rcx
    pop rax
    ret
",
    buffer_end = DIGIT_BUFFER_SIZE - 1,
    buffer_size = DIGIT_BUFFER_SIZE,
    sys_write = SYS_WRITE,
    stdout = STDOUT,
  ));
}

/// `read_int`: read a line from stdin into `input_buffer` and parse an
/// optionally-signed decimal integer into `r15`. Parsing stops at the
/// first non-digit; the same register-preservation discipline as
/// `print_int` applies.
fn push_read_int(out: &mut String) {
  out.push_str(&format!(
    "\
read_int:
    push rax
    push rcx
    push rdx
    push rsi
    push rdi
    mov rax, {sys_read}
    mov rdi, {stdin}
    lea rsi, [input_buffer]
    mov rdx, {buffer_size}
    syscall
    lea r12, [input_buffer]
    xor r10, r10
    xor r13, r13
    mov r11, 10
    movzx r14, byte [r12]
    cmp r14b, '-'
    jne .digits
    mov r13, 1
    inc r12
.digits:
    movzx r14, byte [r12]
    cmp r14b, '0'
    jb .done
    cmp r14b, '9'
    ja .done
    sub r14b, '0'
    imul r10, r11
    add r10, r14
    inc r12
    jmp .digits
.done:
    mov r15, r10
    test r13, r13
    jz .restore
    neg r15
.restore:
    pop rdi
    pop rsi
    pop rdx
    pop rcx
    pop rax
    ret
",
    sys_read = SYS_READ,
    stdin = STDIN,
    buffer_size = INPUT_BUFFER_SIZE,
  ));
}
