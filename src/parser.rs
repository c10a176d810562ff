//! Recursive-descent parser producing the TC statement tree.
//!
//! Single-token lookahead, no backtracking: every statement is dispatched
//! on its leading keyword, and block constructs read their bodies with a
//! shared `parse_body` helper that stops at the caller's terminator set.
//! The statement, operand, and condition models live here too; they have
//! no behavior of their own and are only ever produced by this module.

use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind};
use std::collections::HashMap;

/// Virtual register index, 1..=8. The scanner guarantees the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reg(pub u8);

impl Reg {
  pub fn index(self) -> u8 {
    self.0
  }
}

/// Anything an instruction can read: a register, a named variable, or an
/// immediate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
  Register(Reg),
  Var(String),
  Imm(i64),
}

/// A readable and writable location: a register or a named variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Place {
  Register(Reg),
  Var(String),
}

/// Register-or-immediate, for the instruction sites that exclude memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegImm {
  Register(Reg),
  Imm(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
  Eq,
  Ne,
  Gt,
  Lt,
  Ge,
  Le,
}

/// `left <op> right`. The left side is never an immediate; the parser
/// rejects that form before it reaches the emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
  pub left: Place,
  pub op: RelOp,
  pub right: Operand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
  Add,
  Sub,
  Mul,
  Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Inc,
  Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
  And,
  Or,
  Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
  Shl,
  Shr,
}

/// The closed set of TC statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
  VarDecl {
    name: String,
    init: Option<i64>,
  },
  Load {
    dest: Reg,
    src: Operand,
  },
  Set {
    dest: String,
    src: RegImm,
  },
  Move {
    dest: Reg,
    src: Reg,
  },
  Arith {
    op: ArithOp,
    dest: Reg,
    left: Reg,
    right: RegImm,
  },
  Unary {
    op: UnaryOp,
    target: Place,
  },
  Bitwise {
    op: BitOp,
    dest: Reg,
    left: Reg,
    right: Reg,
  },
  Not {
    reg: Reg,
  },
  Shift {
    op: ShiftOp,
    dest: Reg,
    src: Reg,
    count: i64,
  },
  If {
    cond: Condition,
    then_body: Vec<Stmt>,
    else_body: Option<Vec<Stmt>>,
  },
  While {
    cond: Condition,
    body: Vec<Stmt>,
  },
  For {
    var: String,
    start: i64,
    end: i64,
    step: i64,
    body: Vec<Stmt>,
  },
  Loop {
    counter: String,
    limit: i64,
    body: Vec<Stmt>,
  },
  Repeat {
    body: Vec<Stmt>,
    cond: Condition,
  },
  FuncDef {
    name: String,
    body: Vec<Stmt>,
  },
  Call {
    name: String,
  },
  Return {
    value: Option<Reg>,
  },
  Push {
    reg: Reg,
  },
  Pop {
    reg: Reg,
  },
  Print {
    value: Operand,
  },
  Input {
    target: Place,
  },
  Halt,
  Nop,
}

/// Ordered statement sequence for a whole translation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
  pub stmts: Vec<Stmt>,
}

/// Parse a token sequence into a program.
///
/// Statements end at a newline, at end of input, or at the enclosing
/// block's terminator keyword; runs of blank lines between statements are
/// skipped here (the scanner emits every `Newline` it sees).
pub fn parse(tokens: Vec<Token>) -> CompileResult<Program> {
  let mut stream = TokenStream::new(tokens);
  let mut ctx = ParserContext::new();
  let mut stmts = Vec::new();

  loop {
    stream.skip_newlines();
    if stream.at(&TokenKind::Eof) {
      break;
    }
    stmts.push(parse_stmt(&mut stream, &mut ctx)?);
    expect_stmt_end(&stream, &[])?;
  }

  Ok(Program { stmts })
}

// ----- Statement parsing -----

fn parse_stmt(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Stmt> {
  let token = stream.current().clone();
  match token.kind {
    TokenKind::Var => parse_var_decl(stream, ctx),
    TokenKind::Load => parse_load(stream),
    TokenKind::Set => parse_set(stream),
    TokenKind::Move => parse_move(stream),
    TokenKind::Add | TokenKind::Sub | TokenKind::Mul | TokenKind::Div => parse_arith(stream),
    TokenKind::Inc | TokenKind::Dec => parse_unary(stream),
    TokenKind::And | TokenKind::Or | TokenKind::Xor => parse_bitwise(stream),
    TokenKind::Not => parse_not(stream),
    TokenKind::Shl | TokenKind::Shr => parse_shift(stream),
    TokenKind::If => parse_if(stream, ctx),
    TokenKind::While => parse_while(stream, ctx),
    TokenKind::For => parse_for(stream, ctx),
    TokenKind::Loop => parse_loop(stream, ctx),
    TokenKind::Repeat => parse_repeat(stream, ctx),
    TokenKind::Func => parse_func(stream, ctx),
    TokenKind::Call => parse_call(stream),
    TokenKind::Ret => parse_return(stream),
    TokenKind::Push => {
      stream.advance();
      let reg = stream.expect_register()?;
      Ok(Stmt::Push { reg })
    }
    TokenKind::Pop => {
      stream.advance();
      let reg = stream.expect_register()?;
      Ok(Stmt::Pop { reg })
    }
    TokenKind::Print => {
      stream.advance();
      let value = parse_operand(stream)?;
      Ok(Stmt::Print { value })
    }
    TokenKind::Input => {
      stream.advance();
      let target = parse_place(stream)?;
      Ok(Stmt::Input { target })
    }
    TokenKind::Halt => {
      stream.advance();
      Ok(Stmt::Halt)
    }
    TokenKind::Nop => {
      stream.advance();
      Ok(Stmt::Nop)
    }
    _ => Err(CompileError::syntax(
      token.line,
      token.column,
      format!("unexpected {} at start of statement", describe(&token.kind)),
    )),
  }
}

fn parse_var_decl(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Stmt> {
  stream.expect(&TokenKind::Var)?;
  let (name, line, column) = stream.expect_ident()?;
  let init = if stream.eat(&TokenKind::Comma) {
    Some(stream.expect_number()?.0)
  } else {
    None
  };
  ctx.declare_var(&name, init, line, column)?;
  Ok(Stmt::VarDecl { name, init })
}

fn parse_load(stream: &mut TokenStream) -> CompileResult<Stmt> {
  stream.expect(&TokenKind::Load)?;
  let dest = stream.expect_register()?;
  stream.expect(&TokenKind::Comma)?;
  let src = parse_operand(stream)?;
  Ok(Stmt::Load { dest, src })
}

fn parse_set(stream: &mut TokenStream) -> CompileResult<Stmt> {
  stream.expect(&TokenKind::Set)?;
  let (dest, _, _) = stream.expect_ident()?;
  stream.expect(&TokenKind::Comma)?;
  let src = parse_reg_imm(stream)?;
  Ok(Stmt::Set { dest, src })
}

fn parse_move(stream: &mut TokenStream) -> CompileResult<Stmt> {
  stream.expect(&TokenKind::Move)?;
  let dest = stream.expect_register()?;
  stream.expect(&TokenKind::Comma)?;
  let src = stream.expect_register()?;
  Ok(Stmt::Move { dest, src })
}

fn parse_arith(stream: &mut TokenStream) -> CompileResult<Stmt> {
  let op = match stream.current().kind {
    TokenKind::Add => ArithOp::Add,
    TokenKind::Sub => ArithOp::Sub,
    TokenKind::Mul => ArithOp::Mul,
    _ => ArithOp::Div,
  };
  stream.advance();
  let dest = stream.expect_register()?;
  stream.expect(&TokenKind::Comma)?;
  let left = stream.expect_register()?;
  stream.expect(&TokenKind::Comma)?;
  let right = parse_reg_imm(stream)?;
  Ok(Stmt::Arith {
    op,
    dest,
    left,
    right,
  })
}

fn parse_unary(stream: &mut TokenStream) -> CompileResult<Stmt> {
  let op = match stream.current().kind {
    TokenKind::Inc => UnaryOp::Inc,
    _ => UnaryOp::Dec,
  };
  stream.advance();
  let target = parse_place(stream)?;
  Ok(Stmt::Unary { op, target })
}

fn parse_bitwise(stream: &mut TokenStream) -> CompileResult<Stmt> {
  let op = match stream.current().kind {
    TokenKind::And => BitOp::And,
    TokenKind::Or => BitOp::Or,
    _ => BitOp::Xor,
  };
  stream.advance();
  let dest = stream.expect_register()?;
  stream.expect(&TokenKind::Comma)?;
  let left = stream.expect_register()?;
  stream.expect(&TokenKind::Comma)?;
  let right = stream.expect_register()?;
  Ok(Stmt::Bitwise {
    op,
    dest,
    left,
    right,
  })
}

fn parse_not(stream: &mut TokenStream) -> CompileResult<Stmt> {
  stream.expect(&TokenKind::Not)?;
  let reg = stream.expect_register()?;
  Ok(Stmt::Not { reg })
}

fn parse_shift(stream: &mut TokenStream) -> CompileResult<Stmt> {
  let op = match stream.current().kind {
    TokenKind::Shl => ShiftOp::Shl,
    _ => ShiftOp::Shr,
  };
  stream.advance();
  let dest = stream.expect_register()?;
  stream.expect(&TokenKind::Comma)?;
  let src = stream.expect_register()?;
  stream.expect(&TokenKind::Comma)?;
  let (count, line, column) = stream.expect_number()?;
  if !(0..=63).contains(&count) {
    return Err(CompileError::syntax(
      line,
      column,
      format!("shift count must be in 0..63, got {count}"),
    ));
  }
  Ok(Stmt::Shift {
    op,
    dest,
    src,
    count,
  })
}

fn parse_if(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Stmt> {
  stream.expect(&TokenKind::If)?;
  let cond = parse_condition(stream)?;
  require_newline(stream)?;
  let then_body = parse_body(stream, ctx, &[TokenKind::Else, TokenKind::EndIf])?;
  let else_body = if stream.eat(&TokenKind::Else) {
    require_newline(stream)?;
    Some(parse_body(stream, ctx, &[TokenKind::EndIf])?)
  } else {
    None
  };
  stream.expect(&TokenKind::EndIf)?;
  Ok(Stmt::If {
    cond,
    then_body,
    else_body,
  })
}

fn parse_while(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Stmt> {
  stream.expect(&TokenKind::While)?;
  let cond = parse_condition(stream)?;
  require_newline(stream)?;
  let body = parse_body(stream, ctx, &[TokenKind::EndWhile])?;
  stream.expect(&TokenKind::EndWhile)?;
  Ok(Stmt::While { cond, body })
}

fn parse_for(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Stmt> {
  stream.expect(&TokenKind::For)?;
  let (var, _, _) = stream.expect_ident()?;
  stream.expect(&TokenKind::From)?;
  let (start, _, _) = stream.expect_number()?;
  stream.expect(&TokenKind::To)?;
  let (end, _, _) = stream.expect_number()?;
  let step = if stream.eat(&TokenKind::Step) {
    let (step, line, column) = stream.expect_number()?;
    if step == 0 {
      return Err(CompileError::syntax(line, column, "FOR step must not be zero"));
    }
    step
  } else {
    1
  };
  require_newline(stream)?;
  let body = parse_body(stream, ctx, &[TokenKind::EndFor])?;
  stream.expect(&TokenKind::EndFor)?;
  Ok(Stmt::For {
    var,
    start,
    end,
    step,
    body,
  })
}

fn parse_loop(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Stmt> {
  stream.expect(&TokenKind::Loop)?;
  let (counter, _, _) = stream.expect_ident()?;
  stream.expect(&TokenKind::Comma)?;
  let (limit, _, _) = stream.expect_number()?;
  require_newline(stream)?;
  let body = parse_body(stream, ctx, &[TokenKind::EndLoop])?;
  stream.expect(&TokenKind::EndLoop)?;
  Ok(Stmt::Loop {
    counter,
    limit,
    body,
  })
}

fn parse_repeat(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Stmt> {
  stream.expect(&TokenKind::Repeat)?;
  require_newline(stream)?;
  let body = parse_body(stream, ctx, &[TokenKind::Until])?;
  stream.expect(&TokenKind::Until)?;
  let cond = parse_condition(stream)?;
  Ok(Stmt::Repeat { body, cond })
}

fn parse_func(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Stmt> {
  let token = stream.expect(&TokenKind::Func)?;
  if ctx.in_function {
    return Err(CompileError::syntax(
      token.line,
      token.column,
      "function definitions cannot nest",
    ));
  }
  let (name, _, _) = stream.expect_ident()?;
  require_newline(stream)?;
  ctx.in_function = true;
  let body = parse_body(stream, ctx, &[TokenKind::EndFunc]);
  ctx.in_function = false;
  let body = body?;
  stream.expect(&TokenKind::EndFunc)?;
  Ok(Stmt::FuncDef { name, body })
}

fn parse_call(stream: &mut TokenStream) -> CompileResult<Stmt> {
  stream.expect(&TokenKind::Call)?;
  let (name, _, _) = stream.expect_ident()?;
  Ok(Stmt::Call { name })
}

fn parse_return(stream: &mut TokenStream) -> CompileResult<Stmt> {
  stream.expect(&TokenKind::Ret)?;
  let value = if matches!(stream.current().kind, TokenKind::Register(_)) {
    Some(stream.expect_register()?)
  } else {
    None
  };
  Ok(Stmt::Return { value })
}

/// Read statements until the current token is one of `until`, which is left
/// unconsumed for the caller. Reaching end of input first means the block
/// was never closed.
fn parse_body(
  stream: &mut TokenStream,
  ctx: &mut ParserContext,
  until: &[TokenKind],
) -> CompileResult<Vec<Stmt>> {
  let mut body = Vec::new();
  loop {
    stream.skip_newlines();
    if until.iter().any(|kind| stream.at(kind)) {
      return Ok(body);
    }
    if stream.at(&TokenKind::Eof) {
      let token = stream.current();
      return Err(CompileError::syntax(
        token.line,
        token.column,
        format!("unexpected end of input: expected {}", describe_set(until)),
      ));
    }
    body.push(parse_stmt(stream, ctx)?);
    expect_stmt_end(stream, until)?;
  }
}

// ----- Operand parsing -----

fn parse_operand(stream: &mut TokenStream) -> CompileResult<Operand> {
  let token = stream.current().clone();
  match token.kind {
    TokenKind::Register(index) => {
      stream.advance();
      Ok(Operand::Register(Reg(index)))
    }
    TokenKind::Ident(_) => {
      let (name, _, _) = stream.expect_ident()?;
      Ok(Operand::Var(name))
    }
    TokenKind::Number(value) => {
      stream.advance();
      Ok(Operand::Imm(value))
    }
    _ => Err(CompileError::syntax(
      token.line,
      token.column,
      format!(
        "expected register, identifier, or number, but got {}",
        describe(&token.kind)
      ),
    )),
  }
}

fn parse_place(stream: &mut TokenStream) -> CompileResult<Place> {
  let token = stream.current().clone();
  match token.kind {
    TokenKind::Register(index) => {
      stream.advance();
      Ok(Place::Register(Reg(index)))
    }
    TokenKind::Ident(_) => {
      let (name, _, _) = stream.expect_ident()?;
      Ok(Place::Var(name))
    }
    _ => Err(CompileError::syntax(
      token.line,
      token.column,
      format!(
        "expected register or identifier, but got {}",
        describe(&token.kind)
      ),
    )),
  }
}

fn parse_reg_imm(stream: &mut TokenStream) -> CompileResult<RegImm> {
  let token = stream.current().clone();
  match token.kind {
    TokenKind::Register(index) => {
      stream.advance();
      Ok(RegImm::Register(Reg(index)))
    }
    TokenKind::Number(value) => {
      stream.advance();
      Ok(RegImm::Imm(value))
    }
    _ => Err(CompileError::syntax(
      token.line,
      token.column,
      format!(
        "expected register or number, but got {}",
        describe(&token.kind)
      ),
    )),
  }
}

fn parse_condition(stream: &mut TokenStream) -> CompileResult<Condition> {
  let token = stream.current().clone();
  let left = match token.kind {
    TokenKind::Register(index) => {
      stream.advance();
      Place::Register(Reg(index))
    }
    TokenKind::Ident(_) => {
      let (name, _, _) = stream.expect_ident()?;
      Place::Var(name)
    }
    TokenKind::Number(_) => {
      return Err(CompileError::syntax(
        token.line,
        token.column,
        "condition left operand must be a register or identifier",
      ));
    }
    _ => {
      return Err(CompileError::syntax(
        token.line,
        token.column,
        format!(
          "expected register or identifier, but got {}",
          describe(&token.kind)
        ),
      ));
    }
  };

  let op_token = stream.current().clone();
  let op = match op_token.kind {
    TokenKind::Eq => RelOp::Eq,
    TokenKind::Neq => RelOp::Ne,
    TokenKind::Gt => RelOp::Gt,
    TokenKind::Lt => RelOp::Lt,
    TokenKind::Gte => RelOp::Ge,
    TokenKind::Lte => RelOp::Le,
    _ => {
      return Err(CompileError::syntax(
        op_token.line,
        op_token.column,
        format!(
          "expected relational operator, but got {}",
          describe(&op_token.kind)
        ),
      ));
    }
  };
  stream.advance();

  let right = parse_operand(stream)?;
  Ok(Condition { left, op, right })
}

// ----- Statement boundaries -----

fn expect_stmt_end(stream: &TokenStream, until: &[TokenKind]) -> CompileResult<()> {
  let token = stream.current();
  if matches!(token.kind, TokenKind::Newline | TokenKind::Eof)
    || until.iter().any(|kind| &token.kind == kind)
  {
    Ok(())
  } else {
    Err(CompileError::syntax(
      token.line,
      token.column,
      format!("expected end of statement, but got {}", describe(&token.kind)),
    ))
  }
}

fn require_newline(stream: &TokenStream) -> CompileResult<()> {
  let token = stream.current();
  match token.kind {
    TokenKind::Newline | TokenKind::Eof => Ok(()),
    _ => Err(CompileError::syntax(
      token.line,
      token.column,
      format!("expected newline, but got {}", describe(&token.kind)),
    )),
  }
}

// ----- Identifier hygiene -----

/// Assembly-side symbols a source identifier must never shadow.
const HELPER_SYMBOLS: [&str; 5] = [
  "print_int",
  "read_int",
  "digit_buffer",
  "input_buffer",
  "newline",
];

const LABEL_PREFIXES: [&str; 10] = [
  "if_",
  "else_",
  "endif_",
  "while_start_",
  "while_end_",
  "for_start_",
  "for_end_",
  "repeat_start_",
  "loop_start_",
  "loop_end_",
];

const PHYSICAL_REGISTERS: [&str; 16] = [
  "rax", "rbx", "rcx", "rdx", "rsi", "rdi", "rbp", "rsp", "r8", "r9", "r10", "r11", "r12", "r13",
  "r14", "r15",
];

fn validate_ident(name: &str, line: usize, column: usize) -> CompileResult<()> {
  if HELPER_SYMBOLS.contains(&name) || PHYSICAL_REGISTERS.contains(&name) {
    return Err(CompileError::semantic(
      line,
      column,
      format!("'{name}' is reserved for the emitted assembly"),
    ));
  }
  if LABEL_PREFIXES
    .iter()
    .any(|prefix| name.starts_with(prefix))
  {
    return Err(CompileError::semantic(
      line,
      column,
      format!("identifiers may not start with the reserved prefix of '{name}'"),
    ));
  }
  Ok(())
}

// ----- Declaration tracking -----

struct ParserContext {
  vars: HashMap<String, Option<i64>>,
  in_function: bool,
}

impl ParserContext {
  fn new() -> Self {
    Self {
      vars: HashMap::new(),
      in_function: false,
    }
  }

  /// Register a `VAR` declaration. Redeclaring with the same initializer is
  /// idempotent; a conflicting initializer is an error.
  fn declare_var(
    &mut self,
    name: &str,
    init: Option<i64>,
    line: usize,
    column: usize,
  ) -> CompileResult<()> {
    match self.vars.get(name) {
      Some(previous) if *previous != init => Err(CompileError::semantic(
        line,
        column,
        format!("conflicting redeclaration of '{name}'"),
      )),
      Some(_) => Ok(()),
      None => {
        self.vars.insert(name.to_string(), init);
        Ok(())
      }
    }
  }
}

// ----- Token cursor -----

/// Lightweight cursor over the token vector. The position saturates at the
/// trailing `Eof` marker, so `current` is always valid.
struct TokenStream {
  tokens: Vec<Token>,
  pos: usize,
}

impl TokenStream {
  fn new(mut tokens: Vec<Token>) -> Self {
    if !matches!(tokens.last().map(|token| &token.kind), Some(TokenKind::Eof)) {
      let (line, column) = tokens
        .last()
        .map(|token| (token.line, token.column))
        .unwrap_or((1, 1));
      tokens.push(Token::new(TokenKind::Eof, line, column));
    }
    Self { tokens, pos: 0 }
  }

  fn current(&self) -> &Token {
    &self.tokens[self.pos.min(self.tokens.len() - 1)]
  }

  fn advance(&mut self) {
    if self.pos + 1 < self.tokens.len() {
      self.pos += 1;
    }
  }

  fn at(&self, kind: &TokenKind) -> bool {
    &self.current().kind == kind
  }

  fn eat(&mut self, kind: &TokenKind) -> bool {
    if self.at(kind) {
      self.advance();
      true
    } else {
      false
    }
  }

  fn skip_newlines(&mut self) {
    while self.at(&TokenKind::Newline) {
      self.advance();
    }
  }

  fn expect(&mut self, kind: &TokenKind) -> CompileResult<Token> {
    if self.at(kind) {
      let token = self.current().clone();
      self.advance();
      Ok(token)
    } else {
      let token = self.current();
      Err(CompileError::syntax(
        token.line,
        token.column,
        format!(
          "expected {}, but got {}",
          describe(kind),
          describe(&token.kind)
        ),
      ))
    }
  }

  fn expect_register(&mut self) -> CompileResult<Reg> {
    let token = self.current().clone();
    match token.kind {
      TokenKind::Register(index) => {
        self.advance();
        Ok(Reg(index))
      }
      _ => Err(CompileError::syntax(
        token.line,
        token.column,
        format!("expected register, but got {}", describe(&token.kind)),
      )),
    }
  }

  /// Consume an identifier, rejecting names that would collide with the
  /// emitter's own symbols.
  fn expect_ident(&mut self) -> CompileResult<(String, usize, usize)> {
    let token = self.current().clone();
    match token.kind {
      TokenKind::Ident(name) => {
        validate_ident(&name, token.line, token.column)?;
        self.advance();
        Ok((name, token.line, token.column))
      }
      _ => Err(CompileError::syntax(
        token.line,
        token.column,
        format!("expected identifier, but got {}", describe(&token.kind)),
      )),
    }
  }

  fn expect_number(&mut self) -> CompileResult<(i64, usize, usize)> {
    let token = self.current().clone();
    match token.kind {
      TokenKind::Number(value) => {
        self.advance();
        Ok((value, token.line, token.column))
      }
      _ => Err(CompileError::syntax(
        token.line,
        token.column,
        format!("expected number, but got {}", describe(&token.kind)),
      )),
    }
  }
}

// ----- Diagnostics -----

/// Human-friendly token description used in error messages.
fn describe(kind: &TokenKind) -> String {
  use TokenKind::*;
  match kind {
    Register(index) => format!("register R{index}"),
    Ident(name) => format!("identifier '{name}'"),
    Number(value) => format!("number {value}"),
    Eq => "'=='".to_string(),
    Neq => "'!='".to_string(),
    Gt => "'>'".to_string(),
    Lt => "'<'".to_string(),
    Gte => "'>='".to_string(),
    Lte => "'<='".to_string(),
    Comma => "','".to_string(),
    Colon => "':'".to_string(),
    Newline => "newline".to_string(),
    Eof => "end of input".to_string(),
    keyword => format!("'{}'", format!("{keyword:?}").to_uppercase()),
  }
}

fn describe_set(kinds: &[TokenKind]) -> String {
  kinds
    .iter()
    .map(describe)
    .collect::<Vec<_>>()
    .join(" or ")
}
