//! Lexical analysis: turns TC source text into a vector of tokens.
//!
//! The scanner resolves everything later stages should not have to think
//! about: keyword casing, the three numeric bases, the leading minus of a
//! signed literal, and the two-character relational operators. Every token
//! records the 1-based line and column of its first character.

use crate::error::{CompileError, CompileResult};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Kinds of tokens recognised by the front-end. Numeric literals arrive
/// already evaluated to `i64`; identifiers keep their original casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
  // Keywords (case-insensitive in source).
  Var,
  Load,
  Set,
  Move,
  Add,
  Sub,
  Mul,
  Div,
  Inc,
  Dec,
  And,
  Or,
  Xor,
  Not,
  Shl,
  Shr,
  Func,
  EndFunc,
  Call,
  Ret,
  Loop,
  EndLoop,
  While,
  EndWhile,
  For,
  EndFor,
  From,
  To,
  Step,
  Repeat,
  Until,
  If,
  Else,
  EndIf,
  Push,
  Pop,
  Print,
  Input,
  Halt,
  Nop,
  // Literals.
  Register(u8),
  Ident(String),
  Number(i64),
  // Relational operators.
  Eq,
  Neq,
  Gt,
  Lt,
  Gte,
  Lte,
  // Punctuation.
  Comma,
  Colon,
  Newline,
  Eof,
}

/// Thin wrapper pairing a token kind with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub line: usize,
  pub column: usize,
}

impl Token {
  pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
    Self { kind, line, column }
  }
}

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
  use TokenKind::*;
  HashMap::from([
    ("VAR", Var),
    ("LOAD", Load),
    ("SET", Set),
    ("MOVE", Move),
    ("ADD", Add),
    ("SUB", Sub),
    ("MUL", Mul),
    ("DIV", Div),
    ("INC", Inc),
    ("DEC", Dec),
    ("AND", And),
    ("OR", Or),
    ("XOR", Xor),
    ("NOT", Not),
    ("SHL", Shl),
    ("SHR", Shr),
    ("FUNC", Func),
    ("ENDFUNC", EndFunc),
    ("CALL", Call),
    ("RET", Ret),
    ("LOOP", Loop),
    ("ENDLOOP", EndLoop),
    ("WHILE", While),
    ("ENDWHILE", EndWhile),
    ("FOR", For),
    ("ENDFOR", EndFor),
    ("FROM", From),
    ("TO", To),
    ("STEP", Step),
    ("REPEAT", Repeat),
    ("UNTIL", Until),
    ("IF", If),
    ("ELSE", Else),
    ("ENDIF", EndIf),
    ("PUSH", Push),
    ("POP", Pop),
    ("PRINT", Print),
    ("INPUT", Input),
    ("HALT", Halt),
    ("NOP", Nop),
  ])
});

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
///
/// Blank lines are not collapsed here: one `Newline` token is emitted per
/// `\n` in the source and the parser skips runs of them.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut scanner = Scanner::new(input);
  let mut tokens = Vec::new();

  while let Some(c) = scanner.peek() {
    let (line, column) = (scanner.line, scanner.column);
    match c {
      b' ' | b'\t' | b'\r' => {
        scanner.bump();
      }
      b'\n' => {
        tokens.push(Token::new(TokenKind::Newline, line, column));
        scanner.bump();
      }
      b';' => {
        while scanner.peek().is_some_and(|c| c != b'\n') {
          scanner.bump();
        }
      }
      b'=' => {
        scanner.bump();
        if scanner.peek() == Some(b'=') {
          scanner.bump();
          tokens.push(Token::new(TokenKind::Eq, line, column));
        } else {
          return Err(CompileError::lexical(
            line,
            column,
            "'=' is not an operator; did you mean '=='?",
          ));
        }
      }
      b'!' => {
        scanner.bump();
        if scanner.peek() == Some(b'=') {
          scanner.bump();
          tokens.push(Token::new(TokenKind::Neq, line, column));
        } else {
          return Err(CompileError::lexical(line, column, "expected '=' after '!'"));
        }
      }
      b'>' => {
        scanner.bump();
        if scanner.peek() == Some(b'=') {
          scanner.bump();
          tokens.push(Token::new(TokenKind::Gte, line, column));
        } else {
          tokens.push(Token::new(TokenKind::Gt, line, column));
        }
      }
      b'<' => {
        scanner.bump();
        if scanner.peek() == Some(b'=') {
          scanner.bump();
          tokens.push(Token::new(TokenKind::Lte, line, column));
        } else {
          tokens.push(Token::new(TokenKind::Lt, line, column));
        }
      }
      b',' => {
        scanner.bump();
        tokens.push(Token::new(TokenKind::Comma, line, column));
      }
      b':' => {
        scanner.bump();
        tokens.push(Token::new(TokenKind::Colon, line, column));
      }
      b'-' => {
        if scanner.peek_next().is_some_and(|c| c.is_ascii_digit()) {
          tokens.push(scanner.scan_number()?);
        } else {
          return Err(CompileError::lexical(
            line,
            column,
            "expected a digit after '-'",
          ));
        }
      }
      c if c.is_ascii_digit() => {
        tokens.push(scanner.scan_number()?);
      }
      c if c.is_ascii_alphabetic() || c == b'_' => {
        tokens.push(scanner.scan_word());
      }
      c => {
        return Err(CompileError::lexical(
          line,
          column,
          format!("unrecognized character '{}'", c as char),
        ));
      }
    }
  }

  tokens.push(Token::new(TokenKind::Eof, scanner.line, scanner.column));
  Ok(tokens)
}

/// Byte cursor with line/column bookkeeping. Only ASCII is significant in
/// TC source, so scanning over bytes is safe; any non-ASCII byte falls
/// through to the unrecognized-character error.
struct Scanner<'a> {
  src: &'a [u8],
  pos: usize,
  line: usize,
  column: usize,
}

impl<'a> Scanner<'a> {
  fn new(input: &'a str) -> Self {
    Self {
      src: input.as_bytes(),
      pos: 0,
      line: 1,
      column: 1,
    }
  }

  fn peek(&self) -> Option<u8> {
    self.src.get(self.pos).copied()
  }

  fn peek_next(&self) -> Option<u8> {
    self.src.get(self.pos + 1).copied()
  }

  fn bump(&mut self) {
    if let Some(&c) = self.src.get(self.pos) {
      self.pos += 1;
      if c == b'\n' {
        self.line += 1;
        self.column = 1;
      } else {
        self.column += 1;
      }
    }
  }

  /// Scan a numeric literal: optional leading minus, then decimal digits or
  /// a `0x`/`0b` base prefix. The value is evaluated here; the parser only
  /// ever sees a finished `i64`.
  fn scan_number(&mut self) -> CompileResult<Token> {
    let (line, column) = (self.line, self.column);
    let mut digits = String::new();

    if self.peek() == Some(b'-') {
      digits.push('-');
      self.bump();
    }

    let radix = if self.peek() == Some(b'0') && matches!(self.peek_next(), Some(b'x') | Some(b'X'))
    {
      self.bump();
      self.bump();
      16
    } else if self.peek() == Some(b'0') && matches!(self.peek_next(), Some(b'b') | Some(b'B')) {
      self.bump();
      self.bump();
      2
    } else {
      10
    };

    let digit_start = digits.len();
    while let Some(c) = self.peek() {
      if (c as char).is_digit(radix) {
        digits.push(c as char);
        self.bump();
      } else {
        break;
      }
    }

    if digits.len() == digit_start {
      return Err(CompileError::lexical(
        line,
        column,
        "numeric literal has no digits after its base prefix",
      ));
    }

    // `1bad` or `0x12g` is a malformed literal, not a number-then-identifier
    // pair.
    if let Some(c) = self.peek() {
      if c.is_ascii_alphanumeric() || c == b'_' {
        return Err(CompileError::lexical(
          line,
          column,
          format!("malformed numeric literal: unexpected '{}'", c as char),
        ));
      }
    }

    let value = i64::from_str_radix(&digits, radix).map_err(|_| {
      CompileError::lexical(
        line,
        column,
        "numeric literal does not fit in a 64-bit signed integer",
      )
    })?;

    Ok(Token::new(TokenKind::Number(value), line, column))
  }

  /// Scan an identifier-shaped word and classify it as register, keyword,
  /// or identifier, in that order. Registers are case-sensitive; keywords
  /// are not.
  fn scan_word(&mut self) -> Token {
    let (line, column) = (self.line, self.column);
    let start = self.pos;
    while self
      .peek()
      .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
    {
      self.bump();
    }
    let word = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default();

    if let Some(index) = register_index(word) {
      return Token::new(TokenKind::Register(index), line, column);
    }

    if let Some(kind) = KEYWORDS.get(word.to_ascii_uppercase().as_str()) {
      return Token::new(kind.clone(), line, column);
    }

    Token::new(TokenKind::Ident(word.to_string()), line, column)
  }
}

/// `R1`..`R8`, exactly, case-sensitively. Anything else (`R0`, `R9`, `r1`)
/// is an ordinary identifier.
fn register_index(word: &str) -> Option<u8> {
  let bytes = word.as_bytes();
  match bytes {
    [b'R', digit @ b'1'..=b'8'] => Some(digit - b'0'),
    _ => None,
  }
}
