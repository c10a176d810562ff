//! Shared error type for the compilation pipeline.
//!
//! Every failure carries the 1-based line and column of the offending
//! source position plus a human-readable message. The variants mirror the
//! stages that can reject a program; code generation itself never fails on
//! a parsed program.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum CompileError {
  #[snafu(display("lexical error at {line}:{column}: {message}"))]
  Lexical {
    line: usize,
    column: usize,
    message: String,
  },

  #[snafu(display("syntax error at {line}:{column}: {message}"))]
  Syntax {
    line: usize,
    column: usize,
    message: String,
  },

  #[snafu(display("semantic error at {line}:{column}: {message}"))]
  Semantic {
    line: usize,
    column: usize,
    message: String,
  },
}

impl CompileError {
  /// Construct a lexical error anchored at a source position.
  pub fn lexical(line: usize, column: usize, message: impl Into<String>) -> Self {
    Self::Lexical {
      line,
      column,
      message: message.into(),
    }
  }

  /// Construct a syntax error anchored at a source position.
  pub fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
    Self::Syntax {
      line,
      column,
      message: message.into(),
    }
  }

  /// Construct a semantic error anchored at a source position.
  pub fn semantic(line: usize, column: usize, message: impl Into<String>) -> Self {
    Self::Semantic {
      line,
      column,
      message: message.into(),
    }
  }

  pub fn line(&self) -> usize {
    match self {
      Self::Lexical { line, .. } | Self::Syntax { line, .. } | Self::Semantic { line, .. } => *line,
    }
  }

  pub fn column(&self) -> usize {
    match self {
      Self::Lexical { column, .. }
      | Self::Syntax { column, .. }
      | Self::Semantic { column, .. } => *column,
    }
  }

  pub fn message(&self) -> &str {
    match self {
      Self::Lexical { message, .. }
      | Self::Syntax { message, .. }
      | Self::Semantic { message, .. } => message,
    }
  }
}
