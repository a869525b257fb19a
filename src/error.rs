//! Top-level error type for a compilation.
//!
//! Syntax errors stop the parser at the first problem and point at it with a
//! caret under the offending source line. Semantic errors carry every
//! diagnostic the analysis collected.

use std::path::PathBuf;

use snafu::Snafu;

use crate::codegen::CodegenError;
use crate::diagnostic::Diagnostics;
use crate::parse_tree::Position;

pub type CompileResult<T> = Result<T, CompileError>;

/// Exit status for programs rejected by the parser.
pub const SYNTAX_EXIT_CODE: i32 = 100;
/// Exit status for programs rejected by semantic analysis.
pub const SEMANTIC_EXIT_CODE: i32 = 200;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CompileError {
  #[snafu(display("{location}: syntax error: {message}\n{line_text}\n{marker}"))]
  WithLocation {
    location: Position,
    line_text: String,
    marker: String,
    message: String,
  },

  #[snafu(display("{diagnostics}"))]
  Semantic { diagnostics: Diagnostics },

  #[snafu(display("code generation failed: {source}"))]
  Codegen { source: CodegenError },

  #[snafu(display("i/o error on {}: {source}", path.display()))]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
}

impl CompileError {
  /// Construct an error anchored at a byte offset in `source`.
  pub fn at(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let safe_loc = loc.min(source.len());
    let location = Position::from_offset(source, safe_loc);
    let line_start = source[..safe_loc].rfind('\n').map_or(0, |idx| idx + 1);
    let line_end = source[safe_loc..]
      .find('\n')
      .map_or(source.len(), |idx| safe_loc + idx);
    let line_text = source[line_start..line_end].to_string();
    let marker = format!("{}^", " ".repeat(location.col - 1));
    Self::WithLocation {
      location,
      line_text,
      marker,
      message: message.into(),
    }
  }

  /// Process exit status for this error.
  pub fn exit_code(&self) -> i32 {
    match self {
      CompileError::WithLocation { .. } => SYNTAX_EXIT_CODE,
      CompileError::Semantic { diagnostics } if diagnostics.has_syntactic() => SYNTAX_EXIT_CODE,
      CompileError::Semantic { .. } => SEMANTIC_EXIT_CODE,
      CompileError::Codegen { .. } | CompileError::Io { .. } => 1,
    }
  }
}
