//! Crate root: wires together the compilation pipeline.
//!
//! - `tokenizer` and `parser` turn WACC source into an untyped `parse_tree`,
//!   stopping at the first syntax error.
//! - `semantic` checks the tree against the scope hierarchy in `scope` and
//!   builds the typed `ast`, collecting every `diagnostic` it finds.
//! - `codegen` lowers the typed AST into ARM assembly expressed with the
//!   instruction model in `arm`.
//! - `error` is the single error type handed back to callers.

pub mod arm;
pub mod ast;
pub mod codegen;
pub mod diagnostic;
pub mod error;
pub mod parse_tree;
pub mod parser;
pub mod scope;
pub mod semantic;
pub mod tokenizer;
pub mod ty;

use snafu::ResultExt;

pub use codegen::Assembly;
pub use error::{CompileError, CompileResult};
pub use semantic::Analysis;

use error::{CodegenSnafu, SemanticSnafu};

/// Parse a source string into its untyped tree.
pub fn parse_program(source: &str) -> CompileResult<parse_tree::ProgramNode> {
  let tokens = tokenizer::tokenize(source)?;
  parser::parse(tokens, source)
}

/// Parse and semantically check a source string.
pub fn check(source: &str) -> CompileResult<Analysis> {
  let tree = parse_program(source)?;
  semantic::analyse(&tree).map_err(|diagnostics| SemanticSnafu { diagnostics }.build())
}

/// Compile a source string into the assembly model.
pub fn compile(source: &str) -> CompileResult<Assembly> {
  let analysis = check(source)?;
  codegen::generate(&analysis).context(CodegenSnafu)
}

/// Compile a source string into GNU assembler text.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  Ok(compile(source)?.to_string())
}
