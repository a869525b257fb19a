//! Untyped tree handed from the parser to semantic analysis.
//!
//! Node kinds follow the grammar productions one to one. Children that the
//! grammar requires are still `Option`s where a producer may fail to supply
//! them; semantic analysis turns a missing child into a diagnostic.

use std::fmt;

use crate::ast::{BinaryOp, UnaryOp};
use crate::ty::PairAccessor;

/// One-based line and column of a node in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
  pub line: usize,
  pub col: usize,
}

impl Position {
  pub fn new(line: usize, col: usize) -> Self {
    Self { line, col }
  }

  /// Locate a byte offset in `source`.
  pub fn from_offset(source: &str, offset: usize) -> Self {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
    let col = before[line_start..].chars().count() + 1;
    Self { line, col }
  }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.col)
  }
}

/// Identifier token with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
  pub name: String,
  pub pos: Position,
}

impl Ident {
  pub fn new(name: impl Into<String>, pos: Position) -> Self {
    Self {
      name: name.into(),
      pos,
    }
  }
}

#[derive(Debug, Clone)]
pub struct ProgramNode {
  pub funcs: Vec<FuncNode>,
  pub body: Option<Box<StatNode>>,
  pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct FuncNode {
  pub ret: TypeNode,
  pub name: Ident,
  pub params: Vec<ParamNode>,
  pub body: Option<Box<StatNode>>,
  pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct ParamNode {
  pub ty: TypeNode,
  pub name: Ident,
  pub pos: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
  Int,
  Bool,
  Char,
  String,
}

/// Written type. `AnyPair` only appears as a pair element (the bare `pair` keyword).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode {
  Base(BaseType),
  Pair(Box<TypeNode>, Box<TypeNode>),
  AnyPair,
  Array(Box<TypeNode>),
}

#[derive(Debug, Clone)]
pub struct StatNode {
  pub kind: StatNodeKind,
  pub pos: Position,
}

#[derive(Debug, Clone)]
pub enum StatNodeKind {
  Skip,
  Declare {
    ty: TypeNode,
    name: Ident,
    rhs: RhsNode,
  },
  Assign {
    lhs: LhsNode,
    rhs: RhsNode,
  },
  Read(LhsNode),
  Free(ExprNode),
  Return(ExprNode),
  Exit(ExprNode),
  Print(ExprNode),
  Println(ExprNode),
  If {
    cond: ExprNode,
    then_branch: Option<Box<StatNode>>,
    else_branch: Option<Box<StatNode>>,
  },
  While {
    cond: ExprNode,
    body: Option<Box<StatNode>>,
  },
  Begin(Option<Box<StatNode>>),
  Seq(Box<StatNode>, Box<StatNode>),
}

#[derive(Debug, Clone)]
pub struct ArrayElemNode {
  pub name: Ident,
  pub indices: Vec<ExprNode>,
  pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct PairElemNode {
  pub accessor: PairAccessor,
  pub expr: Box<ExprNode>,
  pub pos: Position,
}

#[derive(Debug, Clone)]
pub enum LhsNode {
  Ident(Ident),
  ArrayElem(ArrayElemNode),
  PairElem(PairElemNode),
}

#[derive(Debug, Clone)]
pub enum RhsNode {
  Expr(ExprNode),
  ArrayLit {
    elems: Vec<ExprNode>,
    pos: Position,
  },
  NewPair {
    fst: ExprNode,
    snd: ExprNode,
    pos: Position,
  },
  PairElem(PairElemNode),
  Call {
    name: Ident,
    args: Vec<ExprNode>,
    pos: Position,
  },
}

#[derive(Debug, Clone)]
pub struct ExprNode {
  pub kind: ExprNodeKind,
  pub pos: Position,
}

#[derive(Debug, Clone)]
pub enum ExprNodeKind {
  Int(i64),
  Bool(bool),
  Char(char),
  Str(String),
  PairLit,
  Ident(String),
  ArrayElem(ArrayElemNode),
  Unary(UnaryOp, Box<ExprNode>),
  Binary(BinaryOp, Box<ExprNode>, Box<ExprNode>),
  Paren(Box<ExprNode>),
}

impl ExprNode {
  pub fn new(kind: ExprNodeKind, pos: Position) -> Self {
    Self { kind, pos }
  }
}

impl StatNode {
  pub fn new(kind: StatNodeKind, pos: Position) -> Self {
    Self { kind, pos }
  }

  /// Whether every control path through this statement ends in `return` or `exit`.
  pub fn always_returns(&self) -> bool {
    match &self.kind {
      StatNodeKind::Return(_) | StatNodeKind::Exit(_) => true,
      StatNodeKind::Seq(_, rest) => rest.always_returns(),
      StatNodeKind::If {
        then_branch,
        else_branch,
        ..
      } => {
        then_branch.as_deref().is_some_and(StatNode::always_returns)
          && else_branch.as_deref().is_some_and(StatNode::always_returns)
      }
      StatNodeKind::Begin(body) => body.as_deref().is_some_and(StatNode::always_returns),
      _ => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn offsets_map_to_line_and_column() {
    let source = "begin\n  skip\nend";
    assert_eq!(Position::from_offset(source, 0), Position::new(1, 1));
    assert_eq!(Position::from_offset(source, 8), Position::new(2, 3));
    assert_eq!(Position::from_offset(source, source.len()), Position::new(3, 4));
  }
}
