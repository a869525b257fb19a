//! Typed AST produced by semantic analysis.
//!
//! Every node has already been validated. Variables are referenced through
//! [`VarId`]s into the [`SymbolTable`](crate::scope::SymbolTable) that was
//! filled in while the tree was built.

use std::fmt;

use crate::parse_tree::Position;
use crate::scope::{ScopeId, VarId};
use crate::ty::{PairAccessor, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Not,
  Neg,
  Len,
  Ord,
  Chr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Mul,
  Div,
  Mod,
  Add,
  Sub,
  Gt,
  Ge,
  Lt,
  Le,
  Eq,
  Ne,
  And,
  Or,
}

impl fmt::Display for UnaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      UnaryOp::Not => "!",
      UnaryOp::Neg => "-",
      UnaryOp::Len => "len",
      UnaryOp::Ord => "ord",
      UnaryOp::Chr => "chr",
    })
  }
}

impl fmt::Display for BinaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Mod => "%",
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Gt => ">",
      BinaryOp::Ge => ">=",
      BinaryOp::Lt => "<",
      BinaryOp::Le => "<=",
      BinaryOp::Eq => "==",
      BinaryOp::Ne => "!=",
      BinaryOp::And => "&&",
      BinaryOp::Or => "||",
    })
  }
}

#[derive(Debug, Clone)]
pub struct Program {
  pub funcs: Vec<Func>,
  pub body: Stat,
}

#[derive(Debug, Clone)]
pub struct Func {
  pub ret: Type,
  pub name: String,
  pub params: Vec<Param>,
  pub body: Stat,
  pub scope: ScopeId,
  pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct Param {
  pub ty: Type,
  pub name: String,
  pub var: VarId,
}

#[derive(Debug, Clone)]
pub struct Stat {
  pub kind: StatKind,
  pub scope: ScopeId,
  pub pos: Position,
}

#[derive(Debug, Clone)]
pub enum StatKind {
  Skip,
  Declare { var: VarId, rhs: AssRhs },
  Assign { lhs: AssLhs, rhs: AssRhs },
  Read(AssLhs),
  Free(Expr),
  Return(Expr),
  Exit(Expr),
  Print(Expr),
  Println(Expr),
  If {
    cond: Expr,
    then_branch: Box<Stat>,
    else_branch: Box<Stat>,
  },
  While { cond: Expr, body: Box<Stat> },
  Scoped(Box<Stat>),
  Sequence(Box<Stat>, Box<Stat>),
}

impl Stat {
  pub fn new(kind: StatKind, scope: ScopeId, pos: Position) -> Self {
    Self { kind, scope, pos }
  }
}

#[derive(Debug, Clone)]
pub struct Expr {
  pub kind: ExprKind,
  pub ty: Type,
  pub pos: Position,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
  Int(i32),
  Bool(bool),
  Char(char),
  Str(String),
  NullPair,
  Ident(VarId),
  ArrayElem(ArrayElem),
  Unary(UnaryOp, Box<Expr>),
  Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
  pub fn new(kind: ExprKind, ty: Type, pos: Position) -> Self {
    Self { kind, ty, pos }
  }
}

/// `name[i][j]...`, with the array's type kept for element sizing.
#[derive(Debug, Clone)]
pub struct ArrayElem {
  pub var: VarId,
  pub array_ty: Type,
  pub indices: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct PairElem {
  pub accessor: PairAccessor,
  pub pair: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct AssLhs {
  pub kind: LhsKind,
  pub ty: Type,
  pub pos: Position,
}

#[derive(Debug, Clone)]
pub enum LhsKind {
  Ident(VarId),
  ArrayElem(ArrayElem),
  PairElem(PairElem),
}

#[derive(Debug, Clone)]
pub struct AssRhs {
  pub kind: RhsKind,
  pub ty: Type,
  pub pos: Position,
}

#[derive(Debug, Clone)]
pub enum RhsKind {
  Expr(Expr),
  ArrayLit(Vec<Expr>),
  NewPair(Expr, Expr),
  PairElem(PairElem),
  Call { name: String, args: Vec<Expr> },
}
