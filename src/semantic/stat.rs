//! Statement checking. Nested blocks open their own scope in the enclosing frame.

use crate::ast::{Expr, Stat, StatKind};
use crate::diagnostic::{Diagnostic, Parsed, Validate, combine, combine3, invalid};
use crate::parse_tree::{ExprNode, Ident, Position, RhsNode, StatNode, StatNodeKind, TypeNode};
use crate::scope::ScopeId;
use crate::ty::Type;

use super::{Builder, resolve_type};

impl Builder<'_> {
  pub(super) fn stat(&mut self, node: &StatNode, scope: ScopeId) -> Parsed<Stat> {
    let pos = node.pos;
    let kind = match &node.kind {
      StatNodeKind::Skip => Ok(StatKind::Skip),
      StatNodeKind::Declare { ty, name, rhs } => self.declare(ty, name, rhs, scope),
      StatNodeKind::Assign { lhs, rhs } => {
        let lhs = self.lhs(lhs, scope);
        let rhs = self.rhs(rhs, scope);
        combine(lhs, rhs, |lhs, rhs| (lhs, rhs))
          .validate(
            |(lhs, rhs)| rhs.ty.matches(&lhs.ty),
            |(lhs, rhs)| Diagnostic::mismatch(rhs.pos, lhs.ty.clone(), rhs.ty.clone(), "assignment"),
          )
          .map(|(lhs, rhs)| StatKind::Assign { lhs, rhs })
      }
      StatNodeKind::Read(lhs) => self
        .lhs(lhs, scope)
        .validate(
          |lhs| matches!(lhs.ty, Type::Int | Type::Char),
          |lhs| Diagnostic::TypeMismatch {
            pos: lhs.pos,
            expected: vec![Type::Int, Type::Char],
            actual: lhs.ty.clone(),
            context: "read".to_string(),
          },
        )
        .map(StatKind::Read),
      StatNodeKind::Free(expr) => self
        .expr(expr, scope)
        .validate(
          |expr| expr.ty.is_pair_like() || expr.ty.is_array_like(),
          |expr| Diagnostic::TypeMismatch {
            pos: expr.pos,
            expected: vec![Type::AnyPair, Type::EmptyArray],
            actual: expr.ty.clone(),
            context: "free".to_string(),
          },
        )
        .map(StatKind::Free),
      StatNodeKind::Return(expr) => self.return_stat(expr, scope, pos),
      StatNodeKind::Exit(expr) => self
        .typed_expr(expr, scope, Type::Int, "exit")
        .map(StatKind::Exit),
      StatNodeKind::Print(expr) => self.expr(expr, scope).map(StatKind::Print),
      StatNodeKind::Println(expr) => self.expr(expr, scope).map(StatKind::Println),
      StatNodeKind::If {
        cond,
        then_branch,
        else_branch,
      } => {
        let cond = self.typed_expr(cond, scope, Type::Bool, "if condition");
        let then_branch = self.branch(then_branch.as_deref(), scope, pos, "then branch");
        let else_branch = self.branch(else_branch.as_deref(), scope, pos, "else branch");
        combine3(cond, then_branch, else_branch, |cond, then_branch, else_branch| {
          StatKind::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
          }
        })
      }
      StatNodeKind::While { cond, body } => {
        let cond = self.typed_expr(cond, scope, Type::Bool, "while condition");
        let body = self.branch(body.as_deref(), scope, pos, "while body");
        combine(cond, body, |cond, body| StatKind::While {
          cond,
          body: Box::new(body),
        })
      }
      StatNodeKind::Begin(body) => self
        .branch(body.as_deref(), scope, pos, "begin block")
        .map(|body| StatKind::Scoped(Box::new(body))),
      StatNodeKind::Seq(first, rest) => {
        let first = self.stat(first, scope);
        let rest = self.stat(rest, scope);
        combine(first, rest, |first, rest| {
          StatKind::Sequence(Box::new(first), Box::new(rest))
        })
      }
    }?;
    Ok(Stat::new(kind, scope, pos))
  }

  /// The right-hand side is checked before the name is bound, so it cannot refer to itself.
  fn declare(
    &mut self,
    ty: &TypeNode,
    name: &Ident,
    rhs: &RhsNode,
    scope: ScopeId,
  ) -> Parsed<StatKind> {
    let ty = resolve_type(ty);
    let rhs = self.rhs(rhs, scope).validate(
      |rhs| rhs.ty.matches(&ty),
      |rhs| {
        Diagnostic::mismatch(
          rhs.pos,
          ty.clone(),
          rhs.ty.clone(),
          format!("declaration of \"{}\"", name.name),
        )
      },
    )?;
    let var = self.symbols.declare_variable(scope, name.pos, &name.name, ty)?;
    Ok(StatKind::Declare { var, rhs })
  }

  fn return_stat(&mut self, expr: &ExprNode, scope: ScopeId, pos: Position) -> Parsed<StatKind> {
    match self.symbols.return_type(scope).cloned() {
      Some(ret) => self
        .typed_expr(expr, scope, ret, "return")
        .map(StatKind::Return),
      None => combine(
        self.expr(expr, scope),
        invalid::<()>(Diagnostic::ReturnOutsideFunction { pos }),
        |expr, _| StatKind::Return(expr),
      ),
    }
  }

  /// A nested statement in its own block scope; a missing child is malformed input.
  fn branch(
    &mut self,
    node: Option<&StatNode>,
    parent: ScopeId,
    pos: Position,
    what: &str,
  ) -> Parsed<Stat> {
    match node {
      Some(node) => {
        let scope = self.symbols.block_scope(parent);
        self.stat(node, scope)
      }
      None => invalid(Diagnostic::Syntactic {
        pos,
        message: format!("missing statement in {what}"),
      }),
    }
  }

  fn typed_expr(
    &self,
    node: &ExprNode,
    scope: ScopeId,
    expected: Type,
    context: &str,
  ) -> Parsed<Expr> {
    self.expr(node, scope).validate(
      |expr| expr.ty.matches(&expected),
      |expr| Diagnostic::mismatch(expr.pos, expected.clone(), expr.ty.clone(), context),
    )
  }
}
