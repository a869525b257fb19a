//! Typing of expressions, lvalues and rvalues.

use crate::ast::{
  ArrayElem, AssLhs, AssRhs, BinaryOp, Expr, ExprKind, LhsKind, PairElem, RhsKind, UnaryOp,
};
use crate::diagnostic::{
  Diagnostic, Diagnostics, Outcomes, Parsed, Validate, combine, invalid,
};
use crate::parse_tree::{
  ArrayElemNode, ExprNode, ExprNodeKind, Ident, LhsNode, PairElemNode, Position, RhsNode,
};
use crate::scope::{ScopeId, VarId};
use crate::ty::Type;

use super::Builder;

/// Require the expression's type to satisfy `accepts`; `expected` names the acceptable types.
fn operand(
  expr: Parsed<Expr>,
  accepts: fn(&Type) -> bool,
  expected: &[Type],
  context: String,
) -> Parsed<Expr> {
  expr.validate(
    |expr| accepts(&expr.ty),
    |expr| Diagnostic::TypeMismatch {
      pos: expr.pos,
      expected: expected.to_vec(),
      actual: expr.ty.clone(),
      context,
    },
  )
}

fn is_int(ty: &Type) -> bool {
  *ty == Type::Int
}

fn is_bool(ty: &Type) -> bool {
  *ty == Type::Bool
}

fn is_char(ty: &Type) -> bool {
  *ty == Type::Char
}

fn is_orderable(ty: &Type) -> bool {
  matches!(ty, Type::Int | Type::Char)
}

impl Builder<'_> {
  pub(super) fn expr(&self, node: &ExprNode, scope: ScopeId) -> Parsed<Expr> {
    let pos = node.pos;
    match &node.kind {
      ExprNodeKind::Int(value) => match i32::try_from(*value) {
        Ok(value) => Ok(Expr::new(ExprKind::Int(value), Type::Int, pos)),
        Err(_) => invalid(Diagnostic::Syntactic {
          pos,
          message: format!("integer literal {value} does not fit in 32 bits"),
        }),
      },
      ExprNodeKind::Bool(value) => Ok(Expr::new(ExprKind::Bool(*value), Type::Bool, pos)),
      ExprNodeKind::Char(value) => Ok(Expr::new(ExprKind::Char(*value), Type::Char, pos)),
      ExprNodeKind::Str(value) => Ok(Expr::new(ExprKind::Str(value.clone()), Type::String, pos)),
      ExprNodeKind::PairLit => Ok(Expr::new(ExprKind::NullPair, Type::AnyPair, pos)),
      ExprNodeKind::Ident(name) => self
        .variable(scope, name, pos)
        .map(|(var, ty)| Expr::new(ExprKind::Ident(var), ty, pos)),
      ExprNodeKind::ArrayElem(elem) => self
        .array_elem(elem, scope)
        .map(|(elem, ty)| Expr::new(ExprKind::ArrayElem(elem), ty, pos)),
      ExprNodeKind::Unary(op, operand) => self.unary(*op, operand, scope, pos),
      ExprNodeKind::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs, scope, pos),
      ExprNodeKind::Paren(inner) => self.expr(inner, scope),
    }
  }

  pub(super) fn lhs(&self, node: &LhsNode, scope: ScopeId) -> Parsed<AssLhs> {
    match node {
      LhsNode::Ident(ident) => self
        .variable(scope, &ident.name, ident.pos)
        .map(|(var, ty)| AssLhs {
          kind: LhsKind::Ident(var),
          ty,
          pos: ident.pos,
        }),
      LhsNode::ArrayElem(elem) => self.array_elem(elem, scope).map(|(array_elem, ty)| AssLhs {
        kind: LhsKind::ArrayElem(array_elem),
        ty,
        pos: elem.pos,
      }),
      LhsNode::PairElem(elem) => self.pair_elem(elem, scope).map(|(pair_elem, ty)| AssLhs {
        kind: LhsKind::PairElem(pair_elem),
        ty,
        pos: elem.pos,
      }),
    }
  }

  pub(super) fn rhs(&self, node: &RhsNode, scope: ScopeId) -> Parsed<AssRhs> {
    match node {
      RhsNode::Expr(expr) => self.expr(expr, scope).map(|expr| AssRhs {
        ty: expr.ty.clone(),
        pos: expr.pos,
        kind: RhsKind::Expr(expr),
      }),
      RhsNode::ArrayLit { elems, pos } => self.array_lit(elems, scope, *pos),
      RhsNode::NewPair { fst, snd, pos } => {
        combine(self.expr(fst, scope), self.expr(snd, scope), |fst, snd| AssRhs {
          ty: Type::pair(fst.ty.clone(), snd.ty.clone()),
          kind: RhsKind::NewPair(fst, snd),
          pos: *pos,
        })
      }
      RhsNode::PairElem(elem) => self.pair_elem(elem, scope).map(|(pair_elem, ty)| AssRhs {
        kind: RhsKind::PairElem(pair_elem),
        ty,
        pos: elem.pos,
      }),
      RhsNode::Call { name, args, pos } => self.call(name, args, scope, *pos),
    }
  }

  fn variable(&self, scope: ScopeId, name: &str, pos: Position) -> Parsed<(VarId, Type)> {
    match self.symbols.lookup_variable(scope, name) {
      Some(var) => Ok((var, self.symbols.variable(var).ty.clone())),
      None => invalid(Diagnostic::UndefinedIdentifier {
        pos,
        name: name.to_string(),
      }),
    }
  }

  /// Resolve `name[i]...`; the base must be an array at least as deep as the subscripts.
  fn array_elem(&self, node: &ArrayElemNode, scope: ScopeId) -> Parsed<(ArrayElem, Type)> {
    let base = self.variable(scope, &node.name.name, node.name.pos);
    let indices: Vec<Parsed<Expr>> = node
      .indices
      .iter()
      .map(|index| {
        operand(
          self.expr(index, scope),
          is_int,
          &[Type::Int],
          "array index".to_string(),
        )
      })
      .collect();

    combine(base, indices.collect_all(), |base, indices| (base, indices)).and_then(
      |((var, array_ty), indices)| {
        let elem_ty = array_ty
          .index(indices.len())
          .filter(|_| array_ty.is_array_like() && !indices.is_empty());
        match elem_ty {
          Some(ty) => Ok((
            ArrayElem {
              var,
              array_ty,
              indices,
            },
            ty,
          )),
          None => invalid(Diagnostic::ArrayShape {
            pos: node.pos,
            name: node.name.name.clone(),
            ty: array_ty,
            indices: indices.len(),
          }),
        }
      },
    )
  }

  /// `fst e` / `snd e`: `e` must be pair-typed and not the `null` literal.
  fn pair_elem(&self, node: &PairElemNode, scope: ScopeId) -> Parsed<(PairElem, Type)> {
    self
      .expr(&node.expr, scope)
      .validate(
        |expr| !matches!(expr.kind, ExprKind::NullPair),
        |expr| Diagnostic::NullPairDereference { pos: expr.pos },
      )
      .and_then(|expr| match expr.ty.pair_elem(node.accessor) {
        Some(ty) => Ok((
          PairElem {
            accessor: node.accessor,
            pair: Box::new(expr),
          },
          ty,
        )),
        None => invalid(Diagnostic::mismatch(
          expr.pos,
          Type::AnyPair,
          expr.ty.clone(),
          format!("'{}' access", node.accessor),
        )),
      })
  }

  fn array_lit(&self, elems: &[ExprNode], scope: ScopeId, pos: Position) -> Parsed<AssRhs> {
    let elems = elems
      .iter()
      .map(|elem| self.expr(elem, scope))
      .collect::<Vec<_>>()
      .collect_all()?;
    let Some(first) = elems.first() else {
      return Ok(AssRhs {
        kind: RhsKind::ArrayLit(Vec::new()),
        ty: Type::EmptyArray,
        pos,
      });
    };

    // Placeholders such as `null` only fix the element type once a concrete element appears.
    let elem_ty = elems
      .iter()
      .map(|elem| &elem.ty)
      .find(|ty| !ty.is_placeholder())
      .unwrap_or(&first.ty)
      .clone();
    let mismatches: Vec<Diagnostic> = elems
      .iter()
      .filter(|elem| !elem.ty.matches(&elem_ty))
      .map(|elem| Diagnostic::ArrayElementMismatch {
        pos: elem.pos,
        first: first.pos,
        expected: elem_ty.clone(),
        actual: elem.ty.clone(),
      })
      .collect();
    if let Some(errors) = Diagnostics::from_vec(mismatches) {
      return Err(errors);
    }

    Ok(AssRhs {
      kind: RhsKind::ArrayLit(elems),
      ty: Type::array(elem_ty, 1),
      pos,
    })
  }

  /// Arguments are converted even when the callee cannot be resolved.
  fn call(&self, name: &Ident, args: &[ExprNode], scope: ScopeId, pos: Position) -> Parsed<AssRhs> {
    let args: Vec<Parsed<Expr>> = args.iter().map(|arg| self.expr(arg, scope)).collect();
    let callee = match self.symbols.lookup_function(&name.name) {
      Some(sig) => Ok(sig.clone()),
      None => invalid(Diagnostic::UndefinedIdentifier {
        pos: name.pos,
        name: name.name.clone(),
      }),
    };

    combine(callee, args.collect_all(), |sig, args| (sig, args)).and_then(|(sig, args)| {
      if sig.params.len() != args.len() {
        return invalid(Diagnostic::ArityMismatch {
          pos,
          name: sig.name,
          expected: sig.params.len(),
          actual: args.len(),
        });
      }

      let mismatches: Vec<Diagnostic> = sig
        .params
        .iter()
        .zip(&args)
        .enumerate()
        .filter(|(_, (param, arg))| !arg.ty.matches(param))
        .map(|(idx, (param, arg))| {
          Diagnostic::mismatch(
            arg.pos,
            param.clone(),
            arg.ty.clone(),
            format!("argument {} of \"{}\"", idx + 1, sig.name),
          )
        })
        .collect();
      if let Some(errors) = Diagnostics::from_vec(mismatches) {
        return Err(errors);
      }

      Ok(AssRhs {
        kind: RhsKind::Call {
          name: sig.name,
          args,
        },
        ty: sig.ret,
        pos,
      })
    })
  }

  fn unary(&self, op: UnaryOp, node: &ExprNode, scope: ScopeId, pos: Position) -> Parsed<Expr> {
    let context = format!("operand of '{op}'");
    let inner = self.expr(node, scope);
    let (checked, result) = match op {
      UnaryOp::Not => (operand(inner, is_bool, &[Type::Bool], context), Type::Bool),
      UnaryOp::Neg => (operand(inner, is_int, &[Type::Int], context), Type::Int),
      UnaryOp::Len => (
        operand(inner, Type::is_array_like, &[Type::EmptyArray], context),
        Type::Int,
      ),
      UnaryOp::Ord => (operand(inner, is_char, &[Type::Char], context), Type::Int),
      UnaryOp::Chr => (operand(inner, is_int, &[Type::Int], context), Type::Char),
    };
    checked.map(|inner| Expr::new(ExprKind::Unary(op, Box::new(inner)), result, pos))
  }

  fn binary(
    &self,
    op: BinaryOp,
    lhs: &ExprNode,
    rhs: &ExprNode,
    scope: ScopeId,
    pos: Position,
  ) -> Parsed<Expr> {
    let context = || format!("operand of '{op}'");
    let lhs = self.expr(lhs, scope);
    let rhs = self.expr(rhs, scope);

    let (operands, result) = match op {
      BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Add | BinaryOp::Sub => (
        combine(
          operand(lhs, is_int, &[Type::Int], context()),
          operand(rhs, is_int, &[Type::Int], context()),
          |lhs, rhs| (lhs, rhs),
        ),
        Type::Int,
      ),
      BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Le => (
        combine(
          operand(lhs, is_orderable, &[Type::Int, Type::Char], context()),
          operand(rhs, is_orderable, &[Type::Int, Type::Char], context()),
          |lhs, rhs| (lhs, rhs),
        )
        .validate(
          |(lhs, rhs)| lhs.ty == rhs.ty,
          |(lhs, rhs)| Diagnostic::mismatch(rhs.pos, lhs.ty.clone(), rhs.ty.clone(), context()),
        ),
        Type::Bool,
      ),
      BinaryOp::Eq | BinaryOp::Ne => (
        combine(lhs, rhs, |lhs, rhs| (lhs, rhs)).validate(
          |(lhs, rhs)| lhs.ty.matches(&rhs.ty),
          |(lhs, rhs)| Diagnostic::mismatch(rhs.pos, lhs.ty.clone(), rhs.ty.clone(), context()),
        ),
        Type::Bool,
      ),
      BinaryOp::And | BinaryOp::Or => (
        combine(
          operand(lhs, is_bool, &[Type::Bool], context()),
          operand(rhs, is_bool, &[Type::Bool], context()),
          |lhs, rhs| (lhs, rhs),
        ),
        Type::Bool,
      ),
    };

    operands.map(|(lhs, rhs)| {
      Expr::new(
        ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
        result,
        pos,
      )
    })
  }
}
