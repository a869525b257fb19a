//! Error-accumulating validation used by semantic analysis.
//!
//! A [`Parsed`] value is either a result or a non-empty list of
//! [`Diagnostic`]s. Combinators merge the diagnostics of every failing input
//! instead of stopping at the first, so a single run reports each
//! independent problem in the program.

use std::fmt;

use snafu::Snafu;

use crate::parse_tree::Position;
use crate::ty::Type;

/// What kind of name a duplicate declaration clashed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
  Variable,
  Parameter,
  Function,
}

impl fmt::Display for DeclKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DeclKind::Variable => f.write_str("variable"),
      DeclKind::Parameter => f.write_str("parameter"),
      DeclKind::Function => f.write_str("function"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum Diagnostic {
  #[snafu(display("{pos}: syntax error: {message}"))]
  Syntactic { pos: Position, message: String },

  #[snafu(display("{pos}: undefined identifier \"{name}\""))]
  UndefinedIdentifier { pos: Position, name: String },

  #[snafu(display(
    "{pos}: {kind} \"{name}\" is already declared in this scope (first declared at {previous})"
  ))]
  DuplicateDeclaration {
    pos: Position,
    kind: DeclKind,
    name: String,
    previous: Position,
  },

  #[snafu(display(
    "{pos}: type mismatch in {context}: expected {}, got {actual}",
    one_of(expected)
  ))]
  TypeMismatch {
    pos: Position,
    expected: Vec<Type>,
    actual: Type,
    context: String,
  },

  #[snafu(display(
    "{pos}: array literal element has type {actual} but the elements starting at {first} are {expected}"
  ))]
  ArrayElementMismatch {
    pos: Position,
    first: Position,
    expected: Type,
    actual: Type,
  },

  #[snafu(display("{pos}: dereferencing a null pair literal"))]
  NullPairDereference { pos: Position },

  #[snafu(display(
    "{pos}: cannot apply {indices} subscript(s) to \"{name}\" of type {ty}"
  ))]
  ArrayShape {
    pos: Position,
    name: String,
    ty: Type,
    indices: usize,
  },

  #[snafu(display(
    "{pos}: function \"{name}\" expects {expected} argument(s) but was given {actual}"
  ))]
  ArityMismatch {
    pos: Position,
    name: String,
    expected: usize,
    actual: usize,
  },

  #[snafu(display("{pos}: return statement outside of a function body"))]
  ReturnOutsideFunction { pos: Position },
}

fn one_of(types: &[Type]) -> String {
  types
    .iter()
    .map(Type::to_string)
    .collect::<Vec<_>>()
    .join(" or ")
}

impl Diagnostic {
  pub fn position(&self) -> Position {
    match self {
      Diagnostic::Syntactic { pos, .. }
      | Diagnostic::UndefinedIdentifier { pos, .. }
      | Diagnostic::DuplicateDeclaration { pos, .. }
      | Diagnostic::TypeMismatch { pos, .. }
      | Diagnostic::ArrayElementMismatch { pos, .. }
      | Diagnostic::NullPairDereference { pos }
      | Diagnostic::ArrayShape { pos, .. }
      | Diagnostic::ArityMismatch { pos, .. }
      | Diagnostic::ReturnOutsideFunction { pos } => *pos,
    }
  }

  /// Malformed input is reported as a syntax error by the driver; everything else is semantic.
  pub fn is_syntactic(&self) -> bool {
    matches!(self, Diagnostic::Syntactic { .. })
  }

  pub fn mismatch(pos: Position, expected: Type, actual: Type, context: impl Into<String>) -> Self {
    Diagnostic::TypeMismatch {
      pos,
      expected: vec![expected],
      actual,
      context: context.into(),
    }
  }
}

/// Non-empty, ordered set of diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
  /// `None` when there is nothing to report.
  pub fn from_vec(diagnostics: Vec<Diagnostic>) -> Option<Self> {
    (!diagnostics.is_empty()).then_some(Self(diagnostics))
  }

  pub fn merge(mut self, other: Diagnostics) -> Self {
    self.0.extend(other.0);
    self
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
    self.0.iter()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn into_vec(self) -> Vec<Diagnostic> {
    self.0
  }

  pub fn has_syntactic(&self) -> bool {
    self.0.iter().any(Diagnostic::is_syntactic)
  }
}

impl From<Diagnostic> for Diagnostics {
  fn from(diagnostic: Diagnostic) -> Self {
    Self(vec![diagnostic])
  }
}

impl IntoIterator for Diagnostics {
  type Item = Diagnostic;
  type IntoIter = std::vec::IntoIter<Diagnostic>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.into_iter()
  }
}

impl<'a> IntoIterator for &'a Diagnostics {
  type Item = &'a Diagnostic;
  type IntoIter = std::slice::Iter<'a, Diagnostic>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

impl fmt::Display for Diagnostics {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (idx, diagnostic) in self.0.iter().enumerate() {
      if idx > 0 {
        writeln!(f)?;
      }
      write!(f, "{diagnostic}")?;
    }
    Ok(())
  }
}

pub type Parsed<T> = Result<T, Diagnostics>;

pub fn invalid<T>(diagnostic: Diagnostic) -> Parsed<T> {
  Err(diagnostic.into())
}

/// Apply `f` when both inputs succeeded, otherwise report the diagnostics of both.
pub fn combine<A, B, T>(a: Parsed<A>, b: Parsed<B>, f: impl FnOnce(A, B) -> T) -> Parsed<T> {
  match (a, b) {
    (Ok(a), Ok(b)) => Ok(f(a, b)),
    (Err(errors), Ok(_)) | (Ok(_), Err(errors)) => Err(errors),
    (Err(first), Err(second)) => Err(first.merge(second)),
  }
}

pub fn combine3<A, B, C, T>(
  a: Parsed<A>,
  b: Parsed<B>,
  c: Parsed<C>,
  f: impl FnOnce(A, B, C) -> T,
) -> Parsed<T> {
  combine(combine(a, b, |a, b| (a, b)), c, |(a, b), c| f(a, b, c))
}

/// Post-check a successful value.
pub trait Validate<T> {
  fn validate(
    self,
    predicate: impl FnOnce(&T) -> bool,
    diagnostic: impl FnOnce(&T) -> Diagnostic,
  ) -> Parsed<T>;
}

impl<T> Validate<T> for Parsed<T> {
  fn validate(
    self,
    predicate: impl FnOnce(&T) -> bool,
    diagnostic: impl FnOnce(&T) -> Diagnostic,
  ) -> Parsed<T> {
    match self {
      Ok(value) if predicate(&value) => Ok(value),
      Ok(value) => invalid(diagnostic(&value)),
      Err(errors) => Err(errors),
    }
  }
}

/// Queries over the results of independently converted children.
pub trait Outcomes<T> {
  fn all_valid(&self) -> bool;
  /// The successful values, in order. Complete only when [`all_valid`](Self::all_valid) holds.
  fn valids(self) -> Vec<T>;
  /// Every diagnostic across the children, flattened in child order.
  fn errors(&self) -> Vec<Diagnostic>;
  fn collect_all(self) -> Parsed<Vec<T>>;
}

impl<T> Outcomes<T> for Vec<Parsed<T>> {
  fn all_valid(&self) -> bool {
    self.iter().all(Result::is_ok)
  }

  fn valids(self) -> Vec<T> {
    self.into_iter().filter_map(Result::ok).collect()
  }

  fn errors(&self) -> Vec<Diagnostic> {
    self
      .iter()
      .filter_map(|parsed| parsed.as_ref().err())
      .flat_map(|errors| errors.iter().cloned())
      .collect()
  }

  fn collect_all(self) -> Parsed<Vec<T>> {
    match Diagnostics::from_vec(self.errors()) {
      Some(errors) => Err(errors),
      None => Ok(self.valids()),
    }
  }
}
