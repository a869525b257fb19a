//! Semantic types and their compatibility rules.
//!
//! `AnyPair` and `EmptyArray` are placeholders produced by `null` and `[]`
//! before the use site pins down a concrete shape, so compatibility is
//! checked with [`Type::matches`] rather than `==`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
  Int,
  Bool,
  Char,
  String,
  Pair(Box<Type>, Box<Type>),
  Array { elem: Box<Type>, depth: usize },
  AnyPair,
  EmptyArray,
}

/// Which half of a pair an accessor reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairAccessor {
  Fst,
  Snd,
}

impl PairAccessor {
  /// Byte offset of the element inside the heap-allocated pair block.
  pub fn offset(self) -> i32 {
    match self {
      PairAccessor::Fst => 0,
      PairAccessor::Snd => 4,
    }
  }
}

impl fmt::Display for PairAccessor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PairAccessor::Fst => f.write_str("fst"),
      PairAccessor::Snd => f.write_str("snd"),
    }
  }
}

impl Type {
  pub fn pair(fst: Type, snd: Type) -> Self {
    Self::Pair(Box::new(fst), Box::new(snd))
  }

  /// Build an array type, folding nested arrays into a single depth.
  pub fn array(elem: Type, depth: usize) -> Self {
    debug_assert!(depth >= 1, "array depth must be at least one");
    match elem {
      Type::Array {
        elem: inner,
        depth: inner_depth,
      } => Type::Array {
        elem: inner,
        depth: inner_depth + depth,
      },
      other => Type::Array {
        elem: Box::new(other),
        depth,
      },
    }
  }

  /// Assignment compatibility. Placeholders match any value of their shape;
  /// everything else compares structurally.
  pub fn matches(&self, other: &Type) -> bool {
    match (self, other) {
      (Type::AnyPair, Type::AnyPair | Type::Pair(..))
      | (Type::Pair(..), Type::AnyPair) => true,
      (Type::EmptyArray, Type::EmptyArray | Type::Array { .. })
      | (Type::Array { .. }, Type::EmptyArray) => true,
      (Type::Pair(f1, s1), Type::Pair(f2, s2)) => f1.matches(f2) && s1.matches(s2),
      (Type::Array { .. }, Type::Array { .. }) => match (self.peel(), other.peel()) {
        (Some(a), Some(b)) => a.matches(&b),
        _ => false,
      },
      _ => self == other,
    }
  }

  pub fn is_pair_like(&self) -> bool {
    matches!(self, Type::Pair(..) | Type::AnyPair)
  }

  pub fn is_array_like(&self) -> bool {
    matches!(self, Type::Array { .. } | Type::EmptyArray)
  }

  /// Whether this is a placeholder rather than a fully known type.
  pub fn is_placeholder(&self) -> bool {
    matches!(self, Type::AnyPair | Type::EmptyArray)
  }

  /// The type reached after applying `count` subscripts, if the array is deep enough.
  pub fn index(&self, count: usize) -> Option<Type> {
    let Type::Array { elem, depth } = self else {
      return (count == 0).then(|| self.clone());
    };
    if count < *depth {
      Some(Type::Array {
        elem: elem.clone(),
        depth: depth - count,
      })
    } else if count == *depth {
      Some((**elem).clone())
    } else {
      None
    }
  }

  /// Element type of a pair. An unconstrained pair has unconstrained parts.
  pub fn pair_elem(&self, accessor: PairAccessor) -> Option<Type> {
    match (self, accessor) {
      (Type::Pair(fst, _), PairAccessor::Fst) => Some((**fst).clone()),
      (Type::Pair(_, snd), PairAccessor::Snd) => Some((**snd).clone()),
      (Type::AnyPair, _) => Some(Type::AnyPair),
      _ => None,
    }
  }

  /// Storage size in bytes when held in memory.
  pub fn size(&self) -> i32 {
    match self {
      Type::Bool | Type::Char => 1,
      _ => 4,
    }
  }

  fn peel(&self) -> Option<Type> {
    self.index(1)
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Type::Int => f.write_str("int"),
      Type::Bool => f.write_str("bool"),
      Type::Char => f.write_str("char"),
      Type::String => f.write_str("string"),
      Type::Pair(fst, snd) => write!(f, "pair({fst}, {snd})"),
      Type::Array { elem, depth } => write!(f, "{elem}{}", "[]".repeat(*depth)),
      Type::AnyPair => f.write_str("pair"),
      Type::EmptyArray => f.write_str("array"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn concrete() -> Vec<Type> {
    vec![
      Type::Int,
      Type::Bool,
      Type::Char,
      Type::String,
      Type::pair(Type::Int, Type::Char),
      Type::array(Type::Int, 1),
      Type::array(Type::Char, 2),
    ]
  }

  #[test]
  fn nested_arrays_fold_into_depth() {
    let nested = Type::array(Type::array(Type::Int, 1), 1);
    assert_eq!(nested, Type::array(Type::Int, 2));
    assert_eq!(nested.to_string(), "int[][]");
  }

  #[test]
  fn empty_array_matches_only_arrays() {
    for ty in concrete() {
      assert_eq!(Type::EmptyArray.matches(&ty), ty.is_array_like(), "{ty}");
      assert_eq!(ty.matches(&Type::EmptyArray), ty.is_array_like(), "{ty}");
    }
  }

  #[test]
  fn any_pair_matches_only_pairs() {
    for ty in concrete() {
      assert_eq!(Type::AnyPair.matches(&ty), ty.is_pair_like(), "{ty}");
    }
    let nested = Type::pair(Type::pair(Type::Int, Type::Int), Type::Bool);
    assert!(nested.matches(&Type::pair(Type::AnyPair, Type::Bool)));
    assert!(!nested.matches(&Type::pair(Type::AnyPair, Type::Int)));
  }

  #[test]
  fn arrays_compare_by_element_and_depth() {
    assert!(!Type::array(Type::Int, 1).matches(&Type::array(Type::Int, 2)));
    assert!(!Type::array(Type::Int, 1).matches(&Type::array(Type::Char, 1)));
    let partially_empty = Type::array(Type::EmptyArray, 1);
    assert!(partially_empty.matches(&Type::array(Type::Int, 2)));
    assert!(!partially_empty.matches(&Type::array(Type::Int, 1)));
  }

  #[test]
  fn indexing_reduces_depth() {
    let ty = Type::array(Type::Char, 2);
    assert_eq!(ty.index(1), Some(Type::array(Type::Char, 1)));
    assert_eq!(ty.index(2), Some(Type::Char));
    assert_eq!(ty.index(3), None);
    assert_eq!(Type::Int.index(1), None);
  }

  #[test]
  fn pair_elements_resolve_through_placeholders() {
    let ty = Type::pair(Type::Int, Type::Char);
    assert_eq!(ty.pair_elem(PairAccessor::Fst), Some(Type::Int));
    assert_eq!(ty.pair_elem(PairAccessor::Snd), Some(Type::Char));
    assert_eq!(Type::AnyPair.pair_elem(PairAccessor::Snd), Some(Type::AnyPair));
    assert_eq!(Type::Int.pair_elem(PairAccessor::Fst), None);
  }
}
