//! The data-section literal pool.
//!
//! Every inserted string gets a fresh `msg_N` label, even when the same text
//! was inserted before.

use super::{Code, Directive, Label};

/// A string literal placed in the data section as `.word length` followed by
/// its characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringData {
  pub label: Label,
  pub text: String,
  pub length: usize,
}

impl StringData {
  pub fn code(&self) -> Code {
    let mut code = Code::new();
    code.label(self.label.clone());
    code.directive(Directive::Word(i32::try_from(self.length).unwrap_or(i32::MAX)));
    code.directive(Directive::Ascii(self.text.clone()));
    code
  }
}

/// Pool of string literals for one compilation. Every insertion gets its own
/// label, even when the text repeats.
#[derive(Debug, Clone, Default)]
pub struct LiteralPool {
  entries: Vec<StringData>,
}

impl LiteralPool {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, text: impl Into<String>) -> Label {
    let text = text.into();
    let label = Label::new(format!("msg_{}", self.entries.len()));
    self.entries.push(StringData {
      label: label.clone(),
      length: text.chars().count(),
      text,
    });
    label
  }

  pub fn entries(&self) -> &[StringData] {
    &self.entries
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// The `.data` section, or nothing when the pool is empty.
  pub fn code(&self) -> Code {
    if self.entries.is_empty() {
      return Code::new();
    }
    let mut code = Code::new();
    code.directive(Directive::Data);
    for entry in &self.entries {
      code += entry.code();
    }
    code
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn repeated_text_gets_distinct_labels() {
    let mut pool = LiteralPool::new();
    let first = pool.insert("hi");
    let second = pool.insert("hi");
    assert_ne!(first, second);
    assert_eq!(pool.entries().len(), 2);
    assert!(pool.entries().iter().all(|entry| entry.text == "hi" && entry.length == 2));
  }

  #[test]
  fn renders_length_prefixed_entries() {
    let mut pool = LiteralPool::new();
    pool.insert("a\n");
    assert_eq!(
      pool.code().to_string(),
      "    .data\nmsg_0:\n    .word 2\n    .ascii \"a\\n\"\n"
    );
    assert!(LiteralPool::new().code().is_empty());
  }
}
