//! Instruction sequences that concatenate with `+` and render one line each.

use std::fmt;
use std::ops::{Add, AddAssign};

use super::{Directive, Instr, Label};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
  Instr(Instr),
  Label(Label),
  Directive(Directive),
}

impl fmt::Display for Line {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Line::Instr(instr) => write!(f, "    {instr}"),
      Line::Label(label) => write!(f, "{label}:"),
      Line::Directive(directive) => write!(f, "    {directive}"),
    }
  }
}

/// An ordered run of assembly lines. Concatenation is associative and
/// `Code::default()` is its identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Code(Vec<Line>);

impl Code {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, instr: Instr) {
    self.0.push(Line::Instr(instr));
  }

  pub fn label(&mut self, label: Label) {
    self.0.push(Line::Label(label));
  }

  pub fn directive(&mut self, directive: Directive) {
    self.0.push(Line::Directive(directive));
  }

  pub fn lines(&self) -> &[Line] {
    &self.0
  }

  /// Just the instructions, skipping labels and directives.
  pub fn instrs(&self) -> impl Iterator<Item = &Instr> {
    self.0.iter().filter_map(|line| match line {
      Line::Instr(instr) => Some(instr),
      _ => None,
    })
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl From<Instr> for Code {
  fn from(instr: Instr) -> Self {
    Self(vec![Line::Instr(instr)])
  }
}

impl FromIterator<Instr> for Code {
  fn from_iter<I: IntoIterator<Item = Instr>>(iter: I) -> Self {
    Self(iter.into_iter().map(Line::Instr).collect())
  }
}

impl Extend<Instr> for Code {
  fn extend<I: IntoIterator<Item = Instr>>(&mut self, iter: I) {
    self.0.extend(iter.into_iter().map(Line::Instr));
  }
}

impl Add for Code {
  type Output = Code;

  fn add(mut self, rhs: Code) -> Code {
    self += rhs;
    self
  }
}

impl AddAssign for Code {
  fn add_assign(&mut self, rhs: Code) {
    self.0.extend(rhs.0);
  }
}

impl fmt::Display for Code {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for line in &self.0 {
      writeln!(f, "{line}")?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::arm::Register;

  fn code(values: &[i32]) -> Code {
    values
      .iter()
      .map(|value| Instr::ldr_imm(Register::R0, *value))
      .collect()
  }

  #[test]
  fn concatenation_keeps_order_and_has_an_identity() {
    let joined = code(&[1]) + code(&[2, 3]);
    assert_eq!(joined, code(&[1, 2, 3]));
    assert_eq!(Code::new() + code(&[4]), code(&[4]));
    assert_eq!(code(&[4]) + Code::new(), code(&[4]));
    assert_eq!(
      (code(&[1]) + code(&[2])) + code(&[3]),
      code(&[1]) + (code(&[2]) + code(&[3]))
    );
  }

  #[test]
  fn renders_labels_flush_and_instructions_indented() {
    let mut code = Code::new();
    code.label(Label::new("main"));
    code.push(Instr::bl("exit"));
    assert_eq!(code.to_string(), "main:\n    BL exit\n");
    assert_eq!(code.instrs().count(), 1);
  }
}
