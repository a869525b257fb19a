//! Load/store addressing modes and the 12-bit immediate offset they carry.

use std::fmt;

use snafu::{Snafu, ensure};

use super::{Label, Register};

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum AddrModeError {
  #[snafu(display(
    "offset {offset} does not fit in a 12-bit immediate (must be within ±{})",
    Immed12::MAX
  ))]
  OffsetOutOfRange { offset: i32 },
}

/// Signed immediate offset that fits the 12-bit field of a load or store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Immed12(i32);

impl Immed12 {
  pub const MAX: i32 = 4095;
  pub const ZERO: Immed12 = Immed12(0);

  pub fn new(offset: i32) -> Result<Self, AddrModeError> {
    ensure!(
      (-Self::MAX..=Self::MAX).contains(&offset),
      OffsetOutOfRangeSnafu { offset }
    );
    Ok(Self(offset))
  }

  pub fn value(self) -> i32 {
    self.0
  }
}

impl TryFrom<i32> for Immed12 {
  type Error = AddrModeError;

  fn try_from(offset: i32) -> Result<Self, Self::Error> {
    Self::new(offset)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
  Plus,
  Minus,
}

/// Addressing modes of single-register loads and stores.
///
/// `Imm32` and `Label` are the assembler's `=` pseudo forms: the value or
/// address is placed in a literal pool and loaded PC-relative. They are only
/// meaningful for loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddrMode2 {
  /// `[rn, #imm]`; a zero offset renders as `[rn]`.
  ImmOffset { rn: Register, imm: Immed12 },
  /// `[rn, ±rm]`.
  RegOffset {
    rn: Register,
    sign: Sign,
    rm: Register,
  },
  /// `[rn, #imm]!`: the effective address is written back to `rn`.
  PreIndexed { rn: Register, imm: Immed12 },
  /// `[rn], #imm`: access at `rn`, then add `imm` to it.
  PostIndexed { rn: Register, imm: Immed12 },
  Imm32(i32),
  Label(Label),
}

impl AddrMode2 {
  pub fn zero_offset(rn: Register) -> Self {
    AddrMode2::ImmOffset {
      rn,
      imm: Immed12::ZERO,
    }
  }

  pub fn imm_offset(rn: Register, offset: i32) -> Result<Self, AddrModeError> {
    Ok(AddrMode2::ImmOffset {
      rn,
      imm: Immed12::new(offset)?,
    })
  }

  pub fn reg_offset(rn: Register, sign: Sign, rm: Register) -> Self {
    AddrMode2::RegOffset { rn, sign, rm }
  }

  pub fn pre_indexed(rn: Register, offset: i32) -> Result<Self, AddrModeError> {
    Ok(AddrMode2::PreIndexed {
      rn,
      imm: Immed12::new(offset)?,
    })
  }

  pub fn post_indexed(rn: Register, offset: i32) -> Result<Self, AddrModeError> {
    Ok(AddrMode2::PostIndexed {
      rn,
      imm: Immed12::new(offset)?,
    })
  }

  /// Base register updated by the access, if any.
  pub fn written_back(&self) -> Option<Register> {
    match self {
      AddrMode2::PreIndexed { rn, .. } | AddrMode2::PostIndexed { rn, .. } => Some(*rn),
      _ => None,
    }
  }
}

impl fmt::Display for AddrMode2 {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AddrMode2::ImmOffset { rn, imm } if imm.value() == 0 => write!(f, "[{rn}]"),
      AddrMode2::ImmOffset { rn, imm } => write!(f, "[{rn}, #{}]", imm.value()),
      AddrMode2::RegOffset {
        rn,
        sign: Sign::Plus,
        rm,
      } => write!(f, "[{rn}, {rm}]"),
      AddrMode2::RegOffset {
        rn,
        sign: Sign::Minus,
        rm,
      } => write!(f, "[{rn}, -{rm}]"),
      AddrMode2::PreIndexed { rn, imm } => write!(f, "[{rn}, #{}]!", imm.value()),
      AddrMode2::PostIndexed { rn, imm } => write!(f, "[{rn}], #{}", imm.value()),
      AddrMode2::Imm32(value) => write!(f, "={value}"),
      AddrMode2::Label(label) => write!(f, "={label}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_offset_is_the_same_as_explicit_zero() {
    let explicit = AddrMode2::imm_offset(Register::R4, 0).unwrap();
    assert_eq!(AddrMode2::zero_offset(Register::R4), explicit);
    assert_eq!(explicit.to_string(), "[r4]");
  }

  #[test]
  fn offsets_outside_twelve_bits_are_rejected() {
    assert!(Immed12::new(4095).is_ok());
    assert!(Immed12::new(-4095).is_ok());
    assert_eq!(
      Immed12::new(4096),
      Err(AddrModeError::OffsetOutOfRange { offset: 4096 })
    );
    assert!(AddrMode2::pre_indexed(Register::Sp, -5000).is_err());
  }

  #[test]
  fn renders_every_form() {
    assert_eq!(AddrMode2::imm_offset(Register::Fp, -8).unwrap().to_string(), "[fp, #-8]");
    assert_eq!(
      AddrMode2::reg_offset(Register::R1, Sign::Minus, Register::R2).to_string(),
      "[r1, -r2]"
    );
    assert_eq!(AddrMode2::post_indexed(Register::Sp, 4).unwrap().to_string(), "[sp], #4");
    assert_eq!(AddrMode2::Imm32(-3).to_string(), "=-3");
    assert_eq!(AddrMode2::Label(Label::new("msg_1")).to_string(), "=msg_1");
  }
}
