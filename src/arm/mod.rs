//! ARM instruction model used by code generation.
//!
//! Instructions are plain values: built once during lowering, concatenated
//! into [`Code`], and only turned into text when the final assembly is
//! rendered.

mod addr_mode;
mod code;
mod string_data;

use std::fmt;

pub use addr_mode::{AddrMode2, AddrModeError, Immed12, Sign};
pub use code::{Code, Line};
pub use string_data::{LiteralPool, StringData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Register {
  R0,
  R1,
  R2,
  R3,
  R4,
  R5,
  R6,
  R7,
  R8,
  R9,
  R10,
  Fp,
  Ip,
  Sp,
  Lr,
  Pc,
}

impl Register {
  /// Holds return values and the first argument of runtime calls.
  pub const RET: Register = Register::R0;
  /// Left operand of a binary operation once it has been popped.
  pub const SCRATCH: Register = Register::Ip;
}

impl fmt::Display for Register {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Register::R0 => "r0",
      Register::R1 => "r1",
      Register::R2 => "r2",
      Register::R3 => "r3",
      Register::R4 => "r4",
      Register::R5 => "r5",
      Register::R6 => "r6",
      Register::R7 => "r7",
      Register::R8 => "r8",
      Register::R9 => "r9",
      Register::R10 => "r10",
      Register::Fp => "fp",
      Register::Ip => "ip",
      Register::Sp => "sp",
      Register::Lr => "lr",
      Register::Pc => "pc",
    };
    f.write_str(name)
  }
}

/// Execution condition attached to an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cond {
  Eq,
  Ne,
  Cs,
  Cc,
  Vs,
  Vc,
  Ge,
  Lt,
  Gt,
  Le,
}

impl Cond {
  /// The condition that holds exactly when `self` does not.
  pub fn negate(self) -> Cond {
    match self {
      Cond::Eq => Cond::Ne,
      Cond::Ne => Cond::Eq,
      Cond::Ge => Cond::Lt,
      Cond::Lt => Cond::Ge,
      Cond::Gt => Cond::Le,
      Cond::Le => Cond::Gt,
      Cond::Cs => Cond::Cc,
      Cond::Cc => Cond::Cs,
      Cond::Vs => Cond::Vc,
      Cond::Vc => Cond::Vs,
    }
  }
}

impl fmt::Display for Cond {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Cond::Eq => "EQ",
      Cond::Ne => "NE",
      Cond::Cs => "CS",
      Cond::Cc => "CC",
      Cond::Vs => "VS",
      Cond::Vc => "VC",
      Cond::Ge => "GE",
      Cond::Lt => "LT",
      Cond::Gt => "GT",
      Cond::Le => "LE",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(String);

impl Label {
  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }
}

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for Label {
  fn from(name: &str) -> Self {
    Self::new(name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
  Lsl(u8),
  Asr(u8),
}

/// Flexible second operand of data-processing instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand2 {
  Imm(i32),
  Reg(Register),
  Shifted(Register, Shift),
}

impl Operand2 {
  /// Whether `imm` fits the immediate form: an 8-bit value rotated right by an even amount.
  pub fn is_encodable(imm: i32) -> bool {
    let bits = imm as u32;
    (0..16).any(|rot| bits.rotate_left(2 * rot) <= 0xff)
  }
}

impl From<Register> for Operand2 {
  fn from(reg: Register) -> Self {
    Operand2::Reg(reg)
  }
}

impl From<i32> for Operand2 {
  fn from(imm: i32) -> Self {
    Operand2::Imm(imm)
  }
}

impl fmt::Display for Operand2 {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Operand2::Imm(imm) => write!(f, "#{imm}"),
      Operand2::Reg(reg) => write!(f, "{reg}"),
      Operand2::Shifted(reg, Shift::Lsl(amount)) => write!(f, "{reg}, LSL #{amount}"),
      Operand2::Shifted(reg, Shift::Asr(amount)) => write!(f, "{reg}, ASR #{amount}"),
    }
  }
}

/// Transfer width of loads and stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
  Word,
  Byte,
  SignedByte,
}

impl Width {
  /// Width used to load a value of `size` bytes.
  pub fn load(size: i32) -> Self {
    if size == 1 { Width::SignedByte } else { Width::Word }
  }

  /// Width used to store a value of `size` bytes.
  pub fn store(size: i32) -> Self {
    if size == 1 { Width::Byte } else { Width::Word }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOp {
  Add,
  Sub,
  Rsb,
  And,
  Orr,
  Eor,
}

impl fmt::Display for DataOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      DataOp::Add => "ADD",
      DataOp::Sub => "SUB",
      DataOp::Rsb => "RSB",
      DataOp::And => "AND",
      DataOp::Orr => "ORR",
      DataOp::Eor => "EOR",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
  Ldr {
    width: Width,
    rd: Register,
    addr: AddrMode2,
  },
  Str {
    width: Width,
    rd: Register,
    addr: AddrMode2,
  },
  Mov {
    rd: Register,
    src: Operand2,
  },
  Data {
    op: DataOp,
    set_flags: bool,
    rd: Register,
    rn: Register,
    src: Operand2,
  },
  Cmp {
    rn: Register,
    src: Operand2,
  },
  Smull {
    rd_lo: Register,
    rd_hi: Register,
    rn: Register,
    rm: Register,
  },
  B(Label),
  Bl(Label),
  Push(Vec<Register>),
  Pop(Vec<Register>),
}

/// An instruction with an optional execution condition; `None` runs unconditionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instr {
  pub cond: Option<Cond>,
  pub op: Op,
}

impl From<Op> for Instr {
  fn from(op: Op) -> Self {
    Self { cond: None, op }
  }
}

impl Instr {
  /// Make this instruction conditional on `cond`.
  pub fn when(mut self, cond: Cond) -> Self {
    self.cond = Some(cond);
    self
  }

  pub fn ldr(rd: Register, addr: AddrMode2) -> Self {
    Self::load(Width::Word, rd, addr)
  }

  pub fn load(width: Width, rd: Register, addr: AddrMode2) -> Self {
    Op::Ldr { width, rd, addr }.into()
  }

  /// `LDR rd, =value`: materialise any 32-bit constant.
  pub fn ldr_imm(rd: Register, value: i32) -> Self {
    Self::ldr(rd, AddrMode2::Imm32(value))
  }

  /// `LDR rd, =label`: load the address of `label`.
  pub fn ldr_label(rd: Register, label: Label) -> Self {
    Self::ldr(rd, AddrMode2::Label(label))
  }

  pub fn store(width: Width, rd: Register, addr: AddrMode2) -> Self {
    Op::Str { width, rd, addr }.into()
  }

  pub fn str(rd: Register, addr: AddrMode2) -> Self {
    Self::store(Width::Word, rd, addr)
  }

  pub fn mov(rd: Register, src: impl Into<Operand2>) -> Self {
    Op::Mov {
      rd,
      src: src.into(),
    }
    .into()
  }

  pub fn data(op: DataOp, rd: Register, rn: Register, src: impl Into<Operand2>) -> Self {
    Op::Data {
      op,
      set_flags: false,
      rd,
      rn,
      src: src.into(),
    }
    .into()
  }

  /// Like [`Instr::data`] but also updates the condition flags.
  pub fn data_s(op: DataOp, rd: Register, rn: Register, src: impl Into<Operand2>) -> Self {
    Op::Data {
      op,
      set_flags: true,
      rd,
      rn,
      src: src.into(),
    }
    .into()
  }

  pub fn add(rd: Register, rn: Register, src: impl Into<Operand2>) -> Self {
    Self::data(DataOp::Add, rd, rn, src)
  }

  pub fn sub(rd: Register, rn: Register, src: impl Into<Operand2>) -> Self {
    Self::data(DataOp::Sub, rd, rn, src)
  }

  pub fn cmp(rn: Register, src: impl Into<Operand2>) -> Self {
    Op::Cmp {
      rn,
      src: src.into(),
    }
    .into()
  }

  pub fn smull(rd_lo: Register, rd_hi: Register, rn: Register, rm: Register) -> Self {
    Op::Smull {
      rd_lo,
      rd_hi,
      rn,
      rm,
    }
    .into()
  }

  pub fn b(label: impl Into<Label>) -> Self {
    Op::B(label.into()).into()
  }

  pub fn bl(label: impl Into<Label>) -> Self {
    Op::Bl(label.into()).into()
  }

  pub fn push(regs: &[Register]) -> Self {
    Op::Push(regs.to_vec()).into()
  }

  pub fn pop(regs: &[Register]) -> Self {
    Op::Pop(regs.to_vec()).into()
  }

  /// Registers whose value the instruction changes as a side effect of addressing.
  pub fn written_back(&self) -> Option<Register> {
    match &self.op {
      Op::Ldr { addr, .. } | Op::Str { addr, .. } => addr.written_back(),
      _ => None,
    }
  }
}

fn register_list(regs: &[Register]) -> String {
  regs
    .iter()
    .map(Register::to_string)
    .collect::<Vec<_>>()
    .join(", ")
}

impl fmt::Display for Instr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let cond = self.cond.map(|cond| cond.to_string()).unwrap_or_default();
    match &self.op {
      Op::Ldr { width, rd, addr } => {
        let suffix = match width {
          Width::Word => "",
          Width::Byte => "B",
          Width::SignedByte => "SB",
        };
        write!(f, "LDR{suffix}{cond} {rd}, {addr}")
      }
      Op::Str { width, rd, addr } => {
        let suffix = match width {
          Width::Word => "",
          Width::Byte | Width::SignedByte => "B",
        };
        write!(f, "STR{suffix}{cond} {rd}, {addr}")
      }
      Op::Mov { rd, src } => write!(f, "MOV{cond} {rd}, {src}"),
      Op::Data {
        op,
        set_flags,
        rd,
        rn,
        src,
      } => {
        let s = if *set_flags { "S" } else { "" };
        write!(f, "{op}{s}{cond} {rd}, {rn}, {src}")
      }
      Op::Cmp { rn, src } => write!(f, "CMP{cond} {rn}, {src}"),
      Op::Smull {
        rd_lo,
        rd_hi,
        rn,
        rm,
      } => write!(f, "SMULL{cond} {rd_lo}, {rd_hi}, {rn}, {rm}"),
      Op::B(label) => write!(f, "B{cond} {label}"),
      Op::Bl(label) => write!(f, "BL{cond} {label}"),
      Op::Push(regs) => write!(f, "PUSH{cond} {{{}}}", register_list(regs)),
      Op::Pop(regs) => write!(f, "POP{cond} {{{}}}", register_list(regs)),
    }
  }
}

/// Assembler directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
  Data,
  Text,
  Global(Label),
  Word(i32),
  Ascii(String),
  Ltorg,
}

/// Escape `text` for a GNU as `.ascii` string.
pub fn escape_ascii(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '\0' => out.push_str("\\0"),
      '\u{8}' => out.push_str("\\b"),
      '\t' => out.push_str("\\t"),
      '\n' => out.push_str("\\n"),
      '\u{c}' => out.push_str("\\f"),
      '\r' => out.push_str("\\r"),
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      other => out.push(other),
    }
  }
  out
}

impl fmt::Display for Directive {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Directive::Data => f.write_str(".data"),
      Directive::Text => f.write_str(".text"),
      Directive::Global(label) => write!(f, ".global {label}"),
      Directive::Word(value) => write!(f, ".word {value}"),
      Directive::Ascii(text) => write!(f, ".ascii \"{}\"", escape_ascii(text)),
      Directive::Ltorg => f.write_str(".ltorg"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn conditions_render_after_the_mnemonic() {
    let instr = Instr::ldr_label(Register::R0, Label::new("msg_0")).when(Cond::Ne);
    assert_eq!(instr.to_string(), "LDRNE r0, =msg_0");
    assert_eq!(Instr::bl("p_throw_overflow_error").when(Cond::Vs).to_string(), "BLVS p_throw_overflow_error");
  }

  #[test]
  fn data_processing_renders_flags_and_shifts() {
    let adds = Instr::data_s(DataOp::Add, Register::R4, Register::Ip, Register::R4);
    assert_eq!(adds.to_string(), "ADDS r4, ip, r4");
    let scaled = Instr::add(Register::R4, Register::R1, Operand2::Shifted(Register::R0, Shift::Lsl(2)));
    assert_eq!(scaled.to_string(), "ADD r4, r1, r0, LSL #2");
    assert_eq!(
      Instr::push(&[Register::Fp, Register::Lr]).to_string(),
      "PUSH {fp, lr}"
    );
  }

  #[test]
  fn rotated_immediates_are_recognised() {
    for imm in [0, 255, 1020, 1024, 0xff00_0000u32 as i32, 0xf000_000f_u32 as i32] {
      assert!(Operand2::is_encodable(imm), "{imm:#x}");
    }
    for imm in [257, 1028, 4092, -1] {
      assert!(!Operand2::is_encodable(imm), "{imm:#x}");
    }
  }

  #[test]
  fn byte_transfers_pick_their_suffix() {
    let addr = AddrMode2::zero_offset(Register::R1);
    assert_eq!(Instr::load(Width::load(1), Register::R0, addr.clone()).to_string(), "LDRSB r0, [r1]");
    assert_eq!(Instr::store(Width::store(1), Register::R0, addr).to_string(), "STRB r0, [r1]");
  }

  #[test]
  fn pre_indexed_store_reports_write_back() {
    let push_arg = Instr::str(Register::R0, AddrMode2::pre_indexed(Register::Sp, -4).unwrap());
    assert_eq!(push_arg.to_string(), "STR r0, [sp, #-4]!");
    assert_eq!(push_arg.written_back(), Some(Register::Sp));
    assert_eq!(Instr::ldr_imm(Register::R0, 7).written_back(), None);
  }

  #[test]
  fn ascii_escapes_round_trip_special_characters() {
    let directive = Directive::Ascii("a\"b\\\n\0".to_string());
    assert_eq!(directive.to_string(), ".ascii \"a\\\"b\\\\\\n\\0\"");
  }
}
