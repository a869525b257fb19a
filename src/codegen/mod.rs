//! Code generation: lower the typed AST into ARM assembly.
//!
//! There is no register allocator. Every expression is evaluated into a
//! destination register (always `r0` in practice) and intermediate values
//! live on the machine stack: a binary operator evaluates its left operand,
//! pushes it, evaluates the right operand and pops the left one into `ip`.
//! Locals and parameters are addressed relative to `fp`.
//!
//! Runtime support routines are emitted only when some lowering asked for
//! them; see [`runtime`].

mod expr;
mod runtime;
mod stat;

use std::collections::BTreeSet;
use std::fmt;

use snafu::{ResultExt, Snafu};

use crate::arm::{
  AddrMode2, AddrModeError, Code, Directive, Immed12, Instr, Label, LiteralPool, Register,
};
use crate::ast::Func;
use crate::scope::{FrameId, Storage, SymbolTable, VarId};
use crate::semantic::Analysis;

pub use runtime::Routine;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CodegenError {
  #[snafu(display("cannot address {what}: {source}"))]
  Addressing {
    what: String,
    source: AddrModeError,
  },
}

pub type CodegenResult<T> = Result<T, CodegenError>;

/// Generated program: the data-section literal pool plus the text section.
#[derive(Debug, Clone)]
pub struct Assembly {
  pub data: LiteralPool,
  pub text: Code,
}

impl fmt::Display for Assembly {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if !self.data.is_empty() {
      writeln!(f, "{}", self.data.code())?;
    }
    writeln!(f, "    {}", Directive::Text)?;
    writeln!(f, "    {}", Directive::Global(Label::new("main")))?;
    write!(f, "{}", self.text)
  }
}

/// Lower a checked program. User functions come first, then `main`, then
/// whichever runtime routines the program needs.
pub fn generate(analysis: &Analysis) -> CodegenResult<Assembly> {
  let mut emitter = Emitter::new(&analysis.symbols);
  let mut text = Code::new();

  for func in &analysis.program.funcs {
    text += emitter.emit_func(func)?;
  }

  text.label(Label::new("main"));
  text += emitter.prologue(FrameId::MAIN);
  text += emitter.emit_stat(&analysis.program.body)?;
  text.push(Instr::ldr_imm(Register::RET, 0));
  text += epilogue();
  text.directive(Directive::Ltorg);

  text += emitter.emit_runtime();
  Ok(Assembly {
    data: emitter.pool,
    text,
  })
}

/// Lowering context for one compilation.
pub struct Emitter<'a> {
  symbols: &'a SymbolTable,
  pool: LiteralPool,
  labels: usize,
  runtime: BTreeSet<Routine>,
}

impl<'a> Emitter<'a> {
  pub fn new(symbols: &'a SymbolTable) -> Self {
    Self {
      symbols,
      pool: LiteralPool::new(),
      labels: 0,
      runtime: BTreeSet::new(),
    }
  }

  pub fn pool(&self) -> &LiteralPool {
    &self.pool
  }

  fn fresh_label(&mut self) -> Label {
    let label = Label::new(format!("L{}", self.labels));
    self.labels += 1;
    label
  }

  /// `BL` to a runtime routine, recording that it must be emitted.
  fn call(&mut self, routine: Routine) -> Instr {
    self.runtime.insert(routine);
    Instr::bl(routine.label())
  }

  fn emit_func(&mut self, func: &Func) -> CodegenResult<Code> {
    let mut code = Code::new();
    code.label(function_label(&func.name));
    code += self.prologue(self.symbols.frame_of(func.scope));
    // every path ends in return or exit, which emit their own epilogue
    code += self.emit_stat(&func.body)?;
    code.directive(Directive::Ltorg);
    Ok(code)
  }

  fn prologue(&self, frame: FrameId) -> Code {
    let mut code: Code = [
      Instr::push(&[Register::Fp, Register::Lr]),
      Instr::mov(Register::Fp, Register::Sp),
    ]
    .into_iter()
    .collect();
    match self.symbols.frame_size(frame) {
      0 => {}
      size if size <= 1020 => code.push(Instr::sub(Register::Sp, Register::Sp, size)),
      size => code.extend([
        Instr::ldr_imm(Register::SCRATCH, size),
        Instr::sub(Register::Sp, Register::Sp, Register::SCRATCH),
      ]),
    }
    code
  }

  /// `fp`-relative offset of a local or parameter.
  fn var_offset(&self, var: VarId) -> CodegenResult<Immed12> {
    let variable = self.symbols.variable(var);
    let offset = match variable.storage {
      Storage::Local { slot } => -4 * (slot as i64 + 1),
      Storage::Param { ordinal } => 8 + 4 * ordinal as i64,
    };
    let offset = i32::try_from(offset).unwrap_or(i32::MIN);
    Immed12::new(offset).context(AddressingSnafu {
      what: format!("variable \"{}\"", variable.name),
    })
  }

  fn var_addr(&self, var: VarId) -> CodegenResult<AddrMode2> {
    Ok(AddrMode2::ImmOffset {
      rn: Register::Fp,
      imm: self.var_offset(var)?,
    })
  }
}

pub(crate) fn function_label(name: &str) -> Label {
  Label::new(format!("f_{name}"))
}

pub(crate) fn epilogue() -> Code {
  [
    Instr::mov(Register::Sp, Register::Fp),
    Instr::pop(&[Register::Fp, Register::Pc]),
  ]
  .into_iter()
  .collect()
}

/// `MOV rd, rs`, or nothing when they are the same register.
pub(crate) fn move_reg(rd: Register, rs: Register) -> Code {
  if rd == rs {
    Code::new()
  } else {
    Instr::mov(rd, rs).into()
  }
}
