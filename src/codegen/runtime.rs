//! Runtime support routines linked into every program that needs them.
//!
//! Each routine follows the same calling convention as user code: arguments
//! in `r0`/`r1`, `lr` saved on entry and restored into `pc` on exit. The
//! checks leave their arguments untouched when they pass.

use crate::arm::{AddrMode2, Code, Cond, Instr, Label, Register};

use super::Emitter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Routine {
  PrintInt,
  PrintBool,
  PrintString,
  PrintReference,
  PrintLn,
  ReadInt,
  ReadChar,
  FreePair,
  CheckNullPointer,
  CheckArrayBounds,
  CheckDivideByZero,
  ThrowOverflowError,
  ThrowRuntimeError,
}

impl Routine {
  pub fn label(self) -> Label {
    Label::new(match self {
      Routine::PrintInt => "p_print_int",
      Routine::PrintBool => "p_print_bool",
      Routine::PrintString => "p_print_string",
      Routine::PrintReference => "p_print_reference",
      Routine::PrintLn => "p_print_ln",
      Routine::ReadInt => "p_read_int",
      Routine::ReadChar => "p_read_char",
      Routine::FreePair => "p_free_pair",
      Routine::CheckNullPointer => "p_check_null_pointer",
      Routine::CheckArrayBounds => "p_check_array_bounds",
      Routine::CheckDivideByZero => "p_check_divide_by_zero",
      Routine::ThrowOverflowError => "p_throw_overflow_error",
      Routine::ThrowRuntimeError => "p_throw_runtime_error",
    })
  }

  /// Routines this one branches to.
  pub fn dependencies(self) -> &'static [Routine] {
    match self {
      Routine::FreePair
      | Routine::CheckNullPointer
      | Routine::CheckArrayBounds
      | Routine::CheckDivideByZero
      | Routine::ThrowOverflowError => &[Routine::ThrowRuntimeError],
      Routine::ThrowRuntimeError => &[Routine::PrintString],
      _ => &[],
    }
  }
}

/// Close `requested` under [`Routine::dependencies`].
pub fn with_dependencies(requested: impl IntoIterator<Item = Routine>) -> Vec<Routine> {
  let mut pending: Vec<Routine> = requested.into_iter().collect();
  let mut all = std::collections::BTreeSet::new();
  while let Some(routine) = pending.pop() {
    if all.insert(routine) {
      pending.extend_from_slice(routine.dependencies());
    }
  }
  all.into_iter().collect()
}

const R0: Register = Register::R0;
const R1: Register = Register::R1;
const R2: Register = Register::R2;

fn enter() -> Instr {
  Instr::push(&[Register::Lr])
}

fn leave() -> Instr {
  Instr::pop(&[Register::Pc])
}

impl Emitter<'_> {
  /// Text for every routine requested during lowering, plus dependencies.
  pub(super) fn emit_runtime(&mut self) -> Code {
    let mut code = Code::new();
    for routine in with_dependencies(self.runtime.clone()) {
      code.label(routine.label());
      code += self.routine_body(routine);
    }
    code
  }

  /// `LDR r0, =fmt; ADD r0, r0, #4`: a C string stored after its length word.
  fn format_string(&mut self, text: &str) -> Code {
    let label = self.pool.insert(format!("{text}\0"));
    [
      Instr::ldr_label(R0, label),
      Instr::add(R0, R0, 4),
    ]
    .into_iter()
    .collect()
  }

  fn flush() -> Code {
    [Instr::mov(R0, 0), Instr::bl("fflush")].into_iter().collect()
  }

  fn routine_body(&mut self, routine: Routine) -> Code {
    let mut code = Code::from(enter());
    match routine {
      Routine::PrintInt | Routine::PrintReference => {
        let format = if routine == Routine::PrintInt { "%d" } else { "%p" };
        code.push(Instr::mov(R1, R0));
        code += self.format_string(format);
        code.push(Instr::bl("printf"));
        code += Self::flush();
      }
      Routine::PrintBool => {
        let yes = self.pool.insert("true\0");
        let no = self.pool.insert("false\0");
        code.extend([
          Instr::cmp(R0, 0),
          Instr::ldr_label(R0, yes).when(Cond::Ne),
          Instr::ldr_label(R0, no).when(Cond::Eq),
          Instr::add(R0, R0, 4),
          Instr::bl("printf"),
        ]);
        code += Self::flush();
      }
      Routine::PrintString => {
        code.extend([
          Instr::ldr(R1, AddrMode2::zero_offset(R0)),
          Instr::add(R2, R0, 4),
        ]);
        code += self.format_string("%.*s");
        code.push(Instr::bl("printf"));
        code += Self::flush();
      }
      Routine::PrintLn => {
        code += self.format_string("");
        code.push(Instr::bl("puts"));
        code += Self::flush();
      }
      Routine::ReadInt | Routine::ReadChar => {
        let format = if routine == Routine::ReadInt { "%d" } else { " %c" };
        code.push(Instr::mov(R1, R0));
        code += self.format_string(format);
        code.push(Instr::bl("scanf"));
      }
      Routine::FreePair => {
        code += self.fail_when(Cond::Eq, R0, "NullReferenceError: dereference a null reference\n");
        code.push(Instr::bl("free"));
      }
      Routine::CheckNullPointer => {
        code += self.fail_when(Cond::Eq, R0, "NullReferenceError: dereference a null reference\n");
      }
      Routine::CheckDivideByZero => {
        code += self.fail_when(Cond::Eq, R1, "DivideByZeroError: divide or modulo by zero\n");
      }
      Routine::CheckArrayBounds => {
        // r0 = index, r1 = array
        let negative = self.pool.insert("ArrayIndexOutOfBoundsError: negative index\n");
        let too_large = self.pool.insert("ArrayIndexOutOfBoundsError: index too large\n");
        let throw = self.call(Routine::ThrowRuntimeError);
        code.extend([
          Instr::cmp(R0, 0),
          Instr::ldr_label(R0, negative).when(Cond::Lt),
          throw.clone().when(Cond::Lt),
          Instr::ldr(R2, AddrMode2::zero_offset(R1)),
          Instr::cmp(R0, R2),
          Instr::ldr_label(R0, too_large).when(Cond::Cs),
          throw.when(Cond::Cs),
        ]);
      }
      Routine::ThrowOverflowError => {
        let message = self.pool.insert(
          "OverflowError: the result is too small/large to store in a 4-byte signed-integer.\n",
        );
        code.extend([
          Instr::ldr_label(R0, message),
          self.call(Routine::ThrowRuntimeError),
        ]);
      }
      Routine::ThrowRuntimeError => {
        // never returns, so lr is not saved
        return [
          Instr::bl(Routine::PrintString.label()),
          Instr::mov(R0, 255),
          Instr::bl("exit"),
        ]
        .into_iter()
        .collect();
      }
    }
    code.push(leave());
    code
  }

  /// Compare `reg` with zero and raise `message` when `cond` holds.
  fn fail_when(&mut self, cond: Cond, reg: Register, message: &str) -> Code {
    let label = self.pool.insert(message);
    let throw = self.call(Routine::ThrowRuntimeError);
    [
      Instr::cmp(reg, 0),
      Instr::ldr_label(R0, label).when(cond),
      throw.when(cond),
    ]
    .into_iter()
    .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dependencies_are_closed_transitively() {
    let all = with_dependencies([Routine::CheckArrayBounds]);
    assert_eq!(
      all,
      vec![
        Routine::PrintString,
        Routine::CheckArrayBounds,
        Routine::ThrowRuntimeError,
      ]
    );
    assert_eq!(with_dependencies([Routine::PrintInt]), vec![Routine::PrintInt]);
  }
}
