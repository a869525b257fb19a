//! Statement lowering.

use crate::arm::{AddrMode2, Code, Cond, DataOp, Instr, Operand2, Register, Width};
use crate::ast::{AssLhs, LhsKind, Stat, StatKind};
use crate::ty::Type;

use super::{CodegenResult, Emitter, Routine, epilogue};

const R0: Register = Register::RET;

impl Emitter<'_> {
  /// Lower one statement. Expression operands always end up in `r0`.
  pub fn emit_stat(&mut self, stat: &Stat) -> CodegenResult<Code> {
    let code = match &stat.kind {
      StatKind::Skip => Code::new(),
      StatKind::Declare { var, rhs } => {
        let width = Width::store(self.symbols.variable(*var).ty.size());
        let addr = self.var_addr(*var)?;
        self.emit_rhs(rhs, R0)? + Code::from(Instr::store(width, R0, addr))
      }
      StatKind::Assign { lhs, rhs } => {
        let value = self.emit_rhs(rhs, R0)?;
        value + self.emit_store(lhs)?
      }
      StatKind::Read(lhs) => {
        let routine = if lhs.ty == Type::Char {
          Routine::ReadChar
        } else {
          Routine::ReadInt
        };
        let mut code = self.emit_lhs_addr(lhs, R0)?;
        code.push(self.call(routine));
        code
      }
      StatKind::Free(expr) => {
        let free = if expr.ty.is_pair_like() {
          self.call(Routine::FreePair)
        } else {
          Instr::bl("free")
        };
        self.emit_expr(expr, R0)? + Code::from(free)
      }
      StatKind::Return(expr) => self.emit_expr(expr, R0)? + epilogue(),
      StatKind::Exit(expr) => self.emit_expr(expr, R0)? + Code::from(Instr::bl("exit")),
      StatKind::Print(expr) => {
        let print = self.print_for(&expr.ty);
        self.emit_expr(expr, R0)? + Code::from(print)
      }
      StatKind::Println(expr) => {
        let print = self.print_for(&expr.ty);
        let newline = self.call(Routine::PrintLn);
        let mut code = self.emit_expr(expr, R0)?;
        code.extend([print, newline]);
        code
      }
      StatKind::If {
        cond,
        then_branch,
        else_branch,
      } => {
        let else_label = self.fresh_label();
        let end_label = self.fresh_label();
        let mut code = self.emit_expr(cond, R0)?;
        code.extend([Instr::cmp(R0, 0), Instr::b(else_label.clone()).when(Cond::Eq)]);
        code += self.emit_stat(then_branch)?;
        code.push(Instr::b(end_label.clone()));
        code.label(else_label);
        code += self.emit_stat(else_branch)?;
        code.label(end_label);
        code
      }
      StatKind::While { cond, body } => {
        let body_label = self.fresh_label();
        let cond_label = self.fresh_label();
        let mut code = Code::from(Instr::b(cond_label.clone()));
        code.label(body_label.clone());
        code += self.emit_stat(body)?;
        code.label(cond_label);
        code += self.emit_expr(cond, R0)?;
        code.extend([Instr::cmp(R0, 1), Instr::b(body_label).when(Cond::Eq)]);
        code
      }
      StatKind::Scoped(body) => self.emit_stat(body)?,
      StatKind::Sequence(first, rest) => self.emit_stat(first)? + self.emit_stat(rest)?,
    };
    Ok(code)
  }

  /// Store `r0` into `lhs`.
  fn emit_store(&mut self, lhs: &AssLhs) -> CodegenResult<Code> {
    let width = Width::store(lhs.ty.size());
    if let LhsKind::Ident(var) = &lhs.kind {
      return Ok(Instr::store(width, R0, self.var_addr(*var)?).into());
    }
    // the address computation clobbers r0, so park the value on the stack
    let mut code = Code::from(Instr::push(&[R0]));
    code += self.emit_lhs_addr(lhs, R0)?;
    code.extend([
      Instr::pop(&[Register::SCRATCH]),
      Instr::store(width, Register::SCRATCH, AddrMode2::zero_offset(R0)),
    ]);
    Ok(code)
  }

  /// Address of the location `lhs` designates, in `dest`.
  pub(super) fn emit_lhs_addr(&mut self, lhs: &AssLhs, dest: Register) -> CodegenResult<Code> {
    match &lhs.kind {
      LhsKind::Ident(var) => {
        let offset = self.var_offset(*var)?.value();
        let (op, magnitude) = if offset < 0 {
          (DataOp::Sub, -offset)
        } else {
          (DataOp::Add, offset)
        };
        if Operand2::is_encodable(magnitude) {
          return Ok(Instr::data(op, dest, Register::Fp, magnitude).into());
        }
        Ok(
          [
            Instr::ldr_imm(Register::SCRATCH, magnitude),
            Instr::data(op, dest, Register::Fp, Register::SCRATCH),
          ]
          .into_iter()
          .collect(),
        )
      }
      LhsKind::ArrayElem(elem) => self.emit_elem_addr(elem, dest),
      LhsKind::PairElem(elem) => self.emit_pair_addr(elem, dest),
    }
  }

  /// Print routine for a value of type `ty` held in `r0`.
  fn print_for(&mut self, ty: &Type) -> Instr {
    match ty {
      Type::Int => self.call(Routine::PrintInt),
      Type::Bool => self.call(Routine::PrintBool),
      Type::Char => Instr::bl("putchar"),
      Type::String => self.call(Routine::PrintString),
      Type::Array { elem, depth: 1 } if **elem == Type::Char => self.call(Routine::PrintString),
      _ => self.call(Routine::PrintReference),
    }
  }
}
