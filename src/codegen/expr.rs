//! Expression and rvalue lowering.
//!
//! A binary operator evaluates its left operand, pushes it, evaluates the
//! right operand into the destination and pops the left one into `ip`.

use snafu::ResultExt;

use crate::arm::{
  AddrMode2, Code, Cond, DataOp, Instr, Operand2, Register, Shift, Width,
};
use crate::ast::{ArrayElem, AssRhs, BinaryOp, Expr, ExprKind, PairElem, RhsKind, UnaryOp};
use crate::ty::Type;

use super::{AddressingSnafu, CodegenResult, Emitter, Routine, function_label, move_reg};

const R0: Register = Register::R0;
const R1: Register = Register::R1;
const IP: Register = Register::SCRATCH;

/// Byte size of one element of an array of type `ty`.
fn elem_size(ty: &Type) -> i32 {
  ty.index(1).map_or(4, |elem| elem.size())
}

impl Emitter<'_> {
  /// Evaluate `expr` into `dest`. Registers other than `dest` and the stack
  /// pointer are not preserved.
  pub fn emit_expr(&mut self, expr: &Expr, dest: Register) -> CodegenResult<Code> {
    let code = match &expr.kind {
      ExprKind::Int(value) => Instr::ldr_imm(dest, *value).into(),
      ExprKind::Bool(value) => Instr::mov(dest, i32::from(*value)).into(),
      ExprKind::Char(value) => Instr::mov(dest, *value as i32).into(),
      ExprKind::Str(text) => {
        let label = self.pool.insert(text.as_str());
        Instr::ldr_label(dest, label).into()
      }
      ExprKind::NullPair => Instr::mov(dest, 0).into(),
      ExprKind::Ident(var) => {
        let width = Width::load(expr.ty.size());
        Instr::load(width, dest, self.var_addr(*var)?).into()
      }
      ExprKind::ArrayElem(elem) => {
        let mut code = self.emit_elem_addr(elem, dest)?;
        code.push(Instr::load(
          Width::load(expr.ty.size()),
          dest,
          AddrMode2::zero_offset(dest),
        ));
        code
      }
      ExprKind::Unary(op, operand) => self.emit_expr(operand, dest)? + self.unary(*op, dest),
      ExprKind::Binary(op, lhs, rhs) => {
        let mut code = self.emit_expr(lhs, dest)?;
        code.push(Instr::push(&[dest]));
        code += self.emit_expr(rhs, dest)?;
        code.push(Instr::pop(&[IP]));
        code + self.binary(*op, dest)
      }
    };
    Ok(code)
  }

  /// Operate on the operand already in `dest`.
  fn unary(&mut self, op: UnaryOp, dest: Register) -> Code {
    match op {
      UnaryOp::Not => Instr::data(DataOp::Eor, dest, dest, 1).into(),
      UnaryOp::Neg => [
        Instr::data_s(DataOp::Rsb, dest, dest, 0),
        self.call(Routine::ThrowOverflowError).when(Cond::Vs),
      ]
      .into_iter()
      .collect(),
      UnaryOp::Len => Instr::ldr(dest, AddrMode2::zero_offset(dest)).into(),
      // chars and ints share a register representation
      UnaryOp::Ord | UnaryOp::Chr => Code::new(),
    }
  }

  /// Combine the left operand in `ip` with the right operand in `dest`.
  fn binary(&mut self, op: BinaryOp, dest: Register) -> Code {
    let compare = |cond: Cond| -> Code {
      [
        Instr::cmp(IP, dest),
        Instr::mov(dest, 1).when(cond),
        Instr::mov(dest, 0).when(cond.negate()),
      ]
      .into_iter()
      .collect()
    };
    match op {
      BinaryOp::Add | BinaryOp::Sub => {
        let data = if op == BinaryOp::Add { DataOp::Add } else { DataOp::Sub };
        [
          Instr::data_s(data, dest, IP, dest),
          self.call(Routine::ThrowOverflowError).when(Cond::Vs),
        ]
        .into_iter()
        .collect()
      }
      BinaryOp::Mul => {
        let lo = if dest == R1 { Register::R2 } else { R1 };
        [
          Instr::smull(lo, IP, IP, dest),
          Instr::cmp(IP, Operand2::Shifted(lo, Shift::Asr(31))),
          self.call(Routine::ThrowOverflowError).when(Cond::Ne),
          Instr::mov(dest, lo),
        ]
        .into_iter()
        .collect()
      }
      BinaryOp::Div | BinaryOp::Mod => {
        let (helper, result) = if op == BinaryOp::Div {
          ("__aeabi_idiv", R0)
        } else {
          ("__aeabi_idivmod", R1)
        };
        let mut code = Code::from(Instr::mov(R1, dest));
        code.extend([
          Instr::mov(R0, IP),
          self.call(Routine::CheckDivideByZero),
          Instr::bl(helper),
        ]);
        code + move_reg(dest, result)
      }
      BinaryOp::Gt => compare(Cond::Gt),
      BinaryOp::Ge => compare(Cond::Ge),
      BinaryOp::Lt => compare(Cond::Lt),
      BinaryOp::Le => compare(Cond::Le),
      BinaryOp::Eq => compare(Cond::Eq),
      BinaryOp::Ne => compare(Cond::Ne),
      BinaryOp::And => Instr::data(DataOp::And, dest, IP, dest).into(),
      BinaryOp::Or => Instr::data(DataOp::Orr, dest, IP, dest).into(),
    }
  }

  /// Evaluate an assignable value into `dest`.
  pub(super) fn emit_rhs(&mut self, rhs: &AssRhs, dest: Register) -> CodegenResult<Code> {
    match &rhs.kind {
      RhsKind::Expr(expr) => self.emit_expr(expr, dest),
      RhsKind::ArrayLit(elems) => {
        let size = elem_size(&rhs.ty);
        let length = i32::try_from(elems.len()).unwrap_or(i32::MAX);
        let mut code = self.emit_malloc(4 + length.saturating_mul(size), dest);
        for (i, elem) in (0..).zip(elems) {
          let slot = self.heap_slot(4 + i * size, "array literal element")?;
          code += self.emit_expr(elem, dest)?;
          code.extend([
            Instr::ldr(IP, AddrMode2::zero_offset(Register::Sp)),
            Instr::store(Width::store(size), dest, slot),
          ]);
        }
        code.extend([
          Instr::ldr_imm(dest, length),
          Instr::ldr(IP, AddrMode2::zero_offset(Register::Sp)),
          Instr::str(dest, AddrMode2::zero_offset(IP)),
          Instr::pop(&[dest]),
        ]);
        Ok(code)
      }
      RhsKind::NewPair(fst, snd) => {
        let mut code = self.emit_malloc(8, dest);
        for (offset, elem) in [(0, fst), (4, snd)] {
          let slot = self.heap_slot(offset, "pair element")?;
          code += self.emit_expr(elem, dest)?;
          code.extend([
            Instr::ldr(IP, AddrMode2::zero_offset(Register::Sp)),
            Instr::store(Width::store(elem.ty.size()), dest, slot),
          ]);
        }
        code.push(Instr::pop(&[dest]));
        Ok(code)
      }
      RhsKind::PairElem(elem) => {
        let mut code = self.emit_pair_addr(elem, dest)?;
        code.push(Instr::load(
          Width::load(rhs.ty.size()),
          dest,
          AddrMode2::zero_offset(dest),
        ));
        Ok(code)
      }
      RhsKind::Call { name, args } => {
        let mut code = Code::new();
        // right to left, so the first argument ends up nearest the frame
        for arg in args.iter().rev() {
          code += self.emit_expr(arg, R0)?;
          code.push(Instr::str(
            R0,
            AddrMode2::pre_indexed(Register::Sp, -4).context(AddressingSnafu {
              what: "call argument",
            })?,
          ));
        }
        code.push(Instr::bl(function_label(name)));
        if !args.is_empty() {
          let bytes = i32::try_from(args.len() * 4).unwrap_or(i32::MAX);
          code.push(Instr::add(Register::Sp, Register::Sp, bytes));
        }
        Ok(code + move_reg(dest, R0))
      }
    }
  }

  /// Allocate `bytes` on the heap and leave the block's address pushed on the stack.
  fn emit_malloc(&mut self, bytes: i32, dest: Register) -> Code {
    let mut code: Code = [Instr::ldr_imm(R0, bytes), Instr::bl("malloc")]
      .into_iter()
      .collect();
    code += move_reg(dest, R0);
    code.push(Instr::push(&[dest]));
    code
  }

  /// `[ip, #offset]` into a heap block whose address was just loaded into `ip`.
  fn heap_slot(&self, offset: i32, what: &str) -> CodegenResult<AddrMode2> {
    AddrMode2::imm_offset(IP, offset).context(AddressingSnafu { what })
  }

  /// Address of `name[i]...[k]` in `dest`, bounds-checking every subscript.
  pub(super) fn emit_elem_addr(&mut self, elem: &ArrayElem, dest: Register) -> CodegenResult<Code> {
    let mut code = Code::from(Instr::ldr(dest, self.var_addr(elem.var)?));
    let mut ty = elem.array_ty.clone();
    for (depth, index) in elem.indices.iter().enumerate() {
      if depth > 0 {
        // step from the previous element's address to the nested array it holds
        code.push(Instr::ldr(dest, AddrMode2::zero_offset(dest)));
      }
      let size = elem_size(&ty);
      code.push(Instr::push(&[dest]));
      code += self.emit_expr(index, dest)?;
      code.push(Instr::pop(&[IP]));
      code += move_reg(R0, dest);
      code.extend([
        Instr::mov(R1, IP),
        self.call(Routine::CheckArrayBounds),
        Instr::add(R1, R1, 4),
      ]);
      let scaled = if size == 4 {
        Operand2::Shifted(R0, Shift::Lsl(2))
      } else {
        Operand2::Reg(R0)
      };
      code.push(Instr::add(dest, R1, scaled));
      ty = ty.index(1).unwrap_or(Type::EmptyArray);
    }
    Ok(code)
  }

  /// Address of `fst p` or `snd p` in `dest`, failing at runtime on `null`.
  pub(super) fn emit_pair_addr(&mut self, elem: &PairElem, dest: Register) -> CodegenResult<Code> {
    let mut code = self.emit_expr(&elem.pair, R0)?;
    code.push(self.call(Routine::CheckNullPointer));
    code.push(Instr::add(dest, R0, elem.accessor.offset()));
    Ok(code)
  }
}
