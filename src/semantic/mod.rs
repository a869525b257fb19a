//! Semantic analysis: turns the parse tree into a typed AST.
//!
//! Functions are handled in two passes. Every signature is registered
//! first, so bodies may call functions declared later in the file; then each
//! body is checked in its own function scope. Sibling constructs are always
//! checked independently and their diagnostics merged, so one run reports
//! every problem it can find.

mod expr;
mod stat;

use crate::ast::{Func, Param, Program};
use crate::diagnostic::{Diagnostic, Diagnostics, Outcomes, Parsed, combine3, invalid};
use crate::parse_tree::{BaseType, FuncNode, ProgramNode, TypeNode};
use crate::scope::{FuncSignature, ScopeId, SymbolTable};
use crate::ty::Type;

/// A checked program together with the symbol table it was resolved against.
#[derive(Debug, Clone)]
pub struct Analysis {
  pub program: Program,
  pub symbols: SymbolTable,
}

/// Check `tree` and build its typed AST.
pub fn analyse(tree: &ProgramNode) -> Parsed<Analysis> {
  let mut symbols = SymbolTable::new();
  let program = Builder::new(&mut symbols).program(tree)?;
  Ok(Analysis { program, symbols })
}

pub(crate) fn resolve_type(node: &TypeNode) -> Type {
  match node {
    TypeNode::Base(BaseType::Int) => Type::Int,
    TypeNode::Base(BaseType::Bool) => Type::Bool,
    TypeNode::Base(BaseType::Char) => Type::Char,
    TypeNode::Base(BaseType::String) => Type::String,
    TypeNode::Pair(fst, snd) => Type::pair(resolve_type(fst), resolve_type(snd)),
    TypeNode::AnyPair => Type::AnyPair,
    TypeNode::Array(elem) => Type::array(resolve_type(elem), 1),
  }
}

pub(crate) struct Builder<'a> {
  symbols: &'a mut SymbolTable,
}

impl<'a> Builder<'a> {
  pub(crate) fn new(symbols: &'a mut SymbolTable) -> Self {
    Self { symbols }
  }

  fn program(&mut self, tree: &ProgramNode) -> Parsed<Program> {
    let registered: Vec<Parsed<()>> = tree.funcs.iter().map(|func| self.register(func)).collect();
    let funcs: Vec<Parsed<Func>> = tree.funcs.iter().map(|func| self.func(func)).collect();
    let body = match tree.body.as_deref() {
      Some(body) => self.stat(body, ScopeId::GLOBAL),
      None => invalid(Diagnostic::Syntactic {
        pos: tree.pos,
        message: "program has no main body".to_string(),
      }),
    };

    combine3(
      registered.collect_all(),
      funcs.collect_all(),
      body,
      |_, funcs, body| Program { funcs, body },
    )
  }

  fn register(&mut self, func: &FuncNode) -> Parsed<()> {
    let sig = FuncSignature {
      name: func.name.name.clone(),
      ret: resolve_type(&func.ret),
      params: func.params.iter().map(|param| resolve_type(&param.ty)).collect(),
      pos: func.name.pos,
    };
    self.symbols.declare_function(sig).map_err(Diagnostics::from)
  }

  fn func(&mut self, func: &FuncNode) -> Parsed<Func> {
    let name = func.name.name.clone();
    let ret = resolve_type(&func.ret);
    let scope = self.symbols.function_scope(ret.clone());

    let params: Vec<Parsed<Param>> = func
      .params
      .iter()
      .enumerate()
      .map(|(ordinal, param)| {
        let ty = resolve_type(&param.ty);
        self
          .symbols
          .declare_param(scope, param.pos, &param.name.name, ty.clone(), ordinal)
          .map(|var| Param {
            ty,
            name: param.name.name.clone(),
            var,
          })
          .map_err(Diagnostics::from)
      })
      .collect();

    let (body, terminates) = match func.body.as_deref() {
      Some(body) => {
        let terminates = if body.always_returns() {
          Ok(())
        } else {
          invalid(Diagnostic::Syntactic {
            pos: func.pos,
            message: format!("function \"{name}\" does not end with a return or exit statement"),
          })
        };
        (self.stat(body, scope), terminates)
      }
      None => (
        invalid(Diagnostic::Syntactic {
          pos: func.pos,
          message: format!("function \"{name}\" has no body"),
        }),
        Ok(()),
      ),
    };

    combine3(params.collect_all(), body, terminates, |params, body, _| Func {
      ret,
      name,
      params,
      body,
      scope,
      pos: func.pos,
    })
  }
}
