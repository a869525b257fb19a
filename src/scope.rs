//! Symbol table: an arena of nested scopes plus the global function table.
//!
//! Semantic analysis owns the table through `&mut` while it walks the parse
//! tree; code generation only ever sees `&SymbolTable`. Entries are added,
//! never removed.
//!
//! Lookup walks from the innermost scope outwards. A function scope has no
//! variable parent, so function bodies see their own parameters and locals
//! but neither the main body's variables nor another function's. Functions
//! live in a separate namespace that every scope can reach.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::diagnostic::{DeclKind, Diagnostic};
use crate::parse_tree::Position;
use crate::ty::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(usize);

/// Stack frame a variable lives in: the main body or one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

impl ScopeId {
  pub const GLOBAL: ScopeId = ScopeId(0);
}

impl FrameId {
  pub const MAIN: FrameId = FrameId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
  /// Local slot, numbered from zero within its frame.
  Local { slot: usize },
  /// Parameter, by ordinal position in the signature.
  Param { ordinal: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
  pub name: String,
  pub ty: Type,
  pub storage: Storage,
  pub frame: FrameId,
  pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncSignature {
  pub name: String,
  pub ret: Type,
  pub params: Vec<Type>,
  pub pos: Position,
}

#[derive(Debug, Clone)]
struct Scope {
  parent: Option<ScopeId>,
  frame: FrameId,
  vars: HashMap<String, VarId>,
}

#[derive(Debug, Clone, Default)]
struct Frame {
  locals: usize,
  ret: Option<Type>,
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
  scopes: Vec<Scope>,
  variables: Vec<Variable>,
  frames: Vec<Frame>,
  functions: IndexMap<String, FuncSignature>,
}

impl Default for SymbolTable {
  fn default() -> Self {
    Self::new()
  }
}

impl SymbolTable {
  /// A table holding only the empty global scope.
  pub fn new() -> Self {
    Self {
      scopes: vec![Scope {
        parent: None,
        frame: FrameId::MAIN,
        vars: HashMap::new(),
      }],
      variables: Vec::new(),
      frames: vec![Frame::default()],
      functions: IndexMap::new(),
    }
  }

  /// Register a function. The first registration of a name wins.
  pub fn declare_function(&mut self, sig: FuncSignature) -> Result<(), Diagnostic> {
    if let Some(previous) = self.functions.get(&sig.name) {
      return Err(Diagnostic::DuplicateDeclaration {
        pos: sig.pos,
        kind: DeclKind::Function,
        name: sig.name,
        previous: previous.pos,
      });
    }
    self.functions.insert(sig.name.clone(), sig);
    Ok(())
  }

  pub fn lookup_function(&self, name: &str) -> Option<&FuncSignature> {
    self.functions.get(name)
  }

  /// Open the scope for a function body in a fresh frame.
  pub fn function_scope(&mut self, ret: Type) -> ScopeId {
    let frame = FrameId(self.frames.len());
    self.frames.push(Frame {
      locals: 0,
      ret: Some(ret),
    });
    self.push_scope(Scope {
      parent: None,
      frame,
      vars: HashMap::new(),
    })
  }

  /// Open a block scope nested in `parent`, sharing its frame.
  pub fn block_scope(&mut self, parent: ScopeId) -> ScopeId {
    let frame = self.scope(parent).frame;
    self.push_scope(Scope {
      parent: Some(parent),
      frame,
      vars: HashMap::new(),
    })
  }

  /// Bind a local variable in `scope`. Shadowing an outer binding is fine;
  /// rebinding a name in the same scope is not.
  pub fn declare_variable(
    &mut self,
    scope: ScopeId,
    pos: Position,
    name: &str,
    ty: Type,
  ) -> Result<VarId, Diagnostic> {
    self.check_unbound(scope, pos, name, DeclKind::Variable)?;
    let frame = self.scope(scope).frame;
    let slot = self.frames[frame.0].locals;
    self.frames[frame.0].locals += 1;
    Ok(self.bind(scope, pos, name, ty, Storage::Local { slot }))
  }

  pub fn declare_param(
    &mut self,
    scope: ScopeId,
    pos: Position,
    name: &str,
    ty: Type,
    ordinal: usize,
  ) -> Result<VarId, Diagnostic> {
    self.check_unbound(scope, pos, name, DeclKind::Parameter)?;
    Ok(self.bind(scope, pos, name, ty, Storage::Param { ordinal }))
  }

  pub fn lookup_variable(&self, scope: ScopeId, name: &str) -> Option<VarId> {
    let mut current = Some(scope);
    while let Some(id) = current {
      let scope = self.scope(id);
      if let Some(var) = scope.vars.get(name) {
        return Some(*var);
      }
      current = scope.parent;
    }
    None
  }

  pub fn variable(&self, id: VarId) -> &Variable {
    &self.variables[id.0]
  }

  pub fn frame_of(&self, scope: ScopeId) -> FrameId {
    self.scope(scope).frame
  }

  /// Declared return type of the function enclosing `scope`; `None` in the main body.
  pub fn return_type(&self, scope: ScopeId) -> Option<&Type> {
    self.frames[self.frame_of(scope).0].ret.as_ref()
  }

  /// Bytes of stack needed for the locals of `frame`.
  pub fn frame_size(&self, frame: FrameId) -> i32 {
    let locals = self.frames.get(frame.0).map_or(0, |frame| frame.locals);
    i32::try_from(locals * 4).unwrap_or(i32::MAX)
  }

  fn scope(&self, id: ScopeId) -> &Scope {
    &self.scopes[id.0]
  }

  fn push_scope(&mut self, scope: Scope) -> ScopeId {
    let id = ScopeId(self.scopes.len());
    self.scopes.push(scope);
    id
  }

  fn check_unbound(
    &self,
    scope: ScopeId,
    pos: Position,
    name: &str,
    kind: DeclKind,
  ) -> Result<(), Diagnostic> {
    match self.scope(scope).vars.get(name) {
      Some(existing) => Err(Diagnostic::DuplicateDeclaration {
        pos,
        kind,
        name: name.to_string(),
        previous: self.variable(*existing).pos,
      }),
      None => Ok(()),
    }
  }

  fn bind(&mut self, scope: ScopeId, pos: Position, name: &str, ty: Type, storage: Storage) -> VarId {
    let id = VarId(self.variables.len());
    let frame = self.scope(scope).frame;
    self.variables.push(Variable {
      name: name.to_string(),
      ty,
      storage,
      frame,
      pos,
    });
    self.scopes[scope.0].vars.insert(name.to_string(), id);
    id
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pos(line: usize) -> Position {
    Position::new(line, 1)
  }

  #[test]
  fn shadowing_in_child_scope_is_allowed() {
    let mut table = SymbolTable::new();
    let outer = table
      .declare_variable(ScopeId::GLOBAL, pos(1), "x", Type::Int)
      .unwrap();
    let block = table.block_scope(ScopeId::GLOBAL);
    let inner = table.declare_variable(block, pos(2), "x", Type::Bool).unwrap();

    assert_ne!(outer, inner);
    assert_eq!(table.lookup_variable(block, "x"), Some(inner));
    assert_eq!(table.lookup_variable(ScopeId::GLOBAL, "x"), Some(outer));
    assert_eq!(table.variable(inner).ty, Type::Bool);
  }

  #[test]
  fn redeclaring_in_same_scope_is_rejected() {
    let mut table = SymbolTable::new();
    table
      .declare_variable(ScopeId::GLOBAL, pos(1), "x", Type::Int)
      .unwrap();
    let err = table
      .declare_variable(ScopeId::GLOBAL, pos(2), "x", Type::Int)
      .unwrap_err();
    assert_eq!(
      err,
      Diagnostic::DuplicateDeclaration {
        pos: pos(2),
        kind: DeclKind::Variable,
        name: "x".to_string(),
        previous: pos(1),
      }
    );
  }

  #[test]
  fn function_scopes_do_not_see_main_variables() {
    let mut table = SymbolTable::new();
    table
      .declare_variable(ScopeId::GLOBAL, pos(1), "x", Type::Int)
      .unwrap();
    let f = table.function_scope(Type::Int);
    let g = table.function_scope(Type::Int);
    table.declare_param(f, pos(2), "y", Type::Int, 0).unwrap();

    assert_eq!(table.lookup_variable(f, "x"), None);
    assert!(table.lookup_variable(f, "y").is_some());
    assert_eq!(table.lookup_variable(g, "y"), None);
    assert_eq!(table.return_type(f), Some(&Type::Int));
    assert_eq!(table.return_type(ScopeId::GLOBAL), None);
  }

  #[test]
  fn functions_are_first_wins() {
    let mut table = SymbolTable::new();
    let sig = |ret: Type, line| FuncSignature {
      name: "f".to_string(),
      ret,
      params: vec![],
      pos: pos(line),
    };
    table.declare_function(sig(Type::Int, 1)).unwrap();
    assert!(table.declare_function(sig(Type::Bool, 5)).is_err());
    assert_eq!(table.lookup_function("f").map(|f| &f.ret), Some(&Type::Int));
    assert!(table.lookup_function("g").is_none());
  }

  #[test]
  fn locals_get_slots_per_frame() {
    let mut table = SymbolTable::new();
    let block = table.block_scope(ScopeId::GLOBAL);
    let a = table.declare_variable(ScopeId::GLOBAL, pos(1), "a", Type::Int).unwrap();
    let b = table.declare_variable(block, pos(2), "b", Type::Char).unwrap();
    let f = table.function_scope(Type::Int);
    let c = table.declare_variable(f, pos(3), "c", Type::Int).unwrap();

    assert_eq!(table.variable(a).storage, Storage::Local { slot: 0 });
    assert_eq!(table.variable(b).storage, Storage::Local { slot: 1 });
    assert_eq!(table.variable(c).storage, Storage::Local { slot: 0 });
    assert_eq!(table.frame_size(FrameId::MAIN), 8);
    assert_eq!(table.frame_size(table.frame_of(f)), 4);
  }
}
