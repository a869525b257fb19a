//! Recursive-descent parser producing the untyped parse tree.
//!
//! Expressions use one helper per precedence level, loosest first:
//! `||`, `&&`, equality, relational, additive, multiplicative, unary. The
//! parser stops at the first error; everything it accepts is handed to
//! semantic analysis, which reports all remaining problems at once.

use crate::ast::{BinaryOp, UnaryOp};
use crate::error::{CompileError, CompileResult};
use crate::parse_tree::{
  ArrayElemNode, BaseType, ExprNode, ExprNodeKind, FuncNode, Ident, LhsNode, PairElemNode,
  ParamNode, Position, ProgramNode, RhsNode, StatNode, StatNodeKind, TypeNode,
};
use crate::tokenizer::{Token, TokenKind, describe_token, token_text};
use crate::ty::PairAccessor;

/// Parse a whole `begin ... end` program from the token stream.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<ProgramNode> {
  let mut stream = TokenStream::new(tokens, source);

  if stream.is_eof() {
    return Err(CompileError::at(source, 0, "program is empty"));
  }

  let pos = stream.position();
  stream.skip_keyword("begin")?;
  let mut funcs = Vec::new();
  while stream.at_function() {
    funcs.push(parse_func(&mut stream)?);
  }
  let body = parse_stat_seq(&mut stream)?;
  stream.skip_keyword("end")?;

  if !stream.is_eof() {
    return Err(stream.unexpected("after the end of the program"));
  }

  Ok(ProgramNode {
    funcs,
    body: Some(Box::new(body)),
    pos,
  })
}

fn parse_func(stream: &mut TokenStream) -> CompileResult<FuncNode> {
  let pos = stream.position();
  let ret = parse_type(stream)?;
  let name = stream.get_ident()?;
  stream.skip("(")?;
  let mut params = Vec::new();
  if !stream.equal(")") {
    loop {
      let pos = stream.position();
      let ty = parse_type(stream)?;
      let name = stream.get_ident()?;
      params.push(ParamNode { ty, name, pos });
      if !stream.equal(",") {
        break;
      }
    }
    stream.skip(")")?;
  }
  stream.skip_keyword("is")?;
  let body = parse_stat_seq(stream)?;
  stream.skip_keyword("end")?;

  Ok(FuncNode {
    ret,
    name,
    params,
    body: Some(Box::new(body)),
    pos,
  })
}

/// `stat (';' stat)*`, nested to the right.
fn parse_stat_seq(stream: &mut TokenStream) -> CompileResult<StatNode> {
  let first = parse_stat(stream)?;
  if stream.equal(";") {
    let rest = parse_stat_seq(stream)?;
    let pos = first.pos;
    return Ok(StatNode::new(
      StatNodeKind::Seq(Box::new(first), Box::new(rest)),
      pos,
    ));
  }
  Ok(first)
}

fn parse_stat(stream: &mut TokenStream) -> CompileResult<StatNode> {
  let pos = stream.position();
  let kind = if stream.equal_keyword("skip") {
    StatNodeKind::Skip
  } else if stream.equal_keyword("read") {
    StatNodeKind::Read(parse_lhs(stream)?)
  } else if stream.equal_keyword("free") {
    StatNodeKind::Free(parse_expr(stream)?)
  } else if stream.equal_keyword("return") {
    StatNodeKind::Return(parse_expr(stream)?)
  } else if stream.equal_keyword("exit") {
    StatNodeKind::Exit(parse_expr(stream)?)
  } else if stream.equal_keyword("print") {
    StatNodeKind::Print(parse_expr(stream)?)
  } else if stream.equal_keyword("println") {
    StatNodeKind::Println(parse_expr(stream)?)
  } else if stream.equal_keyword("if") {
    let cond = parse_expr(stream)?;
    stream.skip_keyword("then")?;
    let then_branch = parse_stat_seq(stream)?;
    stream.skip_keyword("else")?;
    let else_branch = parse_stat_seq(stream)?;
    stream.skip_keyword("fi")?;
    StatNodeKind::If {
      cond,
      then_branch: Some(Box::new(then_branch)),
      else_branch: Some(Box::new(else_branch)),
    }
  } else if stream.equal_keyword("while") {
    let cond = parse_expr(stream)?;
    stream.skip_keyword("do")?;
    let body = parse_stat_seq(stream)?;
    stream.skip_keyword("done")?;
    StatNodeKind::While {
      cond,
      body: Some(Box::new(body)),
    }
  } else if stream.equal_keyword("begin") {
    let body = parse_stat_seq(stream)?;
    stream.skip_keyword("end")?;
    StatNodeKind::Begin(Some(Box::new(body)))
  } else if stream.at_type() {
    let ty = parse_type(stream)?;
    let name = stream.get_ident()?;
    stream.skip("=")?;
    let rhs = parse_rhs(stream)?;
    StatNodeKind::Declare { ty, name, rhs }
  } else {
    let lhs = parse_lhs(stream)?;
    stream.skip("=")?;
    let rhs = parse_rhs(stream)?;
    StatNodeKind::Assign { lhs, rhs }
  };
  Ok(StatNode::new(kind, pos))
}

fn parse_type(stream: &mut TokenStream) -> CompileResult<TypeNode> {
  let mut ty = if stream.equal_keyword("pair") {
    stream.skip("(")?;
    let fst = parse_pair_elem_type(stream)?;
    stream.skip(",")?;
    let snd = parse_pair_elem_type(stream)?;
    stream.skip(")")?;
    TypeNode::Pair(Box::new(fst), Box::new(snd))
  } else {
    TypeNode::Base(parse_base_type(stream)?)
  };
  while stream.peek_is("[") {
    stream.skip("[")?;
    stream.skip("]")?;
    ty = TypeNode::Array(Box::new(ty));
  }
  Ok(ty)
}

/// A bare `pair` inside a pair type stands for a pair of unknown shape.
fn parse_pair_elem_type(stream: &mut TokenStream) -> CompileResult<TypeNode> {
  if stream.peek_keyword("pair") && !stream.peek_nth_is(1, "(") {
    stream.skip_keyword("pair")?;
    return Ok(TypeNode::AnyPair);
  }
  parse_type(stream)
}

fn parse_base_type(stream: &mut TokenStream) -> CompileResult<BaseType> {
  for (keyword, base) in [
    ("int", BaseType::Int),
    ("bool", BaseType::Bool),
    ("char", BaseType::Char),
    ("string", BaseType::String),
  ] {
    if stream.equal_keyword(keyword) {
      return Ok(base);
    }
  }
  Err(stream.unexpected("where a type was expected"))
}

fn parse_lhs(stream: &mut TokenStream) -> CompileResult<LhsNode> {
  if let Some(elem) = parse_pair_elem(stream)? {
    return Ok(LhsNode::PairElem(elem));
  }
  let name = stream.get_ident()?;
  if stream.peek_is("[") {
    return Ok(LhsNode::ArrayElem(parse_array_elem(stream, name)?));
  }
  Ok(LhsNode::Ident(name))
}

fn parse_rhs(stream: &mut TokenStream) -> CompileResult<RhsNode> {
  let pos = stream.position();
  if stream.equal("[") {
    let mut elems = Vec::new();
    if !stream.equal("]") {
      elems = parse_expr_list(stream)?;
      stream.skip("]")?;
    }
    return Ok(RhsNode::ArrayLit { elems, pos });
  }
  if stream.equal_keyword("newpair") {
    stream.skip("(")?;
    let fst = parse_expr(stream)?;
    stream.skip(",")?;
    let snd = parse_expr(stream)?;
    stream.skip(")")?;
    return Ok(RhsNode::NewPair { fst, snd, pos });
  }
  if stream.equal_keyword("call") {
    let name = stream.get_ident()?;
    stream.skip("(")?;
    let mut args = Vec::new();
    if !stream.equal(")") {
      args = parse_expr_list(stream)?;
      stream.skip(")")?;
    }
    return Ok(RhsNode::Call { name, args, pos });
  }
  if let Some(elem) = parse_pair_elem(stream)? {
    return Ok(RhsNode::PairElem(elem));
  }
  Ok(RhsNode::Expr(parse_expr(stream)?))
}

fn parse_pair_elem(stream: &mut TokenStream) -> CompileResult<Option<PairElemNode>> {
  let pos = stream.position();
  let accessor = if stream.equal_keyword("fst") {
    PairAccessor::Fst
  } else if stream.equal_keyword("snd") {
    PairAccessor::Snd
  } else {
    return Ok(None);
  };
  let expr = parse_expr(stream)?;
  Ok(Some(PairElemNode {
    accessor,
    expr: Box::new(expr),
    pos,
  }))
}

fn parse_array_elem(stream: &mut TokenStream, name: Ident) -> CompileResult<ArrayElemNode> {
  let pos = name.pos;
  let mut indices = Vec::new();
  while stream.equal("[") {
    indices.push(parse_expr(stream)?);
    stream.skip("]")?;
  }
  Ok(ArrayElemNode { name, indices, pos })
}

fn parse_expr_list(stream: &mut TokenStream) -> CompileResult<Vec<ExprNode>> {
  let mut exprs = vec![parse_expr(stream)?];
  while stream.equal(",") {
    exprs.push(parse_expr(stream)?);
  }
  Ok(exprs)
}

pub(crate) fn parse_expr(stream: &mut TokenStream) -> CompileResult<ExprNode> {
  parse_or(stream)
}

/// One left-associative precedence level.
fn parse_binary_level(
  stream: &mut TokenStream,
  ops: &[(&str, BinaryOp)],
  next: fn(&mut TokenStream) -> CompileResult<ExprNode>,
) -> CompileResult<ExprNode> {
  let mut node = next(stream)?;

  loop {
    let Some(op) = ops
      .iter()
      .find(|(symbol, _)| stream.peek_is(symbol))
      .map(|(symbol, op)| (*symbol, *op))
    else {
      break;
    };

    let pos = node.pos;
    stream.skip(op.0)?;
    let rhs = next(stream)?;
    node = ExprNode::new(
      ExprNodeKind::Binary(op.1, Box::new(node), Box::new(rhs)),
      pos,
    );
  }

  Ok(node)
}

fn parse_or(stream: &mut TokenStream) -> CompileResult<ExprNode> {
  parse_binary_level(stream, &[("||", BinaryOp::Or)], parse_and)
}

fn parse_and(stream: &mut TokenStream) -> CompileResult<ExprNode> {
  parse_binary_level(stream, &[("&&", BinaryOp::And)], parse_equality)
}

fn parse_equality(stream: &mut TokenStream) -> CompileResult<ExprNode> {
  parse_binary_level(
    stream,
    &[("==", BinaryOp::Eq), ("!=", BinaryOp::Ne)],
    parse_relational,
  )
}

fn parse_relational(stream: &mut TokenStream) -> CompileResult<ExprNode> {
  parse_binary_level(
    stream,
    &[
      ("<=", BinaryOp::Le),
      (">=", BinaryOp::Ge),
      ("<", BinaryOp::Lt),
      (">", BinaryOp::Gt),
    ],
    parse_add,
  )
}

fn parse_add(stream: &mut TokenStream) -> CompileResult<ExprNode> {
  parse_binary_level(
    stream,
    &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
    parse_mul,
  )
}

fn parse_mul(stream: &mut TokenStream) -> CompileResult<ExprNode> {
  parse_binary_level(
    stream,
    &[
      ("*", BinaryOp::Mul),
      ("/", BinaryOp::Div),
      ("%", BinaryOp::Mod),
    ],
    parse_unary,
  )
}

fn parse_unary(stream: &mut TokenStream) -> CompileResult<ExprNode> {
  let pos = stream.position();

  // `-` directly before a literal is part of the literal, so the most
  // negative int is expressible
  if stream.peek_is("-")
    && let Some(token) = stream.peek_nth(1)
    && token.kind == TokenKind::Num
  {
    stream.skip("-")?;
    let value = stream.get_number()?;
    return Ok(ExprNode::new(ExprNodeKind::Int(-value), pos));
  }

  let op = if stream.equal("!") {
    Some(UnaryOp::Not)
  } else if stream.equal("-") {
    Some(UnaryOp::Neg)
  } else if stream.equal_keyword("len") {
    Some(UnaryOp::Len)
  } else if stream.equal_keyword("ord") {
    Some(UnaryOp::Ord)
  } else if stream.equal_keyword("chr") {
    Some(UnaryOp::Chr)
  } else {
    None
  };

  match op {
    Some(op) => {
      let operand = parse_unary(stream)?;
      Ok(ExprNode::new(ExprNodeKind::Unary(op, Box::new(operand)), pos))
    }
    None => parse_primary(stream),
  }
}

fn parse_primary(stream: &mut TokenStream) -> CompileResult<ExprNode> {
  let pos = stream.position();

  if stream.equal("(") {
    let inner = parse_expr(stream)?;
    stream.skip(")")?;
    return Ok(ExprNode::new(ExprNodeKind::Paren(Box::new(inner)), pos));
  }

  let kind = match stream.peek().map(|token| token.kind) {
    Some(TokenKind::Num) => ExprNodeKind::Int(stream.get_number()?),
    Some(TokenKind::Char) => {
      let literal = stream.get_literal()?;
      ExprNodeKind::Char(literal.chars().next().unwrap_or('\0'))
    }
    Some(TokenKind::Str) => ExprNodeKind::Str(stream.get_literal()?),
    Some(TokenKind::Ident) => {
      let name = stream.get_ident()?;
      if stream.peek_is("[") {
        ExprNodeKind::ArrayElem(parse_array_elem(stream, name)?)
      } else {
        ExprNodeKind::Ident(name.name)
      }
    }
    Some(TokenKind::Keyword) if stream.equal_keyword("true") => ExprNodeKind::Bool(true),
    Some(TokenKind::Keyword) if stream.equal_keyword("false") => ExprNodeKind::Bool(false),
    Some(TokenKind::Keyword) if stream.equal_keyword("null") => ExprNodeKind::PairLit,
    _ => return Err(stream.unexpected("where an expression was expected")),
  };
  Ok(ExprNode::new(kind, pos))
}

/// Lightweight cursor over the token vector.
pub(crate) struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
}

impl<'a> TokenStream<'a> {
  pub(crate) fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn peek_nth(&self, n: usize) -> Option<&Token> {
    self.tokens.get(self.pos + n)
  }

  /// Source position of the current token.
  fn position(&self) -> Position {
    let loc = self.peek().map_or(self.source.len(), |token| token.loc);
    Position::from_offset(self.source, loc)
  }

  fn token_is(&self, token: Option<&Token>, kind: TokenKind, text: &str) -> bool {
    token.is_some_and(|token| {
      token.kind == kind && token.len == text.len() && token_text(token, self.source) == text
    })
  }

  fn peek_is(&self, op: &str) -> bool {
    self.token_is(self.peek(), TokenKind::Punctuator, op)
  }

  fn peek_nth_is(&self, n: usize, op: &str) -> bool {
    self.token_is(self.peek_nth(n), TokenKind::Punctuator, op)
  }

  fn peek_keyword(&self, keyword: &str) -> bool {
    self.token_is(self.peek(), TokenKind::Keyword, keyword)
  }

  /// Consume the current token if it matches the provided punctuator.
  fn equal(&mut self, op: &str) -> bool {
    if self.peek_is(op) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn equal_keyword(&mut self, keyword: &str) -> bool {
    if self.peek_keyword(keyword) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn skip(&mut self, s: &str) -> CompileResult<()> {
    if self.equal(s) {
      Ok(())
    } else {
      Err(self.expected(&format!("\"{s}\"")))
    }
  }

  fn skip_keyword(&mut self, keyword: &str) -> CompileResult<()> {
    if self.equal_keyword(keyword) {
      Ok(())
    } else {
      Err(self.expected(&format!("\"{keyword}\"")))
    }
  }

  fn expected(&self, what: &str) -> CompileError {
    let (loc, got) = match self.peek() {
      Some(token) => (token.loc, describe_token(Some(token), self.source)),
      None => (self.source.len(), "EOF".to_string()),
    };
    CompileError::at(self.source, loc, format!("expected {what}, but got \"{got}\""))
  }

  fn unexpected(&self, context: &str) -> CompileError {
    let (loc, got) = match self.peek() {
      Some(token) => (token.loc, describe_token(Some(token), self.source)),
      None => (self.source.len(), "EOF".to_string()),
    };
    CompileError::at(self.source, loc, format!("unexpected \"{got}\" {context}"))
  }

  fn get_ident(&mut self) -> CompileResult<Ident> {
    match self.peek() {
      Some(token) if token.kind == TokenKind::Ident => {
        let ident = Ident::new(
          token_text(token, self.source),
          Position::from_offset(self.source, token.loc),
        );
        self.pos += 1;
        Ok(ident)
      }
      _ => Err(self.expected("an identifier")),
    }
  }

  fn get_number(&mut self) -> CompileResult<i64> {
    match self.peek() {
      Some(token) if token.kind == TokenKind::Num => {
        let value = token.value.ok_or_else(|| {
          CompileError::at(
            self.source,
            token.loc,
            "internal error: numeric token missing value",
          )
        })?;
        self.pos += 1;
        Ok(value)
      }
      _ => Err(self.expected("a number")),
    }
  }

  fn get_literal(&mut self) -> CompileResult<String> {
    match self.peek() {
      Some(token) if matches!(token.kind, TokenKind::Char | TokenKind::Str) => {
        let literal = token.literal.clone().ok_or_else(|| {
          CompileError::at(
            self.source,
            token.loc,
            "internal error: literal token missing its text",
          )
        })?;
        self.pos += 1;
        Ok(literal)
      }
      _ => Err(self.expected("a literal")),
    }
  }

  /// Whether the current token starts a type.
  fn at_type(&self) -> bool {
    ["int", "bool", "char", "string", "pair"]
      .iter()
      .any(|keyword| self.peek_keyword(keyword))
  }

  /// Whether a function definition starts here: a type, a name, then `(`.
  fn at_function(&mut self) -> bool {
    if !self.at_type() {
      return false;
    }
    let start = self.pos;
    let is_function =
      parse_type(self).is_ok() && self.get_ident().is_ok() && self.peek_is("(");
    self.pos = start;
    is_function
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek().map(|token| token.kind), Some(TokenKind::Eof))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tokenizer::tokenize;

  fn parse_source(source: &str) -> CompileResult<ProgramNode> {
    parse(tokenize(source)?, source)
  }

  fn expr(source: &str) -> ExprNode {
    let mut stream = TokenStream::new(tokenize(source).unwrap(), source);
    parse_expr(&mut stream).unwrap()
  }

  #[test]
  fn multiplication_binds_tighter_than_addition() {
    let node = expr("1 + 2 * 3");
    let ExprNodeKind::Binary(BinaryOp::Add, lhs, rhs) = node.kind else {
      panic!("expected an addition, got {node:?}");
    };
    assert!(matches!(lhs.kind, ExprNodeKind::Int(1)));
    assert!(matches!(rhs.kind, ExprNodeKind::Binary(BinaryOp::Mul, _, _)));
  }

  #[test]
  fn minus_before_literal_folds_into_it() {
    assert!(matches!(expr("-2147483648").kind, ExprNodeKind::Int(-2147483648)));
    assert!(matches!(
      expr("- x").kind,
      ExprNodeKind::Unary(UnaryOp::Neg, _)
    ));
    assert!(matches!(
      expr("x - 1").kind,
      ExprNodeKind::Binary(BinaryOp::Sub, _, _)
    ));
  }

  #[test]
  fn functions_are_told_apart_from_declarations() {
    let program = parse_source(
      "begin int f(int x) is return x end int y = call f(1); println y end",
    )
    .unwrap();
    assert_eq!(program.funcs.len(), 1);
    assert_eq!(program.funcs[0].params.len(), 1);
    let body = program.body.unwrap();
    assert!(matches!(body.kind, StatNodeKind::Seq(..)));
  }

  #[test]
  fn bare_pair_is_only_allowed_inside_pair_types() {
    let program = parse_source("begin pair(pair, int[]) p = null end").unwrap();
    let StatNodeKind::Declare { ty, .. } = &program.body.unwrap().kind else {
      panic!("expected a declaration");
    };
    assert_eq!(
      *ty,
      TypeNode::Pair(
        Box::new(TypeNode::AnyPair),
        Box::new(TypeNode::Array(Box::new(TypeNode::Base(BaseType::Int)))),
      )
    );
    assert!(parse_source("begin pair p = null end").is_err());
  }

  #[test]
  fn trailing_tokens_are_rejected() {
    let err = parse_source("begin skip end skip").unwrap_err();
    assert!(err.to_string().contains("after the end of the program"));
  }
}
