/// Integration tests for the tokenizer and parser.
///
/// Programs are parsed through `parse_program`; syntax errors are checked via
/// their rendered message and exit status.
use rwacc::CompileError;
use rwacc::error::SYNTAX_EXIT_CODE;
use rwacc::parse_tree::{
  BaseType, ExprNodeKind, LhsNode, Position, ProgramNode, RhsNode, StatNode, StatNodeKind,
  TypeNode,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse(src: &str) -> ProgramNode {
  rwacc::parse_program(src).unwrap_or_else(|err| panic!("parse failed:\n{err}"))
}

fn syntax_error(src: &str) -> CompileError {
  match rwacc::parse_program(src) {
    Ok(program) => panic!("expected a syntax error, parsed: {program:?}"),
    Err(err) => {
      assert_eq!(err.exit_code(), SYNTAX_EXIT_CODE, "{err}");
      err
    }
  }
}

fn body(program: &ProgramNode) -> &StatNode {
  program.body.as_deref().expect("program has a body")
}

/// Flatten a right-nested statement sequence.
fn statements(stat: &StatNode) -> Vec<&StatNode> {
  match &stat.kind {
    StatNodeKind::Seq(first, rest) => {
      let mut out = vec![first.as_ref()];
      out.extend(statements(rest));
      out
    }
    _ => vec![stat],
  }
}

fn int() -> TypeNode {
  TypeNode::Base(BaseType::Int)
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[test]
fn statements_are_sequenced_in_order() {
  let program = parse(
    "begin
  int x = 1;
  x = x + 1;
  print x;
  println x
end",
  );
  let stats = statements(body(&program));
  assert_eq!(stats.len(), 4);
  assert!(matches!(stats[0].kind, StatNodeKind::Declare { .. }));
  assert!(matches!(
    stats[1].kind,
    StatNodeKind::Assign {
      lhs: LhsNode::Ident(_),
      ..
    }
  ));
  assert!(matches!(stats[2].kind, StatNodeKind::Print(_)));
  assert!(matches!(stats[3].kind, StatNodeKind::Println(_)));
  assert_eq!(stats[1].pos, Position::new(3, 3));
}

#[test]
fn nested_blocks_and_control_flow() {
  let program = parse(
    "begin
  while true do
    if false then skip else begin exit 1 end fi
  done
end",
  );
  let StatNodeKind::While { body, .. } = &body(&program).kind else {
    panic!("expected a while loop");
  };
  let body = body.as_deref().expect("loop body");
  let StatNodeKind::If { else_branch, .. } = &body.kind else {
    panic!("expected an if");
  };
  assert!(matches!(
    else_branch.as_deref().map(|stat| &stat.kind),
    Some(StatNodeKind::Begin(_))
  ));
}

#[test]
fn pair_and_array_assignments() {
  let program = parse(
    "begin
  fst p = snd q;
  a[1][2] = call f(1, 'c');
  x = newpair(1, 'c')
end",
  );
  let stats = statements(body(&program));
  assert!(matches!(
    stats[0].kind,
    StatNodeKind::Assign {
      lhs: LhsNode::PairElem(_),
      rhs: RhsNode::PairElem(_)
    }
  ));
  let StatNodeKind::Assign {
    lhs: LhsNode::ArrayElem(elem),
    rhs: RhsNode::Call { args, .. },
  } = &stats[1].kind
  else {
    panic!("expected an array element assignment from a call");
  };
  assert_eq!(elem.indices.len(), 2);
  assert_eq!(args.len(), 2);
  assert!(matches!(
    stats[2].kind,
    StatNodeKind::Assign {
      rhs: RhsNode::NewPair { .. },
      ..
    }
  ));
}

// ---------------------------------------------------------------------------
// Functions and types
// ---------------------------------------------------------------------------

#[test]
fn functions_come_before_the_main_body() {
  let program = parse(
    "begin
  int[] range(int n) is
    int[] a = [0, 1, 2];
    return a
  end
  bool none() is return true end
  int[] r = call range(3)
end",
  );
  assert_eq!(program.funcs.len(), 2);
  let range = &program.funcs[0];
  assert_eq!(range.name.name, "range");
  assert_eq!(range.ret, TypeNode::Array(Box::new(int())));
  assert_eq!(range.params.len(), 1);
  assert_eq!(range.params[0].name.name, "n");
  assert!(program.funcs[1].params.is_empty());
  assert!(matches!(body(&program).kind, StatNodeKind::Declare { .. }));
}

#[test]
fn nested_pair_and_array_types() {
  let program = parse("begin pair(pair(int, bool), char[][]) p = null end");
  let StatNodeKind::Declare { ty, .. } = &body(&program).kind else {
    panic!("expected a declaration");
  };
  let expected = TypeNode::Pair(
    Box::new(TypeNode::Pair(
      Box::new(int()),
      Box::new(TypeNode::Base(BaseType::Bool)),
    )),
    Box::new(TypeNode::Array(Box::new(TypeNode::Array(Box::new(
      TypeNode::Base(BaseType::Char),
    ))))),
  );
  assert_eq!(*ty, expected);
}

// ---------------------------------------------------------------------------
// Lexical details
// ---------------------------------------------------------------------------

#[test]
fn comments_run_to_the_end_of_the_line() {
  let program = parse(
    "# leading comment
begin # after begin
  skip # trailing
end # done",
  );
  assert!(matches!(body(&program).kind, StatNodeKind::Skip));
}

#[test]
fn escapes_are_decoded_in_literals() {
  let program = parse("begin string s = \"a\\tb\\\"c\\n\"; char c = '\\0' end");
  let stats = statements(body(&program));
  let StatNodeKind::Declare {
    rhs: RhsNode::Expr(expr),
    ..
  } = &stats[0].kind
  else {
    panic!("expected a string declaration");
  };
  assert!(matches!(&expr.kind, ExprNodeKind::Str(s) if s == "a\tb\"c\n"));
  let StatNodeKind::Declare {
    rhs: RhsNode::Expr(expr),
    ..
  } = &stats[1].kind
  else {
    panic!("expected a char declaration");
  };
  assert!(matches!(expr.kind, ExprNodeKind::Char('\0')));
}

// ---------------------------------------------------------------------------
// Syntax errors
// ---------------------------------------------------------------------------

#[test]
fn missing_end_is_reported_at_end_of_input() {
  let err = syntax_error("begin\n  skip");
  let message = err.to_string();
  assert!(message.contains("expected \"end\""), "{message}");
  assert!(message.starts_with("2:7:"), "{message}");
}

#[test]
fn missing_semicolon_points_at_the_next_statement() {
  let err = syntax_error("begin\n  skip\n  skip\nend");
  let CompileError::WithLocation {
    location, marker, ..
  } = &err
  else {
    panic!("expected a located error, got {err}");
  };
  assert_eq!(*location, Position::new(3, 3));
  assert_eq!(marker, "  ^");
}

#[test]
fn unknown_escape_is_a_syntax_error() {
  let err = syntax_error("begin char c = '\\q' end");
  assert!(err.to_string().contains("escape"), "{err}");
}

#[test]
fn keywords_cannot_be_identifiers() {
  syntax_error("begin int while = 1 end");
}

#[test]
fn empty_program_is_rejected() {
  syntax_error("");
  syntax_error("# only a comment\n");
}
