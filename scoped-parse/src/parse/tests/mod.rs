use super::Parser;
use crate::ast::expr::pat::Pat;
use crate::ast::expr::Expr;
use crate::ast::node::Node;
use crate::ast::obj::ObjMemberType;
use crate::ast::stmt::ForInOfLhs;
use crate::ast::stmt::Stmt;
use crate::error::SyntaxErrorType;
use crate::lex::LexMode;
use crate::lex::Lexer;
use crate::loc::Loc;
use crate::operator::OperatorName;
use crate::parse;
use crate::token::TT;

fn parse_expr(source: &str) -> Node<Expr> {
  let mut body = parse(source).unwrap().stx.body;
  assert_eq!(body.len(), 1, "expected exactly one statement in {:?}", source);
  match *body.remove(0).stx {
    Stmt::Expr(e) => e.stx.expr,
    other => panic!("expected expression statement, got {:?}", other),
  }
}

fn parse_err(source: &str) -> SyntaxErrorType {
  parse(source).unwrap_err().typ
}

#[test]
fn test_parser() {
  let lexer = Lexer::new("let x = /a/ / 1;");
  let mut p = Parser::new(lexer);
  // Initial state.
  let cp = p.checkpoint();
  assert_eq!(p.next_tok_i, 0);

  // Peek the first token.
  let t = p.peek();
  assert_eq!(p.next_tok_i, 0);
  assert_eq!(p.buf.len(), 1);
  assert_eq!(t.typ, TT::KeywordLet);

  // Consume the first two tokens.
  p.consume();
  let t = p.consume();
  assert_eq!(p.next_tok_i, 2);
  assert_eq!(p.buf.len(), 2);
  assert_eq!(t.typ, TT::Identifier);

  // Reset to a past point.
  p.restore_checkpoint(cp);
  assert_eq!(p.next_tok_i, 0);
  assert_eq!(p.buf.len(), 2);

  // Peek using a different mode, which should truncate the buffer.
  let t = p.peek_with_mode(LexMode::SlashIsRegex);
  assert_eq!(p.next_tok_i, 0);
  assert_eq!(p.buf.len(), 1);
  assert_eq!(t.typ, TT::KeywordLet);
}

#[test]
fn test_precedence() {
  let expr = parse_expr("a + b * c");
  let Expr::Binary(add) = *expr.stx else {
    panic!("expected binary expression");
  };
  assert_eq!(add.stx.operator, OperatorName::Addition);
  let Expr::Binary(mul) = add.stx.right.stx.as_ref() else {
    panic!("expected binary expression");
  };
  assert_eq!(mul.stx.operator, OperatorName::Multiplication);
  assert_eq!(mul.loc, Loc(4, 9));
}

#[test]
fn test_exponentiation_is_right_associative() {
  let expr = parse_expr("a ** b ** c");
  let Expr::Binary(outer) = *expr.stx else {
    panic!("expected binary expression");
  };
  assert!(matches!(*outer.stx.left.stx, Expr::Id(_)));
  assert!(matches!(*outer.stx.right.stx, Expr::Binary(_)));
}

#[test]
fn test_member_locs() {
  let expr = parse_expr("a.b[c](d)");
  assert_eq!(expr.loc, Loc(0, 9));
  let Expr::Call(call) = *expr.stx else {
    panic!("expected call");
  };
  assert_eq!(call.stx.arguments.len(), 1);
  let Expr::ComputedMember(member) = call.stx.callee.stx.as_ref() else {
    panic!("expected computed member");
  };
  assert_eq!(member.loc, Loc(0, 6));
}

#[test]
fn test_arrow_and_grouping() {
  assert!(matches!(*parse_expr("(a, b) => a + b").stx, Expr::ArrowFunc(_)));
  assert!(matches!(*parse_expr("i => '#' + i").stx, Expr::ArrowFunc(_)));
  assert!(matches!(*parse_expr("(a, b)").stx, Expr::Binary(_)));
  assert!(matches!(*parse_expr("({ a, b }) => a").stx, Expr::ArrowFunc(_)));
}

#[test]
fn test_assignment_targets() {
  let expr = parse_expr("a = 1");
  let Expr::Binary(assign) = *expr.stx else {
    panic!("expected assignment");
  };
  assert!(matches!(*assign.stx.left.stx, Expr::IdPat(_)));

  let expr = parse_expr("[a, { b: c = 1 }] = x");
  let Expr::Binary(assign) = *expr.stx else {
    panic!("expected assignment");
  };
  let Expr::ArrPat(arr) = assign.stx.left.stx.as_ref() else {
    panic!("expected array pattern");
  };
  assert_eq!(arr.stx.elements.len(), 2);

  let expr = parse_expr("[a.b] = x");
  let Expr::Binary(assign) = *expr.stx else {
    panic!("expected assignment");
  };
  let Expr::ArrPat(arr) = assign.stx.left.stx.as_ref() else {
    panic!("expected array pattern");
  };
  let elem = arr.stx.elements[0].as_ref().unwrap();
  assert!(matches!(*elem.target.stx, Pat::Member(_)));

  assert_eq!(parse_err("a + b = 1"), SyntaxErrorType::InvalidAssigmentTarget);
  assert_eq!(parse_err("a?.b = 1"), SyntaxErrorType::InvalidAssigmentTarget);
  assert_eq!(parse_err("[a] += 1"), SyntaxErrorType::InvalidAssigmentTarget);
  assert_eq!(parse_err("1++"), SyntaxErrorType::InvalidAssigmentTarget);
}

#[test]
fn test_object_literal_members() {
  let expr = parse_expr("({ a, b: 1, [c]: 2, 'd': 3, m() { return 1 }, ...e })");
  let Expr::LitObj(obj) = *expr.stx else {
    panic!("expected object literal");
  };
  let kinds: Vec<&'static str> = obj
    .stx
    .members
    .iter()
    .map(|m| match &m.stx.typ {
      ObjMemberType::Shorthand { .. } => "shorthand",
      ObjMemberType::Valued { .. } => "valued",
      ObjMemberType::Method { .. } => "method",
      ObjMemberType::Rest { .. } => "rest",
    })
    .collect();
  assert_eq!(kinds, vec![
    "shorthand",
    "valued",
    "valued",
    "valued",
    "method",
    "rest"
  ]);
}

#[test]
fn test_template() {
  let expr = parse_expr("`a${b}c${`d${e}`}`");
  let Expr::LitTemplate(tpl) = *expr.stx else {
    panic!("expected template");
  };
  assert_eq!(tpl.stx.parts.len(), 5);
}

#[test]
fn test_regex_and_division() {
  assert!(matches!(*parse_expr("/a+/g.test(b)").stx, Expr::Call(_)));
  assert!(matches!(*parse_expr("a / b / c").stx, Expr::Binary(_)));
}

#[test]
fn test_statements() {
  let top = parse(
    "let b = a + 1; for (const x of xs) { if (x) continue; } for (k in o) break; outer: while (true) { do { break outer; } while (false) } try { f() } catch { } finally { } switch (a) { case 1: break; default: }",
  )
  .unwrap();
  assert_eq!(top.stx.body.len(), 6);
  let Stmt::ForOf(for_of) = top.stx.body[1].stx.as_ref() else {
    panic!("expected for-of");
  };
  assert!(matches!(for_of.stx.lhs, ForInOfLhs::Decl(_)));
  let Stmt::ForIn(for_in) = top.stx.body[2].stx.as_ref() else {
    panic!("expected for-in");
  };
  assert!(matches!(for_in.stx.lhs, ForInOfLhs::Assign(_)));
}

#[test]
fn test_asi() {
  let top = parse("a = 1\nb = 2\nreturn\na").unwrap();
  assert_eq!(top.stx.body.len(), 4);
  let Stmt::Return(ret) = top.stx.body[2].stx.as_ref() else {
    panic!("expected return");
  };
  assert!(ret.stx.value.is_none());
}

#[test]
fn test_top_level_return() {
  let top = parse("return a.foo").unwrap();
  assert!(matches!(*top.stx.body[0].stx, Stmt::Return(_)));
}

#[test]
fn test_import_expression() {
  let expr = parse_expr("import('a')");
  let Expr::Import(import) = *expr.stx else {
    panic!("expected import expression");
  };
  assert_eq!(import.loc, Loc(0, 11));
}

#[test]
fn test_illegal_jumps() {
  assert!(matches!(parse_err("break"), SyntaxErrorType::IllegalJump(_)));
  assert!(matches!(parse_err("continue"), SyntaxErrorType::IllegalJump(_)));
  assert!(matches!(
    parse_err("while (a) { break nope; }"),
    SyntaxErrorType::IllegalJump(_)
  ));
  assert!(matches!(
    parse_err("while (a) { (() => { break; })() }"),
    SyntaxErrorType::IllegalJump(_)
  ));
  assert!(matches!(
    parse_err("switch (a) { case 1: continue; }"),
    SyntaxErrorType::IllegalJump(_)
  ));
}

#[test]
fn test_nesting_depth_is_limited() {
  let deep = |open: &str, inner: &str, close: &str, n: usize| {
    format!("{}{inner}{}", open.repeat(n), close.repeat(n))
  };
  for source in [
    deep("(", "1", ")", 20_000),
    deep("[", "", "]", 20_000),
    deep("{", "", "}", 20_000),
    deep("!", "1", "", 20_000),
    deep("a ? b : ", "c", "", 20_000),
    format!("let {} = y", deep("[", "x", "]", 20_000)),
  ] {
    assert_eq!(parse_err(&source), SyntaxErrorType::NestingTooDeep);
  }
  let err = parse(&deep("(", "1", ")", 20_000)).unwrap_err();
  assert_eq!(err.code(), "PS0015");
  // Realistic nesting stays well under the limit.
  assert!(parse(&deep("(", "1", ")", 40)).is_ok());
  assert!(parse(&deep("{ if (a) ", "b;", " }", 20)).is_ok());
  assert!(parse(&deep("f(() => ", "x", ")", 20)).is_ok());
}

#[test]
fn test_unsupported() {
  for source in [
    "class A {}",
    "async function f() {}",
    "async () => 1",
    "function* g() {}",
    "import a from 'a'",
    "export default a",
    "with (a) {}",
    "({ get a() { return 1 } })",
    "tag`a`",
    "await a",
    "yield a",
    "1n",
  ] {
    assert!(
      matches!(parse_err(source), SyntaxErrorType::Unsupported(_)),
      "{} should be rejected",
      source
    );
  }
}

#[test]
fn test_contextual_keywords_as_names() {
  assert!(matches!(*parse_expr("async(1)").stx, Expr::Call(_)));
  assert!(matches!(*parse_expr("({ get: 1, set })").stx, Expr::LitObj(_)));
  assert!(matches!(*parse_expr("of + let").stx, Expr::Binary(_)));
  assert!(matches!(*parse_expr("a.delete(b)").stx, Expr::Call(_)));
}

#[test]
fn test_syntax_errors() {
  assert_eq!(parse_err("a +"), SyntaxErrorType::UnexpectedEnd);
  assert_eq!(parse_err("'a\nb'"), SyntaxErrorType::LineTerminatorInString);
  assert_eq!(
    parse_err("try {}"),
    SyntaxErrorType::TryStatementHasNoCatchOrFinally
  );
  let err = parse("exports default a").unwrap_err();
  assert_eq!(err.loc.0, 8);
}

#[test]
fn test_tree_serializes_with_type_tags() {
  let top = parse("total + b").unwrap();
  let json = serde_json::to_value(&top).unwrap();
  let stmt = &json["body"][0];
  assert_eq!(stmt["$t"], "Expr");
  assert_eq!(stmt["expr"]["$t"], "Binary");
  assert_eq!(stmt["expr"]["operator"], "Addition");
  assert_eq!(stmt["expr"]["left"], serde_json::json!({"$t": "Id", "name": "total"}));
}
