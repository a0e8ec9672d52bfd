use crate::lex::lex_next;
use crate::lex::LexMode;
use crate::lex::Lexer;
use crate::token::TT;
use crate::token::TT::*;

fn check<const N: usize>(code: &str, expecteds: [TT; N]) {
  check_mode(code, LexMode::Standard, expecteds);
}

fn check_mode<const N: usize>(code: &str, mode: LexMode, expecteds: [TT; N]) {
  let mut lexer = Lexer::new(code);
  for expected in expecteds {
    let t = lex_next(&mut lexer, mode);
    assert_eq!(t.typ, expected, "lexing {:?}", code);
  }
  let t = lex_next(&mut lexer, LexMode::Standard);
  assert_eq!(EOF, t.typ);
}

#[test]
fn test_lex_keywords() {
  check("class", [KeywordClass]);
  check("instanceof", [KeywordInstanceof]);
  check("import(", [KeywordImport, ParenthesisOpen]);
}

#[test]
fn test_lex_identifiers() {
  check("h929", [Identifier]);
  check("iff", [Identifier]);
  check("instanceofx", [Identifier]);
  check("$index _x", [Identifier, Identifier]);
  check("café", [Identifier]);
}

#[test]
fn test_lex_literal_numbers() {
  check("1", [LiteralNumber]);
  check("929", [LiteralNumber]);
  check(".929", [LiteralNumber]);
  check(". 929", [Dot, LiteralNumber]);
  check("1e3 1.5E-2", [LiteralNumber, LiteralNumber]);
  check("0x1F 0b10 0o7", [LiteralNumber, LiteralNumber, LiteralNumber]);
  check("?.929", [Question, LiteralNumber]);
  check("?..929", [QuestionDot, LiteralNumber]);
  check("1e", [Invalid]);
  check("3in", [Invalid, KeywordIn]);
  check("10n", [LiteralBigInt]);
}

#[test]
fn test_lex_literal_strings() {
  check("'hello world'", [LiteralString]);
  check("\"a\\\"b\"", [LiteralString]);
  check("'line \\\ncontinued'", [LiteralString]);
  check("'hello world\n'", [Invalid]);
}

#[test]
fn test_lex_templates() {
  check("`abc`", [LiteralTemplatePartStringEnd]);
  check("`a${", [LiteralTemplatePartString]);
  check_mode("b}`", LexMode::TemplateStrContinue, [LiteralTemplatePartStringEnd]);
}

#[test]
fn test_lex_regex_depends_on_mode() {
  check_mode("/a[/]b/gi", LexMode::SlashIsRegex, [LiteralRegex]);
  check("/a/", [Slash, Identifier, Slash]);
}

#[test]
fn test_lex_comments_and_line_terminators() {
  let mut lexer = Lexer::new("a // x\n/* y */ b /* \n */ c");
  let a = lex_next(&mut lexer, LexMode::Standard);
  assert!(!a.preceded_by_line_terminator);
  let b = lex_next(&mut lexer, LexMode::Standard);
  assert_eq!(b.typ, Identifier);
  assert!(b.preceded_by_line_terminator);
  let c = lex_next(&mut lexer, LexMode::Standard);
  assert!(c.preceded_by_line_terminator);
  assert_eq!(&lexer[c.loc], "c");
}

#[test]
fn test_lex_operators() {
  check(
    "a <<= b >>>= c ??= d?.e",
    [
      Identifier,
      ChevronLeftChevronLeftEquals,
      Identifier,
      ChevronRightChevronRightChevronRightEquals,
      Identifier,
      QuestionQuestionEquals,
      Identifier,
      QuestionDot,
      Identifier,
    ],
  );
}
