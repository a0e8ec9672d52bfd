use crate::loc::LineCol;
use crate::loc::Loc;
use crate::token::TT;
use core::fmt;
use core::fmt::Debug;
use core::fmt::Formatter;
use std::error::Error;
use std::fmt::Display;

/// A stable classification of syntax errors produced by the parser.
///
/// Diagnostic codes (prefix `PS`) are assigned per variant and are stable:
/// - `PS0001`: [`SyntaxErrorType::ExpectedNotFound`]
/// - `PS0002`: [`SyntaxErrorType::ExpectedSyntax`]
/// - `PS0003`: [`SyntaxErrorType::InvalidAssigmentTarget`]
/// - `PS0004`: [`SyntaxErrorType::InvalidCharacterEscape`]
/// - `PS0005`: [`SyntaxErrorType::LineTerminatorAfterArrowFunctionParameters`]
/// - `PS0006`: [`SyntaxErrorType::LineTerminatorAfterThrow`]
/// - `PS0007`: [`SyntaxErrorType::LineTerminatorInRegex`]
/// - `PS0008`: [`SyntaxErrorType::LineTerminatorInString`]
/// - `PS0009`: [`SyntaxErrorType::MalformedLiteralNumber`]
/// - `PS0010`: [`SyntaxErrorType::RequiredTokenNotFound`]
/// - `PS0011`: [`SyntaxErrorType::TryStatementHasNoCatchOrFinally`]
/// - `PS0012`: [`SyntaxErrorType::UnexpectedEnd`]
/// - `PS0013`: [`SyntaxErrorType::Unsupported`]
/// - `PS0014`: [`SyntaxErrorType::IllegalJump`]
/// - `PS0015`: [`SyntaxErrorType::NestingTooDeep`]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SyntaxErrorType {
  ExpectedNotFound,
  ExpectedSyntax(&'static str),
  InvalidAssigmentTarget,
  InvalidCharacterEscape,
  LineTerminatorAfterArrowFunctionParameters,
  LineTerminatorAfterThrow,
  LineTerminatorInRegex,
  LineTerminatorInString,
  MalformedLiteralNumber,
  RequiredTokenNotFound(TT),
  TryStatementHasNoCatchOrFinally,
  UnexpectedEnd,
  // Valid JavaScript that this language deliberately does not accept (modules, classes, generators, ...).
  Unsupported(&'static str),
  // `break` or `continue` with no enclosing construct to jump to.
  IllegalJump(&'static str),
  // Expressions or statements nested past the parser's depth limit.
  NestingTooDeep,
}

#[derive(Clone)]
pub struct SyntaxError {
  pub typ: SyntaxErrorType,
  pub loc: Loc,
  pub actual_token: Option<TT>,
}

impl SyntaxError {
  pub fn new(typ: SyntaxErrorType, loc: Loc, actual_token: Option<TT>) -> SyntaxError {
    SyntaxError {
      typ,
      loc,
      actual_token,
    }
  }

  pub fn code(&self) -> &'static str {
    self.typ.code()
  }

  pub fn message(&self) -> String {
    self.typ.message(self.actual_token)
  }

  /// Position of the error within `source`, which must be the text that was parsed.
  pub fn position(&self, source: &str) -> LineCol {
    self.loc.line_col(source)
  }
}

impl Debug for SyntaxError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{} around loc [{}:{}]", self, self.loc.0, self.loc.1)
  }
}

impl Display for SyntaxError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.code(), self.message())
  }
}

impl Error for SyntaxError {}

impl PartialEq for SyntaxError {
  fn eq(&self, other: &Self) -> bool {
    self.typ == other.typ
  }
}

impl Eq for SyntaxError {}

pub type SyntaxResult<T> = Result<T, SyntaxError>;

impl SyntaxErrorType {
  /// Stable diagnostic code for this syntax error variant.
  pub fn code(&self) -> &'static str {
    match self {
      SyntaxErrorType::ExpectedNotFound => "PS0001",
      SyntaxErrorType::ExpectedSyntax(_) => "PS0002",
      SyntaxErrorType::InvalidAssigmentTarget => "PS0003",
      SyntaxErrorType::InvalidCharacterEscape => "PS0004",
      SyntaxErrorType::LineTerminatorAfterArrowFunctionParameters => "PS0005",
      SyntaxErrorType::LineTerminatorAfterThrow => "PS0006",
      SyntaxErrorType::LineTerminatorInRegex => "PS0007",
      SyntaxErrorType::LineTerminatorInString => "PS0008",
      SyntaxErrorType::MalformedLiteralNumber => "PS0009",
      SyntaxErrorType::RequiredTokenNotFound(_) => "PS0010",
      SyntaxErrorType::TryStatementHasNoCatchOrFinally => "PS0011",
      SyntaxErrorType::UnexpectedEnd => "PS0012",
      SyntaxErrorType::Unsupported(_) => "PS0013",
      SyntaxErrorType::IllegalJump(_) => "PS0014",
      SyntaxErrorType::NestingTooDeep => "PS0015",
    }
  }

  /// Human-readable message describing this syntax error.
  pub fn message(&self, actual_token: Option<TT>) -> String {
    match self {
      SyntaxErrorType::ExpectedNotFound => "expected token not found".into(),
      SyntaxErrorType::ExpectedSyntax(expected) => format!("expected {}", expected),
      SyntaxErrorType::InvalidAssigmentTarget => "invalid assignment target".into(),
      SyntaxErrorType::InvalidCharacterEscape => "invalid character escape".into(),
      SyntaxErrorType::LineTerminatorAfterArrowFunctionParameters => {
        "line terminator not allowed after arrow function parameters".into()
      }
      SyntaxErrorType::LineTerminatorAfterThrow => {
        "line terminator not allowed after `throw`".into()
      }
      SyntaxErrorType::LineTerminatorInRegex => {
        "line terminator not allowed in regular expression".into()
      }
      SyntaxErrorType::LineTerminatorInString => {
        "line terminator not allowed in string literal".into()
      }
      SyntaxErrorType::MalformedLiteralNumber => "malformed number literal".into(),
      SyntaxErrorType::RequiredTokenNotFound(token) => match actual_token {
        Some(actual) => format!("expected token {:?} but found {:?}", token, actual),
        None => format!("expected token {:?}", token),
      },
      SyntaxErrorType::TryStatementHasNoCatchOrFinally => {
        "try statement requires a catch or finally block".into()
      }
      SyntaxErrorType::UnexpectedEnd => actual_token
        .map(|tok| format!("unexpected end before {:?}", tok))
        .unwrap_or_else(|| "unexpected end of input".into()),
      SyntaxErrorType::Unsupported(what) => format!("{} is not supported", what),
      SyntaxErrorType::IllegalJump(what) => format!("illegal {} statement", what),
      SyntaxErrorType::NestingTooDeep => "nesting too deep".into(),
    }
  }
}
