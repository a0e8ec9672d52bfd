use crate::char::is_id_continue;
use crate::char::is_id_start;
use crate::char::is_line_terminator;
use crate::char::is_whitespace;
use crate::loc::Loc;
use crate::token::Token;
use crate::token::TT;
use ahash::HashMap;
use aho_corasick::AhoCorasick;
use aho_corasick::Anchored;
use aho_corasick::Input;
use aho_corasick::MatchKind;
use aho_corasick::StartKind;
use core::ops::Index;
use memchr::memchr3;
use memchr::memmem;
use once_cell::sync::Lazy;

#[cfg(test)]
mod tests;

/// How the next token should be read where the grammar is ambiguous at the character level.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LexMode {
  /// `/` starts a regular expression literal.
  SlashIsRegex,
  Standard,
  /// Continue a template literal after the `}` closing a substitution.
  TemplateStrContinue,
}

pub struct Lexer<'a> {
  source: &'a str,
  next: usize,
}

impl<'a> Lexer<'a> {
  pub fn new(source: &'a str) -> Lexer<'a> {
    Lexer { source, next: 0 }
  }

  pub fn next(&self) -> usize {
    self.next
  }

  pub fn set_next(&mut self, next: usize) {
    self.next = next;
  }

  pub fn source_range(&self) -> Loc {
    Loc(0, self.source.len())
  }

  fn rest(&self) -> &'a str {
    &self.source[self.next..]
  }

  fn peek(&self) -> Option<char> {
    self.rest().chars().next()
  }

  fn peek_second(&self) -> Option<char> {
    self.rest().chars().nth(1)
  }

  fn bump(&mut self) -> Option<char> {
    let c = self.peek()?;
    self.next += c.len_utf8();
    Some(c)
  }

  fn bump_if(&mut self, expected: char) -> bool {
    let matched = self.peek() == Some(expected);
    if matched {
      self.next += expected.len_utf8();
    };
    matched
  }

  /// Returns the number of bytes skipped.
  fn bump_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
    let len: usize = self
      .rest()
      .chars()
      .take_while(|&c| pred(c))
      .map(char::len_utf8)
      .sum();
    self.next += len;
    len
  }
}

impl<'a> Index<Loc> for Lexer<'a> {
  type Output = str;

  fn index(&self, index: Loc) -> &Self::Output {
    &self.source[index.0..index.1]
  }
}

#[rustfmt::skip]
static PUNCTUATORS: &[(&str, TT)] = &[
  ("&", TT::Ampersand), ("&&", TT::AmpersandAmpersand), ("&&=", TT::AmpersandAmpersandEquals),
  ("&=", TT::AmpersandEquals),
  ("*", TT::Asterisk), ("**", TT::AsteriskAsterisk), ("**=", TT::AsteriskAsteriskEquals),
  ("*=", TT::AsteriskEquals),
  ("|", TT::Bar), ("||", TT::BarBar), ("||=", TT::BarBarEquals), ("|=", TT::BarEquals),
  ("{", TT::BraceOpen), ("}", TT::BraceClose),
  ("[", TT::BracketOpen), ("]", TT::BracketClose),
  ("(", TT::ParenthesisOpen), (")", TT::ParenthesisClose),
  ("^", TT::Caret), ("^=", TT::CaretEquals),
  ("<", TT::ChevronLeft), ("<<", TT::ChevronLeftChevronLeft),
  ("<<=", TT::ChevronLeftChevronLeftEquals), ("<=", TT::ChevronLeftEquals),
  (">", TT::ChevronRight), (">>", TT::ChevronRightChevronRight),
  (">>>", TT::ChevronRightChevronRightChevronRight),
  (">>>=", TT::ChevronRightChevronRightChevronRightEquals),
  (">>=", TT::ChevronRightChevronRightEquals), (">=", TT::ChevronRightEquals),
  (":", TT::Colon), (",", TT::Comma), (";", TT::Semicolon), ("~", TT::Tilde),
  (".", TT::Dot), ("...", TT::DotDotDot),
  ("=", TT::Equals), ("=>", TT::EqualsChevronRight), ("==", TT::EqualsEquals),
  ("===", TT::EqualsEqualsEquals),
  ("!", TT::Exclamation), ("!=", TT::ExclamationEquals), ("!==", TT::ExclamationEqualsEquals),
  ("-", TT::Hyphen), ("-=", TT::HyphenEquals), ("--", TT::HyphenHyphen),
  ("+", TT::Plus), ("+=", TT::PlusEquals), ("++", TT::PlusPlus),
  ("%", TT::Percent), ("%=", TT::PercentEquals),
  ("/", TT::Slash), ("/=", TT::SlashEquals),
  ("?", TT::Question), ("?.", TT::QuestionDot), ("?.[", TT::QuestionDotBracketOpen),
  ("?.(", TT::QuestionDotParenthesisOpen), ("??", TT::QuestionQuestion),
  ("??=", TT::QuestionQuestionEquals),
];

#[rustfmt::skip]
static KEYWORDS: &[(&str, TT)] = &[
  ("async", TT::KeywordAsync), ("await", TT::KeywordAwait), ("break", TT::KeywordBreak),
  ("case", TT::KeywordCase), ("catch", TT::KeywordCatch), ("class", TT::KeywordClass),
  ("const", TT::KeywordConst), ("continue", TT::KeywordContinue),
  ("debugger", TT::KeywordDebugger), ("default", TT::KeywordDefault),
  ("delete", TT::KeywordDelete), ("do", TT::KeywordDo), ("else", TT::KeywordElse),
  ("enum", TT::KeywordEnum), ("export", TT::KeywordExport), ("extends", TT::KeywordExtends),
  ("finally", TT::KeywordFinally), ("for", TT::KeywordFor), ("function", TT::KeywordFunction),
  ("get", TT::KeywordGet), ("if", TT::KeywordIf), ("import", TT::KeywordImport),
  ("in", TT::KeywordIn), ("instanceof", TT::KeywordInstanceof), ("let", TT::KeywordLet),
  ("new", TT::KeywordNew), ("of", TT::KeywordOf), ("return", TT::KeywordReturn),
  ("set", TT::KeywordSet), ("static", TT::KeywordStatic), ("super", TT::KeywordSuper),
  ("switch", TT::KeywordSwitch), ("this", TT::KeywordThis), ("throw", TT::KeywordThrow),
  ("try", TT::KeywordTry), ("typeof", TT::KeywordTypeof), ("var", TT::KeywordVar),
  ("void", TT::KeywordVoid), ("while", TT::KeywordWhile), ("with", TT::KeywordWith),
  ("yield", TT::KeywordYield),
  ("false", TT::LiteralFalse), ("null", TT::LiteralNull), ("true", TT::LiteralTrue),
];

static KEYWORD_LOOKUP: Lazy<HashMap<&'static str, TT>> =
  Lazy::new(|| KEYWORDS.iter().copied().collect());

// Longest punctuator at the start of the input. Building can only fail for pattern sets that
// exceed automaton limits, in which case every punctuator lexes as invalid.
static PUNCTUATOR_MATCHER: Lazy<Option<AhoCorasick>> = Lazy::new(|| {
  AhoCorasick::builder()
    .start_kind(StartKind::Anchored)
    .match_kind(MatchKind::LeftmostLongest)
    .build(PUNCTUATORS.iter().map(|(text, _)| text.as_bytes()))
    .ok()
});

/// The source text of a keyword, or of the `true`, `false` and `null` literals. Any of these can
/// appear where an identifier name is expected, such as after `.` or as a property key.
pub fn keyword_text(typ: TT) -> Option<&'static str> {
  KEYWORDS
    .iter()
    .find(|(_, tt)| *tt == typ)
    .map(|(text, _)| *text)
}

fn punctuator(rest: &str) -> Option<(TT, usize)> {
  let matcher = PUNCTUATOR_MATCHER.as_ref()?;
  let m = matcher.find(Input::new(rest).anchored(Anchored::Yes))?;
  Some((PUNCTUATORS[m.pattern().as_usize()].1, m.end()))
}

/// Skips whitespace and comments. Returns whether any of it contained a line terminator.
fn skip_trivia(lexer: &mut Lexer<'_>) -> bool {
  let mut saw_line_terminator = false;
  loop {
    let rest = lexer.rest();
    if rest.starts_with("//") {
      lexer.next += 2;
      lexer.bump_while(|c| !is_line_terminator(c));
    } else if let Some(body) = rest.strip_prefix("/*") {
      // An unterminated comment runs to the end of the source.
      let (text, closer) = match memmem::find(body.as_bytes(), b"*/") {
        Some(end) => (&body[..end], 2),
        None => (body, 0),
      };
      saw_line_terminator |= text.chars().any(is_line_terminator);
      lexer.next += 2 + text.len() + closer;
    } else {
      match lexer.peek() {
        Some(c) if is_line_terminator(c) => saw_line_terminator = true,
        Some(c) if is_whitespace(c) => {}
        _ => break,
      };
      lexer.bump();
    };
  }
  saw_line_terminator
}

fn lex_word(lexer: &mut Lexer<'_>) -> TT {
  let start = lexer.next;
  lexer.bump_while(is_id_continue);
  KEYWORD_LOOKUP
    .get(&lexer.source[start..lexer.next])
    .copied()
    .unwrap_or(TT::Identifier)
}

fn lex_number(lexer: &mut Lexer<'_>) -> Option<TT> {
  let radix = match lexer.rest().as_bytes() {
    [b'0', b'x' | b'X', ..] => 16,
    [b'0', b'o' | b'O', ..] => 8,
    [b'0', b'b' | b'B', ..] => 2,
    _ => 10,
  };
  if radix != 10 {
    lexer.next += 2;
    if lexer.bump_while(|c| c.is_digit(radix)) == 0 {
      return Some(TT::Invalid);
    };
    return Some(if lexer.bump_if('n') {
      TT::LiteralBigInt
    } else {
      TT::LiteralNumber
    });
  };

  let source = lexer.source;
  let start = lexer.next;
  lexer.bump_while(|c| c.is_ascii_digit());
  let integer = &source[start..lexer.next];
  if !integer.is_empty() && lexer.bump_if('n') {
    return Some(TT::LiteralBigInt);
  };
  // Legacy octal integers like `017` have no fraction.
  let legacy_octal =
    integer.len() > 1 && integer.starts_with('0') && integer.bytes().all(|b| b < b'8');
  if !legacy_octal && lexer.bump_if('.') {
    lexer.bump_while(|c| c.is_ascii_digit());
  };
  if matches!(lexer.peek(), Some('e' | 'E')) {
    lexer.bump();
    if matches!(lexer.peek()?, '+' | '-') {
      lexer.bump();
    };
    if lexer.bump_while(|c| c.is_ascii_digit()) == 0 {
      return Some(TT::Invalid);
    };
  };
  // `3in` is not `3 in`.
  if lexer.peek().is_some_and(is_id_start) {
    return Some(TT::Invalid);
  };
  Some(TT::LiteralNumber)
}

fn lex_string(lexer: &mut Lexer<'_>) -> Option<TT> {
  let quote = lexer.bump()?;
  let mut valid = true;
  loop {
    match lexer.bump()? {
      '\\' => {
        if lexer.bump()? == '\r' {
          lexer.bump_if('\n');
        };
      }
      // Keep going so the token spans the whole literal.
      '\n' | '\r' => valid = false,
      c if c == quote => break,
      _ => {}
    };
  }
  Some(if valid {
    TT::LiteralString
  } else {
    TT::Invalid
  })
}

/// Template text up to and including the next `${` or closing backtick.
fn lex_template_part(lexer: &mut Lexer<'_>) -> Option<TT> {
  loop {
    let Some(skip) = memchr3(b'\\', b'`', b'$', lexer.rest().as_bytes()) else {
      lexer.next = lexer.source.len();
      return None;
    };
    lexer.next += skip;
    match lexer.bump()? {
      '\\' => {
        lexer.bump()?;
      }
      '`' => return Some(TT::LiteralTemplatePartStringEnd),
      _ => {
        if lexer.bump_if('{') {
          return Some(TT::LiteralTemplatePartString);
        };
      }
    };
  }
}

fn lex_regex(lexer: &mut Lexer<'_>) -> Option<TT> {
  lexer.bump();
  let mut in_class = false;
  loop {
    match lexer.bump()? {
      '\\' => {
        if is_line_terminator(lexer.bump()?) {
          return Some(TT::Invalid);
        };
      }
      '/' if !in_class => break,
      '[' => in_class = true,
      ']' => in_class = false,
      c if is_line_terminator(c) => return Some(TT::Invalid),
      _ => {}
    };
  }
  // Flags.
  lexer.bump_while(is_id_continue);
  Some(TT::LiteralRegex)
}

fn lex_token(lexer: &mut Lexer<'_>, mode: LexMode) -> Option<TT> {
  let c = lexer.peek()?;
  match c {
    c if is_id_start(c) => Some(lex_word(lexer)),
    '0'..='9' => lex_number(lexer),
    '.' if lexer.peek_second().is_some_and(|d| d.is_ascii_digit()) => lex_number(lexer),
    '"' | '\'' => lex_string(lexer),
    '`' => {
      lexer.bump();
      lex_template_part(lexer)
    }
    '/' if mode == LexMode::SlashIsRegex => lex_regex(lexer),
    _ => {
      let rest = lexer.rest();
      match punctuator(rest) {
        // `a?.5:b` is a conditional, not optional chaining.
        Some((TT::QuestionDot, _)) if rest[2..].starts_with(|d: char| d.is_ascii_digit()) => {
          lexer.next += 1;
          Some(TT::Question)
        }
        Some((typ, len)) => {
          lexer.next += len;
          Some(typ)
        }
        None => {
          lexer.bump();
          Some(TT::Invalid)
        }
      }
    }
  }
}

/// Reads the next token. Malformed input yields an `Invalid` token covering what was read; the end
/// of the source yields an empty `EOF` token.
pub fn lex_next(lexer: &mut Lexer<'_>, mode: LexMode) -> Token {
  let preceded_by_line_terminator = mode != LexMode::TemplateStrContinue && skip_trivia(lexer);
  let start = lexer.next;
  let typ = if mode == LexMode::TemplateStrContinue {
    lex_template_part(lexer)
  } else if lexer.peek().is_none() {
    Some(TT::EOF)
  } else {
    lex_token(lexer, mode)
  };
  Token {
    loc: Loc(start, lexer.next),
    typ: typ.unwrap_or(TT::Invalid),
    preceded_by_line_terminator,
  }
}
