use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::lex_next;
use crate::lex::LexMode;
use crate::lex::Lexer;
use crate::loc::Loc;
use crate::token::Token;
use crate::token::TT;

pub mod drive;
pub mod expr;
pub mod func;
pub mod obj;
pub mod operator;
pub mod stmt;
#[cfg(test)]
mod tests;
pub mod toplevel;

/// How deeply expressions and statements may nest before parsing fails instead of exhausting the
/// stack of the parser or of anything walking the tree afterwards.
pub const MAX_NESTING_DEPTH: usize = 64;

// Passed by value to every parse_* method; use the with_* methods to derive an altered copy for nested calls.
// These can change between calls, so they don't live on Parser, which would otherwise need unwinding after each call.
#[derive(Clone, Copy, Default)]
pub struct ParseCtx {
  // Inside a loop or switch, so an unlabelled `break` has a target.
  pub breakable: bool,
  // Inside a loop, so an unlabelled `continue` has a target.
  pub continuable: bool,
}

impl ParseCtx {
  pub fn with_breakable(&self, breakable: bool) -> ParseCtx {
    ParseCtx { breakable, ..*self }
  }

  pub fn with_loop(&self) -> ParseCtx {
    ParseCtx {
      breakable: true,
      continuable: true,
    }
  }

  // Jump targets never cross a function boundary.
  pub fn for_function_body(&self) -> ParseCtx {
    ParseCtx::default()
  }
}

#[derive(Debug)]
#[must_use]
pub struct MaybeToken {
  typ: TT,
  loc: Loc,
  matched: bool,
}

impl MaybeToken {
  pub fn is_match(&self) -> bool {
    self.matched
  }

  pub fn match_loc(&self) -> Option<Loc> {
    if self.matched {
      Some(self.loc)
    } else {
      None
    }
  }

  pub fn error(&self, err: SyntaxErrorType) -> SyntaxError {
    debug_assert!(!self.matched);
    self.loc.error(err, Some(self.typ))
  }

  pub fn map<R, F: FnOnce(Self) -> R>(self, f: F) -> Option<R> {
    if self.matched {
      Some(f(self))
    } else {
      None
    }
  }

  pub fn and_then<R, F: FnOnce() -> SyntaxResult<R>>(self, f: F) -> SyntaxResult<Option<R>> {
    Ok(if self.matched { Some(f()?) } else { None })
  }
}

pub struct ParserCheckpoint {
  next_tok_i: usize,
}

// To get the lexer's `next` after this token was lexed, use `token.loc.1`.
struct BufferedToken {
  token: Token,
  lex_mode: LexMode,
}

pub struct Parser<'a> {
  lexer: Lexer<'a>,
  buf: Vec<BufferedToken>,
  next_tok_i: usize,
  // Labels of the statements enclosing the current position, innermost last.
  labels: Vec<String>,
  // Expressions and statements currently being parsed, outermost included.
  depth: usize,
}

// Parsing is spread over impl blocks in the submodules so that every rule is a method on Parser.
impl<'a> Parser<'a> {
  pub fn new(lexer: Lexer<'a>) -> Parser<'a> {
    Parser {
      lexer,
      buf: Vec::new(),
      next_tok_i: 0,
      labels: Vec::new(),
      depth: 0,
    }
  }

  /// Runs `f` one nesting level deeper, failing once [`MAX_NESTING_DEPTH`] is reached.
  pub fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> SyntaxResult<T>) -> SyntaxResult<T> {
    if self.depth >= MAX_NESTING_DEPTH {
      return Err(self.peek().error(SyntaxErrorType::NestingTooDeep));
    };
    self.depth += 1;
    let result = f(self);
    self.depth -= 1;
    result
  }

  pub fn source_range(&self) -> Loc {
    self.lexer.source_range()
  }

  pub fn str(&self, loc: Loc) -> &str {
    &self.lexer[loc]
  }

  pub fn string(&self, loc: Loc) -> String {
    self.str(loc).to_string()
  }

  pub fn checkpoint(&self) -> ParserCheckpoint {
    ParserCheckpoint {
      next_tok_i: self.next_tok_i,
    }
  }

  /// The range from the first token consumed since `checkpoint` to the last token consumed.
  pub fn since_checkpoint(&self, checkpoint: &ParserCheckpoint) -> Loc {
    if self.next_tok_i <= checkpoint.next_tok_i {
      let at = self
        .buf
        .get(checkpoint.next_tok_i)
        .map(|t| t.token.loc.0)
        .unwrap_or_else(|| self.lexer.next());
      return Loc::at(at);
    };
    let start = self.buf[checkpoint.next_tok_i].token.loc.0;
    let end = self.buf[self.next_tok_i - 1].token.loc.1;
    Loc(start, end)
  }

  pub fn restore_checkpoint(&mut self, checkpoint: ParserCheckpoint) {
    self.next_tok_i = checkpoint.next_tok_i;
  }

  fn reset_to(&mut self, n: usize) {
    self.next_tok_i = n;
    self.buf.truncate(n);
    match self.buf.last() {
      Some(t) => self.lexer.set_next(t.token.loc.1),
      None => self.lexer.set_next(0),
    };
  }

  fn forward<K: FnOnce(&Token) -> bool>(&mut self, mode: LexMode, keep: K) -> (bool, Token) {
    // A token lexed ahead under another mode may be wrong (e.g. `/` vs regex), so lex it again.
    if self
      .buf
      .get(self.next_tok_i)
      .is_some_and(|t| t.lex_mode != mode)
    {
      self.reset_to(self.next_tok_i);
    }
    debug_assert!(self.buf.len() >= self.next_tok_i);
    if self.buf.len() == self.next_tok_i {
      let token = lex_next(&mut self.lexer, mode);
      self.buf.push(BufferedToken {
        token,
        lex_mode: mode,
      });
    }
    let t = self.buf[self.next_tok_i].token.clone();
    let k = keep(&t);
    if k {
      self.next_tok_i += 1;
    };
    (k, t)
  }

  pub fn consume_with_mode(&mut self, mode: LexMode) -> Token {
    self.forward(mode, |_| true).1
  }

  pub fn consume(&mut self) -> Token {
    self.consume_with_mode(LexMode::Standard)
  }

  /// Consumes the next token regardless of type, and returns its raw source code as a string.
  pub fn consume_as_string(&mut self) -> String {
    let loc = self.consume().loc;
    self.string(loc)
  }

  pub fn peek_with_mode(&mut self, mode: LexMode) -> Token {
    self.forward(mode, |_| false).1
  }

  pub fn peek(&mut self) -> Token {
    self.peek_with_mode(LexMode::Standard)
  }

  /// Peeks the next N tokens, lexing each with the corresponding mode.
  pub fn peek_n_with_mode<const N: usize>(&mut self, modes: [LexMode; N]) -> [Token; N] {
    let cp = self.checkpoint();
    let tokens = modes.map(|mode| self.forward(mode, |_| true).1);
    self.restore_checkpoint(cp);
    tokens
  }

  pub fn peek_n<const N: usize>(&mut self) -> [Token; N] {
    self.peek_n_with_mode([LexMode::Standard; N])
  }

  pub fn maybe_consume_with_mode(&mut self, typ: TT, mode: LexMode) -> MaybeToken {
    let (matched, t) = self.forward(mode, |t| t.typ == typ);
    MaybeToken {
      typ,
      matched,
      loc: t.loc,
    }
  }

  pub fn consume_if(&mut self, typ: TT) -> MaybeToken {
    self.maybe_consume_with_mode(typ, LexMode::Standard)
  }

  pub fn consume_if_pred<F: FnOnce(&Token) -> bool>(&mut self, pred: F) -> MaybeToken {
    let (matched, t) = self.forward(LexMode::Standard, pred);
    MaybeToken {
      typ: t.typ,
      matched,
      loc: t.loc,
    }
  }

  pub fn require_with_mode(&mut self, typ: TT, mode: LexMode) -> SyntaxResult<Token> {
    let t = self.consume_with_mode(mode);
    if t.typ != typ {
      Err(t.error(if t.typ == TT::EOF {
        SyntaxErrorType::UnexpectedEnd
      } else {
        SyntaxErrorType::RequiredTokenNotFound(typ)
      }))
    } else {
      Ok(t)
    }
  }

  pub fn require_predicate<P: FnOnce(TT) -> bool>(
    &mut self,
    pred: P,
    expected: &'static str,
  ) -> SyntaxResult<Token> {
    let t = self.consume_with_mode(LexMode::Standard);
    if !pred(t.typ) {
      Err(t.error(SyntaxErrorType::ExpectedSyntax(expected)))
    } else {
      Ok(t)
    }
  }

  pub fn require(&mut self, typ: TT) -> SyntaxResult<Token> {
    self.require_with_mode(typ, LexMode::Standard)
  }
}
