use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::token::TT;
use std::cmp::{max, min};
use std::ops::{Add, AddAssign};

/// A half-open range of UTF-8 byte offsets into the source text.
///
/// A zero-width `Loc` (start == end) denotes an insertion point.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Loc(pub usize, pub usize);

impl Loc {
  pub fn at(pos: usize) -> Loc {
    Loc(pos, pos)
  }

  pub fn error(self, typ: SyntaxErrorType, actual_token: Option<TT>) -> SyntaxError {
    SyntaxError::new(typ, self, actual_token)
  }

  pub fn is_empty(&self) -> bool {
    self.0 >= self.1
  }

  pub fn len(&self) -> usize {
    self.1 - self.0
  }

  pub fn start(&self) -> usize {
    self.0
  }

  pub fn end(&self) -> usize {
    self.1
  }

  pub fn extend(&mut self, other: Loc) {
    self.0 = min(self.0, other.0);
    self.1 = max(self.1, other.1);
  }

  pub fn add_option(self, rhs: Option<Loc>) -> Loc {
    let mut new = self;
    if let Some(rhs) = rhs {
      new.extend(rhs);
    };
    new
  }

  /// Resolves the start of this range to a 1-based line and a 0-based column (in chars).
  pub fn line_col(&self, source: &str) -> LineCol {
    LineCol::of(source, self.0)
  }
}

impl Add for Loc {
  type Output = Loc;

  fn add(self, rhs: Self) -> Self::Output {
    let mut new = self;
    new.extend(rhs);
    new
  }
}

impl AddAssign for Loc {
  fn add_assign(&mut self, rhs: Self) {
    self.extend(rhs);
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LineCol {
  pub line: usize,
  pub column: usize,
}

impl LineCol {
  pub fn of(source: &str, offset: usize) -> LineCol {
    let mut line = 1;
    let mut column = 0;
    let mut prev_cr = false;
    for (i, c) in source.char_indices() {
      if i >= offset {
        break;
      };
      match c {
        '\n' if prev_cr => {}
        '\n' | '\r' | '\u{2028}' | '\u{2029}' => {
          line += 1;
          column = 0;
        }
        _ => column += 1,
      };
      prev_cr = c == '\r';
    }
    LineCol { line, column }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extends_to_cover_both() {
    assert_eq!(Loc(4, 6) + Loc(1, 2), Loc(1, 6));
    assert_eq!(Loc(1, 2).add_option(None), Loc(1, 2));
    assert!(Loc::at(3).is_empty());
  }

  #[test]
  fn resolves_line_and_column() {
    let src = "a\nbc\r\n  d";
    assert_eq!(LineCol::of(src, 0), LineCol { line: 1, column: 0 });
    assert_eq!(LineCol::of(src, 3), LineCol { line: 2, column: 1 });
    assert_eq!(LineCol::of(src, 8), LineCol { line: 3, column: 2 });
  }
}
