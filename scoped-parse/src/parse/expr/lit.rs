use crate::ast::expr::lit::LitArrElem;
use crate::ast::expr::lit::LitArrExpr;
use crate::ast::expr::lit::LitBoolExpr;
use crate::ast::expr::lit::LitNullExpr;
use crate::ast::expr::lit::LitNumExpr;
use crate::ast::expr::lit::LitRegexExpr;
use crate::ast::expr::lit::LitStrExpr;
use crate::ast::expr::lit::LitTemplateExpr;
use crate::ast::expr::lit::LitTemplatePart;
use crate::ast::node::Node;
use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::LexMode;
use crate::loc::Loc;
use crate::num::JsNumber;
use crate::parse::ParseCtx;
use crate::parse::Parser;
use crate::token::Token;
use crate::token::TT;

pub fn normalise_literal_number(raw: &str) -> Option<JsNumber> {
  JsNumber::from_literal(raw)
}

fn hex_value(raw: &str) -> Option<u32> {
  if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
    return None;
  };
  u32::from_str_radix(raw, 16).ok()
}

// Decodes `\u` escapes, returning the number of bytes consumed after the `u` and the code point.
fn decode_unicode_escape(rest: &str) -> Option<(usize, u32)> {
  if let Some(braced) = rest.strip_prefix('{') {
    let end = braced.find('}')?;
    let value = hex_value(&braced[..end]).filter(|&v| v <= 0x10FFFF)?;
    return Some((end + 2, value));
  };
  let value = hex_value(rest.get(..4)?)?;
  Some((4, value))
}

/// Decodes the escapes in the body of a string or template literal.
/// On failure, returns the byte offset of the offending escape within `raw`.
pub fn decode_literal(raw: &str, allow_line_terminators: bool) -> Result<String, usize> {
  let mut norm = String::with_capacity(raw.len());
  let mut i = 0;
  while let Some(c) = raw[i..].chars().next() {
    if c != '\\' {
      if !allow_line_terminators && (c == '\n' || c == '\r') {
        return Err(i);
      };
      norm.push(c);
      i += c.len_utf8();
      continue;
    };
    let escape_start = i;
    i += 1;
    let Some(e) = raw[i..].chars().next() else {
      return Err(escape_start);
    };
    i += e.len_utf8();
    match e {
      // Line continuations produce nothing.
      '\r' => {
        if raw[i..].starts_with('\n') {
          i += 1;
        };
      }
      '\n' | '\u{2028}' | '\u{2029}' => {}
      'b' => norm.push('\x08'),
      'f' => norm.push('\x0c'),
      'n' => norm.push('\n'),
      'r' => norm.push('\r'),
      't' => norm.push('\t'),
      'v' => norm.push('\x0b'),
      '0'..='7' => {
        // Legacy octal escapes, up to three digits and at most 0o377.
        let mut value = e as u32 - '0' as u32;
        let mut len = 1;
        while len < 3 {
          match raw[i..].chars().next() {
            Some(d @ '0'..='7') if value * 8 + (d as u32 - '0' as u32) <= 0o377 => {
              value = value * 8 + (d as u32 - '0' as u32);
              i += 1;
              len += 1;
            }
            _ => break,
          };
        }
        norm.push(char::from_u32(value).ok_or(escape_start)?);
      }
      'x' => {
        let value = raw.get(i..i + 2).and_then(hex_value).ok_or(escape_start)?;
        i += 2;
        norm.push(char::from_u32(value).ok_or(escape_start)?);
      }
      'u' => {
        let (len, value) = decode_unicode_escape(&raw[i..]).ok_or(escape_start)?;
        i += len;
        // Combine a surrogate pair written as two escapes.
        if (0xD800..=0xDBFF).contains(&value) && raw[i..].starts_with("\\u") {
          if let Some((low_len, low)) = decode_unicode_escape(&raw[i + 2..]) {
            if (0xDC00..=0xDFFF).contains(&low) {
              let combined = 0x10000 + ((value - 0xD800) << 10) + (low - 0xDC00);
              i += 2 + low_len;
              norm.push(char::from_u32(combined).unwrap_or('\u{FFFD}'));
              continue;
            };
          };
        };
        // Lone surrogates can't be represented in a Rust string.
        norm.push(char::from_u32(value).unwrap_or('\u{FFFD}'));
      }
      c => norm.push(c),
    };
  }
  Ok(norm)
}

fn escape_error(t: &Token, body_start: usize, offset: usize) -> SyntaxError {
  Loc(body_start + offset, body_start + offset + 1)
    .error(SyntaxErrorType::InvalidCharacterEscape, Some(t.typ))
}

// The raw text of a template part, without the opening backtick (first part only) and the trailing `${` or backtick.
fn template_content(raw: &str, typ: TT, first: bool) -> Option<(usize, &str)> {
  let start = usize::from(first);
  let end = match typ {
    TT::LiteralTemplatePartStringEnd => raw.len().checked_sub(1)?,
    _ => raw.len().checked_sub(2)?,
  };
  if end < start {
    return None;
  };
  raw.get(start..end).map(|body| (start, body))
}

impl<'a> Parser<'a> {
  pub fn lit_arr(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<LitArrExpr>> {
    self.with_loc(|p| {
      p.require(TT::BracketOpen)?;
      let mut elements = Vec::<LitArrElem>::new();
      loop {
        if p.consume_if(TT::Comma).is_match() {
          elements.push(LitArrElem::Empty);
          continue;
        };
        if p.peek().typ == TT::BracketClose {
          break;
        };
        let rest = p.consume_if(TT::DotDotDot).is_match();
        let value = p.expr(ctx, [TT::Comma, TT::BracketClose])?;
        elements.push(if rest {
          LitArrElem::Rest(value)
        } else {
          LitArrElem::Single(value)
        });
        if p.peek().typ == TT::BracketClose {
          break;
        };
        p.require(TT::Comma)?;
      }
      p.require(TT::BracketClose)?;
      Ok(LitArrExpr { elements })
    })
  }

  pub fn lit_bool(&mut self) -> SyntaxResult<Node<LitBoolExpr>> {
    self.with_loc(|p| {
      if p.consume_if(TT::LiteralTrue).is_match() {
        Ok(LitBoolExpr { value: true })
      } else {
        p.require(TT::LiteralFalse)?;
        Ok(LitBoolExpr { value: false })
      }
    })
  }

  pub fn lit_null(&mut self) -> SyntaxResult<Node<LitNullExpr>> {
    self.with_loc(|p| {
      p.require(TT::LiteralNull)?;
      Ok(LitNullExpr {})
    })
  }

  pub fn lit_num(&mut self) -> SyntaxResult<Node<LitNumExpr>> {
    self.with_loc(|p| {
      let value = p.lit_num_val()?;
      Ok(LitNumExpr { value })
    })
  }

  pub fn lit_num_val(&mut self) -> SyntaxResult<JsNumber> {
    let t = self.require(TT::LiteralNumber)?;
    normalise_literal_number(self.str(t.loc))
      .ok_or_else(|| t.error(SyntaxErrorType::MalformedLiteralNumber))
  }

  pub fn lit_regex(&mut self) -> SyntaxResult<Node<LitRegexExpr>> {
    self.with_loc(|p| {
      let t = p.require_with_mode(TT::LiteralRegex, LexMode::SlashIsRegex)?;
      let raw = p.str(t.loc);
      // The lexer guarantees a closing slash; flags follow it.
      let close = raw
        .rfind('/')
        .filter(|&i| i > 0)
        .ok_or_else(|| t.error(SyntaxErrorType::ExpectedSyntax("regex literal")))?;
      Ok(LitRegexExpr {
        pattern: raw[1..close].to_string(),
        flags: raw[close + 1..].to_string(),
      })
    })
  }

  pub fn lit_str(&mut self) -> SyntaxResult<Node<LitStrExpr>> {
    self.with_loc(|p| {
      let value = p.lit_str_val()?;
      Ok(LitStrExpr { value })
    })
  }

  /// Parses a literal string and returns its value with escapes decoded. Does *not* return a node; use `lit_str` for that.
  pub fn lit_str_val(&mut self) -> SyntaxResult<String> {
    let t = self.consume();
    match t.typ {
      TT::LiteralString => {}
      TT::Invalid if matches!(self.str(t.loc).chars().next(), Some('"' | '\'')) => {
        return Err(t.error(SyntaxErrorType::LineTerminatorInString));
      }
      _ => return Err(t.error(SyntaxErrorType::RequiredTokenNotFound(TT::LiteralString))),
    };
    let raw = self.str(t.loc);
    let body = &raw[1..raw.len() - 1];
    decode_literal(body, false).map_err(|offset| escape_error(&t, t.loc.0 + 1, offset))
  }

  pub fn lit_template(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<LitTemplateExpr>> {
    self.with_loc(|p| {
      let parts = p.lit_template_parts(ctx)?;
      Ok(LitTemplateExpr { parts })
    })
  }

  fn lit_template_part_str(&self, t: &Token, first: bool) -> SyntaxResult<(String, bool)> {
    let is_end = match t.typ {
      TT::LiteralTemplatePartString => false,
      TT::LiteralTemplatePartStringEnd => true,
      TT::Invalid | TT::EOF => return Err(t.error(SyntaxErrorType::UnexpectedEnd)),
      _ => return Err(t.error(SyntaxErrorType::ExpectedSyntax("template string part"))),
    };
    let raw = self.str(t.loc);
    let (offset, content) =
      template_content(raw, t.typ, first).ok_or_else(|| t.error(SyntaxErrorType::UnexpectedEnd))?;
    let value = decode_literal(content, true)
      .map_err(|rel| escape_error(t, t.loc.0 + offset, rel))?;
    Ok((value, is_end))
  }

  // NOTE: The next token must definitely be LiteralTemplatePartString{,End}.
  pub fn lit_template_parts(&mut self, ctx: ParseCtx) -> SyntaxResult<Vec<LitTemplatePart>> {
    let t = self.consume();
    let (first, mut is_end) = self.lit_template_part_str(&t, true)?;
    let mut parts = vec![LitTemplatePart::String(first)];
    while !is_end {
      let substitution = self.expr(ctx, [TT::BraceClose])?;
      self.require(TT::BraceClose)?;
      parts.push(LitTemplatePart::Substitution(substitution));
      let t = self.consume_with_mode(LexMode::TemplateStrContinue);
      let (s, end) = self.lit_template_part_str(&t, false)?;
      parts.push(LitTemplatePart::String(s));
      is_end = end;
    }
    Ok(parts)
  }
}

#[cfg(test)]
mod tests {
  use super::decode_literal;

  #[test]
  fn test_decode_literal() {
    assert_eq!(decode_literal(r"a\nb", false), Ok("a\nb".to_string()));
    assert_eq!(decode_literal(r"\x41B\u{43}", false), Ok("ABC".to_string()));
    assert_eq!(decode_literal(r"\uD83D\uDE00", false), Ok("\u{1F600}".to_string()));
    assert_eq!(decode_literal(r"\101", false), Ok("A".to_string()));
    assert_eq!(decode_literal("a\\\nb", false), Ok("ab".to_string()));
    assert_eq!(decode_literal(r"\'\$", false), Ok("'$".to_string()));
    assert_eq!(decode_literal(r"ab\x4", false), Err(2));
    assert_eq!(decode_literal("a\nb", false), Err(1));
    assert_eq!(decode_literal("a\nb", true), Ok("a\nb".to_string()));
  }
}
