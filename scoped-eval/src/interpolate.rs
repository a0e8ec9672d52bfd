//! Bare string interpolation: `a ${b} c` without enclosing backticks, so the literal text may
//! contain quotes and backticks unescaped. The text is turned into a concatenation expression,
//! `"a " + (b) + " c"`, which then goes through the normal pipeline.
//!
//! Unlike a template literal, `\${` always means a literal `${`, even when the backslash is itself
//! preceded by a backslash.

use crate::error::Result;
use crate::error::ScopedEvalError;
use scoped_parse::ast::stmt::Stmt;
use scoped_parse::parse;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Part {
  Str(String),
  Expr(String),
}

// The source of a single expression statement, and nothing else.
fn is_single_expression(source: &str) -> bool {
  match parse(source) {
    Ok(top) => matches!(top.stx.body.as_slice(), [stmt] if matches!(stmt.stx.as_ref(), Stmt::Expr(_))),
    Err(_) => false,
  }
}

fn push_str(parts: &mut Vec<Part>, text: &str) {
  if let Some(Part::Str(last)) = parts.last_mut() {
    last.push_str(text);
  } else {
    parts.push(Part::Str(text.to_string()));
  };
}

/// Splits text into literal and expression parts. Adjacent literal parts are merged.
pub fn split(code: &str) -> Result<Vec<Part>> {
  let mut parts = Vec::new();
  let mut rest = code;
  while let Some(start) = rest.find("${") {
    if start > 0 && rest.as_bytes()[start - 1] == b'\\' {
      push_str(&mut parts, &rest[..start - 1]);
      push_str(&mut parts, "${");
      rest = &rest[start + 2..];
      continue;
    };
    // Try each later `}` in turn, so that expressions containing `}` are captured whole.
    let mut search_from = start + 2;
    let end = loop {
      let Some(offset) = rest[search_from..].find('}') else {
        return Err(ScopedEvalError::InterpolationMalformed(rest[start..].to_string()));
      };
      let end = search_from + offset;
      if is_single_expression(&rest[start + 2..end]) {
        break end;
      };
      search_from = end + 1;
    };
    if start > 0 {
      push_str(&mut parts, &rest[..start]);
    };
    parts.push(Part::Expr(rest[start + 2..end].to_string()));
    rest = &rest[end + 1..];
  }
  if !rest.is_empty() || parts.is_empty() {
    push_str(&mut parts, rest);
  };
  Ok(parts)
}

// A JSON string is also a valid script string literal.
fn quote(text: &str) -> String {
  serde_json::Value::from(text).to_string()
}

/// Rewrites interpolated text into concatenation source. A leading expression is prefixed with
/// `"" +` so that the result is always a string.
pub fn interpolate(code: &str) -> Result<String> {
  let rendered: Vec<String> = split(code)?
    .into_iter()
    .enumerate()
    .map(|(i, part)| match part {
      Part::Str(text) => quote(&text),
      Part::Expr(expr) if i == 0 => format!("\"\" + ({expr})"),
      Part::Expr(expr) => format!("({expr})"),
    })
    .collect();
  Ok(rendered.join(" + "))
}

#[cfg(test)]
mod tests {
  use super::interpolate;
  use super::split;
  use super::Part;
  use crate::error::ScopedEvalError;

  #[test]
  fn test_literal_only() {
    assert_eq!(interpolate("a").unwrap(), r#""a""#);
    assert_eq!(interpolate("b + c").unwrap(), r#""b + c""#);
    assert_eq!(interpolate(r#""a""#).unwrap(), r#""\"a\"""#);
    assert_eq!(interpolate("`'").unwrap(), r#""`'""#);
    assert_eq!(interpolate(r"a\$b").unwrap(), r#""a\\$b""#);
    assert_eq!(interpolate("").unwrap(), r#""""#);
  }

  #[test]
  fn test_escaped_marker() {
    assert_eq!(interpolate(r"\${a").unwrap(), r#""${a""#);
    assert_eq!(interpolate(r"b\${a").unwrap(), r#""b${a""#);
    assert_eq!(interpolate(r"b\${").unwrap(), r#""b${""#);
    // The escaping backslash is consumed even when it is itself escaped.
    assert_eq!(interpolate(r"b\\${a").unwrap(), r#""b\\${a""#);
  }

  #[test]
  fn test_interpolation() {
    assert_eq!(interpolate("${a}").unwrap(), r#""" + (a)"#);
    assert_eq!(interpolate("a ${b + c}").unwrap(), r#""a " + (b + c)"#);
    assert_eq!(
      interpolate("${\"a\"}${a + '}' + `${b + c}`}").unwrap(),
      r#""" + ("a") + (a + '}' + `${b + c}`)"#
    );
    assert_eq!(
      interpolate("`a`${`b${c}`}`d`").unwrap(),
      r#""`a`" + (`b${c}`) + "`d`""#
    );
    assert_eq!(split("x${y}${z}").unwrap(), vec![
      Part::Str("x".to_string()),
      Part::Expr("y".to_string()),
      Part::Expr("z".to_string()),
    ]);
  }

  #[test]
  fn test_malformed() {
    for code in ["${", "${}", "a ${b + '}'", "${ {a: 1}; b }"] {
      let err = interpolate(code).unwrap_err();
      assert!(matches!(err, ScopedEvalError::InterpolationMalformed(_)), "{code}");
    }
    assert_eq!(
      interpolate("x ${").unwrap_err().to_string(),
      "cannot find } in interpolation: ${"
    );
  }
}
