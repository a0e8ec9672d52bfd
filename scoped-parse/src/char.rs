#[inline]
pub fn is_line_terminator(c: char) -> bool {
  matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Whitespace other than line terminators.
pub fn is_whitespace(c: char) -> bool {
  match c {
    '\t' | '\x0b' | '\x0c' | ' ' | '\u{a0}' | '\u{feff}' => true,
    c if c.is_ascii() => false,
    // Unicode "Zs" category.
    '\u{1680}' | '\u{2000}'..='\u{200a}' | '\u{202f}' | '\u{205f}' | '\u{3000}' => true,
    _ => false,
  }
}

// Non-ASCII identifier characters are approximated with `char::is_alphabetic` and
// `char::is_alphanumeric` rather than the full ID_Start/ID_Continue tables.
pub fn is_id_start(c: char) -> bool {
  if c.is_ascii() {
    c.is_ascii_alphabetic() || c == '$' || c == '_'
  } else {
    c.is_alphabetic()
  }
}

pub fn is_id_continue(c: char) -> bool {
  if c.is_ascii() {
    c.is_ascii_alphanumeric() || c == '$' || c == '_'
  } else {
    // ZWNJ and ZWJ.
    c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_classes() {
    assert!(is_whitespace('\u{3000}'));
    assert!(!is_whitespace('\n'));
    assert!(is_line_terminator('\u{2028}'));
    assert!(is_id_start('$'));
    assert!(is_id_start('é'));
    assert!(!is_id_start('1'));
    assert!(is_id_continue('1'));
    assert!(!is_id_continue('-'));
  }
}
