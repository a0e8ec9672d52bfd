use core::hash::Hash;
use core::hash::Hasher;
use serde::Serialize;
use serde::Serializer;
use std::cmp::Ordering;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

// This provides Eq for f64.
#[derive(Copy, Clone, Debug)]
pub struct JsNumber(pub f64);

impl JsNumber {
  /// Parses the raw text of a numeric literal token (decimal, `0x`, `0b`, `0o`, legacy octal).
  pub fn from_literal(raw: &str) -> Option<JsNumber> {
    let raw = raw.replace('_', "");
    let radix = |digits: &str, radix: u32| {
      if digits.is_empty() {
        return None;
      };
      let mut value = 0f64;
      for c in digits.chars() {
        value = value * radix as f64 + c.to_digit(radix)? as f64;
      }
      Some(JsNumber(value))
    };
    let bytes = raw.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'0' {
      match bytes[1] {
        b'x' | b'X' => return radix(&raw[2..], 16),
        b'b' | b'B' => return radix(&raw[2..], 2),
        b'o' | b'O' => return radix(&raw[2..], 8),
        _ => {}
      };
    };
    if bytes.len() > 1 && bytes[0] == b'0' && raw.bytes().all(|b| b.is_ascii_digit()) {
      if raw.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        return radix(&raw[1..], 8);
      };
      // Legacy "non-octal decimal", e.g. `089`.
      return raw.parse::<f64>().ok().map(JsNumber);
    };
    raw.parse::<f64>().ok().map(JsNumber)
  }
}

impl Display for JsNumber {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl PartialEq for JsNumber {
  fn eq(&self, other: &Self) -> bool {
    if self.0.is_nan() {
      return other.0.is_nan();
    };
    self.0.eq(&other.0)
  }
}

impl Eq for JsNumber {}

impl Ord for JsNumber {
  fn cmp(&self, other: &Self) -> Ordering {
    // Only NaNs cannot be compared, and we treat them as equal.
    self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
  }
}

impl PartialOrd for JsNumber {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Hash for JsNumber {
  fn hash<H: Hasher>(&self, state: &mut H) {
    if !self.0.is_nan() {
      self.0.to_bits().hash(state);
    };
  }
}

impl Serialize for JsNumber {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::JsNumber;

  #[test]
  fn parses_literal_forms() {
    assert_eq!(JsNumber::from_literal("12.5"), Some(JsNumber(12.5)));
    assert_eq!(JsNumber::from_literal(".5e1"), Some(JsNumber(5.0)));
    assert_eq!(JsNumber::from_literal("0xff"), Some(JsNumber(255.0)));
    assert_eq!(JsNumber::from_literal("0b101"), Some(JsNumber(5.0)));
    assert_eq!(JsNumber::from_literal("0o17"), Some(JsNumber(15.0)));
    assert_eq!(JsNumber::from_literal("017"), Some(JsNumber(15.0)));
    assert_eq!(JsNumber::from_literal("089"), Some(JsNumber(89.0)));
    assert_eq!(JsNumber::from_literal("1_000"), Some(JsNumber(1000.0)));
    assert_eq!(JsNumber::from_literal("0x"), None);
  }
}
