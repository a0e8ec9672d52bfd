//! Type conversions and comparisons that need no running script.
//! User-defined `toString`/`valueOf` methods are not consulted; objects convert by kind.

use super::builtins::date::display_string;
use super::builtins::date::iso_string;
use super::value::ObjectKind;
use super::value::Value;
use std::cmp::Ordering;
use std::rc::Rc;

// Nested arrays deeper than this convert to the empty string, which also stops cycles.
const MAX_CONVERSION_DEPTH: usize = 64;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Hint {
  Number,
  String,
}

pub fn to_boolean(value: &Value) -> bool {
  match value {
    Value::Undefined | Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => *n != 0.0 && !n.is_nan(),
    Value::String(s) => !s.is_empty(),
    Value::Object(_) => true,
  }
}

pub fn to_primitive(value: &Value, hint: Hint) -> Value {
  to_primitive_at(value, hint, 0)
}

fn to_primitive_at(value: &Value, hint: Hint, depth: usize) -> Value {
  let Value::Object(o) = value else {
    return value.clone();
  };
  if depth > MAX_CONVERSION_DEPTH {
    return Value::string("");
  };
  let data = o.borrow();
  match &data.kind {
    ObjectKind::Array(elements) => {
      let joined = elements
        .iter()
        .map(|e| match e {
          Value::Undefined | Value::Null => String::new(),
          e => to_string_at(e, depth + 1).to_string(),
        })
        .collect::<Vec<_>>()
        .join(",");
      Value::from(joined)
    }
    ObjectKind::Date(t) => match hint {
      Hint::Number => Value::Number(*t),
      Hint::String => Value::from(display_string(*t)),
    },
    ObjectKind::RegExp(r) => Value::from(format!("/{}/{}", r.source, r.flags)),
    ObjectKind::Closure(c) => Value::from(format!("function {}() {{ [code] }}", c.name)),
    ObjectKind::Native(n) => Value::from(format!("function {}() {{ [native code] }}", n.name)),
    ObjectKind::Error => {
      drop(data);
      Value::from(value.describe())
    }
    ObjectKind::Ordinary | ObjectKind::Scope(_) => Value::string("[object Object]"),
  }
}

fn is_js_whitespace(c: char) -> bool {
  c.is_whitespace() || c == '\u{FEFF}'
}

pub fn string_to_number(s: &str) -> f64 {
  let s = s.trim_matches(is_js_whitespace);
  if s.is_empty() {
    return 0.0;
  };
  let radix = match s.get(..2) {
    Some("0x" | "0X") => Some(16),
    Some("0o" | "0O") => Some(8),
    Some("0b" | "0B") => Some(2),
    _ => None,
  };
  if let Some(radix) = radix {
    return parse_integer_digits(&s[2..], radix).unwrap_or(f64::NAN);
  };
  let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
  if unsigned == "Infinity" {
    return if s.starts_with('-') {
      f64::NEG_INFINITY
    } else {
      f64::INFINITY
    };
  };
  // Rust also accepts "inf" and "nan", which are not numeric literals.
  if !unsigned
    .bytes()
    .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
  {
    return f64::NAN;
  };
  s.parse::<f64>().unwrap_or(f64::NAN)
}

/// Parses a whole string of digits in `radix`. None if empty or any digit is invalid.
pub fn parse_integer_digits(digits: &str, radix: u32) -> Option<f64> {
  if digits.is_empty() {
    return None;
  };
  let mut value = 0.0;
  for c in digits.chars() {
    value = value * radix as f64 + c.to_digit(radix)? as f64;
  }
  Some(value)
}

pub fn to_number(value: &Value) -> f64 {
  match value {
    Value::Undefined => f64::NAN,
    Value::Null => 0.0,
    Value::Bool(b) => f64::from(u8::from(*b)),
    Value::Number(n) => *n,
    Value::String(s) => string_to_number(s),
    Value::Object(_) => to_number(&to_primitive(value, Hint::Number)),
  }
}

pub fn to_integer_or_infinity(value: &Value) -> f64 {
  let n = to_number(value);
  if n.is_nan() {
    0.0
  } else {
    n.trunc()
  }
}

pub fn to_uint32(value: &Value) -> u32 {
  let n = to_number(value);
  if !n.is_finite() {
    return 0;
  };
  n.trunc().rem_euclid(4294967296.0) as u32
}

pub fn to_int32(value: &Value) -> i32 {
  to_uint32(value) as i32
}

pub fn to_string(value: &Value) -> Rc<str> {
  to_string_at(value, 0)
}

fn to_string_at(value: &Value, depth: usize) -> Rc<str> {
  match value {
    Value::Undefined => Rc::from("undefined"),
    Value::Null => Rc::from("null"),
    Value::Bool(b) => Rc::from(if *b { "true" } else { "false" }),
    Value::Number(n) => Rc::from(number_to_string(*n)),
    Value::String(s) => s.clone(),
    Value::Object(_) => to_string_at(&to_primitive_at(value, Hint::String, depth), depth),
  }
}

/// Formats a number the way `Number.prototype.toString()` does: shortest round-trip digits,
/// with exponent notation below 1e-6 and from 1e21.
pub fn number_to_string(n: f64) -> String {
  if n.is_nan() {
    return "NaN".to_string();
  };
  if n == 0.0 {
    return "0".to_string();
  };
  if n.is_infinite() {
    return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
  };
  let sign = if n < 0.0 { "-" } else { "" };
  let sci = format!("{:e}", n.abs());
  let (mantissa, exponent) = sci.split_once('e').unwrap_or((&sci, "0"));
  let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
  let k = digits.len() as i32;
  // Position of the decimal point relative to the start of `digits`.
  let point = exponent.parse::<i32>().unwrap_or(0) + 1;
  let body = if k <= point && point <= 21 {
    format!("{digits}{}", "0".repeat((point - k) as usize))
  } else if 0 < point && point <= 21 {
    let (int, frac) = digits.split_at(point as usize);
    format!("{int}.{frac}")
  } else if -6 < point && point <= 0 {
    format!("0.{}{digits}", "0".repeat((-point) as usize))
  } else {
    let exp = point - 1;
    let exp_sign = if exp < 0 { "-" } else { "+" };
    let (first, rest) = digits.split_at(1);
    if rest.is_empty() {
      format!("{first}e{exp_sign}{}", exp.abs())
    } else {
      format!("{first}.{rest}e{exp_sign}{}", exp.abs())
    }
  };
  format!("{sign}{body}")
}

pub fn number_to_string_radix(n: f64, radix: u32) -> String {
  if radix == 10 || !n.is_finite() {
    return number_to_string(n);
  };
  let negative = n < 0.0;
  let n = n.abs();
  let mut int = n.trunc();
  let mut frac = n - int;
  let mut int_digits = Vec::new();
  loop {
    let d = (int % radix as f64) as u32;
    int_digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
    int = (int / radix as f64).trunc();
    if int < 1.0 {
      break;
    };
  }
  let mut out: String = int_digits.into_iter().rev().collect();
  if frac > 0.0 {
    out.push('.');
    let mut count = 0;
    while frac > 0.0 && count < 52 {
      frac *= radix as f64;
      let d = frac.trunc() as u32;
      out.push(std::char::from_digit(d, radix).unwrap_or('0'));
      frac -= d as f64;
      count += 1;
    }
  };
  if negative {
    out.insert(0, '-');
  };
  out
}

/// `Number.prototype.toFixed`, rounding exact ties away from zero.
pub fn number_to_fixed(n: f64, digits: usize) -> String {
  if !n.is_finite() || n.abs() >= 1e21 {
    return number_to_string(n);
  };
  let scale = 10f64.powi(digits as i32);
  let scaled = n.abs() * scale;
  let formatted = if scaled < 9007199254740992.0 && scaled.fract() == 0.5 {
    format!("{:.*}", digits, (scaled.trunc() + 1.0) / scale)
  } else {
    format!("{:.*}", digits, n.abs())
  };
  if n < 0.0 && formatted.bytes().any(|b| matches!(b, b'1'..=b'9')) {
    format!("-{formatted}")
  } else {
    formatted
  }
}

pub fn strict_equals(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => x == y,
    _ => a == b,
  }
}

pub fn same_value_zero(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
    _ => a == b,
  }
}

pub fn loose_equals(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
    (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
    (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
      to_number(a) == to_number(b)
    }
    (Value::Bool(_), _) => loose_equals(&Value::Number(to_number(a)), b),
    (_, Value::Bool(_)) => loose_equals(a, &Value::Number(to_number(b))),
    (Value::Object(_), Value::Object(_)) => a == b,
    (Value::Object(_), _) => loose_equals(&to_primitive(a, Hint::Number), b),
    (_, Value::Object(_)) => loose_equals(a, &to_primitive(b, Hint::Number)),
    _ => strict_equals(a, b),
  }
}

fn compare_utf16(a: &str, b: &str) -> Ordering {
  a.encode_utf16().cmp(b.encode_utf16())
}

/// Abstract relational comparison. None when either side is NaN.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
  let pa = to_primitive(a, Hint::Number);
  let pb = to_primitive(b, Hint::Number);
  if let (Value::String(x), Value::String(y)) = (&pa, &pb) {
    return Some(compare_utf16(x, y));
  };
  to_number(&pa).partial_cmp(&to_number(&pb))
}

/// Converts to JSON, or None for values JSON omits (undefined and functions).
/// `stack` holds the objects being converted, to cut cycles.
pub fn to_json(value: &Value, stack: &mut Vec<Value>) -> Option<serde_json::Value> {
  Some(match value {
    Value::Undefined => return None,
    Value::Null => serde_json::Value::Null,
    Value::Bool(b) => serde_json::Value::Bool(*b),
    Value::Number(n) => number_to_json(*n),
    Value::String(s) => serde_json::Value::String(s.to_string()),
    Value::Object(o) => {
      if o.is_callable() {
        return None;
      };
      if stack.iter().any(|v| v == value) {
        return Some(serde_json::Value::Null);
      };
      let data = o.borrow();
      match &data.kind {
        ObjectKind::Date(t) => iso_string(*t)
          .map(serde_json::Value::String)
          .unwrap_or(serde_json::Value::Null),
        ObjectKind::Array(elements) => {
          let elements = elements.clone();
          drop(data);
          stack.push(value.clone());
          let arr = elements
            .iter()
            .map(|e| to_json(e, stack).unwrap_or(serde_json::Value::Null))
            .collect();
          stack.pop();
          serde_json::Value::Array(arr)
        }
        ObjectKind::RegExp(_) | ObjectKind::Scope(_) => serde_json::Value::Object(Default::default()),
        _ => {
          let entries: Vec<(String, Value)> = data
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
          drop(data);
          stack.push(value.clone());
          let map = entries
            .iter()
            .filter_map(|(k, v)| to_json(v, stack).map(|j| (k.clone(), j)))
            .collect();
          stack.pop();
          serde_json::Value::Object(map)
        }
      }
    }
  })
}

pub(crate) fn number_to_json(n: f64) -> serde_json::Value {
  if !n.is_finite() {
    return serde_json::Value::Null;
  };
  if n.fract() == 0.0 && n.abs() < 9007199254740992.0 {
    return serde_json::Value::from(n as i64);
  };
  serde_json::Number::from_f64(n)
    .map(serde_json::Value::Number)
    .unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_number_to_string() {
    assert_eq!(number_to_string(1.0), "1");
    assert_eq!(number_to_string(-1.5), "-1.5");
    assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
    assert_eq!(number_to_string(1e21), "1e+21");
    assert_eq!(number_to_string(123456789012345680000.0), "123456789012345680000");
    assert_eq!(number_to_string(0.000001), "0.000001");
    assert_eq!(number_to_string(1e-7), "1e-7");
    assert_eq!(number_to_string(2.5e-8), "2.5e-8");
    assert_eq!(number_to_string(-0.0), "0");
    assert_eq!(number_to_string(f64::NAN), "NaN");
    assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
  }

  #[test]
  fn test_string_to_number() {
    assert_eq!(string_to_number("  42 "), 42.0);
    assert_eq!(string_to_number(""), 0.0);
    assert_eq!(string_to_number("0x1F"), 31.0);
    assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
    assert_eq!(string_to_number(".5e1"), 5.0);
    assert!(string_to_number("inf").is_nan());
    assert!(string_to_number("12px").is_nan());
  }

  #[test]
  fn test_radix_and_fixed() {
    assert_eq!(number_to_string_radix(255.0, 16), "ff");
    assert_eq!(number_to_string_radix(-5.0, 2), "-101");
    assert_eq!(number_to_string_radix(0.5, 2), "0.1");
    assert_eq!(number_to_fixed(1.005, 2), "1.00");
    assert_eq!(number_to_fixed(2.5, 0), "3");
    assert_eq!(number_to_fixed(-1.25, 1), "-1.3");
    assert_eq!(number_to_fixed(-0.0001, 2), "0.00");
    assert_eq!(number_to_fixed(3.14159, 3), "3.142");
  }

  #[test]
  fn test_equality() {
    assert!(loose_equals(&Value::Null, &Value::Undefined));
    assert!(loose_equals(&Value::from("1"), &Value::Number(1.0)));
    assert!(loose_equals(&Value::Bool(true), &Value::from("1")));
    assert!(!loose_equals(&Value::Null, &Value::Number(0.0)));
    assert!(loose_equals(&Value::array([Value::Number(1.0), Value::Number(2.0)]), &Value::from("1,2")));
    assert!(!strict_equals(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
    assert!(same_value_zero(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
  }

  #[test]
  fn test_int_conversions() {
    assert_eq!(to_int32(&Value::Number(4294967297.0)), 1);
    assert_eq!(to_int32(&Value::Number(2147483648.0)), -2147483648);
    assert_eq!(to_uint32(&Value::Number(-1.0)), 4294967295);
    assert_eq!(to_int32(&Value::Number(f64::NAN)), 0);
  }

  #[test]
  fn test_to_json() {
    let v = Value::object([
      ("a", Value::Number(1.0)),
      ("b", Value::Undefined),
      ("c", Value::array([Value::Undefined, Value::from("x")])),
      ("d", Value::Number(1.5)),
    ]);
    assert_eq!(
      serde_json::to_string(&v.to_json()).unwrap(),
      r#"{"a":1,"c":[null,"x"],"d":1.5}"#
    );
  }
}
