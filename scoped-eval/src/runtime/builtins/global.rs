use super::arg;
use crate::error::Result;
use crate::runtime::conv;
use crate::runtime::realm::ErrorKind;
use crate::runtime::realm::Realm;
use crate::runtime::value::Value;
use crate::runtime::vm::Runtime;

const URI_UNRESERVED_MARKS: &str = "-_.!~*'()";
const URI_RESERVED: &str = ";/?:@&=+$,#";
const BASE64_ALPHABET: &[u8; 64] =
  b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn is_js_whitespace(c: char) -> bool {
  c.is_whitespace() || c == '\u{FEFF}'
}

pub fn parse_int(input: &str, radix: i32) -> f64 {
  let s = input.trim_start_matches(is_js_whitespace);
  let (negative, s) = match s.as_bytes().first() {
    Some(b'-') => (true, &s[1..]),
    Some(b'+') => (false, &s[1..]),
    _ => (false, s),
  };
  let has_hex_prefix = s.starts_with("0x") || s.starts_with("0X");
  let (radix, s) = match radix {
    0 if has_hex_prefix => (16, &s[2..]),
    0 => (10, s),
    16 if has_hex_prefix => (16, &s[2..]),
    r if (2..=36).contains(&r) => (r as u32, s),
    _ => return f64::NAN,
  };
  let end = s.find(|c: char| c.to_digit(radix).is_none()).unwrap_or(s.len());
  match conv::parse_integer_digits(&s[..end], radix) {
    Some(n) if negative => -n,
    Some(n) => n,
    None => f64::NAN,
  }
}

// Length of the longest prefix of `s` that is a decimal literal.
fn decimal_prefix_len(s: &str) -> usize {
  let b = s.as_bytes();
  let digits = |mut i: usize| {
    while i < b.len() && b[i].is_ascii_digit() {
      i += 1;
    }
    i
  };
  let int_end = digits(0);
  let mut end = int_end;
  if end < b.len() && b[end] == b'.' {
    let frac_end = digits(end + 1);
    if frac_end > end + 1 || int_end > 0 {
      end = frac_end;
    };
  };
  if end == 0 {
    return 0;
  };
  if end < b.len() && (b[end] == b'e' || b[end] == b'E') {
    let mut i = end + 1;
    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
      i += 1;
    };
    let exp_end = digits(i);
    if exp_end > i {
      end = exp_end;
    };
  };
  end
}

pub fn parse_float(input: &str) -> f64 {
  let s = input.trim_start_matches(is_js_whitespace);
  let (sign, unsigned) = match s.as_bytes().first() {
    Some(b'-') => (-1.0, &s[1..]),
    Some(b'+') => (1.0, &s[1..]),
    _ => (1.0, s),
  };
  if unsigned.starts_with("Infinity") {
    return sign * f64::INFINITY;
  };
  let len = decimal_prefix_len(unsigned);
  if len == 0 {
    return f64::NAN;
  };
  unsigned[..len].parse::<f64>().map(|n| sign * n).unwrap_or(f64::NAN)
}

pub fn encode_uri(s: &str, component: bool) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    let keep = c.is_ascii_alphanumeric()
      || URI_UNRESERVED_MARKS.contains(c)
      || (!component && URI_RESERVED.contains(c));
    if keep {
      out.push(c);
      continue;
    };
    let mut buf = [0u8; 4];
    for byte in c.encode_utf8(&mut buf).bytes() {
      out.push_str(&format!("%{byte:02X}"));
    }
  }
  out
}

fn hex_byte(s: &[u8], at: usize) -> Option<u8> {
  if s.get(at) != Some(&b'%') {
    return None;
  };
  let hex = std::str::from_utf8(s.get(at + 1..at + 3)?).ok()?;
  u8::from_str_radix(hex, 16).ok()
}

/// Decodes percent escapes. None if an escape is malformed or the bytes are not UTF-8.
/// Unless decoding a component, escapes of reserved characters are left as written.
pub fn decode_uri(s: &str, component: bool) -> Option<String> {
  let bytes = s.as_bytes();
  let mut out = String::with_capacity(s.len());
  let mut i = 0;
  while i < bytes.len() {
    if bytes[i] != b'%' {
      let c = s[i..].chars().next()?;
      out.push(c);
      i += c.len_utf8();
      continue;
    };
    let lead = hex_byte(bytes, i)?;
    if lead < 0x80 {
      let c = lead as char;
      if !component && URI_RESERVED.contains(c) {
        out.push_str(&s[i..i + 3]);
      } else {
        out.push(c);
      };
      i += 3;
      continue;
    };
    let len = match lead {
      0xC0..=0xDF => 2,
      0xE0..=0xEF => 3,
      0xF0..=0xF7 => 4,
      _ => return None,
    };
    let mut seq = vec![lead];
    for k in 1..len {
      seq.push(hex_byte(bytes, i + k * 3)?);
    }
    out.push_str(std::str::from_utf8(&seq).ok()?);
    i += len * 3;
  }
  Some(out)
}

/// Base64 of a Latin-1 string. None if any character is above U+00FF.
pub fn btoa(s: &str) -> Option<String> {
  let bytes = s
    .chars()
    .map(|c| u8::try_from(u32::from(c)).ok())
    .collect::<Option<Vec<u8>>>()?;
  let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
  for chunk in bytes.chunks(3) {
    let n = chunk
      .iter()
      .enumerate()
      .fold(0u32, |acc, (i, &b)| acc | (u32::from(b) << (16 - 8 * i)));
    for i in 0..4 {
      if i <= chunk.len() {
        out.push(BASE64_ALPHABET[((n >> (18 - 6 * i)) & 63) as usize] as char);
      } else {
        out.push('=');
      };
    }
  }
  Some(out)
}

/// Decodes forgiving base64 into a Latin-1 string. Whitespace is ignored.
pub fn atob(s: &str) -> Option<String> {
  let mut data: Vec<u8> = s.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
  if data.len() % 4 == 0 {
    while data.last() == Some(&b'=') {
      data.pop();
    }
  };
  if data.len() % 4 == 1 {
    return None;
  };
  let mut out = String::with_capacity(data.len() * 3 / 4);
  let mut acc = 0u32;
  let mut bits = 0;
  for b in data {
    let v = BASE64_ALPHABET.iter().position(|&a| a == b)? as u32;
    acc = (acc << 6) | v;
    bits += 6;
    if bits >= 8 {
      bits -= 8;
      out.push(char::from(((acc >> bits) & 0xFF) as u8));
    };
  }
  Some(out)
}

fn string_arg(args: &[Value], i: usize) -> String {
  conv::to_string(&arg(args, i)).to_string()
}

fn global_is_nan(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(Value::Bool(conv::to_number(&arg(args, 0)).is_nan()))
}

fn global_is_finite(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(Value::Bool(conv::to_number(&arg(args, 0)).is_finite()))
}

fn global_parse_int(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  let radix = conv::to_int32(&arg(args, 1));
  Ok(Value::Number(parse_int(&string_arg(args, 0), radix)))
}

fn global_parse_float(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(Value::Number(parse_float(&string_arg(args, 0))))
}

fn uri_decoder(component: bool) -> impl Fn(&mut Runtime, Value, &[Value]) -> Result<Value> {
  move |rt, _, args| {
    decode_uri(&string_arg(args, 0), component)
      .map(Value::from)
      .ok_or_else(|| rt.throw(ErrorKind::UriError, "URI malformed"))
  }
}

pub fn install(realm: &mut Realm) {
  realm.define_global("undefined", Value::Undefined);
  realm.define_global("NaN", Value::Number(f64::NAN));
  realm.define_global("Infinity", Value::Number(f64::INFINITY));
  let functions: [(&str, Value); 8] = [
    ("isNaN", Value::native("isNaN", global_is_nan)),
    ("isFinite", Value::native("isFinite", global_is_finite)),
    ("parseInt", Value::native("parseInt", global_parse_int)),
    ("parseFloat", Value::native("parseFloat", global_parse_float)),
    ("encodeURI", Value::native("encodeURI", |_, _, args| {
      Ok(Value::from(encode_uri(&string_arg(args, 0), false)))
    })),
    ("encodeURIComponent", Value::native("encodeURIComponent", |_, _, args| {
      Ok(Value::from(encode_uri(&string_arg(args, 0), true)))
    })),
    ("decodeURI", Value::native("decodeURI", uri_decoder(false))),
    ("decodeURIComponent", Value::native("decodeURIComponent", uri_decoder(true))),
  ];
  for (name, f) in functions {
    realm.define_global(name, f);
  }
  realm.define_global("btoa", Value::native("btoa", |rt, _, args| {
    btoa(&string_arg(args, 0)).map(Value::from).ok_or_else(|| {
      rt.throw(
        ErrorKind::Error,
        "Failed to execute 'btoa': The string to be encoded contains characters outside of the Latin1 range.",
      )
    })
  }));
  realm.define_global("atob", Value::native("atob", |rt, _, args| {
    atob(&string_arg(args, 0)).map(Value::from).ok_or_else(|| {
      rt.throw(
        ErrorKind::Error,
        "Failed to execute 'atob': The string to be decoded is not correctly encoded.",
      )
    })
  }));
}
