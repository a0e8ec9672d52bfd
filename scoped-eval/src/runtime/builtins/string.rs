//! `String` and its prototype. Indices and lengths count UTF-16 code units.

use super::arg;
use super::regexp;
use super::relative_index;
use super::this_string;
use crate::error::Result;
use crate::runtime::conv;
use crate::runtime::realm::define_constructor;
use crate::runtime::realm::define_method;
use crate::runtime::realm::Realm;
use crate::runtime::value::Value;
use crate::runtime::vm::Runtime;
use regex::Captures;
use regex::Regex;

const MAX_STRING_LENGTH: f64 = (1u64 << 29) as f64;

fn units(s: &str) -> Vec<u16> {
  s.encode_utf16().collect()
}

fn from_units(units: &[u16]) -> Value {
  Value::from(String::from_utf16_lossy(units))
}

fn find_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
  if needle.len() > haystack.len() {
    return None;
  };
  (from..=haystack.len() - needle.len()).find(|&i| haystack[i..].starts_with(needle))
}

fn rfind_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
  if needle.len() > haystack.len() {
    return None;
  };
  (0..=from.min(haystack.len() - needle.len()))
    .rev()
    .find(|&i| haystack[i..].starts_with(needle))
}

// A position argument clamped to `0..=len`.
fn position(value: &Value, len: usize) -> usize {
  conv::to_integer_or_infinity(value).max(0.0).min(len as f64) as usize
}

fn string_arg(args: &[Value], i: usize) -> Vec<u16> {
  units(&conv::to_string(&arg(args, i)))
}

fn string_constructor(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(match args.first() {
    None => Value::from(""),
    Some(v) => Value::String(conv::to_string(v)),
  })
}

fn string_from_char_code(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  let codes: Vec<u16> = args.iter().map(|a| conv::to_uint32(a) as u16).collect();
  Ok(from_units(&codes))
}

fn string_char_at(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = units(&this_string(rt, &this, "charAt")?);
  let i = conv::to_integer_or_infinity(&arg(args, 0));
  Ok(if i >= 0.0 && i < s.len() as f64 {
    from_units(&s[i as usize..i as usize + 1])
  } else {
    Value::from("")
  })
}

fn string_char_code_at(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = units(&this_string(rt, &this, "charCodeAt")?);
  let i = conv::to_integer_or_infinity(&arg(args, 0));
  Ok(Value::Number(if i >= 0.0 && i < s.len() as f64 {
    f64::from(s[i as usize])
  } else {
    f64::NAN
  }))
}

fn string_at(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = units(&this_string(rt, &this, "at")?);
  let n = conv::to_integer_or_infinity(&arg(args, 0));
  let i = if n < 0.0 { s.len() as f64 + n } else { n };
  Ok(if i >= 0.0 && i < s.len() as f64 {
    from_units(&s[i as usize..i as usize + 1])
  } else {
    Value::Undefined
  })
}

fn string_index_of(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = units(&this_string(rt, &this, "indexOf")?);
  let needle = string_arg(args, 0);
  let from = position(&arg(args, 1), s.len());
  Ok(Value::Number(
    find_units(&s, &needle, from).map_or(-1.0, |i| i as f64),
  ))
}

fn string_last_index_of(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = units(&this_string(rt, &this, "lastIndexOf")?);
  let needle = string_arg(args, 0);
  let pos = conv::to_number(&arg(args, 1));
  let from = if pos.is_nan() { s.len() } else { pos.max(0.0).min(s.len() as f64) as usize };
  Ok(Value::Number(
    rfind_units(&s, &needle, from).map_or(-1.0, |i| i as f64),
  ))
}

fn reject_regexp(rt: &Runtime, value: &Value, method: &str) -> Result<()> {
  if regexp::regex_of(value).is_some() {
    return Err(rt.type_error(format!(
      "First argument to String.prototype.{method} must not be a regular expression"
    )));
  };
  Ok(())
}

fn string_includes(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = units(&this_string(rt, &this, "includes")?);
  reject_regexp(rt, &arg(args, 0), "includes")?;
  let from = position(&arg(args, 1), s.len());
  Ok(Value::Bool(find_units(&s, &string_arg(args, 0), from).is_some()))
}

fn string_starts_with(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = units(&this_string(rt, &this, "startsWith")?);
  reject_regexp(rt, &arg(args, 0), "startsWith")?;
  let pos = position(&arg(args, 1), s.len());
  Ok(Value::Bool(s[pos..].starts_with(&string_arg(args, 0))))
}

fn string_ends_with(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = units(&this_string(rt, &this, "endsWith")?);
  reject_regexp(rt, &arg(args, 0), "endsWith")?;
  let end = match arg(args, 1) {
    Value::Undefined => s.len(),
    v => position(&v, s.len()),
  };
  Ok(Value::Bool(s[..end].ends_with(&string_arg(args, 0))))
}

fn string_slice(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = units(&this_string(rt, &this, "slice")?);
  let start = relative_index(&arg(args, 0), s.len(), 0);
  let end = relative_index(&arg(args, 1), s.len(), s.len());
  Ok(from_units(&s[start..end.max(start)]))
}

fn string_substring(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = units(&this_string(rt, &this, "substring")?);
  let a = position(&arg(args, 0), s.len());
  let b = match arg(args, 1) {
    Value::Undefined => s.len(),
    v => position(&v, s.len()),
  };
  Ok(from_units(&s[a.min(b)..a.max(b)]))
}

fn string_substr(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = units(&this_string(rt, &this, "substr")?);
  let start = relative_index(&arg(args, 0), s.len(), 0);
  let len = match arg(args, 1) {
    Value::Undefined => s.len(),
    v => position(&v, s.len()),
  };
  let end = (start + len).min(s.len());
  Ok(from_units(&s[start..end]))
}

fn string_to_upper_case(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  Ok(Value::from(this_string(rt, &this, "toUpperCase")?.to_uppercase()))
}

fn string_to_lower_case(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  Ok(Value::from(this_string(rt, &this, "toLowerCase")?.to_lowercase()))
}

fn is_trimmed(c: char) -> bool {
  c.is_whitespace() || c == '\u{FEFF}'
}

fn string_trim(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  Ok(Value::from(this_string(rt, &this, "trim")?.trim_matches(is_trimmed)))
}

fn string_trim_start(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  Ok(Value::from(
    this_string(rt, &this, "trimStart")?.trim_start_matches(is_trimmed),
  ))
}

fn string_trim_end(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  Ok(Value::from(
    this_string(rt, &this, "trimEnd")?.trim_end_matches(is_trimmed),
  ))
}

fn pad(rt: &mut Runtime, this: Value, args: &[Value], at_start: bool) -> Result<Value> {
  let s = units(&this_string(rt, &this, if at_start { "padStart" } else { "padEnd" })?);
  let target = conv::to_integer_or_infinity(&arg(args, 0));
  let filler = match arg(args, 1) {
    Value::Undefined => vec![u16::from(b' ')],
    v => units(&conv::to_string(&v)),
  };
  if target <= s.len() as f64 || filler.is_empty() {
    return Ok(from_units(&s));
  };
  if target > MAX_STRING_LENGTH {
    return Err(rt.range_error("Invalid string length"));
  };
  let fill_len = target as usize - s.len();
  let fill: Vec<u16> = filler.iter().copied().cycle().take(fill_len).collect();
  let out = if at_start { [fill, s].concat() } else { [s, fill].concat() };
  Ok(from_units(&out))
}

fn string_pad_start(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  pad(rt, this, args, true)
}

fn string_pad_end(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  pad(rt, this, args, false)
}

fn string_repeat(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = this_string(rt, &this, "repeat")?;
  let count = conv::to_integer_or_infinity(&arg(args, 0));
  if count < 0.0 || count.is_infinite() {
    return Err(rt.range_error(format!(
      "Invalid count value: {}",
      conv::number_to_string(count)
    )));
  };
  if (s.len() as f64) * count > MAX_STRING_LENGTH {
    return Err(rt.range_error("Invalid string length"));
  };
  Ok(Value::from(s.repeat(count as usize)))
}

fn string_concat(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let mut out = this_string(rt, &this, "concat")?.to_string();
  for a in args {
    out.push_str(&conv::to_string(a));
  }
  Ok(Value::from(out))
}

fn string_split(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = this_string(rt, &this, "split")?;
  let limit = match arg(args, 1) {
    Value::Undefined => u32::MAX as usize,
    v => conv::to_uint32(&v) as usize,
  };
  let separator = arg(args, 0);
  let mut parts: Vec<Value> = Vec::new();
  if let Some((regex, _)) = regexp::regex_of(&separator) {
    if s.is_empty() {
      if !regex.is_match("") {
        parts.push(Value::String(s));
      };
      parts.truncate(limit);
      return Ok(Value::array(parts));
    };
    let mut last = 0;
    for caps in regex.captures_iter(&s) {
      let Some(m) = caps.get(0) else { continue };
      if m.end() == m.start() && (m.start() == 0 || m.start() >= s.len()) {
        continue;
      };
      if m.end() == last && m.start() == m.end() {
        continue;
      };
      parts.push(Value::from(&s[last..m.start()]));
      parts.extend(
        caps
          .iter()
          .skip(1)
          .map(|g| g.map_or(Value::Undefined, |g| Value::from(g.as_str()))),
      );
      last = m.end();
    }
    parts.push(Value::from(&s[last..]));
  } else if separator.is_undefined() {
    parts.push(Value::String(s));
  } else {
    let sep = units(&conv::to_string(&separator));
    let s = units(&s);
    if sep.is_empty() {
      parts.extend(s.iter().map(|u| from_units(&[*u])));
    } else {
      let mut last = 0;
      while let Some(i) = find_units(&s, &sep, last) {
        parts.push(from_units(&s[last..i]));
        last = i + sep.len();
      }
      parts.push(from_units(&s[last..]));
    };
  };
  parts.truncate(limit);
  Ok(Value::array(parts))
}

/// Expands `$$`, `$&`, `` $` ``, `$'`, `$n` and `$<name>` in a replacement template.
fn expand_template(template: &str, input: &str, caps: &Captures, regex: Option<&Regex>) -> String {
  let Some(whole) = caps.get(0) else {
    return template.to_string();
  };
  let group_count = caps.len() - 1;
  let mut out = String::new();
  let mut rest = template;
  while let Some(pos) = rest.find('$') {
    out.push_str(&rest[..pos]);
    let after = &rest[pos + 1..];
    let mut consumed = 1;
    match after.as_bytes().first() {
      Some(b'$') => {
        out.push('$');
        consumed = 2;
      }
      Some(b'&') => {
        out.push_str(whole.as_str());
        consumed = 2;
      }
      Some(b'`') => {
        out.push_str(&input[..whole.start()]);
        consumed = 2;
      }
      Some(b'\'') => {
        out.push_str(&input[whole.end()..]);
        consumed = 2;
      }
      Some(b'<') if regex.is_some_and(|r| r.capture_names().flatten().next().is_some()) => {
        match after.find('>') {
          Some(end) => {
            if let Some(m) = caps.name(&after[1..end]) {
              out.push_str(m.as_str());
            };
            consumed = end + 2;
          }
          None => out.push('$'),
        };
      }
      Some(d) if d.is_ascii_digit() => {
        let digits: String = after.chars().take(2).take_while(char::is_ascii_digit).collect();
        let two = digits.parse::<usize>().ok().filter(|n| (1..=group_count).contains(n));
        let one = digits[..1].parse::<usize>().ok().filter(|n| (1..=group_count).contains(n));
        match (two, one) {
          (Some(n), _) if digits.len() == 2 => {
            out.push_str(caps.get(n).map_or("", |m| m.as_str()));
            consumed = 3;
          }
          (_, Some(n)) => {
            out.push_str(caps.get(n).map_or("", |m| m.as_str()));
            consumed = 2;
          }
          _ => out.push('$'),
        };
      }
      _ => out.push('$'),
    };
    rest = &rest[(pos + consumed).min(rest.len())..];
  }
  out.push_str(rest);
  out
}

// Replaces each match from `matches` using either a callback or a template string.
fn replace_matches(
  rt: &mut Runtime,
  input: &str,
  matches: Vec<Captures>,
  regex: Option<&Regex>,
  replacement: &Value,
) -> Result<Value> {
  let mut out = String::new();
  let mut last = 0;
  let template = if replacement.is_callable() {
    None
  } else {
    Some(conv::to_string(replacement))
  };
  for caps in matches {
    let Some(whole) = caps.get(0) else { continue };
    out.push_str(&input[last..whole.start()]);
    let replaced = match &template {
      Some(t) => expand_template(t, input, &caps, regex),
      None => {
        let mut call_args: Vec<Value> = caps
          .iter()
          .map(|g| g.map_or(Value::Undefined, |g| Value::from(g.as_str())))
          .collect();
        call_args.push(Value::Number(regexp::byte_to_utf16(input, whole.start()) as f64));
        call_args.push(Value::from(input));
        let result = rt.call(replacement, Value::Undefined, &call_args)?;
        conv::to_string(&result).to_string()
      }
    };
    out.push_str(&replaced);
    last = whole.end();
  }
  out.push_str(&input[last..]);
  Ok(Value::from(out))
}

fn replace(rt: &mut Runtime, this: Value, args: &[Value], all: bool) -> Result<Value> {
  let method = if all { "replaceAll" } else { "replace" };
  let s = this_string(rt, &this, method)?;
  let pattern = arg(args, 0);
  let replacement = arg(args, 1);
  let script_regex = regexp::regex_of(&pattern);
  let (regex, global) = match &script_regex {
    Some((regex, flags)) => {
      let global = flags.contains('g');
      if all && !global {
        return Err(rt.type_error("replaceAll must be called with a global RegExp"));
      };
      (regex.clone(), global)
    }
    None => match Regex::new(&regex::escape(&conv::to_string(&pattern))) {
      Ok(regex) => (regex, all),
      Err(_) => return Ok(Value::String(s)),
    },
  };
  let matches: Vec<Captures> = if global {
    regex.captures_iter(&s).collect()
  } else {
    regex.captures(&s).into_iter().collect()
  };
  if global {
    if let Value::Object(o) = &pattern {
      o.set_own("lastIndex", Value::Number(0.0));
    };
  };
  let named = script_regex.as_ref().map(|(r, _)| r);
  replace_matches(rt, &s, matches, named, &replacement)
}

fn string_replace(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  replace(rt, this, args, false)
}

fn string_replace_all(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  replace(rt, this, args, true)
}

fn string_match(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = this_string(rt, &this, "match")?;
  let pattern = match arg(args, 0) {
    p if regexp::regex_of(&p).is_some() => p,
    Value::Undefined => regexp::create(rt, "", "")?,
    p => regexp::create(rt, &conv::to_string(&p), "")?,
  };
  let Some((regex, flags)) = regexp::regex_of(&pattern) else {
    return Ok(Value::Null);
  };
  if !flags.contains('g') {
    return regexp::exec(rt, &pattern, &s);
  };
  if let Value::Object(o) = &pattern {
    o.set_own("lastIndex", Value::Number(0.0));
  };
  let found: Vec<Value> = regex.find_iter(&s).map(|m| Value::from(m.as_str())).collect();
  Ok(if found.is_empty() { Value::Null } else { Value::array(found) })
}

fn string_search(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = this_string(rt, &this, "search")?;
  let regex = match regexp::regex_of(&arg(args, 0)) {
    Some((regex, _)) => regex,
    None => {
      let created = regexp::create(rt, &conv::to_string(&arg(args, 0)), "")?;
      match regexp::regex_of(&created) {
        Some((regex, _)) => regex,
        None => return Ok(Value::Number(-1.0)),
      }
    }
  };
  Ok(Value::Number(
    regex
      .find(&s)
      .map_or(-1.0, |m| regexp::byte_to_utf16(&s, m.start()) as f64),
  ))
}

fn string_value_of(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  match this {
    Value::String(_) => Ok(this),
    _ => Err(rt.type_error("String.prototype.valueOf requires that 'this' be a String")),
  }
}

fn string_code_point_at(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = this_string(rt, &this, "codePointAt")?;
  let units = units(&s);
  let i = conv::to_integer_or_infinity(&arg(args, 0));
  if i < 0.0 || i >= units.len() as f64 {
    return Ok(Value::Undefined);
  };
  let i = i as usize;
  let code = char::decode_utf16(units[i..].iter().copied())
    .next()
    .and_then(|r| r.ok())
    .map_or(u32::from(units[i]), u32::from);
  Ok(Value::Number(f64::from(code)))
}

fn string_locale_compare(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let s = this_string(rt, &this, "localeCompare")?;
  let other = conv::to_string(&arg(args, 0));
  Ok(Value::Number(match s.as_ref().cmp(other.as_ref()) {
    std::cmp::Ordering::Less => -1.0,
    std::cmp::Ordering::Equal => 0.0,
    std::cmp::Ordering::Greater => 1.0,
  }))
}

// Strings are kept as written; only the receiver check applies.
fn string_normalize(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  Ok(Value::String(this_string(rt, &this, "normalize")?))
}

pub fn install(realm: &mut Realm) {
  let proto = realm.intrinsics.string_prototype.clone();
  let ctor = define_constructor(realm, "String", &proto, string_constructor, None);
  define_method(&ctor, "fromCharCode", string_from_char_code);
  let methods: [(&str, fn(&mut Runtime, Value, &[Value]) -> Result<Value>); 30] = [
    ("charAt", string_char_at),
    ("charCodeAt", string_char_code_at),
    ("codePointAt", string_code_point_at),
    ("at", string_at),
    ("indexOf", string_index_of),
    ("lastIndexOf", string_last_index_of),
    ("includes", string_includes),
    ("startsWith", string_starts_with),
    ("endsWith", string_ends_with),
    ("slice", string_slice),
    ("substring", string_substring),
    ("substr", string_substr),
    ("toUpperCase", string_to_upper_case),
    ("toLowerCase", string_to_lower_case),
    ("trim", string_trim),
    ("trimStart", string_trim_start),
    ("trimEnd", string_trim_end),
    ("padStart", string_pad_start),
    ("padEnd", string_pad_end),
    ("repeat", string_repeat),
    ("concat", string_concat),
    ("split", string_split),
    ("replace", string_replace),
    ("replaceAll", string_replace_all),
    ("match", string_match),
    ("search", string_search),
    ("toString", string_value_of),
    ("valueOf", string_value_of),
    ("localeCompare", string_locale_compare),
    ("normalize", string_normalize),
  ];
  for (name, f) in methods {
    define_method(&proto, name, f);
  }
}

#[cfg(test)]
mod tests {
  use crate::runtime::value::Value;
  use crate::runtime::vm::Runtime;
  use serde_json::json;

  fn method(rt: &mut Runtime, this: &str, name: &str, args: &[Value]) -> Value {
    let this = Value::from(this);
    let f = rt.get(&this, name).unwrap();
    rt.call(&f, this, args).unwrap()
  }

  fn regex(rt: &mut Runtime, pattern: &str, flags: &str) -> Value {
    super::regexp::create(rt, pattern, flags).unwrap()
  }

  #[test]
  fn test_utf16_indexing() {
    let mut rt = Runtime::new(None);
    assert_eq!(method(&mut rt, "a😀b", "charAt", &[Value::from(3)]), Value::from("b"));
    assert_eq!(method(&mut rt, "a😀b", "indexOf", &[Value::from("b")]), Value::from(3));
    assert_eq!(method(&mut rt, "a😀b", "codePointAt", &[Value::from(1)]), Value::from(0x1F600));
    assert_eq!(method(&mut rt, "hello", "slice", &[Value::from(-3), Value::from(-1)]), Value::from("ll"));
    assert_eq!(method(&mut rt, "hello", "substring", &[Value::from(4), Value::from(1)]), Value::from("ell"));
    assert_eq!(method(&mut rt, "hello", "lastIndexOf", &[Value::from("l")]), Value::from(3));
    assert_eq!(method(&mut rt, "5", "padStart", &[Value::from(3), Value::from("0")]), Value::from("005"));
  }

  #[test]
  fn test_split() {
    let mut rt = Runtime::new(None);
    assert_eq!(method(&mut rt, "a,b,,c", "split", &[Value::from(",")]).to_json(), json!(["a", "b", "", "c"]));
    assert_eq!(method(&mut rt, "abc", "split", &[Value::from("")]).to_json(), json!(["a", "b", "c"]));
    assert_eq!(method(&mut rt, "abc", "split", &[]).to_json(), json!(["abc"]));
    let re = regex(&mut rt, r"\s*(,)\s*", "");
    assert_eq!(method(&mut rt, "a , b,c", "split", &[re]).to_json(), json!(["a", ",", "b", ",", "c"]));
    assert_eq!(
      method(&mut rt, "a,b,c", "split", &[Value::from(","), Value::from(2)]).to_json(),
      json!(["a", "b"])
    );
  }

  #[test]
  fn test_replace() {
    let mut rt = Runtime::new(None);
    assert_eq!(
      method(&mut rt, "a.b.c", "replace", &[Value::from("."), Value::from("-")]),
      Value::from("a-b.c")
    );
    assert_eq!(
      method(&mut rt, "a.b.c", "replaceAll", &[Value::from("."), Value::from("$&$&")]),
      Value::from("a..b..c")
    );
    let re = regex(&mut rt, r"(\w)(\d)", "g");
    assert_eq!(
      method(&mut rt, "a1 b2", "replace", &[re, Value::from("$2$1$$")]),
      Value::from("1a$ 2b$")
    );
    let upper = Value::native("upper", |_, _, args| {
      Ok(Value::from(crate::runtime::conv::to_string(&args[0]).to_uppercase()))
    });
    let re = regex(&mut rt, "[aeiou]", "g");
    assert_eq!(method(&mut rt, "banana", "replace", &[re, upper]), Value::from("bAnAnA"));
    let re = regex(&mut rt, "a", "");
    let f = rt.get(&Value::from("x"), "replaceAll").unwrap();
    let err = rt.call(&f, Value::from("x"), &[re, Value::from("")]).unwrap_err();
    assert_eq!(
      err.to_string(),
      "Uncaught TypeError: replaceAll must be called with a global RegExp"
    );
  }

  #[test]
  fn test_match() {
    let mut rt = Runtime::new(None);
    let re = regex(&mut rt, r"\d+", "g");
    assert_eq!(method(&mut rt, "a1b22c333", "match", &[re]).to_json(), json!(["1", "22", "333"]));
    let found = method(&mut rt, "key=value", "match", &[Value::from("(\\w+)=(\\w+)")]);
    assert_eq!(found.to_json(), json!(["key=value", "key", "value"]));
    let re = regex(&mut rt, "z", "g");
    assert_eq!(method(&mut rt, "abc", "match", &[re]), Value::Null);
  }
}
