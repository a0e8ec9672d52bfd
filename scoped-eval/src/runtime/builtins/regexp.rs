//! Regular expressions on top of the `regex` crate. Patterns are translated from script syntax;
//! features the crate lacks, such as lookaround and backreferences, are reported as SyntaxErrors.

use super::arg;
use super::native_fn;
use crate::error::Result;
use crate::runtime::conv;
use crate::runtime::realm::define_constructor;
use crate::runtime::realm::define_method;
use crate::runtime::realm::ErrorKind;
use crate::runtime::realm::Realm;
use crate::runtime::value::Obj;
use crate::runtime::value::ObjectKind;
use crate::runtime::value::RegExpData;
use crate::runtime::value::Value;
use crate::runtime::vm::Runtime;
use regex::Captures;
use regex::Regex;
use regex::RegexBuilder;
use std::rc::Rc;

const FLAG_ORDER: &str = "gimsuy";

pub(crate) fn byte_to_utf16(s: &str, byte: usize) -> usize {
  s.get(..byte).map_or(0, |prefix| prefix.encode_utf16().count())
}

pub(crate) fn utf16_to_byte(s: &str, units: usize) -> usize {
  let mut count = 0;
  for (i, c) in s.char_indices() {
    if count >= units {
      return i;
    };
    count += c.len_utf16();
  }
  s.len()
}

// Rewrites escapes whose meaning differs between script and `regex` syntax.
fn translate(pattern: &str) -> String {
  let mut out = String::with_capacity(pattern.len());
  let mut chars = pattern.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    };
    match chars.next() {
      // The crate's classes are Unicode-aware; script ones are ASCII.
      Some('d') => out.push_str("[0-9]"),
      Some('D') => out.push_str("[^0-9]"),
      Some('w') => out.push_str("[0-9A-Za-z_]"),
      Some('W') => out.push_str("[^0-9A-Za-z_]"),
      Some('/') => out.push('/'),
      Some(e) => {
        out.push('\\');
        out.push(e);
      }
      None => out.push('\\'),
    };
  }
  out
}

fn compile(pattern: &str, flags: &str) -> std::result::Result<Regex, String> {
  for (i, f) in flags.char_indices() {
    if !FLAG_ORDER.contains(f) || flags[..i].contains(f) {
      return Err(format!(
        "Invalid flags supplied to RegExp constructor '{flags}'"
      ));
    };
  }
  RegexBuilder::new(&translate(pattern))
    .case_insensitive(flags.contains('i'))
    .multi_line(flags.contains('m'))
    .dot_matches_new_line(flags.contains('s'))
    .build()
    .map_err(|_| format!("Invalid regular expression: /{pattern}/{flags}"))
}

/// Creates a RegExp object, throwing a SyntaxError for invalid patterns or flags.
pub fn create(rt: &mut Runtime, pattern: &str, flags: &str) -> Result<Value> {
  let regex = compile(pattern, flags).map_err(|msg| rt.throw(ErrorKind::SyntaxError, msg))?;
  let mut sorted: Vec<char> = flags.chars().collect();
  sorted.sort_by_key(|f| FLAG_ORDER.find(*f));
  Ok(Value::Object(Obj::new(
    ObjectKind::RegExp(RegExpData {
      source: Rc::from(if pattern.is_empty() { "(?:)" } else { pattern }),
      flags: Rc::from(sorted.into_iter().collect::<String>()),
      regex,
      last_index: 0,
    }),
    None,
  )))
}

/// The compiled regex and flags of a RegExp value.
pub(crate) fn regex_of(value: &Value) -> Option<(Regex, Rc<str>)> {
  match &value.as_object()?.borrow().kind {
    ObjectKind::RegExp(r) => Some((r.regex.clone(), r.flags.clone())),
    _ => None,
  }
}

/// The array produced by `exec` and non-global `match`, with `index`, `input` and `groups`.
pub(crate) fn match_result(caps: &Captures, input: &str, regex: &Regex) -> Value {
  let groups: Vec<Value> = caps
    .iter()
    .map(|g| g.map_or(Value::Undefined, |m| Value::from(m.as_str())))
    .collect();
  let result = Value::array(groups);
  if let Value::Object(o) = &result {
    let index = caps.get(0).map_or(0, |m| byte_to_utf16(input, m.start()));
    o.set_own("index", Value::Number(index as f64));
    o.set_own("input", Value::from(input));
    let names: Vec<&str> = regex.capture_names().flatten().collect();
    let groups = if names.is_empty() {
      Value::Undefined
    } else {
      Value::object(names.into_iter().map(|name| {
        let value = caps
          .name(name)
          .map_or(Value::Undefined, |m| Value::from(m.as_str()));
        (name, value)
      }))
    };
    o.set_own("groups", groups);
  };
  result
}

fn this_regexp(rt: &Runtime, this: &Value, method: &str) -> Result<Obj> {
  match this.as_object() {
    Some(o) if matches!(o.borrow().kind, ObjectKind::RegExp(_)) => Ok(o.clone()),
    _ => Err(rt.type_error(format!(
      "RegExp.prototype.{method} called on incompatible receiver"
    ))),
  }
}

/// `RegExp.prototype.exec`: the next match from `lastIndex` for global and sticky expressions,
/// else the first match.
pub(crate) fn exec(rt: &mut Runtime, this: &Value, input: &str) -> Result<Value> {
  let obj = this_regexp(rt, this, "exec")?;
  let (regex, flags, last_index) = match &obj.borrow().kind {
    ObjectKind::RegExp(r) => (r.regex.clone(), r.flags.clone(), r.last_index),
    _ => return Ok(Value::Null),
  };
  let sticky = flags.contains('y');
  let stateful = sticky || flags.contains('g');
  let start = if stateful { last_index } else { 0 };
  let set_last_index = |value: usize| {
    if stateful {
      obj.set_own("lastIndex", Value::Number(value as f64));
    };
  };
  if start > input.encode_utf16().count() {
    set_last_index(0);
    return Ok(Value::Null);
  };
  let byte_start = utf16_to_byte(input, start);
  match regex.captures_at(input, byte_start) {
    Some(caps) if !sticky || caps.get(0).is_some_and(|m| m.start() == byte_start) => {
      let end = caps.get(0).map_or(byte_start, |m| m.end());
      set_last_index(byte_to_utf16(input, end));
      Ok(match_result(&caps, input, &regex))
    }
    _ => {
      set_last_index(0);
      Ok(Value::Null)
    }
  }
}

fn regexp_constructor(rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  let pattern = arg(args, 0);
  let flags = arg(args, 1);
  let (source, default_flags) = match regex_of(&pattern) {
    Some((_, flags)) => (
      pattern
        .get_own("source")
        .map(|s| conv::to_string(&s).to_string())
        .unwrap_or_default(),
      flags.to_string(),
    ),
    None if pattern.is_undefined() => (String::new(), String::new()),
    None => (conv::to_string(&pattern).to_string(), String::new()),
  };
  let flags = match flags {
    Value::Undefined => default_flags,
    f => conv::to_string(&f).to_string(),
  };
  let source = if source == "(?:)" { String::new() } else { source };
  create(rt, &source, &flags)
}

fn regexp_test(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let input = conv::to_string(&arg(args, 0));
  Ok(Value::Bool(!exec(rt, &this, &input)?.is_nullish()))
}

fn regexp_exec(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let input = conv::to_string(&arg(args, 0));
  exec(rt, &this, &input)
}

fn regexp_to_string(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  this_regexp(rt, &this, "toString")?;
  Ok(Value::String(conv::to_string(&this)))
}

pub fn install(realm: &mut Realm) {
  let proto = realm.intrinsics.regexp_prototype.clone();
  define_constructor(
    realm,
    "RegExp",
    &proto,
    regexp_constructor,
    Some(native_fn(regexp_constructor)),
  );
  define_method(&proto, "test", regexp_test);
  define_method(&proto, "exec", regexp_exec);
  define_method(&proto, "toString", regexp_to_string);
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_translate() {
    assert_eq!(translate(r"\d+\/\w"), "[0-9]+/[0-9A-Za-z_]");
    assert_eq!(translate(r"\.\s"), r"\.\s");
  }

  #[test]
  fn test_exec_and_last_index() {
    let mut rt = Runtime::new(None);
    let re = create(&mut rt, r"(?<word>[a-z]+)(\d)?", "g").unwrap();
    let first = exec(&mut rt, &re, "ab1 cd").unwrap();
    assert_eq!(first.to_json(), json!(["ab1", "ab", "1"]));
    assert_eq!(rt.get(&first, "index").unwrap(), Value::from(0));
    assert_eq!(rt.get(&re, "lastIndex").unwrap(), Value::from(3));
    let second = exec(&mut rt, &re, "ab1 cd").unwrap();
    assert_eq!(second.to_json(), json!(["cd", "cd", null]));
    let groups = rt.get(&second, "groups").unwrap();
    assert_eq!(groups.to_json(), json!({"word": "cd"}));
    assert_eq!(exec(&mut rt, &re, "ab1 cd").unwrap(), Value::Null);
    assert_eq!(rt.get(&re, "lastIndex").unwrap(), Value::from(0));
  }

  #[test]
  fn test_invalid_patterns() {
    let mut rt = Runtime::new(None);
    let err = create(&mut rt, "a", "gg").unwrap_err();
    assert_eq!(
      err.to_string(),
      "Uncaught SyntaxError: Invalid flags supplied to RegExp constructor 'gg'"
    );
    let err = create(&mut rt, "(?=a)", "").unwrap_err();
    assert_eq!(err.to_string(), "Uncaught SyntaxError: Invalid regular expression: /(?=a)/");
    let re = create(&mut rt, "", "yg").unwrap();
    assert_eq!(conv::to_string(&re).as_ref(), "/(?:)/gy");
  }
}
