//! `JSON.stringify` and `JSON.parse`, with serde_json doing the text work.

use super::arg;
use crate::error::Result;
use crate::runtime::conv;
use crate::runtime::realm::define_method;
use crate::runtime::realm::define_namespace;
use crate::runtime::realm::ErrorKind;
use crate::runtime::realm::Realm;
use crate::runtime::value::Obj;
use crate::runtime::value::Value;
use crate::runtime::vm::Runtime;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Serializer;

struct Stringifier {
  replacer: Option<Value>,
  allowlist: Option<Vec<String>>,
  stack: Vec<Obj>,
}

impl Stringifier {
  fn serialize(
    &mut self,
    rt: &mut Runtime,
    holder: &Value,
    key: &str,
    mut value: Value,
  ) -> Result<Option<serde_json::Value>> {
    if let Value::Object(_) = &value {
      let to_json = rt.get(&value, "toJSON")?;
      if to_json.is_callable() {
        value = rt.call(&to_json, value, &[Value::from(key)])?;
      };
    };
    if let Some(replacer) = &self.replacer {
      value = rt.call(replacer, holder.clone(), &[Value::from(key), value])?;
    };
    let obj = match &value {
      Value::Undefined => return Ok(None),
      Value::Object(o) if o.is_callable() => return Ok(None),
      Value::Object(o) => o.clone(),
      primitive => return Ok(conv::to_json(primitive, &mut Vec::new())),
    };
    if self.stack.iter().any(|o| o.ptr_eq(&obj)) {
      return Err(rt.type_error("Converting circular structure to JSON"));
    };
    self.stack.push(obj.clone());
    let result = match obj.array_elements() {
      Some(elements) => {
        let mut out = Vec::with_capacity(elements.len());
        for (i, element) in elements.into_iter().enumerate() {
          let item = self.serialize(rt, &value, &i.to_string(), element)?;
          out.push(item.unwrap_or(serde_json::Value::Null));
        }
        serde_json::Value::Array(out)
      }
      None => {
        let mut map = serde_json::Map::new();
        for (k, v) in rt.own_entries(&value) {
          if self.allowlist.as_ref().is_some_and(|keys| !keys.contains(&k)) {
            continue;
          };
          if let Some(item) = self.serialize(rt, &value, &k, v)? {
            map.insert(k, item);
          };
        }
        serde_json::Value::Object(map)
      }
    };
    self.stack.pop();
    Ok(Some(result))
  }
}

fn indent_of(space: &Value) -> String {
  match space {
    Value::Number(n) => " ".repeat(n.clamp(0.0, 10.0) as usize),
    Value::String(s) => s.chars().take(10).collect(),
    _ => String::new(),
  }
}

fn json_stringify(rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  let replacer = arg(args, 1);
  let mut stringifier = Stringifier {
    replacer: replacer.is_callable().then(|| replacer.clone()),
    allowlist: replacer
      .as_object()
      .and_then(Obj::array_elements)
      .map(|keys| keys.iter().map(|k| conv::to_string(k).to_string()).collect()),
    stack: Vec::new(),
  };
  let wrapper = Value::object([("", arg(args, 0))]);
  let Some(json) = stringifier.serialize(rt, &wrapper, "", arg(args, 0))? else {
    return Ok(Value::Undefined);
  };
  let indent = indent_of(&arg(args, 2));
  if indent.is_empty() {
    return Ok(Value::from(json.to_string()));
  };
  let mut out = Vec::new();
  let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
  json
    .serialize(&mut serializer)
    .map_err(|e| rt.throw(ErrorKind::Error, e.to_string()))?;
  Ok(Value::from(String::from_utf8_lossy(&out).into_owned()))
}

// Applies a reviver bottom-up, deleting properties it maps to undefined.
fn internalize(rt: &mut Runtime, reviver: &Value, holder: &Value, key: &str) -> Result<Value> {
  let value = rt.get(holder, key)?;
  if let Value::Object(o) = &value {
    let keys: Vec<String> = o.borrow().own_keys();
    for k in keys {
      let revived = internalize(rt, reviver, &value, &k)?;
      if revived.is_undefined() && !o.is_array() {
        o.borrow_mut().delete(&k);
      } else {
        o.set_own(&k, revived);
      };
    }
  };
  rt.call(reviver, holder.clone(), &[Value::from(key), value])
}

fn json_parse(rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  let text = conv::to_string(&arg(args, 0));
  let parsed: serde_json::Value = serde_json::from_str(&text)
    .map_err(|e| rt.throw(ErrorKind::SyntaxError, format!("JSON.parse: {e} of the JSON data")))?;
  let value = Value::from(parsed);
  let reviver = arg(args, 1);
  if !reviver.is_callable() {
    return Ok(value);
  };
  let root = Value::object([("", value)]);
  internalize(rt, &reviver, &root, "")
}

pub fn install(realm: &mut Realm) {
  let json = define_namespace(realm, "JSON");
  define_method(&json, "stringify", json_stringify);
  define_method(&json, "parse", json_parse);
}

#[cfg(test)]
mod tests {
  use crate::error::Result;
  use crate::runtime::value::Value;
  use crate::runtime::vm::Runtime;
  use serde_json::json;

  fn call(rt: &mut Runtime, name: &str, args: &[Value]) -> Result<Value> {
    let ns = rt.realm().globals["JSON"].clone();
    let f = rt.get(&ns, name)?;
    rt.call(&f, ns, args)
  }

  #[test]
  fn test_stringify() {
    let mut rt = Runtime::new(None);
    let value = Value::from(json!({"b": [1, 2.5, null], "a": "x"}));
    assert_eq!(
      call(&mut rt, "stringify", &[value.clone()]).unwrap(),
      Value::from(r#"{"b":[1,2.5,null],"a":"x"}"#)
    );
    assert_eq!(
      call(&mut rt, "stringify", &[Value::from(json!({"a": [1]})), Value::Null, Value::from(2)]).unwrap(),
      Value::from("{\n  \"a\": [\n    1\n  ]\n}")
    );
    let allow = Value::from(json!(["a"]));
    assert_eq!(
      call(&mut rt, "stringify", &[value, allow]).unwrap(),
      Value::from(r#"{"a":"x"}"#)
    );
    assert_eq!(call(&mut rt, "stringify", &[Value::Undefined]).unwrap(), Value::Undefined);
    assert_eq!(call(&mut rt, "stringify", &[Value::Number(f64::NAN)]).unwrap(), Value::from("null"));
  }

  #[test]
  fn test_stringify_cycle() {
    let mut rt = Runtime::new(None);
    let value = Value::from(json!({"a": 1}));
    rt.set(&value, "self", value.clone()).unwrap();
    let err = call(&mut rt, "stringify", &[value]).unwrap_err();
    assert_eq!(err.to_string(), "Uncaught TypeError: Converting circular structure to JSON");
  }

  #[test]
  fn test_parse() {
    let mut rt = Runtime::new(None);
    let parsed = call(&mut rt, "parse", &[Value::from(r#"{"a":[1,{"b":null}]}"#)]).unwrap();
    assert_eq!(parsed.to_json(), json!({"a": [1, {"b": null}]}));
    let err = call(&mut rt, "parse", &[Value::from("{")]).unwrap_err();
    assert!(err.to_string().starts_with("Uncaught SyntaxError: JSON.parse: "));
    let drop_numbers = Value::native("reviver", |_, _, args| {
      Ok(match &args[1] {
        Value::Number(_) => Value::Undefined,
        v => v.clone(),
      })
    });
    let revived = call(&mut rt, "parse", &[Value::from(r#"{"a":1,"b":"x"}"#), drop_numbers]).unwrap();
    assert_eq!(revived.to_json(), json!({"b": "x"}));
  }

  #[test]
  fn test_parse_out_of_range_numbers() {
    let mut rt = Runtime::new(None);
    let big = call(&mut rt, "parse", &[Value::from("1e400")]).unwrap();
    assert_eq!(big, Value::Number(f64::INFINITY));
    let parsed = call(&mut rt, "parse", &[Value::from(r#"{"a":-1e400,"b":1e-400,"c":0.5}"#)]).unwrap();
    assert_eq!(rt.get(&parsed, "a").unwrap(), Value::Number(f64::NEG_INFINITY));
    assert_eq!(rt.get(&parsed, "b").unwrap(), Value::Number(0.0));
    assert_eq!(rt.get(&parsed, "c").unwrap(), Value::Number(0.5));
  }
}
