use super::arg;
use super::native_fn;
use crate::error::Result;
use crate::runtime::conv;
use crate::runtime::realm::define_constructor;
use crate::runtime::realm::define_method;
use crate::runtime::realm::Realm;
use crate::runtime::value::Obj;
use crate::runtime::value::ObjectKind;
use crate::runtime::value::Value;
use crate::runtime::vm::Runtime;

fn require_object_coercible(rt: &Runtime, value: &Value) -> Result<()> {
  if value.is_nullish() {
    return Err(rt.type_error("Cannot convert undefined or null to object"));
  };
  Ok(())
}

fn object_constructor(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(match arg(args, 0) {
    value @ Value::Object(_) => value,
    _ => Value::Object(Obj::new(ObjectKind::Ordinary, None)),
  })
}

fn object_keys(rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  let target = arg(args, 0);
  require_object_coercible(rt, &target)?;
  let entries = rt.own_entries(&target);
  Ok(Value::array(entries.into_iter().map(|(k, _)| Value::from(k))))
}

fn object_values(rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  let target = arg(args, 0);
  require_object_coercible(rt, &target)?;
  let entries = rt.own_entries(&target);
  Ok(Value::array(entries.into_iter().map(|(_, v)| v)))
}

fn object_entries(rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  let target = arg(args, 0);
  require_object_coercible(rt, &target)?;
  let entries = rt.own_entries(&target);
  Ok(Value::array(
    entries
      .into_iter()
      .map(|(k, v)| Value::array([Value::from(k), v])),
  ))
}

fn object_assign(rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  let target = arg(args, 0);
  require_object_coercible(rt, &target)?;
  let Value::Object(_) = target else {
    return Ok(target);
  };
  for source in args.iter().skip(1) {
    for (key, value) in rt.own_entries(source) {
      rt.set(&target, &key, value)?;
    }
  }
  Ok(target)
}

fn object_freeze(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  let target = arg(args, 0);
  if let Value::Object(o) = &target {
    o.borrow_mut().frozen = true;
  };
  Ok(target)
}

fn object_is_frozen(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(Value::Bool(match arg(args, 0) {
    Value::Object(o) => o.borrow().frozen,
    _ => true,
  }))
}

fn object_from_entries(rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  let obj = Obj::new(ObjectKind::Ordinary, None);
  for entry in rt.iterate(&arg(args, 0))? {
    let key = rt.get(&entry, "0")?;
    let value = rt.get(&entry, "1")?;
    obj.set_own(&conv::to_string(&key), value);
  }
  Ok(Value::Object(obj))
}

fn object_prototype_has_own_property(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  require_object_coercible(rt, &this)?;
  let key = conv::to_string(&arg(args, 0));
  Ok(Value::Bool(match &this {
    Value::Object(o) => match o.as_scope() {
      Some(scope) => scope.has(&key),
      None => o.borrow().has_own(&key),
    },
    Value::String(s) => {
      key.as_ref() == "length"
        || key
          .parse::<usize>()
          .is_ok_and(|i| i < s.encode_utf16().count())
    }
    _ => false,
  }))
}

fn object_prototype_to_string(_rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  let tag = match &this {
    Value::Undefined => "Undefined",
    Value::Null => "Null",
    Value::Bool(_) => "Boolean",
    Value::Number(_) => "Number",
    Value::String(_) => "String",
    Value::Object(o) => match &o.borrow().kind {
      ObjectKind::Array(_) => "Array",
      ObjectKind::Closure(_) | ObjectKind::Native(_) => "Function",
      ObjectKind::RegExp(_) => "RegExp",
      ObjectKind::Date(_) => "Date",
      ObjectKind::Error => "Error",
      ObjectKind::Ordinary | ObjectKind::Scope(_) => "Object",
    },
  };
  Ok(Value::from(format!("[object {tag}]")))
}

fn object_prototype_value_of(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  require_object_coercible(rt, &this)?;
  Ok(this)
}

pub fn install(realm: &mut Realm) {
  let proto = realm.intrinsics.object_prototype.clone();
  let ctor = define_constructor(
    realm,
    "Object",
    &proto,
    object_constructor,
    Some(native_fn(object_constructor)),
  );
  define_method(&ctor, "keys", object_keys);
  define_method(&ctor, "values", object_values);
  define_method(&ctor, "entries", object_entries);
  define_method(&ctor, "assign", object_assign);
  define_method(&ctor, "freeze", object_freeze);
  define_method(&ctor, "isFrozen", object_is_frozen);
  define_method(&ctor, "fromEntries", object_from_entries);
  define_method(&proto, "hasOwnProperty", object_prototype_has_own_property);
  define_method(&proto, "toString", object_prototype_to_string);
  define_method(&proto, "valueOf", object_prototype_value_of);
}

#[cfg(test)]
mod tests {
  use crate::runtime::value::Value;
  use crate::runtime::vm::Runtime;
  use serde_json::json;

  fn call_static(rt: &mut Runtime, name: &str, args: &[Value]) -> Value {
    let ctor = rt.realm().globals["Object"].clone();
    let f = rt.get(&ctor, name).unwrap();
    rt.call(&f, ctor, args).unwrap()
  }

  #[test]
  fn test_object_statics() {
    let mut rt = Runtime::new(None);
    let obj = Value::from(json!({"b": 1, "a": [2]}));
    assert_eq!(call_static(&mut rt, "keys", &[obj.clone()]).to_json(), json!(["b", "a"]));
    assert_eq!(
      call_static(&mut rt, "entries", &[obj.clone()]).to_json(),
      json!([["b", 1], ["a", [2]]])
    );
    let target = Value::from(json!({"x": 0}));
    let merged = call_static(&mut rt, "assign", &[target.clone(), obj.clone()]);
    assert_eq!(merged.to_json(), json!({"x": 0, "b": 1, "a": [2]}));
    assert_eq!(merged, target);
    call_static(&mut rt, "freeze", &[target.clone()]);
    rt.set(&target, "x", Value::from(5)).unwrap();
    assert_eq!(rt.get(&target, "x").unwrap(), Value::from(0));
    let pairs = Value::from(json!([["k", 1]]));
    assert_eq!(call_static(&mut rt, "fromEntries", &[pairs]).to_json(), json!({"k": 1}));
  }

  #[test]
  fn test_object_prototype() {
    let mut rt = Runtime::new(None);
    let obj = Value::from(json!({"a": 1}));
    let has = rt.get(&obj, "hasOwnProperty").unwrap();
    assert_eq!(rt.call(&has, obj.clone(), &[Value::from("a")]).unwrap(), Value::Bool(true));
    assert_eq!(rt.call(&has, obj.clone(), &[Value::from("hasOwnProperty")]).unwrap(), Value::Bool(false));
    let to_string = rt.get(&obj, "toString").unwrap();
    assert_eq!(rt.call(&to_string, Value::array([]), &[]).unwrap(), Value::from("[object Array]"));
  }
}
