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
use crate::runtime::value::Value;
use crate::runtime::vm::Runtime;

fn create_error(rt: &mut Runtime, kind: ErrorKind, args: &[Value]) -> Result<Value> {
  let proto = rt.realm().intrinsics.error_prototype(kind).clone();
  let error = Obj::new(ObjectKind::Error, Some(proto));
  let message = arg(args, 0);
  if !message.is_undefined() {
    error.set_own("message", Value::String(conv::to_string(&message)));
  };
  Ok(Value::Object(error))
}

fn error_to_string(_rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  let Some(obj) = this.as_object() else {
    return Ok(Value::String(conv::to_string(&this)));
  };
  let field = |key: &str, default: &str| {
    obj
      .get_with_protos(key)
      .filter(|v| !v.is_undefined())
      .map(|v| conv::to_string(&v).to_string())
      .unwrap_or_else(|| default.to_string())
  };
  let name = field("name", "Error");
  let message = field("message", "");
  Ok(Value::from(match (name.is_empty(), message.is_empty()) {
    (_, true) => name,
    (true, false) => message,
    (false, false) => format!("{name}: {message}"),
  }))
}

pub fn install(realm: &mut Realm) {
  for kind in ErrorKind::ALL {
    let proto = realm.intrinsics.error_prototype(kind).clone();
    // Calling an error constructor without `new` also creates an error.
    define_constructor(
      realm,
      kind.name(),
      &proto,
      move |rt, _, args| create_error(rt, kind, args),
      Some(native_fn(move |rt, _, args| create_error(rt, kind, args))),
    );
  }
  let base = realm.intrinsics.error_prototype(ErrorKind::Error).clone();
  define_method(&base, "toString", error_to_string);
}

#[cfg(test)]
mod tests {
  use crate::runtime::realm::ErrorKind;
  use crate::runtime::value::Value;
  use crate::runtime::vm::Runtime;

  #[test]
  fn test_error_constructors() {
    let mut rt = Runtime::new(None);
    let ctor = rt.realm().globals["TypeError"].clone();
    let err = rt.construct(&ctor, &[Value::from("boom")]).unwrap();
    assert_eq!(err.describe(), "TypeError: boom");
    let to_string = rt.get(&err, "toString").unwrap();
    assert_eq!(
      rt.call(&to_string, err.clone(), &[]).unwrap(),
      Value::from("TypeError: boom")
    );
    let plain = rt.call(&ctor, Value::Undefined, &[]).unwrap();
    assert_eq!(plain.describe(), "TypeError");
    let uri = rt.error_value(ErrorKind::UriError, "URI malformed");
    assert_eq!(uri.describe(), "URIError: URI malformed");
  }
}
