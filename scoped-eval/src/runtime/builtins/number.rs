use super::arg;
use super::global;
use crate::error::Result;
use crate::runtime::conv;
use crate::runtime::realm::define_constructor;
use crate::runtime::realm::define_method;
use crate::runtime::realm::define_value;
use crate::runtime::realm::Realm;
use crate::runtime::value::Value;
use crate::runtime::vm::Runtime;

const MAX_SAFE_INTEGER: f64 = 9007199254740991.0;

fn this_number(rt: &Runtime, this: &Value, method: &str) -> Result<f64> {
  match this {
    Value::Number(n) => Ok(*n),
    _ => Err(rt.type_error(format!(
      "Number.prototype.{method} requires that 'this' be a Number"
    ))),
  }
}

fn number_constructor(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(Value::Number(match args.first() {
    None => 0.0,
    Some(v) => conv::to_number(v),
  }))
}

fn number_is_integer(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(Value::Bool(matches!(
    arg(args, 0),
    Value::Number(n) if n.is_finite() && n.trunc() == n
  )))
}

fn number_is_safe_integer(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(Value::Bool(matches!(
    arg(args, 0),
    Value::Number(n) if n.is_finite() && n.trunc() == n && n.abs() <= MAX_SAFE_INTEGER
  )))
}

// Unlike the globals, these do not coerce their argument.
fn number_is_finite(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(Value::Bool(matches!(arg(args, 0), Value::Number(n) if n.is_finite())))
}

fn number_is_nan(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(Value::Bool(matches!(arg(args, 0), Value::Number(n) if n.is_nan())))
}

fn number_to_fixed(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let n = this_number(rt, &this, "toFixed")?;
  let digits = conv::to_integer_or_infinity(&arg(args, 0));
  if !(0.0..=100.0).contains(&digits) {
    return Err(rt.range_error("toFixed() digits argument must be between 0 and 100"));
  };
  Ok(Value::from(conv::number_to_fixed(n, digits as usize)))
}

fn number_to_string(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let n = this_number(rt, &this, "toString")?;
  let radix = match arg(args, 0) {
    Value::Undefined => 10.0,
    r => conv::to_integer_or_infinity(&r),
  };
  if !(2.0..=36.0).contains(&radix) {
    return Err(rt.range_error("toString() radix must be between 2 and 36"));
  };
  Ok(Value::from(conv::number_to_string_radix(n, radix as u32)))
}

fn number_value_of(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  Ok(Value::Number(this_number(rt, &this, "valueOf")?))
}

fn boolean_constructor(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(Value::Bool(conv::to_boolean(&arg(args, 0))))
}

fn this_boolean(rt: &Runtime, this: &Value, method: &str) -> Result<bool> {
  this.as_bool().ok_or_else(|| {
    rt.type_error(format!(
      "Boolean.prototype.{method} requires that 'this' be a Boolean"
    ))
  })
}

pub fn install(realm: &mut Realm) {
  let proto = realm.intrinsics.number_prototype.clone();
  let ctor = define_constructor(realm, "Number", &proto, number_constructor, None);
  define_method(&ctor, "isInteger", number_is_integer);
  define_method(&ctor, "isSafeInteger", number_is_safe_integer);
  define_method(&ctor, "isFinite", number_is_finite);
  define_method(&ctor, "isNaN", number_is_nan);
  define_method(&ctor, "parseFloat", |_, _, args| {
    Ok(Value::Number(global::parse_float(&conv::to_string(&arg(args, 0)))))
  });
  define_method(&ctor, "parseInt", |_, _, args| {
    let radix = conv::to_int32(&arg(args, 1));
    Ok(Value::Number(global::parse_int(&conv::to_string(&arg(args, 0)), radix)))
  });
  define_value(&ctor, "MAX_SAFE_INTEGER", MAX_SAFE_INTEGER);
  define_value(&ctor, "MIN_SAFE_INTEGER", -MAX_SAFE_INTEGER);
  define_value(&ctor, "MAX_VALUE", f64::MAX);
  define_value(&ctor, "MIN_VALUE", 5e-324);
  define_value(&ctor, "EPSILON", f64::EPSILON);
  define_value(&ctor, "POSITIVE_INFINITY", f64::INFINITY);
  define_value(&ctor, "NEGATIVE_INFINITY", f64::NEG_INFINITY);
  define_value(&ctor, "NaN", f64::NAN);
  define_method(&proto, "toFixed", number_to_fixed);
  define_method(&proto, "toString", number_to_string);
  define_method(&proto, "valueOf", number_value_of);

  let proto = realm.intrinsics.boolean_prototype.clone();
  define_constructor(realm, "Boolean", &proto, boolean_constructor, None);
  define_method(&proto, "toString", |rt, this, _| {
    Ok(Value::from(this_boolean(rt, &this, "toString")?.to_string()))
  });
  define_method(&proto, "valueOf", |rt, this, _| {
    Ok(Value::Bool(this_boolean(rt, &this, "valueOf")?))
  });
}

#[cfg(test)]
mod tests {
  use crate::runtime::value::Value;
  use crate::runtime::vm::Runtime;

  fn method(rt: &mut Runtime, this: Value, name: &str, args: &[Value]) -> crate::error::Result<Value> {
    let f = rt.get(&this, name)?;
    rt.call(&f, this, args)
  }

  #[test]
  fn test_prototype_methods() {
    let mut rt = Runtime::new(None);
    let n = Value::Number(1.005);
    assert_eq!(method(&mut rt, n, "toFixed", &[Value::from(1)]).unwrap(), Value::from("1.0"));
    let n = Value::Number(255.0);
    assert_eq!(method(&mut rt, n.clone(), "toString", &[Value::from(16)]).unwrap(), Value::from("ff"));
    let err = method(&mut rt, n, "toString", &[Value::from(1)]).unwrap_err();
    assert_eq!(
      err.to_string(),
      "Uncaught RangeError: toString() radix must be between 2 and 36"
    );
    assert_eq!(
      method(&mut rt, Value::Bool(true), "toString", &[]).unwrap(),
      Value::from("true")
    );
  }

  #[test]
  fn test_statics() {
    let mut rt = Runtime::new(None);
    let number = rt.realm().globals["Number"].clone();
    let is_integer = rt.get(&number, "isInteger").unwrap();
    assert_eq!(rt.call(&is_integer, Value::Undefined, &[Value::from(3)]).unwrap(), Value::Bool(true));
    assert_eq!(rt.call(&is_integer, Value::Undefined, &[Value::from("3")]).unwrap(), Value::Bool(false));
    assert_eq!(rt.call(&number, Value::Undefined, &[Value::from(" 12 ")]).unwrap(), Value::from(12));
    assert_eq!(rt.call(&number, Value::Undefined, &[]).unwrap(), Value::from(0));
    let err = rt.construct(&number, &[]).unwrap_err();
    assert_eq!(err.to_string(), "Uncaught TypeError: Number is not a constructor");
  }
}
