//! The built-in library: global functions, constructors and the methods of intrinsic prototypes.

pub mod array;
pub mod date;
pub mod error;
pub mod global;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod regexp;
pub mod string;

use super::conv;
use super::realm::Realm;
use super::value::Value;
use super::vm::Runtime;
use crate::error::Result;
use std::rc::Rc;

pub fn install(realm: &mut Realm) {
  object::install(realm);
  error::install(realm);
  global::install(realm);
  array::install(realm);
  string::install(realm);
  number::install(realm);
  math::install(realm);
  json::install(realm);
  regexp::install(realm);
  date::install(realm);
}

pub(crate) fn arg(args: &[Value], i: usize) -> Value {
  args.get(i).cloned().unwrap_or_default()
}

/// Resolves a relative index argument (negative counts from the end) to a position in `0..=len`.
pub(crate) fn relative_index(value: &Value, len: usize, default: usize) -> usize {
  if value.is_undefined() {
    return default;
  };
  let n = conv::to_integer_or_infinity(value);
  if n < 0.0 {
    (len as f64 + n).max(0.0) as usize
  } else {
    n.min(len as f64) as usize
  }
}

/// The string a `String.prototype` method operates on.
pub(crate) fn this_string(rt: &Runtime, this: &Value, method: &str) -> Result<Rc<str>> {
  if this.is_nullish() {
    return Err(rt.type_error(format!(
      "String.prototype.{method} called on null or undefined"
    )));
  };
  Ok(conv::to_string(this))
}

/// The callable argument of a higher-order method such as `map`.
pub(crate) fn callback(rt: &Runtime, value: &Value) -> Result<Value> {
  if !value.is_callable() {
    return Err(rt.type_error(format!("{} is not a function", conv::to_string(value))));
  };
  Ok(value.clone())
}

/// Boxes a closure as the behaviour of a native constructor under `new`.
pub(crate) fn native_fn(
  f: impl Fn(&mut Runtime, Value, &[Value]) -> Result<Value> + 'static,
) -> Rc<super::value::NativeFn> {
  Rc::new(f)
}
