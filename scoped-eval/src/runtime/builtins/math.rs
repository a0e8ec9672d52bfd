use super::arg;
use crate::error::Result;
use crate::runtime::conv;
use crate::runtime::operator::exponentiate;
use crate::runtime::realm::define_method;
use crate::runtime::realm::define_namespace;
use crate::runtime::realm::define_value;
use crate::runtime::realm::Realm;
use crate::runtime::value::Value;
use crate::runtime::vm::Runtime;
use ahash::RandomState;
use std::cell::Cell;
use std::f64::consts;

fn unary(f: fn(f64) -> f64) -> impl Fn(&mut Runtime, Value, &[Value]) -> Result<Value> {
  move |_, _, args| Ok(Value::Number(f(conv::to_number(&arg(args, 0)))))
}

// Halves round towards positive infinity.
fn round(x: f64) -> f64 {
  if !x.is_finite() {
    return x;
  };
  let floor = x.floor();
  if x - floor >= 0.5 {
    floor + 1.0
  } else {
    floor
  }
}

fn sign(x: f64) -> f64 {
  if x.is_nan() || x == 0.0 {
    x
  } else {
    x.signum()
  }
}

fn extremum(args: &[Value], init: f64, pick: fn(f64, f64) -> f64) -> f64 {
  args.iter().map(conv::to_number).fold(init, |acc, n| {
    if acc.is_nan() || n.is_nan() {
      f64::NAN
    } else {
      pick(acc, n)
    }
  })
}

// xorshift64*, seeded per realm.
fn next_random(state: &Cell<u64>) -> f64 {
  let mut x = state.get();
  x ^= x >> 12;
  x ^= x << 25;
  x ^= x >> 27;
  state.set(x);
  let bits = x.wrapping_mul(0x2545F4914F6CDD1D) >> 11;
  bits as f64 / (1u64 << 53) as f64
}

pub fn install(realm: &mut Realm) {
  let math = define_namespace(realm, "Math");
  let constants = [
    ("PI", consts::PI),
    ("E", consts::E),
    ("LN2", consts::LN_2),
    ("LN10", consts::LN_10),
    ("LOG2E", consts::LOG2_E),
    ("LOG10E", consts::LOG10_E),
    ("SQRT2", consts::SQRT_2),
    ("SQRT1_2", consts::FRAC_1_SQRT_2),
  ];
  for (name, value) in constants {
    define_value(&math, name, value);
  }
  let functions: [(&str, fn(f64) -> f64); 19] = [
    ("abs", f64::abs),
    ("ceil", f64::ceil),
    ("floor", f64::floor),
    ("round", round),
    ("trunc", f64::trunc),
    ("sign", sign),
    ("sqrt", f64::sqrt),
    ("cbrt", f64::cbrt),
    ("exp", f64::exp),
    ("log", f64::ln),
    ("log2", f64::log2),
    ("log10", f64::log10),
    ("sin", f64::sin),
    ("cos", f64::cos),
    ("tan", f64::tan),
    ("asin", f64::asin),
    ("acos", f64::acos),
    ("atan", f64::atan),
    ("fround", |x| x as f32 as f64),
  ];
  for (name, f) in functions {
    define_method(&math, name, unary(f));
  }
  define_method(&math, "pow", |_, _, args| {
    let base = conv::to_number(&arg(args, 0));
    let exponent = conv::to_number(&arg(args, 1));
    Ok(Value::Number(exponentiate(base, exponent)))
  });
  define_method(&math, "atan2", |_, _, args| {
    let y = conv::to_number(&arg(args, 0));
    Ok(Value::Number(y.atan2(conv::to_number(&arg(args, 1)))))
  });
  define_method(&math, "hypot", |_, _, args| {
    Ok(Value::Number(
      args.iter().map(conv::to_number).map(|n| n * n).sum::<f64>().sqrt(),
    ))
  });
  define_method(&math, "max", |_, _, args| {
    Ok(Value::Number(extremum(args, f64::NEG_INFINITY, f64::max)))
  });
  define_method(&math, "min", |_, _, args| {
    Ok(Value::Number(extremum(args, f64::INFINITY, f64::min)))
  });
  let state = Cell::new(RandomState::new().hash_one("Math.random") | 1);
  define_method(&math, "random", move |_, _, _| Ok(Value::Number(next_random(&state))));
}

#[cfg(test)]
mod tests {
  use super::*;

  fn call(rt: &mut Runtime, name: &str, args: &[Value]) -> Value {
    let math = rt.realm().globals["Math"].clone();
    let f = rt.get(&math, name).unwrap();
    rt.call(&f, math, args).unwrap()
  }

  #[test]
  fn test_rounding() {
    assert_eq!(round(2.5), 3.0);
    assert_eq!(round(-2.5), -2.0);
    assert_eq!(round(-2.6), -3.0);
    assert!(round(f64::NAN).is_nan());
  }

  #[test]
  fn test_math_functions() {
    let mut rt = Runtime::new(None);
    assert_eq!(call(&mut rt, "max", &[Value::from(1), Value::from("7"), Value::from(3)]), Value::from(7));
    assert_eq!(call(&mut rt, "min", &[]), Value::Number(f64::INFINITY));
    assert!(call(&mut rt, "max", &[Value::from(1), Value::from("x")]).as_number().is_some_and(f64::is_nan));
    assert_eq!(call(&mut rt, "pow", &[Value::from(2), Value::from(10)]), Value::from(1024));
    assert_eq!(call(&mut rt, "hypot", &[Value::from(3), Value::from(4)]), Value::from(5));
    for _ in 0..100 {
      let r = call(&mut rt, "random", &[]).as_number().unwrap();
      assert!((0.0..1.0).contains(&r));
    }
  }
}
