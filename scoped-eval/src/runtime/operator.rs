//! Value-level semantics of binary and assignment operators.

use super::conv;
use super::conv::Hint;
use super::value::ObjectKind;
use super::value::Value;
use scoped_parse::operator::OperatorName;
use std::cmp::Ordering;

/// The assignment operators a scope write can carry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum AssignmentOperator {
  #[default]
  Assign,
  Add,
  Subtract,
  Multiply,
  Divide,
  Remainder,
  Exponentiate,
  ShiftLeft,
  ShiftRight,
  UnsignedShiftRight,
  BitwiseAnd,
  BitwiseOr,
  BitwiseXor,
  LogicalAnd,
  LogicalOr,
  NullishCoalescing,
}

impl AssignmentOperator {
  /// The binary operator applied by a compound assignment. None for `=` and the logical forms.
  pub fn binary(self) -> Option<OperatorName> {
    Some(match self {
      AssignmentOperator::Add => OperatorName::Addition,
      AssignmentOperator::Subtract => OperatorName::Subtraction,
      AssignmentOperator::Multiply => OperatorName::Multiplication,
      AssignmentOperator::Divide => OperatorName::Division,
      AssignmentOperator::Remainder => OperatorName::Remainder,
      AssignmentOperator::Exponentiate => OperatorName::Exponentiation,
      AssignmentOperator::ShiftLeft => OperatorName::BitwiseLeftShift,
      AssignmentOperator::ShiftRight => OperatorName::BitwiseRightShift,
      AssignmentOperator::UnsignedShiftRight => OperatorName::BitwiseUnsignedRightShift,
      AssignmentOperator::BitwiseAnd => OperatorName::BitwiseAnd,
      AssignmentOperator::BitwiseOr => OperatorName::BitwiseOr,
      AssignmentOperator::BitwiseXor => OperatorName::BitwiseXor,
      AssignmentOperator::Assign
      | AssignmentOperator::LogicalAnd
      | AssignmentOperator::LogicalOr
      | AssignmentOperator::NullishCoalescing => return None,
    })
  }

  pub fn is_logical(self) -> bool {
    matches!(
      self,
      AssignmentOperator::LogicalAnd
        | AssignmentOperator::LogicalOr
        | AssignmentOperator::NullishCoalescing
    )
  }

  /// Whether a logical assignment stops at `current` without evaluating or writing its right side.
  pub fn short_circuits(self, current: &Value) -> bool {
    match self {
      AssignmentOperator::LogicalAnd => !conv::to_boolean(current),
      AssignmentOperator::LogicalOr => conv::to_boolean(current),
      AssignmentOperator::NullishCoalescing => !current.is_nullish(),
      _ => false,
    }
  }

  /// Computes the value to store. None means the operator short-circuited and nothing is written.
  pub fn apply(self, current: &Value, value: Value) -> Option<Value> {
    if self.short_circuits(current) {
      return None;
    };
    Some(match self.binary() {
      Some(op) => binary(op, current, &value).unwrap_or_default(),
      None => value,
    })
  }

  pub fn as_str(self) -> &'static str {
    match self {
      AssignmentOperator::Assign => "=",
      AssignmentOperator::Add => "+=",
      AssignmentOperator::Subtract => "-=",
      AssignmentOperator::Multiply => "*=",
      AssignmentOperator::Divide => "/=",
      AssignmentOperator::Remainder => "%=",
      AssignmentOperator::Exponentiate => "**=",
      AssignmentOperator::ShiftLeft => "<<=",
      AssignmentOperator::ShiftRight => ">>=",
      AssignmentOperator::UnsignedShiftRight => ">>>=",
      AssignmentOperator::BitwiseAnd => "&=",
      AssignmentOperator::BitwiseOr => "|=",
      AssignmentOperator::BitwiseXor => "^=",
      AssignmentOperator::LogicalAnd => "&&=",
      AssignmentOperator::LogicalOr => "||=",
      AssignmentOperator::NullishCoalescing => "??=",
    }
  }
}

impl TryFrom<OperatorName> for AssignmentOperator {
  type Error = OperatorName;

  fn try_from(op: OperatorName) -> Result<Self, Self::Error> {
    Ok(match op {
      OperatorName::Assignment => AssignmentOperator::Assign,
      OperatorName::AssignmentAddition => AssignmentOperator::Add,
      OperatorName::AssignmentSubtraction => AssignmentOperator::Subtract,
      OperatorName::AssignmentMultiplication => AssignmentOperator::Multiply,
      OperatorName::AssignmentDivision => AssignmentOperator::Divide,
      OperatorName::AssignmentRemainder => AssignmentOperator::Remainder,
      OperatorName::AssignmentExponentiation => AssignmentOperator::Exponentiate,
      OperatorName::AssignmentBitwiseLeftShift => AssignmentOperator::ShiftLeft,
      OperatorName::AssignmentBitwiseRightShift => AssignmentOperator::ShiftRight,
      OperatorName::AssignmentBitwiseUnsignedRightShift => AssignmentOperator::UnsignedShiftRight,
      OperatorName::AssignmentBitwiseAnd => AssignmentOperator::BitwiseAnd,
      OperatorName::AssignmentBitwiseOr => AssignmentOperator::BitwiseOr,
      OperatorName::AssignmentBitwiseXor => AssignmentOperator::BitwiseXor,
      OperatorName::AssignmentLogicalAnd => AssignmentOperator::LogicalAnd,
      OperatorName::AssignmentLogicalOr => AssignmentOperator::LogicalOr,
      OperatorName::AssignmentNullishCoalescing => AssignmentOperator::NullishCoalescing,
      other => return Err(other),
    })
  }
}

// `+` with no hint: dates prefer strings, everything else numbers.
fn to_primitive_default(value: &Value) -> Value {
  let is_date = value
    .as_object()
    .is_some_and(|o| matches!(o.borrow().kind, ObjectKind::Date(_)));
  conv::to_primitive(value, if is_date { Hint::String } else { Hint::Number })
}

pub fn add(left: &Value, right: &Value) -> Value {
  let l = to_primitive_default(left);
  let r = to_primitive_default(right);
  if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) {
    let mut s = conv::to_string(&l).to_string();
    s.push_str(&conv::to_string(&r));
    return Value::from(s);
  };
  Value::Number(conv::to_number(&l) + conv::to_number(&r))
}

pub fn exponentiate(base: f64, exponent: f64) -> f64 {
  if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
    return f64::NAN;
  };
  base.powf(exponent)
}

/// Applies an operator whose result depends only on its two operand values.
/// None for operators that need the runtime (`in`, `instanceof`) or are not binary.
pub fn binary(op: OperatorName, left: &Value, right: &Value) -> Option<Value> {
  let num = |f: fn(f64, f64) -> f64| Value::Number(f(conv::to_number(left), conv::to_number(right)));
  let shift = conv::to_uint32(right) & 31;
  Some(match op {
    OperatorName::Addition => add(left, right),
    OperatorName::Subtraction => num(|a, b| a - b),
    OperatorName::Multiplication => num(|a, b| a * b),
    OperatorName::Division => num(|a, b| a / b),
    OperatorName::Remainder => num(|a, b| a % b),
    OperatorName::Exponentiation => num(exponentiate),
    OperatorName::BitwiseAnd => Value::from(conv::to_int32(left) & conv::to_int32(right)),
    OperatorName::BitwiseOr => Value::from(conv::to_int32(left) | conv::to_int32(right)),
    OperatorName::BitwiseXor => Value::from(conv::to_int32(left) ^ conv::to_int32(right)),
    OperatorName::BitwiseLeftShift => Value::from(conv::to_int32(left).wrapping_shl(shift)),
    OperatorName::BitwiseRightShift => Value::from(conv::to_int32(left) >> shift),
    OperatorName::BitwiseUnsignedRightShift => {
      Value::Number((conv::to_uint32(left) >> shift) as f64)
    }
    OperatorName::Equality => Value::Bool(conv::loose_equals(left, right)),
    OperatorName::Inequality => Value::Bool(!conv::loose_equals(left, right)),
    OperatorName::StrictEquality => Value::Bool(conv::strict_equals(left, right)),
    OperatorName::StrictInequality => Value::Bool(!conv::strict_equals(left, right)),
    OperatorName::LessThan => Value::Bool(conv::compare(left, right) == Some(Ordering::Less)),
    OperatorName::GreaterThan => {
      Value::Bool(conv::compare(left, right) == Some(Ordering::Greater))
    }
    OperatorName::LessThanOrEqual => Value::Bool(matches!(
      conv::compare(left, right),
      Some(Ordering::Less | Ordering::Equal)
    )),
    OperatorName::GreaterThanOrEqual => Value::Bool(matches!(
      conv::compare(left, right),
      Some(Ordering::Greater | Ordering::Equal)
    )),
    OperatorName::Comma => right.clone(),
    _ => return None,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn n(v: f64) -> Value {
    Value::Number(v)
  }

  #[test]
  fn test_compound_sequence() {
    let mut a = n(1.0);
    for (op, rhs, expected) in [
      (AssignmentOperator::Add, 2.0, 3.0),
      (AssignmentOperator::Subtract, 1.0, 2.0),
      (AssignmentOperator::Multiply, 3.0, 6.0),
      (AssignmentOperator::Divide, 2.0, 3.0),
      (AssignmentOperator::Remainder, 2.0, 1.0),
      (AssignmentOperator::ShiftLeft, 3.0, 8.0),
      (AssignmentOperator::ShiftRight, 1.0, 4.0),
      (AssignmentOperator::UnsignedShiftRight, 1.0, 2.0),
      (AssignmentOperator::Exponentiate, 3.0, 8.0),
      (AssignmentOperator::BitwiseXor, 12.0, 4.0),
      (AssignmentOperator::BitwiseOr, 3.0, 7.0),
      (AssignmentOperator::BitwiseAnd, 22.0, 6.0),
    ] {
      a = op.apply(&a, n(rhs)).unwrap();
      assert_eq!(a, n(expected), "{}", op.as_str());
    }
  }

  #[test]
  fn test_logical_short_circuit() {
    let op = AssignmentOperator::NullishCoalescing;
    assert_eq!(op.apply(&n(1.0), n(2.0)), None);
    assert_eq!(op.apply(&Value::Null, Value::Bool(true)), Some(Value::Bool(true)));
    assert_eq!(AssignmentOperator::LogicalOr.apply(&Value::Bool(false), n(1.0)), Some(n(1.0)));
    assert_eq!(AssignmentOperator::LogicalAnd.apply(&Value::from(""), n(1.0)), None);
  }

  #[test]
  fn test_try_from_operator_name() {
    assert_eq!(
      AssignmentOperator::try_from(OperatorName::AssignmentBitwiseUnsignedRightShift),
      Ok(AssignmentOperator::UnsignedShiftRight)
    );
    assert_eq!(
      AssignmentOperator::try_from(OperatorName::Addition),
      Err(OperatorName::Addition)
    );
  }

  #[test]
  fn test_binary_semantics() {
    assert_eq!(binary(OperatorName::Addition, &Value::from("a"), &n(1.0)), Some(Value::from("a1")));
    assert_eq!(binary(OperatorName::Addition, &Value::Bool(true), &n(1.0)), Some(n(2.0)));
    assert_eq!(binary(OperatorName::Addition, &Value::Null, &Value::Undefined).unwrap().as_number().map(f64::is_nan), Some(true));
    assert_eq!(binary(OperatorName::LessThan, &Value::from("10"), &Value::from("9")), Some(Value::Bool(true)));
    assert_eq!(binary(OperatorName::LessThan, &Value::from("10"), &n(9.0)), Some(Value::Bool(false)));
    assert_eq!(binary(OperatorName::BitwiseUnsignedRightShift, &n(-1.0), &n(0.0)), Some(n(4294967295.0)));
    assert_eq!(binary(OperatorName::BitwiseLeftShift, &n(1.0), &n(33.0)), Some(n(2.0)));
    assert_eq!(binary(OperatorName::Remainder, &n(-5.0), &n(3.0)), Some(n(-2.0)));
    assert!(binary(OperatorName::Exponentiation, &n(1.0), &n(f64::INFINITY)).unwrap().as_number().unwrap().is_nan());
    assert_eq!(binary(OperatorName::In, &n(1.0), &n(2.0)), None);
  }
}
