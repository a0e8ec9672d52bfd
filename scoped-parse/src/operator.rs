use serde::Serialize;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
pub enum OperatorName {
  Addition,
  Assignment,
  AssignmentAddition,
  AssignmentBitwiseAnd,
  AssignmentBitwiseLeftShift,
  AssignmentBitwiseOr,
  AssignmentBitwiseRightShift,
  AssignmentBitwiseUnsignedRightShift,
  AssignmentBitwiseXor,
  AssignmentDivision,
  AssignmentExponentiation,
  AssignmentLogicalAnd,
  AssignmentLogicalOr,
  AssignmentMultiplication,
  AssignmentNullishCoalescing,
  AssignmentRemainder,
  AssignmentSubtraction,
  BitwiseAnd,
  BitwiseLeftShift,
  BitwiseNot,
  BitwiseOr,
  BitwiseRightShift,
  BitwiseUnsignedRightShift,
  BitwiseXor,
  Call,
  Comma,
  ComputedMemberAccess,
  Conditional,
  Delete,
  Division,
  Equality,
  Exponentiation,
  GreaterThan,
  GreaterThanOrEqual,
  In,
  Inequality,
  Instanceof,
  LessThan,
  LessThanOrEqual,
  LogicalAnd,
  LogicalNot,
  LogicalOr,
  MemberAccess,
  Multiplication,
  New,
  NullishCoalescing,
  OptionalChainingMemberAccess,
  OptionalChainingComputedMemberAccess,
  OptionalChainingCall,
  PostfixDecrement,
  PostfixIncrement,
  PrefixDecrement,
  PrefixIncrement,
  Remainder,
  StrictEquality,
  StrictInequality,
  Subtraction,
  Typeof,
  UnaryNegation,
  UnaryPlus,
  Void,
}

impl OperatorName {
  pub fn is_assignment(self) -> bool {
    matches!(
      self,
      OperatorName::Assignment
        | OperatorName::AssignmentAddition
        | OperatorName::AssignmentBitwiseAnd
        | OperatorName::AssignmentBitwiseLeftShift
        | OperatorName::AssignmentBitwiseOr
        | OperatorName::AssignmentBitwiseRightShift
        | OperatorName::AssignmentBitwiseUnsignedRightShift
        | OperatorName::AssignmentBitwiseXor
        | OperatorName::AssignmentDivision
        | OperatorName::AssignmentExponentiation
        | OperatorName::AssignmentLogicalAnd
        | OperatorName::AssignmentLogicalOr
        | OperatorName::AssignmentMultiplication
        | OperatorName::AssignmentNullishCoalescing
        | OperatorName::AssignmentRemainder
        | OperatorName::AssignmentSubtraction
    )
  }

  /// For a compound assignment, the binary operator it applies (e.g. `+=` gives `+`).
  pub fn compound_binary(self) -> Option<OperatorName> {
    Some(match self {
      OperatorName::AssignmentAddition => OperatorName::Addition,
      OperatorName::AssignmentBitwiseAnd => OperatorName::BitwiseAnd,
      OperatorName::AssignmentBitwiseLeftShift => OperatorName::BitwiseLeftShift,
      OperatorName::AssignmentBitwiseOr => OperatorName::BitwiseOr,
      OperatorName::AssignmentBitwiseRightShift => OperatorName::BitwiseRightShift,
      OperatorName::AssignmentBitwiseUnsignedRightShift => OperatorName::BitwiseUnsignedRightShift,
      OperatorName::AssignmentBitwiseXor => OperatorName::BitwiseXor,
      OperatorName::AssignmentDivision => OperatorName::Division,
      OperatorName::AssignmentExponentiation => OperatorName::Exponentiation,
      OperatorName::AssignmentLogicalAnd => OperatorName::LogicalAnd,
      OperatorName::AssignmentLogicalOr => OperatorName::LogicalOr,
      OperatorName::AssignmentMultiplication => OperatorName::Multiplication,
      OperatorName::AssignmentNullishCoalescing => OperatorName::NullishCoalescing,
      OperatorName::AssignmentRemainder => OperatorName::Remainder,
      OperatorName::AssignmentSubtraction => OperatorName::Subtraction,
      _ => return None,
    })
  }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Associativity {
  Left,
  Right,
}

impl OperatorName {
  /// Binding strength. The comma operator binds weakest at 1, leaving 0 to mean "accept anything".
  pub fn precedence(self) -> u8 {
    use OperatorName::*;
    match self {
      Comma => 1,
      LogicalOr | NullishCoalescing => 3,
      LogicalAnd => 4,
      BitwiseOr => 5,
      BitwiseXor => 6,
      BitwiseAnd => 7,
      Equality | Inequality | StrictEquality | StrictInequality => 8,
      LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual | In | Instanceof => 9,
      BitwiseLeftShift | BitwiseRightShift | BitwiseUnsignedRightShift => 10,
      Addition | Subtraction => 11,
      Multiplication | Division | Remainder => 12,
      Exponentiation => 13,
      LogicalNot | BitwiseNot | UnaryPlus | UnaryNegation | PrefixIncrement | PrefixDecrement
      | Typeof | Void | Delete => 14,
      PostfixIncrement | PostfixDecrement => 15,
      New => 16,
      MemberAccess
      | ComputedMemberAccess
      | Call
      | OptionalChainingMemberAccess
      | OptionalChainingComputedMemberAccess
      | OptionalChainingCall => 17,
      // Conditional and assignments.
      _ => 2,
    }
  }

  pub fn associativity(self) -> Associativity {
    match self.precedence() {
      // Conditional, assignments, `**`, prefix unary and `new`.
      2 | 13 | 14 | 16 => Associativity::Right,
      _ => Associativity::Left,
    }
  }

  /// The minimum precedence an operator's right operand may have.
  pub fn right_min_precedence(self) -> u8 {
    self.precedence() + u8::from(self.associativity() == Associativity::Left)
  }
}
