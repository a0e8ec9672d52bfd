use crate::operator::OperatorName;
use crate::token::TT;

/// The operator a token introduces when it follows a complete operand.
pub fn infix_operator(typ: TT) -> Option<OperatorName> {
  use OperatorName as O;
  Some(match typ {
    TT::Comma => O::Comma,
    TT::Question => O::Conditional,
    TT::ParenthesisOpen => O::Call,
    TT::BracketOpen => O::ComputedMemberAccess,
    TT::Dot => O::MemberAccess,
    TT::QuestionDot => O::OptionalChainingMemberAccess,
    TT::QuestionDotBracketOpen => O::OptionalChainingComputedMemberAccess,
    TT::QuestionDotParenthesisOpen => O::OptionalChainingCall,

    TT::Equals => O::Assignment,
    TT::PlusEquals => O::AssignmentAddition,
    TT::HyphenEquals => O::AssignmentSubtraction,
    TT::AsteriskEquals => O::AssignmentMultiplication,
    TT::SlashEquals => O::AssignmentDivision,
    TT::PercentEquals => O::AssignmentRemainder,
    TT::AsteriskAsteriskEquals => O::AssignmentExponentiation,
    TT::AmpersandEquals => O::AssignmentBitwiseAnd,
    TT::BarEquals => O::AssignmentBitwiseOr,
    TT::CaretEquals => O::AssignmentBitwiseXor,
    TT::ChevronLeftChevronLeftEquals => O::AssignmentBitwiseLeftShift,
    TT::ChevronRightChevronRightEquals => O::AssignmentBitwiseRightShift,
    TT::ChevronRightChevronRightChevronRightEquals => O::AssignmentBitwiseUnsignedRightShift,
    TT::AmpersandAmpersandEquals => O::AssignmentLogicalAnd,
    TT::BarBarEquals => O::AssignmentLogicalOr,
    TT::QuestionQuestionEquals => O::AssignmentNullishCoalescing,

    TT::Plus => O::Addition,
    TT::Hyphen => O::Subtraction,
    TT::Asterisk => O::Multiplication,
    TT::Slash => O::Division,
    TT::Percent => O::Remainder,
    TT::AsteriskAsterisk => O::Exponentiation,
    TT::Ampersand => O::BitwiseAnd,
    TT::Bar => O::BitwiseOr,
    TT::Caret => O::BitwiseXor,
    TT::ChevronLeftChevronLeft => O::BitwiseLeftShift,
    TT::ChevronRightChevronRight => O::BitwiseRightShift,
    TT::ChevronRightChevronRightChevronRight => O::BitwiseUnsignedRightShift,
    TT::AmpersandAmpersand => O::LogicalAnd,
    TT::BarBar => O::LogicalOr,
    TT::QuestionQuestion => O::NullishCoalescing,

    TT::EqualsEquals => O::Equality,
    TT::ExclamationEquals => O::Inequality,
    TT::EqualsEqualsEquals => O::StrictEquality,
    TT::ExclamationEqualsEquals => O::StrictInequality,
    TT::ChevronLeft => O::LessThan,
    TT::ChevronLeftEquals => O::LessThanOrEqual,
    TT::ChevronRight => O::GreaterThan,
    TT::ChevronRightEquals => O::GreaterThanOrEqual,
    TT::KeywordIn => O::In,
    TT::KeywordInstanceof => O::Instanceof,
    _ => return None,
  })
}

/// The operator a token introduces when it precedes an operand. Postfix `++`/`--` are recognised
/// by the expression loop itself, and `new` has its own expression.
pub fn prefix_operator(typ: TT) -> Option<OperatorName> {
  Some(match typ {
    TT::Exclamation => OperatorName::LogicalNot,
    TT::Tilde => OperatorName::BitwiseNot,
    TT::Plus => OperatorName::UnaryPlus,
    TT::Hyphen => OperatorName::UnaryNegation,
    TT::PlusPlus => OperatorName::PrefixIncrement,
    TT::HyphenHyphen => OperatorName::PrefixDecrement,
    TT::KeywordTypeof => OperatorName::Typeof,
    TT::KeywordVoid => OperatorName::Void,
    TT::KeywordDelete => OperatorName::Delete,
    _ => return None,
  })
}
