use crate::ast::expr::lit::LitArrElem;
use crate::ast::expr::lit::LitArrExpr;
use crate::ast::expr::lit::LitObjExpr;
use crate::ast::expr::pat::ArrPat;
use crate::ast::expr::pat::ArrPatElem;
use crate::ast::expr::pat::IdPat;
use crate::ast::expr::pat::ObjPat;
use crate::ast::expr::pat::ObjPatProp;
use crate::ast::expr::pat::Pat;
use crate::ast::expr::BinaryExpr;
use crate::ast::expr::Expr;
use crate::ast::node::Node;
use crate::ast::obj::ObjKey;
use crate::ast::obj::ObjMember;
use crate::ast::obj::ObjMemberDirectKey;
use crate::ast::obj::ObjMemberType;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::operator::OperatorName;
use crate::token::TT;

// Splits `target = default` as found inside an array or object literal.
fn target_with_default(node: Node<Expr>) -> SyntaxResult<(Node<Pat>, Option<Node<Expr>>)> {
  let loc = node.loc;
  match *node.stx {
    Expr::Binary(n) => {
      let BinaryExpr {
        operator,
        left,
        right,
      } = *n.stx;
      if operator != OperatorName::Assignment {
        return Err(loc.error(SyntaxErrorType::InvalidAssigmentTarget, None));
      };
      Ok((lit_to_pat(left)?, Some(right)))
    }
    stx => Ok((lit_to_pat(Node::new(loc, stx))?, None)),
  }
}

/// Converts a literal expression subtree into a pattern (assignment target).
/// `{ a: [b] }` could be an object literal or object pattern; this avoids rewinding and reparsing once we know it's a pattern.
pub fn lit_to_pat(node: Node<Expr>) -> SyntaxResult<Node<Pat>> {
  let loc = node.loc;
  match *node.stx {
    Expr::LitArr(n) => {
      let LitArrExpr { elements } = *n.stx;
      let mut pat_elements = Vec::<Option<ArrPatElem>>::new();
      let mut rest = None;
      for element in elements {
        if rest.is_some() {
          return Err(loc.error(SyntaxErrorType::InvalidAssigmentTarget, None));
        };
        match element {
          LitArrElem::Single(elem) => {
            let (target, default_value) = target_with_default(elem)?;
            pat_elements.push(Some(ArrPatElem {
              target,
              default_value,
            }));
          }
          LitArrElem::Rest(expr) => rest = Some(lit_to_pat(expr)?),
          LitArrElem::Empty => pat_elements.push(None),
        };
      }
      Ok(Node::new(loc, ArrPat {
        elements: pat_elements,
        rest,
      }).into_wrapped())
    }
    Expr::LitObj(n) => {
      let LitObjExpr { members } = *n.stx;
      let mut properties = Vec::new();
      let mut rest = None;
      for member in members {
        let member_loc = member.loc;
        if rest.is_some() {
          return Err(member_loc.error(SyntaxErrorType::InvalidAssigmentTarget, None));
        };
        let ObjMember { typ } = *member.stx;
        match typ {
          ObjMemberType::Valued { key, val } => {
            let (target, default_value) = target_with_default(val)?;
            properties.push(Node::new(member_loc, ObjPatProp {
              key,
              target,
              shorthand: false,
              default_value,
            }));
          }
          ObjMemberType::Shorthand { id } => {
            let id_loc = id.loc;
            let name = id.stx.name.clone();
            properties.push(Node::new(member_loc, ObjPatProp {
              key: ObjKey::Direct(Node::new(id_loc, ObjMemberDirectKey {
                key: name.clone(),
                tt: TT::Identifier,
              })),
              target: Node::new(id_loc, IdPat { name }).into_wrapped(),
              shorthand: true,
              default_value: None,
            }));
          }
          ObjMemberType::Rest { val } => rest = Some(lit_to_pat(val)?),
          ObjMemberType::Method { .. } => {
            return Err(member_loc.error(SyntaxErrorType::InvalidAssigmentTarget, None))
          }
        };
      }
      Ok(Node::new(loc, ObjPat { properties, rest }).into_wrapped())
    }
    Expr::Id(n) => Ok(Node::new(loc, IdPat {
      name: n.stx.name.clone(),
    }).into_wrapped()),
    // Already converted, e.g. the `b` in `[b = 1] = x` was the target of the default's assignment.
    Expr::IdPat(n) => Ok(n.into_wrapped()),
    Expr::ArrPat(n) => Ok(n.into_wrapped()),
    Expr::ObjPat(n) => Ok(n.into_wrapped()),
    stx @ (Expr::Member(_) | Expr::ComputedMember(_)) if !is_optional_chain(&stx) => {
      Ok(Node::new(loc, Pat::Member(Node::new(loc, stx))))
    }
    _ => Err(loc.error(SyntaxErrorType::InvalidAssigmentTarget, None)),
  }
}

fn is_optional_chain(expr: &Expr) -> bool {
  match expr {
    Expr::Member(m) => m.stx.optional_chaining || is_optional_chain(&m.stx.left.stx),
    Expr::ComputedMember(m) => m.stx.optional_chaining || is_optional_chain(&m.stx.object.stx),
    Expr::Call(c) => c.stx.optional_chaining || is_optional_chain(&c.stx.callee.stx),
    _ => false,
  }
}

// Checking every operand up front is wasteful, so the LHS of an assignment is transformed retroactively, raising an error if it isn't a valid target. A valid target is:
// - An identifier.
// - A member access chain without optional chaining.
// - A pattern, for plain `=` only.
pub fn lhs_expr_to_assign_target(
  lhs: Node<Expr>,
  operator_name: OperatorName,
) -> SyntaxResult<Node<Expr>> {
  match lhs.stx.as_ref() {
    Expr::LitArr(_) | Expr::LitObj(_) if operator_name == OperatorName::Assignment => {
      Ok(lit_to_pat(lhs)?.into_stx())
    }
    Expr::Id(_) => Ok(lit_to_pat(lhs)?.into_stx()),
    e @ (Expr::Member(_) | Expr::ComputedMember(_)) if !is_optional_chain(e) => Ok(lhs),
    _ => Err(lhs.error(SyntaxErrorType::InvalidAssigmentTarget)),
  }
}

/// Operand of `++`/`--`, which stays an expression since it is read before it is written.
pub fn check_update_target(operand: &Node<Expr>) -> SyntaxResult<()> {
  match operand.stx.as_ref() {
    Expr::Id(_) => Ok(()),
    e @ (Expr::Member(_) | Expr::ComputedMember(_)) if !is_optional_chain(e) => Ok(()),
    _ => Err(operand.error(SyntaxErrorType::InvalidAssigmentTarget)),
  }
}
