use super::expr::Expr;
use super::expr::IdExpr;
use super::func::Func;
use super::node::Node;
use crate::token::TT;
use derive_visitor::Drive;
use derive_visitor::DriveMut;
use serde::Serialize;

/// This is a node as the key may not the same as source[node.loc], due to decoding/normalization.
#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct ObjMemberDirectKey {
  #[drive(skip)]
  pub key: String,
  // Token type of the key, to tell identifiers and keywords apart from string and number keys.
  #[drive(skip)]
  pub tt: TT,
}

// Direct keys must stay distinct from IdExpr: a property name is not a variable usage.
#[derive(Debug, Drive, DriveMut, Serialize)]
pub enum ObjKey {
  // Identifier, keyword, string, or number.
  Direct(Node<ObjMemberDirectKey>),
  Computed(Node<Expr>),
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub enum ObjMemberType {
  Valued {
    key: ObjKey,
    val: Node<Expr>,
  },
  Method {
    key: ObjKey,
    func: Node<Func>,
  },
  // `{ a }`. The IdExpr is a real usage of `a`.
  Shorthand {
    id: Node<IdExpr>,
  },
  Rest {
    val: Node<Expr>,
  },
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct ObjMember {
  pub typ: ObjMemberType,
}
