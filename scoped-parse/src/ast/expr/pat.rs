use super::Expr;
use crate::ast::node::Node;
use crate::ast::obj::ObjKey;
use derive_more::derive::From;
use derive_visitor::Drive;
use derive_visitor::DriveMut;
use serde::Serialize;

#[derive(Debug, Drive, DriveMut, From, Serialize)]
#[serde(tag = "$t")]
pub enum Pat {
  Arr(Node<ArrPat>),
  Id(Node<IdPat>),
  Obj(Node<ObjPat>),
  // A member expression nested in a destructuring assignment, e.g. `[a.b] = c`. Never in declarations.
  Member(Node<Expr>),
}

impl From<Pat> for Expr {
  fn from(value: Pat) -> Self {
    match value {
      Pat::Arr(arr) => Expr::ArrPat(arr),
      Pat::Id(id) => Expr::IdPat(id),
      Pat::Obj(obj) => Expr::ObjPat(obj),
      Pat::Member(expr) => *expr.stx,
    }
  }
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct ArrPatElem {
  pub target: Node<Pat>,
  pub default_value: Option<Node<Expr>>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct ArrPat {
  // Unnamed elements can exist.
  pub elements: Vec<Option<ArrPatElem>>,
  pub rest: Option<Node<Pat>>,
}

// Name of a function declaration or named function expression.
#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct ClassOrFuncName {
  #[drive(skip)]
  pub name: String,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct IdPat {
  #[drive(skip)]
  pub name: String,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct ObjPat {
  pub properties: Vec<Node<ObjPatProp>>,
  pub rest: Option<Node<Pat>>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct ObjPatProp {
  pub key: ObjKey,
  // If `shorthand`, `key` is Direct and `target` is an IdPat of the same name, so there is always an IdPat to visit.
  pub target: Node<Pat>,
  #[drive(skip)]
  pub shorthand: bool,
  pub default_value: Option<Node<Expr>>,
}
