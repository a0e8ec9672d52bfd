pub mod decl;

use super::expr::Expr;
use super::node::Node;
use decl::FuncDecl;
use decl::PatDecl;
use decl::VarDecl;
use derive_more::derive::From;
use derive_more::derive::TryInto;
use derive_visitor::Drive;
use derive_visitor::DriveMut;
use serde::Serialize;

// We must wrap each variant with Node<T> as otherwise we won't be able to visit Node<T> instead of just T.
#[derive(Debug, Drive, DriveMut, From, Serialize, TryInto)]
#[serde(tag = "$t")]
pub enum Stmt {
  Block(Node<BlockStmt>),
  Break(Node<BreakStmt>),
  Continue(Node<ContinueStmt>),
  DoWhile(Node<DoWhileStmt>),
  Empty(Node<EmptyStmt>),
  Expr(Node<ExprStmt>),
  ForIn(Node<ForInStmt>),
  ForOf(Node<ForOfStmt>),
  ForTriple(Node<ForTripleStmt>),
  If(Node<IfStmt>),
  Label(Node<LabelStmt>),
  Return(Node<ReturnStmt>),
  Switch(Node<SwitchStmt>),
  Throw(Node<ThrowStmt>),
  Try(Node<TryStmt>),
  While(Node<WhileStmt>),
  FunctionDecl(Node<FuncDecl>),
  VarDecl(Node<VarDecl>),
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct CatchBlock {
  pub parameter: Option<Node<PatDecl>>,
  // Not a BlockStmt: the catch scope starts at the parameter, not the braces.
  pub body: Vec<Node<Stmt>>,
}

// The scope of a `for` statement starts before the braces, so this is not a BlockStmt either.
#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct ForBody {
  pub body: Vec<Node<Stmt>>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct SwitchBranch {
  // If None, it's `default`.
  pub case: Option<Node<Expr>>,
  pub body: Vec<Node<Stmt>>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct BlockStmt {
  pub body: Vec<Node<Stmt>>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct BreakStmt {
  #[drive(skip)]
  pub label: Option<String>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct ContinueStmt {
  #[drive(skip)]
  pub label: Option<String>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct DoWhileStmt {
  pub condition: Node<Expr>,
  pub body: Node<Stmt>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct EmptyStmt {}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct ExprStmt {
  pub expr: Node<Expr>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct IfStmt {
  pub test: Node<Expr>,
  pub consequent: Node<Stmt>,
  pub alternate: Option<Node<Stmt>>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct ForTripleStmt {
  pub init: ForTripleStmtInit,
  pub cond: Option<Node<Expr>>,
  pub post: Option<Node<Expr>>,
  pub body: Node<ForBody>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub enum ForTripleStmtInit {
  None,
  Expr(Node<Expr>),
  Decl(Node<VarDecl>),
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub enum ForInOfLhs {
  // Assignment target: an IdPat, a destructuring pattern or a member expression.
  Assign(Node<Expr>),
  // Exactly one declarator, without initializer.
  Decl(Node<VarDecl>),
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct ForInStmt {
  pub lhs: ForInOfLhs,
  pub rhs: Node<Expr>,
  pub body: Node<ForBody>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct ForOfStmt {
  pub lhs: ForInOfLhs,
  pub rhs: Node<Expr>,
  pub body: Node<ForBody>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct LabelStmt {
  #[drive(skip)]
  pub name: String,
  pub statement: Node<Stmt>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct ReturnStmt {
  pub value: Option<Node<Expr>>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct SwitchStmt {
  pub test: Node<Expr>,
  pub branches: Vec<Node<SwitchBranch>>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct ThrowStmt {
  pub value: Node<Expr>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct TryStmt {
  pub wrapped: Node<BlockStmt>,
  // One of these must be present.
  pub catch: Option<Node<CatchBlock>>,
  pub finally: Option<Node<BlockStmt>>,
}

#[derive(Debug, Drive, DriveMut, Serialize)]
pub struct WhileStmt {
  pub condition: Node<Expr>,
  pub body: Node<Stmt>,
}
