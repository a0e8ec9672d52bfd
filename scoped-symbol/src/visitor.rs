use crate::symbol::Scope;
use crate::symbol::ScopeType;
use derive_visitor::VisitorMut;
use scoped_parse::ast::expr::pat::ClassOrFuncName;
use scoped_parse::ast::expr::pat::IdPat;
use scoped_parse::ast::expr::Expr;
use scoped_parse::ast::expr::FuncExpr;
use scoped_parse::ast::func::Func;
use scoped_parse::ast::node::Node;
use scoped_parse::ast::node::NodeAssocData;
use scoped_parse::ast::stmt::decl::FuncDecl;
use scoped_parse::ast::stmt::decl::PatDecl;
use scoped_parse::ast::stmt::decl::VarDecl;
use scoped_parse::ast::stmt::decl::VarDeclMode;
use scoped_parse::ast::stmt::BlockStmt;
use scoped_parse::ast::stmt::CatchBlock;
use scoped_parse::ast::stmt::ForBody;
use scoped_parse::ast::stmt::ForInStmt;
use scoped_parse::ast::stmt::ForOfStmt;
use scoped_parse::ast::stmt::ForTripleStmt;
use scoped_parse::ast::stmt::SwitchStmt;

#[derive(PartialEq, Eq, Clone, Copy)]
enum AddToScope {
  // The current scope, whatever its type.
  Lexical,
  NearestClosure,
}

type BlockStmtNode = Node<BlockStmt>;
type CatchBlockNode = Node<CatchBlock>;
type ExprNode = Node<Expr>;
type ForBodyNode = Node<ForBody>;
type ForInStmtNode = Node<ForInStmt>;
type ForOfStmtNode = Node<ForOfStmt>;
type ForTripleStmtNode = Node<ForTripleStmt>;
type FuncNode = Node<Func>;
type FuncDeclNode = Node<FuncDecl>;
type FuncExprNode = Node<FuncExpr>;
type IdPatNode = Node<IdPat>;
type PatDeclNode = Node<PatDecl>;
type SwitchStmtNode = Node<SwitchStmt>;
type VarDeclNode = Node<VarDecl>;

#[derive(VisitorMut)]
#[visitor(
  BlockStmtNode,
  CatchBlockNode,
  ExprNode,
  ForBodyNode,
  ForInStmtNode,
  ForOfStmtNode,
  ForTripleStmtNode,
  FuncNode,
  FuncDeclNode(enter),
  FuncExprNode,
  IdPatNode(enter),
  PatDeclNode,
  SwitchStmtNode,
  VarDeclNode,
  NodeAssocData(enter)
)]
pub struct DeclVisitor {
  scope_stack: Vec<Scope>,
  pattern_action_stack: Vec<AddToScope>,
  in_pattern_decl: Vec<bool>,
}

impl DeclVisitor {
  pub fn new(top_level_scope: Scope) -> DeclVisitor {
    DeclVisitor {
      scope_stack: vec![top_level_scope],
      pattern_action_stack: Vec::new(),
      in_pattern_decl: vec![false],
    }
  }

  fn scope(&self) -> &Scope {
    // The root scope is never popped.
    &self.scope_stack[self.scope_stack.len() - 1]
  }

  fn add_to_scope(&mut self, name: String, action: AddToScope) {
    match action {
      AddToScope::Lexical => {
        self.scope().data_mut().add_symbol(name);
      }
      AddToScope::NearestClosure => {
        if let Some(closure) = self.scope().find_self_or_ancestor(|t| t.is_closure()) {
          closure.data_mut().add_symbol(name);
        };
      }
    };
  }

  fn new_scope(&mut self, typ: ScopeType) {
    let scope = self.scope().create_child_scope(typ);
    self.scope_stack.push(scope);
  }

  fn restore_scope(&mut self) {
    self.scope_stack.pop();
  }

  fn pattern_action(&self) -> AddToScope {
    self
      .pattern_action_stack
      .last()
      .copied()
      .unwrap_or(AddToScope::Lexical)
  }

  fn new_pattern_action(&mut self, action: AddToScope) {
    self.pattern_action_stack.push(action);
  }

  fn restore_pattern_action(&mut self) {
    self.pattern_action_stack.pop();
  }

  fn is_in_pattern_decl(&self) -> bool {
    self.in_pattern_decl.last().copied().unwrap_or(false)
  }
}

impl DeclVisitor {
  fn enter_block_stmt_node(&mut self, _node: &mut BlockStmtNode) {
    self.new_scope(ScopeType::Block);
  }

  fn exit_block_stmt_node(&mut self, _node: &mut BlockStmtNode) {
    self.restore_scope();
  }

  fn enter_catch_block_node(&mut self, _node: &mut CatchBlockNode) {
    self.new_scope(ScopeType::Block);
    // For the parameter.
    self.new_pattern_action(AddToScope::Lexical);
  }

  fn exit_catch_block_node(&mut self, _node: &mut CatchBlockNode) {
    self.restore_scope();
    self.restore_pattern_action();
  }

  // Any expression, including a default value inside a declaring pattern, only assigns.
  fn enter_expr_node(&mut self, _node: &mut ExprNode) {
    self.in_pattern_decl.push(false);
  }

  fn exit_expr_node(&mut self, _node: &mut ExprNode) {
    self.in_pattern_decl.pop();
  }

  fn enter_for_body_node(&mut self, _node: &mut ForBodyNode) {
    self.new_scope(ScopeType::Block);
  }

  fn exit_for_body_node(&mut self, _node: &mut ForBodyNode) {
    self.restore_scope();
  }

  // The loop head gets its own block so `let` in it does not leak out of the loop.
  fn enter_for_in_stmt_node(&mut self, _node: &mut ForInStmtNode) {
    self.new_scope(ScopeType::Block);
  }

  fn exit_for_in_stmt_node(&mut self, _node: &mut ForInStmtNode) {
    self.restore_scope();
  }

  fn enter_for_of_stmt_node(&mut self, _node: &mut ForOfStmtNode) {
    self.new_scope(ScopeType::Block);
  }

  fn exit_for_of_stmt_node(&mut self, _node: &mut ForOfStmtNode) {
    self.restore_scope();
  }

  fn enter_for_triple_stmt_node(&mut self, _node: &mut ForTripleStmtNode) {
    self.new_scope(ScopeType::Block);
  }

  fn exit_for_triple_stmt_node(&mut self, _node: &mut ForTripleStmtNode) {
    self.restore_scope();
  }

  fn enter_func_node(&mut self, node: &mut FuncNode) {
    if node.stx.arrow {
      self.new_scope(ScopeType::ArrowFunction);
    } else {
      self.new_scope(ScopeType::NonArrowFunction);
      self.add_to_scope("arguments".to_string(), AddToScope::Lexical);
    }
    // For the parameters.
    self.new_pattern_action(AddToScope::NearestClosure);
  }

  fn exit_func_node(&mut self, _node: &mut FuncNode) {
    self.restore_scope();
    self.restore_pattern_action();
  }

  fn enter_func_decl_node(&mut self, node: &mut FuncDeclNode) {
    // The name belongs in the containing scope, not the function's scope.
    let ClassOrFuncName { name } = node.stx.name.stx.as_ref();
    self.add_to_scope(name.clone(), AddToScope::Lexical);
  }

  fn enter_func_expr_node(&mut self, node: &mut FuncExprNode) {
    // A scope just for the name: it is visible inside the function only, and can be shadowed by its own locals.
    self.new_scope(ScopeType::NonArrowFunction);
    if let Some(name) = &node.stx.name {
      let ClassOrFuncName { name } = name.stx.as_ref();
      self.add_to_scope(name.clone(), AddToScope::Lexical);
    };
  }

  fn exit_func_expr_node(&mut self, _node: &mut FuncExprNode) {
    self.restore_scope();
  }

  fn enter_id_pat_node(&mut self, node: &mut IdPatNode) {
    // An identifier pattern doesn't always declare, e.g. `a = 1` or `[a] = b`.
    if self.is_in_pattern_decl() {
      self.add_to_scope(node.stx.name.clone(), self.pattern_action());
    }
  }

  fn enter_pat_decl_node(&mut self, _node: &mut PatDeclNode) {
    self.in_pattern_decl.push(true);
  }

  fn exit_pat_decl_node(&mut self, _node: &mut PatDeclNode) {
    self.in_pattern_decl.pop();
  }

  fn enter_switch_stmt_node(&mut self, _node: &mut SwitchStmtNode) {
    self.new_scope(ScopeType::Block);
  }

  fn exit_switch_stmt_node(&mut self, _node: &mut SwitchStmtNode) {
    self.restore_scope();
  }

  fn enter_var_decl_node(&mut self, node: &mut VarDeclNode) {
    self.new_pattern_action(match node.stx.mode {
      VarDeclMode::Const | VarDeclMode::Let => AddToScope::Lexical,
      VarDeclMode::Var => AddToScope::NearestClosure,
    });
  }

  fn exit_var_decl_node(&mut self, _node: &mut VarDeclNode) {
    self.restore_pattern_action();
  }

  // Every node gets the scope at the top of the stack. NodeAssocData is on every node, so this avoids visiting each Node<T> type.
  fn enter_node_assoc_data(&mut self, assoc: &mut NodeAssocData) {
    assoc.set(self.scope().clone());
  }
}
