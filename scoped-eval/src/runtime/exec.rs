use super::builtins::regexp;
use super::conv;
use super::env::Assign;
use super::env::Env;
use super::env::Lookup;
use super::operator;
use super::operator::AssignmentOperator;
use super::realm::ErrorKind;
use super::value::Closure;
use super::value::Obj;
use super::value::ObjectKind;
use super::value::Value;
use super::vm::Runtime;
use crate::error::Result;
use crate::error::ScopedEvalError;
use ahash::HashSet;
use ahash::HashSetExt;
use derive_visitor::DriveMut;
use derive_visitor::VisitorMut;
use scoped_parse::ast::expr::lit::LitArrElem;
use scoped_parse::ast::expr::lit::LitObjExpr;
use scoped_parse::ast::expr::lit::LitTemplatePart;
use scoped_parse::ast::expr::pat::ArrPat;
use scoped_parse::ast::expr::pat::ObjPat;
use scoped_parse::ast::expr::pat::Pat;
use scoped_parse::ast::expr::BinaryExpr;
use scoped_parse::ast::expr::CallArg;
use scoped_parse::ast::expr::Expr;
use scoped_parse::ast::func::Func;
use scoped_parse::ast::func::FuncBody;
use scoped_parse::ast::node::Node;
use scoped_parse::ast::obj::ObjKey;
use scoped_parse::ast::obj::ObjMemberType;
use scoped_parse::ast::stmt::decl::VarDecl;
use scoped_parse::ast::stmt::decl::VarDeclMode;
use scoped_parse::ast::stmt::CatchBlock;
use scoped_parse::ast::stmt::ForInOfLhs;
use scoped_parse::ast::stmt::ForTripleStmtInit;
use scoped_parse::ast::stmt::Stmt;
use scoped_parse::ast::stmt::SwitchStmt;
use scoped_parse::ast::stmt::TryStmt;
use scoped_parse::ast::stx::TopLevel;
use scoped_parse::operator::OperatorName;
use std::rc::Rc;
use std::sync::Arc;

pub enum Completion {
  Normal(Option<Value>),
  Return(Value),
  Break(Option<String>, Option<Value>),
  Continue(Option<String>, Option<Value>),
}

impl Completion {
  pub fn empty() -> Self {
    Completion::Normal(None)
  }

  pub fn normal(value: Value) -> Self {
    Completion::Normal(Some(value))
  }

  pub fn is_abrupt(&self) -> bool {
    !matches!(self, Completion::Normal(_))
  }

  pub fn update_empty(self, value: Option<Value>) -> Self {
    match self {
      Completion::Normal(None) => Completion::Normal(value),
      Completion::Break(target, None) => Completion::Break(target, value),
      Completion::Continue(target, None) => Completion::Continue(target, value),
      other => other,
    }
  }
}

/// A function body moved out of the tree so closures can hold it without borrowing the program.
pub struct SharedFunc(pub Arc<Node<Func>>);

type FuncNode = Node<Func>;

#[derive(Default, VisitorMut)]
#[visitor(FuncNode(exit))]
struct FunctionSharer {}

impl FunctionSharer {
  fn exit_func_node(&mut self, node: &mut FuncNode) {
    let placeholder = Node::new(node.loc, Func {
      arrow: node.stx.arrow,
      parameters: Vec::new(),
      body: FuncBody::Block(Vec::new()),
    });
    let func = std::mem::replace(node, placeholder);
    node.assoc.set(SharedFunc(Arc::new(func)));
  }
}

/// Prepares a parsed program for execution. Must run once before the program is passed to
/// [`Runtime::run`].
pub fn prepare(program: &mut Node<TopLevel>) {
  program.drive_mut(&mut FunctionSharer::default());
}

#[derive(Clone, Copy)]
enum BindMode {
  Declare { mutable: bool },
  // Ends the temporal dead zone of a `let`/`const` hoisted by the enclosing block.
  Initialize,
  Assign,
}

enum LoopControl {
  Next,
  Exit,
  Propagate(Completion),
}

fn loop_control(completion: Completion, labels: &[String], value: &mut Option<Value>) -> LoopControl {
  match completion {
    Completion::Normal(v) | Completion::Continue(None, v) => {
      if v.is_some() {
        *value = v;
      };
      LoopControl::Next
    }
    Completion::Continue(Some(label), v) if labels.contains(&label) => {
      if v.is_some() {
        *value = v;
      };
      LoopControl::Next
    }
    Completion::Break(None, v) => {
      if v.is_some() {
        *value = v;
      };
      LoopControl::Exit
    }
    other => LoopControl::Propagate(other.update_empty(value.clone())),
  }
}

fn pat_names(pat: &Pat, out: &mut Vec<String>) {
  match pat {
    Pat::Id(id) => out.push(id.stx.name.clone()),
    Pat::Arr(arr) => {
      for elem in arr.stx.elements.iter().flatten() {
        pat_names(&elem.target.stx, out);
      }
      if let Some(rest) = &arr.stx.rest {
        pat_names(&rest.stx, out);
      };
    }
    Pat::Obj(obj) => {
      for prop in &obj.stx.properties {
        pat_names(&prop.stx.target.stx, out);
      }
      if let Some(rest) = &obj.stx.rest {
        pat_names(&rest.stx, out);
      };
    }
    Pat::Member(_) => {}
  }
}

fn decl_names(decl: &VarDecl) -> Vec<String> {
  let mut names = Vec::new();
  for declarator in &decl.declarators {
    pat_names(&declarator.pattern.stx.pat.stx, &mut names);
  }
  names
}

fn collect_var_names(stmt: &Stmt, out: &mut Vec<String>) {
  let all = |stmts: &[Node<Stmt>], out: &mut Vec<String>| {
    for stmt in stmts {
      collect_var_names(&stmt.stx, out);
    }
  };
  let var_decl = |decl: &VarDecl, out: &mut Vec<String>| {
    if decl.mode == VarDeclMode::Var {
      out.extend(decl_names(decl));
    };
  };
  match stmt {
    Stmt::VarDecl(decl) => var_decl(&decl.stx, out),
    Stmt::Block(block) => all(&block.stx.body, out),
    Stmt::If(stmt) => {
      collect_var_names(&stmt.stx.consequent.stx, out);
      if let Some(alternate) = &stmt.stx.alternate {
        collect_var_names(&alternate.stx, out);
      };
    }
    Stmt::ForTriple(stmt) => {
      if let ForTripleStmtInit::Decl(decl) = &stmt.stx.init {
        var_decl(&decl.stx, out);
      };
      all(&stmt.stx.body.stx.body, out);
    }
    Stmt::ForIn(stmt) => {
      if let ForInOfLhs::Decl(decl) = &stmt.stx.lhs {
        var_decl(&decl.stx, out);
      };
      all(&stmt.stx.body.stx.body, out);
    }
    Stmt::ForOf(stmt) => {
      if let ForInOfLhs::Decl(decl) = &stmt.stx.lhs {
        var_decl(&decl.stx, out);
      };
      all(&stmt.stx.body.stx.body, out);
    }
    Stmt::While(stmt) => collect_var_names(&stmt.stx.body.stx, out),
    Stmt::DoWhile(stmt) => collect_var_names(&stmt.stx.body.stx, out),
    Stmt::Label(stmt) => collect_var_names(&stmt.stx.statement.stx, out),
    Stmt::Switch(stmt) => {
      for branch in &stmt.stx.branches {
        all(&branch.stx.body, out);
      }
    }
    Stmt::Try(stmt) => {
      all(&stmt.stx.wrapped.stx.body, out);
      if let Some(catch) = &stmt.stx.catch {
        all(&catch.stx.body, out);
      };
      if let Some(finally) = &stmt.stx.finally {
        all(&finally.stx.body, out);
      };
    }
    _ => {}
  }
}

fn shared_func(node: &Node<Func>) -> Result<Arc<Node<Func>>> {
  node
    .assoc
    .get::<SharedFunc>()
    .map(|f| f.0.clone())
    .ok_or(ScopedEvalError::Unsupported("function body was not prepared"))
}

fn property_key(value: &Value) -> String {
  conv::to_string(value).to_string()
}

// Source-like rendering of a callee for "is not a function" messages.
fn describe_expr(expr: &Node<Expr>) -> String {
  match expr.stx.as_ref() {
    Expr::Id(id) => id.stx.name.clone(),
    Expr::Member(m) => format!("{}.{}", describe_expr(&m.stx.left), m.stx.right),
    Expr::ComputedMember(m) => format!("{}[...]", describe_expr(&m.stx.object)),
    Expr::Call(c) => format!("{}(...)", describe_expr(&c.stx.callee)),
    Expr::This(_) => "this".to_string(),
    _ => "expression".to_string(),
  }
}

fn binding_name(pat: &Node<Pat>) -> &str {
  match pat.stx.as_ref() {
    Pat::Id(id) => &id.stx.name,
    _ => "",
  }
}

impl Runtime {
  pub(super) fn call_closure(
    &mut self,
    func: &Node<Func>,
    captured: Rc<Env>,
    this: Value,
    args: &[Value],
  ) -> Result<Value> {
    let f = &func.stx;
    let env = if f.arrow {
      Env::function(Some(captured), None)
    } else {
      let env = Env::function(Some(captured), Some(this));
      env.declare("arguments", Value::array(args.iter().cloned()), true);
      env
    };
    for (i, param) in f.parameters.iter().enumerate() {
      let p = &param.stx;
      let value = if p.rest {
        Value::array(args.iter().skip(i).cloned())
      } else {
        let arg = args.get(i).cloned().unwrap_or_default();
        match &p.default_value {
          Some(default) if arg.is_undefined() => {
            self.eval_named(&env, default, binding_name(&p.pattern.stx.pat))?
          }
          _ => arg,
        }
      };
      self.bind_pattern(&env, &p.pattern.stx.pat, value, BindMode::Declare {
        mutable: true,
      })?;
    }
    match &f.body {
      FuncBody::Expression(expr) => self.eval_expr(&env, expr),
      FuncBody::Block(body) => {
        self.hoist_var_decls(&env, body);
        self.declare_block(&env, body)?;
        match self.eval_stmt_list(&env, body)? {
          Completion::Return(value) => Ok(value),
          _ => Ok(Value::Undefined),
        }
      }
    }
  }

  fn make_closure(&self, env: &Rc<Env>, func: &Node<Func>, name: &str) -> Result<Value> {
    Ok(Value::Object(Obj::new(
      ObjectKind::Closure(Closure {
        name: Rc::from(name),
        func: shared_func(func)?,
        env: env.clone(),
      }),
      None,
    )))
  }

  pub(super) fn hoist_var_decls(&self, env: &Rc<Env>, stmts: &[Node<Stmt>]) {
    let mut names = Vec::new();
    for stmt in stmts {
      collect_var_names(&stmt.stx, &mut names);
    }
    for name in names {
      env.declare_var(&name);
    }
  }

  /// Creates the lexical bindings of a block: `let`/`const` in their dead zone, and functions.
  pub(super) fn declare_block(&self, env: &Rc<Env>, stmts: &[Node<Stmt>]) -> Result<()> {
    for stmt in stmts {
      match stmt.stx.as_ref() {
        Stmt::VarDecl(decl) if decl.stx.mode != VarDeclMode::Var => {
          let mutable = decl.stx.mode == VarDeclMode::Let;
          for name in decl_names(&decl.stx) {
            env.declare_lexical(&name, mutable);
          }
        }
        Stmt::FunctionDecl(decl) => {
          let name = &decl.stx.name.stx.name;
          let closure = self.make_closure(env, &decl.stx.function, name)?;
          env.declare(name, closure, true);
        }
        _ => {}
      }
    }
    Ok(())
  }

  pub(super) fn eval_stmt_list(&mut self, env: &Rc<Env>, stmts: &[Node<Stmt>]) -> Result<Completion> {
    let mut last = None;
    for stmt in stmts {
      match self.eval_stmt(env, stmt)? {
        Completion::Normal(value) => {
          if value.is_some() {
            last = value;
          };
        }
        abrupt => return Ok(abrupt.update_empty(last)),
      }
    }
    Ok(Completion::Normal(last))
  }

  fn eval_block(&mut self, env: &Rc<Env>, stmts: &[Node<Stmt>]) -> Result<Completion> {
    let block = Env::block(env);
    self.declare_block(&block, stmts)?;
    self.eval_stmt_list(&block, stmts)
  }

  fn eval_stmt(&mut self, env: &Rc<Env>, stmt: &Node<Stmt>) -> Result<Completion> {
    self.eval_stmt_labelled(env, stmt, &[])
  }

  // `labels` holds the labels directly attached to this statement, which loops accept for `continue`.
  fn eval_stmt_labelled(
    &mut self,
    env: &Rc<Env>,
    stmt: &Node<Stmt>,
    labels: &[String],
  ) -> Result<Completion> {
    self.tick()?;
    match stmt.stx.as_ref() {
      Stmt::Empty(_) | Stmt::FunctionDecl(_) => Ok(Completion::empty()),
      Stmt::Expr(stmt) => Ok(Completion::normal(self.eval_expr(env, &stmt.stx.expr)?)),
      Stmt::VarDecl(decl) => {
        self.eval_var_decl(env, &decl.stx)?;
        Ok(Completion::empty())
      }
      Stmt::Block(block) => self.eval_block(env, &block.stx.body),
      Stmt::If(stmt) => {
        let test = self.eval_expr(env, &stmt.stx.test)?;
        let completion = if conv::to_boolean(&test) {
          self.eval_stmt(env, &stmt.stx.consequent)?
        } else if let Some(alternate) = &stmt.stx.alternate {
          self.eval_stmt(env, alternate)?
        } else {
          Completion::empty()
        };
        Ok(completion.update_empty(Some(Value::Undefined)))
      }
      Stmt::Throw(stmt) => Err(ScopedEvalError::Throw(self.eval_expr(env, &stmt.stx.value)?)),
      Stmt::Try(stmt) => self.eval_try(env, &stmt.stx),
      Stmt::Return(stmt) => {
        let value = match &stmt.stx.value {
          Some(value) => self.eval_expr(env, value)?,
          None => Value::Undefined,
        };
        Ok(Completion::Return(value))
      }
      Stmt::Break(stmt) => Ok(Completion::Break(stmt.stx.label.clone(), None)),
      Stmt::Continue(stmt) => Ok(Completion::Continue(stmt.stx.label.clone(), None)),
      Stmt::Label(stmt) => {
        let name = &stmt.stx.name;
        let mut inner = labels.to_vec();
        inner.push(name.clone());
        Ok(match self.eval_stmt_labelled(env, &stmt.stx.statement, &inner)? {
          Completion::Break(Some(target), value) if &target == name => Completion::Normal(value),
          other => other,
        })
      }
      Stmt::Switch(stmt) => self.eval_switch(env, &stmt.stx),
      Stmt::While(stmt) => {
        let mut value = None;
        loop {
          let test = self.eval_expr(env, &stmt.stx.condition)?;
          if !conv::to_boolean(&test) {
            break;
          };
          match loop_control(self.eval_stmt(env, &stmt.stx.body)?, labels, &mut value) {
            LoopControl::Next => {}
            LoopControl::Exit => break,
            LoopControl::Propagate(completion) => return Ok(completion),
          };
        }
        Ok(Completion::Normal(value))
      }
      Stmt::DoWhile(stmt) => {
        let mut value = None;
        loop {
          match loop_control(self.eval_stmt(env, &stmt.stx.body)?, labels, &mut value) {
            LoopControl::Next => {}
            LoopControl::Exit => break,
            LoopControl::Propagate(completion) => return Ok(completion),
          };
          let test = self.eval_expr(env, &stmt.stx.condition)?;
          if !conv::to_boolean(&test) {
            break;
          };
        }
        Ok(Completion::Normal(value))
      }
      Stmt::ForTriple(stmt) => {
        let f = &stmt.stx;
        let loop_env = Env::block(env);
        let mut per_iteration = Vec::new();
        match &f.init {
          ForTripleStmtInit::None => {}
          ForTripleStmtInit::Expr(expr) => {
            self.eval_expr(&loop_env, expr)?;
          }
          ForTripleStmtInit::Decl(decl) => {
            if decl.stx.mode != VarDeclMode::Var {
              let mutable = decl.stx.mode == VarDeclMode::Let;
              for name in decl_names(&decl.stx) {
                loop_env.declare_lexical(&name, mutable);
                if mutable {
                  per_iteration.push(name);
                };
              }
            };
            self.eval_var_decl(&loop_env, &decl.stx)?;
          }
        };
        let body = &f.body.stx.body;
        let mut iter_env = copy_iteration_env(&loop_env, env, &per_iteration);
        let mut value = None;
        loop {
          // Charged separately so that `for (;;) {}` still consumes steps.
          self.tick()?;
          if let Some(cond) = &f.cond {
            let test = self.eval_expr(&iter_env, cond)?;
            if !conv::to_boolean(&test) {
              break;
            };
          };
          let body_env = Env::block(&iter_env);
          self.declare_block(&body_env, body)?;
          match loop_control(self.eval_stmt_list(&body_env, body)?, labels, &mut value) {
            LoopControl::Next => {}
            LoopControl::Exit => break,
            LoopControl::Propagate(completion) => return Ok(completion),
          };
          iter_env = copy_iteration_env(&iter_env, env, &per_iteration);
          if let Some(post) = &f.post {
            self.eval_expr(&iter_env, post)?;
          };
        }
        Ok(Completion::Normal(value))
      }
      Stmt::ForIn(stmt) => {
        let rhs = self.eval_expr(env, &stmt.stx.rhs)?;
        let keys = self
          .for_in_keys(&rhs)
          .into_iter()
          .map(Value::from)
          .collect();
        self.eval_for_each(env, &stmt.stx.lhs, keys, &stmt.stx.body.stx.body, labels)
      }
      Stmt::ForOf(stmt) => {
        let rhs = self.eval_expr(env, &stmt.stx.rhs)?;
        let values = self.iterate(&rhs)?;
        self.eval_for_each(env, &stmt.stx.lhs, values, &stmt.stx.body.stx.body, labels)
      }
    }
  }

  fn eval_for_each(
    &mut self,
    env: &Rc<Env>,
    lhs: &ForInOfLhs,
    items: Vec<Value>,
    body: &[Node<Stmt>],
    labels: &[String],
  ) -> Result<Completion> {
    let mut value = None;
    for item in items {
      self.tick()?;
      let iter_env = Env::block(env);
      match lhs {
        ForInOfLhs::Decl(decl) => {
          let Some(declarator) = decl.stx.declarators.first() else {
            return Err(ScopedEvalError::Unsupported("for-in/of declaration without binding"));
          };
          let mode = match decl.stx.mode {
            VarDeclMode::Var => BindMode::Assign,
            VarDeclMode::Let => BindMode::Declare { mutable: true },
            VarDeclMode::Const => BindMode::Declare { mutable: false },
          };
          self.bind_pattern(&iter_env, &declarator.pattern.stx.pat, item, mode)?;
        }
        ForInOfLhs::Assign(target) => self.assign_to_target(&iter_env, target, item)?,
      };
      let body_env = Env::block(&iter_env);
      self.declare_block(&body_env, body)?;
      match loop_control(self.eval_stmt_list(&body_env, body)?, labels, &mut value) {
        LoopControl::Next => {}
        LoopControl::Exit => break,
        LoopControl::Propagate(completion) => return Ok(completion),
      };
    }
    Ok(Completion::Normal(value))
  }

  fn eval_switch(&mut self, env: &Rc<Env>, stmt: &SwitchStmt) -> Result<Completion> {
    let discriminant = self.eval_expr(env, &stmt.test)?;
    let block = Env::block(env);
    for branch in &stmt.branches {
      self.declare_block(&block, &branch.stx.body)?;
    }
    let mut start = None;
    for (i, branch) in stmt.branches.iter().enumerate() {
      if let Some(case) = &branch.stx.case {
        let candidate = self.eval_expr(&block, case)?;
        if conv::strict_equals(&discriminant, &candidate) {
          start = Some(i);
          break;
        };
      };
    }
    let start = start.or_else(|| stmt.branches.iter().position(|b| b.stx.case.is_none()));
    let mut value = None;
    if let Some(start) = start {
      // Falls through every following branch until a break.
      for branch in &stmt.branches[start..] {
        match self.eval_stmt_list(&block, &branch.stx.body)? {
          Completion::Normal(v) => {
            if v.is_some() {
              value = v;
            };
          }
          Completion::Break(None, v) => return Ok(Completion::Normal(v.or(value))),
          other => return Ok(other.update_empty(value)),
        }
      }
    };
    Ok(Completion::Normal(value))
  }

  fn eval_catch(&mut self, env: &Rc<Env>, catch: &CatchBlock, thrown: Value) -> Result<Completion> {
    let catch_env = Env::block(env);
    if let Some(param) = &catch.parameter {
      self.bind_pattern(&catch_env, &param.stx.pat, thrown, BindMode::Declare {
        mutable: true,
      })?;
    };
    self.eval_block(&catch_env, &catch.body)
  }

  fn eval_try(&mut self, env: &Rc<Env>, stmt: &TryStmt) -> Result<Completion> {
    let result = self.eval_block(env, &stmt.wrapped.stx.body);
    let result = match (result, &stmt.catch) {
      (Err(ScopedEvalError::Throw(thrown)), Some(catch)) => self.eval_catch(env, &catch.stx, thrown),
      // A rejected scope write reaches the script as a TypeError, and the host as
      // `AssignmentRejected` when nothing catches it.
      (Err(ScopedEvalError::AssignmentRejected(message)), Some(catch)) => {
        let thrown = self.error_value(ErrorKind::TypeError, message);
        self.eval_catch(env, &catch.stx, thrown)
      }
      (other, _) => other,
    };
    let Some(finally) = &stmt.finally else {
      return result;
    };
    // An exhausted step budget and other host errors skip `finally`.
    if !matches!(
      result,
      Ok(_) | Err(ScopedEvalError::Throw(_) | ScopedEvalError::AssignmentRejected(_))
    ) {
      return result;
    };
    let completion = self.eval_block(env, &finally.stx.body)?;
    if completion.is_abrupt() {
      return Ok(completion);
    };
    result
  }

  fn eval_var_decl(&mut self, env: &Rc<Env>, decl: &VarDecl) -> Result<()> {
    for declarator in &decl.declarators {
      let pat = &declarator.pattern.stx.pat;
      let value = match &declarator.initializer {
        Some(init) => Some(self.eval_named(env, init, binding_name(pat))?),
        None => None,
      };
      match (decl.mode, value) {
        (VarDeclMode::Var, None) => {}
        (VarDeclMode::Var, Some(value)) => self.bind_pattern(env, pat, value, BindMode::Assign)?,
        (_, value) => {
          self.bind_pattern(env, pat, value.unwrap_or_default(), BindMode::Initialize)?
        }
      };
    }
    Ok(())
  }

  fn bind_name(&mut self, env: &Rc<Env>, name: &str, value: Value, mode: BindMode) -> Result<()> {
    match mode {
      BindMode::Declare { mutable } => env.declare(name, value, mutable),
      BindMode::Initialize if env.has_own(name) => env.initialize(name, value),
      BindMode::Initialize => env.declare(name, value, true),
      BindMode::Assign => self.assign_identifier(env, name, value)?,
    };
    Ok(())
  }

  fn bind_pattern(
    &mut self,
    env: &Rc<Env>,
    pat: &Node<Pat>,
    value: Value,
    mode: BindMode,
  ) -> Result<()> {
    match pat.stx.as_ref() {
      Pat::Id(id) => self.bind_name(env, &id.stx.name, value, mode),
      Pat::Arr(arr) => self.bind_arr_pat(env, &arr.stx, value, mode),
      Pat::Obj(obj) => self.bind_obj_pat(env, &obj.stx, value, mode),
      Pat::Member(expr) => self.assign_member_target(env, expr, value),
    }
  }

  fn bind_arr_pat(&mut self, env: &Rc<Env>, pat: &ArrPat, value: Value, mode: BindMode) -> Result<()> {
    let values = self.iterate(&value)?;
    for (i, elem) in pat.elements.iter().enumerate() {
      let Some(elem) = elem else {
        continue;
      };
      let mut v = values.get(i).cloned().unwrap_or_default();
      if let (Some(default), true) = (&elem.default_value, v.is_undefined()) {
        v = self.eval_named(env, default, binding_name(&elem.target))?;
      };
      self.bind_pattern(env, &elem.target, v, mode)?;
    }
    if let Some(rest) = &pat.rest {
      let remaining = Value::array(values.into_iter().skip(pat.elements.len()));
      self.bind_pattern(env, rest, remaining, mode)?;
    };
    Ok(())
  }

  fn bind_obj_pat(&mut self, env: &Rc<Env>, pat: &ObjPat, value: Value, mode: BindMode) -> Result<()> {
    if value.is_nullish() {
      return Err(self.type_error(format!(
        "Cannot destructure '{}' as it is {}.",
        conv::to_string(&value),
        conv::to_string(&value)
      )));
    };
    let mut used = HashSet::new();
    for prop in &pat.properties {
      let key = self.eval_obj_key(env, &prop.stx.key)?;
      let mut v = self.get(&value, &key)?;
      if let (Some(default), true) = (&prop.stx.default_value, v.is_undefined()) {
        v = self.eval_named(env, default, binding_name(&prop.stx.target))?;
      };
      self.bind_pattern(env, &prop.stx.target, v, mode)?;
      used.insert(key);
    }
    if let Some(rest) = &pat.rest {
      let remaining = Value::object(
        self
          .own_entries(&value)
          .into_iter()
          .filter(|(k, _)| !used.contains(k)),
      );
      self.bind_pattern(env, rest, remaining, mode)?;
    };
    Ok(())
  }

  fn assign_identifier(&mut self, env: &Rc<Env>, name: &str, value: Value) -> Result<()> {
    match env.assign(name, value.clone()) {
      Assign::Done => Ok(()),
      Assign::Const => Err(self.type_error("Assignment to constant variable.")),
      Assign::Uninitialized => Err(self.reference_error(format!(
        "Cannot access '{name}' before initialization"
      ))),
      // Only allowed globals stay unrewritten, and the read-only value properties ignore writes.
      Assign::Missing => {
        if !matches!(name, "undefined" | "NaN" | "Infinity") {
          self.realm.define_global(name, value);
        };
        Ok(())
      }
    }
  }

  fn lookup_identifier(&self, env: &Rc<Env>, name: &str) -> Result<Value> {
    match env.lookup(name) {
      Lookup::Found(value) => Ok(value),
      Lookup::Uninitialized => Err(self.reference_error(format!(
        "Cannot access '{name}' before initialization"
      ))),
      Lookup::Missing => self
        .realm
        .globals
        .get(name)
        .cloned()
        .ok_or_else(|| self.reference_error(format!("{name} is not defined"))),
    }
  }

  /// Writes to a destructuring or `for-in`/`for-of` target.
  fn assign_to_target(&mut self, env: &Rc<Env>, target: &Node<Expr>, value: Value) -> Result<()> {
    match target.stx.as_ref() {
      Expr::IdPat(id) => self.assign_identifier(env, &id.stx.name, value),
      Expr::Id(id) => self.assign_identifier(env, &id.stx.name, value),
      Expr::ArrPat(pat) => self.bind_arr_pat(env, &pat.stx, value, BindMode::Assign),
      Expr::ObjPat(pat) => self.bind_obj_pat(env, &pat.stx, value, BindMode::Assign),
      Expr::Member(_) | Expr::ComputedMember(_) => self.assign_member_target(env, target, value),
      _ => Err(ScopedEvalError::Unsupported("assignment target")),
    }
  }

  fn assign_member_target(&mut self, env: &Rc<Env>, target: &Node<Expr>, value: Value) -> Result<()> {
    let (object, key) = match target.stx.as_ref() {
      Expr::Member(m) => (self.eval_expr(env, &m.stx.left)?, m.stx.right.clone()),
      Expr::ComputedMember(m) => {
        let object = self.eval_expr(env, &m.stx.object)?;
        let key = self.eval_expr(env, &m.stx.member)?;
        (object, property_key(&key))
      }
      _ => return Err(ScopedEvalError::Unsupported("assignment target")),
    };
    self.set(&object, &key, value)
  }

  fn eval_obj_key(&mut self, env: &Rc<Env>, key: &ObjKey) -> Result<String> {
    match key {
      ObjKey::Direct(key) => Ok(key.stx.key.clone()),
      ObjKey::Computed(expr) => {
        let value = self.eval_expr(env, expr)?;
        Ok(property_key(&value))
      }
    }
  }

  // Anonymous functions take the name of the binding or property they are assigned to.
  fn eval_named(&mut self, env: &Rc<Env>, expr: &Node<Expr>, name: &str) -> Result<Value> {
    match expr.stx.as_ref() {
      Expr::ArrowFunc(f) => {
        self.tick()?;
        self.make_closure(env, &f.stx.func, name)
      }
      Expr::Func(f) if f.stx.name.is_none() => {
        self.tick()?;
        self.make_closure(env, &f.stx.func, name)
      }
      _ => self.eval_expr(env, expr),
    }
  }

  fn eval_args(&mut self, env: &Rc<Env>, args: &[Node<CallArg>]) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
      let value = self.eval_expr(env, &arg.stx.value)?;
      if arg.stx.spread {
        values.extend(self.iterate(&value)?);
      } else {
        values.push(value);
      };
    }
    Ok(values)
  }

  /// Evaluates a member or call chain, returning the value and the `this` for a call on it.
  /// None means an optional link short-circuited the whole chain.
  fn eval_chain(&mut self, env: &Rc<Env>, expr: &Node<Expr>) -> Result<Option<(Value, Value)>> {
    match expr.stx.as_ref() {
      Expr::Member(m) => {
        self.tick()?;
        let Some((object, _)) = self.eval_chain(env, &m.stx.left)? else {
          return Ok(None);
        };
        if m.stx.optional_chaining && object.is_nullish() {
          return Ok(None);
        };
        let value = self.get(&object, &m.stx.right)?;
        Ok(Some((value, object)))
      }
      Expr::ComputedMember(m) => {
        self.tick()?;
        let Some((object, _)) = self.eval_chain(env, &m.stx.object)? else {
          return Ok(None);
        };
        if m.stx.optional_chaining && object.is_nullish() {
          return Ok(None);
        };
        let key = self.eval_expr(env, &m.stx.member)?;
        let value = self.get(&object, &property_key(&key))?;
        Ok(Some((value, object)))
      }
      Expr::Call(c) => {
        self.tick()?;
        let Some((callee, this)) = self.eval_chain(env, &c.stx.callee)? else {
          return Ok(None);
        };
        if c.stx.optional_chaining && callee.is_nullish() {
          return Ok(None);
        };
        let args = self.eval_args(env, &c.stx.arguments)?;
        if !callee.is_callable() {
          return Err(self.type_error(format!(
            "{} is not a function",
            describe_expr(&c.stx.callee)
          )));
        };
        let value = self.call(&callee, this, &args)?;
        Ok(Some((value, Value::Undefined)))
      }
      _ => Ok(Some((self.eval_expr(env, expr)?, Value::Undefined))),
    }
  }

  pub(super) fn eval_expr(&mut self, env: &Rc<Env>, expr: &Node<Expr>) -> Result<Value> {
    if let Expr::Member(_) | Expr::ComputedMember(_) | Expr::Call(_) = expr.stx.as_ref() {
      return Ok(self.eval_chain(env, expr)?.map(|(v, _)| v).unwrap_or_default());
    };
    self.tick()?;
    match expr.stx.as_ref() {
      Expr::LitNum(n) => Ok(Value::Number(n.stx.value.0)),
      Expr::LitStr(s) => Ok(Value::from(s.stx.value.as_str())),
      Expr::LitBool(b) => Ok(Value::Bool(b.stx.value)),
      Expr::LitNull(_) => Ok(Value::Null),
      Expr::LitTemplate(t) => {
        let mut out = String::new();
        for part in &t.stx.parts {
          match part {
            LitTemplatePart::String(s) => out.push_str(s),
            LitTemplatePart::Substitution(expr) => {
              let value = self.eval_expr(env, expr)?;
              out.push_str(&conv::to_string(&value));
            }
          };
        }
        Ok(Value::from(out))
      }
      Expr::LitRegex(r) => regexp::create(self, &r.stx.pattern, &r.stx.flags),
      Expr::LitArr(arr) => {
        let mut elements = Vec::with_capacity(arr.stx.elements.len());
        for element in &arr.stx.elements {
          match element {
            LitArrElem::Single(expr) => elements.push(self.eval_expr(env, expr)?),
            LitArrElem::Rest(expr) => {
              let value = self.eval_expr(env, expr)?;
              elements.extend(self.iterate(&value)?);
            }
            LitArrElem::Empty => elements.push(Value::Undefined),
          };
        }
        Ok(Value::array(elements))
      }
      Expr::LitObj(obj) => self.eval_obj_lit(env, &obj.stx),
      Expr::Id(id) => self.lookup_identifier(env, &id.stx.name),
      Expr::This(_) => Ok(env.this()),
      Expr::ArrowFunc(f) => self.make_closure(env, &f.stx.func, ""),
      Expr::Func(f) => match &f.stx.name {
        // The name is visible inside the function only, and cannot be reassigned.
        Some(name) => {
          let name_env = Env::block(env);
          let closure = self.make_closure(&name_env, &f.stx.func, &name.stx.name)?;
          name_env.declare(&name.stx.name, closure.clone(), false);
          Ok(closure)
        }
        None => self.make_closure(env, &f.stx.func, ""),
      },
      Expr::Binary(b) => self.eval_binary(env, &b.stx),
      Expr::Cond(c) => {
        let test = self.eval_expr(env, &c.stx.test)?;
        if conv::to_boolean(&test) {
          self.eval_expr(env, &c.stx.consequent)
        } else {
          self.eval_expr(env, &c.stx.alternate)
        }
      }
      Expr::Unary(u) => self.eval_unary(env, u.stx.operator, &u.stx.argument),
      Expr::UnaryPostfix(u) => match u.stx.operator {
        OperatorName::PostfixIncrement => self.eval_update(env, &u.stx.argument, 1.0, false),
        OperatorName::PostfixDecrement => self.eval_update(env, &u.stx.argument, -1.0, false),
        _ => Err(ScopedEvalError::Unsupported("postfix operator")),
      },
      Expr::New(n) => {
        let callee = self.eval_expr(env, &n.stx.callee)?;
        let args = self.eval_args(env, &n.stx.arguments)?;
        self.construct(&callee, &args)
      }
      Expr::Import(_) => Err(ScopedEvalError::Unsupported("dynamic import")),
      Expr::IdPat(_) | Expr::ArrPat(_) | Expr::ObjPat(_) => {
        Err(ScopedEvalError::Unsupported("pattern outside of an assignment"))
      }
      Expr::Member(_) | Expr::ComputedMember(_) | Expr::Call(_) => {
        Ok(self.eval_chain(env, expr)?.map(|(v, _)| v).unwrap_or_default())
      }
    }
  }

  fn eval_obj_lit(&mut self, env: &Rc<Env>, lit: &LitObjExpr) -> Result<Value> {
    let obj = Obj::new(ObjectKind::Ordinary, None);
    for member in &lit.members {
      match &member.stx.typ {
        ObjMemberType::Valued { key, val } => {
          let key = self.eval_obj_key(env, key)?;
          let value = self.eval_named(env, val, &key)?;
          obj.set_own(&key, value);
        }
        ObjMemberType::Method { key, func } => {
          let key = self.eval_obj_key(env, key)?;
          let value = self.make_closure(env, func, &key)?;
          obj.set_own(&key, value);
        }
        ObjMemberType::Shorthand { id } => {
          let value = self.lookup_identifier(env, &id.stx.name)?;
          obj.set_own(&id.stx.name, value);
        }
        ObjMemberType::Rest { val } => {
          let value = self.eval_expr(env, val)?;
          for (key, value) in self.own_entries(&value) {
            obj.set_own(&key, value);
          }
        }
      };
    }
    Ok(Value::Object(obj))
  }

  fn eval_binary(&mut self, env: &Rc<Env>, expr: &BinaryExpr) -> Result<Value> {
    let op = expr.operator;
    if op.is_assignment() {
      return self.eval_assignment(env, op, &expr.left, &expr.right);
    };
    match op {
      OperatorName::LogicalAnd | OperatorName::LogicalOr | OperatorName::NullishCoalescing => {
        let left = self.eval_expr(env, &expr.left)?;
        let done = match op {
          OperatorName::LogicalAnd => !conv::to_boolean(&left),
          OperatorName::LogicalOr => conv::to_boolean(&left),
          _ => !left.is_nullish(),
        };
        return if done {
          Ok(left)
        } else {
          self.eval_expr(env, &expr.right)
        };
      }
      _ => {}
    };
    let left = self.eval_expr(env, &expr.left)?;
    let right = self.eval_expr(env, &expr.right)?;
    match op {
      OperatorName::In => Ok(Value::Bool(self.has_property(&right, &property_key(&left))?)),
      OperatorName::Instanceof => Ok(Value::Bool(self.instance_of(&left, &right)?)),
      _ => operator::binary(op, &left, &right).ok_or(ScopedEvalError::Unsupported("binary operator")),
    }
  }

  fn eval_assignment(
    &mut self,
    env: &Rc<Env>,
    op: OperatorName,
    left: &Node<Expr>,
    right: &Node<Expr>,
  ) -> Result<Value> {
    let op = AssignmentOperator::try_from(op)
      .map_err(|_| ScopedEvalError::Unsupported("assignment operator"))?;
    let name = match left.stx.as_ref() {
      Expr::IdPat(id) => Some(&id.stx.name),
      Expr::Id(id) => Some(&id.stx.name),
      _ => None,
    };
    if let Some(name) = name {
      if op == AssignmentOperator::Assign {
        let value = self.eval_named(env, right, name)?;
        self.assign_identifier(env, name, value.clone())?;
        return Ok(value);
      };
      let current = self.lookup_identifier(env, name)?;
      if op.short_circuits(&current) {
        return Ok(current);
      };
      let value = self.eval_named(env, right, name)?;
      let next = op.apply(&current, value).unwrap_or_default();
      self.assign_identifier(env, name, next.clone())?;
      return Ok(next);
    };
    match left.stx.as_ref() {
      Expr::ArrPat(_) | Expr::ObjPat(_) => {
        let value = self.eval_expr(env, right)?;
        self.assign_to_target(env, left, value.clone())?;
        Ok(value)
      }
      Expr::Member(m) => {
        let object = self.eval_expr(env, &m.stx.left)?;
        self.assign_member(env, &object, &m.stx.right, op, right)
      }
      Expr::ComputedMember(m) => {
        let object = self.eval_expr(env, &m.stx.object)?;
        let key = self.eval_expr(env, &m.stx.member)?;
        self.assign_member(env, &object, &property_key(&key), op, right)
      }
      _ => Err(ScopedEvalError::Unsupported("assignment target")),
    }
  }

  fn assign_member(
    &mut self,
    env: &Rc<Env>,
    object: &Value,
    key: &str,
    op: AssignmentOperator,
    right: &Node<Expr>,
  ) -> Result<Value> {
    if object.is_nullish() {
      return Err(self.type_error(format!(
        "Cannot set properties of {} (setting '{key}')",
        conv::to_string(object)
      )));
    };
    // The current value is read through the chain (prototypes included) before the right side runs.
    if let Some(scope) = object.as_object().and_then(Obj::as_scope) {
      if op == AssignmentOperator::Assign {
        let value = self.eval_expr(env, right)?;
        return scope.set(key, value);
      };
      let current = scope.get(key);
      if op.short_circuits(&current) {
        return Ok(current);
      };
      let value = self.eval_expr(env, right)?;
      let next = op.apply(&current, value).unwrap_or_default();
      return scope.set(key, next);
    };
    let current = match op {
      AssignmentOperator::Assign => Value::Undefined,
      _ => self.get(object, key)?,
    };
    if op.short_circuits(&current) {
      return Ok(current);
    };
    let value = self.eval_expr(env, right)?;
    let next = op.apply(&current, value).unwrap_or_default();
    self.set(object, key, next.clone())?;
    Ok(next)
  }

  fn eval_unary(&mut self, env: &Rc<Env>, op: OperatorName, argument: &Node<Expr>) -> Result<Value> {
    match op {
      OperatorName::Typeof => {
        // An undeclared name is not an error under `typeof`.
        if let Expr::Id(id) = argument.stx.as_ref() {
          let name = &id.stx.name;
          if matches!(env.lookup(name), Lookup::Missing) && !self.realm.globals.contains_key(name) {
            return Ok(Value::from("undefined"));
          };
        };
        let value = self.eval_expr(env, argument)?;
        Ok(Value::from(value.type_of()))
      }
      OperatorName::Void => {
        self.eval_expr(env, argument)?;
        Ok(Value::Undefined)
      }
      OperatorName::Delete => self.eval_delete(env, argument),
      OperatorName::LogicalNot => {
        let value = self.eval_expr(env, argument)?;
        Ok(Value::Bool(!conv::to_boolean(&value)))
      }
      OperatorName::BitwiseNot => {
        let value = self.eval_expr(env, argument)?;
        Ok(Value::from(!conv::to_int32(&value)))
      }
      OperatorName::UnaryPlus => {
        let value = self.eval_expr(env, argument)?;
        Ok(Value::Number(conv::to_number(&value)))
      }
      OperatorName::UnaryNegation => {
        let value = self.eval_expr(env, argument)?;
        Ok(Value::Number(-conv::to_number(&value)))
      }
      OperatorName::PrefixIncrement => self.eval_update(env, argument, 1.0, true),
      OperatorName::PrefixDecrement => self.eval_update(env, argument, -1.0, true),
      _ => Err(ScopedEvalError::Unsupported("unary operator")),
    }
  }

  fn eval_delete(&mut self, env: &Rc<Env>, argument: &Node<Expr>) -> Result<Value> {
    let (object, key) = match argument.stx.as_ref() {
      Expr::Member(m) => (self.eval_expr(env, &m.stx.left)?, m.stx.right.clone()),
      Expr::ComputedMember(m) => {
        let object = self.eval_expr(env, &m.stx.object)?;
        let key = self.eval_expr(env, &m.stx.member)?;
        (object, property_key(&key))
      }
      _ => {
        self.eval_expr(env, argument)?;
        return Ok(Value::Bool(true));
      }
    };
    match &object {
      Value::Undefined | Value::Null => Err(self.type_error(format!(
        "Cannot convert undefined or null to object (deleting '{key}')"
      ))),
      // Scope bindings are never removed through the scope.
      Value::Object(o) if o.as_scope().is_some() => Ok(Value::Bool(false)),
      Value::Object(o) => Ok(Value::Bool(o.borrow_mut().delete(&key))),
      _ => Ok(Value::Bool(true)),
    }
  }

  fn eval_update(&mut self, env: &Rc<Env>, target: &Node<Expr>, delta: f64, prefix: bool) -> Result<Value> {
    let (old, new) = match target.stx.as_ref() {
      Expr::Id(id) => {
        let old = conv::to_number(&self.lookup_identifier(env, &id.stx.name)?);
        self.assign_identifier(env, &id.stx.name, Value::Number(old + delta))?;
        (old, old + delta)
      }
      Expr::Member(_) | Expr::ComputedMember(_) => {
        let (object, key) = match target.stx.as_ref() {
          Expr::Member(m) => (self.eval_expr(env, &m.stx.left)?, m.stx.right.clone()),
          Expr::ComputedMember(m) => {
            let object = self.eval_expr(env, &m.stx.object)?;
            let key = self.eval_expr(env, &m.stx.member)?;
            (object, property_key(&key))
          }
          _ => return Err(ScopedEvalError::Unsupported("update target")),
        };
        let old = conv::to_number(&self.get(&object, &key)?);
        self.set(&object, &key, Value::Number(old + delta))?;
        (old, old + delta)
      }
      _ => return Err(ScopedEvalError::Unsupported("update target")),
    };
    Ok(Value::Number(if prefix { new } else { old }))
  }
}

// A fresh environment for the next iteration, carrying over the loop's `let` bindings.
fn copy_iteration_env(from: &Rc<Env>, parent: &Rc<Env>, names: &[String]) -> Rc<Env> {
  if names.is_empty() {
    return from.clone();
  };
  let next = Env::block(parent);
  for name in names {
    let value = match from.lookup(name) {
      Lookup::Found(value) => value,
      _ => Value::Undefined,
    };
    next.declare(name, value, true);
  }
  next
}

#[cfg(test)]
mod tests {
  use super::prepare;
  use crate::error::ScopedEvalError;
  use crate::runtime::scope::Scope;
  use crate::runtime::value::Value;
  use crate::runtime::vm::Runtime;
  use scoped_parse::parse;
  use serde_json::json;

  fn run_with(code: &str, binding: serde_json::Value) -> Result<Value, ScopedEvalError> {
    let mut program = parse(code).unwrap();
    prepare(&mut program);
    let scope = Scope::new(Value::from(binding)).unwrap();
    Runtime::new(Some(100_000)).run(&program, "s", scope)
  }

  fn run(code: &str) -> serde_json::Value {
    run_with(code, json!({})).unwrap().to_json()
  }

  #[test]
  fn test_control_flow() {
    assert_eq!(
      run("let out = []; for (let i = 0; i < 5; i++) { if (i == 3) continue; out.push(i); } return out;"),
      json!([0, 1, 2, 4])
    );
    assert_eq!(
      run("let n = 0; outer: for (const a of [1, 2, 3]) { for (const b of [1, 2]) { if (a == 2) continue outer; if (a == 3) break outer; n += a * b; } } return n;"),
      json!(3)
    );
    assert_eq!(
      run("let r; switch (2) { case 1: r = 'one'; case 2: r = 'two'; case 3: r += '!'; break; default: r = 'none'; } return r;"),
      json!("two!")
    );
    assert_eq!(run("let i = 0; do { i++; } while (i < 3); return i;"), json!(3));
    assert_eq!(run("var k = []; for (var p in {a: 1, b: 2}) k.push(p); return k;"), json!(["a", "b"]));
  }

  #[test]
  fn test_closures_capture_per_iteration_bindings() {
    assert_eq!(
      run("const fs = []; for (let i = 0; i < 3; i++) fs.push(() => i); return fs.map(f => f());"),
      json!([0, 1, 2])
    );
    assert_eq!(
      run("function counter() { let c = 0; return { inc() { return ++c; } }; } const c = counter(); c.inc(); return c.inc();"),
      json!(2)
    );
    assert_eq!(run("return hoisted(); function hoisted() { return 'ok'; }"), json!("ok"));
    assert_eq!(run("const fact = function f(n) { return n <= 1 ? 1 : n * f(n - 1); }; return fact(5);"), json!(120));
  }

  #[test]
  fn test_exceptions() {
    assert_eq!(
      run("try { null.x; } catch (e) { return [e instanceof TypeError, e.message]; }"),
      json!([true, "Cannot read properties of null (reading 'x')"])
    );
    assert_eq!(run("let log = []; try { throw 1; } catch { log.push('c'); } finally { log.push('f'); } return log;"), json!(["c", "f"]));
    assert_eq!(run("function f() { try { return 1; } finally { return 2; } } return f();"), json!(2));
    let err = run_with("throw new RangeError('bad');", json!({})).unwrap_err();
    assert_eq!(err.to_string(), "Uncaught RangeError: bad");
    let err = run_with("const x = 1; x = 2;", json!({})).unwrap_err();
    assert_eq!(err.to_string(), "Uncaught TypeError: Assignment to constant variable.");
    let err = run_with("x; let x = 1;", json!({})).unwrap_err();
    assert_eq!(err.to_string(), "Uncaught ReferenceError: Cannot access 'x' before initialization");
  }

  #[test]
  fn test_destructuring_and_spread() {
    assert_eq!(
      run("const { a, b: [c, d = 4], ...rest } = { a: 1, b: [3], e: 5, f: 6 }; return [a, c, d, rest];"),
      json!([1, 3, 4, {"e": 5, "f": 6}])
    );
    assert_eq!(run("let x, y; [x, y] = [1, 2]; [x, y] = [y, x]; return [x, y];"), json!([2, 1]));
    assert_eq!(run("function f(a, ...r) { return r.length + arguments.length; } return f(...[1, 2, 3]);"), json!(5));
    assert_eq!(run("return { ...{ a: 1 }, b: 2, ['c' + 1]: 3 };"), json!({"a": 1, "b": 2, "c1": 3}));
  }

  #[test]
  fn test_scope_object_access() {
    let value = run_with("s.total += s.items.length; s.flag ??= 'set'; return s.total;", json!({"total": 1, "items": [1, 2], "flag": null}));
    assert_eq!(value.unwrap(), Value::from(3));
    let err = run_with("s.missing = 1;", json!({})).unwrap_err();
    assert!(matches!(err, ScopedEvalError::AssignmentRejected(_)));
    let caught = run_with("try { s.missing = 1; } catch (e) { return [e instanceof TypeError, e.message]; }", json!({}));
    assert_eq!(caught.unwrap().to_json(), json!([true, "Cannot assign to missing: it is not defined in any scope"]));
    let finished = run_with("const log = []; try { try { s.missing = 1; } finally { log.push('f'); } } catch { return log; }", json!({}));
    assert_eq!(finished.unwrap().to_json(), json!(["f"]));
    let err = run_with("try { s.missing = 1; } finally { s.total = 2; }", json!({"total": 1})).unwrap_err();
    assert!(matches!(err, ScopedEvalError::AssignmentRejected(_)));
    assert_eq!(run_with("return typeof s.nope + ('total' in s);", json!({"total": 1})).unwrap(), Value::from("undefinedtrue"));
  }

  #[test]
  fn test_optional_chaining_and_this() {
    assert_eq!(run("const o = null; return [o?.a.b, o?.f(), ({ n: 2, g() { return this.n; } }).g()];"), json!([null, null, 2]));
    assert_eq!(run("return this === s;"), json!(true));
  }

  #[test]
  fn test_step_limit() {
    let mut program = parse("while (true) {}").unwrap();
    prepare(&mut program);
    let scope = Scope::new(Value::object::<&str>([])).unwrap();
    let err = Runtime::new(Some(1_000)).run(&program, "s", scope).unwrap_err();
    assert!(matches!(err, ScopedEvalError::StepLimitExceeded(1_000)));
  }
}
