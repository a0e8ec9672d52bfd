//! The runtime scope chain that rewritten code reads and writes free variables through.
//!
//! Lookup order is: reserved names (`$this`, `$parent`, `$parents`, `$context`), then the context
//! overlay, then the binding object and its prototype chain, then the parent scope. Writes go to
//! whichever scope owns the name as an own property; what happens when no scope owns it is set by
//! [`UnresolvedWrite`].

use super::operator::AssignmentOperator;
use super::value::Obj;
use super::value::ObjectKind;
use super::value::Value;
use crate::error::Result;
use crate::error::ScopedEvalError;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::rc::Rc;

pub const RESERVED_NAMES: [&str; 4] = ["$this", "$parent", "$parents", "$context"];

/// What a write does when no scope in the chain owns the name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum UnresolvedWrite {
  /// Create an own property on the innermost scope whose binding is an object.
  Create,
  /// Fail with [`ScopedEvalError::AssignmentRejected`].
  #[default]
  Reject,
}

/// Whether a scope may wrap a non-object binding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum PrimitiveBinding {
  /// The binding is kept and reported by `$this`, but has no properties.
  #[default]
  Allow,
  Reject,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct ScopeOptions {
  pub unresolved_write: UnresolvedWrite,
  pub primitive_binding: PrimitiveBinding,
}

struct ScopeData {
  binding: Value,
  parent: Option<Scope>,
  context: Option<Obj>,
  options: ScopeOptions,
}

/// A node in the scope chain. Cloning shares the node.
#[derive(Clone)]
pub struct Scope(Rc<ScopeData>);

/// Argument of a compiled program: an existing scope, or a binding to wrap in a new root scope.
pub enum ScopeArg {
  Scope(Scope),
  Binding(Value),
}

impl From<Scope> for ScopeArg {
  fn from(value: Scope) -> Self {
    ScopeArg::Scope(value)
  }
}

impl From<Value> for ScopeArg {
  fn from(value: Value) -> Self {
    match value.as_object().and_then(Obj::as_scope) {
      Some(scope) => ScopeArg::Scope(scope),
      None => ScopeArg::Binding(value),
    }
  }
}

impl From<serde_json::Value> for ScopeArg {
  fn from(value: serde_json::Value) -> Self {
    ScopeArg::Binding(Value::from(value))
  }
}

// Property lookup through explicit prototypes only.
fn lookup_property(obj: &Obj, name: &str) -> Option<Value> {
  if let Some(scope) = obj.as_scope() {
    return scope.has(name).then(|| scope.get(name));
  };
  obj.get_with_protos(name)
}

fn rejected(message: String) -> ScopedEvalError {
  ScopedEvalError::AssignmentRejected(message)
}

impl Scope {
  pub fn new(binding: impl Into<Value>) -> Result<Scope> {
    Scope::with_options(binding, None, None, ScopeOptions::default())
  }

  /// A scope whose lookups fall back to `parent`. The parent's options are inherited.
  pub fn with_parent(binding: impl Into<Value>, parent: &Scope) -> Result<Scope> {
    parent.child(binding, None)
  }

  pub fn with_context(
    binding: impl Into<Value>,
    parent: Option<&Scope>,
    context: Value,
  ) -> Result<Scope> {
    let options = parent.map(Scope::options).unwrap_or_default();
    Scope::with_options(binding, parent, Some(context), options)
  }

  /// The context, if given, must be an object; nullish means none.
  pub fn with_options(
    binding: impl Into<Value>,
    parent: Option<&Scope>,
    context: Option<Value>,
    options: ScopeOptions,
  ) -> Result<Scope> {
    let binding = binding.into();
    if options.primitive_binding == PrimitiveBinding::Reject && binding.as_object().is_none() {
      return Err(ScopedEvalError::Unsupported(
        "scope bindings must be objects or functions",
      ));
    };
    let context = match context {
      None | Some(Value::Undefined | Value::Null) => None,
      Some(Value::Object(o)) => Some(o),
      Some(_) => return Err(ScopedEvalError::Unsupported("scope context must be an object")),
    };
    Ok(Scope(Rc::new(ScopeData {
      binding,
      parent: parent.cloned(),
      context,
      options,
    })))
  }

  /// A nested scope with this one as parent and the same options.
  pub fn child(&self, binding: impl Into<Value>, context: Option<Value>) -> Result<Scope> {
    Scope::with_options(binding, Some(self), context, self.options())
  }

  pub fn binding(&self) -> &Value {
    &self.0.binding
  }

  pub fn parent(&self) -> Option<&Scope> {
    self.0.parent.as_ref()
  }

  pub fn context(&self) -> Option<&Obj> {
    self.0.context.as_ref()
  }

  pub fn options(&self) -> ScopeOptions {
    self.0.options
  }

  pub fn ptr_eq(&self, other: &Scope) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }

  /// Parents from nearest to furthest.
  pub fn ancestors(&self) -> Vec<Scope> {
    let mut out = Vec::new();
    let mut current = self.parent();
    while let Some(scope) = current {
      out.push(scope.clone());
      current = scope.parent();
    }
    out
  }

  pub fn into_value(self) -> Value {
    Value::Object(Obj::new(ObjectKind::Scope(self), None))
  }

  fn reserved(&self, name: &str) -> Option<Value> {
    Some(match name {
      "$this" => self.0.binding.clone(),
      "$parent" => self.parent().cloned().map(Scope::into_value).unwrap_or_default(),
      "$parents" => Value::array(self.ancestors().into_iter().map(Scope::into_value)),
      "$context" => self.context().cloned().map(Value::Object).unwrap_or_default(),
      _ => return None,
    })
  }

  // The value of `name` in this scope alone, ignoring reserved names and parents.
  fn local(&self, name: &str) -> Option<Value> {
    if let Some(value) = self.context().and_then(|c| c.get_own(name)) {
      return Some(value);
    };
    self
      .0
      .binding
      .as_object()
      .and_then(|binding| lookup_property(binding, name))
  }

  pub fn get(&self, name: &str) -> Value {
    if let Some(value) = self.reserved(name) {
      return value;
    };
    let mut scope = self;
    loop {
      if let Some(value) = scope.local(name) {
        return value;
      };
      match scope.parent() {
        Some(parent) => scope = parent,
        None => return Value::Undefined,
      };
    }
  }

  pub fn has(&self, name: &str) -> bool {
    match name {
      "$this" | "$parents" => return true,
      "$parent" => return self.parent().is_some(),
      "$context" => return self.context().is_some(),
      _ => {}
    };
    let mut scope = self;
    loop {
      if scope.local(name).is_some() {
        return true;
      };
      match scope.parent() {
        Some(parent) => scope = parent,
        None => return false,
      };
    }
  }

  // The object that owns `name` as an own property: a context overlay or a binding.
  fn owner(&self, name: &str) -> Option<Obj> {
    let mut scope = self;
    loop {
      if let Some(context) = scope.context() {
        if context.borrow().has_own(name) {
          return Some(context.clone());
        };
      };
      if let Some(binding) = scope.0.binding.as_object() {
        if binding.borrow().has_own(name) {
          return Some(binding.clone());
        };
      };
      scope = scope.parent()?;
    }
  }

  /// Plain assignment. Returns the assigned value.
  pub fn set(&self, name: &str, value: Value) -> Result<Value> {
    self.set_with_operator(name, value, AssignmentOperator::Assign)
  }

  /// Applies `op` at the location owning `name`. Returns the resulting value, or the current
  /// value if a logical operator short-circuited.
  pub fn set_with_operator(
    &self,
    name: &str,
    value: Value,
    op: AssignmentOperator,
  ) -> Result<Value> {
    if RESERVED_NAMES.contains(&name) {
      return Err(rejected(format!("Cannot assign to reserved name {name}")));
    };
    if let Some(owner) = self.owner(name) {
      if let Some(inner) = owner.as_scope() {
        return inner.set_with_operator(name, value, op);
      };
      let current = owner.get_own(name).unwrap_or_default();
      return Ok(match op.apply(&current, value) {
        Some(next) => {
          owner.set_own(name, next.clone());
          next
        }
        None => current,
      });
    };
    if self.options().unresolved_write == UnresolvedWrite::Reject {
      return Err(rejected(format!(
        "Cannot assign to {name}: it is not defined in any scope"
      )));
    };
    if name.starts_with('$') {
      return Err(rejected(format!(
        "Cannot create {name}: names starting with $ are reserved"
      )));
    };
    let mut scope = self;
    let target = loop {
      if let Some(binding) = scope.0.binding.as_object() {
        break binding.clone();
      };
      scope = scope.parent().ok_or_else(|| {
        rejected(format!("Cannot create {name}: no scope has an object binding"))
      })?;
    };
    if let Some(inner) = target.as_scope() {
      return inner.set_with_operator(name, value, op);
    };
    let current = Value::Undefined;
    Ok(match op.apply(&current, value) {
      Some(next) => {
        target.set_own(name, next.clone());
        next
      }
      None => current,
    })
  }
}

impl Debug for Scope {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.debug_struct("Scope")
      .field("binding", &self.0.binding)
      .field("context", &self.0.context.as_ref().map(|c| Value::Object(c.clone())))
      .field("parent", &self.0.parent)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn obj(props: &[(&str, Value)]) -> Value {
    Value::object(props.iter().cloned())
  }

  fn get(o: &Value, key: &str) -> Value {
    o.get_own(key).unwrap_or_default()
  }

  #[test]
  fn test_binding() {
    let object = obj(&[("a", Value::from(1)), ("b", Value::Bool(false))]);
    let s = Scope::new(object.clone()).unwrap();
    assert_eq!(s.get("$this"), object);
    assert_eq!(s.get("a"), Value::from(1));
    assert_eq!(s.get("b"), Value::Bool(false));
    assert_eq!(s.get("c"), Value::Undefined);
    assert_eq!(s.get("$parent"), Value::Undefined);
    assert_eq!(s.get("$context"), Value::Undefined);
    assert!(s.has("a"));
    assert!(!s.has("c"));
    assert!(!s.has("$parent"));
  }

  #[test]
  fn test_parent_chain() {
    let parent = Scope::new(obj(&[("a", Value::from(2)), ("c", Value::from(3))])).unwrap();
    let s = Scope::with_parent(obj(&[("a", Value::from(1)), ("b", Value::Bool(false))]), &parent)
      .unwrap();
    assert_eq!(s.get("a"), Value::from(1));
    assert_eq!(s.get("c"), Value::from(3));
    let p = s.get("$parent").as_object().and_then(Obj::as_scope).unwrap();
    assert!(p.ptr_eq(&parent));
    assert_eq!(p.get("a"), Value::from(2));
    assert_eq!(p.get("b"), Value::Undefined);
    assert_eq!(p.get("$parent"), Value::Undefined);
    let parents = s.get("$parents").as_object().and_then(Obj::array_elements).unwrap();
    assert_eq!(parents.len(), 1);
  }

  #[test]
  fn test_context_overlay() {
    let proto = obj(&[("a", Value::from(1))]);
    let object = obj(&[("b", Value::Bool(false))]);
    object.as_object().unwrap().borrow_mut().proto = proto.as_object().cloned();
    let context = obj(&[
      ("$index", Value::from(3)),
      ("$length", Value::from(5)),
      ("b", Value::from("override")),
    ]);
    let s = Scope::with_context(object.clone(), None, context.clone()).unwrap();
    assert_eq!(s.get("$this"), object);
    assert_eq!(s.get("$context"), context);
    assert_eq!(s.get("a"), Value::from(1));
    assert_eq!(s.get("b"), Value::from("override"));
    assert_eq!(get(&object, "b"), Value::Bool(false));
    assert_eq!(s.get("c"), Value::Undefined);
    assert_eq!(s.get("$index"), Value::from(3));
    assert_eq!(s.get("$length"), Value::from(5));
  }

  #[test]
  fn test_set_through_chain() {
    let grand_parent = obj(&[("c", Value::from("c"))]);
    let parent = obj(&[("b", Value::Bool(false))]);
    let object = obj(&[("a", Value::from(1))]);
    let gp = Scope::new(grand_parent.clone()).unwrap();
    let p = gp.child(parent.clone(), None).unwrap();
    let s = p.child(object.clone(), None).unwrap();
    assert_eq!(s.set("a", Value::from(2)).unwrap(), Value::from(2));
    assert_eq!(s.set("b", Value::Bool(true)).unwrap(), Value::Bool(true));
    assert_eq!(s.set("c", Value::from("C")).unwrap(), Value::from("C"));
    for name in ["d", "$this", "$parent", "$foo"] {
      assert!(matches!(
        s.set(name, Value::from(1)),
        Err(ScopedEvalError::AssignmentRejected(_))
      ));
    }
    assert_eq!(get(&grand_parent, "c"), Value::from("C"));
    assert_eq!(get(&parent, "b"), Value::Bool(true));
    assert_eq!(get(&object, "a"), Value::from(2));
    assert_eq!(object.as_object().unwrap().borrow().properties.len(), 1);
  }

  #[test]
  fn test_compound_and_logical() {
    let object = obj(&[("a", Value::Bool(false))]);
    let s = Scope::new(object.clone()).unwrap();
    s.set_with_operator("a", Value::Bool(true), AssignmentOperator::LogicalOr)
      .unwrap();
    assert_eq!(get(&object, "a"), Value::Bool(true));
    s.set_with_operator("a", Value::Bool(false), AssignmentOperator::LogicalAnd)
      .unwrap();
    assert_eq!(get(&object, "a"), Value::Bool(false));

    let object = obj(&[("a", Value::from(1))]);
    let s = Scope::new(object.clone()).unwrap();
    let r = s
      .set_with_operator("a", Value::from(2), AssignmentOperator::NullishCoalescing)
      .unwrap();
    assert_eq!(r, Value::from(1));
    assert_eq!(get(&object, "a"), Value::from(1));
  }

  #[test]
  fn test_unresolved_write_create() {
    let options = ScopeOptions {
      unresolved_write: UnresolvedWrite::Create,
      ..Default::default()
    };
    let root = Scope::with_options(obj(&[]), None, None, options).unwrap();
    let s = root.child(Value::from(7), None).unwrap();
    assert_eq!(s.set("d", Value::from(1)).unwrap(), Value::from(1));
    assert_eq!(get(root.binding(), "d"), Value::from(1));
    assert!(s.set("$foo", Value::from(1)).is_err());

    let lonely = Scope::with_options(Value::Null, None, None, options).unwrap();
    assert!(lonely.set("d", Value::from(1)).is_err());
  }

  #[test]
  fn test_primitive_bindings() {
    for binding in [
      Value::Undefined,
      Value::Null,
      Value::Bool(true),
      Value::Number(f64::NAN),
      Value::from("foo"),
      Value::from(7),
    ] {
      let s = Scope::new(binding.clone()).unwrap();
      assert_eq!(s.get("a"), Value::Undefined);
      assert_eq!(s.get("$this"), binding);
    }
    let options = ScopeOptions {
      primitive_binding: PrimitiveBinding::Reject,
      ..Default::default()
    };
    assert!(Scope::with_options(Value::from(7), None, None, options).is_err());
    assert!(Scope::with_options(obj(&[]), None, None, options).is_ok());
  }
}
