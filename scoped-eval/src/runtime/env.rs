use super::value::Value;
use ahash::HashMap;
use ahash::HashMapExt;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Debug)]
struct Binding {
  value: Value,
  mutable: bool,
  // False between entering a block and evaluating the `let`/`const` declaration.
  initialized: bool,
}

pub enum Lookup {
  Found(Value),
  Uninitialized,
  Missing,
}

pub enum Assign {
  Done,
  Const,
  Uninitialized,
  Missing,
}

/// A lexical environment record. Function environments also carry `this`; arrow and block
/// environments inherit it from their parent.
pub struct Env {
  bindings: RefCell<HashMap<String, Binding>>,
  parent: Option<Rc<Env>>,
  this: Option<Value>,
}

impl Env {
  pub fn block(parent: &Rc<Env>) -> Rc<Env> {
    Rc::new(Env {
      bindings: RefCell::new(HashMap::new()),
      parent: Some(parent.clone()),
      this: None,
    })
  }

  pub fn function(parent: Option<Rc<Env>>, this: Option<Value>) -> Rc<Env> {
    Rc::new(Env {
      bindings: RefCell::new(HashMap::new()),
      parent,
      this,
    })
  }

  pub fn parent(&self) -> Option<&Rc<Env>> {
    self.parent.as_ref()
  }

  pub fn has_own(&self, name: &str) -> bool {
    self.bindings.borrow().contains_key(name)
  }

  /// Declares a `var`, leaving an existing binding of the same name untouched.
  pub fn declare_var(&self, name: &str) {
    self
      .bindings
      .borrow_mut()
      .entry(name.to_string())
      .or_insert(Binding {
        value: Value::Undefined,
        mutable: true,
        initialized: true,
      });
  }

  /// Declares a `let`/`const` binding in its temporal dead zone.
  pub fn declare_lexical(&self, name: &str, mutable: bool) {
    self.bindings.borrow_mut().insert(name.to_string(), Binding {
      value: Value::Undefined,
      mutable,
      initialized: false,
    });
  }

  /// Declares or overwrites an initialized binding: parameters, functions and catch parameters.
  pub fn declare(&self, name: &str, value: Value, mutable: bool) {
    self.bindings.borrow_mut().insert(name.to_string(), Binding {
      value,
      mutable,
      initialized: true,
    });
  }

  /// Ends the temporal dead zone of an own binding.
  pub fn initialize(&self, name: &str, value: Value) {
    if let Some(binding) = self.bindings.borrow_mut().get_mut(name) {
      binding.value = value;
      binding.initialized = true;
    };
  }

  pub fn lookup(&self, name: &str) -> Lookup {
    let mut env = self;
    loop {
      if let Some(binding) = env.bindings.borrow().get(name) {
        return if binding.initialized {
          Lookup::Found(binding.value.clone())
        } else {
          Lookup::Uninitialized
        };
      };
      match &env.parent {
        Some(parent) => env = parent,
        None => return Lookup::Missing,
      };
    }
  }

  pub fn assign(&self, name: &str, value: Value) -> Assign {
    let mut env = self;
    loop {
      if let Some(binding) = env.bindings.borrow_mut().get_mut(name) {
        if !binding.initialized {
          return Assign::Uninitialized;
        };
        if !binding.mutable {
          return Assign::Const;
        };
        binding.value = value;
        return Assign::Done;
      };
      match &env.parent {
        Some(parent) => env = parent,
        None => return Assign::Missing,
      };
    }
  }

  pub fn this(&self) -> Value {
    let mut env = self;
    loop {
      if let Some(this) = &env.this {
        return this.clone();
      };
      match &env.parent {
        Some(parent) => env = parent,
        None => return Value::Undefined,
      };
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_shadowing_and_tdz() {
    let root = Env::function(None, Some(Value::Null));
    root.declare_var("a");
    root.declare("b", Value::from(1), true);
    let inner = Env::block(&root);
    inner.declare_lexical("b", false);
    assert!(matches!(inner.lookup("b"), Lookup::Uninitialized));
    inner.initialize("b", Value::from(2));
    assert!(matches!(inner.lookup("b"), Lookup::Found(Value::Number(n)) if n == 2.0));
    assert!(matches!(inner.assign("b", Value::from(3)), Assign::Const));
    assert!(matches!(inner.assign("a", Value::from(4)), Assign::Done));
    assert!(matches!(root.lookup("a"), Lookup::Found(Value::Number(n)) if n == 4.0));
    assert!(matches!(inner.lookup("zzz"), Lookup::Missing));
    assert_eq!(inner.this(), Value::Null);
  }
}
