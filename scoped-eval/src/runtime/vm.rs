use super::conv;
use super::env::Env;
use super::exec::Completion;
use super::realm::ErrorKind;
use super::realm::Realm;
use super::scope::Scope;
use super::value::array_index;
use super::value::NativeFn;
use super::value::Obj;
use super::value::ObjectKind;
use super::value::Value;
use crate::error::Result;
use crate::error::ScopedEvalError;
use ahash::HashSet;
use ahash::HashSetExt;
use scoped_parse::ast::func::Func;
use scoped_parse::ast::node::Node;
use scoped_parse::ast::stx::TopLevel;
use std::rc::Rc;
use std::sync::Arc;

/// Nested calls beyond this depth throw a RangeError instead of exhausting the native stack.
pub const MAX_CALL_DEPTH: usize = 64;

// Bounds prototype walks in case a host builds a cycle.
const MAX_PROTOTYPE_DEPTH: usize = 1000;

/// Executes prepared programs. Owns the realm, so state written to built-ins persists across runs
/// of the same runtime.
pub struct Runtime {
  pub(super) realm: Realm,
  step_limit: Option<u64>,
  steps: u64,
  depth: usize,
}

enum Callee {
  Closure(Arc<Node<Func>>, Rc<Env>),
  Native(Rc<NativeFn>),
}

impl Runtime {
  pub fn new(step_limit: Option<u64>) -> Runtime {
    Runtime {
      realm: Realm::new(),
      step_limit,
      steps: 0,
      depth: 0,
    }
  }

  pub fn realm(&self) -> &Realm {
    &self.realm
  }

  pub fn realm_mut(&mut self) -> &mut Realm {
    &mut self.realm
  }

  pub fn define_global(&mut self, name: &str, value: Value) {
    self.realm.define_global(name, value);
  }

  /// Runs a program with `param` bound to the scope, which is also the top-level `this`.
  pub fn run(&mut self, program: &Node<TopLevel>, param: &str, scope: Scope) -> Result<Value> {
    self.steps = 0;
    self.depth = 0;
    let scope = scope.into_value();
    let env = Env::function(None, Some(scope.clone()));
    env.declare(param, scope, false);
    let body = &program.stx.body;
    self.hoist_var_decls(&env, body);
    self.declare_block(&env, body)?;
    match self.eval_stmt_list(&env, body)? {
      Completion::Return(value) => Ok(value),
      _ => Ok(Value::Undefined),
    }
  }

  /// Charges one step. Every statement and expression costs one.
  pub(super) fn tick(&mut self) -> Result<()> {
    self.steps += 1;
    match self.step_limit {
      Some(limit) if self.steps > limit => Err(ScopedEvalError::StepLimitExceeded(limit)),
      _ => Ok(()),
    }
  }

  pub fn error_value(&self, kind: ErrorKind, message: impl AsRef<str>) -> Value {
    let proto = self.realm.intrinsics.error_prototype(kind).clone();
    let error = Obj::new(ObjectKind::Error, Some(proto));
    error.set_own("message", Value::string(message));
    Value::Object(error)
  }

  /// A catchable script exception.
  pub fn throw(&self, kind: ErrorKind, message: impl AsRef<str>) -> ScopedEvalError {
    ScopedEvalError::Throw(self.error_value(kind, message))
  }

  pub fn type_error(&self, message: impl AsRef<str>) -> ScopedEvalError {
    self.throw(ErrorKind::TypeError, message)
  }

  pub fn reference_error(&self, message: impl AsRef<str>) -> ScopedEvalError {
    self.throw(ErrorKind::ReferenceError, message)
  }

  pub fn range_error(&self, message: impl AsRef<str>) -> ScopedEvalError {
    self.throw(ErrorKind::RangeError, message)
  }

  pub fn prototype_of(&self, obj: &Obj) -> Option<Obj> {
    self.realm.prototype_of(obj)
  }

  /// Finds a property on an object or anything it inherits from.
  pub fn lookup(&self, obj: &Obj, key: &str) -> Option<Value> {
    let mut current = obj.clone();
    for _ in 0..MAX_PROTOTYPE_DEPTH {
      if let Some(value) = current.get_own(key) {
        return Some(value);
      };
      current = self.prototype_of(&current)?;
    }
    None
  }

  /// `target[key]`, including primitives and scope objects.
  pub fn get(&mut self, target: &Value, key: &str) -> Result<Value> {
    let i = &self.realm.intrinsics;
    let holder = match target {
      Value::Undefined | Value::Null => {
        return Err(self.type_error(format!(
          "Cannot read properties of {} (reading '{key}')",
          conv::to_string(target)
        )))
      }
      Value::String(s) => {
        if key == "length" {
          return Ok(Value::Number(s.encode_utf16().count() as f64));
        };
        if let Some(index) = array_index(key) {
          return Ok(
            s.encode_utf16()
              .nth(index)
              .map(|unit| Value::from(String::from_utf16_lossy(&[unit])))
              .unwrap_or_default(),
          );
        };
        i.string_prototype.clone()
      }
      Value::Number(_) => i.number_prototype.clone(),
      Value::Bool(_) => i.boolean_prototype.clone(),
      Value::Object(o) => {
        if let Some(scope) = o.as_scope() {
          return Ok(scope.get(key));
        };
        o.clone()
      }
    };
    Ok(self.lookup(&holder, key).unwrap_or_default())
  }

  /// `target[key] = value`. Writes to primitives are ignored, as in sloppy mode.
  pub fn set(&mut self, target: &Value, key: &str, value: Value) -> Result<()> {
    match target {
      Value::Undefined | Value::Null => Err(self.type_error(format!(
        "Cannot set properties of {} (setting '{key}')",
        conv::to_string(target)
      ))),
      Value::Object(o) => {
        match o.as_scope() {
          Some(scope) => {
            scope.set(key, value)?;
          }
          None => o.set_own(key, value),
        };
        Ok(())
      }
      _ => Ok(()),
    }
  }

  /// The `in` operator.
  pub fn has_property(&mut self, target: &Value, key: &str) -> Result<bool> {
    let Value::Object(o) = target else {
      return Err(self.type_error(format!(
        "Cannot use 'in' operator to search for '{key}' in {}",
        conv::to_string(target)
      )));
    };
    if let Some(scope) = o.as_scope() {
      return Ok(scope.has(key));
    };
    let mut current = Some(o.clone());
    while let Some(obj) = current {
      if obj.borrow().has_own(key) {
        return Ok(true);
      };
      current = self.prototype_of(&obj);
    }
    Ok(false)
  }

  /// Own enumerable entries in property order. Strings enumerate their code units.
  pub fn own_entries(&self, value: &Value) -> Vec<(String, Value)> {
    match value {
      Value::String(s) => s
        .encode_utf16()
        .enumerate()
        .map(|(i, unit)| (i.to_string(), Value::from(String::from_utf16_lossy(&[unit]))))
        .collect(),
      Value::Object(o) => {
        if let Some(scope) = o.as_scope() {
          return scope_keys(&scope)
            .into_iter()
            .map(|k| {
              let v = scope.get(&k);
              (k, v)
            })
            .collect();
        };
        let data = o.borrow();
        data
          .own_keys()
          .into_iter()
          .filter_map(|k| data.get_own(&k).map(|v| (k, v)))
          .collect()
      }
      _ => Vec::new(),
    }
  }

  /// Keys visited by `for-in`: own keys, then keys of explicitly assigned prototypes.
  pub fn for_in_keys(&self, value: &Value) -> Vec<String> {
    match value {
      Value::String(s) => (0..s.encode_utf16().count()).map(|i| i.to_string()).collect(),
      Value::Object(o) => {
        if let Some(scope) = o.as_scope() {
          return scope_keys(&scope);
        };
        let mut keys = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(o.clone());
        while let Some(obj) = current {
          for key in obj.borrow().own_keys() {
            if seen.insert(key.clone()) {
              keys.push(key);
            };
          }
          current = obj.borrow().proto.clone();
        }
        keys
      }
      _ => Vec::new(),
    }
  }

  /// The values produced by iterating `value` with `for-of` or spread.
  pub fn iterate(&mut self, value: &Value) -> Result<Vec<Value>> {
    match value {
      Value::String(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
      Value::Object(o) => match o.array_elements() {
        Some(elements) => Ok(elements),
        None => Err(self.type_error(format!("{} is not iterable", value.type_of()))),
      },
      _ => Err(self.type_error(format!("{} is not iterable", conv::to_string(value)))),
    }
  }

  pub fn call(&mut self, f: &Value, this: Value, args: &[Value]) -> Result<Value> {
    let callee = match f.as_object().map(|o| o.borrow()) {
      Some(data) => match &data.kind {
        ObjectKind::Closure(c) => Some(Callee::Closure(c.func.clone(), c.env.clone())),
        ObjectKind::Native(n) => Some(Callee::Native(n.call.clone())),
        _ => None,
      },
      None => None,
    };
    let Some(callee) = callee else {
      return Err(self.type_error(format!("{} is not a function", describe(f))));
    };
    if self.depth >= MAX_CALL_DEPTH {
      return Err(self.range_error("Maximum call stack size exceeded"));
    };
    self.depth += 1;
    let result = match callee {
      Callee::Native(native) => native(self, this, args),
      Callee::Closure(func, env) => self.call_closure(&func, env, this, args),
    };
    self.depth -= 1;
    result
  }

  /// `new f(...args)`.
  pub fn construct(&mut self, f: &Value, args: &[Value]) -> Result<Value> {
    enum Target {
      Native(Rc<NativeFn>),
      Closure,
    }
    let target = match f.as_object().map(|o| o.borrow()) {
      Some(data) => match &data.kind {
        ObjectKind::Native(n) => n.construct.clone().map(Target::Native),
        ObjectKind::Closure(c) if !c.func.stx.arrow => Some(Target::Closure),
        _ => None,
      },
      None => None,
    };
    match target {
      Some(Target::Native(construct)) => {
        if self.depth >= MAX_CALL_DEPTH {
          return Err(self.range_error("Maximum call stack size exceeded"));
        };
        self.depth += 1;
        let result = construct(self, Value::Undefined, args);
        self.depth -= 1;
        result
      }
      Some(Target::Closure) => {
        let proto = self.constructor_prototype(f)?;
        let instance = Value::Object(Obj::new(ObjectKind::Ordinary, Some(proto)));
        let result = self.call(f, instance.clone(), args)?;
        Ok(match result {
          Value::Object(_) => result,
          _ => instance,
        })
      }
      None => Err(self.type_error(format!("{} is not a constructor", describe(f)))),
    }
  }

  // The `prototype` object of a script function, created on first use.
  fn constructor_prototype(&mut self, f: &Value) -> Result<Obj> {
    if let Value::Object(proto) = self.get(f, "prototype")? {
      return Ok(proto);
    };
    let proto = Obj::new(ObjectKind::Ordinary, None);
    proto.set_own("constructor", f.clone());
    if let Value::Object(o) = f {
      o.set_own("prototype", Value::Object(proto.clone()));
    };
    Ok(proto)
  }

  /// `value instanceof ctor`.
  pub fn instance_of(&mut self, value: &Value, ctor: &Value) -> Result<bool> {
    if !ctor.is_callable() {
      return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
    };
    let Value::Object(obj) = value else {
      return Ok(false);
    };
    let Value::Object(proto) = self.get(ctor, "prototype")? else {
      return Ok(false);
    };
    let mut current = self.prototype_of(obj);
    while let Some(p) = current {
      if p.ptr_eq(&proto) {
        return Ok(true);
      };
      current = self.prototype_of(&p);
    }
    Ok(false)
  }
}

fn scope_keys(scope: &Scope) -> Vec<String> {
  let mut keys = Vec::new();
  if let Some(binding) = scope.binding().as_object() {
    keys.extend(binding.borrow().own_keys());
  };
  if let Some(context) = scope.context() {
    for key in context.borrow().own_keys() {
      if !keys.contains(&key) {
        keys.push(key);
      };
    }
  };
  keys
}

// Short rendering of a value for error messages.
fn describe(value: &Value) -> String {
  match value {
    Value::String(s) => format!("\"{s}\""),
    Value::Object(o) if o.is_callable() => value
      .get_own("name")
      .map(|n| conv::to_string(&n).to_string())
      .filter(|n| !n.is_empty())
      .unwrap_or_else(|| "function".to_string()),
    Value::Object(o) if o.is_array() => "array".to_string(),
    Value::Object(_) => "object".to_string(),
    _ => conv::to_string(value).to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_primitive_property_access() {
    let mut rt = Runtime::new(None);
    let s = Value::from("h\u{e9}llo");
    assert_eq!(rt.get(&s, "length").unwrap(), Value::from(5));
    assert_eq!(rt.get(&s, "1").unwrap(), Value::from("\u{e9}"));
    assert!(rt.get(&s, "toUpperCase").unwrap().is_callable());
    assert!(rt.get(&Value::from(1), "toFixed").unwrap().is_callable());
    assert!(matches!(
      rt.get(&Value::Null, "x"),
      Err(ScopedEvalError::Throw(_))
    ));
  }

  #[test]
  fn test_call_native_and_errors() {
    let mut rt = Runtime::new(None);
    let double = Value::native("double", |_, _, args| {
      Ok(Value::Number(conv::to_number(&args[0]) * 2.0))
    });
    assert_eq!(
      rt.call(&double, Value::Undefined, &[Value::from(21)]).unwrap(),
      Value::from(42)
    );
    let err = rt.call(&Value::from(1), Value::Undefined, &[]).unwrap_err();
    assert_eq!(err.to_string(), "Uncaught TypeError: 1 is not a function");
    let err = rt.construct(&double, &[]).unwrap_err();
    assert_eq!(err.to_string(), "Uncaught TypeError: double is not a constructor");
  }

  #[test]
  fn test_instance_of_intrinsics() {
    let mut rt = Runtime::new(None);
    let array_ctor = rt.realm().globals["Array"].clone();
    let arr = Value::array([Value::from(1)]);
    assert!(rt.instance_of(&arr, &array_ctor).unwrap());
    let object_ctor = rt.realm().globals["Object"].clone();
    assert!(rt.instance_of(&arr, &object_ctor).unwrap());
    let err = rt.error_value(ErrorKind::RangeError, "x");
    let error_ctor = rt.realm().globals["Error"].clone();
    assert!(rt.instance_of(&err, &error_ctor).unwrap());
    assert_eq!(err.describe(), "RangeError: x");
  }
}
