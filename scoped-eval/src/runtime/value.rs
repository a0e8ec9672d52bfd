use super::conv;
use super::env::Env;
use super::vm::Runtime;
use super::scope::Scope;
use crate::error::Result;
use indexmap::IndexMap;
use regex::Regex;
use scoped_parse::ast::func::Func;
use scoped_parse::ast::node::Node;
use std::cell::Ref;
use std::cell::RefCell;
use std::cell::RefMut;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::rc::Rc;
use std::sync::Arc;

/// Signature of functions implemented in Rust: runtime, `this`, arguments.
pub type NativeFn = dyn Fn(&mut Runtime, Value, &[Value]) -> Result<Value>;

/// A script value. Cloning is cheap: strings and objects are reference counted.
#[derive(Clone, Default)]
pub enum Value {
  #[default]
  Undefined,
  Null,
  Bool(bool),
  Number(f64),
  String(Rc<str>),
  Object(Obj),
}

/// A shared, mutable object. Equality is identity.
#[derive(Clone)]
pub struct Obj(Rc<RefCell<ObjectData>>);

pub struct ObjectData {
  pub kind: ObjectKind,
  pub properties: IndexMap<String, Value>,
  // None means the intrinsic prototype for the object's kind, resolved by the runtime.
  pub proto: Option<Obj>,
  pub frozen: bool,
}

pub enum ObjectKind {
  Ordinary,
  Array(Vec<Value>),
  Closure(Closure),
  Native(NativeFunction),
  RegExp(RegExpData),
  Date(f64),
  Error,
  Scope(Scope),
}

pub struct Closure {
  pub name: Rc<str>,
  pub func: Arc<Node<Func>>,
  pub env: Rc<Env>,
}

pub struct NativeFunction {
  pub name: Rc<str>,
  pub call: Rc<NativeFn>,
  // Behaviour under `new`; functions without one are not constructors.
  pub construct: Option<Rc<NativeFn>>,
}

pub struct RegExpData {
  pub source: Rc<str>,
  pub flags: Rc<str>,
  pub regex: Regex,
  pub last_index: usize,
}

impl RegExpData {
  pub fn global(&self) -> bool {
    self.flags.contains('g')
  }
}

/// Parses a canonical array index: digits without leading zeros.
pub fn array_index(key: &str) -> Option<usize> {
  if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
    return None;
  };
  if !key.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  };
  key.parse::<u32>().ok().filter(|&i| i != u32::MAX).map(|i| i as usize)
}

impl ObjectData {
  pub fn new(kind: ObjectKind, proto: Option<Obj>) -> ObjectData {
    ObjectData {
      kind,
      properties: IndexMap::new(),
      proto,
      frozen: false,
    }
  }

  pub fn get_own(&self, key: &str) -> Option<Value> {
    match &self.kind {
      ObjectKind::Array(elements) => {
        if key == "length" {
          return Some(Value::Number(elements.len() as f64));
        };
        if let Some(i) = array_index(key) {
          return elements.get(i).cloned();
        };
      }
      ObjectKind::Closure(c) => {
        if key == "name" && !self.properties.contains_key(key) {
          return Some(Value::String(c.name.clone()));
        };
        if key == "length" {
          let count = c.func.stx.parameters.iter().filter(|p| !p.stx.rest).count();
          return Some(Value::Number(count as f64));
        };
      }
      ObjectKind::Native(n) => {
        if key == "name" && !self.properties.contains_key(key) {
          return Some(Value::String(n.name.clone()));
        };
      }
      ObjectKind::RegExp(r) => match key {
        "source" => return Some(Value::String(r.source.clone())),
        "flags" => return Some(Value::String(r.flags.clone())),
        "global" => return Some(Value::Bool(r.global())),
        "lastIndex" => return Some(Value::Number(r.last_index as f64)),
        _ => {}
      },
      _ => {}
    };
    self.properties.get(key).cloned()
  }

  pub fn has_own(&self, key: &str) -> bool {
    match &self.kind {
      ObjectKind::Array(elements) => {
        if key == "length" {
          return true;
        };
        if let Some(i) = array_index(key) {
          return i < elements.len();
        };
      }
      ObjectKind::Closure(_) | ObjectKind::Native(_) if key == "name" => return true,
      ObjectKind::Closure(_) if key == "length" => return true,
      ObjectKind::RegExp(_) if matches!(key, "source" | "flags" | "global" | "lastIndex") => {
        return true
      }
      _ => {}
    };
    self.properties.contains_key(key)
  }

  /// Writes an own property. Writes to frozen objects are ignored, as in sloppy mode.
  pub fn set_own(&mut self, key: &str, value: Value) {
    if self.frozen {
      return;
    };
    match &mut self.kind {
      ObjectKind::Array(elements) => {
        if key == "length" {
          let len = conv::to_number(&value);
          if len >= 0.0 && len.fract() == 0.0 && len < u32::MAX as f64 {
            elements.resize(len as usize, Value::Undefined);
          };
          return;
        };
        if let Some(i) = array_index(key) {
          if i >= elements.len() {
            elements.resize(i + 1, Value::Undefined);
          };
          elements[i] = value;
          return;
        };
      }
      ObjectKind::RegExp(r) if key == "lastIndex" => {
        let n = conv::to_number(&value);
        r.last_index = if n.is_finite() && n > 0.0 { n as usize } else { 0 };
        return;
      }
      _ => {}
    };
    self.properties.insert(key.to_string(), value);
  }

  pub fn delete(&mut self, key: &str) -> bool {
    if self.frozen {
      return false;
    };
    if let ObjectKind::Array(elements) = &mut self.kind {
      if let Some(i) = array_index(key) {
        if i < elements.len() {
          elements[i] = Value::Undefined;
        };
        return true;
      };
    };
    self.properties.shift_remove(key);
    true
  }

  /// Enumerable own keys in property order, array indices first.
  pub fn own_keys(&self) -> Vec<String> {
    let mut keys = Vec::new();
    if let ObjectKind::Array(elements) = &self.kind {
      keys.extend((0..elements.len()).map(|i| i.to_string()));
    };
    keys.extend(self.properties.keys().cloned());
    keys
  }
}

impl Obj {
  pub fn new(kind: ObjectKind, proto: Option<Obj>) -> Obj {
    Obj(Rc::new(RefCell::new(ObjectData::new(kind, proto))))
  }

  pub fn from_data(data: ObjectData) -> Obj {
    Obj(Rc::new(RefCell::new(data)))
  }

  pub fn borrow(&self) -> Ref<'_, ObjectData> {
    self.0.borrow()
  }

  pub fn borrow_mut(&self) -> RefMut<'_, ObjectData> {
    self.0.borrow_mut()
  }

  pub fn ptr_eq(&self, other: &Obj) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }

  pub fn is_callable(&self) -> bool {
    matches!(
      self.borrow().kind,
      ObjectKind::Closure(_) | ObjectKind::Native(_)
    )
  }

  pub fn is_array(&self) -> bool {
    matches!(self.borrow().kind, ObjectKind::Array(_))
  }

  pub fn as_scope(&self) -> Option<Scope> {
    match &self.borrow().kind {
      ObjectKind::Scope(s) => Some(s.clone()),
      _ => None,
    }
  }

  /// A copy of the elements if this is an array.
  pub fn array_elements(&self) -> Option<Vec<Value>> {
    match &self.borrow().kind {
      ObjectKind::Array(elements) => Some(elements.clone()),
      _ => None,
    }
  }

  pub fn get_own(&self, key: &str) -> Option<Value> {
    self.borrow().get_own(key)
  }

  pub fn set_own(&self, key: &str, value: Value) {
    self.borrow_mut().set_own(key, value)
  }

  /// Looks up `key` on this object and its explicitly assigned prototypes. Intrinsic prototypes
  /// are not consulted; use the runtime for full property access.
  pub fn get_with_protos(&self, key: &str) -> Option<Value> {
    let mut current = self.clone();
    loop {
      if let Some(value) = current.get_own(key) {
        return Some(value);
      };
      let next = current.borrow().proto.clone();
      current = next?;
    }
  }
}

// Scope objects are created on demand, so two objects wrapping the same scope are equal.
impl PartialEq for Obj {
  fn eq(&self, other: &Self) -> bool {
    if self.ptr_eq(other) {
      return true;
    };
    match (self.as_scope(), other.as_scope()) {
      (Some(a), Some(b)) => a.ptr_eq(&b),
      _ => false,
    }
  }
}

impl Value {
  pub fn string(s: impl AsRef<str>) -> Value {
    Value::String(Rc::from(s.as_ref()))
  }

  /// An ordinary object with the given properties, in order.
  pub fn object<K: Into<String>>(properties: impl IntoIterator<Item = (K, Value)>) -> Value {
    let mut data = ObjectData::new(ObjectKind::Ordinary, None);
    data.properties = properties.into_iter().map(|(k, v)| (k.into(), v)).collect();
    Value::Object(Obj::from_data(data))
  }

  pub fn array(elements: impl IntoIterator<Item = Value>) -> Value {
    Value::Object(Obj::new(
      ObjectKind::Array(elements.into_iter().collect()),
      None,
    ))
  }

  /// A function implemented in Rust, callable from scripts.
  pub fn native(
    name: &str,
    f: impl Fn(&mut Runtime, Value, &[Value]) -> Result<Value> + 'static,
  ) -> Value {
    Value::Object(Obj::new(
      ObjectKind::Native(NativeFunction {
        name: Rc::from(name),
        call: Rc::new(f),
        construct: None,
      }),
      None,
    ))
  }

  pub fn is_undefined(&self) -> bool {
    matches!(self, Value::Undefined)
  }

  pub fn is_nullish(&self) -> bool {
    matches!(self, Value::Undefined | Value::Null)
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_number(&self) -> Option<f64> {
    match self {
      Value::Number(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_object(&self) -> Option<&Obj> {
    match self {
      Value::Object(o) => Some(o),
      _ => None,
    }
  }

  pub fn is_callable(&self) -> bool {
    self.as_object().is_some_and(Obj::is_callable)
  }

  /// Own property of an object value; primitives have none.
  pub fn get_own(&self, key: &str) -> Option<Value> {
    self.as_object().and_then(|o| o.get_own(key))
  }

  /// The `typeof` string.
  pub fn type_of(&self) -> &'static str {
    match self {
      Value::Undefined => "undefined",
      Value::Null => "object",
      Value::Bool(_) => "boolean",
      Value::Number(_) => "number",
      Value::String(_) => "string",
      Value::Object(o) if o.is_callable() => "function",
      Value::Object(_) => "object",
    }
  }

  /// Human readable rendering for error messages, e.g. `TypeError: x is not a function`.
  pub fn describe(&self) -> String {
    if let Value::Object(o) = self {
      if matches!(o.borrow().kind, ObjectKind::Error) {
        let name = o
          .get_with_protos("name")
          .map(|n| conv::to_string(&n).to_string())
          .unwrap_or_else(|| "Error".to_string());
        let message = o
          .get_with_protos("message")
          .map(|m| conv::to_string(&m).to_string())
          .unwrap_or_default();
        return if message.is_empty() {
          name
        } else {
          format!("{name}: {message}")
        };
      };
    };
    conv::to_string(self).to_string()
  }

  /// Converts to JSON for the host. `undefined` and functions become null.
  pub fn to_json(&self) -> serde_json::Value {
    conv::to_json(self, &mut Vec::new()).unwrap_or(serde_json::Value::Null)
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Value::Bool(value)
  }
}

impl From<f64> for Value {
  fn from(value: f64) -> Self {
    Value::Number(value)
  }
}

impl From<i32> for Value {
  fn from(value: i32) -> Self {
    Value::Number(value as f64)
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::string(value)
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Value::String(Rc::from(value))
  }
}

impl From<Obj> for Value {
  fn from(value: Obj) -> Self {
    Value::Object(value)
  }
}

impl From<Scope> for Value {
  fn from(value: Scope) -> Self {
    value.into_value()
  }
}

impl From<serde_json::Value> for Value {
  fn from(value: serde_json::Value) -> Self {
    match value {
      serde_json::Value::Null => Value::Null,
      serde_json::Value::Bool(b) => Value::Bool(b),
      // Numbers past the f64 range keep their text and read back as an infinity.
      serde_json::Value::Number(n) => Value::Number(
        n.as_f64()
          .or_else(|| n.to_string().parse().ok())
          .unwrap_or(f64::NAN),
      ),
      serde_json::Value::String(s) => Value::from(s),
      serde_json::Value::Array(a) => Value::array(a.into_iter().map(Value::from)),
      serde_json::Value::Object(o) => Value::object(o.into_iter().map(|(k, v)| (k, Value::from(v)))),
    }
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
      (Value::String(a), Value::String(b)) => a == b,
      (Value::Object(a), Value::Object(b)) => a == b,
      _ => false,
    }
  }
}

impl Debug for Value {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Value::Undefined => write!(f, "undefined"),
      Value::Null => write!(f, "null"),
      Value::Bool(b) => write!(f, "{b}"),
      Value::Number(n) => write!(f, "{}", conv::number_to_string(*n)),
      Value::String(s) => write!(f, "{s:?}"),
      Value::Object(o) => {
        if matches!(o.borrow().kind, ObjectKind::Error) {
          return write!(f, "[{}]", self.describe());
        };
        let data = o.borrow();
        match &data.kind {
          ObjectKind::Array(elements) => f.debug_list().entries(elements.iter()).finish(),
          ObjectKind::Ordinary => f.debug_map().entries(data.properties.iter()).finish(),
          ObjectKind::Closure(c) => write!(f, "[Function: {}]", c.name),
          ObjectKind::Native(n) => write!(f, "[Function: {}]", n.name),
          ObjectKind::RegExp(r) => write!(f, "/{}/{}", r.source, r.flags),
          ObjectKind::Date(t) => write!(f, "[Date: {t}]"),
          ObjectKind::Error => write!(f, "[Error]"),
          ObjectKind::Scope(_) => write!(f, "[Scope]"),
        }
      }
    }
  }
}
