use super::builtins;
use super::value::NativeFn;
use super::value::NativeFunction;
use super::value::Obj;
use super::value::ObjectKind;
use super::value::Value;
use super::vm::Runtime;
use crate::error::Result;
use ahash::HashMap;
use ahash::HashMapExt;
use std::rc::Rc;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ErrorKind {
  Error,
  TypeError,
  ReferenceError,
  RangeError,
  SyntaxError,
  UriError,
}

impl ErrorKind {
  pub const ALL: [ErrorKind; 6] = [
    ErrorKind::Error,
    ErrorKind::TypeError,
    ErrorKind::ReferenceError,
    ErrorKind::RangeError,
    ErrorKind::SyntaxError,
    ErrorKind::UriError,
  ];

  pub fn name(self) -> &'static str {
    match self {
      ErrorKind::Error => "Error",
      ErrorKind::TypeError => "TypeError",
      ErrorKind::ReferenceError => "ReferenceError",
      ErrorKind::RangeError => "RangeError",
      ErrorKind::SyntaxError => "SyntaxError",
      ErrorKind::UriError => "URIError",
    }
  }
}

/// Prototypes that objects without an explicit prototype inherit from, by kind.
pub struct Intrinsics {
  pub object_prototype: Obj,
  pub function_prototype: Obj,
  pub array_prototype: Obj,
  pub string_prototype: Obj,
  pub number_prototype: Obj,
  pub boolean_prototype: Obj,
  pub regexp_prototype: Obj,
  pub date_prototype: Obj,
  error_prototypes: HashMap<ErrorKind, Obj>,
}

impl Intrinsics {
  fn new() -> Intrinsics {
    let ordinary = || Obj::new(ObjectKind::Ordinary, None);
    let error_prototype = ordinary();
    let mut error_prototypes = HashMap::new();
    for kind in ErrorKind::ALL {
      let proto = match kind {
        ErrorKind::Error => error_prototype.clone(),
        _ => Obj::new(ObjectKind::Ordinary, Some(error_prototype.clone())),
      };
      proto.set_own("name", Value::from(kind.name()));
      proto.set_own("message", Value::from(""));
      error_prototypes.insert(kind, proto);
    }
    Intrinsics {
      object_prototype: ordinary(),
      function_prototype: ordinary(),
      array_prototype: ordinary(),
      string_prototype: ordinary(),
      number_prototype: ordinary(),
      boolean_prototype: ordinary(),
      regexp_prototype: ordinary(),
      date_prototype: ordinary(),
      error_prototypes,
    }
  }

  pub fn error_prototype(&self, kind: ErrorKind) -> &Obj {
    // Every kind is inserted at construction.
    &self.error_prototypes[&kind]
  }
}

/// The built-in environment of a runtime: intrinsic prototypes and the global bindings that free
/// names fall back to.
pub struct Realm {
  pub intrinsics: Intrinsics,
  pub globals: HashMap<String, Value>,
}

impl Realm {
  pub fn new() -> Realm {
    let mut realm = Realm {
      intrinsics: Intrinsics::new(),
      globals: HashMap::new(),
    };
    builtins::install(&mut realm);
    realm
  }

  /// The prototype an object inherits from, resolving intrinsic defaults.
  pub fn prototype_of(&self, obj: &Obj) -> Option<Obj> {
    let data = obj.borrow();
    if let Some(proto) = &data.proto {
      return Some(proto.clone());
    };
    let i = &self.intrinsics;
    Some(
      match &data.kind {
        ObjectKind::Ordinary if obj.ptr_eq(&i.object_prototype) => return None,
        ObjectKind::Ordinary => &i.object_prototype,
        ObjectKind::Array(_) => &i.array_prototype,
        ObjectKind::Closure(_) | ObjectKind::Native(_) => &i.function_prototype,
        ObjectKind::RegExp(_) => &i.regexp_prototype,
        ObjectKind::Date(_) => &i.date_prototype,
        ObjectKind::Error => i.error_prototype(ErrorKind::Error),
        ObjectKind::Scope(_) => return None,
      }
      .clone(),
    )
  }

  pub fn define_global(&mut self, name: &str, value: Value) {
    self.globals.insert(name.to_string(), value);
  }
}

impl Default for Realm {
  fn default() -> Self {
    Realm::new()
  }
}

pub fn define_method(
  target: &Obj,
  name: &str,
  f: impl Fn(&mut Runtime, Value, &[Value]) -> Result<Value> + 'static,
) {
  target.set_own(name, Value::native(name, f));
}

pub fn define_value(target: &Obj, name: &str, value: impl Into<Value>) {
  target.set_own(name, value.into());
}

/// A native function usable with `new`, linked both ways to its prototype object.
pub fn define_constructor(
  realm: &mut Realm,
  name: &str,
  prototype: &Obj,
  call: impl Fn(&mut Runtime, Value, &[Value]) -> Result<Value> + 'static,
  construct: Option<Rc<NativeFn>>,
) -> Obj {
  let ctor = Obj::new(
    ObjectKind::Native(NativeFunction {
      name: Rc::from(name),
      call: Rc::new(call),
      construct,
    }),
    None,
  );
  ctor.set_own("prototype", Value::Object(prototype.clone()));
  prototype.set_own("constructor", Value::Object(ctor.clone()));
  realm.define_global(name, Value::Object(ctor.clone()));
  ctor
}

/// A plain namespace object such as `Math` or `JSON`.
pub fn define_namespace(realm: &mut Realm, name: &str) -> Obj {
  let ns = Obj::new(ObjectKind::Ordinary, None);
  realm.define_global(name, Value::Object(ns.clone()));
  ns
}
