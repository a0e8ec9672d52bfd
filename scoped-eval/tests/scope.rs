use scoped_eval::Options;
use scoped_eval::PrimitiveBinding;
use scoped_eval::Scope;
use scoped_eval::ScopeOptions;
use scoped_eval::ScopedEval;
use scoped_eval::ScopedEvalError;
use scoped_eval::UnresolvedWrite;
use scoped_eval::Value;
use serde_json::json;

fn binding(json: serde_json::Value) -> Value {
  Value::from(json)
}

#[test]
fn parent_chain_reads_and_writes() {
  let mut se = ScopedEval::new();
  let root_binding = binding(json!({"x": 1, "total": 0}));
  let root = Scope::new(root_binding.clone()).unwrap();
  let child = root.child(binding(json!({"y": 2})), None).unwrap();

  let result = se.eval("total += x + y; $parent.x", child.clone(), None).unwrap();
  assert_eq!(result, Value::from(1));
  assert_eq!(root_binding.get_own("total"), Some(Value::from(3)));
  assert_eq!(child.binding().get_own("total"), None);

  assert_eq!(se.eval("$this.y", child.clone(), None).unwrap(), Value::from(2));
  assert_eq!(se.eval("$parents.length", child.clone(), None).unwrap(), Value::from(1));
  assert_eq!(se.eval("'x' in $this", child, None).unwrap(), Value::Bool(false));
}

#[test]
fn in_operator_searches_the_chain() {
  let mut se = ScopedEval::new();
  let root = Scope::new(binding(json!({"x": 1}))).unwrap();
  let child = Scope::with_parent(binding(json!({})), &root).unwrap();
  assert_eq!(se.eval("'x' in $parent", child.clone(), None).unwrap(), Value::Bool(true));
  assert_eq!(se.eval("typeof missing", child, None).unwrap(), Value::from("undefined"));
}

#[test]
fn context_overlay_shadows_bindings() {
  let mut se = ScopedEval::new();
  let root = Scope::new(binding(json!({"$index": "root", "v": 1}))).unwrap();
  let context = binding(json!({"$index": 3}));
  let scope = Scope::with_context(binding(json!({"v": 10})), Some(&root), context.clone()).unwrap();
  assert_eq!(se.eval("$index + v", scope.clone(), None).unwrap(), Value::from(13));

  se.eval("$index = 4", scope.clone(), None).unwrap();
  assert_eq!(context.get_own("$index"), Some(Value::from(4)));
  assert_eq!(se.eval("$context.$index", scope, None).unwrap(), Value::from(4));
}

#[test]
fn reserved_names_are_not_assignable() {
  let mut se = ScopedEval::new();
  for code in ["$this = 1", "$parent = 1", "$parents = []", "$context = {}"] {
    let err = se.eval(code, json!({}), None).unwrap_err();
    assert!(matches!(err, ScopedEvalError::AssignmentRejected(_)), "{code}");
  }
}

#[test]
fn unresolved_write_is_rejected_by_default() {
  let mut se = ScopedEval::new();
  let obj = binding(json!({}));
  let err = se.eval("fresh = 1", obj.clone(), None).unwrap_err();
  assert!(matches!(err, ScopedEvalError::AssignmentRejected(_)));
  assert_eq!(obj.get_own("fresh"), None);
}

#[test]
fn rejected_write_is_catchable_by_the_script() {
  let mut se = ScopedEval::new();
  let obj = binding(json!({"log": []}));
  let code = "try { fresh = 1 } catch (e) { log.push(e.name) } finally { log.push('done') } log.join()";
  assert_eq!(se.eval(code, obj.clone(), None).unwrap(), Value::from("TypeError,done"));
  assert_eq!(obj.get_own("fresh"), None);
  // Nothing catches it here, so the host sees the rejection.
  let err = se.eval("try { $this = 1 } finally { log.push('again') }", obj.clone(), None).unwrap_err();
  assert!(matches!(err, ScopedEvalError::AssignmentRejected(_)));
}

#[test]
fn unresolved_write_creates_on_innermost_object() {
  let options = Options {
    unresolved_write: UnresolvedWrite::Create,
    ..Options::default()
  };
  let mut se = ScopedEval::with_options(options);
  let obj = binding(json!({}));
  assert_eq!(se.eval("fresh = 1", obj.clone(), None).unwrap(), Value::from(1));
  assert_eq!(obj.get_own("fresh"), Some(Value::from(1)));

  let scope_options = ScopeOptions {
    unresolved_write: UnresolvedWrite::Create,
    ..ScopeOptions::default()
  };
  let root_binding = binding(json!({}));
  let root = Scope::with_options(root_binding.clone(), None, None, scope_options).unwrap();
  let child = root.child(binding(json!({})), None).unwrap();
  se.eval("created ??= 'here'", child.clone(), None).unwrap();
  assert_eq!(child.binding().get_own("created"), Some(Value::from("here")));
  assert_eq!(root_binding.get_own("created"), None);

  // `$` names are reserved for the scope itself.
  let err = se.eval("$fresh = 1", child, None).unwrap_err();
  assert!(matches!(err, ScopedEvalError::AssignmentRejected(_)));
}

#[test]
fn unresolved_write_without_object_binding() {
  let options = Options {
    unresolved_write: UnresolvedWrite::Create,
    ..Options::default()
  };
  let mut se = ScopedEval::with_options(options);
  let err = se.eval("fresh = 1", Value::from(7), None).unwrap_err();
  assert!(matches!(err, ScopedEvalError::AssignmentRejected(_)));
}

#[test]
fn primitive_bindings() {
  let mut se = ScopedEval::new();
  assert_eq!(se.eval("$this", Value::from(7), None).unwrap(), Value::from(7));
  assert_eq!(se.eval("missing", Value::from("str"), None).unwrap(), Value::Undefined);

  let mut strict = ScopedEval::with_options(Options {
    primitive_binding: PrimitiveBinding::Reject,
    ..Options::default()
  });
  let err = strict.eval("$this", Value::from(7), None).unwrap_err();
  assert!(matches!(err, ScopedEvalError::Unsupported(_)));
  assert_eq!(strict.eval("a", json!({"a": 1}), None).unwrap(), Value::from(1));
}

#[test]
fn inherited_properties_are_read_but_not_written() {
  let mut se = ScopedEval::new();
  let obj = binding(json!({"list": [1, 2, 3]}));
  // `length` and `map` come from the array prototype, not the scope.
  assert_eq!(
    se.eval("list.map(n => n * 2).length", obj.clone(), None).unwrap(),
    Value::from(3)
  );
  let err = se.eval("toString = 1", obj, None).unwrap_err();
  assert!(matches!(err, ScopedEvalError::AssignmentRejected(_)));
}

#[test]
fn compound_write_reads_before_evaluating_right_side() {
  let mut se = ScopedEval::new();
  let obj = binding(json!({"a": 2}));
  assert_eq!(se.eval("a += (a = 5, 1)", obj.clone(), None).unwrap(), Value::from(3));
  assert_eq!(obj.get_own("a"), Some(Value::from(3)));
  // Same result as a local binding.
  assert_eq!(
    se.eval("let x = 2; x += (x = 5, 1); x", json!({}), None).unwrap(),
    Value::from(3)
  );
}

#[test]
fn compound_write_starts_from_inherited_value() {
  let mut se = ScopedEval::with_options(Options {
    unresolved_write: UnresolvedWrite::Create,
    ..Options::default()
  });
  let proto = binding(json!({"n": 1}));
  let obj = binding(json!({}));
  obj.as_object().unwrap().borrow_mut().proto = proto.as_object().cloned();
  assert_eq!(se.eval("n += 1", obj.clone(), None).unwrap(), Value::from(2));
  assert_eq!(obj.get_own("n"), Some(Value::from(2)));
  assert_eq!(proto.get_own("n"), Some(Value::from(1)));
}
