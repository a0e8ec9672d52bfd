use scoped_eval::Options;
use scoped_eval::ScopedEval;
use scoped_eval::ScopedEvalError;
use scoped_eval::SourceMode;
use scoped_eval::Value;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn preprocess(se: &ScopedEval, code: &str, mode: Option<SourceMode>) -> (String, String) {
  let pre = se.preprocess(code, mode).unwrap();
  (pre.param, pre.source)
}

fn pair(param: &str, source: &str) -> (String, String) {
  (param.to_string(), source.to_string())
}

#[test]
fn allowed_globals_are_additive() {
  let mut se = ScopedEval::new();
  assert!(se.is_allowed("JSON"));
  assert!(!se.is_allowed("TextDecoder"));

  se.allow_globals(["TextDecoder", "Uint8Array"]);
  assert!(se.is_allowed("TextDecoder"));
  assert!(se.is_allowed("Uint8Array"));
  assert!(!se.is_allowed("TextEncoder"));

  let before = se.allowed_globals().len();
  se.allow_globals(["TextEncoder"]);
  se.allow_globals(["TextEncoder"]);
  assert!(se.is_allowed("TextEncoder"));
  assert_eq!(se.allowed_globals().len(), before + 1);
}

#[test]
fn expression_becomes_result() {
  let mut se = ScopedEval::new();
  assert_eq!(preprocess(&se, "foo", None), pair("a", "return a.foo"));
  assert_eq!(preprocess(&se, "return foo", None), pair("a", "return a.foo"));
  let mut func = se.build("foo", None).unwrap();
  assert_eq!(func.call(json!({})).unwrap(), Value::Undefined);
  assert_eq!(func.call(json!({"foo": "Foo"})).unwrap(), Value::from("Foo"));
}

#[test]
fn explicit_return_in_branch() {
  let mut se = ScopedEval::new();
  let code = "if (a) { return foo; } bar;";
  assert_eq!(
    preprocess(&se, code, None),
    pair("b", "if (b.a) { return b.foo; } return b.bar;")
  );
  let mut func = se.build(code, None).unwrap();
  assert_eq!(
    func.call(json!({"foo": "Foo", "bar": "Bar"})).unwrap(),
    Value::from("Bar")
  );
  assert_eq!(
    func.call(json!({"foo": "Foo", "bar": "Bar", "a": true})).unwrap(),
    Value::from("Foo")
  );
}

#[test]
fn allowed_globals_stay_unrewritten() {
  let mut se = ScopedEval::new();
  let code = "JSON.stringify(Object.keys(foo))";
  assert_eq!(
    preprocess(&se, code, None),
    pair("a", "return JSON.stringify(Object.keys(a.foo))")
  );
  let result = se.eval(code, json!({"foo": {"a": 1, "b": 2}}), None).unwrap();
  assert_eq!(result, Value::from(r#"["a","b"]"#));
}

#[test]
fn assignment_writes_through_scope() {
  let mut se = ScopedEval::new();
  let code = "a = true";
  assert_eq!(preprocess(&se, code, None), pair("b", "return b.a = true"));
  let obj = Value::from(json!({"a": false}));
  assert_eq!(se.eval(code, obj.clone(), None).unwrap(), Value::Bool(true));
  assert_eq!(obj.get_own("a"), Some(Value::Bool(true)));
}

#[test]
fn local_variables_shadow_scope() {
  let mut se = ScopedEval::new();
  let code = "let a = b + 1; return c + a;";
  assert_eq!(
    preprocess(&se, code, None),
    pair("d", "let a = d.b + 1; return d.c + a;")
  );
  let obj = Value::from(json!({"a": 5, "b": 1, "c": 2}));
  assert_eq!(se.eval(code, obj.clone(), None).unwrap(), Value::from(4));
  assert_eq!(obj.to_json(), json!({"a": 5, "b": 1, "c": 2}));
}

#[test]
fn compound_assignment() {
  let mut se = ScopedEval::new();
  let code = "a <<= a | b";
  assert_eq!(preprocess(&se, code, None), pair("c", "return c.a <<= c.a | c.b"));
  let obj = Value::from(json!({"a": 2, "b": 1}));
  assert_eq!(se.eval(code, obj.clone(), None).unwrap(), Value::from(16));
  assert_eq!(obj.to_json(), json!({"a": 16, "b": 1}));
}

#[test]
fn logical_assignment_short_circuits() {
  let mut se = ScopedEval::new();
  // `b` is not a function, so evaluating the right side would throw.
  let obj = Value::from(json!({"a": "kept"}));
  assert_eq!(se.eval("a ||= b()", obj.clone(), None).unwrap(), Value::from("kept"));
  let obj = Value::from(json!({"a": null, "b": 3}));
  assert_eq!(se.eval("a ??= b * 2", obj.clone(), None).unwrap(), Value::from(6));
  assert_eq!(obj.get_own("a"), Some(Value::from(6)));
}

#[test]
fn empty_input() {
  let mut se = ScopedEval::new();
  assert_eq!(preprocess(&se, "", None), pair("a", ""));
  assert_eq!(se.eval("", json!({}), None).unwrap(), Value::Undefined);
}

#[test]
fn module_syntax_is_rejected() {
  let mut se = ScopedEval::new();
  let err = se.preprocess("import a from './a'; return a;", None).unwrap_err();
  assert!(matches!(err, ScopedEvalError::Syntax(_)));

  let code = "const a = 1; exports default a;";
  assert!(se.build(code, None).is_err());
  assert!(se.eval(code, json!({}), None).is_err());

  let err = se.preprocess("import('./a')", None).unwrap_err();
  assert_eq!(err.to_string(), "[1:0]: Dynamic import is not allowed");
  let err = se.preprocess("x.then(() => import(y))", None).unwrap_err();
  assert!(matches!(err, ScopedEvalError::DynamicImportRejected { line: 1, column: 13 }));
}

#[test]
fn dynamic_import_is_rejected_even_when_allowed() {
  let mut se = ScopedEval::new();
  se.allow_globals(["import"]);
  assert!(se.is_allowed("import"));
  let err = se.preprocess("import('./a')", None).unwrap_err();
  assert!(matches!(err, ScopedEvalError::DynamicImportRejected { line: 1, column: 0 }));
  let err = se.eval("load.then(() => import(name))", json!({"name": "./a"}), None).unwrap_err();
  assert!(matches!(err, ScopedEvalError::DynamicImportRejected { .. }));
}

#[test]
fn deep_nesting_is_a_syntax_error() {
  let mut se = ScopedEval::new();
  let code = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
  let err = se.eval(&code, json!({}), None).unwrap_err();
  assert!(matches!(err, ScopedEvalError::Syntax(ref e) if e.code() == "PS0015"), "{err}");
  let code = format!("{}x{}", "[".repeat(20_000), "]".repeat(20_000));
  assert!(matches!(se.build(&code, None), Err(ScopedEvalError::Syntax(_))));
  let code = format!("{}x{}", "(".repeat(30), ")".repeat(30));
  assert_eq!(se.eval(&code, json!({"x": 7}), None).unwrap(), Value::from(7));
}

#[test]
fn dates_format_in_utc() {
  let mut se = ScopedEval::new();
  let code = "new Date(stamp).toISOString()";
  assert_eq!(
    se.eval(code, json!({"stamp": 1_700_000_000_123_i64}), None).unwrap(),
    Value::from("2023-11-14T22:13:20.123Z")
  );
  let code = "Date.parse('2023-11-14T23:13:20.123+01:00') === Date.UTC(2023, 10, 14, 22, 13, 20, 123)";
  assert_eq!(se.eval(code, json!({}), None).unwrap(), Value::Bool(true));
  assert_eq!(
    se.eval("String(new Date('nonsense'))", json!({}), None).unwrap(),
    Value::from("Invalid Date")
  );
  assert_eq!(
    se.eval("typeof Date.now() === 'number' && Date.now() > 1.6e12", json!({}), None).unwrap(),
    Value::Bool(true)
  );
}

#[test]
fn arrow_parameters_are_local() {
  let mut se = ScopedEval::new();
  let code = "list.map(n => n.name).join()";
  assert_eq!(
    preprocess(&se, code, None),
    pair("a", "return a.list.map(n => n.name).join()")
  );
  let result = se
    .eval(code, json!({"list": [{"name": "A"}, {"name": "B"}]}), None)
    .unwrap();
  assert_eq!(result, Value::from("A,B"));
}

#[test]
fn interpolation_mode() {
  let mut se = ScopedEval::new();
  let mode = Some(SourceMode::Interpolation);

  let code = "b + c";
  assert_eq!(preprocess(&se, code, mode), pair("a", r#"return "b + c""#));
  assert_eq!(se.eval(code, json!({"b": 1, "c": 2}), mode).unwrap(), Value::from("b + c"));

  let code = "${\"a\"}${a + '}' + `${b + c}`}";
  assert_eq!(
    preprocess(&se, code, mode),
    pair("d", r#"return "" + ("a") + (d.a + '}' + `${d.b + d.c}`)"#)
  );
  assert_eq!(
    se.eval(code, json!({"a": 1, "b": 2, "c": 3}), mode).unwrap(),
    Value::from("a1}5")
  );

  let code = "`a`${`b${c}`}`d`";
  assert_eq!(
    preprocess(&se, code, mode),
    pair("a", r#"return "`a`" + (`b${a.c}`) + "`d`""#)
  );
  assert_eq!(
    se.eval(code, json!({"a": 1, "b": 2, "c": 3}), mode).unwrap(),
    Value::from("`a`b3`d`")
  );

  let err = se.preprocess("a ${b + '}'", mode).unwrap_err();
  assert!(matches!(err, ScopedEvalError::InterpolationMalformed(_)));
}

#[test]
fn interpolation_by_default() {
  let mut se = ScopedEval::with_options(Options {
    interpolation_default: true,
    ..Options::default()
  });
  assert_eq!(se.eval("n=${n}", json!({"n": 1}), None).unwrap(), Value::from("n=1"));
  assert_eq!(
    se.eval("n + 1", json!({"n": 1}), Some(SourceMode::Program)).unwrap(),
    Value::from(2)
  );
}

#[test]
fn regex_literals() {
  let mut se = ScopedEval::new();
  let code = "/\\d/.test(value)";
  assert_eq!(preprocess(&se, code, None), pair("a", "return /\\d/.test(a.value)"));
  assert_eq!(se.eval(code, json!({"value": "abc"}), None).unwrap(), Value::Bool(false));
  assert_eq!(se.eval(code, json!({"value": "ab9c"}), None).unwrap(), Value::Bool(true));
}

#[test]
fn non_string_code_is_rejected() {
  let se = ScopedEval::new();
  let cases = [
    (Value::Null, "object: null"),
    (Value::from(1), "number: 1"),
    (Value::Undefined, "undefined: undefined"),
  ];
  for (code, rendered) in cases {
    let err = se.preprocess_value(&code, None).unwrap_err();
    assert_eq!(
      err.to_string(),
      format!("Code to be evaluated must be a string, but received {rendered}")
    );
  }
}

#[test]
fn var_and_function_declarations() {
  let mut se = ScopedEval::new();
  let code = "var a = 1; a + b";
  assert_eq!(preprocess(&se, code, None), pair("c", "var a = 1; return a + c.b"));
  assert_eq!(se.eval(code, json!({"b": 2}), None).unwrap(), Value::from(3));

  let code = "function a() {return b;} a()";
  assert_eq!(
    preprocess(&se, code, None),
    pair("c", "function a() {return c.b;} return a()")
  );
  assert_eq!(se.eval(code, json!({"b": 2}), None).unwrap(), Value::from(2));
}

#[test]
fn shorthand_properties() {
  let mut se = ScopedEval::new();
  let code = "JSON.stringify({a, b: a + 1})";
  assert_eq!(
    preprocess(&se, code, None),
    pair("b", "return JSON.stringify({a: b.a, b: b.a + 1})")
  );
  assert_eq!(
    se.eval(code, json!({"a": 1}), None).unwrap(),
    Value::from(r#"{"a":1,"b":2}"#)
  );
}

#[test]
fn uncaught_exceptions() {
  let mut se = ScopedEval::new();
  let err = se.eval("a.b", json!({"a": null}), None).unwrap_err();
  assert_eq!(
    err.to_string(),
    "Uncaught TypeError: Cannot read properties of null (reading 'b')"
  );
  let err = se.eval("throw 'boom'", json!({}), None).unwrap_err();
  assert!(matches!(err, ScopedEvalError::Throw(Value::String(ref s)) if &**s == "boom"));
  // Caught exceptions never reach the host.
  let result = se.eval("let m; try { a.b } catch (e) { m = e.message } m", json!({}), None);
  assert_eq!(
    result.unwrap(),
    Value::from("Cannot read properties of undefined (reading 'b')")
  );
}

#[test]
fn step_limit() {
  let mut se = ScopedEval::with_options(Options {
    step_limit: Some(1000),
    ..Options::default()
  });
  let err = se.eval("while (true) {}", json!({}), None).unwrap_err();
  assert!(matches!(err, ScopedEvalError::StepLimitExceeded(1000)));
  // The budget is per call.
  let mut func = se.build("let n = 0; for (let i = 0; i < 10; i++) n += i; n", None).unwrap();
  assert_eq!(func.call(json!({})).unwrap(), Value::from(45));
  assert_eq!(func.call(json!({})).unwrap(), Value::from(45));
}

#[test]
fn provided_globals() {
  let mut se = ScopedEval::new();
  let alerts = Rc::new(RefCell::new(Vec::new()));
  let sink = alerts.clone();
  se.provide_global(
    "alert",
    Value::native("alert", move |_, _, args| {
      sink.borrow_mut().push(args.first().cloned().unwrap_or_default());
      Ok(Value::Undefined)
    }),
  );
  se.eval("alert(message)", json!({"message": "hi"}), None).unwrap();
  assert_eq!(*alerts.borrow(), vec![Value::from("hi")]);

  // Allowed but never provided.
  let err = se.eval("fetch(url)", json!({"url": "/"}), None).unwrap_err();
  assert_eq!(err.to_string(), "Uncaught ReferenceError: fetch is not defined");
}

#[test]
fn cache_reuses_compilations() {
  let mut se = ScopedEval::new();
  let first = se.build("a + 1", None).unwrap();
  let second = se.build("a + 1", None).unwrap();
  assert!(first.shares_program(&second));
  assert_eq!(se.cached_len(), 1);
  assert_eq!(first.param(), "b");
  assert_eq!(first.source(), "return b.a + 1");
}
