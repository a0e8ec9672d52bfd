//! Evaluates script snippets against an explicit scope object.
//!
//! Every free variable of a snippet that is not an allowed global is rewritten into a property
//! access on a synthetic parameter, so `a + b` runs as `return p.a + p.b` with `p` bound to the
//! caller's [`Scope`]. Nothing the snippet names can reach the host environment unless it has been
//! allowed with [`ScopedEval::allow_globals`].

use ahash::HashMap;
use ahash::RandomState;
use derive_visitor::Drive;
use derive_visitor::Visitor;
use error::Result;
use interpolate::interpolate;
use rewrite::route_free_names;
use rewrite::CodeRewriter;
use runtime::conv;
use runtime::exec::prepare;
use runtime::vm::Runtime;
use scoped_parse::ast::expr::ImportExpr;
use scoped_parse::ast::node::Node;
use scoped_parse::ast::stmt::Stmt;
use scoped_parse::ast::stx::TopLevel;
use scoped_parse::parse;
use scoped_symbol::assign::classify_assignments;
use scoped_symbol::assign::AssignmentTarget;
use scoped_symbol::compute_symbols;
use scoped_symbol::globals::GlobalReferences;
use scoped_symbol::globals::ReferenceTable;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use tracing::debug_span;

pub mod error;
pub mod interpolate;
pub mod name;
pub mod rewrite;
pub mod runtime;

pub use error::ScopedEvalError;
pub use runtime::scope::PrimitiveBinding;
pub use runtime::scope::Scope;
pub use runtime::scope::ScopeArg;
pub use runtime::scope::ScopeOptions;
pub use runtime::scope::UnresolvedWrite;
pub use runtime::value::Value;
pub use scoped_symbol::globals::AllowedGlobals;

/// Host built-ins a snippet may always name directly.
pub const DEFAULT_ALLOWED_GLOBALS: [&str; 36] = [
  "undefined",
  "NaN",
  "isNaN",
  "Infinity",
  "isFinite",
  "alert",
  "atob",
  "btoa",
  "encodeURI",
  "encodeURIComponent",
  "decodeURI",
  "decodeURIComponent",
  "parseFloat",
  "parseInt",
  "JSON",
  "Number",
  "String",
  "Array",
  "BigInt",
  "Blob",
  "Boolean",
  "Date",
  "Map",
  "Math",
  "Object",
  "RegExp",
  "Set",
  "Intl",
  "fetch",
  "location",
  "setTimeout",
  "clearTimeout",
  "setInterval",
  "clearInterval",
  "setImmediate",
  "clearImmediate",
];

/// How the input text is read.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum SourceMode {
  /// A program body. A trailing expression statement is its result.
  #[default]
  Program,
  /// Literal text with `${expr}` markers, evaluating to a string.
  Interpolation,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Options {
  /// Read inputs as interpolated text when no mode is given.
  pub interpolation_default: bool,
  pub unresolved_write: UnresolvedWrite,
  pub primitive_binding: PrimitiveBinding,
  /// Steps a single call may take before failing with [`ScopedEvalError::StepLimitExceeded`].
  pub step_limit: Option<u64>,
}

impl Options {
  fn scope_options(&self) -> ScopeOptions {
    ScopeOptions {
      unresolved_write: self.unresolved_write,
      primitive_binding: self.primitive_binding,
    }
  }
}

/// Result of [`ScopedEval::preprocess`].
#[derive(Clone, Debug)]
pub struct Preprocessed {
  /// Name of the scope parameter.
  pub param: String,
  /// The rewritten program body.
  pub source: String,
  /// Free names of the input, with ranges into the (interpolated) input.
  pub references: ReferenceTable,
  pub assignments: Vec<AssignmentTarget>,
}

struct Prepared {
  param: String,
  source: String,
  program: Node<TopLevel>,
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct CacheKey {
  mode: SourceMode,
  code: String,
  allowed: u64,
}

type ImportExprNode = Node<ImportExpr>;

#[derive(Default, Visitor)]
#[visitor(ImportExprNode(enter))]
struct DynamicImportFinder {
  first: Option<usize>,
}

impl DynamicImportFinder {
  fn enter_import_expr_node(&mut self, node: &ImportExprNode) {
    if self.first.is_none() {
      self.first = Some(node.loc.start());
    };
  }
}

fn reject_dynamic_import(top_level_node: &Node<TopLevel>, source: &str) -> Result<()> {
  let mut finder = DynamicImportFinder::default();
  top_level_node.drive(&mut finder);
  match finder.first {
    Some(offset) => {
      let pos = scoped_parse::loc::LineCol::of(source, offset);
      Err(ScopedEvalError::DynamicImportRejected {
        line: pos.line,
        column: pos.column,
      })
    }
    None => Ok(()),
  }
}

// Times a stage and records its duration on the span when done.
struct StageSpan {
  span: tracing::Span,
  start: Instant,
}

impl StageSpan {
  fn new(span: tracing::Span) -> StageSpan {
    StageSpan {
      span,
      start: Instant::now(),
    }
  }

  fn finish(self) {
    self
      .span
      .record("duration_ms", self.start.elapsed().as_secs_f64() * 1000.0);
  }
}

/// Compiles and runs snippets. Holds the allowed globals, host-provided values and the cache of
/// compiled programs.
pub struct ScopedEval {
  options: Options,
  allowed: AllowedGlobals,
  allowed_hash: u64,
  hasher: RandomState,
  provided: Vec<(String, Value)>,
  cache: HashMap<CacheKey, Arc<Prepared>>,
}

impl Default for ScopedEval {
  fn default() -> Self {
    ScopedEval::with_options(Options::default())
  }
}

impl ScopedEval {
  pub fn new() -> ScopedEval {
    ScopedEval::default()
  }

  pub fn with_options(options: Options) -> ScopedEval {
    let allowed: AllowedGlobals = DEFAULT_ALLOWED_GLOBALS.into_iter().collect();
    let hasher = RandomState::new();
    ScopedEval {
      options,
      allowed_hash: hasher.hash_one(&allowed),
      allowed,
      hasher,
      provided: Vec::new(),
      cache: HashMap::default(),
    }
  }

  pub fn options(&self) -> &Options {
    &self.options
  }

  /// Permanently allows names. Allowing a name twice has no further effect.
  pub fn allow_globals<S: Into<String>>(&mut self, names: impl IntoIterator<Item = S>) {
    self.allowed.extend(names);
    self.allowed_hash = self.hasher.hash_one(&self.allowed);
  }

  pub fn is_allowed(&self, name: &str) -> bool {
    self.allowed.contains(name)
  }

  pub fn allowed_globals(&self) -> &AllowedGlobals {
    &self.allowed
  }

  /// Supplies the value of a global to every program built afterwards, and allows its name.
  pub fn provide_global(&mut self, name: &str, value: Value) {
    self.allow_globals([name]);
    self.provided.retain(|(n, _)| n != name);
    self.provided.push((name.to_string(), value));
  }

  pub fn default_mode(&self) -> SourceMode {
    if self.options.interpolation_default {
      SourceMode::Interpolation
    } else {
      SourceMode::Program
    }
  }

  /// Rewrites `code` so that its free names go through the scope parameter.
  pub fn preprocess(&self, code: &str, mode: Option<SourceMode>) -> Result<Preprocessed> {
    let mode = mode.unwrap_or_else(|| self.default_mode());
    let stage = StageSpan::new(debug_span!(
      "scoped_eval.preprocess",
      ?mode,
      param = tracing::field::Empty,
      references = tracing::field::Empty,
      assignments = tracing::field::Empty,
      duration_ms = tracing::field::Empty,
    ));
    let _entered = stage.span.clone().entered();

    let source = match mode {
      SourceMode::Program => Cow::Borrowed(code),
      SourceMode::Interpolation => Cow::Owned(interpolate(code)?),
    };
    let mut top_level_node = parse(&source)?;
    reject_dynamic_import(&top_level_node, &source)?;
    compute_symbols(&mut top_level_node);
    let param = name::allocate(&top_level_node)?;
    let mut references = GlobalReferences::extract(&top_level_node, &self.allowed);
    let assignments = classify_assignments(&top_level_node, &mut references);

    let mut rewriter = CodeRewriter::new(&source);
    if let Some(last) = top_level_node.stx.body.last() {
      if let Stmt::Expr(_) = last.stx.as_ref() {
        rewriter.insert(last.loc.start(), "return ");
      };
    };
    route_free_names(&mut rewriter, &references, &param);
    let rewritten = rewriter.finish();

    stage.span.record("param", param.as_str());
    stage.span.record("references", references.len());
    stage.span.record("assignments", assignments.len());
    stage.finish();
    Ok(Preprocessed {
      param,
      source: rewritten,
      references,
      assignments,
    })
  }

  /// Like [`ScopedEval::preprocess`], for code whose type is only known at run time.
  pub fn preprocess_value(&self, code: &Value, mode: Option<SourceMode>) -> Result<Preprocessed> {
    match code {
      Value::String(code) => self.preprocess(code, mode),
      other => Err(ScopedEvalError::InputType {
        typ: other.type_of(),
        rendered: conv::to_json(other, &mut Vec::new())
          .map(|json| json.to_string())
          .unwrap_or_else(|| "undefined".to_string()),
      }),
    }
  }

  /// Compiles `code`, reusing an earlier compilation of the same text, mode and allowed globals.
  pub fn build(&mut self, code: &str, mode: Option<SourceMode>) -> Result<Compiled> {
    let mode = mode.unwrap_or_else(|| self.default_mode());
    let stage = StageSpan::new(debug_span!(
      "scoped_eval.build",
      ?mode,
      param = tracing::field::Empty,
      references = tracing::field::Empty,
      assignments = tracing::field::Empty,
      duration_ms = tracing::field::Empty,
    ));
    let _entered = stage.span.clone().entered();

    let key = CacheKey {
      mode,
      code: code.to_string(),
      allowed: self.allowed_hash,
    };
    let prepared = match self.cache.get(&key) {
      Some(prepared) => {
        debug!(param = %prepared.param, "compiled program cache hit");
        prepared.clone()
      }
      None => {
        debug!("compiled program cache miss");
        let pre = self.preprocess(code, Some(mode))?;
        stage.span.record("references", pre.references.len());
        stage.span.record("assignments", pre.assignments.len());
        let mut program = parse(&pre.source)?;
        prepare(&mut program);
        let prepared = Arc::new(Prepared {
          param: pre.param,
          source: pre.source,
          program,
        });
        self.cache.insert(key, prepared.clone());
        prepared
      }
    };
    stage.span.record("param", prepared.param.as_str());
    stage.finish();

    let mut runtime = Runtime::new(self.options.step_limit);
    for (name, value) in &self.provided {
      runtime.define_global(name, value.clone());
    }
    Ok(Compiled {
      prepared,
      runtime,
      scope_options: self.options.scope_options(),
    })
  }

  /// Builds `code` and calls it once with `binding`.
  pub fn eval(
    &mut self,
    code: &str,
    binding: impl Into<ScopeArg>,
    mode: Option<SourceMode>,
  ) -> Result<Value> {
    self.build(code, mode)?.call(binding)
  }

  pub fn clear_cache(&mut self) {
    self.cache.clear();
  }

  pub fn cached_len(&self) -> usize {
    self.cache.len()
  }
}

/// A compiled program with its own runtime. State the program leaves on built-ins persists across
/// calls of the same `Compiled`.
pub struct Compiled {
  prepared: Arc<Prepared>,
  runtime: Runtime,
  scope_options: ScopeOptions,
}

impl Compiled {
  pub fn param(&self) -> &str {
    &self.prepared.param
  }

  pub fn source(&self) -> &str {
    &self.prepared.source
  }

  pub fn runtime_mut(&mut self) -> &mut Runtime {
    &mut self.runtime
  }

  /// Whether both were compiled from the same cache entry.
  pub fn shares_program(&self, other: &Compiled) -> bool {
    Arc::ptr_eq(&self.prepared, &other.prepared)
  }

  /// Runs the program. A plain binding is wrapped in a new root scope with the configured options.
  pub fn call(&mut self, binding: impl Into<ScopeArg>) -> Result<Value> {
    let scope = match binding.into() {
      ScopeArg::Scope(scope) => scope,
      ScopeArg::Binding(value) => Scope::with_options(value, None, None, self.scope_options)?,
    };
    self
      .runtime
      .run(&self.prepared.program, &self.prepared.param, scope)
  }
}

#[cfg(test)]
mod tests {
  use super::ScopedEval;
  use super::ScopedEvalError;
  use super::SourceMode;
  use crate::runtime::value::Value;
  use serde_json::json;

  fn preprocess(se: &ScopedEval, code: &str) -> (String, String) {
    let pre = se.preprocess(code, None).unwrap();
    (pre.param, pre.source)
  }

  #[test]
  fn test_return_injection() {
    let se = ScopedEval::new();
    assert_eq!(preprocess(&se, "foo"), ("a".into(), "return a.foo".into()));
    assert_eq!(preprocess(&se, "return foo"), ("a".into(), "return a.foo".into()));
    assert_eq!(
      preprocess(&se, "if (a) { return foo; } bar;"),
      ("b".into(), "if (b.a) { return b.foo; } return b.bar;".into())
    );
    assert_eq!(preprocess(&se, ""), ("a".into(), "".into()));
    assert_eq!(preprocess(&se, "let x = 1;"), ("a".into(), "let x = 1;".into()));
  }

  #[test]
  fn test_writes_keep_their_operator() {
    let se = ScopedEval::new();
    let pre = se.preprocess("a <<= a | b", None).unwrap();
    assert_eq!(pre.source, "return c.a <<= c.a | c.b");
    assert_eq!(pre.assignments.len(), 1);
    assert_eq!(pre.assignments[0].name, "a");
    assert_eq!(pre.references.get("a").map(<[_]>::len), Some(1));
    assert_eq!(pre.references.writes("a").len(), 1);
  }

  #[test]
  fn test_shorthand_expands() {
    let se = ScopedEval::new();
    assert_eq!(
      preprocess(&se, "({a, b: c})"),
      ("b".into(), "return ({a: b.a, b: b.c})".into())
    );
  }

  #[test]
  fn test_dynamic_import() {
    let se = ScopedEval::new();
    let err = se.preprocess("let x = 1;\n  import('./a')", None).unwrap_err();
    assert!(matches!(err, ScopedEvalError::DynamicImportRejected { line: 2, column: 2 }));
    assert_eq!(err.to_string(), "[2:2]: Dynamic import is not allowed");
  }

  #[test]
  fn test_input_type() {
    let se = ScopedEval::new();
    let cases = [
      (Value::Null, "object: null"),
      (Value::from(1), "number: 1"),
      (Value::Undefined, "undefined: undefined"),
      (Value::from(json!({"a": [1]})), r#"object: {"a":[1]}"#),
    ];
    for (value, rendered) in cases {
      let err = se.preprocess_value(&value, None).unwrap_err();
      assert_eq!(
        err.to_string(),
        format!("Code to be evaluated must be a string, but received {rendered}")
      );
    }
    let pre = se.preprocess_value(&Value::from("x"), None).unwrap();
    assert_eq!(pre.source, "return a.x");
  }

  #[test]
  fn test_cache_key() {
    let mut se = ScopedEval::new();
    let first = se.build("foo", None).unwrap();
    let second = se.build("foo", None).unwrap();
    assert!(first.shares_program(&second));
    let interpolated = se.build("foo", Some(SourceMode::Interpolation)).unwrap();
    assert!(!first.shares_program(&interpolated));
    assert_eq!(se.cached_len(), 2);

    // Allowing a name changes what the same text compiles to.
    se.allow_globals(["foo"]);
    let allowed = se.build("foo", None).unwrap();
    assert_eq!(allowed.source(), "return foo");
    assert_eq!(se.cached_len(), 3);
    se.clear_cache();
    assert_eq!(se.cached_len(), 0);
  }
}
