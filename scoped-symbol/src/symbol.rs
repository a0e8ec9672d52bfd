use ahash::HashMap;
use ahash::HashMapExt;
use parking_lot::RwLock;
use parking_lot::RwLockReadGuard;
use parking_lot::RwLockWriteGuard;
use serde::Serialize;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize)]
pub struct Symbol(u64);

impl Symbol {
  pub fn id(&self) -> u64 {
    self.0
  }
}

/// Hands out unique Symbols across every scope of one analysis.
#[derive(Clone, Default)]
pub struct SymbolGenerator(Arc<AtomicU64>);

impl SymbolGenerator {
  pub fn new() -> SymbolGenerator {
    SymbolGenerator::default()
  }

  pub fn next(&self) -> Symbol {
    Symbol(self.0.fetch_add(1, Ordering::Relaxed))
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum ScopeType {
  // The program body. Evaluated code runs as a function body, so this is a closure too.
  Global,
  // Functions with `this` and `arguments`.
  NonArrowFunction,
  // Functions with neither `this` nor `arguments`.
  ArrowFunction,
  Block,
}

impl ScopeType {
  pub fn is_closure(&self) -> bool {
    !matches!(self, ScopeType::Block)
  }
}

pub struct ScopeData {
  generator: SymbolGenerator,
  typ: ScopeType,
  parent: Option<Weak<RwLock<ScopeData>>>,
  children: Vec<Scope>,
  symbols: HashMap<String, Symbol>,
  // Declaration order, so iteration is deterministic.
  symbol_declaration_order: Vec<String>,
}

impl ScopeData {
  pub fn typ(&self) -> ScopeType {
    self.typ
  }

  pub fn parent(&self) -> Option<Scope> {
    self.parent.as_ref().and_then(Weak::upgrade).map(Scope)
  }

  pub fn children(&self) -> &Vec<Scope> {
    &self.children
  }

  /// Declares `name` in this scope. Redeclaring returns the existing symbol.
  pub fn add_symbol(&mut self, name: String) -> Symbol {
    if let Some(symbol) = self.symbols.get(&name) {
      return *symbol;
    };
    let symbol = self.generator.next();
    self.symbols.insert(name.clone(), symbol);
    self.symbol_declaration_order.push(name);
    symbol
  }

  pub fn get_symbol(&self, name: &str) -> Option<Symbol> {
    self.symbols.get(name).copied()
  }

  pub fn has_symbol(&self, name: &str) -> bool {
    self.symbols.contains_key(name)
  }

  pub fn symbol_names(&self) -> &Vec<String> {
    &self.symbol_declaration_order
  }

  pub fn symbol_count(&self) -> usize {
    self.symbols.len()
  }
}

/// A shared handle to a node in the scope tree. Cloning is cheap; equality is identity.
#[derive(Clone)]
pub struct Scope(Arc<RwLock<ScopeData>>);

impl Scope {
  pub fn new(generator: SymbolGenerator, parent: Option<Scope>, typ: ScopeType) -> Scope {
    Scope(Arc::new(RwLock::new(ScopeData {
      generator,
      typ,
      parent: parent.map(|p| Arc::downgrade(&p.0)),
      children: Vec::new(),
      symbols: HashMap::new(),
      symbol_declaration_order: Vec::new(),
    })))
  }

  pub fn data(&self) -> RwLockReadGuard<'_, ScopeData> {
    self.0.read()
  }

  pub fn data_mut(&self) -> RwLockWriteGuard<'_, ScopeData> {
    self.0.write()
  }

  pub fn typ(&self) -> ScopeType {
    self.data().typ
  }

  pub fn parent(&self) -> Option<Scope> {
    self.data().parent()
  }

  pub fn children(&self) -> Vec<Scope> {
    self.data().children.clone()
  }

  pub fn symbol_names(&self) -> Vec<String> {
    self.data().symbol_declaration_order.clone()
  }

  pub fn create_child_scope(&self, typ: ScopeType) -> Scope {
    let generator = self.data().generator.clone();
    let child = Scope::new(generator, Some(self.clone()), typ);
    self.data_mut().children.push(child.clone());
    child
  }

  /// This scope followed by each ancestor up to the root.
  pub fn self_and_ancestors(&self) -> Vec<Scope> {
    let mut scopes = vec![self.clone()];
    while let Some(parent) = scopes.last().and_then(|s| s.parent()) {
      scopes.push(parent);
    }
    scopes
  }

  /// Every scope below this one, in pre-order.
  pub fn descendants(&self) -> Vec<Scope> {
    let mut out = Vec::new();
    let mut stack: Vec<Scope> = self.children().into_iter().rev().collect();
    while let Some(scope) = stack.pop() {
      stack.extend(scope.children().into_iter().rev());
      out.push(scope);
    }
    out
  }

  /// The nearest self-or-ancestor scope matching `pred`.
  pub fn find_self_or_ancestor(&self, pred: impl Fn(ScopeType) -> bool) -> Option<Scope> {
    self
      .self_and_ancestors()
      .into_iter()
      .find(|s| pred(s.typ()))
  }

  /// Resolves `name` walking outwards, stopping after the first scope whose type satisfies `stop`.
  pub fn find_symbol_up_to_with_scope(
    &self,
    name: String,
    stop: impl Fn(ScopeType) -> bool,
  ) -> Option<(Scope, Symbol)> {
    for scope in self.self_and_ancestors() {
      let data = scope.data();
      if let Some(symbol) = data.get_symbol(&name) {
        drop(data);
        return Some((scope, symbol));
      };
      if stop(data.typ) {
        return None;
      };
    }
    None
  }

  pub fn find_symbol(&self, name: String) -> Option<Symbol> {
    self
      .find_symbol_up_to_with_scope(name, |_| false)
      .map(|(_, symbol)| symbol)
  }
}

impl PartialEq for Scope {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

impl Eq for Scope {}

impl Debug for Scope {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    let data = self.data();
    f.debug_struct("Scope")
      .field("typ", &data.typ)
      .field("symbols", &data.symbol_declaration_order)
      .finish()
  }
}
