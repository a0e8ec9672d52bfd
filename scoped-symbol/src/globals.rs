use crate::symbol::Scope;
use ahash::HashSet;
use derive_visitor::Drive;
use derive_visitor::Visitor;
use indexmap::IndexMap;
use scoped_parse::ast::expr::pat::IdPat;
use scoped_parse::ast::expr::pat::ObjPatProp;
use scoped_parse::ast::expr::Expr;
use scoped_parse::ast::expr::IdExpr;
use scoped_parse::ast::node::Node;
use scoped_parse::ast::obj::ObjMember;
use scoped_parse::ast::obj::ObjMemberType;
use scoped_parse::ast::stmt::decl::PatDecl;
use scoped_parse::ast::stx::TopLevel;
use scoped_parse::loc::Loc;
use std::collections::BTreeSet;

/// Names that always resolve to the host environment instead of the scope object.
/// Ordered, so that hashing the set is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AllowedGlobals(BTreeSet<String>);

impl AllowedGlobals {
  pub fn new() -> AllowedGlobals {
    AllowedGlobals::default()
  }

  /// Returns false if the name was already allowed.
  pub fn insert(&mut self, name: impl Into<String>) -> bool {
    self.0.insert(name.into())
  }

  pub fn contains(&self, name: &str) -> bool {
    self.0.contains(name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl<S: Into<String>> FromIterator<S> for AllowedGlobals {
  fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
    AllowedGlobals(iter.into_iter().map(Into::into).collect())
  }
}

impl<S: Into<String>> Extend<S> for AllowedGlobals {
  fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
    self.0.extend(iter.into_iter().map(Into::into));
  }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameReferences {
  pub reads: Vec<Loc>,
  pub writes: Vec<Loc>,
}

/// Every free occurrence of every free name, keyed by name in order of first occurrence.
#[derive(Clone, Debug, Default)]
pub struct ReferenceTable {
  names: IndexMap<String, NameReferences>,
  // Occurrences written as object shorthand (`{a}`, `{a} = o`), where the name is also the key.
  shorthand: HashSet<Loc>,
}

impl ReferenceTable {
  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.names.contains_key(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.names.keys().map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &NameReferences)> {
    self.names.iter().map(|(k, v)| (k.as_str(), v))
  }

  /// Read ranges of `name`, in source order.
  pub fn get(&self, name: &str) -> Option<&[Loc]> {
    self.names.get(name).map(|r| r.reads.as_slice())
  }

  pub fn writes(&self, name: &str) -> &[Loc] {
    self
      .names
      .get(name)
      .map(|r| r.writes.as_slice())
      .unwrap_or_default()
  }

  pub fn is_shorthand(&self, loc: Loc) -> bool {
    self.shorthand.contains(&loc)
  }

  /// Every read and write range with its name, in source order.
  pub fn occurrences(&self) -> Vec<(Loc, &str)> {
    let mut all: Vec<(Loc, &str)> = self
      .names
      .iter()
      .flat_map(|(name, refs)| {
        refs
          .reads
          .iter()
          .chain(refs.writes.iter())
          .map(move |loc| (*loc, name.as_str()))
      })
      .collect();
    all.sort();
    all
  }

  /// Reclassifies a read range as a write. Returns false if it wasn't a read of `name`.
  pub fn move_to_writes(&mut self, name: &str, loc: Loc) -> bool {
    let Some(refs) = self.names.get_mut(name) else {
      return false;
    };
    let Ok(i) = refs.reads.binary_search(&loc) else {
      return false;
    };
    refs.reads.remove(i);
    let j = refs.writes.binary_search(&loc).unwrap_or_else(|j| j);
    refs.writes.insert(j, loc);
    true
  }

  fn record(&mut self, name: String, loc: Loc) {
    self.names.entry(name).or_default().reads.push(loc);
  }

  fn finish(&mut self) {
    for refs in self.names.values_mut() {
      refs.reads.sort();
      refs.reads.dedup();
    }
    self
      .names
      .sort_by(|_, a, _, b| a.reads.first().cmp(&b.reads.first()));
  }
}

type ExprNode = Node<Expr>;
type IdExprNode = Node<IdExpr>;
type IdPatNode = Node<IdPat>;
type ObjMemberNode = Node<ObjMember>;
type ObjPatPropNode = Node<ObjPatProp>;
type PatDeclNode = Node<PatDecl>;

#[derive(Default, Visitor)]
#[visitor(
  ExprNode,
  IdExprNode(enter),
  IdPatNode(enter),
  ObjMemberNode(enter),
  ObjPatPropNode(enter),
  PatDeclNode
)]
struct UnresolvedVisitor {
  unresolved: Vec<(String, Loc)>,
  shorthand: HashSet<Loc>,
  in_pat_decl_stack: Vec<bool>,
}

impl UnresolvedVisitor {
  fn usage(&mut self, name: &str, loc: Loc, scope: Option<&Scope>) {
    // A node without a scope was never analyzed, so nothing can be known to declare it.
    let declared = scope.is_some_and(|s| s.find_symbol(name.to_string()).is_some());
    if !declared {
      self.unresolved.push((name.to_string(), loc));
    };
  }

  fn enter_expr_node(&mut self, _node: &ExprNode) {
    self.in_pat_decl_stack.push(false);
  }

  fn exit_expr_node(&mut self, _node: &ExprNode) {
    self.in_pat_decl_stack.pop();
  }

  fn enter_id_expr_node(&mut self, node: &IdExprNode) {
    self.usage(&node.stx.name, node.loc, node.assoc.get::<Scope>());
  }

  fn enter_id_pat_node(&mut self, node: &IdPatNode) {
    // Declarations are not usages; assignment targets are.
    if !self.in_pat_decl_stack.last().copied().unwrap_or(false) {
      self.usage(&node.stx.name, node.loc, node.assoc.get::<Scope>());
    };
  }

  fn enter_obj_member_node(&mut self, node: &ObjMemberNode) {
    if let ObjMemberType::Shorthand { id } = &node.stx.typ {
      self.shorthand.insert(id.loc);
    };
  }

  fn enter_obj_pat_prop_node(&mut self, node: &ObjPatPropNode) {
    if node.stx.shorthand {
      self.shorthand.insert(node.stx.target.loc);
    };
  }

  fn enter_pat_decl_node(&mut self, _node: &PatDeclNode) {
    self.in_pat_decl_stack.push(true);
  }

  fn exit_pat_decl_node(&mut self, _node: &PatDeclNode) {
    self.in_pat_decl_stack.pop();
  }
}

pub struct GlobalReferences;

impl GlobalReferences {
  /// Collects every identifier usage that no enclosing scope declares and that is not allowed.
  /// `compute_symbols` must have been run on the tree first.
  pub fn extract(top_level_node: &Node<TopLevel>, allowed: &AllowedGlobals) -> ReferenceTable {
    let mut visitor = UnresolvedVisitor::default();
    top_level_node.drive(&mut visitor);
    let mut table = ReferenceTable::default();
    for (name, loc) in visitor.unresolved {
      if !allowed.contains(&name) {
        table.record(name, loc);
      };
    }
    table.shorthand = visitor.shorthand;
    table.finish();
    table
  }
}

#[cfg(test)]
mod tests {
  use super::AllowedGlobals;
  use super::GlobalReferences;
  use super::ReferenceTable;
  use crate::compute_symbols;
  use scoped_parse::loc::Loc;
  use scoped_parse::parse;

  fn extract(source: &str, allowed: &[&str]) -> ReferenceTable {
    let mut top = parse(source).unwrap();
    compute_symbols(&mut top);
    GlobalReferences::extract(&top, &allowed.iter().copied().collect())
  }

  fn names(table: &ReferenceTable) -> Vec<&str> {
    table.names().collect()
  }

  #[test]
  fn test_reads_in_source_order() {
    let t = extract("typeof foo; foo; bar(foo)", &[]);
    assert_eq!(names(&t), vec!["foo", "bar"]);
    assert_eq!(t.get("foo").unwrap(), &[Loc(7, 10), Loc(12, 15), Loc(21, 24)]);
    assert_eq!(t.get("bar").unwrap(), &[Loc(17, 20)]);
  }

  #[test]
  fn test_local_declarations_shadow() {
    let t = extract("let b = a + 1; b;", &[]);
    assert_eq!(names(&t), vec!["a"]);

    let t = extract("a.map(i => '#' + i).join(',')", &[]);
    assert_eq!(names(&t), vec!["a"]);

    let t = extract("function f(x) { var y = x; return z + y + f; }", &[]);
    assert_eq!(names(&t), vec!["z"]);

    let t = extract("{ let a; } a", &[]);
    assert_eq!(t.get("a").unwrap(), &[Loc(11, 12)]);

    let t = extract("for (let i = 0; i < n; i++) {} i", &[]);
    assert_eq!(names(&t), vec!["n", "i"]);
    assert_eq!(t.get("i").unwrap(), &[Loc(31, 32)]);

    let t = extract("try {} catch (e) { e } e", &[]);
    assert_eq!(t.get("e").unwrap(), &[Loc(23, 24)]);

    let t = extract("(function g() { g; arguments; })(); g", &[]);
    assert_eq!(names(&t), vec!["g"]);
    assert_eq!(t.get("g").unwrap(), &[Loc(36, 37)]);
  }

  #[test]
  fn test_allowed_globals() {
    let t = extract("a = undefined", &[]);
    assert_eq!(names(&t), vec!["a", "undefined"]);

    let t = extract("a = undefined; Math.max(a, b)", &["undefined", "Math"]);
    assert_eq!(names(&t), vec!["a", "b"]);
  }

  #[test]
  fn test_property_names_are_not_references() {
    let t = extract("o.a; o['b']; ({ c: d, [e]: 1, 'f': 2 })", &[]);
    assert_eq!(names(&t), vec!["o", "d", "e"]);
  }

  #[test]
  fn test_assignment_targets_and_shorthand() {
    let t = extract("[x, ...y] = z; ({ w } = v); ({ u })", &[]);
    assert_eq!(names(&t), vec!["x", "y", "z", "w", "v", "u"]);
    let w = t.get("w").unwrap()[0];
    let u = t.get("u").unwrap()[0];
    assert!(t.is_shorthand(w));
    assert!(t.is_shorthand(u));
    assert!(!t.is_shorthand(t.get("x").unwrap()[0]));
  }

  #[test]
  fn test_default_values_are_usages() {
    let t = extract("const { a = b } = c; function f(x = y) {}", &[]);
    assert_eq!(names(&t), vec!["b", "c", "y"]);
  }

  #[test]
  fn test_allowed_globals_set() {
    let mut allowed: AllowedGlobals = ["JSON"].into_iter().collect();
    assert!(allowed.insert("Math"));
    assert!(!allowed.insert("Math"));
    assert_eq!(allowed.iter().collect::<Vec<_>>(), vec!["JSON", "Math"]);
  }

  #[test]
  fn test_move_to_writes() {
    let mut t = extract("a = a + 1", &[]);
    assert!(t.move_to_writes("a", Loc(0, 1)));
    assert!(!t.move_to_writes("a", Loc(0, 1)));
    assert_eq!(t.get("a").unwrap(), &[Loc(4, 5)]);
    assert_eq!(t.writes("a"), &[Loc(0, 1)]);
    assert_eq!(t.occurrences(), vec![(Loc(0, 1), "a"), (Loc(4, 5), "a")]);
  }
}
