//! Picks the scope parameter name of a compiled program.

use crate::error::Result;
use crate::error::ScopedEvalError;
use ahash::HashSet;
use derive_visitor::Drive;
use derive_visitor::Visitor;
use scoped_parse::ast::expr::pat::ClassOrFuncName;
use scoped_parse::ast::expr::pat::IdPat;
use scoped_parse::ast::expr::IdExpr;
use scoped_parse::ast::node::Node;
use scoped_parse::ast::stx::TopLevel;

const LETTERS: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

type ClassOrFuncNameNode = Node<ClassOrFuncName>;
type IdExprNode = Node<IdExpr>;
type IdPatNode = Node<IdPat>;

#[derive(Default, Visitor)]
#[visitor(ClassOrFuncNameNode(enter), IdExprNode(enter), IdPatNode(enter))]
struct IdentifierCollector {
  names: HashSet<String>,
}

impl IdentifierCollector {
  fn enter_class_or_func_name_node(&mut self, node: &ClassOrFuncNameNode) {
    self.names.insert(node.stx.name.clone());
  }

  fn enter_id_expr_node(&mut self, node: &IdExprNode) {
    self.names.insert(node.stx.name.clone());
  }

  fn enter_id_pat_node(&mut self, node: &IdPatNode) {
    self.names.insert(node.stx.name.clone());
  }
}

/// Every identifier in the program, bound or free. Property names are not identifiers.
pub fn identifier_names(top_level_node: &Node<TopLevel>) -> HashSet<String> {
  let mut collector = IdentifierCollector::default();
  top_level_node.drive(&mut collector);
  collector.names
}

/// Candidates in allocation order: `a`..`z`, `aa`..`zz`, `$`, `_`.
pub fn candidates() -> impl Iterator<Item = String> {
  let single = LETTERS.iter().map(|&c| char::from(c).to_string());
  let double = LETTERS.iter().flat_map(|&c0| {
    LETTERS
      .iter()
      .map(move |&c1| [char::from(c0), char::from(c1)].iter().collect())
  });
  single
    .chain(double)
    .chain(["$", "_"].into_iter().map(String::from))
}

/// The first candidate not in `used`.
pub fn unused_name(used: &HashSet<String>) -> Result<String> {
  candidates()
    .find(|c| !used.contains(c))
    .ok_or(ScopedEvalError::NameAllocationExhausted)
}

pub fn allocate(top_level_node: &Node<TopLevel>) -> Result<String> {
  unused_name(&identifier_names(top_level_node))
}

#[cfg(test)]
mod tests {
  use super::allocate;
  use super::candidates;
  use super::unused_name;
  use crate::error::ScopedEvalError;
  use ahash::HashSet;
  use scoped_parse::parse;

  fn used(names: impl IntoIterator<Item = String>) -> HashSet<String> {
    names.into_iter().collect()
  }

  #[test]
  fn test_first_unused() {
    assert_eq!(unused_name(&HashSet::default()).unwrap(), "a");
    let abd = used(["a", "b", "d"].map(String::from));
    assert_eq!(unused_name(&abd).unwrap(), "c");

    let single = (b'a'..=b'z').map(|c| char::from(c).to_string());
    let a_prefixed = (b'a'..=b'z').map(|c| format!("a{}", char::from(c)));
    assert_eq!(unused_name(&used(single.chain(a_prefixed))).unwrap(), "ba");
  }

  #[test]
  fn test_exhaustion() {
    let letters: Vec<String> = candidates().take(26 + 26 * 26).collect();
    assert_eq!(letters.last().map(String::as_str), Some("zz"));
    assert_eq!(unused_name(&used(letters.clone())).unwrap(), "$");

    let mut all = used(letters);
    all.insert("$".to_string());
    assert_eq!(unused_name(&all).unwrap(), "_");
    all.insert("_".to_string());
    let err = unused_name(&all).unwrap_err();
    assert!(matches!(err, ScopedEvalError::NameAllocationExhausted));
    assert!(err.to_string().starts_with("I gave up"));
  }

  #[test]
  fn test_bound_and_free_names_are_used() {
    let top = parse("var a = 1; a + b").unwrap();
    assert_eq!(allocate(&top).unwrap(), "c");
    let top = parse("function a(b) { return c; } a()").unwrap();
    assert_eq!(allocate(&top).unwrap(), "d");
    // Property names never collide with a parameter.
    let top = parse("x.a.b; ({ a: 1, c: 2 })").unwrap();
    assert_eq!(allocate(&top).unwrap(), "a");
    let top = parse("try {} catch (a) {} [b, ...c] = d").unwrap();
    assert_eq!(allocate(&top).unwrap(), "e");
  }
}
