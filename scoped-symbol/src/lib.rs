use derive_visitor::DriveMut;
use scoped_parse::ast::node::Node;
use scoped_parse::ast::stx::TopLevel;
use symbol::Scope;
use symbol::ScopeType;
use symbol::SymbolGenerator;
use visitor::DeclVisitor;

pub mod assign;
pub mod globals;
pub mod symbol;
pub mod visitor;

/// Builds the scope tree of a program and attaches the enclosing Scope to every node.
/// The program body is treated as a function body, so its declarations are local.
pub fn compute_symbols(top_level_node: &mut Node<TopLevel>) -> Scope {
  let top_level_scope = Scope::new(SymbolGenerator::new(), None, ScopeType::Global);
  let mut visitor = DeclVisitor::new(top_level_scope.clone());
  top_level_node.drive_mut(&mut visitor);
  top_level_scope
}

#[cfg(test)]
mod tests {
  use super::compute_symbols;
  use crate::symbol::ScopeType;
  use scoped_parse::parse;

  #[test]
  fn test_scope_tree() {
    let mut top = parse(
      r#"
        var a = 1;
        let b;
        function f(c, { d, e: [g] }, ...h) {
          var i;
          { let j; var k; }
        }
        const m = function named(n) {};
        try {} catch (err) {}
        for (let q of r) {}
      "#,
    )
    .unwrap();
    let root = compute_symbols(&mut top);
    assert_eq!(root.typ(), ScopeType::Global);
    assert_eq!(root.symbol_names(), vec!["a", "b", "f", "m"]);

    let children = root.children();
    // f, the named function expression, the try block, the catch block, the for-of head.
    assert_eq!(children.len(), 5);

    let f = &children[0];
    assert_eq!(f.typ(), ScopeType::NonArrowFunction);
    assert_eq!(f.symbol_names(), vec![
      "arguments", "c", "d", "g", "h", "i", "k"
    ]);
    assert_eq!(f.children()[0].symbol_names(), vec!["j"]);

    let named = &children[1];
    assert_eq!(named.symbol_names(), vec!["named"]);
    assert_eq!(named.children()[0].symbol_names(), vec!["arguments", "n"]);

    assert_eq!(children[3].symbol_names(), vec!["err"]);
    assert_eq!(children[4].symbol_names(), vec!["q"]);
    assert!(root.find_symbol("q".into()).is_none());
  }

  #[test]
  fn test_default_values_do_not_declare() {
    let mut top = parse("let { a = (b = 1) } = c; (x = y) => x;").unwrap();
    let root = compute_symbols(&mut top);
    assert_eq!(root.symbol_names(), vec!["a"]);
    let arrow = &root.children()[0];
    assert_eq!(arrow.typ(), ScopeType::ArrowFunction);
    assert_eq!(arrow.symbol_names(), vec!["x"]);
  }
}
