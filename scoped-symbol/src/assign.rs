use crate::globals::ReferenceTable;
use derive_visitor::Drive;
use derive_visitor::Visitor;
use scoped_parse::ast::expr::BinaryExpr;
use scoped_parse::ast::expr::Expr;
use scoped_parse::ast::node::Node;
use scoped_parse::ast::stx::TopLevel;
use scoped_parse::loc::Loc;
use scoped_parse::operator::OperatorName;

/// A free name directly on the left of `=` or a compound assignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssignmentTarget {
  pub name: String,
  pub loc: Loc,
  pub operator: OperatorName,
  pub rhs: Loc,
}

type BinaryExprNode = Node<BinaryExpr>;

#[derive(Default, Visitor)]
#[visitor(BinaryExprNode(enter))]
struct AssignmentVisitor {
  candidates: Vec<AssignmentTarget>,
}

impl AssignmentVisitor {
  fn enter_binary_expr_node(&mut self, node: &BinaryExprNode) {
    let BinaryExpr {
      operator,
      left,
      right,
    } = node.stx.as_ref();
    if !operator.is_assignment() {
      return;
    };
    // Targets nested in destructuring patterns are plain reads for rewriting purposes.
    if let Expr::IdPat(id) = left.stx.as_ref() {
      self.candidates.push(AssignmentTarget {
        name: id.stx.name.clone(),
        loc: left.loc,
        operator: *operator,
        rhs: right.loc,
      });
    };
  }
}

/// Finds assignments to free names, moving their ranges from the reads to the writes of `table`.
/// Assignments to locally declared names are skipped since they are not in the table.
pub fn classify_assignments(
  top_level_node: &Node<TopLevel>,
  table: &mut ReferenceTable,
) -> Vec<AssignmentTarget> {
  let mut visitor = AssignmentVisitor::default();
  top_level_node.drive(&mut visitor);
  let mut targets: Vec<AssignmentTarget> = visitor
    .candidates
    .into_iter()
    .filter(|t| table.move_to_writes(&t.name, t.loc))
    .collect();
  targets.sort_by_key(|t| t.loc);
  targets
}

#[cfg(test)]
mod tests {
  use super::classify_assignments;
  use crate::compute_symbols;
  use crate::globals::GlobalReferences;
  use scoped_parse::loc::Loc;
  use scoped_parse::operator::OperatorName;
  use scoped_parse::parse;

  #[test]
  fn test_classify_assignments() {
    let source = "a = 1; b <<= a | c; let d; d = 2; [e] = f; g.h = 3; a ??= (i = 4)";
    let mut top = parse(source).unwrap();
    compute_symbols(&mut top);
    let mut table = GlobalReferences::extract(&top, &Default::default());
    let targets = classify_assignments(&top, &mut table);

    let summary: Vec<_> = targets
      .iter()
      .map(|t| (t.name.as_str(), t.operator, &source[t.rhs.0..t.rhs.1]))
      .collect();
    assert_eq!(summary, vec![
      ("a", OperatorName::Assignment, "1"),
      ("b", OperatorName::AssignmentBitwiseLeftShift, "a | c"),
      ("a", OperatorName::AssignmentNullishCoalescing, "i = 4"),
      ("i", OperatorName::Assignment, "4"),
    ]);

    assert_eq!(table.writes("a"), &[Loc(0, 1), Loc(52, 53)]);
    assert_eq!(table.get("a").unwrap(), &[Loc(13, 14)]);
    // Destructuring targets stay reads.
    assert_eq!(table.get("e").unwrap(), &[Loc(35, 36)]);
    assert!(table.writes("e").is_empty());
    assert!(!table.contains("d"));
  }
}
