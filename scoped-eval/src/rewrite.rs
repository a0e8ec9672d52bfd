//! Positional source edits, applied in one left-to-right sweep.

use scoped_parse::loc::Loc;
use scoped_symbol::globals::ReferenceTable;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Edit {
  Insert(usize, String),
  Replace(Loc, String),
}

impl Edit {
  fn start(&self) -> usize {
    match self {
      Edit::Insert(at, _) => *at,
      Edit::Replace(loc, _) => loc.start(),
    }
  }

  fn end(&self) -> usize {
    match self {
      Edit::Insert(at, _) => *at,
      Edit::Replace(loc, _) => loc.end(),
    }
  }

  fn text(&self) -> &str {
    match self {
      Edit::Insert(_, text) | Edit::Replace(_, text) => text,
    }
  }
}

/// Collects edits against a source text. Edits at the same position are emitted in the order they
/// were added; edits at different positions in position order.
pub struct CodeRewriter<'a> {
  source: &'a str,
  edits: Vec<Edit>,
}

impl<'a> CodeRewriter<'a> {
  pub fn new(source: &'a str) -> CodeRewriter<'a> {
    CodeRewriter {
      source,
      edits: Vec::new(),
    }
  }

  pub fn insert(&mut self, at: usize, text: impl Into<String>) {
    self.edits.push(Edit::Insert(at, text.into()));
  }

  pub fn replace(&mut self, loc: Loc, text: impl Into<String>) {
    self.edits.push(Edit::Replace(loc, text.into()));
  }

  pub fn edits(&self) -> &[Edit] {
    &self.edits
  }

  pub fn is_empty(&self) -> bool {
    self.edits.is_empty()
  }

  /// Applies every edit. An edit overlapping text already replaced by an earlier one is dropped.
  pub fn finish(mut self) -> String {
    // Stable, so same-position edits keep submission order.
    self.edits.sort_by_key(Edit::start);
    let added: usize = self.edits.iter().map(|e| e.text().len()).sum();
    let mut out = String::with_capacity(self.source.len() + added);
    let mut cursor = 0;
    for edit in &self.edits {
      let (start, end) = (edit.start(), edit.end());
      if start < cursor || end > self.source.len() {
        tracing::warn!(?edit, "dropping overlapping or out of range edit");
        continue;
      };
      out.push_str(&self.source[cursor..start]);
      out.push_str(edit.text());
      cursor = end;
    }
    out.push_str(&self.source[cursor..]);
    out
  }
}

/// Routes every free name through the scope parameter: `name` becomes `param.name`, and object
/// shorthand `{name}` becomes `{name: param.name}`. Write ranges get the same prefix, so the
/// assignment operator stays in place and is applied by the scope at run time.
pub fn route_free_names(rewriter: &mut CodeRewriter, references: &ReferenceTable, param: &str) {
  for (loc, name) in references.occurrences() {
    if references.is_shorthand(loc) {
      rewriter.replace(loc, format!("{name}: {param}.{name}"));
    } else {
      rewriter.insert(loc.start(), format!("{param}."));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::route_free_names;
  use super::CodeRewriter;
  use scoped_parse::loc::Loc;
  use scoped_parse::parse;
  use scoped_symbol::assign::classify_assignments;
  use scoped_symbol::compute_symbols;
  use scoped_symbol::globals::AllowedGlobals;
  use scoped_symbol::globals::GlobalReferences;

  #[test]
  fn test_inserts() {
    let mut m = CodeRewriter::new("foo bar foo");
    m.insert(0, "this.");
    m.insert(8, "return ");
    m.insert(8, "this.");
    m.insert(4, "this.");
    assert_eq!(m.finish(), "this.foo this.bar return this.foo");

    let mut m = CodeRewriter::new("a <<= a | b");
    m.insert(0, "return ");
    m.insert(0, "this.");
    m.insert(6, "this.");
    m.insert(10, "this.");
    assert_eq!(m.finish(), "return this.a <<= this.a | this.b");
  }

  #[test]
  fn test_replace_and_insert() {
    let mut m = CodeRewriter::new("({a, b: c})");
    m.replace(Loc(2, 3), "a: p.a");
    m.insert(8, "p.");
    m.insert(0, "return ");
    assert_eq!(m.finish(), "return ({a: p.a, b: p.c})");
    assert!(CodeRewriter::new("x").is_empty());
    assert_eq!(CodeRewriter::new("unchanged").finish(), "unchanged");
  }

  #[test]
  fn test_route_free_names() {
    let source = "let x = {a}; b = a + x.c; ({d} = e);";
    let mut top = parse(source).unwrap();
    compute_symbols(&mut top);
    let mut table = GlobalReferences::extract(&top, &AllowedGlobals::new());
    classify_assignments(&top, &mut table);
    let mut m = CodeRewriter::new(source);
    route_free_names(&mut m, &table, "p");
    assert_eq!(
      m.finish(),
      "let x = {a: p.a}; p.b = p.a + x.c; ({d: p.d} = p.e);"
    );
  }
}
