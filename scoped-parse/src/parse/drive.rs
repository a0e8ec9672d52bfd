use super::Parser;
use crate::ast::node::Node;
use crate::error::SyntaxResult;
use crate::token::TT;
use derive_visitor::Drive;
use derive_visitor::DriveMut;

impl<'a> Parser<'a> {
  /// Runs `f` and wraps its syntax in a Node spanning every token it consumed.
  pub fn with_loc<S: Drive + DriveMut, F>(&mut self, f: F) -> SyntaxResult<Node<S>>
  where
    F: FnOnce(&mut Self) -> SyntaxResult<S>,
  {
    let start = self.checkpoint();
    let stx = f(self)?;
    Ok(Node::new(self.since_checkpoint(&start), stx))
  }

  pub fn repeat_until_tt<S, F>(&mut self, tt: TT, f: F) -> SyntaxResult<Vec<S>>
  where
    F: Fn(&mut Self) -> SyntaxResult<S>,
  {
    let mut nodes = Vec::new();
    while self.peek().typ != tt {
      nodes.push(f(self)?);
    }
    Ok(nodes)
  }

  /// Parse a list of items separated by `delim` until `close`, which will also be consumed.
  /// Allows for a trailing delimiter.
  pub fn list_with_loc<S: Drive + DriveMut, F>(
    &mut self,
    delim: TT,
    close: TT,
    f: F,
  ) -> SyntaxResult<Vec<Node<S>>>
  where
    F: Fn(&mut Self) -> SyntaxResult<S>,
  {
    let mut nodes = Vec::new();
    while !self.consume_if(close).is_match() {
      nodes.push(self.with_loc(&f)?);
      // Either the delimiter (possibly trailing) or the close token must follow.
      if !self.consume_if(delim).is_match() {
        self.require(close)?;
        break;
      }
    }
    Ok(nodes)
  }

  /// Drives the parser with the closure and returns what it returns, undoing its changes if it returns None.
  pub fn rewindable<S, F>(&mut self, f: F) -> SyntaxResult<Option<S>>
  where
    F: FnOnce(&mut Self) -> SyntaxResult<Option<S>>,
  {
    let checkpoint = self.checkpoint();
    let stx = f(self)?;
    if stx.is_none() {
      self.restore_checkpoint(checkpoint);
    };
    Ok(stx)
  }
}
