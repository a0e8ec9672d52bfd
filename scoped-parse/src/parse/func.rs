use super::ParseCtx;
use super::Parser;
use crate::ast::func::Func;
use crate::ast::func::FuncBody;
use crate::ast::node::Node;
use crate::ast::stmt::decl::ParamDecl;
use crate::ast::stmt::Stmt;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::token::TT;

impl<'a> Parser<'a> {
  pub fn func_params(&mut self, ctx: ParseCtx) -> SyntaxResult<Vec<Node<ParamDecl>>> {
    self.require(TT::ParenthesisOpen)?;
    let params = self.list_with_loc(TT::Comma, TT::ParenthesisClose, |p| {
      let rest = p.consume_if(TT::DotDotDot).is_match();
      let pattern = p.pat_decl(ctx)?;
      let default_value = p
        .consume_if(TT::Equals)
        .and_then(|| p.expr(ctx, [TT::Comma, TT::ParenthesisClose]))?;
      Ok(ParamDecl {
        rest,
        pattern,
        default_value,
      })
    })?;
    // A rest parameter must be last.
    if let Some(misplaced) = params.iter().rev().skip(1).find(|p| p.stx.rest) {
      return Err(misplaced.error(SyntaxErrorType::ExpectedSyntax("rest parameter last")));
    };
    Ok(params)
  }

  /// Parses `{ ... }` as a function body. Jump targets outside the function are not visible inside.
  pub fn func_block_body(&mut self, ctx: ParseCtx) -> SyntaxResult<Vec<Node<Stmt>>> {
    self.require(TT::BraceOpen)?;
    let labels = std::mem::take(&mut self.labels);
    let body = self.stmts(ctx.for_function_body(), TT::BraceClose);
    self.labels = labels;
    let body = body?;
    self.require(TT::BraceClose)?;
    Ok(body)
  }

  /// Parses parameters and a block body into a non-arrow function.
  pub fn func(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Func>> {
    self.with_loc(|p| {
      let parameters = p.func_params(ctx)?;
      let body = FuncBody::Block(p.func_block_body(ctx)?);
      Ok(Func {
        arrow: false,
        parameters,
        body,
      })
    })
  }
}
