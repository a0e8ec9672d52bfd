use super::super::ParseCtx;
use super::super::Parser;
use crate::ast::node::Node;
use crate::ast::stmt::decl::FuncDecl;
use crate::ast::stmt::decl::PatDecl;
use crate::ast::stmt::decl::VarDecl;
use crate::ast::stmt::decl::VarDeclMode;
use crate::ast::stmt::decl::VarDeclarator;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::parse::expr::Asi;
use crate::token::TT;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum VarDeclParseMode {
  // Standard parsing mode for var/let/const statement.
  Asi,
  // Parse as many valid declarators as possible, then break before the first invalid token (i.e. not a comma). Used by for-loop parser.
  Leftmost,
}

impl<'a> Parser<'a> {
  pub fn pat_decl(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<PatDecl>> {
    self.with_loc(|p| {
      let pat = p.pat(ctx)?;
      Ok(PatDecl { pat })
    })
  }

  pub fn var_decl_mode(&mut self) -> SyntaxResult<VarDeclMode> {
    let t = self.consume();
    Ok(match t.typ {
      TT::KeywordLet => VarDeclMode::Let,
      TT::KeywordConst => VarDeclMode::Const,
      TT::KeywordVar => VarDeclMode::Var,
      _ => return Err(t.error(SyntaxErrorType::ExpectedSyntax("variable declaration"))),
    })
  }

  /// Parses a variable declaration, which contains one or more declarators, each with an optional initializer. Examples of variable declarations:
  /// - `const a = 1`
  /// - `let a, b = 2, c`
  /// - `var { x, y: [z] } = obj`
  pub fn var_decl(
    &mut self,
    ctx: ParseCtx,
    parse_mode: VarDeclParseMode,
  ) -> SyntaxResult<Node<VarDecl>> {
    self.with_loc(|p| {
      let mode = p.var_decl_mode()?;
      let mut declarators = Vec::new();
      loop {
        let pattern = p.pat_decl(ctx)?;
        let mut asi = match parse_mode {
          VarDeclParseMode::Asi => Asi::can(),
          VarDeclParseMode::Leftmost => Asi::no(),
        };
        let initializer = p.consume_if(TT::Equals).and_then(|| match parse_mode {
          VarDeclParseMode::Asi => p.expr_with_asi(ctx, [TT::Semicolon, TT::Comma], &mut asi),
          // `in` is never a binary operator in a `for` head.
          VarDeclParseMode::Leftmost => {
            p.expr_with_asi(ctx, [TT::Semicolon, TT::Comma, TT::KeywordIn], &mut asi)
          }
        })?;
        declarators.push(VarDeclarator {
          pattern,
          initializer,
        });
        match parse_mode {
          VarDeclParseMode::Asi => {
            if p.consume_if(TT::Semicolon).is_match() || asi.did_end_with_asi {
              break;
            }
            let t = p.peek();
            if t.typ == TT::EOF
              || t.typ == TT::BraceClose
              || (t.preceded_by_line_terminator && t.typ != TT::Comma)
            {
              break;
            };
            p.require(TT::Comma)?;
          }
          VarDeclParseMode::Leftmost => {
            if !p.consume_if(TT::Comma).is_match() {
              break;
            }
          }
        }
      }
      Ok(VarDecl { mode, declarators })
    })
  }

  pub fn func_decl(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<FuncDecl>> {
    self.with_loc(|p| {
      let start = p.require(TT::KeywordFunction)?;
      if let Some(loc) = p.consume_if(TT::Asterisk).match_loc() {
        return Err(loc.error(SyntaxErrorType::Unsupported("generator function"), None));
      };
      let name = p
        .maybe_class_or_func_name()
        .ok_or_else(|| start.error(SyntaxErrorType::ExpectedSyntax("function name")))?;
      let function = p.func(ctx)?;
      Ok(FuncDecl { name, function })
    })
  }
}
