pub mod decl;

use super::expr::pat::is_valid_pattern_identifier;
use super::expr::util::lhs_expr_to_assign_target;
use super::expr::Asi;
use super::ParseCtx;
use super::Parser;
use crate::ast::node::Node;
use crate::ast::stmt::BlockStmt;
use crate::ast::stmt::BreakStmt;
use crate::ast::stmt::CatchBlock;
use crate::ast::stmt::ContinueStmt;
use crate::ast::stmt::DoWhileStmt;
use crate::ast::stmt::EmptyStmt;
use crate::ast::stmt::ExprStmt;
use crate::ast::stmt::ForBody;
use crate::ast::stmt::ForInOfLhs;
use crate::ast::stmt::ForInStmt;
use crate::ast::stmt::ForOfStmt;
use crate::ast::stmt::ForTripleStmt;
use crate::ast::stmt::ForTripleStmtInit;
use crate::ast::stmt::IfStmt;
use crate::ast::stmt::LabelStmt;
use crate::ast::stmt::ReturnStmt;
use crate::ast::stmt::Stmt;
use crate::ast::stmt::SwitchBranch;
use crate::ast::stmt::SwitchStmt;
use crate::ast::stmt::ThrowStmt;
use crate::ast::stmt::TryStmt;
use crate::ast::stmt::WhileStmt;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::operator::OperatorName;
use crate::token::TT;
use decl::VarDeclParseMode;

impl<'a> Parser<'a> {
  pub fn stmts(&mut self, ctx: ParseCtx, end: TT) -> SyntaxResult<Vec<Node<Stmt>>> {
    self.repeat_until_tt(end, |p| p.stmt(ctx))
  }

  pub fn stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    self.nested(|p| p.stmt_unguarded(ctx))
  }

  fn stmt_unguarded(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    let [t0, t1] = self.peek_n();
    let is_let_decl = t0.typ == TT::KeywordLet
      && (t1.typ == TT::BraceOpen
        || t1.typ == TT::BracketOpen
        || is_valid_pattern_identifier(t1.typ));
    #[rustfmt::skip]
    let stmt: Node<Stmt> = match t0.typ {
      TT::BraceOpen => self.block_stmt(ctx)?.into_wrapped(),
      TT::KeywordBreak => self.break_stmt(ctx)?.into_wrapped(),
      TT::KeywordConst | TT::KeywordVar => self.var_decl(ctx, VarDeclParseMode::Asi)?.into_wrapped(),
      TT::KeywordLet if is_let_decl => self.var_decl(ctx, VarDeclParseMode::Asi)?.into_wrapped(),
      TT::KeywordContinue => self.continue_stmt(ctx)?.into_wrapped(),
      TT::KeywordDebugger => self.debugger_stmt()?.into_wrapped(),
      TT::KeywordDo => self.do_while_stmt(ctx)?.into_wrapped(),
      TT::KeywordFor => self.for_stmt(ctx)?,
      TT::KeywordAsync if t1.typ == TT::KeywordFunction && !t1.preceded_by_line_terminator => {
        return Err(t0.error(SyntaxErrorType::Unsupported("async function")));
      }
      TT::KeywordFunction => self.func_decl(ctx)?.into_wrapped(),
      TT::KeywordIf => self.if_stmt(ctx)?.into_wrapped(),
      TT::KeywordImport if t1.typ != TT::ParenthesisOpen => return Err(t0.error(SyntaxErrorType::Unsupported("module syntax"))),
      TT::KeywordExport => return Err(t0.error(SyntaxErrorType::Unsupported("module syntax"))),
      TT::KeywordClass => return Err(t0.error(SyntaxErrorType::Unsupported("class"))),
      TT::KeywordWith => return Err(t0.error(SyntaxErrorType::Unsupported("with statement"))),
      TT::KeywordReturn => self.return_stmt(ctx)?.into_wrapped(),
      TT::KeywordSwitch => self.switch_stmt(ctx)?.into_wrapped(),
      TT::KeywordThrow => self.throw_stmt(ctx)?.into_wrapped(),
      TT::KeywordTry => self.try_stmt(ctx)?.into_wrapped(),
      TT::KeywordWhile => self.while_stmt(ctx)?.into_wrapped(),
      TT::Semicolon => self.empty_stmt()?.into_wrapped(),
      t if is_valid_pattern_identifier(t) && t1.typ == TT::Colon => self.label_stmt(ctx)?.into_wrapped(),
      _ => self.expr_stmt(ctx)?.into_wrapped(),
    };
    Ok(stmt)
  }

  pub fn label_stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<LabelStmt>> {
    self.with_loc(|p| {
      let label_name = p.consume_as_string();
      p.require(TT::Colon)?;
      p.labels.push(label_name.clone());
      let statement = p.stmt(ctx);
      p.labels.pop();
      Ok(LabelStmt {
        name: label_name,
        statement: statement?,
      })
    })
  }

  pub fn empty_stmt(&mut self) -> SyntaxResult<Node<EmptyStmt>> {
    self.with_loc(|p| p.require(TT::Semicolon).map(|_| EmptyStmt {}))
  }

  // There is nothing to pause, so `debugger;` is an empty statement.
  pub fn debugger_stmt(&mut self) -> SyntaxResult<Node<EmptyStmt>> {
    self.with_loc(|p| {
      p.require(TT::KeywordDebugger)?;
      p.consume_if(TT::Semicolon);
      Ok(EmptyStmt {})
    })
  }

  pub fn block_stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<BlockStmt>> {
    self.with_loc(|p| {
      p.require(TT::BraceOpen)?;
      let body = p.stmts(ctx, TT::BraceClose)?;
      p.require(TT::BraceClose)?;
      Ok(BlockStmt { body })
    })
  }

  fn break_or_continue_label(&mut self) -> SyntaxResult<Option<String>> {
    let t = self.peek();
    let label = if is_valid_pattern_identifier(t.typ) && !t.preceded_by_line_terminator {
      let name = self.consume_as_string();
      if !self.labels.contains(&name) {
        return Err(t.error(SyntaxErrorType::IllegalJump("undefined label")));
      };
      self.consume_if(TT::Semicolon);
      Some(name)
    } else if t.typ == TT::Semicolon {
      self.consume();
      None
    } else if t.preceded_by_line_terminator || t.typ == TT::BraceClose || t.typ == TT::EOF {
      // ASI.
      None
    } else {
      return Err(t.error(SyntaxErrorType::ExpectedSyntax("label")));
    };
    Ok(label)
  }

  pub fn break_stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<BreakStmt>> {
    self.with_loc(|p| {
      let start = p.require(TT::KeywordBreak)?;
      let label = p.break_or_continue_label()?;
      if label.is_none() && !ctx.breakable {
        return Err(start.error(SyntaxErrorType::IllegalJump("break outside of loop or switch")));
      };
      Ok(BreakStmt { label })
    })
  }

  pub fn continue_stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<ContinueStmt>> {
    self.with_loc(|p| {
      let start = p.require(TT::KeywordContinue)?;
      let label = p.break_or_continue_label()?;
      if !ctx.continuable {
        return Err(start.error(SyntaxErrorType::IllegalJump("continue outside of loop")));
      };
      Ok(ContinueStmt { label })
    })
  }

  pub fn expr_stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<ExprStmt>> {
    self.with_loc(|p| {
      let mut asi = Asi::can();
      let expr = p.expr_with_asi(ctx, [TT::Semicolon], &mut asi)?;
      if !asi.did_end_with_asi {
        p.require(TT::Semicolon)?;
      };
      Ok(ExprStmt { expr })
    })
  }

  fn for_body(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<ForBody>> {
    let ctx = ctx.with_loop();
    self.with_loc(|p| {
      if p.peek().typ == TT::BraceOpen {
        p.require(TT::BraceOpen)?;
        let body = p.stmts(ctx, TT::BraceClose)?;
        p.require(TT::BraceClose)?;
        Ok(ForBody { body })
      } else {
        Ok(ForBody {
          body: vec![p.stmt(ctx)?],
        })
      }
    })
  }

  fn is_for_decl_start(&mut self) -> bool {
    let [t0, t1] = self.peek_n();
    match t0.typ {
      TT::KeywordVar | TT::KeywordConst => true,
      TT::KeywordLet => {
        t1.typ == TT::BraceOpen || t1.typ == TT::BracketOpen || is_valid_pattern_identifier(t1.typ)
      }
      _ => false,
    }
  }

  /// One of:
  /// - for ( [<expr> | <var decls> ]? ; <expr>? ; <expr>? )
  /// - for ( [<pat> | <var decl>] in <expr> )
  /// - for ( [<pat> | <var decl>] of <expr> )
  pub fn for_stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Stmt>> {
    let start = self.checkpoint();
    self.require(TT::KeywordFor)?;
    if self.peek().typ == TT::KeywordAwait {
      return Err(self.peek().error(SyntaxErrorType::Unsupported("for await")));
    };
    self.require(TT::ParenthesisOpen)?;

    // The head is parsed once; whatever follows the leftmost part decides the loop kind.
    let init = if self.peek().typ == TT::Semicolon {
      ForTripleStmtInit::None
    } else if self.is_for_decl_start() {
      ForTripleStmtInit::Decl(self.var_decl(ctx, VarDeclParseMode::Leftmost)?)
    } else {
      ForTripleStmtInit::Expr(self.expr(ctx, [TT::Semicolon, TT::KeywordIn, TT::KeywordOf])?)
    };

    let t = self.peek();
    if matches!(t.typ, TT::KeywordIn | TT::KeywordOf) {
      self.consume();
      let lhs = match init {
        ForTripleStmtInit::Decl(decl) => {
          if decl.stx.declarators.len() != 1 || decl.stx.declarators[0].initializer.is_some() {
            return Err(decl.error(SyntaxErrorType::ExpectedSyntax(
              "single declarator without initializer",
            )));
          };
          ForInOfLhs::Decl(decl)
        }
        ForTripleStmtInit::Expr(expr) => {
          ForInOfLhs::Assign(lhs_expr_to_assign_target(expr, OperatorName::Assignment)?)
        }
        ForTripleStmtInit::None => {
          return Err(t.error(SyntaxErrorType::ExpectedSyntax("for-in/of left-hand side")))
        }
      };
      let rhs = self.expr(ctx, [TT::ParenthesisClose])?;
      self.require(TT::ParenthesisClose)?;
      let body = self.for_body(ctx)?;
      let loc = self.since_checkpoint(&start);
      return Ok(if t.typ == TT::KeywordIn {
        Node::new(loc, ForInStmt { lhs, rhs, body }).into_wrapped()
      } else {
        Node::new(loc, ForOfStmt { lhs, rhs, body }).into_wrapped()
      });
    };

    self.require(TT::Semicolon)?;
    let cond = (self.peek().typ != TT::Semicolon)
      .then(|| self.expr(ctx, [TT::Semicolon]))
      .transpose()?;
    self.require(TT::Semicolon)?;
    let post = (self.peek().typ != TT::ParenthesisClose)
      .then(|| self.expr(ctx, [TT::ParenthesisClose]))
      .transpose()?;
    self.require(TT::ParenthesisClose)?;
    let body = self.for_body(ctx)?;
    let loc = self.since_checkpoint(&start);
    Ok(
      Node::new(loc, ForTripleStmt {
        init,
        cond,
        post,
        body,
      })
      .into_wrapped(),
    )
  }

  pub fn if_stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<IfStmt>> {
    self.with_loc(|p| {
      p.require(TT::KeywordIf)?;
      p.require(TT::ParenthesisOpen)?;
      let test = p.expr(ctx, [TT::ParenthesisClose])?;
      p.require(TT::ParenthesisClose)?;
      let consequent = p.stmt(ctx)?;
      let alternate = p.consume_if(TT::KeywordElse).and_then(|| p.stmt(ctx))?;
      Ok(IfStmt {
        test,
        consequent,
        alternate,
      })
    })
  }

  // Allowed at the top level too, since evaluated code is a function body.
  pub fn return_stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<ReturnStmt>> {
    self.with_loc(|p| {
      p.require(TT::KeywordReturn)?;
      let next = p.peek();
      let value = if next.preceded_by_line_terminator
        || next.typ == TT::BraceClose
        || next.typ == TT::EOF
      {
        // Automatic Semicolon Insertion.
        None
      } else if p.consume_if(TT::Semicolon).is_match() {
        None
      } else {
        let mut asi = Asi::can();
        let value = p.expr_with_asi(ctx, [TT::Semicolon], &mut asi)?;
        if !asi.did_end_with_asi {
          p.require(TT::Semicolon)?;
        };
        Some(value)
      };
      Ok(ReturnStmt { value })
    })
  }

  pub fn throw_stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<ThrowStmt>> {
    self.with_loc(|p| {
      let start = p.require(TT::KeywordThrow)?;
      if p.peek().preceded_by_line_terminator {
        // Illegal under Automatic Semicolon Insertion rules.
        return Err(start.error(SyntaxErrorType::LineTerminatorAfterThrow));
      }
      let mut asi = Asi::can();
      let value = p.expr_with_asi(ctx, [TT::Semicolon], &mut asi)?;
      if !asi.did_end_with_asi {
        p.require(TT::Semicolon)?;
      };
      Ok(ThrowStmt { value })
    })
  }

  pub fn try_stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<TryStmt>> {
    self.with_loc(|p| {
      let start = p.require(TT::KeywordTry)?;
      let wrapped = p.block_stmt(ctx)?;
      let catch = p
        .consume_if(TT::KeywordCatch)
        .and_then(|| {
          p.with_loc(|p| {
            let parameter = p.consume_if(TT::ParenthesisOpen).and_then(|| {
              let pattern = p.pat_decl(ctx)?;
              p.require(TT::ParenthesisClose)?;
              Ok(pattern)
            })?;
            p.require(TT::BraceOpen)?;
            let body = p.stmts(ctx, TT::BraceClose)?;
            p.require(TT::BraceClose)?;
            Ok(CatchBlock { parameter, body })
          })
        })?;
      let finally = p
        .consume_if(TT::KeywordFinally)
        .and_then(|| p.block_stmt(ctx))?;
      if catch.is_none() && finally.is_none() {
        return Err(start.error(SyntaxErrorType::TryStatementHasNoCatchOrFinally));
      }
      Ok(TryStmt {
        wrapped,
        catch,
        finally,
      })
    })
  }

  pub fn while_stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<WhileStmt>> {
    self.with_loc(|p| {
      p.require(TT::KeywordWhile)?;
      p.require(TT::ParenthesisOpen)?;
      let condition = p.expr(ctx, [TT::ParenthesisClose])?;
      p.require(TT::ParenthesisClose)?;
      let body = p.stmt(ctx.with_loop())?;
      Ok(WhileStmt { condition, body })
    })
  }

  pub fn do_while_stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<DoWhileStmt>> {
    self.with_loc(|p| {
      p.require(TT::KeywordDo)?;
      let body = p.stmt(ctx.with_loop())?;
      p.consume_if(TT::Semicolon);
      p.require(TT::KeywordWhile)?;
      p.require(TT::ParenthesisOpen)?;
      let condition = p.expr(ctx, [TT::ParenthesisClose])?;
      p.require(TT::ParenthesisClose)?;
      p.consume_if(TT::Semicolon);
      Ok(DoWhileStmt { condition, body })
    })
  }

  pub fn switch_stmt(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<SwitchStmt>> {
    self.with_loc(|p| {
      p.require(TT::KeywordSwitch)?;
      p.require(TT::ParenthesisOpen)?;
      let test = p.expr(ctx, [TT::ParenthesisClose])?;
      p.require(TT::ParenthesisClose)?;
      p.require(TT::BraceOpen)?;
      let body_ctx = ctx.with_breakable(true);
      let mut branches = Vec::new();
      while p.peek().typ != TT::BraceClose {
        let branch = p.with_loc(|p| {
          let case = if p.consume_if(TT::KeywordCase).is_match() {
            Some(p.expr(ctx, [TT::Colon])?)
          } else {
            p.require(TT::KeywordDefault)?;
            None
          };
          p.require(TT::Colon)?;
          let mut body = Vec::new();
          while !matches!(
            p.peek().typ,
            TT::KeywordCase | TT::KeywordDefault | TT::BraceClose | TT::EOF
          ) {
            body.push(p.stmt(body_ctx)?);
          }
          Ok(SwitchBranch { case, body })
        })?;
        branches.push(branch);
      }
      p.require(TT::BraceClose)?;
      Ok(SwitchStmt { test, branches })
    })
  }
}

