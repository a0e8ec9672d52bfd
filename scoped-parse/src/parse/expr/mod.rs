pub mod lit;
pub mod pat;
pub mod util;

use pat::is_valid_pattern_identifier;
use util::check_update_target;
use util::lhs_expr_to_assign_target;

use super::ParseCtx;
use super::Parser;
use crate::ast::expr::pat::IdPat;
use crate::ast::expr::ArrowFuncExpr;
use crate::ast::expr::BinaryExpr;
use crate::ast::expr::CallArg;
use crate::ast::expr::CallExpr;
use crate::ast::expr::ComputedMemberExpr;
use crate::ast::expr::CondExpr;
use crate::ast::expr::Expr;
use crate::ast::expr::FuncExpr;
use crate::ast::expr::IdExpr;
use crate::ast::expr::ImportExpr;
use crate::ast::expr::MemberExpr;
use crate::ast::expr::NewExpr;
use crate::ast::expr::ThisExpr;
use crate::ast::expr::UnaryExpr;
use crate::ast::expr::UnaryPostfixExpr;
use crate::ast::func::Func;
use crate::ast::func::FuncBody;
use crate::ast::node::Node;
use crate::ast::stmt::decl::ParamDecl;
use crate::ast::stmt::decl::PatDecl;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::keyword_text;
use crate::lex::LexMode;
use crate::operator::OperatorName;
use crate::parse::operator::infix_operator;
use crate::parse::operator::prefix_operator;
use crate::token::TT;

pub struct Asi {
  pub can_end_with_asi: bool,
  pub did_end_with_asi: bool,
}

impl Asi {
  pub fn can() -> Asi {
    Asi {
      can_end_with_asi: true,
      did_end_with_asi: false,
    }
  }

  pub fn no() -> Asi {
    Asi {
      can_end_with_asi: false,
      did_end_with_asi: false,
    }
  }
}

impl<'a> Parser<'a> {
  /// Parses call arguments after the opening parenthesis, up to but not including the closing one.
  pub fn call_args(&mut self, ctx: ParseCtx) -> SyntaxResult<Vec<Node<CallArg>>> {
    let mut args = Vec::new();
    while self.peek().typ != TT::ParenthesisClose {
      let arg = self.with_loc(|p| {
        let spread = p.consume_if(TT::DotDotDot).is_match();
        let value = p.expr(ctx, [TT::Comma, TT::ParenthesisClose])?;
        Ok(CallArg { spread, value })
      })?;
      args.push(arg);
      if !self.consume_if(TT::Comma).is_match() {
        break;
      };
    }
    Ok(args)
  }

  pub fn expr<const N: usize>(
    &mut self,
    ctx: ParseCtx,
    terminators: [TT; N],
  ) -> SyntaxResult<Node<Expr>> {
    self.expr_with_min_prec(ctx, 1, terminators, &mut Asi::no())
  }

  pub fn expr_with_asi<const N: usize>(
    &mut self,
    ctx: ParseCtx,
    terminators: [TT; N],
    asi: &mut Asi,
  ) -> SyntaxResult<Node<Expr>> {
    self.expr_with_min_prec(ctx, 1, terminators, asi)
  }

  /// Parses a parenthesised expression like `(a + b)`. The grouping itself leaves no node.
  pub fn grouping(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    self.require(TT::ParenthesisOpen)?;
    let expr = self.expr(ctx, [TT::ParenthesisClose])?;
    self.require(TT::ParenthesisClose)?;
    Ok(expr)
  }

  // Parses up to and including `=>`, or returns None (having consumed arbitrary tokens) if this isn't an arrow function.
  fn arrow_func_head(&mut self, ctx: ParseCtx) -> SyntaxResult<Option<Vec<Node<ParamDecl>>>> {
    let t = self.peek();
    let parameters = if is_valid_pattern_identifier(t.typ) {
      // Single unparenthesised parameter.
      self.consume();
      let pattern = Node::new(t.loc, PatDecl {
        pat: Node::new(t.loc, IdPat {
          name: self.string(t.loc),
        })
        .into_wrapped(),
      });
      vec![Node::new(t.loc, ParamDecl {
        rest: false,
        pattern,
        default_value: None,
      })]
    } else {
      match self.func_params(ctx) {
        Ok(params) => params,
        Err(_) => return Ok(None),
      }
    };
    let arrow = self.peek();
    if arrow.typ != TT::EqualsChevronRight {
      return Ok(None);
    };
    if arrow.preceded_by_line_terminator {
      // Illegal under Automatic Semicolon Insertion rules.
      return Err(arrow.error(SyntaxErrorType::LineTerminatorAfterArrowFunctionParameters));
    };
    self.consume();
    Ok(Some(parameters))
  }

  /// Tries to parse an arrow function. Nothing is consumed if there is no `=>` after what could be its parameters.
  /// Once `=>` has been seen, errors in the body are reported as is.
  pub fn arrow_func_expr<const N: usize>(
    &mut self,
    ctx: ParseCtx,
    terminators: [TT; N],
  ) -> SyntaxResult<Option<Node<ArrowFuncExpr>>> {
    let start = self.checkpoint();
    let Some(parameters) = self.rewindable(|p| p.arrow_func_head(ctx))? else {
      return Ok(None);
    };
    let body = match self.peek().typ {
      TT::BraceOpen => FuncBody::Block(self.func_block_body(ctx)?),
      _ => FuncBody::Expression(self.expr_with_asi(
        ctx.for_function_body(),
        terminators,
        &mut Asi::can(),
      )?),
    };
    let loc = self.since_checkpoint(&start);
    let func = Node::new(loc, Func {
      arrow: true,
      parameters,
      body,
    });
    Ok(Some(Node::new(loc, ArrowFuncExpr { func })))
  }

  pub fn arrow_function_or_grouping_expr<const N: usize>(
    &mut self,
    ctx: ParseCtx,
    terminators: [TT; N],
  ) -> SyntaxResult<Node<Expr>> {
    // Try and parse as arrow function signature first.
    // If we fail, backtrack and parse as grouping instead.
    match self.arrow_func_expr(ctx, terminators)? {
      Some(arrow) => Ok(arrow.into_wrapped()),
      None => self.grouping(ctx),
    }
  }

  pub fn func_expr(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<FuncExpr>> {
    self.with_loc(|p| {
      p.require(TT::KeywordFunction)?;
      let star = p.consume_if(TT::Asterisk);
      if let Some(loc) = star.match_loc() {
        return Err(loc.error(SyntaxErrorType::Unsupported("generator function"), None));
      };
      let name = p.maybe_class_or_func_name();
      let func = p.func(ctx)?;
      Ok(FuncExpr { name, func })
    })
  }

  pub fn id_expr(&mut self) -> SyntaxResult<Node<IdExpr>> {
    self.with_loc(|p| {
      let name = p.id_name()?;
      Ok(IdExpr { name })
    })
  }

  /// Parses a raw valid identifier name as a string. To parse an IdExpr, use `id_expr`.
  pub fn id_name(&mut self) -> SyntaxResult<String> {
    let t = self.consume();
    if !is_valid_pattern_identifier(t.typ) {
      return Err(t.error(SyntaxErrorType::ExpectedSyntax("identifier")));
    };
    Ok(self.string(t.loc))
  }

  // Property names after `.` can be any identifier name, including reserved words.
  fn member_name(&mut self) -> SyntaxResult<String> {
    let t = self.require_predicate(
      |tt| tt == TT::Identifier || keyword_text(tt).is_some(),
      "member name",
    )?;
    Ok(self.string(t.loc))
  }

  pub fn this_expr(&mut self) -> SyntaxResult<Node<ThisExpr>> {
    self.with_loc(|p| {
      p.require(TT::KeywordThis)?;
      Ok(ThisExpr {})
    })
  }

  pub fn import_expr(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<ImportExpr>> {
    self.with_loc(|p| {
      p.require(TT::KeywordImport)?;
      p.require(TT::ParenthesisOpen)?;
      let module = p.expr(ctx, [TT::ParenthesisClose, TT::Comma])?;
      // Import attributes, e.g. `import(x, { with: ... })`.
      if p.consume_if(TT::Comma).is_match() && p.peek().typ != TT::ParenthesisClose {
        p.expr(ctx, [TT::ParenthesisClose, TT::Comma])?;
        let _ = p.consume_if(TT::Comma);
      };
      p.require(TT::ParenthesisClose)?;
      Ok(ImportExpr { module })
    })
  }

  // `new` binds to the nearest member access chain, and takes the arguments directly after it.
  pub fn new_expr(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<NewExpr>> {
    self.with_loc(|p| {
      p.require(TT::KeywordNew)?;
      let mut callee = if p.peek().typ == TT::KeywordNew {
        p.new_expr(ctx)?.into_wrapped()
      } else {
        p.expr_primary(ctx, [])?
      };
      loop {
        if p.consume_if(TT::Dot).is_match() {
          let right_tok = p.peek();
          let right = p.member_name()?;
          callee = Node::new(callee.loc + right_tok.loc, MemberExpr {
            optional_chaining: false,
            left: callee,
            right,
          })
          .into_wrapped();
        } else if p.consume_if(TT::BracketOpen).is_match() {
          let member = p.expr(ctx, [TT::BracketClose])?;
          let end = p.require(TT::BracketClose)?;
          callee = Node::new(callee.loc + end.loc, ComputedMemberExpr {
            optional_chaining: false,
            object: callee,
            member,
          })
          .into_wrapped();
        } else {
          break;
        };
      }
      let arguments = if p.consume_if(TT::ParenthesisOpen).is_match() {
        let arguments = p.call_args(ctx)?;
        p.require(TT::ParenthesisClose)?;
        arguments
      } else {
        Vec::new()
      };
      Ok(NewExpr { callee, arguments })
    })
  }

  // Operands that aren't prefixed by a unary operator.
  fn expr_primary<const N: usize>(
    &mut self,
    ctx: ParseCtx,
    terminators: [TT; N],
  ) -> SyntaxResult<Node<Expr>> {
    let [t0, t1] = self.peek_n_with_mode([LexMode::SlashIsRegex, LexMode::Standard]);

    if t0.typ == TT::KeywordAsync
      && !t1.preceded_by_line_terminator
      && (t1.typ == TT::KeywordFunction
        || t1.typ == TT::ParenthesisOpen
        || is_valid_pattern_identifier(t1.typ))
    {
      // `async(x)` is still a call to a function named async.
      let is_call = t1.typ == TT::ParenthesisOpen && {
        let cp = self.checkpoint();
        self.consume();
        let head = self.arrow_func_head(ctx)?;
        self.restore_checkpoint(cp);
        head.is_none()
      };
      if !is_call {
        return Err(t0.error(SyntaxErrorType::Unsupported("async function")));
      };
    };

    if is_valid_pattern_identifier(t0.typ) {
      return Ok(if t1.typ == TT::EqualsChevronRight {
        match self.arrow_func_expr(ctx, terminators)? {
          Some(arrow) => arrow.into_wrapped(),
          None => return Err(t1.error(SyntaxErrorType::ExpectedSyntax("expression operand"))),
        }
      } else {
        self.id_expr()?.into_wrapped()
      });
    };

    #[rustfmt::skip]
    let expr: Node<Expr> = match t0.typ {
      TT::BracketOpen => self.lit_arr(ctx)?.into_wrapped(),
      TT::BraceOpen => self.lit_obj(ctx)?.into_wrapped(),
      TT::KeywordFunction => self.func_expr(ctx)?.into_wrapped(),
      TT::KeywordImport if t1.typ == TT::ParenthesisOpen => self.import_expr(ctx)?.into_wrapped(),
      TT::KeywordImport | TT::KeywordExport => return Err(t0.error(SyntaxErrorType::Unsupported("module syntax"))),
      TT::KeywordClass => return Err(t0.error(SyntaxErrorType::Unsupported("class"))),
      TT::KeywordAwait => return Err(t0.error(SyntaxErrorType::Unsupported("await"))),
      TT::KeywordYield => return Err(t0.error(SyntaxErrorType::Unsupported("generator function"))),
      TT::KeywordSuper => return Err(t0.error(SyntaxErrorType::Unsupported("super"))),
      TT::KeywordNew if t1.typ == TT::Dot => return Err(t0.error(SyntaxErrorType::Unsupported("new.target"))),
      TT::KeywordNew => self.new_expr(ctx)?.into_wrapped(),
      TT::KeywordThis => self.this_expr()?.into_wrapped(),
      TT::LiteralBigInt => return Err(t0.error(SyntaxErrorType::Unsupported("bigint literal"))),
      TT::LiteralTrue | TT::LiteralFalse => self.lit_bool()?.into_wrapped(),
      TT::LiteralNull => self.lit_null()?.into_wrapped(),
      TT::LiteralNumber => self.lit_num()?.into_wrapped(),
      TT::LiteralRegex => self.lit_regex()?.into_wrapped(),
      TT::LiteralString => self.lit_str()?.into_wrapped(),
      TT::LiteralTemplatePartString | TT::LiteralTemplatePartStringEnd => self.lit_template(ctx)?.into_wrapped(),
      TT::ParenthesisOpen => self.arrow_function_or_grouping_expr(ctx, terminators)?,
      TT::EOF => return Err(t0.error(SyntaxErrorType::UnexpectedEnd)),
      _ => return Err(t0.error(SyntaxErrorType::ExpectedSyntax("expression operand"))),
    };
    Ok(expr)
  }

  fn expr_operand<const N: usize>(
    &mut self,
    ctx: ParseCtx,
    terminators: [TT; N],
    asi: &mut Asi,
  ) -> SyntaxResult<Node<Expr>> {
    let t0 = self.peek_with_mode(LexMode::SlashIsRegex);
    if let Some(operator) = prefix_operator(t0.typ) {
      return Ok(self.with_loc(|p| {
        p.consume_with_mode(LexMode::SlashIsRegex);
        let operand =
          p.expr_with_min_prec(ctx, operator.right_min_precedence(), terminators, asi)?;
        if matches!(
          operator,
          OperatorName::PrefixIncrement | OperatorName::PrefixDecrement
        ) {
          check_update_target(&operand)?;
        };
        Ok(UnaryExpr {
          operator,
          argument: operand,
        })
      })?.into_wrapped());
    };
    self.expr_primary(ctx, terminators)
  }

  pub fn expr_with_min_prec<const N: usize>(
    &mut self,
    ctx: ParseCtx,
    min_prec: u8,
    terminators: [TT; N],
    asi: &mut Asi,
  ) -> SyntaxResult<Node<Expr>> {
    self.nested(|p| p.expr_with_min_prec_unguarded(ctx, min_prec, terminators, asi))
  }

  fn expr_with_min_prec_unguarded<const N: usize>(
    &mut self,
    ctx: ParseCtx,
    min_prec: u8,
    terminators: [TT; N],
    asi: &mut Asi,
  ) -> SyntaxResult<Node<Expr>> {
    let mut left = self.expr_operand(ctx, terminators, asi)?;

    loop {
      let cp = self.checkpoint();
      let t = self.consume();

      if terminators.contains(&t.typ) {
        self.restore_checkpoint(cp);
        break;
      };

      match t.typ {
        TT::PlusPlus | TT::HyphenHyphen if !t.preceded_by_line_terminator => {
          let operator_name = match t.typ {
            TT::PlusPlus => OperatorName::PostfixIncrement,
            _ => OperatorName::PostfixDecrement,
          };
          if operator_name.precedence() < min_prec {
            self.restore_checkpoint(cp);
            break;
          };
          check_update_target(&left)?;
          left = Node::new(left.loc + t.loc, UnaryPostfixExpr {
            operator: operator_name,
            argument: left,
          })
          .into_wrapped();
          continue;
        }
        TT::LiteralTemplatePartString | TT::LiteralTemplatePartStringEnd => {
          return Err(t.error(SyntaxErrorType::Unsupported("tagged template")));
        }
        _ => {}
      };

      match infix_operator(t.typ) {
        None => {
          if asi.can_end_with_asi
            && (t.preceded_by_line_terminator || t.typ == TT::BraceClose || t.typ == TT::EOF)
          {
            self.restore_checkpoint(cp);
            asi.did_end_with_asi = true;
            break;
          };
          if t.typ == TT::EOF {
            return Err(t.error(SyntaxErrorType::UnexpectedEnd));
          };
          return Err(t.error(SyntaxErrorType::ExpectedSyntax("expression operator")));
        }
        Some(operator) => {
          if operator.precedence() < min_prec {
            self.restore_checkpoint(cp);
            break;
          };

          left = match operator {
            OperatorName::Call | OperatorName::OptionalChainingCall => {
              let arguments = self.call_args(ctx)?;
              let end = self.require(TT::ParenthesisClose)?;
              Node::new(left.loc + end.loc, CallExpr {
                optional_chaining: operator == OperatorName::OptionalChainingCall,
                arguments,
                callee: left,
              })
              .into_wrapped()
            }
            OperatorName::ComputedMemberAccess
            | OperatorName::OptionalChainingComputedMemberAccess => {
              let member = self.expr(ctx, [TT::BracketClose])?;
              let end = self.require(TT::BracketClose)?;
              Node::new(left.loc + end.loc, ComputedMemberExpr {
                optional_chaining: operator
                  == OperatorName::OptionalChainingComputedMemberAccess,
                object: left,
                member,
              })
              .into_wrapped()
            }
            OperatorName::MemberAccess | OperatorName::OptionalChainingMemberAccess => {
              let right_tok = self.peek();
              let right = self.member_name()?;
              Node::new(left.loc + right_tok.loc, MemberExpr {
                optional_chaining: operator == OperatorName::OptionalChainingMemberAccess,
                left,
                right,
              })
              .into_wrapped()
            }
            OperatorName::Conditional => {
              let consequent = self.expr(ctx, [TT::Colon])?;
              self.require(TT::Colon)?;
              let alternate = self.expr_with_min_prec(
                ctx,
                OperatorName::Conditional.precedence(),
                terminators,
                asi,
              )?;
              Node::new(left.loc + alternate.loc, CondExpr {
                test: left,
                consequent,
                alternate,
              })
              .into_wrapped()
            }
            _ => {
              if operator.is_assignment() {
                left = lhs_expr_to_assign_target(left, operator)?;
              };
              let right =
                self.expr_with_min_prec(ctx, operator.right_min_precedence(), terminators, asi)?;
              Node::new(left.loc + right.loc, BinaryExpr {
                operator,
                left,
                right,
              })
              .into_wrapped()
            }
          };
        }
      };
    }

    Ok(left)
  }
}
