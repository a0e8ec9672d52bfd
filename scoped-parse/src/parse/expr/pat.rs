use crate::ast::expr::pat::ArrPat;
use crate::ast::expr::pat::ArrPatElem;
use crate::ast::expr::pat::ClassOrFuncName;
use crate::ast::expr::pat::IdPat;
use crate::ast::expr::pat::ObjPat;
use crate::ast::expr::pat::ObjPatProp;
use crate::ast::expr::pat::Pat;
use crate::ast::node::Node;
use crate::ast::obj::ObjKey;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::parse::ParseCtx;
use crate::parse::Parser;
use crate::token::TT;

/// Whether a token can name a variable, parameter or function.
/// `await` and `yield` are excluded: async functions and generators are not part of the language.
pub fn is_valid_pattern_identifier(typ: TT) -> bool {
  match typ {
    TT::Identifier => true,
    TT::KeywordAwait | TT::KeywordYield => false,
    t => t.is_unreserved_keyword(),
  }
}

impl<'a> Parser<'a> {
  pub fn maybe_class_or_func_name(&mut self) -> Option<Node<ClassOrFuncName>> {
    self
      .consume_if_pred(|t| is_valid_pattern_identifier(t.typ))
      .match_loc()
      .map(|loc| Node::new(loc, ClassOrFuncName {
        name: self.string(loc),
      }))
  }

  pub fn id_pat(&mut self) -> SyntaxResult<Node<IdPat>> {
    self.with_loc(|p| {
      let t = p.consume();
      if !is_valid_pattern_identifier(t.typ) {
        return Err(t.error(SyntaxErrorType::ExpectedSyntax("identifier")));
      }
      Ok(IdPat {
        name: p.string(t.loc),
      })
    })
  }

  /// Parses an object pattern like `{ x, y: z, [computed]: value = 1, ...rest }`.
  pub fn obj_pat(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<ObjPat>> {
    self.with_loc(|p| {
      p.require(TT::BraceOpen)?;
      let mut properties = Vec::new();
      let mut rest = None;
      while p.peek().typ != TT::BraceClose {
        if p.consume_if(TT::DotDotDot).is_match() {
          rest = Some(p.id_pat()?.into_wrapped());
          // No trailing comma after the rest element.
          break;
        };
        properties.push(p.obj_pat_prop(ctx)?);
        if !p.consume_if(TT::Comma).is_match() {
          break;
        };
      }
      p.require(TT::BraceClose)?;
      Ok(ObjPat { properties, rest })
    })
  }

  fn obj_pat_prop(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<ObjPatProp>> {
    self.with_loc(|p| {
      let t = p.peek();
      let key = p.obj_key(ctx)?;
      if p.consume_if(TT::Colon).is_match() {
        let target = p.pat(ctx)?;
        let default_value = p
          .consume_if(TT::Equals)
          .and_then(|| p.expr(ctx, [TT::Comma, TT::BraceClose]))?;
        return Ok(ObjPatProp {
          key,
          target,
          shorthand: false,
          default_value,
        });
      };
      // Shorthand: the key is also the binding.
      let name = match &key {
        ObjKey::Direct(k) if is_valid_pattern_identifier(k.stx.tt) => k.stx.key.clone(),
        _ => return Err(t.error(SyntaxErrorType::ExpectedSyntax("object pattern property"))),
      };
      let target = Node::new(t.loc, IdPat { name }).into_wrapped();
      let default_value = p
        .consume_if(TT::Equals)
        .and_then(|| p.expr(ctx, [TT::Comma, TT::BraceClose]))?;
      Ok(ObjPatProp {
        key,
        target,
        shorthand: true,
        default_value,
      })
    })
  }

  pub fn arr_pat(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<ArrPat>> {
    self.with_loc(|p| {
      p.require(TT::BracketOpen)?;
      let mut elements = Vec::<Option<ArrPatElem>>::new();
      let mut rest = None;
      while p.peek().typ != TT::BracketClose {
        if p.consume_if(TT::Comma).is_match() {
          elements.push(None);
          continue;
        };
        if p.consume_if(TT::DotDotDot).is_match() {
          rest = Some(p.pat(ctx)?);
          break;
        };
        let target = p.pat(ctx)?;
        let default_value = p
          .consume_if(TT::Equals)
          .and_then(|| p.expr(ctx, [TT::Comma, TT::BracketClose]))?;
        elements.push(Some(ArrPatElem {
          target,
          default_value,
        }));
        if p.peek().typ == TT::BracketClose {
          break;
        };
        p.require(TT::Comma)?;
      }
      p.require(TT::BracketClose)?;
      Ok(ArrPat { elements, rest })
    })
  }

  /// Parses a binding pattern: an identifier, or an array or object destructuring pattern.
  pub fn pat(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Pat>> {
    self.nested(|p| {
      let t = p.peek();
      Ok(match t.typ {
        TT::BraceOpen => p.obj_pat(ctx)?.into_wrapped(),
        TT::BracketOpen => p.arr_pat(ctx)?.into_wrapped(),
        t if is_valid_pattern_identifier(t) => p.id_pat()?.into_wrapped(),
        _ => return Err(t.error(SyntaxErrorType::ExpectedSyntax("pattern"))),
      })
    })
  }
}
