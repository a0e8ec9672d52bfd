use super::expr::pat::is_valid_pattern_identifier;
use super::ParseCtx;
use super::Parser;
use crate::ast::expr::lit::LitObjExpr;
use crate::ast::expr::IdExpr;
use crate::ast::node::Node;
use crate::ast::obj::ObjKey;
use crate::ast::obj::ObjMember;
use crate::ast::obj::ObjMemberDirectKey;
use crate::ast::obj::ObjMemberType;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::keyword_text;
use crate::token::TT;

impl<'a> Parser<'a> {
  /// Parses a property name in an object literal or object pattern.
  pub fn obj_key(&mut self, ctx: ParseCtx) -> SyntaxResult<ObjKey> {
    let t = self.peek();
    Ok(match t.typ {
      TT::BracketOpen => {
        self.consume();
        let key = self.expr(ctx, [TT::BracketClose])?;
        self.require(TT::BracketClose)?;
        ObjKey::Computed(key)
      }
      TT::LiteralString => {
        let key = self.lit_str_val()?;
        ObjKey::Direct(Node::new(t.loc, ObjMemberDirectKey { key, tt: t.typ }))
      }
      TT::LiteralNumber => {
        let key = self.lit_num_val()?.to_string();
        ObjKey::Direct(Node::new(t.loc, ObjMemberDirectKey { key, tt: t.typ }))
      }
      TT::Identifier => {
        self.consume();
        ObjKey::Direct(Node::new(t.loc, ObjMemberDirectKey {
          key: self.string(t.loc),
          tt: t.typ,
        }))
      }
      typ if keyword_text(typ).is_some() => {
        self.consume();
        ObjKey::Direct(Node::new(t.loc, ObjMemberDirectKey {
          key: self.string(t.loc),
          tt: t.typ,
        }))
      }
      TT::EOF => return Err(t.error(SyntaxErrorType::UnexpectedEnd)),
      _ => return Err(t.error(SyntaxErrorType::ExpectedSyntax("property name"))),
    })
  }

  fn obj_member(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<ObjMember>> {
    self.with_loc(|p| {
      if p.consume_if(TT::DotDotDot).is_match() {
        let val = p.expr(ctx, [TT::Comma, TT::BraceClose])?;
        return Ok(ObjMember {
          typ: ObjMemberType::Rest { val },
        });
      };
      let [t0, t1] = p.peek_n::<2>();
      match t0.typ {
        TT::Asterisk => {
          return Err(t0.error(SyntaxErrorType::Unsupported("generator method")));
        }
        TT::KeywordGet | TT::KeywordSet
          if !matches!(
            t1.typ,
            TT::ParenthesisOpen | TT::Colon | TT::Comma | TT::BraceClose
          ) =>
        {
          return Err(t0.error(SyntaxErrorType::Unsupported("accessor")));
        }
        TT::KeywordAsync
          if !t1.preceded_by_line_terminator
            && !matches!(
              t1.typ,
              TT::ParenthesisOpen | TT::Colon | TT::Comma | TT::BraceClose
            ) =>
        {
          return Err(t0.error(SyntaxErrorType::Unsupported("async method")));
        }
        _ => {}
      };
      let key = p.obj_key(ctx)?;
      let next = p.peek();
      let typ = match next.typ {
        TT::ParenthesisOpen => {
          let func = p.func(ctx)?;
          ObjMemberType::Method { key, func }
        }
        TT::Colon => {
          p.consume();
          let val = p.expr(ctx, [TT::Comma, TT::BraceClose])?;
          ObjMemberType::Valued { key, val }
        }
        TT::Comma | TT::BraceClose => match key {
          ObjKey::Direct(k) if is_valid_pattern_identifier(k.stx.tt) => {
            ObjMemberType::Shorthand {
              id: Node::new(k.loc, IdExpr {
                name: k.stx.key.clone(),
              }),
            }
          }
          _ => return Err(next.error(SyntaxErrorType::RequiredTokenNotFound(TT::Colon))),
        },
        _ => return Err(next.error(SyntaxErrorType::RequiredTokenNotFound(TT::Colon))),
      };
      Ok(ObjMember { typ })
    })
  }

  pub fn lit_obj(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<LitObjExpr>> {
    self.with_loc(|p| {
      p.require(TT::BraceOpen)?;
      let mut members = Vec::new();
      while p.peek().typ != TT::BraceClose {
        members.push(p.obj_member(ctx)?);
        if !p.consume_if(TT::Comma).is_match() {
          break;
        };
      }
      p.require(TT::BraceClose)?;
      Ok(LitObjExpr { members })
    })
  }
}
