//! Recursive-descent parser for the legacy expression grammar.
//!
//! ```text
//! expr_list := expr (';' expr)*
//! expr      := value | call | scalar_assign
//! value     := string | raw_string | number | scalar_ref
//! scalar_ref     := '$' ident
//! scalar_assign  := ident '=' expr
//! call      := ident '(' [ expr (',' expr)* ] ')'
//! ```
//!
//! LL(1): the only ambiguity is a leading `Ident`, which is disambiguated by
//! one token of lookahead (`=` means `scalar_assign`, `(` means `call`;
//! anything else is a syntax error, since a bare identifier is not itself a
//! `value`).

use crate::error::ParseError;
use crate::lexer::{self, Token, TokenKind};
use adventure_ast::{Call, Expr, ExprKind, ExprList, ScalarAssign, Value};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, matches: impl Fn(&TokenKind) -> bool, expected: &'static str) -> Result<Token, ParseError> {
        if matches(&self.peek().kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::expected(expected, describe(&self.peek().kind), self.peek().position))
        }
    }

    fn parse_expr_list(&mut self) -> Result<ExprList, ParseError> {
        if matches!(self.peek().kind, TokenKind::Eof) {
            return Err(ParseError::EmptySequence);
        }
        let mut exprs = vec![self.parse_expr()?];
        while matches!(self.peek().kind, TokenKind::Semicolon) {
            self.advance();
            exprs.push(self.parse_expr()?);
        }
        Ok(ExprList::new(exprs))
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let position = self.peek().position;
        let kind = match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                match self.peek().kind {
                    TokenKind::Equals => {
                        self.advance();
                        let value = self.parse_expr()?;
                        ExprKind::ScalarAssign(ScalarAssign { name, value: Box::new(value) })
                    }
                    TokenKind::LParen => {
                        self.advance();
                        let args = self.parse_args()?;
                        ExprKind::Call(Call { name, args })
                    }
                    _ => {
                        return Err(ParseError::expected(
                            "'=' or '(' after identifier",
                            describe(&self.peek().kind),
                            self.peek().position,
                        ))
                    }
                }
            }
            TokenKind::Dollar => {
                self.advance();
                let name = self.expect_ident()?;
                ExprKind::Value(Value::ScalarRef(name))
            }
            TokenKind::Str(s) => {
                self.advance();
                ExprKind::Value(Value::Str(s))
            }
            TokenKind::RawStr(s) => {
                self.advance();
                ExprKind::Value(Value::RawStr(s))
            }
            TokenKind::Num(n) => {
                self.advance();
                ExprKind::Value(Value::Num(n))
            }
            TokenKind::Eof => return Err(ParseError::AbruptEnd),
            _ => {
                return Err(ParseError::expected(
                    "a value, call, or scalar assignment",
                    describe(&self.peek().kind),
                    self.peek().position,
                ))
            }
        };
        Ok(Expr::new(kind, position))
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if matches!(self.peek().kind, TokenKind::RParen) {
            self.advance();
            return Ok(args);
        }
        args.push(self.parse_expr()?);
        while matches!(self.peek().kind, TokenKind::Comma) {
            self.advance();
            args.push(self.parse_expr()?);
        }
        self.expect(|k| matches!(k, TokenKind::RParen), "')'")?;
        Ok(args)
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(ParseError::expected("an identifier", describe(&other), self.peek().position)),
        }
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        if matches!(self.peek().kind, TokenKind::Eof) {
            Ok(())
        } else {
            Err(ParseError::expected("end of expression", describe(&self.peek().kind), self.peek().position))
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(s) => format!("identifier '{s}'"),
        TokenKind::Str(s) => format!("string \"{s}\""),
        TokenKind::RawStr(s) => format!("raw string `{s}`"),
        TokenKind::Num(n) => format!("number {n}"),
        TokenKind::Dollar => "'$'".to_string(),
        TokenKind::Equals => "'='".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Semicolon => "';'".to_string(),
        TokenKind::Eof => "end of input".to_string(),
    }
}

/// Parses a full `expr_list` fragment (the body of a `<[ ... ]>` template
/// delimiter) and requires that it consume the entire input.
pub fn parse_expr_list(src: &str) -> Result<ExprList, ParseError> {
    let tokens = lexer::tokenize(src)?;
    let mut parser = Parser::new(tokens);
    let list = parser.parse_expr_list()?;
    parser.expect_eof()?;
    Ok(list)
}

/// Parses `src` as a single top-level `call`, rejecting every other
/// production. Used by the legacy interactive-mode action dispatch, which
/// only ever accepts literal function-call text (e.g. `go_north()`).
pub fn parse_call(src: &str) -> Result<Call, ParseError> {
    let tokens = lexer::tokenize(src)?;
    let mut parser = Parser::new(tokens);
    let name = parser.expect_ident()?;
    parser.expect(|k| matches!(k, TokenKind::LParen), "'('")?;
    let args = parser.parse_args()?;
    parser.expect_eof()?;
    Ok(Call { name, args })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pure_literal() {
        let list = parse_expr_list(r#" "world" "#).unwrap();
        assert_eq!(list.exprs().len(), 1);
        assert_eq!(list.last().kind, ExprKind::Value(Value::Str("world".into())));
    }

    #[test]
    fn parses_scalar_assign_as_expression() {
        let list = parse_expr_list(r#"x = "cat""#).unwrap();
        match &list.last().kind {
            ExprKind::ScalarAssign(assign) => {
                assert_eq!(assign.name, "x");
                assert_eq!(assign.value.kind, ExprKind::Value(Value::Str("cat".into())));
            }
            other => panic!("expected ScalarAssign, got {other:?}"),
        }
    }

    #[test]
    fn parses_sequence_and_keeps_order() {
        let list = parse_expr_list("1.0; 2.0; 3.0").unwrap();
        assert_eq!(list.exprs().len(), 3);
        assert_eq!(list.last().kind, ExprKind::Value(Value::Num(3.0)));
    }

    #[test]
    fn parses_call_with_args() {
        let list = parse_expr_list(r#"greet("a", $b)"#).unwrap();
        match &list.last().kind {
            ExprKind::Call(call) => {
                assert_eq!(call.name, "greet");
                assert_eq!(call.args.len(), 2);
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn bare_identifier_is_not_a_value() {
        assert!(parse_expr_list("x").is_err());
    }

    #[test]
    fn whitespace_only_fragment_fails_to_parse() {
        assert!(matches!(parse_expr_list("   "), Err(ParseError::EmptySequence)));
    }

    #[test]
    fn empty_sequence_is_rejected() {
        assert!(matches!(parse_expr_list(""), Err(ParseError::EmptySequence)));
    }

    #[test]
    fn truncated_expression_is_an_abrupt_end_not_an_empty_sequence() {
        assert!(matches!(parse_expr_list("x ="), Err(ParseError::AbruptEnd)));
    }

    #[test]
    fn action_parser_accepts_only_a_call() {
        let call = parse_call("go_north()").unwrap();
        assert_eq!(call.name, "go_north");
        assert!(parse_call(r#""just a string""#).is_err());
        assert!(parse_call("x = 1").is_err());
    }
}
