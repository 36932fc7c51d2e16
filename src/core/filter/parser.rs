//! Recursive-descent parser producing [`Expr`] trees.
//!
//! Precedence, lowest first: `or`, `and`, `not`, comparisons (chainable),
//! primaries. Field names are resolved against the catalog while parsing,
//! so a successfully parsed tree only ever refers to known fields.

use super::eval::Value;
use super::lexer::{tokenize, Token};
use super::FilterError;
use crate::domain::catalog::{FieldCatalog, FieldKind};

/// Deepest allowed nesting of parentheses and `not`.
pub const MAX_DEPTH: usize = 64;
/// Longest accepted expression, in tokens. Bounds the `and`/`or` chains,
/// which build left-leaning trees.
pub const MAX_TOKENS: usize = 1024;

/// Which projection of a field an identifier asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Bare name: blank strings and empty values read as `False`.
    Truthy,
    /// `_`-prefixed name: the stored value, for exact comparisons.
    Raw,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    pub key: &'static str,
    pub view: View,
    pub kind: FieldKind,
    pub financial: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Field(FieldRef),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    /// `a < b <= c` holds when every adjacent pair holds.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CmpOp, Expr)>,
    },
}

impl Expr {
    pub fn references_financial(&self) -> bool {
        match self {
            Expr::Literal(_) => false,
            Expr::Field(field) => field.financial,
            Expr::Not(inner) => inner.references_financial(),
            Expr::And(l, r) | Expr::Or(l, r) => {
                l.references_financial() || r.references_financial()
            }
            Expr::Compare { first, rest } => {
                first.references_financial() || rest.iter().any(|(_, e)| e.references_financial())
            }
        }
    }
}

pub fn parse(input: &str, catalog: &FieldCatalog) -> Result<Expr, FilterError> {
    let tokens = tokenize(input)?;
    if tokens.len() == 1 {
        return Err(FilterError::Empty);
    }
    if tokens.len() > MAX_TOKENS {
        return Err(FilterError::TooLong(MAX_TOKENS));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        catalog,
    };
    let expr = parser.parse_or()?;
    match parser.current() {
        Token::Eof => Ok(expr),
        other => Err(FilterError::UnexpectedToken(format!("{:?}", other))),
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    catalog: &'a FieldCatalog,
}

impl Parser<'_> {
    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn nested<T>(
        &mut self,
        inner: impl FnOnce(&mut Self) -> Result<T, FilterError>,
    ) -> Result<T, FilterError> {
        if self.depth >= MAX_DEPTH {
            return Err(FilterError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let result = inner(self);
        self.depth -= 1;
        result
    }

    fn parse_or(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.parse_and()?;
        while matches!(self.current(), Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.parse_not()?;
        while matches!(self.current(), Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, FilterError> {
        if matches!(self.current(), Token::Not) {
            self.advance();
            let inner = self.nested(Self::parse_not)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, FilterError> {
        let first = self.parse_primary()?;
        let mut rest = Vec::new();

        loop {
            let op = match self.current() {
                Token::Eq => CmpOp::Eq,
                Token::Ne => CmpOp::Ne,
                Token::Lt => CmpOp::Lt,
                Token::Le => CmpOp::Le,
                Token::Gt => CmpOp::Gt,
                Token::Ge => CmpOp::Ge,
                _ => break,
            };
            self.advance();
            rest.push((op, self.parse_primary()?));
        }

        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, FilterError> {
        let expr = match self.current().clone() {
            Token::True => Expr::Literal(Value::Bool(true)),
            Token::False => Expr::Literal(Value::Bool(false)),
            Token::None => Expr::Literal(Value::None),
            Token::Number(n) => Expr::Literal(Value::Number(n)),
            Token::Str(s) => Expr::Literal(Value::Str(s)),
            Token::Minus => {
                self.advance();
                return match self.current().clone() {
                    Token::Number(n) => {
                        self.advance();
                        Ok(Expr::Literal(Value::Number(-n)))
                    }
                    Token::Eof => Err(FilterError::UnexpectedEnd),
                    other => Err(FilterError::UnexpectedToken(format!("{:?}", other))),
                };
            }
            Token::Ident(name) => Expr::Field(self.resolve_field(&name)?),
            Token::LParen => {
                self.advance();
                let inner = self.nested(Self::parse_or)?;
                if !matches!(self.current(), Token::RParen) {
                    return Err(match self.current() {
                        Token::Eof => FilterError::UnexpectedEnd,
                        other => FilterError::UnexpectedToken(format!("{:?}", other)),
                    });
                }
                inner
            }
            Token::Eof => return Err(FilterError::UnexpectedEnd),
            other => return Err(FilterError::UnexpectedToken(format!("{:?}", other))),
        };
        self.advance();
        Ok(expr)
    }

    fn resolve_field(&self, name: &str) -> Result<FieldRef, FilterError> {
        let (view, key) = match name.strip_prefix('_') {
            Some(rest) => (View::Raw, rest),
            None => (View::Truthy, name),
        };
        let spec = self
            .catalog
            .resolve(key)
            .ok_or_else(|| FilterError::UnknownField(name.to_string()))?;
        Ok(FieldRef {
            key: spec.key,
            view,
            kind: spec.kind,
            financial: spec.is_financial(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_std(input: &str) -> Result<Expr, FilterError> {
        parse(input, &FieldCatalog::standard())
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        let expr = parse_std("email or phone and mobile").unwrap();
        match expr {
            Expr::Or(left, right) => {
                assert!(matches!(*left, Expr::Field(FieldRef { key: "email", .. })));
                assert!(matches!(*right, Expr::And(_, _)));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_raw_view_prefix() {
        let expr = parse_std("_email == 'ok@test.com'").unwrap();
        let Expr::Compare { first, rest } = expr else {
            panic!("expected comparison");
        };
        assert!(matches!(
            *first,
            Expr::Field(FieldRef { key: "email", view: View::Raw, .. })
        ));
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].0, CmpOp::Eq);
    }

    #[test]
    fn test_chained_comparison() {
        let expr = parse_std("0 < employees <= 10").unwrap();
        let Expr::Compare { rest, .. } = expr else {
            panic!("expected comparison");
        };
        assert_eq!(rest.iter().map(|(op, _)| *op).collect::<Vec<_>>(), vec![CmpOp::Lt, CmpOp::Le]);
    }

    #[test]
    fn test_financial_tagging() {
        assert!(!parse_std("email and not phone").unwrap().references_financial());
        assert!(parse_std("email and (net_profit > 0 or phone)").unwrap().references_financial());
        assert!(parse_std("_equity_ratio >= 30").unwrap().references_financial());
    }

    #[test]
    fn test_negative_literal() {
        let expr = parse_std("net_profit > -5").unwrap();
        let Expr::Compare { rest, .. } = expr else {
            panic!("expected comparison");
        };
        assert_eq!(rest[0].1, Expr::Literal(Value::Number(-5.0)));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_std(""), Err(FilterError::Empty));
        assert_eq!(parse_std("   "), Err(FilterError::Empty));
        assert_eq!(
            parse_std("__import__('os')"),
            Err(FilterError::UnknownField("__import__".into()))
        );
        assert_eq!(parse_std("email and"), Err(FilterError::UnexpectedEnd));
        assert_eq!(parse_std("(email or phone"), Err(FilterError::UnexpectedEnd));
        assert!(matches!(parse_std("email phone"), Err(FilterError::UnexpectedToken(_))));
    }

    #[test]
    fn test_nesting_is_bounded() {
        let parens = format!("{}email{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(parse_std(&parens).is_ok());

        let too_many = format!("{}email{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(parse_std(&too_many), Err(FilterError::TooDeep(MAX_DEPTH)));

        let nots = format!("{}email", "not ".repeat(200));
        assert_eq!(parse_std(&nots), Err(FilterError::TooDeep(MAX_DEPTH)));

        // Unbalanced input far beyond the limit still fails cleanly.
        assert!(parse_std(&"(".repeat(10_000)).is_err());
    }

    #[test]
    fn test_long_chains_are_rejected() {
        let chain = vec!["email"; 2_000].join(" and ");
        assert_eq!(parse_std(&chain), Err(FilterError::TooLong(MAX_TOKENS)));

        let short = vec!["email"; 100].join(" or ");
        assert!(parse_std(&short).is_ok());
    }
}
