//! Record filtering with a small, closed boolean expression language.
//!
//! Expressions are parsed once per run into a tree whose leaves are tagged as
//! general or financial. That tagging drives the two-pass protocol: the
//! general part is checked first, and a record only costs an accounts lookup
//! when the general part cannot already rule it out.

pub mod eval;
pub mod lexer;
pub mod parser;

use crate::domain::catalog::FieldCatalog;
use thiserror::Error;

pub use eval::{evaluate, FieldLookup, RecordScope, Value, Verdict};
pub use parser::{CmpOp, Expr, FieldRef, View};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("unterminated string literal starting at position {0}")]
    UnterminatedString(usize),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("expression is empty")]
    Empty,
    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
    #[error("expression is longer than {0} tokens")]
    TooLong(usize),
}

/// A compiled filter expression.
#[derive(Debug, Clone)]
pub struct FilterExpression {
    source: String,
    root: Expr,
    financial: bool,
}

impl FilterExpression {
    pub fn compile(source: &str, catalog: &FieldCatalog) -> Result<Self, FilterError> {
        let root = parser::parse(source, catalog)?;
        let financial = root.references_financial();
        Ok(Self {
            source: source.trim().to_string(),
            root,
            financial,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn references_financial(&self) -> bool {
        self.financial
    }

    /// Full evaluation. Any evaluation error means "does not match".
    pub fn matches(&self, scope: &dyn FieldLookup) -> bool {
        match evaluate(&self.root, scope) {
            Ok(value) => value.is_truthy(),
            Err(e) => {
                tracing::debug!("Filter evaluation failed, treating as no match: {}", e);
                false
            }
        }
    }

    /// Preliminary pass over the general part of the expression only.
    pub fn preliminary(&self, scope: &dyn FieldLookup) -> Verdict {
        eval::assess(&self.root, scope)
    }
}

/// The filter a run applies to every record.
#[derive(Debug, Clone)]
pub enum RecordFilter {
    AcceptAll,
    Expression(FilterExpression),
    /// The expression could not be compiled; every record is rejected.
    Unusable { source: String, reason: FilterError },
}

impl RecordFilter {
    pub fn from_source(source: Option<&str>, catalog: &FieldCatalog) -> Self {
        let Some(source) = source.filter(|s| !s.trim().is_empty()) else {
            return RecordFilter::AcceptAll;
        };

        match FilterExpression::compile(source, catalog) {
            Ok(expression) => {
                tracing::info!(
                    "🔎 Filter: {} ({})",
                    expression.source(),
                    if expression.references_financial() {
                        "uses financial fields"
                    } else {
                        "general fields only"
                    }
                );
                RecordFilter::Expression(expression)
            }
            Err(reason) => {
                tracing::warn!(
                    "⚠️ Filter '{}' is invalid ({}); no records will match",
                    source,
                    reason
                );
                RecordFilter::Unusable {
                    source: source.to_string(),
                    reason,
                }
            }
        }
    }

    pub fn references_financial(&self) -> bool {
        matches!(self, RecordFilter::Expression(e) if e.references_financial())
    }
}
