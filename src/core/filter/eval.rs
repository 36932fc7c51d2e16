use super::parser::{CmpOp, Expr, FieldRef, View};
use crate::domain::model::{CanonicalRecord, FieldValue, FinancialSnapshot};
use std::cmp::Ordering;
use thiserror::Error;

/// Runtime value inside the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "str",
        }
    }

    /// Booleans take part in arithmetic comparisons as 0 and 1.
    fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("field '{0}' is not available in this pass")]
    Unavailable(&'static str),
    #[error("cannot compare {left} {op:?} {right}")]
    Incomparable {
        op: CmpOp,
        left: &'static str,
        right: &'static str,
    },
}

/// Outcome of evaluating a filter before financial data is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Match,
    Reject,
    Undecided,
}

impl Verdict {
    fn negate(self) -> Self {
        match self {
            Verdict::Match => Verdict::Reject,
            Verdict::Reject => Verdict::Match,
            Verdict::Undecided => Verdict::Undecided,
        }
    }
}

/// Resolves field references to evaluator values.
pub trait FieldLookup {
    /// `None` when the field cannot be answered by this scope at all.
    fn lookup(&self, field: &FieldRef) -> Option<Value>;
}

/// The namespace a filter sees: one record, plus its financial snapshot once
/// it has been fetched.
#[derive(Debug, Clone, Copy)]
pub struct RecordScope<'a> {
    record: &'a CanonicalRecord,
    financials: Option<&'a FinancialSnapshot>,
}

impl<'a> RecordScope<'a> {
    pub fn general(record: &'a CanonicalRecord) -> Self {
        Self {
            record,
            financials: None,
        }
    }

    pub fn with_financials(record: &'a CanonicalRecord, financials: &'a FinancialSnapshot) -> Self {
        Self {
            record,
            financials: Some(financials),
        }
    }
}

impl FieldLookup for RecordScope<'_> {
    fn lookup(&self, field: &FieldRef) -> Option<Value> {
        static EMPTY: FieldValue = FieldValue::Empty;

        if field.financial {
            let value = self.financials?.get(field.key).unwrap_or(&EMPTY);
            // 財務數值一律轉成數字，缺值或無法解析時為 0
            if field.kind.is_numeric() {
                return Some(Value::Number(value.as_number().unwrap_or(0.0)));
            }
            return Some(project(value, field.view));
        }

        let value = self.record.get(field.key).unwrap_or(&EMPTY);
        Some(project(value, field.view))
    }
}

fn project(value: &FieldValue, view: View) -> Value {
    match (view, value) {
        (View::Truthy, FieldValue::Empty) => Value::Bool(false),
        (View::Truthy, text @ FieldValue::Text(_)) => Value::Bool(!text.is_blank()),
        (View::Raw, FieldValue::Empty) => Value::None,
        (View::Raw, FieldValue::Text(s)) => Value::Str(s.clone()),
        (_, FieldValue::Bool(b)) => Value::Bool(*b),
        (_, FieldValue::Number(n)) => Value::Number(*n),
    }
}

/// Evaluates with short-circuiting `and`/`or` that yield operand values.
pub fn evaluate(expr: &Expr, scope: &dyn FieldLookup) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Field(field) => scope.lookup(field).ok_or(EvalError::Unavailable(field.key)),
        Expr::Not(inner) => Ok(Value::Bool(!evaluate(inner, scope)?.is_truthy())),
        Expr::And(left, right) => {
            let value = evaluate(left, scope)?;
            if value.is_truthy() {
                evaluate(right, scope)
            } else {
                Ok(value)
            }
        }
        Expr::Or(left, right) => {
            let value = evaluate(left, scope)?;
            if value.is_truthy() {
                Ok(value)
            } else {
                evaluate(right, scope)
            }
        }
        Expr::Compare { first, rest } => {
            let mut left = evaluate(first, scope)?;
            for (op, operand) in rest {
                let right = evaluate(operand, scope)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
    }
}

/// Partial evaluation for the preliminary pass.
///
/// Subtrees free of financial fields are evaluated for real; financial
/// subtrees are `Undecided`. `Reject` is only returned when no assignment of
/// financial values could make the whole expression match, so rejecting on
/// it never changes the final outcome.
pub fn assess(expr: &Expr, scope: &dyn FieldLookup) -> Verdict {
    if !expr.references_financial() {
        return match evaluate(expr, scope) {
            Ok(value) if value.is_truthy() => Verdict::Match,
            Ok(_) => Verdict::Reject,
            Err(_) => Verdict::Undecided,
        };
    }

    match expr {
        Expr::Not(inner) => assess(inner, scope).negate(),
        Expr::And(left, right) => match (assess(left, scope), assess(right, scope)) {
            (Verdict::Reject, _) | (_, Verdict::Reject) => Verdict::Reject,
            (Verdict::Match, Verdict::Match) => Verdict::Match,
            _ => Verdict::Undecided,
        },
        Expr::Or(left, right) => match (assess(left, scope), assess(right, scope)) {
            (Verdict::Match, _) | (_, Verdict::Match) => Verdict::Match,
            (Verdict::Reject, Verdict::Reject) => Verdict::Reject,
            _ => Verdict::Undecided,
        },
        _ => Verdict::Undecided,
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    match op {
        CmpOp::Eq => Ok(values_equal(left, right)),
        CmpOp::Ne => Ok(!values_equal(left, right)),
        _ => {
            let ordering = order(left, right).ok_or(EvalError::Incomparable {
                op,
                left: left.type_name(),
                right: right.type_name(),
            })?;
            Ok(match op {
                CmpOp::Lt => ordering == Ordering::Less,
                CmpOp::Le => ordering != Ordering::Greater,
                CmpOp::Gt => ordering == Ordering::Greater,
                CmpOp::Ge => ordering != Ordering::Less,
                CmpOp::Eq | CmpOp::Ne => unreachable!("handled above"),
            })
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Str(a), Value::Str(b)) => a == b,
        _ => match (left.as_numeric(), right.as_numeric()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => left.as_numeric()?.partial_cmp(&right.as_numeric()?),
    }
}
