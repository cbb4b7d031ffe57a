//! Comparison operators for `{% if lhs op rhs %}` blocks.

use std::cmp::Ordering;

use crate::error::{Result, TemplateError};
use crate::value::Value;

/// Comparison operator of a three-token `if` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<=`
    Lte,
    /// `>=`
    Gte,
}

impl CompareOp {
    /// Looks up an operator by its template spelling.
    pub fn parse(op: &str) -> Option<CompareOp> {
        match op {
            "<" => Some(CompareOp::Lt),
            ">" => Some(CompareOp::Gt),
            "==" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            "<=" => Some(CompareOp::Lte),
            ">=" => Some(CompareOp::Gte),
            _ => None,
        }
    }

    /// Returns `true` for `==` and `!=`, which never fail.
    pub fn is_equality(self) -> bool {
        matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    /// Evaluates the comparison given an ordering result.
    pub fn eval_ordering(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
        }
    }

    /// Applies the operator to two values.
    ///
    /// Equality works between any values; ordering operators fail when the
    /// values have no order (a string against a number, say).
    pub fn apply(self, lhs: &Value, rhs: &Value) -> Result<bool> {
        match self {
            CompareOp::Eq => Ok(lhs == rhs),
            CompareOp::Ne => Ok(lhs != rhs),
            _ => match lhs.compare(rhs) {
                Some(ordering) => Ok(self.eval_ordering(ordering)),
                None => Err(TemplateError::Incomparable {
                    lhs: lhs.kind_name(),
                    op: self.as_str().to_string(),
                    rhs: rhs.kind_name(),
                }),
            },
        }
    }

    /// Returns the template spelling of this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lte => "<=",
            CompareOp::Gte => ">=",
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
