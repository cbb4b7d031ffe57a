//! Expressions and name resolution.
//!
//! An expression token is first tried against the literal grammar; only if
//! that fails is the whole token treated as a dotted name. So `0` used as an
//! expression is the integer zero, while in `items.0` the `0` is an index.

use std::borrow::Cow;

use crate::context::Scope;
use crate::error::{Result, TemplateError};
use crate::literal::parse_literal;
use crate::value::Value;

/// A compiled expression: a literal value or a dotted name.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A value fixed at compile time.
    Literal(Value),
    /// A dotted path resolved against the scope at render time.
    Name(String),
}

impl Expression {
    /// Parses a token, preferring the literal reading.
    ///
    /// # Example
    ///
    /// ```
    /// use onebot_template::{Expression, Value};
    ///
    /// assert_eq!(Expression::parse("3"), Expression::Literal(Value::from(3)));
    /// assert_eq!(Expression::parse("item.title"), Expression::Name("item.title".into()));
    /// ```
    pub fn parse(token: &str) -> Expression {
        match parse_literal(token) {
            Some(value) => Expression::Literal(value),
            None => Expression::Name(token.to_string()),
        }
    }

    /// Evaluates the expression in `scope`.
    pub fn evaluate(&self, scope: &Scope<'_>) -> Result<Value> {
        match self {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Name(path) => resolve(path, scope),
        }
    }

    /// Returns `true` for literal expressions.
    pub fn is_literal(&self) -> bool {
        matches!(self, Expression::Literal(_))
    }
}

/// Resolves a dotted path against a scope.
///
/// Every leading `..` moves one scope outwards. The first segment is looked up
/// among the scope's own bindings; each later segment tries a map key, then a
/// list index (all-digit segments only), then an object field.
///
/// # Errors
///
/// [`TemplateError::Unresolved`] naming the whole path if any segment fails.
pub fn resolve(path: &str, scope: &Scope<'_>) -> Result<Value> {
    let unresolved = || TemplateError::Unresolved(path.to_string());

    let mut scope = scope;
    let mut name = path;
    while let Some(rest) = name.strip_prefix("..") {
        scope = scope.parent().ok_or_else(unresolved)?;
        name = rest;
    }

    let mut segments = name.split('.');
    let first = segments.next().unwrap_or_default();
    let mut current = Cow::Borrowed(scope.lookup(first).ok_or_else(unresolved)?);
    for segment in segments {
        current = extract(current, segment).ok_or_else(unresolved)?;
    }
    Ok(current.into_owned())
}

fn extract<'v>(current: Cow<'v, Value>, segment: &str) -> Option<Cow<'v, Value>> {
    match current {
        Cow::Borrowed(value) => value
            .get_key(segment)
            .or_else(|| value.get_index(segment))
            .map(Cow::Borrowed)
            .or_else(|| value.get_field(segment).map(Cow::Owned)),
        Cow::Owned(value) => value
            .get_key(segment)
            .or_else(|| value.get_index(segment))
            .cloned()
            .or_else(|| value.get_field(segment))
            .map(Cow::Owned),
    }
}
