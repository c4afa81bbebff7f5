//! Filter expressions applied during a select.
//!
//! [`Filter`] is a closed sum type: one constructor per comparison operator,
//! a raw disjunction carrying a backend expression string, and a named
//! escape hatch for operators the enum does not enumerate.

use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

/// Comparison operators understood by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    Is,
    In,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::Is => "is",
            Operator::In => "in",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(Operator::Eq),
            "neq" => Ok(Operator::Neq),
            "gt" => Ok(Operator::Gt),
            "gte" => Ok(Operator::Gte),
            "lt" => Ok(Operator::Lt),
            "lte" => Ok(Operator::Lte),
            "like" => Ok(Operator::Like),
            "ilike" => Ok(Operator::ILike),
            "is" => Ok(Operator::Is),
            "in" => Ok(Operator::In),
            other => Err(ParseFilterError {
                message: format!("unknown operator '{}'", other),
            }),
        }
    }
}

/// A single filter applied to a select query.
///
/// Filters are conjunctive with each other and with the match
/// specification. [`Filter::Or`] unions the conditions inside its own
/// expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Neq(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    /// Case-sensitive pattern match (`%` any run, `_` one character).
    Like(String, String),
    /// Case-insensitive pattern match.
    ILike(String, String),
    /// Identity check against `null`, `true` or `false`.
    Is(String, Value),
    In(String, Vec<Value>),
    /// Negation of `column <operator> value`.
    Not(String, Operator, Value),
    /// Raw disjunction in the backend's expression syntax,
    /// e.g. `name.like.%Tracker%,status.eq.2`.
    Or(String),
    /// Escape hatch for operators not enumerated above (`cs`, `fts`, ...).
    Custom {
        column: String,
        operator: String,
        value: Value,
    },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Neq(column.into(), value.into())
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gt(column.into(), value.into())
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gte(column.into(), value.into())
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt(column.into(), value.into())
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lte(column.into(), value.into())
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::Like(column.into(), pattern.into())
    }

    pub fn ilike(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::ILike(column.into(), pattern.into())
    }

    pub fn is(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Is(column.into(), value.into())
    }

    pub fn in_set<V: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn not(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Filter::Not(column.into(), operator, value.into())
    }

    pub fn or(expression: impl Into<String>) -> Self {
        Filter::Or(expression.into())
    }

    pub fn custom(
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Filter::Custom {
            column: column.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// Column the filter constrains; `None` for a disjunction.
    pub fn column(&self) -> Option<&str> {
        match self {
            Filter::Eq(c, _)
            | Filter::Neq(c, _)
            | Filter::Gt(c, _)
            | Filter::Gte(c, _)
            | Filter::Lt(c, _)
            | Filter::Lte(c, _)
            | Filter::Is(c, _)
            | Filter::Not(c, _, _) => Some(c),
            Filter::Like(c, _) | Filter::ILike(c, _) => Some(c),
            Filter::In(c, _) => Some(c),
            Filter::Custom { column, .. } => Some(column),
            Filter::Or(_) => None,
        }
    }
}

/// Failure to parse a textual filter.
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
#[error("Invalid filter: {message}")]
#[diagnostic(
    code(tracker::store::invalid_filter),
    help("Use op:column:value (e.g. like:name:%Tracker%), not.op:column:value or or:expression")
)]
pub struct ParseFilterError {
    pub message: String,
}

/// Parse a scalar from its textual form: JSON literals (numbers, booleans,
/// null) keep their type, anything else is a string.
pub fn parse_scalar(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(v @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => v,
        _ => Value::String(raw.to_string()),
    }
}

fn parse_operand(operator: Operator, raw: &str) -> Value {
    match operator {
        Operator::Like | Operator::ILike => Value::String(raw.to_string()),
        Operator::In => Value::Array(raw.split(',').map(|s| parse_scalar(s.trim())).collect()),
        _ => parse_scalar(raw),
    }
}

impl FromStr for Filter {
    type Err = ParseFilterError;

    /// Parse `op:column:value`, `not.op:column:value` or `or:expression`.
    /// Operators outside the enumerated set become [`Filter::Custom`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(expression) = s.strip_prefix("or:") {
            if expression.trim().is_empty() {
                return Err(ParseFilterError {
                    message: "or expression must not be empty".to_string(),
                });
            }
            return Ok(Filter::Or(expression.to_string()));
        }

        let mut parts = s.splitn(3, ':');
        let (Some(op), Some(column), Some(raw)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ParseFilterError {
                message: format!("expected op:column:value, got '{}'", s),
            });
        };
        if column.is_empty() {
            return Err(ParseFilterError {
                message: format!("missing column in '{}'", s),
            });
        }

        if let Some(negated) = op.strip_prefix("not.") {
            let operator: Operator = negated.parse()?;
            return Ok(Filter::Not(
                column.to_string(),
                operator,
                parse_operand(operator, raw),
            ));
        }

        let column = column.to_string();
        let filter = match op.parse::<Operator>() {
            Ok(Operator::Eq) => Filter::Eq(column, parse_scalar(raw)),
            Ok(Operator::Neq) => Filter::Neq(column, parse_scalar(raw)),
            Ok(Operator::Gt) => Filter::Gt(column, parse_scalar(raw)),
            Ok(Operator::Gte) => Filter::Gte(column, parse_scalar(raw)),
            Ok(Operator::Lt) => Filter::Lt(column, parse_scalar(raw)),
            Ok(Operator::Lte) => Filter::Lte(column, parse_scalar(raw)),
            Ok(Operator::Like) => Filter::Like(column, raw.to_string()),
            Ok(Operator::ILike) => Filter::ILike(column, raw.to_string()),
            Ok(Operator::Is) => Filter::Is(column, parse_scalar(raw)),
            Ok(Operator::In) => match parse_operand(Operator::In, raw) {
                Value::Array(values) => Filter::In(column, values),
                other => Filter::In(column, vec![other]),
            },
            Err(_) if !op.is_empty() => Filter::Custom {
                column,
                operator: op.to_string(),
                value: parse_scalar(raw),
            },
            Err(e) => return Err(e),
        };
        Ok(filter)
    }
}
