//! Query vocabulary: match specifications, ordering, select options and
//! the [`TableQuery`] builder a [`TableStore`](super::TableStore) executes.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::Value;

use super::filter::{Filter, ParseFilterError, parse_scalar};

/// Column to exact-value mapping, conjunctive across keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Match(BTreeMap<String, Value>);

impl Match {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match rows whose `column` equals `value`.
    pub fn by(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and(column, value)
    }

    /// Add another required column value.
    pub fn and(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Merge `other` into `self`; entries in `other` win.
    pub fn extend(&mut self, other: &Match) {
        for (column, value) in other.iter() {
            self.0.insert(column.clone(), value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Match {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl FromStr for Match {
    type Err = ParseFilterError;

    /// Parse a single `column=value` pair.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((column, raw)) if !column.is_empty() => Ok(Match::by(column, parse_scalar(raw))),
            _ => Err(ParseFilterError {
                message: format!("expected column=value, got '{}'", s),
            }),
        }
    }
}

/// Ordering clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }
}

impl FromStr for OrderBy {
    type Err = ParseFilterError;

    /// Parse `column`, `column.asc` or `column.desc`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, ascending) = match s.rsplit_once('.') {
            Some((column, "asc")) => (column, true),
            Some((column, "desc")) => (column, false),
            _ => (s, true),
        };
        if column.is_empty() {
            return Err(ParseFilterError {
                message: "order column must not be empty".to_string(),
            });
        }
        Ok(Self {
            column: column.to_string(),
            ascending,
        })
    }
}

/// Options accepted by [`TableAdapter::select`](super::TableAdapter::select).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOptions {
    /// Column projection; `None` selects every column.
    pub columns: Option<String>,
    pub matching: Match,
    /// Applied in order, after `matching`.
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    pub fn matching(mut self, matching: Match) -> Self {
        self.matching.extend(&matching);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }
}

/// Select query as handed to the remote store.
///
/// Built by chaining: projection, exact matches, filters in application
/// order, then ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    table: String,
    columns: String,
    matching: Match,
    filters: Vec<Filter>,
    order: Option<OrderBy>,
}

impl TableQuery {
    /// Start a query selecting every column of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            matching: Match::new(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn match_all(mut self, matching: &Match) -> Self {
        self.matching.extend(matching);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &str {
        &self.columns
    }

    pub fn matching(&self) -> &Match {
        &self.matching
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<&OrderBy> {
        self.order.as_ref()
    }
}
