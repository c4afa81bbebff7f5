//! In-process table store.
//!
//! Keeps rows as JSON objects and evaluates the full filter vocabulary
//! locally with SQL-like semantics: comparisons against a missing or null
//! column are unknown, and unknown never satisfies a filter (not even
//! negated). Useful as the substitutable fake for anything built on
//! [`TableAdapter`](super::TableAdapter).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::debug;

use super::filter::{Filter, Operator};
use super::{DataAccessError, DataResult, Match, OrderBy, TableQuery, TableStore};

type Row = Map<String, Value>;

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Row>,
    next_id: i64,
}

/// Table store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty table. Operations on unregistered tables are
    /// rejected the way a remote store rejects an unknown relation.
    pub fn with_table(self, name: impl Into<String>) -> Self {
        self.lock().entry(name.into()).or_insert_with(|| Table {
            rows: Vec::new(),
            next_id: 1,
        });
        self
    }

    /// Snapshot of every row in `table`, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock()
            .get(table)
            .map(|t| t.rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Table>> {
        // A panic while holding the lock leaves the rows intact.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn unknown_table(table: &str) -> DataAccessError {
    DataAccessError::rejected(
        404,
        Some("PGRST205"),
        format!("Could not find the table 'public.{}' in the schema cache", table),
    )
}

fn bad_filter(message: impl Into<String>) -> DataAccessError {
    DataAccessError::rejected(400, Some("PGRST100"), message)
}

impl TableStore for MemoryStore {
    async fn select(&self, query: &TableQuery) -> DataResult<Vec<Value>> {
        let tables = self.lock();
        let table = tables
            .get(query.table())
            .ok_or_else(|| unknown_table(query.table()))?;

        let mut selected = Vec::new();
        for row in &table.rows {
            if !matches_all(row, query.matching()) {
                continue;
            }
            let mut keep = true;
            for filter in query.filters() {
                if !eval_filter(row, filter)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                selected.push(row);
            }
        }

        if let Some(order) = query.ordering() {
            selected.sort_by(|a, b| order_rows(a, b, order));
        }

        debug!(table = query.table(), rows = selected.len(), "memory select");
        Ok(selected
            .into_iter()
            .map(|row| Value::Object(project(row, query.columns())))
            .collect())
    }

    async fn insert(&self, table: &str, rows: &[Value]) -> DataResult<()> {
        let mut tables = self.lock();
        let target = tables.get_mut(table).ok_or_else(|| unknown_table(table))?;

        let mut staged = Vec::with_capacity(rows.len());
        let mut next_id = target.next_id;
        for value in rows {
            let Value::Object(fields) = value else {
                return Err(DataAccessError::rejected(
                    400,
                    Some("PGRST102"),
                    "All object keys must match",
                ));
            };
            let mut row = fields.clone();
            match row.get("id").and_then(Value::as_i64) {
                Some(id) => {
                    let taken = target
                        .rows
                        .iter()
                        .chain(staged.iter())
                        .any(|r| r.get("id").and_then(Value::as_i64) == Some(id));
                    if taken {
                        return Err(DataAccessError::Rejected {
                            status: 409,
                            code: Some("23505".to_string()),
                            message: format!(
                                "duplicate key value violates unique constraint \"{}_pkey\"",
                                table
                            ),
                            details: Some(format!("Key (id)=({}) already exists.", id)),
                            hint: None,
                        });
                    }
                    next_id = next_id.max(id + 1);
                }
                None => {
                    row.insert("id".to_string(), Value::from(next_id));
                    next_id += 1;
                }
            }
            row.entry("created_at")
                .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
            staged.push(row);
        }

        target.next_id = next_id;
        target.rows.extend(staged);
        Ok(())
    }

    async fn update(&self, table: &str, values: &Value, matching: &Match) -> DataResult<()> {
        let Value::Object(changes) = values else {
            return Err(DataAccessError::rejected(
                400,
                Some("PGRST102"),
                "Update body must be an object",
            ));
        };

        let mut tables = self.lock();
        let target = tables.get_mut(table).ok_or_else(|| unknown_table(table))?;
        let mut touched = 0usize;
        for row in target.rows.iter_mut().filter(|r| matches_all(r, matching)) {
            for (column, value) in changes {
                row.insert(column.clone(), value.clone());
            }
            touched += 1;
        }
        debug!(table, rows = touched, "memory update");
        Ok(())
    }

    async fn delete(&self, table: &str, matching: &Match) -> DataResult<()> {
        let mut tables = self.lock();
        let target = tables.get_mut(table).ok_or_else(|| unknown_table(table))?;
        let before = target.rows.len();
        target.rows.retain(|r| !matches_all(r, matching));
        debug!(table, rows = before - target.rows.len(), "memory delete");
        Ok(())
    }
}

fn project(row: &Row, columns: &str) -> Row {
    let wanted: Vec<&str> = columns.split(',').map(str::trim).collect();
    if wanted.iter().any(|c| *c == "*") {
        return row.clone();
    }
    wanted
        .into_iter()
        .filter(|c| !c.is_empty())
        .map(|c| (c.to_string(), row.get(c).cloned().unwrap_or(Value::Null)))
        .collect()
}

fn matches_all(row: &Row, matching: &Match) -> bool {
    matching
        .iter()
        .all(|(column, value)| compare_op(row.get(column), Operator::Eq, value) == Some(true))
}

fn order_rows(a: &Row, b: &Row, order: &OrderBy) -> Ordering {
    let left = a.get(&order.column).filter(|v| !v.is_null());
    let right = b.get(&order.column).filter(|v| !v.is_null());
    match (left, right) {
        (None, None) => Ordering::Equal,
        // Nulls sort last ascending and first descending.
        (None, Some(_)) => {
            if order.ascending {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Some(_), None) => {
            if order.ascending {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (Some(l), Some(r)) => {
            let ord = compare_values(l, r).unwrap_or(Ordering::Equal);
            if order.ascending { ord } else { ord.reverse() }
        }
    }
}

fn eval_filter(row: &Row, filter: &Filter) -> DataResult<bool> {
    let verdict = match filter {
        Filter::Eq(c, v) => compare_op(row.get(c), Operator::Eq, v),
        Filter::Neq(c, v) => compare_op(row.get(c), Operator::Neq, v),
        Filter::Gt(c, v) => compare_op(row.get(c), Operator::Gt, v),
        Filter::Gte(c, v) => compare_op(row.get(c), Operator::Gte, v),
        Filter::Lt(c, v) => compare_op(row.get(c), Operator::Lt, v),
        Filter::Lte(c, v) => compare_op(row.get(c), Operator::Lte, v),
        Filter::Like(c, p) => compare_op(row.get(c), Operator::Like, &Value::String(p.clone())),
        Filter::ILike(c, p) => compare_op(row.get(c), Operator::ILike, &Value::String(p.clone())),
        Filter::Is(c, v) => compare_op(row.get(c), Operator::Is, v),
        Filter::In(c, vs) => compare_op(row.get(c), Operator::In, &Value::Array(vs.clone())),
        Filter::Not(c, op, v) => compare_op(row.get(c), *op, v).map(|b| !b),
        Filter::Custom {
            column,
            operator,
            value,
        } => {
            let op: Operator = operator
                .parse()
                .map_err(|_| bad_filter(format!("unknown operator '{}'", operator)))?;
            compare_op(row.get(column), op, value)
        }
        Filter::Or(expression) => {
            let conditions = parse_logic_list(expression)?;
            Some(conditions.iter().any(|c| c.eval(row) == Some(true)))
        }
    };
    Ok(verdict == Some(true))
}

/// Three-valued comparison: `None` when the row value is missing or null
/// (except for `is`, which is always decided).
fn compare_op(actual: Option<&Value>, op: Operator, expected: &Value) -> Option<bool> {
    let actual = actual.unwrap_or(&Value::Null);

    if op == Operator::Is {
        let expected = match expected {
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "null" => Value::Null,
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => return Some(false),
            },
            other => other.clone(),
        };
        return Some(match expected {
            Value::Null => actual.is_null(),
            Value::Bool(b) => actual.as_bool() == Some(b),
            _ => false,
        });
    }

    if actual.is_null() {
        return None;
    }

    match op {
        Operator::Eq => compare_values(actual, expected).map(|o| o == Ordering::Equal),
        Operator::Neq => compare_values(actual, expected).map(|o| o != Ordering::Equal),
        Operator::Gt => compare_values(actual, expected).map(|o| o == Ordering::Greater),
        Operator::Gte => compare_values(actual, expected).map(|o| o != Ordering::Less),
        Operator::Lt => compare_values(actual, expected).map(|o| o == Ordering::Less),
        Operator::Lte => compare_values(actual, expected).map(|o| o != Ordering::Greater),
        Operator::Like | Operator::ILike => {
            let text = match actual {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let pattern = match expected {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some(if op == Operator::ILike {
                like(&text.to_lowercase(), &pattern.to_lowercase())
            } else {
                like(&text, &pattern)
            })
        }
        Operator::In => {
            let candidates = match expected {
                Value::Array(values) => values.as_slice(),
                single => std::slice::from_ref(single),
            };
            // None when no candidate is comparable
            let mut verdict = None;
            for candidate in candidates {
                match compare_values(actual, candidate) {
                    Some(Ordering::Equal) => return Some(true),
                    Some(_) => verdict = Some(false),
                    None => {}
                }
            }
            verdict
        }
        Operator::Is => unreachable!("handled above"),
    }
}

/// Order two values, coercing a textual `expected` to the type of `actual`
/// the way the backend casts literals to the column type.
fn compare_values(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Number(a), Value::String(b)) => a.as_f64()?.partial_cmp(&b.trim().parse::<f64>().ok()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::Number(b)) => Some(a.as_str().cmp(b.to_string().as_str())),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::String(b)) => Some(a.cmp(&b.parse::<bool>().ok()?)),
        _ => None,
    }
}

/// SQL `LIKE`: `%` (or `*`) matches any run, `_` exactly one character,
/// `\` escapes the next character.
fn like(text: &str, pattern: &str) -> bool {
    #[derive(Clone, Copy, PartialEq)]
    enum Token {
        Any,
        One,
        Char(char),
    }

    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' | '*' => Token::Any,
            '_' => Token::One,
            '\\' => Token::Char(chars.next().unwrap_or('\\')),
            other => Token::Char(other),
        });
    }

    let text: Vec<char> = text.chars().collect();
    // reachable[j]: pattern prefix consumed so far can end at text position j
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;
    for token in tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Token::Any => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= reachable[j];
                    next[j] = seen;
                }
            }
            Token::One => {
                for j in 0..text.len() {
                    next[j + 1] = reachable[j];
                }
            }
            Token::Char(c) => {
                for j in 0..text.len() {
                    next[j + 1] = reachable[j] && text[j] == c;
                }
            }
        }
        reachable = next;
    }
    reachable[text.len()]
}

/// Condition tree of a disjunction expression.
#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Compare {
        column: String,
        negated: bool,
        operator: Operator,
        value: Value,
    },
    Group {
        any: bool,
        negated: bool,
        items: Vec<Condition>,
    },
}

impl Condition {
    fn eval(&self, row: &Row) -> Option<bool> {
        match self {
            Condition::Compare {
                column,
                negated,
                operator,
                value,
            } => {
                let verdict = compare_op(row.get(column), *operator, value);
                if *negated { verdict.map(|b| !b) } else { verdict }
            }
            Condition::Group {
                any,
                negated,
                items,
            } => {
                let verdicts: Vec<Option<bool>> = items.iter().map(|c| c.eval(row)).collect();
                let verdict = if *any {
                    if verdicts.contains(&Some(true)) {
                        Some(true)
                    } else if verdicts.contains(&None) {
                        None
                    } else {
                        Some(false)
                    }
                } else if verdicts.contains(&Some(false)) {
                    Some(false)
                } else if verdicts.contains(&None) {
                    None
                } else {
                    Some(true)
                };
                if *negated { verdict.map(|b| !b) } else { verdict }
            }
        }
    }
}

/// Split on commas that are not inside parentheses or double quotes.
fn split_top_level(input: &str) -> DataResult<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth -= 1;
                if depth < 0 {
                    return Err(bad_filter(format!("unbalanced parentheses in '{}'", input)));
                }
            }
            ',' if !quoted && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || quoted {
        return Err(bad_filter(format!("unbalanced expression '{}'", input)));
    }
    parts.push(&input[start..]);
    Ok(parts)
}

fn unquote(raw: &str) -> &str {
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw)
}

fn parse_logic_list(input: &str) -> DataResult<Vec<Condition>> {
    let input = input.trim();
    let input = input
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(input);
    split_top_level(input)?
        .into_iter()
        .map(|item| parse_condition(item.trim()))
        .collect()
}

fn parse_condition(item: &str) -> DataResult<Condition> {
    for (prefix, any, negated) in [
        ("not.and(", false, true),
        ("not.or(", true, true),
        ("and(", false, false),
        ("or(", true, false),
    ] {
        if let Some(rest) = item.strip_prefix(prefix) {
            let inner = rest
                .strip_suffix(')')
                .ok_or_else(|| bad_filter(format!("unclosed group in '{}'", item)))?;
            return Ok(Condition::Group {
                any,
                negated,
                items: parse_logic_list(inner)?,
            });
        }
    }

    let (column, rest) = item
        .split_once('.')
        .ok_or_else(|| bad_filter(format!("expected column.operator.value, got '{}'", item)))?;
    let (negated, rest) = match rest.strip_prefix("not.") {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    let (op, raw) = rest
        .split_once('.')
        .ok_or_else(|| bad_filter(format!("expected column.operator.value, got '{}'", item)))?;
    let operator: Operator = op
        .parse()
        .map_err(|_| bad_filter(format!("unknown operator '{}'", op)))?;

    let value = if operator == Operator::In {
        let inner = raw
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| bad_filter(format!("in expects a (list), got '{}'", raw)))?;
        Value::Array(
            split_top_level(inner)?
                .into_iter()
                .map(|v| Value::String(unquote(v.trim()).to_string()))
                .collect(),
        )
    } else {
        Value::String(unquote(raw).to_string())
    };

    Ok(Condition::Compare {
        column: column.to_string(),
        negated,
        operator,
        value,
    })
}
