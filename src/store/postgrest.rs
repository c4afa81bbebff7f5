//! HTTP table store speaking the PostgREST dialect (as served by Supabase).
//!
//! Every table is reachable at `{url}/rest/v1/{table}`; filters travel as
//! `column=operator.value` query pairs.

use std::collections::BTreeSet;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::filter::{Filter, Operator};
use super::{DataAccessError, DataResult, Match, TableQuery, TableStore};
use crate::config::StoreConfig;

/// Error body PostgREST returns on any non-2xx response.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// Table store backed by a PostgREST endpoint.
pub struct PostgrestStore {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl PostgrestStore {
    /// Create a new store client from resolved settings.
    pub fn new(config: &StoreConfig) -> DataResult<Self> {
        // reqwest is built without a default TLS provider; installing twice is a no-op
        let _ = rustls::crypto::ring::default_provider().install_default();

        let client = Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| DataAccessError::InvalidRequest {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    /// Get the base URL being used
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let mut request = self
            .client
            .request(method, &url)
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }
        request
    }

    /// Pass 2xx responses through; decode anything else into
    /// [`DataAccessError::Rejected`].
    async fn check(response: Response) -> DataResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        Err(DataAccessError::Rejected {
            status,
            code: body.code,
            message: body.message.unwrap_or(text),
            details: body.details,
            hint: body.hint,
        })
    }
}

impl TableStore for PostgrestStore {
    #[instrument(skip(self, query), fields(table = query.table()))]
    async fn select(&self, query: &TableQuery) -> DataResult<Vec<Value>> {
        let pairs = query_pairs(query);
        debug!(?pairs, "select");
        let response = self
            .request(Method::GET, query.table())
            .query(&pairs)
            .send()
            .await?;
        let rows: Vec<Value> = Self::check(response).await?.json().await?;
        Ok(rows)
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn insert(&self, table: &str, rows: &[Value]) -> DataResult<()> {
        let (body, pairs) = match rows {
            [single] => (single.clone(), Vec::new()),
            [] => (Value::Array(Vec::new()), Vec::new()),
            many => (
                Value::Array(many.to_vec()),
                vec![("columns".to_string(), insert_columns(many))],
            ),
        };
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .query(&pairs)
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self, values))]
    async fn update(&self, table: &str, values: &Value, matching: &Match) -> DataResult<()> {
        let response = self
            .request(Method::PATCH, table)
            .header("Prefer", "return=minimal")
            .query(&match_pairs(matching))
            .json(values)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, table: &str, matching: &Match) -> DataResult<()> {
        let response = self
            .request(Method::DELETE, table)
            .query(&match_pairs(matching))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Query string for a select: projection, matches, filters, ordering.
pub fn query_pairs(query: &TableQuery) -> Vec<(String, String)> {
    let mut pairs = vec![("select".to_string(), query.columns().to_string())];
    pairs.extend(match_pairs(query.matching()));
    pairs.extend(query.filters().iter().map(render_filter));
    if let Some(order) = query.ordering() {
        let direction = if order.ascending { "asc" } else { "desc" };
        pairs.push((
            "order".to_string(),
            format!("{}.{}", order.column, direction),
        ));
    }
    pairs
}

/// Union of the keys of every record, quoted: `"a","b"`. Records lacking
/// a key get the column default instead of a key-mismatch rejection.
fn insert_columns(rows: &[Value]) -> String {
    let keys: BTreeSet<&str> = rows
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();
    keys.iter()
        .map(|k| format!("\"{}\"", k))
        .collect::<Vec<_>>()
        .join(",")
}

fn match_pairs(matching: &Match) -> Vec<(String, String)> {
    matching
        .iter()
        .map(|(column, value)| (column.clone(), format!("eq.{}", render_value(value))))
        .collect()
}

/// Render one filter as a `(key, value)` query pair.
pub fn render_filter(filter: &Filter) -> (String, String) {
    let compare = |column: &str, op: Operator, value: &Value| {
        (column.to_string(), format!("{}.{}", op, render_operand(op, value)))
    };

    match filter {
        Filter::Eq(c, v) => compare(c, Operator::Eq, v),
        Filter::Neq(c, v) => compare(c, Operator::Neq, v),
        Filter::Gt(c, v) => compare(c, Operator::Gt, v),
        Filter::Gte(c, v) => compare(c, Operator::Gte, v),
        Filter::Lt(c, v) => compare(c, Operator::Lt, v),
        Filter::Lte(c, v) => compare(c, Operator::Lte, v),
        Filter::Like(c, p) => (c.clone(), format!("like.{}", p)),
        Filter::ILike(c, p) => (c.clone(), format!("ilike.{}", p)),
        Filter::Is(c, v) => compare(c, Operator::Is, v),
        Filter::In(c, vs) => (c.clone(), format!("in.{}", render_list(vs))),
        Filter::Not(c, op, v) => (
            c.clone(),
            format!("not.{}.{}", op, render_operand(*op, v)),
        ),
        Filter::Or(expression) => {
            let expression = expression.trim();
            let wrapped = if expression.starts_with('(') && expression.ends_with(')') {
                expression.to_string()
            } else {
                format!("({})", expression)
            };
            ("or".to_string(), wrapped)
        }
        Filter::Custom {
            column,
            operator,
            value,
        } => (column.clone(), format!("{}.{}", operator, render_value(value))),
    }
}

fn render_operand(op: Operator, value: &Value) -> String {
    match (op, value) {
        (Operator::In, Value::Array(values)) => render_list(values),
        _ => render_value(value),
    }
}

/// Render a scalar the way PostgREST expects it in a filter.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(quote_reserved).collect();
            format!("{{{}}}", inner.join(","))
        }
        Value::Object(_) => value.to_string(),
    }
}

/// Render an `in` list: `(a,b,"c,d")`.
pub fn render_list(values: &[Value]) -> String {
    let inner: Vec<String> = values.iter().map(quote_reserved).collect();
    format!("({})", inner.join(","))
}

fn quote_reserved(value: &Value) -> String {
    let raw = render_value(value);
    if raw.contains([',', '(', ')', '"', '{', '}']) || raw.contains(char::is_whitespace) {
        format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        raw
    }
}
