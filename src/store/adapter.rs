//! Table data adapter.
//!
//! Maps the select/insert/update/remove vocabulary onto a [`TableStore`].
//! The adapter never looks inside payloads: record types are the caller's,
//! constraints are the store's.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{DataAccessError, DataResult, Match, SelectOptions, TableQuery, TableStore};

/// Generic CRUD + filter access over named tables of a remote store.
pub struct TableAdapter<S> {
    store: S,
    timeout: Option<Duration>,
}

impl<S: TableStore> TableAdapter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            timeout: None,
        }
    }

    /// Fail any call that takes longer than `timeout` with
    /// [`DataAccessError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Select rows from `table`, decoded into the caller's record type.
    ///
    /// The query applies `matching` first, then each filter in order, then
    /// the ordering clause.
    #[instrument(skip(self, options), fields(filters = options.filters.len()))]
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        options: SelectOptions,
    ) -> DataResult<Vec<T>> {
        validate_table(table)?;

        let mut query = TableQuery::new(table).select(options.columns.as_deref().unwrap_or("*"));
        if !options.matching.is_empty() {
            query = query.match_all(&options.matching);
        }
        for filter in options.filters {
            query = query.filter(filter);
        }
        if let Some(order) = options.order_by {
            query = query.order(order);
        }

        let rows = self.deadline(self.store.select(&query)).await?;
        debug!(rows = rows.len(), "select complete");

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| DataAccessError::InvalidResponse {
                    message: format!("row from '{}' does not match record type: {}", table, e),
                })
            })
            .collect()
    }

    /// Insert a single record or a sequence of records.
    ///
    /// Generated identifiers are not returned; re-select to observe them.
    #[instrument(skip(self, values))]
    pub async fn insert<R: Serialize + ?Sized>(&self, table: &str, values: &R) -> DataResult<()> {
        validate_table(table)?;

        let rows = match to_json(values)? {
            Value::Array(rows) => rows,
            row @ Value::Object(_) => vec![row],
            other => {
                return Err(DataAccessError::InvalidRequest {
                    message: format!("insert expects a record or a list of records, got {}", other),
                });
            }
        };
        if let Some(bad) = rows.iter().find(|row| !row.is_object()) {
            return Err(DataAccessError::InvalidRequest {
                message: format!("insert expects records, got {}", bad),
            });
        }

        self.deadline(self.store.insert(table, &rows)).await?;
        debug!(rows = rows.len(), "insert complete");
        Ok(())
    }

    /// Apply a partial record to every row satisfying `matching`.
    #[instrument(skip(self, values))]
    pub async fn update<U: Serialize + ?Sized>(
        &self,
        table: &str,
        values: &U,
        matching: &Match,
    ) -> DataResult<()> {
        validate_table(table)?;

        let values = to_json(values)?;
        if !values.is_object() {
            return Err(DataAccessError::InvalidRequest {
                message: format!("update expects a partial record, got {}", values),
            });
        }
        if matching.is_empty() {
            warn!("update without match criteria applies to every row");
        }

        self.deadline(self.store.update(table, &values, matching))
            .await
    }

    /// Delete every row satisfying `matching`. No cascade.
    #[instrument(skip(self))]
    pub async fn remove(&self, table: &str, matching: &Match) -> DataResult<()> {
        validate_table(table)?;

        if matching.is_empty() {
            warn!("remove without match criteria deletes every row");
        }

        self.deadline(self.store.delete(table, matching)).await
    }

    async fn deadline<T>(&self, call: impl Future<Output = DataResult<T>>) -> DataResult<T> {
        match self.timeout {
            Some(after) => tokio::time::timeout(after, call)
                .await
                .map_err(|_| DataAccessError::Timeout { after })?,
            None => call.await,
        }
    }
}

fn validate_table(table: &str) -> DataResult<()> {
    if table.trim().is_empty() {
        return Err(DataAccessError::InvalidRequest {
            message: "table name must not be empty".to_string(),
        });
    }
    Ok(())
}

fn to_json<T: Serialize + ?Sized>(values: &T) -> DataResult<Value> {
    serde_json::to_value(values).map_err(|e| DataAccessError::InvalidRequest {
        message: e.to_string(),
    })
}
