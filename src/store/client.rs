//! The remote table-store client seam.
//!
//! [`TableStore`] is the single collaborator of the adapter. Implementations
//! translate a [`TableQuery`] or a row write into whatever the backend
//! speaks and report failures as [`DataAccessError`](super::DataAccessError).

use serde_json::Value;

#[cfg(test)]
use mockall::automock;

use super::{DataResult, Match, TableQuery};

/// Remote tabular data service. Can be mocked in tests.
#[cfg_attr(test, automock)]
#[allow(async_fn_in_trait)]
pub trait TableStore {
    /// Execute a select and return the matching rows in backend order.
    async fn select(&self, query: &TableQuery) -> DataResult<Vec<Value>>;

    /// Create one row per element of `rows`.
    async fn insert(&self, table: &str, rows: &[Value]) -> DataResult<()>;

    /// Apply the partial record `values` to every row satisfying `matching`.
    async fn update(&self, table: &str, values: &Value, matching: &Match) -> DataResult<()>;

    /// Delete every row satisfying `matching`.
    async fn delete(&self, table: &str, matching: &Match) -> DataResult<()>;
}
