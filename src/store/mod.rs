//! Table data access.
//!
//! A small declarative vocabulary (select with match/filters/ordering,
//! insert, update-by-match, remove-by-match) translated onto a remote
//! tabular store.
//!
//! # Architecture
//!
//! - `error`: the uniform [`DataAccessError`]
//! - `filter`, `query`: the query vocabulary
//! - `client`: the [`TableStore`] trait every backend implements
//! - `adapter`: [`TableAdapter`], the only entry point callers use
//! - `postgrest`, `memory`: concrete stores

mod adapter;
mod client;
mod error;
pub mod filter;
pub mod memory;
pub mod postgrest;
mod query;

#[cfg(test)]
mod error_test;
#[cfg(test)]
mod memory_test;
#[cfg(test)]
mod postgrest_test;

pub use adapter::TableAdapter;
#[cfg(test)]
pub use client::MockTableStore;
pub use client::TableStore;
pub use error::{DataAccessError, DataResult};
pub use filter::{Filter, Operator, ParseFilterError};
pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
pub use query::{Match, OrderBy, SelectOptions, TableQuery};
