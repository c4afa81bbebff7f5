//! Projects, milestones and progress.
//!
//! Everything here goes through [`TableAdapter`](crate::store::TableAdapter);
//! cascades (milestones before their project) are sequenced here, not in
//! the adapter.

mod error;
mod models;
mod service;


pub use error::{TrackerError, TrackerResult};
pub use models::*;
pub use service::{Tracker, summarize};
