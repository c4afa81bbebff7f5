pub mod milestone;
pub mod project;
pub mod query;
