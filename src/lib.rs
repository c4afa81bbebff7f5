pub mod config;
pub mod serde_utils;
pub mod store;
pub mod tracker;

#[cfg(feature = "cli")]
pub mod cli;
