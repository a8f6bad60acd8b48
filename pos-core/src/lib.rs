//! pos-core: shared infrastructure for the POS client crates.
pub mod config;
pub mod error;
pub mod observability;

pub use tracing;
