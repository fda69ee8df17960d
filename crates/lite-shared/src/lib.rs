//! # Lite Repositories Shared
//!
//! Configuration types and errors used across the repository crates.

pub mod config;
pub mod error;

// Re-exports
pub use config::*;
pub use error::*;
