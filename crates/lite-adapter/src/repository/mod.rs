//! Persistence Adapters - Repository implementations
//!
//! These implement the repository traits from lite-domain.

pub mod document;
pub mod json_file;
