//! # Lite Repositories Domain Layer
//!
//! Backend-independent persistence contracts.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Domain Layer (This Crate)                     │
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │  model/      - Identifiable (entity identity)               ││
//! │  │  repository/ - Trait definitions (not implementations)      ││
//! │  └─────────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Application code holds a `CrudRepository` or `AsyncCrudRepository` and
//! never learns whether entities end up in JSON files or in a document
//! database. Swapping the backend means swapping the adapter, nothing else.

pub mod model;
pub mod repository;

pub use model::identifiable::Identifiable;

pub use repository::{
    async_crud_repository::AsyncCrudRepository,
    crud_repository::CrudRepository,
    error::{BatchFailure, RepositoryError, RepositoryResult},
    Repository,
};
