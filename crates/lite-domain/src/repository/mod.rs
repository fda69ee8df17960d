//! Repository Traits - The "Ports" of Hexagonal Architecture
//!
//! These traits define WHAT the application can ask of storage,
//! but NOT how it's actually done. That's the adapter's job.
//!
//! ```text
//! Domain Layer              │  Adapter Layer
//! ──────────────────────────┼────────────────────────────
//! trait CrudRepository      │  JsonFileRepository
//! trait AsyncCrudRepository │  DocumentRepository
//! ```

pub mod async_crud_repository;
pub mod crud_repository;
pub mod error;

use crate::model::identifiable::Identifiable;

/// Marker for "this is a repository over `T`, keyed by `T::Id`".
///
/// Carries no operations. Both CRUD contracts extend it so a concrete
/// backend can be named polymorphically regardless of its access model.
pub trait Repository<T: Identifiable> {}
