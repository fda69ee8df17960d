//! CRUD Repository - Synchronous persistence contract
//!
//! Every call blocks the caller until storage has answered.

use crate::model::identifiable::Identifiable;
use crate::repository::error::{BatchFailure, RepositoryError, RepositoryResult};
use crate::repository::Repository;

/// Synchronous CRUD Repository Trait
///
/// This is a PORT in hexagonal architecture.
/// The trait is object safe, so callers can hold a
/// `&dyn CrudRepository<T>` without knowing the backend.
pub trait CrudRepository<T: Identifiable>: Repository<T> {
    /// Save an entity (create or overwrite) and hand it back
    fn save(&self, entity: T) -> RepositoryResult<T>;

    /// Save every entity independently, preserving input order.
    ///
    /// Failures do not stop the batch. If any entity fails, the call returns
    /// [`RepositoryError::PartialBatch`] listing the saved ids and the cause
    /// of each failure instead of silently returning a shorter list.
    fn save_all(&self, entities: Vec<T>) -> RepositoryResult<Vec<T>> {
        let mut saved = Vec::with_capacity(entities.len());
        let mut failures = Vec::new();

        for entity in entities {
            let id = entity.id_text();
            match self.save(entity) {
                Ok(entity) => saved.push(entity),
                Err(error) => failures.push(BatchFailure { id, error }),
            }
        }

        if failures.is_empty() {
            Ok(saved)
        } else {
            Err(RepositoryError::PartialBatch {
                saved: saved.iter().map(|e| e.id_text()).collect(),
                failures,
            })
        }
    }

    /// Find an entity by id. `Ok(None)` means it does not exist.
    fn find(&self, id: &T::Id) -> RepositoryResult<Option<T>>;

    /// Retrieve every stored entity
    fn find_all(&self) -> RepositoryResult<Vec<T>>;

    /// Delete an entity. Returns whether something was removed.
    fn delete(&self, entity: &T) -> RepositoryResult<bool> {
        self.delete_by_id(entity.id())
    }

    /// Delete an entity by id. Returns whether something was removed.
    fn delete_by_id(&self, id: &T::Id) -> RepositoryResult<bool>;

    /// Check if an entity exists
    fn exists(&self, id: &T::Id) -> RepositoryResult<bool> {
        Ok(self.find(id)?.is_some())
    }

    /// Count all stored entities
    fn count(&self) -> RepositoryResult<usize> {
        Ok(self.find_all()?.len())
    }
}
