//! Async CRUD Repository - Deferred persistence contract
//!
//! Same operation set as [`CrudRepository`](super::crud_repository::CrudRepository),
//! but every call hands back a future that resolves once the store answers.
//! Writes are deferred too, so a failed save is observable by the caller.

use core::future::Future;

use crate::model::identifiable::Identifiable;
use crate::repository::error::RepositoryResult;
use crate::repository::Repository;

/// Asynchronous CRUD Repository Trait
///
/// Implementations are expected to start the operation when the method is
/// called; awaiting only observes the outcome. Dropping the returned future
/// does not cancel the underlying write or read.
pub trait AsyncCrudRepository<T: Identifiable>: Repository<T> {
    /// Save an entity (upsert) and resolve to it once acknowledged
    fn save(&self, entity: T) -> impl Future<Output = RepositoryResult<T>> + Send;

    /// Save a batch and resolve to the entities in input order
    fn save_all(&self, entities: Vec<T>) -> impl Future<Output = RepositoryResult<Vec<T>>> + Send;

    /// Find an entity by id
    fn find(&self, id: &T::Id) -> impl Future<Output = RepositoryResult<Option<T>>> + Send;

    /// Retrieve every stored entity
    fn find_all(&self) -> impl Future<Output = RepositoryResult<Vec<T>>> + Send;

    /// Delete an entity. Resolves to whether something was removed.
    fn delete(&self, entity: &T) -> impl Future<Output = RepositoryResult<bool>> + Send {
        self.delete_by_id(entity.id())
    }

    /// Delete an entity by id. Resolves to whether something was removed.
    fn delete_by_id(&self, id: &T::Id) -> impl Future<Output = RepositoryResult<bool>> + Send;
}
