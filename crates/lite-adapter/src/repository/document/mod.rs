//! Document Store Repository
//!
//! One document per entity in a named collection. Documents are matched on
//! the textual form of their id field, so an entity whose id serializes as
//! `42` under the id field is found by the text `"42"`. Saves are upserts on
//! that key.
//!
//! Every operation starts immediately on a Tokio task and returns a
//! [`Deferred`] handle, so the repository must be used from within a Tokio
//! runtime.

pub mod collection;
pub mod in_memory;

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use lite_domain::{
    AsyncCrudRepository, BatchFailure, Identifiable, Repository, RepositoryError, RepositoryResult,
};
use lite_shared::DocumentRepositoryConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::deferred::Deferred;
use collection::{textual, Document, DocumentCollection, DocumentStore, Filter, ReplaceOptions};

/// Async CRUD repository over a document collection
pub struct DocumentRepository<T> {
    collection: Arc<dyn DocumentCollection>,
    id_field: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for DocumentRepository<T> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
            id_field: self.id_field.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for DocumentRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRepository")
            .field("collection", &self.collection.name())
            .field("id_field", &self.id_field)
            .finish()
    }
}

impl<T> DocumentRepository<T>
where
    T: Identifiable + Serialize + DeserializeOwned + Send + 'static,
{
    /// Create a repository over `collection`, keyed by `id_field`.
    ///
    /// When the entity does not serialize `id_field` itself, the textual id
    /// is written into it on save.
    pub fn new(collection: Arc<dyn DocumentCollection>, id_field: impl Into<String>) -> Self {
        Self {
            collection,
            id_field: id_field.into(),
            _entity: PhantomData,
        }
    }

    /// Create a repository from validated configuration
    pub fn from_store(
        store: &dyn DocumentStore,
        config: &DocumentRepositoryConfig,
    ) -> lite_shared::Result<Self> {
        config.validate("documents")?;
        Ok(Self::new(
            store.collection(&config.collection),
            config.id_field.clone(),
        ))
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    fn id_filter(&self, id_text: String) -> Filter {
        Filter::eq_text(self.id_field.clone(), id_text)
    }

    /// Serialize an entity, stamping its textual id into the id field if the
    /// entity does not carry that field already.
    ///
    /// A carried id field must render to the textual id, otherwise the
    /// document could never be found again.
    fn encode(&self, entity: &T) -> RepositoryResult<Document> {
        let id = entity.id_text();
        let value = serde_json::to_value(entity).map_err(|e| RepositoryError::Encode {
            id: id.clone(),
            message: e.to_string(),
        })?;

        match value {
            Value::Object(mut document) => {
                match document.get(&self.id_field) {
                    None => {
                        document.insert(self.id_field.clone(), Value::String(id));
                    }
                    Some(carried) if textual(carried).as_deref() == Some(id.as_str()) => {}
                    Some(carried) => {
                        return Err(RepositoryError::Encode {
                            message: format!(
                                "field '{}' holds {}, which does not render to the id",
                                self.id_field, carried
                            ),
                            id,
                        });
                    }
                }
                Ok(document)
            }
            other => Err(RepositoryError::Encode {
                id,
                message: format!("entity must serialize to a JSON object, got {}", kind_of(&other)),
            }),
        }
    }
}

impl<T> Repository<T> for DocumentRepository<T> where
    T: Identifiable + Serialize + DeserializeOwned + Send + 'static
{
}

impl<T> AsyncCrudRepository<T> for DocumentRepository<T>
where
    T: Identifiable + Serialize + DeserializeOwned + Send + 'static,
{
    fn save(&self, entity: T) -> impl Future<Output = RepositoryResult<T>> + Send {
        let document = match self.encode(&entity) {
            Ok(document) => document,
            Err(err) => return Deferred::<T>::ready(Err(err)),
        };
        let filter = self.id_filter(entity.id_text());
        let collection = Arc::clone(&self.collection);

        Deferred::<T>::spawn(upsert(collection, filter, document, entity))
    }

    fn save_all(&self, entities: Vec<T>) -> impl Future<Output = RepositoryResult<Vec<T>>> + Send {
        let mut encoded = Vec::with_capacity(entities.len());
        let mut failures = Vec::new();
        for entity in entities {
            match self.encode(&entity) {
                Ok(document) => encoded.push((entity, document)),
                Err(error) => failures.push(BatchFailure {
                    id: entity.id_text(),
                    error,
                }),
            }
        }
        let collection = Arc::clone(&self.collection);

        Deferred::<Vec<T>>::spawn(insert_batch(collection, encoded, failures))
    }

    fn find(&self, id: &T::Id) -> impl Future<Output = RepositoryResult<Option<T>>> + Send {
        let key = id.to_string();
        let filter = self.id_filter(key.clone());
        let collection = Arc::clone(&self.collection);

        Deferred::<Option<T>>::spawn(find_one(collection, filter, key))
    }

    fn find_all(&self) -> impl Future<Output = RepositoryResult<Vec<T>>> + Send {
        let collection = Arc::clone(&self.collection);
        let id_field = self.id_field.clone();

        Deferred::<Vec<T>>::spawn(collect_all(collection, id_field))
    }

    fn delete_by_id(&self, id: &T::Id) -> impl Future<Output = RepositoryResult<bool>> + Send {
        let filter = self.id_filter(id.to_string());
        let collection = Arc::clone(&self.collection);

        Deferred::<bool>::spawn(delete_one(collection, filter))
    }
}

async fn upsert<T>(
    collection: Arc<dyn DocumentCollection>,
    filter: Filter,
    document: Document,
    entity: T,
) -> RepositoryResult<T> {
    debug!("replace_one {} in '{}' (upsert)", filter, collection.name());
    let result = collection
        .replace_one(&filter, document, ReplaceOptions::upsert())
        .await?;
    if !result.acknowledged {
        return Err(unacknowledged(collection.name(), "replace_one"));
    }
    Ok(entity)
}

async fn find_one<T: DeserializeOwned>(
    collection: Arc<dyn DocumentCollection>,
    filter: Filter,
    key: String,
) -> RepositoryResult<Option<T>> {
    debug!("find_one {} in '{}'", filter, collection.name());
    match collection.find_one(&filter).await? {
        Some(document) => decode(document, &key).map(Some),
        None => Ok(None),
    }
}

async fn delete_one(collection: Arc<dyn DocumentCollection>, filter: Filter) -> RepositoryResult<bool> {
    let result = collection.delete_one(&filter).await?;
    debug!(
        "delete_one {} in '{}': {} deleted",
        filter,
        collection.name(),
        result.deleted_count
    );
    Ok(result.acknowledged && result.deleted_count > 0)
}

async fn insert_batch<T: Identifiable>(
    collection: Arc<dyn DocumentCollection>,
    encoded: Vec<(T, Document)>,
    failures: Vec<BatchFailure>,
) -> RepositoryResult<Vec<T>> {
    let (entities, documents): (Vec<T>, Vec<Document>) = encoded.into_iter().unzip();

    if !documents.is_empty() {
        debug!("insert_many {} documents into '{}'", documents.len(), collection.name());
        let result = collection.insert_many(documents).await?;
        if !result.acknowledged {
            return Err(unacknowledged(collection.name(), "insert_many"));
        }
    }

    if failures.is_empty() {
        Ok(entities)
    } else {
        warn!(
            "insert_many into '{}': {} of {} entities could not be encoded",
            collection.name(),
            failures.len(),
            failures.len() + entities.len()
        );
        Err(RepositoryError::PartialBatch {
            saved: entities.iter().map(|e| e.id_text()).collect(),
            failures,
        })
    }
}

async fn collect_all<T: DeserializeOwned>(
    collection: Arc<dyn DocumentCollection>,
    id_field: String,
) -> RepositoryResult<Vec<T>> {
    let mut cursor = collection.find(&Filter::all()).await?;
    let mut entities = Vec::new();

    while let Some(next) = cursor.next().await {
        let document = next?;
        let key = document
            .get(&id_field)
            .and_then(textual)
            .unwrap_or_else(|| format!("{}[{}]", collection.name(), entities.len()));
        match decode(document, &key) {
            Ok(entity) => entities.push(entity),
            Err(err) => {
                warn!("find_all on '{}' stopped: {}", collection.name(), err);
                return Err(err);
            }
        }
    }

    debug!("find_all on '{}': {} documents", collection.name(), entities.len());
    Ok(entities)
}

fn decode<T: DeserializeOwned>(document: Document, key: &str) -> RepositoryResult<T> {
    serde_json::from_value(Value::Object(document)).map_err(|e| RepositoryError::Decode {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn unacknowledged(collection: &str, operation: &str) -> RepositoryError {
    RepositoryError::Transport {
        message: format!("{} on '{}' was not acknowledged", operation, collection),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::document::collection::{
        count_matching, CollectionError, DeleteResult, DocumentCursor, InsertManyResult,
        ReplaceResult,
    };
    use crate::repository::document::in_memory::{InMemoryCollection, InMemoryDocumentStore};
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        id: String,
        name: String,
    }

    impl User {
        fn new(id: &str, name: &str) -> Self {
            Self {
                id: id.to_string(),
                name: name.to_string(),
            }
        }
    }

    impl Identifiable for User {
        type Id = String;

        fn id(&self) -> &String {
            &self.id
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }
    }

    fn users() -> (Arc<InMemoryCollection>, DocumentRepository<User>) {
        let collection = Arc::new(InMemoryCollection::new("users"));
        let repo = DocumentRepository::new(collection.clone(), "id");
        (collection, repo)
    }

    #[tokio::test]
    async fn test_save_find_delete_scenario() {
        let (collection, repo) = users();

        let grace = repo.save(User::new("7", "Grace")).await.unwrap();

        let stored = collection.find_one(&Filter::eq("id", "7")).await.unwrap().unwrap();
        assert_eq!(Value::Object(stored), json!({ "id": "7", "name": "Grace" }));

        assert_eq!(repo.find(&"7".to_string()).await.unwrap(), Some(grace));

        assert!(repo.delete_by_id(&"7".to_string()).await.unwrap());
        assert_eq!(count_matching(collection.as_ref(), &Filter::eq("id", "7")).await, 0);
        assert_eq!(repo.find(&"7".to_string()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_is_upsert() {
        let (collection, repo) = users();

        repo.save(User::new("1", "first")).await.unwrap();
        repo.save(User::new("1", "second")).await.unwrap();

        assert_eq!(count_matching(collection.as_ref(), &Filter::all()).await, 1);
        let found = repo.find(&"1".to_string()).await.unwrap().unwrap();
        assert_eq!(found.name, "second");
    }

    #[tokio::test]
    async fn test_concurrent_saves_converge() {
        let (collection, repo) = users();

        let saves: Vec<_> = (0..16)
            .map(|n| repo.save(User::new("same", &format!("writer-{n}"))))
            .collect();
        for save in saves {
            save.await.unwrap();
        }

        assert_eq!(count_matching(collection.as_ref(), &Filter::all()).await, 1);
    }

    #[tokio::test]
    async fn test_find_all_returns_scanned_entities() {
        let (_, repo) = users();

        repo.save_all(vec![User::new("1", "a"), User::new("2", "b"), User::new("3", "c")])
            .await
            .unwrap();

        let mut names: Vec<String> = repo
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_find_all_empty_collection() {
        let (_, repo) = users();
        assert!(repo.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_all_empty_batch() {
        let (collection, repo) = users();
        assert!(repo.save_all(Vec::new()).await.unwrap().is_empty());
        assert_eq!(count_matching(collection.as_ref(), &Filter::all()).await, 0);
    }

    #[tokio::test]
    async fn test_custom_id_field_is_stamped() {
        let collection = Arc::new(InMemoryCollection::new("users"));
        let repo: DocumentRepository<User> = DocumentRepository::new(collection.clone(), "_key");

        repo.save(User::new("9", "Linus")).await.unwrap();

        let stored = collection.find_one(&Filter::eq("_key", "9")).await.unwrap().unwrap();
        assert_eq!(stored["id"], "9");
        assert_eq!(repo.find(&"9".to_string()).await.unwrap().unwrap().name, "Linus");
    }

    #[tokio::test]
    async fn test_corrupt_document_is_decode_error() {
        let (collection, repo) = users();
        collection
            .insert_many(vec![json!({ "id": "5", "name": 12 })
                .as_object()
                .cloned()
                .unwrap()])
            .await
            .unwrap();

        let err = repo.find(&"5".to_string()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Decode { .. }));

        let err = repo.find_all().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Decode { ref key, .. } if key == "5"));
    }

    #[tokio::test]
    async fn test_non_object_entity_is_encode_error() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Tag(String);

        impl Identifiable for Tag {
            type Id = String;

            fn id(&self) -> &String {
                &self.0
            }

            fn set_id(&mut self, id: String) {
                self.0 = id;
            }
        }

        let collection = Arc::new(InMemoryCollection::new("tags"));
        let repo: DocumentRepository<Tag> = DocumentRepository::new(collection, "id");

        let err = repo.save(Tag("rust".into())).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Encode { .. }));
    }

    #[tokio::test]
    async fn test_from_store() {
        let store = InMemoryDocumentStore::new();
        let config = DocumentRepositoryConfig::new("profiles").with_id_field("uuid");

        let repo: DocumentRepository<User> = DocumentRepository::from_store(&store, &config).unwrap();
        assert_eq!(repo.collection_name(), "profiles");
        assert_eq!(repo.id_field(), "uuid");

        repo.save(User::new("u-1", "Ada")).await.unwrap();
        let handle = store.collection("profiles");
        assert_eq!(count_matching(handle.as_ref(), &Filter::eq("uuid", "u-1")).await, 1);
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ticket {
        id: u64,
        title: String,
    }

    impl Identifiable for Ticket {
        type Id = u64;

        fn id(&self) -> &u64 {
            &self.id
        }

        fn set_id(&mut self, id: u64) {
            self.id = id;
        }
    }

    #[tokio::test]
    async fn test_numeric_id_under_default_field_round_trips() {
        let collection = Arc::new(InMemoryCollection::new("tickets"));
        let repo: DocumentRepository<Ticket> = DocumentRepository::new(collection.clone(), "id");

        let ticket = Ticket {
            id: 42,
            title: "Broken build".into(),
        };
        repo.save(ticket.clone()).await.unwrap();

        // The entity's own number stays in place
        let stored = collection.find_one(&Filter::eq("id", 42)).await.unwrap().unwrap();
        assert_eq!(Value::Object(stored), json!({ "id": 42, "title": "Broken build" }));

        assert_eq!(repo.find(&42).await.unwrap(), Some(ticket.clone()));
        assert_eq!(repo.find_all().await.unwrap(), vec![ticket.clone()]);

        // Upsert matches the numeric document
        repo.save(Ticket {
            id: 42,
            title: "Fixed".into(),
        })
        .await
        .unwrap();
        assert_eq!(count_matching(collection.as_ref(), &Filter::all()).await, 1);

        assert!(repo.delete(&ticket).await.unwrap());
        assert_eq!(repo.find(&42).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_carried_id_field_must_render_to_the_id() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Alias {
            id: u64,
            slug: String,
        }

        impl Identifiable for Alias {
            type Id = u64;

            fn id(&self) -> &u64 {
                &self.id
            }

            fn set_id(&mut self, id: u64) {
                self.id = id;
            }
        }

        let collection = Arc::new(InMemoryCollection::new("aliases"));
        let repo: DocumentRepository<Alias> = DocumentRepository::new(collection.clone(), "slug");

        let err = repo
            .save(Alias {
                id: 1,
                slug: "home".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Encode { ref id, .. } if id == "1"));

        let err = repo
            .save_all(vec![Alias {
                id: 2,
                slug: "about".into(),
            }])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::PartialBatch { ref saved, .. } if saved.is_empty()));
        assert_eq!(count_matching(collection.as_ref(), &Filter::all()).await, 0);
    }

    /// A collection whose client has lost its connection
    struct Disconnected;

    #[async_trait]
    impl DocumentCollection for Disconnected {
        fn name(&self) -> &str {
            "offline"
        }

        async fn replace_one(
            &self,
            _: &Filter,
            _: Document,
            _: ReplaceOptions,
        ) -> Result<ReplaceResult, CollectionError> {
            Err(CollectionError::Transport("connection refused".into()))
        }

        async fn insert_many(&self, _: Vec<Document>) -> Result<InsertManyResult, CollectionError> {
            Err(CollectionError::Transport("connection refused".into()))
        }

        async fn find_one(&self, _: &Filter) -> Result<Option<Document>, CollectionError> {
            Err(CollectionError::Transport("connection refused".into()))
        }

        async fn find(&self, _: &Filter) -> Result<DocumentCursor, CollectionError> {
            let (tx, cursor) = DocumentCursor::channel(1);
            tx.send(Err(CollectionError::CursorClosed("offline".into())))
                .await
                .map_err(|_| CollectionError::CursorClosed("offline".into()))?;
            Ok(cursor)
        }

        async fn delete_one(&self, _: &Filter) -> Result<DeleteResult, CollectionError> {
            Ok(DeleteResult {
                acknowledged: false,
                deleted_count: 0,
            })
        }
    }

    #[tokio::test]
    async fn test_transport_failures_are_observable() {
        let repo: DocumentRepository<User> = DocumentRepository::new(Arc::new(Disconnected), "id");

        let err = repo.save(User::new("1", "lost")).await.unwrap_err();
        assert!(err.is_storage_failure());

        let err = repo.save_all(vec![User::new("2", "lost")]).await.unwrap_err();
        assert!(err.is_storage_failure());

        let err = repo.find(&"1".to_string()).await.unwrap_err();
        assert!(err.is_storage_failure());

        let err = repo.find_all().await.unwrap_err();
        assert!(err.is_storage_failure());

        assert!(!repo.delete_by_id(&"1".to_string()).await.unwrap());
    }
}
