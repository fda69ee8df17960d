//! In-Memory Document Store
//!
//! A document store living entirely in process memory.
//! Useful for testing and development.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use super::collection::{
    CollectionError, DeleteResult, Document, DocumentCollection, DocumentCursor, DocumentStore,
    Filter, InsertManyResult, ReplaceOptions, ReplaceResult,
};

/// In-memory collection
///
/// Thread-safe implementation using RwLock. Documents keep insertion order.
#[derive(Debug, Default)]
pub struct InMemoryCollection {
    name: String,
    documents: RwLock<Vec<Document>>,
}

impl InMemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(Vec::new()),
        }
    }

    fn poisoned<G>(&self, _: PoisonError<G>) -> CollectionError {
        CollectionError::Poisoned(self.name.clone())
    }
}

#[async_trait]
impl DocumentCollection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn replace_one(
        &self,
        filter: &Filter,
        replacement: Document,
        options: ReplaceOptions,
    ) -> Result<ReplaceResult, CollectionError> {
        // Match and write happen under one lock, so concurrent upserts converge
        let mut documents = self.documents.write().map_err(|e| self.poisoned(e))?;

        if let Some(existing) = documents.iter_mut().find(|doc| filter.matches(doc)) {
            *existing = replacement;
            return Ok(ReplaceResult {
                acknowledged: true,
                matched_count: 1,
                modified_count: 1,
                upserted: false,
            });
        }

        if options.upsert {
            documents.push(replacement);
        }
        Ok(ReplaceResult {
            acknowledged: true,
            upserted: options.upsert,
            ..ReplaceResult::default()
        })
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<InsertManyResult, CollectionError> {
        let mut stored = self.documents.write().map_err(|e| self.poisoned(e))?;
        let inserted_count = documents.len() as u64;
        stored.extend(documents);
        Ok(InsertManyResult {
            acknowledged: true,
            inserted_count,
        })
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, CollectionError> {
        let documents = self.documents.read().map_err(|e| self.poisoned(e))?;
        Ok(documents.iter().find(|doc| filter.matches(doc)).cloned())
    }

    async fn find(&self, filter: &Filter) -> Result<DocumentCursor, CollectionError> {
        let documents = self.documents.read().map_err(|e| self.poisoned(e))?;
        let matching = documents
            .iter()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect();
        Ok(DocumentCursor::from_documents(matching))
    }

    async fn delete_one(&self, filter: &Filter) -> Result<DeleteResult, CollectionError> {
        let mut documents = self.documents.write().map_err(|e| self.poisoned(e))?;
        let deleted_count = match documents.iter().position(|doc| filter.matches(doc)) {
            Some(index) => {
                documents.remove(index);
                1
            }
            None => 0,
        };
        Ok(DeleteResult {
            acknowledged: true,
            deleted_count,
        })
    }
}

/// In-memory document store
///
/// Collections are created on first access and shared between handles.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Arc<InMemoryCollection>>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Names of the collections created so far
    pub fn collection_names(&self) -> Vec<String> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        names
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
        // The map only ever gains entries, so a poisoned guard is still consistent
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(InMemoryCollection::new(name)));
        Arc::clone(collection) as Arc<dyn DocumentCollection>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::document::collection::count_matching;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[tokio::test]
    async fn test_replace_one_upsert() {
        let collection = InMemoryCollection::new("users");
        let filter = Filter::eq("id", "1");

        let first = collection
            .replace_one(&filter, doc(json!({ "id": "1", "v": 1 })), ReplaceOptions::upsert())
            .await
            .unwrap();
        assert!(first.upserted);

        let second = collection
            .replace_one(&filter, doc(json!({ "id": "1", "v": 2 })), ReplaceOptions::upsert())
            .await
            .unwrap();
        assert_eq!(second.matched_count, 1);
        assert!(!second.upserted);

        assert_eq!(count_matching(&collection, &filter).await, 1);
        let stored = collection.find_one(&filter).await.unwrap().unwrap();
        assert_eq!(stored["v"], 2);
    }

    #[tokio::test]
    async fn test_replace_without_upsert_leaves_collection_untouched() {
        let collection = InMemoryCollection::new("users");
        let result = collection
            .replace_one(
                &Filter::eq("id", "1"),
                doc(json!({ "id": "1" })),
                ReplaceOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.matched_count, 0);
        assert!(!result.upserted);
        assert_eq!(count_matching(&collection, &Filter::all()).await, 0);
    }

    #[tokio::test]
    async fn test_delete_one() {
        let collection = InMemoryCollection::new("users");
        collection
            .insert_many(vec![doc(json!({ "id": "1" })), doc(json!({ "id": "2" }))])
            .await
            .unwrap();

        let deleted = collection.delete_one(&Filter::eq("id", "1")).await.unwrap();
        assert_eq!(deleted.deleted_count, 1);

        let missing = collection.delete_one(&Filter::eq("id", "1")).await.unwrap();
        assert_eq!(missing.deleted_count, 0);
        assert!(missing.acknowledged);
    }

    #[tokio::test]
    async fn test_store_shares_collections_by_name() {
        let store = InMemoryDocumentStore::new();

        store
            .collection("users")
            .insert_many(vec![doc(json!({ "id": "1" }))])
            .await
            .unwrap();

        let again = store.collection("users");
        assert_eq!(again.name(), "users");
        assert_eq!(count_matching(again.as_ref(), &Filter::all()).await, 1);

        store.collection("audit");
        assert_eq!(store.collection_names(), vec!["audit", "users"]);
    }
}
