//! Document Collection Port
//!
//! The seam behind which an external document-database client sits.
//! Connection setup, authentication and transport stay on the client's
//! side; this module only fixes the operations and their result shapes.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lite_domain::RepositoryError;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// A stored document: a JSON object
pub type Document = serde_json::Map<String, Value>;

/// Errors reported by a document collection
#[derive(Debug, Clone, Error)]
pub enum CollectionError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Collection '{0}' is unavailable: lock poisoned")]
    Poisoned(String),

    #[error("Cursor on collection '{0}' closed unexpectedly")]
    CursorClosed(String),
}

impl From<CollectionError> for RepositoryError {
    fn from(err: CollectionError) -> Self {
        RepositoryError::Transport {
            message: err.to_string(),
        }
    }
}

/// Textual form of a scalar field value.
///
/// Strings are taken as-is; numbers and booleans use their JSON rendering, so
/// a stored `42` and a stored `"42"` both read as `42`. Other values have no
/// textual form.
pub fn textual(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Equals(String, Value),
    TextEquals(String, String),
}

/// Equality filter on one field, or a match-everything filter
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    condition: Option<Condition>,
}

impl Filter {
    /// Matches documents whose `field` equals `value` exactly
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            condition: Some(Condition::Equals(field.into(), value.into())),
        }
    }

    /// Matches documents whose `field` has the [`textual`] form `text`
    pub fn eq_text(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            condition: Some(Condition::TextEquals(field.into(), text.into())),
        }
    }

    pub fn all() -> Self {
        Self { condition: None }
    }

    pub fn matches(&self, document: &Document) -> bool {
        match &self.condition {
            Some(Condition::Equals(field, value)) => document.get(field) == Some(value),
            Some(Condition::TextEquals(field, text)) => document
                .get(field)
                .and_then(textual)
                .is_some_and(|stored| stored == *text),
            None => true,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Some(Condition::Equals(field, value)) => write!(f, "{{{}: {}}}", field, value),
            Some(Condition::TextEquals(field, text)) => write!(f, "{{{}: ~{:?}}}", field, text),
            None => write!(f, "{{}}"),
        }
    }
}

/// Options for [`DocumentCollection::replace_one`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOptions {
    /// Insert the replacement when nothing matches
    pub upsert: bool,
}

impl ReplaceOptions {
    pub fn upsert() -> Self {
        Self { upsert: true }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    /// True when the replacement was inserted as a new document
    pub upserted: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertManyResult {
    pub acknowledged: bool,
    pub inserted_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Stream of documents produced by a query
#[derive(Debug)]
pub struct DocumentCursor {
    rx: mpsc::Receiver<Result<Document, CollectionError>>,
}

impl DocumentCursor {
    /// A cursor fed through a channel by the client
    pub fn channel(buffer: usize) -> (mpsc::Sender<Result<Document, CollectionError>>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx })
    }

    /// A cursor over documents that are already in memory
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let (tx, cursor) = Self::channel(documents.len());
        for document in documents {
            // Capacity equals the number of documents
            let _ = tx.try_send(Ok(document));
        }
        cursor
    }

    /// Next document, or `None` once the cursor is exhausted
    pub async fn next(&mut self) -> Option<Result<Document, CollectionError>> {
        self.rx.recv().await
    }
}

/// A named collection in a document store
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    fn name(&self) -> &str;

    /// Replace the first document matching `filter`
    async fn replace_one(
        &self,
        filter: &Filter,
        replacement: Document,
        options: ReplaceOptions,
    ) -> Result<ReplaceResult, CollectionError>;

    async fn insert_many(&self, documents: Vec<Document>) -> Result<InsertManyResult, CollectionError>;

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, CollectionError>;

    async fn find(&self, filter: &Filter) -> Result<DocumentCursor, CollectionError>;

    /// Delete the first document matching `filter`
    async fn delete_one(&self, filter: &Filter) -> Result<DeleteResult, CollectionError>;
}

/// Number of documents `find` yields for `filter`
#[cfg(test)]
pub(crate) async fn count_matching(collection: &dyn DocumentCollection, filter: &Filter) -> usize {
    let mut cursor = collection.find(filter).await.unwrap();
    let mut count = 0;
    while let Some(next) = cursor.next().await {
        next.unwrap();
        count += 1;
    }
    count
}

/// Hands out collection handles by name
pub trait DocumentStore: Send + Sync {
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection>;
}
