//! # Lite Repositories Adapter Layer
//!
//! Storage backends implementing the contracts from `lite-domain`.
//!
//! ## Structure
//!
//! - `repository/json_file` - One pretty-printed JSON file per entity (sync)
//! - `repository/document` - One document per entity in a collection (async)
//! - `deferred` - Single-assignment result handle used by the async backend

pub mod deferred;
pub mod repository;

pub use deferred::{deferred, Completer, Deferred};
pub use repository::document::collection::{
    textual, CollectionError, DeleteResult, Document, DocumentCollection, DocumentCursor,
    DocumentStore, Filter, InsertManyResult, ReplaceOptions, ReplaceResult,
};
pub use repository::document::in_memory::{InMemoryCollection, InMemoryDocumentStore};
pub use repository::document::DocumentRepository;
pub use repository::json_file::JsonFileRepository;

// Re-export the layers this one builds on
pub use lite_domain;
pub use lite_shared;
