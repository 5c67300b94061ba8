//!
//! fieldgate storage module
//! ------------------------
//! The engine treats persistence as a collaborator behind the `Store` trait: a
//! document store holding one collection per `EntityKind`, addressed by string id.
//! Documents are `serde_json::Value` objects; domain structs in `crate::model`
//! (de)serialize through them. All operations are async and fail with
//! `AppError::Storage` so retry policy stays with the implementation, not the core.
//!
//! `MemoryStore` is the in-process implementation used by the test suites and by
//! embeddings that do not bring their own store.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppResult;

mod memory;

pub use memory::MemoryStore;

/// Document collections known to the engine. Mirrors the entity types the schema
/// can reference; reference annotations name one of these as their target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    User,
    Snip,
    UserRole,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "USER",
            EntityKind::Snip => "SNIP",
            EntityKind::UserRole => "USER_ROLE",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Async document-store seam. Implementations must be safe to share across
/// request tasks; the engine never holds references across await points.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch one document by id. Absence is not an error.
    async fn find_by_id(&self, kind: EntityKind, id: &str) -> AppResult<Option<Value>>;

    /// Fetch every document whose fields equal all entries of `filter`.
    /// An empty filter matches the whole collection.
    async fn find(&self, kind: EntityKind, filter: &Map<String, Value>) -> AppResult<Vec<Value>>;

    /// Insert a new document. An `id` is assigned when the caller supplies none;
    /// `created_at`/`updated_at` epoch-millis stamps are added. Returns the stored document.
    async fn create(&self, kind: EntityKind, fields: Map<String, Value>) -> AppResult<Value>;

    /// Merge `fields` into an existing document and bump `updated_at`.
    async fn update(&self, kind: EntityKind, id: &str, fields: Map<String, Value>) -> AppResult<Value>;

    /// Remove a document. Deleting an absent id is a no-op.
    async fn delete(&self, kind: EntityKind, id: &str) -> AppResult<()>;
}

/// Thread-safe handle the engine passes into every resolver invocation.
pub type SharedStore = Arc<dyn Store>;

/// Drop null entries from a caller-supplied filter object so unset inputs do not
/// become equality constraints against null.
pub fn compact_filter(filter: &Map<String, Value>) -> Map<String, Value> {
    filter.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
