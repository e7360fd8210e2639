use async_trait::async_trait;
use serde_json::Value;

use crate::graph::{MergePolicy, NodeLabel, NodeSpec, PropertyKey, RelationSpec, RelationshipQuery, RelationshipRow};
use crate::reservation::{Attributes, Reservation};
use crate::StoreResult;

/// Key-value storage for ephemeral session data
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn add_connected_user(&self, user_id: &str) -> StoreResult<()>;

    async fn remove_connected_user(&self, user_id: &str) -> StoreResult<()>;

    /// Connected session ids, sorted.
    async fn connected_users(&self) -> StoreResult<Vec<String>>;

    /// Prepends `term` and keeps only the newest `max_items` entries.
    async fn push_recent_search(&self, user_id: &str, term: &str, max_items: usize) -> StoreResult<()>;

    /// `push_recent_search` with the default window.
    async fn record_search(&self, user_id: &str, term: &str) -> StoreResult<()> {
        self.push_recent_search(user_id, term, crate::keys::DEFAULT_RECENT_SEARCHES).await
    }

    /// Recent searches, most recent first.
    async fn recent_searches(&self, user_id: &str) -> StoreResult<Vec<String>>;

    async fn create_temp_reservation(&self, reservation_id: &str, attributes: &Attributes) -> StoreResult<()>;

    async fn temp_reservation(&self, reservation_id: &str) -> StoreResult<Option<Attributes>>;

    /// Returns whether a record was removed.
    async fn delete_temp_reservation(&self, reservation_id: &str) -> StoreResult<bool>;

    /// Every temporary reservation present during the scan. Not a snapshot.
    async fn all_temp_reservations(&self) -> StoreResult<Vec<Reservation>>;

    /// Stores `data` under `key`; a `ttl_seconds` of `None` or `0` never expires.
    async fn cache_query_result(&self, key: &str, data: &Value, ttl_seconds: Option<u64>) -> StoreResult<()>;

    async fn cached_query(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Development only: drops every key.
    async fn flush_all(&self) -> StoreResult<()>;
}

/// Durable, collection-oriented storage
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fails with `StoreError::Duplicate` if `id` already exists in `collection`.
    async fn insert_document(&self, collection: &str, id: &str, document: &Value) -> StoreResult<()>;

    async fn find_document(&self, collection: &str, id: &str) -> StoreResult<Option<Value>>;
}

/// Labeled-property graph storage
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn ensure_unique_constraint(&self, label: NodeLabel, property: &PropertyKey) -> StoreResult<()>;

    async fn merge_node(&self, label: NodeLabel, node: &NodeSpec, policy: MergePolicy) -> StoreResult<()>;

    /// Returns how many endpoint pairs were linked; zero when either end is missing.
    async fn merge_relationship(&self, relation: &RelationSpec) -> StoreResult<u64>;

    async fn delete_all(&self) -> StoreResult<()>;

    async fn delete_label(&self, label: NodeLabel) -> StoreResult<()>;

    /// Matching relationships ordered by origin, then destination.
    async fn relationships(&self, query: &RelationshipQuery) -> StoreResult<Vec<RelationshipRow>>;
}
