pub mod graph;
pub mod keys;
pub mod repository;
pub mod reservation;
pub mod seed;

pub use graph::{MergePolicy, NodeLabel, NodeSpec, PropertyKey, PropertyValue, RelationSpec, RelationshipType};
pub use repository::{DocumentStore, GraphStore, SessionCache};
pub use reservation::{Attributes, Reservation};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Duplicate document '{id}' in collection '{collection}'")]
    Duplicate { collection: String, id: String },
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
