use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered attribute mapping of a reservation record.
pub type Attributes = serde_json::Map<String, Value>;

/// Collection confirmed reservations are written to unless configured otherwise.
pub const DEFAULT_COLLECTION: &str = "reservas";

/// A reservation as seen by the workflows: its id plus the stored attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub attributes: Attributes,
}

impl Reservation {
    pub fn new(id: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }

    /// The attributes as a JSON document body.
    pub fn document(&self) -> Value {
        Value::Object(self.attributes.clone())
    }

    /// Decodes a cached payload; anything other than a JSON object is rejected.
    pub fn from_payload(id: impl Into<String>, payload: &str) -> Result<Self, crate::StoreError> {
        let id = id.into();
        match serde_json::from_str::<Value>(payload)? {
            Value::Object(attributes) => Ok(Self { id, attributes }),
            other => Err(crate::StoreError::InvalidRecord(format!(
                "temporary reservation {} is not an object: {}",
                id, other
            ))),
        }
    }
}
