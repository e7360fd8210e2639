use std::sync::Arc;
use tracing::{error, info, warn};
use travesia_core::reservation::Reservation;
use travesia_core::{DocumentStore, SessionCache, StoreError};

/// Moves temporary reservations from the session cache into the durable
/// collection.
///
/// The durable insert always happens before the temporary record is
/// deleted, so a failure never loses the reservation. A crash between the two
/// steps leaves it in both stores until [`crate::Reconciler`] runs.
pub struct ReservationConfirmer {
    cache: Arc<dyn SessionCache>,
    documents: Arc<dyn DocumentStore>,
    collection: String,
}

impl ReservationConfirmer {
    pub fn new(cache: Arc<dyn SessionCache>, documents: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            cache,
            documents,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Confirms `reservation_id`, returning the persisted reservation.
    pub async fn try_confirm(&self, reservation_id: &str) -> Result<Reservation, ConfirmError> {
        let attributes = self
            .cache
            .temp_reservation(reservation_id)
            .await
            .map_err(|source| ConfirmError::Read {
                id: reservation_id.to_string(),
                source,
            })?
            .ok_or_else(|| ConfirmError::NotFound(reservation_id.to_string()))?;

        let reservation = Reservation::new(reservation_id, attributes);

        self.documents
            .insert_document(&self.collection, reservation_id, &reservation.document())
            .await
            .map_err(|source| ConfirmError::Persist {
                id: reservation_id.to_string(),
                source,
            })?;

        // Durable from here on; a failed delete only leaves a stale copy behind.
        match self.cache.delete_temp_reservation(reservation_id).await {
            Ok(_) => info!("Reservation {} confirmed into '{}'", reservation_id, self.collection),
            Err(e) => warn!(
                "Reservation {} confirmed but its temporary record was not removed: {}",
                reservation_id, e
            ),
        }

        Ok(reservation)
    }

    /// Boolean form of [`Self::try_confirm`]; every failure is logged and reported as `false`.
    pub async fn confirm_temp_reservation(&self, reservation_id: &str) -> bool {
        match self.try_confirm(reservation_id).await {
            Ok(_) => true,
            Err(ConfirmError::NotFound(id)) => {
                warn!("No temporary reservation {}", id);
                false
            }
            Err(e) => {
                error!("Failed to confirm reservation: {}", e);
                false
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error("Temporary reservation not found: {0}")]
    NotFound(String),

    #[error("Temporary reservation {id} could not be read: {source}")]
    Read {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("Reservation {id} could not be persisted: {source}")]
    Persist {
        id: String,
        #[source]
        source: StoreError,
    },
}

impl ConfirmError {
    /// True when the durable store already holds a reservation with this id.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ConfirmError::Persist { source, .. } if source.is_duplicate())
    }
}
