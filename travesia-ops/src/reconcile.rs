use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use travesia_core::{DocumentStore, SessionCache, StoreResult};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scanned: usize,
    /// Not yet confirmed; left in the cache.
    pub pending: usize,
    /// Already durable with identical content; temporary copy removed.
    pub cleared: usize,
    /// Durable copy differs from the temporary one; left for an operator.
    pub conflicts: usize,
}

/// Removes temporary reservations that were confirmed but never deleted,
/// e.g. after a crash between the durable insert and the cache delete.
pub struct Reconciler {
    cache: Arc<dyn SessionCache>,
    documents: Arc<dyn DocumentStore>,
    collection: String,
}

impl Reconciler {
    pub fn new(cache: Arc<dyn SessionCache>, documents: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            cache,
            documents,
            collection: collection.into(),
        }
    }

    pub async fn run_once(&self) -> StoreResult<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for reservation in self.cache.all_temp_reservations().await? {
            report.scanned += 1;

            match self.documents.find_document(&self.collection, &reservation.id).await? {
                None => report.pending += 1,
                Some(Value::Object(durable)) if durable == reservation.attributes => {
                    self.cache.delete_temp_reservation(&reservation.id).await?;
                    info!("Cleared stale temporary reservation {}", reservation.id);
                    report.cleared += 1;
                }
                Some(_) => {
                    warn!(
                        "Reservation {} differs from its confirmed copy in '{}'; leaving it in the cache",
                        reservation.id, self.collection
                    );
                    report.conflicts += 1;
                }
            }
        }

        Ok(report)
    }
}
