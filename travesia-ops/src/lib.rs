pub mod confirmation;
pub mod graph_loader;
pub mod reconcile;

pub use confirmation::{ConfirmError, ReservationConfirmer};
pub use graph_loader::{GraphLoader, RelationSummary};
pub use reconcile::{ReconcileReport, Reconciler};
