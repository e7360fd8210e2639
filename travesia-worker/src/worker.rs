use std::future::Future;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};
use travesia_ops::Reconciler;

/// Runs a reconciliation pass every `period` until `shutdown` resolves.
/// Returns the number of passes started. A failed pass is logged and the
/// loop keeps going.
pub async fn start_reconciliation_worker(
    reconciler: Reconciler,
    period: Duration,
    shutdown: impl Future<Output = ()>,
) -> usize {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!("Reconciliation worker started, every {:?}", period);

    let mut passes = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Reconciliation worker stopping after {} passes", passes);
                return passes;
            }
            _ = ticker.tick() => {
                passes += 1;
                match reconciler.run_once().await {
                    Ok(report) if report.cleared > 0 || report.conflicts > 0 => info!(
                        "Reconciliation: scanned {}, cleared {}, conflicts {}, pending {}",
                        report.scanned, report.cleared, report.conflicts, report.pending
                    ),
                    Ok(report) => tracing::debug!("Reconciliation: {} pending", report.pending),
                    Err(e) => error!("Reconciliation pass failed: {}", e),
                }
            }
        }
    }
}
