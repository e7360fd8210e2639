use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use travesia_ops::Reconciler;
use travesia_store::{app_config::Config, DbClient, RedisClient};
use travesia_worker::start_reconciliation_worker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "travesia_worker=info,travesia_ops=info,travesia_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        "Starting Travesia reconciliation worker for collection '{}'",
        config.reservations.collection
    );

    // Redis Connection
    let redis = RedisClient::connect(&config.redis).await?;

    // Document store
    let db = DbClient::connect(&config.database).await?;
    db.migrate().await?;

    let reconciler = Reconciler::new(
        Arc::new(redis.clone()),
        Arc::new(db.clone()),
        config.reservations.collection.clone(),
    );

    let period = Duration::from_secs(config.reservations.reconcile_interval_seconds.max(1));
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    start_reconciliation_worker(reconciler, period, shutdown).await;

    db.close().await;
    redis.close();
    Ok(())
}
