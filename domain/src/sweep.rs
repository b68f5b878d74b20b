//! Background expiry sweeping.
//!
//! Lazy expiry-on-read keeps the protocol correct on its own; the sweep
//! exists so abandoned sessions do not pile up in the store. It only ever
//! performs `pending|authorized|denied -> expired` and deletes long-expired
//! tombstones, both of which are legal, idempotent transitions, so running
//! it concurrently with request handling is safe.

use crate::error::Error;
use log::{error, info};
use sea_orm::DatabaseConnection;
use service::config::Config;
use std::sync::Arc;

/// One sweep pass: expire every overdue session, then drop tombstones whose
/// deadline passed more than the retention window ago. Returns
/// (expired, deleted) row counts.
pub async fn sweep_once(
    db: &DatabaseConnection,
    retention_secs: i64,
) -> Result<(u64, u64), Error> {
    let now = chrono::Utc::now();

    let expired = entity_api::auth_session::expire_overdue(db, now).await?;
    let deleted = entity_api::auth_session::delete_expired_before(
        db,
        now - chrono::Duration::seconds(retention_secs),
    )
    .await?;

    Ok((expired, deleted))
}

/// Runs the sweep on the configured interval until the process exits.
/// Intended to be `tokio::spawn`ed next to the server loop.
pub async fn run(db: Arc<DatabaseConnection>, config: Config) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(
        config.sweep_interval_secs.max(1),
    ));
    // The first tick fires immediately; skip it so startup stays quiet.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match sweep_once(db.as_ref(), config.expired_retention_secs).await {
            Ok((0, 0)) => {}
            Ok((expired, deleted)) => {
                info!(
                    "Expiry sweep: {} session(s) expired, {} tombstone(s) deleted",
                    expired, deleted
                );
            }
            Err(e) => {
                // The next tick retries; sessions stay safe via lazy expiry.
                error!("Expiry sweep failed: {e}");
            }
        }
    }
}
