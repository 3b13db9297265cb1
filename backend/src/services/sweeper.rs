//! Periodic removal of expired session payloads and the active-session records left pointing at
//! them.

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::{
    error::StorageError,
    services::{SessionAuthorityTrait, SessionStoreTrait},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_sessions: u64,
    pub orphaned_records: u64,
}

/// Runs one sweep: expired payloads first, then records whose payload is gone.
pub async fn sweep_once(
    store: &dyn SessionStoreTrait,
    authority: &dyn SessionAuthorityTrait,
) -> Result<SweepReport, StorageError> {
    let expired_sessions = store.purge_expired().await?;
    let orphaned_records = authority.purge_orphaned(store).await?;
    Ok(SweepReport {
        expired_sessions,
        orphaned_records,
    })
}

/// Starts the background sweeper. The first sweep runs immediately.
pub fn spawn_session_sweeper(
    store: Arc<dyn SessionStoreTrait>,
    authority: Arc<dyn SessionAuthorityTrait>,
    period: Duration,
) -> JoinHandle<()> {
    tracing::info!(period_secs = period.as_secs(), "Starting session sweeper");

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match sweep_once(store.as_ref(), authority.as_ref()).await {
                Ok(report) if report != SweepReport::default() => tracing::info!(
                    expired_sessions = report.expired_sessions,
                    orphaned_records = report.orphaned_records,
                    "Swept expired sessions"
                ),
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "Session sweep failed"),
            }
        }
    })
}
