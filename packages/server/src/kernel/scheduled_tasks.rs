//! Periodic maintenance: the dispatch recovery sweep.
//!
//! Dispatch cycles run as plain tasks, so a process restart orphans any
//! cycle that was mid-wave. The sweep finds bookings whose persisted
//! dispatch progress has gone quiet and hands each back to a fresh
//! dispatcher, which resumes from the stored batch index.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::common::error::AppError;
use crate::domains::dispatch::dispatcher::{is_resumable, spawn_dispatch};
use crate::kernel::deps::ServerDeps;

/// Sweep once: resume every stale, still-resumable dispatch. Returns how
/// many cycles were restarted.
pub async fn resume_stale_dispatches(deps: Arc<ServerDeps>) -> Result<usize, AppError> {
    let stale_after = chrono::Duration::from_std(deps.dispatch_config.stale_after)
        .map_err(|e| AppError::Internal(e.into()))?;
    let cutoff = Utc::now() - stale_after;

    let stale = deps.booking_store.find_stale_dispatches(cutoff).await?;
    let mut resumed = 0;
    for booking in stale {
        if !is_resumable(&booking, &deps.dispatch_config) {
            continue;
        }
        tracing::info!(booking_id = %booking.id, state = ?booking.state, "resuming stale dispatch");
        spawn_dispatch(deps.clone(), booking.id);
        resumed += 1;
    }
    Ok(resumed)
}

/// Start the background scheduler with the recovery sweep on a one-minute
/// cadence.
pub async fn start_scheduler(deps: Arc<ServerDeps>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let sweep_deps = deps.clone();
    scheduler
        .add(Job::new_async("0 * * * * *", move |_uuid, _lock| {
            let deps = sweep_deps.clone();
            Box::pin(async move {
                match resume_stale_dispatches(deps).await {
                    Ok(0) => {}
                    Ok(resumed) => tracing::info!(resumed, "dispatch recovery sweep"),
                    Err(error) => tracing::error!(%error, "dispatch recovery sweep failed"),
                }
            })
        })?)
        .await?;

    scheduler.start().await?;
    tracing::info!("scheduler started");
    Ok(scheduler)
}
