//! Long-running `schedule` command.
//!
//! Registers the ingestion run and the standalone expiry purge as two cron
//! jobs and keeps the process alive until Ctrl-C.

use std::sync::Arc;

use cpdb_core::AppConfig;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::pipeline::{open_store, Pipeline};

/// Build the pipeline, start both jobs, and block until interrupted.
///
/// # Errors
///
/// Returns an error if the store or sources cannot be opened, a cron
/// expression is invalid, or the scheduler fails to start or stop.
pub(crate) async fn run_scheduled(config: &AppConfig) -> anyhow::Result<()> {
    let store = open_store(config, false).await?;
    let pipeline = Arc::new(Pipeline::build(
        config,
        store,
        config.active_sources.as_deref(),
    )?);

    let mut scheduler = build_scheduler(Arc::clone(&pipeline), config).await?;
    tracing::info!("scheduler running; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("received shutdown signal, stopping scheduler");
    pipeline.engine.cancel_flag().cancel();
    scheduler.shutdown().await?;
    pipeline.shutdown().await;
    Ok(())
}

/// Builds and starts the job scheduler.
///
/// The returned handle must be kept alive; dropping it stops every job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if a cron expression is invalid or the
/// scheduler cannot start.
pub(crate) async fn build_scheduler(
    pipeline: Arc<Pipeline>,
    config: &AppConfig,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_ingest_job(&scheduler, Arc::clone(&pipeline), &config.ingest_cron).await?;
    register_purge_job(&scheduler, pipeline, &config.purge_cron).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Full ingestion run. Overlapping triggers are rejected by the engine's
/// single-run guard and show up as a run-scope failure.
async fn register_ingest_job(
    scheduler: &JobScheduler,
    pipeline: Arc<Pipeline>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let pipeline = Arc::clone(&pipeline);

        Box::pin(async move {
            tracing::info!("scheduler: starting ingestion run");
            let report = pipeline.engine.run_all(&pipeline.adapters).await;
            tracing::info!(
                added = report.added,
                updated = report.updated,
                purged = report.purged,
                failures = report.failures.len(),
                "scheduler: ingestion run complete"
            );
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered ingestion job");
    Ok(())
}

/// Expiry purge on its own cadence, independent of scraping.
async fn register_purge_job(
    scheduler: &JobScheduler,
    pipeline: Arc<Pipeline>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let pipeline = Arc::clone(&pipeline);

        Box::pin(async move {
            match pipeline.engine.sweeper().purge().await {
                Ok(purged) => tracing::info!(purged, "scheduler: expiry purge complete"),
                Err(e) => tracing::error!(error = %e, "scheduler: expiry purge failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered purge job");
    Ok(())
}
