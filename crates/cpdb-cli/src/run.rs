//! One-shot `run` and `purge` commands.

use cpdb_core::AppConfig;
use cpdb_ingest::{EngineSettings, ExpirySweeper, FailureScope, RunReport, SourceStatus};

use crate::pipeline::{open_store, source_filter, Pipeline};

/// Run every active source once and print the report.
///
/// # Errors
///
/// Returns an error if the store or sources cannot be opened, or if every
/// source failed to list. Per-offer failures only appear in the report.
pub(crate) async fn run_once(
    config: &AppConfig,
    sources: Vec<String>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let store = open_store(config, dry_run).await?;
    let filter = source_filter(config, sources);
    let pipeline = Pipeline::build(config, store, filter.as_deref())?;

    let cancel = pipeline.engine.cancel_flag();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping after the current offer");
            cancel.cancel();
        }
    });

    let report = pipeline.engine.run_all(&pipeline.adapters).await;
    interrupt.abort();
    pipeline.shutdown().await;

    for line in summary_lines(&report) {
        println!("{line}");
    }

    if all_sources_failed(&report) {
        anyhow::bail!("all {} sources failed to list offers", report.sources.len());
    }
    Ok(())
}

/// Purge expired scraper-owned coupons without scraping.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the delete fails.
pub(crate) async fn run_purge(config: &AppConfig) -> anyhow::Result<()> {
    let store = open_store(config, false).await?;
    let settings = EngineSettings::from_app_config(config);
    let purged = ExpirySweeper::new(store, settings.tz, settings.retry)
        .purge()
        .await?;
    println!("purged {purged} expired coupon(s)");
    Ok(())
}

pub(crate) fn all_sources_failed(report: &RunReport) -> bool {
    !report.sources.is_empty()
        && report
            .sources
            .iter()
            .all(|s| s.status == SourceStatus::ListingFailed)
}

pub(crate) fn summary_lines(report: &RunReport) -> Vec<String> {
    let mut lines = vec![format!(
        "added {}, updated {}, purged {}{}",
        report.added,
        report.updated,
        report.purged,
        if report.cancelled { ", cancelled" } else { "" }
    )];

    for source in &report.sources {
        let status = match source.status {
            SourceStatus::Completed => "ok",
            SourceStatus::Empty => "empty",
            SourceStatus::ListingFailed => "failed",
            SourceStatus::Cancelled => "cancelled",
        };
        lines.push(format!(
            "  {:<24} {:<9} offers {:>4}  added {:>4}  updated {:>4}  failed {:>4}",
            source.source_name, status, source.offers, source.added, source.updated, source.failed
        ));
    }

    let record_failures = report.failures_in(FailureScope::Record).count();
    for failure in report
        .failures
        .iter()
        .filter(|f| f.scope != FailureScope::Record)
    {
        lines.push(format!(
            "  ! {} {}: {}",
            failure.scope, failure.identifier, failure.error
        ));
    }
    if record_failures > 0 {
        lines.push(format!(
            "  ! {record_failures} offer(s) skipped; see log for details"
        ));
    }
    lines
}
