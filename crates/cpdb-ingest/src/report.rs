//! Outcome of one ingestion run.

use std::fmt;

use chrono::{DateTime, Utc};

/// Where in the pipeline a failure was contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureScope {
    /// The run as a whole (e.g. rejected because another run is active).
    Run,
    /// A source, or one of its listing pages, could not be listed.
    Source,
    /// One offer failed normalization or persistence.
    Record,
    /// Deep extraction was unavailable; the run used listing data only.
    Browser,
    /// The end-of-run expiry sweep failed.
    Sweep,
}

impl fmt::Display for FailureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureScope::Run => "run",
            FailureScope::Source => "source",
            FailureScope::Record => "record",
            FailureScope::Browser => "browser",
            FailureScope::Sweep => "sweep",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    pub scope: FailureScope,
    /// Source name, `source: brand / title` for records, or a component name.
    pub identifier: String,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Completed,
    /// Listing succeeded but produced nothing.
    Empty,
    /// Listing failed outright, or every page that was fetched failed.
    ListingFailed,
    Cancelled,
}

/// Per-source counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub source_name: String,
    pub status: SourceStatus,
    pub offers: usize,
    pub added: usize,
    pub updated: usize,
    pub failed: usize,
    pub pages_failed: usize,
}

impl SourceSummary {
    #[must_use]
    pub fn new(source_name: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            status: SourceStatus::Completed,
            offers: 0,
            added: 0,
            updated: 0,
            failed: 0,
            pages_failed: 0,
        }
    }
}

/// Aggregate result of [`IngestionEngine::run_all`](crate::IngestionEngine::run_all).
///
/// A run never errors as a whole; everything that went wrong is listed in
/// `failures` and was logged when it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub added: usize,
    pub updated: usize,
    pub purged: u64,
    pub cancelled: bool,
    pub sources: Vec<SourceSummary>,
    pub failures: Vec<RunFailure>,
}

impl RunReport {
    pub(crate) fn begin() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            added: 0,
            updated: 0,
            purged: 0,
            cancelled: false,
            sources: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub(crate) fn record_failure(
        &mut self,
        scope: FailureScope,
        identifier: impl Into<String>,
        error: impl fmt::Display,
    ) {
        self.failures.push(RunFailure {
            scope,
            identifier: identifier.into(),
            error: error.to_string(),
        });
    }

    /// Failures contained at `scope`, in the order they happened.
    pub fn failures_in(&self, scope: FailureScope) -> impl Iterator<Item = &RunFailure> + '_ {
        self.failures.iter().filter(move |f| f.scope == scope)
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    #[must_use]
    pub fn duration_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}
