//! Run accounting.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Why a run ended with fewer candidates than requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialReason {
    /// The results list stopped growing before the result cap
    Stalled,
    /// The results list stopped rendering
    RenderTimeout,
    /// The run deadline expired
    Deadline,
}

impl fmt::Display for PartialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stalled => write!(f, "results list stalled"),
            Self::RenderTimeout => write!(f, "results list stopped rendering"),
            Self::Deadline => write!(f, "run deadline reached"),
        }
    }
}

/// Aggregate counts describing one pipeline execution.
///
/// Built up while the run progresses and returned read-only with the results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Unique identifier of the run
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Result entries yielded by the listing walk
    pub candidates_seen: usize,
    /// Candidates turned into places
    pub extracted: usize,
    /// Candidates that failed after exhausting retries or on driver errors
    pub extraction_failures: usize,
    /// Candidates skipped because the detail view had no place name
    pub skipped_candidates: usize,
    /// Extraction retries performed
    pub retries: usize,
    /// Numeric fields whose text could not be parsed
    pub field_parse_failures: usize,
    /// Records folded into an earlier record with the same identity
    pub duplicates_merged: usize,
    /// Records removed by the rating threshold
    pub filtered_out: usize,
    /// Records returned to the caller
    pub surviving: usize,
    /// Sessions whose search surface never loaded (multi-location runs)
    pub failed_sessions: usize,
    /// Set when the listing ended early
    pub partial: Option<PartialReason>,
}

impl RunSummary {
    /// Start an empty summary stamped with the current time.
    #[must_use]
    pub fn start() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            candidates_seen: 0,
            extracted: 0,
            extraction_failures: 0,
            skipped_candidates: 0,
            retries: 0,
            field_parse_failures: 0,
            duplicates_merged: 0,
            filtered_out: 0,
            surviving: 0,
            failed_sessions: 0,
            partial: None,
        }
    }

    /// Whether anything went wrong that the caller should know about.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.extraction_failures > 0
            || self.skipped_candidates > 0
            || self.field_parse_failures > 0
            || self.failed_sessions > 0
            || self.partial.is_some()
    }

    /// Add the per-session counters of another summary into this one.
    ///
    /// The first partial reason recorded wins.
    pub fn absorb(&mut self, other: &RunSummary) {
        self.candidates_seen += other.candidates_seen;
        self.extracted += other.extracted;
        self.extraction_failures += other.extraction_failures;
        self.skipped_candidates += other.skipped_candidates;
        self.retries += other.retries;
        self.field_parse_failures += other.field_parse_failures;
        self.failed_sessions += other.failed_sessions;
        if self.partial.is_none() {
            self.partial = other.partial;
        }
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// Wall-clock duration of the run.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {}", self.run_id)?;
        writeln!(f, "  candidates seen:     {}", self.candidates_seen)?;
        writeln!(f, "  extracted:           {}", self.extracted)?;
        writeln!(f, "  extraction failures: {}", self.extraction_failures)?;
        writeln!(f, "  skipped candidates:  {}", self.skipped_candidates)?;
        writeln!(f, "  retries:             {}", self.retries)?;
        writeln!(f, "  unparsed fields:     {}", self.field_parse_failures)?;
        writeln!(f, "  duplicates merged:   {}", self.duplicates_merged)?;
        writeln!(f, "  filtered out:        {}", self.filtered_out)?;
        write!(f, "  surviving:           {}", self.surviving)?;
        if self.failed_sessions > 0 {
            write!(f, "\n  failed sessions:     {}", self.failed_sessions)?;
        }
        if let Some(reason) = self.partial {
            write!(f, "\n  partial result:      {reason}")?;
        }
        Ok(())
    }
}
