//! Pipeline orchestrator.
//!
//! Sequences listing traversal, detail extraction, deduplication and
//! filtering for one query. Each run owns its browser session exclusively;
//! multi-location runs use one independent session per location and share a
//! single [`RateGate`] between them.

use crate::dedup::dedup;
use crate::error::{ExtractionError, PipelineError, Result};
use crate::extractor::DetailExtractor;
use crate::filter::{filter, sort};
use crate::rate_gate::RateGate;
use crate::summary::{PartialReason, RunSummary};
use crate::url_builder::build_search_url;
use crate::walker::ListingWalker;
use futures::stream::{FuturesUnordered, StreamExt};
use placescout_browser::{PageDriver, SessionLauncher};
use placescout_core::{PipelineConfig, Place, SelectorDescriptor, SiteConfig};
use std::sync::Arc;
use tokio::time::Instant;

/// Final records of a run plus its summary.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Deduplicated, filtered and ordered places
    pub places: Vec<Place>,
    /// Counts describing the run
    pub summary: RunSummary,
}

/// Raw output of one session before dedup/filter/sort.
struct SessionOutput {
    places: Vec<Place>,
    summary: RunSummary,
}

/// Runs the extraction pipeline against sessions from a [`SessionLauncher`].
pub struct PipelineOrchestrator<L: SessionLauncher> {
    launcher: L,
    site: SiteConfig,
    gate: Option<Arc<RateGate>>,
}

impl<L: SessionLauncher> PipelineOrchestrator<L> {
    /// Create an orchestrator for a search site.
    #[must_use]
    pub fn new(launcher: L, site: SiteConfig) -> Self {
        Self {
            launcher,
            site,
            gate: None,
        }
    }

    /// Pace every run through this gate instead of a per-run one.
    #[must_use]
    pub fn with_rate_gate(mut self, gate: Arc<RateGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// The session launcher.
    #[must_use]
    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Run the pipeline for one query and optional location.
    ///
    /// Per-candidate failures are counted in the summary and never abort the
    /// run. Only an unreachable search surface, an unavailable session or an
    /// invalid configuration is returned as an error.
    pub async fn run_pipeline(
        &self,
        query: &str,
        location: Option<&str>,
        config: &PipelineConfig,
    ) -> Result<PipelineOutput> {
        config.validate()?;
        let gate = self.rate_gate(config);
        let deadline = config.run_timeout().map(|timeout| Instant::now() + timeout);

        tracing::info!(
            query,
            location = location.unwrap_or("-"),
            "Starting pipeline run"
        );
        let session = self
            .run_session(query, location, config, gate, deadline)
            .await?;

        Ok(finalize(session.places, session.summary, config))
    }

    /// Run one session per location and merge their output.
    ///
    /// At most `concurrent_sessions` sessions run at once. Output is merged in
    /// the order the locations were given, then deduplicated, filtered and
    /// sorted once. The run fails only if every session fails.
    pub async fn run_many(
        &self,
        query: &str,
        locations: &[String],
        config: &PipelineConfig,
    ) -> Result<PipelineOutput> {
        if locations.is_empty() {
            return self.run_pipeline(query, None, config).await;
        }

        config.validate()?;
        let gate = self.rate_gate(config);
        let deadline = config.run_timeout().map(|timeout| Instant::now() + timeout);
        let mut summary = RunSummary::start();

        tracing::info!(
            query,
            locations = locations.len(),
            concurrent_sessions = config.concurrent_sessions,
            "Starting multi-location run"
        );

        let mut sessions = FuturesUnordered::new();
        let mut outcomes: Vec<Option<Result<SessionOutput>>> =
            locations.iter().map(|_| None).collect();

        for (index, location) in locations.iter().enumerate() {
            let gate = Arc::clone(&gate);
            sessions.push(async move {
                let outcome = self
                    .run_session(query, Some(location.as_str()), config, gate, deadline)
                    .await;
                (index, outcome)
            });

            // Respect concurrency limit
            while sessions.len() >= config.concurrent_sessions {
                if let Some((index, outcome)) = sessions.next().await {
                    outcomes[index] = Some(outcome);
                }
            }
        }

        // Collect remaining sessions
        while let Some((index, outcome)) = sessions.next().await {
            outcomes[index] = Some(outcome);
        }

        let mut places = Vec::new();
        let mut first_error = None;
        for (location, outcome) in locations.iter().zip(outcomes) {
            match outcome {
                Some(Ok(session)) => {
                    summary.absorb(&session.summary);
                    places.extend(session.places);
                }
                Some(Err(e)) => {
                    tracing::error!(location = %location, "Session failed: {}", e);
                    summary.failed_sessions += 1;
                    first_error.get_or_insert(e);
                }
                None => summary.failed_sessions += 1,
            }
        }

        if summary.failed_sessions == locations.len() {
            return Err(first_error
                .unwrap_or_else(|| PipelineError::Navigation("no session completed".to_string())));
        }

        Ok(finalize(places, summary, config))
    }

    fn rate_gate(&self, config: &PipelineConfig) -> Arc<RateGate> {
        self.gate.clone().unwrap_or_else(|| {
            Arc::new(RateGate::with_jitter(config.delay(), config.jitter()))
        })
    }

    async fn run_session(
        &self,
        query: &str,
        location: Option<&str>,
        config: &PipelineConfig,
        gate: Arc<RateGate>,
        deadline: Option<Instant>,
    ) -> Result<SessionOutput> {
        let url = build_search_url(&self.site.search_url_template, query, location)?;

        let mut driver = self
            .launcher
            .launch()
            .await
            .map_err(PipelineError::SessionUnavailable)?;

        let outcome = self.drive(&mut driver, &url, config, gate, deadline).await;

        if let Err(e) = driver.close().await {
            tracing::warn!("Failed to close browser session: {}", e);
        }

        outcome
    }

    async fn drive<D>(
        &self,
        driver: &mut D,
        url: &str,
        config: &PipelineConfig,
        gate: Arc<RateGate>,
        deadline: Option<Instant>,
    ) -> Result<SessionOutput>
    where
        D: PageDriver + ?Sized,
    {
        let mut summary = RunSummary::start();

        driver
            .navigate(url)
            .await
            .map_err(|e| PipelineError::Navigation(e.to_string()))?;

        let feed = driver
            .wait_for(SelectorDescriptor::ResultsFeed, config.navigation_timeout())
            .await
            .map_err(|e| PipelineError::Navigation(format!("results did not load: {e}")))?;

        let mut walker = ListingWalker::new(feed, Arc::clone(&gate), config);
        let mut extractor = DetailExtractor::new(gate, config, &self.site);
        let mut places = Vec::new();

        loop {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                tracing::warn!(
                    candidates = summary.candidates_seen,
                    "Run deadline reached, stopping"
                );
                summary.partial = Some(PartialReason::Deadline);
                break;
            }

            let Some(entry) = walker.next(driver).await else {
                break;
            };
            summary.candidates_seen += 1;

            match extractor.extract(driver, &entry).await {
                Ok(extraction) => {
                    summary.extracted += 1;
                    summary.field_parse_failures += extraction.unparsed_fields;
                    places.push(extraction.place);
                }
                Err(e @ ExtractionError::NameNotFound { .. }) => {
                    tracing::debug!(candidate = entry.key(), "Skipping candidate: {}", e);
                    summary.skipped_candidates += 1;
                }
                Err(e) => {
                    tracing::warn!(candidate = entry.key(), "Extraction failed: {}", e);
                    summary.extraction_failures += 1;
                }
            }
        }

        if summary.partial.is_none() {
            summary.partial = walker.partial();
        }
        summary.retries = extractor.retries();
        summary.finish();

        Ok(SessionOutput { places, summary })
    }
}

/// Dedup, filter and order the raw records, completing the summary.
fn finalize(places: Vec<Place>, mut summary: RunSummary, config: &PipelineConfig) -> PipelineOutput {
    let raw = places.len();
    let unique = dedup(places);
    summary.duplicates_merged = raw - unique.len();

    let before_filter = unique.len();
    let kept = filter(unique, config.min_rating);
    summary.filtered_out = before_filter - kept.len();

    let places = match config.sort_key {
        Some(key) => sort(&kept, key),
        None => kept,
    };
    summary.surviving = places.len();
    summary.finish();

    if summary.is_degraded() {
        tracing::warn!(
            run_id = %summary.run_id,
            surviving = summary.surviving,
            failures = summary.extraction_failures,
            skipped = summary.skipped_candidates,
            partial = ?summary.partial,
            "Pipeline run finished with degraded results"
        );
    } else {
        tracing::info!(
            run_id = %summary.run_id,
            surviving = summary.surviving,
            "Pipeline run finished"
        );
    }

    PipelineOutput { places, summary }
}
