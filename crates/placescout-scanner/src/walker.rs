//! Results-list traversal.

use crate::rate_gate::RateGate;
use crate::summary::PartialReason;
use placescout_browser::{DriverError, ElementHandle, EntryHandle, PageDriver};
use placescout_core::PipelineConfig;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Lazily enumerates result entries from a rendered results feed.
///
/// The sequence is finite and not restartable: pulling entries scrolls the
/// underlying view. It ends when `max_results` entries were yielded or when
/// `stall_threshold` consecutive scrolls produced nothing new. Ending early
/// for any reason other than the cap is recorded as a [`PartialReason`].
#[derive(Debug)]
pub struct ListingWalker {
    feed: ElementHandle,
    gate: Arc<RateGate>,
    max_results: usize,
    stall_threshold: u32,
    settle: Duration,
    seen: HashSet<String>,
    pending: VecDeque<EntryHandle>,
    yielded: usize,
    stalls: u32,
    primed: bool,
    exhausted: bool,
    partial: Option<PartialReason>,
}

impl ListingWalker {
    /// Create a walker over an already rendered results feed.
    #[must_use]
    pub fn new(feed: ElementHandle, gate: Arc<RateGate>, config: &PipelineConfig) -> Self {
        Self {
            feed,
            gate,
            max_results: config.max_results,
            stall_threshold: config.stall_threshold.max(1),
            settle: config.settle_timeout(),
            seen: HashSet::new(),
            pending: VecDeque::new(),
            yielded: 0,
            stalls: 0,
            primed: false,
            exhausted: false,
            partial: None,
        }
    }

    /// Pull the next entry, pacing every yield through the rate gate.
    ///
    /// Returns `None` once the sequence has ended.
    pub async fn next<D>(&mut self, driver: &mut D) -> Option<EntryHandle>
    where
        D: PageDriver + ?Sized,
    {
        loop {
            if self.yielded >= self.max_results {
                return None;
            }

            if let Some(entry) = self.pending.pop_front() {
                self.gate.acquire().await;
                self.yielded += 1;
                tracing::debug!(
                    candidate = self.yielded,
                    key = entry.key(),
                    "Yielding result entry"
                );
                return Some(entry);
            }

            if self.exhausted {
                return None;
            }

            self.refill(driver).await;
        }
    }

    /// Number of entries yielded so far.
    #[must_use]
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Why the sequence ended before reaching `max_results`, if it did.
    #[must_use]
    pub fn partial(&self) -> Option<PartialReason> {
        self.partial
    }

    async fn refill<D>(&mut self, driver: &mut D)
    where
        D: PageDriver + ?Sized,
    {
        if !self.primed {
            self.primed = true;
            match self.collect_new(driver).await {
                Ok(0) => {}
                Ok(_) => return,
                Err(e) => return self.end(PartialReason::RenderTimeout, &e),
            }
        }

        loop {
            let progressed = match driver.scroll_or_page(&self.feed, self.settle).await {
                Ok(progressed) => progressed,
                Err(e) => return self.end(PartialReason::RenderTimeout, &e),
            };

            let added = match self.collect_new(driver).await {
                Ok(added) => added,
                Err(e) => return self.end(PartialReason::RenderTimeout, &e),
            };

            if added > 0 {
                self.stalls = 0;
                return;
            }

            self.stalls += 1;
            tracing::debug!(
                stalls = self.stalls,
                threshold = self.stall_threshold,
                progressed,
                "No new result entries after scroll"
            );

            if self.stalls >= self.stall_threshold {
                tracing::warn!(
                    yielded = self.yielded,
                    max_results = self.max_results,
                    "Results list stalled before reaching the result cap"
                );
                self.partial = Some(PartialReason::Stalled);
                self.exhausted = true;
                return;
            }
        }
    }

    /// Queue the entries not yet seen; returns how many were added.
    async fn collect_new<D>(&mut self, driver: &mut D) -> Result<usize, DriverError>
    where
        D: PageDriver + ?Sized,
    {
        let entries = driver.list_entries(&self.feed).await?;
        let mut added = 0;
        for entry in entries {
            if self.seen.insert(entry.key().to_string()) {
                self.pending.push_back(entry);
                added += 1;
            }
        }
        Ok(added)
    }

    fn end(&mut self, reason: PartialReason, error: &DriverError) {
        tracing::warn!(
            yielded = self.yielded,
            "Results list stopped rendering ({}), ending with partial results",
            error
        );
        self.partial = Some(reason);
        self.exhausted = true;
    }
}
