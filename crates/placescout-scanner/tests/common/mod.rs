//! Scripted in-memory page driver for pipeline tests.

#![allow(dead_code)]

use placescout_browser::{
    DriverError, ElementHandle, EntryHandle, PageDriver, Result, SessionLauncher,
};
use placescout_core::{FieldDescriptor, PipelineConfig, SelectorDescriptor};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const FEED: ElementHandle = ElementHandle::new(0);

/// Transient failure injected into a detail-view render.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Timeout,
    Stale,
}

impl Failure {
    fn to_error(self) -> DriverError {
        match self {
            Self::Timeout => DriverError::Timeout("detail_panel".to_string()),
            Self::Stale => DriverError::StaleHandle("detail_panel".to_string()),
        }
    }
}

/// One result entry and the detail view behind it.
#[derive(Debug, Clone)]
pub struct ScriptedPlace {
    key: String,
    label: Option<String>,
    fields: HashMap<FieldDescriptor, String>,
    failures: Vec<Failure>,
}

impl ScriptedPlace {
    pub fn new(name: &str) -> Self {
        let mut fields = HashMap::new();
        fields.insert(FieldDescriptor::Name, name.to_string());
        Self {
            key: format!("/maps/place/{}", name.replace(' ', "+")),
            label: Some(name.to_string()),
            fields,
            failures: Vec::new(),
        }
    }

    pub fn keyed(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }

    pub fn labeled(mut self, label: Option<&str>) -> Self {
        self.label = label.map(str::to_string);
        self
    }

    pub fn field(mut self, field: FieldDescriptor, raw: &str) -> Self {
        self.fields.insert(field, raw.to_string());
        self
    }

    pub fn without_name(mut self) -> Self {
        self.fields.remove(&FieldDescriptor::Name);
        self
    }

    /// Fail the next `times` detail renders of this entry.
    pub fn failing(mut self, failure: Failure, times: usize) -> Self {
        self.failures.extend(std::iter::repeat(failure).take(times));
        self
    }
}

/// A results view: entries revealed one batch per scroll.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    batches: Vec<Vec<ScriptedPlace>>,
    feed_missing: bool,
    scroll_times_out: bool,
    list_times_out_after: Option<usize>,
}

impl Listing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch(mut self, places: Vec<ScriptedPlace>) -> Self {
        self.batches.push(places);
        self
    }

    pub fn without_feed(mut self) -> Self {
        self.feed_missing = true;
        self
    }

    /// Every scroll of the feed times out.
    pub fn scroll_times_out(mut self) -> Self {
        self.scroll_times_out = true;
        self
    }

    /// Reading the entries times out after `reads` successful reads.
    pub fn list_times_out_after(mut self, reads: usize) -> Self {
        self.list_times_out_after = Some(reads);
        self
    }
}

/// Counters shared by every driver a launcher hands out.
#[derive(Debug, Default)]
pub struct Stats {
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
    pub clicks: AtomicUsize,
    pub detail_attempts: AtomicUsize,
    pub scrolls: AtomicUsize,
    pub active: AtomicUsize,
    pub peak_active: AtomicUsize,
}

impl Stats {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn opened(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(now, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct ScriptedDriver {
    routes: Vec<(String, Listing)>,
    stats: Arc<Stats>,
    listing: Option<Listing>,
    revealed: usize,
    list_reads: usize,
    opened: Option<ScriptedPlace>,
    failures: HashMap<String, Vec<Failure>>,
}

impl ScriptedDriver {
    /// Driver whose every URL shows `listing`.
    pub fn new(listing: Listing) -> Self {
        Self::routed(vec![(String::new(), listing)], Arc::new(Stats::default()))
    }

    /// Driver that picks the first listing whose pattern occurs in the URL.
    pub fn routed(routes: Vec<(String, Listing)>, stats: Arc<Stats>) -> Self {
        Self {
            routes,
            stats,
            listing: None,
            revealed: 0,
            list_reads: 0,
            opened: None,
            failures: HashMap::new(),
        }
    }

    pub fn stats(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }

    fn visible(&self) -> Vec<&ScriptedPlace> {
        self.listing
            .iter()
            .flat_map(|listing| listing.batches.iter().take(self.revealed))
            .flatten()
            .collect()
    }
}

#[async_trait::async_trait]
impl PageDriver for ScriptedDriver {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let listing = self
            .routes
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, listing)| listing.clone())
            .ok_or_else(|| DriverError::Navigation(format!("no route for {url}")))?;

        self.failures = listing
            .batches
            .iter()
            .flatten()
            .map(|place| (place.key.clone(), place.failures.clone()))
            .collect();
        self.revealed = usize::from(!listing.batches.is_empty());
        self.list_reads = 0;
        self.listing = Some(listing);
        self.opened = None;
        Ok(())
    }

    async fn wait_for(
        &mut self,
        region: SelectorDescriptor,
        _timeout: Duration,
    ) -> Result<ElementHandle> {
        match region {
            SelectorDescriptor::ResultsFeed => match &self.listing {
                Some(listing) if !listing.feed_missing => Ok(FEED),
                _ => Err(DriverError::Timeout(region.to_string())),
            },
            SelectorDescriptor::DetailPanel => {
                self.stats.detail_attempts.fetch_add(1, Ordering::SeqCst);
                let key = self
                    .opened
                    .as_ref()
                    .map(|place| place.key.clone())
                    .ok_or_else(|| DriverError::Timeout(region.to_string()))?;

                if let Some(queue) = self.failures.get_mut(&key) {
                    if !queue.is_empty() {
                        return Err(queue.remove(0).to_error());
                    }
                }
                Ok(ElementHandle::new(1))
            }
            SelectorDescriptor::ResultEntry => Err(DriverError::NotFound(region.to_string())),
        }
    }

    async fn read_field(
        &mut self,
        _scope: &ElementHandle,
        field: FieldDescriptor,
    ) -> Result<Option<String>> {
        Ok(self
            .opened
            .as_ref()
            .and_then(|place| place.fields.get(&field).cloned()))
    }

    async fn list_entries(&mut self, _feed: &ElementHandle) -> Result<Vec<EntryHandle>> {
        let limit = self
            .listing
            .as_ref()
            .and_then(|listing| listing.list_times_out_after);
        if limit.is_some_and(|limit| self.list_reads >= limit) {
            return Err(DriverError::Timeout("result_entry".to_string()));
        }
        self.list_reads += 1;

        Ok(self
            .visible()
            .into_iter()
            .enumerate()
            .map(|(position, place)| EntryHandle::new(place.key.clone(), position, place.label.clone()))
            .collect())
    }

    async fn scroll_or_page(&mut self, _feed: &ElementHandle, _settle: Duration) -> Result<bool> {
        self.stats.scrolls.fetch_add(1, Ordering::SeqCst);
        if self.listing.as_ref().is_some_and(|listing| listing.scroll_times_out) {
            return Err(DriverError::Timeout("results_feed".to_string()));
        }
        let total = self.listing.as_ref().map_or(0, |listing| listing.batches.len());
        if self.revealed < total {
            self.revealed += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn click(&mut self, entry: &EntryHandle) -> Result<()> {
        self.stats.clicks.fetch_add(1, Ordering::SeqCst);
        let place = self
            .visible()
            .into_iter()
            .find(|place| place.key == entry.key())
            .cloned()
            .ok_or_else(|| DriverError::StaleHandle(entry.key().to_string()))?;
        self.opened = Some(place);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        let _ = self
            .stats
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        Ok(())
    }
}

/// Launcher handing out scripted drivers that share one set of counters.
#[derive(Debug, Clone)]
pub struct ScriptedLauncher {
    routes: Vec<(String, Listing)>,
    stats: Arc<Stats>,
    fail_launch: bool,
}

impl ScriptedLauncher {
    pub fn new(listing: Listing) -> Self {
        Self::routed(vec![("", listing)])
    }

    pub fn routed(routes: Vec<(&str, Listing)>) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|(pattern, listing)| (pattern.to_string(), listing))
                .collect(),
            stats: Arc::new(Stats::default()),
            fail_launch: false,
        }
    }

    pub fn broken() -> Self {
        let mut launcher = Self::routed(Vec::new());
        launcher.fail_launch = true;
        launcher
    }

    pub fn stats(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait::async_trait]
impl SessionLauncher for ScriptedLauncher {
    type Driver = ScriptedDriver;

    async fn launch(&self) -> Result<ScriptedDriver> {
        if self.fail_launch {
            return Err(DriverError::Launch("chrome not installed".to_string()));
        }
        self.stats.launched.fetch_add(1, Ordering::SeqCst);
        self.stats.opened();
        Ok(ScriptedDriver::routed(
            self.routes.clone(),
            Arc::clone(&self.stats),
        ))
    }
}

/// Fast, deterministic pipeline settings.
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        delay_ms: 100,
        jitter_ms: 0,
        render_timeout_secs: 1,
        navigation_timeout_secs: 1,
        settle_timeout_ms: 100,
        max_retries: 2,
        max_results: 10,
        stall_threshold: 2,
        ..PipelineConfig::default()
    }
}

/// Places named "Place 1".."Place n" in one batch.
pub fn numbered(n: usize) -> Vec<ScriptedPlace> {
    (1..=n)
        .map(|i| ScriptedPlace::new(&format!("Place {i}")))
        .collect()
}
