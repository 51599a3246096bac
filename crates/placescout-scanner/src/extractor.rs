//! Detail-view extraction.
//!
//! [`DetailExtractor`] opens one result entry, waits for its detail view and
//! reads every field independently. Only the name is mandatory; any other
//! field that is missing or unparsable becomes unknown.

use crate::error::ExtractionError;
use crate::normalize;
use crate::rate_gate::RateGate;
use placescout_browser::{DriverError, ElementHandle, EntryHandle, PageDriver};
use placescout_core::{
    FieldDescriptor, IdentityKey, PipelineConfig, Place, PlaceDetails, SelectorDescriptor,
    SiteConfig, Timestamp,
};
use std::sync::Arc;
use std::time::Duration;

/// A successfully extracted place plus bookkeeping for the run summary.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The extracted record
    pub place: Place,
    /// Numeric fields whose text was present but unparsable
    pub unparsed_fields: usize,
    /// Attempts it took, counting the successful one
    pub attempts: u32,
}

/// Turns result entries into [`Place`] records.
#[derive(Debug)]
pub struct DetailExtractor {
    gate: Arc<RateGate>,
    render_timeout: Duration,
    max_retries: u32,
    placeholder_names: Vec<String>,
    retries: usize,
}

impl DetailExtractor {
    /// Create an extractor for one session.
    #[must_use]
    pub fn new(gate: Arc<RateGate>, config: &PipelineConfig, site: &SiteConfig) -> Self {
        Self {
            gate,
            render_timeout: config.render_timeout(),
            max_retries: config.max_retries,
            placeholder_names: site
                .placeholder_names
                .iter()
                .map(|name| name.trim().to_lowercase())
                .collect(),
            retries: 0,
        }
    }

    /// Retries performed so far by this extractor.
    #[must_use]
    pub fn retries(&self) -> usize {
        self.retries
    }

    /// Extract one entry, retrying transient failures.
    ///
    /// Timeouts and stale handles are retried up to `max_retries` times, each
    /// retry preceded by a rate-gate acquisition. A missing name is final.
    pub async fn extract<D>(
        &mut self,
        driver: &mut D,
        entry: &EntryHandle,
    ) -> Result<Extraction, ExtractionError>
    where
        D: PageDriver + ?Sized,
    {
        let max_attempts = self.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.extract_once(driver, entry).await {
                Ok(mut extraction) => {
                    extraction.attempts = attempt;
                    return Ok(extraction);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    tracing::warn!(
                        candidate = entry.key(),
                        attempt,
                        max_attempts,
                        "Extraction failed ({}), retrying",
                        e
                    );
                    self.retries += 1;
                    self.gate.acquire().await;
                }
                Err(e) => return Err(e.with_attempts(attempt)),
            }
        }
    }

    /// One extraction attempt without retries.
    pub async fn extract_once<D>(
        &self,
        driver: &mut D,
        entry: &EntryHandle,
    ) -> Result<Extraction, ExtractionError>
    where
        D: PageDriver + ?Sized,
    {
        driver.click(entry).await?;
        let panel = driver
            .wait_for(SelectorDescriptor::DetailPanel, self.render_timeout)
            .await?;

        let name = self.read_name(driver, &panel, entry).await?;

        let mut unparsed_fields = 0;

        let address = read_optional(driver, &panel, FieldDescriptor::Address)
            .await?
            .and_then(|raw| normalize::normalize_address(&raw));
        let phone = read_optional(driver, &panel, FieldDescriptor::Phone)
            .await?
            .and_then(|raw| normalize::normalize_phone(&raw));
        let website = read_optional(driver, &panel, FieldDescriptor::Website)
            .await?
            .and_then(|raw| normalize::normalize_website(&raw));
        let category = read_optional(driver, &panel, FieldDescriptor::Category)
            .await?
            .and_then(|raw| normalize::normalize_text(&raw));

        let mut rating = None;
        if let Some(raw) = read_optional(driver, &panel, FieldDescriptor::Rating).await? {
            rating = normalize::parse_rating(&raw);
            if rating.is_none() {
                tracing::debug!(candidate = entry.key(), raw = %raw, "Unparsable rating");
                unparsed_fields += 1;
            }
        }

        let mut review_count = None;
        if let Some(raw) = read_optional(driver, &panel, FieldDescriptor::ReviewCount).await? {
            review_count = normalize::parse_review_count(&raw);
            if review_count.is_none() {
                tracing::debug!(candidate = entry.key(), raw = %raw, "Unparsable review count");
                unparsed_fields += 1;
            }
        }

        let details = PlaceDetails {
            address,
            phone,
            website,
            category,
            rating,
            review_count,
        };

        let place = Place::new(name, details, Timestamp::now())
            .map_err(|_| ExtractionError::NameNotFound { found: None })?;

        tracing::debug!(
            candidate = entry.key(),
            place = place.name(),
            fields = place.present_field_count(),
            "Extracted place"
        );

        Ok(Extraction {
            place,
            unparsed_fields,
            attempts: 1,
        })
    }

    async fn read_name<D>(
        &self,
        driver: &mut D,
        panel: &ElementHandle,
        entry: &EntryHandle,
    ) -> Result<String, ExtractionError>
    where
        D: PageDriver + ?Sized,
    {
        let name = read_optional(driver, panel, FieldDescriptor::Name)
            .await?
            .and_then(|raw| normalize::normalize_text(&raw))
            .ok_or(ExtractionError::NameNotFound { found: None })?;

        if self.placeholder_names.contains(&name.to_lowercase()) {
            return Err(ExtractionError::NameNotFound { found: Some(name) });
        }

        // the panel still shows the previously opened place
        if let Some(label) = entry.label() {
            if IdentityKey::derive(label, None) != IdentityKey::derive(&name, None) {
                return Err(ExtractionError::StaleHandle { attempts: 1 });
            }
        }

        Ok(name)
    }
}

/// Read a field, treating a missing element as an unknown value.
async fn read_optional<D>(
    driver: &mut D,
    panel: &ElementHandle,
    field: FieldDescriptor,
) -> Result<Option<String>, ExtractionError>
where
    D: PageDriver + ?Sized,
{
    match driver.read_field(panel, field).await {
        Ok(value) => Ok(value),
        Err(DriverError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
