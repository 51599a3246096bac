//! Configuration management for PlaceScout.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Nothing here is global: callers load an
//! [`AppConfig`] and pass the relevant section into the pipeline explicitly.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{FieldDescriptor, SelectorDescriptor, SortKey};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/placescout/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Extraction pipeline tuning
    pub pipeline: PipelineConfig,
    /// Browser session settings
    pub browser: BrowserConfig,
    /// Search surface description (URL template and selectors)
    pub site: SiteConfig,
    /// Export settings
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from the default path, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    ///
    /// Unlike [`AppConfig::load`], a missing file is an error here.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `PLACESCOUT_HEADLESS`: Override browser headless mode (true/false)
    /// - `PLACESCOUT_DELAY_MS`: Override the minimum delay between interactions
    /// - `PLACESCOUT_MAX_RESULTS`: Override the result cap
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `PLACESCOUT_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PLACESCOUT_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("PLACESCOUT_DELAY_MS") {
            if let Ok(delay_ms) = val.parse() {
                self.pipeline.delay_ms = delay_ms;
                tracing::debug!("Override pipeline.delay_ms from env: {}", delay_ms);
            }
        }

        if let Ok(val) = std::env::var("PLACESCOUT_MAX_RESULTS") {
            if let Ok(max_results) = val.parse() {
                self.pipeline.max_results = max_results;
                tracing::debug!("Override pipeline.max_results from env: {}", max_results);
            }
        }
    }

    /// Check every section for out-of-range values.
    pub fn validate(&self) -> ConfigResult<()> {
        self.pipeline.validate()?;
        self.site.validate()
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/placescout/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "placescout", "placescout")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Extraction pipeline settings.
///
/// This is the explicit configuration record handed to the orchestrator for
/// each run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum interval between paced interactions in milliseconds
    pub delay_ms: u64,
    /// Upper bound of the random offset added to each interval, in milliseconds
    pub jitter_ms: u64,
    /// How long to wait for a detail view to render, in seconds
    pub render_timeout_secs: u64,
    /// How long to wait for the results surface after navigation, in seconds
    pub navigation_timeout_secs: u64,
    /// How long to wait for new entries after a scroll, in milliseconds
    pub settle_timeout_ms: u64,
    /// Retries for transient extraction failures (attempts = retries + 1)
    pub max_retries: u32,
    /// Maximum number of candidates taken from the results list
    pub max_results: usize,
    /// Consecutive empty settlement waits before the list counts as stalled
    pub stall_threshold: u32,
    /// Minimum rating a place must have to be kept (0 keeps everything)
    pub min_rating: f64,
    /// Final ordering; `None` keeps discovery order
    pub sort_key: Option<SortKey>,
    /// Parallel browser sessions for multi-location runs
    pub concurrent_sessions: usize,
    /// Optional wall-clock budget for a run, in seconds
    pub run_timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1000,
            jitter_ms: 250,
            render_timeout_secs: 15,
            navigation_timeout_secs: 30,
            settle_timeout_ms: 3000,
            max_retries: 2,
            max_results: 20,
            stall_threshold: 2,
            min_rating: 0.0,
            sort_key: None,
            concurrent_sessions: 2,
            run_timeout_secs: None,
        }
    }
}

impl PipelineConfig {
    /// Minimum interval between paced interactions.
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Maximum jitter added to the interval.
    #[must_use]
    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }

    /// Detail-view render timeout.
    #[must_use]
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    /// Results-surface load timeout.
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    /// Post-scroll settlement timeout.
    #[must_use]
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    /// Run deadline, if any.
    #[must_use]
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }

    /// Validate value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_results == 0 {
            return Err(invalid("pipeline.max_results", "must be at least 1"));
        }

        if self.stall_threshold == 0 {
            return Err(invalid("pipeline.stall_threshold", "must be at least 1"));
        }

        if self.concurrent_sessions == 0 {
            return Err(invalid("pipeline.concurrent_sessions", "must be at least 1"));
        }

        if !self.min_rating.is_finite() || !(0.0..=5.0).contains(&self.min_rating) {
            return Err(invalid(
                "pipeline.min_rating",
                &format!("must be within 0.0..=5.0, got {}", self.min_rating),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Browser session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// User agent string sent by the session
    pub user_agent: String,
    /// Explicit Chrome/Chromium binary; auto-detected when unset
    pub chrome_executable: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            chrome_executable: None,
        }
    }
}

/// Description of the search surface: where to go and what to look for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Search URL with a `{query}` placeholder
    pub search_url_template: String,
    /// Detail-view names meaning "no place panel opened" (compared case-insensitively)
    pub placeholder_names: Vec<String>,
    /// CSS selectors per region and field
    pub selectors: SelectorSet,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            search_url_template: "https://www.google.com/maps/search/{query}".to_string(),
            placeholder_names: vec!["Results".to_string(), "Sponsored".to_string()],
            selectors: SelectorSet::default(),
        }
    }
}

impl SiteConfig {
    /// Validate the template and selector lists.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.search_url_template.contains("{query}") {
            return Err(invalid(
                "site.search_url_template",
                "must contain a {query} placeholder",
            ));
        }

        for descriptor in [
            SelectorDescriptor::ResultsFeed,
            SelectorDescriptor::ResultEntry,
            SelectorDescriptor::DetailPanel,
        ] {
            if self.selectors.region(descriptor).is_empty() {
                return Err(invalid(
                    &format!("site.selectors.{descriptor}"),
                    "needs at least one selector",
                ));
            }
        }

        for field in FieldDescriptor::ALL {
            if self.selectors.field(field).selectors.is_empty() {
                return Err(invalid(
                    &format!("site.selectors.{field}"),
                    "needs at least one selector",
                ));
            }
        }

        Ok(())
    }
}

/// Ordered fallback selectors for every region and field.
///
/// Selectors are tried in order; the first one that matches wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorSet {
    /// Scrollable results container
    pub results_feed: Vec<String>,
    /// One clickable result entry
    pub result_entry: Vec<String>,
    /// Detail view container
    pub detail_panel: Vec<String>,
    /// Place name
    pub name: FieldSelector,
    /// Postal address
    pub address: FieldSelector,
    /// Phone number
    pub phone: FieldSelector,
    /// Website link
    pub website: FieldSelector,
    /// Category
    pub category: FieldSelector,
    /// Rating text
    pub rating: FieldSelector,
    /// Review count text
    pub review_count: FieldSelector,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            results_feed: strings(&[
                r#"div[role="feed"]"#,
                r#"div[role="list"]"#,
                "div.m6QErb",
            ]),
            result_entry: strings(&["a.hfpxzc"]),
            // the bare results pane is also a `main` region; only a pane holding the
            // place heading is the detail view
            detail_panel: strings(&[r#"div[role="main"]:has(h1.DUwDvf)"#]),
            name: FieldSelector::text(&["h1.DUwDvf", "h1"]),
            address: FieldSelector::attribute(&[r#"button[data-item-id="address"]"#], "aria-label"),
            phone: FieldSelector::attribute(
                &[r#"button[data-item-id^="phone:tel:"]"#],
                "aria-label",
            ),
            website: FieldSelector::attribute(&[r#"a[data-item-id="authority"]"#], "href"),
            category: FieldSelector::text(&["button.DkEaL"]),
            rating: FieldSelector::text(&["div.F7k0ve", r#"div.F7nice span[aria-hidden="true"]"#]),
            review_count: FieldSelector::text(&[
                "span.fontBodyMedium > span > span",
                r#"div.F7nice span[aria-label$="reviews"]"#,
            ]),
        }
    }
}

impl SelectorSet {
    /// Selectors for a page region.
    #[must_use]
    pub fn region(&self, descriptor: SelectorDescriptor) -> &[String] {
        match descriptor {
            SelectorDescriptor::ResultsFeed => &self.results_feed,
            SelectorDescriptor::ResultEntry => &self.result_entry,
            SelectorDescriptor::DetailPanel => &self.detail_panel,
        }
    }

    /// Selector definition for a field.
    #[must_use]
    pub fn field(&self, field: FieldDescriptor) -> &FieldSelector {
        match field {
            FieldDescriptor::Name => &self.name,
            FieldDescriptor::Address => &self.address,
            FieldDescriptor::Phone => &self.phone,
            FieldDescriptor::Website => &self.website,
            FieldDescriptor::Category => &self.category,
            FieldDescriptor::Rating => &self.rating,
            FieldDescriptor::ReviewCount => &self.review_count,
        }
    }
}

/// How to locate one field inside the detail view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelector {
    /// Fallback CSS selectors, tried in order
    pub selectors: Vec<String>,
    /// Read this attribute instead of the element's text
    pub attribute: Option<String>,
}

impl FieldSelector {
    fn text(selectors: &[&str]) -> Self {
        Self {
            selectors: strings(selectors),
            attribute: None,
        }
    }

    fn attribute(selectors: &[&str], attribute: &str) -> Self {
        Self {
            selectors: strings(selectors),
            attribute: Some(attribute.to_string()),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_string()).collect()
}

/// Export file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Excel workbook with a header row
    Xlsx,
    /// Pretty-printed JSON array
    Json,
    /// CSV with a header row
    Csv,
    /// Excel workbook and JSON array
    Both,
}

impl OutputFormat {
    /// File extensions written for this format, in write order.
    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Xlsx => &["xlsx"],
            Self::Json => &["json"],
            Self::Csv => &["csv"],
            Self::Both => &["xlsx", "json"],
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "both" => Ok(Self::Both),
            other => Err(format!(
                "unknown format '{other}' (expected xlsx, json, csv or both)"
            )),
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives export files
    pub directory: PathBuf,
    /// File format(s) to write
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("outputs"),
            format: OutputFormat::Xlsx,
        }
    }
}
