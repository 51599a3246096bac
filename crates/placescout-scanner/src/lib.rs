//! PlaceScout Scanner - listing extraction pipeline.
//!
//! This crate turns a rendered map-search results page into a clean,
//! deduplicated, filterable and sortable set of [`Place`](placescout_core::Place)
//! records. It talks to the page only through
//! [`PageDriver`](placescout_browser::PageDriver).
//!
//! # Pipeline
//!
//! - [`ListingWalker`] scrolls the results feed and yields entry handles
//! - [`DetailExtractor`] opens each entry and reads its fields, retrying transient failures
//! - [`dedup`] merges records describing the same place
//! - [`filter`] and [`sort`] apply the rating threshold and final ordering
//! - [`RateGate`] paces every yield and retry
//!
//! [`PipelineOrchestrator`] sequences these stages and returns the records
//! together with a [`RunSummary`].
//!
//! # Example
//!
//! ```rust,ignore
//! use placescout_browser::ChromiumLauncher;
//! use placescout_core::AppConfig;
//! use placescout_scanner::PipelineOrchestrator;
//!
//! let config = AppConfig::load_with_env()?;
//! let launcher = ChromiumLauncher::new(config.browser.clone(), config.site.selectors.clone());
//! let orchestrator = PipelineOrchestrator::new(launcher, config.site.clone());
//!
//! let output = orchestrator
//!     .run_pipeline("pizza", Some("New York"), &config.pipeline)
//!     .await?;
//! println!("{}", output.summary);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod dedup;
#[allow(missing_docs)]
pub mod error;
pub mod extractor;
pub mod filter;
pub mod normalize;
pub mod orchestrator;
pub mod rate_gate;
pub mod summary;
#[allow(missing_docs)]
pub mod url_builder;
pub mod walker;

// Re-export commonly used types
pub use dedup::{dedup, merge};
pub use error::{ExtractionError, PipelineError, Result};
pub use extractor::{DetailExtractor, Extraction};
pub use filter::{filter, sort};
pub use orchestrator::{PipelineOrchestrator, PipelineOutput};
pub use rate_gate::RateGate;
pub use summary::{PartialReason, RunSummary};
pub use url_builder::build_search_url;
pub use walker::ListingWalker;
