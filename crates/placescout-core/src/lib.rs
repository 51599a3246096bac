//! PlaceScout Core - Foundation crate for the PlaceScout listing extractor.
//!
//! This crate provides the domain model, error handling and configuration
//! management that the browser and scanner crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - `Place`, `Rating`, `IdentityKey`, `SortKey` and the descriptor enums
//!
//! # Example
//!
//! ```rust
//! use placescout_core::{AppConfig, Place};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.pipeline.max_retries, 2);
//!
//! let place = Place::named("Cafe Roma")?
//!     .with_address("12 Elm St")
//!     .with_rating(4.2);
//! assert_eq!(place.identity_key().as_str(), "cafe roma|12 elm st");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, FieldSelector, OutputConfig, OutputFormat, PipelineConfig,
    SelectorSet, SiteConfig,
};
pub use error::{ConfigError, ConfigResult, Result, ScoutError};
pub use types::{
    FieldDescriptor, IdentityKey, Place, PlaceDetails, Rating, SelectorDescriptor, SortKey,
    Timestamp,
};
