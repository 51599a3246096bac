//! Command-line arguments.

use clap::Parser;
use placescout_core::{AppConfig, OutputFormat, SortKey};
use std::path::PathBuf;

/// Extract business listings from a map-search results page.
#[derive(Debug, Parser)]
#[command(name = "placescout", version, about)]
pub struct Args {
    /// What to search for (e.g. "pizza restaurants")
    #[arg(short, long)]
    pub search: String,

    /// Location to search in; repeat to run one session per location
    #[arg(short, long = "location", value_name = "LOCATION")]
    pub locations: Vec<String>,

    /// Stop after this many candidates per location
    #[arg(short = 'n', long)]
    pub max_results: Option<usize>,

    /// Drop places rated below this (0 keeps everything)
    #[arg(long)]
    pub min_rating: Option<f64>,

    /// Order results by rating, reviews or name
    #[arg(long, value_name = "KEY")]
    pub sort_by: Option<SortKey>,

    /// Export format: xlsx, json, csv or both (xlsx and json)
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Directory that receives export files
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Configuration file (defaults to the per-user config.toml)
    #[arg(short, long, value_name = "FILE", env = "PLACESCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long, overrides_with = "no_headless")]
    pub headless: bool,

    /// Show the browser window
    #[arg(long, overrides_with = "headless")]
    pub no_headless: bool,

    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Headless override, if one was given on the command line.
    #[must_use]
    pub fn headless_override(&self) -> Option<bool> {
        match (self.headless, self.no_headless) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(max_results) = self.max_results {
            config.pipeline.max_results = max_results;
        }
        if let Some(min_rating) = self.min_rating {
            config.pipeline.min_rating = min_rating;
        }
        if self.sort_by.is_some() {
            config.pipeline.sort_key = self.sort_by;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(directory) = &self.output {
            config.output.directory.clone_from(directory);
        }
        if let Some(headless) = self.headless_override() {
            config.browser.headless = headless;
        }
    }
}
