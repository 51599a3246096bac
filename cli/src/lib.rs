//! PlaceScout command-line shell.
//!
//! Parses arguments, loads configuration, drives the extraction pipeline and
//! writes the results. Extraction logic lives in the `crates/` directory.

pub mod args;
pub mod export;

pub use args::Args;

use anyhow::{Context, Result};
use placescout_browser::ChromiumLauncher;
use placescout_core::{AppConfig, Place};
use placescout_scanner::{PipelineOrchestrator, PipelineOutput};
use tracing::info;

/// Places printed to the console after a run.
const PREVIEW_LEN: usize = 5;

/// Initialize tracing subscriber for logging.
///
/// `RUST_LOG` is honoured unless `verbose` forces debug output.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,placescout=debug"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Load configuration from `--config` or the per-user file, then apply
/// environment and command-line overrides.
pub fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env_overrides();
            config
        }
        None => AppConfig::load_with_env().context("Failed to load config")?,
    };

    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Run one extraction and export its results.
pub async fn run(args: Args) -> Result<()> {
    info!("Starting PlaceScout v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;
    print_banner(&args, &config);

    let launcher = ChromiumLauncher::new(config.browser.clone(), config.site.selectors.clone());
    let orchestrator = PipelineOrchestrator::new(launcher, config.site.clone());

    let outcome = match args.locations.as_slice() {
        [] => {
            orchestrator
                .run_pipeline(&args.search, None, &config.pipeline)
                .await
        }
        [location] => {
            orchestrator
                .run_pipeline(&args.search, Some(location.as_str()), &config.pipeline)
                .await
        }
        locations => {
            orchestrator
                .run_many(&args.search, locations, &config.pipeline)
                .await
        }
    };

    if let Err(e) = orchestrator.launcher().shutdown().await {
        tracing::warn!("Failed to shut down browser: {}", e);
    }

    let PipelineOutput { places, summary } = outcome.context("Pipeline run failed")?;

    let stem = export::output_stem(&args.search, &args.locations, &chrono::Local::now());
    let written = export::export(&places, &config.output, &stem)?;

    println!("\n{summary}\n");
    for path in &written {
        println!("Saved {}", path.display());
    }
    print_preview(&places);

    Ok(())
}

fn print_banner(args: &Args, config: &AppConfig) {
    let rule = "=".repeat(60);
    println!("{rule}");
    println!("PlaceScout v{}", env!("CARGO_PKG_VERSION"));
    println!("{rule}");
    println!("Search query: {}", args.search);
    for location in &args.locations {
        println!("Location:     {location}");
    }
    println!("Max results:  {}", config.pipeline.max_results);
    if config.pipeline.min_rating > 0.0 {
        println!("Min rating:   {}", config.pipeline.min_rating);
    }
    if let Some(key) = config.pipeline.sort_key {
        println!("Sorted by:    {key}");
    }
    println!("{rule}");
}

fn print_preview(places: &[Place]) {
    if places.is_empty() {
        println!("\nNo places found. Try a different search query or location.");
        return;
    }

    for (index, place) in places.iter().take(PREVIEW_LEN).enumerate() {
        println!("\n{}. {}", index + 1, place.name());
        if let Some(address) = place.address() {
            println!("   Address: {address}");
        }
        if let Some(phone) = place.phone() {
            println!("   Phone:   {phone}");
        }
        if let Some(rating) = place.rating() {
            println!("   Rating:  {rating} ({} reviews)", place.review_count());
        }
    }

    if places.len() > PREVIEW_LEN {
        println!("\n... and {} more places", places.len() - PREVIEW_LEN);
    }
}
