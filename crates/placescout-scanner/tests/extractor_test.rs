mod common;

use common::{test_config, Failure, Listing, ScriptedDriver, ScriptedPlace, Stats};
use placescout_browser::{EntryHandle, PageDriver};
use placescout_core::{FieldDescriptor, Rating, SiteConfig};
use placescout_scanner::{DetailExtractor, ExtractionError, RateGate};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

async fn driver_with(place: &ScriptedPlace) -> ScriptedDriver {
    let mut driver = ScriptedDriver::new(Listing::new().batch(vec![place.clone()]));
    driver.navigate("https://maps.example.com/search/coffee").await.unwrap();
    driver
}

async fn first_entry(driver: &mut ScriptedDriver) -> EntryHandle {
    let feed = driver
        .wait_for(placescout_core::SelectorDescriptor::ResultsFeed, Duration::from_secs(1))
        .await
        .unwrap();
    driver.list_entries(&feed).await.unwrap().remove(0)
}

fn extractor(gate: &Arc<RateGate>) -> DetailExtractor {
    DetailExtractor::new(Arc::clone(gate), &test_config(), &SiteConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_render_timeout_retried_max_retries_times() {
    let place = ScriptedPlace::new("Slow Diner").failing(Failure::Timeout, 10);
    let mut driver = driver_with(&place).await;
    let entry = first_entry(&mut driver).await;
    let gate = Arc::new(RateGate::new(Duration::from_millis(100)));
    let mut extractor = extractor(&gate);
    let start = Instant::now();

    let result = extractor.extract(&mut driver, &entry).await;

    assert!(matches!(result, Err(ExtractionError::Timeout { attempts: 3 })));
    // one initial attempt plus max_retries
    assert_eq!(Stats::get(&driver.stats().detail_attempts), 3);
    assert_eq!(extractor.retries(), 2);
    // each retry waited on the gate
    assert_eq!(gate.acquisitions(), 2);
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_then_success() {
    let place = ScriptedPlace::new("Flaky Bistro")
        .field(FieldDescriptor::Rating, "4.6")
        .failing(Failure::Stale, 1);
    let mut driver = driver_with(&place).await;
    let entry = first_entry(&mut driver).await;
    let gate = Arc::new(RateGate::new(Duration::from_millis(100)));
    let mut extractor = extractor(&gate);

    let extraction = extractor.extract(&mut driver, &entry).await.unwrap();

    assert_eq!(extraction.place.name(), "Flaky Bistro");
    assert_eq!(extraction.place.rating(), Rating::new(4.6));
    assert_eq!(extraction.attempts, 2);
    assert_eq!(extractor.retries(), 1);
    assert_eq!(gate.acquisitions(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_name_is_not_retried() {
    let place = ScriptedPlace::new("Ghost")
        .without_name()
        .field(FieldDescriptor::Address, "1 Nowhere Rd");
    let mut driver = driver_with(&place).await;
    let entry = first_entry(&mut driver).await;
    let gate = Arc::new(RateGate::new(Duration::from_millis(100)));
    let mut extractor = extractor(&gate);

    let result = extractor.extract(&mut driver, &entry).await;

    assert!(matches!(result, Err(ExtractionError::NameNotFound { found: None })));
    assert_eq!(Stats::get(&driver.stats().detail_attempts), 1);
    assert_eq!(gate.acquisitions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_placeholder_name_is_skipped() {
    let place = ScriptedPlace::new("Results");
    let mut driver = driver_with(&place).await;
    let entry = first_entry(&mut driver).await;
    let gate = Arc::new(RateGate::new(Duration::from_millis(100)));

    let result = extractor(&gate).extract(&mut driver, &entry).await;

    match result {
        Err(ExtractionError::NameNotFound { found }) => assert_eq!(found.as_deref(), Some("Results")),
        other => panic!("expected NameNotFound, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_panel_showing_other_place_is_stale() {
    let place = ScriptedPlace::new("Cafe Roma").labeled(Some("Trattoria Verde"));
    let mut driver = driver_with(&place).await;
    let entry = first_entry(&mut driver).await;
    let gate = Arc::new(RateGate::new(Duration::from_millis(100)));
    let mut extractor = extractor(&gate);

    let result = extractor.extract(&mut driver, &entry).await;

    assert!(matches!(result, Err(ExtractionError::StaleHandle { attempts: 3 })));
    assert_eq!(extractor.retries(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fields_are_normalized() {
    let place = ScriptedPlace::new("Joe's Pizza")
        .field(FieldDescriptor::Address, "Address: 7 Carmine St\nNew York, NY 10014")
        .field(FieldDescriptor::Phone, "Phone: (212) 366-1182 ")
        .field(
            FieldDescriptor::Website,
            "https://www.google.com/url?q=https://joespizzanyc.example/&sa=U",
        )
        .field(FieldDescriptor::Category, "  Pizza   restaurant ")
        .field(FieldDescriptor::Rating, "4,5")
        .field(FieldDescriptor::ReviewCount, "(12,345)");
    let mut driver = driver_with(&place).await;
    let entry = first_entry(&mut driver).await;
    let gate = Arc::new(RateGate::new(Duration::from_millis(100)));

    let extraction = extractor(&gate).extract(&mut driver, &entry).await.unwrap();
    let place = extraction.place;

    assert_eq!(place.address(), Some("7 Carmine St, New York, NY 10014"));
    assert_eq!(place.phone(), Some("(212) 366-1182"));
    assert_eq!(place.website(), Some("https://joespizzanyc.example/"));
    assert_eq!(place.category(), Some("Pizza restaurant"));
    assert_eq!(place.rating(), Rating::new(4.5));
    assert_eq!(place.review_count(), 12_345);
    assert_eq!(extraction.unparsed_fields, 0);
}

#[tokio::test(start_paused = true)]
async fn test_unparsable_numbers_become_unknown() {
    let place = ScriptedPlace::new("New Spot")
        .field(FieldDescriptor::Rating, "No rating yet")
        .field(FieldDescriptor::ReviewCount, "No reviews");
    let mut driver = driver_with(&place).await;
    let entry = first_entry(&mut driver).await;
    let gate = Arc::new(RateGate::new(Duration::from_millis(100)));

    let extraction = extractor(&gate).extract(&mut driver, &entry).await.unwrap();

    assert_eq!(extraction.place.rating(), None);
    assert_eq!(extraction.place.known_review_count(), None);
    assert_eq!(extraction.place.review_count(), 0);
    assert_eq!(extraction.unparsed_fields, 2);
}

#[tokio::test(start_paused = true)]
async fn test_missing_optional_fields_are_not_errors() {
    let place = ScriptedPlace::new("Bare Minimum");
    let mut driver = driver_with(&place).await;
    let entry = first_entry(&mut driver).await;
    let gate = Arc::new(RateGate::new(Duration::from_millis(100)));

    let extraction = extractor(&gate).extract(&mut driver, &entry).await.unwrap();

    assert_eq!(extraction.place.present_field_count(), 1);
    assert_eq!(extraction.unparsed_fields, 0);
}
