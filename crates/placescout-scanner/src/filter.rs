//! Rating threshold and ordering.

use placescout_core::{Place, SortKey};
use std::cmp::Ordering;

/// Keep records whose known rating is at least `min_rating`.
///
/// A threshold of zero or below keeps everything, including unknown ratings.
/// Above zero an unknown rating never passes.
#[must_use]
pub fn filter(records: Vec<Place>, min_rating: f64) -> Vec<Place> {
    if min_rating <= 0.0 {
        return records;
    }

    records
        .into_iter()
        .filter(|place| {
            place
                .rating()
                .is_some_and(|rating| rating.value() >= min_rating)
        })
        .collect()
}

/// Return a new, stably sorted sequence.
///
/// `Rating` and `Reviews` sort descending with ties broken by name; `Name`
/// sorts ascending, ignoring case. Unknown ratings sort after every known one.
#[must_use]
pub fn sort(records: &[Place], key: SortKey) -> Vec<Place> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| compare(a, b, key));
    sorted
}

fn compare(a: &Place, b: &Place, key: SortKey) -> Ordering {
    match key {
        SortKey::Rating => b.rating().cmp(&a.rating()).then_with(|| by_name(a, b)),
        SortKey::Reviews => b
            .review_count()
            .cmp(&a.review_count())
            .then_with(|| by_name(a, b)),
        SortKey::Name => by_name(a, b),
    }
}

fn by_name(a: &Place, b: &Place) -> Ordering {
    a.name().to_lowercase().cmp(&b.name().to_lowercase())
}
