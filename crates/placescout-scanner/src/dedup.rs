//! Duplicate collapsing.
//!
//! Records that share an [`IdentityKey`] describe the same real-world place
//! and are folded into one. Output keeps the first-occurrence order of each
//! key, so running the fold on its own output changes nothing.

use placescout_core::{IdentityKey, Place, PlaceDetails};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Collapse records with the same identity key.
#[must_use]
pub fn dedup(records: Vec<Place>) -> Vec<Place> {
    let mut positions: HashMap<IdentityKey, usize> = HashMap::with_capacity(records.len());
    let mut groups: Vec<Vec<Place>> = Vec::with_capacity(records.len());

    for record in records {
        let key = record.identity_key();
        if let Some(&position) = positions.get(&key) {
            tracing::debug!(key = %key, "Merging duplicate place");
            groups[position].push(record);
        } else {
            positions.insert(key, groups.len());
            groups.push(vec![record]);
        }
    }

    groups.into_iter().filter_map(merge_group).collect()
}

/// Merge two records describing the same place.
///
/// The record with more populated fields supplies every value it has, the
/// other one fills the gaps. On equal counts `earlier` wins.
#[must_use]
pub fn merge(earlier: &Place, later: &Place) -> Place {
    let (preferred, other) = if later.present_field_count() > earlier.present_field_count() {
        (later, earlier)
    } else {
        (earlier, later)
    };
    fill_gaps(preferred.clone(), other)
}

/// Rank a group of duplicates by populated fields (stable, so ties keep
/// input order) and take each field from the first ranked record that has it.
fn merge_group(mut group: Vec<Place>) -> Option<Place> {
    group.sort_by_key(|place| Reverse(place.present_field_count()));

    let mut ranked = group.into_iter();
    let preferred = ranked.next()?;
    Some(ranked.fold(preferred, |merged, other| fill_gaps(merged, &other)))
}

fn fill_gaps(primary: Place, fallback: &Place) -> Place {
    let have = primary.details();
    let other = fallback.details();

    primary.with_details(PlaceDetails {
        address: have.address.or(other.address),
        phone: have.phone.or(other.phone),
        website: have.website.or(other.website),
        category: have.category.or(other.category),
        rating: have.rating.or(other.rating),
        review_count: have.review_count.or(other.review_count),
    })
}
