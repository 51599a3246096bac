//! Shared types used across PlaceScout.
//!
//! This module defines the `Place` record, its validated value types, and the
//! descriptor enums that name page regions and fields without tying callers to
//! any selector syntax.

use crate::error::ScoutError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A star rating in the closed range `[0.0, 5.0]`.
///
/// Absence of a rating is modelled as `Option<Rating>::None` ("unknown"), which
/// keeps an unknown rating distinct from a real `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rating(f64);

impl Rating {
    /// Highest rating a listing can carry.
    pub const MAX: f64 = 5.0;

    /// Create a rating, returning `None` when the value is not a finite number
    /// within `[0.0, 5.0]`.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=Self::MAX).contains(&value) {
            // abs() folds -0.0 into 0.0 so Eq and Ord agree
            Some(Self(value.abs()))
        } else {
            None
        }
    }

    /// Get the numeric value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Eq for Rating {}

impl PartialOrd for Rating {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rating {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl TryFrom<f64> for Rating {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("rating must be within 0.0..=5.0, got {value}"))
    }
}

impl From<Rating> for f64 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Normalized name+address composite used to detect duplicate places.
///
/// Both parts are case-folded, stripped of punctuation and whitespace-collapsed.
/// The key is a pure function of its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Derive the key for a name and optional address.
    #[must_use]
    pub fn derive(name: &str, address: Option<&str>) -> Self {
        let name = fold(name);
        let address = address.map(fold).unwrap_or_default();
        // '|' is stripped by fold(), so the separator cannot be forged
        Self(format!("{name}|{address}"))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Case-fold, drop punctuation and collapse whitespace.
fn fold(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The optional attributes of a [`Place`].
///
/// `None` always means "not available from the source".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceDetails {
    /// Single-line postal address
    pub address: Option<String>,
    /// Phone number as displayed, whitespace-normalized
    pub phone: Option<String>,
    /// Website URL
    pub website: Option<String>,
    /// Business category (e.g. "Pizza restaurant")
    pub category: Option<String>,
    /// Star rating
    pub rating: Option<Rating>,
    /// Number of reviews
    pub review_count: Option<u64>,
}

/// One extracted business listing.
///
/// A `Place` never changes after construction. Merging two records builds a
/// new value; the builder-style `with_*` methods consume `self` and exist for
/// assembling a record before it is handed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PlaceRecord")]
pub struct Place {
    name: String,
    address: Option<String>,
    phone: Option<String>,
    website: Option<String>,
    category: Option<String>,
    rating: Option<Rating>,
    review_count: Option<u64>,
    extracted_at: Timestamp,
}

impl Place {
    /// Create a place from a name, its details and the extraction time.
    ///
    /// # Errors
    /// Returns error if the name is empty or whitespace-only.
    pub fn new(
        name: impl Into<String>,
        details: PlaceDetails,
        extracted_at: Timestamp,
    ) -> Result<Self, ScoutError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ScoutError::Validation(
                "place name cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            name,
            address: details.address,
            phone: details.phone,
            website: details.website,
            category: details.category,
            rating: details.rating,
            review_count: details.review_count,
            extracted_at,
        })
    }

    /// Create a place with only a name, stamped with the current time.
    ///
    /// # Errors
    /// Returns error if the name is empty or whitespace-only.
    pub fn named(name: impl Into<String>) -> Result<Self, ScoutError> {
        Self::new(name, PlaceDetails::default(), Timestamp::now())
    }

    /// Set the address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Set the phone number.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Set the website.
    #[must_use]
    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    /// Set the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the rating. Values outside `[0.0, 5.0]` leave the rating unknown.
    #[must_use]
    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Rating::new(rating);
        self
    }

    /// Set the review count.
    #[must_use]
    pub fn with_review_count(mut self, count: u64) -> Self {
        self.review_count = Some(count);
        self
    }

    /// Replace every optional attribute at once.
    #[must_use]
    pub fn with_details(mut self, details: PlaceDetails) -> Self {
        self.address = details.address;
        self.phone = details.phone;
        self.website = details.website;
        self.category = details.category;
        self.rating = details.rating;
        self.review_count = details.review_count;
        self
    }

    /// Set the extraction timestamp.
    #[must_use]
    pub fn with_extracted_at(mut self, extracted_at: Timestamp) -> Self {
        self.extracted_at = extracted_at;
        self
    }

    /// Display name (never empty).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Postal address, if known.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Phone number, if known.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// Website URL, if known.
    #[must_use]
    pub fn website(&self) -> Option<&str> {
        self.website.as_deref()
    }

    /// Category, if known.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Rating, `None` when unknown.
    #[must_use]
    pub fn rating(&self) -> Option<Rating> {
        self.rating
    }

    /// Rating used for threshold checks: unknown counts as `0.0`.
    #[must_use]
    pub fn rating_or_zero(&self) -> f64 {
        self.rating.map_or(0.0, Rating::value)
    }

    /// Review count, defaulting to 0 when the source did not show one.
    #[must_use]
    pub fn review_count(&self) -> u64 {
        self.review_count.unwrap_or(0)
    }

    /// Review count as extracted, `None` when the source did not show one.
    #[must_use]
    pub fn known_review_count(&self) -> Option<u64> {
        self.review_count
    }

    /// When the record was extracted.
    #[must_use]
    pub fn extracted_at(&self) -> Timestamp {
        self.extracted_at
    }

    /// A copy of the optional attributes.
    #[must_use]
    pub fn details(&self) -> PlaceDetails {
        PlaceDetails {
            address: self.address.clone(),
            phone: self.phone.clone(),
            website: self.website.clone(),
            category: self.category.clone(),
            rating: self.rating,
            review_count: self.review_count,
        }
    }

    /// Number of populated fields, counting the mandatory name.
    #[must_use]
    pub fn present_field_count(&self) -> usize {
        1 + usize::from(self.address.is_some())
            + usize::from(self.phone.is_some())
            + usize::from(self.website.is_some())
            + usize::from(self.category.is_some())
            + usize::from(self.rating.is_some())
            + usize::from(self.review_count.is_some())
    }

    /// Key used to detect duplicate listings of the same real-world place.
    #[must_use]
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::derive(&self.name, self.address.as_deref())
    }
}

/// Unchecked wire form of a [`Place`].
#[derive(Deserialize)]
struct PlaceRecord {
    name: String,
    address: Option<String>,
    phone: Option<String>,
    website: Option<String>,
    category: Option<String>,
    rating: Option<Rating>,
    review_count: Option<u64>,
    extracted_at: Timestamp,
}

impl TryFrom<PlaceRecord> for Place {
    type Error = ScoutError;

    fn try_from(record: PlaceRecord) -> Result<Self, Self::Error> {
        let details = PlaceDetails {
            address: record.address,
            phone: record.phone,
            website: record.website,
            category: record.category,
            rating: record.rating,
            review_count: record.review_count,
        };
        Self::new(record.name, details, record.extracted_at)
    }
}

/// Ordering applied to the final result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Highest rating first, ties by name
    Rating,
    /// Most reviews first, ties by name
    Reviews,
    /// Alphabetical, case-insensitive
    Name,
}

impl SortKey {
    /// Get the configuration/CLI spelling of this key.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::Reviews => "reviews",
            Self::Name => "name",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rating" => Ok(Self::Rating),
            "reviews" => Ok(Self::Reviews),
            "name" => Ok(Self::Name),
            other => Err(format!(
                "unknown sort key '{other}' (expected rating, reviews or name)"
            )),
        }
    }
}

/// Fields that can be read from a rendered detail view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDescriptor {
    /// Place name (mandatory)
    Name,
    /// Postal address
    Address,
    /// Phone number
    Phone,
    /// Website link
    Website,
    /// Business category
    Category,
    /// Star rating text
    Rating,
    /// Review count text
    ReviewCount,
}

impl FieldDescriptor {
    /// Every field, in extraction order.
    pub const ALL: [Self; 7] = [
        Self::Name,
        Self::Address,
        Self::Phone,
        Self::Website,
        Self::Category,
        Self::Rating,
        Self::ReviewCount,
    ];

    /// Get the snake_case name used in configuration.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Address => "address",
            Self::Phone => "phone",
            Self::Website => "website",
            Self::Category => "category",
            Self::Rating => "rating",
            Self::ReviewCount => "review_count",
        }
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page regions the pipeline waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorDescriptor {
    /// Scrollable container holding the result entries
    ResultsFeed,
    /// One entry inside the results feed
    ResultEntry,
    /// Detail view shown after opening an entry
    DetailPanel,
}

impl SelectorDescriptor {
    /// Get the snake_case name used in configuration.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResultsFeed => "results_feed",
            Self::ResultEntry => "result_entry",
            Self::DetailPanel => "detail_panel",
        }
    }
}

impl fmt::Display for SelectorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Parse a timestamp from an RFC3339 string.
    pub fn from_rfc3339(s: &str) -> Result<Self, ScoutError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| ScoutError::Validation(format!("invalid timestamp: {e}")))
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0.0).is_some());
        assert!(Rating::new(5.0).is_some());
        assert!(Rating::new(4.2).is_some());
        assert!(Rating::new(5.1).is_none());
        assert!(Rating::new(-0.5).is_none());
        assert!(Rating::new(f64::NAN).is_none());
        assert_eq!(Rating::new(-0.0), Rating::new(0.0));
    }

    #[test]
    fn test_rating_ordering() {
        let low = Rating::new(3.5).expect("valid rating");
        let high = Rating::new(4.8).expect("valid rating");
        assert!(high > low);
        assert_eq!(high.to_string(), "4.8");
    }

    #[test]
    fn test_rating_serde_rejects_out_of_range() {
        let ok: Rating = serde_json::from_str("4.5").expect("deserialize rating");
        assert!((ok.value() - 4.5).abs() < f64::EPSILON);
        assert!(serde_json::from_str::<Rating>("7.0").is_err());
    }

    #[test]
    fn test_identity_key_normalizes() {
        let a = IdentityKey::derive("Cafe Roma", Some("12 Elm St"));
        let b = IdentityKey::derive("cafe roma", Some("12  Elm St."));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "cafe roma|12 elm st");
    }

    #[test]
    fn test_identity_key_distinguishes_missing_address() {
        let with = IdentityKey::derive("Cafe Roma", Some("12 Elm St"));
        let without = IdentityKey::derive("Cafe Roma", None);
        assert_ne!(with, without);
    }

    #[test]
    fn test_identity_key_separator_cannot_be_forged() {
        let a = IdentityKey::derive("a|b", None);
        let b = IdentityKey::derive("a", Some("b"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_place_rejects_blank_name() {
        assert!(Place::named("   ").is_err());
        assert!(Place::named("").is_err());
        assert!(Place::named("Balthazar").is_ok());
    }

    #[test]
    fn test_place_review_count_defaults_to_zero() {
        let place = Place::named("Shake Shack").expect("valid place");
        assert_eq!(place.review_count(), 0);
        assert_eq!(place.known_review_count(), None);
        assert_eq!(place.rating(), None);
        assert!(place.rating_or_zero().abs() < f64::EPSILON);
    }

    #[test]
    fn test_place_present_field_count() {
        let place = Place::named("Joe's Pizza")
            .expect("valid place")
            .with_address("124 Fulton St, New York, NY 10038")
            .with_rating(4.5)
            .with_review_count(1250);
        assert_eq!(place.present_field_count(), 4);
    }

    #[test]
    fn test_place_out_of_range_rating_is_unknown() {
        let place = Place::named("Balthazar")
            .expect("valid place")
            .with_rating(9.0);
        assert_eq!(place.rating(), None);
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("rating".parse::<SortKey>(), Ok(SortKey::Rating));
        assert_eq!(" Reviews ".parse::<SortKey>(), Ok(SortKey::Reviews));
        assert_eq!("name".parse::<SortKey>(), Ok(SortKey::Name));
        assert!("distance".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_descriptor_serialization() {
        let json = serde_json::to_string(&FieldDescriptor::ReviewCount).expect("serialize field");
        assert_eq!(json, "\"review_count\"");
        assert_eq!(FieldDescriptor::ReviewCount.as_str(), "review_count");

        let json =
            serde_json::to_string(&SelectorDescriptor::DetailPanel).expect("serialize selector");
        assert_eq!(json, "\"detail_panel\"");
    }

    #[test]
    fn test_place_json_keeps_unknown_rating_distinct() {
        let place = Place::named("Gramercy Tavern").expect("valid place");
        let json = serde_json::to_value(&place).expect("serialize place");
        assert!(json["rating"].is_null());

        let rated = place.with_rating(0.0);
        let json = serde_json::to_value(&rated).expect("serialize place");
        assert_eq!(json["rating"], serde_json::json!(0.0));
    }

    #[test]
    fn test_place_deserialization_rejects_blank_name() {
        let place = Place::named("Gramercy Tavern")
            .expect("valid place")
            .with_phone("(212) 477-0777");
        let mut json = serde_json::to_value(&place).expect("serialize place");

        let parsed: Place = serde_json::from_value(json.clone()).expect("deserialize place");
        assert_eq!(parsed, place);

        json["name"] = serde_json::json!("   ");
        let err = serde_json::from_value::<Place>(json).unwrap_err();
        assert!(err.to_string().contains("place name cannot be empty"));
    }

    #[test]
    fn test_timestamp_rfc3339() {
        let ts = Timestamp::now();
        let s = ts.to_rfc3339();
        let parsed = Timestamp::from_rfc3339(&s).expect("parse RFC3339 timestamp");
        assert_eq!(ts, parsed);
    }
}
