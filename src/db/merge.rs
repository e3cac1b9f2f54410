//! Pure merge decision logic: one retrieved row plus one candidate in, a
//! small plan out. No I/O here — the store applies the plan inside a single
//! transaction, which keeps the merge rules unit-testable in isolation.

use chrono::{DateTime, Utc};

use crate::types::{Listing, Observation};

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The row to write back (insert or full replace).
    pub listing: Listing,
    pub is_new: bool,
    /// True only when an existing row's price actually moved — a first price
    /// on a brand-new row is recorded but not counted as a change.
    pub price_changed: bool,
    /// When set, append one price-history record at this price.
    pub record_price: Option<f64>,
}

/// Merge rule for feed (and detail-created) observations:
/// - absent token: new row, `first_price = current_price = price`, one price
///   record if the price is non-null;
/// - known token: bump `last_seen_at`, overwrite `page_type`, replace
///   `category_fields`, shallow-union `raw_data` (incoming keys win), and
///   register a price change only when the incoming price is non-null and
///   differs from the stored one. A null incoming price never mutates any
///   price field. Note that a row first seen without a price treats the first
///   non-null price as a change.
///
/// `category` and `ad_type` are never re-validated against the stored row;
/// a mismatched observation leaves them untouched.
pub fn merge_observation(
    existing: Option<Listing>,
    obs: &Observation,
    now: DateTime<Utc>,
) -> MergeOutcome {
    let Some(mut listing) = existing else {
        let listing = Listing {
            token: obs.token.clone(),
            category: obs.category,
            subcategory: obs.subcategory.clone(),
            ad_type: obs.ad_type,
            page_type: obs.page_type,
            current_price: obs.price,
            first_price: obs.price,
            price_change_count: 0,
            first_seen_at: now,
            last_seen_at: now,
            title: obs.title.clone(),
            address: obs.address.clone(),
            image_url: obs.image_url.clone(),
            category_fields: obs.category_fields.clone(),
            detail_fields: obs.detail_fields.clone(),
            raw_data: obs.raw_data.clone(),
        };
        return MergeOutcome {
            record_price: obs.price,
            is_new: true,
            price_changed: false,
            listing,
        };
    };

    listing.last_seen_at = now;
    listing.page_type = obs.page_type;
    listing.category_fields = obs.category_fields.clone();
    for (key, value) in &obs.raw_data {
        listing.raw_data.insert(key.clone(), value.clone());
    }

    let mut price_changed = false;
    let mut record_price = None;
    if let Some(price) = obs.price {
        if listing.current_price != Some(price) {
            listing.current_price = Some(price);
            listing.price_change_count += 1;
            price_changed = true;
            record_price = Some(price);
        }
    }

    MergeOutcome {
        listing,
        is_new: false,
        price_changed,
        record_price,
    }
}

/// Detail observations follow the same rule but additionally replace
/// `detail_fields` wholesale with the observation's value.
pub fn merge_detail(
    existing: Option<Listing>,
    obs: &Observation,
    now: DateTime<Utc>,
) -> MergeOutcome {
    let mut outcome = merge_observation(existing, obs, now);
    outcome.listing.detail_fields = obs.detail_fields.clone();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AdType, Category, PageType};
    use serde_json::{json, Map, Value};

    fn observation(token: &str, price: Option<f64>) -> Observation {
        Observation {
            token: token.to_string(),
            category: Category::Vehicles,
            subcategory: "cars".to_string(),
            ad_type: AdType::Private,
            page_type: PageType::Feed,
            price,
            title: "title".to_string(),
            address: "address".to_string(),
            image_url: String::new(),
            category_fields: json!({"manufacturer": "Toyota"}),
            detail_fields: None,
            raw_data: Map::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn absent_row_becomes_new_listing_with_first_price() {
        let obs = observation("tok1", Some(80_000.0));
        let out = merge_observation(None, &obs, now());
        assert!(out.is_new);
        assert!(!out.price_changed);
        assert_eq!(out.record_price, Some(80_000.0));
        assert_eq!(out.listing.first_price, Some(80_000.0));
        assert_eq!(out.listing.current_price, Some(80_000.0));
        assert_eq!(out.listing.price_change_count, 0);
        assert_eq!(out.listing.first_seen_at, out.listing.last_seen_at);
    }

    #[test]
    fn new_listing_without_price_records_nothing() {
        let obs = observation("tok1", None);
        let out = merge_observation(None, &obs, now());
        assert!(out.is_new);
        assert_eq!(out.record_price, None);
        assert_eq!(out.listing.first_price, None);
    }

    #[test]
    fn unchanged_price_is_a_no_op_on_price_fields() {
        let obs = observation("tok1", Some(80_000.0));
        let t0 = now();
        let existing = merge_observation(None, &obs, t0).listing;

        let out = merge_observation(Some(existing), &obs, now());
        assert!(!out.is_new);
        assert!(!out.price_changed);
        assert_eq!(out.record_price, None);
        assert_eq!(out.listing.price_change_count, 0);
        assert_eq!(out.listing.current_price, Some(80_000.0));
    }

    #[test]
    fn different_price_increments_count_and_records() {
        let first = observation("tok1", Some(80_000.0));
        let existing = merge_observation(None, &first, now()).listing;

        let second = observation("tok1", Some(75_000.0));
        let out = merge_observation(Some(existing), &second, now());
        assert!(out.price_changed);
        assert_eq!(out.record_price, Some(75_000.0));
        assert_eq!(out.listing.current_price, Some(75_000.0));
        assert_eq!(out.listing.first_price, Some(80_000.0));
        assert_eq!(out.listing.price_change_count, 1);
    }

    #[test]
    fn null_price_never_mutates_price_state() {
        let first = observation("tok1", Some(80_000.0));
        let existing = merge_observation(None, &first, now()).listing;

        let second = observation("tok1", None);
        let out = merge_observation(Some(existing), &second, now());
        assert!(!out.price_changed);
        assert_eq!(out.record_price, None);
        assert_eq!(out.listing.current_price, Some(80_000.0));
        assert_eq!(out.listing.price_change_count, 0);
    }

    #[test]
    fn first_price_after_null_creation_counts_as_change() {
        let first = observation("tok1", None);
        let existing = merge_observation(None, &first, now()).listing;

        let second = observation("tok1", Some(60_000.0));
        let out = merge_observation(Some(existing), &second, now());
        assert!(out.price_changed);
        assert_eq!(out.record_price, Some(60_000.0));
        assert_eq!(out.listing.price_change_count, 1);
        // first_price stays as it was at creation
        assert_eq!(out.listing.first_price, None);
    }

    #[test]
    fn raw_data_merges_with_incoming_keys_winning() {
        let mut first = observation("tok1", None);
        first.raw_data = json!({"a": 1, "b": 1}).as_object().unwrap().clone();
        let existing = merge_observation(None, &first, now()).listing;

        let mut second = observation("tok1", None);
        second.raw_data = json!({"b": 2, "c": 3}).as_object().unwrap().clone();
        let out = merge_observation(Some(existing), &second, now());
        assert_eq!(out.listing.raw_data.get("a"), Some(&json!(1)));
        assert_eq!(out.listing.raw_data.get("b"), Some(&json!(2)));
        assert_eq!(out.listing.raw_data.get("c"), Some(&json!(3)));
    }

    #[test]
    fn page_type_and_category_fields_follow_the_observation() {
        let first = observation("tok1", None);
        let existing = merge_observation(None, &first, now()).listing;

        let mut second = observation("tok1", None);
        second.page_type = PageType::Detail;
        second.category_fields = json!({"manufacturer": "Mazda"});
        let out = merge_observation(Some(existing), &second, now());
        assert_eq!(out.listing.page_type, PageType::Detail);
        assert_eq!(out.listing.category_fields, json!({"manufacturer": "Mazda"}));
    }

    #[test]
    fn detail_merge_replaces_detail_fields_wholesale() {
        let first = observation("tok1", Some(80_000.0));
        let existing = merge_observation(None, &first, now()).listing;

        let mut enriched = observation("tok1", Some(80_000.0));
        enriched.page_type = PageType::Detail;
        enriched.detail_fields = Some(json!({"description": "well kept"}));
        let out = merge_detail(Some(existing), &enriched, now());
        assert!(!out.is_new);
        assert!(!out.price_changed);
        assert_eq!(
            out.listing.detail_fields,
            Some(json!({"description": "well kept"}))
        );
        assert_eq!(out.listing.first_price, Some(80_000.0));
    }

    #[test]
    fn detail_merge_creates_missing_row() {
        let mut obs = observation("tok9", Some(1_500_000.0));
        obs.detail_fields = Some(json!({"description": "x"}));
        let out = merge_detail(None, &obs, now());
        assert!(out.is_new);
        assert_eq!(out.record_price, Some(1_500_000.0));
        assert_eq!(out.listing.detail_fields, Some(json!({"description": "x"})));
    }

    #[test]
    fn feed_observation_leaves_existing_detail_fields_alone() {
        let mut first = observation("tok1", None);
        first.detail_fields = Some(Value::from("enrichment"));
        let existing = merge_observation(None, &first, now()).listing;

        let second = observation("tok1", None);
        let out = merge_observation(Some(existing), &second, now());
        assert_eq!(out.listing.detail_fields, Some(Value::from("enrichment")));
    }
}
