//! Tabular export of the catalog. Output is UTF-8 with a byte-order mark
//! (spreadsheet tools need it to pick the right encoding for Hebrew text)
//! and CRLF row separators, quoted per RFC 4180.

use crate::error::{AppError, Result};
use crate::types::{Category, DetailFields, Listing, RealEstateFields, VehicleFields};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

const VEHICLE_HEADERS: &[&str] = &[
    "token", "ad_type", "manufacturer", "model", "sub_model", "year", "engine_type",
    "hand", "km", "price", "first_price", "price_changes", "address", "description",
    "image_url", "first_seen", "last_seen", "seller_name", "updated_at",
];

const REAL_ESTATE_HEADERS: &[&str] = &[
    "token", "ad_type", "property_type", "rooms", "sqm", "floor", "condition",
    "price", "first_price", "price_changes", "city", "neighborhood", "address",
    "description", "image_url", "first_seen", "last_seen", "seller_name", "updated_at",
];

/// Serializes a homogeneous-category set of listings. A mixed-category input
/// fails; an empty input yields a BOM-only file.
pub fn to_csv(listings: &[Listing]) -> Result<Vec<u8>> {
    let mut out = UTF8_BOM.to_vec();
    let Some(first) = listings.first() else {
        return Ok(out);
    };

    let category = first.category;
    if listings.iter().any(|l| l.category != category) {
        return Err(AppError::MixedCategoryExport);
    }

    let (headers, mapper): (&[&str], fn(&Listing) -> Vec<String>) = match category {
        Category::Vehicles => (VEHICLE_HEADERS, vehicle_row),
        Category::RealEstate => (REAL_ESTATE_HEADERS, real_estate_row),
    };

    let mut lines = Vec::with_capacity(listings.len() + 1);
    lines.push(headers.join(","));
    for listing in listings {
        let row: Vec<String> = mapper(listing).iter().map(|f| escape_field(f)).collect();
        lines.push(row.join(","));
    }

    out.extend_from_slice(lines.join("\r\n").as_bytes());
    Ok(out)
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn detail_fields(listing: &Listing) -> DetailFields {
    listing
        .detail_fields
        .as_ref()
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

fn vehicle_row(listing: &Listing) -> Vec<String> {
    // The payload is opaque to the store; anything unreadable exports empty.
    let fields: VehicleFields =
        serde_json::from_value(listing.category_fields.clone()).unwrap_or_default();
    let detail = detail_fields(listing);
    vec![
        listing.token.clone(),
        listing.ad_type.to_string(),
        fields.manufacturer,
        fields.model,
        fields.sub_model,
        opt(fields.year),
        fields.engine_type,
        opt(fields.hand),
        opt(fields.km),
        opt(listing.current_price),
        opt(listing.first_price),
        listing.price_change_count.to_string(),
        listing.address.clone(),
        detail.description,
        listing.image_url.clone(),
        listing.first_seen_at.to_rfc3339(),
        listing.last_seen_at.to_rfc3339(),
        detail.seller_name,
        detail.updated_at,
    ]
}

fn real_estate_row(listing: &Listing) -> Vec<String> {
    let fields: RealEstateFields =
        serde_json::from_value(listing.category_fields.clone()).unwrap_or_default();
    let detail = detail_fields(listing);
    vec![
        listing.token.clone(),
        listing.ad_type.to_string(),
        fields.property_type,
        opt(fields.rooms),
        opt(fields.square_meters),
        opt(fields.floor),
        fields.condition,
        opt(listing.current_price),
        opt(listing.first_price),
        listing.price_change_count.to_string(),
        fields.city,
        fields.neighborhood,
        listing.address.clone(),
        detail.description,
        listing.image_url.clone(),
        listing.first_seen_at.to_rfc3339(),
        listing.last_seen_at.to_rfc3339(),
        detail.seller_name,
        detail.updated_at,
    ]
}
