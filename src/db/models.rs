//! Database row types used by sqlx, plus conversions to the domain types.
//! Enums and timestamps are stored as text; opaque payloads as JSON text.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::Result;
use crate::types::Listing;

/// RFC 3339 with millisecond precision and a `Z` suffix. Fixed precision keeps
/// lexicographic order equal to chronological order in the text columns.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

#[derive(Debug, sqlx::FromRow)]
pub struct ListingRow {
    pub token: String,
    pub category: String,
    pub subcategory: String,
    pub ad_type: String,
    pub page_type: String,
    pub current_price: Option<f64>,
    pub first_price: Option<f64>,
    pub price_change_count: i64,
    pub first_seen_at: String,
    pub last_seen_at: String,
    pub title: String,
    pub address: String,
    pub image_url: String,
    pub category_fields: String,
    pub detail_fields: Option<String>,
    pub raw_data: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct PriceRecordRow {
    pub id: i64,
    pub token: String,
    pub price: f64,
    pub recorded_at: String,
}

impl TryFrom<PriceRecordRow> for crate::types::PriceRecord {
    type Error = crate::error::AppError;

    fn try_from(row: PriceRecordRow) -> Result<crate::types::PriceRecord> {
        Ok(crate::types::PriceRecord {
            recorded_at: parse_ts(&row.recorded_at)?,
            id: row.id,
            token: row.token,
            price: row.price,
        })
    }
}

impl TryFrom<ListingRow> for Listing {
    type Error = crate::error::AppError;

    fn try_from(row: ListingRow) -> Result<Listing> {
        Ok(Listing {
            category: row.category.parse()?,
            ad_type: row.ad_type.parse()?,
            page_type: row.page_type.parse()?,
            first_seen_at: parse_ts(&row.first_seen_at)?,
            last_seen_at: parse_ts(&row.last_seen_at)?,
            category_fields: serde_json::from_str(&row.category_fields)?,
            detail_fields: row
                .detail_fields
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            raw_data: serde_json::from_str(&row.raw_data)?,
            token: row.token,
            subcategory: row.subcategory,
            current_price: row.current_price,
            first_price: row.first_price,
            price_change_count: row.price_change_count,
            title: row.title,
            address: row.address,
            image_url: row.image_url,
        })
    }
}
