use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Returned by the `FromStr` impls below when a stored or submitted string
/// does not name a known enum variant.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UnknownVariant(pub String);

// ---------------------------------------------------------------------------
// Domain enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Vehicles,
    RealEstate,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Vehicles => "vehicles",
            Category::RealEstate => "realestate",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "vehicles" => Ok(Category::Vehicles),
            "realestate" => Ok(Category::RealEstate),
            other => Err(UnknownVariant(format!("category \"{other}\""))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Feed,
    Detail,
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PageType::Feed => "feed",
            PageType::Detail => "detail",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PageType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "feed" => Ok(PageType::Feed),
            "detail" => Ok(PageType::Detail),
            other => Err(UnknownVariant(format!("page type \"{other}\""))),
        }
    }
}

/// Seller/promotion class of an ad. The set is fixed by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdType {
    Private,
    Commercial,
    Agency,
    Platinum,
    Boost,
    Solo,
    Yad1,
}

impl std::fmt::Display for AdType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdType::Private => "private",
            AdType::Commercial => "commercial",
            AdType::Agency => "agency",
            AdType::Platinum => "platinum",
            AdType::Boost => "boost",
            AdType::Solo => "solo",
            AdType::Yad1 => "yad1",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AdType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "private" => Ok(AdType::Private),
            "commercial" => Ok(AdType::Commercial),
            "agency" => Ok(AdType::Agency),
            "platinum" => Ok(AdType::Platinum),
            "boost" => Ok(AdType::Boost),
            "solo" => Ok(AdType::Solo),
            "yad1" => Ok(AdType::Yad1),
            other => Err(UnknownVariant(format!("ad type \"{other}\""))),
        }
    }
}

// ---------------------------------------------------------------------------
// Listing — one durable catalog row per unique token
// ---------------------------------------------------------------------------

/// A deduplicated catalog entry. `category_fields`, `detail_fields` and
/// `raw_data` are opaque to the store; only the CSV exporter reads into them.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub token: String,
    pub category: Category,
    pub subcategory: String,
    pub ad_type: AdType,
    pub page_type: PageType,
    pub current_price: Option<f64>,
    pub first_price: Option<f64>,
    pub price_change_count: i64,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub title: String,
    pub address: String,
    pub image_url: String,
    pub category_fields: Value,
    pub detail_fields: Option<Value>,
    pub raw_data: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Ingestion wire types
// ---------------------------------------------------------------------------

/// One candidate listing as submitted by a collection session, before
/// validation. `category` and `ad_type` arrive as strings so a bad record
/// can be dropped per item instead of failing the whole request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateListing {
    pub token: String,
    pub category: String,
    pub ad_type: String,
    pub page_type: PageType,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub category_fields: Value,
    #[serde(default)]
    pub detail_fields: Option<Value>,
    #[serde(default)]
    pub raw_data: Map<String, Value>,
}

/// A validated, sanitized observation — the only shape the store accepts.
#[derive(Debug, Clone)]
pub struct Observation {
    pub token: String,
    pub category: Category,
    pub subcategory: String,
    pub ad_type: AdType,
    pub page_type: PageType,
    pub price: Option<f64>,
    pub title: String,
    pub address: String,
    pub image_url: String,
    pub category_fields: Value,
    pub detail_fields: Option<Value>,
    pub raw_data: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Store results and audit records
// ---------------------------------------------------------------------------

/// One immutable price observation, appended on creation (when priced) and
/// on every detected price change.
#[derive(Debug, Clone, Serialize)]
pub struct PriceRecord {
    pub id: i64,
    pub token: String,
    pub price: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub new_listings: u64,
    pub price_changes: u64,
}

/// One append-only audit record per completed ingestion batch.
#[derive(Debug, Clone)]
pub struct CollectionLogEntry {
    pub url: String,
    pub category: Category,
    pub page_type: PageType,
    pub listings_found: i64,
    pub new_listings: i64,
    pub price_changes: i64,
    pub collected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionStats {
    pub vehicles: i64,
    pub realestate: i64,
    pub total: i64,
    pub price_changes: i64,
    pub last_collected_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Typed views over the opaque category/detail payloads (CSV export only)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleFields {
    pub manufacturer: String,
    pub model: String,
    pub sub_model: String,
    pub year: Option<i32>,
    pub engine_type: String,
    pub engine_volume_cc: String,
    pub gear_box: String,
    pub hand: Option<i32>,
    pub km: Option<i64>,
    pub color: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RealEstateFields {
    pub property_type: String,
    pub rooms: Option<f64>,
    pub square_meters: Option<i64>,
    pub square_meters_build: Option<i64>,
    pub floor: Option<i32>,
    pub total_floors: Option<i32>,
    pub condition: String,
    pub neighborhood: String,
    pub city: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailFields {
    pub description: String,
    pub seller_name: String,
    pub updated_at: String,
    pub additional_info: Map<String, Value>,
}
