use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::badge::BadgeHook;
use crate::db::{Db, ListingStore};
use crate::error::AppError;
use crate::export::csv::to_csv;
use crate::stats::collection_stats;
use crate::types::{
    CandidateListing, Category, CollectionLogEntry, CollectionStats, Listing, PageType,
    PriceRecord, UpsertSummary,
};
use crate::validator;

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<Db>,
    pub store: ListingStore,
    pub badge: Arc<dyn BadgeHook>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/collect/batch", post(submit_batch))
        .route("/collect/detail", post(submit_detail))
        .route("/listings", get(get_listings))
        .route("/listings/:token/prices", get(get_price_history))
        .route("/stats", get(get_stats))
        .route("/export/:category", get(export_category))
        .route("/admin/clear", post(clear_all))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct BatchPayload {
    pub listings: Vec<CandidateListing>,
    pub url: String,
    pub category: Category,
    pub page_type: PageType,
}

#[derive(Deserialize)]
pub struct DetailPayload {
    pub listing: CandidateListing,
    pub url: String,
    pub category: Category,
}

#[derive(Deserialize)]
pub struct ListingsQuery {
    pub category: Option<Category>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Ingests one feed batch: validate, upsert atomically, then append the audit
/// record in a separate transaction and fire the badge hook. An audit write
/// failure after the committed upsert loses the log row, never the catalog
/// update.
async fn submit_batch(
    State(state): State<ApiState>,
    Json(payload): Json<BatchPayload>,
) -> Result<Json<UpsertSummary>, AppError> {
    let found = payload.listings.len() as i64;
    let observations = validator::sanitize_batch(payload.listings);
    let summary = state.store.upsert_batch(&observations).await?;

    let entry = CollectionLogEntry {
        url: payload.url,
        category: payload.category,
        page_type: payload.page_type,
        listings_found: found,
        new_listings: summary.new_listings as i64,
        price_changes: summary.price_changes as i64,
        collected_at: Utc::now(),
    };
    if let Err(e) = state.store.write_collection_log(&entry).await {
        warn!("collection log write failed: {e}");
    }

    state.badge.batch_committed(summary.new_listings);
    debug!(
        found,
        new = summary.new_listings,
        price_changes = summary.price_changes,
        "batch ingested"
    );
    Ok(Json(summary))
}

async fn submit_detail(
    State(state): State<ApiState>,
    Json(payload): Json<DetailPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Some(observation) = validator::sanitize_candidate(payload.listing) else {
        // The drop is already logged by the validator.
        return Ok(Json(json!({"ok": false})));
    };

    state.store.upsert_detail(&observation).await?;

    let entry = CollectionLogEntry {
        url: payload.url,
        category: payload.category,
        page_type: PageType::Detail,
        listings_found: 1,
        new_listings: 0,
        price_changes: 0,
        collected_at: Utc::now(),
    };
    if let Err(e) = state.store.write_collection_log(&entry).await {
        warn!("collection log write failed: {e}");
    }

    debug!(token = %observation.token, "detail enrichment ingested");
    Ok(Json(json!({"ok": true})))
}

async fn get_listings(
    State(state): State<ApiState>,
    Query(params): Query<ListingsQuery>,
) -> Result<Json<Vec<Listing>>, AppError> {
    Ok(Json(state.store.get_listings(params.category).await?))
}

async fn get_price_history(
    State(state): State<ApiState>,
    Path(token): Path<String>,
) -> Result<Json<Vec<PriceRecord>>, AppError> {
    Ok(Json(state.store.price_history(&token).await?))
}

async fn get_stats(State(state): State<ApiState>) -> Result<Json<CollectionStats>, AppError> {
    Ok(Json(collection_stats(&state.db).await?))
}

async fn export_category(
    State(state): State<ApiState>,
    Path(category): Path<String>,
) -> Result<axum::response::Response, AppError> {
    let Ok(category) = category.parse::<Category>() else {
        return Ok((StatusCode::BAD_REQUEST, "unknown category").into_response());
    };

    let listings = state.store.get_listings(Some(category)).await?;
    let bytes = to_csv(&listings)?;
    let filename = format!("listings_{category}_{}.csv", Utc::now().format("%Y-%m-%d"));
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

async fn clear_all(State(state): State<ApiState>) -> Result<Json<serde_json::Value>, AppError> {
    state.store.clear().await?;
    debug!("catalog cleared");
    Ok(Json(json!({"ok": true})))
}
