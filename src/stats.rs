//! Read-only aggregate queries over the catalog. Each sub-query runs on its
//! own pooled connection; the result is consistent per sub-query snapshot,
//! not across the whole store — stats are advisory.

use sqlx::SqlitePool;

use crate::db::models::parse_ts;
use crate::db::Db;
use crate::error::Result;
use crate::types::{Category, CollectionStats};

pub async fn collection_stats(db: &Db) -> Result<CollectionStats> {
    let pool = db.pool().await?;

    let (vehicles, realestate, price_changes, last_collected_at) = tokio::try_join!(
        count_by_category(pool, Category::Vehicles),
        count_by_category(pool, Category::RealEstate),
        total_price_changes(pool),
        last_collected(pool),
    )?;

    Ok(CollectionStats {
        vehicles,
        realestate,
        total: vehicles + realestate,
        price_changes,
        last_collected_at,
    })
}

async fn count_by_category(pool: &SqlitePool, category: Category) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM listings WHERE category = ?")
        .bind(category.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Sum of per-listing change counters (full scan), not the price-history row
/// count — a listing created with a price contributes a history row but no
/// change.
async fn total_price_changes(pool: &SqlitePool) -> Result<i64> {
    let sum = sqlx::query_scalar::<_, Option<i64>>("SELECT SUM(price_change_count) FROM listings")
        .fetch_one(pool)
        .await?;
    Ok(sum.unwrap_or(0))
}

async fn last_collected(pool: &SqlitePool) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    let ts = sqlx::query_scalar::<_, String>(
        "SELECT collected_at FROM collection_log ORDER BY collected_at DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    ts.as_deref().map(parse_ts).transpose()
}
