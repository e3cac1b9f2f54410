use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use tracing::warn;

use crate::db::handle::Db;
use crate::db::merge::{self, MergeOutcome};
use crate::db::models::{format_ts, ListingRow, PriceRecordRow};
use crate::error::Result;
use crate::types::{
    Category, CollectionLogEntry, Listing, Observation, PriceRecord, UpsertSummary,
};

const SELECT_LISTING: &str = "SELECT token, category, subcategory, ad_type, page_type, \
     current_price, first_price, price_change_count, first_seen_at, last_seen_at, \
     title, address, image_url, category_fields, detail_fields, raw_data \
     FROM listings";

/// Owns the persistent catalog, the price-history log, and the collection
/// audit log. All methods share the lazily opened pool behind [`Db`]; writes
/// serialize at the SQLite transaction boundary, so concurrent upsert batches
/// from independent collection sessions never interleave.
#[derive(Clone)]
pub struct ListingStore {
    db: Arc<Db>,
}

impl ListingStore {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    /// Applies a batch of observations as one atomic transaction.
    ///
    /// Best-effort per item: a row that fails to decode or serialize is
    /// logged and skipped without aborting the rest of the batch. Only a
    /// storage-engine failure aborts (and rolls back) the whole call.
    pub async fn upsert_batch(&self, observations: &[Observation]) -> Result<UpsertSummary> {
        let pool = self.db.pool().await?;
        let now = Utc::now();
        let mut summary = UpsertSummary::default();

        let mut tx = pool.begin().await?;
        for obs in observations {
            match upsert_one(&mut tx, obs, now, false).await {
                Ok(outcome) => {
                    if outcome.is_new {
                        summary.new_listings += 1;
                    }
                    if outcome.price_changed {
                        summary.price_changes += 1;
                    }
                }
                Err(e) if e.is_storage_failure() => return Err(e),
                Err(e) => warn!(token = %obs.token, "skipping observation: {e}"),
            }
        }
        tx.commit().await?;

        Ok(summary)
    }

    /// Merges a single detail-page observation, replacing `detail_fields`
    /// wholesale. Creates the row if the token was never seen.
    pub async fn upsert_detail(&self, obs: &Observation) -> Result<()> {
        let pool = self.db.pool().await?;
        let now = Utc::now();

        let mut tx = pool.begin().await?;
        upsert_one(&mut tx, obs, now, true).await?;
        tx.commit().await?;

        Ok(())
    }

    /// All listings, or only one category via its index. Traversal order is
    /// not part of the contract.
    pub async fn get_listings(&self, category: Option<Category>) -> Result<Vec<Listing>> {
        let pool = self.db.pool().await?;
        let rows = match category {
            Some(cat) => {
                let sql = format!("{SELECT_LISTING} WHERE category = ?");
                sqlx::query_as::<_, ListingRow>(&sql)
                    .bind(cat.to_string())
                    .fetch_all(pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, ListingRow>(SELECT_LISTING)
                    .fetch_all(pool)
                    .await?
            }
        };
        rows.into_iter().map(Listing::try_from).collect()
    }

    /// Price history for one token, oldest first. Records written in the
    /// same batch share a timestamp, so the sequence id breaks ties.
    pub async fn price_history(&self, token: &str) -> Result<Vec<PriceRecord>> {
        let pool = self.db.pool().await?;
        let rows = sqlx::query_as::<_, PriceRecordRow>(
            "SELECT id, token, price, recorded_at FROM price_history \
             WHERE token = ? ORDER BY recorded_at, id",
        )
        .bind(token)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(PriceRecord::try_from).collect()
    }

    /// Appends one audit record. Runs in its own transaction: a failure here
    /// must never roll back a previously committed upsert, so callers log
    /// and move on.
    pub async fn write_collection_log(&self, entry: &CollectionLogEntry) -> Result<()> {
        let pool = self.db.pool().await?;
        sqlx::query(
            "INSERT INTO collection_log \
             (url, category, page_type, listings_found, new_listings, price_changes, collected_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.url)
        .bind(entry.category.to_string())
        .bind(entry.page_type.to_string())
        .bind(entry.listings_found)
        .bind(entry.new_listings)
        .bind(entry.price_changes)
        .bind(format_ts(entry.collected_at))
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Empties the catalog, the price history, and the audit log atomically.
    pub async fn clear(&self) -> Result<()> {
        let pool = self.db.pool().await?;
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM listings").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM price_history").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM collection_log").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Fetch + pure merge + apply for one observation, inside the caller's
/// transaction. Decode/serialize failures surface per item; the caller
/// decides whether they abort.
async fn upsert_one(
    tx: &mut Transaction<'_, Sqlite>,
    obs: &Observation,
    now: DateTime<Utc>,
    detail: bool,
) -> Result<MergeOutcome> {
    let existing = fetch_listing(tx, &obs.token).await?;
    let outcome = if detail {
        merge::merge_detail(existing, obs, now)
    } else {
        merge::merge_observation(existing, obs, now)
    };

    write_listing(tx, &outcome.listing).await?;
    if let Some(price) = outcome.record_price {
        sqlx::query("INSERT INTO price_history (token, price, recorded_at) VALUES (?, ?, ?)")
            .bind(&outcome.listing.token)
            .bind(price)
            .bind(format_ts(now))
            .execute(&mut **tx)
            .await?;
    }

    Ok(outcome)
}

async fn fetch_listing(
    tx: &mut Transaction<'_, Sqlite>,
    token: &str,
) -> Result<Option<Listing>> {
    let sql = format!("{SELECT_LISTING} WHERE token = ?");
    let row = sqlx::query_as::<_, ListingRow>(&sql)
        .bind(token)
        .fetch_optional(&mut **tx)
        .await?;
    row.map(Listing::try_from).transpose()
}

async fn write_listing(tx: &mut Transaction<'_, Sqlite>, listing: &Listing) -> Result<()> {
    // Serialize the opaque payloads before touching the database so a bad
    // payload fails the item, not a half-written row.
    let category_fields = serde_json::to_string(&listing.category_fields)?;
    let detail_fields = listing
        .detail_fields
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let raw_data = serde_json::to_string(&listing.raw_data)?;

    sqlx::query(
        "INSERT OR REPLACE INTO listings \
         (token, category, subcategory, ad_type, page_type, current_price, first_price, \
          price_change_count, first_seen_at, last_seen_at, title, address, image_url, \
          category_fields, detail_fields, raw_data) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&listing.token)
    .bind(listing.category.to_string())
    .bind(&listing.subcategory)
    .bind(listing.ad_type.to_string())
    .bind(listing.page_type.to_string())
    .bind(listing.current_price)
    .bind(listing.first_price)
    .bind(listing.price_change_count)
    .bind(format_ts(listing.first_seen_at))
    .bind(format_ts(listing.last_seen_at))
    .bind(&listing.title)
    .bind(&listing.address)
    .bind(&listing.image_url)
    .bind(category_fields)
    .bind(detail_fields)
    .bind(raw_data)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
