use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::DB_MAX_CONNECTIONS;
use crate::error::Result;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Process-wide SQLite handle. The pool is opened lazily on first use and
/// shared by every subsequent call; `OnceCell::get_or_try_init` is the single
/// in-flight initialization future, so concurrent first opens never race into
/// duplicate pools. Individual connections are re-established by the pool
/// itself if the engine drops them.
pub struct Db {
    url: String,
    max_connections: u32,
    pool: OnceCell<SqlitePool>,
}

impl Db {
    /// Handle backed by a database file, created if missing.
    pub fn open(db_path: &str) -> Self {
        Self {
            url: format!("sqlite:{db_path}?mode=rwc"),
            max_connections: DB_MAX_CONNECTIONS,
            pool: OnceCell::new(),
        }
    }

    /// Private in-memory database. Capped to one connection — each SQLite
    /// `:memory:` connection is its own database.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            pool: OnceCell::new(),
        }
    }

    /// Returns the shared pool, opening it and applying migrations on first use.
    pub async fn pool(&self) -> Result<&SqlitePool> {
        self.pool
            .get_or_try_init(|| async {
                let pool = SqlitePoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect(&self.url)
                    .await?;
                MIGRATOR.run(&pool).await?;
                info!(url = %self.url, "database ready");
                Ok(pool)
            })
            .await
    }
}
