use crate::error::{AppError, Result};

/// Listing tokens are opaque alphanumeric identifiers up to this length.
pub const MAX_TOKEN_LENGTH: usize = 50;

/// Free-text fields (title, address, ...) are truncated to this many characters
/// after markup stripping.
pub const MAX_TEXT_LENGTH: usize = 2000;

/// Pool size for the shared SQLite handle. Writes serialize at the engine
/// anyway; extra connections only help concurrent reads.
pub const DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub api_port: u16,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "catalog.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}
