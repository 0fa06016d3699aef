//! # SQLite Database methods
//!
//! This module contains the "low-level" SQLite queries.
//!
//! Every query is a plain function that accepts a `&mut SqliteConnection`. Callers can hand in a pooled connection, or
//! open a transaction and pass `&mut *tx` without any other changes.
//!
//! Timestamps are written from Rust (`Utc::now()`) so that every column holds the same RFC 3339 representation.
//! Comparisons against them go through `julianday()`, which
//! keeps millisecond precision.
use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod badges;
pub mod campaigns;
pub mod donations;
pub mod fundraisers;
pub mod leaderboards;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/fundaction.db";

pub fn db_url() -> String {
    let result = env::var("FA_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ FA_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(10));
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
