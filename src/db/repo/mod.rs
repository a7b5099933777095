//! Repository layer for database operations.
//!
//! Methods are organized across submodules by domain:
//! - `legs.rs` - execution leg persistence
//! - `ledger.rs` - capital ledger persistence
//! - `rates.rs` - charge rate table bootstrap and reads
//!
//! Mutating methods take an explicit `&mut SqliteConnection` so the
//! service can span one transaction across leg writes and the ledger
//! append; read-only queries run against the pool.

mod ledger;
mod legs;
mod rates;

use chrono::NaiveDate;
use sqlx::sqlite::SqlitePool;
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

use crate::domain::Decimal;

pub use rates::RateProvider;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a transaction spanning one bucket-level operation.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }
}

/// Decode a stored canonical decimal, surfacing corruption as a decode
/// error rather than a silent default.
pub(crate) fn parse_decimal(raw: &str, column: &str) -> Result<Decimal, sqlx::Error> {
    Decimal::from_str(raw).map_err(|e| {
        warn!(column, raw, error = %e, "failed to parse stored decimal");
        sqlx::Error::Decode(format!("column {column}: invalid decimal {raw:?}: {e}").into())
    })
}

pub(crate) fn parse_date(raw: &str, column: &str) -> Result<NaiveDate, sqlx::Error> {
    NaiveDate::from_str(raw).map_err(|e| {
        warn!(column, raw, error = %e, "failed to parse stored date");
        sqlx::Error::Decode(format!("column {column}: invalid date {raw:?}: {e}").into())
    })
}

pub(crate) fn parse_uuid(raw: &str, column: &str) -> Result<Uuid, sqlx::Error> {
    Uuid::from_str(raw).map_err(|e| {
        warn!(column, raw, error = %e, "failed to parse stored uuid");
        sqlx::Error::Decode(format!("column {column}: invalid uuid {raw:?}: {e}").into())
    })
}
