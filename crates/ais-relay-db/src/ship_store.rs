//! Durable replica of the live vessel registry.
//!
//! One row per MMSI. The full canonical record is stored as JSONB next to a
//! few queryable columns. The `mmsi` primary key is the unique index that
//! makes [`ShipStore::upsert_ship`] idempotent.
//!
//! The table name is configurable, so it is interpolated into the SQL after
//! being checked by [`is_valid_identifier`]; every value is still bound as a
//! parameter.

use ais_relay_types::ShipRecord;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use crate::error::DbError;

/// Longest identifier `PostgreSQL` accepts without truncation.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Whether `name` is a plain, unquoted SQL identifier.
///
/// Accepts ASCII letters, digits, and underscores, not starting with a
/// digit, at most 63 bytes.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_IDENTIFIER_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A row of the ships table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShipRow {
    /// Vessel MMSI (primary key).
    pub mmsi: String,
    /// Last known name.
    pub name: Option<String>,
    /// Last known latitude.
    pub lat: Option<f64>,
    /// Last known longitude.
    pub lon: Option<f64>,
    /// When the live registry last merged a message for this vessel.
    pub last_update: DateTime<Utc>,
    /// Full canonical record.
    pub record: Json<ShipRecord>,
    /// When this row was last written.
    pub updated_at: DateTime<Utc>,
}

/// Operations on the ships table.
#[derive(Clone)]
pub struct ShipStore {
    pool: PgPool,
    table: String,
}

impl ShipStore {
    /// Create a store bound to a connection pool and table name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if `table` is not a plain identifier.
    pub fn new(pool: PgPool, table: &str) -> Result<Self, DbError> {
        if !is_valid_identifier(table) {
            return Err(DbError::Config(format!("invalid table name: {table:?}")));
        }
        Ok(Self {
            pool,
            table: table.to_owned(),
        })
    }

    /// The table this store writes to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the table and its indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<(), DbError> {
        let table = &self.table;

        sqlx::query(&format!(
            r"CREATE TABLE IF NOT EXISTS {table} (
                mmsi        TEXT PRIMARY KEY,
                name        TEXT,
                lat         DOUBLE PRECISION,
                lon         DOUBLE PRECISION,
                last_update TIMESTAMPTZ NOT NULL,
                record      JSONB NOT NULL,
                updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
            )"
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_last_update_idx ON {table} (last_update)"
        ))
        .execute(&self.pool)
        .await?;

        tracing::info!(table = table.as_str(), "Ship table ready");
        Ok(())
    }

    /// Insert or replace the row for `record.mmsi`.
    ///
    /// Uses `ON CONFLICT (mmsi)` so repeated writes for one vessel update
    /// the same row. A record whose `last_update` is older than the stored
    /// one leaves the row unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn upsert_ship(&self, record: &ShipRecord) -> Result<(), DbError> {
        let table = &self.table;

        sqlx::query(&format!(
            r"INSERT INTO {table} (mmsi, name, lat, lon, last_update, record, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, now())
              ON CONFLICT (mmsi) DO UPDATE SET
                name = EXCLUDED.name,
                lat = EXCLUDED.lat,
                lon = EXCLUDED.lon,
                last_update = EXCLUDED.last_update,
                record = EXCLUDED.record,
                updated_at = now()
              WHERE {table}.last_update <= EXCLUDED.last_update"
        ))
        .bind(&record.mmsi)
        .bind(record.name.as_deref())
        .bind(record.lat)
        .bind(record.lon)
        .bind(record.last_update)
        .bind(Json(record))
        .execute(&self.pool)
        .await?;

        tracing::debug!(mmsi = record.mmsi.as_str(), "Upserted ship row");
        Ok(())
    }

    /// Fetch the row for one MMSI.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_ship(&self, mmsi: &str) -> Result<Option<ShipRow>, DbError> {
        let table = &self.table;

        let row = sqlx::query_as::<_, ShipRow>(&format!(
            r"SELECT mmsi, name, lat, lon, last_update, record, updated_at
              FROM {table}
              WHERE mmsi = $1"
        ))
        .bind(mmsi)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Count the rows in the table.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn count_ships(&self) -> Result<i64, DbError> {
        let table = &self.table;

        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Delete the row for one MMSI. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_ship(&self, mmsi: &str) -> Result<bool, DbError> {
        let table = &self.table;

        let result = sqlx::query(&format!("DELETE FROM {table} WHERE mmsi = $1"))
            .bind(mmsi)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
