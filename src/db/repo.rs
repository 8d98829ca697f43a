//! Repository layer for committed readings.

use super::MeasureStore;
use crate::domain::{BillingPeriod, MeasureKey, MeasureType, MeasurementRecord};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

const SELECT_COLUMNS: &str = "measure_uuid, customer_code, measure_type, billing_period, \
     measure_datetime, measure_value, image_url, created_at";

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Round-trip a trivial query to check the pool is usable.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Insert a reading unless one already exists for its period.
    ///
    /// Returns `true` if the row was written, `false` on a period conflict.
    ///
    /// # Errors
    /// Returns an error if the insert fails for any other reason.
    pub async fn insert_measure(&self, record: &MeasurementRecord) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO measures (measure_uuid, customer_code, measure_type, billing_period,
                                  measure_datetime, measure_value, image_url, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(customer_code, measure_type, billing_period) DO NOTHING
            "#,
        )
        .bind(record.measure_uuid.to_string())
        .bind(record.customer_code.as_str())
        .bind(record.measure_type.as_str())
        .bind(record.billing_period.to_string())
        .bind(format_datetime(&record.measure_datetime))
        .bind(record.measure_value)
        .bind(record.image_url.as_str())
        .bind(format_datetime(&record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_measure(
        &self,
        key: &MeasureKey,
    ) -> Result<Option<MeasurementRecord>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM measures \
             WHERE customer_code = ? AND measure_type = ? AND billing_period = ?",
            SELECT_COLUMNS
        ))
        .bind(key.customer_code.as_str())
        .bind(key.measure_type.as_str())
        .bind(key.billing_period.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Readings for a customer, oldest first, optionally filtered by type.
    pub async fn list_measures(
        &self,
        customer_code: &str,
        measure_type: Option<MeasureType>,
    ) -> Result<Vec<MeasurementRecord>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM measures \
             WHERE customer_code = ? AND (? IS NULL OR measure_type = ?) \
             ORDER BY measure_datetime ASC, measure_uuid ASC",
            SELECT_COLUMNS
        ))
        .bind(customer_code)
        .bind(measure_type.map(|t| t.as_str()))
        .bind(measure_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }
}

#[async_trait]
impl MeasureStore for Repository {
    async fn find(&self, key: &MeasureKey) -> Result<Option<MeasurementRecord>, sqlx::Error> {
        self.find_measure(key).await
    }

    async fn commit(&self, record: &MeasurementRecord) -> Result<bool, sqlx::Error> {
        self.insert_measure(record).await
    }
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn record_from_row(row: &SqliteRow) -> Result<MeasurementRecord, sqlx::Error> {
    let decode = |e: Box<dyn std::error::Error + Send + Sync>| sqlx::Error::Decode(e);

    let measure_uuid: String = row.try_get("measure_uuid")?;
    let measure_type: String = row.try_get("measure_type")?;
    let billing_period: String = row.try_get("billing_period")?;
    let measure_datetime: String = row.try_get("measure_datetime")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(MeasurementRecord {
        measure_uuid: Uuid::parse_str(&measure_uuid).map_err(|e| decode(e.into()))?,
        customer_code: row.try_get("customer_code")?,
        measure_type: measure_type
            .parse::<MeasureType>()
            .map_err(|e| decode(e.into()))?,
        billing_period: billing_period
            .parse::<BillingPeriod>()
            .map_err(|e| decode(e.into()))?,
        measure_datetime: parse_datetime(&measure_datetime).map_err(|e| decode(e.into()))?,
        measure_value: row.try_get("measure_value")?,
        image_url: row.try_get("image_url")?,
        created_at: parse_datetime(&created_at).map_err(|e| decode(e.into()))?,
    })
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
