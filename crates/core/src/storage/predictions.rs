use anyhow::Context;

use crate::domain::prediction::{PerformancePoint, PerformanceSeries, PredictionRecord};
use crate::report::error::DataUnavailable;
use crate::source::{DataSource, PerformanceSource};

/// Postgres-backed source for predictions and performance series.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: sqlx::PgPool,
}

impl PgStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl DataSource for PgStore {
    fn source_name(&self) -> &'static str {
        "postgres"
    }

    async fn fetch_predictions(&self, limit: u32) -> Result<Vec<PredictionRecord>, DataUnavailable> {
        let rows = sqlx::query_as::<_, (String, f64, f64)>(
            "SELECT ticker, price_predicted, expected_growth \
             FROM predictions \
             ORDER BY id ASC \
             LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .context("select predictions failed")?;

        Ok(rows
            .into_iter()
            .map(|(ticker, price_predicted, expected_growth)| PredictionRecord {
                ticker,
                price_predicted,
                expected_growth,
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl PerformanceSource for PgStore {
    async fn fetch_performance(
        &self,
        series: PerformanceSeries,
    ) -> Result<Vec<PerformancePoint>, DataUnavailable> {
        let sql = format!(
            "SELECT date, percent_return FROM {} ORDER BY date ASC",
            series.table_name()
        );
        let rows = sqlx::query_as::<_, (chrono::NaiveDate, f64)>(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("select {} failed", series.table_name()))?;

        Ok(rows
            .into_iter()
            .map(|(date, percent_return)| PerformancePoint { date, percent_return })
            .collect())
    }
}

/// Replaces the published predictions. Insertion order is the order the
/// API and reports will list them in.
pub async fn replace_predictions(
    pool: &sqlx::PgPool,
    records: &[PredictionRecord],
) -> anyhow::Result<u64> {
    let mut tx = pool.begin().await.context("begin transaction failed")?;

    sqlx::query("DELETE FROM predictions")
        .execute(&mut *tx)
        .await
        .context("clear predictions failed")?;

    let mut inserted: u64 = 0;
    if !records.is_empty() {
        let mut qb = sqlx::QueryBuilder::new(
            "INSERT INTO predictions (ticker, price_predicted, expected_growth) ",
        );
        qb.push_values(records, |mut b, record| {
            b.push_bind(record.ticker.trim())
                .push_bind(record.price_predicted)
                .push_bind(record.expected_growth);
        });

        let res = qb
            .build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .context("insert predictions failed")?;
        inserted = res.rows_affected();
    }

    tx.commit().await.context("commit transaction failed")?;

    tracing::debug!(inserted, "predictions replaced");
    Ok(inserted)
}
