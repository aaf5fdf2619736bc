use anyhow::Context;

use crate::domain::prediction::{PerformancePoint, PerformanceSeries};

/// Replaces one stored return series in a single transaction.
pub async fn replace_performance(
    pool: &sqlx::PgPool,
    series: PerformanceSeries,
    points: &[PerformancePoint],
) -> anyhow::Result<u64> {
    let table = series.table_name();
    let mut tx = pool.begin().await.context("begin transaction failed")?;

    sqlx::query(&format!("DELETE FROM {table}"))
        .execute(&mut *tx)
        .await
        .with_context(|| format!("clear {table} failed"))?;

    let mut inserted: u64 = 0;
    if !points.is_empty() {
        let mut qb = sqlx::QueryBuilder::new(format!("INSERT INTO {table} (date, percent_return) "));
        qb.push_values(points, |mut b, point| {
            b.push_bind(point.date).push_bind(point.percent_return);
        });
        qb.push(" ON CONFLICT (date) DO UPDATE SET percent_return = EXCLUDED.percent_return");

        let res = qb
            .build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("insert {table} failed"))?;
        inserted = res.rows_affected();
    }

    tx.commit().await.context("commit transaction failed")?;
    Ok(inserted)
}
