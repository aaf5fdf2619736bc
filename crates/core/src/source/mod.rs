use crate::domain::prediction::{PerformancePoint, PerformanceSeries, PredictionRecord};
use crate::report::error::DataUnavailable;

/// Supplies prediction records for one request. Handed to the report
/// pipeline and the HTTP layer ready to use; implementations own their
/// connection handling.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Up to `limit` records in publication order.
    async fn fetch_predictions(&self, limit: u32) -> Result<Vec<PredictionRecord>, DataUnavailable>;
}

#[async_trait::async_trait]
pub trait PerformanceSource: Send + Sync {
    /// Monthly returns for `series`, oldest first.
    async fn fetch_performance(
        &self,
        series: PerformanceSeries,
    ) -> Result<Vec<PerformancePoint>, DataUnavailable>;
}

/// In-memory source, used for offline rendering from a file and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDataSource {
    predictions: Vec<PredictionRecord>,
    history: Vec<PerformancePoint>,
    market: Vec<PerformancePoint>,
    unavailable: Option<String>,
}

impl StaticDataSource {
    pub fn new(predictions: Vec<PredictionRecord>) -> Self {
        Self {
            predictions,
            ..Self::default()
        }
    }

    /// A source whose every fetch fails with `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_performance(mut self, series: PerformanceSeries, mut points: Vec<PerformancePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        match series {
            PerformanceSeries::History => self.history = points,
            PerformanceSeries::Market => self.market = points,
        }
        self
    }

    fn check_available(&self) -> Result<(), DataUnavailable> {
        match &self.unavailable {
            Some(reason) => Err(DataUnavailable(anyhow::anyhow!("{reason}"))),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl DataSource for StaticDataSource {
    fn source_name(&self) -> &'static str {
        "static"
    }

    async fn fetch_predictions(&self, limit: u32) -> Result<Vec<PredictionRecord>, DataUnavailable> {
        self.check_available()?;
        Ok(self
            .predictions
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl PerformanceSource for StaticDataSource {
    async fn fetch_performance(
        &self,
        series: PerformanceSeries,
    ) -> Result<Vec<PerformancePoint>, DataUnavailable> {
        self.check_available()?;
        Ok(match series {
            PerformanceSeries::History => self.history.clone(),
            PerformanceSeries::Market => self.market.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn truncates_to_limit_in_order() {
        let source = StaticDataSource::new(vec![
            PredictionRecord::new("A", 1.0, 0.0),
            PredictionRecord::new("B", 2.0, 0.0),
            PredictionRecord::new("C", 3.0, 0.0),
        ]);
        let got = source.fetch_predictions(2).await.unwrap();
        let tickers: Vec<_> = got.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, ["A", "B"]);
        assert!(source.fetch_predictions(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn performance_is_date_ordered() {
        let d = |m| NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
        let source = StaticDataSource::default().with_performance(
            PerformanceSeries::Market,
            vec![
                PerformancePoint { date: d(3), percent_return: 1.0 },
                PerformancePoint { date: d(1), percent_return: 2.0 },
            ],
        );
        let got = source.fetch_performance(PerformanceSeries::Market).await.unwrap();
        assert_eq!(got[0].date, d(1));
        assert!(source.fetch_performance(PerformanceSeries::History).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_source_fails_every_fetch() {
        let source = StaticDataSource::unavailable("down");
        assert!(source.fetch_predictions(5).await.is_err());
        assert!(source.fetch_performance(PerformanceSeries::History).await.is_err());
    }
}
