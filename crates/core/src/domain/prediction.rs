use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One published model prediction. Field names on the wire match what the
/// dashboard scripts read (`Ticker`, `PricePredicted`, `ExpectedGrowth`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PredictionRecord {
    pub ticker: String,
    pub price_predicted: f64,
    /// Fraction, so 0.05 is 5%.
    pub expected_growth: f64,
}

impl PredictionRecord {
    pub fn new(ticker: impl Into<String>, price_predicted: f64, expected_growth: f64) -> Self {
        Self {
            ticker: ticker.into(),
            price_predicted,
            expected_growth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformancePoint {
    pub date: NaiveDate,
    pub percent_return: f64,
}

/// Which stored return series a [`PerformancePoint`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceSeries {
    /// Realised returns of the published picks.
    History,
    /// Benchmark index returns over the same months.
    Market,
}

impl PerformanceSeries {
    pub fn table_name(self) -> &'static str {
        match self {
            PerformanceSeries::History => "performance_history",
            PerformanceSeries::Market => "market_performance",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prediction_uses_dashboard_field_names() {
        let record = PredictionRecord::new("AAPL", 191.5, 0.031);
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(
            v,
            json!({"Ticker": "AAPL", "PricePredicted": 191.5, "ExpectedGrowth": 0.031})
        );
    }

    #[test]
    fn performance_point_parses_camel_case() {
        let v = json!({"date": "2024-03-01", "percentReturn": -1.25});
        let p: PerformancePoint = serde_json::from_value(v).unwrap();
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(p.percent_return, -1.25);
    }
}
