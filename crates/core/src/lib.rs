pub mod domain;
pub mod report;
pub mod source;
pub mod storage;

pub mod config {
    use anyhow::Context;

    use crate::report::{DEFAULT_BRAND, DEFAULT_RECORD_LIMIT, MAX_RECORD_LIMIT};

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub report_record_limit: u32,
        pub report_brand: String,
        pub report_ornament_seed: Option<u64>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let report_record_limit = std::env::var("REPORT_RECORD_LIMIT")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(DEFAULT_RECORD_LIMIT)
                .clamp(1, MAX_RECORD_LIMIT);

            let report_brand = std::env::var("REPORT_BRAND")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_BRAND.to_string());

            let report_ornament_seed = std::env::var("REPORT_ORNAMENT_SEED")
                .ok()
                .and_then(|s| s.parse::<u64>().ok());

            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                report_record_limit,
                report_brand,
                report_ornament_seed,
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn report_options(
            &self,
            generated_at: chrono::DateTime<chrono::Utc>,
        ) -> crate::report::ReportOptions {
            crate::report::ReportOptions {
                limit: self.report_record_limit,
                generated_at,
                brand: self.report_brand.clone(),
                ornament_seed: self.report_ornament_seed,
            }
        }
    }
}
