pub mod error;
pub mod model;
pub mod ornament;
pub mod pdf;
pub mod text;
pub mod xlsx;

use std::io::Write;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::domain::prediction::PredictionRecord;
use crate::report::error::RenderFailure;
use crate::report::pdf::DocumentRenderer;
use crate::report::xlsx::SpreadsheetRenderer;
use crate::source::DataSource;

pub const DEFAULT_RECORD_LIMIT: u32 = 20;

pub const DEFAULT_BRAND: &str = "Stock Source";

/// Largest limit accepted from callers; keeps the PDF table on one page.
pub const MAX_RECORD_LIMIT: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Pdf,
    Xlsx,
}

impl ReportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "application/pdf",
            ReportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "stocks.pdf",
            ReportFormat::Xlsx => "stocks.xlsx",
        }
    }

    pub fn content_disposition(self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Xlsx => "xlsx",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ReportFormat::Pdf),
            "xlsx" | "excel" => Ok(ReportFormat::Xlsx),
            other => Err(format!("unknown report format: {other}")),
        }
    }
}

/// Turns a record sequence into a finished artifact.
///
/// Implementations build the whole artifact before anything reaches the
/// sink, so a failed render never leaves a truncated file behind.
pub trait ReportRenderer: Send + Sync {
    fn format(&self) -> ReportFormat;

    fn render_bytes(&self, records: &[PredictionRecord]) -> Result<Vec<u8>, RenderFailure>;

    fn render(&self, records: &[PredictionRecord], sink: &mut dyn Write) -> Result<(), RenderFailure> {
        let bytes = self.render_bytes(records)?;
        sink.write_all(&bytes)?;
        sink.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub limit: u32,
    pub generated_at: DateTime<Utc>,
    pub brand: String,
    pub ornament_seed: Option<u64>,
}

impl ReportOptions {
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        Self {
            limit: DEFAULT_RECORD_LIMIT,
            generated_at,
            brand: DEFAULT_BRAND.to_string(),
            ornament_seed: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

pub fn renderer_for(format: ReportFormat, options: &ReportOptions) -> Box<dyn ReportRenderer> {
    match format {
        ReportFormat::Pdf => Box::new(
            DocumentRenderer::new(options.brand.clone(), options.generated_at)
                .with_ornament_seed(options.ornament_seed),
        ),
        ReportFormat::Xlsx => Box::new(SpreadsheetRenderer::new(
            options.brand.clone(),
            options.generated_at,
        )),
    }
}

/// Fetches up to `options.limit` predictions and renders them.
///
/// The fetch completes before rendering starts; every failure comes back as
/// a [`RenderFailure`] with no bytes produced.
pub async fn generate(
    source: &dyn DataSource,
    format: ReportFormat,
    options: &ReportOptions,
) -> Result<Vec<u8>, RenderFailure> {
    let records = source.fetch_predictions(options.limit).await?;
    let renderer = renderer_for(format, options);
    let bytes = renderer.render_bytes(&records)?;

    tracing::info!(
        format = renderer.format().as_str(),
        source = source.source_name(),
        records = records.len(),
        bytes = bytes.len(),
        "report rendered"
    );

    Ok(bytes)
}

/// [`generate`], then hand the finished artifact to `sink` in one write.
pub async fn export<W: Write + ?Sized>(
    source: &dyn DataSource,
    format: ReportFormat,
    options: &ReportOptions,
    sink: &mut W,
) -> Result<(), RenderFailure> {
    let bytes = generate(source, format, options).await?;
    sink.write_all(&bytes)?;
    sink.flush()?;
    Ok(())
}
