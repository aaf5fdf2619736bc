use thiserror::Error;

/// A prediction row that cannot be shown in a report.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid record at index {index} (ticker={ticker:?}): {reason}")]
pub struct InvalidRecord {
    pub index: usize,
    pub ticker: String,
    pub reason: String,
}

/// The backing store could not supply records.
#[derive(Debug, Error)]
#[error("prediction data unavailable: {0}")]
pub struct DataUnavailable(#[from] pub anyhow::Error);

#[derive(Debug, Error)]
pub enum RenderFailure {
    #[error(transparent)]
    InvalidRecord(#[from] InvalidRecord),

    #[error(transparent)]
    DataUnavailable(#[from] DataUnavailable),

    #[error("{rows} rows do not fit on one page (max {max_rows})")]
    LayoutOverflow { rows: usize, max_rows: usize },

    #[error("workbook assembly failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("failed to write report to sink: {0}")]
    Io(#[from] std::io::Error),
}
