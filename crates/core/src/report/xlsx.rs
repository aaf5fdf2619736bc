//! Predictions workbook: one styled header row, one text row per record.

use chrono::{DateTime, Datelike, Timelike, Utc};
use rust_xlsxwriter::{Color, DocProperties, ExcelDateTime, Format, Workbook, XlsxError};

use crate::domain::prediction::PredictionRecord;
use crate::report::error::RenderFailure;
use crate::report::model::{derive_display_rows, COLUMNS};
use crate::report::{ReportFormat, ReportRenderer};

pub const SHEET_NAME: &str = "Predictions";

/// Column widths in Excel character units, same order as the table columns.
const COLUMN_WIDTHS: [f64; 3] = [15.0, 20.0, 20.0];

const HEADER_FILL: u32 = 0x1A1A2E;

#[derive(Debug, Clone)]
pub struct SpreadsheetRenderer {
    brand: String,
    generated_at: DateTime<Utc>,
}

impl SpreadsheetRenderer {
    pub fn new(brand: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            brand: brand.into(),
            generated_at,
        }
    }

    /// Document properties pinned to the injected clock so identical input
    /// yields identical bytes.
    fn properties(&self) -> Result<DocProperties, XlsxError> {
        let t = self.generated_at;
        let created = ExcelDateTime::from_ymd(t.year() as u16, t.month() as u8, t.day() as u8)?
            .and_hms(t.hour() as u16, t.minute() as u8, t.second())?;

        Ok(DocProperties::new()
            .set_title(format!("{} Predictions", self.brand))
            .set_author(self.brand.as_str())
            .set_creation_datetime(&created))
    }

    fn build(&self, records: &[PredictionRecord]) -> Result<Vec<u8>, RenderFailure> {
        let rows = derive_display_rows(records)?;

        let mut workbook = Workbook::new();
        workbook.set_properties(&self.properties()?);

        let header = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(HEADER_FILL));

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        for (col, (column, width)) in COLUMNS.iter().zip(COLUMN_WIDTHS).enumerate() {
            let col = col as u16;
            worksheet.set_column_width(col, width)?;
            worksheet.write_string_with_format(0, col, column.label, &header)?;
        }
        worksheet.set_freeze_panes(1, 0)?;

        for (i, row) in rows.iter().enumerate() {
            let excel_row = i as u32 + 1;
            for (col, cell) in row.cells().iter().enumerate() {
                worksheet.write_string(excel_row, col as u16, *cell)?;
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}

impl ReportRenderer for SpreadsheetRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Xlsx
    }

    fn render_bytes(&self, records: &[PredictionRecord]) -> Result<Vec<u8>, RenderFailure> {
        self.build(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::{Cursor, Read};

    fn renderer() -> SpreadsheetRenderer {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        SpreadsheetRenderer::new("Stock Source", now)
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn writes_header_and_display_strings() {
        let records = vec![PredictionRecord::new("AAA", 100.005, 0.05)];
        let bytes = renderer().render_bytes(&records).unwrap();

        let strings = read_part(&bytes, "xl/sharedStrings.xml");
        for expected in ["Ticker", "Predicted Price ($)", "Expected Growth (%)", "AAA", "100.00", "5.0"] {
            assert!(strings.contains(&format!(">{expected}<")), "missing {expected}");
        }

        let workbook = read_part(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="Predictions""#));

        let styles = read_part(&bytes, "xl/styles.xml");
        assert!(styles.contains("FF1A1A2E"));
    }

    #[test]
    fn empty_records_produce_header_only() {
        let bytes = renderer().render_bytes(&[]).unwrap();
        let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"<row r="1""#));
        assert!(!sheet.contains(r#"<row r="2""#));
    }

    #[test]
    fn output_is_deterministic_for_fixed_clock() {
        let records = vec![
            PredictionRecord::new("AAA", 1.5, 0.01),
            PredictionRecord::new("BBB", 2.25, -0.2),
        ];
        let a = renderer().render_bytes(&records).unwrap();
        let b = renderer().render_bytes(&records).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_record_writes_nothing() {
        let mut sink: Vec<u8> = Vec::new();
        let records = vec![PredictionRecord::new("", 1.0, 0.0)];
        let err = renderer().render(&records, &mut sink).unwrap_err();
        assert!(matches!(err, RenderFailure::InvalidRecord(_)));
        assert!(sink.is_empty());
    }
}
