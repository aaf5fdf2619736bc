//! Display values and table geometry shared by both renderers. Pure, no I/O.

use crate::domain::prediction::PredictionRecord;
use crate::report::error::InvalidRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAlign {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub label: &'static str,
    pub align: ColumnAlign,
}

pub const COLUMNS: [Column; 3] = [
    Column {
        label: "Ticker",
        align: ColumnAlign::Left,
    },
    Column {
        label: "Predicted Price ($)",
        align: ColumnAlign::Right,
    },
    Column {
        label: "Expected Growth (%)",
        align: ColumnAlign::Right,
    },
];

/// Display strings for one table row. No currency or percent symbols; the
/// column headers carry the units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub ticker: String,
    pub price_text: String,
    pub growth_text: String,
}

impl DisplayRow {
    pub fn cells(&self) -> [&str; 3] {
        [&self.ticker, &self.price_text, &self.growth_text]
    }
}

/// Formats a record for display.
///
/// Rounding is the correctly rounded decimal form of the stored `f64`, so a
/// literal like `100.005` (stored just below the midpoint) prints `100.00`.
pub fn derive_display_row(index: usize, record: &PredictionRecord) -> Result<DisplayRow, InvalidRecord> {
    let invalid = |reason: &str| InvalidRecord {
        index,
        ticker: record.ticker.clone(),
        reason: reason.to_string(),
    };

    if record.ticker.trim().is_empty() {
        return Err(invalid("ticker must be non-empty"));
    }
    if !record.price_predicted.is_finite() {
        return Err(invalid("price must be finite"));
    }
    if record.price_predicted < 0.0 {
        return Err(invalid("price must be non-negative"));
    }
    if !record.expected_growth.is_finite() {
        return Err(invalid("expected growth must be finite"));
    }

    // abs() folds -0.0 into 0.0 so the text never starts with a sign.
    let price = record.price_predicted.abs();

    Ok(DisplayRow {
        ticker: record.ticker.clone(),
        price_text: format!("{price:.2}"),
        growth_text: format!("{:.1}", record.expected_growth * 100.0),
    })
}

/// Derives every row up front; the first invalid record aborts the report.
pub fn derive_display_rows(records: &[PredictionRecord]) -> Result<Vec<DisplayRow>, InvalidRecord> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| derive_display_row(i, r))
        .collect()
}

/// Page canvas in PDF points, measured from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageLayout {
    pub const A4: PageLayout = PageLayout {
        width: 595.28,
        height: 841.89,
        margin: 50.0,
    };

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::A4
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableLayout {
    pub left: f32,
    pub top: f32,
    pub row_height: f32,
    pub col_widths: [f32; 3],
    /// Space between the last row and the footer line.
    pub footer_gap: f32,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            left: 100.0,
            top: 100.0,
            row_height: 20.0,
            col_widths: [100.0, 150.0, 150.0],
            footer_gap: 30.0,
        }
    }
}

impl TableLayout {
    /// Left edge of every column plus the right edge of the last one.
    pub fn column_edges(&self) -> [f32; 4] {
        let mut edges = [self.left; 4];
        for (i, w) in self.col_widths.iter().enumerate() {
            edges[i + 1] = edges[i] + w;
        }
        edges
    }

    /// Most data rows that still leave room for the footer on one page.
    pub fn max_rows(&self, page: &PageLayout) -> usize {
        let usable = page.height - page.margin - self.footer_gap - self.top;
        let rows = (usable / self.row_height).floor() as i64 - 1;
        rows.max(0) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableGeometry {
    pub table_width: f32,
    pub table_bottom: f32,
    pub footer_y: f32,
}

/// Table extent for `record_count` data rows plus the header row.
pub fn compute_table_geometry(record_count: usize, page: &PageLayout, table: &TableLayout) -> TableGeometry {
    let table_width: f32 = table.col_widths.iter().sum();
    let table_bottom = table.top + table.row_height * (record_count as f32 + 1.0);
    let footer_y = (page.height - page.margin).min(table_bottom + table.footer_gap);

    TableGeometry {
        table_width,
        table_bottom,
        footer_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_two_decimal(s: &str) -> bool {
        let Some((int, frac)) = s.split_once('.') else {
            return false;
        };
        !int.is_empty()
            && int.bytes().all(|b| b.is_ascii_digit())
            && frac.len() == 2
            && frac.bytes().all(|b| b.is_ascii_digit())
    }

    #[test]
    fn formats_price_and_growth() {
        let row = derive_display_row(0, &PredictionRecord::new("AAA", 100.005, 0.05)).unwrap();
        assert_eq!(row.ticker, "AAA");
        assert_eq!(row.price_text, "100.00");
        assert_eq!(row.growth_text, "5.0");
    }

    #[test]
    fn growth_keeps_sign() {
        let row = derive_display_row(0, &PredictionRecord::new("XOM", 1.0, -0.023)).unwrap();
        assert_eq!(row.growth_text, "-2.3");
    }

    #[test]
    fn price_text_always_has_two_decimals() {
        let prices = [0.0, -0.0, 0.004, 0.005, 1.0, 9.999, 12.345, 1234.5, 99_999_999.99, 1e15];
        for p in prices {
            let row = derive_display_row(0, &PredictionRecord::new("T", p, 0.0)).unwrap();
            assert!(is_two_decimal(&row.price_text), "{p} -> {}", row.price_text);
        }
    }

    #[test]
    fn rejects_empty_ticker() {
        let records = vec![
            PredictionRecord::new("AAA", 1.0, 0.1),
            PredictionRecord::new("  ", 1.0, 0.1),
        ];
        let err = derive_display_rows(&records).unwrap_err();
        assert_eq!(err.index, 1);
    }

    #[test]
    fn rejects_bad_prices_and_growth() {
        for (price, growth) in [(f64::NAN, 0.0), (f64::INFINITY, 0.0), (-0.01, 0.0), (1.0, f64::NAN)] {
            let r = PredictionRecord::new("AAA", price, growth);
            assert!(derive_display_row(0, &r).is_err(), "{price} {growth}");
        }
    }

    #[test]
    fn geometry_tracks_record_count() {
        let page = PageLayout::A4;
        let table = TableLayout::default();
        for n in 0..=20 {
            let g = compute_table_geometry(n, &page, &table);
            assert!(g.table_bottom > table.top);
            assert!(g.footer_y <= page.height - page.margin);
            assert_eq!(g.table_width, 400.0);
        }

        let empty = compute_table_geometry(0, &page, &table);
        assert_eq!(empty.table_bottom, 120.0);
        assert_eq!(empty.footer_y, 150.0);

        let full = compute_table_geometry(20, &page, &table);
        assert_eq!(full.table_bottom, 520.0);
        assert_eq!(full.footer_y, 550.0);
    }

    #[test]
    fn footer_clamps_to_bottom_margin() {
        let page = PageLayout::A4;
        let table = TableLayout::default();
        let g = compute_table_geometry(40, &page, &table);
        assert_eq!(g.footer_y, page.height - page.margin);
    }

    #[test]
    fn max_rows_leaves_room_for_footer() {
        let page = PageLayout::A4;
        let table = TableLayout::default();
        let max = table.max_rows(&page);
        assert_eq!(max, 32);
        let g = compute_table_geometry(max, &page, &table);
        assert!(g.table_bottom + table.footer_gap <= page.height - page.margin);
    }

    #[test]
    fn column_edges_accumulate_widths() {
        assert_eq!(TableLayout::default().column_edges(), [100.0, 200.0, 350.0, 500.0]);
    }
}
