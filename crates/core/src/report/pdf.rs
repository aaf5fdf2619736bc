//! Single-page PDF predictions report.
//!
//! Layers are painted back to front: background, ornaments, title, table
//! bands, grid, footer. Layout is computed in top-down page points and
//! flipped into PDF user space when drawn.

use chrono::{DateTime, Datelike, Utc};
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::prediction::PredictionRecord;
use crate::report::error::RenderFailure;
use crate::report::model::{
    compute_table_geometry, derive_display_rows, ColumnAlign, DisplayRow, PageLayout, TableGeometry,
    TableLayout, COLUMNS,
};
use crate::report::ornament::{place_ornaments, Ornament, OrnamentField};
use crate::report::text::{encode_win_ansi, text_width, ASCENT, UNDERLINE_OFFSET, UNDERLINE_THICKNESS};
use crate::report::{ReportFormat, ReportRenderer};

const FONT: Name<'static> = Name(b"F1");
const GS_ORNAMENT_FILL: Name<'static> = Name(b"GsOrnamentFill");
const GS_ORNAMENT_RING: Name<'static> = Name(b"GsOrnamentRing");
const GS_ROW: Name<'static> = Name(b"GsRow");

const BACKGROUND: u32 = 0x1A1A2E;
const HEADER_FILL: u32 = 0x16213E;
const BAND_EVEN: u32 = 0x1E1E36;
const BAND_ODD: u32 = 0x1A1A2E;
const INK: u32 = 0xFFFFFF;

const ORNAMENT_RADIUS: f32 = 10.0;
const ORNAMENT_RING_RADIUS: f32 = 15.0;
const ORNAMENT_FILL_ALPHA: f32 = 0.7;
const ORNAMENT_RING_ALPHA: f32 = 0.3;
const ROW_ALPHA: f32 = 0.8;

const TITLE_SIZE: f32 = 20.0;
const TABLE_TEXT_SIZE: f32 = 12.0;
const FOOTER_SIZE: f32 = 10.0;
const CELL_PADDING: f32 = 5.0;
const GRID_WIDTH: f32 = 1.0;

/// Bezier handle length for a quarter circle.
const KAPPA: f32 = 0.552_284_8;

#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    page: PageLayout,
    table: TableLayout,
    brand: String,
    generated_at: DateTime<Utc>,
    ornament_seed: Option<u64>,
}

impl DocumentRenderer {
    pub fn new(brand: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            page: PageLayout::A4,
            table: TableLayout::default(),
            brand: brand.into(),
            generated_at,
            ornament_seed: None,
        }
    }

    /// Fixes the ornament RNG seed so every render lays out identically.
    pub fn with_ornament_seed(mut self, seed: Option<u64>) -> Self {
        self.ornament_seed = seed;
        self
    }

    pub fn max_rows(&self) -> usize {
        self.table.max_rows(&self.page)
    }

    pub fn title(&self) -> String {
        format!("{} Predictions", self.brand)
    }

    pub fn footer(&self) -> String {
        format!("© {} {}. All rights reserved.", self.generated_at.year(), self.brand)
    }

    fn ornament_rng(&self) -> StdRng {
        match self.ornament_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn draw(&self, rows: &[DisplayRow], geometry: &TableGeometry, ornaments: &[Ornament]) -> Vec<u8> {
        let mut canvas = Canvas::new(self.page.height);

        canvas.fill_rect(0.0, 0.0, self.page.width, self.page.height, BACKGROUND);
        self.draw_ornaments(&mut canvas, ornaments);
        self.draw_title(&mut canvas);
        self.draw_table(&mut canvas, rows, geometry);
        self.draw_grid(&mut canvas, rows.len(), geometry);
        self.draw_footer(&mut canvas, geometry);

        canvas.finish()
    }

    fn draw_ornaments(&self, canvas: &mut Canvas, ornaments: &[Ornament]) {
        canvas.content.save_state();
        for ornament in ornaments {
            let color = ornament.color();

            canvas.content.set_parameters(GS_ORNAMENT_FILL);
            canvas.set_fill(color);
            canvas.circle(ornament.x, ornament.y, ORNAMENT_RADIUS);
            canvas.content.fill_nonzero();

            canvas.content.set_parameters(GS_ORNAMENT_RING);
            canvas.set_stroke(color);
            canvas.content.set_line_width(GRID_WIDTH);
            canvas.circle(ornament.x, ornament.y, ORNAMENT_RING_RADIUS);
            canvas.content.stroke();
        }
        canvas.content.restore_state();
    }

    fn draw_title(&self, canvas: &mut Canvas) {
        let title = self.title();
        let width = text_width(&title, TITLE_SIZE);
        let x = self.page.margin + (self.page.content_width() - width) / 2.0;
        let top = self.page.margin;

        canvas.text(x, top, TITLE_SIZE, &title, INK);

        let underline_y = top + ASCENT * TITLE_SIZE + UNDERLINE_OFFSET * TITLE_SIZE;
        canvas.set_stroke(INK);
        canvas.content.set_line_width(UNDERLINE_THICKNESS * TITLE_SIZE);
        canvas.line(x, underline_y, x + width, underline_y);
    }

    fn draw_table(&self, canvas: &mut Canvas, rows: &[DisplayRow], geometry: &TableGeometry) {
        let t = &self.table;

        canvas.fill_rect(t.left, t.top, geometry.table_width, t.row_height, HEADER_FILL);
        let labels = COLUMNS.map(|c| c.label);
        self.draw_cells(canvas, t.top, labels);

        let mut y = t.top + t.row_height;
        for (index, row) in rows.iter().enumerate() {
            let band = band_color(index);
            canvas.content.save_state();
            canvas.content.set_parameters(GS_ROW);
            canvas.fill_rect(t.left, y, geometry.table_width, t.row_height, band);
            canvas.content.restore_state();

            self.draw_cells(canvas, y, row.cells());
            y += t.row_height;
        }
    }

    fn draw_cells(&self, canvas: &mut Canvas, row_top: f32, cells: [&str; 3]) {
        let edges = self.table.column_edges();
        for (i, cell) in cells.iter().enumerate() {
            let size = self.cell_font_size(i, cell);
            let x = match COLUMNS[i].align {
                ColumnAlign::Left => edges[i] + CELL_PADDING,
                ColumnAlign::Right => edges[i + 1] - CELL_PADDING - text_width(cell, size),
            };
            canvas.text(x, row_top + CELL_PADDING, size, cell, INK);
        }
    }

    /// Table font size, shrunk so `text` stays inside column `col`.
    fn cell_font_size(&self, col: usize, text: &str) -> f32 {
        let available = self.table.col_widths[col] - 2.0 * CELL_PADDING;
        fit_size(text, TABLE_TEXT_SIZE, available)
    }

    fn draw_grid(&self, canvas: &mut Canvas, row_count: usize, geometry: &TableGeometry) {
        let t = &self.table;
        canvas.set_stroke(INK);
        canvas.content.set_line_width(GRID_WIDTH);

        for x in t.column_edges() {
            canvas.line(x, t.top, x, geometry.table_bottom);
        }

        let right = t.left + geometry.table_width;
        for i in 0..=row_count + 1 {
            let y = t.top + t.row_height * i as f32;
            canvas.line(t.left, y, right, y);
        }
    }

    fn draw_footer(&self, canvas: &mut Canvas, geometry: &TableGeometry) {
        let footer = self.footer();
        let available = self.page.content_width();
        let size = fit_size(&footer, FOOTER_SIZE, available);
        let width = text_width(&footer, size);
        let x = self.page.margin + (available - width) / 2.0;
        canvas.text(x, geometry.footer_y, size, &footer, INK);
    }

    fn assemble(&self, content: &[u8]) -> Vec<u8> {
        let catalog_id = Ref::new(1);
        let page_tree_id = Ref::new(2);
        let page_id = Ref::new(3);
        let content_id = Ref::new(4);
        let font_id = Ref::new(5);
        let gs_ornament_fill_id = Ref::new(6);
        let gs_ornament_ring_id = Ref::new(7);
        let gs_row_id = Ref::new(8);
        let info_id = Ref::new(9);

        let mut pdf = Pdf::new();

        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.pages(page_tree_id).kids([page_id]).count(1);

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, self.page.width, self.page.height));
        page.parent(page_tree_id);
        page.contents(content_id);
        let mut resources = page.resources();
        resources.fonts().pair(FONT, font_id);
        resources
            .ext_g_states()
            .pair(GS_ORNAMENT_FILL, gs_ornament_fill_id)
            .pair(GS_ORNAMENT_RING, gs_ornament_ring_id)
            .pair(GS_ROW, gs_row_id);
        resources.finish();
        page.finish();

        pdf.type1_font(font_id)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        pdf.ext_graphics(gs_ornament_fill_id)
            .non_stroking_alpha(ORNAMENT_FILL_ALPHA);
        pdf.ext_graphics(gs_ornament_ring_id)
            .stroking_alpha(ORNAMENT_RING_ALPHA);
        pdf.ext_graphics(gs_row_id).non_stroking_alpha(ROW_ALPHA);

        let title = self.title();
        pdf.document_info(info_id)
            .title(TextStr(&title))
            .producer(TextStr("stocksource"));

        pdf.stream(content_id, content);
        pdf.finish()
    }
}

impl ReportRenderer for DocumentRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Pdf
    }

    fn render_bytes(&self, records: &[PredictionRecord]) -> Result<Vec<u8>, RenderFailure> {
        let rows = derive_display_rows(records)?;

        let max_rows = self.max_rows();
        if rows.len() > max_rows {
            return Err(RenderFailure::LayoutOverflow {
                rows: rows.len(),
                max_rows,
            });
        }

        let geometry = compute_table_geometry(rows.len(), &self.page, &self.table);
        let field = OrnamentField::for_page(&self.page, &self.table);
        let ornaments = place_ornaments(&field, &mut self.ornament_rng());

        let content = self.draw(&rows, &geometry, &ornaments);
        Ok(self.assemble(&content))
    }
}

/// Content stream builder working in top-down coordinates.
struct Canvas {
    content: Content,
    page_height: f32,
}

impl Canvas {
    fn new(page_height: f32) -> Self {
        Self {
            content: Content::new(),
            page_height,
        }
    }

    fn flip(&self, y: f32) -> f32 {
        self.page_height - y
    }

    fn set_fill(&mut self, hex: u32) {
        let (r, g, b) = rgb(hex);
        self.content.set_fill_rgb(r, g, b);
    }

    fn set_stroke(&mut self, hex: u32) {
        let (r, g, b) = rgb(hex);
        self.content.set_stroke_rgb(r, g, b);
    }

    fn fill_rect(&mut self, x: f32, top: f32, width: f32, height: f32, hex: u32) {
        self.set_fill(hex);
        let bottom = self.flip(top + height);
        self.content.rect(x, bottom, width, height);
        self.content.fill_nonzero();
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let (y1, y2) = (self.flip(y1), self.flip(y2));
        self.content.move_to(x1, y1);
        self.content.line_to(x2, y2);
        self.content.stroke();
    }

    /// Appends a closed circle path; the caller fills or strokes it.
    fn circle(&mut self, cx: f32, cy: f32, r: f32) {
        let cy = self.flip(cy);
        let k = r * KAPPA;
        let c = &mut self.content;
        c.move_to(cx + r, cy);
        c.cubic_to(cx + r, cy + k, cx + k, cy + r, cx, cy + r);
        c.cubic_to(cx - k, cy + r, cx - r, cy + k, cx - r, cy);
        c.cubic_to(cx - r, cy - k, cx - k, cy - r, cx, cy - r);
        c.cubic_to(cx + k, cy - r, cx + r, cy - k, cx + r, cy);
        c.close_path();
    }

    /// Draws one line of text whose line box starts at `top`.
    fn text(&mut self, x: f32, top: f32, size: f32, text: &str, hex: u32) {
        let baseline = self.flip(top + ASCENT * size);
        let encoded = encode_win_ansi(text);
        self.set_fill(hex);
        self.content.begin_text();
        self.content.set_font(FONT, size);
        self.content.next_line(x, baseline);
        self.content.show(Str(&encoded));
        self.content.end_text();
    }

    fn finish(self) -> Vec<u8> {
        self.content.finish()
    }
}

/// Largest size up to `size` at which `text` is no wider than `available`.
fn fit_size(text: &str, size: f32, available: f32) -> f32 {
    let natural = text_width(text, size);
    if natural > available {
        size * available / natural
    } else {
        size
    }
}

fn band_color(index: usize) -> u32 {
    if index % 2 == 0 {
        BAND_EVEN
    } else {
        BAND_ODD
    }
}

fn rgb(hex: u32) -> (f32, f32, f32) {
    let channel = |shift: u32| ((hex >> shift) & 0xFF) as f32 / 255.0;
    (channel(16), channel(8), channel(0))
}
