use flow_client::domain::{AggregatedSeries, NumericColumn};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point, Rgb,
};

use super::{
    chart::{bounds, chart_title, padded},
    format_date,
    summary::ReportSummary,
    ReportError,
};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_TOP: f32 = 20.0;
const MARGIN_BOTTOM: f32 = 15.0;
const LINE_STEP: f32 = 10.0;
const BODY_SIZE: f32 = 12.0;
const TITLE_SIZE: f32 = 16.0;
const CHART_H: f32 = 80.0;
const CHART_LEFT: f32 = 30.0;
const CHART_RIGHT: f32 = 190.0;

fn pdf_err(e: printpdf::Error) -> ReportError {
    ReportError::Pdf(e.to_string())
}

/// Rough Helvetica text width in mm, good enough for centring.
fn text_width_mm(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5 * 0.3528
}

fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn polyline(points: &[(f32, f32)], closed: bool) -> Line {
    Line {
        points: points.iter().map(|&(x, y)| (Point::new(Mm(x), Mm(y)), false)).collect(),
        is_closed: closed,
    }
}

struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Report");
        let layer = doc.get_page(page).get_layer(layer);
        let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;
        Ok(Self {
            doc,
            layer,
            font,
            bold,
            y: PAGE_H - MARGIN_TOP,
        })
    }

    /// Start a new page when fewer than `needed` mm remain.
    fn reserve(&mut self, needed: f32) {
        if self.y - needed >= MARGIN_BOTTOM {
            return;
        }
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Report");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_H - MARGIN_TOP;
    }

    fn line(&mut self, text: &str) {
        self.reserve(LINE_STEP);
        self.layer.use_text(text, BODY_SIZE, Mm(20.0), Mm(self.y), &self.font);
        self.y -= LINE_STEP;
    }

    fn centered(&mut self, text: &str, size: f32) {
        self.reserve(LINE_STEP);
        let x = ((PAGE_W - text_width_mm(text, size)) / 2.0).max(10.0);
        self.layer.use_text(text, size, Mm(x), Mm(self.y), &self.bold);
        self.y -= LINE_STEP;
    }

    fn gap(&mut self) {
        self.y -= LINE_STEP;
    }

    /// Vector line chart of one column below the cursor.
    fn chart(&mut self, series: &AggregatedSeries, column: &NumericColumn) {
        let points: Vec<(f64, f64)> = series
            .points(column)
            .into_iter()
            .map(|(ts, v)| (ts.unix_timestamp() as f64, v))
            .collect();
        let (Some((x_lo, x_hi)), Some((y_lo, y_hi))) = (
            bounds(points.iter().map(|p| p.0)),
            bounds(points.iter().map(|p| p.1)),
        ) else {
            return;
        };
        let (x_min, x_max) = padded(x_lo, x_hi, 86_400.0);
        let (y_min, y_max) = padded(y_lo, y_hi, 1.0);

        self.reserve(CHART_H + 2.0 * LINE_STEP);
        let title = chart_title(column);
        self.layer.use_text(
            title.as_str(),
            BODY_SIZE,
            Mm(((PAGE_W - text_width_mm(&title, BODY_SIZE)) / 2.0).max(10.0)),
            Mm(self.y),
            &self.font,
        );
        self.y -= 5.0;

        let top = self.y;
        let bottom = top - CHART_H;
        let to_page = |x: f64, y: f64| -> (f32, f32) {
            let px = CHART_LEFT as f64 + (x - x_min) / (x_max - x_min) * (CHART_RIGHT - CHART_LEFT) as f64;
            let py = bottom as f64 + (y - y_min) / (y_max - y_min) * CHART_H as f64;
            (px as f32, py as f32)
        };

        self.layer.set_outline_color(rgb(0.4, 0.4, 0.4));
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(polyline(
            &[(CHART_LEFT, bottom), (CHART_RIGHT, bottom), (CHART_RIGHT, top), (CHART_LEFT, top)],
            true,
        ));

        let axis_size = 8.0;
        self.layer.use_text(format!("{y_max:.1}"), axis_size, Mm(10.0), Mm(top - 3.0), &self.font);
        self.layer.use_text(format!("{y_min:.1}"), axis_size, Mm(10.0), Mm(bottom), &self.font);
        if let (Ok(first), Ok(last)) = (
            time::OffsetDateTime::from_unix_timestamp(x_lo as i64),
            time::OffsetDateTime::from_unix_timestamp(x_hi as i64),
        ) {
            let (fx, _) = to_page(x_lo, y_min);
            let (lx, _) = to_page(x_hi, y_min);
            self.layer.use_text(format_date(first), axis_size, Mm(fx - 8.0), Mm(bottom - 5.0), &self.font);
            if points.len() > 1 {
                self.layer.use_text(format_date(last), axis_size, Mm(lx - 8.0), Mm(bottom - 5.0), &self.font);
            }
        }

        let mapped: Vec<(f32, f32)> = points.iter().map(|&(x, y)| to_page(x, y)).collect();
        self.layer.set_outline_color(rgb(0.1, 0.3, 0.8));
        self.layer.set_outline_thickness(1.2);
        if mapped.len() > 1 {
            self.layer.add_line(polyline(&mapped, false));
        }
        for &(x, y) in &mapped {
            let m = 0.8;
            self.layer.add_line(polyline(
                &[(x - m, y - m), (x + m, y - m), (x + m, y + m), (x - m, y + m)],
                true,
            ));
        }

        self.y = bottom - 2.0 * LINE_STEP;
    }

    fn finish(self) -> Result<Vec<u8>, ReportError> {
        self.doc.save_to_bytes().map_err(pdf_err)
    }
}

/// Render the report document.
///
/// Layout: title, range and period lines, average values, then the flow
/// rate chart when flow data exists. Without data the body says so and no
/// chart is drawn.
pub fn render_pdf(summary: &ReportSummary, series: &AggregatedSeries) -> Result<Vec<u8>, ReportError> {
    let mut w = PageWriter::new(&summary.title)?;

    w.centered(&summary.title, TITLE_SIZE);
    w.gap();
    for line in summary.body_lines() {
        w.line(&line);
    }

    if summary.has_data() && !series.points(&NumericColumn::FlowRate).is_empty() {
        w.gap();
        w.centered("Analysis Charts", BODY_SIZE);
        w.gap();
        w.chart(series, &NumericColumn::FlowRate);
    }

    w.gap();
    w.centered("End of Report", BODY_SIZE);
    w.finish()
}
