pub mod chart;
pub mod pdf;
pub mod series_csv;
pub mod summary;

use std::{fs, path::PathBuf};

use flow_client::domain::{AggregatedSeries, PeriodCode};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

use crate::config::ReportConfig;

pub use summary::ReportSummary;

const TS_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day] [hour]:[minute]");
const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("timestamp formatting error: {0}")]
    Format(String),
    #[error("chart rendering error: {0}")]
    Chart(String),
    #[error("pdf rendering error: {0}")]
    Pdf(String),
}

pub(crate) fn format_ts(ts: OffsetDateTime) -> String {
    ts.format(TS_FORMAT).unwrap_or_else(|_| ts.to_string())
}

pub(crate) fn format_date(ts: OffsetDateTime) -> String {
    ts.format(DATE_FORMAT).unwrap_or_else(|_| ts.to_string())
}

/// Files produced by one report run.
#[derive(Debug, Clone, Default)]
pub struct ReportArtifacts {
    pub pdf: PathBuf,
    pub charts: Vec<PathBuf>,
    pub series_csv: Option<PathBuf>,
}

/// Write the PDF report plus, when enabled, one SVG chart per numeric
/// column and the aggregated series as CSV into `cfg.output_dir`.
///
/// An empty series still yields a PDF stating there is no data; charts are
/// skipped.
pub fn write_report(
    cfg: &ReportConfig,
    series: &AggregatedSeries,
    range_start: OffsetDateTime,
    range_end: OffsetDateTime,
    period: PeriodCode,
) -> Result<ReportArtifacts, ReportError> {
    fs::create_dir_all(&cfg.output_dir)?;
    let mut artifacts = ReportArtifacts::default();

    if cfg.write_charts {
        for column in series.columns() {
            let Some(svg) = chart::render_svg(series, column)? else {
                tracing::debug!(column = %column, "no values, chart skipped");
                continue;
            };
            let path = cfg.output_dir.join(chart::chart_file_name(column));
            fs::write(&path, svg)?;
            artifacts.charts.push(path);
        }
    }

    if cfg.write_series_csv {
        let path = cfg.output_dir.join("aggregated_series.csv");
        fs::write(&path, series_csv::render_series_csv(series)?)?;
        artifacts.series_csv = Some(path);
    }

    let summary = ReportSummary::from_series(&cfg.title, series, range_start, range_end, period);
    let path = cfg.output_dir.join(&cfg.pdf_file);
    fs::write(&path, pdf::render_pdf(&summary, series)?)?;
    artifacts.pdf = path;

    tracing::info!(
        pdf = %artifacts.pdf.display(),
        charts = artifacts.charts.len(),
        periods = series.len(),
        "report written"
    );
    Ok(artifacts)
}
