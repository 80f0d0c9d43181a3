use flow_client::domain::{AggregatedSeries, NumericColumn};
use plotters::prelude::*;
use time::OffsetDateTime;

use super::{format_date, ReportError};

const WIDTH: u32 = 900;
const HEIGHT: u32 = 500;

pub fn chart_title(column: &NumericColumn) -> String {
    match column {
        NumericColumn::FlowRate => "Crude Oil Flow Rate Over Time".to_string(),
        other => format!("{} Over Time", other.label()),
    }
}

pub fn axis_label(column: &NumericColumn) -> String {
    match column.unit() {
        Some(unit) => format!("{} ({unit})", column.label()),
        None => column.label(),
    }
}

/// File name for a column's chart, e.g. `flow_rate_chart.svg`.
pub fn chart_file_name(column: &NumericColumn) -> String {
    let stem: String = column
        .header()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{stem}_chart.svg")
}

/// Pad a degenerate or tight axis range so single points stay visible.
pub(crate) fn padded(min: f64, max: f64, min_pad: f64) -> (f64, f64) {
    let pad = ((max - min) * 0.1).max(min_pad);
    (min - pad, max + pad)
}

pub(crate) fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn chart_err<E: std::fmt::Display>(e: E) -> ReportError {
    ReportError::Chart(e.to_string())
}

fn axis_date(secs: f64) -> String {
    OffsetDateTime::from_unix_timestamp(secs.round() as i64)
        .map(format_date)
        .unwrap_or_default()
}

/// Line chart of one column against the period timestamps, as SVG.
///
/// Returns `None` when the column has no values in the series.
pub fn render_svg(series: &AggregatedSeries, column: &NumericColumn) -> Result<Option<String>, ReportError> {
    let points: Vec<(f64, f64)> = series
        .points(column)
        .into_iter()
        .map(|(ts, v)| (ts.unix_timestamp() as f64, v))
        .collect();

    let (Some((x_lo, x_hi)), Some((y_lo, y_hi))) = (
        bounds(points.iter().map(|p| p.0)),
        bounds(points.iter().map(|p| p.1)),
    ) else {
        return Ok(None);
    };
    let (x_min, x_max) = padded(x_lo, x_hi, 86_400.0);
    let (y_min, y_max) = padded(y_lo, y_hi, 1.0);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(chart_title(column), ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .x_desc("Timestamp")
            .y_desc(axis_label(column))
            .x_labels(6)
            .x_label_formatter(&|x: &f64| axis_date(*x))
            .draw()
            .map_err(chart_err)?;

        chart
            .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
            .map_err(chart_err)?;
        chart
            .draw_series(points.iter().map(|&p| Circle::new(p, 3, BLUE.filled())))
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }

    Ok(Some(svg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_client::domain::AggregatedRow;
    use time::macros::datetime;

    fn series() -> AggregatedSeries {
        AggregatedSeries::new(
            vec![NumericColumn::FlowRate, NumericColumn::Pressure],
            vec![
                AggregatedRow {
                    period_ts: datetime!(2023-01-01 00:00:00 UTC),
                    means: vec![Some(2100.0), None],
                },
                AggregatedRow {
                    period_ts: datetime!(2023-04-03 00:00:00 UTC),
                    means: vec![Some(2900.0), None],
                },
            ],
        )
    }

    #[test]
    fn renders_svg_for_column_with_values() {
        let svg = render_svg(&series(), &NumericColumn::FlowRate).unwrap().unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Crude Oil Flow Rate Over Time"));
    }

    #[test]
    fn column_without_values_has_no_chart() {
        assert!(render_svg(&series(), &NumericColumn::Pressure).unwrap().is_none());
        assert!(render_svg(&series(), &NumericColumn::Temperature).unwrap().is_none());
    }

    #[test]
    fn single_point_gets_padded_range() {
        assert_eq!(padded(5.0, 5.0, 1.0), (4.0, 6.0));
        assert_eq!(padded(0.0, 100.0, 1.0), (-10.0, 110.0));
    }

    #[test]
    fn file_names_are_sanitised() {
        assert_eq!(chart_file_name(&NumericColumn::FlowRate), "flow_rate_chart.svg");
        assert_eq!(
            chart_file_name(&NumericColumn::Other("Water Cut %".to_string())),
            "water_cut___chart.svg"
        );
        assert_eq!(axis_label(&NumericColumn::Pressure), "Pressure (bar)");
    }
}
