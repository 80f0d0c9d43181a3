use flow_client::domain::{AggregatedSeries, NumericColumn, PeriodCode};
use time::OffsetDateTime;

use super::format_ts;

pub const NO_DATA_LINE: &str = "No data available for the selected date range.";

/// Text content of a report: headline and per-column averages.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub title: String,
    pub range_line: String,
    pub period_line: String,
    /// One `Average ...` line per column with data; empty when there is no data.
    pub averages: Vec<String>,
    pub periods: usize,
}

impl ReportSummary {
    pub fn from_series(
        title: &str,
        series: &AggregatedSeries,
        range_start: OffsetDateTime,
        range_end: OffsetDateTime,
        period: PeriodCode,
    ) -> Self {
        let averages = series
            .column_means()
            .into_iter()
            .filter_map(|(column, mean)| mean.map(|m| average_line(&column, m)))
            .collect();

        Self {
            title: title.to_string(),
            range_line: format!("Date range: {} to {}", format_ts(range_start), format_ts(range_end)),
            period_line: format!("Comparison period: {} ({} periods)", period, series.len()),
            averages,
            periods: series.len(),
        }
    }

    pub fn has_data(&self) -> bool {
        self.periods > 0
    }

    /// Lines as printed under the title.
    pub fn body_lines(&self) -> Vec<String> {
        let mut lines = vec![self.range_line.clone(), self.period_line.clone()];
        if self.has_data() {
            lines.extend(self.averages.iter().cloned());
        } else {
            lines.push(NO_DATA_LINE.to_string());
        }
        lines
    }
}

pub fn average_line(column: &NumericColumn, mean: f64) -> String {
    match column.unit() {
        Some(unit) => format!("Average {}: {mean:.2} {unit}", column.label()),
        None => format!("Average {}: {mean:.2}", column.label()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_client::domain::AggregatedRow;
    use time::macros::datetime;

    #[test]
    fn averages_use_aggregated_rows() {
        let series = AggregatedSeries::new(
            vec![
                NumericColumn::FlowRate,
                NumericColumn::Pressure,
                NumericColumn::Temperature,
                NumericColumn::Other("Water_Cut".to_string()),
            ],
            vec![
                AggregatedRow {
                    period_ts: datetime!(2023-01-01 00:00:00 UTC),
                    means: vec![Some(1000.0), Some(80.0), Some(30.0), None],
                },
                AggregatedRow {
                    period_ts: datetime!(2023-04-01 00:00:00 UTC),
                    means: vec![Some(2000.5), Some(90.0), Some(31.0), None],
                },
            ],
        );
        let summary = ReportSummary::from_series(
            "Crude Flow Monitoring Report",
            &series,
            datetime!(2023-01-01 00:00:00 UTC),
            datetime!(2023-06-30 00:00:00 UTC),
            PeriodCode::Quarter,
        );

        assert_eq!(
            summary.averages,
            vec![
                "Average Flow Rate: 1500.25 BPD".to_string(),
                "Average Pressure: 85.00 bar".to_string(),
                "Average Temperature: 30.50 degC".to_string(),
            ]
        );
        assert_eq!(summary.range_line, "Date range: 2023-01-01 00:00 to 2023-06-30 00:00");
        assert_eq!(summary.period_line, "Comparison period: 3 Months (2 periods)");
    }

    #[test]
    fn empty_series_reports_no_data() {
        let series = AggregatedSeries::new(vec![NumericColumn::FlowRate], Vec::new());
        let summary = ReportSummary::from_series(
            "Report",
            &series,
            datetime!(2024-01-01 00:00:00 UTC),
            datetime!(2024-02-01 00:00:00 UTC),
            PeriodCode::Annual,
        );
        assert!(!summary.has_data());
        assert!(summary.averages.is_empty());
        assert_eq!(summary.body_lines().last().map(String::as_str), Some(NO_DATA_LINE));
    }

    #[test]
    fn other_columns_have_no_unit() {
        assert_eq!(
            average_line(&NumericColumn::Other("Density".to_string()), 0.8512),
            "Average Density: 0.85"
        );
    }
}
