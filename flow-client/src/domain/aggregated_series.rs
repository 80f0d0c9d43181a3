use time::OffsetDateTime;

use super::NumericColumn;

/// One non-empty period of an aggregated series.
///
/// `means` is aligned with [`AggregatedSeries::columns`]; an entry is `None`
/// when no member reading of the period carried that column.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub period_ts: OffsetDateTime,
    pub means: Vec<Option<f64>>,
}

/// Per-period means of every numeric column, ordered by `period_ts`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregatedSeries {
    columns: Vec<NumericColumn>,
    rows: Vec<AggregatedRow>,
}

impl AggregatedSeries {
    pub fn new(columns: Vec<NumericColumn>, rows: Vec<AggregatedRow>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[NumericColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[AggregatedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &NumericColumn) -> bool {
        self.columns.contains(column)
    }

    /// `(period_ts, mean)` pairs of one column, skipping periods without a value.
    pub fn points(&self, column: &NumericColumn) -> Vec<(OffsetDateTime, f64)> {
        let Some(idx) = self.columns.iter().position(|c| c == column) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row.means.get(idx).copied().flatten().map(|v| (row.period_ts, v)))
            .collect()
    }

    /// Overall mean of each column across the aggregated rows.
    ///
    /// This is a mean of period means, not of the raw readings.
    pub fn column_means(&self) -> Vec<(NumericColumn, Option<f64>)> {
        self.columns
            .iter()
            .map(|column| {
                let points = self.points(column);
                let mean = if points.is_empty() {
                    None
                } else {
                    Some(points.iter().map(|(_, v)| v).sum::<f64>() / points.len() as f64)
                };
                (column.clone(), mean)
            })
            .collect()
    }
}
