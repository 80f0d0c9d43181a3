use flow_client::domain::AggregatedSeries;
use time::format_description::well_known::Rfc3339;

use super::ReportError;

/// Aggregated series as CSV: `Timestamp` then one column per numeric column.
/// Periods without a value for a column leave the cell blank.
pub fn render_series_csv(series: &AggregatedSeries) -> Result<Vec<u8>, ReportError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["Timestamp".to_string()];
    header.extend(series.columns().iter().map(|c| c.header().to_string()));
    wtr.write_record(&header)?;

    for row in series.rows() {
        let ts = row
            .period_ts
            .format(&Rfc3339)
            .map_err(|e| ReportError::Format(e.to_string()))?;
        let mut record = vec![ts];
        record.extend(row.means.iter().map(|m| m.map(|v| v.to_string()).unwrap_or_default()));
        wtr.write_record(&record)?;
    }

    wtr.into_inner().map_err(|e| ReportError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_client::domain::{AggregatedRow, NumericColumn};
    use time::macros::datetime;

    #[test]
    fn writes_header_and_blank_missing_cells() {
        let series = AggregatedSeries::new(
            vec![NumericColumn::FlowRate, NumericColumn::Temperature],
            vec![AggregatedRow {
                period_ts: datetime!(2023-01-01 00:00:00 UTC),
                means: vec![Some(1234.5), None],
            }],
        );
        let out = String::from_utf8(render_series_csv(&series).unwrap()).unwrap();
        assert_eq!(out, "Timestamp,Flow_Rate,Temperature\n2023-01-01T00:00:00Z,1234.5,\n");
    }

    #[test]
    fn empty_series_is_header_only() {
        let series = AggregatedSeries::new(vec![NumericColumn::Pressure], Vec::new());
        let out = String::from_utf8(render_series_csv(&series).unwrap()).unwrap();
        assert_eq!(out, "Timestamp,Pressure\n");
    }
}
