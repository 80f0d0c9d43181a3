use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::domain::{numeric_columns, AggregatedRow, AggregatedSeries, PeriodCode, Reading};

struct Bucket {
    first_ts: OffsetDateTime,
    sums: Vec<f64>,
    counts: Vec<u32>,
}

/// Resample readings into calendar periods of `period`, averaging every
/// numeric column.
///
/// Only readings with `range_start <= ts <= range_end` are considered. Each
/// non-empty period yields one row stamped with the earliest reading
/// timestamp that fell into it; empty periods are not emitted. Non-numeric
/// columns never take part. An empty input or an inverted range gives an
/// empty series.
pub fn aggregate(
    readings: &[Reading],
    range_start: OffsetDateTime,
    range_end: OffsetDateTime,
    period: PeriodCode,
) -> AggregatedSeries {
    let columns = numeric_columns(readings);
    let mut buckets: BTreeMap<i64, Bucket> = BTreeMap::new();

    for reading in readings
        .iter()
        .filter(|r| r.ts >= range_start && r.ts <= range_end)
    {
        let bucket = buckets
            .entry(period.bucket_index(reading.ts))
            .or_insert_with(|| Bucket {
                first_ts: reading.ts,
                sums: vec![0.0; columns.len()],
                counts: vec![0; columns.len()],
            });

        if reading.ts < bucket.first_ts {
            bucket.first_ts = reading.ts;
        }

        for (idx, column) in columns.iter().enumerate() {
            if let Some(v) = reading.value(column).filter(|v| !v.is_nan()) {
                bucket.sums[idx] += v;
                bucket.counts[idx] += 1;
            }
        }
    }

    // BTreeMap iteration is in bucket order, and buckets are disjoint, so
    // the earliest member timestamps come out strictly ascending.
    let rows = buckets
        .into_values()
        .map(|b| AggregatedRow {
            period_ts: b.first_ts,
            means: b
                .sums
                .iter()
                .zip(&b.counts)
                .map(|(sum, &count)| (count > 0).then(|| sum / f64::from(count)))
                .collect(),
        })
        .collect();

    AggregatedSeries::new(columns, rows)
}

/// Earliest and latest reading timestamp, the default analysis range.
pub fn time_span(readings: &[Reading]) -> Option<(OffsetDateTime, OffsetDateTime)> {
    let min = readings.iter().map(|r| r.ts).min()?;
    let max = readings.iter().map(|r| r.ts).max()?;
    Some((min, max))
}
