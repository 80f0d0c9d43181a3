use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use time::OffsetDateTime;

/// One timestamped metering row.
///
/// `flow_rate`, `pressure` and `temperature` are the well-known measurement
/// columns. Any other column of the source table lands in `extra` when its
/// cell is numeric and in `labels` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub ts: OffsetDateTime,
    pub meter_id: Option<String>,
    pub flow_rate: Option<f64>,
    pub pressure: Option<f64>,
    pub temperature: Option<f64>,
    pub extra: BTreeMap<String, f64>,
    pub labels: BTreeMap<String, String>,
}

impl Reading {
    pub fn new(ts: OffsetDateTime) -> Self {
        Self {
            ts,
            meter_id: None,
            flow_rate: None,
            pressure: None,
            temperature: None,
            extra: BTreeMap::new(),
            labels: BTreeMap::new(),
        }
    }

    /// Value of `column` for this reading, if any.
    pub fn value(&self, column: &NumericColumn) -> Option<f64> {
        match column {
            NumericColumn::FlowRate => self.flow_rate,
            NumericColumn::Pressure => self.pressure,
            NumericColumn::Temperature => self.temperature,
            NumericColumn::Other(name) => self.extra.get(name).copied(),
        }
    }
}

/// A column that takes part in aggregation.
///
/// Ordering follows the report layout: the three well-known measurements
/// first, then any other numeric column by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericColumn {
    FlowRate,
    Pressure,
    Temperature,
    Other(String),
}

impl NumericColumn {
    /// Column header as it appears in spreadsheet exports.
    pub fn header(&self) -> &str {
        match self {
            Self::FlowRate => "Flow_Rate",
            Self::Pressure => "Pressure",
            Self::Temperature => "Temperature",
            Self::Other(name) => name,
        }
    }

    /// Human readable name used in charts and reports.
    pub fn label(&self) -> String {
        match self {
            Self::FlowRate => "Flow Rate".to_string(),
            Self::Pressure => "Pressure".to_string(),
            Self::Temperature => "Temperature".to_string(),
            Self::Other(name) => name.replace('_', " "),
        }
    }

    pub fn unit(&self) -> Option<&'static str> {
        match self {
            Self::FlowRate => Some("BPD"),
            Self::Pressure => Some("bar"),
            Self::Temperature => Some("degC"),
            Self::Other(_) => None,
        }
    }
}

impl fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Numeric columns present in a reading table.
///
/// A well-known column is present when at least one reading carries a value
/// for it. An extra column is present when some reading carries a numeric
/// value for it and no reading carries a text label under the same name; a
/// column with any text cell is treated as non-numeric for the whole table.
pub fn numeric_columns(readings: &[Reading]) -> Vec<NumericColumn> {
    let mut columns = Vec::new();
    if readings.iter().any(|r| r.flow_rate.is_some()) {
        columns.push(NumericColumn::FlowRate);
    }
    if readings.iter().any(|r| r.pressure.is_some()) {
        columns.push(NumericColumn::Pressure);
    }
    if readings.iter().any(|r| r.temperature.is_some()) {
        columns.push(NumericColumn::Temperature);
    }

    let mut extra: BTreeSet<&str> = readings
        .iter()
        .flat_map(|r| r.extra.keys().map(String::as_str))
        .collect();
    for r in readings {
        for name in r.labels.keys() {
            extra.remove(name.as_str());
        }
    }
    columns.extend(extra.into_iter().map(|name| NumericColumn::Other(name.to_string())));

    columns
}
