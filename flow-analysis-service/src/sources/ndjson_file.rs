use std::path::PathBuf;

use flow_client::domain::Reading;
use serde_json::{Map, Value};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};

use super::{
    columns::{assign_cell, Field},
    timestamp::parse_timestamp,
};
use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// Newline-delimited JSON reading table.
///
/// Each non-blank line is an object keyed by the same column names as the
/// spreadsheet export, e.g.
/// `{"Meter_ID":"M1","Flow_Rate":2310.4,"Timestamp":"2023-01-01T00:00:00Z"}`.
pub struct NdjsonReadingSource {
    path: PathBuf,
}

impl NdjsonReadingSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

fn object_to_reading(obj: &Map<String, Value>) -> Result<Reading, PipelineError> {
    let fields: Vec<(Field, &Value)> = obj.iter().map(|(k, v)| (Field::classify(k), v)).collect();

    let ts_value = fields
        .iter()
        .find(|(f, _)| *f == Field::Timestamp)
        .map(|(_, v)| *v)
        .ok_or_else(|| PipelineError::Record("missing Timestamp".to_string()))?;
    let ts_str = ts_value
        .as_str()
        .ok_or_else(|| PipelineError::Record(format!("Timestamp must be a string, got {ts_value}")))?;
    let ts = parse_timestamp(ts_str)
        .map_err(|e| PipelineError::Record(format!("invalid Timestamp '{ts_str}': {e}")))?;

    let mut reading = Reading::new(ts);
    for (field, value) in &fields {
        match value {
            Value::Null => {}
            Value::String(s) => assign_cell(&mut reading, field, s)?,
            Value::Number(_) | Value::Bool(_) => assign_cell(&mut reading, field, &value.to_string())?,
            Value::Array(_) | Value::Object(_) => {
                return Err(PipelineError::Record(format!("unsupported nested value for {field:?}")));
            }
        }
    }
    Ok(reading)
}

#[async_trait::async_trait]
impl Source<Reading> for NdjsonReadingSource {
    async fn stream(&self) -> EnvelopeStream<Reading> {
        let path = self.path.clone();
        let s = async_stream::stream! {
            let file = match File::open(&path).await {
                Ok(f) => f,
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to open {}: {e}", path.display())));
                    return;
                }
            };
            let mut lines = BufReader::new(file).lines();
            let mut line_no = 0usize;

            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(PipelineError::Source(format!("failed to read line: {e}")));
                        return;
                    }
                };
                line_no += 1;
                if line.trim().is_empty() {
                    continue;
                }

                let parsed = serde_json::from_str::<Map<String, Value>>(&line)
                    .map_err(|e| PipelineError::Record(format!("invalid json: {e}")))
                    .and_then(|obj| object_to_reading(&obj));

                match parsed {
                    Ok(reading) => {
                        yield Ok(Envelope::now(reading));
                    }
                    Err(e) => {
                        metrics::counter!("reading_ndjson_parse_errors_total").increment(1);
                        yield Err(PipelineError::Record(format!("line {line_no}: {e}")));
                    }
                }
            }
        };

        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::io::Write;
    use time::macros::datetime;

    #[test]
    fn object_maps_numbers_strings_and_nulls() {
        let obj: Map<String, Value> = serde_json::from_str(
            r#"{"Meter_ID":"M4","Flow_Rate":3100.25,"Pressure":"88.5","Temperature":null,
                "Timestamp":"2023-01-02 03:00:00","Density":0.83,"Shift":"day"}"#,
        )
        .unwrap();
        let r = object_to_reading(&obj).unwrap();
        assert_eq!(r.ts, datetime!(2023-01-02 03:00:00 UTC));
        assert_eq!(r.meter_id.as_deref(), Some("M4"));
        assert_eq!(r.flow_rate, Some(3100.25));
        assert_eq!(r.pressure, Some(88.5));
        assert!(r.temperature.is_none());
        assert_eq!(r.extra.get("Density"), Some(&0.83));
        assert_eq!(r.labels.get("Shift").map(String::as_str), Some("day"));
    }

    #[test]
    fn object_without_timestamp_is_rejected() {
        let obj: Map<String, Value> = serde_json::from_str(r#"{"Flow_Rate":1}"#).unwrap();
        assert!(matches!(object_to_reading(&obj), Err(PipelineError::Record(_))));
    }

    #[tokio::test]
    async fn stream_skips_blank_lines_and_reports_bad_ones() {
        let mut f = tempfile::Builder::new().suffix(".ndjson").tempfile().unwrap();
        writeln!(f, r#"{{"Timestamp":"2023-01-01T00:00:00Z","Flow_Rate":1000}}"#).unwrap();
        writeln!(f).unwrap();
        writeln!(f, "{{not json").unwrap();
        writeln!(f, r#"{{"ts":"2023-01-01T01:00:00Z","flow_rate":2000}}"#).unwrap();

        let items: Vec<_> = NdjsonReadingSource::new(f.path()).stream().await.collect().await;
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(matches!(&items[1], Err(PipelineError::Record(msg)) if msg.starts_with("line 3")));
        assert_eq!(items[2].as_ref().unwrap().payload.flow_rate, Some(2000.0));
    }
}
