use std::{fs::File, path::PathBuf};

use csv::StringRecord;
use flow_client::domain::Reading;

use super::{
    columns::{assign_cell, Field},
    timestamp::parse_timestamp,
};
use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// Delimited spreadsheet export of a reading table.
///
/// The header row names the columns: `Meter_ID`, `Flow_Rate`, `Pressure`,
/// `Temperature` and `Timestamp` (required) are recognised; every other
/// column is carried along as an extra value or label. CSV files use `,`,
/// `.dat` exports use `|`.
pub struct DelimitedReadingSource {
    path: PathBuf,
    delimiter: u8,
}

impl DelimitedReadingSource {
    pub fn csv<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn dat<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            delimiter: b'|',
        }
    }
}

struct HeaderLayout {
    fields: Vec<Field>,
    ts_idx: usize,
}

impl HeaderLayout {
    fn from_headers(headers: &StringRecord) -> Result<Self, PipelineError> {
        let fields: Vec<Field> = headers.iter().map(Field::classify).collect();
        let ts_idx = fields
            .iter()
            .position(|f| *f == Field::Timestamp)
            .ok_or_else(|| PipelineError::Source("missing 'Timestamp' column in header".to_string()))?;
        Ok(Self { fields, ts_idx })
    }

    fn to_reading(&self, record: &StringRecord) -> Result<Reading, PipelineError> {
        let ts_str = record
            .get(self.ts_idx)
            .ok_or_else(|| PipelineError::Record("missing Timestamp cell".to_string()))?;
        let ts = parse_timestamp(ts_str)
            .map_err(|e| PipelineError::Record(format!("invalid Timestamp '{ts_str}': {e}")))?;

        let mut reading = Reading::new(ts);
        for (field, raw) in self.fields.iter().zip(record.iter()) {
            assign_cell(&mut reading, field, raw)?;
        }
        Ok(reading)
    }
}

/// Prefix a record error with its 1-based file line (header is line 1).
fn at_row(e: PipelineError, line: usize) -> PipelineError {
    match e {
        PipelineError::Record(msg) => PipelineError::Record(format!("line {line}: {msg}")),
        other => other,
    }
}

#[async_trait::async_trait]
impl Source<Reading> for DelimitedReadingSource {
    async fn stream(&self) -> EnvelopeStream<Reading> {
        // Blocking reader driven inside the stream; inputs are small exports.
        let path = self.path.clone();
        let delimiter = self.delimiter;
        let s = async_stream::stream! {
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to open {}: {e}", path.display())));
                    return;
                }
            };
            let mut rdr = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .flexible(true)
                .from_reader(file);

            let layout = match rdr.headers() {
                Ok(headers) => HeaderLayout::from_headers(headers),
                Err(e) => Err(PipelineError::Source(format!("failed to read headers: {e}"))),
            };
            let layout = match layout {
                Ok(l) => l,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            for (idx, result) in rdr.records().enumerate() {
                let record = match result {
                    Ok(r) => r,
                    Err(e) if e.is_io_error() => {
                        yield Err(PipelineError::Source(format!("failed to read record: {e}")));
                        return;
                    }
                    Err(e) => {
                        metrics::counter!("reading_file_parse_errors_total").increment(1);
                        yield Err(PipelineError::Record(format!("line {}: {e}", idx + 2)));
                        continue;
                    }
                };

                match layout.to_reading(&record) {
                    Ok(reading) => {
                        yield Ok(Envelope::now(reading));
                    }
                    Err(e) => {
                        metrics::counter!("reading_file_parse_errors_total").increment(1);
                        yield Err(at_row(e, idx + 2));
                    }
                }
            }
        };

        Box::pin(s)
    }
}
