use flow_client::domain::Reading;

use crate::pipeline::PipelineError;

/// What a source column maps to on a [`Reading`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    MeterId,
    FlowRate,
    Pressure,
    Temperature,
    Timestamp,
    Other(String),
}

impl Field {
    /// Classify a header. Matching ignores case, and spaces count as
    /// underscores, so `Flow_Rate`, `flow rate` and `FLOW_RATE` agree.
    pub fn classify(header: &str) -> Field {
        let trimmed = header.trim();
        let key = trimmed.to_ascii_lowercase().replace(' ', "_");
        match key.as_str() {
            "meter_id" | "meterid" => Field::MeterId,
            "flow_rate" | "flowrate" => Field::FlowRate,
            "pressure" => Field::Pressure,
            "temperature" => Field::Temperature,
            "timestamp" | "ts" => Field::Timestamp,
            _ => Field::Other(trimmed.to_string()),
        }
    }
}

fn parse_measurement(name: &str, raw: &str) -> Result<f64, PipelineError> {
    raw.parse()
        .map_err(|e| PipelineError::Record(format!("invalid {name} '{raw}': {e}")))
}

/// Store one non-timestamp cell on `reading`. Blank cells are ignored.
pub fn assign_cell(reading: &mut Reading, field: &Field, raw: &str) -> Result<(), PipelineError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(());
    }

    match field {
        Field::MeterId => reading.meter_id = Some(raw.to_string()),
        Field::FlowRate => reading.flow_rate = Some(parse_measurement("Flow_Rate", raw)?),
        Field::Pressure => reading.pressure = Some(parse_measurement("Pressure", raw)?),
        Field::Temperature => reading.temperature = Some(parse_measurement("Temperature", raw)?),
        Field::Timestamp => {}
        Field::Other(name) => match raw.parse::<f64>() {
            Ok(v) => {
                reading.extra.insert(name.clone(), v);
            }
            Err(_) => {
                reading.labels.insert(name.clone(), raw.to_string());
            }
        },
    }
    Ok(())
}
