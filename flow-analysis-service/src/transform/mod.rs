use flow_client::domain::Reading;
use time::macros::datetime;

use crate::pipeline::{Envelope, PipelineError, Transform};

/// Pure validation of a `Reading`.
///
/// Rules:
/// - ts must be within a broad sanity window [2000-01-01, 2100-01-01].
/// - every numeric value must be finite.
/// - flow rate must be non-negative.
pub fn validate_reading(env: Envelope<Reading>) -> Result<Envelope<Reading>, PipelineError> {
    let r = &env.payload;

    let min_ts = datetime!(2000-01-01 00:00:00 UTC);
    let max_ts = datetime!(2100-01-01 00:00:00 UTC);

    if r.ts < min_ts || r.ts > max_ts {
        return Err(PipelineError::Transform(format!("timestamp {} out of allowed range", r.ts)));
    }

    let measurements = [
        ("Flow_Rate", r.flow_rate),
        ("Pressure", r.pressure),
        ("Temperature", r.temperature),
    ];
    for (name, value) in measurements {
        if value.is_some_and(|v| !v.is_finite()) {
            return Err(PipelineError::Transform(format!("{name} must be finite")));
        }
    }
    if let Some((name, _)) = r.extra.iter().find(|(_, v)| !v.is_finite()) {
        return Err(PipelineError::Transform(format!("{name} must be finite")));
    }

    if r.flow_rate.is_some_and(|v| v < 0.0) {
        return Err(PipelineError::Transform("Flow_Rate must be non-negative".to_string()));
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct ReadingValidation;

#[async_trait::async_trait]
impl Transform<Reading, Reading> for ReadingValidation {
    async fn apply(&self, input: Envelope<Reading>) -> Result<Envelope<Reading>, PipelineError> {
        match validate_reading(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_reading_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}

/// Removes named auxiliary columns (e.g. `Tank_Level`) before analysis.
#[derive(Clone, Default)]
pub struct DropColumns {
    names: Vec<String>,
}

impl DropColumns {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    fn is_dropped(&self, column: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(column))
    }

    pub fn strip(&self, mut reading: Reading) -> Reading {
        reading.extra.retain(|k, _| !self.is_dropped(k));
        reading.labels.retain(|k, _| !self.is_dropped(k));
        reading
    }
}

#[async_trait::async_trait]
impl Transform<Reading, Reading> for DropColumns {
    async fn apply(&self, input: Envelope<Reading>) -> Result<Envelope<Reading>, PipelineError> {
        Ok(Envelope {
            payload: self.strip(input.payload),
            received_at: input.received_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(reading: Reading) -> Envelope<Reading> {
        Envelope::now(reading)
    }

    fn valid() -> Reading {
        let mut r = Reading::new(datetime!(2024-01-01 00:00:00 UTC));
        r.flow_rate = Some(2500.0);
        r.pressure = Some(90.0);
        r
    }

    #[test]
    fn reading_validation_accepts_valid_record() {
        assert!(validate_reading(env(valid())).is_ok());
    }

    #[test]
    fn reading_validation_rejects_negative_flow() {
        let mut r = valid();
        r.flow_rate = Some(-0.1);
        assert!(matches!(validate_reading(env(r)), Err(PipelineError::Transform(_))));
    }

    #[test]
    fn reading_validation_rejects_out_of_range_ts() {
        let mut r = valid();
        r.ts = datetime!(1800-01-01 00:00:00 UTC);
        assert!(matches!(validate_reading(env(r)), Err(PipelineError::Transform(_))));
    }

    #[test]
    fn reading_validation_rejects_non_finite_values() {
        let mut r = valid();
        r.temperature = Some(f64::NAN);
        assert!(validate_reading(env(r)).is_err());

        let mut r = valid();
        r.extra.insert("Density".to_string(), f64::INFINITY);
        assert!(validate_reading(env(r)).is_err());
    }

    #[tokio::test]
    async fn drop_columns_ignores_case() {
        let mut r = valid();
        r.extra.insert("Tank_Level".to_string(), 3.2);
        r.extra.insert("Density".to_string(), 0.8);
        r.labels.insert("TANK_LEVEL".to_string(), "n/a".to_string());

        let out = DropColumns::new(["tank_level"]).apply(env(r)).await.unwrap();
        assert!(!out.payload.extra.contains_key("Tank_Level"));
        assert!(out.payload.labels.is_empty());
        assert_eq!(out.payload.extra.get("Density"), Some(&0.8));
    }
}
