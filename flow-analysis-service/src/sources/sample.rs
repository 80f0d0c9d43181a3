use flow_client::domain::Reading;
use futures::stream;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::{
    config::SampleConfig,
    pipeline::{Envelope, EnvelopeStream, PipelineError, Source},
};

const METERS: [&str; 4] = ["M1", "M2", "M3", "M4"];

/// Synthetic reading table used when no input file is supplied.
///
/// Readings are evenly spaced from `start`; values are drawn uniformly from
/// typical custody-transfer ranges with a seeded RNG so runs are repeatable.
pub struct SampleReadingSource {
    cfg: SampleConfig,
}

impl SampleReadingSource {
    pub fn new(cfg: &SampleConfig) -> Self {
        Self { cfg: cfg.clone() }
    }

    pub fn generate(&self) -> Result<Vec<Reading>, PipelineError> {
        let mut rng = StdRng::seed_from_u64(self.cfg.seed);
        (0..self.cfg.rows)
            .map(|i| {
                let ts = self.cfg.reading_ts(i).ok_or_else(|| {
                    PipelineError::Source(format!(
                        "sample row {i} falls outside the supported date range"
                    ))
                })?;
                let mut r = Reading::new(ts);
                r.meter_id = METERS.choose(&mut rng).map(|m| m.to_string());
                r.flow_rate = Some(rng.gen_range(1000.0..5000.0));
                r.pressure = Some(rng.gen_range(50.0..150.0));
                r.temperature = Some(rng.gen_range(10.0..80.0));
                Ok(r)
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl Source<Reading> for SampleReadingSource {
    async fn stream(&self) -> EnvelopeStream<Reading> {
        match self.generate() {
            Ok(readings) => {
                tracing::info!(rows = readings.len(), seed = self.cfg.seed, "generated sample readings");
                Box::pin(stream::iter(readings.into_iter().map(|r| Ok(Envelope::now(r)))))
            }
            Err(e) => Box::pin(stream::iter([Err(e)])),
        }
    }
}
