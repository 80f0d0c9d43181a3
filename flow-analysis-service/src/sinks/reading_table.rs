use flow_client::domain::Reading;
use futures::{Stream, StreamExt};

use crate::pipeline::{Envelope, PipelineError, Sink};

/// Reading table assembled from a source.
#[derive(Debug, Clone, Default)]
pub struct LoadedReadings {
    pub readings: Vec<Reading>,
    /// Rows dropped because they failed to parse or validate.
    pub rejected: usize,
}

/// Collects every accepted reading in arrival order.
///
/// Row-level failures are logged and counted; a failure of the source as a
/// whole aborts the load.
#[derive(Clone, Default)]
pub struct ReadingTableSink;

#[async_trait::async_trait]
impl Sink<Reading> for ReadingTableSink {
    type Output = LoadedReadings;

    async fn run<S>(&self, mut input: S) -> Result<LoadedReadings, PipelineError>
    where
        S: Stream<Item = Result<Envelope<Reading>, PipelineError>> + Send + Unpin + 'static,
    {
        let mut loaded = LoadedReadings::default();

        while let Some(item) = input.next().await {
            match item {
                Ok(env) => loaded.readings.push(env.payload),
                Err(e) if e.is_skippable() => {
                    tracing::warn!(error = %e, "skipping reading");
                    loaded.rejected += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "reading table load failed");
                    return Err(e);
                }
            }
        }

        metrics::counter!("readings_loaded_total").increment(loaded.readings.len() as u64);
        tracing::info!(
            accepted = loaded.readings.len(),
            rejected = loaded.rejected,
            "reading table loaded"
        );
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use time::macros::datetime;

    fn ok(ts: time::OffsetDateTime) -> Result<Envelope<Reading>, PipelineError> {
        Ok(Envelope::now(Reading::new(ts)))
    }

    #[tokio::test]
    async fn collects_readings_and_counts_rejects() {
        let items = vec![
            ok(datetime!(2023-01-01 00:00:00 UTC)),
            Err(PipelineError::Record("bad row".to_string())),
            Err(PipelineError::Transform("negative".to_string())),
            ok(datetime!(2023-01-01 01:00:00 UTC)),
        ];
        let loaded = ReadingTableSink.run(stream::iter(items)).await.unwrap();
        assert_eq!(loaded.readings.len(), 2);
        assert_eq!(loaded.rejected, 2);
        assert_eq!(loaded.readings[1].ts, datetime!(2023-01-01 01:00:00 UTC));
    }

    #[tokio::test]
    async fn source_failure_aborts() {
        let items = vec![
            ok(datetime!(2023-01-01 00:00:00 UTC)),
            Err(PipelineError::Source("disk gone".to_string())),
        ];
        let res = ReadingTableSink.run(stream::iter(items)).await;
        assert!(matches!(res, Err(PipelineError::Source(_))));
    }
}
