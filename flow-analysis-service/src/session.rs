use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use flow_client::{
    analysis::{aggregate, time_span},
    domain::{AggregatedSeries, PeriodCode, Reading},
};
use time::OffsetDateTime;

use crate::{
    config::{InputConfig, InputFormat, SampleConfig},
    pipeline::{Pipeline, PipelineError, Source, Transform},
    sinks::{LoadedReadings, ReadingTableSink},
    sources::{DelimitedReadingSource, NdjsonReadingSource, SampleReadingSource},
    transform::{DropColumns, ReadingValidation},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOrigin {
    File(PathBuf),
    Sample,
    /// The file could not be used and sample data was substituted.
    SampleFallback { path: PathBuf, reason: String },
}

impl fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => write!(f, "file {}", p.display()),
            Self::Sample => f.write_str("sample data"),
            Self::SampleFallback { path, .. } => write!(f, "sample data (fallback from {})", path.display()),
        }
    }
}

/// The reading table of one analysis run.
#[derive(Debug, Clone)]
pub struct ReadingTable {
    pub readings: Vec<Reading>,
    pub rejected: usize,
    pub origin: DataOrigin,
}

async fn run_pipeline<S>(source: S, drop_columns: &[String]) -> Result<LoadedReadings, PipelineError>
where
    S: Source<Reading> + Send + Sync + 'static,
{
    let pipeline: Pipeline<_, Reading, _> = Pipeline {
        source,
        transforms: vec![
            Arc::new(DropColumns::new(drop_columns.iter().cloned())) as Arc<dyn Transform<Reading, Reading> + Send + Sync>,
            Arc::new(ReadingValidation),
        ],
        sink: ReadingTableSink,
    };
    pipeline.run().await
}

async fn load_file(path: &Path, input: &InputConfig) -> Result<LoadedReadings, PipelineError> {
    let loaded = match input.format.resolve(path) {
        InputFormat::Ndjson => run_pipeline(NdjsonReadingSource::new(path), &input.drop_columns).await?,
        InputFormat::Dat => run_pipeline(DelimitedReadingSource::dat(path), &input.drop_columns).await?,
        InputFormat::Csv | InputFormat::Auto => {
            run_pipeline(DelimitedReadingSource::csv(path), &input.drop_columns).await?
        }
    };

    if loaded.readings.is_empty() && loaded.rejected > 0 {
        return Err(PipelineError::Source(format!(
            "none of the {} rows could be used",
            loaded.rejected
        )));
    }
    Ok(loaded)
}

/// Load the reading table from the configured file, or synthesize one.
///
/// When the file cannot be used and `fallback_to_sample` is set, the run
/// continues on sample data and the origin records why.
pub async fn load_readings(input: &InputConfig, sample: &SampleConfig) -> Result<ReadingTable, PipelineError> {
    let Some(path) = &input.path else {
        tracing::info!("no input file, using sample data");
        let loaded = run_pipeline(SampleReadingSource::new(sample), &input.drop_columns).await?;
        return Ok(ReadingTable {
            readings: loaded.readings,
            rejected: loaded.rejected,
            origin: DataOrigin::Sample,
        });
    };

    match load_file(path, input).await {
        Ok(loaded) => Ok(ReadingTable {
            readings: loaded.readings,
            rejected: loaded.rejected,
            origin: DataOrigin::File(path.clone()),
        }),
        Err(e) if input.fallback_to_sample => {
            tracing::warn!(error = %e, path = %path.display(), "input file unusable, falling back to sample data");
            let loaded = run_pipeline(SampleReadingSource::new(sample), &input.drop_columns).await?;
            Ok(ReadingTable {
                readings: loaded.readings,
                rejected: loaded.rejected,
                origin: DataOrigin::SampleFallback {
                    path: path.clone(),
                    reason: e.to_string(),
                },
            })
        }
        Err(e) => Err(e),
    }
}

/// Parameters of one aggregation, held by the caller and passed explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisParams {
    pub range_start: Option<OffsetDateTime>,
    pub range_end: Option<OffsetDateTime>,
    pub period: PeriodCode,
}

/// Outcome of one aggregation.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub range_start: OffsetDateTime,
    pub range_end: OffsetDateTime,
    pub period: PeriodCode,
    pub series: AggregatedSeries,
}

impl AnalysisParams {
    /// Fill missing bounds from the reading span. With no readings and no
    /// bounds the current instant stands in; the series is empty anyway.
    pub fn resolve_range(&self, readings: &[Reading]) -> (OffsetDateTime, OffsetDateTime) {
        let span = time_span(readings);
        let now = OffsetDateTime::now_utc();
        let start = self.range_start.or(span.map(|s| s.0)).unwrap_or(now);
        let end = self.range_end.or(span.map(|s| s.1)).unwrap_or(now);
        (start, end)
    }

    pub fn run(&self, readings: &[Reading]) -> Analysis {
        let (range_start, range_end) = self.resolve_range(readings);
        if range_start > range_end {
            tracing::warn!(%range_start, %range_end, "date range is inverted, no readings will match");
        }
        let series = aggregate(readings, range_start, range_end, self.period);
        tracing::info!(
            readings = readings.len(),
            periods = series.len(),
            period = %self.period,
            "aggregated readings"
        );
        Analysis {
            range_start,
            range_end,
            period: self.period,
            series,
        }
    }
}
