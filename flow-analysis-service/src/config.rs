use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use flow_client::domain::PeriodCode;
use serde::Deserialize;
use time::{macros::datetime, Duration, OffsetDateTime, Time};

use crate::sources::timestamp::{parse_timestamp_str, ParsedTimestamp};

pub const CONFIG_ENV: &str = "FLOW_ANALYSIS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "flow-analysis.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Pick from the file extension (`.dat` pipe-delimited, `.ndjson`/`.jsonl`, otherwise CSV).
    #[default]
    Auto,
    Csv,
    Dat,
    Ndjson,
}

impl InputFormat {
    pub fn resolve(self, path: &Path) -> InputFormat {
        if self != InputFormat::Auto {
            return self;
        }
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("dat") => InputFormat::Dat,
            Some("ndjson") | Some("jsonl") => InputFormat::Ndjson,
            _ => InputFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: Option<PathBuf>,
    pub format: InputFormat,
    pub drop_columns: Vec<String>,
    pub fallback_to_sample: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: None,
            format: InputFormat::Auto,
            drop_columns: vec!["Tank_Level".to_string()],
            fallback_to_sample: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    pub rows: usize,
    pub seed: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    pub step_minutes: i64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            rows: 100,
            seed: 42,
            start: datetime!(2023-01-01 00:00:00 UTC),
            step_minutes: 60,
        }
    }
}

impl SampleConfig {
    /// Timestamp of the `index`-th sample reading, or `None` when it falls
    /// outside the representable date range.
    pub fn reading_ts(&self, index: usize) -> Option<OffsetDateTime> {
        let step = Duration::seconds(self.step_minutes.checked_mul(60)?);
        let offset = step.checked_mul(i32::try_from(index).ok()?)?;
        self.start.checked_add(offset)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub period: PeriodCode,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            period: PeriodCode::Quarter,
            start: None,
            end: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub pdf_file: String,
    pub title: String,
    pub write_charts: bool,
    pub write_series_csv: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
            pdf_file: "flow_analysis_report.pdf".to_string(),
            title: "Crude Flow Monitoring Report".to_string(),
            write_charts: true,
            write_series_csv: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub sample: SampleConfig,
    pub analysis: AnalysisConfig,
    pub report: ReportConfig,
}

impl AppConfig {
    /// Load from `explicit`, else `$FLOW_ANALYSIS_CONFIG`, else
    /// `flow-analysis.toml`. Only the last one may be absent, in which case
    /// built-in defaults are used.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        use std::env;

        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

        let path = match named {
            Some(p) => p,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !default.exists() {
                    tracing::debug!(path = %default.display(), "no config file, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        if cfg.sample.step_minutes <= 0 {
            anyhow::bail!("sample.step_minutes must be positive");
        }
        if let Some(last) = cfg.sample.rows.checked_sub(1) {
            if cfg.sample.reading_ts(last).is_none() {
                anyhow::bail!(
                    "sample of {} rows every {} minutes runs past the supported date range",
                    cfg.sample.rows,
                    cfg.sample.step_minutes
                );
            }
        }
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSide {
    Start,
    End,
}

/// Parse one end of the analysis date range.
///
/// A bare date as the end bound covers that whole day.
pub fn parse_range_bound(s: &str, side: BoundSide) -> anyhow::Result<OffsetDateTime> {
    let parsed = parse_timestamp_str(s).with_context(|| format!("invalid date bound '{s}'"))?;
    match (parsed, side) {
        (ParsedTimestamp::Date(d), BoundSide::End) => {
            let last = Time::from_hms_nano(23, 59, 59, 999_999_999)?;
            Ok(d.with_time(last).assume_utc())
        }
        (p, _) => Ok(p.at_start_of_day()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg.analysis.period, PeriodCode::Quarter);
        assert_eq!(cfg.input.drop_columns, vec!["Tank_Level".to_string()]);
        assert!(cfg.input.fallback_to_sample);
        assert_eq!(cfg.sample.rows, 100);
        assert_eq!(cfg.report.pdf_file, "flow_analysis_report.pdf");
    }

    #[test]
    fn parses_sections() {
        let cfg = AppConfig::from_toml(
            r#"
            [input]
            path = "data/flow.dat"
            format = "dat"
            fallback_to_sample = false

            [sample]
            rows = 10
            start = "2024-06-01T00:00:00Z"
            step_minutes = 15

            [analysis]
            period = "Semi-Annual"
            start = "2024-06-01"

            [report]
            output_dir = "out"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.input.format, InputFormat::Dat);
        assert!(!cfg.input.fallback_to_sample);
        assert_eq!(cfg.sample.start, datetime!(2024-06-01 00:00:00 UTC));
        assert_eq!(cfg.analysis.period, PeriodCode::SemiAnnual);
        assert_eq!(cfg.analysis.start.as_deref(), Some("2024-06-01"));
        assert_eq!(cfg.report.output_dir, PathBuf::from("out"));
        assert!(cfg.report.write_charts);
    }

    #[test]
    fn unknown_period_label_is_a_config_error() {
        let res = AppConfig::from_toml("[analysis]\nperiod = \"Monthly\"\n");
        assert!(res.is_err());
    }

    #[test]
    fn non_positive_sample_step_is_rejected() {
        assert!(AppConfig::from_toml("[sample]\nstep_minutes = 0\n").is_err());
    }

    #[test]
    fn sample_past_year_9999_is_rejected() {
        assert!(AppConfig::from_toml("[sample]\nstep_minutes = 100000000\n").is_err());
        assert!(AppConfig::from_toml("[sample]\nstep_minutes = 9223372036854775807\n").is_err());
        assert!(AppConfig::from_toml("[sample]\nrows = 3000000000\nstep_minutes = 1\n").is_err());

        let cfg = AppConfig::from_toml("[sample]\nrows = 0\nstep_minutes = 100000000\n").unwrap();
        assert_eq!(cfg.sample.rows, 0);
    }

    #[test]
    fn sample_reading_ts_steps_from_start() {
        let sample = SampleConfig::default();
        assert_eq!(sample.reading_ts(0), Some(datetime!(2023-01-01 00:00:00 UTC)));
        assert_eq!(sample.reading_ts(25), Some(datetime!(2023-01-02 01:00:00 UTC)));
        assert_eq!(sample.reading_ts(usize::MAX), None);
    }

    #[test]
    fn date_only_end_bound_covers_the_day() {
        let start = parse_range_bound("2023-01-02", BoundSide::Start).unwrap();
        let end = parse_range_bound("2023-01-02", BoundSide::End).unwrap();
        assert_eq!(start, datetime!(2023-01-02 00:00:00 UTC));
        assert_eq!(end, datetime!(2023-01-02 23:59:59.999999999 UTC));
        assert_eq!(
            parse_range_bound("2023-01-02 06:00:00", BoundSide::End).unwrap(),
            datetime!(2023-01-02 06:00:00 UTC)
        );
        assert!(parse_range_bound("soon", BoundSide::Start).is_err());
    }

    #[test]
    fn auto_format_follows_extension() {
        assert_eq!(InputFormat::Auto.resolve(Path::new("a.DAT")), InputFormat::Dat);
        assert_eq!(InputFormat::Auto.resolve(Path::new("a.jsonl")), InputFormat::Ndjson);
        assert_eq!(InputFormat::Auto.resolve(Path::new("a.csv")), InputFormat::Csv);
        assert_eq!(InputFormat::Csv.resolve(Path::new("a.dat")), InputFormat::Csv);
    }
}
