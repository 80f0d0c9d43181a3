use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use flow_analysis_service::{
    config::{parse_range_bound, AppConfig, BoundSide, InputFormat},
    observability, report,
    session::{self, AnalysisParams, DataOrigin},
};
use flow_client::domain::PeriodCode;

/// Crude flow monitoring: resample metering data and write a PDF report.
#[derive(Debug, Parser)]
#[command(name = "flow-report", version)]
struct Cli {
    /// Configuration file (defaults to $FLOW_ANALYSIS_CONFIG or flow-analysis.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reading table export (CSV, pipe-delimited .dat or NDJSON). Sample data is used when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    #[arg(long, value_enum)]
    format: Option<InputFormat>,

    /// Comparison period: "3 Months", "4 Months", "Semi-Annual" or "Annual".
    #[arg(long)]
    period: Option<PeriodCode>,

    /// First instant of the analysis range (date or date-time).
    #[arg(long)]
    start: Option<String>,

    /// Last instant of the analysis range; a bare date covers the whole day.
    #[arg(long)]
    end: Option<String>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Halt instead of falling back to sample data when the input is unusable.
    #[arg(long)]
    no_fallback: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();
    let cli = Cli::parse();

    // Load configuration, then let flags override it.
    let mut cfg = AppConfig::load(cli.config.as_deref())?;
    if let Some(input) = cli.input {
        cfg.input.path = Some(input);
    }
    if let Some(format) = cli.format {
        cfg.input.format = format;
    }
    if cli.no_fallback {
        cfg.input.fallback_to_sample = false;
    }
    if let Some(period) = cli.period {
        cfg.analysis.period = period;
    }
    if let Some(start) = cli.start {
        cfg.analysis.start = Some(start);
    }
    if let Some(end) = cli.end {
        cfg.analysis.end = Some(end);
    }
    if let Some(dir) = cli.output_dir {
        cfg.report.output_dir = dir;
    }

    let params = AnalysisParams {
        range_start: cfg
            .analysis
            .start
            .as_deref()
            .map(|s| parse_range_bound(s, BoundSide::Start))
            .transpose()?,
        range_end: cfg
            .analysis
            .end
            .as_deref()
            .map(|s| parse_range_bound(s, BoundSide::End))
            .transpose()?,
        period: cfg.analysis.period,
    };

    let table = session::load_readings(&cfg.input, &cfg.sample).await?;
    if let DataOrigin::SampleFallback { reason, .. } = &table.origin {
        tracing::warn!(%reason, "report is based on sample data");
    }
    tracing::info!(
        origin = %table.origin,
        readings = table.readings.len(),
        rejected = table.rejected,
        "reading table ready"
    );

    let analysis = params.run(&table.readings);
    if analysis.series.is_empty() {
        tracing::warn!("no readings in the selected date range");
    }

    let artifacts = report::write_report(
        &cfg.report,
        &analysis.series,
        analysis.range_start,
        analysis.range_end,
        analysis.period,
    )?;

    println!("{}", artifacts.pdf.display());
    Ok(())
}
