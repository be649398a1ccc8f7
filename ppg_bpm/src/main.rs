use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ppg_bpm::{run, AnalysisConfig, EstimatorConfig, InputFormat, LedChannel};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Recorded PPG stream (text/CSV, WAV or raw FIFO dump)
    #[arg()]
    file_path: PathBuf,
    /// Samples per second of the stream
    #[arg(long, default_value_t = 100.0)]
    sample_rate: f64,
    /// Length of the analysis window in seconds
    #[arg(long, default_value_t = 6.0)]
    window_seconds: f64,
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    format: InputFormat,
    /// LED channel to read from a FIFO dump
    #[arg(long, value_enum, default_value_t = LedChannel::Ir)]
    channel: LedChannel,
    /// Column of a text table, or channel of a WAV file
    #[arg(long, default_value_t = 0)]
    column: usize,
    /// Remove the DC level and high-frequency noise before analysis
    #[arg(long)]
    preprocess: bool,
    /// Seconds between timeline points in the report
    #[arg(long, default_value_t = 1.0)]
    report_interval: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let args = Args::parse();

    let config = AnalysisConfig {
        file_path: args.file_path,
        format: args.format,
        channel: args.channel,
        column: args.column,
        preprocess: args.preprocess,
        report_interval_secs: args.report_interval,
        estimator: EstimatorConfig::new(args.sample_rate, args.window_seconds),
    };

    let analysis_result = run(&config)?;
    let json_output = serde_json::to_string_pretty(&analysis_result)?;
    println!("{}", json_output);

    Ok(())
}
