pub mod analysis;
pub mod config;
pub mod error;
pub mod model;

pub use analysis::estimator::{to_sentinel, HeartRateEstimator, Phase, NO_ESTIMATE};
pub use analysis::stream::{BpmUpdate, EstimatorWorker};
pub use config::{AnalysisConfig, EstimatorConfig, InputFormat, LedChannel};
use analysis::preprocess::PulsePreprocessor;
use error::{AnalysisError, ConfigError};
use model::{AnalysisResult, BpmPoint, HeartRateAnalysis, Metadata};
use tracing::info;

pub fn run(config: &AnalysisConfig) -> Result<AnalysisResult, AnalysisError> {
    config.estimator.validate()?;

    // 1. Decode the recording into one channel at the estimator's rate
    let decoded = analysis::decoder::load_samples(
        &config.file_path,
        config.format,
        config.channel,
        config.column,
        config.estimator.sample_rate,
    )
    .map_err(|e| AnalysisError::Decode(format!("{e:#}")))?;

    // 2. Raw sensor counts need DC removal before peak detection
    let samples = if config.preprocess {
        PulsePreprocessor::default().process_all(&decoded.samples)
    } else {
        decoded.samples
    };

    let num_samples = samples.len();
    let duration_seconds = num_samples as f64 / config.estimator.sample_rate;

    // 3. Stream every sample through one estimator
    let heart_rate = analyze_samples(
        &samples,
        config.estimator.clone(),
        config.report_interval_secs,
    )?;
    info!(
        bpm = heart_rate.final_bpm,
        samples = num_samples,
        "heart rate analysis complete"
    );

    Ok(AnalysisResult {
        metadata: Metadata {
            file_path: config.file_path.clone(),
            format: decoded.format,
            sample_rate: config.estimator.sample_rate,
            source_sample_rate: decoded.source_sample_rate,
            num_samples,
            duration_seconds,
            preprocessed: config.preprocess,
        },
        heart_rate,
    })
}

/// Feeds `samples` in order through a fresh estimator and records the
/// smoothed BPM every `report_interval_secs` of stream time.
pub fn analyze_samples(
    samples: &[f32],
    estimator_config: EstimatorConfig,
    report_interval_secs: f64,
) -> Result<HeartRateAnalysis, AnalysisError> {
    if !(report_interval_secs.is_finite() && report_interval_secs > 0.0) {
        return Err(ConfigError::ReportInterval(report_interval_secs).into());
    }
    if samples.is_empty() {
        return Err(AnalysisError::NoSamples);
    }

    let sample_rate = estimator_config.sample_rate;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let report_every = ((report_interval_secs * sample_rate).round() as usize).max(1);
    let mut estimator = HeartRateEstimator::new(estimator_config)?;
    let mut timeline = Vec::new();

    for (i, &value) in samples.iter().enumerate() {
        estimator.add_sample(value);
        let n = i + 1;
        if n % report_every == 0 {
            if let Some(bpm) = estimator.bpm() {
                timeline.push(BpmPoint { time_secs: n as f64 / sample_rate, bpm });
            }
        }
    }

    let final_bpm = estimator.bpm().ok_or(AnalysisError::BpmNotFound)?;
    let peaks_retained = estimator.peaks().len();

    Ok(HeartRateAnalysis {
        final_bpm,
        last_raw_bpm: estimator.last_raw_bpm(),
        window_size: estimator.window_size(),
        peaks_retained,
        rejected_samples: estimator.rejected_samples(),
        estimator: estimator.config().clone(),
        timeline,
    })
}
