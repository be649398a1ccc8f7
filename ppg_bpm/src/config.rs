use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Shortest accepted beat-to-beat spacing, i.e. 200 BPM.
pub const MIN_PEAK_DISTANCE_SECS: f64 = 0.3;
/// Longest accepted beat-to-beat spacing, i.e. 30 BPM.
pub const MAX_PEAK_DISTANCE_SECS: f64 = 2.0;
pub const SMOOTHING_ALPHA: f64 = 0.3;
pub const STALE_WINDOW_SECS: f64 = 5.0;
/// Peaks must exceed `mean + THRESHOLD_STD_RATIO * std` of the window.
pub const THRESHOLD_STD_RATIO: f64 = 0.5;
pub const MIN_BPM: f64 = 30.0;
pub const MAX_BPM: f64 = 200.0;
/// Largest window the estimator will buffer, in samples.
pub const MAX_WINDOW_SAMPLES: usize = 1 << 24;

/// Parameters of one heart-rate estimator. Fixed for the lifetime of the
/// estimator; `reset` never touches them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    pub sample_rate: f64,
    pub window_seconds: f64,
    pub min_peak_distance_secs: f64,
    pub max_peak_distance_secs: f64,
    pub smoothing_alpha: f64,
    pub stale_window_secs: f64,
    pub threshold_std_ratio: f64,
    pub min_bpm: f64,
    pub max_bpm: f64,
}

impl EstimatorConfig {
    pub fn new(sample_rate: f64, window_seconds: f64) -> Self {
        Self {
            sample_rate,
            window_seconds,
            min_peak_distance_secs: MIN_PEAK_DISTANCE_SECS,
            max_peak_distance_secs: MAX_PEAK_DISTANCE_SECS,
            smoothing_alpha: SMOOTHING_ALPHA,
            stale_window_secs: STALE_WINDOW_SECS,
            threshold_std_ratio: THRESHOLD_STD_RATIO,
            min_bpm: MIN_BPM,
            max_bpm: MAX_BPM,
        }
    }

    /// Number of samples held in the analysis window.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn window_size(&self) -> usize {
        (self.sample_rate * self.window_seconds).round() as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        if !(self.window_seconds.is_finite() && self.window_seconds > 0.0) {
            return Err(ConfigError::WindowSeconds(self.window_seconds));
        }
        let product = (self.sample_rate * self.window_seconds).round();
        #[allow(clippy::cast_precision_loss)]
        let max_window = MAX_WINDOW_SAMPLES as f64;
        if !(product.is_finite() && product <= max_window) {
            return Err(ConfigError::WindowTooLong(product));
        }
        let window_size = self.window_size();
        if window_size < 3 {
            return Err(ConfigError::WindowTooShort(window_size));
        }
        let (min, max) = (self.min_peak_distance_secs, self.max_peak_distance_secs);
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
            return Err(ConfigError::PeakDistance { min, max });
        }
        let (min, max) = (self.min_bpm, self.max_bpm);
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
            return Err(ConfigError::BpmBounds { min, max });
        }
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err(ConfigError::SmoothingAlpha(self.smoothing_alpha));
        }
        if !(self.stale_window_secs.is_finite() && self.stale_window_secs > 0.0) {
            return Err(ConfigError::StaleWindow(self.stale_window_secs));
        }
        Ok(())
    }
}

impl Default for EstimatorConfig {
    /// 100 Hz with a 6 s window, the MAX30102 acquisition setup.
    fn default() -> Self {
        Self::new(100.0, 6.0)
    }
}

/// What to analyse and how, for a recorded PPG stream.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    pub file_path: PathBuf,
    pub format: InputFormat,
    pub channel: LedChannel,
    pub column: usize,
    pub preprocess: bool,
    pub report_interval_secs: f64,
    pub estimator: EstimatorConfig,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Chosen from the file extension.
    Auto,
    /// One sample per line, or one column of a delimited table.
    Text,
    Wav,
    /// Raw sensor FIFO dump: 6-byte records, red word then IR word.
    Fifo,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedChannel {
    Red,
    Ir,
}
