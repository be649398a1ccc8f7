use std::collections::{vec_deque, VecDeque};

use tracing::{debug, trace, warn};

use crate::analysis::peaks::{bpm_from_peak_indices, Peak, PeakDetector};
use crate::config::EstimatorConfig;
use crate::error::ConfigError;

/// Value reported in place of a BPM when there is no estimate.
pub const NO_ESTIMATE: f64 = -1.0;

/// Flattens an estimate into the `-1` sentinel form used by callback
/// consumers.
pub fn to_sentinel(estimate: Option<f64>) -> f64 {
    estimate.unwrap_or(NO_ESTIMATE)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// The window is still filling; no detection runs.
    WarmUp,
    /// The window is full and every sample triggers detection.
    Active,
}

/// Heart-rate estimator over a sliding window of preprocessed PPG samples.
///
/// Not synchronised: one thread owns an instance and feeds it in temporal
/// order. Run several instances for several subjects.
#[derive(Clone, Debug)]
pub struct HeartRateEstimator {
    config: EstimatorConfig,
    detector: PeakDetector,
    window_size: usize,
    samples: VecDeque<f32>,
    /// Accepted peaks, strictly increasing in time.
    peaks: VecDeque<Peak>,
    /// Samples accepted into the window since creation or the last reset.
    samples_seen: u64,
    rejected_samples: u64,
    last_bpm: Option<f64>,
    smoothed_bpm: Option<f64>,
}

impl HeartRateEstimator {
    pub fn new(config: EstimatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let window_size = config.window_size();
        let detector = PeakDetector::new(
            config.sample_rate,
            config.min_peak_distance_secs,
            config.threshold_std_ratio,
        );
        Ok(Self {
            config,
            detector,
            window_size,
            samples: VecDeque::with_capacity(window_size),
            peaks: VecDeque::new(),
            samples_seen: 0,
            rejected_samples: 0,
            last_bpm: None,
            smoothed_bpm: None,
        })
    }

    /// Pushes one preprocessed sample.
    ///
    /// Returns `None` during warm-up, for rejected non-finite samples, and
    /// while no valid interval has been seen yet; otherwise the current
    /// smoothed BPM.
    pub fn add_sample(&mut self, value: f32) -> Option<f64> {
        if !value.is_finite() {
            self.rejected_samples += 1;
            warn!(
                value = %value,
                rejected = self.rejected_samples,
                "dropping non-finite PPG sample"
            );
            return None;
        }

        self.samples.push_back(value);
        self.samples_seen += 1;
        if self.samples.len() > self.window_size {
            self.samples.pop_front();
        }

        if self.samples.len() < self.window_size {
            return None;
        }
        if self.samples_seen == self.window_size as u64 {
            debug!(window_size = self.window_size, "window full, peak detection active");
        }

        self.detect_peaks();
        self.update_bpm();
        self.smoothed_bpm
    }

    /// Current smoothed BPM, `None` until the first successful update.
    pub fn bpm(&self) -> Option<f64> {
        self.smoothed_bpm
    }

    /// Most recent unsmoothed BPM.
    pub fn last_raw_bpm(&self) -> Option<f64> {
        self.last_bpm
    }

    /// Clears window, peaks and BPM state; configuration is kept.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.peaks.clear();
        self.samples_seen = 0;
        self.rejected_samples = 0;
        self.last_bpm = None;
        self.smoothed_bpm = None;
        debug!("heart rate estimator reset");
    }

    pub fn phase(&self) -> Phase {
        if self.samples.len() < self.window_size {
            Phase::WarmUp
        } else {
            Phase::Active
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn buffered_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn peaks(&self) -> vec_deque::Iter<'_, Peak> {
        self.peaks.iter()
    }

    pub fn rejected_samples(&self) -> u64 {
        self.rejected_samples
    }

    /// Session time, in seconds, at the end of the newest buffered sample.
    pub fn current_time_secs(&self) -> f64 {
        self.samples_seen as f64 / self.config.sample_rate
    }

    fn window_start(&self) -> u64 {
        self.samples_seen - self.samples.len() as u64
    }

    fn detect_peaks(&mut self) {
        let window_start = self.window_start();
        let last_peak = self.peaks.back().map(|p| p.sample_index);
        let found = self
            .detector
            .scan(self.samples.make_contiguous(), window_start, last_peak);
        for peak in found {
            trace!(time_secs = peak.time_secs, amplitude = peak.amplitude, "peak accepted");
            self.peaks.push_back(peak);
        }
    }

    fn update_bpm(&mut self) {
        if self.peaks.len() < 2 {
            return;
        }

        let cutoff = self.current_time_secs() - self.config.stale_window_secs;
        while self.peaks.front().is_some_and(|p| p.time_secs < cutoff) {
            self.peaks.pop_front();
        }
        if self.peaks.len() < 2 {
            return;
        }

        let Some(bpm) = bpm_from_peak_indices(
            self.peaks.iter().map(|p| p.sample_index),
            self.config.sample_rate,
            self.config.min_peak_distance_secs,
            self.config.max_peak_distance_secs,
        ) else {
            return;
        };

        if !(self.config.min_bpm..=self.config.max_bpm).contains(&bpm) {
            trace!(bpm, "raw BPM outside physiological range");
            return;
        }

        let alpha = self.config.smoothing_alpha;
        let smoothed = match self.smoothed_bpm {
            None => bpm,
            Some(previous) => (alpha * bpm + (1.0 - alpha) * previous)
                .clamp(self.config.min_bpm, self.config.max_bpm),
        };
        trace!(raw = bpm, smoothed, peaks = self.peaks.len(), "BPM updated");
        self.smoothed_bpm = Some(smoothed);
        self.last_bpm = Some(bpm);
    }
}
