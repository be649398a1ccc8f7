use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{EstimatorConfig, InputFormat};

#[derive(Serialize, Deserialize, Debug)]
pub struct AnalysisResult {
    pub metadata: Metadata,
    pub heart_rate: HeartRateAnalysis,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Metadata {
    pub file_path: PathBuf,
    pub format: InputFormat,
    pub sample_rate: f64,
    /// Rate of the file itself when it was resampled on load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_sample_rate: Option<u32>,
    pub num_samples: usize,
    pub duration_seconds: f64,
    pub preprocessed: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HeartRateAnalysis {
    /// Smoothed BPM at the end of the recording.
    pub final_bpm: f64,
    pub last_raw_bpm: Option<f64>,
    pub window_size: usize,
    pub peaks_retained: usize,
    pub rejected_samples: u64,
    pub estimator: EstimatorConfig,
    pub timeline: Vec<BpmPoint>,
}

/// Smoothed BPM at one point of the recording.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct BpmPoint {
    pub time_secs: f64,
    pub bpm: f64,
}
