use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("sample rate must be a positive finite number, got {0}")]
    SampleRate(f64),
    #[error("window length must be a positive finite number of seconds, got {0}")]
    WindowSeconds(f64),
    #[error("window of {0} samples is too short, at least 3 are needed")]
    WindowTooShort(usize),
    #[error("window of {0} samples is too long, at most {max} are buffered", max = crate::config::MAX_WINDOW_SAMPLES)]
    WindowTooLong(f64),
    #[error("peak distance bounds are invalid: min {min}s, max {max}s")]
    PeakDistance { min: f64, max: f64 },
    #[error("BPM bounds are invalid: min {min}, max {max}")]
    BpmBounds { min: f64, max: f64 },
    #[error("smoothing weight must lie in (0, 1], got {0}")]
    SmoothingAlpha(f64),
    #[error("stale window must be a positive number of seconds, got {0}")]
    StaleWindow(f64),
    #[error("report interval must be a positive number of seconds, got {0}")]
    ReportInterval(f64),
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("failed to decode input: {0}")]
    Decode(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("input contains no samples")]
    NoSamples,
    #[error("no heart rate found in the recording")]
    BpmNotFound,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    #[error("estimator worker has shut down")]
    Disconnected,
    #[error("estimator worker panicked")]
    WorkerPanicked,
}
