pub mod decoder;
pub mod estimator;
pub mod peaks;
pub mod preprocess;
pub mod stream;
