use thiserror::Error;

/// Configuration rejected at construction time.
///
/// These are caller bugs surfaced before a device instance exists; none of
/// them can occur at runtime.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("queue capacity must be non-zero")]
    ZeroCapacity,

    #[error("default poll budget must be non-zero")]
    ZeroBudget,

    #[error("low watermark {low} must be below high watermark {high}")]
    WatermarkOrder { low: usize, high: usize },

    #[error("high watermark {high} exceeds queue capacity {capacity}")]
    HighAboveCapacity { high: usize, capacity: usize },
}

/// Runtime errors surfaced to the caller as values.
///
/// Overload is not an error: a full queue produces a counted drop in the
/// transmit outcome instead.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PipelineError {
    /// Operation attempted after [`close`](crate::VnetDevice::close).
    #[error("device is closed")]
    Closed,
}
