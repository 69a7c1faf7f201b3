use crate::error::ConfigError;
use crate::flow::Watermarks;

/// Default queue capacity, matching the poll weight below.
pub const DEFAULT_CAPACITY: usize = 64;
/// Default high watermark: stop accepting once the queue is full.
pub const DEFAULT_HIGH_WATERMARK: usize = 64;
/// Default low watermark: resume once half the queue has drained.
pub const DEFAULT_LOW_WATERMARK: usize = 32;
/// Default per-poll frame budget (the classic NAPI weight).
pub const DEFAULT_BUDGET: usize = 64;

/// Immutable pipeline configuration, fixed at device construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum number of frames resident in the queue.
    pub capacity: usize,
    /// Occupancy at which submission stops (`len >= high_watermark`).
    pub high_watermark: usize,
    /// Occupancy at which submission resumes (`len <= low_watermark`).
    pub low_watermark: usize,
    /// Budget used by [`poll_default`](crate::VnetDevice::poll_default).
    pub default_budget: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            high_watermark: DEFAULT_HIGH_WATERMARK,
            low_watermark: DEFAULT_LOW_WATERMARK,
            default_budget: DEFAULT_BUDGET,
        }
    }
}

impl PipelineConfig {
    /// Degenerate single-threshold variant: stop only at absolute capacity,
    /// resume as soon as one frame drains.
    pub fn single_threshold(capacity: usize) -> Self {
        Self {
            capacity,
            high_watermark: capacity,
            low_watermark: capacity.saturating_sub(1),
            default_budget: DEFAULT_BUDGET,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.default_budget == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        if self.low_watermark >= self.high_watermark {
            return Err(ConfigError::WatermarkOrder {
                low: self.low_watermark,
                high: self.high_watermark,
            });
        }
        if self.high_watermark > self.capacity {
            return Err(ConfigError::HighAboveCapacity {
                high: self.high_watermark,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub fn watermarks(&self) -> Watermarks {
        Watermarks {
            high: self.high_watermark,
            low: self.low_watermark,
        }
    }
}
