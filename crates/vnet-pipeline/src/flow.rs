//! Flow-control policy for the transmit queue.

/// Whether the producer is currently allowed to submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Producer may submit frames.
    Open,
    /// Producer must pause; submissions are dropped until the queue drains
    /// to the low watermark.
    Stopped,
}

/// Occupancy thresholds driving [`FlowState`] transitions.
///
/// Stateless policy only: the transmit path and poll engine feed it queue
/// lengths and apply the transitions themselves. Keeping `low` strictly
/// below `high` gives the hysteresis band that prevents a single drained
/// frame from immediately re-flooding the producer; `low = high - 1` is the
/// degenerate single-threshold configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermarks {
    pub high: usize,
    pub low: usize,
}

impl Watermarks {
    pub fn should_stop(&self, queue_len: usize) -> bool {
        queue_len >= self.high
    }

    pub fn should_resume(&self, queue_len: usize) -> bool {
        queue_len <= self.low
    }
}
