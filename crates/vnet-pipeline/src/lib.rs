//! Packet pipeline for a virtual network interface.
//!
//! The pipeline coordinates one producer (the transmit path) and one consumer
//! (a budgeted, NAPI-style poll engine) across a bounded FIFO of opaque
//! frames:
//!
//! 1. [`VnetDevice::submit`] copies caller data into a [`Frame`] and enqueues
//!    it, or rejects it when the queue is full, oversized, or flow-stopped.
//! 2. [`VnetDevice::poll`] drains up to a budget of frames per invocation and
//!    delivers each to a [`FrameSink`] with the internal lock released.
//! 3. A pair of watermarks applies backpressure with hysteresis: submission
//!    stops once occupancy reaches the high watermark and resumes only after
//!    a poll observes occupancy at or below the low watermark.
//!
//! Rescheduling is modeled as an explicit return value
//! ([`PollOutcome::BudgetExhausted`]) rather than a callback into a
//! scheduler, so any host (thread, event loop, timer) can drive the engine;
//! `vnet-pump` provides a ready-made driver.
#![forbid(unsafe_code)]

pub mod config;
pub mod device;
pub mod error;
pub mod flow;
pub mod hooks;
pub mod queue;
pub mod stats;

pub use config::{
    PipelineConfig, DEFAULT_BUDGET, DEFAULT_CAPACITY, DEFAULT_HIGH_WATERMARK,
    DEFAULT_LOW_WATERMARK,
};
pub use device::{DropReason, PollOutcome, TxOutcome, VnetDevice};
pub use error::{ConfigError, PipelineError};
pub use flow::{FlowState, Watermarks};
pub use hooks::FlowHooks;
pub use queue::{FrameQueue, QueueFull};
pub use stats::PipelineStats;

pub use vnet_frame::{Frame, FrameSink, RecordingSink, MAX_FRAME_LEN};
