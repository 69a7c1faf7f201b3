//! The device front object: transmit path, budgeted poll engine, lifecycle.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, trace};
use vnet_frame::{Frame, FrameSink, MAX_FRAME_LEN};

use crate::config::PipelineConfig;
use crate::error::{ConfigError, PipelineError};
use crate::flow::{FlowState, Watermarks};
use crate::hooks::FlowHooks;
use crate::queue::{FrameQueue, QueueFull};
use crate::stats::{PipelineStats, StatCounters};

/// Result of one [`VnetDevice::submit`] call. One call, one outcome; the
/// transmit path never blocks and never retries internally.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// The frame was copied into the queue and will be delivered by a poll.
    Accepted,
    /// The frame was discarded and counted; expected under load, not a fault.
    Dropped(DropReason),
}

impl TxOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TxOutcome::Accepted)
    }
}

/// Why a submission was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The queue was at capacity.
    QueueFull,
    /// Flow control had already stopped the producer.
    Stopped,
    /// The payload exceeded [`MAX_FRAME_LEN`].
    Oversize,
}

/// Result of one [`VnetDevice::poll`] invocation.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The queue was drained before the budget ran out; the engine can go
    /// idle until the next submission sets the schedule token.
    Completed(usize),
    /// The budget ran out with frames still resident; the caller must
    /// reschedule promptly to avoid starving the queue.
    BudgetExhausted(usize),
}

impl PollOutcome {
    /// Frames delivered by this invocation.
    pub fn delivered(&self) -> usize {
        match *self {
            PollOutcome::Completed(n) | PollOutcome::BudgetExhausted(n) => n,
        }
    }

    pub fn needs_reschedule(&self) -> bool {
        matches!(self, PollOutcome::BudgetExhausted(_))
    }
}

/// Everything the pipeline mutates, bundled under a single lock.
///
/// The flow state and schedule token live beside the queue on purpose: every
/// transition is decided against the occupancy observed in the same critical
/// section, which is what rules out lost wakeups and stale watermark
/// decisions.
#[derive(Debug)]
struct PipelineState {
    queue: FrameQueue,
    flow: FlowState,
    poll_scheduled: bool,
    next_seq: u64,
    closed: bool,
}

/// A virtual network interface's packet pipeline.
///
/// One producer context calls [`submit`](Self::submit) while one consumer
/// context calls [`poll`](Self::poll); the two may run on separate threads
/// (`&self` methods throughout, share with `Arc`). The internal lock is never
/// held across a sink delivery or a hook invocation.
#[derive(Debug)]
pub struct VnetDevice<H: FlowHooks = ()> {
    state: Mutex<PipelineState>,
    stats: StatCounters,
    watermarks: Watermarks,
    config: PipelineConfig,
    hooks: H,
}

impl VnetDevice<()> {
    /// Build a device with no registration layer attached.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        Self::with_hooks(config, ())
    }
}

impl<H: FlowHooks> VnetDevice<H> {
    /// Build a device that signals `hooks` on flow-state transitions.
    pub fn with_hooks(config: PipelineConfig, hooks: H) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(PipelineState {
                queue: FrameQueue::new(config.capacity),
                flow: FlowState::Open,
                poll_scheduled: false,
                next_seq: 0,
                closed: false,
            }),
            stats: StatCounters::default(),
            watermarks: config.watermarks(),
            config,
            hooks,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Copy `data` into a frame and enqueue it for delivery.
    ///
    /// Returns [`TxOutcome::Dropped`] when the payload is oversized, flow
    /// control is stopped, or the queue is full. Drops are counted, never
    /// retried. Fails with [`PipelineError::Closed`] after teardown.
    pub fn submit(&self, data: &[u8]) -> Result<TxOutcome, PipelineError> {
        let mut pause_at = None;
        let outcome = {
            let mut st = self.lock_state();
            if st.closed {
                return Err(PipelineError::Closed);
            }
            if data.len() > MAX_FRAME_LEN {
                self.stats.record_dropped_oversize(data.len());
                trace!(len = data.len(), max = MAX_FRAME_LEN, "oversize frame dropped");
                TxOutcome::Dropped(DropReason::Oversize)
            } else if st.flow == FlowState::Stopped {
                self.stats.record_dropped_stopped(data.len());
                trace!(len = data.len(), "frame dropped while flow stopped");
                TxOutcome::Dropped(DropReason::Stopped)
            } else {
                let frame = Frame::from_slice(data, st.next_seq);
                match st.queue.enqueue(frame) {
                    Ok(()) => {
                        st.next_seq += 1;
                        st.poll_scheduled = true;
                        self.stats.record_accepted(data.len());
                        if self.watermarks.should_stop(st.queue.len()) {
                            st.flow = FlowState::Stopped;
                            pause_at = Some(st.queue.len());
                        }
                        TxOutcome::Accepted
                    }
                    Err(QueueFull(_)) => {
                        // Open flow implies len < high <= capacity, so this
                        // branch is a backstop for the queue contract.
                        self.stats.record_dropped_full(data.len());
                        trace!(len = data.len(), "frame dropped on full queue");
                        if st.flow == FlowState::Open {
                            st.flow = FlowState::Stopped;
                            pause_at = Some(st.queue.len());
                        }
                        TxOutcome::Dropped(DropReason::QueueFull)
                    }
                }
            }
        };
        if let Some(queue_len) = pause_at {
            debug!(queue_len, "transmit paused");
            self.hooks.on_pause();
        }
        Ok(outcome)
    }

    /// Drain up to `budget` frames, delivering each to `sink`.
    ///
    /// Clears the schedule token on entry. The internal lock is released
    /// around every [`FrameSink::deliver`] call, so a slow sink never stalls
    /// the transmit path. Fails with [`PipelineError::Closed`] after
    /// teardown; a teardown racing with an in-flight poll simply empties the
    /// queue, and the poll reports what it delivered as `Completed`.
    pub fn poll<S: FrameSink + ?Sized>(
        &self,
        budget: usize,
        sink: &mut S,
    ) -> Result<PollOutcome, PipelineError> {
        {
            let mut st = self.lock_state();
            if st.closed {
                return Err(PipelineError::Closed);
            }
            st.poll_scheduled = false;
        }

        let mut delivered = 0usize;
        while delivered < budget {
            let frame = {
                let mut st = self.lock_state();
                match st.queue.dequeue() {
                    Some(frame) => frame,
                    None => break,
                }
            };
            self.stats.record_delivered(frame.len());
            sink.deliver(frame);
            delivered += 1;
        }

        let (outcome, resume_at) = {
            let mut st = self.lock_state();
            let queue_len = st.queue.len();
            let resume = !st.closed
                && st.flow == FlowState::Stopped
                && self.watermarks.should_resume(queue_len);
            if resume {
                st.flow = FlowState::Open;
            }
            let outcome = if st.queue.is_empty() {
                PollOutcome::Completed(delivered)
            } else {
                PollOutcome::BudgetExhausted(delivered)
            };
            (outcome, resume.then_some(queue_len))
        };
        if let Some(queue_len) = resume_at {
            debug!(queue_len, "transmit resumed");
            self.hooks.on_resume();
        }
        Ok(outcome)
    }

    /// [`poll`](Self::poll) with the configured default budget.
    pub fn poll_default<S: FrameSink + ?Sized>(
        &self,
        sink: &mut S,
    ) -> Result<PollOutcome, PipelineError> {
        self.poll(self.config.default_budget, sink)
    }

    /// Whether a poll has been requested but not yet run.
    pub fn poll_requested(&self) -> bool {
        self.lock_state().poll_scheduled
    }

    /// Consume the schedule token.
    ///
    /// Exactly one caller observes `true` per token set, which is what keeps
    /// two schedulers from queueing two drains for the same request. Returns
    /// `false` on a closed device.
    pub fn take_poll_request(&self) -> bool {
        let mut st = self.lock_state();
        if st.closed {
            return false;
        }
        std::mem::replace(&mut st.poll_scheduled, false)
    }

    /// Forced reset: discard all resident frames, reopen flow control, and
    /// clear the schedule token. The device stays usable.
    pub fn purge(&self) -> Result<usize, PipelineError> {
        let (purged, resume) = {
            let mut st = self.lock_state();
            if st.closed {
                return Err(PipelineError::Closed);
            }
            let purged = st.queue.purge();
            self.stats.record_purged(purged as u64);
            st.poll_scheduled = false;
            let resume = st.flow == FlowState::Stopped;
            st.flow = FlowState::Open;
            (purged, resume)
        };
        debug!(purged, "queue purged");
        if resume {
            self.hooks.on_resume();
        }
        Ok(purged)
    }

    /// Teardown: discard all resident frames and reject every subsequent
    /// `submit`/`poll`/`purge` with [`PipelineError::Closed`]. Idempotent;
    /// returns the number of frames discarded.
    pub fn close(&self) -> usize {
        let (purged, pause) = {
            let mut st = self.lock_state();
            if st.closed {
                return 0;
            }
            st.closed = true;
            let purged = st.queue.purge();
            self.stats.record_purged(purged as u64);
            st.poll_scheduled = false;
            let pause = st.flow == FlowState::Open;
            st.flow = FlowState::Stopped;
            (purged, pause)
        };
        debug!(purged, "device closed");
        if pause {
            self.hooks.on_pause();
        }
        purged
    }

    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    /// Frames currently resident in the queue.
    pub fn len(&self) -> usize {
        self.lock_state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_state().queue.is_empty()
    }

    pub fn flow_state(&self) -> FlowState {
        self.lock_state().flow
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats.snapshot()
    }

    fn lock_state(&self) -> MutexGuard<'_, PipelineState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vnet_frame::RecordingSink;

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            capacity: 5,
            high_watermark: 5,
            low_watermark: 2,
            default_budget: 3,
        }
    }

    #[test]
    fn submit_then_poll_delivers_fifo() {
        let dev = VnetDevice::new(small_config()).unwrap();
        assert!(dev.submit(b"one").unwrap().is_accepted());
        assert!(dev.submit(b"two").unwrap().is_accepted());

        let mut sink = RecordingSink::new();
        let outcome = dev.poll(8, &mut sink).unwrap();
        assert_eq!(outcome, PollOutcome::Completed(2));

        let frames = sink.drain_frames();
        assert_eq!(frames[0].bytes(), b"one");
        assert_eq!(frames[1].bytes(), b"two");
        assert_eq!(frames[0].seq(), 0);
        assert_eq!(frames[1].seq(), 1);
    }

    #[test]
    fn poll_never_delivers_more_than_budget() {
        let dev = VnetDevice::new(small_config()).unwrap();
        for _ in 0..5 {
            let _ = dev.submit(b"x").unwrap();
        }

        let mut sink = RecordingSink::new();
        let outcome = dev.poll(3, &mut sink).unwrap();
        assert_eq!(outcome, PollOutcome::BudgetExhausted(3));
        assert_eq!(dev.len(), 2);
    }

    #[test]
    fn zero_budget_poll_reports_resident_work() {
        let dev = VnetDevice::new(small_config()).unwrap();
        let _ = dev.submit(b"x").unwrap();

        let outcome = dev.poll(0, &mut ()).unwrap();
        assert_eq!(outcome, PollOutcome::BudgetExhausted(0));

        let _ = dev.poll(8, &mut ()).unwrap();
        assert_eq!(dev.poll(0, &mut ()).unwrap(), PollOutcome::Completed(0));
    }

    #[test]
    fn oversize_submission_is_dropped_without_touching_the_queue() {
        let dev = VnetDevice::new(small_config()).unwrap();
        let oversize = vec![0u8; MAX_FRAME_LEN + 1];

        let outcome = dev.submit(&oversize).unwrap();
        assert_eq!(outcome, TxOutcome::Dropped(DropReason::Oversize));
        assert!(dev.is_empty());

        let stats = dev.stats();
        assert_eq!(stats.dropped_oversize, 1);
        assert_eq!(stats.dropped_oversize_bytes, (MAX_FRAME_LEN + 1) as u64);
        assert_eq!(stats.accepted, 0);
    }

    #[test]
    fn max_len_frame_is_accepted() {
        let dev = VnetDevice::new(PipelineConfig::default()).unwrap();
        let frame = vec![0u8; MAX_FRAME_LEN];
        assert!(dev.submit(&frame).unwrap().is_accepted());
    }

    #[test]
    fn submissions_while_stopped_are_dropped_even_with_space() {
        let config = PipelineConfig {
            capacity: 10,
            high_watermark: 5,
            low_watermark: 2,
            default_budget: 8,
        };
        let dev = VnetDevice::new(config).unwrap();
        for _ in 0..5 {
            assert!(dev.submit(b"x").unwrap().is_accepted());
        }
        assert_eq!(dev.flow_state(), FlowState::Stopped);

        // Space remains (5 of 10) but flow is stopped.
        let outcome = dev.submit(b"y").unwrap();
        assert_eq!(outcome, TxOutcome::Dropped(DropReason::Stopped));
        assert_eq!(dev.len(), 5);
        assert_eq!(dev.stats().dropped_stopped, 1);
    }

    #[test]
    fn schedule_token_is_set_by_submit_and_consumed_once() {
        let dev = VnetDevice::new(small_config()).unwrap();
        assert!(!dev.poll_requested());

        let _ = dev.submit(b"x").unwrap();
        assert!(dev.poll_requested());
        assert!(dev.take_poll_request());
        assert!(!dev.take_poll_request());
    }

    #[test]
    fn poll_clears_the_schedule_token_on_entry() {
        let dev = VnetDevice::new(small_config()).unwrap();
        let _ = dev.submit(b"x").unwrap();
        assert!(dev.poll_requested());

        let _ = dev.poll(8, &mut ()).unwrap();
        assert!(!dev.poll_requested());
    }

    #[test]
    fn purge_discards_and_reopens() {
        let dev = VnetDevice::new(small_config()).unwrap();
        for _ in 0..5 {
            let _ = dev.submit(b"x").unwrap();
        }
        assert_eq!(dev.flow_state(), FlowState::Stopped);

        assert_eq!(dev.purge().unwrap(), 5);
        assert!(dev.is_empty());
        assert_eq!(dev.flow_state(), FlowState::Open);
        assert!(!dev.poll_requested());
        assert_eq!(dev.stats().purged, 5);

        // Still usable after a forced reset.
        assert!(dev.submit(b"y").unwrap().is_accepted());
    }

    #[test]
    fn close_rejects_further_operations() {
        let dev = VnetDevice::new(small_config()).unwrap();
        let _ = dev.submit(b"x").unwrap();

        assert_eq!(dev.close(), 1);
        assert!(dev.is_closed());
        assert_eq!(dev.close(), 0);

        assert_eq!(dev.submit(b"y"), Err(PipelineError::Closed));
        assert_eq!(dev.poll(8, &mut ()), Err(PipelineError::Closed));
        assert_eq!(dev.purge(), Err(PipelineError::Closed));
        assert!(!dev.take_poll_request());
        assert_eq!(dev.stats().purged, 1);
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = PipelineConfig {
            capacity: 4,
            high_watermark: 6,
            low_watermark: 1,
            default_budget: 4,
        };
        assert_eq!(
            VnetDevice::new(config).unwrap_err(),
            ConfigError::HighAboveCapacity {
                high: 6,
                capacity: 4
            }
        );
    }
}
