//! Glue for driving a [`VnetDevice`]'s poll engine from a host scheduler.
//!
//! Integration layers (a device-registration shim, a test harness, an event
//! loop) need the same glue: watch the device's schedule token, run one
//! budgeted poll when it is set, and keep rescheduling while the engine
//! reports [`PollOutcome::BudgetExhausted`]. [`VnetPump`] packages that
//! loop; [`tick_vnet`] is the low-level primitive for callers that borrow
//! their sink.
#![forbid(unsafe_code)]

use vnet_frame::FrameSink;
use vnet_pipeline::{FlowHooks, PipelineError, PollOutcome, VnetDevice, DEFAULT_BUDGET};

/// What one [`VnetPump::tick`] call did.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickCounts {
    /// Frames handed to the sink during this tick.
    pub delivered: usize,
    /// Whether a poll actually ran (the schedule token was set or a prior
    /// poll left work behind).
    pub polled: bool,
    /// Whether the engine ran out of budget and must be ticked again soon.
    pub needs_reschedule: bool,
}

/// Run one budgeted poll over a borrowed device and sink.
///
/// This is the unconditional, periodic-driving form: it polls whether or not
/// the schedule token is set (the poll itself consumes the token).
pub fn tick_vnet<H: FlowHooks, S: FrameSink + ?Sized>(
    device: &VnetDevice<H>,
    sink: &mut S,
    budget: usize,
) -> Result<PollOutcome, PipelineError> {
    device.poll(budget, sink)
}

/// Token-driven poll scheduler owning its sink and budget.
///
/// `tick()` is intended to be called once per host scheduling slice: it runs
/// a poll only when the device requested one (or when the previous poll was
/// cut off by its budget), so an idle device costs one token check per tick.
#[derive(Debug)]
pub struct VnetPump<S> {
    sink: S,
    budget: usize,
    pending: bool,
}

impl<S: FrameSink> VnetPump<S> {
    /// Create a pump with the default per-poll budget.
    pub fn new(sink: S) -> Self {
        Self::with_budget(sink, DEFAULT_BUDGET)
    }

    /// Create a pump with an explicit per-poll budget.
    pub fn with_budget(sink: S, budget: usize) -> Self {
        Self {
            sink,
            budget,
            pending: false,
        }
    }

    /// Run one scheduling slice against `device`.
    pub fn tick<H: FlowHooks>(
        &mut self,
        device: &VnetDevice<H>,
    ) -> Result<TickCounts, PipelineError> {
        if !self.pending && !device.take_poll_request() {
            return Ok(TickCounts::default());
        }

        let outcome = device.poll(self.budget, &mut self.sink)?;
        self.pending = outcome.needs_reschedule();
        Ok(TickCounts {
            delivered: outcome.delivered(),
            polled: true,
            needs_reschedule: self.pending,
        })
    }

    /// Poll repeatedly until the queue drains or `max_polls` is reached.
    ///
    /// Returns the total number of frames delivered. Bounded by construction;
    /// callers control the worst case via `max_polls`.
    pub fn pump_until_idle<H: FlowHooks>(
        &mut self,
        device: &VnetDevice<H>,
        max_polls: usize,
    ) -> Result<usize, PipelineError> {
        let mut total = 0;
        for _ in 0..max_polls {
            let outcome = device.poll(self.budget, &mut self.sink)?;
            total += outcome.delivered();
            self.pending = outcome.needs_reschedule();
            if !self.pending {
                break;
            }
        }
        Ok(total)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn set_budget(&mut self, budget: usize) {
        self.budget = budget;
    }
}
