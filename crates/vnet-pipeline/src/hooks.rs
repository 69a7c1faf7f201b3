//! Flow-control signals to the device-registration layer.

use std::sync::Arc;

/// Callbacks the pipeline invokes outward on flow-state transitions.
///
/// `on_pause` is the moral equivalent of halting an upstream transmit queue;
/// `on_resume` releases it. Both are invoked with the pipeline lock released,
/// so implementations may call back into the device. The default impls are
/// no-ops, and `()` can be used where no registration layer exists.
pub trait FlowHooks {
    fn on_pause(&self) {}
    fn on_resume(&self) {}
}

impl FlowHooks for () {}

impl<T: FlowHooks + ?Sized> FlowHooks for &T {
    fn on_pause(&self) {
        <T as FlowHooks>::on_pause(&**self);
    }

    fn on_resume(&self) {
        <T as FlowHooks>::on_resume(&**self);
    }
}

impl<T: FlowHooks + ?Sized> FlowHooks for Box<T> {
    fn on_pause(&self) {
        <T as FlowHooks>::on_pause(&**self);
    }

    fn on_resume(&self) {
        <T as FlowHooks>::on_resume(&**self);
    }
}

impl<T: FlowHooks + ?Sized> FlowHooks for Arc<T> {
    fn on_pause(&self) {
        <T as FlowHooks>::on_pause(&**self);
    }

    fn on_resume(&self) {
        <T as FlowHooks>::on_resume(&**self);
    }
}
