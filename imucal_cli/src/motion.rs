//! Steers the simulated unit to follow the guided instructions.
//!
//! Real hardware gets reoriented by the operator's hands; the simulated pair
//! has none, so this adapter watches the step announcements on their way to
//! the operator and sets the unit's `MotionHandle` to whatever a compliant
//! operator would be doing. Everything else passes straight through.

use imucal_core::error::Result;
use imucal_core::session::SessionEvent;
use imucal_core::{OperatorChannel, Signal, UnitId};
use imucal_hardware::{MotionHandle, motion_for_step};

pub struct MotionFollower<C> {
    inner: C,
    handle: MotionHandle,
}

impl<C> MotionFollower<C> {
    pub fn new(inner: C, handle: MotionHandle) -> Self {
        Self { inner, handle }
    }
}

impl<C: OperatorChannel> OperatorChannel for MotionFollower<C> {
    fn prompt(&mut self, message: &str) -> Result<()> {
        self.inner.prompt(message)
    }

    fn await_signal(&mut self) -> Result<Signal> {
        self.inner.await_signal()
    }

    fn poll_signal(&mut self) -> Result<Option<Signal>> {
        self.inner.poll_signal()
    }

    fn select_unit(&mut self, available: &[UnitId]) -> Result<UnitId> {
        self.inner.select_unit(available)
    }

    fn report(&mut self, event: &SessionEvent) -> Result<()> {
        if let SessionEvent::Step { step, .. } = event
            && let Some(motion) = motion_for_step(step)
        {
            self.handle.set(motion);
        }
        self.inner.report(event)
    }
}
