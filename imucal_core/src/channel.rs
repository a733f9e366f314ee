//! Operator interaction contract.
//!
//! The engine never talks to a terminal or a socket directly; it prompts,
//! waits for signals, and reports events through this trait. A single
//! `Advance` signal means "begin" when a phase is pending and "stop" while an
//! interruptible capture is running. `Cancel` terminates the run from any
//! state and must be observed no later than the next `await_signal` or the
//! current capture's next sample boundary.

use crate::error::Result;
use crate::session::SessionEvent;
use crate::types::UnitId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Advance,
    Cancel,
}

pub trait OperatorChannel {
    /// Deliver a human-readable instruction.
    fn prompt(&mut self, message: &str) -> Result<()>;

    /// Block until the operator sends a signal.
    fn await_signal(&mut self) -> Result<Signal>;

    /// Non-blocking check, polled between samples during captures.
    fn poll_signal(&mut self) -> Result<Option<Signal>>;

    /// Resolve the both-units-present branch of unit selection.
    fn select_unit(&mut self, available: &[UnitId]) -> Result<UnitId>;

    /// Push a progress/phase/stats/completion/error event.
    fn report(&mut self, event: &SessionEvent) -> Result<()>;
}
