//! Bounded-time, operator-interruptible sample acquisition.
//!
//! The engine owns the `SampleReader` for the duration of a run and paces
//! itself by sleeping the nominal inter-sample period between reads. Pacing is
//! best-effort; scheduling jitter is tolerated, not corrected. Samples are
//! recorded strictly in acquisition order, and a failed read aborts the phase
//! rather than skipping.

use crate::error::{CalError, Result};
use crate::stats::{PhaseSummary, StatsAccumulator, SummaryOpts};
use crate::types::{RawSample, Vec3};
use crate::util;
use imucal_traits::{Clock, MonotonicClock, SampleReader};
use std::sync::Arc;
use std::time::Duration;

/// Note appended when an interruptible capture ran into its hard deadline.
pub const NOTE_STOPPED_BY_TIMEOUT: &str = "stopped_by_timeout";

/// Observer verdict after each recorded sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureControl {
    Continue,
    /// Finish the capture now (interruptible mode; ignored by timed captures).
    Stop,
    /// Abandon the capture and the whole run.
    Cancel,
}

/// An ordered sample vector plus the summary computed over exactly it.
#[derive(Debug, Clone)]
pub struct Capture {
    pub samples: Vec<Vec3>,
    pub summary: PhaseSummary,
}

/// How a capture ended. Cancellation is a normal outcome here; the state
/// machine turns it into the terminal `cancelled` state.
#[derive(Debug)]
pub enum CaptureOutcome {
    Complete(Capture),
    Cancelled,
}

pub struct CaptureEngine<R: SampleReader> {
    reader: R,
    clock: Arc<dyn Clock + Send + Sync>,
    target_hz: u32,
}

impl<R: SampleReader> CaptureEngine<R> {
    pub fn new(reader: R, target_hz: u32) -> Self {
        Self::with_clock(reader, target_hz, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(reader: R, target_hz: u32, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            reader,
            clock,
            target_hz,
        }
    }

    pub fn target_hz(&self) -> u32 {
        self.target_hz
    }

    /// Nominal inter-sample spacing in seconds (used for integration).
    pub fn nominal_period_s(&self) -> f64 {
        util::period_s(self.target_hz)
    }

    /// Capture for a fixed wall-clock `duration`.
    ///
    /// `tick` runs after every recorded sample with the running count;
    /// `CaptureControl::Stop` is ignored here (timed phases auto-advance),
    /// `Cancel` abandons the buffer at the sample boundary.
    pub fn timed(
        &mut self,
        duration: Duration,
        project: impl Fn(&RawSample) -> Vec3,
        opts: SummaryOpts,
        mut tick: impl FnMut(usize) -> CaptureControl,
    ) -> Result<CaptureOutcome> {
        let period = util::period(self.target_hz);
        let duration_s = duration.as_secs_f64();
        let cap = (duration_s * f64::from(self.target_hz)).ceil() as usize + 1;
        let mut samples = Vec::with_capacity(cap);
        let mut acc = StatsAccumulator::new();

        let start = self.clock.now();
        loop {
            if self.clock.secs_since(start) >= duration_s {
                break;
            }
            let raw = self.read_one()?;
            let v = project(&raw);
            acc.push(v);
            samples.push(v);
            if tick(samples.len()) == CaptureControl::Cancel {
                return Ok(CaptureOutcome::Cancelled);
            }
            self.clock.sleep(period);
        }

        let summary = acc.summarize(self.clock.secs_since(start), opts);
        Ok(CaptureOutcome::Complete(Capture { samples, summary }))
    }

    /// Capture until `tick` asks to stop or `max` elapses.
    ///
    /// Timeout completes the phase normally and appends
    /// `stopped_by_timeout`; an operator stop appends nothing.
    pub fn interruptible(
        &mut self,
        max: Duration,
        project: impl Fn(&RawSample) -> Vec3,
        opts: SummaryOpts,
        mut tick: impl FnMut(usize) -> CaptureControl,
    ) -> Result<CaptureOutcome> {
        let period = util::period(self.target_hz);
        let max_s = max.as_secs_f64();
        let mut samples = Vec::new();
        let mut acc = StatsAccumulator::new();
        let mut timed_out = false;

        let start = self.clock.now();
        loop {
            if self.clock.secs_since(start) >= max_s {
                timed_out = true;
                break;
            }
            let raw = self.read_one()?;
            let v = project(&raw);
            acc.push(v);
            samples.push(v);
            match tick(samples.len()) {
                CaptureControl::Cancel => return Ok(CaptureOutcome::Cancelled),
                CaptureControl::Stop => break,
                CaptureControl::Continue => {}
            }
            self.clock.sleep(period);
        }

        let mut summary = acc.summarize(self.clock.secs_since(start), opts);
        if timed_out {
            summary.push_note(NOTE_STOPPED_BY_TIMEOUT);
        }
        Ok(CaptureOutcome::Complete(Capture { samples, summary }))
    }

    fn read_one(&mut self) -> Result<RawSample> {
        self.reader.read().map_err(|e| {
            tracing::error!(error = %e, "sample read failed, aborting phase");
            eyre::Report::new(CalError::SampleRead(e.to_string()))
        })
    }

    /// Release the reader at shutdown.
    pub fn into_reader(self) -> R {
        self.reader
    }
}
