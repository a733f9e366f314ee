//! Test and helper mocks for imucal_core.

use crate::channel::{OperatorChannel, Signal};
use crate::error::Result;
use crate::session::SessionEvent;
use crate::types::{RawSample, UnitId};
use imucal_traits::SampleReader;
use std::collections::VecDeque;

/// Reader that cycles a scripted sample vector, optionally failing after a
/// fixed number of reads.
pub struct ScriptedReader {
    samples: Vec<RawSample>,
    idx: usize,
    reads: usize,
    fail_after: Option<usize>,
}

impl ScriptedReader {
    pub fn cycling(samples: Vec<RawSample>) -> Self {
        Self {
            samples,
            idx: 0,
            reads: 0,
            fail_after: None,
        }
    }

    /// Same stream, but every read past `n` fails.
    pub fn failing_after(samples: Vec<RawSample>, n: usize) -> Self {
        Self {
            samples,
            idx: 0,
            reads: 0,
            fail_after: Some(n),
        }
    }

    /// A constant stream, e.g. a perfectly stationary unit.
    pub fn constant(sample: RawSample) -> Self {
        Self::cycling(vec![sample])
    }
}

impl SampleReader for ScriptedReader {
    fn read(&mut self) -> std::result::Result<RawSample, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(n) = self.fail_after
            && self.reads >= n
        {
            return Err(Box::new(std::io::Error::other("scripted read failure")));
        }
        if self.samples.is_empty() {
            return Err(Box::new(std::io::Error::other("no scripted samples")));
        }
        let s = self.samples[self.idx % self.samples.len()];
        self.idx += 1;
        self.reads += 1;
        Ok(s)
    }
}

/// Channel that answers from scripted queues and records everything it is
/// asked to deliver. `await_signal` defaults to `Advance` and `poll_signal`
/// to quiet once the scripts run out, so a default instance drives a full
/// run to completion.
pub struct ScriptedChannel {
    pub unit: UnitId,
    pub signals: VecDeque<Signal>,
    pub polls: VecDeque<Option<Signal>>,
    pub prompts: Vec<String>,
    /// Events serialized to their wire form, in order.
    pub events: Vec<String>,
}

impl ScriptedChannel {
    pub fn new(unit: UnitId) -> Self {
        Self {
            unit,
            signals: VecDeque::new(),
            polls: VecDeque::new(),
            prompts: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Queue a cancel as the `n`-th await response (earlier ones advance).
    pub fn cancel_at_await(mut self, n: usize) -> Self {
        for _ in 0..n {
            self.signals.push_back(Signal::Advance);
        }
        self.signals.push_back(Signal::Cancel);
        self
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| {
                serde_json::from_str::<serde_json::Value>(e)
                    .ok()
                    .and_then(|v| v["type"].as_str().map(str::to_string))
            })
            .collect()
    }
}

impl OperatorChannel for ScriptedChannel {
    fn prompt(&mut self, message: &str) -> Result<()> {
        self.prompts.push(message.to_string());
        Ok(())
    }

    fn await_signal(&mut self) -> Result<Signal> {
        Ok(self.signals.pop_front().unwrap_or(Signal::Advance))
    }

    fn poll_signal(&mut self) -> Result<Option<Signal>> {
        Ok(self.polls.pop_front().unwrap_or(None))
    }

    fn select_unit(&mut self, _available: &[UnitId]) -> Result<UnitId> {
        Ok(self.unit)
    }

    fn report(&mut self, event: &SessionEvent) -> Result<()> {
        self.events.push(
            serde_json::to_string(event)
                .map_err(|e| eyre::Report::new(crate::error::CalError::Channel(e.to_string())))?,
        );
        Ok(())
    }
}

pub mod rig {
    //! Orientation-scripted rig for full-run tests.
    //!
    //! A shared step index couples a reader and a channel: every time the
    //! machine awaits an operator advance, the index moves and the reader
    //! starts rendering the orientation the new capture step expects, the
    //! way a compliant human run would.

    use super::*;
    use crate::machine::CalStep;
    use crate::types::{Axis, Pose};
    use std::sync::{Arc, Mutex};

    pub type StepIndex = Arc<Mutex<i64>>;

    /// Deterministic raw sample for capture step `step`, read number `n`
    /// within that step. `flat_accel` suppresses pose gravity so the accel
    /// phase fails its gravity-separation check.
    pub fn sample_for(step: CalStep, n: u64, flat_accel: bool) -> RawSample {
        let mut s = RawSample::zeroed(UnitId::Left);
        (s.gx, s.gy, s.gz) = (2, -3, 1);
        (s.ax, s.ay, s.az) = (0, 0, 4096);
        match step {
            CalStep::GyroStatic => {}
            CalStep::GyroSpin(axis) => {
                // back-and-forth spin at 0.2 Hz plus a 3-count residual bias
                let t = n as f64 * 0.01;
                let rate =
                    (400.0 * (std::f64::consts::TAU * t / 5.0).sin() + 3.0).round() as i16;
                match axis {
                    Axis::X => s.gx = s.gx.saturating_add(rate),
                    Axis::Y => s.gy = s.gy.saturating_add(rate),
                    Axis::Z => s.gz = s.gz.saturating_add(rate),
                }
            }
            CalStep::AccelPose(p) => {
                if flat_accel {
                    (s.ax, s.ay, s.az) = (0, 0, 0);
                } else {
                    (s.ax, s.ay, s.az) = (10, -20, 5);
                    let g: i16 = if p.is_positive() { 4096 } else { -4096 };
                    match p.axis() {
                        Axis::X => s.ax += g,
                        Axis::Y => s.ay += g,
                        Axis::Z => s.az += g,
                    }
                }
            }
            CalStep::Mag => {
                let theta = 0.073 * n as f64;
                let phi = (0.011 * n as f64).sin() * 1.35;
                s.mx = (120.0 + 350.0 * theta.cos() * phi.cos()).round() as i16;
                s.my = (-80.0 + 350.0 * theta.sin() * phi.cos()).round() as i16;
                s.mz = (40.0 + 350.0 * phi.sin()).round() as i16;
            }
        }
        s
    }

    /// Reader that renders whatever step the shared index points at.
    pub struct RigReader {
        step: StepIndex,
        n: u64,
        last: i64,
        flat_accel: bool,
    }

    impl SampleReader for RigReader {
        fn read(
            &mut self,
        ) -> std::result::Result<RawSample, Box<dyn std::error::Error + Send + Sync>> {
            let cur = self.step.lock().map(|g| *g).unwrap_or(-1);
            if cur != self.last {
                self.n = 0;
                self.last = cur;
            }
            let n = self.n;
            self.n += 1;
            let step = CalStep::SEQUENCE
                .get(cur.max(0) as usize)
                .copied()
                .unwrap_or(CalStep::GyroStatic);
            Ok(sample_for(step, n, self.flat_accel))
        }
    }

    /// Wraps any channel, bumping the shared step index on every await so
    /// the rig reader reorients with the operator.
    pub struct AdvancingChannel<C> {
        pub inner: C,
        step: StepIndex,
    }

    impl<C: OperatorChannel> OperatorChannel for AdvancingChannel<C> {
        fn prompt(&mut self, message: &str) -> Result<()> {
            self.inner.prompt(message)
        }
        fn await_signal(&mut self) -> Result<Signal> {
            if let Ok(mut g) = self.step.lock() {
                *g += 1;
            }
            self.inner.await_signal()
        }
        fn poll_signal(&mut self) -> Result<Option<Signal>> {
            self.inner.poll_signal()
        }
        fn select_unit(&mut self, available: &[UnitId]) -> Result<UnitId> {
            self.inner.select_unit(available)
        }
        fn report(&mut self, event: &SessionEvent) -> Result<()> {
            self.inner.report(event)
        }
    }

    /// Build a coupled reader/channel pair around `chan`.
    pub fn guided<C: OperatorChannel>(chan: C, flat_accel: bool) -> (RigReader, AdvancingChannel<C>) {
        let step: StepIndex = Arc::new(Mutex::new(-1));
        let reader = RigReader {
            step: Arc::clone(&step),
            n: 0,
            last: -1,
            flat_accel,
        };
        (reader, AdvancingChannel { inner: chan, step })
    }
}
