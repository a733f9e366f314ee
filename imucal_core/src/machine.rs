//! Calibration state machine: phase ordering, progress, aggregation.
//!
//! Phases are encoded as tagged variants of a single current-state value
//! driven through an explicit step table, so the socket session can resume
//! after each operator `next`, tests can drive the machine deterministically
//! without hardware, and cancellation funnels through one site.

use crate::accel::{self, AccelPoseSummary};
use crate::artifact::{AxisPhases, CalibrationResult, ConfidenceBlock, SCHEMA_VERSION};
use crate::capture::{CaptureControl, CaptureEngine, CaptureOutcome};
use crate::channel::{OperatorChannel, Signal};
use crate::confidence;
use crate::error::{CalError, Result};
use crate::gyro::{self, AxisRefinement, StaticBias};
use crate::mag::{self, MagCalibration, NOTE_INSUFFICIENT_EXCITATION};
use crate::session::{CompleteResults, PhaseId, SessionEvent, StatsSnapshot};
use crate::stats::{PhaseSummary, SummaryOpts};
use crate::types::{Axis, Pose, SampleExt, UnitId, Vec3};
use imucal_traits::{Clock, SampleReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// One data-capture step of the guided sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalStep {
    GyroStatic,
    GyroSpin(Axis),
    AccelPose(Pose),
    Mag,
}

impl CalStep {
    /// The fixed guided-run order. Progress is computed against this table.
    pub const SEQUENCE: [CalStep; 11] = [
        CalStep::GyroStatic,
        CalStep::GyroSpin(Axis::X),
        CalStep::GyroSpin(Axis::Y),
        CalStep::GyroSpin(Axis::Z),
        CalStep::AccelPose(Pose::PlusX),
        CalStep::AccelPose(Pose::MinusX),
        CalStep::AccelPose(Pose::PlusY),
        CalStep::AccelPose(Pose::MinusY),
        CalStep::AccelPose(Pose::PlusZ),
        CalStep::AccelPose(Pose::MinusZ),
        CalStep::Mag,
    ];

    /// Wire-level step identifier. Poses map positionally onto the
    /// orientation names the session clients use.
    pub const fn id(self) -> &'static str {
        match self {
            CalStep::GyroStatic => "gyro-static",
            CalStep::GyroSpin(Axis::X) => "gyro-x",
            CalStep::GyroSpin(Axis::Y) => "gyro-y",
            CalStep::GyroSpin(Axis::Z) => "gyro-z",
            CalStep::AccelPose(Pose::PlusX) => "accel-up",
            CalStep::AccelPose(Pose::MinusX) => "accel-down",
            CalStep::AccelPose(Pose::PlusY) => "accel-right",
            CalStep::AccelPose(Pose::MinusY) => "accel-left",
            CalStep::AccelPose(Pose::PlusZ) => "accel-forward",
            CalStep::AccelPose(Pose::MinusZ) => "accel-back",
            CalStep::Mag => "mag-calibrate",
        }
    }

    pub const fn phase(self) -> PhaseId {
        match self {
            CalStep::GyroStatic | CalStep::GyroSpin(_) => PhaseId::Gyro,
            CalStep::AccelPose(_) => PhaseId::Accel,
            CalStep::Mag => PhaseId::Mag,
        }
    }

    /// Operator-facing instruction for this step.
    pub fn instruction(self) -> String {
        match self {
            CalStep::GyroStatic => {
                "Place the unit on a stable surface and keep it perfectly still.".to_string()
            }
            CalStep::GyroSpin(a) => format!(
                "Rotate the unit steadily around its {} axis; press enter or send next when done.",
                a.as_str().to_uppercase()
            ),
            CalStep::AccelPose(p) => format!(
                "Hold the unit steady with the {} axis pointing straight up.",
                p.label()
            ),
            CalStep::Mag => {
                "Slowly tumble the unit through all orientations; press enter or send next when done."
                    .to_string()
            }
        }
    }
}

/// Current position of the run; terminal states carry no data of their own,
/// results live in `RunOutcome`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    SelectUnit,
    Capture(usize),
    Finalize,
    Complete,
    Cancelled,
}

/// Per-phase capture durations and the target acquisition rate.
#[derive(Debug, Clone)]
pub struct CaptureTiming {
    pub target_hz: u32,
    pub gyro_static: Duration,
    pub spin_min: Duration,
    pub spin_max: Duration,
    pub accel_pose: Duration,
    pub mag_max: Duration,
}

impl Default for CaptureTiming {
    fn default() -> Self {
        Self {
            target_hz: 100,
            gyro_static: Duration::from_secs(10),
            spin_min: Duration::from_secs(8),
            spin_max: Duration::from_secs(30),
            accel_pose: Duration::from_secs(6),
            mag_max: Duration::from_secs(60),
        }
    }
}

/// How a run ended. Fatal conditions come back as errors instead.
#[derive(Debug)]
pub enum RunOutcome {
    Complete {
        result: CalibrationResult,
        path: PathBuf,
    },
    Cancelled,
}

enum StepStatus {
    Done,
    Cancelled,
}

/// Resolve which unit to calibrate: automatic for a single attached unit,
/// solicited through the channel when both are present, fatal when none is.
pub fn select_unit(available: &[UnitId], chan: &mut dyn OperatorChannel) -> Result<UnitId> {
    match available {
        [] => {
            let _ = chan.report(&SessionEvent::Error {
                message: CalError::NoUnitAvailable.to_string(),
            });
            Err(eyre::Report::new(CalError::NoUnitAvailable))
        }
        [only] => {
            tracing::info!(unit = %only, "single unit attached; selected automatically");
            Ok(*only)
        }
        _ => chan.select_unit(available),
    }
}

/// Progress percentage from completed steps plus the in-phase fraction.
pub fn progress_percent(completed: usize, in_phase_fraction: f64) -> f64 {
    let total = CalStep::SEQUENCE.len() as f64;
    ((completed as f64 + in_phase_fraction.clamp(0.0, 1.0)) / total * 100.0).clamp(0.0, 100.0)
}

pub struct Calibrator<R: SampleReader> {
    unit: UnitId,
    engine: CaptureEngine<R>,
    timing: CaptureTiming,
    output_dir: PathBuf,
    state: MachineState,
    samples_total: u64,
    gyro_static: Option<(PhaseSummary, StaticBias)>,
    spins: Vec<(PhaseSummary, AxisRefinement)>,
    poses: Vec<AccelPoseSummary>,
    mag: Option<(PhaseSummary, MagCalibration)>,
}

impl<R: SampleReader> Calibrator<R> {
    pub fn new(unit: UnitId, reader: R, timing: CaptureTiming, output_dir: PathBuf) -> Self {
        let engine = CaptureEngine::new(reader, timing.target_hz);
        Self::from_engine(unit, engine, timing, output_dir)
    }

    /// Construct with an injected clock for deterministic runs.
    pub fn with_clock(
        unit: UnitId,
        reader: R,
        timing: CaptureTiming,
        output_dir: PathBuf,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let engine = CaptureEngine::with_clock(reader, timing.target_hz, clock);
        Self::from_engine(unit, engine, timing, output_dir)
    }

    fn from_engine(
        unit: UnitId,
        engine: CaptureEngine<R>,
        timing: CaptureTiming,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            unit,
            engine,
            timing,
            output_dir,
            state: MachineState::SelectUnit,
            samples_total: 0,
            gyro_static: None,
            spins: Vec::with_capacity(3),
            poses: Vec::with_capacity(6),
            mag: None,
        }
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    /// Drive the whole guided sequence to a terminal state.
    ///
    /// Exactly one phase is active at a time; the operator advances pending
    /// phases and stops interruptible ones through `chan`. On fatal errors a
    /// diagnostic is reported before the error propagates.
    pub fn run(mut self, chan: &mut dyn OperatorChannel) -> Result<RunOutcome> {
        tracing::info!(unit = %self.unit, "calibration run started");
        let mut last_phase = None;

        for (idx, step) in CalStep::SEQUENCE.iter().copied().enumerate() {
            self.state = MachineState::Capture(idx);
            let phase = step.phase();
            if last_phase != Some(phase) {
                if chan.report(&SessionEvent::Phase { phase }).is_err() {
                    return self.cancelled(chan);
                }
                last_phase = Some(phase);
            }
            if chan
                .report(&SessionEvent::Step {
                    step: step.id(),
                    phase,
                })
                .is_err()
            {
                return self.cancelled(chan);
            }
            chan.prompt(&step.instruction())?;
            if chan.report(&SessionEvent::Action { message: "ready" }).is_err() {
                return self.cancelled(chan);
            }
            match chan.await_signal()? {
                Signal::Cancel => return self.cancelled(chan),
                Signal::Advance => {}
            }

            tracing::info!(step = step.id(), "capture started");
            match self.run_step(idx, step, chan) {
                Ok(StepStatus::Done) => {}
                Ok(StepStatus::Cancelled) => return self.cancelled(chan),
                Err(e) => {
                    let _ = chan.report(&SessionEvent::Error {
                        message: e.to_string(),
                    });
                    return Err(e);
                }
            }
            let _ = chan.report(&SessionEvent::Stats {
                stats: self.stats_snapshot(idx + 1),
            });
            let _ = chan.report(&SessionEvent::Progress {
                progress: progress_percent(idx + 1, 0.0),
            });
        }

        self.state = MachineState::Finalize;
        match self.finalize() {
            Ok((result, path)) => {
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let _ = chan.report(&SessionEvent::Complete {
                    results: CompleteResults { filename },
                });
                self.state = MachineState::Complete;
                tracing::info!(overall = result.confidence.overall, "calibration complete");
                Ok(RunOutcome::Complete { result, path })
            }
            Err(e) => {
                let _ = chan.report(&SessionEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn run_step(
        &mut self,
        idx: usize,
        step: CalStep,
        chan: &mut dyn OperatorChannel,
    ) -> Result<StepStatus> {
        let period_s = self.engine.nominal_period_s();
        let hz = f64::from(self.engine.target_hz());
        let expected_for = |d: Duration| (d.as_secs_f64() * hz).max(1.0);

        match step {
            CalStep::GyroStatic => {
                let expected = expected_for(self.timing.gyro_static);
                let outcome = self.engine.timed(
                    self.timing.gyro_static,
                    |s| s.gyro(),
                    SummaryOpts::default(),
                    sample_tick(chan, idx, expected),
                )?;
                let CaptureOutcome::Complete(cap) = outcome else {
                    return Ok(StepStatus::Cancelled);
                };
                self.samples_total += cap.summary.count as u64;
                let est = gyro::static_bias(&cap.summary);
                tracing::info!(
                    bias = ?est.bias,
                    confidence = est.confidence,
                    "gyro static bias estimated"
                );
                self.gyro_static = Some((cap.summary, est));
            }
            CalStep::GyroSpin(axis) => {
                let expected = expected_for(self.timing.spin_max);
                let bias = self
                    .gyro_static
                    .as_ref()
                    .map(|(_, e)| e.bias)
                    .unwrap_or(Vec3::ZERO);
                let opts = SummaryOpts {
                    dominance: true,
                    integrate_period_s: Some(period_s),
                };
                let outcome = self.engine.interruptible(
                    self.timing.spin_max,
                    move |s| s.gyro() - bias,
                    opts,
                    sample_tick(chan, idx, expected),
                )?;
                let CaptureOutcome::Complete(cap) = outcome else {
                    return Ok(StepStatus::Cancelled);
                };
                self.samples_total += cap.summary.count as u64;
                let mut summary = cap.summary;
                let min_s = self.timing.spin_min.as_secs_f64();
                if summary.duration_s < min_s {
                    summary.push_note(format!(
                        "too_short:{:.1}s<{:.0}s",
                        summary.duration_s, min_s
                    ));
                    tracing::warn!(axis = %axis, duration_s = summary.duration_s, "spin too short");
                }
                let est = gyro::refine_axis(axis, &summary, min_s);
                tracing::info!(
                    axis = %axis,
                    residual = est.residual,
                    confidence = est.confidence,
                    "gyro axis refined"
                );
                self.spins.push((summary, est));
            }
            CalStep::AccelPose(pose) => {
                let expected = expected_for(self.timing.accel_pose);
                let outcome = self.engine.timed(
                    self.timing.accel_pose,
                    |s| s.accel(),
                    SummaryOpts::default(),
                    sample_tick(chan, idx, expected),
                )?;
                let CaptureOutcome::Complete(cap) = outcome else {
                    return Ok(StepStatus::Cancelled);
                };
                self.samples_total += cap.summary.count as u64;
                let pose_summary = AccelPoseSummary::from_phase(pose, &cap.summary);
                tracing::info!(
                    pose = %pose,
                    mean = ?pose_summary.mean,
                    stillness = pose_summary.stillness,
                    "pose captured"
                );
                self.poses.push(pose_summary);
            }
            CalStep::Mag => {
                let expected = expected_for(self.timing.mag_max);
                let outcome = self.engine.interruptible(
                    self.timing.mag_max,
                    |s| s.mag(),
                    SummaryOpts::default(),
                    sample_tick(chan, idx, expected),
                )?;
                let CaptureOutcome::Complete(cap) = outcome else {
                    return Ok(StepStatus::Cancelled);
                };
                self.samples_total += cap.summary.count as u64;
                let cal = mag::solve(&cap.samples);
                let mut summary = cap.summary;
                if cal.degraded {
                    summary.push_note(NOTE_INSUFFICIENT_EXCITATION);
                }
                tracing::info!(
                    offset = ?cal.offset,
                    scale = ?cal.scale,
                    confidence = cal.confidence,
                    "magnetometer solved"
                );
                self.mag = Some((summary, cal));
            }
        }
        Ok(StepStatus::Done)
    }

    fn finalize(&mut self) -> Result<(CalibrationResult, PathBuf)> {
        let (gs_phase, gs) = self
            .gyro_static
            .take()
            .ok_or_else(|| eyre::eyre!("gyro static phase missing at finalize"))?;
        if self.spins.len() != 3 {
            eyre::bail!("expected three spin phases, have {}", self.spins.len());
        }
        let mut spin_iter = self.spins.drain(..);
        let (px, ex) = spin_iter.next().ok_or_else(|| eyre::eyre!("spin x missing"))?;
        let (py, ey) = spin_iter.next().ok_or_else(|| eyre::eyre!("spin y missing"))?;
        let (pz, ez) = spin_iter.next().ok_or_else(|| eyre::eyre!("spin z missing"))?;
        drop(spin_iter);
        let dynamic = gyro::combine_axes(&[ex, ey, ez]);
        let accel_cal = accel::solve(&self.poses)?;
        let (mag_phase, mag_cal) = self
            .mag
            .take()
            .ok_or_else(|| eyre::eyre!("mag phase missing at finalize"))?;

        let overall = confidence::overall(
            gs.confidence,
            dynamic.confidence,
            accel_cal.confidence,
            mag_cal.confidence,
        );
        let captured_at = chrono::Local::now()
            .format("%Y-%m-%dT%H:%M:%S%:z")
            .to_string();

        let result = CalibrationResult {
            schema_version: SCHEMA_VERSION,
            captured_at,
            unit: self.unit,
            gyro_bias_static: gs.bias,
            gyro_bias_dynamic: dynamic.bias,
            gyro_bias_final: gyro::final_bias(gs.bias, dynamic.bias),
            accel_bias: accel_cal.bias,
            accel_scale: accel_cal.scale,
            mag_offset: mag_cal.offset,
            mag_scale: mag_cal.scale,
            confidence: ConfidenceBlock {
                gyro_static: gs.confidence,
                gyro_rotation: dynamic.confidence,
                accel_6pt: accel_cal.confidence,
                mag: mag_cal.confidence,
                overall,
            },
            gyro_static_phase: gs_phase,
            gyro_rotation_phases: AxisPhases {
                x: px,
                y: py,
                z: pz,
            },
            accel_poses: std::mem::take(&mut self.poses),
            mag_phase,
            notes: None,
        };

        let path = result.write_to(&self.output_dir)?;
        Ok((result, path))
    }

    fn stats_snapshot(&self, completed: usize) -> StatsSnapshot {
        let gyro_done = completed.min(4);
        let accel_done = completed.saturating_sub(4).min(6);
        let mag_done = completed.saturating_sub(10).min(1);
        StatsSnapshot {
            gyro: gyro_done as f64 / 4.0 * 100.0,
            accel: accel_done as f64 / 6.0 * 100.0,
            mag: mag_done as f64 * 100.0,
            samples: self.samples_total,
        }
    }

    /// Single cancellation site: discard phase data, report, end the run.
    fn cancelled(mut self, chan: &mut dyn OperatorChannel) -> Result<RunOutcome> {
        self.state = MachineState::Cancelled;
        self.gyro_static = None;
        self.spins.clear();
        self.poses.clear();
        self.mag = None;
        tracing::warn!(unit = %self.unit, "calibration cancelled; no artifact written");
        let _ = chan.report(&SessionEvent::Action {
            message: "cancelled",
        });
        Ok(RunOutcome::Cancelled)
    }
}

/// Per-sample observer: report fractional progress, then poll for operator
/// signals so cancel lands on the sample boundary.
fn sample_tick<'a>(
    chan: &'a mut dyn OperatorChannel,
    step_idx: usize,
    expected_samples: f64,
) -> impl FnMut(usize) -> CaptureControl + 'a {
    move |n| {
        let frac = (n as f64 / expected_samples).min(1.0);
        if chan
            .report(&SessionEvent::Progress {
                progress: progress_percent(step_idx, frac),
            })
            .is_err()
        {
            return CaptureControl::Cancel;
        }
        match chan.poll_signal() {
            Ok(Some(Signal::Cancel)) | Err(_) => CaptureControl::Cancel,
            Ok(Some(Signal::Advance)) => CaptureControl::Stop,
            Ok(None) => CaptureControl::Continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_covers_eleven_steps_in_order() {
        let ids: Vec<&str> = CalStep::SEQUENCE.iter().map(|s| s.id()).collect();
        assert_eq!(
            ids,
            [
                "gyro-static",
                "gyro-x",
                "gyro-y",
                "gyro-z",
                "accel-up",
                "accel-down",
                "accel-right",
                "accel-left",
                "accel-forward",
                "accel-back",
                "mag-calibrate"
            ]
        );
    }

    #[test]
    fn phases_partition_the_sequence() {
        let phases: Vec<PhaseId> = CalStep::SEQUENCE.iter().map(|s| s.phase()).collect();
        assert_eq!(&phases[..4], &[PhaseId::Gyro; 4]);
        assert_eq!(&phases[4..10], &[PhaseId::Accel; 6]);
        assert_eq!(phases[10], PhaseId::Mag);
    }

    #[test]
    fn progress_spans_zero_to_hundred() {
        assert_eq!(progress_percent(0, 0.0), 0.0);
        assert_eq!(progress_percent(11, 0.0), 100.0);
        let mid = progress_percent(5, 0.5);
        assert!((mid - 50.0).abs() < 0.001, "got {mid}");
        // fraction is clamped
        assert_eq!(progress_percent(11, 3.0), 100.0);
    }
}
