#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Guided IMU calibration engine (hardware-agnostic).
//!
//! The engine walks a human operator through a fixed capture sequence —
//! stationary gyro, three per-axis spins, six accelerometer poses, a
//! magnetometer sweep — and turns the captured statistics into per-sensor
//! bias/scale/offset parameters with quality scores, sealed into a versioned
//! JSON artifact. All sensor access goes through
//! `imucal_traits::SampleReader`; all operator interaction goes through the
//! `channel::OperatorChannel` trait, which the CLI realizes twice (console
//! and socket).
//!
//! ## Architecture
//!
//! - **Statistics**: streaming per-phase summaries (`stats` module)
//! - **Capture**: timed and interruptible acquisition (`capture`)
//! - **Scoring**: pure confidence functions (`confidence`)
//! - **Estimation**: gyro / accel / mag parameter solvers
//! - **Sequencing**: the calibration state machine (`machine`)
//! - **Protocol**: socket session wire model (`session`)
//! - **Artifact**: validated result serializer (`artifact`)

pub mod accel;
pub mod artifact;
pub mod capture;
pub mod channel;
pub mod confidence;
mod conversions;
pub mod error;
pub mod gyro;
pub mod machine;
pub mod mag;
pub mod mocks;
pub mod session;
pub mod stats;
pub mod types;
pub mod util;

pub use artifact::{CalibrationResult, ConfidenceBlock, SCHEMA_VERSION};
pub use capture::{Capture, CaptureControl, CaptureEngine, CaptureOutcome};
pub use channel::{OperatorChannel, Signal};
pub use confidence::CONFIDENCE_FLOOR;
pub use error::{CalError, Result};
pub use machine::{
    CalStep, Calibrator, CaptureTiming, MachineState, RunOutcome, progress_percent, select_unit,
};
pub use session::{ClientMsg, PhaseId, SessionEvent, SocketChannel, StatsSnapshot};
pub use stats::{PhaseSummary, StatsAccumulator, SummaryOpts};
pub use types::{Axis, Pose, RawSample, SampleExt, UnitId, Vec3};
