#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Sensor and time abstractions the calibration engine is written against.
//!
//! - `SampleReader` provides a blocking `read()` API that returns one raw
//!   9-axis IMU sample (`RawSample`).
//! - `clock` supplies the pacing clock for captures, real or simulated.
//!
//! Other crates depend only on these traits, enabling simulation and multiple
//! sensor backends while keeping `imucal_core` hardware-agnostic.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

use serde::{Deserialize, Serialize};

/// Which physical inertial unit a sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitId {
    Left,
    Right,
}

impl UnitId {
    pub const fn as_str(self) -> &'static str {
        match self {
            UnitId::Left => "left",
            UnitId::Right => "right",
        }
    }
}

impl core::fmt::Display for UnitId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw 9-axis observation: accelerometer, gyroscope, magnetometer.
///
/// All components are signed 16-bit fixed-point counts straight off the
/// sensor; no unit conversion happens at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub unit: UnitId,
    pub ax: i16,
    pub ay: i16,
    pub az: i16,
    pub gx: i16,
    pub gy: i16,
    pub gz: i16,
    pub mx: i16,
    pub my: i16,
    pub mz: i16,
}

impl RawSample {
    /// A zeroed sample tagged with `unit`; handy as a builder base in tests
    /// and simulators.
    pub const fn zeroed(unit: UnitId) -> Self {
        Self {
            unit,
            ax: 0,
            ay: 0,
            az: 0,
            gx: 0,
            gy: 0,
            gz: 0,
            mx: 0,
            my: 0,
            mz: 0,
        }
    }
}

/// Blocking source of raw IMU samples.
///
/// A single call returns one sample or fails. Implementations bound their own
/// latency; the caller paces acquisition and never assumes a fixed rate.
pub trait SampleReader {
    fn read(&mut self) -> Result<RawSample, Box<dyn std::error::Error + Send + Sync>>;
}

// Allow boxed trait objects (Box<dyn SampleReader>) wherever a generic
// R: SampleReader is expected.
impl<T: ?Sized + SampleReader> SampleReader for Box<T> {
    fn read(&mut self) -> Result<RawSample, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read()
    }
}
