#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Sensor backends implementing `imucal_traits::SampleReader`.
//!
//! Only the deterministic simulated pair ships here; real SPI/I2C transports
//! plug in behind the same trait.

pub mod error;
pub mod sim;

pub use error::HwError;
pub use sim::{Motion, MotionHandle, SimAxis, SimulatedImu, detect_units, motion_for_step, open};
