//! Deterministic simulated IMU pair.
//!
//! The simulator stands in for the SPI/I2C-attached units and for the
//! operator's hands as well: a real unit is reoriented by the human following
//! the prompts, so the virtual one carries a shared `MotionHandle` that tells
//! it what it is currently doing — resting on the bench, spinning about an
//! axis, held with an axis up, or tumbling for the field sweep. The CLI
//! steers that handle from the announced guided-run steps, which is what lets
//! a genuine interactive run (console or socket) complete against this
//! backend. All output derives from an xorshift state seeded per unit, so
//! runs are reproducible.

use crate::error::{HwError, Result};
use imucal_traits::{RawSample, SampleReader, UnitId};
use std::sync::{Arc, Mutex};

const GRAVITY_COUNTS: f64 = 4096.0;
const SPIN_RATE_COUNTS: f64 = 400.0;
const SPIN_PERIOD_S: f64 = 5.0;
/// The simulated motion timeline advances one nominal tick per read.
const SIM_TICK_S: f64 = 0.01;
const MAG_RADIUS: f64 = 350.0;
const MAG_CENTER: (f64, f64, f64) = (120.0, -80.0, 40.0);

/// Body axis of the simulated unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimAxis {
    X,
    Y,
    Z,
}

/// What the virtual unit is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Motion {
    /// Resting flat on the bench, +Z up.
    #[default]
    Still,
    /// Back-and-forth rotation about one body axis.
    Spin(SimAxis),
    /// Held with the given axis pointing up (or down) against gravity.
    Hold { axis: SimAxis, up: bool },
    /// Slow tumble through orientations, sweeping the field sphere.
    Tumble,
}

/// Shared control over a simulated unit's motion.
///
/// Clone it before handing the reader over; setting a new motion restarts
/// the unit's internal motion timeline, like an operator starting the next
/// instruction from rest.
#[derive(Clone, Default)]
pub struct MotionHandle(Arc<Mutex<Motion>>);

impl MotionHandle {
    pub fn set(&self, motion: Motion) {
        if let Ok(mut m) = self.0.lock() {
            *m = motion;
        }
    }

    fn get(&self) -> Motion {
        self.0.lock().map(|m| *m).unwrap_or_default()
    }
}

/// Motion a compliant operator would produce for a guided-run step id;
/// `None` for ids the simulator does not recognize.
pub fn motion_for_step(step_id: &str) -> Option<Motion> {
    Some(match step_id {
        "gyro-static" => Motion::Still,
        "gyro-x" => Motion::Spin(SimAxis::X),
        "gyro-y" => Motion::Spin(SimAxis::Y),
        "gyro-z" => Motion::Spin(SimAxis::Z),
        "accel-up" => Motion::Hold {
            axis: SimAxis::X,
            up: true,
        },
        "accel-down" => Motion::Hold {
            axis: SimAxis::X,
            up: false,
        },
        "accel-right" => Motion::Hold {
            axis: SimAxis::Y,
            up: true,
        },
        "accel-left" => Motion::Hold {
            axis: SimAxis::Y,
            up: false,
        },
        "accel-forward" => Motion::Hold {
            axis: SimAxis::Z,
            up: true,
        },
        "accel-back" => Motion::Hold {
            axis: SimAxis::Z,
            up: false,
        },
        "mag-calibrate" => Motion::Tumble,
        _ => return None,
    })
}

pub struct SimulatedImu {
    unit: UnitId,
    motion: MotionHandle,
    active: Motion,
    /// Reads since the last motion change.
    seq: u64,
    rng: u64,
    gyro_bias: (i16, i16, i16),
}

impl SimulatedImu {
    pub fn new(unit: UnitId) -> Self {
        let seed = match unit {
            UnitId::Left => 0x1d87_2f3a_9c01_55e7,
            UnitId::Right => 0x7b44_0a6e_d213_98c1,
        };
        Self::with_seed(unit, seed)
    }

    pub fn with_seed(unit: UnitId, seed: u64) -> Self {
        Self {
            unit,
            motion: MotionHandle::default(),
            active: Motion::Still,
            seq: 0,
            rng: seed.max(1),
            gyro_bias: match unit {
                UnitId::Left => (2, -3, 1),
                UnitId::Right => (-1, 2, -2),
            },
        }
    }

    /// Handle for steering this unit's motion; clone freely.
    pub fn motion(&self) -> MotionHandle {
        self.motion.clone()
    }

    fn next_rng(&mut self) -> u64 {
        // xorshift64
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng = x;
        x
    }

    /// Uniform-ish noise in [-amp, amp] counts.
    fn noise(&mut self, amp: i16) -> i16 {
        let span = i64::from(amp) * 2 + 1;
        let v = (self.next_rng() % span as u64) as i64 - i64::from(amp);
        v as i16
    }

    fn clamp_i16(v: f64) -> i16 {
        v.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
    }
}

impl SampleReader for SimulatedImu {
    fn read(&mut self) -> std::result::Result<RawSample, Box<dyn std::error::Error + Send + Sync>> {
        let motion = self.motion.get();
        if motion != self.active {
            self.active = motion;
            self.seq = 0;
        }
        let t = self.seq as f64 * SIM_TICK_S;
        self.seq = self.seq.wrapping_add(1);

        let mut s = RawSample::zeroed(self.unit);
        s.gx = self.gyro_bias.0.saturating_add(self.noise(1));
        s.gy = self.gyro_bias.1.saturating_add(self.noise(1));
        s.gz = self.gyro_bias.2.saturating_add(self.noise(1));

        // bench attitude unless a pose overrides it below
        s.ax = self.noise(3);
        s.ay = self.noise(3);
        s.az = Self::clamp_i16(GRAVITY_COUNTS + f64::from(self.noise(3)));

        // idle field point; Tumble replaces it with the sphere sweep
        s.mx = Self::clamp_i16(MAG_CENTER.0 + MAG_RADIUS * 0.6 + f64::from(self.noise(2)));
        s.my = Self::clamp_i16(MAG_CENTER.1 + MAG_RADIUS * 0.6 + f64::from(self.noise(2)));
        s.mz = Self::clamp_i16(MAG_CENTER.2 + MAG_RADIUS * 0.52 + f64::from(self.noise(2)));

        match self.active {
            Motion::Still => {}
            Motion::Spin(axis) => {
                let rate = (SPIN_RATE_COUNTS * (std::f64::consts::TAU * t / SPIN_PERIOD_S).sin())
                    .round() as i16;
                match axis {
                    SimAxis::X => s.gx = s.gx.saturating_add(rate),
                    SimAxis::Y => s.gy = s.gy.saturating_add(rate),
                    SimAxis::Z => s.gz = s.gz.saturating_add(rate),
                }
            }
            Motion::Hold { axis, up } => {
                let g = if up { GRAVITY_COUNTS } else { -GRAVITY_COUNTS };
                s.ax = self.noise(3);
                s.ay = self.noise(3);
                s.az = self.noise(3);
                let held = Self::clamp_i16(g + f64::from(self.noise(3)));
                match axis {
                    SimAxis::X => s.ax = held,
                    SimAxis::Y => s.ay = held,
                    SimAxis::Z => s.az = held,
                }
            }
            Motion::Tumble => {
                // azimuth fast, elevation slow, so min/max per axis converge
                // within a few hundred samples
                let theta = 7.3 * t;
                let phi = (1.1 * t).sin() * 1.35;
                let (sp, cp) = (phi.sin(), phi.cos());
                s.mx = Self::clamp_i16(
                    MAG_CENTER.0 + MAG_RADIUS * theta.cos() * cp + f64::from(self.noise(2)),
                );
                s.my = Self::clamp_i16(
                    MAG_CENTER.1 + MAG_RADIUS * theta.sin() * cp + f64::from(self.noise(2)),
                );
                s.mz = Self::clamp_i16(MAG_CENTER.2 + MAG_RADIUS * sp + f64::from(self.noise(2)));
            }
        }
        Ok(s)
    }
}

/// Units the simulated backend exposes. Both are always attached.
pub fn detect_units() -> Vec<UnitId> {
    vec![UnitId::Left, UnitId::Right]
}

/// Open a reader for `unit`.
pub fn open(unit: UnitId) -> Result<SimulatedImu> {
    if !detect_units().contains(&unit) {
        return Err(HwError::UnitNotAttached(unit.as_str()));
    }
    tracing::debug!(%unit, "opening simulated IMU");
    Ok(SimulatedImu::new(unit))
}
