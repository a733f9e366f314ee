//! `From` implementations bridging `imucal_config` types to `imucal_core`
//! types, so the CLI never maps fields by hand.

use crate::machine::CaptureTiming;
use std::time::Duration;

impl From<&imucal_config::CaptureCfg> for CaptureTiming {
    fn from(c: &imucal_config::CaptureCfg) -> Self {
        Self {
            target_hz: c.target_hz,
            gyro_static: Duration::from_secs_f64(c.gyro_static_secs),
            spin_min: Duration::from_secs_f64(c.spin_min_secs),
            spin_max: Duration::from_secs_f64(c.spin_max_secs),
            accel_pose: Duration::from_secs_f64(c.accel_pose_secs),
            mag_max: Duration::from_secs_f64(c.mag_max_secs),
        }
    }
}
