#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and validation for the calibration tool.
//!
//! `Config` and sub-structs are deserialized from TOML and validated. Every
//! section is optional; defaults reproduce the nominal guided-run timings
//! (100 Hz capture, 10 s static, 8–30 s spins, 6 s poses, 60 s mag sweep).
use serde::Deserialize;
use std::path::PathBuf;

/// Capture pacing and per-phase durations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureCfg {
    /// Target acquisition rate in Hz; pacing is best-effort.
    pub target_hz: u32,
    /// Stationary gyro capture length (seconds).
    pub gyro_static_secs: f64,
    /// Minimum useful spin length per axis; shorter captures are flagged.
    pub spin_min_secs: f64,
    /// Hard cap per spin capture; timeout completes the phase normally.
    pub spin_max_secs: f64,
    /// Per-pose accelerometer capture length (seconds).
    pub accel_pose_secs: f64,
    /// Hard cap for the magnetometer sweep.
    pub mag_max_secs: f64,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            target_hz: 100,
            gyro_static_secs: 10.0,
            spin_min_secs: 8.0,
            spin_max_secs: 30.0,
            accel_pose_secs: 6.0,
            mag_max_secs: 60.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputCfg {
    /// Directory the calibration artifact is written into.
    pub dir: PathBuf,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionCfg {
    /// Listen address for socket-driven sessions.
    pub listen: String,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:4590".to_string(),
        }
    }
}

/// Optional log-file sink; console logging always goes to stderr and is
/// controlled by the CLI's `--log-level`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    /// Mirror run logs to this file as JSON lines.
    pub file: Option<String>,
    /// Level for the file sink ("info", "debug", ...); falls back to the
    /// console level when unset.
    pub level: Option<String>,
    /// File rotation: "never" (default), "daily", or "hourly".
    pub rotation: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureCfg,
    pub output: OutputCfg,
    pub session: SessionCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        let c = &self.capture;
        if c.target_hz == 0 {
            eyre::bail!("capture.target_hz must be > 0");
        }
        if c.target_hz > 1000 {
            eyre::bail!("capture.target_hz is unreasonably high (>1000)");
        }
        for (name, v) in [
            ("capture.gyro_static_secs", c.gyro_static_secs),
            ("capture.spin_min_secs", c.spin_min_secs),
            ("capture.spin_max_secs", c.spin_max_secs),
            ("capture.accel_pose_secs", c.accel_pose_secs),
            ("capture.mag_max_secs", c.mag_max_secs),
        ] {
            if !v.is_finite() || v <= 0.0 {
                eyre::bail!("{name} must be a positive finite number of seconds");
            }
        }
        if c.spin_max_secs < c.spin_min_secs {
            eyre::bail!("capture.spin_max_secs must be >= capture.spin_min_secs");
        }
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }
        if self.session.listen.parse::<std::net::SocketAddr>().is_err() {
            eyre::bail!("session.listen must be a host:port socket address");
        }
        Ok(())
    }
}
