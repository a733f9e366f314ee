//! CLI argument definitions and shared statics.

use clap::{Parser, Subcommand, ValueEnum};
use imucal_core::UnitId;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "imucal", version, about = "Guided IMU calibration tool")]
pub struct Cli {
    /// Path to config TOML; defaults apply when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Which inertial unit to calibrate.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum UnitArg {
    Left,
    Right,
}

impl From<UnitArg> for UnitId {
    fn from(u: UnitArg) -> Self {
        match u {
            UnitArg::Left => UnitId::Left,
            UnitArg::Right => UnitId::Right,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the guided console calibration flow
    Calibrate {
        /// Calibrate this unit instead of detecting/soliciting one
        #[arg(long, value_enum)]
        unit: Option<UnitArg>,
        /// Write the artifact here instead of the configured output dir
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// Serve socket-driven calibration sessions
    Serve {
        /// Listen address override (host:port)
        #[arg(long, value_name = "ADDR")]
        listen: Option<String>,
    },
    /// Quick reader sanity check and effective-rate probe
    SelfCheck,
}
