//! Domain errors for the calibration engine, plus a stable error taxonomy the
//! CLI maps to exit codes.
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum CalError {
    #[error("no inertial unit available")]
    NoUnitAvailable,
    /// A capture-time read failure; renders as `capture_error:<msg>`, the
    /// diagnostic shape phase aborts carry.
    #[error("capture_error:{0}")]
    SampleRead(String),
    #[error("insufficient gravity separation across accelerometer poses (g_ref {0:.2} counts)")]
    GravitySeparation(f64),
    #[error("artifact write failed: {0}")]
    ArtifactWrite(String),
    #[error("operator channel error: {0}")]
    Channel(String),
    #[error("calibration cancelled by operator")]
    Cancelled,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

#[cfg(test)]
mod tests {
    use super::CalError::*;

    #[test]
    fn display_is_stable() {
        assert_eq!(NoUnitAvailable.to_string(), "no inertial unit available");
        assert_eq!(
            SampleRead("bus stall".into()).to_string(),
            "capture_error:bus stall"
        );
        assert_eq!(
            Cancelled.to_string(),
            "calibration cancelled by operator"
        );
    }
}
