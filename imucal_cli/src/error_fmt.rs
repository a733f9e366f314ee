//! Human-readable error descriptions and stable exit codes.

use imucal_core::CalError;

/// Map an eyre::Report to an explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ce) = err.downcast_ref::<CalError>() {
        return match ce {
            CalError::NoUnitAvailable => {
                "What happened: No inertial unit was available for calibration.\nLikely causes: Nothing is attached, or the requested unit is not present.\nHow to fix: Attach a unit (or pick the attached side with --unit) and rerun.".to_string()
            }
            CalError::SampleRead(msg) => format!(
                "What happened: A sensor read failed mid-capture ({msg}).\nLikely causes: Bus glitch, loose wiring, or the unit powered down.\nHow to fix: Check the sensor connection and restart the calibration run."
            ),
            CalError::GravitySeparation(g) => format!(
                "What happened: The six poses did not separate gravity (reference magnitude {g:.2} counts).\nLikely causes: The unit was not actually reoriented between poses, or the accelerometer is not producing data.\nHow to fix: Redo the run, holding each labeled axis straight up for its pose."
            ),
            CalError::ArtifactWrite(msg) => format!(
                "What happened: The calibration artifact could not be written ({msg}).\nLikely causes: Output directory missing or not writable, or an internal invariant failed.\nHow to fix: Check the output directory (and --output-dir), then rerun."
            ),
            CalError::Channel(msg) => format!(
                "What happened: The operator channel broke ({msg}).\nLikely causes: The session client disconnected or standard I/O was closed.\nHow to fix: Reconnect the client and start a new run."
            ),
            CalError::Cancelled => "Calibration cancelled by operator; no artifact written.".to_string(),
        };
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {err}"
    )
}

/// Stable exit codes per error kind. Operator cancellation is not an error
/// and exits 0; everything unclassified returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(ce) = err.downcast_ref::<CalError>() {
        return match ce {
            CalError::Cancelled => 0,
            CalError::NoUnitAvailable => 2,
            CalError::SampleRead(_) => 3,
            CalError::GravitySeparation(_) => 4,
            CalError::ArtifactWrite(_) => 5,
            CalError::Channel(_) => 1,
        };
    }
    1
}
