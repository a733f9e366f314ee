//! Console-mode guided calibration: unit selection, hardware assembly, and
//! the run loop against a `ConsoleChannel`.

use crate::console::ConsoleChannel;
use crate::motion::MotionFollower;
use eyre::WrapErr;
use imucal_core::{CalError, Calibrator, CaptureTiming, RunOutcome, UnitId, select_unit};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn run(
    cfg: &imucal_config::Config,
    unit_arg: Option<UnitId>,
    output_dir: Option<PathBuf>,
    cancel: Arc<AtomicBool>,
) -> eyre::Result<()> {
    let mut chan = ConsoleChannel::new(cancel);
    let available = imucal_hardware::detect_units();

    let unit = match unit_arg {
        Some(u) => {
            if !available.contains(&u) {
                return Err(eyre::Report::new(CalError::NoUnitAvailable))
                    .wrap_err_with(|| format!("requested unit {u} is not attached"));
            }
            u
        }
        None => select_unit(&available, &mut chan)?,
    };

    let reader = imucal_hardware::open(unit).wrap_err("open sample reader")?;
    let timing: CaptureTiming = (&cfg.capture).into();
    let dir = output_dir.unwrap_or_else(|| cfg.output.dir.clone());

    println!("Calibrating unit {unit}. Follow each instruction, then press enter.");
    // the simulated unit follows the announced steps in place of real hands
    let mut chan = MotionFollower::new(chan, reader.motion());
    let calibrator = Calibrator::new(unit, reader, timing, dir);
    match calibrator.run(&mut chan)? {
        RunOutcome::Complete { result, path } => {
            println!(
                "Calibration complete (overall confidence {:.2}).\nArtifact: {}",
                result.confidence.overall,
                path.display()
            );
            Ok(())
        }
        RunOutcome::Cancelled => {
            println!("Calibration cancelled; no artifact written.");
            Ok(())
        }
    }
}
