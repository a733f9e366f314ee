#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! CLI entrypoint for the IMU calibration tool.
//!
//! Responsibilities:
//! - Parse config/flags and assemble the sensor backend and core engine
//! - Initialize tracing and manage log sinks
//! - Run the console guided flow, the socket session server, or a self-check
//! - Map domain errors to stable exit codes (cancellation exits 0)

mod calibrate;
mod cli;
mod console;
mod error_fmt;
mod motion;
mod serve;
mod tracing_setup;

use std::fs;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use eyre::WrapErr;
use imucal_config::Config;
use imucal_traits::SampleReader;

use cli::{Cli, Commands};
use error_fmt::{exit_code_for_error, humanize};
use tracing_setup::init_tracing;

fn main() -> eyre::Result<()> {
    // Initialize pretty error reports early
    let _ = color_eyre::install();

    // Graceful cancellation: Ctrl-C flips a flag the channels poll.
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_clone = Arc::clone(&cancel);

    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\ncancel requested, finishing up...");
        cancel_clone.store(true, std::sync::atomic::Ordering::SeqCst);
    }) {
        eprintln!("Warning: Failed to set signal handler: {e}");
    }

    if let Err(e) = real_main(cancel) {
        let code = exit_code_for_error(&e);
        eprintln!("{}", humanize(&e));
        std::process::exit(code);
    }
    Ok(())
}

fn real_main(cancel: Arc<AtomicBool>) -> eyre::Result<()> {
    let cli = Cli::parse();

    // 1) Load typed config from TOML; absent file means defaults.
    let cfg: Config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .wrap_err_with(|| format!("read config {}", path.display()))?;
            toml::from_str(&text).wrap_err_with(|| format!("parse config {}", path.display()))?
        }
        None => Config::default(),
    };
    cfg.validate().wrap_err("invalid configuration")?;

    init_tracing(&cli.log_level, &cfg.logging);

    match cli.cmd {
        Commands::Calibrate { unit, output_dir } => {
            calibrate::run(&cfg, unit.map(Into::into), output_dir, cancel)
        }
        Commands::Serve { listen } => serve::run(&cfg, listen, cancel),
        Commands::SelfCheck => self_check(&cfg),
    }
}

/// Read the simulated pair for one second each and report the effective rate
/// plus a per-sensor sanity line.
fn self_check(cfg: &Config) -> eyre::Result<()> {
    tracing::info!("self-check starting");
    use std::time::Instant;

    let period = imucal_core::util::period(cfg.capture.target_hz);
    for unit in imucal_hardware::detect_units() {
        let mut reader = imucal_hardware::open(unit).wrap_err("open sample reader")?;
        let t0 = Instant::now();
        let mut count = 0u32;
        let mut last = None;
        while t0.elapsed().as_secs_f64() < 1.0 {
            let s = reader
                .read()
                .map_err(|e| eyre::eyre!("sample read failed on {unit}: {e}"))?;
            last = Some(s);
            count += 1;
            std::thread::sleep(period);
        }
        let rate = f64::from(count) / t0.elapsed().as_secs_f64();
        println!("unit {unit}: effective rate {rate:.0} Hz over {count} samples");
        if let Some(s) = last {
            println!(
                "  accel ({}, {}, {})  gyro ({}, {}, {})  mag ({}, {}, {})",
                s.ax, s.ay, s.az, s.gx, s.gy, s.gz, s.mx, s.my, s.mz
            );
        }
    }
    println!("\nSelf-check: OK");
    Ok(())
}
