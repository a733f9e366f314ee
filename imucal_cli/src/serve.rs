//! Socket session server: accepts one client at a time and drives the same
//! calibration engine the console uses, over line-delimited JSON.

use crate::motion::MotionFollower;
use eyre::WrapErr;
use imucal_core::session::{SessionEvent, SocketChannel};
use imucal_core::{Calibrator, CaptureTiming, OperatorChannel, RunOutcome, UnitId};
use imucal_hardware::SimulatedImu;
use std::io::BufReader;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const ACCEPT_TICK: Duration = Duration::from_millis(100);

pub fn run(
    cfg: &imucal_config::Config,
    listen_override: Option<String>,
    cancel: Arc<AtomicBool>,
) -> eyre::Result<()> {
    let addr = listen_override.unwrap_or_else(|| cfg.session.listen.clone());
    let listener = TcpListener::bind(&addr).wrap_err_with(|| format!("bind {addr}"))?;
    listener
        .set_nonblocking(true)
        .wrap_err("set listener non-blocking")?;
    let local = listener.local_addr().wrap_err("resolve listen address")?;
    {
        use std::io::Write;
        let mut out = std::io::stdout();
        writeln!(out, "listening on {local}")
            .and_then(|()| out.flush())
            .wrap_err("announce listen address")?;
    }
    tracing::info!(addr = %local, "session server listening");

    loop {
        if cancel.load(Ordering::Relaxed) {
            tracing::info!("session server shutting down");
            return Ok(());
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                tracing::info!(%peer, "session connected");
                // sessions are strictly sequential; the engine owns the reader
                match handle_session(cfg, stream) {
                    Ok(()) => tracing::info!(%peer, "session finished"),
                    Err(e) => tracing::error!(%peer, error = %e, "session ended with error"),
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_TICK);
            }
            Err(e) => return Err(e).wrap_err("accept session connection"),
        }
    }
}

fn handle_session(cfg: &imucal_config::Config, stream: TcpStream) -> eyre::Result<()> {
    stream
        .set_nonblocking(false)
        .wrap_err("set stream blocking")?;
    let buf_reader = BufReader::new(stream.try_clone().wrap_err("clone session stream")?);
    let mut chan = SocketChannel::new(buf_reader, stream);

    let setup = (|| -> eyre::Result<(UnitId, SimulatedImu)> {
        chan.handshake()?;
        let available = imucal_hardware::detect_units();
        let unit = chan.select_unit(&available)?;
        let reader = imucal_hardware::open(unit).wrap_err("open sample reader")?;
        Ok((unit, reader))
    })();
    let (unit, reader) = match setup {
        Ok(v) => v,
        Err(e) => {
            // setup never reaches the machine, so the diagnostic goes on the
            // wire here before the stream drops
            let _ = chan.report(&SessionEvent::Error {
                message: e.to_string(),
            });
            return Err(e);
        }
    };

    let timing: CaptureTiming = (&cfg.capture).into();
    // the simulated unit follows the announced steps in place of real hands
    let mut chan = MotionFollower::new(chan, reader.motion());
    let calibrator = Calibrator::new(unit, reader, timing, cfg.output.dir.clone());
    match calibrator.run(&mut chan) {
        Ok(RunOutcome::Complete { path, .. }) => {
            tracing::info!(path = %path.display(), "session calibration complete");
            Ok(())
        }
        Ok(RunOutcome::Cancelled) => {
            tracing::info!("session calibration cancelled");
            Ok(())
        }
        // the machine already reported its own failure on the wire
        Err(e) => Err(e),
    }
}
