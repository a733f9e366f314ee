//! Line-oriented blocking operator channel for the console flow.
//!
//! A listener thread owns stdin and feeds raw lines into a bounded channel so
//! the engine can poll for "stop" without blocking mid-capture. An empty line
//! is the advance signal (begin pending phases, stop interruptible ones);
//! cancel arrives through the shared Ctrl-C flag. The listener thread is
//! detached: a blocking stdin read cannot be interrupted, and it dies with
//! the process.

use crossbeam_channel as xch;
use imucal_core::error::{CalError, Result};
use imucal_core::session::SessionEvent;
use imucal_core::{OperatorChannel, Signal, UnitId};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const POLL_TICK: Duration = Duration::from_millis(50);

pub struct ConsoleChannel {
    rx: xch::Receiver<String>,
    cancel: Arc<AtomicBool>,
}

impl ConsoleChannel {
    pub fn new(cancel: Arc<AtomicBool>) -> Self {
        let (tx, rx) = xch::bounded(8);
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
            tracing::debug!("stdin listener closed");
        });
        Self { rx, cancel }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Blocking line read that keeps honoring Ctrl-C; `None` means cancel.
    fn next_line(&self) -> Option<String> {
        loop {
            if self.cancelled() {
                return None;
            }
            match self.rx.recv_timeout(POLL_TICK) {
                Ok(line) => return Some(line),
                Err(xch::RecvTimeoutError::Timeout) => {}
                Err(xch::RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

impl OperatorChannel for ConsoleChannel {
    fn prompt(&mut self, message: &str) -> Result<()> {
        let mut out = std::io::stdout();
        writeln!(out, "\n{message}")
            .and_then(|()| out.flush())
            .map_err(|e| eyre::Report::new(CalError::Channel(e.to_string())))
    }

    fn await_signal(&mut self) -> Result<Signal> {
        loop {
            let Some(line) = self.next_line() else {
                return Ok(Signal::Cancel);
            };
            if line.trim().is_empty() {
                return Ok(Signal::Advance);
            }
            // stray text: remind instead of guessing
            let _ = self.prompt("(press enter to continue, Ctrl-C to cancel)");
        }
    }

    fn poll_signal(&mut self) -> Result<Option<Signal>> {
        if self.cancelled() {
            return Ok(Some(Signal::Cancel));
        }
        match self.rx.try_recv() {
            Ok(line) if line.trim().is_empty() => Ok(Some(Signal::Advance)),
            Ok(_) => Ok(None),
            Err(xch::TryRecvError::Empty) => Ok(None),
            Err(xch::TryRecvError::Disconnected) => Ok(Some(Signal::Cancel)),
        }
    }

    fn select_unit(&mut self, available: &[UnitId]) -> Result<UnitId> {
        loop {
            self.prompt("Both units are attached. Type left or right:")?;
            let Some(line) = self.next_line() else {
                return Err(eyre::Report::new(CalError::Cancelled));
            };
            let unit = match line.trim().to_ascii_lowercase().as_str() {
                "left" | "l" => Some(UnitId::Left),
                "right" | "r" => Some(UnitId::Right),
                _ => None,
            };
            if let Some(u) = unit
                && available.contains(&u)
            {
                return Ok(u);
            }
        }
    }

    fn report(&mut self, event: &SessionEvent) -> Result<()> {
        let mut out = std::io::stdout();
        let res = match event {
            SessionEvent::Progress { progress } => {
                write!(out, "\r  progress {progress:5.1}%").and_then(|()| out.flush())
            }
            SessionEvent::Phase { phase } => {
                writeln!(out, "\n== {} phase ==", phase.as_str())
            }
            SessionEvent::Complete { results } => {
                writeln!(out, "\ncalibration artifact: {}", results.filename)
            }
            SessionEvent::Error { message } => {
                let mut err = std::io::stderr();
                writeln!(err, "\nerror: {message}")
            }
            // step/stats/action snapshots carry nothing the prompts don't
            SessionEvent::Step { .. } | SessionEvent::Stats { .. } | SessionEvent::Action { .. } => {
                Ok(())
            }
        };
        res.map_err(|e| eyre::Report::new(CalError::Channel(e.to_string())))
    }
}
