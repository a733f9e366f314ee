//! Socket session protocol: wire messages and the line-delimited JSON
//! operator channel used by socket-driven guided runs.
//!
//! One message per line in both directions. The client opens with `init`
//! (carrying the requested unit), then drives the state machine with `next`;
//! `cancel` terminates the session from any state. A reader thread owns the
//! inbound half and feeds a bounded channel, which gives the engine the
//! non-blocking `poll_signal` it needs between samples.

use crate::channel::{OperatorChannel, Signal};
use crate::error::{CalError, Result};
use crate::types::UnitId;
use crossbeam_channel as xch;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

/// Sensor group a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseId {
    Gyro,
    Accel,
    Mag,
}

impl PhaseId {
    pub const fn as_str(self) -> &'static str {
        match self {
            PhaseId::Gyro => "gyro",
            PhaseId::Accel => "accel",
            PhaseId::Mag => "mag",
        }
    }
}

/// Client → core messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientMsg {
    Init { unit: UnitId },
    Next,
    Cancel,
}

/// Per-sensor completion percentages plus the cumulative sample count.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsSnapshot {
    pub gyro: f64,
    pub accel: f64,
    pub mag: f64,
    pub samples: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteResults {
    pub filename: String,
}

/// Core → client messages; also what `OperatorChannel::report` carries on
/// every surface.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionEvent {
    Phase { phase: PhaseId },
    Step { step: &'static str, phase: PhaseId },
    Progress { progress: f64 },
    Stats { stats: StatsSnapshot },
    Action { message: &'static str },
    Complete { results: CompleteResults },
    Error { message: String },
}

/// Message-oriented bidirectional channel over any line stream.
///
/// The inbound reader runs on its own thread and parses one `ClientMsg` per
/// line; malformed lines are logged and skipped. A disconnect surfaces as
/// `Cancel`, so a vanished client abandons the run instead of wedging it.
pub struct SocketChannel<W: Write> {
    rx: xch::Receiver<ClientMsg>,
    writer: W,
    unit: Option<UnitId>,
}

impl<W: Write> SocketChannel<W> {
    pub fn new(reader: impl BufRead + Send + 'static, writer: W) -> Self {
        let (tx, rx) = xch::bounded(8);
        // The thread ends when the stream closes or the channel is dropped;
        // it is not joined because a blocking line read cannot be interrupted.
        std::thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<ClientMsg>(&line) {
                    Ok(msg) => {
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "ignoring malformed client message"),
                }
            }
            tracing::debug!("session reader closed");
        });
        Self {
            rx,
            writer,
            unit: None,
        }
    }

    /// Wait for the opening `init` message and remember the requested unit.
    pub fn handshake(&mut self) -> Result<UnitId> {
        match self.rx.recv() {
            Ok(ClientMsg::Init { unit }) => {
                self.unit = Some(unit);
                Ok(unit)
            }
            Ok(other) => Err(eyre::Report::new(CalError::Channel(format!(
                "expected init, got {other:?}"
            )))),
            Err(_) => Err(eyre::Report::new(CalError::Channel(
                "client disconnected before init".into(),
            ))),
        }
    }

    fn signal_of(msg: ClientMsg) -> Option<Signal> {
        match msg {
            ClientMsg::Next => Some(Signal::Advance),
            ClientMsg::Cancel => Some(Signal::Cancel),
            ClientMsg::Init { .. } => {
                tracing::warn!("ignoring repeated init");
                None
            }
        }
    }
}

impl<W: Write> OperatorChannel for SocketChannel<W> {
    fn prompt(&mut self, _message: &str) -> Result<()> {
        // The client renders its own instructions from step ids.
        Ok(())
    }

    fn await_signal(&mut self) -> Result<Signal> {
        loop {
            match self.rx.recv() {
                Ok(msg) => {
                    if let Some(sig) = Self::signal_of(msg) {
                        return Ok(sig);
                    }
                }
                Err(_) => return Ok(Signal::Cancel),
            }
        }
    }

    fn poll_signal(&mut self) -> Result<Option<Signal>> {
        match self.rx.try_recv() {
            Ok(msg) => Ok(Self::signal_of(msg)),
            Err(xch::TryRecvError::Empty) => Ok(None),
            Err(xch::TryRecvError::Disconnected) => Ok(Some(Signal::Cancel)),
        }
    }

    fn select_unit(&mut self, available: &[UnitId]) -> Result<UnitId> {
        match self.unit {
            Some(u) if available.contains(&u) => Ok(u),
            Some(u) => {
                tracing::error!(unit = %u, "requested unit is not attached");
                Err(eyre::Report::new(CalError::NoUnitAvailable))
            }
            None => Err(eyre::Report::new(CalError::Channel(
                "unit requested before init".into(),
            ))),
        }
    }

    fn report(&mut self, event: &SessionEvent) -> Result<()> {
        let line = serde_json::to_string(event)
            .map_err(|e| eyre::Report::new(CalError::Channel(e.to_string())))?;
        writeln!(self.writer, "{line}")
            .and_then(|()| self.writer.flush())
            .map_err(|e| eyre::Report::new(CalError::Channel(e.to_string())))
    }
}
