//! The versioned calibration artifact and its serializer.
//!
//! A single self-describing JSON document, validated against the data-model
//! invariants before anything touches the filesystem. A validation failure is
//! surfaced as `artifact-write-failed` and nothing partial is written.

use crate::accel::AccelPoseSummary;
use crate::confidence::CONFIDENCE_FLOOR;
use crate::error::{CalError, Result};
use crate::gyro::STATIC_BLEND;
use crate::mag::NOTE_INSUFFICIENT_EXCITATION;
use crate::stats::PhaseSummary;
use crate::types::{Pose, UnitId, Vec3};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;

const BLEND_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConfidenceBlock {
    pub gyro_static: f64,
    pub gyro_rotation: f64,
    pub accel_6pt: f64,
    pub mag: f64,
    pub overall: f64,
}

/// Rotation-phase summaries keyed by axis.
#[derive(Debug, Clone, Serialize)]
pub struct AxisPhases {
    pub x: PhaseSummary,
    pub y: PhaseSummary,
    pub z: PhaseSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalibrationResult {
    pub schema_version: u32,
    /// ISO-8601 with local offset, e.g. `2024-03-01T14:05:09+01:00`.
    pub captured_at: String,
    pub unit: UnitId,
    pub gyro_bias_static: Vec3,
    pub gyro_bias_dynamic: Vec3,
    pub gyro_bias_final: Vec3,
    pub accel_bias: Vec3,
    pub accel_scale: Vec3,
    pub mag_offset: Vec3,
    pub mag_scale: Vec3,
    pub confidence: ConfidenceBlock,
    pub gyro_static_phase: PhaseSummary,
    pub gyro_rotation_phases: AxisPhases,
    pub accel_poses: Vec<AccelPoseSummary>,
    pub mag_phase: PhaseSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CalibrationResult {
    /// Check every sealed-artifact invariant; returns the first violation.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let c = &self.confidence;
        for (name, v) in [
            ("gyro_static", c.gyro_static),
            ("gyro_rotation", c.gyro_rotation),
            ("accel_6pt", c.accel_6pt),
            ("mag", c.mag),
            ("overall", c.overall),
        ] {
            if !(CONFIDENCE_FLOOR..=1.0).contains(&v) {
                return Err(format!("confidence.{name} = {v} outside [{CONFIDENCE_FLOOR}, 1]"));
            }
        }

        let blended = self.gyro_bias_static * STATIC_BLEND
            + self.gyro_bias_dynamic * (1.0 - STATIC_BLEND);
        let drift = (self.gyro_bias_final - blended).abs();
        if drift.x > BLEND_TOLERANCE || drift.y > BLEND_TOLERANCE || drift.z > BLEND_TOLERANCE {
            return Err("gyro_bias_final is not the 0.75/0.25 blend".into());
        }

        for (axis, v) in [
            ("x", self.accel_scale.x),
            ("y", self.accel_scale.y),
            ("z", self.accel_scale.z),
        ] {
            if v <= 0.0 {
                return Err(format!("accel_scale.{axis} = {v} must be strictly positive"));
            }
        }

        let mag_degraded = self
            .mag_phase
            .notes
            .iter()
            .any(|n| n == NOTE_INSUFFICIENT_EXCITATION);
        for (axis, v) in [
            ("x", self.mag_scale.x),
            ("y", self.mag_scale.y),
            ("z", self.mag_scale.z),
        ] {
            if v < 1.0 {
                return Err(format!("mag_scale.{axis} = {v} below one count"));
            }
            if mag_degraded && v != 1.0 {
                return Err("degraded mag phase must carry unit scale".into());
            }
        }

        let labels: Vec<Pose> = self.accel_poses.iter().map(|p| p.pose).collect();
        if labels != Pose::ALL {
            return Err(format!("accel pose set {labels:?} is not the six fixed poses"));
        }

        Ok(())
    }

    /// `<unit>_<iso8601-with-dashes>_inertial_calibration.json`
    pub fn filename(&self) -> String {
        format!(
            "{}_{}_inertial_calibration.json",
            self.unit,
            self.captured_at.replace(':', "-")
        )
    }

    /// Validate and write the artifact into `dir`, returning the full path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        self.validate().map_err(|m| {
            eyre::Report::new(CalError::ArtifactWrite(format!("invariant violated: {m}")))
        })?;
        let path = dir.join(self.filename());
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| eyre::Report::new(CalError::ArtifactWrite(e.to_string())))?;
        std::fs::write(&path, json).map_err(|e| {
            eyre::Report::new(CalError::ArtifactWrite(format!(
                "{}: {e}",
                path.display()
            )))
        })?;
        tracing::info!(path = %path.display(), "calibration artifact written");
        Ok(path)
    }
}
