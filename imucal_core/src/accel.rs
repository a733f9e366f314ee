//! Accelerometer six-pose bias/scale estimation.
//!
//! Each body axis is held up and then down against gravity; the midpoint of
//! the two means is the bias, half the separation is the counts-per-g scale.
//! Downstream consumers apply `corrected = (raw − bias) / scale`, yielding
//! ≈±1 in units of the reference g.

use crate::confidence::{self, CONFIDENCE_FLOOR};
use crate::error::{CalError, Result};
use crate::stats::PhaseSummary;
use crate::types::{Axis, Pose, Vec3};
use serde::Serialize;

/// Minimum acceptable reference-g magnitude in counts. Below this the poses
/// did not separate gravity and the phase is unusable.
pub const MIN_GRAVITY_COUNTS: f64 = 1.0;

/// Statistical record of one held pose.
#[derive(Debug, Clone, Serialize)]
pub struct AccelPoseSummary {
    pub pose: Pose,
    pub count: usize,
    pub duration_s: f64,
    pub mean: Vec3,
    pub stddev: Vec3,
    pub stillness: f64,
}

impl AccelPoseSummary {
    /// Build from a capture summary; stillness degrades to the floor when the
    /// capture recorded nothing.
    pub fn from_phase(pose: Pose, summary: &PhaseSummary) -> Self {
        let stillness = if summary.count == 0 {
            CONFIDENCE_FLOOR
        } else {
            confidence::stillness(summary.stddev)
        };
        Self {
            pose,
            count: summary.count,
            duration_s: summary.duration_s,
            mean: summary.mean,
            stddev: summary.stddev,
            stillness,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AccelCalibration {
    pub bias: Vec3,
    /// Counts per reference g, per axis. Strictly positive on success.
    pub scale: Vec3,
    pub confidence: f64,
}

/// Solve bias and scale from the six pose summaries (fixed `Pose::ALL`
/// order expected). Fails with `gravity-separation-insufficient` when the
/// average per-axis gravity magnitude falls below `MIN_GRAVITY_COUNTS`.
pub fn solve(poses: &[AccelPoseSummary]) -> Result<AccelCalibration> {
    debug_assert_eq!(poses.len(), 6, "expected exactly six poses");
    let mean_for = |p: Pose| -> Vec3 {
        poses
            .iter()
            .find(|s| s.pose == p)
            .map(|s| s.mean)
            .unwrap_or(Vec3::ZERO)
    };

    let mut bias = Vec3::ZERO;
    let mut scale = Vec3::ZERO;
    for (axis, plus, minus) in [
        (Axis::X, Pose::PlusX, Pose::MinusX),
        (Axis::Y, Pose::PlusY, Pose::MinusY),
        (Axis::Z, Pose::PlusZ, Pose::MinusZ),
    ] {
        let up = mean_for(plus).axis(axis);
        let down = mean_for(minus).axis(axis);
        bias.set_axis(axis, (up + down) / 2.0);
        scale.set_axis(axis, ((up - down) / 2.0).abs());
    }

    let g_ref = scale.sum() / 3.0;
    if g_ref < MIN_GRAVITY_COUNTS {
        tracing::error!(g_ref, "accelerometer poses did not separate gravity");
        return Err(eyre::Report::new(CalError::GravitySeparation(g_ref)));
    }

    let avg_stillness = poses.iter().map(|p| p.stillness).sum::<f64>() / poses.len() as f64;
    let consistency = confidence::gravity_consistency([scale.x, scale.y, scale.z]);
    let confidence = confidence::accel_phase(avg_stillness, consistency);

    Ok(AccelCalibration {
        bias,
        scale,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(p: Pose, mean: Vec3, stddev: f64) -> AccelPoseSummary {
        AccelPoseSummary {
            pose: p,
            count: 600,
            duration_s: 6.0,
            mean,
            stddev: Vec3::splat(stddev),
            stillness: confidence::stillness(Vec3::splat(stddev)),
        }
    }

    /// Six ideal poses: ±g on the aligned axis, zero elsewhere.
    fn ideal_poses(g: f64, stddev: f64) -> Vec<AccelPoseSummary> {
        Pose::ALL
            .iter()
            .map(|&p| {
                let sign = if p.is_positive() { g } else { -g };
                let mut mean = Vec3::ZERO;
                mean.set_axis(p.axis(), sign);
                pose(p, mean, stddev)
            })
            .collect()
    }

    #[test]
    fn perfect_hemispheres_yield_zero_bias_full_scale() {
        let cal = solve(&ideal_poses(4096.0, 2.0)).unwrap();
        assert_eq!(cal.bias, Vec3::ZERO);
        assert_eq!(cal.scale, Vec3::splat(4096.0));
        assert!(cal.confidence > 0.99, "got {}", cal.confidence);
    }

    #[test]
    fn shared_offset_lands_in_bias() {
        let mut poses = ideal_poses(4096.0, 2.0);
        for p in &mut poses {
            p.mean = p.mean + Vec3::new(10.0, -20.0, 5.0);
        }
        let cal = solve(&poses).unwrap();
        assert!((cal.bias.x - 10.0).abs() < 1e-9);
        assert!((cal.bias.y + 20.0).abs() < 1e-9);
        assert!((cal.bias.z - 5.0).abs() < 1e-9);
        assert_eq!(cal.scale, Vec3::splat(4096.0));
    }

    #[test]
    fn missing_gravity_separation_is_fatal() {
        let poses: Vec<_> = Pose::ALL
            .iter()
            .map(|&p| pose(p, Vec3::new(0.0, 0.0, 0.5), 2.0))
            .collect();
        let err = solve(&poses).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CalError>(),
            Some(CalError::GravitySeparation(_))
        ));
    }

    #[test]
    fn noisy_poses_lower_confidence() {
        let clean = solve(&ideal_poses(4096.0, 1.0)).unwrap();
        let noisy = solve(&ideal_poses(4096.0, 11.0)).unwrap();
        assert!(noisy.confidence < clean.confidence);
        assert!(noisy.confidence >= CONFIDENCE_FLOOR);
    }
}
