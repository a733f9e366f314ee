//! Magnetometer hard-iron offset and diagonal soft-iron scale from per-axis
//! min/max over a free-motion sweep.
//!
//! Only the diagonal scale is estimated; a future full 3×3 fit would
//! supersede it, which is why the artifact keeps the field a Vec3 behind a
//! versioned schema. Downstream: `corrected = (raw − offset) / scale` lands
//! each axis in ≈[−1, 1].

use crate::confidence::{self, CONFIDENCE_FLOOR};
use crate::types::Vec3;

/// Note attached when any axis saw less than one count of half-range.
pub const NOTE_INSUFFICIENT_EXCITATION: &str = "insufficient_mag_excitation";

/// Minimum per-axis half-range, in counts, for a usable estimate.
pub const MIN_HALF_RANGE_COUNTS: f64 = 1.0;

#[derive(Debug, Clone, Copy)]
pub struct MagCalibration {
    pub offset: Vec3,
    /// Per-axis counts half-range; unit (1,1,1) when degraded.
    pub scale: Vec3,
    pub confidence: f64,
    /// Set when the sweep under-excited at least one axis; the caller appends
    /// `NOTE_INSUFFICIENT_EXCITATION` to the phase summary.
    pub degraded: bool,
}

/// Estimate offset and scale from the sweep samples.
///
/// The offset is always reported, even for a degraded sweep; scale then
/// defaults to unit and confidence is forced to the floor.
pub fn solve(samples: &[Vec3]) -> MagCalibration {
    let Some((min, max)) = minmax(samples) else {
        // Zero samples: nothing was excited at all.
        return MagCalibration {
            offset: Vec3::ZERO,
            scale: Vec3::splat(1.0),
            confidence: CONFIDENCE_FLOOR,
            degraded: true,
        };
    };

    let offset = (max + min) * 0.5;
    let half_range = (max - min) * 0.5;

    if half_range.x < MIN_HALF_RANGE_COUNTS
        || half_range.y < MIN_HALF_RANGE_COUNTS
        || half_range.z < MIN_HALF_RANGE_COUNTS
    {
        tracing::warn!(
            ?half_range,
            "magnetometer sweep under-excited; defaulting to unit scale"
        );
        return MagCalibration {
            offset,
            scale: Vec3::splat(1.0),
            confidence: CONFIDENCE_FLOOR,
            degraded: true,
        };
    }

    let coverage = confidence::coverage(half_range);
    let sphericity = confidence::sphericity(samples, offset, half_range);
    MagCalibration {
        offset,
        scale: half_range,
        confidence: confidence::mag_phase(coverage, sphericity),
        degraded: false,
    }
}

fn minmax(samples: &[Vec3]) -> Option<(Vec3, Vec3)> {
    let mut it = samples.iter();
    let first = *it.next()?;
    let mut min = first;
    let mut max = first;
    for &v in it {
        min = min.min_with(v);
        max = max.max_with(v);
    }
    Some((min, max))
}
