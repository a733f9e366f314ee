//! Pure quality scorers mapping per-phase statistics into [0,1].
//!
//! Every public scorer clamps to [0,1] and then raises to `CONFIDENCE_FLOOR`,
//! so no phase ever reports zero unless it is entirely absent.

use crate::types::Vec3;

/// Minimum value any computed confidence may take.
pub const CONFIDENCE_FLOOR: f64 = 0.05;

// Stillness: average per-axis stddev below this is perfectly still, above the
// upper bound it is hopeless.
const STILL_GOOD_COUNTS: f64 = 3.0;
const STILL_BAD_COUNTS: f64 = 12.0;

// Axis dominance band for spin captures.
const DOM_FULL: f64 = 0.70;
const DOM_POOR: f64 = 0.45;

// Mean-absolute rotation rate thresholds (counts).
const RATE_MIN_COUNTS: f64 = 20.0;
const RATE_FULL_COUNTS: f64 = 80.0;

// Per-axis spin confidence blend.
const SPIN_W_DURATION: f64 = 0.25;
const SPIN_W_DOMINANCE: f64 = 0.45;
const SPIN_W_RATE: f64 = 0.30;

// Accel phase blend.
const ACCEL_W_STILLNESS: f64 = 0.65;
const ACCEL_W_CONSISTENCY: f64 = 0.35;

// Mag phase blend; sphericity needs a minimum population to be meaningful.
const MAG_W_COVERAGE: f64 = 0.55;
const MAG_W_SPHERICITY: f64 = 0.45;
const SPHERICITY_MIN_SAMPLES: usize = 50;

// Overall blend across phases.
const OVERALL_W_GYRO_STATIC: f64 = 0.20;
const OVERALL_W_GYRO_ROTATION: f64 = 0.20;
const OVERALL_W_ACCEL: f64 = 0.25;
const OVERALL_W_MAG: f64 = 0.35;

#[inline]
pub fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Clamp to [0,1], then raise to the floor.
#[inline]
pub fn floored(x: f64) -> f64 {
    clamp01(x).max(CONFIDENCE_FLOOR)
}

/// How still the unit was, from the per-axis standard deviation of a
/// stationary capture.
pub fn stillness(stddev: Vec3) -> f64 {
    let s = stddev.sum() / 3.0;
    let raw = if s <= STILL_GOOD_COUNTS {
        1.0
    } else if s >= STILL_BAD_COUNTS {
        CONFIDENCE_FLOOR
    } else {
        1.0 - 0.95 * (s - STILL_GOOD_COUNTS) / (STILL_BAD_COUNTS - STILL_GOOD_COUNTS)
    };
    floored(raw)
}

/// Fraction of the minimum useful spin duration actually captured.
pub fn duration_factor(duration_s: f64, min_s: f64) -> f64 {
    if min_s <= 0.0 {
        return 1.0;
    }
    clamp01(duration_s / min_s)
}

/// How exclusively the motion stayed on the targeted axis.
pub fn dominance_factor(d: f64) -> f64 {
    if d >= DOM_FULL {
        1.0
    } else if d <= DOM_POOR {
        0.2
    } else {
        0.2 + 0.8 * (d - DOM_POOR) / (DOM_FULL - DOM_POOR)
    }
}

/// Whether the rotation was fast enough to separate signal from noise.
pub fn rate_factor(mean_abs: f64) -> f64 {
    if mean_abs < RATE_MIN_COUNTS {
        0.2
    } else {
        clamp01(mean_abs / RATE_FULL_COUNTS)
    }
}

/// Combined per-axis spin confidence.
pub fn spin_axis(duration: f64, dominance: f64, rate: f64) -> f64 {
    floored(SPIN_W_DURATION * duration + SPIN_W_DOMINANCE * dominance + SPIN_W_RATE * rate)
}

/// Agreement of the three per-axis gravity magnitudes from the six-pose fit.
pub fn gravity_consistency(g: [f64; 3]) -> f64 {
    let mean = (g[0] + g[1] + g[2]) / 3.0;
    if mean <= 0.0 {
        return 0.0;
    }
    let var = g.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / 3.0;
    let cv = var.sqrt() / mean;
    clamp01(1.0 - cv / 0.5)
}

/// Accel phase confidence from average pose stillness and gravity consistency.
pub fn accel_phase(avg_stillness: f64, consistency: f64) -> f64 {
    floored(ACCEL_W_STILLNESS * avg_stillness + ACCEL_W_CONSISTENCY * consistency)
}

/// How evenly the mag sweep excited the three axes, from the half-ranges.
pub fn coverage(half_range: Vec3) -> f64 {
    let mean = half_range.sum() / 3.0;
    if mean <= 0.0 {
        return 0.0;
    }
    let var = [half_range.x, half_range.y, half_range.z]
        .iter()
        .map(|v| (v - mean) * (v - mean))
        .sum::<f64>()
        / 3.0;
    let cv = var.sqrt() / mean;
    clamp01(1.0 - cv / 0.7)
}

/// How spherical the offset-and-scale-corrected mag cloud is.
///
/// Each sample's corrected norm should sit near 1; the score decays with the
/// coefficient of variation of those norms. Returns the floor below
/// `SPHERICITY_MIN_SAMPLES` samples.
pub fn sphericity(samples: &[Vec3], offset: Vec3, scale: Vec3) -> f64 {
    if samples.len() < SPHERICITY_MIN_SAMPLES {
        return CONFIDENCE_FLOOR;
    }
    // Guard zero denominators, preserving sign.
    let safe = scale.map(|s| {
        if s == 0.0 {
            1e-9
        } else if s.abs() < 1e-9 {
            1e-9_f64.copysign(s)
        } else {
            s
        }
    });
    let n = samples.len() as f64;
    let mut sum = 0.0;
    let mut sumsq = 0.0;
    for s in samples {
        let c = *s - offset;
        let r = ((c.x / safe.x).powi(2) + (c.y / safe.y).powi(2) + (c.z / safe.z).powi(2)).sqrt();
        sum += r;
        sumsq += r * r;
    }
    let mu = sum / n;
    if mu <= 0.0 {
        return CONFIDENCE_FLOOR;
    }
    let var = (sumsq / n - mu * mu).max(0.0);
    let cv = var.sqrt() / mu;
    floored(1.0 - cv / 0.5)
}

/// Mag phase confidence from coverage and sphericity.
pub fn mag_phase(coverage: f64, sphericity: f64) -> f64 {
    floored(MAG_W_COVERAGE * coverage + MAG_W_SPHERICITY * sphericity)
}

/// Aggregate run confidence across the four phase scores.
pub fn overall(gyro_static: f64, gyro_rotation: f64, accel: f64, mag: f64) -> f64 {
    clamp01(
        OVERALL_W_GYRO_STATIC * gyro_static
            + OVERALL_W_GYRO_ROTATION * gyro_rotation
            + OVERALL_W_ACCEL * accel
            + OVERALL_W_MAG * mag,
    )
}
