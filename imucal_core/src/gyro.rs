//! Gyroscope bias estimation: static capture plus per-axis dynamic
//! refinement.
//!
//! The static estimate is the mean of a stationary capture. The dynamic pass
//! integrates the bias-subtracted rate while the operator spins the unit
//! around one axis at a time; residual drift divided by duration is the
//! leftover bias on that axis. Sign convention is axis-aligned right-handed,
//! positive counts = counter-clockwise viewed from the +axis direction.

use crate::confidence::{
    self, CONFIDENCE_FLOOR, dominance_factor, duration_factor, rate_factor, spin_axis,
};
use crate::stats::PhaseSummary;
use crate::types::{Axis, Vec3};

/// Blend weight of the static estimate in the final bias.
pub const STATIC_BLEND: f64 = 0.75;

#[derive(Debug, Clone, Copy)]
pub struct StaticBias {
    pub bias: Vec3,
    pub confidence: f64,
}

/// Static bias from a stationary capture: bias = mean, quality from
/// stillness. An empty capture degrades to the floor.
pub fn static_bias(summary: &PhaseSummary) -> StaticBias {
    let confidence = if summary.count == 0 {
        CONFIDENCE_FLOOR
    } else {
        confidence::stillness(summary.stddev)
    };
    StaticBias {
        bias: summary.mean,
        confidence,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AxisRefinement {
    pub axis: Axis,
    pub residual: f64,
    pub confidence: f64,
}

/// Residual bias on `axis` from one spin capture.
///
/// `b = ∫ω dt / T` on the targeted axis; low dominance is not rejected here,
/// it only lowers the confidence used when the three axes are combined.
pub fn refine_axis(axis: Axis, summary: &PhaseSummary, min_secs: f64) -> AxisRefinement {
    let residual = match summary.integrated {
        Some(integrated) if summary.duration_s > 0.0 => {
            integrated.axis(axis) / summary.duration_s
        }
        _ => 0.0,
    };
    let confidence = if summary.count == 0 {
        CONFIDENCE_FLOOR
    } else {
        let dur = duration_factor(summary.duration_s, min_secs);
        let dom = dominance_factor(summary.dominance.unwrap_or(Vec3::ZERO).axis(axis));
        let rate = rate_factor(summary.mean_abs.axis(axis));
        spin_axis(dur, dom, rate)
    };
    AxisRefinement {
        axis,
        residual,
        confidence,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DynamicRefinement {
    pub bias: Vec3,
    /// Confidence-weighted mean of the per-axis confidences.
    pub confidence: f64,
}

/// Assemble the three per-axis residuals and the aggregate rotation
/// confidence (each axis weighted by its own confidence).
pub fn combine_axes(axes: &[AxisRefinement; 3]) -> DynamicRefinement {
    let mut bias = Vec3::ZERO;
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    for r in axes {
        bias.set_axis(r.axis, r.residual);
        weighted += r.confidence * r.confidence;
        weight_sum += r.confidence;
    }
    let confidence = if weight_sum > 0.0 {
        weighted / weight_sum
    } else {
        CONFIDENCE_FLOOR
    };
    DynamicRefinement { bias, confidence }
}

/// `0.75·static + 0.25·dynamic`.
pub fn final_bias(static_bias: Vec3, dynamic_bias: Vec3) -> Vec3 {
    static_bias * STATIC_BLEND + dynamic_bias * (1.0 - STATIC_BLEND)
}
