//! Streaming statistics over capture-phase observations.
//!
//! `StatsAccumulator` folds `Vec3` samples one at a time into the aggregates a
//! `PhaseSummary` needs: mean and population variance via Welford's online
//! update, per-axis mean-absolute, min/max, and a trapezoidal integral under
//! the nominal-spacing assumption. O(1) auxiliary state once the sample buffer
//! is reserved by the caller.

use crate::types::Vec3;
use serde::Serialize;

/// Immutable statistical record of one capture phase.
///
/// Notes are additive, human-readable degradation markers
/// (`stopped_by_timeout`, `too_short:...`, `insufficient_mag_excitation`);
/// they never replace the numeric fields.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseSummary {
    pub count: usize,
    pub duration_s: f64,
    pub mean: Vec3,
    pub mean_abs: Vec3,
    pub stddev: Vec3,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominance: Option<Vec3>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrated: Option<Vec3>,
    pub notes: Vec<String>,
}

impl PhaseSummary {
    /// Summary of a capture that recorded nothing over `duration_s`.
    pub fn empty(duration_s: f64) -> Self {
        Self {
            count: 0,
            duration_s,
            mean: Vec3::ZERO,
            mean_abs: Vec3::ZERO,
            stddev: Vec3::ZERO,
            dominance: None,
            integrated: None,
            notes: Vec::new(),
        }
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}

/// What optional aggregates `summarize` should materialize.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryOpts {
    /// Report normalized axis dominance (`mean_abs[i] / Σ mean_abs`).
    pub dominance: bool,
    /// Report the trapezoidal integral, assuming uniform spacing at this
    /// period (seconds). Nominal, not measured.
    pub integrate_period_s: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct StatsAccumulator {
    count: usize,
    mean: Vec3,
    m2: Vec3,
    sum_abs: Vec3,
    sum: Vec3,
    min: Vec3,
    max: Vec3,
    first: Option<Vec3>,
    last: Vec3,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, v: Vec3) {
        self.count += 1;
        let n = self.count as f64;
        // Welford per axis: mean' = mean + d/n, M2' += d * (v - mean')
        let d = v - self.mean;
        self.mean = self.mean + d * (1.0 / n);
        let d2 = v - self.mean;
        self.m2 = self.m2 + Vec3::new(d.x * d2.x, d.y * d2.y, d.z * d2.z);

        self.sum_abs = self.sum_abs + v.abs();
        self.sum = self.sum + v;
        if self.first.is_none() {
            self.first = Some(v);
            self.min = v;
            self.max = v;
        } else {
            self.min = self.min.min_with(v);
            self.max = self.max.max_with(v);
        }
        self.last = v;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Vec3 {
        self.mean
    }

    /// Per-axis minimum; `None` before the first sample.
    pub fn min(&self) -> Option<Vec3> {
        self.first.map(|_| self.min)
    }

    /// Per-axis maximum; `None` before the first sample.
    pub fn max(&self) -> Option<Vec3> {
        self.first.map(|_| self.max)
    }

    /// Population standard deviation per axis.
    pub fn stddev(&self) -> Vec3 {
        if self.count == 0 {
            return Vec3::ZERO;
        }
        let n = self.count as f64;
        (self.m2 * (1.0 / n)).map(f64::sqrt)
    }

    /// Trapezoidal integral with uniform spacing `period_s`:
    /// `dt · (Σv − (first + last)/2)`. Zero below two samples.
    pub fn integral(&self, period_s: f64) -> Vec3 {
        let Some(first) = self.first else {
            return Vec3::ZERO;
        };
        if self.count < 2 {
            return Vec3::ZERO;
        }
        (self.sum - (first + self.last) * 0.5) * period_s
    }

    /// Seal the accumulated state into a `PhaseSummary` over `duration_s`.
    pub fn summarize(&self, duration_s: f64, opts: SummaryOpts) -> PhaseSummary {
        if self.count == 0 {
            return PhaseSummary::empty(duration_s);
        }
        let n = self.count as f64;
        let mean_abs = self.sum_abs * (1.0 / n);
        let dominance = opts.dominance.then(|| {
            let total = mean_abs.sum();
            if total > 0.0 {
                mean_abs * (1.0 / total)
            } else {
                Vec3::ZERO
            }
        });
        PhaseSummary {
            count: self.count,
            duration_s,
            mean: self.mean,
            mean_abs,
            stddev: self.stddev(),
            dominance,
            integrated: opts.integrate_period_s.map(|p| self.integral(p)),
            notes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn mean_and_stddev_match_definitions() {
        let mut acc = StatsAccumulator::new();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            acc.push(Vec3::splat(v));
        }
        let s = acc.summarize(1.0, SummaryOpts::default());
        assert_eq!(s.count, 8);
        assert!(close(s.mean.x, 5.0));
        // population stddev of the classic sequence is exactly 2
        assert!(close(s.stddev.x, 2.0));
        assert!(close(s.mean_abs.y, 5.0));
    }

    #[test]
    fn minmax_track_extremes() {
        let mut acc = StatsAccumulator::new();
        acc.push(Vec3::new(1.0, -4.0, 0.0));
        acc.push(Vec3::new(-2.0, 9.0, 0.5));
        acc.push(Vec3::new(0.0, 3.0, -0.5));
        assert_eq!(acc.min().unwrap(), Vec3::new(-2.0, -4.0, -0.5));
        assert_eq!(acc.max().unwrap(), Vec3::new(1.0, 9.0, 0.5));
    }

    #[test]
    fn integral_is_trapezoidal_under_uniform_spacing() {
        let mut acc = StatsAccumulator::new();
        // v(t) = t over samples 0,1,2,3 at dt=1: trapezoid area = 4.5
        for v in [0.0, 1.0, 2.0, 3.0] {
            acc.push(Vec3::splat(v));
        }
        assert!(close(acc.integral(1.0).x, 4.5));
        // single sample integrates to zero
        let mut one = StatsAccumulator::new();
        one.push(Vec3::splat(10.0));
        assert_eq!(one.integral(1.0), Vec3::ZERO);
    }

    #[test]
    fn dominance_normalizes_or_zeroes() {
        let mut acc = StatsAccumulator::new();
        acc.push(Vec3::new(8.0, 1.0, 1.0));
        let s = acc.summarize(
            1.0,
            SummaryOpts {
                dominance: true,
                integrate_period_s: None,
            },
        );
        let d = s.dominance.unwrap();
        assert!(close(d.x, 0.8));
        assert!(close(d.sum(), 1.0));

        let mut zeros = StatsAccumulator::new();
        zeros.push(Vec3::ZERO);
        let s = zeros.summarize(
            1.0,
            SummaryOpts {
                dominance: true,
                integrate_period_s: None,
            },
        );
        assert_eq!(s.dominance.unwrap(), Vec3::ZERO);
    }

    #[test]
    fn empty_input_keeps_duration() {
        let acc = StatsAccumulator::new();
        let s = acc.summarize(3.5, SummaryOpts::default());
        assert_eq!(s.count, 0);
        assert_eq!(s.duration_s, 3.5);
        assert_eq!(s.mean, Vec3::ZERO);
    }
}
