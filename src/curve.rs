//! Spiral Curve Engine
//!
//! Converts {duration, five frequencies} into a 3D spiral wound around the Y axis.
//! - Each of the 5 periods gets its own winding rate (turns)
//! - Lower frequency (days per sample) means a tighter coil
//! - Y descends linearly from +height/2 (most recent) to -height/2

use std::f64::consts::PI;

use crate::params::{DURATION_RANGE, FREQUENCY_RANGE, PERIOD_COUNT};

/// Number of parameter steps; the curve has SAMPLE_COUNT + 1 points
pub const SAMPLE_COUNT: usize = 1500;

/// Radius of the spiral tube's centerline
pub const SPIRAL_RADIUS: f64 = 2.4;

/// Most Catmull-Rom steps `smooth` will insert between two samples
pub const MAX_SUBDIVISIONS: usize = 16;

/// Visual height per year of duration
const HEIGHT_PER_YEAR: f64 = 2.2;

/// Floor on turns per year so no period becomes a near-straight stretch
const MIN_TURNS_PER_YEAR: f64 = 0.8;

/// Sampled spiral, always rebuilt wholesale
#[derive(Debug, Clone, PartialEq)]
pub struct SpiralCurve {
    points: Vec<[f64; 3]>,
    height: f64,
    radius: f64,
}

impl SpiralCurve {
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Normalized cumulative arc length of every point, 0.0 at the first and 1.0 at the last.
    ///
    /// Segments are equal-length slices of arc length, so this is what maps a
    /// point of the drawn tube onto a segment index.
    pub fn arc_fractions(&self) -> Vec<f64> {
        let n = self.points.len();
        if n < 2 {
            return vec![0.0; n];
        }

        let mut acc = Vec::with_capacity(n);
        let mut total = 0.0;
        acc.push(0.0);
        for w in self.points.windows(2) {
            total += distance(w[0], w[1]);
            acc.push(total);
        }

        if total <= 0.0 {
            return (0..n).map(|i| i as f64 / (n - 1) as f64).collect();
        }
        acc.iter().map(|d| d / total).collect()
    }

    /// Catmull-Rom interpolation with `subdivisions` steps between each pair of samples,
    /// capped at `MAX_SUBDIVISIONS`.
    ///
    /// Endpoints are duplicated as phantom control points. The input samples are
    /// kept, so the result still starts and ends on the same points.
    pub fn smooth(&self, subdivisions: usize) -> SpiralCurve {
        let subdivisions = subdivisions.min(MAX_SUBDIVISIONS);
        if subdivisions <= 1 || self.points.len() < 2 {
            return self.clone();
        }

        let n = self.points.len();
        let mut out = Vec::with_capacity((n - 1) * subdivisions + 1);
        for i in 0..n - 1 {
            let p0 = self.points[i.saturating_sub(1)];
            let p1 = self.points[i];
            let p2 = self.points[i + 1];
            let p3 = self.points[(i + 2).min(n - 1)];
            for step in 0..subdivisions {
                let t = step as f64 / subdivisions as f64;
                out.push([
                    catmull_rom(p0[0], p1[0], p2[0], p3[0], t),
                    catmull_rom(p0[1], p1[1], p2[1], p3[1], t),
                    catmull_rom(p0[2], p1[2], p2[2], p3[2], t),
                ]);
            }
        }
        out.push(self.points[n - 1]);

        SpiralCurve {
            points: out,
            height: self.height,
            radius: self.radius,
        }
    }
}

/// Total height of the spiral for a duration in years
pub fn spiral_height(duration: f64) -> f64 {
    clamp_duration(duration) * HEIGHT_PER_YEAR
}

/// Full turns made during each period
pub fn turns_per_period(frequencies: &[f64; PERIOD_COUNT], duration: f64) -> [f64; PERIOD_COUNT] {
    let years_per_period = clamp_duration(duration) / PERIOD_COUNT as f64;
    let mut turns = [0.0; PERIOD_COUNT];
    for (t, &f) in turns.iter_mut().zip(frequencies.iter()) {
        let per_year = (160.0 / clamp_frequency(f).powf(0.85)).max(MIN_TURNS_PER_YEAR);
        *t = years_per_period * per_year;
    }
    turns
}

/// Cumulative winding angle (radians) at parametric position t in [0, 1]
pub fn angle_at(turns: &[f64; PERIOD_COUNT], t: f64) -> f64 {
    let scaled = t.clamp(0.0, 1.0) * PERIOD_COUNT as f64;
    let period = (scaled.floor() as usize).min(PERIOD_COUNT - 1);
    let frac = scaled - period as f64;

    let completed: f64 = turns[..period].iter().sum();
    2.0 * PI * (completed + frac * turns[period])
}

/// Build the spiral
///
/// # Arguments
/// * `frequencies` - Days per cycle for each period, clamped to (0, 200]
/// * `duration` - Years covered, clamped to [1, 10]
///
/// # Returns
/// SAMPLE_COUNT + 1 points, top to bottom
pub fn build_curve(frequencies: &[f64; PERIOD_COUNT], duration: f64) -> SpiralCurve {
    let height = spiral_height(duration);
    let turns = turns_per_period(frequencies, duration);

    let points = (0..=SAMPLE_COUNT)
        .map(|i| {
            let t = i as f64 / SAMPLE_COUNT as f64;
            let angle = angle_at(&turns, t);
            [
                SPIRAL_RADIUS * angle.cos(),
                height / 2.0 - t * height,
                SPIRAL_RADIUS * angle.sin(),
            ]
        })
        .collect();

    SpiralCurve {
        points,
        height,
        radius: SPIRAL_RADIUS,
    }
}

/// Non-positive or non-finite frequencies fall back to the slider minimum
fn clamp_frequency(f: f64) -> f64 {
    if f.is_finite() && f > 0.0 {
        f.min(FREQUENCY_RANGE.1)
    } else {
        FREQUENCY_RANGE.0
    }
}

fn clamp_duration(d: f64) -> f64 {
    if d.is_finite() {
        d.clamp(DURATION_RANGE.0, DURATION_RANGE.1)
    } else {
        DURATION_RANGE.0
    }
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let dz = b[2] - a[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Catmull-Rom spline interpolation
fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_FREQS: [f64; 5] = [40.0, 60.0, 80.0, 100.0, 120.0];

    #[test]
    fn test_point_count_and_descending_y() {
        for &(freqs, duration) in &[
            (DEFAULT_FREQS, 5.0),
            ([1.0, 1.0, 1.0, 1.0, 1.0], 10.0),
            ([200.0, 150.0, 3.0, 77.0, 200.0], 1.0),
        ] {
            let curve = build_curve(&freqs, duration);
            let height = duration * 2.2;
            assert_eq!(curve.len(), 1501);

            let pts = curve.points();
            assert!((pts[0][1] - height / 2.0).abs() < 1e-9);
            assert!((pts[1500][1] + height / 2.0).abs() < 1e-9);
            for w in pts.windows(2) {
                assert!(w[1][1] < w[0][1]);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let a = build_curve(&DEFAULT_FREQS, 5.0);
        let b = build_curve(&DEFAULT_FREQS, 5.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_points_on_radius() {
        let curve = build_curve(&DEFAULT_FREQS, 3.3);
        for p in curve.points() {
            let r = (p[0] * p[0] + p[2] * p[2]).sqrt();
            assert!((r - SPIRAL_RADIUS).abs() < 1e-9);
        }
    }

    #[test]
    fn test_turns_inverse_power_law() {
        let turns = turns_per_period(&DEFAULT_FREQS, 5.0);
        // duration/5 = 1 year per period
        assert!((turns[0] - 160.0 / 40f64.powf(0.85)).abs() < 1e-12);
        // lower frequency coils tighter
        assert!(turns[0] > turns[1] && turns[1] > turns[4]);
    }

    #[test]
    fn test_huge_frequency_clamped() {
        let turns = turns_per_period(&[1e9; 5], 5.0);
        let expected = (160.0 / 200f64.powf(0.85)).max(0.8);
        assert!((turns[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_bad_frequencies_do_not_blow_up() {
        let curve = build_curve(&[0.0, -5.0, f64::NAN, 60.0, 80.0], 5.0);
        assert_eq!(curve.len(), 1501);
        assert!(curve.points().iter().all(|p| p.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn test_angle_accumulates_across_periods() {
        let turns = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(angle_at(&turns, 0.0), 0.0);
        assert!((angle_at(&turns, 0.2) - 2.0 * PI).abs() < 1e-9);
        assert!((angle_at(&turns, 0.3) - 2.0 * PI * 2.0).abs() < 1e-9);
        assert!((angle_at(&turns, 1.0) - 2.0 * PI * 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_arc_fractions() {
        let curve = build_curve(&DEFAULT_FREQS, 5.0);
        let arc = curve.arc_fractions();
        assert_eq!(arc.len(), curve.len());
        assert_eq!(arc[0], 0.0);
        assert!((arc[arc.len() - 1] - 1.0).abs() < 1e-12);
        for w in arc.windows(2) {
            assert!(w[1] > w[0]);
        }
    }

    #[test]
    fn test_smooth_keeps_samples() {
        let curve = build_curve(&DEFAULT_FREQS, 2.0);
        let smooth = curve.smooth(3);
        assert_eq!(smooth.len(), 1500 * 3 + 1);
        assert_eq!(smooth.points()[0], curve.points()[0]);
        assert_eq!(smooth.points()[3], curve.points()[1]);
        assert_eq!(smooth.points()[smooth.len() - 1], curve.points()[1500]);
        assert_eq!(curve.smooth(1), curve);
    }

    #[test]
    fn test_smooth_caps_subdivisions() {
        let curve = build_curve(&DEFAULT_FREQS, 5.0);
        assert_eq!(curve.smooth(usize::MAX / 2).len(), 1500 * MAX_SUBDIVISIONS + 1);
        assert_eq!(curve.smooth(usize::MAX), curve.smooth(MAX_SUBDIVISIONS));
        assert_eq!(curve.smooth(0), curve);
    }
}
