//! Visualization Parameters - the sculpting knobs of the spiral
//!
//! All writes go through clamping setters. Values come straight from sliders,
//! so out-of-range input is corrected instead of rejected.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of periods the timeline is divided into
pub const PERIOD_COUNT: usize = 5;

/// Hard cap on memory spheres
pub const MAX_NODES: usize = 12;

pub const DURATION_RANGE: (f64, f64) = (1.0, 10.0);
pub const FREQUENCY_RANGE: (f64, f64) = (1.0, 200.0);
pub const BRUSH_RANGE: (f64, f64) = (0.25, 2.0);
pub const BRUSH_STEP: f64 = 0.25;

/// Everything the user can sculpt on the spiral
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualizationParameters {
    frequencies: [f64; PERIOD_COUNT],
    period_hues: [f64; PERIOD_COUNT],
    duration: f64,
    node_count: usize,
    segment_brush_size: f64,
    show_container: bool,
}

impl Default for VisualizationParameters {
    fn default() -> Self {
        Self {
            frequencies: [40.0, 60.0, 80.0, 100.0, 120.0],
            period_hues: [200.0, 160.0, 120.0, 80.0, 40.0],
            duration: 5.0,
            node_count: MAX_NODES,
            segment_brush_size: 0.5,
            show_container: true,
        }
    }
}

impl VisualizationParameters {
    pub fn frequencies(&self) -> &[f64; PERIOD_COUNT] {
        &self.frequencies
    }

    pub fn period_hues(&self) -> &[f64; PERIOD_COUNT] {
        &self.period_hues
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn segment_brush_size(&self) -> f64 {
        self.segment_brush_size
    }

    pub fn show_container(&self) -> bool {
        self.show_container
    }

    /// Set the days-per-cycle of one period. Integer slider in [1, 200].
    pub fn set_frequency(&mut self, period: usize, value: f64) {
        if let Some(slot) = self.frequencies.get_mut(period) {
            *slot = clamp_finite(value.round(), FREQUENCY_RANGE, FREQUENCY_RANGE.0);
        }
    }

    /// Set the base hue of one period, wrapped into [0, 360)
    pub fn set_period_hue(&mut self, period: usize, hue: f64) {
        if let Some(slot) = self.period_hues.get_mut(period) {
            *slot = normalize_hue(hue);
        }
    }

    pub fn set_duration(&mut self, years: f64) {
        self.duration = clamp_finite(years, DURATION_RANGE, DURATION_RANGE.0);
    }

    pub fn set_node_count(&mut self, count: usize) {
        self.node_count = count.clamp(1, MAX_NODES);
    }

    /// Brush size snaps to the slider's 0.25 step
    pub fn set_segment_brush_size(&mut self, size: f64) {
        let snapped = (size / BRUSH_STEP).round() * BRUSH_STEP;
        self.segment_brush_size = clamp_finite(snapped, BRUSH_RANGE, BRUSH_RANGE.0);
    }

    pub fn set_show_container(&mut self, show: bool) {
        self.show_container = show;
    }

    /// Roll new frequencies in [1, 199] and hues in [0, 360)
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for f in self.frequencies.iter_mut() {
            *f = rng.gen_range(1..=199) as f64;
        }
        for h in self.period_hues.iter_mut() {
            *h = rng.gen_range(0..360) as f64;
        }
    }

    /// Re-apply every clamp (used after deserializing from config or session)
    pub fn sanitized(mut self) -> Self {
        for i in 0..PERIOD_COUNT {
            self.set_frequency(i, self.frequencies[i]);
            self.set_period_hue(i, self.period_hues[i]);
        }
        self.set_duration(self.duration);
        self.set_node_count(self.node_count);
        self.set_segment_brush_size(self.segment_brush_size);
        self
    }
}

/// Wrap any hue into [0, 360). NaN maps to 0.
pub fn normalize_hue(hue: f64) -> f64 {
    if !hue.is_finite() {
        return 0.0;
    }
    let h = hue.rem_euclid(360.0);
    // rem_euclid can round tiny negatives up to exactly 360
    if h >= 360.0 {
        0.0
    } else {
        h
    }
}

fn clamp_finite(value: f64, (lo, hi): (f64, f64), fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(lo, hi)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_defaults() {
        let p = VisualizationParameters::default();
        assert_eq!(p.frequencies(), &[40.0, 60.0, 80.0, 100.0, 120.0]);
        assert_eq!(p.period_hues(), &[200.0, 160.0, 120.0, 80.0, 40.0]);
        assert_eq!(p.duration(), 5.0);
        assert_eq!(p.node_count(), 12);
        assert_eq!(p.segment_brush_size(), 0.5);
        assert!(p.show_container());
    }

    #[test]
    fn test_hue_wraps() {
        assert_eq!(normalize_hue(370.0), 10.0);
        assert_eq!(normalize_hue(-30.0), 330.0);
        assert_eq!(normalize_hue(360.0), 0.0);
        assert_eq!(normalize_hue(f64::NAN), 0.0);
        let tiny = normalize_hue(-1e-14);
        assert!((0.0..360.0).contains(&tiny));
    }

    #[test]
    fn test_setters_clamp() {
        let mut p = VisualizationParameters::default();
        p.set_frequency(0, 0.0);
        p.set_frequency(1, 500.0);
        p.set_frequency(2, 33.6);
        assert_eq!(p.frequencies()[0], 1.0);
        assert_eq!(p.frequencies()[1], 200.0);
        assert_eq!(p.frequencies()[2], 34.0);

        p.set_duration(0.2);
        assert_eq!(p.duration(), 1.0);
        p.set_duration(f64::INFINITY);
        assert_eq!(p.duration(), 1.0);

        p.set_node_count(0);
        assert_eq!(p.node_count(), 1);
        p.set_node_count(40);
        assert_eq!(p.node_count(), 12);

        p.set_segment_brush_size(0.9);
        assert_eq!(p.segment_brush_size(), 1.0);
        p.set_segment_brush_size(5.0);
        assert_eq!(p.segment_brush_size(), 2.0);
    }

    #[test]
    fn test_out_of_range_period_ignored() {
        let mut p = VisualizationParameters::default();
        p.set_frequency(7, 10.0);
        p.set_period_hue(5, 10.0);
        assert_eq!(p, VisualizationParameters::default());
    }

    #[test]
    fn test_randomize_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut p = VisualizationParameters::default();
        for _ in 0..50 {
            p.randomize(&mut rng);
            assert!(p.frequencies().iter().all(|f| (1.0..=199.0).contains(f) && f.fract() == 0.0));
            assert!(p.period_hues().iter().all(|h| (0.0..360.0).contains(h) && h.fract() == 0.0));
        }
    }

    #[test]
    fn test_sanitized_fixes_loaded_values() {
        let yaml = "frequencies: [0, 60, 80, 100, 900]\nperiodHues: [-10, 160, 120, 80, 720]\nduration: 42\nnodeCount: 0\n";
        let p: VisualizationParameters = serde_yaml::from_str(yaml).unwrap();
        let p = p.sanitized();
        assert_eq!(p.frequencies()[0], 1.0);
        assert_eq!(p.frequencies()[4], 200.0);
        assert_eq!(p.period_hues()[0], 350.0);
        assert_eq!(p.period_hues()[4], 0.0);
        assert_eq!(p.duration(), 10.0);
        assert_eq!(p.node_count(), 1);
        assert_eq!(p.segment_brush_size(), 0.5);
    }
}
