//! Color Field - textured per-period coloring without stored randomness
//!
//! Segments are grouped into bands of 18. A deterministic hash flags about 14%
//! of the bands as accent patches with a shifted, fully saturated hue; the rest
//! get a small hue jitter around the period's base hue. Lightness is nudged per
//! hue band so every band reads at a similar brightness.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::params::normalize_hue;

/// Segments per patch group
pub const GROUP_SIZE: usize = 18;

/// Share of groups flagged as accent patches
const PATCH_THRESHOLD: f64 = 0.14;

/// HSL color: hue in degrees [0, 360), saturation and lightness in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Hsl {
    pub fn new(h: f64, s: f64, l: f64) -> Self {
        Self {
            h: normalize_hue(h),
            s: s.clamp(0.0, 100.0),
            l: l.clamp(0.0, 100.0),
        }
    }

    /// Convert to 8-bit sRGB
    pub fn to_rgb(&self) -> [u8; 3] {
        hsl_to_rgb(self.h, self.s / 100.0, self.l / 100.0)
    }
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsl({}, {}%, {}%)", self.h, self.s.round(), self.l.round())
    }
}

/// Deterministic pseudo-random hash in [0, 1)
pub fn hash(n: f64) -> f64 {
    ((n * 12.9898 + 78.233).sin() * 43758.5453123).abs().fract()
}

/// Color of one segment for a period's base hue.
///
/// Only the 18-segment group of `segment_index` matters, so any index is
/// accepted; the count is part of the contract but does not affect the result.
pub fn color_for(base_hue: f64, segment_index: usize, _segment_count: usize) -> Hsl {
    let base = normalize_hue(base_hue);
    let group = (segment_index / GROUP_SIZE) as f64;
    let is_patch = hash(group * 0.91) < PATCH_THRESHOLD;

    if is_patch {
        let h = normalize_hue(base + 70.0 + hash(group * 1.5) * 360.0);
        let l = if h > 40.0 && h < 75.0 {
            45.0 // yellow
        } else if (75.0..165.0).contains(&h) {
            40.0 // green
        } else if h > 185.0 && h < 265.0 {
            44.0 // blue
        } else {
            48.0
        };
        Hsl { h, s: 100.0, l }
    } else {
        let jitter = hash(group) * 12.0 - 6.0;
        let h = normalize_hue(base + jitter + 360.0);
        let l = if h > 40.0 && h < 200.0 { 46.0 } else { 53.0 };
        Hsl { h, s: 95.0, l }
    }
}

/// Convert HSL (h in degrees 0-360, s and l in 0.0-1.0) to RGB [0-255]
fn hsl_to_rgb(h: f64, s: f64, l: f64) -> [u8; 3] {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let h_prime = h / 60.0;
    let x = c * (1.0 - (h_prime % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match h_prime as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    [
        ((r1 + m) * 255.0).round().clamp(0.0, 255.0) as u8,
        ((g1 + m) * 255.0).round().clamp(0.0, 255.0) as u8,
        ((b1 + m) * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}
