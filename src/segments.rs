//! Segment Store - fixed-size sequence of colored spiral slices
//!
//! The number of segments is set at construction and never changes; painting
//! and hue resyncs only rewrite colors.

use serde::{Deserialize, Serialize};

use crate::color::{color_for, Hsl};
use crate::params::PERIOD_COUNT;

/// Brush size slider units to segment radius (tuned for 400 segments)
pub const BRUSH_SCALE: f64 = 4.0;

/// One colorable slice of the spiral
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: usize,
    pub color: Hsl,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentStore {
    segments: Vec<Segment>,
}

impl SegmentStore {
    /// Create `count` segments colored from the period hues
    pub fn new(count: usize, period_hues: &[f64; PERIOD_COUNT]) -> Self {
        let segments = (0..count)
            .map(|id| Segment {
                id,
                color: color_for(period_hues[period_of(id, count)], id, count),
                label: format!("Segment {}", id),
            })
            .collect();
        Self { segments }
    }

    /// Rebuild from persisted segments. Ids must be 0..n in order.
    pub fn from_segments(segments: Vec<Segment>) -> Option<Self> {
        if segments.iter().enumerate().all(|(i, s)| s.id == i) {
            Some(Self { segments })
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn get(&self, id: usize) -> Option<&Segment> {
        self.segments.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.segments
    }

    /// Period a segment belongs to
    pub fn period_of(&self, id: usize) -> usize {
        period_of(id, self.segments.len())
    }

    /// Color every segment with |id - center| <= radius.
    ///
    /// Distance is linear in index space; the two ends of the sequence are not adjacent.
    /// Returns the number of segments written.
    pub fn paint(&mut self, center: usize, radius: f64, color: Hsl) -> usize {
        let mut painted = 0;
        for seg in self.segments.iter_mut() {
            if (seg.id as f64 - center as f64).abs() <= radius {
                seg.color = color;
                painted += 1;
            }
        }
        tracing::debug!(center, radius, painted, color = %color, "Painted segments");
        painted
    }

    /// Recolor every segment from its period's hue
    pub fn resync_all(&mut self, period_hues: &[f64; PERIOD_COUNT]) {
        let count = self.segments.len();
        for (i, seg) in self.segments.iter_mut().enumerate() {
            seg.color = color_for(period_hues[period_of(i, count)], i, count);
        }
        tracing::debug!(count, hues = ?period_hues, "Resynced all segment colors");
    }

    /// Recolor only the segments of one period, leaving paint elsewhere untouched
    pub fn resync_period(&mut self, period: usize, hue: f64) {
        let count = self.segments.len();
        for (i, seg) in self.segments.iter_mut().enumerate() {
            if period_of(i, count) == period {
                seg.color = color_for(hue, i, count);
            }
        }
    }
}

/// Segment radius for a brush size slider value
pub fn brush_radius(brush_size: f64) -> f64 {
    brush_size * BRUSH_SCALE
}

fn period_of(index: usize, count: usize) -> usize {
    let per_period = count as f64 / PERIOD_COUNT as f64;
    ((index as f64 / per_period).floor() as usize).min(PERIOD_COUNT - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HUES: [f64; 5] = [200.0, 160.0, 120.0, 80.0, 40.0];

    #[test]
    fn test_paint_radius_inclusive() {
        let mut store = SegmentStore::new(400, &HUES);
        let before = store.clone();
        let red = Hsl::new(0.0, 100.0, 60.0);

        assert_eq!(store.paint(200, 2.0, red), 5);
        for seg in store.iter() {
            if (198..=202).contains(&seg.id) {
                assert_eq!(seg.color, red);
            } else {
                assert_eq!(seg.color, before.get(seg.id).unwrap().color);
            }
        }
    }

    #[test]
    fn test_paint_does_not_wrap() {
        let mut store = SegmentStore::new(400, &HUES);
        let c = Hsl::new(10.0, 100.0, 60.0);
        assert_eq!(store.paint(0, 2.0, c), 3);
        assert_ne!(store.get(399).unwrap().color, c);
        assert_ne!(store.get(398).unwrap().color, c);
    }

    #[test]
    fn test_fractional_radius() {
        let mut store = SegmentStore::new(400, &HUES);
        // brush 0.25 -> radius 1.0 -> 3 segments; brush 0.5 -> radius 2.0 -> 5
        assert_eq!(store.paint(100, brush_radius(0.25), Hsl::new(0.0, 100.0, 60.0)), 3);
        assert_eq!(store.paint(100, 1.5, Hsl::new(0.0, 100.0, 60.0)), 3);
        assert_eq!(store.paint(100, brush_radius(2.0), Hsl::new(0.0, 100.0, 60.0)), 17);
    }

    #[test]
    fn test_new_store_is_already_synced() {
        let store = SegmentStore::new(400, &HUES);
        let mut resynced = store.clone();
        resynced.resync_all(&HUES);
        assert_eq!(store, resynced);
        assert_eq!(store.get(0).unwrap().color, color_for(200.0, 0, 400));
    }

    #[test]
    fn test_resync_matches_color_field() {
        let mut store = SegmentStore::new(400, &[0.0; 5]);
        store.resync_all(&HUES);
        assert_eq!(store.get(0).unwrap().color, color_for(200.0, 0, 400));
        assert_eq!(store.get(399).unwrap().color, color_for(40.0, 399, 400));
        assert_eq!(store.get(80).unwrap().color, color_for(160.0, 80, 400));
        assert_eq!(store.len(), 400);
    }

    #[test]
    fn test_resync_period_keeps_other_paint() {
        let mut store = SegmentStore::new(400, &HUES);
        let paint = Hsl::new(300.0, 100.0, 60.0);
        store.paint(10, 0.0, paint);
        store.paint(100, 0.0, paint);

        store.resync_period(1, 10.0);
        assert_eq!(store.get(10).unwrap().color, paint);
        assert_eq!(store.get(100).unwrap().color, color_for(10.0, 100, 400));
        assert_eq!(store.get(160).unwrap().color, color_for(120.0, 160, 400));
    }

    #[test]
    fn test_period_boundaries() {
        let store = SegmentStore::new(400, &HUES);
        assert_eq!(store.period_of(0), 0);
        assert_eq!(store.period_of(79), 0);
        assert_eq!(store.period_of(80), 1);
        assert_eq!(store.period_of(399), 4);
        // uneven counts still land in 0..5
        assert_eq!(period_of(6, 7), 4);
    }

    #[test]
    fn test_labels_and_from_segments() {
        let store = SegmentStore::new(10, &HUES);
        assert_eq!(store.get(3).unwrap().label, "Segment 3");

        let segments = store.as_slice().to_vec();
        assert!(SegmentStore::from_segments(segments.clone()).is_some());

        let mut shuffled = segments;
        shuffled.swap(0, 1);
        assert!(SegmentStore::from_segments(shuffled).is_none());
    }
}
