//! Memory spheres - the timeline entries orbiting above the spiral
//!
//! A fixed pool of 12 nodes is allocated up front. Only the first `nodeCount`
//! are visible, and their longitudes are re-derived on every layout so the
//! visible set is always evenly spaced.

use chrono::Month;
use serde::{Deserialize, Serialize};

use crate::params::MAX_NODES;

/// One memory on the orbit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineNode {
    pub id: usize,
    pub month: String,
    pub year: i32,
    pub title: String,
    pub note: String,
    pub longitude: f64,
    pub valence: i8,
    pub image_url: Option<String>,
}

/// Field-by-field update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub title: Option<String>,
    pub note: Option<String>,
    pub valence: Option<f64>,
    /// `Some(None)` clears the image
    pub image_url: Option<Option<String>>,
}

/// A visible node with its derived longitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedMarker<'a> {
    pub node: &'a TimelineNode,
    pub longitude: f64,
}

/// The fixed pool of nodes, ordered by id
#[derive(Debug, Clone, PartialEq)]
pub struct NodePool {
    nodes: Vec<TimelineNode>,
}

impl NodePool {
    /// Pre-allocate all 12 nodes for the given year
    pub fn new(year: i32) -> Self {
        let nodes = (0..MAX_NODES)
            .map(|id| {
                let month = month_name(id);
                TimelineNode {
                    id,
                    title: format!("Memory of {}", &month[..3]),
                    month,
                    year,
                    note: "A special fragment of time recorded in the orbit.".to_string(),
                    longitude: id as f64 * 30.0,
                    valence: 0,
                    image_url: None,
                }
            })
            .collect();
        Self { nodes }
    }

    /// Rebuild from persisted nodes; must be exactly ids 0..12
    pub fn from_nodes(mut nodes: Vec<TimelineNode>) -> Option<Self> {
        nodes.sort_by_key(|n| n.id);
        let valid = nodes.len() == MAX_NODES && nodes.iter().enumerate().all(|(i, n)| n.id == i);
        if !valid {
            return None;
        }
        for n in nodes.iter_mut() {
            n.valence = clamp_valence(n.valence as f64);
        }
        Some(Self { nodes })
    }

    pub fn get(&self, id: usize) -> Option<&TimelineNode> {
        self.nodes.get(id)
    }

    pub fn as_slice(&self) -> &[TimelineNode] {
        &self.nodes
    }

    /// Apply an update to one node. Returns false for an unknown id.
    pub fn update(&mut self, id: usize, update: NodeUpdate) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            tracing::warn!(id, "update for unknown node ignored");
            return false;
        };

        if let Some(title) = update.title {
            node.title = title;
        }
        if let Some(note) = update.note {
            node.note = note;
        }
        if let Some(v) = update.valence {
            node.valence = clamp_valence(v);
        }
        if let Some(image) = update.image_url {
            node.image_url = image;
        }
        true
    }
}

/// Evenly space the first `visible` nodes (by id) around the orbit.
///
/// Stored longitudes are ignored. Zero visible nodes gives an empty layout,
/// one node sits at 0 degrees.
pub fn layout(nodes: &[TimelineNode], visible: usize) -> Vec<PlacedMarker<'_>> {
    let mut ordered: Vec<&TimelineNode> = nodes.iter().collect();
    ordered.sort_by_key(|n| n.id);

    let count = visible.min(ordered.len());
    ordered
        .into_iter()
        .take(count)
        .enumerate()
        .map(|(i, node)| PlacedMarker {
            node,
            longitude: i as f64 / count as f64 * 360.0,
        })
        .collect()
}

/// Round and clamp a valence into [-3, 3]
pub fn clamp_valence(v: f64) -> i8 {
    if v.is_finite() {
        v.round().clamp(-3.0, 3.0) as i8
    } else {
        0
    }
}

fn month_name(index: usize) -> String {
    u8::try_from(index + 1)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name().to_string())
        .unwrap_or_else(|| format!("Month {}", index + 1))
}

/// Theme colors for a mood
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub blob: [u8; 3],
    pub accent: [u8; 3],
    pub emissive: f32,
}

/// Seven-step mood scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    VeryUnpleasant = -3,
    Unpleasant = -2,
    SlightlyUnpleasant = -1,
    Neutral = 0,
    SlightlyPleasant = 1,
    Pleasant = 2,
    VeryPleasant = 3,
}

impl Mood {
    pub fn from_valence(v: f64) -> Self {
        match clamp_valence(v) {
            -3 => Mood::VeryUnpleasant,
            -2 => Mood::Unpleasant,
            -1 => Mood::SlightlyUnpleasant,
            0 => Mood::Neutral,
            1 => Mood::SlightlyPleasant,
            2 => Mood::Pleasant,
            _ => Mood::VeryPleasant,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mood::VeryUnpleasant => "Very unpleasant",
            Mood::Unpleasant => "Unpleasant",
            Mood::SlightlyUnpleasant => "Slightly unpleasant",
            Mood::Neutral => "Neither",
            Mood::SlightlyPleasant => "Slightly pleasant",
            Mood::Pleasant => "Pleasant",
            Mood::VeryPleasant => "Very pleasant",
        }
    }

    pub fn theme(&self) -> Theme {
        match self {
            Mood::VeryUnpleasant => Theme { blob: [0x7b, 0x68, 0xee], accent: [0x4a, 0x36, 0xb1], emissive: 0.6 },
            Mood::Unpleasant => Theme { blob: [0x64, 0x95, 0xed], accent: [0x3a, 0x66, 0xb1], emissive: 0.5 },
            Mood::SlightlyUnpleasant => Theme { blob: [0x00, 0xbf, 0xff], accent: [0x00, 0x7b, 0xb0], emissive: 0.45 },
            Mood::Neutral => Theme { blob: [0x20, 0xb2, 0xaa], accent: [0x16, 0x7d, 0x77], emissive: 0.4 },
            Mood::SlightlyPleasant => Theme { blob: [0x32, 0xcd, 0x32], accent: [0x21, 0x8a, 0x21], emissive: 0.45 },
            Mood::Pleasant => Theme { blob: [0xf9, 0xa8, 0x25], accent: [0xc6, 0x7c, 0x00], emissive: 0.5 },
            Mood::VeryPleasant => Theme { blob: [0xff, 0x45, 0x00], accent: [0xb3, 0x30, 0x00], emissive: 0.6 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_pool() {
        let pool = NodePool::new(2024);
        assert_eq!(pool.as_slice().len(), 12);
        let mar = pool.get(2).unwrap();
        assert_eq!(mar.month, "March");
        assert_eq!(mar.title, "Memory of Mar");
        assert_eq!(mar.longitude, 60.0);
        assert_eq!(mar.year, 2024);
        assert!(mar.image_url.is_none());
    }

    #[test]
    fn test_layout_three_evenly_spaced() {
        let mut pool = NodePool::new(2024);
        // stored longitudes must not matter
        for n in pool.nodes.iter_mut() {
            n.longitude = 17.0;
        }
        let placed = layout(pool.as_slice(), 3);
        let ids: Vec<usize> = placed.iter().map(|m| m.node.id).collect();
        let lons: Vec<f64> = placed.iter().map(|m| m.longitude).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(lons, vec![0.0, 120.0, 240.0]);
        // underlying records untouched
        assert_eq!(pool.get(1).unwrap().longitude, 17.0);
    }

    #[test]
    fn test_layout_zero_and_one() {
        let pool = NodePool::new(2024);
        assert!(layout(pool.as_slice(), 0).is_empty());
        let one = layout(pool.as_slice(), 1);
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].longitude, 0.0);
        assert_eq!(layout(pool.as_slice(), 40).len(), 12);
    }

    #[test]
    fn test_layout_orders_by_id() {
        let pool = NodePool::new(2024);
        let mut reversed = pool.as_slice().to_vec();
        reversed.reverse();
        let placed = layout(&reversed, 2);
        assert_eq!(placed[0].node.id, 0);
        assert_eq!(placed[1].node.id, 1);
    }

    #[test]
    fn test_update_node() {
        let mut pool = NodePool::new(2024);
        assert!(pool.update(
            4,
            NodeUpdate {
                title: Some("Kyoto".into()),
                valence: Some(2.6),
                image_url: Some(Some("data:image/jpeg;base64,AAAA".into())),
                ..Default::default()
            }
        ));
        let n = pool.get(4).unwrap();
        assert_eq!(n.title, "Kyoto");
        assert_eq!(n.valence, 3);
        assert_eq!(n.note, "A special fragment of time recorded in the orbit.");
        assert!(n.image_url.is_some());

        pool.update(4, NodeUpdate { image_url: Some(None), ..Default::default() });
        assert!(pool.get(4).unwrap().image_url.is_none());

        assert!(!pool.update(12, NodeUpdate::default()));
    }

    #[test]
    fn test_valence_clamp() {
        assert_eq!(clamp_valence(-9.0), -3);
        assert_eq!(clamp_valence(1.4), 1);
        assert_eq!(clamp_valence(f64::NAN), 0);
    }

    #[test]
    fn test_mood_lookup() {
        assert_eq!(Mood::from_valence(-2.8), Mood::VeryUnpleasant);
        assert_eq!(Mood::from_valence(0.2), Mood::Neutral);
        assert_eq!(Mood::from_valence(10.0), Mood::VeryPleasant);
        assert_eq!(Mood::Pleasant.theme().blob, [0xf9, 0xa8, 0x25]);
        assert_eq!(Mood::Neutral.label(), "Neither");
    }

    #[test]
    fn test_from_nodes_validates() {
        let pool = NodePool::new(2024);
        let mut nodes = pool.as_slice().to_vec();
        nodes.reverse();
        assert_eq!(NodePool::from_nodes(nodes.clone()), Some(pool));
        nodes.pop();
        assert!(NodePool::from_nodes(nodes).is_none());
    }
}
