//! Session persistence - JSON snapshot of a journal
//!
//! Only the mutable state is written. The curve is rebuilt on load, and every
//! parameter goes through the setters again.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::controller::{Journal, Mode};
use crate::markers::{NodePool, TimelineNode};
use crate::params::VisualizationParameters;
use crate::segments::{Segment, SegmentStore};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed session: {0}")]
    Format(#[from] serde_json::Error),
    #[error("Session has {found} segments, expected {expected}")]
    SegmentCount { expected: usize, found: usize },
    #[error("Session segments are not numbered 0..n")]
    SegmentOrder,
    #[error("Session must hold exactly 12 nodes numbered 0..12")]
    Nodes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub params: VisualizationParameters,
    pub segments: Vec<Segment>,
    pub nodes: Vec<TimelineNode>,
    pub mode: Mode,
    pub selected: Option<usize>,
    #[serde(default)]
    pub auto_rotate: bool,
}

impl Snapshot {
    pub fn capture(journal: &Journal) -> Self {
        Self {
            params: journal.params().clone(),
            segments: journal.segments().as_slice().to_vec(),
            nodes: journal.nodes().as_slice().to_vec(),
            mode: journal.mode(),
            selected: journal.selected(),
            auto_rotate: journal.auto_rotate(),
        }
    }

    /// Validate against the configuration and rebuild a journal
    pub fn restore(self, config: &Config) -> Result<Journal, SessionError> {
        if self.segments.len() != config.segment_count {
            return Err(SessionError::SegmentCount {
                expected: config.segment_count,
                found: self.segments.len(),
            });
        }
        let segments = SegmentStore::from_segments(self.segments).ok_or(SessionError::SegmentOrder)?;
        let nodes = NodePool::from_nodes(self.nodes).ok_or(SessionError::Nodes)?;

        let mut journal = Journal::from_parts(self.params.sanitized(), segments, nodes, config.epoch);
        journal.restore_view(self.mode, self.selected, self.auto_rotate);
        Ok(journal)
    }
}

pub fn save<P: AsRef<Path>>(path: P, journal: &Journal) -> Result<(), SessionError> {
    let json = serde_json::to_string_pretty(&Snapshot::capture(journal))?;
    std::fs::write(path.as_ref(), json)?;
    info!("Saved session to {:?}", path.as_ref());
    Ok(())
}

pub fn load<P: AsRef<Path>>(path: P, config: &Config) -> Result<Journal, SessionError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let snapshot: Snapshot = serde_json::from_str(&content)?;
    info!("Loaded session from {:?}", path.as_ref());
    snapshot.restore(config)
}

/// Load the session if the file exists, otherwise start fresh
pub fn load_or_new<P: AsRef<Path>>(path: P, config: &Config) -> Result<Journal, SessionError> {
    if path.as_ref().exists() {
        load(path, config)
    } else {
        info!("No session at {:?}, starting a new journal", path.as_ref());
        Ok(Journal::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::NodeUpdate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("memory_spiral_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_save_load_keeps_paint_and_nodes() {
        let config = Config::default();
        let mut journal = Journal::new(&config);
        let mut rng = StdRng::seed_from_u64(9);
        journal.click_tube(0.5, &mut rng);
        journal.set_frequency(0, 7.0);
        journal.update_node(3, NodeUpdate { title: Some("Lisbon".into()), ..Default::default() });
        journal.set_mode(Mode::View);
        journal.click_marker(3);

        let path = temp_path("roundtrip");
        save(&path, &journal).unwrap();
        let restored = load(&path, &config).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(restored.segments(), journal.segments());
        assert_eq!(restored.params(), journal.params());
        assert_eq!(restored.nodes().get(3).unwrap().title, "Lisbon");
        assert_eq!(restored.mode(), Mode::View);
        assert_eq!(restored.selected(), Some(3));
        assert_eq!(restored.curve(), journal.curve());
    }

    #[test]
    fn test_segment_colors_exact_through_json() {
        let journal = Journal::new(&Config::default());
        let json = serde_json::to_string_pretty(&Snapshot::capture(&journal)).unwrap();
        let snapshot: Snapshot = serde_json::from_str(&json).unwrap();

        let mismatched: Vec<usize> = snapshot
            .segments
            .iter()
            .zip(journal.segments().iter())
            .filter(|(loaded, saved)| loaded.color != saved.color)
            .map(|(loaded, _)| loaded.id)
            .collect();
        assert!(mismatched.is_empty(), "colors changed for segments {:?}", mismatched);
    }

    #[test]
    fn test_segment_count_mismatch() {
        let journal = Journal::new(&Config::default());
        let snapshot = Snapshot::capture(&journal);
        let config = Config { segment_count: 200, ..Config::default() };
        match snapshot.restore(&config) {
            Err(SessionError::SegmentCount { expected, found }) => {
                assert_eq!((expected, found), (200, 400));
            }
            other => panic!("expected segment count error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_out_of_range_params_are_clamped() {
        let journal = Journal::new(&Config::default());
        let mut json = serde_json::to_value(Snapshot::capture(&journal)).unwrap();
        json["params"]["duration"] = serde_json::json!(99.0);
        json["params"]["nodeCount"] = serde_json::json!(40);
        json["selected"] = serde_json::json!(11);

        let snapshot: Snapshot = serde_json::from_value(json).unwrap();
        let restored = snapshot.restore(&Config::default()).unwrap();
        assert_eq!(restored.params().duration(), 10.0);
        assert_eq!(restored.params().node_count(), 12);
        assert_eq!(restored.selected(), Some(11));
    }

    #[test]
    fn test_missing_file_starts_fresh() {
        let journal = load_or_new(temp_path("missing"), &Config::default()).unwrap();
        assert_eq!(journal.segments().len(), 400);
    }

    #[test]
    fn test_garbage_is_format_error() {
        let path = temp_path("garbage");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load(&path, &Config::default()).err().unwrap();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, SessionError::Format(_)));
    }
}
