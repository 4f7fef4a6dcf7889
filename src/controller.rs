//! Journal - Single Source of Truth (SSOT)
//!
//! Owns the visualization parameters, the segment store, the node pool and the
//! derived spiral curve, and implements the interaction contracts on top of them.
//! Everything runs on one logical thread: each event is fully applied before
//! the next one, so there is no locking here.

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::color::Hsl;
use crate::config::Config;
use crate::curve::{build_curve, SpiralCurve};
use crate::imaging::{AcquireError, EncodedImage};
use crate::locator;
use crate::markers::{self, NodePool, NodeUpdate, PlacedMarker, TimelineNode};
use crate::params::{VisualizationParameters, MAX_NODES};
use crate::segments::{brush_radius, SegmentStore};

/// Saturation and lightness of the paint brush
const PAINT_SATURATION: f64 = 100.0;
const PAINT_LIGHTNESS: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Edit,
    View,
}

/// Outcome of a click on the tube
#[derive(Debug, Clone, PartialEq)]
pub enum TubeClick {
    Painted {
        segment: usize,
        radius: f64,
        color: Hsl,
        count: usize,
    },
    Focused,
}

/// Outcome of a click on a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerAction {
    /// EDIT mode: the marker editor opens
    OpenEditor(usize),
    /// VIEW mode with an attached image: the immersive view opens
    OpenPanorama(usize),
    /// VIEW mode without an image: selected, nothing opens
    Selected(usize),
    /// Marker is not visible
    Ignored,
}

/// Result of a bulk image assignment
#[derive(Debug, Default)]
pub struct BulkReport {
    pub assigned: Vec<usize>,
    pub failed: Vec<(usize, AcquireError)>,
    pub dropped: usize,
    pub node_count: usize,
}

pub struct Journal {
    params: VisualizationParameters,
    segments: SegmentStore,
    nodes: NodePool,
    curve: SpiralCurve,
    mode: Mode,
    selected: Option<usize>,
    focused: bool,
    auto_rotate: bool,
    epoch: NaiveDate,
}

impl Journal {
    /// Fresh journal from the configured defaults
    pub fn new(config: &Config) -> Self {
        let params = config.initial.clone().sanitized();
        let segments = SegmentStore::new(config.segment_count, params.period_hues());
        let nodes = NodePool::new(config.node_year);
        Self::from_parts(params, segments, nodes, config.epoch)
    }

    /// Assemble a journal from already-validated parts; the curve is derived here
    pub fn from_parts(
        params: VisualizationParameters,
        segments: SegmentStore,
        nodes: NodePool,
        epoch: NaiveDate,
    ) -> Self {
        let curve = build_curve(params.frequencies(), params.duration());
        info!(
            "Journal ready: {} segments, {} of {} nodes visible, {} curve points",
            segments.len(),
            params.node_count(),
            MAX_NODES,
            curve.len()
        );
        Self {
            params,
            segments,
            nodes,
            curve,
            mode: Mode::Edit,
            selected: None,
            focused: false,
            auto_rotate: false,
            epoch,
        }
    }

    pub fn params(&self) -> &VisualizationParameters {
        &self.params
    }

    pub fn segments(&self) -> &SegmentStore {
        &self.segments
    }

    pub fn nodes(&self) -> &NodePool {
        &self.nodes
    }

    pub fn curve(&self) -> &SpiralCurve {
        &self.curve
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate
    }

    pub fn epoch(&self) -> NaiveDate {
        self.epoch
    }

    /// Visible markers with their evenly spaced longitudes
    pub fn visible_markers(&self) -> Vec<PlacedMarker<'_>> {
        markers::layout(self.nodes.as_slice(), self.params.node_count())
    }

    /// The selected node, if it is visible
    pub fn selected_node(&self) -> Option<&TimelineNode> {
        self.selected
            .filter(|&id| id < self.params.node_count())
            .and_then(|id| self.nodes.get(id))
    }

    /// Range label of one period for the current duration
    pub fn period_label(&self, period: usize) -> String {
        locator::range_label(period, self.params.duration(), self.epoch)
    }

    // ------------------------------------------------------------------
    // Pointer events
    // ------------------------------------------------------------------

    /// Click on the tube at normalized position u
    pub fn click_tube<R: Rng + ?Sized>(&mut self, u: f64, rng: &mut R) -> TubeClick {
        if self.mode == Mode::View {
            debug!("Tube click in VIEW mode -> immersive focus");
            self.focused = true;
            return TubeClick::Focused;
        }

        let segment = locator::locate(u, self.segments.len());
        let color = Hsl::new(rng.gen_range(0..360) as f64, PAINT_SATURATION, PAINT_LIGHTNESS);
        let radius = brush_radius(self.params.segment_brush_size());
        let count = self.segments.paint(segment, radius, color);
        info!("Painted {} segments around {} (u={:.4}) with {}", count, segment, u, color);

        TubeClick::Painted {
            segment,
            radius,
            color,
            count,
        }
    }

    /// Click on a marker: always selects it if visible
    pub fn click_marker(&mut self, id: usize) -> MarkerAction {
        if id >= self.params.node_count() {
            warn!("Click on hidden marker {} ignored", id);
            return MarkerAction::Ignored;
        }
        self.selected = Some(id);
        debug!("Selected marker {}", id);

        match self.mode {
            Mode::Edit => MarkerAction::OpenEditor(id),
            Mode::View if self.selected_node().and_then(|n| n.image_url.as_ref()).is_some() => {
                MarkerAction::OpenPanorama(id)
            }
            Mode::View => MarkerAction::Selected(id),
        }
    }

    /// Close the editor or the immersive view
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    // ------------------------------------------------------------------
    // View state
    // ------------------------------------------------------------------

    pub fn set_mode(&mut self, mode: Mode) {
        if mode == Mode::Edit {
            self.focused = false;
        }
        if mode != self.mode {
            info!("Mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
    }

    /// "Back to Spiral"
    pub fn leave_focus(&mut self) {
        self.focused = false;
    }

    pub fn set_auto_rotate(&mut self, on: bool) {
        self.auto_rotate = on;
    }

    pub fn is_panel_open(&self) -> bool {
        self.mode == Mode::Edit && self.selected.is_some()
    }

    pub fn is_immersive_open(&self) -> bool {
        self.mode == Mode::View
            && self.selected_node().map_or(false, |n| n.image_url.is_some())
    }

    /// Auto-rotation pauses while a panel or the immersive view is open
    pub fn effective_auto_rotate(&self) -> bool {
        self.auto_rotate && !self.is_panel_open() && !self.is_immersive_open()
    }

    // ------------------------------------------------------------------
    // Parameter edits
    // ------------------------------------------------------------------

    pub fn set_node_count(&mut self, count: usize) {
        self.params.set_node_count(count);
        let visible = self.params.node_count();
        if let Some(id) = self.selected {
            if id >= visible {
                debug!("Selected marker {} hidden by node count {}, clearing selection", id, visible);
                self.selected = None;
            }
        }
    }

    pub fn set_brush_size(&mut self, size: f64) {
        self.params.set_segment_brush_size(size);
    }

    pub fn set_show_container(&mut self, show: bool) {
        self.params.set_show_container(show);
    }

    pub fn set_duration(&mut self, years: f64) {
        self.params.set_duration(years);
        self.rebuild_curve();
    }

    pub fn set_frequency(&mut self, period: usize, value: f64) {
        self.params.set_frequency(period, value);
        self.rebuild_curve();
    }

    /// Change one period's hue; only that period's segments are recolored
    pub fn set_period_hue(&mut self, period: usize, hue: f64) {
        self.params.set_period_hue(period, hue);
        if let Some(&h) = self.params.period_hues().get(period) {
            self.segments.resync_period(period, h);
        }
    }

    /// New random frequencies and hues, then a full recolor
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.params.randomize(rng);
        info!(
            "Randomized: frequencies={:?} hues={:?}",
            self.params.frequencies(),
            self.params.period_hues()
        );
        self.segments.resync_all(self.params.period_hues());
        self.rebuild_curve();
    }

    /// Recolor every segment from the current period hues (drops all paint)
    pub fn resync_all(&mut self) {
        self.segments.resync_all(self.params.period_hues());
    }

    fn rebuild_curve(&mut self) {
        self.curve = build_curve(self.params.frequencies(), self.params.duration());
        debug!("Curve rebuilt: {} points, height {:.2}", self.curve.len(), self.curve.height());
    }

    // ------------------------------------------------------------------
    // Nodes and images
    // ------------------------------------------------------------------

    pub fn update_node(&mut self, id: usize, update: NodeUpdate) -> bool {
        self.nodes.update(id, update)
    }

    /// Deliver an acquisition result for one node. The prior image is kept on failure.
    pub fn attach_image(
        &mut self,
        id: usize,
        result: Result<EncodedImage, AcquireError>,
    ) -> Result<(), AcquireError> {
        let image = result.map_err(|e| {
            warn!("Image for node {} not attached: {}", id, e);
            e
        })?;
        let update = NodeUpdate {
            image_url: Some(Some(image.data_url())),
            ..Default::default()
        };
        if self.nodes.update(id, update) {
            info!("Attached {}x{} image to node {}", image.width, image.height, id);
        }
        Ok(())
    }

    /// Assign an ordered batch to consecutive nodes starting at `start`
    /// (the selection, else 0). The visible count grows to cover the whole
    /// batch, capped at 12; failed entries keep their previous image.
    pub fn bulk_attach(
        &mut self,
        start: Option<usize>,
        results: Vec<Result<EncodedImage, AcquireError>>,
    ) -> BulkReport {
        let start = start.or(self.selected).unwrap_or(0);
        let batch_len = results.len();
        let mut report = BulkReport::default();

        for (offset, result) in results.into_iter().enumerate() {
            let id = start + offset;
            if id >= MAX_NODES {
                report.dropped += 1;
                continue;
            }
            match self.attach_image(id, result) {
                Ok(()) => report.assigned.push(id),
                Err(e) => report.failed.push((id, e)),
            }
        }

        let required = (start + batch_len).min(MAX_NODES);
        if batch_len > 0 && required > self.params.node_count() {
            info!("Bulk upload extends node count {} -> {}", self.params.node_count(), required);
            self.params.set_node_count(required);
        }
        report.node_count = self.params.node_count();
        report
    }

    /// Restore view state saved with a session
    pub(crate) fn restore_view(&mut self, mode: Mode, selected: Option<usize>, auto_rotate: bool) {
        self.mode = mode;
        self.selected = selected.filter(|&id| id < self.params.node_count());
        self.auto_rotate = auto_rotate;
    }
}
