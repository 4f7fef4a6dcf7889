//! Render collaborator - what a renderer needs to draw and hit-test a journal
//!
//! The renderer owns the camera; this module only does the math that maps
//! between 3D scene space and the 2D plot the viewer draws into.

use serde::Serialize;

use crate::controller::Journal;
use crate::locator;

/// Radius of the orbit the memory spheres travel on
pub const MARKER_ORBIT_RADIUS: f64 = 3.0;

/// Height of the marker orbit above the top of the spiral
pub const MARKER_LIFT: f64 = 3.8;

/// Frosted container padding around the spiral
const CONTAINER_EXTRA_HEIGHT: f64 = 1.2;
const CONTAINER_EXTRA_RADIUS: f64 = 1.0;

/// One visible marker as drawn
#[derive(Debug, Clone, Serialize)]
pub struct MarkerFrame {
    pub id: usize,
    pub title: String,
    pub longitude: f64,
    pub valence: i8,
    pub has_image: bool,
    pub position: [f64; 3],
    pub color: [u8; 3],
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Container {
    pub height: f64,
    pub radius: f64,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, Serialize)]
pub struct RenderFrame {
    pub generated: String,
    pub points: Vec<[f64; 3]>,
    /// Normalized arc length of each point
    pub arc: Vec<f64>,
    pub segment_colors: Vec<[u8; 3]>,
    pub markers: Vec<MarkerFrame>,
    pub focus: bool,
    pub auto_rotate: bool,
    pub show_container: bool,
    pub container: Container,
    pub marker_radius: f64,
    pub height: f64,
    pub radius: f64,
}

impl RenderFrame {
    /// Snapshot the journal for drawing, smoothing the curve by `subdivisions`
    pub fn from_journal(journal: &Journal, subdivisions: usize) -> Self {
        let curve = journal.curve().smooth(subdivisions);
        let arc = curve.arc_fractions();
        let height = curve.height();
        let radius = curve.radius();

        let markers = journal
            .visible_markers()
            .into_iter()
            .map(|m| MarkerFrame {
                id: m.node.id,
                title: m.node.title.clone(),
                longitude: m.longitude,
                valence: m.node.valence,
                has_image: m.node.image_url.is_some(),
                position: marker_position(m.longitude, height),
                color: crate::markers::Mood::from_valence(m.node.valence as f64).theme().blob,
            })
            .collect();

        Self {
            generated: chrono::Utc::now().to_rfc3339(),
            points: curve.points().to_vec(),
            arc,
            segment_colors: journal.segments().iter().map(|s| s.color.to_rgb()).collect(),
            markers,
            focus: journal.is_focused(),
            auto_rotate: journal.effective_auto_rotate(),
            show_container: journal.params().show_container(),
            container: Container {
                height: height + CONTAINER_EXTRA_HEIGHT,
                radius: radius + CONTAINER_EXTRA_RADIUS,
            },
            marker_radius: MARKER_ORBIT_RADIUS,
            height,
            radius,
        }
    }

    /// Color of the segment under point `index`
    pub fn point_color(&self, index: usize) -> [u8; 3] {
        let u = self.arc.get(index).copied().unwrap_or(0.0);
        let segment = locator::locate(u, self.segment_colors.len());
        self.segment_colors.get(segment).copied().unwrap_or([255, 255, 255])
    }
}

/// Scene position of a marker at `longitude` degrees
pub fn marker_position(longitude: f64, spiral_height: f64) -> [f64; 3] {
    let theta = longitude.to_radians();
    [
        MARKER_ORBIT_RADIUS * theta.cos(),
        spiral_height / 2.0 + MARKER_LIFT,
        MARKER_ORBIT_RADIUS * theta.sin(),
    ]
}

/// Orbit camera: yaw about Y, then pitch about X, then pan in screen space
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Projection {
    pub yaw: f64,
    pub pitch: f64,
    pub pan: [f64; 2],
}

impl Projection {
    /// Project to `[x, y, depth]`; larger depth is closer to the viewer
    pub fn project(&self, p: [f64; 3]) -> [f64; 3] {
        let (sin_y, cos_y) = self.yaw.sin_cos();
        let (sin_x, cos_x) = self.pitch.sin_cos();

        // Yaw
        let x1 = p[0] * cos_y + p[2] * sin_y;
        let z1 = -p[0] * sin_y + p[2] * cos_y;

        // Pitch
        let y1 = p[1] * cos_x - z1 * sin_x;
        let z2 = p[1] * sin_x + z1 * cos_x;

        [x1 + self.pan[0], y1 + self.pan[1], z2]
    }

    pub fn project_all(&self, points: &[[f64; 3]]) -> Vec<[f64; 3]> {
        points.iter().map(|&p| self.project(p)).collect()
    }
}

/// Hit-test a projected polyline. Among edges within `tolerance` of the
/// pointer the front-most wins; the returned u is interpolated between the
/// edge's arc fractions.
pub fn pick_curve(projected: &[[f64; 3]], arc: &[f64], pointer: [f64; 2], tolerance: f64) -> Option<f64> {
    let n = projected.len().min(arc.len());
    let mut best: Option<(f64, f64)> = None; // (depth, u)

    for i in 0..n.saturating_sub(1) {
        let (a, b) = (projected[i], projected[i + 1]);
        let (dist, t) = point_to_edge(pointer, [a[0], a[1]], [b[0], b[1]]);
        if dist > tolerance {
            continue;
        }
        let depth = a[2] + (b[2] - a[2]) * t;
        let u = arc[i] + (arc[i + 1] - arc[i]) * t;
        if best.map_or(true, |(d, _)| depth > d) {
            best = Some((depth, u));
        }
    }

    best.map(|(_, u)| u)
}

/// Hit-test projected markers; nearest within tolerance wins, front-most on ties
pub fn pick_marker(markers: &[(usize, [f64; 3])], pointer: [f64; 2], tolerance: f64) -> Option<usize> {
    markers
        .iter()
        .filter_map(|&(id, p)| {
            let d = ((p[0] - pointer[0]).powi(2) + (p[1] - pointer[1]).powi(2)).sqrt();
            (d <= tolerance).then_some((id, d, p[2]))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then(b.2.total_cmp(&a.2)))
        .map(|(id, _, _)| id)
}

/// Distance from p to edge ab, and the clamped parameter of the closest point
fn point_to_edge(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> (f64, f64) {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a[0] + dx * t, a[1] + dy * t);
    (((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt(), t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identity_projection() {
        let p = Projection::default().project([1.0, 2.0, 3.0]);
        assert_eq!(p, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_yaw_quarter_turn() {
        let proj = Projection { yaw: FRAC_PI_2, ..Default::default() };
        let p = proj.project([1.0, 0.0, 0.0]);
        assert!(p[0].abs() < 1e-12);
        assert!((p[2] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pan() {
        let proj = Projection { pan: [0.5, -1.0], ..Default::default() };
        assert_eq!(proj.project([0.0, 0.0, 0.0]), [0.5, -1.0, 0.0]);
    }

    #[test]
    fn test_pick_curve_interpolates_u() {
        let projected = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        let arc = [0.0, 0.5, 1.0];
        let u = pick_curve(&projected, &arc, [1.5, 0.05], 0.1).unwrap();
        assert!((u - 0.75).abs() < 1e-12);
        assert!(pick_curve(&projected, &arc, [1.5, 0.5], 0.1).is_none());
    }

    #[test]
    fn test_pick_curve_prefers_front() {
        // back strand first, front strand second, both under the pointer
        let projected = [
            [-1.0, 0.0, -2.0],
            [1.0, 0.0, -2.0],
            [1.0, 0.0, 2.0],
            [-1.0, 0.0, 2.0],
        ];
        let arc = [0.0, 0.2, 0.4, 1.0];
        let u = pick_curve(&projected, &arc, [0.0, 0.0], 0.05).unwrap();
        assert!((u - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_pick_marker() {
        let markers = [(0, [0.0, 5.0, 0.0]), (1, [0.2, 5.0, 1.0]), (2, [0.2, 5.0, -1.0])];
        assert_eq!(pick_marker(&markers, [0.0, 5.0], 0.3), Some(0));
        assert_eq!(pick_marker(&markers, [0.2, 5.0], 0.3), Some(1));
        assert_eq!(pick_marker(&markers, [4.0, 5.0], 0.3), None);
    }

    #[test]
    fn test_marker_position() {
        let p = marker_position(90.0, 11.0);
        assert!(p[0].abs() < 1e-12);
        assert!((p[1] - 9.3).abs() < 1e-12);
        assert!((p[2] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_frame_from_journal() {
        let journal = Journal::new(&Config::default());
        let frame = RenderFrame::from_journal(&journal, 1);
        assert_eq!(frame.points.len(), 1501);
        assert_eq!(frame.arc.len(), 1501);
        assert_eq!(frame.segment_colors.len(), 400);
        assert_eq!(frame.markers.len(), 12);
        assert!((frame.container.height - 12.2).abs() < 1e-12);
        assert!((frame.container.radius - 3.4).abs() < 1e-12);
        assert_eq!(frame.point_color(0), frame.segment_colors[0]);
        assert_eq!(frame.point_color(1500), frame.segment_colors[399]);
        assert!(!frame.focus);

        let json = serde_json::to_value(&frame).unwrap();
        assert!(json["generated"].is_string());
    }
}
