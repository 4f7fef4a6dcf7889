//! Native viewer using egui
//!
//! Orbit view of the spiral with per-segment colors and the memory spheres
//! floating above it. Left-click paints (EDIT) or focuses (VIEW), right-drag
//! rotates, arrow keys rotate too.

use eframe::egui;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::color::Hsl;
use crate::config::{Config, ViewerConfig};
use crate::controller::{Journal, MarkerAction, Mode, TubeClick};
use crate::imaging::{self, AcquireError, EncodedImage};
use crate::locator;
use crate::markers::{Mood, NodeUpdate};
use crate::params::{BRUSH_RANGE, BRUSH_STEP, DURATION_RANGE, FREQUENCY_RANGE, MAX_NODES, PERIOD_COUNT};
use crate::render::{self, Projection, RenderFrame};
use crate::session;

/// Hit-test tolerance as a share of the visible plot width
const PICK_TOLERANCE: f64 = 0.012;
const MARKER_PICK_TOLERANCE: f64 = 0.03;

/// Run the native viewer
pub fn run_viewer(
    config: Config,
    journal: Journal,
    session_path: PathBuf,
    runtime: tokio::runtime::Handle,
) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.viewer.width, config.viewer.height])
            .with_title("Memory Spiral"),
        ..Default::default()
    };

    eframe::run_native(
        "Memory Spiral",
        options,
        Box::new(|cc| Ok(Box::new(SpiralApp::new(cc, config, journal, session_path, runtime)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}

/// Finished image loads, delivered back to the UI thread
enum Loaded {
    Single(usize, Result<EncodedImage, AcquireError>),
    Bulk(Option<usize>, Vec<Result<EncodedImage, AcquireError>>),
}

/// Text buffers of the marker editor
#[derive(Default)]
struct EditorBuffers {
    id: Option<usize>,
    title: String,
    note: String,
    valence: i32,
    image_path: String,
    bulk_paths: String,
}

struct SpiralApp {
    journal: Journal,
    viewer: ViewerConfig,
    session_path: PathBuf,
    runtime: tokio::runtime::Handle,
    rng: StdRng,
    // Camera state
    projection: Projection,
    // UI state
    editor: EditorBuffers,
    status: String,
    loads_in_flight: usize,
    tx: Sender<Loaded>,
    rx: Receiver<Loaded>,
    immersive: Option<(usize, egui::TextureHandle)>,
}

impl SpiralApp {
    fn new(
        cc: &eframe::CreationContext<'_>,
        config: Config,
        mut journal: Journal,
        session_path: PathBuf,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        if config.viewer.auto_rotate {
            journal.set_auto_rotate(true);
        }
        let (tx, rx) = mpsc::channel();

        Self {
            journal,
            viewer: config.viewer,
            session_path,
            runtime,
            rng: StdRng::from_entropy(),
            projection: Projection { yaw: 0.0, pitch: 0.35, pan: [0.0, 0.0] },
            editor: EditorBuffers::default(),
            status: String::new(),
            loads_in_flight: 0,
            tx,
            rx,
            immersive: None,
        }
    }

    /// Spawn an image load on the runtime; the result comes back through the channel
    fn request_image(&mut self, ctx: &egui::Context, id: usize, path: PathBuf) {
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        self.loads_in_flight += 1;
        info!("Loading image {:?} for node {}", path, id);
        self.runtime.spawn(async move {
            let result = imaging::acquire_file(path).await;
            if tx.send(Loaded::Single(id, result)).is_err() {
                debug!("Viewer closed before image load finished");
            }
            ctx.request_repaint();
        });
    }

    fn request_bulk(&mut self, ctx: &egui::Context, start: Option<usize>, paths: Vec<PathBuf>) {
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        self.loads_in_flight += 1;
        info!("Bulk loading {} images", paths.len());
        self.runtime.spawn(async move {
            let results = imaging::acquire_files(paths).await;
            if tx.send(Loaded::Bulk(start, results)).is_err() {
                debug!("Viewer closed before bulk load finished");
            }
            ctx.request_repaint();
        });
    }

    fn drain_loads(&mut self) {
        while let Ok(loaded) = self.rx.try_recv() {
            self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
            self.immersive = None;
            match loaded {
                Loaded::Single(id, result) => {
                    self.status = match self.journal.attach_image(id, result) {
                        Ok(()) => format!("Image attached to node {}", id),
                        Err(e) => format!("Node {}: {}", id, e),
                    };
                }
                Loaded::Bulk(start, results) => {
                    let report = self.journal.bulk_attach(start, results);
                    self.status = format!(
                        "{} attached, {} failed, {} dropped; {} nodes visible",
                        report.assigned.len(),
                        report.failed.len(),
                        report.dropped,
                        report.node_count
                    );
                }
            }
        }
    }

    fn save_session(&mut self) {
        self.status = match session::save(&self.session_path, &self.journal) {
            Ok(()) => format!("Saved to {}", self.session_path.display()),
            Err(e) => {
                warn!("Session save failed: {}", e);
                format!("Save failed: {}", e)
            }
        };
    }

    /// Refill the editor buffers when the selection moves to another node
    fn sync_editor(&mut self) {
        let selected = self.journal.selected();
        if self.editor.id == selected {
            return;
        }
        self.editor.id = selected;
        if let Some(node) = self.journal.selected_node() {
            self.editor.title = node.title.clone();
            self.editor.note = node.note.clone();
            self.editor.valence = node.valence as i32;
        }
    }

    fn controls_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Memory Spiral");
        ui.separator();

        let old_brush = self.journal.params().segment_brush_size();
        let mut brush = old_brush;
        ui.add(
            egui::Slider::new(&mut brush, BRUSH_RANGE.0..=BRUSH_RANGE.1)
                .step_by(BRUSH_STEP)
                .text("Brush size"),
        );
        if brush != old_brush {
            self.journal.set_brush_size(brush);
        }

        let old_duration = self.journal.params().duration();
        let mut duration = old_duration;
        ui.add(
            egui::Slider::new(&mut duration, DURATION_RANGE.0..=DURATION_RANGE.1)
                .step_by(0.1)
                .text("Years"),
        );
        if duration != old_duration {
            self.journal.set_duration(duration);
        }

        let old_nodes = self.journal.params().node_count();
        let mut nodes = old_nodes;
        ui.add(egui::Slider::new(&mut nodes, 1..=MAX_NODES).text("Memories"));
        if nodes != old_nodes {
            self.journal.set_node_count(nodes);
        }

        let mut show_container = self.journal.params().show_container();
        if ui.checkbox(&mut show_container, "Container").changed() {
            self.journal.set_show_container(show_container);
        }

        ui.separator();
        egui::ScrollArea::vertical().show(ui, |ui| {
            for period in 0..PERIOD_COUNT {
                let hue = self.journal.params().period_hues()[period];
                let [r, g, b] = Hsl::new(hue, 70.0, 55.0).to_rgb();
                ui.horizontal(|ui| {
                    ui.colored_label(egui::Color32::from_rgb(r, g, b), "●");
                    ui.label(self.journal.period_label(period));
                });

                let old_freq = self.journal.params().frequencies()[period];
                let mut freq = old_freq;
                ui.add(
                    egui::Slider::new(&mut freq, FREQUENCY_RANGE.0..=FREQUENCY_RANGE.1)
                        .step_by(1.0)
                        .text("Frequency"),
                );
                if freq != old_freq {
                    self.journal.set_frequency(period, freq);
                }

                let mut new_hue = hue;
                ui.add(egui::Slider::new(&mut new_hue, 0.0..=360.0).step_by(1.0).text("Hue"));
                if new_hue != hue {
                    self.journal.set_period_hue(period, new_hue);
                }
                ui.add_space(4.0);
            }

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Random").clicked() {
                    self.journal.randomize(&mut self.rng);
                }
                if ui.button("Resync colors").clicked() {
                    self.journal.resync_all();
                }
                if ui.button("Save").clicked() {
                    self.save_session();
                }
            });
        });
    }

    fn bottom_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let mut mode = self.journal.mode();
            ui.selectable_value(&mut mode, Mode::Edit, "EDIT");
            ui.selectable_value(&mut mode, Mode::View, "VIEW");
            if mode != self.journal.mode() {
                self.journal.set_mode(mode);
            }

            let mut auto_rotate = self.journal.auto_rotate();
            if ui.checkbox(&mut auto_rotate, "Auto-rotate").changed() {
                self.journal.set_auto_rotate(auto_rotate);
            }

            if self.journal.is_focused() && ui.button("Back to Spiral").clicked() {
                self.journal.leave_focus();
            }

            ui.separator();
            let ticks = locator::timeline_ticks(self.journal.params().duration(), self.journal.epoch());
            ui.label(ticks.join(" | "));

            if self.loads_in_flight > 0 {
                ui.separator();
                ui.spinner();
            }
            if !self.status.is_empty() {
                ui.separator();
                ui.label(&self.status);
            }
        });
    }

    fn editor_panel(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let Some(id) = self.journal.selected() else {
            return;
        };
        let Some(node) = self.journal.selected_node() else {
            return;
        };
        ui.heading(format!("{} {}", node.month, node.year));
        let has_image = node.image_url.is_some();
        ui.separator();

        ui.label("Title");
        ui.text_edit_singleline(&mut self.editor.title);
        ui.label("Note");
        ui.text_edit_multiline(&mut self.editor.note);

        let mood = Mood::from_valence(self.editor.valence as f64);
        let [r, g, b] = mood.theme().accent;
        ui.add(egui::Slider::new(&mut self.editor.valence, -3..=3).text("Mood"));
        ui.colored_label(egui::Color32::from_rgb(r, g, b), mood.label());

        ui.horizontal(|ui| {
            if ui.button("Apply").clicked() {
                self.journal.update_node(
                    id,
                    NodeUpdate {
                        title: Some(self.editor.title.clone()),
                        note: Some(self.editor.note.clone()),
                        valence: Some(self.editor.valence as f64),
                        image_url: None,
                    },
                );
                self.status = format!("Node {} updated", id);
            }
            if ui.button("Close").clicked() {
                self.journal.clear_selection();
            }
        });

        ui.separator();
        ui.label(if has_image { "Image attached" } else { "No image" });
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.editor.image_path);
            if ui.button("Load").clicked() && !self.editor.image_path.trim().is_empty() {
                let path = PathBuf::from(self.editor.image_path.trim());
                self.request_image(ctx, id, path);
            }
        });
        if has_image && ui.button("Remove image").clicked() {
            self.journal.update_node(id, NodeUpdate { image_url: Some(None), ..Default::default() });
            self.immersive = None;
        }

        ui.separator();
        ui.label("Bulk load (paths separated by ';')");
        ui.text_edit_singleline(&mut self.editor.bulk_paths);
        if ui.button("Load batch").clicked() {
            let paths: Vec<PathBuf> = self
                .editor
                .bulk_paths
                .split(';')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect();
            if !paths.is_empty() {
                self.request_bulk(ctx, Some(id), paths);
            }
        }
    }

    fn immersive_window(&mut self, ctx: &egui::Context) {
        let Some(node) = self.journal.selected_node() else {
            return;
        };
        let id = node.id;
        let title = node.title.clone();
        let note = node.note.clone();
        let mood = Mood::from_valence(node.valence as f64);

        if self.immersive.as_ref().map(|(cached, _)| *cached) != Some(id) {
            self.immersive = node
                .image_url
                .as_deref()
                .and_then(|url| load_texture(ctx, url))
                .map(|tex| (id, tex));
        }

        let mut open = true;
        egui::Window::new(title)
            .open(&mut open)
            .resizable(true)
            .default_size([720.0, 480.0])
            .show(ctx, |ui| {
                if let Some((_, tex)) = &self.immersive {
                    let size = tex.size_vec2();
                    let scale = (ui.available_width() / size.x).min(1.0);
                    ui.add(egui::Image::new((tex.id(), size * scale)));
                } else {
                    ui.label("Image could not be decoded");
                }
                ui.label(note);
                let [r, g, b] = mood.theme().accent;
                ui.colored_label(egui::Color32::from_rgb(r, g, b), mood.label());
            });

        if !open {
            self.journal.clear_selection();
            self.immersive = None;
        }
    }

    fn spiral_view(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let hint = match self.journal.mode() {
                Mode::Edit => "Click: paint | Click sphere: edit",
                Mode::View => "Click: focus | Click sphere: open",
            };
            ui.label(format!("{} | Right-drag / arrows: rotate", hint));
        });

        ctx.input(|i| {
            if i.key_down(egui::Key::ArrowLeft) { self.projection.yaw -= 0.03; }
            if i.key_down(egui::Key::ArrowRight) { self.projection.yaw += 0.03; }
            if i.key_down(egui::Key::ArrowUp) { self.projection.pitch -= 0.03; }
            if i.key_down(egui::Key::ArrowDown) { self.projection.pitch += 0.03; }
            if i.pointer.secondary_down() {
                let delta = i.pointer.delta();
                self.projection.yaw += delta.x as f64 * 0.005;
                self.projection.pitch += delta.y as f64 * 0.005;
            }
        });
        self.projection.pitch = self.projection.pitch.clamp(-1.5, 1.5);

        let frame = RenderFrame::from_journal(&self.journal, self.viewer.smoothing);
        let projected = self.projection.project_all(&frame.points);
        let marker_points: Vec<(usize, [f64; 3])> = frame
            .markers
            .iter()
            .map(|m| (m.id, self.projection.project(m.position)))
            .collect();

        let view_range = if frame.focus {
            frame.radius * 1.5
        } else {
            frame.height / 2.0 + render::MARKER_LIFT + 1.0
        };

        let plot = egui_plot::Plot::new("spiral_plot")
            .data_aspect(1.0)
            .allow_drag(false)
            .allow_zoom(true)
            .allow_scroll(true)
            .show_axes(false)
            .show_grid(false)
            .include_x(-view_range)
            .include_x(view_range)
            .include_y(-view_range)
            .include_y(view_range);

        let selected = self.journal.selected();
        let point_size = self.viewer.point_size;
        let response = plot.show(ui, |plot_ui| {
            if frame.show_container {
                for y in [-frame.container.height / 2.0, frame.container.height / 2.0] {
                    let ring: Vec<[f64; 2]> = (0..=64)
                        .map(|k| {
                            let a = k as f64 / 64.0 * std::f64::consts::TAU;
                            let p = self.projection.project([
                                frame.container.radius * a.cos(),
                                y,
                                frame.container.radius * a.sin(),
                            ]);
                            [p[0], p[1]]
                        })
                        .collect();
                    plot_ui.line(
                        egui_plot::Line::new(egui_plot::PlotPoints::from(ring))
                            .color(egui::Color32::from_white_alpha(40))
                            .width(1.0),
                    );
                }
            }

            // One line per run of points that share a segment
            let mut start = 0;
            while start + 1 < projected.len() {
                let color = frame.point_color(start);
                let mut end = start + 1;
                while end + 1 < projected.len() && frame.point_color(end) == color {
                    end += 1;
                }
                let run: Vec<[f64; 2]> = projected[start..=end].iter().map(|p| [p[0], p[1]]).collect();
                plot_ui.line(
                    egui_plot::Line::new(egui_plot::PlotPoints::from(run))
                        .color(egui::Color32::from_rgb(color[0], color[1], color[2]))
                        .width(point_size),
                );
                start = end;
            }

            for (marker, (_, p)) in frame.markers.iter().zip(&marker_points) {
                let is_selected = selected == Some(marker.id);
                let [r, g, b] = marker.color;
                plot_ui.points(
                    egui_plot::Points::new(vec![[p[0], p[1]]])
                        .radius(if is_selected { point_size * 4.0 } else { point_size * 2.5 })
                        .color(egui::Color32::from_rgb(r, g, b))
                        .name(&marker.title),
                );
            }

            (plot_ui.pointer_coordinate(), plot_ui.plot_bounds().width())
        });

        let (pointer, width) = response.inner;
        if !response.response.clicked() {
            return;
        }
        let Some(pointer) = pointer else {
            return;
        };
        let pointer = [pointer.x, pointer.y];

        if let Some(id) = render::pick_marker(&marker_points, pointer, width * MARKER_PICK_TOLERANCE) {
            match self.journal.click_marker(id) {
                MarkerAction::OpenEditor(_) | MarkerAction::OpenPanorama(_) => self.immersive = None,
                MarkerAction::Selected(_) => self.status = format!("Node {} has no image yet", id),
                MarkerAction::Ignored => {}
            }
            return;
        }

        if let Some(u) = render::pick_curve(&projected, &frame.arc, pointer, width * PICK_TOLERANCE) {
            if let TubeClick::Painted { segment, count, .. } = self.journal.click_tube(u, &mut self.rng) {
                self.status = format!("Painted {} segments around {}", count, segment);
            }
        }
    }
}

/// Decode a marker's data URL into a texture
fn load_texture(ctx: &egui::Context, url: &str) -> Option<egui::TextureHandle> {
    let bytes = imaging::decode_data_url(url)?;
    let img = match image::load_from_memory(&bytes) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            warn!("Stored image could not be decoded: {}", e);
            return None;
        }
    };
    let size = [img.width() as usize, img.height() as usize];
    let color = egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw());
    Some(ctx.load_texture("immersive", color, egui::TextureOptions::LINEAR))
}

impl eframe::App for SpiralApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_loads();
        self.sync_editor();

        if self.journal.effective_auto_rotate() {
            let dt = ctx.input(|i| i.stable_dt) as f64;
            self.projection.yaw += self.viewer.rotate_speed.to_radians() * dt;
            ctx.request_repaint();
        }

        egui::SidePanel::left("controls_panel").min_width(260.0).show(ctx, |ui| {
            self.controls_panel(ui);
        });

        egui::TopBottomPanel::bottom("mode_bar").show(ctx, |ui| {
            self.bottom_bar(ui);
        });

        if self.journal.is_panel_open() {
            egui::SidePanel::right("editor_panel").min_width(280.0).show(ctx, |ui| {
                self.editor_panel(ctx, ui);
            });
        }

        if self.journal.is_immersive_open() {
            self.immersive_window(ctx);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.spiral_view(ctx, ui);
        });
    }
}
