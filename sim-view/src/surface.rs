//! Interactive control surface for the circle-growth engine, built with eframe/egui.
//!
//! This module defines [`ControlSurface`], which owns the form state, the
//! current configuration snapshot and the [`Scheduler`] driving the engine,
//! and implements [`eframe::App`] to render all of it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use circles_core::{
    config::{ControlId, Snapshot, read_params},
    export::{Download, export},
    scheduler::{ActionControl, Confirmation, LiveEdit, Scheduler, TickOutcome},
    sketch::{CANVAS_SIZE, SketchEngine},
    timer::FrameClock,
};
use eframe::App;
use glam::Vec3;
use tracing::{error, info};

use crate::form::FormState;
use crate::settings::PanelSettings;

/// A blocking question or message waiting for the user.
#[derive(Clone, Debug, PartialEq)]
enum Prompt {
    Alert(String),
    ConfirmClear,
}

/// Main application state for the control surface.
///
/// The typical per-frame update is:
/// 1. Handle form edits; every edit refreshes `snapshot`.
/// 2. Advance the scheduler's frame clock, which ticks the engine when due.
/// 3. Render the canvas and any pending prompt.
///
/// ### Fields
/// - `scheduler` - Run state machine owning the engine and its frame clock.
/// - `form` - Raw values of the form controls.
/// - `snapshot` - Configuration read from `form` after the latest edit.
///
/// - `export_dir` - Where exported CSV files go.
/// - `popover_open` - Whether the auxiliary parameter window is shown.
/// - `prompt` - Modal waiting for an answer, if any.
/// - `status` - Last message shown in the status bar.
pub struct ControlSurface {
    scheduler: Scheduler<SketchEngine, FrameClock>,
    form: FormState,
    snapshot: Snapshot,

    export_dir: PathBuf,
    popover_open: bool,
    prompt: Option<Prompt>,
    status: String,
}

impl ControlSurface {
    /// Creates an idle surface with the form filled from `settings`.
    pub fn new(settings: PanelSettings) -> Self {
        let form = FormState::from_snapshot(&settings.form);
        let snapshot = read_params(&form);

        Self {
            scheduler: Scheduler::new(SketchEngine::new(), FrameClock::new()),
            form,
            snapshot,
            export_dir: settings.export_dir,
            popover_open: false,
            prompt: None,
            status: String::new(),
        }
    }

    /// Re-reads every control into a fresh snapshot.
    fn refresh_snapshot(&mut self) {
        self.snapshot = read_params(&self.form);
    }

    fn on_speed_edit(&mut self) {
        self.snapshot = self.snapshot.with_speed(&self.form.speed);
        self.forward_live_edit(LiveEdit::Speed(self.snapshot.speed));
    }

    fn on_duration_edit(&mut self) {
        self.snapshot = self.snapshot.with_duration_minutes(&self.form.duration_minutes);
        self.forward_live_edit(LiveEdit::DurationMinutes(self.snapshot.duration_minutes));
    }

    fn forward_live_edit(&mut self, edit: LiveEdit) {
        if let Err(e) = self.scheduler.apply_live_edit(edit) {
            error!("live edit failed: {e}");
            self.status = e.to_string();
        }
    }

    /// Starts a run at host time `now` (seconds), so the first sample
    /// lands one period after the click.
    fn start(&mut self, now: f64) {
        self.scheduler.advance(now);
        match self.scheduler.start(&self.snapshot) {
            Ok(_) => self.status.clear(),
            Err(e) => self.prompt = Some(Prompt::Alert(e.to_string())),
        }
    }

    fn stop(&mut self) {
        self.scheduler.stop();
    }

    fn resolve_clear(&mut self, confirmation: Confirmation) {
        self.prompt = None;
        if self.scheduler.clear(confirmation) {
            self.status = "cleared".to_string();
        }
    }

    fn download(&self) -> Download {
        export(self.scheduler.engine(), &self.snapshot)
    }

    /// Writes the current series to `dir` and returns the file path.
    fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        let download = self.download();
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        let path = dir.join(&download.file_name);
        std::fs::write(&path, download.body).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    fn export_file(&mut self) {
        match self.export_to(&self.export_dir) {
            Ok(path) => {
                info!("exported to {}", path.display());
                self.status = format!("exported to {}", path.display());
            }
            Err(e) => {
                error!("export failed: {e:#}");
                self.status = format!("export failed: {e:#}");
            }
        }
    }

    /// Maps a canvas position (mm) into the square fitted inside `rect`.
    fn canvas_to_screen(&self, p: Vec3, rect: egui::Rect) -> egui::Pos2 {
        let scale = Self::canvas_scale(rect);
        let half = CANVAS_SIZE * 0.5;
        let center = rect.center();
        egui::pos2(
            center.x + (p.x - half) * scale,
            center.y + (p.y - half) * scale,
        )
    }

    /// Inverse of [`ControlSurface::canvas_to_screen`] (depth is lost).
    fn screen_to_canvas(&self, p: egui::Pos2, rect: egui::Rect) -> Vec3 {
        let scale = Self::canvas_scale(rect);
        let half = CANVAS_SIZE * 0.5;
        let center = rect.center();
        Vec3::new(
            (p.x - center.x) / scale + half,
            (p.y - center.y) / scale + half,
            0.0,
        )
    }

    fn canvas_scale(rect: egui::Rect) -> f32 {
        rect.width().min(rect.height()) / CANVAS_SIZE
    }

    /// Helper to draw a labeled text control; returns `true` when edited.
    fn labeled_text(ui: &mut egui::Ui, label: &str, value: &mut String) -> bool {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::TextEdit::singleline(value).desired_width(80.0))
                .changed()
        })
        .inner
    }

    /// Builds the top panel UI (start/stop, clear, export, auxiliary window toggle).
    fn ui_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let control = self.scheduler.visible_control();
                if ui.button(control.label()).clicked() {
                    match control {
                        ActionControl::Start => self.start(ui.input(|i| i.time)),
                        ActionControl::Stop => self.stop(),
                    }
                }

                if ui.button("Clear").clicked() {
                    self.prompt = Some(Prompt::ConfirmClear);
                }

                ui.separator();
                if ui.button("Export CSV").clicked() {
                    self.export_file();
                }
                if ui.button("Copy data URI").clicked() {
                    ctx.copy_text(self.download().data_uri());
                    self.status = "data URI copied".to_string();
                }

                ui.separator();
                if ui.selectable_label(self.popover_open, "More…").clicked() {
                    self.popover_open = !self.popover_open;
                    self.refresh_snapshot();
                }
            });
        });
    }

    /// Builds the bottom status bar (run state, simulated time, circle count).
    fn ui_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let engine = self.scheduler.engine();
                ui.label(if self.scheduler.is_running() {
                    "running"
                } else {
                    "idle"
                });
                ui.label(format!("t = {:.1} s", engine.elapsed()));
                ui.separator();
                ui.label(format!("circles = {}", engine.circles().len()));
                ui.label(format!("active = {}", engine.active_count()));
                ui.separator();
                ui.label(self.status.as_str());
            });
        });
    }

    /// Builds the right-hand form with the main parameters.
    fn ui_form_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("form_panel")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.heading("Parameters");

                let mut edited = false;

                ui.separator();
                ui.label("Recorded series");
                edited |= ui.checkbox(&mut self.form.track_size, "Size S(t)").changed();
                edited |= ui
                    .checkbox(&mut self.form.track_active_count, "Active N(t)")
                    .changed();
                edited |= ui
                    .checkbox(&mut self.form.track_lifetime, "Lifetime T(t)")
                    .changed();

                ui.separator();
                ui.label("Run");
                edited |= Self::labeled_text(
                    ui,
                    "iterations / s:",
                    &mut self.form.iterations_per_second,
                );
                edited |= Self::labeled_text(ui, "frequency [Hz]:", &mut self.form.frequency);
                edited |= Self::labeled_text(ui, "dimensions:", &mut self.form.dimensionality);
                edited |= ui.checkbox(&mut self.form.bounded, "Bounded domain").changed();
                edited |= ui
                    .checkbox(&mut self.form.wait_until_end, "Wait until the end")
                    .changed();

                ui.separator();
                ui.label("Live");
                if Self::labeled_text(ui, "speed:", &mut self.form.speed) {
                    self.on_speed_edit();
                }
                if Self::labeled_text(ui, "time [min]:", &mut self.form.duration_minutes) {
                    self.on_duration_edit();
                }

                if edited {
                    self.refresh_snapshot();
                }
            });
    }

    /// Builds the auxiliary parameter window opened by "More…".
    fn ui_popover(&mut self, ctx: &egui::Context) {
        if !self.popover_open {
            return;
        }

        let mut open = true;
        let mut edited = false;
        egui::Window::new("More parameters")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                for id in [
                    ControlId::Hungry,
                    ControlId::UseZAlpha,
                    ControlId::TrackSizeDistribution,
                ] {
                    if let Some(flag) = self.form.flag_mut(id) {
                        edited |= ui.checkbox(flag, id.as_str()).changed();
                    }
                }
                if let Some(text) = self.form.text_mut(ControlId::NeighbourLimit) {
                    edited |= Self::labeled_text(ui, "neighbour limit:", text);
                }
            });

        if edited || !open {
            self.popover_open = open;
            self.refresh_snapshot();
        }
    }

    /// Shows the pending alert or confirmation, if any.
    fn ui_prompt(&mut self, ctx: &egui::Context) {
        let Some(prompt) = self.prompt.clone() else {
            return;
        };

        let mut answer = None;
        egui::Modal::new(egui::Id::new("prompt")).show(ctx, |ui| match &prompt {
            Prompt::Alert(message) => {
                ui.label(message.as_str());
                if ui.button("OK").clicked() {
                    self.prompt = None;
                }
            }
            Prompt::ConfirmClear => {
                ui.label("Clear everything? All data will be deleted!");
                ui.horizontal(|ui| {
                    if ui.button("Clear").clicked() {
                        answer = Some(Confirmation::Accepted);
                    }
                    if ui.button("Cancel").clicked() {
                        answer = Some(Confirmation::Declined);
                    }
                });
            }
        });

        if let Some(answer) = answer {
            self.resolve_clear(answer);
        }
    }

    /// Builds the central panel with the canvas, and drives the run loop.
    fn ui_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let response = ui.allocate_response(ui.available_size(), egui::Sense::hover());
            let rect = response.rect;
            let painter = ui.painter_at(rect);

            // Canvas border.
            let corners = [
                Vec3::ZERO,
                Vec3::new(CANVAS_SIZE, 0.0, 0.0),
                Vec3::new(CANVAS_SIZE, CANVAS_SIZE, 0.0),
                Vec3::new(0.0, CANVAS_SIZE, 0.0),
            ];
            let border: Vec<egui::Pos2> =
                corners.iter().map(|&c| self.canvas_to_screen(c, rect)).collect();
            painter.add(egui::Shape::closed_line(
                border,
                egui::Stroke::new(1.0, egui::Color32::GRAY),
            ));

            let engine = self.scheduler.engine();
            let use_z_alpha = engine.settings().use_z_alpha;
            let scale = Self::canvas_scale(rect);
            for c in engine.circles() {
                let [r, g, b] = c.color;
                let a = (c.alpha(use_z_alpha) * 255.0) as u8;
                painter.circle_filled(
                    self.canvas_to_screen(c.pos, rect),
                    c.radius * scale,
                    egui::Color32::from_rgba_unmultiplied(r, g, b, a),
                );
            }

            if let Some(p) = response.hover_pos() {
                let mm = self.screen_to_canvas(p, rect);
                painter.text(
                    rect.left_top() + egui::vec2(6.0, 6.0),
                    egui::Align2::LEFT_TOP,
                    format!("{:.0}, {:.0} mm", mm.x, mm.y),
                    egui::FontId::monospace(12.0),
                    egui::Color32::LIGHT_GRAY,
                );
            }

            // Auto-run while a run is active.
            if self.scheduler.is_running() {
                let now = ctx.input(|i| i.time);
                if let Some(TickOutcome::Finished) = self.scheduler.advance(now) {
                    self.status = "run finished".to_string();
                }
                ctx.request_repaint();
            }
        });
    }
}

impl App for ControlSurface {
    /// eframe callback that builds all UI panels for each frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui_top_panel(ctx);
        self.ui_status_bar(ctx);
        self.ui_form_panel(ctx);
        self.ui_popover(ctx);
        self.ui_central_panel(ctx);
        self.ui_prompt(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circles_core::scheduler::RunState;

    fn test_rect() -> egui::Rect {
        egui::Rect::from_min_size(egui::Pos2::new(0.0, 0.0), egui::vec2(800.0, 600.0))
    }

    fn surface() -> ControlSurface {
        ControlSurface::new(PanelSettings::default())
    }

    #[test]
    fn canvas_to_screen_and_back_is_roundtrip() {
        let surface = surface();
        let rect = test_rect();

        let points = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(500.0, 500.0, 0.0),
            Vec3::new(125.5, 980.25, 0.0),
        ];

        let eps = 1e-3;

        for p in points {
            let screen = surface.canvas_to_screen(p, rect);
            let back = surface.screen_to_canvas(screen, rect);

            assert!(
                (back.x - p.x).abs() < eps && (back.y - p.y).abs() < eps,
                "roundtrip mismatch: p={:?}, back={:?}",
                p,
                back
            );
        }
    }

    #[test]
    fn canvas_fits_the_shorter_side() {
        let surface = surface();
        let rect = test_rect();

        let top_left = surface.canvas_to_screen(Vec3::ZERO, rect);
        let bottom_right = surface.canvas_to_screen(Vec3::splat(CANVAS_SIZE), rect);

        assert!((top_left.y - 0.0).abs() < 1e-3);
        assert!((bottom_right.y - 600.0).abs() < 1e-3);
        assert!((bottom_right.x - top_left.x - 600.0).abs() < 1e-3);
    }

    #[test]
    fn invalid_form_raises_an_alert_and_stays_idle() {
        let mut surface = surface();
        surface.form.frequency = "0".to_string();
        surface.refresh_snapshot();

        surface.start(0.0);

        assert_eq!(surface.scheduler.state(), RunState::Idle);
        assert!(matches!(surface.prompt, Some(Prompt::Alert(_))));
        assert_eq!(surface.scheduler.visible_control(), ActionControl::Start);
    }

    #[test]
    fn start_uses_the_latest_edit() {
        let mut surface = surface();
        surface.form.dimensionality = "3".to_string();
        surface.refresh_snapshot();

        surface.start(0.0);

        assert!(surface.scheduler.is_running());
        assert_eq!(surface.scheduler.visible_control(), ActionControl::Stop);
        assert_eq!(
            surface.scheduler.engine().settings().dimensions,
            circles_core::config::Dimensionality::Three
        );

        surface.stop();
        assert_eq!(surface.scheduler.state(), RunState::Idle);
    }

    #[test]
    fn live_speed_edit_reaches_a_running_engine() {
        let mut surface = surface();
        surface.start(0.0);

        surface.form.speed = "4".to_string();
        surface.on_speed_edit();

        assert_eq!(surface.snapshot.speed, 4.0);
        assert_eq!(surface.scheduler.engine().settings().speed, 4.0);
    }

    #[test]
    fn first_sample_comes_one_period_after_start() {
        let mut surface = surface();
        surface.start(50.0);

        assert_eq!(surface.scheduler.advance(50.0 + 0.01), None);
        assert_eq!(surface.scheduler.advance(50.0 + 0.05), Some(TickOutcome::Stepped));
        assert!((surface.scheduler.engine().elapsed() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn declined_clear_keeps_the_data() {
        let mut surface = surface();
        surface.start(0.0);
        surface.scheduler.advance(0.0);
        surface.scheduler.advance(10.0);
        let circles = surface.scheduler.engine().circles().len();
        assert!(circles > 0);

        surface.prompt = Some(Prompt::ConfirmClear);
        surface.resolve_clear(Confirmation::Declined);

        assert!(surface.prompt.is_none());
        assert_eq!(surface.scheduler.engine().circles().len(), circles);
        assert!(surface.scheduler.is_running());

        surface.resolve_clear(Confirmation::Accepted);
        assert!(surface.scheduler.engine().circles().is_empty());
        assert!(surface.scheduler.is_running());
    }

    #[test]
    fn export_writes_the_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut surface = surface();
        surface.start(0.0);
        surface.scheduler.advance(10.0);
        surface.scheduler.advance(20.0);

        let path = surface.export_to(dir.path()).unwrap();
        let csv = std::fs::read_to_string(path).unwrap();
        let mut lines = csv.lines();

        assert_eq!(
            lines.next(),
            Some("\"t\",\"S [m²]\",\"N active\",\"T lifetime [s]\",\"S final [m²]\"")
        );
        assert_eq!(lines.count(), 2);
    }
}
