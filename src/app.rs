//! The RetroPaint application — toolbar, canvas view, status bar, and the
//! background save/load pipeline.
//!
//! All brush and canvas mutation happens here on the UI thread. Save and
//! load run on worker threads against a snapshot (save) or a parsed record
//! list (load); while one is in flight no drawing input is accepted, so the
//! UI thread stays the sole mutator of paint state.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use eframe::egui;
use egui::{Color32, RichText, TextureOptions};

use crate::brush::{Brush, BrushMode, BrushShape, BRUSH_SIZE_MAX, BRUSH_SIZE_MIN};
use crate::canvas::{Canvas, TOOLBAR_HEIGHT};
use crate::colors::ColorTable;
use crate::io::{self, PixelRecord};
use crate::text::{self, TextAnnotation};
use crate::{log_err, log_info, log_warn};

/// Fixed client-area size, toolbar strip included.
pub const SURFACE_WIDTH: u32 = 1280;
pub const SURFACE_HEIGHT: u32 = 720;

/// Default file name offered by the save/load dialogs.
const PIXEL_DATA_FILE: &str = "pixel_data.csv";

/// The nine palette buttons, in grid order.
const PALETTE: [([u8; 3], &str); 9] = [
    ([0, 0, 0], "Black"),
    ([255, 0, 0], "Red"),
    ([0, 255, 0], "Green"),
    ([0, 0, 255], "Blue"),
    ([255, 255, 0], "Yellow"),
    ([255, 165, 0], "Orange"),
    ([128, 0, 128], "Purple"),
    ([128, 128, 128], "Gray"),
    ([165, 42, 42], "Brown"),
];

// ============================================================================
// ASYNC IO PIPELINE — background pixel-data save / load
// ============================================================================

/// Message delivered from a background save/load worker.
pub enum IoMessage {
    /// Integer save percentage, 0–100.
    Progress(u8),
    SaveComplete { records: usize, path: PathBuf },
    SaveFailed(String),
    /// Parsed records, to be replayed onto the canvas on the UI thread.
    LoadComplete { records: Vec<PixelRecord>, path: PathBuf },
    LoadFailed(String),
}

pub struct RetroPaintApp {
    brush: Brush,
    canvas: Canvas,
    color_table: ColorTable,

    // Custom color entry
    custom_color_text: String,
    custom_color: Option<[u8; 3]>,
    nearest_label: String,
    use_custom: bool,

    // Interaction state
    line_start: Option<(i32, i32)>,
    annotation: Option<TextAnnotation>,
    annotation_font: Option<ab_glyph::FontArc>,
    font_probe_done: bool,

    // Canvas texture
    texture: Option<egui::TextureHandle>,
    canvas_dirty: bool,

    // Async IO pipeline
    io_sender: mpsc::Sender<IoMessage>,
    io_receiver: mpsc::Receiver<IoMessage>,
    /// True while a save/load worker is running; drawing input is refused.
    io_in_flight: bool,
    io_progress: u8,
    io_title: String,
    io_status: String,
}

impl RetroPaintApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, color_table: ColorTable) -> Self {
        let (io_sender, io_receiver) = mpsc::channel();
        Self {
            brush: Brush::new(),
            canvas: Canvas::new(SURFACE_WIDTH, SURFACE_HEIGHT, TOOLBAR_HEIGHT),
            color_table,
            custom_color_text: String::new(),
            custom_color: None,
            nearest_label: String::new(),
            use_custom: false,
            line_start: None,
            annotation: None,
            annotation_font: None,
            font_probe_done: false,
            texture: None,
            canvas_dirty: true,
            io_sender,
            io_receiver,
            io_in_flight: false,
            io_progress: 0,
            io_title: String::new(),
            io_status: String::new(),
        }
    }

    // ------------------------------------------------------------------
    // Color selection
    // ------------------------------------------------------------------

    fn pick_palette_color(&mut self, rgb: [u8; 3]) {
        self.brush.set_color(rgb[0], rgb[1], rgb[2]);
        self.custom_color_text.clear();
        self.nearest_label.clear();
        self.use_custom = false;
    }

    /// Re-parse the custom color field and refresh the nearest-name readout.
    fn custom_color_changed(&mut self) {
        match parse_rgb_triple(&self.custom_color_text) {
            Some(rgb) => {
                self.custom_color = Some(rgb);
                self.nearest_label = self
                    .color_table
                    .nearest_name(rgb[0], rgb[1], rgb[2])
                    .unwrap_or("Unknown")
                    .to_string();
                if self.use_custom {
                    self.brush.set_color(rgb[0], rgb[1], rgb[2]);
                }
            }
            None => {
                self.custom_color = None;
                self.nearest_label.clear();
            }
        }
    }

    fn apply_custom_color(&mut self) {
        self.use_custom = !self.use_custom;
        if self.use_custom {
            if let Some(rgb) = self.custom_color {
                self.brush.set_color(rgb[0], rgb[1], rgb[2]);
            }
        }
    }

    // ------------------------------------------------------------------
    // Mode switching
    // ------------------------------------------------------------------

    fn select_mode(&mut self, mode: BrushMode) {
        if self.brush.mode() == BrushMode::Text && mode != BrushMode::Text {
            self.commit_annotation();
        }
        if mode == BrushMode::Text && !self.font_probe_done {
            self.font_probe_done = true;
            self.annotation_font = text::annotation_font();
            if self.annotation_font.is_none() {
                log_warn!("no system sans-serif font found; text annotations will be dropped");
            }
        }
        self.brush.set_mode(mode);
        self.line_start = None;
    }

    /// Rasterize the pending annotation into the canvas, if any.
    fn commit_annotation(&mut self) {
        let Some(annotation) = self.annotation.take() else {
            return;
        };
        if annotation.is_empty() {
            return;
        }
        match &self.annotation_font {
            Some(font) => {
                text::rasterize_into(
                    &mut self.canvas,
                    font,
                    annotation.text(),
                    annotation.anchor,
                    self.brush.size() as f32,
                    self.brush.color(),
                );
                self.canvas_dirty = true;
            }
            None => log_warn!("text annotation dropped: no font available"),
        }
    }

    // ------------------------------------------------------------------
    // Background save / load
    // ------------------------------------------------------------------

    fn start_save(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(PIXEL_DATA_FILE)
            .add_filter("Pixel data", &["csv"])
            .save_file()
        else {
            return;
        };

        log_info!("saving started: {}", path.display());
        self.io_in_flight = true;
        self.io_progress = 0;
        self.io_title = "Saving your drawing...".to_string();
        self.io_status.clear();

        let snapshot = self.canvas.snapshot();
        let reserved = self.canvas.reserved_top();
        let tx = self.io_sender.clone();
        let progress_tx = self.io_sender.clone();

        thread::spawn(move || {
            let mut report = move |p: u8| {
                let _ = progress_tx.send(IoMessage::Progress(p));
            };
            match io::save_pixel_data(&snapshot, reserved, &path, &mut report) {
                Ok(records) => {
                    let _ = tx.send(IoMessage::SaveComplete { records, path });
                }
                Err(e) => {
                    let _ = tx.send(IoMessage::SaveFailed(e.to_string()));
                }
            }
        });
    }

    fn start_load(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(PIXEL_DATA_FILE)
            .add_filter("Pixel data", &["csv"])
            .pick_file()
        else {
            return;
        };

        log_info!("loading started: {}", path.display());
        self.io_in_flight = true;
        self.io_progress = 0;
        self.io_title = "Loading your drawing...".to_string();
        self.io_status.clear();

        let tx = self.io_sender.clone();
        thread::spawn(move || match io::load_pixel_data(&path) {
            Ok(records) => {
                let _ = tx.send(IoMessage::LoadComplete { records, path });
            }
            Err(e) => {
                let _ = tx.send(IoMessage::LoadFailed(e.to_string()));
            }
        });
    }

    fn drain_io_messages(&mut self) {
        while let Ok(msg) = self.io_receiver.try_recv() {
            match msg {
                IoMessage::Progress(p) => {
                    // Workers already report monotonically; max() keeps the
                    // bar from ever stepping backwards regardless.
                    self.io_progress = self.io_progress.max(p);
                }
                IoMessage::SaveComplete { records, path } => {
                    log_info!("saving done: {} records to {}", records, path.display());
                    self.io_in_flight = false;
                    self.io_status = format!("Saved {} records", records);
                }
                IoMessage::SaveFailed(e) => {
                    log_err!("saving failed: {}", e);
                    self.io_in_flight = false;
                    self.io_status = "Save failed (see log)".to_string();
                }
                IoMessage::LoadComplete { records, path } => {
                    let applied = io::apply_records(&mut self.canvas, &records);
                    self.canvas_dirty = true;
                    log_info!(
                        "loading done: {} of {} records drawn from {}",
                        applied,
                        records.len(),
                        path.display()
                    );
                    self.io_in_flight = false;
                    self.io_status = format!("Loaded {} pixels", applied);
                }
                IoMessage::LoadFailed(e) => {
                    log_err!("loading failed: {}", e);
                    self.io_in_flight = false;
                    self.io_status = "Load failed (see log)".to_string();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // UI panels
    // ------------------------------------------------------------------

    fn toolbar_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_centered(|ui| {
            ui.label(RichText::new("RetroPaint").size(30.0).strong());
            ui.separator();

            egui::Grid::new("palette").spacing([4.0, 4.0]).show(ui, |ui| {
                for (i, (rgb, name)) in PALETTE.iter().enumerate() {
                    let fill = Color32::from_rgb(rgb[0], rgb[1], rgb[2]);
                    let button = egui::Button::new("").fill(fill);
                    if ui.add_sized([20.0, 20.0], button).on_hover_text(*name).clicked() {
                        self.pick_palette_color(*rgb);
                    }
                    if i % 3 == 2 {
                        ui.end_row();
                    }
                }
            });
            ui.separator();

            ui.vertical(|ui| {
                let edit = egui::TextEdit::singleline(&mut self.custom_color_text)
                    .hint_text("r,g,b")
                    .desired_width(110.0);
                if ui.add(edit).changed() {
                    self.custom_color_changed();
                }
                let label = if self.nearest_label.is_empty() {
                    "CUSTOM COLOR".to_string()
                } else {
                    self.nearest_label.clone()
                };
                if ui
                    .selectable_label(self.use_custom, label)
                    .on_hover_text("Toggle the custom color")
                    .clicked()
                {
                    self.apply_custom_color();
                }
            });
            ui.separator();

            let mode = self.brush.mode();
            ui.vertical(|ui| {
                if ui.selectable_label(mode == BrushMode::FreeDraw, "Free Mode").clicked() {
                    self.select_mode(BrushMode::FreeDraw);
                }
                if ui.selectable_label(mode == BrushMode::Grid, "Pixel Mode").clicked() {
                    self.select_mode(BrushMode::Grid);
                }
            });
            ui.vertical(|ui| {
                if ui.selectable_label(mode == BrushMode::Line, "Line Mode").clicked() {
                    self.select_mode(BrushMode::Line);
                }
                if ui.selectable_label(mode == BrushMode::Text, "Text Mode").clicked() {
                    self.select_mode(BrushMode::Text);
                }
            });
            ui.vertical(|ui| {
                if ui.selectable_label(mode == BrushMode::Eraser, "Eraser").clicked() {
                    self.select_mode(BrushMode::Eraser);
                }
                if ui
                    .add_enabled(!self.io_in_flight, egui::Button::new("Reset"))
                    .clicked()
                {
                    self.canvas.reset();
                    self.canvas_dirty = true;
                    log_info!("canvas reset");
                }
            });
            ui.separator();

            let shape = self.brush.shape();
            ui.vertical(|ui| {
                if ui.selectable_label(shape == BrushShape::Square, "S-Draw").clicked() {
                    self.brush.set_shape(BrushShape::Square);
                }
                if ui.selectable_label(shape == BrushShape::Circle, "C-Draw").clicked() {
                    self.brush.set_shape(BrushShape::Circle);
                }
            });
            ui.separator();

            ui.vertical(|ui| {
                ui.label("Brush Size");
                let mut size = self.brush.size();
                if ui
                    .add(egui::Slider::new(&mut size, BRUSH_SIZE_MIN..=BRUSH_SIZE_MAX))
                    .changed()
                {
                    self.brush.set_size(size);
                }
            });
            ui.separator();

            ui.vertical(|ui| {
                if ui
                    .add_enabled(!self.io_in_flight, egui::Button::new("SAVE"))
                    .clicked()
                {
                    self.start_save();
                }
                if ui
                    .add_enabled(!self.io_in_flight, egui::Button::new("LOAD"))
                    .clicked()
                {
                    self.start_load();
                }
            });
        });
    }

    fn status_bar_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(format!("Brush Size: {}", self.brush.size()));
            ui.separator();
            let [r, g, b] = self.brush.color();
            ui.label(format!("Color: RGB({}, {}, {})", r, g, b));
            ui.separator();
            ui.label(format!("Current Mode: {}", self.brush.mode().label()));
            ui.separator();
            let (x, y) = self.brush.position();
            ui.label(format!("Mouse Pos = X: {}, Y: {}", x, y));
            if !self.io_status.is_empty() {
                ui.separator();
                ui.label(&self.io_status);
            }
        });
    }

    fn canvas_ui(&mut self, ui: &mut egui::Ui) {
        if self.canvas_dirty || self.texture.is_none() {
            let img = self.canvas.to_color_image();
            match &mut self.texture {
                Some(tex) => tex.set(img, TextureOptions::NEAREST),
                None => {
                    self.texture = Some(ui.ctx().load_texture("canvas", img, TextureOptions::NEAREST))
                }
            }
            self.canvas_dirty = false;
        }

        let size = egui::vec2(
            self.canvas.width() as f32,
            self.canvas.drawable_height() as f32,
        );
        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
        if let Some(tex) = &self.texture {
            ui.painter().image(
                tex.id(),
                rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        // Widget-space position -> surface coordinates (toolbar strip included).
        let reserved = self.canvas.reserved_top() as i32;
        let surface = |pos: egui::Pos2| -> (i32, i32) {
            (
                (pos.x - rect.min.x).floor() as i32,
                (pos.y - rect.min.y).floor() as i32 + reserved,
            )
        };

        if let Some(pos) = response.hover_pos() {
            let (sx, sy) = surface(pos);
            self.brush.set_position(sx, sy);
        }

        // Drawing input is refused while a save/load worker runs.
        if self.io_in_flight {
            return;
        }

        match self.brush.mode() {
            BrushMode::Line => {
                if response.drag_started() {
                    if let Some(pos) = response.interact_pointer_pos() {
                        self.line_start = Some(surface(pos));
                    }
                }
                if response.drag_released() {
                    if let (Some(start), Some(pos)) =
                        (self.line_start.take(), response.interact_pointer_pos())
                    {
                        if self.canvas.draw_line(&self.brush, start, surface(pos)) {
                            self.canvas_dirty = true;
                        }
                    }
                } else if let (Some(start), Some(pos)) =
                    (self.line_start, response.interact_pointer_pos())
                {
                    // Preview of the pending line, drawn over the texture only.
                    let [r, g, b] = self.brush.color();
                    let (sx, sy) = start;
                    let a = egui::pos2(
                        rect.min.x + sx as f32,
                        rect.min.y + (sy - reserved) as f32,
                    );
                    ui.painter().line_segment(
                        [a, pos],
                        egui::Stroke::new(
                            self.brush.size() as f32,
                            Color32::from_rgb(r, g, b),
                        ),
                    );
                }
                if response.clicked() {
                    if let Some(pos) = response.interact_pointer_pos() {
                        let p = surface(pos);
                        if self.canvas.draw_line(&self.brush, p, p) {
                            self.canvas_dirty = true;
                        }
                    }
                }
            }
            BrushMode::Text => {
                if response.clicked() {
                    if let Some(pos) = response.interact_pointer_pos() {
                        self.commit_annotation();
                        self.annotation = Some(TextAnnotation::new(surface(pos)));
                    }
                }
                if let Some(annotation) = &self.annotation {
                    let (ax, ay) = annotation.anchor;
                    let screen = egui::pos2(
                        rect.min.x + ax as f32,
                        rect.min.y + (ay - reserved) as f32,
                    );
                    let [r, g, b] = self.brush.color();
                    ui.painter().text(
                        screen,
                        egui::Align2::LEFT_TOP,
                        format!("{}|", annotation.text()),
                        egui::FontId::proportional(self.brush.size() as f32),
                        Color32::from_rgb(r, g, b),
                    );
                }
            }
            _ => {
                // Free, Grid and Eraser stamp while the button is held.
                if response.is_pointer_button_down_on() {
                    if let Some(pos) = response.interact_pointer_pos() {
                        let (sx, sy) = surface(pos);
                        if self.canvas.stamp(&self.brush, sx, sy) {
                            self.canvas_dirty = true;
                        }
                    }
                }
            }
        }
    }

    /// Feed keyboard events into the active text annotation.
    fn annotation_input(&mut self, ctx: &egui::Context) {
        if self.brush.mode() != BrushMode::Text || self.io_in_flight {
            return;
        }
        if self.annotation.is_none() {
            return;
        }
        // Leave the keyboard alone while a widget (the color field) has focus.
        if ctx.memory(|m| m.focus().is_some()) {
            return;
        }

        let events = ctx.input(|i| i.events.clone());
        let mut commit = false;
        if let Some(annotation) = &mut self.annotation {
            for event in events {
                match event {
                    egui::Event::Text(t) => {
                        for c in t.chars() {
                            annotation.push_char(c);
                        }
                    }
                    egui::Event::Key {
                        key: egui::Key::Enter,
                        pressed: true,
                        ..
                    } => annotation.newline(),
                    egui::Event::Key {
                        key: egui::Key::Backspace,
                        pressed: true,
                        ..
                    } => annotation.backspace(),
                    egui::Event::Key {
                        key: egui::Key::Escape,
                        pressed: true,
                        ..
                    } => commit = true,
                    _ => {}
                }
            }
        }
        if commit {
            self.commit_annotation();
        }
    }
}

impl eframe::App for RetroPaintApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_io_messages();
        self.annotation_input(ctx);

        egui::TopBottomPanel::top("toolbar")
            .exact_height(TOOLBAR_HEIGHT as f32)
            .show(ctx, |ui| self.toolbar_ui(ui));

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| self.status_bar_ui(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| self.canvas_ui(ui));
        });

        if self.io_in_flight {
            egui::Window::new(self.io_title.clone())
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.add(
                        egui::ProgressBar::new(self.io_progress as f32 / 100.0)
                            .show_percentage()
                            .desired_width(280.0),
                    );
                });
            // Keep pumping worker messages even with the pointer idle.
            ctx.request_repaint();
        }
    }
}

/// Parse a `r,g,b` triple of 0–255 integers.
fn parse_rgb_triple(s: &str) -> Option<[u8; 3]> {
    let mut fields = s.split(',');
    let r = fields.next()?.trim().parse::<u8>().ok()?;
    let g = fields.next()?.trim().parse::<u8>().ok()?;
    let b = fields.next()?.trim().parse::<u8>().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some([r, g, b])
}
