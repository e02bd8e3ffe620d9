// ui.rs - Display window: pulls the latest gathered grid each frame and draws it

use crate::error::CliError;
use eframe::egui;
use egui::{Color32, Rect, Stroke, Vec2};
use ring_life::{CommError, DisplayLink, GlobalGrid, GridDims};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Cells at or below this many pixels on a side are drawn without gridlines.
pub const GRIDLINE_MIN_CELL: u32 = 4;

const CONTROLS_HEIGHT: f32 = 110.0;

/// Pixel layout of the grid inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellGeometry {
    pub size_x: u32,
    pub size_y: u32,
    pub width: u32,
    pub height: u32,
    pub gridlines: bool,
}

impl CellGeometry {
    /// Fit `dims` into a `resx` × `resy` pixel area with whole-pixel cells.
    /// Dimensions beyond `u32::MAX` clamp, as does the resulting size.
    pub fn new(resx: u32, resy: u32, dims: GridDims) -> Self {
        let cols = u32::try_from(dims.cols).unwrap_or(u32::MAX);
        let rows = u32::try_from(dims.rows).unwrap_or(u32::MAX);
        let size_x = (resx / cols).max(1);
        let size_y = (resy / rows).max(1);
        Self {
            size_x,
            size_y,
            width: size_x.saturating_mul(cols),
            height: size_y.saturating_mul(rows),
            gridlines: size_x > GRIDLINE_MIN_CELL && size_y > GRIDLINE_MIN_CELL,
        }
    }

    pub fn window_size(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32 + CONTROLS_HEIGHT]
    }
}

pub struct DisplayApp {
    link: DisplayLink,
    title: String,
    geometry: CellGeometry,
    grid: Option<GlobalGrid>,
    pub is_running: bool,
    pub live_color: Color32,
    pub dead_color: Color32,
    pub grid_color: Color32,
    last_draw: Duration,
    finished: bool,
    failure: Option<String>,
}

impl DisplayApp {
    pub fn new(link: DisplayLink, title: String, geometry: CellGeometry) -> Self {
        Self {
            link,
            title,
            geometry,
            grid: None,
            is_running: true,
            live_color: Color32::BLACK,
            dead_color: Color32::WHITE,
            grid_color: Color32::from_gray(192),
            last_draw: Duration::ZERO,
            finished: false,
            failure: None,
        }
    }

    fn pull_frame(&mut self) {
        match self.link.request_frame() {
            Ok(grid) => self.grid = Some(grid),
            // The group stopped at its generation limit after the last frame.
            Err(CommError::PeerGone { .. }) if self.grid.is_some() => {
                info!(frames = self.link.frames_received(), "Compute group finished");
                self.finished = true;
                self.is_running = false;
            }
            Err(err) => {
                error!(error = %err, "Lost the compute group");
                self.failure = Some(err.to_string());
                self.is_running = false;
            }
        }
    }

    fn quit(&mut self, ctx: &egui::Context) {
        if let Err(err) = self.link.terminate() {
            warn!(error = %err, "Compute group already gone");
        }
        info!(frames = self.link.frames_received(), "Display closing");
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }

    fn draw_grid(&mut self, ui: &mut egui::Ui) {
        let geometry = self.geometry;
        let total_size = Vec2::new(geometry.width as f32, geometry.height as f32);
        let (response, painter) = ui.allocate_painter(total_size, egui::Sense::hover());
        let origin = response.rect.min;

        painter.rect_filled(Rect::from_min_size(origin, total_size), 0.0, self.dead_color);

        let Some(grid) = &self.grid else {
            return;
        };

        let started = Instant::now();
        let cell = Vec2::new(geometry.size_x as f32, geometry.size_y as f32);
        for (row, col) in grid.live_cells() {
            let x = origin.x + col as f32 * cell.x;
            let y = origin.y + row as f32 * cell.y;
            painter.rect_filled(Rect::from_min_size(egui::pos2(x, y), cell), 0.0, self.live_color);
        }

        if geometry.gridlines {
            let stroke = Stroke::new(1.0, self.grid_color);
            let dims = grid.dims();
            for row in 0..=dims.rows {
                let y = origin.y + row as f32 * cell.y;
                painter.line_segment([egui::pos2(origin.x, y), egui::pos2(origin.x + total_size.x, y)], stroke);
            }
            for col in 0..=dims.cols {
                let x = origin.x + col as f32 * cell.x;
                painter.line_segment([egui::pos2(x, origin.y), egui::pos2(x, origin.y + total_size.y)], stroke);
            }
        }
        self.last_draw = started.elapsed();
    }
}

impl eframe::App for DisplayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Blocks until the collector answers; the simulation keeps running
        // meanwhile.
        if self.is_running && !self.link.is_terminated() {
            self.pull_frame();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(&self.title);

            // Controls
            ui.horizontal(|ui| {
                let can_run = !self.finished && self.failure.is_none() && !self.link.is_terminated();
                let button_text = if self.is_running { "⏸ Pause" } else { "▶ Resume" };
                if ui.add_enabled(can_run, egui::Button::new(button_text)).clicked() {
                    self.is_running = !self.is_running;
                }

                if ui.button("⏹ Quit").clicked() {
                    self.quit(ctx);
                }

                ui.separator();

                ui.label("Live:");
                ui.color_edit_button_srgba(&mut self.live_color);
                ui.label("Dead:");
                ui.color_edit_button_srgba(&mut self.dead_color);
            });

            ui.separator();

            // Statistics
            ui.horizontal(|ui| {
                ui.label(format!("Frames: {}", self.link.frames_received()));
                if let Some(grid) = &self.grid {
                    let dims = grid.dims();
                    let live_cells = grid.population();
                    ui.label(format!("Live cells: {}", live_cells));
                    ui.label(format!(
                        "Population: {:.1}%",
                        live_cells as f32 / dims.cell_count() as f32 * 100.0
                    ));
                }
                ui.label(format!("Draw: {:.2} ms", self.last_draw.as_secs_f64() * 1000.0));
            });

            if self.finished {
                ui.label("Simulation finished");
            }
            if let Some(failure) = &self.failure {
                ui.colored_label(Color32::RED, format!("Simulation stopped: {}", failure));
            }

            ui.separator();

            self.draw_grid(ui);
        });

        // Keep pulling frames
        if self.is_running {
            ctx.request_repaint();
        }
    }
}

/// Open the window and run it until closed. Dropping the app on close
/// releases the compute group.
pub fn run_window(link: DisplayLink, title: &str, resx: u32, resy: u32) -> Result<(), CliError> {
    let geometry = CellGeometry::new(resx, resy, link.dims());
    info!(
        cell_width = geometry.size_x,
        cell_height = geometry.size_y,
        gridlines = geometry.gridlines,
        "Opening display"
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(geometry.window_size()),
        ..Default::default()
    };

    let app = DisplayApp::new(link, title.to_string(), geometry);
    eframe::run_native(title, options, Box::new(move |_cc| Box::new(app)))
        .map_err(|e| CliError::Window(e.to_string()))
}
