use std::collections::VecDeque;
use std::time::Instant;

use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crane_sim::types::CraneState;
use crane_sim::{Crane, CraneConfig};

const HISTORY_S: f64 = 20.0; // seconds of plot history
const ROPE_PX: f32 = 140.0;

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => CraneConfig::load(&path),
        None => Ok(CraneConfig::default()),
    };
    let crane = match config.and_then(Crane::new) {
        Ok(crane) => crane,
        Err(e) => {
            error!(error = %e, "cannot set up the crane");
            std::process::exit(1);
        }
    };

    let app = CraneViz {
        destination: crane.destination(),
        crane,
        t0: Instant::now(),
        history: VecDeque::new(),
    };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1100.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("Crane Anti-Sway", options, Box::new(|_| Ok(Box::new(app))))
}

struct CraneViz {
    crane: Crane,
    destination: f64,
    t0: Instant,
    history: VecDeque<(f64, CraneState, f64)>, // (t, state, destination)
}

impl CraneViz {
    fn record(&mut self, state: CraneState) {
        let t = self.t0.elapsed().as_secs_f64();
        self.history.push_back((t, state, self.crane.destination()));
        while self.history.front().is_some_and(|(t0, _, _)| t - t0 > HISTORY_S) {
            self.history.pop_front();
        }
    }

    fn draw_track(&self, ui: &mut egui::Ui, state: &CraneState) {
        let track_length = self.crane.track().track_length;
        let size = egui::vec2(ui.available_width(), ROPE_PX + 80.0);
        let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
        let rect = response.rect.shrink(20.0);

        let to_x = |x: f64| rect.left() + (x / track_length) as f32 * rect.width();
        let rail_y = rect.top() + 10.0;

        painter.line_segment(
            [egui::pos2(rect.left(), rail_y), egui::pos2(rect.right(), rail_y)],
            egui::Stroke::new(3.0, egui::Color32::GRAY),
        );

        let dest_x = to_x(self.crane.destination());
        painter.line_segment(
            [egui::pos2(dest_x, rail_y - 10.0), egui::pos2(dest_x, rect.bottom())],
            egui::Stroke::new(1.0, egui::Color32::DARK_GREEN),
        );

        let cart = egui::pos2(to_x(state.position), rail_y);
        painter.rect_filled(
            egui::Rect::from_center_size(cart, egui::vec2(36.0, 14.0)),
            2.0,
            egui::Color32::LIGHT_BLUE,
        );

        let angle = state.angle as f32;
        let payload = cart + egui::vec2(angle.sin() * ROPE_PX, angle.cos() * ROPE_PX);
        painter.line_segment([cart, payload], egui::Stroke::new(1.5, egui::Color32::WHITE));
        let color = if self.crane.sway_alarm() {
            egui::Color32::RED
        } else {
            egui::Color32::YELLOW
        };
        painter.circle_filled(payload, 10.0, color);
    }
}

impl eframe::App for CraneViz {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let state = self.crane.state();
        if self.crane.is_running() {
            self.record(state);
        }
        let track_length = self.crane.track().track_length;

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let slider = egui::Slider::new(&mut self.destination, 0.0..=track_length)
                    .text("destination");
                if ui.add(slider).changed() {
                    self.destination = self.crane.set_destination(self.destination);
                }
                if self.crane.is_running() {
                    if ui.button("Stop").clicked() {
                        self.crane.stop();
                    }
                } else if ui.button("Start").clicked() {
                    self.crane.start();
                }
            });
            ui.label(format!(
                "x = {:>7.2}   v = {:>7.2}   angle = {:>6.2}°   ticks = {} ({} late)",
                state.position,
                state.velocity,
                state.angle.to_degrees(),
                self.crane.ticks(),
                self.crane.late_ticks(),
            ));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_track(ui, &state);

            let half_w = ui.available_width() / 2.0 - 8.0;
            let plot_h = ui.available_height() - 24.0;

            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label("Position");
                    let pos: PlotPoints = self.history.iter().map(|(t, s, _)| [*t, s.position]).collect();
                    let dest: PlotPoints = self.history.iter().map(|(t, _, d)| [*t, *d]).collect();
                    Plot::new("position")
                        .width(half_w)
                        .height(plot_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Cart", pos));
                            plot_ui.line(Line::new("Destination", dest));
                        });
                });

                ui.vertical(|ui| {
                    ui.label("Sway angle (deg)");
                    let angle: PlotPoints = self
                        .history
                        .iter()
                        .map(|(t, s, _)| [*t, s.angle.to_degrees()])
                        .collect();
                    Plot::new("angle")
                        .width(half_w)
                        .height(plot_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Angle", angle));
                        });
                });
            });
        });

        ctx.request_repaint();
    }
}
