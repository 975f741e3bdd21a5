// src/gui.rs
use std::net::SocketAddr;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use eframe::egui;
use egui::Color32;
use egui_plot::{Line, Plot, PlotPoints};

use crate::types::StreamEvent;
use crate::waveform::{PageReader, PageSnapshot, SessionSummary, StreamSettings};

const TRACE_COLOR: Color32 = Color32::from_rgb(0, 255, 255);
// ~60 fps; pages change far more often than the UI could show them
const REPAINT_EVERY: Duration = Duration::from_millis(16);

pub struct ScopeApp {
    settings: StreamSettings,
    listening: Option<SocketAddr>,
    peer: Option<SocketAddr>,
    reader: Option<PageReader>,
    last_summary: Option<SessionSummary>,
    log_messages: Vec<String>,
    rx: Receiver<StreamEvent>,
}

impl ScopeApp {
    pub fn new(settings: StreamSettings, rx: Receiver<StreamEvent>) -> Self {
        Self {
            settings,
            listening: None,
            peer: None,
            reader: None,
            last_summary: None,
            log_messages: vec!["pcmscope ready.".to_owned()],
            rx,
        }
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > 8 {
            self.log_messages.remove(0);
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                StreamEvent::Log(msg) => self.log(&msg),
                StreamEvent::Listening(addr) => {
                    self.listening = Some(addr);
                    self.log(&format!("listening on {addr}"));
                }
                StreamEvent::SessionStarted { peer, reader, settings } => {
                    self.peer = Some(peer);
                    self.reader = Some(reader);
                    self.settings = settings;
                }
                // The reader is kept so the last page stays on screen.
                StreamEvent::SessionEnded(summary) => {
                    self.log(&format!(
                        "session ended ({:?}), {} points",
                        summary.end, summary.points
                    ));
                    self.peer = None;
                    self.last_summary = Some(summary);
                }
            }
        }
    }

    fn status_panel(&self, ui: &mut egui::Ui, page: Option<&PageSnapshot>) {
        let settings = &self.settings;
        ui.add_space(10.0);
        ui.heading("pcmscope");
        ui.label("Live PCM waveform");
        ui.separator();

        match self.listening {
            Some(addr) => ui.label(format!("Listening: {addr}")),
            None => ui.label("Not listening"),
        };
        match self.peer {
            Some(peer) => ui.label(egui::RichText::new(format!("Streaming from {peer}")).color(Color32::GREEN)),
            None => ui.label(egui::RichText::new("Waiting for a producer").color(Color32::YELLOW)),
        };

        ui.add_space(10.0);
        ui.label(format!("Window: {:.3} s, {} points", settings.window_secs, settings.points_per_page));
        ui.label(format!("Samples per point: {}", settings.samples_per_point));
        ui.label(format!("Reduction: {}", settings.policy.label()));
        ui.label(format!("Paging: {}", settings.page_mode.label()));

        if let Some(reader) = &self.reader {
            let stats = reader.stats();
            ui.add_space(10.0);
            ui.label(format!("Pages completed: {}", stats.pages_completed));
            if stats.pages_dropped > 0 {
                ui.label(format!("Pages dropped: {}", stats.pages_dropped));
            }
            if let Some(page) = page {
                ui.label(format!("Page {}: {}/{} points", page.generation, page.len(), page.capacity));
            }
        }
        if let Some(summary) = &self.last_summary {
            ui.add_space(10.0);
            ui.label(format!("Last session: {} bytes, {} samples", summary.bytes_in, summary.samples));
        }

        ui.add_space(10.0);
        egui::ScrollArea::vertical().max_height(160.0).show(ui, |ui| {
            for m in &self.log_messages {
                ui.monospace(m);
            }
        });
    }
}

impl eframe::App for ScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        // Taking the snapshot is also the handoff for a sealed single page.
        let page = self.reader.as_ref().map(PageReader::renderable_page);

        ctx.set_visuals(egui::Visuals::dark());

        egui::SidePanel::left("status").min_width(260.0).show(ctx, |ui| {
            self.status_panel(ui, page.as_ref());
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let points: Vec<[f64; 2]> = page
                .as_ref()
                .map(|page| {
                    page.points
                        .iter()
                        .map(|point| [point.time, point.amplitude as f64])
                        .collect()
                })
                .unwrap_or_default();
            let amplitude = self.settings.amplitude;
            Plot::new("waveform")
                .include_x(0.0)
                .include_x(self.settings.window_secs)
                .include_y(amplitude.min as f64)
                .include_y(amplitude.max as f64)
                .allow_drag(false)
                .allow_zoom(false)
                .x_axis_label("Time (s)")
                .y_axis_label("Amplitude (units)")
                .show(ui, |plot_ui| {
                    plot_ui.line(Line::new(PlotPoints::new(points)).name("Amplitude").color(TRACE_COLOR));
                });
        });

        ctx.request_repaint_after(REPAINT_EVERY);
    }
}
