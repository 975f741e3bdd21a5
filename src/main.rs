// src/main.rs
mod cli;
mod engine;
mod gui;
mod simulator;
mod types;
mod waveform;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use eframe::egui;
use log::info;

use crate::cli::{Cli, Command, ServerArgs};
use crate::engine::EngineOptions;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Server(cli.server)) {
        Command::Server(args) => run_server(args),
        Command::Client(args) => simulator::run(&args),
    }
}

fn run_server(args: ServerArgs) -> Result<()> {
    let settings = args
        .stream_config()?
        .validate()
        .context("invalid stream configuration")?;
    info!(
        "{} Hz, {:.3} s window, {} points, {} samples/point, {} reduction, {}",
        settings.sample_rate,
        settings.window_secs,
        settings.points_per_page,
        settings.samples_per_point,
        settings.policy.label(),
        settings.page_mode.label()
    );
    let listener = engine::bind(&args.bind, args.port)?;
    let shutdown = Arc::new(AtomicBool::new(false));
    let options = EngineOptions {
        settings,
        playback: args.playback,
        max_sessions: args.once.then_some(1),
        png_out: args.png_out,
    };

    if args.headless {
        let (tx, rx) = channel();
        drop(rx);
        engine::serve(listener, &options, &tx, &shutdown)?;
        return Ok(());
    }

    let (tx, rx) = channel();
    // 启动后台引擎; it is left blocked in accept when the window closes
    let _engine = engine::spawn_thread(listener, options, tx, Arc::clone(&shutdown));
    let app = gui::ScopeApp::new(settings, rx);
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1000.0, 600.0])
        .with_min_inner_size([640.0, 400.0])
        .with_title("pcmscope");
    let native = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    let result = eframe::run_native("pcmscope", native, Box::new(move |_cc| Box::new(app)));
    shutdown.store(true, Ordering::Release);
    result.map_err(|e| anyhow!("window closed with an error: {e}"))
}
