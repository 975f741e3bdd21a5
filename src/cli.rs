// src/cli.rs
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::engine::DEFAULT_PORT;
use crate::types::PlaybackTarget;
use crate::waveform::{ScopeError, StreamConfig};

#[derive(Debug, Parser)]
#[command(
    name = "pcmscope",
    version,
    about = "Receive 16-bit PCM over TCP, play it and draw the waveform",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Without a subcommand the server runs with the GUI.
    #[command(flatten)]
    pub server: ServerArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Receive, play and display a PCM stream
    Server(ServerArgs),
    /// Stream a sine tone or a WAV file to a server
    Client(ClientArgs),
}

#[derive(Debug, Args)]
pub struct ServerArgs {
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// JSON stream configuration; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Seconds of audio shown across the display
    #[arg(long = "window")]
    pub window_secs: Option<f64>,
    /// Points per page
    #[arg(long)]
    pub width: Option<usize>,
    #[arg(long)]
    pub sample_rate: Option<u32>,
    /// null, stdout (or -), or a file path
    #[arg(long, default_value = "null")]
    pub playback: PlaybackTarget,
    /// No window; see --png-out
    #[arg(long)]
    pub headless: bool,
    /// Exit after the first session
    #[arg(long)]
    pub once: bool,
    /// Write the last page of each session as PNG
    #[arg(long)]
    pub png_out: Option<PathBuf>,
}

impl ServerArgs {
    pub fn stream_config(&self) -> Result<StreamConfig, ScopeError> {
        let mut config = match &self.config {
            Some(path) => StreamConfig::load(path)?,
            None => StreamConfig::default(),
        };
        if let Some(window) = self.window_secs {
            config.window_duration_secs = window;
        }
        if let Some(width) = self.width {
            config.display_width_points = width;
        }
        if let Some(rate) = self.sample_rate {
            config.sample_rate = rate;
        }
        Ok(config)
    }
}

#[derive(Debug, Args)]
pub struct ClientArgs {
    #[arg(long, default_value = "localhost")]
    pub host: String,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Stream this 16-bit mono WAV file instead of a sine tone
    #[arg(long)]
    pub wav: Option<PathBuf>,
    /// Send the WAV header too
    #[arg(long, requires = "wav")]
    pub with_header: bool,
    #[arg(long, default_value_t = 440.0)]
    pub frequency: f64,
    /// Seconds of sine tone
    #[arg(long, default_value_t = 20.0)]
    pub duration: f64,
    #[arg(long, default_value_t = 44_100)]
    pub sample_rate: u32,
    /// Peak amplitude of uniform noise added to the tone
    #[arg(long, default_value_t = 0)]
    pub noise: i32,
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    /// Send as fast as the socket allows
    #[arg(long)]
    pub no_pace: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_invocation_runs_the_server() {
        let cli = Cli::try_parse_from(["pcmscope", "--headless", "--window", "0.3"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.server.headless);
        assert_eq!(cli.server.port, 12_345);
        assert_eq!(cli.server.playback, PlaybackTarget::Null);
        let config = cli.server.stream_config().unwrap();
        assert_eq!(config.window_duration_secs, 0.3);
        assert_eq!(config.display_width_points, 150);
    }

    #[test]
    fn server_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "pcmscope", "server", "--width", "300", "--sample-rate", "48000", "--playback", "-",
        ])
        .unwrap();
        let Some(Command::Server(args)) = cli.command else {
            panic!("expected the server subcommand");
        };
        assert_eq!(args.playback, PlaybackTarget::Stdout);
        let config = args.stream_config().unwrap();
        assert_eq!(config.display_width_points, 300);
        assert_eq!(config.sample_rate, 48_000);
    }

    #[test]
    fn client_defaults() {
        let cli = Cli::try_parse_from(["pcmscope", "client", "--noise", "100", "--seed", "3"]).unwrap();
        let Some(Command::Client(args)) = cli.command else {
            panic!("expected the client subcommand");
        };
        assert_eq!(args.host, "localhost");
        assert_eq!(args.frequency, 440.0);
        assert_eq!(args.duration, 20.0);
        assert_eq!(args.noise, 100);
        assert_eq!(args.seed, 3);
        assert!(args.wav.is_none());
        assert!(Cli::try_parse_from(["pcmscope", "client", "--with-header"]).is_err());
    }
}
