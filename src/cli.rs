//! Command-line interface for vocseg
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Real-time utterance segmentation for speech pipelines
#[derive(Parser, Debug)]
#[command(
    name = "vocseg",
    version,
    about = "Segment live or recorded audio into utterance WAV files"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress the run summary (segment dispatch still logs errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// WAV input file, or "-" for stdin (default: live microphone)
    #[arg(long, short = 'i', value_name = "PATH")]
    pub input: Option<String>,

    /// Directory for segment WAV files
    #[arg(long, short = 'o', value_name = "DIR", default_value = "segments")]
    pub out_dir: PathBuf,

    /// File name prefix for segment files
    #[arg(long, value_name = "PREFIX", default_value = "segment")]
    pub prefix: String,

    /// Audio input device for live capture (e.g., pipewire)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Energy detector threshold (mean absolute amplitude, 0..1)
    #[arg(long, value_name = "LEVEL")]
    pub threshold: Option<f32>,

    /// Use the model detector instead of the energy threshold
    #[arg(long)]
    pub model_vad: bool,

    /// Trailing silence that ends an utterance. Examples: 300ms, 0.5s
    #[arg(long, value_name = "DURATION", value_parser = parse_duration_ms)]
    pub min_silence: Option<u32>,

    /// Minimum utterance duration for a silence-triggered flush
    #[arg(long, value_name = "DURATION", value_parser = parse_duration_ms)]
    pub min_utterance: Option<u32>,

    /// Maximum utterance duration before a forced flush
    #[arg(long, value_name = "DURATION", value_parser = parse_duration_ms)]
    pub max_utterance: Option<u32>,

    /// Flush a still-open segment on stop instead of discarding it
    #[arg(long)]
    pub flush_partial: bool,
}

/// Parse a duration string into milliseconds.
///
/// Supports any format accepted by `humantime`: bare numbers (milliseconds),
/// single-unit (`300ms`, `2s`), and compound (`1m30s`).
fn parse_duration_ms(s: &str) -> Result<u32, String> {
    let s = s.trim();
    // Bare number → milliseconds
    if let Ok(ms) = s.parse::<u32>() {
        return Ok(ms);
    }
    humantime::parse_duration(s)
        .map_err(|e| e.to_string())
        .and_then(|d| {
            u32::try_from(d.as_millis()).map_err(|_| "duration too large".to_string())
        })
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input devices
    Devices,
}
