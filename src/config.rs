//! Pipeline configuration.

use crate::defaults;
use crate::error::{Result, VocsegError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
#[cfg(feature = "cli")]
use std::path::PathBuf;

/// Which voice-activity detection strategy to run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DetectorMode {
    /// Mean-amplitude threshold.
    Energy,
    /// WebRTC-profile model detector (fixed frame shapes only).
    Model,
}

/// Sensitivity profile for the model detector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelSensitivity {
    Quality,
    LowBitrate,
    Aggressive,
    VeryAggressive,
}

/// Immutable pipeline configuration, fixed at construction.
///
/// Validated once by `validate`; no component mutates it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Audio sample rate in Hz.
    pub sample_rate: u32,
    /// Nominal frame duration in milliseconds.
    pub frame_duration_ms: u32,
    /// Detection strategy.
    pub detector: DetectorMode,
    /// Threshold for the energy detector (mean absolute amplitude, 0..1).
    pub energy_threshold: f32,
    /// Sensitivity profile for the model detector.
    pub model_sensitivity: ModelSensitivity,
    /// Contiguous trailing silence (ms) that ends an utterance.
    pub min_silence_ms: u32,
    /// Minimum utterance duration (ms) for a silence-triggered flush.
    pub min_utterance_ms: u32,
    /// Maximum utterance duration (ms) before a forced flush.
    pub max_utterance_ms: u32,
    /// Frame queue capacity, in frames.
    pub queue_capacity: usize,
    /// Dispatch channel capacity, in encoded segments.
    pub dispatch_buffer: usize,
    /// Flush a still-open segment on graceful stop instead of discarding it.
    ///
    /// Off by default: a trailing fragment below the minimum utterance
    /// duration is usually noise, not speech worth transcribing.
    pub flush_partial_on_stop: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            frame_duration_ms: defaults::FRAME_DURATION_MS,
            detector: DetectorMode::Energy,
            energy_threshold: defaults::ENERGY_THRESHOLD,
            model_sensitivity: ModelSensitivity::Quality,
            min_silence_ms: defaults::MIN_SILENCE_MS,
            min_utterance_ms: defaults::MIN_UTTERANCE_MS,
            max_utterance_ms: defaults::MAX_UTTERANCE_MS,
            queue_capacity: defaults::QUEUE_CAPACITY,
            dispatch_buffer: defaults::DISPATCH_BUFFER,
            flush_partial_on_stop: false,
        }
    }
}

impl PipelineConfig {
    /// Samples per full frame.
    pub fn frame_samples(&self) -> usize {
        (self.sample_rate as usize * self.frame_duration_ms as usize) / 1000
    }

    /// Checks threshold and timing sanity.
    ///
    /// Model-detector frame-shape validation is separate (it belongs to the
    /// detector and reports `UnsupportedFrameShape`).
    pub fn validate(&self) -> Result<()> {
        fn invalid(key: &str, message: &str) -> VocsegError {
            VocsegError::InvalidPipelineConfig {
                key: key.to_string(),
                message: message.to_string(),
            }
        }

        if self.sample_rate == 0 {
            return Err(invalid("sample_rate", "must be greater than zero"));
        }
        if self.frame_duration_ms == 0 {
            return Err(invalid("frame_duration_ms", "must be greater than zero"));
        }
        if self.frame_samples() == 0 {
            return Err(invalid(
                "frame_duration_ms",
                "frame too short for the sample rate",
            ));
        }
        if self.min_silence_ms == 0 {
            return Err(invalid("min_silence_ms", "must be greater than zero"));
        }
        if self.max_utterance_ms < self.min_utterance_ms {
            return Err(invalid(
                "max_utterance_ms",
                "must be at least min_utterance_ms",
            ));
        }
        if self.max_utterance_ms == 0 {
            return Err(invalid("max_utterance_ms", "must be greater than zero"));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("queue_capacity", "must be greater than zero"));
        }
        if self.dispatch_buffer == 0 {
            return Err(invalid("dispatch_buffer", "must be greater than zero"));
        }
        if self.detector == DetectorMode::Energy
            && !(self.energy_threshold > 0.0 && self.energy_threshold <= 1.0)
        {
            return Err(invalid(
                "energy_threshold",
                "must be within (0.0, 1.0]",
            ));
        }
        Ok(())
    }

    /// Load configuration from a TOML file.
    ///
    /// Missing fields use defaults; invalid TOML is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from a file, falling back to defaults only when it is missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(VocsegError::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported:
    /// - `VOCSEG_ENERGY_THRESHOLD` → `energy_threshold`
    /// - `VOCSEG_MAX_UTTERANCE_MS` → `max_utterance_ms`
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var("VOCSEG_ENERGY_THRESHOLD")
            && let Ok(threshold) = value.parse::<f32>()
        {
            self.energy_threshold = threshold;
        }
        if let Ok(value) = std::env::var("VOCSEG_MAX_UTTERANCE_MS")
            && let Ok(ms) = value.parse::<u32>()
        {
            self.max_utterance_ms = ms;
        }
        self
    }

    /// Default configuration file path: `~/.config/vocseg/config.toml`.
    #[cfg(feature = "cli")]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vocseg").join("config.toml"))
    }
}
