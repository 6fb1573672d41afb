//! vocseg - Real-time utterance segmentation for speech pipelines
//!
//! Splits a continuous audio stream into discrete utterance segments using
//! voice-activity detection, and hands each one off as an encoded WAV ready
//! for transcription.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod capture;
#[cfg(feature = "cpal-audio")]
pub mod capture_cpal;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod queue;
pub mod segment;
pub mod sink;
pub mod vad;

// Core traits (source → process → sink)
pub use capture::{CaptureSource, MockCaptureSource, WavCaptureSource};
pub use sink::{CollectorSink, ErrorReporter, LogReporter, SegmentSink, WavDirSink};
pub use vad::VoiceActivityDetector;

// Pipeline
pub use pipeline::{Pipeline, PipelineHandle, PipelineState};

// Configuration
pub use config::{DetectorMode, ModelSensitivity, PipelineConfig};

// Segment types
pub use encoder::{EncodedSegment, SegmentMeta};
pub use segment::FlushTrigger;

// Error handling
pub use error::{Result, VocsegError};
