//! Default configuration constants for vocseg.
//!
//! Shared across `PipelineConfig` and the CLI so both surfaces agree on
//! tuning values.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and is the rate the
/// downstream transcription services expect.
pub const SAMPLE_RATE: u32 = 16000;

/// Default frame duration in milliseconds.
///
/// 20ms is in the middle of the 10/20/30ms set supported by the model-based
/// detector and keeps per-frame overhead low.
pub const FRAME_DURATION_MS: u32 = 20;

/// Default energy threshold for the amplitude detector.
///
/// Mean absolute normalized amplitude (0.0 to 1.0). A frame above this is
/// speech. 0.005 is deliberately low so quiet speech is not clipped; the
/// minimum-utterance guard filters the false positives this admits.
pub const ENERGY_THRESHOLD: f32 = 0.005;

/// Default trailing-silence duration (ms) that ends an utterance.
pub const MIN_SILENCE_MS: u32 = 300;

/// Default minimum utterance duration in milliseconds.
///
/// Candidate segments shorter than this are never flushed on silence; a
/// stray speech frame followed by quiet does not produce a segment.
pub const MIN_UTTERANCE_MS: u32 = 500;

/// Default maximum utterance duration in milliseconds.
///
/// An open segment reaching this length is force-flushed even mid-speech.
/// Bounds both memory and downstream latency during continuous speech.
pub const MAX_UTTERANCE_MS: u32 = 5000;

/// Default frame queue capacity, in frames.
///
/// Sized to absorb roughly one second of capture jitter at the default
/// frame duration before the queue starts evicting.
pub const QUEUE_CAPACITY: usize = 50;

/// Default dispatch channel capacity, in encoded segments.
pub const DISPATCH_BUFFER: usize = 16;
