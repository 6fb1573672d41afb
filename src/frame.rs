//! Audio frames and per-frame classification results.

use std::time::Instant;

/// A fixed-duration block of mono 16-bit PCM samples.
///
/// The atomic unit moving through the pipeline. Immutable after creation;
/// every frame in a single run shares the same sample rate and nominal
/// duration. A trailing frame with fewer samples can occur only at end of
/// stream.
#[derive(Debug, Clone)]
pub struct Frame {
    /// PCM samples (16-bit signed integers).
    pub samples: Vec<i16>,
    /// Monotonically increasing sequence number assigned at capture time.
    pub sequence: u64,
    /// Timestamp when this frame was captured.
    pub captured_at: Instant,
}

impl Frame {
    /// Creates a new frame.
    pub fn new(samples: Vec<i16>, sequence: u64, captured_at: Instant) -> Self {
        Self {
            samples,
            sequence,
            captured_at,
        }
    }
}

/// Speech/silence tag attached to a frame by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechLabel {
    Speech,
    Silence,
}

impl SpeechLabel {
    /// Returns true for `Speech`.
    pub fn is_speech(self) -> bool {
        matches!(self, SpeechLabel::Speech)
    }
}

/// Result of classifying one frame.
///
/// Exists only for the duration of one processing-loop iteration; nothing
/// persists it.
#[derive(Debug, Clone, Copy)]
pub struct Classification {
    /// The speech/silence decision.
    pub label: SpeechLabel,
    /// Mean absolute normalized amplitude of the frame (0.0 to 1.0).
    pub level: f32,
}

/// Reassembles arbitrarily-sized capture reads into fixed-size frames.
///
/// Capture sources deliver whatever batch the device hands them; the
/// pipeline needs exact frame boundaries. Leftover samples stay buffered
/// until the next read; `take_remainder` drains the final partial frame at
/// end of stream.
#[derive(Debug)]
pub struct Framer {
    buffer: Vec<i16>,
    frame_samples: usize,
}

impl Framer {
    /// Creates a framer emitting frames of `frame_samples` samples.
    pub fn new(frame_samples: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(frame_samples * 2),
            frame_samples,
        }
    }

    /// Appends captured samples and returns every complete frame now available.
    pub fn extend(&mut self, samples: &[i16]) -> Vec<Vec<i16>> {
        self.buffer.extend_from_slice(samples);

        let mut frames = Vec::new();
        while self.buffer.len() >= self.frame_samples {
            let rest = self.buffer.split_off(self.frame_samples);
            frames.push(std::mem::replace(&mut self.buffer, rest));
        }
        frames
    }

    /// Drains the buffered partial frame, if any. Call at end of stream.
    pub fn take_remainder(&mut self) -> Option<Vec<i16>> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    /// Number of samples currently buffered below one frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
