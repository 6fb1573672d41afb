//! Amplitude-threshold voice activity detection.

use crate::frame::{Classification, SpeechLabel};
use crate::vad::{VoiceActivityDetector, mean_amplitude};

/// Detector that compares mean absolute amplitude against a fixed threshold.
///
/// Stateless and length-agnostic: it classifies partial end-of-stream frames
/// the same way as full ones. An empty frame is silence.
#[derive(Debug, Clone, Copy)]
pub struct EnergyVad {
    threshold: f32,
}

impl EnergyVad {
    /// Creates a detector with the given normalized amplitude threshold.
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// The configured threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl VoiceActivityDetector for EnergyVad {
    fn classify(&mut self, samples: &[i16]) -> Classification {
        let level = mean_amplitude(samples);
        let label = if level > self.threshold {
            SpeechLabel::Speech
        } else {
            SpeechLabel::Silence
        };
        Classification { label, level }
    }

    fn name(&self) -> &'static str {
        "energy"
    }
}
