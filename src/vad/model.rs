//! Model-based voice activity detection backed by `earshot`.

use crate::config::ModelSensitivity;
use crate::error::{Result, VocsegError};
use crate::frame::{Classification, SpeechLabel};
use crate::vad::{VoiceActivityDetector, mean_amplitude};
use earshot::{VoiceActivityDetector as Earshot, VoiceActivityProfile};

/// Sample rates the model detector accepts.
const SUPPORTED_RATES: &[u32] = &[8000, 16000, 32000, 48000];

/// Frame durations (ms) the model detector accepts.
const SUPPORTED_DURATIONS_MS: &[u32] = &[10, 20, 30];

/// WebRTC-profile detector with fixed frame-shape requirements.
///
/// Frame duration must be 10/20/30ms at 8/16/32/48kHz; anything else is a
/// configuration error caught in `new`. A frame shorter than the required
/// length (end-of-stream partial) classifies as silence — the model is never
/// fed a short frame.
pub struct ModelVad {
    detector: Earshot,
    sample_rate: u32,
    frame_samples: usize,
}

impl std::fmt::Debug for ModelVad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelVad")
            .field("sample_rate", &self.sample_rate)
            .field("frame_samples", &self.frame_samples)
            .finish_non_exhaustive()
    }
}

impl ModelVad {
    /// Creates a model detector, validating the frame shape once.
    pub fn new(
        sample_rate: u32,
        frame_duration_ms: u32,
        sensitivity: ModelSensitivity,
    ) -> Result<Self> {
        if !SUPPORTED_RATES.contains(&sample_rate)
            || !SUPPORTED_DURATIONS_MS.contains(&frame_duration_ms)
        {
            return Err(VocsegError::UnsupportedFrameShape {
                frame_duration_ms,
                sample_rate,
            });
        }

        let profile = match sensitivity {
            ModelSensitivity::Quality => VoiceActivityProfile::QUALITY,
            ModelSensitivity::LowBitrate => VoiceActivityProfile::LBR,
            ModelSensitivity::Aggressive => VoiceActivityProfile::AGGRESSIVE,
            ModelSensitivity::VeryAggressive => VoiceActivityProfile::VERY_AGGRESSIVE,
        };

        let frame_samples = (sample_rate as usize * frame_duration_ms as usize) / 1000;

        Ok(Self {
            detector: Earshot::new(profile),
            sample_rate,
            frame_samples,
        })
    }

    /// Samples per full frame at the validated shape.
    pub fn frame_samples(&self) -> usize {
        self.frame_samples
    }

    fn predict(&mut self, samples: &[i16]) -> Option<bool> {
        match self.sample_rate {
            8000 => self.detector.predict_8khz(samples),
            16000 => self.detector.predict_16khz(samples),
            32000 => self.detector.predict_32khz(samples),
            _ => self.detector.predict_48khz(samples),
        }
        .ok()
    }
}

impl VoiceActivityDetector for ModelVad {
    fn classify(&mut self, samples: &[i16]) -> Classification {
        let level = mean_amplitude(samples);

        // Partial frames cannot be fed to the model; treat as silence so the
        // stream keeps moving.
        if samples.len() < self.frame_samples {
            return Classification {
                label: SpeechLabel::Silence,
                level,
            };
        }

        let label = match self.predict(&samples[..self.frame_samples]) {
            Some(true) => SpeechLabel::Speech,
            // A detector-internal error degrades to silence; forward progress
            // beats a perfect decision here.
            Some(false) | None => SpeechLabel::Silence,
        };
        Classification { label, level }
    }

    fn reset(&mut self) {
        self.detector.reset();
    }

    fn name(&self) -> &'static str {
        "model"
    }
}
