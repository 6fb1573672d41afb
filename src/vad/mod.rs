//! Voice activity detection.
//!
//! Two interchangeable strategies behind one trait: a mean-amplitude
//! threshold (`EnergyVad`) and a WebRTC-profile model detector (`ModelVad`).
//! Strategy selection and frame-shape validation happen once, at pipeline
//! construction.

pub mod energy;
pub mod model;

pub use energy::EnergyVad;
pub use model::ModelVad;

use crate::config::{DetectorMode, PipelineConfig};
use crate::error::Result;
use crate::frame::Classification;

/// Classifies one frame of samples as speech or silence.
///
/// Implementations must not block, must not allocate unboundedly, and must
/// complete in time proportional to the frame length — the detector has to
/// keep up with real time. Frames shorter than the detector's required
/// length classify as silence rather than erroring, so the processing loop
/// always makes forward progress.
pub trait VoiceActivityDetector: Send {
    /// Classifies the samples of one frame.
    fn classify(&mut self, samples: &[i16]) -> Classification;

    /// Resets any adaptive internal state.
    fn reset(&mut self) {}

    /// Name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Builds the detector selected by the configuration.
///
/// Fails with `UnsupportedFrameShape` if the model detector is selected and
/// the configured frame duration or sample rate is outside its supported
/// set. Validated here once, never per frame.
pub fn build_detector(config: &PipelineConfig) -> Result<Box<dyn VoiceActivityDetector>> {
    match config.detector {
        DetectorMode::Energy => Ok(Box::new(EnergyVad::new(config.energy_threshold))),
        DetectorMode::Model => {
            let vad = ModelVad::new(
                config.sample_rate,
                config.frame_duration_ms,
                config.model_sensitivity,
            )?;
            Ok(Box::new(vad))
        }
    }
}

/// Mean absolute normalized amplitude of a frame (0.0 to 1.0).
///
/// 0.0 is silence; 1.0 is a full-scale square wave. This is the energy
/// measure the threshold detector compares, and the level both detectors
/// report for diagnostics.
pub fn mean_amplitude(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples
        .iter()
        .map(|&s| (s as f64 / i16::MAX as f64).abs())
        .sum();
    (sum / samples.len() as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelSensitivity;
    use crate::frame::SpeechLabel;

    #[test]
    fn mean_amplitude_of_silence_is_zero() {
        assert_eq!(mean_amplitude(&vec![0i16; 320]), 0.0);
    }

    #[test]
    fn mean_amplitude_of_empty_frame_is_zero() {
        assert_eq!(mean_amplitude(&[]), 0.0);
    }

    #[test]
    fn mean_amplitude_of_full_scale_is_near_one() {
        let amp = mean_amplitude(&vec![i16::MAX; 320]);
        assert!((amp - 1.0).abs() < 0.001, "expected ~1.0, got {}", amp);
    }

    #[test]
    fn mean_amplitude_counts_negative_samples() {
        let amp = mean_amplitude(&vec![i16::MIN; 320]);
        assert!(amp > 0.99, "expected ~1.0 for i16::MIN, got {}", amp);
    }

    #[test]
    fn build_detector_energy_mode() {
        let config = PipelineConfig::default();
        let mut detector = build_detector(&config).unwrap();
        assert_eq!(detector.name(), "energy");

        let c = detector.classify(&vec![0i16; 320]);
        assert_eq!(c.label, SpeechLabel::Silence);
    }

    #[test]
    fn build_detector_model_mode_valid_shape() {
        let config = PipelineConfig {
            detector: DetectorMode::Model,
            sample_rate: 16000,
            frame_duration_ms: 20,
            model_sensitivity: ModelSensitivity::Quality,
            ..PipelineConfig::default()
        };
        let detector = build_detector(&config).unwrap();
        assert_eq!(detector.name(), "model");
    }

    #[test]
    fn build_detector_model_mode_rejects_bad_shape() {
        let config = PipelineConfig {
            detector: DetectorMode::Model,
            sample_rate: 44100,
            frame_duration_ms: 20,
            ..PipelineConfig::default()
        };
        assert!(build_detector(&config).is_err());
    }
}
