//! Error types for vocseg.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VocsegError {
    // Configuration errors — detected at construction, fatal to startup,
    // never raised mid-stream.
    #[error("Invalid pipeline configuration for {key}: {message}")]
    InvalidPipelineConfig { key: String, message: String },

    #[error(
        "Unsupported frame shape for model VAD: {frame_duration_ms}ms at {sample_rate}Hz \
         (supported: 10/20/30ms at 8/16/32/48kHz)"
    )]
    UnsupportedFrameShape {
        frame_duration_ms: u32,
        sample_rate: u32,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Capture errors — fatal to the current run.
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio format mismatch: expected {expected}, got {actual}")]
    AudioFormatMismatch { expected: String, actual: String },

    #[error("Capture device error: {message}")]
    CaptureDevice { message: String },

    // Segment-local errors — contained, the stream continues.
    #[error("Segment encoding failed: {message}")]
    Encoding { message: String },

    #[error("Sink dispatch failed: {message}")]
    Sink { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VocsegError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn invalid_pipeline_config_display() {
        let error = VocsegError::InvalidPipelineConfig {
            key: "min_silence_ms".to_string(),
            message: "must be greater than zero".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid pipeline configuration for min_silence_ms: must be greater than zero"
        );
    }

    #[test]
    fn unsupported_frame_shape_display_names_both_fields() {
        let error = VocsegError::UnsupportedFrameShape {
            frame_duration_ms: 25,
            sample_rate: 44100,
        };
        let msg = error.to_string();
        assert!(msg.contains("25ms"));
        assert!(msg.contains("44100Hz"));
    }

    #[test]
    fn capture_device_display() {
        let error = VocsegError::CaptureDevice {
            message: "device disconnected".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Capture device error: device disconnected"
        );
    }

    #[test]
    fn encoding_display() {
        let error = VocsegError::Encoding {
            message: "allocation failed".to_string(),
        };
        assert_eq!(error.to_string(), "Segment encoding failed: allocation failed");
    }

    #[test]
    fn from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: VocsegError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<VocsegError>();
        assert_sync::<VocsegError>();
    }

    #[test]
    fn result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }
}
