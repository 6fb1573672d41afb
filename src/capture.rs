//! Capture source boundary.
//!
//! The pipeline treats the audio device as an external collaborator behind
//! the `CaptureSource` trait. Implementations here: a mock for tests and a
//! WAV reader for file/pipe input. The live microphone source lives in
//! `capture_cpal` behind the `cpal-audio` feature.

use crate::error::{Result, VocsegError};
use std::io::Read;

/// Trait for audio capture devices.
///
/// Allows swapping implementations (live device, WAV file, mock). Read
/// errors are device-level and fatal to the current pipeline run.
pub trait CaptureSource: Send {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Read whatever samples are currently available.
    ///
    /// An empty vector from a finite source means end of stream; from a
    /// live source it means no data yet.
    fn read_samples(&mut self) -> Result<Vec<i16>>;

    /// True for sources that end on their own (files, pipes).
    fn is_finite(&self) -> bool {
        false
    }
}

/// Mock capture source for tests.
#[derive(Debug, Clone)]
pub struct MockCaptureSource {
    batches: Vec<Vec<i16>>,
    position: usize,
    is_started: bool,
    should_fail_start: bool,
    fail_read_at: Option<usize>,
    error_message: String,
}

impl MockCaptureSource {
    /// Creates a mock that yields no samples.
    pub fn new() -> Self {
        Self {
            batches: Vec::new(),
            position: 0,
            is_started: false,
            should_fail_start: false,
            fail_read_at: None,
            error_message: "mock capture error".to_string(),
        }
    }

    /// Yields the given batches in order, then reports end of stream.
    pub fn with_batches(mut self, batches: Vec<Vec<i16>>) -> Self {
        self.batches = batches;
        self
    }

    /// Fail `start()` with the configured message.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Fail the n-th `read_samples()` call (0-based).
    pub fn with_read_failure_at(mut self, read_index: usize) -> Self {
        self.fail_read_at = Some(read_index);
        self
    }

    /// Sets the error message used by injected failures.
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Whether `start()` has been called without a matching `stop()`.
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockCaptureSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for MockCaptureSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            return Err(VocsegError::CaptureDevice {
                message: self.error_message.clone(),
            });
        }
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.fail_read_at == Some(self.position) {
            return Err(VocsegError::CaptureDevice {
                message: self.error_message.clone(),
            });
        }
        let batch = self.batches.get(self.position).cloned().unwrap_or_default();
        self.position += 1;
        Ok(batch)
    }

    fn is_finite(&self) -> bool {
        true
    }
}

/// Finite capture source backed by WAV data.
///
/// Accepts mono or stereo input (stereo is downmixed by averaging) but
/// rejects a sample-rate mismatch outright — this pipeline assumes a fixed,
/// pre-negotiated rate and does not resample.
pub struct WavCaptureSource {
    samples: Vec<i16>,
    position: usize,
    chunk_size: usize,
}

impl WavCaptureSource {
    /// Parses WAV data from any reader, requiring `expected_rate`.
    pub fn from_reader(reader: Box<dyn Read + Send>, expected_rate: u32) -> Result<Self> {
        let mut wav_reader =
            hound::WavReader::new(reader).map_err(|e| VocsegError::CaptureDevice {
                message: format!("failed to parse WAV input: {}", e),
            })?;

        let spec = wav_reader.spec();
        if spec.sample_rate != expected_rate {
            return Err(VocsegError::AudioFormatMismatch {
                expected: format!("{}Hz", expected_rate),
                actual: format!("{}Hz", spec.sample_rate),
            });
        }
        if spec.channels == 0 || spec.channels > 2 {
            return Err(VocsegError::AudioFormatMismatch {
                expected: "mono or stereo".to_string(),
                actual: format!("{} channels", spec.channels),
            });
        }

        let raw: Vec<i16> = wav_reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| VocsegError::CaptureDevice {
                message: format!("failed to read WAV samples: {}", e),
            })?;

        let samples = if spec.channels == 2 {
            raw.chunks_exact(2)
                .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
                .collect()
        } else {
            raw
        };

        Ok(Self {
            samples,
            position: 0,
            // 100ms reads; the pipeline reframes to its own frame size.
            chunk_size: (expected_rate / 10) as usize,
        })
    }

    /// Reads WAV data from stdin.
    pub fn from_stdin(expected_rate: u32) -> Result<Self> {
        use std::io::Cursor;

        // StdinLock is not Send; buffer everything first.
        let mut buffer = Vec::new();
        std::io::stdin()
            .lock()
            .read_to_end(&mut buffer)
            .map_err(|e| VocsegError::CaptureDevice {
                message: format!("failed to read from stdin: {}", e),
            })?;
        Self::from_reader(Box::new(Cursor::new(buffer)), expected_rate)
    }

    /// Total samples remaining.
    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }
}

impl CaptureSource for WavCaptureSource {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.position >= self.samples.len() {
            return Ok(Vec::new());
        }
        let end = std::cmp::min(self.position + self.chunk_size, self.samples.len());
        let chunk = self.samples[self.position..end].to_vec();
        self.position = end;
        Ok(chunk)
    }

    fn is_finite(&self) -> bool {
        true
    }
}
