//! Deterministic WAV serialization of flushed segments.

use crate::error::{Result, VocsegError};
use crate::segment::{FlushTrigger, FlushedSegment};
use std::io::Cursor;
use std::time::Instant;

/// An encoded utterance in canonical container form.
///
/// Ownership passes to the sink on dispatch; the pipeline keeps no
/// reference to it.
#[derive(Debug, Clone)]
pub struct EncodedSegment {
    /// Complete RIFF/WAV bytes (16-bit PCM).
    pub bytes: Vec<u8>,
    /// Sample rate of the payload.
    pub sample_rate: u32,
    /// Channel count (always 1 in this pipeline).
    pub channels: u16,
}

/// Pipeline-assigned metadata accompanying an encoded segment.
#[derive(Debug, Clone)]
pub struct SegmentMeta {
    /// Flush-order sequence number, starting at 0.
    pub sequence: u64,
    /// Capture timestamp of the segment's first frame.
    pub started_at: Instant,
    /// Payload duration in milliseconds.
    pub duration_ms: u32,
    /// What ended the segment.
    pub trigger: FlushTrigger,
}

/// Serializes accumulated sample runs into a WAV byte buffer.
///
/// Concatenation preserves arrival order exactly — this is the recorded
/// time order of speech. Encoding the same sample sequence twice yields
/// byte-identical output.
pub struct SegmentEncoder {
    spec: hound::WavSpec,
}

impl SegmentEncoder {
    /// Creates an encoder for 16-bit mono PCM at the given rate.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            spec: hound::WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
        }
    }

    /// Encodes a flushed segment into an in-memory WAV container.
    pub fn encode(&self, segment: &FlushedSegment) -> Result<EncodedSegment> {
        let mut cursor = Cursor::new(Vec::with_capacity(44 + segment.total_samples * 2));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, self.spec).map_err(|e| {
                VocsegError::Encoding {
                    message: format!("failed to start WAV container: {}", e),
                }
            })?;
            let mut samples = writer.get_i16_writer(segment.total_samples as u32);
            for chunk in &segment.chunks {
                for &sample in chunk {
                    samples.write_sample(sample);
                }
            }
            samples.flush().map_err(|e| VocsegError::Encoding {
                message: format!("failed to write samples: {}", e),
            })?;
            writer.finalize().map_err(|e| VocsegError::Encoding {
                message: format!("failed to finalize WAV container: {}", e),
            })?;
        }
        Ok(EncodedSegment {
            bytes: cursor.into_inner(),
            sample_rate: self.spec.sample_rate,
            channels: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn segment(chunks: Vec<Vec<i16>>) -> FlushedSegment {
        let total_samples = chunks.iter().map(Vec::len).sum();
        FlushedSegment {
            chunks,
            total_samples,
            started_at: Instant::now(),
            trigger: FlushTrigger::TrailingSilence,
        }
    }

    fn decode(bytes: &[u8]) -> (hound::WavSpec, Vec<i16>) {
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        let samples = reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        (spec, samples)
    }

    #[test]
    fn encode_is_lossless_and_order_preserving() {
        let encoder = SegmentEncoder::new(16000);
        let encoded = encoder
            .encode(&segment(vec![vec![1, 2, 3], vec![4, 5], vec![6]]))
            .unwrap();

        let (spec, samples) = decode(&encoded.bytes);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(samples, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn encode_is_deterministic() {
        let encoder = SegmentEncoder::new(16000);
        let a = encoder.encode(&segment(vec![vec![10; 320], vec![-7; 320]])).unwrap();
        let b = encoder.encode(&segment(vec![vec![10; 320], vec![-7; 320]])).unwrap();
        assert_eq!(a.bytes, b.bytes, "same samples must encode byte-identically");
    }

    #[test]
    fn chunk_boundaries_do_not_affect_output() {
        let encoder = SegmentEncoder::new(16000);
        let split = encoder.encode(&segment(vec![vec![1, 2], vec![3, 4]])).unwrap();
        let flat = encoder.encode(&segment(vec![vec![1, 2, 3, 4]])).unwrap();
        assert_eq!(split.bytes, flat.bytes);
    }

    #[test]
    fn empty_segment_encodes_header_only() {
        let encoder = SegmentEncoder::new(16000);
        let encoded = encoder.encode(&segment(vec![])).unwrap();
        let (_, samples) = decode(&encoded.bytes);
        assert!(samples.is_empty());
        assert_eq!(encoded.bytes.len(), 44); // RIFF + fmt + data headers
    }

    #[test]
    fn sample_rate_carried_in_header() {
        let encoder = SegmentEncoder::new(48000);
        let encoded = encoder.encode(&segment(vec![vec![0; 480]])).unwrap();
        let (spec, _) = decode(&encoded.bytes);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(encoded.sample_rate, 48000);
    }

    #[test]
    fn extreme_sample_values_round_trip() {
        let encoder = SegmentEncoder::new(16000);
        let encoded = encoder
            .encode(&segment(vec![vec![i16::MIN, -1, 0, 1, i16::MAX]]))
            .unwrap();
        let (_, samples) = decode(&encoded.bytes);
        assert_eq!(samples, vec![i16::MIN, -1, 0, 1, i16::MAX]);
    }
}
