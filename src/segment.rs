//! Segment accumulation state machine.
//!
//! Consumes classified frames and decides when a run of frames constitutes a
//! complete utterance. Owned exclusively by the processing loop — single
//! writer, no locking.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::frame::{Frame, SpeechLabel};
use std::time::Instant;

/// Why a segment was flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// Enough trailing silence after a long-enough utterance.
    TrailingSilence,
    /// The segment hit the maximum utterance duration mid-stream.
    MaxDuration,
    /// Graceful stop flushed the open segment (`flush_partial_on_stop`).
    EndOfStream,
}

/// State of the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    /// No open segment; silence is discarded.
    Idle,
    /// An open segment exists and frames are being appended.
    Accumulating,
}

/// A finished utterance handed to the encoder.
///
/// Frame sample runs are kept as sub-sequences in arrival order; the encoder
/// concatenates them. The buffer is moved out of the accumulator on flush,
/// so the accumulator holds nothing afterwards.
#[derive(Debug)]
pub struct FlushedSegment {
    /// Sample runs in capture order.
    pub chunks: Vec<Vec<i16>>,
    /// Total samples across all chunks.
    pub total_samples: usize,
    /// Capture timestamp of the segment's first frame.
    pub started_at: Instant,
    /// What ended the segment.
    pub trigger: FlushTrigger,
}

impl FlushedSegment {
    /// Segment duration in milliseconds at the given sample rate.
    pub fn duration_ms(&self, sample_rate: u32) -> u32 {
        (self.total_samples as u64 * 1000 / sample_rate as u64) as u32
    }
}

/// State machine that groups classified frames into utterances.
///
/// Transitions per classified frame:
/// - Idle + silence: discard (silence before speech is never buffered).
/// - Idle + speech: open a segment.
/// - Accumulating + speech: append, reset the trailing-silence counter.
/// - Accumulating + silence: append (trailing silence is retained so the
///   utterance is not clipped), extend the counter.
/// - Flush when trailing silence and total duration clear their thresholds,
///   or unconditionally when the segment reaches the maximum duration.
///
/// All duration arithmetic is sample-count based, so behavior is
/// deterministic and independent of wall-clock timing.
pub struct SegmentAccumulator {
    sample_rate: u32,
    min_silence_samples: usize,
    min_utterance_samples: usize,
    max_utterance_samples: usize,

    state: AccumulatorState,
    chunks: Vec<Vec<i16>>,
    total_samples: usize,
    trailing_silence_samples: usize,
    started_at: Option<Instant>,
}

impl SegmentAccumulator {
    /// Creates an accumulator from a validated configuration.
    ///
    /// Threshold sanity is part of `PipelineConfig::validate`, re-checked
    /// here so the accumulator cannot be constructed in a broken shape.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let per_ms = config.sample_rate as usize;
        Ok(Self {
            sample_rate: config.sample_rate,
            min_silence_samples: per_ms * config.min_silence_ms as usize / 1000,
            min_utterance_samples: per_ms * config.min_utterance_ms as usize / 1000,
            max_utterance_samples: per_ms * config.max_utterance_ms as usize / 1000,
            state: AccumulatorState::Idle,
            chunks: Vec::new(),
            total_samples: 0,
            trailing_silence_samples: 0,
            started_at: None,
        })
    }

    /// Feeds one classified frame; returns a segment when a flush triggers.
    pub fn push(&mut self, frame: &Frame, label: SpeechLabel) -> Option<FlushedSegment> {
        match (self.state, label) {
            (AccumulatorState::Idle, SpeechLabel::Silence) => None,
            (AccumulatorState::Idle, SpeechLabel::Speech) => {
                self.state = AccumulatorState::Accumulating;
                self.started_at = Some(frame.captured_at);
                self.trailing_silence_samples = 0;
                self.append(frame);
                self.check_flush()
            }
            (AccumulatorState::Accumulating, SpeechLabel::Speech) => {
                self.trailing_silence_samples = 0;
                self.append(frame);
                self.check_flush()
            }
            (AccumulatorState::Accumulating, SpeechLabel::Silence) => {
                self.trailing_silence_samples += frame.samples.len();
                self.append(frame);
                self.check_flush()
            }
        }
    }

    /// Takes the open segment, if any, regardless of thresholds.
    ///
    /// Used by the graceful-stop path when `flush_partial_on_stop` is set.
    pub fn take_open(&mut self) -> Option<FlushedSegment> {
        if self.state == AccumulatorState::Idle {
            return None;
        }
        Some(self.flush(FlushTrigger::EndOfStream))
    }

    /// Discards the open segment, if any. Cancel path.
    pub fn discard(&mut self) {
        self.chunks.clear();
        self.total_samples = 0;
        self.trailing_silence_samples = 0;
        self.started_at = None;
        self.state = AccumulatorState::Idle;
    }

    /// Current state tag.
    pub fn state(&self) -> AccumulatorState {
        self.state
    }

    /// Duration of the open segment in milliseconds (0 when idle).
    pub fn open_duration_ms(&self) -> u32 {
        (self.total_samples as u64 * 1000 / self.sample_rate as u64) as u32
    }

    fn append(&mut self, frame: &Frame) {
        self.total_samples += frame.samples.len();
        self.chunks.push(frame.samples.clone());
    }

    fn check_flush(&mut self) -> Option<FlushedSegment> {
        // Forced flush bounds memory and latency even for unbroken speech;
        // it wins over the silence rule when both hold.
        if self.total_samples >= self.max_utterance_samples {
            return Some(self.flush(FlushTrigger::MaxDuration));
        }
        if self.trailing_silence_samples >= self.min_silence_samples
            && self.total_samples >= self.min_utterance_samples
        {
            return Some(self.flush(FlushTrigger::TrailingSilence));
        }
        None
    }

    fn flush(&mut self, trigger: FlushTrigger) -> FlushedSegment {
        let segment = FlushedSegment {
            chunks: std::mem::take(&mut self.chunks),
            total_samples: self.total_samples,
            started_at: self.started_at.unwrap_or_else(Instant::now),
            trigger,
        };
        self.total_samples = 0;
        self.trailing_silence_samples = 0;
        self.started_at = None;
        self.state = AccumulatorState::Idle;
        segment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    // 20ms frames at 16kHz = 320 samples per frame.
    const FRAME_SAMPLES: usize = 320;

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            sample_rate: 16000,
            frame_duration_ms: 20,
            min_silence_ms: 300,
            min_utterance_ms: 200,
            max_utterance_ms: 5000,
            ..PipelineConfig::default()
        }
    }

    fn speech_frame(seq: u64) -> Frame {
        Frame::new(vec![3000i16; FRAME_SAMPLES], seq, Instant::now())
    }

    fn silence_frame(seq: u64) -> Frame {
        Frame::new(vec![0i16; FRAME_SAMPLES], seq, Instant::now())
    }

    fn feed(
        acc: &mut SegmentAccumulator,
        seq: &mut u64,
        label: SpeechLabel,
        count: usize,
    ) -> Vec<FlushedSegment> {
        let mut flushed = Vec::new();
        for _ in 0..count {
            let frame = match label {
                SpeechLabel::Speech => speech_frame(*seq),
                SpeechLabel::Silence => silence_frame(*seq),
            };
            *seq += 1;
            if let Some(segment) = acc.push(&frame, label) {
                flushed.push(segment);
            }
        }
        flushed
    }

    #[test]
    fn silence_only_never_creates_a_segment() {
        let mut acc = SegmentAccumulator::new(&test_config()).unwrap();
        let mut seq = 0;
        let flushed = feed(&mut acc, &mut seq, SpeechLabel::Silence, 1000);
        assert!(flushed.is_empty());
        assert_eq!(acc.state(), AccumulatorState::Idle);
        assert!(acc.take_open().is_none());
    }

    #[test]
    fn speech_opens_a_segment() {
        let mut acc = SegmentAccumulator::new(&test_config()).unwrap();
        let mut seq = 0;
        feed(&mut acc, &mut seq, SpeechLabel::Speech, 1);
        assert_eq!(acc.state(), AccumulatorState::Accumulating);
        assert_eq!(acc.open_duration_ms(), 20);
    }

    #[test]
    fn trailing_silence_flushes_exactly_once() {
        // 15 speech frames (0.3s) then 20 silence frames (0.4s) with
        // min_silence 0.3s, min_utterance 0.2s: exactly one flush, at least
        // the 0.3s of speech retained.
        let mut acc = SegmentAccumulator::new(&test_config()).unwrap();
        let mut seq = 0;

        let mut flushed = feed(&mut acc, &mut seq, SpeechLabel::Speech, 15);
        flushed.extend(feed(&mut acc, &mut seq, SpeechLabel::Silence, 20));

        assert_eq!(flushed.len(), 1, "expected exactly one flush");
        let segment = &flushed[0];
        assert_eq!(segment.trigger, FlushTrigger::TrailingSilence);
        assert!(segment.duration_ms(16000) >= 300);
        assert_eq!(acc.state(), AccumulatorState::Idle);
    }

    #[test]
    fn silence_flush_respects_minimum_utterance() {
        // 3 speech frames (0.06s) is below min_utterance (0.2s): trailing
        // silence alone must never flush it.
        let mut acc = SegmentAccumulator::new(&test_config()).unwrap();
        let mut seq = 0;

        let mut flushed = feed(&mut acc, &mut seq, SpeechLabel::Speech, 3);
        // 14 silence frames: 280ms of silence, below the 300ms threshold.
        flushed.extend(feed(&mut acc, &mut seq, SpeechLabel::Silence, 14));
        assert!(flushed.is_empty());

        // The trailing silence also counts into the total duration, so by
        // the time the silence threshold is met the segment as a whole has
        // cleared min_utterance and flushes.
        let flushed = feed(&mut acc, &mut seq, SpeechLabel::Silence, 1);
        assert_eq!(flushed.len(), 1);
        assert!(flushed[0].duration_ms(16000) >= 200);
    }

    #[test]
    fn speech_resets_trailing_silence_counter() {
        let mut acc = SegmentAccumulator::new(&test_config()).unwrap();
        let mut seq = 0;

        // speech, then silence just below the 300ms threshold (14 frames =
        // 280ms), then speech again: no flush.
        let mut flushed = feed(&mut acc, &mut seq, SpeechLabel::Speech, 15);
        flushed.extend(feed(&mut acc, &mut seq, SpeechLabel::Silence, 14));
        flushed.extend(feed(&mut acc, &mut seq, SpeechLabel::Speech, 1));
        assert!(flushed.is_empty());

        // The counter restarted: another 14 silence frames still do not flush.
        let flushed = feed(&mut acc, &mut seq, SpeechLabel::Silence, 14);
        assert!(flushed.is_empty());

        // The 15th crosses 300ms and flushes.
        let flushed = feed(&mut acc, &mut seq, SpeechLabel::Silence, 1);
        assert_eq!(flushed.len(), 1);
    }

    #[test]
    fn unbroken_speech_force_flushes_at_max_duration() {
        // 300 contiguous speech frames (6.0s): exactly one flush at the
        // 5.0s boundary, then a new segment opens from the next frame.
        let mut acc = SegmentAccumulator::new(&test_config()).unwrap();
        let mut seq = 0;

        let flushed = feed(&mut acc, &mut seq, SpeechLabel::Speech, 300);
        assert_eq!(flushed.len(), 1);
        let segment = &flushed[0];
        assert_eq!(segment.trigger, FlushTrigger::MaxDuration);
        assert_eq!(segment.duration_ms(16000), 5000);

        // The remaining 50 frames (1.0s) are accumulating in a new segment.
        assert_eq!(acc.state(), AccumulatorState::Accumulating);
        assert_eq!(acc.open_duration_ms(), 1000);
    }

    #[test]
    fn force_flush_ignores_trailing_classification() {
        // Continuous alternation never yields 300ms of contiguous silence,
        // so only the max-duration rule can end the segment.
        let mut acc = SegmentAccumulator::new(&test_config()).unwrap();
        let mut seq = 0;
        let mut flushed = Vec::new();
        for _ in 0..200 {
            flushed.extend(feed(&mut acc, &mut seq, SpeechLabel::Speech, 1));
            flushed.extend(feed(&mut acc, &mut seq, SpeechLabel::Silence, 1));
        }
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].trigger, FlushTrigger::MaxDuration);
        assert!(flushed[0].duration_ms(16000) >= 5000);
    }

    #[test]
    fn chunks_preserve_arrival_order() {
        let mut acc = SegmentAccumulator::new(&test_config()).unwrap();
        let mut frames = Vec::new();
        for i in 0..15u64 {
            // Distinct fill value per frame so order is checkable.
            frames.push(Frame::new(
                vec![(i as i16 + 1) * 100; FRAME_SAMPLES],
                i,
                Instant::now(),
            ));
        }
        for frame in &frames {
            assert!(acc.push(frame, SpeechLabel::Speech).is_none());
        }
        let segment = acc.take_open().expect("segment should be open");
        assert_eq!(segment.chunks.len(), 15);
        for (i, chunk) in segment.chunks.iter().enumerate() {
            assert_eq!(chunk[0], (i as i16 + 1) * 100);
        }
    }

    #[test]
    fn take_open_returns_partial_segment() {
        let mut acc = SegmentAccumulator::new(&test_config()).unwrap();
        let mut seq = 0;
        feed(&mut acc, &mut seq, SpeechLabel::Speech, 3);

        let segment = acc.take_open().expect("open segment expected");
        assert_eq!(segment.trigger, FlushTrigger::EndOfStream);
        assert_eq!(segment.total_samples, 3 * FRAME_SAMPLES);
        assert_eq!(acc.state(), AccumulatorState::Idle);
    }

    #[test]
    fn discard_drops_open_segment() {
        let mut acc = SegmentAccumulator::new(&test_config()).unwrap();
        let mut seq = 0;
        feed(&mut acc, &mut seq, SpeechLabel::Speech, 10);
        acc.discard();
        assert_eq!(acc.state(), AccumulatorState::Idle);
        assert!(acc.take_open().is_none());
        assert_eq!(acc.open_duration_ms(), 0);
    }

    #[test]
    fn partial_frames_count_by_sample_length() {
        // A short trailing frame contributes its real duration, not the
        // nominal frame duration.
        let mut acc = SegmentAccumulator::new(&test_config()).unwrap();
        let frame = Frame::new(vec![3000i16; 160], 0, Instant::now()); // 10ms
        assert!(acc.push(&frame, SpeechLabel::Speech).is_none());
        assert_eq!(acc.open_duration_ms(), 10);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = PipelineConfig {
            min_silence_ms: 0,
            ..test_config()
        };
        assert!(SegmentAccumulator::new(&config).is_err());

        let config = PipelineConfig {
            min_utterance_ms: 6000,
            max_utterance_ms: 5000,
            ..test_config()
        };
        assert!(SegmentAccumulator::new(&config).is_err());
    }
}
