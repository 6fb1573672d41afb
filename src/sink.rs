//! Segment sinks and error reporting.
//!
//! A `SegmentSink` is the transcription-service boundary: it receives each
//! encoded utterance with its metadata and is free to be slow or to fail —
//! dispatch runs on its own thread and sink errors go to the
//! `ErrorReporter` side channel, never back into the pipeline.

use crate::encoder::{EncodedSegment, SegmentMeta};
use crate::error::{Result, VocsegError};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Pluggable consumer of finished segments.
pub trait SegmentSink: Send + 'static {
    /// Handle one encoded segment. Called in flush order.
    fn dispatch(&mut self, segment: EncodedSegment, meta: SegmentMeta) -> Result<()>;

    /// Called once on pipeline shutdown, after the last dispatch.
    fn finish(&mut self) {}

    /// Name for logging and diagnostics.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Side channel for non-fatal pipeline errors.
///
/// Frame- and segment-local failures (encoding, sink dispatch, dispatch
/// overflow) are reported here and the stream continues.
pub trait ErrorReporter: Send + Sync {
    /// Reports an error from the named pipeline stage.
    fn report(&self, stage: &str, error: &VocsegError);
}

/// Reporter that logs to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, stage: &str, error: &VocsegError) {
        eprintln!("vocseg: [{}] {}", stage, error);
    }
}

/// Sink that collects segments in memory. For tests and programmatic use.
#[derive(Clone, Default)]
pub struct CollectorSink {
    segments: Arc<Mutex<Vec<(EncodedSegment, SegmentMeta)>>>,
    finished: Arc<Mutex<bool>>,
}

impl CollectorSink {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything dispatched so far.
    pub fn collected(&self) -> Vec<(EncodedSegment, SegmentMeta)> {
        match self.segments.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of segments dispatched so far.
    pub fn len(&self) -> usize {
        match self.segments.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// True if nothing has been dispatched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once the pipeline has called `finish`.
    pub fn is_finished(&self) -> bool {
        match self.finished.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl SegmentSink for CollectorSink {
    fn dispatch(&mut self, segment: EncodedSegment, meta: SegmentMeta) -> Result<()> {
        match self.segments.lock() {
            Ok(mut guard) => guard.push((segment, meta)),
            Err(poisoned) => poisoned.into_inner().push((segment, meta)),
        }
        Ok(())
    }

    fn finish(&mut self) {
        match self.finished.lock() {
            Ok(mut guard) => *guard = true,
            Err(poisoned) => *poisoned.into_inner() = true,
        }
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

/// Sink that writes each segment as a numbered WAV file in a directory.
///
/// Stand-in for the transcription handoff: downstream tooling picks the
/// files up by sequence number.
pub struct WavDirSink {
    dir: PathBuf,
    prefix: String,
}

impl WavDirSink {
    /// Creates the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            prefix: "segment".to_string(),
        })
    }

    /// Sets the file name prefix (default "segment").
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    fn path_for(&self, sequence: u64) -> PathBuf {
        self.dir.join(format!("{}-{:05}.wav", self.prefix, sequence))
    }
}

impl SegmentSink for WavDirSink {
    fn dispatch(&mut self, segment: EncodedSegment, meta: SegmentMeta) -> Result<()> {
        let path = self.path_for(meta.sequence);
        fs::write(&path, &segment.bytes).map_err(|e| VocsegError::Sink {
            message: format!("failed to write {}: {}", path.display(), e),
        })
    }

    fn name(&self) -> &'static str {
        "wav-dir"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::FlushTrigger;
    use std::time::Instant;

    fn encoded(n: usize) -> EncodedSegment {
        EncodedSegment {
            bytes: vec![0u8; n],
            sample_rate: 16000,
            channels: 1,
        }
    }

    fn meta(sequence: u64) -> SegmentMeta {
        SegmentMeta {
            sequence,
            started_at: Instant::now(),
            duration_ms: 500,
            trigger: FlushTrigger::TrailingSilence,
        }
    }

    #[test]
    fn collector_records_in_dispatch_order() {
        let mut sink = CollectorSink::new();
        sink.dispatch(encoded(10), meta(0)).unwrap();
        sink.dispatch(encoded(20), meta(1)).unwrap();

        let collected = sink.collected();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].1.sequence, 0);
        assert_eq!(collected[1].1.sequence, 1);
        assert_eq!(collected[1].0.bytes.len(), 20);
    }

    #[test]
    fn collector_clones_share_storage() {
        let sink = CollectorSink::new();
        let mut writer = sink.clone();
        writer.dispatch(encoded(5), meta(0)).unwrap();
        assert_eq!(sink.len(), 1);
        assert!(!sink.is_finished());
        writer.finish();
        assert!(sink.is_finished());
    }

    #[test]
    fn wav_dir_sink_writes_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = WavDirSink::new(dir.path()).unwrap().with_prefix("utt");

        sink.dispatch(encoded(44), meta(0)).unwrap();
        sink.dispatch(encoded(44), meta(7)).unwrap();

        assert!(dir.path().join("utt-00000.wav").exists());
        assert!(dir.path().join("utt-00007.wav").exists());
    }

    #[test]
    fn wav_dir_sink_reports_write_failure_as_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = WavDirSink::new(dir.path()).unwrap();
        // Remove the directory out from under the sink.
        drop(sink.dispatch(encoded(4), meta(0)));
        fs::remove_dir_all(dir.path()).unwrap();

        match sink.dispatch(encoded(4), meta(1)) {
            Err(VocsegError::Sink { .. }) => {}
            other => panic!("expected Sink error, got {:?}", other),
        }
    }

    #[test]
    fn log_reporter_does_not_panic() {
        let reporter = LogReporter;
        reporter.report(
            "encoder",
            &VocsegError::Encoding {
                message: "test".to_string(),
            },
        );
    }
}
