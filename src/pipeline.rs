//! Pipeline controller: capture → queue → classify → accumulate → dispatch.
//!
//! Three long-lived threads. The capture thread polls the source and pushes
//! fixed-size frames into the queue (never blocking). The processing thread
//! owns the detector and accumulator exclusively and blocks only on the
//! queue. The dispatch thread feeds the sink so a slow consumer can never
//! stall classification.

use crate::capture::CaptureSource;
use crate::config::PipelineConfig;
use crate::encoder::{EncodedSegment, SegmentEncoder, SegmentMeta};
use crate::error::{Result, VocsegError};
use crate::frame::{Frame, Framer};
use crate::queue::FrameQueue;
use crate::segment::{FlushedSegment, SegmentAccumulator};
use crate::sink::{ErrorReporter, LogReporter, SegmentSink};
use crate::vad::{VoiceActivityDetector, build_detector};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Terminal-state reporting for a pipeline run.
///
/// The caller is always informed of stoppage through this state, never by
/// silent exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    /// Threads are live and processing.
    Running,
    /// Graceful end: stop/cancel completed or a finite source drained.
    Stopped,
    /// A device-level capture error ended the run.
    Failed(String),
}

/// Segmentation pipeline, constructed from a validated configuration.
pub struct Pipeline {
    config: PipelineConfig,
    detector: Box<dyn VoiceActivityDetector>,
    reporter: Arc<dyn ErrorReporter>,
}

impl Pipeline {
    /// Creates a pipeline, validating configuration and detector shape.
    ///
    /// All configuration errors (`InvalidPipelineConfig`,
    /// `UnsupportedFrameShape`) surface here, never mid-stream.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let detector = build_detector(&config)?;
        Ok(Self {
            config,
            detector,
            reporter: Arc::new(LogReporter),
        })
    }

    /// Sets a custom error reporter for non-fatal stream errors.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Starts capture and processing; returns a handle for lifecycle control.
    pub fn start(
        self,
        mut source: Box<dyn CaptureSource>,
        sink: Box<dyn SegmentSink>,
    ) -> Result<PipelineHandle> {
        // Built before any thread spawns so a config failure leaks nothing.
        let accumulator = SegmentAccumulator::new(&self.config)?;

        source.start()?;

        let queue = Arc::new(FrameQueue::new(self.config.queue_capacity));
        let running = Arc::new(AtomicBool::new(true));
        let cancelled = Arc::new(AtomicBool::new(false));
        let state = Arc::new(Mutex::new(PipelineState::Running));
        let (dispatch_tx, dispatch_rx) = bounded(self.config.dispatch_buffer);

        let capture = spawn_capture(
            source,
            queue.clone(),
            running.clone(),
            state.clone(),
            self.reporter.clone(),
            self.config.frame_samples(),
            Duration::from_millis(self.config.frame_duration_ms as u64),
        );

        let processing = spawn_processing(
            self.config.clone(),
            self.detector,
            accumulator,
            queue.clone(),
            dispatch_tx,
            cancelled.clone(),
            state.clone(),
            self.reporter.clone(),
        );

        let dispatch = spawn_dispatch(sink, dispatch_rx, cancelled.clone(), self.reporter.clone());

        Ok(PipelineHandle {
            running,
            cancelled,
            queue,
            state,
            threads: vec![capture, processing, dispatch],
        })
    }
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    running: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
    queue: Arc<FrameQueue>,
    state: Arc<Mutex<PipelineState>>,
    threads: Vec<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Stops the pipeline gracefully.
    ///
    /// The queue is closed but queued frames are drained and classified
    /// before the processing loop ends. A still-open segment below the flush
    /// thresholds is discarded unless `flush_partial_on_stop` is configured.
    pub fn stop(mut self) -> PipelineState {
        self.running.store(false, Ordering::SeqCst);
        self.queue.close();
        self.join_threads();
        self.snapshot()
    }

    /// Stops immediately, discarding queued frames and any open segment.
    pub fn cancel(mut self) -> PipelineState {
        self.cancelled.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.queue.close_and_clear();
        self.join_threads();
        self.snapshot()
    }

    /// Waits for a finite source to drain and the pipeline to finish.
    pub fn wait(mut self) -> PipelineState {
        self.join_threads();
        self.running.store(false, Ordering::SeqCst);
        self.snapshot()
    }

    /// Current pipeline state.
    pub fn state(&self) -> PipelineState {
        self.snapshot()
    }

    /// True while no stop has been requested and no failure recorded.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.snapshot() == PipelineState::Running
    }

    /// Frames evicted from the full queue so far. Monotone.
    pub fn dropped_frames(&self) -> u64 {
        self.queue.dropped_frames()
    }

    fn snapshot(&self) -> PipelineState {
        match self.state.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Joins worker threads, reporting panics; detaches laggards after a
    /// deadline so a stuck sink cannot hang shutdown forever.
    fn join_threads(&mut self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        let poll_interval = Duration::from_millis(20);

        loop {
            let mut remaining = Vec::new();
            for handle in self.threads.drain(..) {
                if handle.is_finished() {
                    if handle.join().is_err() {
                        eprintln!("vocseg: pipeline thread panicked");
                    }
                } else {
                    remaining.push(handle);
                }
            }
            self.threads = remaining;

            if self.threads.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                eprintln!(
                    "vocseg: shutdown timeout — {} thread(s) still running, detaching",
                    self.threads.len()
                );
                break;
            }
            thread::sleep(poll_interval);
        }
    }
}

fn set_state(state: &Mutex<PipelineState>, next: PipelineState) {
    let mut guard = match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    // A failure is terminal; never downgrade it to Stopped.
    if *guard == PipelineState::Running {
        *guard = next;
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_capture(
    mut source: Box<dyn CaptureSource>,
    queue: Arc<FrameQueue>,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<PipelineState>>,
    reporter: Arc<dyn ErrorReporter>,
    frame_samples: usize,
    poll_interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut framer = Framer::new(frame_samples);
        let mut sequence: u64 = 0;
        let is_finite = source.is_finite();

        while running.load(Ordering::SeqCst) && !queue.is_closed() {
            let samples = match source.read_samples() {
                Ok(samples) => samples,
                Err(e) => {
                    // Device-level failure: fatal to this run.
                    let error = VocsegError::CaptureDevice {
                        message: e.to_string(),
                    };
                    reporter.report("capture", &error);
                    set_state(&state, PipelineState::Failed(e.to_string()));
                    queue.close();
                    break;
                }
            };

            if samples.is_empty() {
                if is_finite {
                    // Source exhausted: emit the trailing partial frame, if
                    // any, then signal end of stream.
                    if let Some(remainder) = framer.take_remainder() {
                        queue.push(Frame::new(remainder, sequence, Instant::now()));
                    }
                    queue.close();
                    break;
                }
                // Live source: empty reads are normal while the device
                // buffers. Keep polling.
                thread::sleep(poll_interval);
                continue;
            }

            for chunk in framer.extend(&samples) {
                let pushed = queue.push(Frame::new(chunk, sequence, Instant::now()));
                sequence += 1;
                if !pushed {
                    break;
                }
            }

            if !is_finite {
                thread::sleep(poll_interval);
            }
        }

        if let Err(e) = source.stop() {
            reporter.report(
                "capture",
                &VocsegError::CaptureDevice {
                    message: format!("stop failed: {}", e),
                },
            );
        }

        let dropped = queue.dropped_frames();
        if dropped > 0 {
            eprintln!("vocseg: {} frame(s) dropped under load", dropped);
        }
    })
}

#[allow(clippy::too_many_arguments)]
fn spawn_processing(
    config: PipelineConfig,
    mut detector: Box<dyn VoiceActivityDetector>,
    mut accumulator: SegmentAccumulator,
    queue: Arc<FrameQueue>,
    dispatch_tx: Sender<(EncodedSegment, SegmentMeta)>,
    cancelled: Arc<AtomicBool>,
    state: Arc<Mutex<PipelineState>>,
    reporter: Arc<dyn ErrorReporter>,
) -> JoinHandle<()> {
    let encoder = SegmentEncoder::new(config.sample_rate);
    let sample_rate = config.sample_rate;
    let flush_partial = config.flush_partial_on_stop;

    thread::spawn(move || {
        let mut flush_sequence: u64 = 0;

        while let Some(frame) = queue.pop() {
            let classification = detector.classify(&frame.samples);
            if let Some(segment) = accumulator.push(&frame, classification.label) {
                encode_and_dispatch(
                    &encoder,
                    segment,
                    sample_rate,
                    &mut flush_sequence,
                    &dispatch_tx,
                    reporter.as_ref(),
                );
            }
        }

        // End of stream. On cancel everything open is discarded; on a
        // graceful end the open segment is discarded too unless the
        // legacy-parity flush policy is enabled.
        if !cancelled.load(Ordering::SeqCst) && flush_partial {
            if let Some(segment) = accumulator.take_open() {
                encode_and_dispatch(
                    &encoder,
                    segment,
                    sample_rate,
                    &mut flush_sequence,
                    &dispatch_tx,
                    reporter.as_ref(),
                );
            }
        } else {
            accumulator.discard();
        }

        set_state(&state, PipelineState::Stopped);
        // dispatch_tx drops here, ending the dispatch thread.
    })
}

fn encode_and_dispatch(
    encoder: &SegmentEncoder,
    segment: FlushedSegment,
    sample_rate: u32,
    flush_sequence: &mut u64,
    dispatch_tx: &Sender<(EncodedSegment, SegmentMeta)>,
    reporter: &dyn ErrorReporter,
) {
    let encoded = match encoder.encode(&segment) {
        Ok(encoded) => encoded,
        Err(e) => {
            // Fatal to this segment only; the stream continues from IDLE.
            reporter.report("encoder", &e);
            return;
        }
    };

    let meta = SegmentMeta {
        sequence: *flush_sequence,
        started_at: segment.started_at,
        duration_ms: segment.duration_ms(sample_rate),
        trigger: segment.trigger,
    };
    *flush_sequence += 1;

    match dispatch_tx.try_send((encoded, meta)) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            // Never block classification on a slow sink; shed the segment.
            reporter.report(
                "dispatch",
                &VocsegError::Sink {
                    message: "dispatch queue full, segment dropped".to_string(),
                },
            );
        }
        Err(TrySendError::Disconnected(_)) => {
            reporter.report(
                "dispatch",
                &VocsegError::Sink {
                    message: "dispatch channel closed".to_string(),
                },
            );
        }
    }
}

fn spawn_dispatch(
    mut sink: Box<dyn SegmentSink>,
    dispatch_rx: Receiver<(EncodedSegment, SegmentMeta)>,
    cancelled: Arc<AtomicBool>,
    reporter: Arc<dyn ErrorReporter>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok((segment, meta)) = dispatch_rx.recv() {
            // After a cancel, in-flight segments are discarded, not delivered.
            if cancelled.load(Ordering::SeqCst) {
                continue;
            }
            if let Err(e) = sink.dispatch(segment, meta) {
                // Sink failures never propagate into the pipeline.
                reporter.report(sink.name(), &e);
            }
        }
        sink.finish();
    })
}
