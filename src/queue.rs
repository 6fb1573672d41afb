//! Bounded frame hand-off between the capture and processing contexts.
//!
//! The only structure shared between the two long-lived threads. `push` is
//! called from the capture side and never blocks beyond a constant-time
//! mutex hold; `pop` is called from the processing side and blocks until a
//! frame arrives or the queue is closed.

use crate::frame::Frame;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};

struct Inner {
    frames: VecDeque<Frame>,
    closed: bool,
}

/// Bounded FIFO of frames with drop-oldest overflow semantics.
///
/// When full, `push` evicts the oldest queued frame instead of blocking:
/// live audio is more valuable than stale audio, and a blocked capture
/// callback risks a device-level overrun, which is worse than a dropped
/// frame. Evictions are counted for diagnostics.
pub struct FrameQueue {
    inner: Mutex<Inner>,
    available: Condvar,
    capacity: usize,
    dropped: AtomicU64,
}

impl FrameQueue {
    /// Creates a queue holding at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "frame queue capacity must be non-zero");
        Self {
            inner: Mutex::new(Inner {
                frames: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            available: Condvar::new(),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueues a frame from the capture context.
    ///
    /// If the queue is full the oldest frame is evicted and the dropped
    /// counter incremented. Returns false if the queue is already closed
    /// (the frame is discarded without counting it as a drop).
    pub fn push(&self, frame: Frame) -> bool {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if inner.closed {
            return false;
        }
        if inner.frames.len() == self.capacity {
            inner.frames.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        inner.frames.push_back(frame);
        drop(inner);
        self.available.notify_one();
        true
    }

    /// Dequeues the oldest frame, blocking while the queue is open and empty.
    ///
    /// Returns `None` once the queue is closed and drained — the
    /// end-of-stream signal for the processing loop. Frames queued before
    /// `close()` are still delivered.
    pub fn pop(&self) -> Option<Frame> {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        loop {
            if let Some(frame) = inner.frames.pop_front() {
                return Some(frame);
            }
            if inner.closed {
                return None;
            }
            inner = match self.available.wait(inner) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /// Closes the queue, keeping queued frames for draining.
    pub fn close(&self) {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.closed = true;
        drop(inner);
        self.available.notify_all();
    }

    /// Closes the queue and discards everything still queued (cancel path).
    pub fn close_and_clear(&self) {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.closed = true;
        inner.frames.clear();
        drop(inner);
        self.available.notify_all();
    }

    /// Returns true once `close()` or `close_and_clear()` has been called.
    pub fn is_closed(&self) -> bool {
        match self.inner.lock() {
            Ok(guard) => guard.closed,
            Err(poisoned) => poisoned.into_inner().closed,
        }
    }

    /// Number of frames currently queued.
    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.frames.len(),
            Err(poisoned) => poisoned.into_inner().frames.len(),
        }
    }

    /// Returns true if no frames are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total frames evicted because the queue was full. Monotone.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
