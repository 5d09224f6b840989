//! In-process publisher that keeps every frame it is given.
//!
//! Useful when the engine is embedded without a realtime provider and
//! as the observer side of tests. Failures can be scripted with
//! [`MemoryPublisher::fail_next`] to exercise the pipeline's retry and
//! degraded paths.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{Frame, Publisher, TransportError};

#[derive(Default)]
struct MemoryInner {
    frames: Vec<Frame>,
    failures: VecDeque<TransportError>,
    attempts: u64,
}

/// A [`Publisher`] that records frames in memory. Clones share storage.
#[derive(Clone, Default)]
pub struct MemoryPublisher {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next publish attempt fail with `err`. Calls queue up.
    pub fn fail_next(&self, err: TransportError) {
        self.lock().failures.push_back(err);
    }

    /// Every frame delivered so far, in delivery order.
    pub fn frames(&self) -> Vec<Frame> {
        self.lock().frames.clone()
    }

    /// Frames delivered on one channel.
    pub fn frames_on(&self, channel: &str) -> Vec<Frame> {
        self.lock()
            .frames
            .iter()
            .filter(|f| f.channel == channel)
            .cloned()
            .collect()
    }

    /// Event names delivered on one channel.
    pub fn events_on(&self, channel: &str) -> Vec<String> {
        self.frames_on(channel).into_iter().map(|f| f.event).collect()
    }

    /// Publish attempts, including failed ones.
    pub fn attempts(&self) -> u64 {
        self.lock().attempts
    }

    pub fn clear(&self) {
        self.lock().frames.clear();
    }
}

impl Publisher for MemoryPublisher {
    async fn publish(&self, channel: &str, event: &str, payload: &[u8]) -> Result<(), TransportError> {
        let frame = Frame::new(channel, event, payload)?;
        let mut inner = self.lock();
        inner.attempts += 1;
        if let Some(err) = inner.failures.pop_front() {
            return Err(err);
        }
        inner.frames.push(frame);
        Ok(())
    }
}
