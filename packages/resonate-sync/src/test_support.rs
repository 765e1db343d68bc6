//! Shared test fakes for exercising the sync core without a real audio
//! engine or hosted store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::playback::PlaybackEngine;
use crate::session::record::{SessionPatch, SessionRecord};
use crate::session::store::{SessionStore, StoreResult};

/// One recorded call into a [`FakeEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Play,
    Pause,
    Seek(f32),
    SwitchSound(String),
    SwitchVariation(u32),
}

/// Playback engine that records every call and simulates a loaded track.
pub struct FakeEngine {
    calls: Mutex<Vec<EngineCall>>,
    /// Position in seconds.
    position: Mutex<f32>,
    /// Duration in seconds; 0 means nothing loaded.
    duration: f32,
}

impl FakeEngine {
    const TRACK_SECONDS: f32 = 200.0;

    /// Engine with a 200-second track loaded at position 0.
    pub fn new() -> Arc<Self> {
        Self::at_position_percent(0.0)
    }

    /// Engine with a 200-second track at the given percent position.
    pub fn at_position_percent(percent: f32) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            position: Mutex::new(percent / 100.0 * Self::TRACK_SECONDS),
            duration: Self::TRACK_SECONDS,
        })
    }

    /// Engine with nothing loaded (duration 0).
    pub fn unloaded() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            position: Mutex::new(0.0),
            duration: 0.0,
        })
    }

    /// Drains and returns the recorded calls.
    pub fn take_calls(&self) -> Vec<EngineCall> {
        std::mem::take(&mut self.calls.lock())
    }
}

impl PlaybackEngine for FakeEngine {
    fn play(&self) {
        self.calls.lock().push(EngineCall::Play);
    }

    fn pause(&self) {
        self.calls.lock().push(EngineCall::Pause);
    }

    fn seek(&self, percent: f32) {
        *self.position.lock() = percent / 100.0 * self.duration;
        self.calls.lock().push(EngineCall::Seek(percent));
    }

    fn switch_sound(&self, sound_id: &str) {
        self.calls
            .lock()
            .push(EngineCall::SwitchSound(sound_id.to_string()));
    }

    fn switch_variation(&self, index: u32) {
        self.calls.lock().push(EngineCall::SwitchVariation(index));
    }

    fn current_position(&self) -> f32 {
        *self.position.lock()
    }

    fn duration(&self) -> f32 {
        self.duration
    }
}

/// Store that blocks every update behind a semaphore permit.
///
/// Lets a test hold a publish in flight while more local events arrive, then
/// release and observe how they coalesced.
pub struct GatedStore {
    record: Mutex<SessionRecord>,
    patches: Mutex<Vec<SessionPatch>>,
    gate: Semaphore,
    updates_started: AtomicUsize,
    updates_finished: AtomicUsize,
}

impl GatedStore {
    /// Store holding exactly one record, with all updates gated.
    pub fn new(record: SessionRecord) -> Self {
        Self {
            record: Mutex::new(record),
            patches: Mutex::new(Vec::new()),
            gate: Semaphore::new(0),
            updates_started: AtomicUsize::new(0),
            updates_finished: AtomicUsize::new(0),
        }
    }

    /// Lets `count` gated updates proceed.
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    /// The patches applied so far, in order.
    pub fn patches(&self) -> Vec<SessionPatch> {
        self.patches.lock().clone()
    }

    /// Yields until at least `count` updates have entered the store.
    pub async fn wait_for_updates_started(&self, count: usize) {
        while self.updates_started.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }

    /// Yields until at least `count` updates have completed.
    pub async fn wait_for_updates_finished(&self, count: usize) {
        while self.updates_finished.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl SessionStore for GatedStore {
    async fn insert(&self, record: SessionRecord) -> StoreResult<()> {
        *self.record.lock() = record;
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<SessionRecord>> {
        let record = self.record.lock();
        Ok((record.id == id).then(|| record.clone()))
    }

    async fn update(
        &self,
        id: &str,
        patch: SessionPatch,
        writer_id: &str,
    ) -> StoreResult<Option<SessionRecord>> {
        self.updates_started.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();

        let snapshot = {
            let mut record = self.record.lock();
            if record.id != id || record.host_id != writer_id {
                self.updates_finished.fetch_add(1, Ordering::SeqCst);
                return Ok(None);
            }
            patch.apply_to(&mut record);
            record.revision += 1;
            record.clone()
        };
        self.patches.lock().push(patch);
        self.updates_finished.fetch_add(1, Ordering::SeqCst);
        Ok(Some(snapshot))
    }
}
