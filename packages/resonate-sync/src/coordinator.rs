//! Per-peer session coordination.
//!
//! Decides, for every local playback event, whether to publish it, and for
//! every inbound topic event, how to apply it without re-publishing.
//!
//! Two mechanisms keep peers from feeding each other's updates back into the
//! store:
//!
//! - every accepted write carries a monotonic `revision`; inbound snapshots at
//!   or below the last applied revision are dropped, and a host drops
//!   snapshots tagged with its own identity outright
//! - applying a remote snapshot opens a short suppression window during which
//!   no outbound publish may occur, covering engine-driven feedback events
//!   that carry no revision
//!
//! Outbound writes are coalesced: while a publish is in flight, later local
//! events merge into a single pending patch (last-write-wins) and one
//! follow-up publish drains it. Intermediate states are allowed to be lost;
//! the protocol replicates state, not commands.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::SyncConfig;
use crate::events::{LocalPlaybackEvent, PeerEvent, SessionEvent, StateEvent};
use crate::playback::PlaybackEngine;
use crate::reconcile::reconcile_position;
use crate::runtime::TaskSpawner;
use crate::session::record::{SessionPatch, SessionRecord};
use crate::session::store::SessionStore;

/// Role of a peer with respect to one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerRole {
    /// Not bound to any session.
    #[default]
    Idle,
    /// The single peer allowed to write the session record.
    Hosting,
    /// Mirrors the session record, never writes it.
    Following,
}

/// Echo-suppression state shared with the timer task that clears it.
struct SuppressState {
    /// True while a just-applied remote snapshot must not be mistaken for a
    /// new local change.
    flag: AtomicBool,
    /// Window generation; a clear task only clears the window it opened, so
    /// overlapping inbound applies never cut a newer window short.
    generation: AtomicU64,
}

/// Per-peer coordination logic for one session binding.
pub struct SessionCoordinator {
    session_id: String,
    role: PeerRole,
    /// Own identity; snapshots tagged with it are self-echoes.
    self_id: String,
    engine: Arc<dyn PlaybackEngine>,
    store: Arc<dyn SessionStore>,
    spawner: Arc<dyn TaskSpawner>,
    config: SyncConfig,
    suppress: Arc<SuppressState>,
    /// Last snapshot accepted, either from the topic or from our own write
    /// results. Baseline for change detection on both paths.
    last_known_remote: Mutex<Option<SessionRecord>>,
    /// Patch accumulated while a publish is in flight.
    pending: Mutex<SessionPatch>,
    /// Whether a publish task is currently draining `pending`.
    publish_in_flight: AtomicBool,
}

impl SessionCoordinator {
    /// Creates a coordinator for one peer bound to one session.
    pub fn new(
        role: PeerRole,
        session_id: String,
        self_id: String,
        engine: Arc<dyn PlaybackEngine>,
        store: Arc<dyn SessionStore>,
        spawner: Arc<dyn TaskSpawner>,
        config: SyncConfig,
    ) -> Self {
        Self {
            session_id,
            role,
            self_id,
            engine,
            store,
            spawner,
            config,
            suppress: Arc::new(SuppressState {
                flag: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
            last_known_remote: Mutex::new(None),
            pending: Mutex::new(SessionPatch::default()),
            publish_in_flight: AtomicBool::new(false),
        }
    }

    /// The session this coordinator is bound to.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// This peer's role in the session.
    #[must_use]
    pub fn role(&self) -> PeerRole {
        self.role
    }

    /// Whether the echo-suppression window is currently open.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.suppress.flag.load(Ordering::SeqCst)
    }

    /// Seeds the change-detection baseline without engine side effects.
    ///
    /// Used by a host right after inserting its own record: the host's engine
    /// is the source of that state, not a mirror of it.
    pub(crate) fn seed_snapshot(&self, record: SessionRecord) {
        *self.last_known_remote.lock() = Some(record);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inbound path
    // ─────────────────────────────────────────────────────────────────────────

    /// Processes one event from the session topic.
    ///
    /// Returns the event to surface to the embedding UI, or `None` when the
    /// event was filtered out (self-echo, stale revision, foreign session).
    /// Synchronous on purpose: a test can drain a topic deterministically;
    /// the background pump simply forwards received events here.
    pub fn process(&self, event: SessionEvent) -> Option<PeerEvent> {
        match event {
            SessionEvent::State(StateEvent::Changed { session, .. }) => {
                self.apply_remote(session).map(PeerEvent::StateUpdated)
            }
            SessionEvent::Chat(message) => Some(PeerEvent::ChatReceived(message)),
        }
    }

    /// Applies a remote snapshot to the local engine.
    fn apply_remote(&self, snapshot: SessionRecord) -> Option<SessionRecord> {
        if snapshot.id != self.session_id {
            log::warn!(
                "[Coordinator] snapshot for {} on topic of {}, dropping",
                snapshot.id,
                self.session_id
            );
            return None;
        }
        if snapshot.host_id == self.self_id {
            // Our own write landing back through the change feed.
            log::trace!("[Coordinator] dropping self-echo for {}", snapshot.id);
            return None;
        }

        let mut last_known = self.last_known_remote.lock();
        if let Some(previous) = last_known.as_ref() {
            if snapshot.revision <= previous.revision {
                // At-least-once delivery: duplicates and reordered stale
                // snapshots must be no-ops.
                log::trace!(
                    "[Coordinator] dropping stale revision {} (have {})",
                    snapshot.revision,
                    previous.revision
                );
                return None;
            }
        }

        // Open the window before touching the engine: engines may emit their
        // change notifications synchronously from within these calls.
        self.begin_suppression();

        match last_known.as_ref() {
            Some(previous) => {
                if previous.current_sound_id != snapshot.current_sound_id {
                    self.engine.switch_sound(&snapshot.current_sound_id);
                }
                if previous.variation_index != snapshot.variation_index {
                    self.engine.switch_variation(snapshot.variation_index);
                }
                if previous.is_playing != snapshot.is_playing {
                    if snapshot.is_playing {
                        self.engine.play();
                    } else {
                        self.engine.pause();
                    }
                }
            }
            None => {
                self.engine.switch_sound(&snapshot.current_sound_id);
                self.engine.switch_variation(snapshot.variation_index);
                if snapshot.is_playing {
                    self.engine.play();
                } else {
                    self.engine.pause();
                }
            }
        }

        reconcile_position(
            self.engine.as_ref(),
            snapshot.playback_position,
            self.config.drift_threshold,
        );

        *last_known = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Opens (or extends) the echo-suppression window and schedules its clear.
    fn begin_suppression(&self) {
        let state = Arc::clone(&self.suppress);
        let generation = state.generation.fetch_add(1, Ordering::SeqCst) + 1;
        state.flag.store(true, Ordering::SeqCst);

        let window = self.config.suppress_window();
        self.spawner.spawn_boxed(Box::pin(async move {
            tokio::time::sleep(window).await;
            if state.generation.load(Ordering::SeqCst) == generation {
                state.flag.store(false, Ordering::SeqCst);
            }
        }));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Outbound path
    // ─────────────────────────────────────────────────────────────────────────

    /// Handles a local playback engine notification.
    ///
    /// Hosts publish qualifying changes; followers never write (their local
    /// divergence is corrected by the next inbound update), and nothing is
    /// published while the suppression window is open.
    pub fn handle_local_event(self: &Arc<Self>, event: LocalPlaybackEvent) {
        if self.role != PeerRole::Hosting {
            log::trace!("[Coordinator] follower-local change stays local: {:?}", event);
            return;
        }
        if self.suppress.flag.load(Ordering::SeqCst) {
            log::trace!("[Coordinator] outbound suppressed, dropping {:?}", event);
            return;
        }

        let mut patch = Self::patch_for(event);
        if let Some(baseline) = self.last_known_remote.lock().as_ref() {
            patch.retain_changes_from(baseline);
        }
        if patch.is_empty() {
            return;
        }

        self.pending.lock().merge(patch);
        self.queue_publish();
    }

    /// Maps an engine notification to the field it changes.
    fn patch_for(event: LocalPlaybackEvent) -> SessionPatch {
        let mut patch = SessionPatch::default();
        match event {
            LocalPlaybackEvent::SoundChanged(sound_id) => {
                patch.current_sound_id = Some(sound_id);
            }
            LocalPlaybackEvent::VariationChanged(index) => {
                patch.variation_index = Some(index);
            }
            LocalPlaybackEvent::Played => patch.is_playing = Some(true),
            LocalPlaybackEvent::Paused => patch.is_playing = Some(false),
            LocalPlaybackEvent::Seeked(percent) => {
                patch.playback_position = Some(percent.clamp(0.0, 100.0));
            }
        }
        patch
    }

    /// Ensures a publish task is draining the pending patch.
    fn queue_publish(self: &Arc<Self>) {
        if self.publish_in_flight.swap(true, Ordering::SeqCst) {
            // The running drain picks up whatever was merged.
            return;
        }

        let coordinator = Arc::clone(self);
        self.spawner.spawn_boxed(Box::pin(async move {
            loop {
                let patch = std::mem::take(&mut *coordinator.pending.lock());
                if patch.is_empty() {
                    break;
                }
                coordinator.publish_patch(patch).await;
            }
            coordinator.publish_in_flight.store(false, Ordering::SeqCst);
            // An event may have slipped in between the final take and the
            // flag reset; re-arm the drain for it.
            if !coordinator.pending.lock().is_empty() {
                coordinator.queue_publish();
            }
        }));
    }

    /// Submits one patch through the store, filtered by our identity.
    async fn publish_patch(&self, patch: SessionPatch) {
        match self
            .store
            .update(&self.session_id, patch, &self.self_id)
            .await
        {
            Ok(Some(snapshot)) => {
                log::debug!(
                    "[Coordinator] published revision {} for {}",
                    snapshot.revision,
                    snapshot.id
                );
                // Our accepted write is the new change-detection baseline.
                *self.last_known_remote.lock() = Some(snapshot);
            }
            Ok(None) => {
                // Zero rows affected: we are not the host anymore, or the
                // session is gone. No retry; local state simply stops
                // propagating until a legitimate update arrives.
                log::warn!(
                    "[Coordinator] write to {} affected zero rows",
                    self.session_id
                );
            }
            Err(e) => {
                log::warn!(
                    "[Coordinator] store update failed for {}: {}",
                    self.session_id,
                    e
                );
            }
        }
    }
}
