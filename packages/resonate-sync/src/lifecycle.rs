//! Session lifecycle: create, join, leave.
//!
//! A [`SessionManager`] embodies one logical peer. Creating or joining binds
//! that peer to a session and returns an explicit [`SessionHandle`] owning
//! the topic subscription; leaving (or dropping the handle) releases it. The
//! handle is the unit of teardown, so several managers, and therefore several
//! independent peers, can coexist in one process.
//!
//! Per-peer state machine: `Idle → Hosting` (create), `Idle → Following`
//! (join), `Hosting|Following → Idle` (leave). Create and join from a
//! non-idle manager perform an implicit leave first; a peer is in at most one
//! session at a time.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::chat::{ChatMessage, ChatRelay};
use crate::config::SyncConfig;
use crate::coordinator::{PeerRole, SessionCoordinator};
use crate::error::{SyncError, SyncResult};
use crate::events::{ChannelRegistry, LocalPlaybackEvent, PeerEvent, SessionEvent, StateEvent};
use crate::playback::{IdentityProvider, PlaybackEngine};
use crate::runtime::TaskSpawner;
use crate::session::code::{generate_join_code, normalize_join_code};
use crate::session::record::SessionRecord;
use crate::session::store::{SessionStore, StoreError};
use crate::utils::now_millis;

/// Attempts at generating an unused join code before giving up.
const CODE_GENERATION_ATTEMPTS: usize = 8;

/// Create / join / leave operations for one logical peer.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    registry: Arc<ChannelRegistry>,
    identity: Arc<dyn IdentityProvider>,
    spawner: Arc<dyn TaskSpawner>,
    config: SyncConfig,
    /// Cancellation token of the currently bound session, if any. Swapped on
    /// create/join (leave-then-join semantics) and cancelled on leave.
    active: Mutex<Option<CancellationToken>>,
}

impl SessionManager {
    /// Creates a manager for the peer identified by `identity`.
    pub fn new(
        store: Arc<dyn SessionStore>,
        registry: Arc<ChannelRegistry>,
        identity: Arc<dyn IdentityProvider>,
        spawner: Arc<dyn TaskSpawner>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            registry,
            identity,
            spawner,
            config,
            active: Mutex::new(None),
        }
    }

    /// Starts hosting a new session and returns its handle.
    ///
    /// The session starts playing the given sound from position 0. Store
    /// failures propagate: creation never fails silently.
    pub async fn create_session(
        &self,
        engine: Arc<dyn PlaybackEngine>,
        initial_sound_id: impl Into<String>,
        variation_index: u32,
    ) -> SyncResult<SessionHandle> {
        let record = self
            .insert_with_fresh_code(initial_sound_id.into(), variation_index)
            .await?;
        log::info!(
            "[Lifecycle] hosting session {} as {}",
            record.id,
            record.host_id
        );
        Ok(self.bind(PeerRole::Hosting, record, engine))
    }

    /// Joins an existing session by its code and returns its handle.
    ///
    /// Tears down any session this manager was previously bound to, before
    /// the lookup: after a failed join the peer is idle either way, and no
    /// partial subscription is left behind. Codes are case-insensitive.
    pub async fn join_session(
        &self,
        code: &str,
        engine: Arc<dyn PlaybackEngine>,
    ) -> SyncResult<SessionHandle> {
        self.release_active();

        let code = normalize_join_code(code);
        let record = self
            .store
            .get(&code)
            .await?
            .ok_or_else(|| SyncError::SessionNotFound(code.clone()))?;
        if record.is_expired(now_millis()) {
            log::info!("[Lifecycle] refusing join of expired session {}", code);
            return Err(SyncError::SessionExpired(code));
        }

        log::info!(
            "[Lifecycle] joining session {} hosted by {}",
            record.id,
            record.host_id
        );
        Ok(self.bind(PeerRole::Following, record, engine))
    }

    /// Cancels the binding of the previously created/joined session, if any.
    fn release_active(&self) {
        if let Some(token) = self.active.lock().take() {
            token.cancel();
        }
    }

    /// Inserts a new record under a fresh join code, retrying on collision.
    async fn insert_with_fresh_code(
        &self,
        sound_id: String,
        variation_index: u32,
    ) -> SyncResult<SessionRecord> {
        let now = now_millis();
        let host_id = self.identity.peer_id();

        for _ in 0..CODE_GENERATION_ATTEMPTS {
            let record = SessionRecord {
                id: generate_join_code(),
                host_id: host_id.clone(),
                current_sound_id: sound_id.clone(),
                variation_index,
                is_playing: true,
                playback_position: 0.0,
                revision: 0,
                created_at: now,
                expires_at: now + self.config.session_ttl_millis(),
            };
            match self.store.insert(record.clone()).await {
                Ok(()) => return Ok(record),
                Err(StoreError::DuplicateId(code)) => {
                    log::debug!("[Lifecycle] join code collision on {}, retrying", code);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(SyncError::CodeExhausted)
    }

    /// Subscribes, wires up a coordinator and its pump, and builds the handle.
    fn bind(
        &self,
        role: PeerRole,
        record: SessionRecord,
        engine: Arc<dyn PlaybackEngine>,
    ) -> SessionHandle {
        self.release_active();
        let token = CancellationToken::new();
        *self.active.lock() = Some(token.clone());

        let session_id = record.id.clone();
        let coordinator = Arc::new(SessionCoordinator::new(
            role,
            session_id.clone(),
            self.identity.peer_id(),
            engine,
            Arc::clone(&self.store),
            Arc::clone(&self.spawner),
            self.config.clone(),
        ));

        let receiver = self.registry.subscribe(&session_id);
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();

        match role {
            PeerRole::Hosting => {
                // The host's engine is the source of this state, not a mirror
                // of it: seed the baseline without engine side effects.
                coordinator.seed_snapshot(record);
            }
            _ => {
                // Initial snapshot, applied and delivered synchronously so
                // the joiner renders something without waiting for the next
                // host change.
                let initial = SessionEvent::State(StateEvent::Changed {
                    session: record,
                    timestamp: now_millis(),
                });
                if let Some(event) = coordinator.process(initial) {
                    let _ = ui_tx.send(event);
                }
            }
        }

        self.spawn_pump(Arc::clone(&coordinator), receiver, ui_tx, token.clone());

        SessionHandle {
            session_id,
            role,
            coordinator,
            chat: ChatRelay::new(Arc::clone(&self.registry), Arc::clone(&self.identity)),
            cancel: token,
            events: ui_rx,
        }
    }

    /// Spawns the task forwarding topic events into the coordinator.
    fn spawn_pump(
        &self,
        coordinator: Arc<SessionCoordinator>,
        mut receiver: broadcast::Receiver<SessionEvent>,
        ui_tx: mpsc::UnboundedSender<PeerEvent>,
        token: CancellationToken,
    ) {
        let session_id = coordinator.session_id().to_string();
        self.spawner.spawn_boxed(Box::pin(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = receiver.recv() => match received {
                        Ok(event) => {
                            if let Some(peer_event) = coordinator.process(event) {
                                if ui_tx.send(peer_event).is_err() {
                                    // Handle gone; nobody is listening.
                                    break;
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Apply-latest-full-state: the next snapshot
                            // repairs whatever was missed.
                            log::warn!(
                                "[Lifecycle] pump for {} lagged, skipped {} events",
                                session_id,
                                skipped
                            );
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            log::debug!("[Lifecycle] pump for {} stopped", session_id);
        }));
    }
}

/// Live binding of one peer to one session.
///
/// Owns the topic subscription and the typed event queue toward the
/// embedding UI. Leaving, or dropping the handle, synchronously cancels the
/// subscription so no stale events reach a torn-down UI.
pub struct SessionHandle {
    session_id: String,
    role: PeerRole,
    coordinator: Arc<SessionCoordinator>,
    chat: ChatRelay,
    cancel: CancellationToken,
    events: mpsc::UnboundedReceiver<PeerEvent>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .field("role", &self.role)
            .field("is_active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    /// The bound session's id (its join code).
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// This peer's role in the session.
    #[must_use]
    pub fn role(&self) -> PeerRole {
        self.role
    }

    /// True until [`leave`](Self::leave) is called or the handle is dropped.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Waits for the next applied state update or chat message.
    ///
    /// Returns `None` once the session has been left and the queue drained.
    pub async fn next_event(&mut self) -> Option<PeerEvent> {
        self.events.recv().await
    }

    /// Drains everything currently queued without waiting.
    ///
    /// Suited to render loops that poll once per frame, and to tests.
    pub fn drain_events(&mut self) -> Vec<PeerEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    /// Forwards a local playback engine notification (the outbound path).
    ///
    /// Ignored after leave.
    pub fn playback_changed(&self, event: LocalPlaybackEvent) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.coordinator.handle_local_event(event);
    }

    /// Sends a chat message to everyone in the session, sender included.
    ///
    /// Returns the message as sent, or `None` after leave.
    pub fn send_chat(&self, text: impl Into<String>) -> Option<ChatMessage> {
        if self.cancel.is_cancelled() {
            return None;
        }
        Some(self.chat.send(&self.session_id, text))
    }

    /// Leaves the session, synchronously tearing down the subscription.
    ///
    /// Idempotent: leaving twice, or leaving an already-dropped binding, is a
    /// no-op.
    pub fn leave(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        log::info!("[Lifecycle] leaving session {}", self.session_id);
        self.cancel.cancel();
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        // Scoped release: a dropped handle must not leak a live subscription.
        self.cancel.cancel();
    }
}
