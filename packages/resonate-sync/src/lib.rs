//! Resonate Sync - shared listening session core.
//!
//! One "host" peer drives an audio-playback experience that any number of
//! "follower" peers mirror in near-real-time: same sound, same variation, same
//! play/pause state, same scrub position, plus a best-effort chat overlay.
//! There is no central server loop: peers converge through a session store and
//! a per-session broadcast topic.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`lifecycle`]: create / join / leave operations producing [`SessionHandle`]s
//! - [`coordinator`]: per-peer publish/apply logic with echo suppression
//! - [`reconcile`]: playback-position drift detection and correction
//! - [`chat`]: ephemeral chat fan-out riding the session topic
//! - [`session`]: join codes, the authoritative record, and the store contract
//! - [`events`]: typed events on session topics and toward the embedding UI
//! - [`playback`]: abstraction traits for the local audio engine and identity
//! - [`runtime`]: task spawning abstraction for async runtime independence
//! - [`error`]: centralized error types
//!
//! # Consistency model
//!
//! The protocol replicates full state, not an operation log. Every accepted
//! write produces a post-write snapshot fanned out to all subscribers, and
//! peers apply the latest snapshot they have seen, which keeps the system
//! robust to reordering and at-least-once delivery. Exactly one peer (the
//! host) may write a given session, enforced at the store boundary rather
//! than by client etiquette.
//!
//! # Abstraction Traits
//!
//! The crate defines several traits to decouple core logic from the embedding
//! application:
//!
//! - [`PlaybackEngine`](playback::PlaybackEngine): the local audio engine
//! - [`IdentityProvider`](playback::IdentityProvider): stable peer identity
//! - [`SessionStore`](session::SessionStore): durable session persistence
//! - [`TaskSpawner`](runtime::TaskSpawner): spawning background tasks

#![warn(clippy::all)]

pub mod chat;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod playback;
pub mod reconcile;
pub mod runtime;
pub mod session;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types at the crate root
pub use chat::{ChatMessage, ChatRelay};
pub use config::SyncConfig;
pub use coordinator::{PeerRole, SessionCoordinator};
pub use error::{ErrorCode, SyncError, SyncResult};
pub use events::{ChannelRegistry, LocalPlaybackEvent, PeerEvent, SessionEvent, StateEvent};
pub use lifecycle::{SessionHandle, SessionManager};
pub use playback::{IdentityProvider, PlaybackEngine, StaticIdentity};
pub use reconcile::{reconcile_position, DriftOutcome};
pub use runtime::{BoxedTask, TaskSpawner, TokioSpawner};
pub use session::{
    InMemorySessionStore, SessionPatch, SessionRecord, SessionStore, StoreError, StoreResult,
};
pub use utils::now_millis;
