//! Event types flowing over session topics and into the embedding UI.
//!
//! This module provides:
//! - [`SessionEvent`], the wire enum carried on a session's broadcast topic
//! - [`PeerEvent`], what a peer surfaces to its UI after processing
//! - [`LocalPlaybackEvent`], engine notifications driving the outbound path
//! - [`ChannelRegistry`] for per-session topic fan-out

mod bridge;

pub use bridge::ChannelRegistry;

use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;
use crate::session::record::SessionRecord;

/// Events carried on a session's broadcast topic.
///
/// One topic per session id carries both categories; chat never touches the
/// store, state snapshots always originate from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum SessionEvent {
    /// Post-write snapshot fanned out by the store's change feed.
    State(StateEvent),

    /// Ephemeral chat payload (never persisted).
    Chat(ChatMessage),
}

/// Events describing authoritative session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StateEvent {
    /// The session record changed; `session` is the full post-write snapshot.
    ///
    /// Delivery is at-least-once and may duplicate; consumers drop snapshots
    /// whose `revision` they have already applied.
    Changed {
        /// The full post-write snapshot.
        session: SessionRecord,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Local playback engine notifications that drive the outbound path.
///
/// The embedding app forwards these from its engine via
/// [`SessionHandle::playback_changed`](crate::lifecycle::SessionHandle::playback_changed).
#[derive(Debug, Clone, PartialEq)]
pub enum LocalPlaybackEvent {
    /// A different sound was selected.
    SoundChanged(String),
    /// A different variation of the current sound was selected.
    VariationChanged(u32),
    /// Playback was started or resumed.
    Played,
    /// Playback was paused.
    Paused,
    /// Playback was scrubbed to a position (percent of duration).
    Seeked(f32),
}

/// Events surfaced to the embedding UI through a session handle.
///
/// Only events that survived processing appear here: self-echoes and stale
/// duplicates are already filtered out.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// A remote snapshot was applied to the local engine.
    StateUpdated(SessionRecord),
    /// A chat message arrived (possibly our own copy coming back).
    ChatReceived(ChatMessage),
}

// From implementations for building topic events
impl From<StateEvent> for SessionEvent {
    fn from(event: StateEvent) -> Self {
        SessionEvent::State(event)
    }
}

impl From<ChatMessage> for SessionEvent {
    fn from(message: ChatMessage) -> Self {
        SessionEvent::Chat(message)
    }
}
