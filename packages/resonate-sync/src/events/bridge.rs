//! Per-session broadcast topics.
//!
//! The registry maps each session id to one `tokio::sync::broadcast` topic
//! carrying both state-change notifications and chat payloads. Ordering is
//! preserved within a single publisher's stream only; peers tolerate
//! cross-publisher reordering by applying latest-known full state.

use dashmap::DashMap;
use tokio::sync::broadcast;

use super::SessionEvent;

/// Registry of per-session broadcast topics.
///
/// Topics are created lazily on first subscribe or publish. Publishing with
/// no subscribers is not an error: chat and change notifications are both
/// best-effort at this layer.
pub struct ChannelRegistry {
    topics: DashMap<String, broadcast::Sender<SessionEvent>>,
    capacity: usize,
}

impl ChannelRegistry {
    /// Creates a registry whose topics buffer up to `capacity` events per
    /// subscriber before lagging.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity,
        }
    }

    fn topic(&self, session_id: &str) -> broadcast::Sender<SessionEvent> {
        self.topics
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Returns a new receiver subscribed to the session's topic.
    pub fn subscribe(&self, session_id: &str) -> broadcast::Receiver<SessionEvent> {
        self.topic(session_id).subscribe()
    }

    /// Publishes an event to every subscriber of the session's topic.
    ///
    /// Returns the number of subscribers the event reached.
    pub fn publish(&self, session_id: &str, event: SessionEvent) -> usize {
        match self.topic(session_id).send(event) {
            Ok(reached) => reached,
            Err(_) => {
                log::trace!("[ChannelRegistry] no subscribers on {}", session_id);
                0
            }
        }
    }

    /// Number of live subscribers on the session's topic.
    #[must_use]
    pub fn subscriber_count(&self, session_id: &str) -> usize {
        self.topics
            .get(session_id)
            .map(|topic| topic.receiver_count())
            .unwrap_or(0)
    }

    /// Drops the session's topic entirely.
    ///
    /// Existing receivers observe a closed channel; new subscribers get a
    /// fresh topic.
    pub fn drop_topic(&self, session_id: &str) {
        self.topics.remove(session_id);
    }
}
