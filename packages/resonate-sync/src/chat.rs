//! Ephemeral chat fan-out.
//!
//! Chat rides the same per-session topic as state changes but never touches
//! the store: best-effort delivery, no retry, no cross-peer ordering
//! guarantee. Every subscriber, sender included, appends messages in local
//! receipt order, so two peers may display near-simultaneous messages in a
//! different relative order. That is an accepted trade-off for a
//! non-authoritative side channel.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::{ChannelRegistry, SessionEvent};
use crate::playback::IdentityProvider;
use crate::utils::now_millis;

/// A single chat message. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Client-generated unique id.
    pub id: String,
    /// Identity of the sender.
    pub sender_id: String,
    /// Message body.
    pub text: String,
    /// Sender's local clock in unix millis. Informational only; receivers
    /// order by local receipt, not by this value.
    pub timestamp: u64,
}

/// Fans chat messages out over session topics.
pub struct ChatRelay {
    registry: Arc<ChannelRegistry>,
    identity: Arc<dyn IdentityProvider>,
}

impl ChatRelay {
    /// Creates a relay sending as the given identity.
    pub fn new(registry: Arc<ChannelRegistry>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { registry, identity }
    }

    /// Broadcasts `text` to everyone in the session, sender included.
    ///
    /// Best-effort: with no subscribers the message is dropped silently.
    /// Returns the message as sent; the sender also receives its own copy
    /// from the topic like any other subscriber.
    pub fn send(&self, session_id: &str, text: impl Into<String>) -> ChatMessage {
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            sender_id: self.identity.peer_id(),
            text: text.into(),
            timestamp: now_millis(),
        };
        let reached = self
            .registry
            .publish(session_id, SessionEvent::Chat(message.clone()));
        if reached == 0 {
            tracing::debug!(session_id, "chat message reached no subscribers");
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::StaticIdentity;

    fn relay(registry: &Arc<ChannelRegistry>, peer: &str) -> ChatRelay {
        ChatRelay::new(Arc::clone(registry), Arc::new(StaticIdentity::new(peer)))
    }

    #[tokio::test]
    async fn message_reaches_all_subscribers_including_sender() {
        let registry = Arc::new(ChannelRegistry::new(16));
        let mut sender_rx = registry.subscribe("k3x9ab");
        let mut other_rx = registry.subscribe("k3x9ab");

        let sent = relay(&registry, "listener-2").send("k3x9ab", "turn it up");

        for rx in [&mut sender_rx, &mut other_rx] {
            match rx.recv().await.unwrap() {
                SessionEvent::Chat(message) => {
                    assert_eq!(message, sent);
                    assert_eq!(message.sender_id, "listener-2");
                }
                other => panic!("expected chat, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn send_without_subscribers_is_silent() {
        let registry = Arc::new(ChannelRegistry::new(16));
        let message = relay(&registry, "listener-2").send("empty1", "anyone here?");
        assert_eq!(message.text, "anyone here?");
    }

    #[tokio::test]
    async fn concurrent_senders_tolerate_any_receipt_order() {
        let registry = Arc::new(ChannelRegistry::new(16));
        let mut a_rx = registry.subscribe("k3x9ab");
        let mut b_rx = registry.subscribe("k3x9ab");

        let from_a = relay(&registry, "peer-a").send("k3x9ab", "now this part");
        let from_b = relay(&registry, "peer-b").send("k3x9ab", "wait for it");

        // Each receiver gets both messages; the relative order is whatever
        // its own topic delivered and carries no guarantee across peers.
        for rx in [&mut a_rx, &mut b_rx] {
            let mut texts = Vec::new();
            for _ in 0..2 {
                match rx.recv().await.unwrap() {
                    SessionEvent::Chat(message) => texts.push(message.text),
                    other => panic!("expected chat, got {other:?}"),
                }
            }
            texts.sort();
            assert_eq!(texts, vec![from_a.text.clone(), from_b.text.clone()]);
        }
    }

    #[tokio::test]
    async fn message_ids_are_unique() {
        let registry = Arc::new(ChannelRegistry::new(16));
        let relay = relay(&registry, "listener-2");
        let a = relay.send("k3x9ab", "one");
        let b = relay.send("k3x9ab", "two");
        assert_ne!(a.id, b.id);
    }
}
