//! Trait abstractions for the local playback engine and peer identity.
//!
//! These traits enable dependency injection for testability and keep the sync
//! core free of any audio decoding or account concerns. The engine is an
//! in-process collaborator, so its methods are synchronous; a slow network
//! must never be able to block a local transport control.

/// Trait for the local audio playback engine.
///
/// The coordinator drives this when applying remote state, and the embedding
/// app forwards the engine's own notifications back in as
/// [`LocalPlaybackEvent`](crate::events::LocalPlaybackEvent)s.
pub trait PlaybackEngine: Send + Sync {
    /// Starts or resumes playback.
    fn play(&self);

    /// Pauses playback.
    fn pause(&self);

    /// Seeks to a position expressed as percent of track duration, in `[0, 100]`.
    ///
    /// Percent rather than seconds: each peer scales to its own decoded track
    /// length, which can differ slightly between local copies.
    fn seek(&self, percent: f32);

    /// Switches to a different sound.
    fn switch_sound(&self, sound_id: &str);

    /// Switches to a different variation of the current sound.
    fn switch_variation(&self, index: u32);

    /// Current playback position in seconds.
    fn current_position(&self) -> f32;

    /// Duration of the loaded track in seconds. `0.0` when nothing is loaded.
    fn duration(&self) -> f32;
}

/// Trait for supplying the caller's stable identity.
///
/// The returned id is used verbatim as a session's `host_id` when creating,
/// and as the self-echo filter when consuming snapshots from the topic.
pub trait IdentityProvider: Send + Sync {
    /// Returns the stable identity of this peer.
    fn peer_id(&self) -> String;
}

/// Identity provider backed by a fixed string.
///
/// Suitable when the embedding app resolves the account id once at login.
pub struct StaticIdentity(String);

impl StaticIdentity {
    /// Creates a provider that always returns `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl IdentityProvider for StaticIdentity {
    fn peer_id(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_identity_returns_fixed_id() {
        let identity = StaticIdentity::new("listener-7");
        assert_eq!(identity.peer_id(), "listener-7");
        assert_eq!(identity.peer_id(), "listener-7");
    }
}
