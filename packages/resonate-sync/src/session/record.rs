//! Authoritative session state and field-level patches.

use serde::{Deserialize, Serialize};

/// Authoritative shared playback state for one listening session.
///
/// Mutated only by the host peer (enforced at the store boundary); followers
/// mirror it and never write it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Join code, doubling as the primary key.
    pub id: String,
    /// Identity of the only peer allowed to mutate this record.
    pub host_id: String,
    /// Currently selected sound.
    pub current_sound_id: String,
    /// Selected variation of the sound.
    pub variation_index: u32,
    /// Transport state.
    pub is_playing: bool,
    /// Playback position as percent of track duration, in `[0, 100]`.
    ///
    /// Percent rather than wall-clock seconds keeps the value meaningful
    /// across followers whose decoded copies of a track differ slightly in
    /// length.
    pub playback_position: f32,
    /// Monotonically increasing write counter, bumped by the store on every
    /// accepted write. Consumers drop snapshots at or below the revision they
    /// have already applied.
    pub revision: u64,
    /// Unix millis at creation.
    pub created_at: u64,
    /// Unix millis after which the session is inert; joining must fail.
    pub expires_at: u64,
}

impl SessionRecord {
    /// Whether the session is past its expiry at `now_millis`.
    #[must_use]
    pub fn is_expired(&self, now_millis: u64) -> bool {
        now_millis >= self.expires_at
    }
}

/// Field-level patch applied to a [`SessionRecord`].
///
/// `None` fields are left untouched. Patches merge last-write-wins, which is
/// what lets rapid local events coalesce into a single store write:
/// intermediate states are allowed to be lost, the protocol replicates state,
/// not commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    /// New sound selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_sound_id: Option<String>,
    /// New variation selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation_index: Option<u32>,
    /// New transport state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_playing: Option<bool>,
    /// New playback position (percent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_position: Option<f32>,
}

impl SessionPatch {
    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current_sound_id.is_none()
            && self.variation_index.is_none()
            && self.is_playing.is_none()
            && self.playback_position.is_none()
    }

    /// Merges `other` over `self`; fields set in `other` win.
    pub fn merge(&mut self, other: SessionPatch) {
        if other.current_sound_id.is_some() {
            self.current_sound_id = other.current_sound_id;
        }
        if other.variation_index.is_some() {
            self.variation_index = other.variation_index;
        }
        if other.is_playing.is_some() {
            self.is_playing = other.is_playing;
        }
        if other.playback_position.is_some() {
            self.playback_position = other.playback_position;
        }
    }

    /// Applies the set fields to a record.
    pub fn apply_to(&self, record: &mut SessionRecord) {
        if let Some(sound_id) = &self.current_sound_id {
            record.current_sound_id = sound_id.clone();
        }
        if let Some(index) = self.variation_index {
            record.variation_index = index;
        }
        if let Some(playing) = self.is_playing {
            record.is_playing = playing;
        }
        if let Some(position) = self.playback_position {
            record.playback_position = position;
        }
    }

    /// Clears fields whose value equals the baseline snapshot, leaving only
    /// actual changes to publish.
    pub fn retain_changes_from(&mut self, baseline: &SessionRecord) {
        if self.current_sound_id.as_deref() == Some(baseline.current_sound_id.as_str()) {
            self.current_sound_id = None;
        }
        if self.variation_index == Some(baseline.variation_index) {
            self.variation_index = None;
        }
        if self.is_playing == Some(baseline.is_playing) {
            self.is_playing = None;
        }
        if self.playback_position == Some(baseline.playback_position) {
            self.playback_position = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> SessionRecord {
        SessionRecord {
            id: "k3x9ab".to_string(),
            host_id: "host-1".to_string(),
            current_sound_id: "rainfall".to_string(),
            variation_index: 0,
            is_playing: true,
            playback_position: 0.0,
            revision: 0,
            created_at: 1_700_000_000_000,
            expires_at: 1_700_021_600_000,
        }
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let record = sample_record();
        assert!(!record.is_expired(record.expires_at - 1));
        assert!(record.is_expired(record.expires_at));
        assert!(record.is_expired(record.expires_at + 1));
    }

    #[test]
    fn apply_to_only_touches_set_fields() {
        let mut record = sample_record();
        let patch = SessionPatch {
            is_playing: Some(false),
            playback_position: Some(42.5),
            ..Default::default()
        };
        patch.apply_to(&mut record);

        assert!(!record.is_playing);
        assert_eq!(record.playback_position, 42.5);
        assert_eq!(record.current_sound_id, "rainfall");
        assert_eq!(record.variation_index, 0);
    }

    #[test]
    fn merge_is_last_write_wins() {
        let mut patch = SessionPatch {
            playback_position: Some(10.0),
            is_playing: Some(true),
            ..Default::default()
        };
        patch.merge(SessionPatch {
            playback_position: Some(60.0),
            ..Default::default()
        });

        assert_eq!(patch.playback_position, Some(60.0));
        assert_eq!(patch.is_playing, Some(true));
    }

    #[test]
    fn retain_changes_drops_no_op_fields() {
        let baseline = sample_record();
        let mut patch = SessionPatch {
            current_sound_id: Some("rainfall".to_string()),
            is_playing: Some(false),
            ..Default::default()
        };
        patch.retain_changes_from(&baseline);

        assert_eq!(patch.current_sound_id, None);
        assert_eq!(patch.is_playing, Some(false));
        assert!(!patch.is_empty());
    }

    #[test]
    fn record_serializes_to_camel_case() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["hostId"], "host-1");
        assert_eq!(json["currentSoundId"], "rainfall");
        assert_eq!(json["isPlaying"], true);
        assert_eq!(json["playbackPosition"], 0.0);
        assert_eq!(json["expiresAt"], 1_700_021_600_000u64);
    }

    #[test]
    fn empty_patch_serializes_to_empty_object() {
        let json = serde_json::to_string(&SessionPatch::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
