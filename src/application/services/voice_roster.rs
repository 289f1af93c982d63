//! Voice Roster
//!
//! Authoritative in-memory record of who occupies each voice channel.
//! Channels exist only while they have participants.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::domain::{Identity, VoiceParticipant};
use crate::infrastructure::metrics;

type ChannelMembers = HashMap<Identity, VoiceParticipant>;

/// Per-channel voice membership guarded by a single read/write lock.
#[derive(Default)]
pub struct VoiceRoster {
    channels: RwLock<HashMap<String, ChannelMembers>>,
}

impl VoiceRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `user_id`'s entry in `channel_id`.
    pub fn join(
        &self,
        channel_id: &str,
        user_id: Identity,
        username: &str,
        avatar: &str,
        is_muted: bool,
        is_deafened: bool,
    ) {
        let mut channels = self.channels.write();
        let participant =
            VoiceParticipant::new(user_id.clone(), username, avatar, is_muted, is_deafened);
        channels
            .entry(channel_id.to_string())
            .or_default()
            .insert(user_id, participant);
        metrics::set_voice_channels(channels.len());
    }

    /// Remove `user_id` from `channel_id`. Returns whether an entry was removed.
    pub fn leave(&self, channel_id: &str, user_id: &Identity) -> bool {
        let mut channels = self.channels.write();
        let Some(members) = channels.get_mut(channel_id) else {
            return false;
        };

        let removed = members.remove(user_id).is_some();
        if members.is_empty() {
            channels.remove(channel_id);
        }
        metrics::set_voice_channels(channels.len());
        removed
    }

    /// Update flags of a present participant; absent participants are ignored.
    pub fn update_state(
        &self,
        channel_id: &str,
        user_id: &Identity,
        is_muted: bool,
        is_deafened: bool,
    ) -> bool {
        let mut channels = self.channels.write();
        match channels
            .get_mut(channel_id)
            .and_then(|members| members.get_mut(user_id))
        {
            Some(participant) => {
                participant.is_muted = is_muted;
                participant.is_deafened = is_deafened;
                true
            }
            None => false,
        }
    }

    /// Copy of the channel's participants, ordered by user id.
    pub fn get_participants(&self, channel_id: &str) -> Vec<VoiceParticipant> {
        let channels = self.channels.read();
        let mut participants: Vec<VoiceParticipant> = channels
            .get(channel_id)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default();
        participants.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        participants
    }

    /// Remove `user_id` from every channel, pruning emptied channels.
    ///
    /// Returns the ids of the channels the user was removed from.
    pub fn remove_identity(&self, user_id: &Identity) -> Vec<String> {
        let mut channels = self.channels.write();
        let mut left = Vec::new();

        channels.retain(|channel_id, members| {
            if members.remove(user_id).is_some() {
                left.push(channel_id.clone());
            }
            !members.is_empty()
        });

        metrics::set_voice_channels(channels.len());
        left.sort();
        left
    }

    /// Number of occupied channels.
    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    pub fn contains_channel(&self, channel_id: &str) -> bool {
        self.channels.read().contains_key(channel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(value: &str) -> Identity {
        Identity::new(value)
    }

    #[test]
    fn test_join_then_query() {
        let roster = VoiceRoster::new();
        roster.join("v1", id("42"), "alice", "", false, false);

        let participants = roster.get_participants("v1");
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].user_id, id("42"));
        assert!(!participants[0].is_muted);
    }

    #[test]
    fn test_double_join_keeps_single_entry() {
        let roster = VoiceRoster::new();
        roster.join("v1", id("42"), "alice", "", false, false);
        roster.join("v1", id("42"), "alice", "a.png", true, false);

        let participants = roster.get_participants("v1");
        assert_eq!(participants.len(), 1);
        assert!(participants[0].is_muted);
        assert_eq!(participants[0].avatar, "a.png");
    }

    #[test]
    fn test_leave_prunes_empty_channel() {
        let roster = VoiceRoster::new();
        roster.join("v1", id("42"), "alice", "", false, false);

        assert!(roster.leave("v1", &id("42")));
        assert!(!roster.contains_channel("v1"));
        assert_eq!(roster.channel_count(), 0);
        assert!(roster.get_participants("v1").is_empty());
    }

    #[test]
    fn test_leave_unknown_is_noop() {
        let roster = VoiceRoster::new();
        roster.join("v1", id("1"), "bob", "", false, false);

        assert!(!roster.leave("v1", &id("2")));
        assert!(!roster.leave("v9", &id("1")));
        assert_eq!(roster.get_participants("v1").len(), 1);
    }

    #[test]
    fn test_update_state_only_for_present_participant() {
        let roster = VoiceRoster::new();
        roster.join("v1", id("1"), "bob", "", false, false);

        assert!(roster.update_state("v1", &id("1"), true, true));
        assert!(!roster.update_state("v1", &id("2"), true, true));
        assert!(!roster.update_state("v2", &id("1"), true, true));

        let participants = roster.get_participants("v1");
        assert_eq!(participants.len(), 1);
        assert!(participants[0].is_muted && participants[0].is_deafened);
        assert!(!roster.contains_channel("v2"));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let roster = VoiceRoster::new();
        roster.join("v1", id("1"), "bob", "", false, false);

        let before = roster.get_participants("v1");
        roster.update_state("v1", &id("1"), true, false);

        assert!(!before[0].is_muted);
        assert!(roster.get_participants("v1")[0].is_muted);
    }

    #[test]
    fn test_remove_identity_from_all_channels() {
        let roster = VoiceRoster::new();
        roster.join("v1", id("1"), "bob", "", false, false);
        roster.join("v2", id("1"), "bob", "", false, false);
        roster.join("v2", id("2"), "carol", "", false, false);

        let left = roster.remove_identity(&id("1"));

        assert_eq!(left, vec!["v1".to_string(), "v2".to_string()]);
        assert!(!roster.contains_channel("v1"));
        let v2 = roster.get_participants("v2");
        assert_eq!(v2.len(), 1);
        assert_eq!(v2[0].user_id, id("2"));
    }

    #[test]
    fn test_participants_sorted_by_user_id() {
        let roster = VoiceRoster::new();
        roster.join("v1", id("b"), "b", "", false, false);
        roster.join("v1", id("a"), "a", "", false, false);

        let ids: Vec<String> = roster
            .get_participants("v1")
            .into_iter()
            .map(|p| p.user_id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
