//! Collaboration Session Manager
//!
//! Keeps one session per shared document. A session holds a bounded delivery
//! queue for every participant plus the last full document state, so late
//! joiners can be brought up to date. Accepted updates are persisted as
//! snapshots through the background task pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::task_pool::TaskPool;
use crate::domain::{
    CursorPosition, Identity, ParticipantInfo, SnapshotChange, SnapshotStore, SyncMessage, Update,
};
use crate::infrastructure::metrics;
use crate::shared::delivery::{FanOut, OutboundEvent, OutboundQueue};

struct Participant {
    id: u64,
    username: String,
    queue: OutboundQueue<OutboundEvent>,
    last_seen: i64,
}

/// Receiving side handed to a new participant.
pub struct Subscription {
    /// Distinguishes this registration from a later one of the same identity
    pub participant_id: u64,
    pub events: mpsc::Receiver<OutboundEvent>,
}

/// Live state of one shared document.
pub struct CollaborationSession {
    document_id: String,
    participants: RwLock<HashMap<Identity, Participant>>,
    state: RwLock<Option<Value>>,
    last_activity: Mutex<Instant>,
    next_participant_id: AtomicU64,
}

impl CollaborationSession {
    fn new(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            participants: RwLock::new(HashMap::new()),
            state: RwLock::new(None),
            last_activity: Mutex::new(Instant::now()),
            next_participant_id: AtomicU64::new(1),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn participant_count(&self) -> usize {
        self.participants.read().len()
    }

    pub fn has_participant(&self, identity: &Identity) -> bool {
        self.participants.read().contains_key(identity)
    }

    /// Last full document state received, if any.
    pub fn state(&self) -> Option<Value> {
        self.state.read().clone()
    }

    fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    fn mark_seen(&self, identity: &Identity) {
        if let Some(participant) = self.participants.write().get_mut(identity) {
            participant.last_seen = Utc::now().timestamp();
        }
    }

    fn username_of(&self, identity: &Identity) -> Option<String> {
        self.participants
            .read()
            .get(identity)
            .map(|p| p.username.clone())
    }

    /// Deliver to every participant, optionally skipping one identity.
    fn fan_out(&self, event: OutboundEvent, skip: Option<&Identity>) -> FanOut {
        let participants = self.participants.read();
        let mut tally = FanOut::default();

        for (identity, participant) in participants.iter() {
            if skip == Some(identity) {
                continue;
            }
            tally.record(participant.queue.try_send(event.clone()));
        }

        tally
    }
}

/// Registry of collaboration sessions keyed by document id.
pub struct CollaborationManager {
    sessions: DashMap<String, Arc<CollaborationSession>>,
    participant_queue_capacity: usize,
    snapshots: Arc<dyn SnapshotStore>,
    tasks: TaskPool,
}

impl CollaborationManager {
    pub fn new(
        participant_queue_capacity: usize,
        snapshots: Arc<dyn SnapshotStore>,
        tasks: TaskPool,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            participant_queue_capacity,
            snapshots,
            tasks,
        }
    }

    /// Return the session for `document_id`, creating it if needed.
    pub fn get_or_create(&self, document_id: &str) -> Arc<CollaborationSession> {
        let session = self
            .sessions
            .entry(document_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(document_id = %document_id, "Collaboration session created");
                Arc::new(CollaborationSession::new(document_id))
            })
            .clone();
        session.touch();
        metrics::set_collab_sessions(self.sessions.len());
        session
    }

    /// Lookup without creation.
    pub fn get(&self, document_id: &str) -> Option<Arc<CollaborationSession>> {
        self.sessions.get(document_id).map(|s| s.clone())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Register `identity` in the session and return its event stream.
    ///
    /// An earlier registration of the same identity is replaced and its
    /// queue closed. A joiner receives the last known state right away.
    pub fn add_participant(
        &self,
        session: &CollaborationSession,
        identity: Identity,
        username: &str,
    ) -> Subscription {
        let (queue, events) = OutboundQueue::bounded(self.participant_queue_capacity);
        let participant_id = session.next_participant_id.fetch_add(1, Ordering::Relaxed);

        if let Some(state) = session.state() {
            if let Some(event) = encode(&SyncMessage::state(&session.document_id, state)) {
                queue.try_send(event);
            }
        }

        let previous = session.participants.write().insert(
            identity.clone(),
            Participant {
                id: participant_id,
                username: username.to_string(),
                queue,
                last_seen: Utc::now().timestamp(),
            },
        );
        if let Some(previous) = previous {
            previous.queue.close();
        }
        session.touch();

        tracing::debug!(
            document_id = %session.document_id,
            user_id = %identity,
            "Participant joined collaboration session"
        );

        Subscription {
            participant_id,
            events,
        }
    }

    /// Remove `identity` from the session and close its queue.
    pub fn remove_participant(&self, session: &CollaborationSession, identity: &Identity) -> bool {
        let removed = session.participants.write().remove(identity);
        session.touch();
        match removed {
            Some(participant) => {
                participant.queue.close();
                tracing::debug!(
                    document_id = %session.document_id,
                    user_id = %identity,
                    "Participant left collaboration session"
                );
                true
            }
            None => false,
        }
    }

    /// Remove `identity` only if it is still registered as `participant_id`.
    pub fn remove_participant_if(
        &self,
        session: &CollaborationSession,
        identity: &Identity,
        participant_id: u64,
    ) -> bool {
        let mut participants = session.participants.write();
        let current = participants
            .get(identity)
            .is_some_and(|p| p.id == participant_id);
        if !current {
            return false;
        }

        if let Some(participant) = participants.remove(identity) {
            participant.queue.close();
        }
        drop(participants);
        session.touch();
        true
    }

    /// Send an update to every participant, the author included, and
    /// persist a snapshot in the background.
    pub fn broadcast_update(
        &self,
        session: &CollaborationSession,
        author: &Identity,
        mut update: Update,
    ) -> FanOut {
        update.user_id = author.clone();
        if update.username.is_empty() {
            update.username = session.username_of(author).unwrap_or_default();
        }
        if update.timestamp == 0 {
            update.timestamp = Utc::now().timestamp_millis();
        }

        session.touch();
        session.mark_seen(author);

        let change = SnapshotChange {
            changed_by: author.clone(),
            description: update.kind.as_str().to_string(),
            content: session.state(),
        };

        let tally = match encode(&SyncMessage::update(&session.document_id, update)) {
            Some(event) => session.fan_out(event, None),
            None => FanOut::default(),
        };
        metrics::record_dropped("collab_update", tally.dropped);

        let store = self.snapshots.clone();
        let document_id = session.document_id.clone();
        self.tasks.submit("save_snapshot", async move {
            store.save_snapshot(&document_id, &change).await?;
            Ok(())
        });

        tally
    }

    /// Send a cursor position to every participant except its originator.
    pub fn broadcast_cursor(
        &self,
        session: &CollaborationSession,
        origin: &Identity,
        mut cursor: CursorPosition,
    ) -> FanOut {
        cursor.user_id = origin.clone();
        if cursor.username.is_empty() {
            cursor.username = session.username_of(origin).unwrap_or_default();
        }

        session.touch();
        session.mark_seen(origin);

        let tally = match encode(&SyncMessage::cursor(&session.document_id, cursor)) {
            Some(event) => session.fan_out(event, Some(origin)),
            None => FanOut::default(),
        };
        metrics::record_dropped("collab_cursor", tally.dropped);
        tally
    }

    /// Replace the document state and share it with everyone but `origin`.
    pub fn sync_state(
        &self,
        session: &CollaborationSession,
        origin: &Identity,
        state: Value,
    ) -> FanOut {
        *session.state.write() = Some(state.clone());
        session.touch();
        session.mark_seen(origin);

        let tally = match encode(&SyncMessage::state(&session.document_id, state)) {
            Some(event) => session.fan_out(event, Some(origin)),
            None => FanOut::default(),
        };
        metrics::record_dropped("collab_state", tally.dropped);
        tally
    }

    /// Participants of the session, ordered by identity.
    pub fn list_participants(&self, session: &CollaborationSession) -> Vec<ParticipantInfo> {
        let mut list: Vec<ParticipantInfo> = session
            .participants
            .read()
            .iter()
            .map(|(identity, p)| ParticipantInfo {
                user_id: identity.clone(),
                username: p.username.clone(),
                last_seen: p.last_seen,
            })
            .collect();
        list.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        list
    }

    /// Remove `identity` from every session. Returns the affected document ids.
    pub fn remove_identity(&self, identity: &Identity) -> Vec<String> {
        let sessions: Vec<Arc<CollaborationSession>> =
            self.sessions.iter().map(|entry| entry.value().clone()).collect();

        let mut documents: Vec<String> = sessions
            .iter()
            .filter(|session| self.remove_participant(session, identity))
            .map(|session| session.document_id.clone())
            .collect();
        documents.sort();
        documents
    }

    /// Drop sessions without participants that have been idle for `ttl`.
    pub fn prune_idle(&self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.participant_count() > 0 || session.idle_for() < ttl);
        let pruned = before.saturating_sub(self.sessions.len());

        metrics::set_collab_sessions(self.sessions.len());
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned idle collaboration sessions");
        }
        pruned
    }

    /// Periodically prune idle sessions.
    pub fn spawn_pruner(self: &Arc<Self>, every: Duration, ttl: Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                manager.prune_idle(ttl);
            }
        })
    }
}

fn encode(message: &SyncMessage) -> Option<OutboundEvent> {
    match serde_json::to_value(message) {
        Ok(value) => Some(Arc::new(value)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode sync message");
            None
        }
    }
}
