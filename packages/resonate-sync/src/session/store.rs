//! Session persistence contract and the in-process reference store.
//!
//! The store is the enforcement point for the single-writer invariant: every
//! update carries the writer's identity, and a mismatch affects zero rows
//! rather than being merely ignored client-side.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use crate::events::{ChannelRegistry, SessionEvent, StateEvent};
use crate::session::record::{SessionPatch, SessionRecord};
use crate::utils::now_millis;

/// Errors from session persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same id already exists.
    #[error("Session already exists: {0}")]
    DuplicateId(String),

    /// Backend failure (I/O, connection loss, serialization).
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Convenient Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable storage for session records.
///
/// Implementations fan the post-write snapshot of every accepted write out on
/// the session's broadcast topic, so subscribers observe changes without
/// polling.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a new session record.
    async fn insert(&self, record: SessionRecord) -> StoreResult<()>;

    /// Fetches a record by id.
    async fn get(&self, id: &str) -> StoreResult<Option<SessionRecord>>;

    /// Applies `patch` to the record, but only when `writer_id` matches the
    /// record's host.
    ///
    /// Returns the post-write snapshot, or `None` when the filter matched
    /// zero rows (unknown id, or a writer that is not the host).
    async fn update(
        &self,
        id: &str,
        patch: SessionPatch,
        writer_id: &str,
    ) -> StoreResult<Option<SessionRecord>>;
}

/// In-process reference store backed by a concurrent map.
///
/// Accepted writes bump `revision` and publish the post-write snapshot on the
/// session's topic. Useful as-is for single-process deployments and tests; a
/// hosted backend implements [`SessionStore`] over its own change feed.
pub struct InMemorySessionStore {
    sessions: DashMap<String, SessionRecord>,
    registry: Arc<ChannelRegistry>,
}

impl InMemorySessionStore {
    /// Creates an empty store publishing change snapshots through `registry`.
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self {
            sessions: DashMap::new(),
            registry,
        }
    }

    /// Removes sessions past their expiry. Returns how many were dropped.
    ///
    /// Expired sessions are inert either way (join refuses them); the sweep
    /// just reclaims memory and frees their codes for reuse.
    pub fn purge_expired(&self, now_millis: u64) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, record| !record.is_expired(now_millis));
        let dropped = before - self.sessions.len();
        if dropped > 0 {
            log::info!("[SessionStore] purged {} expired sessions", dropped);
        }
        dropped
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no sessions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, record: SessionRecord) -> StoreResult<()> {
        use dashmap::mapref::entry::Entry;

        match self.sessions.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateId(record.id)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn get(&self, id: &str) -> StoreResult<Option<SessionRecord>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn update(
        &self,
        id: &str,
        patch: SessionPatch,
        writer_id: &str,
    ) -> StoreResult<Option<SessionRecord>> {
        let snapshot = {
            let Some(mut entry) = self.sessions.get_mut(id) else {
                return Ok(None);
            };
            if entry.host_id != writer_id {
                log::debug!(
                    "[SessionStore] rejected write to {} by non-host {}",
                    id,
                    writer_id
                );
                return Ok(None);
            }
            patch.apply_to(&mut entry);
            entry.revision += 1;
            entry.clone()
        };

        self.registry.publish(
            &snapshot.id,
            SessionEvent::State(StateEvent::Changed {
                session: snapshot.clone(),
                timestamp: now_millis(),
            }),
        );
        Ok(Some(snapshot))
    }
}
