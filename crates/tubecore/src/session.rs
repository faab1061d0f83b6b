//! Per-identity session state.
//!
//! A session is created when a user submits a link and lives until their
//! format choice resolves. The store is owned by the orchestrator and shared
//! behind an `Arc`; every mutation is a single critical section so concurrent
//! events for the same identity cannot interleave.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

use crate::catalog::Candidate;
use crate::core::error::AppError;

/// Who a session belongs to (the chat user id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityId(pub i64);

/// Lifecycle of an active session. No entry means idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Formats presented, waiting for a choice
    Selecting,
    /// A choice is being downloaded
    Retrieving,
}

/// Caption data captured at presentation time
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub title: String,
    pub author: String,
    pub duration_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub source_url: Url,
    /// The presented (deduplicated, ordered) list; fallback looks up here
    pub candidates: Vec<Candidate>,
    pub summary: SessionSummary,
    pub state: SessionState,
    /// Distinguishes this session from a later one for the same identity
    pub generation: u64,
}

/// Shared session map
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<IdentityId, Session>>>,
    next_generation: Arc<AtomicU64>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a fresh `Selecting` session, replacing any previous one (last write wins).
    ///
    /// Returns the generation of the new session.
    pub async fn open(&self, identity: IdentityId, source_url: Url, candidates: Vec<Candidate>, summary: SessionSummary) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let session = Session {
            source_url,
            candidates,
            summary,
            state: SessionState::Selecting,
            generation,
        };

        let mut sessions = self.sessions.lock().await;
        if let Some(previous) = sessions.insert(identity, session) {
            log::info!(
                "Session for {:?} replaced (generation {} -> {}, was {:?})",
                identity,
                previous.generation,
                generation,
                previous.state
            );
        }
        generation
    }

    /// Moves a `Selecting` session to `Retrieving` and returns a snapshot of it.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` when there is no session, `AlreadyInProgress` when a
    /// previous choice for this identity is still downloading.
    pub async fn begin_retrieval(&self, identity: IdentityId) -> Result<Session, AppError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&identity).ok_or(AppError::SessionNotFound)?;
        if session.state == SessionState::Retrieving {
            return Err(AppError::AlreadyInProgress);
        }
        session.state = SessionState::Retrieving;
        Ok(session.clone())
    }

    /// Removes the session if it is still the given generation.
    ///
    /// A newer session opened by the same identity mid-download survives.
    pub async fn close(&self, identity: IdentityId, generation: u64) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(&identity) {
            Some(session) if session.generation == generation => {
                sessions.remove(&identity);
                true
            }
            _ => false,
        }
    }

    pub async fn get(&self, identity: IdentityId) -> Option<Session> {
        self.sessions.lock().await.get(&identity).cloned()
    }

    pub async fn contains(&self, identity: IdentityId) -> bool {
        self.sessions.lock().await.contains_key(&identity)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every session (used on shutdown).
    pub async fn clear(&self) {
        self.sessions.lock().await.clear();
    }
}
