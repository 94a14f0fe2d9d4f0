//! Session memory store
//!
//! Process-local mapping from session id to a bounded, expiring turn history.
//!
//! Concurrency model: the map itself is guarded by a `parking_lot::RwLock`
//! for cheap concurrent lookups, and every session carries its own
//! `tokio::sync::Mutex`. The orchestrator holds that per-session lock across
//! its read-history -> synthesize -> append sequence, so turns for one
//! session never interleave while different sessions proceed fully in
//! parallel. The expiry sweep uses `try_lock`: a session whose lock is held
//! has in-flight activity and is skipped rather than raced.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::Mutex;

use doc_agent_core::ConversationTurn;

/// Session store configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle TTL; no session survives longer than this since last activity
    pub ttl: Duration,
    /// Maximum retained turns per session (FIFO eviction)
    pub max_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(1800),
            max_turns: 10,
        }
    }
}

/// One conversation's bounded history
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session identifier
    pub id: String,
    turns: VecDeque<ConversationTurn>,
    last_activity: DateTime<Utc>,
}

impl Session {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            turns: VecDeque::new(),
            last_activity: Utc::now(),
        }
    }

    /// Turns in chronological order
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    /// Number of retained turns
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// When this session last saw activity
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Append a turn, evicting the oldest when over `max_turns`
    pub fn record_turn(&mut self, turn: ConversationTurn, max_turns: usize) {
        self.turns.push_back(turn);
        while self.turns.len() > max_turns {
            self.turns.pop_front();
        }
        self.last_activity = Utc::now();
    }

    /// Drop all turns and restart the idle clock; used when a request lands
    /// on a session that expired but has not been swept yet.
    pub(crate) fn restart(&mut self) {
        self.turns.clear();
        self.last_activity = Utc::now();
    }

    pub(crate) fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now - self.last_activity > ttl,
            Err(_) => false,
        }
    }
}

/// Handle holding a session behind its exclusive lock
pub struct SessionHandle {
    pub(crate) state: Mutex<Session>,
}

impl SessionHandle {
    /// Clone of the current session state, regardless of expiry
    pub async fn snapshot(&self) -> Session {
        self.state.lock().await.clone()
    }
}

/// Process-local session memory store
pub struct SessionStore {
    config: SessionConfig,
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get the handle for a session id, creating the session if absent
    pub fn handle(&self, id: &str) -> Arc<SessionHandle> {
        if let Some(handle) = self.sessions.read().get(id) {
            return Arc::clone(handle);
        }

        let mut sessions = self.sessions.write();
        Arc::clone(sessions.entry(id.to_string()).or_insert_with(|| {
            Arc::new(SessionHandle {
                state: Mutex::new(Session::new(id)),
            })
        }))
    }

    /// Snapshot of a session's state, or `None` when absent or expired
    pub async fn get(&self, id: &str) -> Option<Session> {
        let handle = {
            let sessions = self.sessions.read();
            sessions.get(id).cloned()
        }?;

        let session = handle.state.lock().await;
        if session.is_expired(Utc::now(), self.config.ttl) {
            return None;
        }
        Some(session.clone())
    }

    /// Append a turn, creating the session if absent
    pub async fn append(&self, id: &str, turn: ConversationTurn) {
        let handle = self.handle(id);
        let mut session = handle.state.lock().await;
        self.reattach(id, &handle);
        session.record_turn(turn, self.config.max_turns);
    }

    /// Put a handle back in the map if a sweep removed it between lookup and
    /// lock acquisition. Callers must hold the session's lock, which keeps
    /// the sweep from removing the entry again until they release it.
    pub(crate) fn reattach(&self, id: &str, handle: &Arc<SessionHandle>) {
        let mut sessions = self.sessions.write();
        sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::clone(handle));
    }

    /// Destroy a session
    pub fn reset(&self, id: &str) {
        if self.sessions.write().remove(id).is_some() {
            tracing::debug!(session_id = %id, "session reset");
        }
    }

    /// Remove sessions idle past the TTL as of `now`; returns the count
    /// removed.
    ///
    /// Sessions whose lock is currently held are in flight and are left for
    /// the next sweep.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let candidates: Vec<(String, Arc<SessionHandle>)> = {
            let sessions = self.sessions.read();
            sessions
                .iter()
                .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
                .collect()
        };

        let mut removed = 0;
        for (id, handle) in candidates {
            let Ok(session) = handle.state.try_lock() else {
                continue;
            };
            if session.is_expired(now, self.config.ttl) {
                // The entry is removed while the session lock is still held;
                // a request that fetched this handle earlier re-inserts it
                // via `reattach` under the same lock, so no committed turn
                // can land in an unmapped handle.
                self.sessions.write().remove(&id);
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed, "swept expired sessions");
        }
        removed
    }

    /// Number of live sessions
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }
}

/// Spawn the recurring idle-session sweep
pub fn spawn_sweeper(store: Arc<SessionStore>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it
        ticker.tick().await;
        loop {
            ticker.tick().await;
            store.sweep_expired(Utc::now()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(ttl: Duration, max_turns: usize) -> SessionStore {
        SessionStore::new(SessionConfig { ttl, max_turns })
    }

    fn turn(n: usize) -> ConversationTurn {
        ConversationTurn::new(format!("q{}", n), format!("a{}", n))
    }

    #[tokio::test]
    async fn test_append_creates_session() {
        let store = store(Duration::from_secs(60), 10);
        assert!(store.get("abc").await.is_none());

        store.append("abc", turn(1)).await;
        let session = store.get("abc").await.unwrap();
        assert_eq!(session.turn_count(), 1);
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn test_fifo_eviction_at_max_turns() {
        let store = store(Duration::from_secs(60), 3);
        for n in 1..=5 {
            store.append("abc", turn(n)).await;
        }

        let session = store.get("abc").await.unwrap();
        assert_eq!(session.turn_count(), 3);
        let turns = session.turns();
        assert_eq!(turns[0].query, "q3");
        assert_eq!(turns[2].query, "q5");
    }

    #[tokio::test]
    async fn test_reset_removes_session() {
        let store = store(Duration::from_secs(60), 10);
        store.append("abc", turn(1)).await;

        store.reset("abc");
        assert!(store.get("abc").await.is_none());
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn test_sweep_removes_idle_sessions() {
        let store = store(Duration::from_secs(60), 10);
        store.append("idle", turn(1)).await;
        store.append("fresh", turn(1)).await;

        // Nothing is expired yet
        assert_eq!(store.sweep_expired(Utc::now()).await, 0);

        let later = Utc::now() + chrono::Duration::seconds(120);
        assert_eq!(store.sweep_expired(later).await, 2);
        assert_eq!(store.count(), 0);
        assert!(store.get("idle").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_absent_before_sweep() {
        let store = store(Duration::from_millis(1), 10);
        store.append("abc", turn(1)).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.get("abc").await.is_none());
    }

    #[tokio::test]
    async fn test_sweep_skips_locked_session() {
        let store = store(Duration::from_secs(60), 10);
        store.append("busy", turn(1)).await;

        let handle = store.handle("busy");
        let guard = handle.state.lock().await;

        let later = Utc::now() + chrono::Duration::seconds(120);
        assert_eq!(store.sweep_expired(later).await, 0);
        drop(guard);

        assert_eq!(store.sweep_expired(later).await, 1);
    }

    #[tokio::test]
    async fn test_turn_survives_sweep_between_lookup_and_lock() {
        let store = store(Duration::from_secs(60), 10);
        store.append("abc", turn(1)).await;

        // A request fetches the handle, then a sweep evicts the idle session
        // before the request acquires the lock
        let handle = store.handle("abc");
        let later = Utc::now() + chrono::Duration::seconds(120);
        assert_eq!(store.sweep_expired(later).await, 1);
        assert!(store.get("abc").await.is_none());

        // The request proceeds under the lock, re-inserting the handle
        let mut session = handle.state.lock().await;
        store.reattach("abc", &handle);
        session.record_turn(turn(2), 10);
        drop(session);

        let session = store.get("abc").await.unwrap();
        assert_eq!(session.turn_count(), 2);
        assert_eq!(session.turns()[1].query, "q2");
    }

    #[tokio::test]
    async fn test_one_session_per_identifier() {
        let store = store(Duration::from_secs(60), 10);
        let a = store.handle("abc");
        let b = store.handle("abc");
        assert!(Arc::ptr_eq(&a, &b));
    }
}
