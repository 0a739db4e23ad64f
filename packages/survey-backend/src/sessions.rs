//! In-memory session store
//!
//! Each session's state sits behind its own async mutex so "load, step, save"
//! is serialized per session while different sessions proceed independently.
//! The outer map lock is only held for lookups and inserts.

use std::collections::HashMap;
use std::sync::Arc;

use danci_survey::SurveyState;
use parking_lot::RwLock;
use tokio::sync::Mutex;

pub type SessionHandle = Arc<Mutex<SurveyState>>;

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, state: SurveyState) -> SessionHandle {
        let id = state.session_id.clone();
        let handle = Arc::new(Mutex::new(state));
        self.sessions.write().insert(id, Arc::clone(&handle));
        handle
    }

    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().get(session_id).cloned()
    }

    pub fn remove(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.write().remove(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use danci_survey::{StoppingConfig, StrategyKind, SurveyMode};

    fn state(id: &str) -> SurveyState {
        SurveyState::new(
            id,
            StrategyKind::BandProbability,
            SurveyMode::ColdStart,
            StoppingConfig::new(15, 0.85, 40),
            3000,
            1,
        )
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let store = SessionStore::new();
        assert!(store.is_empty());
        store.insert(state("a"));
        store.insert(state("b"));
        assert_eq!(store.len(), 2);

        let handle = store.get("a").unwrap();
        handle.lock().await.current_rank = 4100;
        assert_eq!(store.get("a").unwrap().lock().await.current_rank, 4100);

        assert!(store.remove("a").is_some());
        assert!(store.get("a").is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_sessions_lock_independently() {
        let store = SessionStore::new();
        store.insert(state("a"));
        store.insert(state("b"));
        let a = store.get("a").unwrap();
        let _held = a.lock().await;
        let b = store.get("b").unwrap();
        assert!(b.try_lock().is_ok());
        assert!(store.get("a").unwrap().try_lock().is_err());
    }
}
