use std::sync::Arc;
use std::time::{Instant, SystemTime};

use danci_survey::{PriorKnowledgeSource, SurveyEngine};

use crate::sessions::SessionStore;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<SurveyEngine>,
    sessions: Arc<SessionStore>,
    ledger: Arc<dyn PriorKnowledgeSource>,
    started_at: Instant,
    started_at_system: SystemTime,
}

impl AppState {
    pub fn new(engine: SurveyEngine, ledger: Arc<dyn PriorKnowledgeSource>) -> Self {
        Self {
            engine: Arc::new(engine),
            sessions: Arc::new(SessionStore::new()),
            ledger,
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
        }
    }

    pub fn engine(&self) -> &SurveyEngine {
        &self.engine
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn ledger(&self) -> &dyn PriorKnowledgeSource {
        self.ledger.as_ref()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }
}
