use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ai::chat::{Advisor, Session};
use crate::core::AppConfig;

pub struct AppState {
    // Conversations by session ID, kept in memory only
    pub sessions: HashMap<String, Session>,
    pub advisor: Arc<Advisor>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(advisor: Advisor, config: AppConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            advisor: Arc::new(advisor),
            config,
        }
    }

    /// Drops sessions that are idle for at least `ttl` at `now`.
    /// Returns how many were removed.
    pub fn evict_idle(&mut self, now: Instant, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_idle(now, ttl));
        before - self.sessions.len()
    }
}
