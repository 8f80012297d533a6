use std::time::Duration;

use tracing::{debug, info, warn};

use crate::auth::SessionStore;

/// Periodically deletes expired sessions.
pub struct SessionSweeper {
    sessions: SessionStore,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(sessions: SessionStore, interval: Duration) -> Self {
        Self { sessions, interval }
    }

    /// Runs until the surrounding task is aborted. Errors are logged and the
    /// loop keeps going.
    pub async fn start(self) {
        info!("Starting session sweeper (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;

            match self.run_once().await {
                Ok(0) => debug!("session sweep found nothing to remove"),
                Ok(removed) => info!("session sweep removed {} expired sessions", removed),
                Err(e) => warn!("session sweep failed: {:?}", e),
            }
        }
    }

    pub async fn run_once(&self) -> Result<u64, sqlx::Error> {
        self.sessions.sweep().await
    }
}
