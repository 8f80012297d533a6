use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::SessionStore;
use crate::mail::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub mailer: Arc<dyn Mailer>,
    pub sessions: SessionStore,
}
