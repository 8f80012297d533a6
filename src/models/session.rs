use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Server-side login session. Timestamps are fixed-width RFC 3339 UTC strings,
/// so they order the same lexicographically and chronologically.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at: String,
    pub last_seen_at: String,
}

impl Session {
    /// True once either the idle window or the absolute lifetime has passed.
    /// Unparseable timestamps count as expired.
    pub fn is_expired(
        &self,
        now: DateTime<Utc>,
        idle_timeout: chrono::Duration,
        max_age: chrono::Duration,
    ) -> bool {
        let (Ok(created), Ok(last_seen)) = (
            DateTime::parse_from_rfc3339(&self.created_at),
            DateTime::parse_from_rfc3339(&self.last_seen_at),
        ) else {
            return true;
        };
        now - last_seen.with_timezone(&Utc) > idle_timeout
            || now - created.with_timezone(&Utc) > max_age
    }
}
