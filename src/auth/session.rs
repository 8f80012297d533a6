use axum::http::{HeaderMap, header};
use chrono::{DateTime, Utc};
use cookie::{Cookie, SameSite};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::db::repository;
use crate::models::Session;

/// Server-side session handling backed by the `sessions` table.
/// The cookie only ever carries the opaque token.
#[derive(Clone)]
pub struct SessionStore {
    db: SqlitePool,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(db: SqlitePool, config: SessionConfig) -> Self {
        Self { db, config }
    }

    pub async fn start(&self, user_id: i64) -> Result<Session, sqlx::Error> {
        let token = Uuid::new_v4().to_string();
        repository::insert_session(&self.db, &token, user_id, Utc::now()).await
    }

    /// Looks up a live session and refreshes its idle timer. Expired sessions
    /// are deleted on the spot and reported as missing.
    pub async fn resolve(&self, token: &str) -> Result<Option<Session>, sqlx::Error> {
        let Some(session) = repository::find_session(&self.db, token).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if session.is_expired(now, self.idle_timeout(), self.max_age()) {
            debug!(user_id = session.user_id, "session expired");
            repository::delete_session(&self.db, token).await?;
            return Ok(None);
        }

        repository::touch_session(&self.db, token, now).await?;
        Ok(Some(session))
    }

    pub async fn end(&self, token: &str) -> Result<bool, sqlx::Error> {
        repository::delete_session(&self.db, token).await
    }

    pub async fn sweep(&self) -> Result<u64, sqlx::Error> {
        let now = Utc::now();
        repository::delete_expired_sessions(
            &self.db,
            cutoff(now, self.idle_timeout()),
            cutoff(now, self.max_age()),
        )
        .await
    }

    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| Cookie::split_parse(value))
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.config.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    }

    pub fn session_cookie(&self, token: &str) -> Cookie<'static> {
        Cookie::build((self.config.cookie_name.clone(), token.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.config.secure_cookie)
            .build()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = self.session_cookie("");
        cookie.make_removal();
        cookie
    }

    fn idle_timeout(&self) -> chrono::Duration {
        to_chrono(self.config.idle_timeout)
    }

    fn max_age(&self) -> chrono::Duration {
        to_chrono(self.config.max_age)
    }
}

fn to_chrono(duration: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

fn cutoff(now: DateTime<Utc>, window: chrono::Duration) -> DateTime<Utc> {
    now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::http::HeaderValue;

    use crate::db::connect_in_memory;
    use crate::models::NewUser;

    async fn store_with_user(config: SessionConfig) -> (SessionStore, i64) {
        let pool = connect_in_memory().await.expect("Failed to create test db");
        let user = repository::create_user(
            &pool,
            NewUser {
                username: "alice".to_string(),
                email: "a@x.com".to_string(),
                password_hash: "hash".to_string(),
                couple_name: "Smiths".to_string(),
            },
        )
        .await
        .expect("user");
        (SessionStore::new(pool, config), user.id)
    }

    #[tokio::test]
    async fn test_start_resolve_end() {
        let (store, user_id) = store_with_user(SessionConfig::default()).await;

        let session = store.start(user_id).await.expect("start");
        let resolved = store.resolve(&session.token).await.expect("resolve").expect("live");
        assert_eq!(resolved.user_id, user_id);

        assert!(store.end(&session.token).await.expect("end"));
        assert!(store.resolve(&session.token).await.expect("resolve").is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_removed_on_resolve() {
        let config = SessionConfig {
            idle_timeout: Duration::ZERO,
            ..SessionConfig::default()
        };
        let (store, user_id) = store_with_user(config).await;

        let session = store.start(user_id).await.expect("start");
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(store.resolve(&session.token).await.expect("resolve").is_none());
        assert!(repository::find_session(&store.db, &session.token)
            .await
            .expect("query")
            .is_none());
    }

    #[tokio::test]
    async fn test_token_from_headers_picks_named_cookie() {
        let (store, _) = store_with_user(SessionConfig::default()).await;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; twodo_session=abc-123; lang=en"),
        );
        assert_eq!(store.token_from_headers(&headers).as_deref(), Some("abc-123"));

        assert!(store.token_from_headers(&HeaderMap::new()).is_none());
    }

    #[tokio::test]
    async fn test_cookie_attributes() {
        let (store, _) = store_with_user(SessionConfig::default()).await;

        let rendered = store.session_cookie("tok").to_string();
        assert!(rendered.starts_with("twodo_session=tok"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));

        let removal = store.removal_cookie().to_string();
        assert!(removal.contains("Max-Age=0"));
    }
}
