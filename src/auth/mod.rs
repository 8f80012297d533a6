pub mod password;
pub mod session;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::db::repository;
use crate::error::AppError;
use crate::state::AppState;

pub use session::SessionStore;

/// The authenticated caller, resolved from the session cookie.
///
/// Handlers take this as an argument; a request without a live session is
/// rejected with 401 before the handler body runs.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub couple_id: i64,
    pub session_token: String,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = state
            .sessions
            .token_from_headers(&parts.headers)
            .ok_or_else(AppError::unauthenticated)?;

        let session = state
            .sessions
            .resolve(&token)
            .await?
            .ok_or_else(AppError::unauthenticated)?;

        let user = repository::find_user_by_id(&state.db, session.user_id)
            .await?
            .ok_or_else(AppError::unauthenticated)?;

        Ok(Self {
            id: user.id,
            username: user.username,
            email: user.email,
            couple_id: user.couple_id,
            session_token: session.token,
        })
    }
}
