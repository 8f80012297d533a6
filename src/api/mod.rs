use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::{HeaderValue, Method, header};
use axum::response::IntoResponse;
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::models::*;
use crate::services::{AccountService, TaskService};
use crate::state::AppState;

/// JSON body extractor whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> axum::response::Response {
        axum::Json(self.0).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Path extractor for task ids. An id that does not parse is reported exactly
/// like an id that does not exist.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        AppError::task_not_found()
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self { message: message.to_string() }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub message: String,
    pub user: UserProfile,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", get(logout).post(logout))
        .route("/api/tasks", get(list_tasks).post(add_task))
        .route("/api/tasks/{id}", put(update_task_status).delete(delete_task))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS for the configured origins. `None` when the list is empty.
pub fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
    )
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    let user = AccountService::new(state.db.clone()).register(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            message: "User registered successfully".to_string(),
            user,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = AccountService::new(state.db.clone()).authenticate(req).await?;
    let session = state.sessions.start(user.id).await?;
    info!(user_id = user.id, "user logged in");

    let cookie = state.sessions.session_cookie(&session.token);
    Ok((
        [(header::SET_COOKIE, cookie.to_string())],
        Json(AccountResponse {
            message: "Logged in successfully".to_string(),
            user: user.into(),
        }),
    ))
}

async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.end(&user.session_token).await?;
    info!(user_id = user.id, "user logged out");

    let cookie = state.sessions.removal_cookie();
    Ok((
        [(header::SET_COOKIE, cookie.to_string())],
        Json(MessageResponse::new("Logged out successfully")),
    ))
}

async fn list_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = TaskService::new(state.db.clone(), state.mailer.clone())
        .list(&user)
        .await?;
    Ok(Json(tasks))
}

async fn add_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<NewTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let task = TaskService::new(state.db.clone(), state.mailer.clone())
        .add(&user, req)
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Task>, AppError> {
    let task = TaskService::new(state.db.clone(), state.mailer.clone())
        .update_status(&user, id, req)
        .await?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    TaskService::new(state.db.clone(), state.mailer.clone())
        .delete(&user, id)
        .await?;
    Ok(Json(MessageResponse::new("Task deleted successfully")))
}
