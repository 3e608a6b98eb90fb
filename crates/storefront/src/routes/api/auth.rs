//! Authentication API routes.
//!
//! JSON endpoints that start and end the cookie session. A client treats a
//! successful `login`/`register` as the anonymous → authenticated transition
//! and `GET /api/auth/me` as the current auth signal.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::AuthService;
use crate::state::AppState;

/// Login and registration request body.
///
/// Implements `Debug` manually to redact the password.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Create an account and log it in.
///
/// POST /api/auth/register
#[instrument(skip(state, session, body), fields(user_id))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    body: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CurrentUser>)> {
    let Json(body) = body?;

    let user = AuthService::new(state.pool())
        .register_with_password(&body.email, &body.password)
        .await?;

    let current = CurrentUser::from(&user);
    start_session(&session, &current).await?;
    tracing::info!(user_id = %current.id, "Account registered");

    Ok((StatusCode::CREATED, Json(current)))
}

/// Log in with email and password.
///
/// POST /api/auth/login
#[instrument(skip(state, session, body), fields(user_id))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    body: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<CurrentUser>> {
    let Json(body) = body?;

    let user = AuthService::new(state.pool())
        .login_with_password(&body.email, &body.password)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Login failed"))?;

    let current = CurrentUser::from(&user);
    start_session(&session, &current).await?;
    tracing::info!(user_id = %current.id, "Logged in");

    Ok(Json(current))
}

/// End the session.
///
/// POST /api/auth/logout
///
/// Succeeds for anonymous sessions too.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// Return the user bound to the session.
///
/// GET /api/auth/me
///
/// The account is re-read so a session outliving its account answers `401`.
#[instrument(skip_all, fields(user_id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CurrentUser>> {
    let user = AuthService::new(state.pool()).get_user(user.id).await?;
    Ok(Json(CurrentUser::from(&user)))
}

async fn start_session(session: &Session, user: &CurrentUser) -> Result<()> {
    set_current_user(session, user)
        .await
        .map_err(|e| AppError::Internal(format!("failed to start session: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::Span::current().record("user_id", user.id.as_i32());
    Ok(())
}
