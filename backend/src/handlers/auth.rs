use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::header::SET_COOKIE,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    middleware::session::CurrentSession,
    models::{
        session::SessionPayload,
        user::{AuthResponse, LoginRequest},
    },
    services::SessionStoreTrait,
    state::AppState,
    types::{SessionId, UserId},
};

pub async fn login(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = state
        .credentials
        .verify(&payload.identifier, &payload.secret)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    // A different user never inherits the current identifier: the previous owner's session
    // is released and the login continues on a fresh one.
    let session_id = match current.user() {
        Some(previous_owner) if previous_owner.id != user.id => {
            state
                .authority
                .deactivate(&previous_owner.id, Some(&current.id))
                .await?;
            state.store.destroy(&current.id).await?;
            SessionId::generate()
        }
        _ => current.id.clone(),
    };

    let session =
        SessionPayload::new(session_id.clone(), state.config.session_ttl()).with_user(user.clone());
    state.store.create(&session).await?;

    if let Some(superseded) = state.authority.activate(&user.id, &session_id).await? {
        spawn_superseded_cleanup(state.store.clone(), user.id.clone(), superseded);
    }

    tracing::info!(
        user_id = %user.id,
        session = %session_id.short(),
        "User logged in"
    );

    Ok((
        [(SET_COOKIE, state.cookie.issue(&session_id))],
        Json(AuthResponse::new(user)),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<impl IntoResponse, AppError> {
    state.store.destroy(&current.id).await?;

    if let Some(user) = current.user() {
        let cleared = state
            .authority
            .deactivate(&user.id, Some(&current.id))
            .await?;
        tracing::info!(
            user_id = %user.id,
            session = %current.id.short(),
            cleared,
            "User logged out"
        );
    }

    Ok((
        [(SET_COOKIE, state.cookie.clear())],
        Json(json!({ "ok": true })),
    ))
}

pub async fn me(
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = current
        .user()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Not signed in".into()))?;
    Ok(Json(AuthResponse::new(user)))
}

/// Destroys the payload of a superseded session in the background.
///
/// Failure is only logged: the gate already refuses the superseded identifier.
fn spawn_superseded_cleanup(
    store: Arc<dyn SessionStoreTrait>,
    user_id: UserId,
    superseded: SessionId,
) {
    tokio::spawn(async move {
        match store.destroy(&superseded).await {
            Ok(destroyed) => tracing::debug!(
                %user_id,
                session = %superseded.short(),
                destroyed,
                "Destroyed superseded session"
            ),
            Err(err) => tracing::warn!(
                error = %err,
                %user_id,
                session = %superseded.short(),
                "Failed to destroy superseded session"
            ),
        }
    });
}
