use anyhow::anyhow;
use axum::{
    extract::{Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    error::{AppError, StorageError},
    middleware::session::CurrentSession,
    services::{SessionAuthorityTrait, SessionStoreTrait},
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Anonymous request, or the session is the user's canonical one.
    Pass,
    /// The session was superseded and has been destroyed.
    Rejected,
}

/// Decides whether `current` may proceed.
///
/// A rejected session is destroyed in the store before returning, so the same identifier can
/// never pass the gate again.
pub async fn check_session(
    authority: &dyn SessionAuthorityTrait,
    store: &dyn SessionStoreTrait,
    current: &CurrentSession,
) -> Result<GateOutcome, StorageError> {
    let Some(user) = current.user() else {
        return Ok(GateOutcome::Pass);
    };
    if authority.is_active(&user.id, &current.id).await? {
        return Ok(GateOutcome::Pass);
    }

    store.destroy(&current.id).await?;
    tracing::info!(
        user_id = %user.id,
        session = %current.id.short(),
        "Rejected superseded session"
    );
    Ok(GateOutcome::Rejected)
}

/// Rejects requests whose session is no longer the user's active one.
///
/// Runs on every request after [`crate::middleware::session::load_session`] and before any
/// handler that trusts the session identity.
pub async fn enforce_single_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let current = request
        .extensions()
        .get::<CurrentSession>()
        .cloned()
        .ok_or_else(|| anyhow!("session loader did not run before the single-session gate"))?;

    match check_session(state.authority.as_ref(), state.store.as_ref(), &current).await? {
        GateOutcome::Pass => Ok(next.run(request).await),
        GateOutcome::Rejected => Ok((
            [(SET_COOKIE, state.cookie.clear())],
            AppError::SessionSuperseded,
        )
            .into_response()),
    }
}
