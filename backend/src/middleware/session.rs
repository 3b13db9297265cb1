use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    error::{AppError, StorageError},
    models::{session::SessionPayload, user::AuthenticatedUser},
    services::SessionStoreTrait,
    state::AppState,
    types::SessionId,
};

/// The session a request runs under, attached as a request extension.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub id: SessionId,
    /// Stored payload; `None` for a session that has not been persisted yet.
    pub payload: Option<SessionPayload>,
}

impl CurrentSession {
    pub fn fresh() -> Self {
        Self {
            id: SessionId::generate(),
            payload: None,
        }
    }

    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.payload.as_ref().and_then(|payload| payload.user.as_ref())
    }
}

/// Loads the session named by the request cookie and attaches it as [`CurrentSession`].
///
/// Must run before [`crate::middleware::gate::enforce_single_session`].
pub async fn load_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let cookie_value = state.cookie.read(request.headers());
    let current = resolve_session(state.store.as_ref(), cookie_value).await?;
    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

/// Only identifiers with a live stored payload are adopted. Anything else (no cookie, an
/// unknown or expired identifier) gets a freshly minted identifier.
pub async fn resolve_session(
    store: &dyn SessionStoreTrait,
    cookie_value: Option<String>,
) -> Result<CurrentSession, StorageError> {
    let Some(id) = cookie_value.and_then(|value| SessionId::new(value).ok()) else {
        return Ok(CurrentSession::fresh());
    };
    match store.get(&id).await? {
        Some(payload) => Ok(CurrentSession {
            id,
            payload: Some(payload),
        }),
        None => {
            tracing::debug!(session = %id.short(), "Ignoring unknown session cookie");
            Ok(CurrentSession::fresh())
        }
    }
}
