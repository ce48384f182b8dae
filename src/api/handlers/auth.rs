//! Authentication and profile handlers.
//!
//! Auth and validation failures are recovered here: they become an HTTP
//! error status plus a user-visible notice, never a crash.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ApiState;
use crate::session::{AuthError, ProfileUpdate, User};

/// User as exposed over the wire. The password hash never leaves the core.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,

    pub email: String,

    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,

    pub password: String,
}

fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::AlreadyRegistered => StatusCode::CONFLICT,
        AuthError::NoSession => StatusCode::UNAUTHORIZED,
        AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::Storage(_) | AuthError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map an auth failure to a response, surfacing it as a notice too.
async fn fail(state: &ApiState, err: AuthError) -> (StatusCode, String) {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "Auth operation failed");
    } else {
        state.notifier.post(err.to_string()).await;
    }
    (status, err.to_string())
}

/// Register a new identity and establish the session.
pub async fn register(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let user = {
        let mut sessions = state.sessions.write().await;
        sessions
            .register(&request.name, &request.email, &request.password)
            .await
    };

    match user {
        Ok(user) => {
            state
                .notifier
                .post("Registration successful! Welcome to Bookshelf.")
                .await;
            Ok(Json(UserResponse::from(&user)))
        }
        Err(err) => Err(fail(&state, err).await),
    }
}

/// Authenticate and establish the session.
pub async fn login(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let user = {
        let mut sessions = state.sessions.write().await;
        sessions.login(&request.email, &request.password).await
    };

    match user {
        Ok(user) => {
            state
                .notifier
                .post("Login successful! Welcome back.")
                .await;
            Ok(Json(UserResponse::from(&user)))
        }
        Err(err) => Err(fail(&state, err).await),
    }
}

/// Clear the session.
pub async fn logout(
    State(state): State<Arc<ApiState>>,
) -> Result<StatusCode, (StatusCode, String)> {
    {
        let mut sessions = state.sessions.write().await;
        sessions
            .logout()
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    }

    state.notifier.post("Logged out successfully.").await;

    Ok(StatusCode::NO_CONTENT)
}

/// The authenticated user, 401 when no session is live.
pub async fn me(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let sessions = state.sessions.read().await;

    sessions
        .current_user()
        .map(|user| Json(UserResponse::from(user)))
        .ok_or((StatusCode::UNAUTHORIZED, "Not logged in".to_string()))
}

/// Update the authenticated user's profile.
pub async fn update_profile(
    State(state): State<Arc<ApiState>>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let user = {
        let mut sessions = state.sessions.write().await;
        sessions.update_profile(update).await
    };

    match user {
        Ok(user) => {
            state.notifier.post("Profile updated successfully.").await;
            Ok(Json(UserResponse::from(&user)))
        }
        Err(err) => Err(fail(&state, err).await),
    }
}
