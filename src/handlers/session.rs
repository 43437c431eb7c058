// src/handlers/session.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    session::{AttemptSession, Opened, SessionDefaults, SessionHandle, SessionView},
    state::AppState,
    utils::jwt::Claims,
};

/// Outcome of opening a test.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartSessionResponse {
    AlreadyAttempted {
        message: String,
    },
    Empty {
        test_name: String,
        message: String,
    },
    Started {
        session_id: Uuid,
        view: SessionView,
    },
}

#[derive(Debug, Deserialize)]
pub struct SelectOptionRequest {
    pub option: usize,
}

/// Opens a timed session on a test for the current user.
///
/// * Returns the user's unfinished session for the same test if one exists.
/// * Reports `already_attempted` or `empty` without starting a countdown.
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    if let Some(handle) = state.sessions.find_live(user_id, &test_id).await {
        tracing::info!("Resuming session {} for user {}", handle.id(), user_id);
        return Ok((
            StatusCode::OK,
            Json(StartSessionResponse::Started {
                session_id: handle.id(),
                view: handle.view(),
            }),
        ));
    }

    let opened = AttemptSession::open(
        &test_id,
        user_id,
        state.store.clone(),
        state.store.clone(),
        &SessionDefaults::from(&state.config),
    )
    .await?;

    let response = match opened {
        Opened::AlreadyAttempted => (
            StatusCode::OK,
            Json(StartSessionResponse::AlreadyAttempted {
                message: "You have already taken this test. You cannot attempt it again."
                    .to_string(),
            }),
        ),
        Opened::Empty { test_name } => (
            StatusCode::OK,
            Json(StartSessionResponse::Empty {
                test_name,
                message: "No questions found for this test.".to_string(),
            }),
        ),
        Opened::Live(session) => {
            let (handle, events) = SessionHandle::spawn(session, state.config.tick_interval());
            let session_id = handle.id();
            let view = handle.view();
            state.sessions.insert(handle, events).await;

            (
                StatusCode::CREATED,
                Json(StartSessionResponse::Started { session_id, view }),
            )
        }
    };

    Ok(response)
}

async fn find_session(
    state: &AppState,
    claims: &Claims,
    id: Uuid,
) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id, claims.user_id())
        .await
        .ok_or(AppError::NotFound("Session not found".to_string()))
}

/// Current question, selection and countdown.
pub async fn get_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = find_session(&state, &claims, id).await?;
    Ok(Json(handle.view()))
}

pub async fn select_option(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectOptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let handle = find_session(&state, &claims, id).await?;
    let view = handle.select_option(req.option).await?;
    Ok(Json(view))
}

/// Saves the selection and moves on; on the last question this records the attempt.
pub async fn advance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = find_session(&state, &claims, id).await?;
    let view = handle.advance().await?;
    Ok(Json(view))
}

/// Re-reads the test configuration after an administrator fixed it.
pub async fn reload(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = find_session(&state, &claims, id).await?;
    let view = handle.reload_test().await?;
    Ok(Json(view))
}

/// Retries a failed submission with the answers frozen at submission time.
pub async fn retry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = find_session(&state, &claims, id).await?;
    let view = handle.retry_submission().await?;
    Ok(Json(view))
}

/// Leaves the session. The countdown stops; a write already in flight completes.
pub async fn abandon(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !state.sessions.remove(id, claims.user_id()).await {
        return Err(AppError::NotFound("Session not found".to_string()));
    }

    tracing::info!("User {} left session {}", claims.user_id(), id);
    Ok(StatusCode::NO_CONTENT)
}
