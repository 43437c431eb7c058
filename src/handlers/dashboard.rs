// src/handlers/dashboard.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::attempt::{Attempt, AttemptTotals, MyAttemptsResponse},
    utils::jwt::Claims,
};

/// Lists the current user's attempts with score totals.
pub async fn my_attempts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, user_id, test_id, answers, score, total, max_score,
               admin_score, timed_out, created_at
        FROM attempts
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch attempts: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let totals = AttemptTotals::from_attempts(&attempts);
    Ok(Json(MyAttemptsResponse { attempts, totals }))
}
