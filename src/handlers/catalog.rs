// src/handlers/catalog.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{error::AppError, models::test::Test};

/// Lists all tests, ordered by name.
pub async fn list_tests(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let tests = sqlx::query_as::<_, Test>(
        r#"
        SELECT id, name, time_limit_minutes, max_score, created_at
        FROM tests
        ORDER BY name
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list tests: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(tests))
}

/// Gets a single test's metadata.
pub async fn get_test(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let test = sqlx::query_as::<_, Test>(
        r#"
        SELECT id, name, time_limit_minutes, max_score, created_at
        FROM tests
        WHERE id = ?
        "#,
    )
    .bind(&id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound(format!("Test '{}' not found", id)))?;

    Ok(Json(test))
}
