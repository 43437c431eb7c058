// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{SqlitePool, types::Json as SqlJson};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, SetAdminScoreRequest},
        question::{CreateQuestionRequest, Question},
        test::{CreateTestRequest, Test, UpdateTestRequest},
    },
    utils::jwt::Claims,
};

/// Creates a new test.
/// Admin only.
pub async fn create_test(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO tests (id, name, time_limit_minutes, max_score, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&payload.name)
    .bind(payload.time_limit_minutes)
    .bind(payload.max_score)
    .bind(Utc::now())
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create test: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!("Admin {} created test {} ({})", claims.sub, id, payload.name);
    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates test metadata.
/// Admin only. Changing limits while sessions are running affects only
/// sessions opened afterwards, except for `max_score` which sessions re-read on reload.
pub async fn update_test(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    // Check existence
    let _exists = sqlx::query("SELECT id FROM tests WHERE id = ?")
        .bind(&id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Test not found".to_string()))?;

    // Perform updates sequentially if fields are present
    if let Some(name) = &payload.name {
        sqlx::query("UPDATE tests SET name = ? WHERE id = ?")
            .bind(name)
            .bind(&id)
            .execute(&pool)
            .await?;
    }

    if let Some(minutes) = payload.time_limit_minutes {
        sqlx::query("UPDATE tests SET time_limit_minutes = ? WHERE id = ?")
            .bind(minutes)
            .bind(&id)
            .execute(&pool)
            .await?;
    }

    if let Some(max_score) = payload.max_score {
        sqlx::query("UPDATE tests SET max_score = ? WHERE id = ?")
            .bind(max_score)
            .bind(&id)
            .execute(&pool)
            .await?;
    }

    let test = sqlx::query_as::<_, Test>(
        "SELECT id, name, time_limit_minutes, max_score, created_at FROM tests WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(test))
}

/// Deletes a test together with its questions.
/// Admin only. Recorded attempts are kept.
pub async fn delete_test(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM tests WHERE id = ?")
        .bind(&id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Test not found".to_string()));
    }

    tracing::info!("Admin {} deleted test {}", claims.sub, id);
    Ok(StatusCode::NO_CONTENT)
}

/// Lists a test's questions including the answer key.
/// Admin only.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    Path(test_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, test_id, question, options, answer
        FROM questions
        WHERE test_id = ?
        ORDER BY question, id
        "#,
    )
    .bind(&test_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(questions))
}

/// Adds a question to a test.
/// Admin only.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Path(test_id): Path<String>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let _exists = sqlx::query("SELECT id FROM tests WHERE id = ?")
        .bind(&test_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Test not found".to_string()))?;

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO questions (id, test_id, question, options, answer)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&test_id)
    .bind(&payload.question)
    .bind(SqlJson(&payload.options))
    .bind(payload.answer)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Replaces a question's text, options and answer.
/// Admin only.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let result = sqlx::query(
        r#"
        UPDATE questions
        SET question = ?, options = ?, answer = ?
        WHERE id = ?
        "#,
    )
    .bind(&payload.question)
    .bind(SqlJson(&payload.options))
    .bind(payload.answer)
    .bind(&id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Deletes a question.
/// Admin only.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(&id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists every recorded attempt, newest first.
/// Admin only.
pub async fn list_attempts(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let attempts = sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, user_id, test_id, answers, score, total, max_score,
               admin_score, timed_out, created_at
        FROM attempts
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list attempts: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(attempts))
}

/// Sets the administrator override score, the only mutable field of an attempt.
/// Admin only.
pub async fn set_admin_score(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<SetAdminScoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let attempt = sqlx::query_as::<_, Attempt>(
        r#"
        UPDATE attempts
        SET admin_score = ?
        WHERE id = ?
        RETURNING id, user_id, test_id, answers, score, total, max_score,
                  admin_score, timed_out, created_at
        "#,
    )
    .bind(payload.admin_score)
    .bind(&id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    tracing::info!(
        "Admin {} graded attempt {}: {}",
        claims.sub,
        id,
        payload.admin_score
    );
    Ok(Json(attempt))
}

/// Deletes an attempt, allowing the user to take the test again.
/// Admin only.
pub async fn delete_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM attempts WHERE id = ?")
        .bind(&id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Attempt not found".to_string()));
    }

    tracing::info!("Admin {} deleted attempt {}", claims.sub, id);
    Ok(StatusCode::NO_CONTENT)
}
