use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    db::Repository,
    error::AppError,
    models::comment::CreateCommentRequest,
};

/// Get a single post by ID.
pub async fn get_post(
    State(repo): State<Repository>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = repo
        .get_post(id)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// List comments for a post, newest first.
pub async fn list_comments(
    State(repo): State<Repository>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if repo.get_post(id).await?.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    let comments = repo.list_comments(id).await?;
    Ok(Json(comments))
}

/// Post a new comment. Comments are create-only; there is no editing or
/// deleting through the API.
pub async fn create_comment(
    State(repo): State<Repository>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if repo.get_post(id).await?.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    let comment = repo.create_comment(id, &payload).await.map_err(|e| {
        tracing::error!("Failed to create comment: {:?}", e);
        e
    })?;

    Ok((StatusCode::CREATED, Json(comment)))
}
