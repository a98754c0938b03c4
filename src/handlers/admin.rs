// src/handlers/admin.rs
//
// Admin console operations: the post editor (create / update / delete),
// the dashboard listing, and image upload. All routes are behind the auth
// and admin middlewares.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    db::Repository,
    error::AppError,
    models::post::SavePostRequest,
};

/// All posts for the dashboard, newest first. The admin list is not
/// paginated; it mirrors the public ordering.
pub async fn list_posts(State(repo): State<Repository>) -> Result<impl IntoResponse, AppError> {
    let posts = repo.list_all_posts().await?;
    Ok(Json(posts))
}

/// Create a new post. The id, publish timestamp and read-time estimate are
/// assigned server-side.
pub async fn create_post(
    State(repo): State<Repository>,
    Json(payload): Json<SavePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id = repo.create_post(&payload).await.map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        e
    })?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// Update a post. Every save reassigns the publish timestamp, so an edited
/// post moves back to the top of the feed, exactly like a fresh one.
/// A null `image_url` keeps the stored image.
pub async fn update_post(
    State(repo): State<Repository>,
    Path(id): Path<i64>,
    Json(payload): Json<SavePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let updated = repo.update_post(id, &payload).await.map_err(|e| {
        tracing::error!("Failed to update post {}: {:?}", id, e);
        e
    })?;

    if !updated {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Delete a post and its comments.
pub async fn delete_post(
    State(repo): State<Repository>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = repo.delete_post(id).await.map_err(|e| {
        tracing::error!("Failed to delete post {}: {:?}", id, e);
        e
    })?;

    if !deleted {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Upload an image and return its durable public URL.
///
/// The file lands in the uploads directory as `<unix_millis>_<name>` and is
/// served statically under `/uploads`.
pub async fn upload_image(
    State(config): State<Config>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(safe_file_name)
            .unwrap_or_else(|| format!("{}.bin", uuid::Uuid::new_v4()));

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        if bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }

        tokio::fs::create_dir_all(&config.uploads_dir).await?;

        let stored_name = format!("{}_{}", Utc::now().timestamp_millis(), file_name);
        tokio::fs::write(config.uploads_dir.join(&stored_name), &bytes).await?;

        tracing::info!("Stored upload {} ({} bytes)", stored_name, bytes.len());

        return Ok(Json(json!({ "url": format!("/uploads/{}", stored_name) })));
    }

    Err(AppError::BadRequest("Missing 'image' field".to_string()))
}

/// Strips any path components and characters that have no business in a
/// file name.
fn safe_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        format!("{}.bin", uuid::Uuid::new_v4())
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::safe_file_name;

    #[test]
    fn file_names_lose_path_components() {
        assert_eq!(safe_file_name("../../etc/passwd"), "passwd");
        assert_eq!(safe_file_name("c:\\temp\\shot.png"), "shot.png");
    }

    #[test]
    fn hostile_names_get_a_generated_fallback() {
        assert!(safe_file_name("..").ends_with(".bin"));
        assert!(safe_file_name("♜♞♝").ends_with(".bin"));
    }
}
