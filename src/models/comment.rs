use serde::{Deserialize, Serialize};
use validator::Validate;

/// Represents the 'comments' table in the database.
/// Comments belong to exactly one post and are only ever created, never
/// edited or deleted through the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_name: String,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for posting a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(
        min = 1,
        max = 80,
        message = "Name must be between 1 and 80 characters"
    ))]
    pub author_name: String,

    #[validate(length(
        min = 1,
        max = 2000,
        message = "Comment must be between 1 and 2000 characters"
    ))]
    pub body: String,
}
