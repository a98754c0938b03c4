use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::error::AppError;

/// The fixed category set a post can belong to.
///
/// The feed additionally accepts the sentinel "all", which is represented
/// as `Option<Category>::None` in feed filters rather than as a variant,
/// so a stored post can never claim to be "all".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tech,
    Design,
    Career,
    Life,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tech => "tech",
            Category::Design => "design",
            Category::Career => "career",
            Category::Life => "life",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tech" => Ok(Category::Tech),
            "design" => Ok(Category::Design),
            "career" => Ok(Category::Career),
            "life" => Ok(Category::Life),
            other => Err(AppError::BadRequest(format!(
                "Unknown category '{}'",
                other
            ))),
        }
    }
}

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub category: Category,

    /// Opaque rich-text/HTML blob, stored verbatim.
    pub content: String,

    /// Public URL of the featured image, if one was uploaded.
    pub image_url: Option<String>,

    /// Server-assigned on every save; doubles as created and last-modified.
    pub published_at: chrono::DateTime<chrono::Utc>,

    /// Estimated reading time in minutes, derived from the content on save.
    pub read_time: i64,
}

/// DTO for creating or updating a post. The id never travels in the body:
/// creation has none, updates carry it in the path.
#[derive(Debug, Deserialize, Validate)]
pub struct SavePostRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 chars"
    ))]
    pub title: String,

    #[validate(length(max = 500, message = "Excerpt must be at most 500 chars"))]
    #[serde(default)]
    pub excerpt: String,

    pub category: Category,

    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: String,

    /// On update, `None` means "keep the stored image"; the previously
    /// loaded reference is carried forward instead of being re-read.
    pub image_url: Option<String>,
}

/// Query parameters for the public feed endpoint.
#[derive(Debug, Deserialize)]
pub struct FeedParams {
    /// Category filter; absent or "all" means no restriction.
    pub category: Option<String>,

    /// Title search term (substring, case-insensitive).
    pub q: Option<String>,

    /// Opaque cursor token from the previous page.
    pub cursor: Option<String>,

    /// Number of items to return (default: 6, max: 24).
    pub limit: Option<i64>,
}
