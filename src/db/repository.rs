//! Database repository for CRUD operations.
//!
//! All queries are bound at runtime; row mapping happens in the small
//! `*_from_row` helpers at the bottom.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::error::AppError;
use crate::feed::{FeedQuery, PostFeed};
use crate::models::comment::{Comment, CreateCommentRequest};
use crate::models::post::{Category, Post, SavePostRequest};
use crate::models::user::User;
use crate::utils::text::estimate_read_time;

/// How long a password reset token stays valid.
const RESET_TOKEN_TTL_SECS: i64 = 3600;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== POST OPERATIONS ====================

    /// One page of the public feed: posts ordered by (published_at, id)
    /// descending, optionally restricted to a category and a title search,
    /// strictly after the cursor when one is set.
    pub async fn feed_page(&self, query: &FeedQuery) -> Result<Vec<Post>, AppError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, title, excerpt, category, content, image_url, published_at, read_time \
             FROM posts WHERE 1 = 1",
        );

        if let Some(category) = query.filter.category {
            qb.push(" AND category = ").push_bind(category.as_str());
        }

        if let Some(term) = &query.filter.search {
            qb.push(" AND title LIKE ")
                .push_bind(like_pattern(term))
                .push(" ESCAPE '\\'");
        }

        if let Some(cursor) = &query.after {
            let millis = cursor.published_at.timestamp_millis();
            qb.push(" AND (published_at < ")
                .push_bind(millis)
                .push(" OR (published_at = ")
                .push_bind(millis)
                .push(" AND id < ")
                .push_bind(cursor.id)
                .push("))");
        }

        qb.push(" ORDER BY published_at DESC, id DESC LIMIT ")
            .push_bind(query.limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(post_from_row).collect())
    }

    /// Get a post by ID.
    pub async fn get_post(&self, id: i64) -> Result<Option<Post>, AppError> {
        let row = sqlx::query(
            "SELECT id, title, excerpt, category, content, image_url, published_at, read_time \
             FROM posts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    /// All posts, newest first. Backs the admin dashboard list.
    pub async fn list_all_posts(&self) -> Result<Vec<Post>, AppError> {
        let rows = sqlx::query(
            "SELECT id, title, excerpt, category, content, image_url, published_at, read_time \
             FROM posts ORDER BY published_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    /// Create a post. The publish timestamp and read-time estimate are
    /// assigned here, never taken from the client.
    pub async fn create_post(&self, request: &SavePostRequest) -> Result<i64, AppError> {
        let result = sqlx::query(
            "INSERT INTO posts (title, excerpt, category, content, image_url, published_at, read_time) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.title)
        .bind(&request.excerpt)
        .bind(request.category.as_str())
        .bind(&request.content)
        .bind(&request.image_url)
        .bind(now_millis())
        .bind(estimate_read_time(&request.content))
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Update a post. The publish timestamp is reassigned on every save
    /// (it doubles as the last-modified time, matching creation semantics).
    ///
    /// A missing `image_url` in the payload keeps the stored image; the
    /// COALESCE makes that a single atomic write with no prior read.
    pub async fn update_post(&self, id: i64, request: &SavePostRequest) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE posts SET \
                title = ?, \
                excerpt = ?, \
                category = ?, \
                content = ?, \
                image_url = COALESCE(?, image_url), \
                published_at = ?, \
                read_time = ? \
             WHERE id = ?",
        )
        .bind(&request.title)
        .bind(&request.excerpt)
        .bind(request.category.as_str())
        .bind(&request.content)
        .bind(&request.image_url)
        .bind(now_millis())
        .bind(estimate_read_time(&request.content))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a post and its comments in one transaction.
    pub async fn delete_post(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== COMMENT OPERATIONS ====================

    /// Comments for a post, newest first.
    pub async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let rows = sqlx::query(
            "SELECT id, post_id, author_name, body, created_at \
             FROM comments WHERE post_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    /// Create a comment under a post. The caller is responsible for having
    /// checked that the post exists.
    pub async fn create_comment(
        &self,
        post_id: i64,
        request: &CreateCommentRequest,
    ) -> Result<Comment, AppError> {
        let created_at = now_millis();

        let result = sqlx::query(
            "INSERT INTO comments (post_id, author_name, body, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(post_id)
        .bind(&request.author_name)
        .bind(&request.body)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(Comment {
            id: result.last_insert_rowid(),
            post_id,
            author_name: request.author_name.clone(),
            body: request.body.clone(),
            created_at: millis_to_datetime(created_at),
        })
    }

    // ==================== USER OPERATIONS ====================

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, password, role, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<i64, AppError> {
        let result = sqlx::query(
            "INSERT INTO users (email, password, role, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                AppError::Conflict(format!("Account '{}' already exists", email))
            } else {
                AppError::from(e)
            }
        })?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update_user_password(
        &self,
        user_id: i64,
        password_hash: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ==================== PASSWORD RESET OPERATIONS ====================

    /// Issue a single-use reset token for the user.
    pub async fn create_password_reset(&self, user_id: i64) -> Result<String, AppError> {
        let token = uuid::Uuid::new_v4().to_string();
        let expires_at = now_millis() + RESET_TOKEN_TTL_SECS * 1000;

        sqlx::query("INSERT INTO password_resets (token, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        Ok(token)
    }

    /// Consume a reset token: marks it used and returns the user it belongs
    /// to. Unknown, expired and already-used tokens all return `None`.
    pub async fn consume_password_reset(&self, token: &str) -> Result<Option<i64>, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT user_id FROM password_resets WHERE token = ? AND used = 0 AND expires_at > ?",
        )
        .bind(token)
        .bind(now_millis())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let user_id: i64 = row.get("user_id");

        sqlx::query("UPDATE password_resets SET used = 1 WHERE token = ?")
            .bind(token)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(user_id))
    }
}

/// The repository is the production implementation of the feed's
/// capability surface.
#[async_trait]
impl PostFeed for Repository {
    async fn page(&self, query: &FeedQuery) -> Result<Vec<Post>, AppError> {
        self.feed_page(query).await
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

/// SQLite LIKE pattern for a substring match, with wildcards escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn post_from_row(row: &SqliteRow) -> Post {
    let category: String = row.get("category");
    Post {
        id: row.get("id"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        // Unknown values cannot be written through the API; fall back to
        // the default the original reader used.
        category: category.parse().unwrap_or(Category::Tech),
        content: row.get("content"),
        image_url: row.get("image_url"),
        published_at: millis_to_datetime(row.get("published_at")),
        read_time: row.get("read_time"),
    }
}

fn comment_from_row(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_name: row.get("author_name"),
        body: row.get("body"),
        created_at: millis_to_datetime(row.get("created_at")),
    }
}

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        password: row.get("password"),
        role: row.get("role"),
        created_at: millis_to_datetime(row.get("created_at")),
    }
}
