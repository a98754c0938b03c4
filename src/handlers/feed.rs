use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    db::Repository,
    error::AppError,
    feed::{Cursor, FeedFilter, FeedPage, FeedQuery, MAX_PAGE_SIZE, PAGE_SIZE},
    models::post::{Category, FeedParams},
};

/// One page of the public feed.
///
/// Each request is a self-contained page query: the caller carries the
/// cursor and the filter, and is responsible for dropping the cursor
/// whenever the filter changes (the `feed::Paginator` does exactly that for
/// embedded consumers). An empty page with no cursor is "no results"; an
/// empty page with a cursor is the end of the sequence. Both render as an
/// empty post list with `has_more: false`.
pub async fn list_posts(
    State(repo): State<Repository>,
    Query(params): Query<FeedParams>,
) -> Result<impl IntoResponse, AppError> {
    let category = match params.category.as_deref() {
        None | Some("all") => None,
        Some(other) => Some(other.parse::<Category>()?),
    };

    let search = params.q.filter(|term| !term.trim().is_empty());

    let after = params
        .cursor
        .as_deref()
        .map(str::parse::<Cursor>)
        .transpose()?;

    let limit = params.limit.unwrap_or(PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let query = FeedQuery {
        filter: FeedFilter { category, search },
        after,
        limit,
    };

    let posts = repo.feed_page(&query).await.map_err(|e| {
        tracing::error!("Failed to fetch feed page: {:?}", e);
        e
    })?;

    Ok(Json(FeedPage::from_rows(posts, limit)))
}
