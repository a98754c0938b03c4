// src/feed.rs
//
// Cursor-based feed pagination over the ordered post collection.
//
// The feed is a forward-only sequence sorted by (published_at, id)
// descending. A cursor names the last post of the previously returned page;
// it is only meaningful for the filter it was issued under, so any filter
// change must go through `Paginator::reset` before the next fetch.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::post::{Category, Post};

/// Posts per feed page. The public endpoint accepts an override up to
/// `MAX_PAGE_SIZE`; the paginator uses this default.
pub const PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 24;

/// Opaque pagination marker: the sort key of the last returned post.
///
/// Serialized as the token `"<unix_millis>-<id>"`. Published-at timestamps
/// have millisecond resolution, so the id acts as a tiebreak that keeps the
/// ordering total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Cursor {
    pub published_at: chrono::DateTime<chrono::Utc>,
    pub id: i64,
}

impl Cursor {
    pub fn for_post(post: &Post) -> Self {
        Cursor {
            published_at: post.published_at,
            id: post.id,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.published_at.timestamp_millis(), self.id)
    }
}

impl FromStr for Cursor {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::BadRequest(format!("Invalid cursor '{}'", s));

        let (millis, id) = s.split_once('-').ok_or_else(invalid)?;
        let millis: i64 = millis.parse().map_err(|_| invalid())?;
        let id: i64 = id.parse().map_err(|_| invalid())?;
        let published_at = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(invalid)?;

        Ok(Cursor { published_at, id })
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.to_string()
    }
}

impl TryFrom<String> for Cursor {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The filter a feed sequence is pinned to. Changing any field invalidates
/// every cursor issued under the old value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedFilter {
    /// `None` is the "all" sentinel.
    pub category: Option<Category>,

    /// Case-insensitive title substring. Search re-queries the backend
    /// rather than filtering already-fetched rows.
    pub search: Option<String>,
}

/// One page request against the post collection.
#[derive(Debug, Clone)]
pub struct FeedQuery {
    pub filter: FeedFilter,

    /// Return posts strictly after this marker in sort order.
    pub after: Option<Cursor>,

    pub limit: i64,
}

/// Capability surface of the remote ordered collection: one page query.
/// Implementations must return at most `limit` posts ordered by
/// (published_at, id) descending, restricted by the filter, strictly after
/// the cursor when one is set.
#[async_trait]
pub trait PostFeed {
    async fn page(&self, query: &FeedQuery) -> Result<Vec<Post>, AppError>;
}

#[async_trait]
impl<S: PostFeed + Send + Sync> PostFeed for Arc<S> {
    async fn page(&self, query: &FeedQuery) -> Result<Vec<Post>, AppError> {
        (**self).page(query).await
    }
}

/// One rendered page of the feed, decoupled from how it was fetched.
#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub posts: Vec<Post>,

    /// Token for the next page; absent once the sequence is exhausted.
    pub next_cursor: Option<Cursor>,

    /// True when a full page came back, so more pages may exist.
    pub has_more: bool,
}

impl FeedPage {
    /// Builds the page envelope from the rows a page query returned.
    /// A full page means more may exist; a short page ends the sequence.
    pub fn from_rows(posts: Vec<Post>, limit: i64) -> Self {
        let has_more = posts.len() as i64 == limit;
        let next_cursor = if has_more {
            posts.last().map(Cursor::for_post)
        } else {
            None
        };
        FeedPage {
            posts,
            next_cursor,
            has_more,
        }
    }
}

/// Outcome of advancing the feed by one page.
///
/// A zero-row result is never an error, but it means two different things:
/// on a cursor-less fetch the filter simply matches nothing, while on a
/// later page the sequence has ended and everything already rendered stays.
#[derive(Debug)]
pub enum FeedAdvance {
    Page(FeedPage),
    NoResults,
    EndOfSequence,
}

/// Per-view pagination state over a `PostFeed`.
///
/// The paginator owns the cursor and the active filter; nothing else may
/// mutate them. `fetch_next_page` takes `&mut self`, so a second fetch (or a
/// `reset`) cannot interleave with one already in flight and pages are
/// applied strictly in request order. State is only mutated after the store
/// call returns, so both a failed and a cancelled fetch leave the cursor
/// untouched and an identical retry is safe.
#[derive(Debug)]
pub struct Paginator<S: PostFeed> {
    store: S,
    filter: FeedFilter,
    cursor: Option<Cursor>,
    page_size: i64,
    exhausted: bool,
}

impl<S: PostFeed> Paginator<S> {
    pub fn new(store: S) -> Self {
        Paginator {
            store,
            filter: FeedFilter::default(),
            cursor: None,
            page_size: PAGE_SIZE,
            exhausted: false,
        }
    }

    pub fn with_page_size(store: S, page_size: i64) -> Self {
        Paginator {
            page_size,
            ..Paginator::new(store)
        }
    }

    /// Starts a fresh sequence under `filter`: the cursor and the
    /// exhaustion latch are cleared. Performs no I/O. Must be called before
    /// the first fetch after any filter change (including search changes).
    pub fn reset(&mut self, filter: FeedFilter) {
        self.filter = filter;
        self.cursor = None;
        self.exhausted = false;
    }

    /// Fetches the next page of the current sequence.
    ///
    /// Once the sequence is exhausted further calls return the terminal
    /// outcome again without touching the store.
    pub async fn fetch_next_page(&mut self) -> Result<FeedAdvance, AppError> {
        if self.exhausted {
            return Ok(self.terminal());
        }

        let query = FeedQuery {
            filter: self.filter.clone(),
            after: self.cursor.clone(),
            limit: self.page_size,
        };

        let posts = self.store.page(&query).await?;

        if posts.is_empty() {
            // Cursor stays as it was; only the latch moves.
            self.exhausted = true;
            return Ok(self.terminal());
        }

        self.cursor = posts.last().map(Cursor::for_post);

        let page = FeedPage::from_rows(posts, self.page_size);
        if !page.has_more {
            self.exhausted = true;
        }

        Ok(FeedAdvance::Page(page))
    }

    fn terminal(&self) -> FeedAdvance {
        if self.cursor.is_none() {
            FeedAdvance::NoResults
        } else {
            FeedAdvance::EndOfSequence
        }
    }

    pub fn filter(&self) -> &FeedFilter {
        &self.filter
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory stand-in for the post collection. Mirrors the repository's
    /// ordering and cursor predicate, and can fail the next page query to
    /// exercise the transient-error path.
    struct InMemoryFeed {
        posts: Vec<Post>,
        fail_next: AtomicBool,
        calls: AtomicUsize,
    }

    impl InMemoryFeed {
        fn new(mut posts: Vec<Post>) -> Self {
            posts.sort_by(|a, b| {
                (b.published_at, b.id).cmp(&(a.published_at, a.id))
            });
            InMemoryFeed {
                posts,
                fail_next: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            }
        }

        fn fail_next(&self) {
            self.fail_next.store(true, Ordering::SeqCst);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PostFeed for InMemoryFeed {
        async fn page(&self, query: &FeedQuery) -> Result<Vec<Post>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(AppError::InternalServerError(
                    "simulated backend outage".to_string(),
                ));
            }

            let matches = |post: &Post| {
                let category_ok = query
                    .filter
                    .category
                    .map_or(true, |c| post.category == c);
                let search_ok = query.filter.search.as_deref().map_or(true, |q| {
                    post.title.to_lowercase().contains(&q.to_lowercase())
                });
                let after_ok = query.after.as_ref().map_or(true, |c| {
                    (post.published_at, post.id) < (c.published_at, c.id)
                });
                category_ok && search_ok && after_ok
            };

            Ok(self
                .posts
                .iter()
                .filter(|p| matches(p))
                .take(query.limit as usize)
                .cloned()
                .collect())
        }
    }

    fn post(id: i64, category: Category, title: &str) -> Post {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        Post {
            id,
            title: title.to_string(),
            excerpt: String::new(),
            category,
            content: "body".to_string(),
            image_url: None,
            published_at: base + chrono::Duration::milliseconds(id),
            read_time: 1,
        }
    }

    fn dataset(n: i64) -> Vec<Post> {
        (1..=n)
            .map(|i| post(i, Category::Tech, &format!("Post {}", i)))
            .collect()
    }

    fn ids(advance: &FeedAdvance) -> Vec<i64> {
        match advance {
            FeedAdvance::Page(page) => page.posts.iter().map(|p| p.id).collect(),
            other => panic!("expected a page, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn pages_cover_dataset_in_order_without_duplicates() {
        // 8 posts, page size 6: 6 then 2, newest first.
        let store = Arc::new(InMemoryFeed::new(dataset(8)));
        let mut paginator = Paginator::new(Arc::clone(&store));

        let first = paginator.fetch_next_page().await.unwrap();
        assert_eq!(ids(&first), vec![8, 7, 6, 5, 4, 3]);
        match &first {
            FeedAdvance::Page(page) => {
                assert!(page.has_more);
                assert!(page.next_cursor.is_some());
            }
            _ => unreachable!(),
        }
        assert!(!paginator.is_exhausted());

        let second = paginator.fetch_next_page().await.unwrap();
        assert_eq!(ids(&second), vec![2, 1]);
        match &second {
            FeedAdvance::Page(page) => {
                assert!(!page.has_more);
                assert!(page.next_cursor.is_none());
            }
            _ => unreachable!(),
        }
        assert!(paginator.is_exhausted());

        // A short page latched exhaustion; no further store traffic.
        let third = paginator.fetch_next_page().await.unwrap();
        assert!(matches!(third, FeedAdvance::EndOfSequence));
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test]
    async fn empty_first_page_is_no_results_not_end_of_sequence() {
        // Dataset has no "design" posts at all.
        let store = Arc::new(InMemoryFeed::new(dataset(4)));
        let mut paginator = Paginator::new(Arc::clone(&store));

        paginator.reset(FeedFilter {
            category: Some(Category::Design),
            search: None,
        });

        let advance = paginator.fetch_next_page().await.unwrap();
        assert!(matches!(advance, FeedAdvance::NoResults));
        assert!(paginator.is_exhausted());

        // Latched: asking again reports the same state without a query.
        let again = paginator.fetch_next_page().await.unwrap();
        assert!(matches!(again, FeedAdvance::NoResults));
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn zero_rows_on_later_page_ends_sequence_and_keeps_cursor() {
        // Exactly one full page: the follow-up fetch comes back empty.
        let store = InMemoryFeed::new(dataset(6));
        let mut paginator = Paginator::new(store);

        let first = paginator.fetch_next_page().await.unwrap();
        assert_eq!(ids(&first).len(), 6);
        let cursor_after_first = paginator.cursor().cloned();

        let second = paginator.fetch_next_page().await.unwrap();
        assert!(matches!(second, FeedAdvance::EndOfSequence));
        assert_eq!(paginator.cursor().cloned(), cursor_after_first);
    }

    #[tokio::test]
    async fn reset_starts_fresh_sequence_under_new_filter() {
        let mut posts = dataset(6);
        posts.push(post(7, Category::Design, "Design notes"));
        posts.push(post(8, Category::Design, "More design"));
        let store = InMemoryFeed::new(posts);
        let mut paginator = Paginator::new(store);

        // Consume a page of the unfiltered sequence first.
        paginator.fetch_next_page().await.unwrap();
        assert!(paginator.cursor().is_some());

        paginator.reset(FeedFilter {
            category: Some(Category::Design),
            search: None,
        });
        assert!(paginator.cursor().is_none());

        let advance = paginator.fetch_next_page().await.unwrap();
        assert_eq!(ids(&advance), vec![8, 7]);
        match advance {
            FeedAdvance::Page(page) => {
                assert!(page.posts.iter().all(|p| p.category == Category::Design))
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn transient_failure_leaves_state_unchanged_and_retry_succeeds() {
        let store = Arc::new(InMemoryFeed::new(dataset(8)));
        let mut paginator = Paginator::new(Arc::clone(&store));

        paginator.fetch_next_page().await.unwrap();
        let cursor_before = paginator.cursor().cloned();

        store.fail_next();
        let err = paginator.fetch_next_page().await;
        assert!(err.is_err());
        assert_eq!(paginator.cursor().cloned(), cursor_before);
        assert!(!paginator.is_exhausted());

        // The identical request succeeds and yields page 2, not page 1 again.
        let retry = paginator.fetch_next_page().await.unwrap();
        assert_eq!(ids(&retry), vec![2, 1]);
    }

    #[tokio::test]
    async fn search_filters_by_title_substring() {
        let posts = vec![
            post(1, Category::Tech, "Rust ownership explained"),
            post(2, Category::Tech, "CSS grid tricks"),
            post(3, Category::Tech, "Why I like rust"),
        ];
        let store = InMemoryFeed::new(posts);
        let mut paginator = Paginator::new(store);

        paginator.reset(FeedFilter {
            category: None,
            search: Some("rust".to_string()),
        });

        let advance = paginator.fetch_next_page().await.unwrap();
        assert_eq!(ids(&advance), vec![3, 1]);
    }

    #[tokio::test]
    async fn concurrent_fetch_attempts_serialize_without_duplicates() {
        // Shared access goes through a lock, so two user-triggered fetches
        // can only ever apply two distinct pages.
        let store = Arc::new(InMemoryFeed::new(dataset(8)));
        let paginator = Arc::new(tokio::sync::Mutex::new(Paginator::new(Arc::clone(
            &store,
        ))));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let paginator = Arc::clone(&paginator);
            handles.push(tokio::spawn(async move {
                let mut guard = paginator.lock().await;
                guard.fetch_next_page().await.unwrap()
            }));
        }

        let mut seen = Vec::new();
        for handle in handles {
            if let FeedAdvance::Page(page) = handle.await.unwrap() {
                seen.extend(page.posts.into_iter().map(|p| p.id));
            }
        }

        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(store.calls(), 2);
    }

    #[test]
    fn cursor_token_roundtrip() {
        let p = post(42, Category::Tech, "t");
        let cursor = Cursor::for_post(&p);
        let parsed: Cursor = cursor.to_string().parse().unwrap();
        assert_eq!(parsed, cursor);
    }

    #[test]
    fn malformed_cursor_tokens_are_rejected() {
        assert!("".parse::<Cursor>().is_err());
        assert!("123".parse::<Cursor>().is_err());
        assert!("abc-def".parse::<Cursor>().is_err());
    }
}
