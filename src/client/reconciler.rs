//! Client-held feed aggregation.
//!
//! A `FeedView` is the ordered, duplicate-free view of posts for one
//! filter key. It absorbs three kinds of input — paged fetch results,
//! pushed post creations, and like add/remove deltas — arriving in no
//! guaranteed order and possibly more than once. The merge rules are
//! order-tolerant and idempotent rather than relying on a global
//! sequence.
//!
//! Like deltas travel as an explicit tagged union here. The wire-level
//! encoding multiplexes them over the page shape using sentinel total
//! counts (-1 added, -2 removed); `FeedUpdate::from_page` maps that
//! encoding onto the tagged variants.

use std::collections::HashMap;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::feed::{FeedFilter, FeedPage};
use crate::app::likes::ToggleOutcome;
use crate::domain::cursor;
use crate::domain::post::PostView;
use crate::infra::live::LiveEvent;

/// Wire sentinel: a "page" whose total count is -1 carries one added
/// like, -2 one removed like.
pub const LIKE_ADDED_SENTINEL: i64 = -1;
pub const LIKE_REMOVED_SENTINEL: i64 = -2;

#[derive(Debug, Clone)]
pub enum FeedUpdate {
    /// A cursor-paged fetch result.
    Page(FeedPage),
    /// A live "post created" push.
    Created(PostView),
    /// One like added: project as a single-post prepend on the liker's
    /// liked-by feed.
    LikeAdded {
        post: PostView,
        liked_at: OffsetDateTime,
    },
    /// One like removed: locate and remove the matching post.
    LikeRemoved { post_id: Uuid },
}

impl FeedUpdate {
    /// Decode the sentinel-count multiplexing: a sentinel page carries
    /// exactly one post, and its end cursor is the raw like timestamp
    /// in millis rather than an encoded cursor.
    pub fn from_page(page: FeedPage) -> Self {
        match page.total_count {
            LIKE_ADDED_SENTINEL => {
                let liked_at = page
                    .end_cursor
                    .as_deref()
                    .and_then(|raw| raw.parse::<i64>().ok())
                    .and_then(cursor::from_unix_millis);
                match page.posts.into_iter().next() {
                    Some(post) => {
                        let liked_at = liked_at.unwrap_or(post.created_at);
                        FeedUpdate::LikeAdded { post, liked_at }
                    }
                    // A malformed delta with no post merges as an empty
                    // page, which is a no-op.
                    None => FeedUpdate::Page(FeedPage {
                        total_count: 0,
                        end_cursor: None,
                        has_more: false,
                        posts: Vec::new(),
                    }),
                }
            }
            LIKE_REMOVED_SENTINEL => match page.posts.first() {
                Some(post) => FeedUpdate::LikeRemoved { post_id: post.id },
                None => FeedUpdate::Page(FeedPage {
                    total_count: 0,
                    end_cursor: None,
                    has_more: false,
                    posts: Vec::new(),
                }),
            },
            _ => FeedUpdate::Page(page),
        }
    }

    pub fn like_added(post: PostView, liked_at: OffsetDateTime) -> Self {
        FeedUpdate::LikeAdded { post, liked_at }
    }
}

/// The aggregate for one feed key.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedView {
    pub posts: Vec<PostView>,
    pub total_count: i64,
    pub end_cursor: Option<String>,
    pub has_more: bool,
    liked_by: bool,
}

impl FeedView {
    pub fn new(liked_by: bool) -> Self {
        Self {
            posts: Vec::new(),
            total_count: 0,
            end_cursor: None,
            has_more: true,
            liked_by,
        }
    }

    pub fn for_key(key: &FeedFilter) -> Self {
        Self::new(matches!(key, FeedFilter::LikedBy(_)))
    }

    pub fn contains(&self, post_id: Uuid) -> bool {
        self.posts.iter().any(|post| post.id == post_id)
    }

    pub fn apply(&mut self, update: FeedUpdate) {
        match update {
            FeedUpdate::Page(page) => self.merge_page(page),
            FeedUpdate::Created(post) => self.merge_created(post),
            FeedUpdate::LikeAdded { post, liked_at } => self.merge_like_added(post, liked_at),
            FeedUpdate::LikeRemoved { post_id } => self.merge_like_removed(post_id),
        }
    }

    fn merge_page(&mut self, page: FeedPage) {
        if !self.liked_by {
            // Pages walk backward in time, so a well-ordered next page
            // carries an end cursor strictly older than the held one.
            // A tie (duplicate fetch) or a newer cursor (stale arrival
            // racing a reset) is dropped.
            if let (Some(held), Some(incoming)) =
                (self.decoded_cursor(), decoded(page.end_cursor.as_deref()))
            {
                if incoming >= held {
                    return;
                }
            }
        }

        let fresh = self.posts.is_empty();
        let mut appended = 0usize;
        for post in page.posts {
            if !self.contains(post.id) {
                self.posts.push(post);
                appended += 1;
            }
        }

        // An empty or fully duplicate page leaves an established view
        // untouched; a fresh view adopts it wholesale (that is how an
        // empty feed learns total_count = 0, has_more = false).
        if appended > 0 || fresh {
            self.total_count = page.total_count;
            self.end_cursor = page.end_cursor;
            self.has_more = page.has_more;
        }
    }

    fn merge_created(&mut self, post: PostView) {
        if self.contains(post.id) {
            return;
        }
        let was_empty = self.posts.is_empty();
        if was_empty {
            // Otherwise the first pagination after a live push would
            // have no cursor to walk from.
            self.end_cursor = Some(cursor::encode(cursor::unix_millis(post.created_at)));
        }
        self.posts.insert(0, post);
        self.total_count += 1;
    }

    fn merge_like_added(&mut self, post: PostView, liked_at: OffsetDateTime) {
        if self.posts.is_empty() {
            // The pushed delta is authoritative for an empty feed.
            self.posts.push(post);
            self.total_count = 1;
            self.end_cursor = Some(cursor::encode(cursor::unix_millis(liked_at)));
            self.has_more = true;
            return;
        }
        if !self.contains(post.id) {
            self.posts.insert(0, post);
        }
    }

    fn merge_like_removed(&mut self, post_id: Uuid) {
        // Absent post: no-op, which absorbs racing double-delivery.
        self.posts.retain(|post| post.id != post_id);
    }

    /// Refresh the embedded like list of a post wherever it appears.
    fn refresh_likes(&mut self, updated: &PostView) {
        for post in &mut self.posts {
            if post.id == updated.id {
                post.likes = updated.likes.clone();
            }
        }
    }

    fn decoded_cursor(&self) -> Option<i64> {
        decoded(self.end_cursor.as_deref())
    }
}

fn decoded(cursor: Option<&str>) -> Option<i64> {
    cursor.and_then(|raw| cursor::decode(raw).ok())
}

/// A token tying an in-flight page fetch to the state of its feed key.
/// Completing a fetch whose key was reset in the meantime discards the
/// response instead of merging it into the now-current aggregate.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    key: FeedFilter,
    generation: u64,
}

impl FetchTicket {
    pub fn key(&self) -> &FeedFilter {
        &self.key
    }
}

/// All feed aggregates held by one client, keyed by filter. Unrelated
/// keys are never touched by a push meant for another key.
#[derive(Default)]
pub struct FeedStore {
    views: HashMap<FeedFilter, FeedView>,
    generations: HashMap<FeedFilter, u64>,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self, key: &FeedFilter) -> Option<&FeedView> {
        self.views.get(key)
    }

    /// Get or create the aggregate for a key.
    pub fn ensure(&mut self, key: &FeedFilter) -> &mut FeedView {
        self.views
            .entry(key.clone())
            .or_insert_with(|| FeedView::for_key(key))
    }

    pub fn apply(&mut self, key: &FeedFilter, update: FeedUpdate) {
        self.ensure(key).apply(update);
    }

    pub fn begin_fetch(&mut self, key: &FeedFilter) -> FetchTicket {
        let generation = self.generations.entry(key.clone()).or_insert(0);
        FetchTicket {
            key: key.clone(),
            generation: *generation,
        }
    }

    /// Merge a completed fetch unless its key was reset after the fetch
    /// began. Returns whether the page was merged.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, page: FeedPage) -> bool {
        let current = self.generations.get(&ticket.key).copied().unwrap_or(0);
        if current != ticket.generation {
            tracing::debug!("discarding stale fetch response");
            return false;
        }
        self.apply(&ticket.key, FeedUpdate::from_page(page));
        true
    }

    /// Drop a key's aggregate and invalidate its in-flight fetches,
    /// e.g. when the user navigates away and back.
    pub fn reset(&mut self, key: &FeedFilter) {
        self.views.remove(key);
        *self.generations.entry(key.clone()).or_insert(0) += 1;
    }

    /// Route a live push to every aggregate whose filter matches the
    /// event's subject.
    pub fn handle_event(&mut self, event: &LiveEvent) {
        match event {
            LiveEvent::PostCreated { post } => {
                for (key, view) in &mut self.views {
                    if post_matches(key, post) {
                        view.apply(FeedUpdate::Created(post.clone()));
                    }
                }
            }
            LiveEvent::LikeCreated { like } => {
                // The liker's own liked-by feed gains the post.
                let liker_key = FeedFilter::LikedBy(like.user.id);
                if let Some(view) = self.views.get_mut(&liker_key) {
                    view.apply(FeedUpdate::like_added(like.post.clone(), like.created_at));
                }
                // Everywhere else the post appears, its like list is
                // refreshed in place.
                for (key, view) in &mut self.views {
                    if *key != liker_key {
                        view.refresh_likes(&like.post);
                    }
                }
            }
        }
    }

    /// Fold the caller's own toggle response into their liked-by feed.
    /// The unlike branch carries no post, so the caller supplies the
    /// post id it toggled.
    pub fn note_toggle(&mut self, user_id: Uuid, post_id: Uuid, outcome: &ToggleOutcome) {
        let key = FeedFilter::LikedBy(user_id);
        match outcome {
            ToggleOutcome::Liked { like } => {
                if let Some(view) = self.views.get_mut(&key) {
                    view.apply(FeedUpdate::like_added(like.post.clone(), like.created_at));
                }
            }
            ToggleOutcome::Unliked { .. } => {
                if let Some(view) = self.views.get_mut(&key) {
                    view.apply(FeedUpdate::LikeRemoved { post_id });
                }
            }
        }
    }
}

fn post_matches(key: &FeedFilter, post: &PostView) -> bool {
    match key {
        FeedFilter::All => true,
        FeedFilter::Tag(name) => post.tags.iter().any(|tag| tag.name == *name),
        FeedFilter::Author(author) => post.author.id == *author,
        // Liked-by feeds move on like events, not post creation.
        FeedFilter::LikedBy(_) => false,
    }
}
