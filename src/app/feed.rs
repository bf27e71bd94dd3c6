use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::error::{Result, ServiceError};
use crate::app::hydrate;
use crate::domain::cursor;
use crate::domain::post::{Post, PostView};
use crate::infra::store::Store;

pub const DEFAULT_PAGE_SIZE: i64 = 4;

/// One feed is identified by its filter; feeds with different filters
/// are wholly independent and never merge into each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedFilter {
    All,
    Tag(String),
    Author(Uuid),
    LikedBy(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPage {
    pub total_count: i64,
    pub end_cursor: Option<String>,
    pub has_more: bool,
    pub posts: Vec<PostView>,
}

#[derive(Clone)]
pub struct FeedService {
    store: Store,
}

impl FeedService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Resolve one page of the feed for `filter`.
    ///
    /// A present cursor restricts to items strictly older than the
    /// decoded ordering key; a cursor that fails to decode is treated as
    /// no cursor, so pagination degrades gracefully instead of failing
    /// an otherwise valid request. `total_count` ignores the cursor.
    pub async fn resolve(
        &self,
        viewer: Option<Uuid>,
        filter: &FeedFilter,
        cursor: Option<String>,
        limit: i64,
    ) -> Result<FeedPage> {
        let before = cursor.as_deref().and_then(|raw| match cursor::decode(raw) {
            Ok(millis) => Some(millis),
            Err(_) => {
                tracing::debug!(cursor = raw, "ignoring malformed cursor");
                None
            }
        });

        match filter {
            FeedFilter::LikedBy(liker) => {
                require_self(viewer, *liker)?;
                self.resolve_liked_by(*liker, before, cursor, limit).await
            }
            FeedFilter::Author(author) => {
                require_self(viewer, *author)?;
                self.resolve_posts(filter, before, cursor, limit).await
            }
            FeedFilter::All | FeedFilter::Tag(_) => {
                self.resolve_posts(filter, before, cursor, limit).await
            }
        }
    }

    async fn resolve_posts(
        &self,
        filter: &FeedFilter,
        before: Option<i64>,
        cursor: Option<String>,
        limit: i64,
    ) -> Result<FeedPage> {
        let snapshot = self.store.posts_snapshot().await;

        let mut matching: Vec<Post> = match filter {
            FeedFilter::All => snapshot,
            FeedFilter::Author(author) => snapshot
                .into_iter()
                .filter(|post| post.author_id == *author)
                .collect(),
            FeedFilter::Tag(name) => match self.store.tag_by_name(name).await {
                // an unknown tag is an empty result set, not an error
                None => Vec::new(),
                Some(tag) => snapshot
                    .into_iter()
                    .filter(|post| post.tags.contains(&tag.id))
                    .collect(),
            },
            FeedFilter::LikedBy(_) => unreachable!("liked-by pages over like edges"),
        };

        let total_count = matching.len() as i64;

        if let Some(before) = before {
            matching.retain(|post| cursor::unix_millis(post.created_at) < before);
        }

        // Total order even when timestamps collide.
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let has_more = matching.len() as i64 > limit;
        matching.truncate(limit.max(0) as usize);

        let end_cursor = match matching.last() {
            Some(last) => Some(cursor::encode(cursor::unix_millis(last.created_at))),
            // an exhausted feed echoes the caller's cursor instead of
            // regressing it
            None => cursor,
        };

        let mut posts = Vec::with_capacity(matching.len());
        for post in &matching {
            posts.push(hydrate::post_view(&self.store, post).await?);
        }

        Ok(FeedPage {
            total_count,
            end_cursor,
            has_more,
            posts,
        })
    }

    /// The liked-by mode pages over the liker's like edges, ordered by
    /// like creation time, and projects each edge to its target post.
    /// `total_count` is the liker's total like count, cursor-independent.
    async fn resolve_liked_by(
        &self,
        liker: Uuid,
        before: Option<i64>,
        cursor: Option<String>,
        limit: i64,
    ) -> Result<FeedPage> {
        let user = self
            .store
            .user(liker)
            .await
            .ok_or_else(|| ServiceError::not_found("user not found"))?;

        let total_count = user.likes.len() as i64;

        let mut likes = self.store.likes_by_ids(&user.likes).await;

        if let Some(before) = before {
            likes.retain(|like| cursor::unix_millis(like.created_at) < before);
        }

        likes.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let has_more = likes.len() as i64 > limit;
        likes.truncate(limit.max(0) as usize);

        let end_cursor = match likes.last() {
            Some(last) => Some(cursor::encode(cursor::unix_millis(last.created_at))),
            None => cursor,
        };

        let mut posts: Vec<PostView> = Vec::with_capacity(likes.len());
        for like in &likes {
            let post = self.store.post(like.post_id).await.ok_or_else(|| {
                anyhow::anyhow!("like {} references missing post {}", like.id, like.post_id)
            })?;
            posts.push(hydrate::post_view(&self.store, &post).await?);
        }

        Ok(FeedPage {
            total_count,
            end_cursor,
            has_more,
            posts,
        })
    }
}

/// No user may page through another user's authored-or-liked feed.
fn require_self(viewer: Option<Uuid>, subject: Uuid) -> Result<()> {
    match viewer {
        None => Err(ServiceError::Unauthenticated),
        Some(viewer) if viewer != subject => {
            Err(ServiceError::forbidden("User not authorised"))
        }
        Some(_) => Ok(()),
    }
}
