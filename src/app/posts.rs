use futures::future::try_join_all;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{Result, ServiceError};
use crate::app::hydrate;
use crate::domain::like::LikeView;
use crate::domain::post::{slug_for, Post, PostView};
use crate::infra::live::{LiveEvent, LiveHub};
use crate::infra::store::Store;

#[derive(Clone)]
pub struct PostService {
    store: Store,
    live: LiveHub,
}

/// Deletion result: the bare identity of the removed record.
#[derive(Debug, Clone, Serialize)]
pub struct DeletedPost {
    pub id: Uuid,
    pub slug: String,
}

impl PostService {
    pub fn new(store: Store, live: LiveHub) -> Self {
        Self { store, live }
    }

    pub async fn create_post(
        &self,
        author_id: Uuid,
        content: &str,
        tags: &[String],
    ) -> Result<PostView> {
        let slug = slug_for(content);
        if self.store.post_by_slug(&slug).await.is_some() {
            return Err(ServiceError::conflict("Post already exists"));
        }

        self.store
            .user(author_id)
            .await
            .ok_or_else(|| ServiceError::not_found("user not found"))?;

        let mut post = Post::new(author_id, content, OffsetDateTime::now_utc());

        for name in tags {
            let tag = self.store.upsert_tag(name).await;
            self.store.push_tag_post(tag.id, post.id).await?;
            post.tags.push(tag.id);
        }

        tokio::try_join!(
            self.store.insert_post(post.clone()),
            self.store.push_user_post(author_id, post.id),
        )?;

        let view = hydrate::post_view(&self.store, &post).await?;
        self.live.publish(LiveEvent::PostCreated { post: view.clone() });

        Ok(view)
    }

    pub async fn get_post(&self, slug: &str) -> Result<PostView> {
        let post = self
            .store
            .post_by_slug(slug)
            .await
            .ok_or_else(|| ServiceError::not_found("post not found"))?;
        hydrate::post_view(&self.store, &post).await
    }

    pub async fn likes_for_post(&self, post_id: Uuid) -> Result<Vec<LikeView>> {
        let post = self
            .store
            .post(post_id)
            .await
            .ok_or_else(|| ServiceError::not_found("post not found"))?;
        Ok(hydrate::like_views(&self.store, &post.likes).await)
    }

    pub async fn update_post(
        &self,
        caller: Uuid,
        post_id: Uuid,
        content: Option<&str>,
        tags: Option<&[String]>,
    ) -> Result<PostView> {
        let mut post = self
            .store
            .post(post_id)
            .await
            .ok_or_else(|| ServiceError::not_found("post not found"))?;

        if post.author_id != caller {
            return Err(ServiceError::forbidden("User not authorised"));
        }

        if let Some(content) = content {
            let slug = slug_for(content);
            if slug != post.slug {
                if self.store.post_by_slug(&slug).await.is_some() {
                    return Err(ServiceError::conflict("Post already exists"));
                }
                post.slug = slug;
            }
            post.content = content.to_string();
        }

        if let Some(tags) = tags {
            self.apply_tag_diff(&mut post, tags).await?;
        }

        self.store.replace_post(post.clone()).await?;

        hydrate::post_view(&self.store, &post).await
    }

    /// Set-difference update of the post's tag list, keeping both sides
    /// of the tag relation consistent.
    async fn apply_tag_diff(&self, post: &mut Post, tags: &[String]) -> Result<()> {
        let wanted: Vec<String> = tags.iter().map(|name| name.to_lowercase()).collect();
        let current = self.store.tags_by_ids(&post.tags).await;

        let removed: Vec<_> = current
            .iter()
            .filter(|tag| !wanted.contains(&tag.name))
            .collect();
        for tag in &removed {
            self.store.pull_tag_post(tag.id, post.id).await?;
            post.tags.retain(|id| *id != tag.id);
        }

        for name in &wanted {
            if current.iter().any(|tag| tag.name == *name) {
                continue;
            }
            let tag = self.store.upsert_tag(name).await;
            self.store.push_tag_post(tag.id, post.id).await?;
            if !post.tags.contains(&tag.id) {
                post.tags.push(tag.id);
            }
        }

        Ok(())
    }

    /// Delete a post and cascade every relation referencing it. The
    /// cascade is an explicit sequence inside the operation: each group
    /// of writes is awaited before the next, and any failure leaves the
    /// operation reported as failed with no partial success claimed.
    pub async fn delete_post(&self, caller: Uuid, post_id: Uuid) -> Result<DeletedPost> {
        let post = self
            .store
            .post(post_id)
            .await
            .ok_or_else(|| ServiceError::not_found("post not found"))?;

        if post.author_id != caller {
            return Err(ServiceError::forbidden("Post does not belong to user"));
        }

        try_join_all(
            post.tags
                .iter()
                .map(|tag_id| self.store.pull_tag_post(*tag_id, post.id)),
        )
        .await?;

        let likes = self.store.remove_likes_for_post(post.id).await;
        try_join_all(
            likes
                .iter()
                .map(|like| self.store.pull_user_like(like.user_id, like.id)),
        )
        .await?;

        self.store.pull_user_post(post.author_id, post.id).await?;
        self.store.remove_post(post.id).await;

        Ok(DeletedPost {
            id: post.id,
            slug: post.slug,
        })
    }
}
