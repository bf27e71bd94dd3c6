//! Durable store: four independent record collections (users, posts,
//! tags, likes) related by id reference, plus the session map.
//!
//! There is no cross-collection transaction. Multi-record updates issue
//! all related writes and await them before the operation is considered
//! complete; a write against a record that has vanished mid-operation is
//! an error the caller surfaces as an internal failure.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::like::Like;
use crate::domain::post::Post;
use crate::domain::tag::Tag;
use crate::domain::user::User;

#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<Collections>,
}

#[derive(Default)]
struct Collections {
    users: RwLock<HashMap<Uuid, User>>,
    posts: RwLock<HashMap<Uuid, Post>>,
    tags: RwLock<HashMap<Uuid, Tag>>,
    likes: RwLock<HashMap<Uuid, Like>>,
    sessions: RwLock<HashMap<String, Uuid>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn insert_user(&self, user: User) -> Result<()> {
        self.inner.users.write().await.insert(user.id, user);
        Ok(())
    }

    pub async fn user(&self, id: Uuid) -> Option<User> {
        self.inner.users.read().await.get(&id).cloned()
    }

    pub async fn user_by_username(&self, username: &str) -> Option<User> {
        self.inner
            .users
            .read()
            .await
            .values()
            .find(|user| user.username == username)
            .cloned()
    }

    pub async fn push_user_post(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        let mut users = self.inner.users.write().await;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow!("user {} not found", user_id))?;
        if !user.posts.contains(&post_id) {
            user.posts.push(post_id);
        }
        Ok(())
    }

    pub async fn pull_user_post(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        let mut users = self.inner.users.write().await;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow!("user {} not found", user_id))?;
        user.posts.retain(|id| *id != post_id);
        Ok(())
    }

    pub async fn push_user_like(&self, user_id: Uuid, like_id: Uuid) -> Result<()> {
        let mut users = self.inner.users.write().await;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow!("user {} not found", user_id))?;
        if !user.likes.contains(&like_id) {
            user.likes.push(like_id);
        }
        Ok(())
    }

    pub async fn pull_user_like(&self, user_id: Uuid, like_id: Uuid) -> Result<()> {
        let mut users = self.inner.users.write().await;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow!("user {} not found", user_id))?;
        user.likes.retain(|id| *id != like_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    pub async fn insert_post(&self, post: Post) -> Result<()> {
        self.inner.posts.write().await.insert(post.id, post);
        Ok(())
    }

    pub async fn replace_post(&self, post: Post) -> Result<()> {
        let mut posts = self.inner.posts.write().await;
        if !posts.contains_key(&post.id) {
            return Err(anyhow!("post {} not found", post.id));
        }
        posts.insert(post.id, post);
        Ok(())
    }

    pub async fn post(&self, id: Uuid) -> Option<Post> {
        self.inner.posts.read().await.get(&id).cloned()
    }

    pub async fn post_by_slug(&self, slug: &str) -> Option<Post> {
        self.inner
            .posts
            .read()
            .await
            .values()
            .find(|post| post.slug == slug)
            .cloned()
    }

    /// Snapshot of every post record, for collection scans.
    pub async fn posts_snapshot(&self) -> Vec<Post> {
        self.inner.posts.read().await.values().cloned().collect()
    }

    pub async fn remove_post(&self, id: Uuid) -> Option<Post> {
        self.inner.posts.write().await.remove(&id)
    }

    pub async fn push_post_like(&self, post_id: Uuid, like_id: Uuid) -> Result<()> {
        let mut posts = self.inner.posts.write().await;
        let post = posts
            .get_mut(&post_id)
            .ok_or_else(|| anyhow!("post {} not found", post_id))?;
        if !post.likes.contains(&like_id) {
            post.likes.push(like_id);
        }
        Ok(())
    }

    pub async fn pull_post_like(&self, post_id: Uuid, like_id: Uuid) -> Result<()> {
        let mut posts = self.inner.posts.write().await;
        let post = posts
            .get_mut(&post_id)
            .ok_or_else(|| anyhow!("post {} not found", post_id))?;
        post.likes.retain(|id| *id != like_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    pub async fn tag(&self, id: Uuid) -> Option<Tag> {
        self.inner.tags.read().await.get(&id).cloned()
    }

    pub async fn tag_by_name(&self, name: &str) -> Option<Tag> {
        let name = name.to_lowercase();
        self.inner
            .tags
            .read()
            .await
            .values()
            .find(|tag| tag.name == name)
            .cloned()
    }

    /// Find-or-create by lowercase-normalized name. Tags are never
    /// deleted, even when their post list later empties.
    pub async fn upsert_tag(&self, name: &str) -> Tag {
        let normalized = name.to_lowercase();
        let mut tags = self.inner.tags.write().await;
        if let Some(tag) = tags.values().find(|tag| tag.name == normalized) {
            return tag.clone();
        }
        let tag = Tag::new(&normalized);
        tags.insert(tag.id, tag.clone());
        tag
    }

    pub async fn tags_by_ids(&self, ids: &[Uuid]) -> Vec<Tag> {
        let tags = self.inner.tags.read().await;
        ids.iter().filter_map(|id| tags.get(id).cloned()).collect()
    }

    pub async fn push_tag_post(&self, tag_id: Uuid, post_id: Uuid) -> Result<()> {
        let mut tags = self.inner.tags.write().await;
        let tag = tags
            .get_mut(&tag_id)
            .ok_or_else(|| anyhow!("tag {} not found", tag_id))?;
        if !tag.posts.contains(&post_id) {
            tag.posts.push(post_id);
        }
        Ok(())
    }

    pub async fn pull_tag_post(&self, tag_id: Uuid, post_id: Uuid) -> Result<()> {
        let mut tags = self.inner.tags.write().await;
        let tag = tags
            .get_mut(&tag_id)
            .ok_or_else(|| anyhow!("tag {} not found", tag_id))?;
        tag.posts.retain(|id| *id != post_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Likes
    // ------------------------------------------------------------------

    pub async fn insert_like(&self, like: Like) -> Result<()> {
        self.inner.likes.write().await.insert(like.id, like);
        Ok(())
    }

    pub async fn like(&self, id: Uuid) -> Option<Like> {
        self.inner.likes.read().await.get(&id).cloned()
    }

    pub async fn like_by_user_and_post(&self, user_id: Uuid, post_id: Uuid) -> Option<Like> {
        self.inner
            .likes
            .read()
            .await
            .values()
            .find(|like| like.user_id == user_id && like.post_id == post_id)
            .cloned()
    }

    pub async fn likes_by_ids(&self, ids: &[Uuid]) -> Vec<Like> {
        let likes = self.inner.likes.read().await;
        ids.iter().filter_map(|id| likes.get(id).cloned()).collect()
    }

    pub async fn remove_like(&self, id: Uuid) -> Option<Like> {
        self.inner.likes.write().await.remove(&id)
    }

    /// Delete every like referencing a post, returning the removed
    /// records so the caller can unwind the liking users' like lists.
    pub async fn remove_likes_for_post(&self, post_id: Uuid) -> Vec<Like> {
        let mut likes = self.inner.likes.write().await;
        let ids: Vec<Uuid> = likes
            .values()
            .filter(|like| like.post_id == post_id)
            .map(|like| like.id)
            .collect();
        ids.iter().filter_map(|id| likes.remove(id)).collect()
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub async fn insert_session(&self, token: String, user_id: Uuid) -> Result<()> {
        self.inner.sessions.write().await.insert(token, user_id);
        Ok(())
    }

    pub async fn session_user(&self, token: &str) -> Option<Uuid> {
        self.inner.sessions.read().await.get(token).copied()
    }
}
