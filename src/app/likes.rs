use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{Result, ServiceError};
use crate::app::hydrate;
use crate::domain::like::{Like, LikeDetail};
use crate::domain::user::UserRef;
use crate::infra::live::{LiveEvent, LiveHub};
use crate::infra::store::Store;

#[derive(Clone)]
pub struct LikeService {
    store: Store,
    live: LiveHub,
}

/// The toggle's two branches deliberately return different shapes: a
/// created like comes back fully hydrated, a removed one carries only
/// the deleted record's identity. Callers inspect the variant to learn
/// which branch fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToggleOutcome {
    Liked { like: LikeDetail },
    Unliked { id: Uuid },
}

impl LikeService {
    pub fn new(store: Store, live: LiveHub) -> Self {
        Self { store, live }
    }

    /// Idempotent create/delete of the like edge for (caller, post).
    ///
    /// Check-then-act: an existing edge is removed, otherwise one is
    /// created. The create branch issues its three writes concurrently
    /// and awaits them jointly; a partial failure surfaces as an
    /// internal error. Only the create branch is broadcast — the
    /// unliking client learns the outcome from its own response.
    pub async fn toggle(&self, user_id: Uuid, post_id: Uuid) -> Result<ToggleOutcome> {
        self.store
            .post(post_id)
            .await
            .ok_or_else(|| ServiceError::not_found("post not found"))?;
        let user = self
            .store
            .user(user_id)
            .await
            .ok_or_else(|| ServiceError::not_found("user not found"))?;

        if let Some(existing) = self.store.like_by_user_and_post(user_id, post_id).await {
            tokio::try_join!(
                self.store.pull_post_like(post_id, existing.id),
                self.store.pull_user_like(user_id, existing.id),
            )?;
            self.store.remove_like(existing.id).await;
            return Ok(ToggleOutcome::Unliked { id: existing.id });
        }

        let like = Like::new(user_id, post_id, OffsetDateTime::now_utc());
        tokio::try_join!(
            self.store.push_post_like(post_id, like.id),
            self.store.push_user_like(user_id, like.id),
            self.store.insert_like(like.clone()),
        )?;

        // Re-read so the embedded like list includes the new edge.
        let post = self
            .store
            .post(post_id)
            .await
            .ok_or_else(|| anyhow!("post {} vanished during like", post_id))?;
        let post = hydrate::post_view(&self.store, &post).await?;

        let detail = LikeDetail {
            id: like.id,
            user: UserRef::from(&user),
            post,
            created_at: like.created_at,
        };
        self.live.publish(LiveEvent::LikeCreated {
            like: detail.clone(),
        });

        Ok(ToggleOutcome::Liked { like: detail })
    }
}
