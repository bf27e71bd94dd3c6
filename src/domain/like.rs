use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::post::PostView;
use crate::domain::user::UserRef;

/// A like edge between one user and one post. At most one exists per
/// (user, post) pair; the toggle logic enforces this with check-then-act.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Like {
    pub fn new(user_id: Uuid, post_id: Uuid, created_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            post_id,
            created_at,
        }
    }
}

/// A like as embedded in a hydrated post: id, liking user, timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeView {
    pub id: Uuid,
    pub user: UserRef,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A fully hydrated like, as returned by the create branch of the toggle
/// and carried on the live channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeDetail {
    pub id: Uuid,
    pub user: UserRef,
    pub post: PostView,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
