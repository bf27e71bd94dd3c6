//! Read-side hydration: expand a stored post record into the
//! self-contained view the feed and mutation responses return.

use anyhow::anyhow;

use crate::app::error::Result;
use crate::domain::like::LikeView;
use crate::domain::post::{Post, PostView};
use crate::domain::tag::TagRef;
use crate::domain::user::UserRef;
use crate::infra::store::Store;

pub(crate) async fn post_view(store: &Store, post: &Post) -> Result<PostView> {
    let author = store
        .user(post.author_id)
        .await
        .ok_or_else(|| anyhow!("post {} references missing author {}", post.id, post.author_id))?;

    let tags = store
        .tags_by_ids(&post.tags)
        .await
        .iter()
        .map(TagRef::from)
        .collect();

    let likes = like_views(store, &post.likes).await;

    Ok(PostView {
        id: post.id,
        content: post.content.clone(),
        slug: post.slug.clone(),
        author: UserRef::from(&author),
        tags,
        likes,
        created_at: post.created_at,
    })
}

/// Expand like ids into views with the liking user's id and username.
/// Likes whose user record has vanished are skipped rather than failing
/// the whole page.
pub(crate) async fn like_views(store: &Store, like_ids: &[uuid::Uuid]) -> Vec<LikeView> {
    let mut views = Vec::with_capacity(like_ids.len());
    for like in store.likes_by_ids(like_ids).await {
        if let Some(user) = store.user(like.user_id).await {
            views.push(LikeView {
                id: like.id,
                user: UserRef::from(&user),
                created_at: like.created_at,
            });
        }
    }
    views
}
