use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::feed::{FeedFilter, FeedPage, FeedService};
use crate::app::likes::{LikeService, ToggleOutcome};
use crate::app::posts::{DeletedPost, PostService};
use crate::app::users::UserService;
use crate::domain::like::LikeView;
use crate::domain::post::PostView;
use crate::http::{AppError, AuthUser};
use crate::infra::live::LiveEvent;
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// ---------------------------------------------------------------------------
// Users & sessions
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub name: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::bad_request("username is required"));
    }

    let service = UserService::new(state.store.clone());
    let user = service
        .create_user(payload.username.trim(), &payload.name, &payload.email)
        .await?;

    Ok(Json(UserResponse {
        id: user.id,
        username: user.username,
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::bad_request("username is required"));
    }

    let service = AuthService::new(state.store.clone());
    let session = service.login(payload.username.trim()).await?;

    Ok(Json(LoginResponse {
        token: session.token,
        user_id: session.user_id,
    }))
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct FeedQuery {
    pub tag: Option<String>,
    pub author: Option<Uuid>,
    pub liked_by: Option<Uuid>,
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

pub async fn feed(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedPage>, AppError> {
    let limit = query.limit.unwrap_or(state.feed_page_size);
    if !(1..=100).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 100"));
    }

    let filters_given = [
        query.tag.is_some(),
        query.author.is_some(),
        query.liked_by.is_some(),
    ]
    .iter()
    .filter(|given| **given)
    .count();
    if filters_given > 1 {
        return Err(AppError::bad_request(
            "tag, author and liked_by are mutually exclusive",
        ));
    }

    let filter = if let Some(tag) = query.tag {
        FeedFilter::Tag(tag)
    } else if let Some(author) = query.author {
        FeedFilter::Author(author)
    } else if let Some(liker) = query.liked_by {
        FeedFilter::LikedBy(liker)
    } else {
        FeedFilter::All
    };

    let service = FeedService::new(state.store.clone());
    let page = service
        .resolve(
            auth.map(|auth| auth.user_id),
            &filter,
            query.cursor,
            limit,
        )
        .await?;

    Ok(Json(page))
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<PostView>, AppError> {
    if payload.content.trim().is_empty() {
        return Err(AppError::bad_request("content is required"));
    }

    let service = PostService::new(state.store.clone(), state.live.clone());
    let post = service
        .create_post(auth.user_id, payload.content.trim(), &payload.tags)
        .await?;

    Ok(Json(post))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostView>, AppError> {
    let service = PostService::new(state.store.clone(), state.live.clone());
    let post = service.get_post(&slug).await?;
    Ok(Json(post))
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

pub async fn update_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<PostView>, AppError> {
    if let Some(content) = payload.content.as_deref() {
        if content.trim().is_empty() {
            return Err(AppError::bad_request("content cannot be blank"));
        }
    }

    let service = PostService::new(state.store.clone(), state.live.clone());
    let post = service
        .update_post(
            auth.user_id,
            id,
            payload.content.as_deref().map(str::trim),
            payload.tags.as_deref(),
        )
        .await?;

    Ok(Json(post))
}

pub async fn delete_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedPost>, AppError> {
    let service = PostService::new(state.store.clone(), state.live.clone());
    let deleted = service.delete_post(auth.user_id, id).await?;
    Ok(Json(deleted))
}

pub async fn list_post_likes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LikeView>>, AppError> {
    let service = PostService::new(state.store.clone(), state.live.clone());
    let likes = service.likes_for_post(id).await?;
    Ok(Json(likes))
}

// ---------------------------------------------------------------------------
// Likes
// ---------------------------------------------------------------------------

pub async fn toggle_like(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ToggleOutcome>, AppError> {
    let service = LikeService::new(state.store.clone(), state.live.clone());
    let outcome = service.toggle(auth.user_id, id).await?;
    Ok(Json(outcome))
}

// ---------------------------------------------------------------------------
// Live channel
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct LiveQuery {
    /// Narrow the stream to likes on one post.
    pub post: Option<Uuid>,
}

pub async fn live(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<LiveQuery>,
) -> impl IntoResponse {
    let rx = state.live.subscribe();
    ws.on_upgrade(move |socket| stream_events(socket, rx, query.post))
}

async fn stream_events(
    mut socket: WebSocket,
    mut rx: tokio::sync::broadcast::Receiver<LiveEvent>,
    post_filter: Option<Uuid>,
) {
    loop {
        tokio::select! {
            event = rx.recv() => {
                let event = match event {
                    Ok(event) => event,
                    // Dropped events are tolerated: the reconciler's
                    // merge rules absorb gaps and duplicates.
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "live subscriber lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                if let Some(post_id) = post_filter {
                    let matches = matches!(
                        &event,
                        LiveEvent::LikeCreated { like } if like.post.id == post_id
                    );
                    if !matches {
                        continue;
                    }
                }

                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(err) => {
                        tracing::error!(error = ?err, "failed to serialize live event");
                        continue;
                    }
                };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }
}
