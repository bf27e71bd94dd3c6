#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use murmur::domain::like::Like;
use murmur::domain::post::Post;
use murmur::infra::{live::LiveHub, store::Store};
use murmur::AppState;

// ---------------------------------------------------------------------------
// TestApp — a fresh in-process app per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub token: String,
}

pub async fn app() -> TestApp {
    let state = AppState {
        store: Store::new(),
        live: LiveHub::new(64),
        feed_page_size: 4,
    };
    let router = murmur::http::router(state.clone());
    TestApp { router, state }
}

impl TestApp {
    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::GET, path, None, &headers).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::POST, path, Some(body), &headers).await
    }

    pub async fn patch_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::PATCH, path, Some(body), &headers)
            .await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::DELETE, path, None, &headers).await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Create a user and log in via the API to obtain a session token.
    pub async fn create_user(&self, suffix: &str) -> TestUser {
        let username = format!("testuser_{}", suffix);

        let resp = self
            .post_json(
                "/v1/users",
                json!({
                    "username": username,
                    "name": format!("Test User {}", suffix),
                    "email": format!("test_{}@example.com", suffix),
                }),
                None,
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "create user failed");
        let id = Uuid::parse_str(resp.json()["id"].as_str().unwrap()).unwrap();

        let resp = self
            .post_json("/v1/auth/login", json!({ "username": username }), None)
            .await;
        assert_eq!(resp.status, StatusCode::OK, "login failed");
        let token = resp.json()["token"].as_str().unwrap().to_string();

        TestUser {
            id,
            username,
            token,
        }
    }

    /// Seed a post directly in the store with an explicit creation
    /// timestamp, wiring both sides of every relation the way the post
    /// service does.
    pub async fn seed_post(
        &self,
        author_id: Uuid,
        content: &str,
        tags: &[&str],
        created_at: OffsetDateTime,
    ) -> Uuid {
        let store = &self.state.store;
        let mut post = Post::new(author_id, content, created_at);

        for name in tags {
            let tag = store.upsert_tag(name).await;
            store
                .push_tag_post(tag.id, post.id)
                .await
                .expect("push tag post");
            post.tags.push(tag.id);
        }

        let post_id = post.id;
        store.insert_post(post).await.expect("insert post");
        store
            .push_user_post(author_id, post_id)
            .await
            .expect("push user post");

        post_id
    }

    /// Seed a like edge with an explicit creation timestamp.
    pub async fn seed_like(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        created_at: OffsetDateTime,
    ) -> Uuid {
        let store = &self.state.store;
        let like = Like::new(user_id, post_id, created_at);
        let like_id = like.id;

        store.insert_like(like).await.expect("insert like");
        store
            .push_post_like(post_id, like_id)
            .await
            .expect("push post like");
        store
            .push_user_like(user_id, like_id)
            .await
            .expect("push user like");

        like_id
    }
}

/// A fixed, deterministic timeline base for seeded records.
pub fn base_time() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("valid timestamp")
}
