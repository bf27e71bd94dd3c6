//! Session issuance and lookup. Authentication mechanics (passwords,
//! token rotation) are an external collaborator; this is the minimal
//! fixed contract the core needs: an opaque bearer token that resolves
//! to a user id.

use uuid::Uuid;

use crate::app::error::{Result, ServiceError};
use crate::infra::store::Store;

#[derive(Clone)]
pub struct AuthService {
    store: Store,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
}

impl AuthService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn login(&self, username: &str) -> Result<Session> {
        let user = self
            .store
            .user_by_username(username)
            .await
            .ok_or_else(|| ServiceError::not_found("user not found"))?;

        let token = Uuid::new_v4().simple().to_string();
        self.store.insert_session(token.clone(), user.id).await?;

        Ok(Session {
            token,
            user_id: user.id,
        })
    }

    pub async fn authenticate(&self, token: &str) -> Option<Uuid> {
        self.store.session_user(token).await
    }
}
