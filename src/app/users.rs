use crate::app::error::{Result, ServiceError};
use crate::domain::user::User;
use crate::infra::store::Store;

#[derive(Clone)]
pub struct UserService {
    store: Store,
}

impl UserService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn create_user(&self, username: &str, name: &str, email: &str) -> Result<User> {
        if self.store.user_by_username(username).await.is_some() {
            return Err(ServiceError::conflict("username already taken"));
        }

        let user = User::new(username, name, email);
        self.store.insert_user(user.clone()).await?;
        Ok(user)
    }
}
