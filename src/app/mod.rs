pub mod auth;
pub mod error;
pub mod feed;
mod hydrate;
pub mod likes;
pub mod posts;
pub mod users;

pub use error::{Result, ServiceError};
