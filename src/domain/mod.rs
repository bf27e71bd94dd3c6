pub mod cursor;
pub mod like;
pub mod post;
pub mod tag;
pub mod user;
