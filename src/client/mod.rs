pub mod reconciler;

pub use reconciler::{FeedStore, FeedUpdate, FeedView, FetchTicket};
