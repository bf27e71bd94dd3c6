pub mod app;
pub mod client;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::infra::{live::LiveHub, store::Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub live: LiveHub,
    pub feed_page_size: i64,
}
