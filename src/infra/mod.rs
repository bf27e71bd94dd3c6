pub mod live;
pub mod store;
