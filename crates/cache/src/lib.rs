#![warn(clippy::unwrap_used)]

pub mod backend;
pub mod client;
pub mod json;
pub mod local;

pub use backend::CacheBackend;
pub use client::RedisCache;
pub use json::JsonCache;
pub use local::LocalCache;
