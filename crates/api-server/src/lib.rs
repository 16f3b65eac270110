#![warn(clippy::unwrap_used)]

pub mod analytics_rest;
pub mod billing_rest;
pub mod campaign_rest;
pub mod error;
pub mod extract;
pub mod rest;
pub mod server;
pub mod tenant_rest;

pub use error::ApiError;
pub use rest::AppState;
pub use server::ApiServer;
