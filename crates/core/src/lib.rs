pub mod billing;
pub mod campaign;
pub mod config;
pub mod error;
pub mod tenant;

pub use config::AppConfig;
pub use error::{AdGeniusError, AdGeniusResult};
