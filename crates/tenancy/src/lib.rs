//! Tenant identity and database-per-tenant routing.

#![warn(clippy::unwrap_used)]

pub mod registry;
pub mod router;

pub use registry::{store_name_for, TenantRegistry};
pub use router::{TenantContext, TenantStoreRouter};
