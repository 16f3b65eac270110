//! In-memory document stores backed by DashMap.
//!
//! Production: replace with a document database (one database per tenant plus
//! a shared control-plane database). This provides the same API surface for
//! development and testing.

#![warn(clippy::unwrap_used)]

pub mod cluster;
pub mod control_plane;
pub mod schema;
pub mod tenant_store;

pub use cluster::StoreCluster;
pub use control_plane::ControlPlaneStore;
pub use schema::{CollectionSpec, IndexSpec};
pub use tenant_store::{CreativeTransition, TenantStore};

/// Apply `offset`/`limit` to an already-sorted listing.
pub(crate) fn paginate<T>(items: Vec<T>, limit: usize, offset: usize) -> Vec<T> {
    items.into_iter().skip(offset).take(limit).collect()
}
