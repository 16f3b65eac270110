//! The database server: one shared control-plane database and any number of
//! isolated tenant databases addressed by name.

use crate::control_plane::ControlPlaneStore;
use crate::schema::tenant_collections;
use crate::tenant_store::TenantStore;
use adgenius_core::{AdGeniusError, AdGeniusResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

pub struct StoreCluster {
    control_plane: Arc<ControlPlaneStore>,
    databases: DashMap<String, Arc<TenantStore>>,
}

impl StoreCluster {
    pub fn new(control_plane_name: impl Into<String>) -> Self {
        let control_plane = Arc::new(ControlPlaneStore::new(control_plane_name));
        info!(
            control_plane = control_plane.name(),
            "Store cluster initialized (in-memory, development mode)"
        );
        Self {
            control_plane,
            databases: DashMap::new(),
        }
    }

    pub fn control_plane(&self) -> Arc<ControlPlaneStore> {
        self.control_plane.clone()
    }

    /// Creates a database with every tenant collection and index.
    ///
    /// Fails with `ProvisioningError` if a database with that name already exists.
    pub fn provision(&self, name: &str) -> AdGeniusResult<Arc<TenantStore>> {
        match self.databases.entry(name.to_string()) {
            Entry::Occupied(_) => Err(AdGeniusError::ProvisioningError(format!(
                "database {name} already exists"
            ))),
            Entry::Vacant(slot) => {
                let collections = tenant_collections();
                let created: Vec<&str> = collections.iter().map(|c| c.name).collect();
                let store = Arc::new(TenantStore::new(name.to_string(), collections.clone()));
                slot.insert(store.clone());
                info!(database = name, collections = ?created, "Tenant database provisioned");
                metrics::counter!("store.databases.provisioned").increment(1);
                Ok(store)
            }
        }
    }

    /// Opens a handle on an existing database.
    pub fn open(&self, name: &str) -> AdGeniusResult<Arc<TenantStore>> {
        self.databases
            .get(name)
            .map(|r| r.value().clone())
            .ok_or_else(|| AdGeniusError::StoreError(format!("database {name} does not exist")))
    }

    /// Drops a database. Outstanding handles start failing with `StoreError`.
    pub fn drop_database(&self, name: &str) -> bool {
        match self.databases.remove(name) {
            Some((_, store)) => {
                store.close();
                info!(database = name, "Tenant database dropped");
                true
            }
            None => false,
        }
    }

    pub fn database_count(&self) -> usize {
        self.databases.len()
    }
}
