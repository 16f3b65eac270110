//! Resolves a tenant to a live handle on its isolated database.

use crate::registry::TenantRegistry;
use adgenius_core::tenant::{Tenant, TenantSettingsUpdate};
use adgenius_core::AdGeniusResult;
use adgenius_store::{StoreCluster, TenantStore};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// A resolved tenant plus the only store handle requests may use for it.
#[derive(Clone)]
pub struct TenantContext {
    pub tenant: Tenant,
    pub store: Arc<TenantStore>,
}

impl TenantContext {
    pub fn tenant_id(&self) -> Uuid {
        self.tenant.id
    }
}

/// Handle cache keyed by isolated-store name. No TTL, capped in size;
/// once full, handles for new stores are opened per call and not retained.
pub struct TenantStoreRouter {
    registry: Arc<TenantRegistry>,
    cluster: Arc<StoreCluster>,
    handles: DashMap<String, Arc<TenantStore>>,
    max_handles: usize,
}

impl TenantStoreRouter {
    pub fn new(registry: Arc<TenantRegistry>, cluster: Arc<StoreCluster>, max_handles: usize) -> Self {
        Self {
            registry,
            cluster,
            handles: DashMap::new(),
            max_handles,
        }
    }

    pub fn registry(&self) -> &Arc<TenantRegistry> {
        &self.registry
    }

    pub async fn resolve(&self, tenant_id: Uuid) -> AdGeniusResult<TenantContext> {
        let tenant = self.registry.get_tenant_by_id(tenant_id).await?;
        let store = self.handle(&tenant.store_name)?;
        Ok(TenantContext { tenant, store })
    }

    pub async fn resolve_domain(&self, domain: &str) -> AdGeniusResult<TenantContext> {
        let tenant = self.registry.get_tenant_by_domain(domain).await?;
        let store = self.handle(&tenant.store_name)?;
        Ok(TenantContext { tenant, store })
    }

    /// Applies the update through the registry, then drops the cached handle.
    pub async fn update_tenant_settings(
        &self,
        tenant_id: Uuid,
        update: TenantSettingsUpdate,
    ) -> AdGeniusResult<Tenant> {
        let tenant = self.registry.update_tenant_settings(tenant_id, update).await?;
        self.evict(&tenant.store_name);
        Ok(tenant)
    }

    pub async fn deactivate(&self, tenant_id: Uuid) -> AdGeniusResult<Tenant> {
        let tenant = self.registry.deactivate_tenant(tenant_id).await?;
        self.evict(&tenant.store_name);
        Ok(tenant)
    }

    /// Removes a tenant and its database outright. See [`TenantRegistry::discard_tenant`].
    pub async fn discard(&self, tenant_id: Uuid) -> AdGeniusResult<Tenant> {
        let tenant = self.registry.discard_tenant(tenant_id).await?;
        self.evict(&tenant.store_name);
        Ok(tenant)
    }

    pub fn cached_handles(&self) -> usize {
        self.handles.len()
    }

    fn handle(&self, store_name: &str) -> AdGeniusResult<Arc<TenantStore>> {
        if let Some(handle) = self.handles.get(store_name) {
            if !handle.is_closed() {
                metrics::counter!("tenancy.handle_cache.hit").increment(1);
                return Ok(handle.clone());
            }
        }
        // Stale handle on a dropped database, or first use.
        self.handles.remove(store_name);
        metrics::counter!("tenancy.handle_cache.miss").increment(1);

        let handle = self.cluster.open(store_name)?;
        if self.handles.len() < self.max_handles {
            self.handles.insert(store_name.to_string(), handle.clone());
        } else {
            debug!(store_name = store_name, "Handle cache full, not retaining handle");
        }
        Ok(handle)
    }

    fn evict(&self, store_name: &str) {
        if self.handles.remove(store_name).is_some() {
            debug!(store_name = store_name, "Store handle evicted");
        }
    }
}
