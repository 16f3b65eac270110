//! Tenant lifecycle: provisioning, lookups, settings updates, deactivation.

use adgenius_cache::JsonCache;
use adgenius_core::tenant::{Tenant, TenantSettings, TenantSettingsUpdate};
use adgenius_core::{AdGeniusError, AdGeniusResult};
use adgenius_store::{ControlPlaneStore, StoreCluster};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Isolated-database name for a tenant display name.
///
/// ASCII alphanumerics are lowercased, space, `-` and `_` become `_`, and
/// everything else is dropped. Deterministic, so two names with the same slug
/// collide at provisioning time.
pub fn store_name_for(name: &str) -> AdGeniusResult<String> {
    let slug: String = name
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
            ' ' | '-' | '_' => Some('_'),
            _ => None,
        })
        .collect();
    if !slug.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(AdGeniusError::ProvisioningError(format!(
            "tenant name {name:?} yields an empty store identifier"
        )));
    }
    Ok(format!("tenant_{slug}_db"))
}

fn id_key(id: Uuid) -> String {
    format!("tenant:id:{id}")
}

fn domain_key(domain: &str) -> String {
    format!("tenant:domain:{domain}")
}

/// Owns tenant metadata in the control plane, fronted by a short-TTL read cache.
pub struct TenantRegistry {
    cluster: Arc<StoreCluster>,
    control_plane: Arc<ControlPlaneStore>,
    cache: JsonCache,
}

impl TenantRegistry {
    pub fn new(cluster: Arc<StoreCluster>, cache: JsonCache) -> Self {
        let control_plane = cluster.control_plane();
        Self {
            cluster,
            control_plane,
            cache,
        }
    }

    /// Inserts the tenant document, then provisions its isolated database.
    /// A provisioning failure deletes the document again.
    pub fn create_tenant(&self, name: &str, domain: &str, plan_id: &str) -> AdGeniusResult<Tenant> {
        let name = name.trim();
        let domain = domain.trim().to_ascii_lowercase();
        if name.is_empty() || domain.is_empty() {
            return Err(AdGeniusError::Validation(
                "tenant name and domain are required".into(),
            ));
        }
        let store_name = store_name_for(name)?;

        let now = Utc::now();
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            domain,
            store_name,
            plan_id: plan_id.to_string(),
            is_active: true,
            settings: TenantSettings::default(),
            created_at: now,
            updated_at: now,
        };
        self.control_plane.insert_tenant(tenant.clone())?;

        if let Err(e) = self.cluster.provision(&tenant.store_name) {
            self.control_plane.delete(tenant.id);
            error!(
                tenant_id = %tenant.id,
                store_name = %tenant.store_name,
                error = %e,
                "Provisioning failed, tenant metadata rolled back"
            );
            metrics::counter!("tenancy.provisioning.failed").increment(1);
            return Err(match e {
                AdGeniusError::ProvisioningError(_) => e,
                other => AdGeniusError::ProvisioningError(other.to_string()),
            });
        }

        info!(
            tenant_id = %tenant.id,
            tenant_name = %tenant.name,
            store_name = %tenant.store_name,
            "Tenant created"
        );
        metrics::counter!("tenancy.tenants.created").increment(1);
        Ok(tenant)
    }

    pub async fn get_tenant_by_id(&self, id: Uuid) -> AdGeniusResult<Tenant> {
        if let Some(tenant) = self.cache.get::<Tenant>(&id_key(id)).await {
            if tenant.is_active {
                metrics::counter!("tenancy.metadata_cache.hit").increment(1);
                return Ok(tenant);
            }
        }
        metrics::counter!("tenancy.metadata_cache.miss").increment(1);

        let tenant = self
            .control_plane
            .get(id)
            .filter(|t| t.is_active)
            .ok_or_else(|| AdGeniusError::TenantNotFound(id.to_string()))?;
        self.cache_tenant(&tenant).await;
        Ok(tenant)
    }

    pub async fn get_tenant_by_domain(&self, domain: &str) -> AdGeniusResult<Tenant> {
        let domain = domain.trim().to_ascii_lowercase();
        if let Some(tenant) = self.cache.get::<Tenant>(&domain_key(&domain)).await {
            if tenant.is_active {
                metrics::counter!("tenancy.metadata_cache.hit").increment(1);
                return Ok(tenant);
            }
        }
        metrics::counter!("tenancy.metadata_cache.miss").increment(1);

        let tenant = self
            .control_plane
            .get_by_domain(&domain)
            .filter(|t| t.is_active)
            .ok_or_else(|| AdGeniusError::TenantNotFound(domain.clone()))?;
        self.cache_tenant(&tenant).await;
        Ok(tenant)
    }

    /// Partial update. `store_name` is never touched.
    pub async fn update_tenant_settings(
        &self,
        id: Uuid,
        update: TenantSettingsUpdate,
    ) -> AdGeniusResult<Tenant> {
        let tenant = self
            .control_plane
            .update(id, |t| {
                update.apply(&mut t.settings);
                t.updated_at = Utc::now();
            })
            .ok_or_else(|| AdGeniusError::TenantNotFound(id.to_string()))?;
        self.invalidate(&tenant).await;
        info!(tenant_id = %id, "Tenant settings updated");
        Ok(tenant)
    }

    /// Soft deactivation. The document and its database are retained.
    pub async fn deactivate_tenant(&self, id: Uuid) -> AdGeniusResult<Tenant> {
        let tenant = self
            .control_plane
            .update(id, |t| {
                t.is_active = false;
                t.updated_at = Utc::now();
            })
            .ok_or_else(|| AdGeniusError::TenantNotFound(id.to_string()))?;
        self.invalidate(&tenant).await;
        info!(tenant_id = %id, "Tenant deactivated");
        Ok(tenant)
    }

    /// Hard removal of a tenant that never finished onboarding: the document,
    /// its isolated database and any cached metadata all go, which frees the
    /// name and domain for a retry.
    pub async fn discard_tenant(&self, id: Uuid) -> AdGeniusResult<Tenant> {
        let tenant = self
            .control_plane
            .get(id)
            .ok_or_else(|| AdGeniusError::TenantNotFound(id.to_string()))?;
        self.cluster.drop_database(&tenant.store_name);
        self.control_plane.delete(id);
        self.invalidate(&tenant).await;
        info!(tenant_id = %id, store_name = %tenant.store_name, "Tenant discarded");
        metrics::counter!("tenancy.tenants.discarded").increment(1);
        Ok(tenant)
    }

    pub fn list_tenants(&self, limit: usize, offset: usize) -> Vec<Tenant> {
        self.control_plane.list(limit, offset)
    }

    async fn cache_tenant(&self, tenant: &Tenant) {
        self.cache.set(&id_key(tenant.id), tenant).await;
        self.cache.set(&domain_key(&tenant.domain), tenant).await;
    }

    async fn invalidate(&self, tenant: &Tenant) {
        self.cache.delete(&id_key(tenant.id)).await;
        self.cache.delete(&domain_key(&tenant.domain)).await;
        debug!(tenant_id = %tenant.id, "Tenant metadata cache invalidated");
    }
}
