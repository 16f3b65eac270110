//! Shared control-plane database holding tenant metadata.

use crate::paginate;
use adgenius_core::tenant::Tenant;
use adgenius_core::{AdGeniusError, AdGeniusResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// Tenant documents keyed by id, with a unique index on routing domain.
pub struct ControlPlaneStore {
    name: String,
    tenants: DashMap<Uuid, Tenant>,
    domains: DashMap<String, Uuid>,
}

impl ControlPlaneStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tenants: DashMap::new(),
            domains: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fails with `Conflict` if the domain is already registered.
    pub fn insert_tenant(&self, tenant: Tenant) -> AdGeniusResult<()> {
        match self.domains.entry(tenant.domain.clone()) {
            Entry::Occupied(_) => Err(AdGeniusError::Conflict(format!(
                "domain {} is already registered",
                tenant.domain
            ))),
            Entry::Vacant(slot) => {
                slot.insert(tenant.id);
                self.tenants.insert(tenant.id, tenant);
                Ok(())
            }
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Tenant> {
        self.tenants.get(&id).map(|r| r.value().clone())
    }

    pub fn get_by_domain(&self, domain: &str) -> Option<Tenant> {
        let id = *self.domains.get(domain)?;
        self.get(id)
    }

    /// Applies `f` in place and returns the updated document.
    pub fn update<F>(&self, id: Uuid, f: F) -> Option<Tenant>
    where
        F: FnOnce(&mut Tenant),
    {
        self.tenants.get_mut(&id).map(|mut entry| {
            f(entry.value_mut());
            entry.value().clone()
        })
    }

    /// Hard delete. Only used to roll back a failed provisioning or onboarding.
    pub fn delete(&self, id: Uuid) -> bool {
        match self.tenants.remove(&id) {
            Some((_, tenant)) => {
                self.domains.remove(&tenant.domain);
                true
            }
            None => false,
        }
    }

    /// Newest first.
    pub fn list(&self, limit: usize, offset: usize) -> Vec<Tenant> {
        let mut tenants: Vec<Tenant> = self.tenants.iter().map(|r| r.value().clone()).collect();
        tenants.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        paginate(tenants, limit, offset)
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adgenius_core::tenant::TenantSettings;
    use chrono::Utc;

    fn tenant(domain: &str) -> Tenant {
        let now = Utc::now();
        Tenant {
            id: Uuid::new_v4(),
            name: domain.to_string(),
            domain: domain.to_string(),
            store_name: format!("tenant_{}_db", domain.replace('.', "")),
            plan_id: "starter".into(),
            is_active: true,
            settings: TenantSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_domain_is_unique() {
        let store = ControlPlaneStore::new("cp");
        store.insert_tenant(tenant("acme.io")).unwrap();
        let err = store.insert_tenant(tenant("acme.io")).unwrap_err();
        assert!(matches!(err, AdGeniusError::Conflict(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_frees_domain() {
        let store = ControlPlaneStore::new("cp");
        let t = tenant("acme.io");
        let id = t.id;
        store.insert_tenant(t).unwrap();
        assert!(store.delete(id));
        assert!(store.get_by_domain("acme.io").is_none());
        store.insert_tenant(tenant("acme.io")).unwrap();
    }
}
