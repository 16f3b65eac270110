//! Tenant metadata held in the shared control-plane store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-tenant configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantSettings {
    pub features: Vec<String>,
    pub ai_models_enabled: Vec<String>,
    pub storage_quota_gb: u32,
    pub api_rate_limit: u32,
    pub white_label: bool,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            features: vec!["basic_analytics".into()],
            ai_models_enabled: vec!["text".into(), "image".into()],
            storage_quota_gb: 1,
            api_rate_limit: 100,
            white_label: false,
        }
    }
}

/// Partial settings update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantSettingsUpdate {
    pub features: Option<Vec<String>>,
    pub ai_models_enabled: Option<Vec<String>>,
    pub storage_quota_gb: Option<u32>,
    pub api_rate_limit: Option<u32>,
    pub white_label: Option<bool>,
}

impl TenantSettingsUpdate {
    pub fn apply(self, settings: &mut TenantSettings) {
        if let Some(features) = self.features {
            settings.features = features;
        }
        if let Some(models) = self.ai_models_enabled {
            settings.ai_models_enabled = models;
        }
        if let Some(quota) = self.storage_quota_gb {
            settings.storage_quota_gb = quota;
        }
        if let Some(limit) = self.api_rate_limit {
            settings.api_rate_limit = limit;
        }
        if let Some(white_label) = self.white_label {
            settings.white_label = white_label;
        }
    }
}

/// An isolated customer account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    /// Name of the tenant's isolated database. Never changes after provisioning.
    pub store_name: String,
    pub plan_id: String,
    pub is_active: bool,
    pub settings: TenantSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
