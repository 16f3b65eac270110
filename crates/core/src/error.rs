use crate::billing::ResourceType;
use thiserror::Error;
use uuid::Uuid;

pub type AdGeniusResult<T> = Result<T, AdGeniusError>;

#[derive(Error, Debug)]
pub enum AdGeniusError {
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Tenant provisioning failed: {0}")]
    ProvisioningError(String),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(Uuid),

    #[error("Usage limit exceeded for {resource}: {used} used + {requested} requested > limit {limit}")]
    UsageLimitExceeded {
        resource: ResourceType,
        limit: i64,
        used: i64,
        requested: i64,
    },

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Campaign not found: {0}")]
    CampaignNotFound(Uuid),

    #[error("Creative not found: {0}")]
    CreativeNotFound(Uuid),

    #[error("AI engine error: {source}")]
    AIEngineError {
        #[source]
        source: anyhow::Error,
    },

    #[error("Analytics aggregation error: {0}")]
    AggregationError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AdGeniusError {
    pub fn ai_engine(source: impl Into<anyhow::Error>) -> Self {
        Self::AIEngineError {
            source: source.into(),
        }
    }

    /// Expected outcomes the caller can act on, as opposed to infrastructure faults.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::TenantNotFound(_)
                | Self::SubscriptionNotFound(_)
                | Self::UsageLimitExceeded { .. }
                | Self::InvalidPlan(_)
                | Self::CampaignNotFound(_)
                | Self::CreativeNotFound(_)
                | Self::Conflict(_)
                | Self::Validation(_)
        )
    }

    /// Short machine-readable code used in API error bodies and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TenantNotFound(_) => "tenant_not_found",
            Self::ProvisioningError(_) => "provisioning_error",
            Self::SubscriptionNotFound(_) => "subscription_not_found",
            Self::UsageLimitExceeded { .. } => "usage_limit_exceeded",
            Self::InvalidPlan(_) => "invalid_plan",
            Self::CampaignNotFound(_) => "campaign_not_found",
            Self::CreativeNotFound(_) => "creative_not_found",
            Self::AIEngineError { .. } => "ai_engine_error",
            Self::AggregationError(_) => "aggregation_error",
            Self::StoreError(_) => "store_error",
            Self::Conflict(_) => "conflict",
            Self::Validation(_) => "validation_error",
            Self::Config(_) => "config_error",
            Self::Serialization(_) => "serialization_error",
            Self::Internal(_) => "internal_error",
        }
    }
}
