//! Subscription, plan, usage and invoice documents persisted in each tenant store.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Plan limit value meaning "no ceiling".
pub const UNLIMITED: i64 = -1;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A metered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Campaign,
    Creative,
    AiGeneration,
    ApiCall,
    User,
    StorageMb,
}

impl ResourceType {
    pub const ALL: [ResourceType; 6] = [
        ResourceType::Campaign,
        ResourceType::Creative,
        ResourceType::AiGeneration,
        ResourceType::ApiCall,
        ResourceType::User,
        ResourceType::StorageMb,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Campaign => "campaign",
            Self::Creative => "creative",
            Self::AiGeneration => "ai_generation",
            Self::ApiCall => "api_call",
            Self::User => "user",
            Self::StorageMb => "storage_mb",
        }
    }

    /// Human-readable label used on invoice line items.
    pub fn overage_label(self) -> &'static str {
        match self {
            Self::Campaign => "Additional Campaigns",
            Self::Creative => "Additional Creatives",
            Self::AiGeneration => "Additional AI Generations",
            Self::ApiCall => "Additional API Calls",
            Self::User => "Additional Seats",
            Self::StorageMb => "Additional Storage (MB)",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown resource type: {s}"))
    }
}

/// One counter per metered resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    pub campaigns: i64,
    pub creatives: i64,
    pub ai_generations: i64,
    pub api_calls: i64,
    pub users: i64,
    pub storage_mb: i64,
}

impl UsageCounters {
    pub fn get(&self, resource: ResourceType) -> i64 {
        match resource {
            ResourceType::Campaign => self.campaigns,
            ResourceType::Creative => self.creatives,
            ResourceType::AiGeneration => self.ai_generations,
            ResourceType::ApiCall => self.api_calls,
            ResourceType::User => self.users,
            ResourceType::StorageMb => self.storage_mb,
        }
    }

    fn slot(&mut self, resource: ResourceType) -> &mut i64 {
        match resource {
            ResourceType::Campaign => &mut self.campaigns,
            ResourceType::Creative => &mut self.creatives,
            ResourceType::AiGeneration => &mut self.ai_generations,
            ResourceType::ApiCall => &mut self.api_calls,
            ResourceType::User => &mut self.users,
            ResourceType::StorageMb => &mut self.storage_mb,
        }
    }

    /// Add, saturating at `i64::MAX`.
    pub fn add(&mut self, resource: ResourceType, quantity: i64) {
        let slot = self.slot(resource);
        *slot = slot.saturating_add(quantity);
    }

    /// Subtract, flooring at zero.
    pub fn sub(&mut self, resource: ResourceType, quantity: i64) {
        let slot = self.slot(resource);
        *slot = slot.saturating_sub(quantity).max(0);
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

impl BillingInterval {
    pub fn period_end(self, start: DateTime<Utc>) -> DateTime<Utc> {
        let months = match self {
            Self::Monthly => Months::new(1),
            Self::Yearly => Months::new(12),
        };
        start
            .checked_add_months(months)
            .unwrap_or(start + Duration::days(30))
    }
}

/// Usage ceilings for one plan tier. Negative values are unlimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanLimits {
    pub campaigns: i64,
    pub creatives_per_month: i64,
    pub ai_generations_per_month: i64,
    pub storage_mb: i64,
    pub api_calls_per_month: i64,
    pub users: i64,
    pub advanced_analytics: bool,
    pub priority_support: bool,
    pub white_label: bool,
}

impl PlanLimits {
    pub fn limit_for(&self, resource: ResourceType) -> i64 {
        match resource {
            ResourceType::Campaign => self.campaigns,
            ResourceType::Creative => self.creatives_per_month,
            ResourceType::AiGeneration => self.ai_generations_per_month,
            ResourceType::ApiCall => self.api_calls_per_month,
            ResourceType::User => self.users,
            ResourceType::StorageMb => self.storage_mb,
        }
    }

    pub fn is_unlimited(&self, resource: ResourceType) -> bool {
        self.limit_for(resource) < 0
    }
}

/// Per-unit price charged for usage above a limit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverageRates {
    pub campaign: f64,
    pub creative: f64,
    pub ai_generation: f64,
    pub api_call: f64,
    pub user: f64,
    pub storage_mb: f64,
}

impl OverageRates {
    pub fn rate_for(&self, resource: ResourceType) -> f64 {
        match resource {
            ResourceType::Campaign => self.campaign,
            ResourceType::Creative => self.creative,
            ResourceType::AiGeneration => self.ai_generation,
            ResourceType::ApiCall => self.api_call,
            ResourceType::User => self.user,
            ResourceType::StorageMb => self.storage_mb,
        }
    }
}

/// A subscription plan. Snapshotted into each subscription at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub interval: BillingInterval,
    pub limits: PlanLimits,
    pub overage_rates: OverageRates,
    pub features: Vec<String>,
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Cancelled,
}

/// Consumption within the current billing period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageMetrics {
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub used: UsageCounters,
    /// Capacity held by in-flight operations that have not yet committed.
    pub reserved: UsageCounters,
    pub last_updated: DateTime<Utc>,
}

impl UsageMetrics {
    pub fn new(period_start: DateTime<Utc>, period_end: DateTime<Utc>) -> Self {
        Self {
            current_period_start: period_start,
            current_period_end: period_end,
            used: UsageCounters::default(),
            reserved: UsageCounters::default(),
            last_updated: period_start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionMethod {
    ChargeAutomatically,
    SendInvoice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceSettings {
    pub auto_advance_enabled: bool,
    pub collection_method: CollectionMethod,
    /// Grace period between issue date and due date.
    pub days_until_due: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingAddress {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingInformation {
    pub customer_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub billing_email: Option<String>,
    pub tax_id: Option<String>,
    #[serde(default)]
    pub address: BillingAddress,
    pub invoice_settings: InvoiceSettings,
}

impl BillingInformation {
    pub fn with_days_until_due(days_until_due: u32) -> Self {
        Self {
            customer_id: None,
            payment_method_id: None,
            billing_email: None,
            tax_id: None,
            address: BillingAddress::default(),
            invoice_settings: InvoiceSettings {
                auto_advance_enabled: true,
                collection_method: CollectionMethod::SendInvoice,
                days_until_due,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub plan_id: String,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub plan: Plan,
    pub usage: UsageMetrics,
    pub billing_info: BillingInformation,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }
}

// ---------------------------------------------------------------------------
// Usage log
// ---------------------------------------------------------------------------

/// Append-only usage log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub resource_type: ResourceType,
    pub quantity: i64,
    pub resource_ref: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Invoices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Open,
    Paid,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    Subscription,
    Overage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub description: String,
    pub resource: Option<ResourceType>,
    pub quantity: i64,
    pub unit_price: f64,
    pub amount: f64,
    pub kind: LineItemKind,
}

/// Immutable once issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub subscription_id: Uuid,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    /// Plan price for the period, excluding overage and tax.
    pub subtotal: f64,
    /// The plan line followed by one overage line per exceeded resource.
    pub line_items: Vec<InvoiceLineItem>,
    pub overage_total: f64,
    pub tax_rate: f64,
    pub tax: f64,
    pub total: f64,
    pub amount_paid: f64,
    pub amount_due: f64,
    pub currency: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

impl Invoice {
    pub fn overage_items(&self) -> impl Iterator<Item = &InvoiceLineItem> {
        self.line_items
            .iter()
            .filter(|li| li.kind == LineItemKind::Overage)
    }
}

/// Audit trail of billing lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingEvent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub event_type: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
