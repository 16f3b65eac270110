//! One tenant's isolated database.
//!
//! Every query a request issues goes through a handle on exactly one of these,
//! so nothing downstream can read or write another tenant's documents.

use crate::paginate;
use crate::schema::CollectionSpec;
use adgenius_core::billing::{BillingEvent, Invoice, Subscription, UsageRecord};
use adgenius_core::campaign::{
    Campaign, ContentData, Creative, CreativeStatus, DailyMetricRecord, PerformanceMetrics,
};
use adgenius_core::{AdGeniusError, AdGeniusResult};
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Terminal outcome applied to a `generating` creative.
#[derive(Debug, Clone)]
pub enum CreativeTransition {
    Completed(ContentData),
    Failed(String),
}

#[derive(Debug)]
pub struct TenantStore {
    name: String,
    collections: Vec<CollectionSpec>,
    closed: AtomicBool,

    campaigns: DashMap<Uuid, Campaign>,
    creatives: DashMap<Uuid, Creative>,
    daily_metrics: DashMap<(Uuid, NaiveDate), DailyMetricRecord>,
    usage: RwLock<Vec<UsageRecord>>,
    subscriptions: DashMap<Uuid, Subscription>,
    /// Id of the single active subscription, if any.
    active_subscription: RwLock<Option<Uuid>>,
    invoices: DashMap<Uuid, Invoice>,
    billing_events: RwLock<Vec<BillingEvent>>,
}

impl TenantStore {
    pub(crate) fn new(name: String, collections: Vec<CollectionSpec>) -> Self {
        Self {
            name,
            collections,
            closed: AtomicBool::new(false),
            campaigns: DashMap::new(),
            creatives: DashMap::new(),
            daily_metrics: DashMap::new(),
            usage: RwLock::new(Vec::new()),
            subscriptions: DashMap::new(),
            active_subscription: RwLock::new(None),
            invoices: DashMap::new(),
            billing_events: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collections(&self) -> &[CollectionSpec] {
        &self.collections
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn ensure_open(&self) -> AdGeniusResult<()> {
        if self.is_closed() {
            metrics::counter!("store.errors", "reason" => "closed").increment(1);
            return Err(AdGeniusError::StoreError(format!(
                "database {} is not available",
                self.name
            )));
        }
        Ok(())
    }

    // ─── Campaigns ─────────────────────────────────────────────────────────

    pub fn insert_campaign(&self, campaign: Campaign) -> AdGeniusResult<()> {
        self.ensure_open()?;
        self.campaigns.insert(campaign.id, campaign);
        Ok(())
    }

    pub fn get_campaign(&self, id: Uuid) -> AdGeniusResult<Option<Campaign>> {
        self.ensure_open()?;
        Ok(self.campaigns.get(&id).map(|r| r.value().clone()))
    }

    /// Owner's campaigns, newest first.
    pub fn list_campaigns(
        &self,
        owner_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> AdGeniusResult<Vec<Campaign>> {
        self.ensure_open()?;
        let mut campaigns: Vec<Campaign> = self
            .campaigns
            .iter()
            .filter(|r| r.value().owner_id == owner_id)
            .map(|r| r.value().clone())
            .collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(campaigns, limit, offset))
    }

    /// Runs `f` against the stored campaign under its entry lock.
    pub fn update_campaign<F>(&self, id: Uuid, f: F) -> AdGeniusResult<Campaign>
    where
        F: FnOnce(&mut Campaign) -> AdGeniusResult<()>,
    {
        self.ensure_open()?;
        let mut entry = self
            .campaigns
            .get_mut(&id)
            .ok_or(AdGeniusError::CampaignNotFound(id))?;
        f(entry.value_mut())?;
        entry.value_mut().updated_at = Utc::now();
        Ok(entry.value().clone())
    }

    // ─── Creatives ─────────────────────────────────────────────────────────

    pub fn insert_creative(&self, creative: Creative) -> AdGeniusResult<()> {
        self.ensure_open()?;
        self.creatives.insert(creative.id, creative);
        Ok(())
    }

    pub fn get_creative(&self, id: Uuid) -> AdGeniusResult<Option<Creative>> {
        self.ensure_open()?;
        Ok(self.creatives.get(&id).map(|r| r.value().clone()))
    }

    /// Campaign's creatives, newest first.
    pub fn list_creatives(
        &self,
        campaign_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> AdGeniusResult<Vec<Creative>> {
        let creatives = self.creatives_for_campaign(campaign_id)?;
        Ok(paginate(creatives, limit, offset))
    }

    pub fn creatives_for_campaign(&self, campaign_id: Uuid) -> AdGeniusResult<Vec<Creative>> {
        self.ensure_open()?;
        let mut creatives: Vec<Creative> = self
            .creatives
            .iter()
            .filter(|r| r.value().campaign_id == campaign_id)
            .map(|r| r.value().clone())
            .collect();
        creatives.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(creatives)
    }

    /// Moves a `generating` creative to a terminal state.
    ///
    /// Terminal states are never overwritten: a second transition fails with
    /// `Conflict` and leaves the document untouched.
    pub fn transition_creative(
        &self,
        id: Uuid,
        transition: CreativeTransition,
    ) -> AdGeniusResult<Creative> {
        self.ensure_open()?;
        let mut entry = self
            .creatives
            .get_mut(&id)
            .ok_or(AdGeniusError::CreativeNotFound(id))?;
        let creative = entry.value_mut();
        if creative.status.is_terminal() {
            return Err(AdGeniusError::Conflict(format!(
                "creative {id} is already {:?}",
                creative.status
            )));
        }
        match transition {
            CreativeTransition::Completed(content) => {
                creative.status = CreativeStatus::Completed;
                creative.content = Some(content);
            }
            CreativeTransition::Failed(reason) => {
                creative.status = CreativeStatus::Failed;
                creative.failure_reason = Some(reason);
            }
        }
        creative.updated_at = Utc::now();
        Ok(creative.clone())
    }

    pub fn set_creative_performance(
        &self,
        id: Uuid,
        performance: PerformanceMetrics,
    ) -> AdGeniusResult<Creative> {
        self.ensure_open()?;
        let mut entry = self
            .creatives
            .get_mut(&id)
            .ok_or(AdGeniusError::CreativeNotFound(id))?;
        entry.value_mut().performance = performance;
        entry.value_mut().updated_at = Utc::now();
        Ok(entry.value().clone())
    }

    /// Applies `f` to the stored performance snapshot under the entry lock.
    /// Applies `f` to a copy of the creative's counters and keeps it only when `f` succeeds.
    pub fn update_creative_performance<F>(&self, id: Uuid, f: F) -> AdGeniusResult<Creative>
    where
        F: FnOnce(&mut PerformanceMetrics) -> AdGeniusResult<()>,
    {
        self.ensure_open()?;
        let mut entry = self
            .creatives
            .get_mut(&id)
            .ok_or(AdGeniusError::CreativeNotFound(id))?;
        let mut performance = entry.value().performance.clone();
        f(&mut performance)?;
        entry.value_mut().performance = performance;
        entry.value_mut().updated_at = Utc::now();
        Ok(entry.value().clone())
    }

    /// Ids of creatives still `generating` that were created before `cutoff`.
    pub fn generating_before(&self, cutoff: DateTime<Utc>) -> AdGeniusResult<Vec<Uuid>> {
        self.ensure_open()?;
        Ok(self
            .creatives
            .iter()
            .filter(|r| r.value().status == CreativeStatus::Generating && r.value().created_at < cutoff)
            .map(|r| *r.key())
            .collect())
    }

    // ─── Daily metrics ─────────────────────────────────────────────────────

    /// Adds the record's counters into the campaign's bucket for that date.
    /// Counts saturate at `i64::MAX`.
    pub fn add_daily_metrics(&self, record: DailyMetricRecord) -> AdGeniusResult<()> {
        self.ensure_open()?;
        self.daily_metrics
            .entry((record.campaign_id, record.date))
            .and_modify(|bucket| {
                bucket.impressions = bucket.impressions.saturating_add(record.impressions);
                bucket.clicks = bucket.clicks.saturating_add(record.clicks);
                bucket.conversions = bucket.conversions.saturating_add(record.conversions);
                bucket.spend += record.spend;
                bucket.revenue += record.revenue;
            })
            .or_insert(record);
        Ok(())
    }

    /// Buckets within `[start, end]` ordered by date.
    pub fn daily_metrics(
        &self,
        campaign_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AdGeniusResult<Vec<DailyMetricRecord>> {
        self.ensure_open()?;
        let mut buckets: Vec<DailyMetricRecord> = self
            .daily_metrics
            .iter()
            .filter(|r| r.key().0 == campaign_id && r.key().1 >= start && r.key().1 <= end)
            .map(|r| r.value().clone())
            .collect();
        buckets.sort_by_key(|b| b.date);
        Ok(buckets)
    }

    // ─── Usage log ─────────────────────────────────────────────────────────

    /// Records with `start <= timestamp < end`.
    pub fn usage_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AdGeniusResult<Vec<UsageRecord>> {
        self.ensure_open()?;
        Ok(self
            .usage
            .read()
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp < end)
            .cloned()
            .collect())
    }

    // ─── Subscriptions ─────────────────────────────────────────────────────

    /// Fails with `Conflict` when inserting an active subscription while another is active.
    pub fn insert_subscription(&self, subscription: Subscription) -> AdGeniusResult<()> {
        self.ensure_open()?;
        let mut active = self.active_subscription.write();
        if subscription.is_active() {
            if let Some(existing) = *active {
                return Err(AdGeniusError::Conflict(format!(
                    "subscription {existing} is already active"
                )));
            }
            *active = Some(subscription.id);
        }
        self.subscriptions.insert(subscription.id, subscription);
        Ok(())
    }

    pub fn get_subscription(&self, id: Uuid) -> AdGeniusResult<Option<Subscription>> {
        self.ensure_open()?;
        Ok(self.subscriptions.get(&id).map(|r| r.value().clone()))
    }

    pub fn active_subscription(&self) -> AdGeniusResult<Option<Subscription>> {
        self.ensure_open()?;
        let active = self.active_subscription.read();
        Ok(active.and_then(|id| self.subscriptions.get(&id).map(|r| r.value().clone())))
    }

    /// Single atomic update of the active subscription document.
    ///
    /// `f` runs while the document's entry lock is held, so concurrent callers
    /// are serialized and never observe each other's partial writes. Returns
    /// `None` when the tenant has no active subscription.
    pub fn update_active_subscription<F, R>(&self, f: F) -> AdGeniusResult<Option<R>>
    where
        F: FnOnce(&mut Subscription) -> R,
    {
        self.ensure_open()?;
        let active = self.active_subscription.read();
        let Some(id) = *active else {
            return Ok(None);
        };
        let Some(mut entry) = self.subscriptions.get_mut(&id) else {
            return Ok(None);
        };
        let result = f(entry.value_mut());
        entry.value_mut().updated_at = Utc::now();
        Ok(Some(result))
    }

    /// Like [`Self::update_active_subscription`], but `f` also returns usage records that
    /// are appended before the subscription entry is released. Counters and the usage
    /// log change together or not at all.
    pub fn update_active_subscription_logged<F, R>(&self, f: F) -> AdGeniusResult<Option<R>>
    where
        F: FnOnce(&mut Subscription) -> (R, Vec<UsageRecord>),
    {
        self.ensure_open()?;
        let active = self.active_subscription.read();
        let Some(id) = *active else {
            return Ok(None);
        };
        let Some(mut entry) = self.subscriptions.get_mut(&id) else {
            return Ok(None);
        };
        let (result, records) = f(entry.value_mut());
        entry.value_mut().updated_at = Utc::now();
        self.usage.write().extend(records);
        Ok(Some(result))
    }

    /// By-id counterpart of [`Self::update_active_subscription_logged`].
    pub fn update_subscription_logged<F, R>(&self, id: Uuid, f: F) -> AdGeniusResult<Option<R>>
    where
        F: FnOnce(&mut Subscription) -> (R, Vec<UsageRecord>),
    {
        self.ensure_open()?;
        let mut active = self.active_subscription.write();
        let Some(mut entry) = self.subscriptions.get_mut(&id) else {
            return Ok(None);
        };
        let (result, records) = f(entry.value_mut());
        entry.value_mut().updated_at = Utc::now();
        if *active == Some(id) && !entry.value().is_active() {
            *active = None;
        }
        self.usage.write().extend(records);
        Ok(Some(result))
    }

    /// Updates any subscription by id. Clears the active pointer if `f` deactivates it.
    pub fn update_subscription<F, R>(&self, id: Uuid, f: F) -> AdGeniusResult<Option<R>>
    where
        F: FnOnce(&mut Subscription) -> R,
    {
        self.ensure_open()?;
        let mut active = self.active_subscription.write();
        let Some(mut entry) = self.subscriptions.get_mut(&id) else {
            return Ok(None);
        };
        let result = f(entry.value_mut());
        entry.value_mut().updated_at = Utc::now();
        if *active == Some(id) && !entry.value().is_active() {
            *active = None;
        }
        Ok(Some(result))
    }

    // ─── Invoices & billing events ─────────────────────────────────────────

    pub fn insert_invoice(&self, invoice: Invoice) -> AdGeniusResult<()> {
        self.ensure_open()?;
        self.invoices.insert(invoice.id, invoice);
        Ok(())
    }

    /// Newest first.
    pub fn list_invoices(&self, limit: usize, offset: usize) -> AdGeniusResult<Vec<Invoice>> {
        self.ensure_open()?;
        let mut invoices: Vec<Invoice> = self.invoices.iter().map(|r| r.value().clone()).collect();
        invoices.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(paginate(invoices, limit, offset))
    }

    pub fn append_billing_event(&self, event: BillingEvent) -> AdGeniusResult<()> {
        self.ensure_open()?;
        self.billing_events.write().push(event);
        Ok(())
    }

    pub fn billing_events(&self) -> AdGeniusResult<Vec<BillingEvent>> {
        self.ensure_open()?;
        Ok(self.billing_events.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tenant_collections;
    use adgenius_core::billing::ResourceType;
    use adgenius_core::campaign::{CreativeContent, CreativeType};

    fn store() -> TenantStore {
        TenantStore::new("tenant_test_db".into(), tenant_collections())
    }

    fn generating_creative() -> Creative {
        let now = Utc::now();
        Creative {
            id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            kind: CreativeType::Text,
            source_prompt: "spring sale".into(),
            status: CreativeStatus::Generating,
            content: None,
            failure_reason: None,
            performance: PerformanceMetrics::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_terminal_creative_is_never_overwritten() {
        let store = store();
        let creative = generating_creative();
        let id = creative.id;
        store.insert_creative(creative).unwrap();

        let done = store
            .transition_creative(
                id,
                CreativeTransition::Completed(ContentData {
                    content: CreativeContent::Text {
                        text: "Save 20%".into(),
                        headline: None,
                    },
                    model_used: "sim".into(),
                    generated_at: Utc::now(),
                }),
            )
            .unwrap();
        assert_eq!(done.status, CreativeStatus::Completed);

        let err = store
            .transition_creative(id, CreativeTransition::Failed("late".into()))
            .unwrap_err();
        assert!(matches!(err, AdGeniusError::Conflict(_)));
        let stored = store.get_creative(id).unwrap().unwrap();
        assert_eq!(stored.status, CreativeStatus::Completed);
        assert!(stored.failure_reason.is_none());
    }

    #[test]
    fn test_daily_metrics_upsert_adds() {
        let store = store();
        let campaign_id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        for _ in 0..2 {
            store
                .add_daily_metrics(DailyMetricRecord {
                    campaign_id,
                    date,
                    impressions: 100,
                    clicks: 3,
                    conversions: 1,
                    spend: 2.5,
                    revenue: 10.0,
                })
                .unwrap();
        }
        let buckets = store.daily_metrics(campaign_id, date, date).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].impressions, 200);
        assert!((buckets[0].revenue - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_closed_store_rejects_operations() {
        let store = store();
        store.close();
        let err = store.get_campaign(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AdGeniusError::StoreError(_)));
        assert!(store.usage_between(Utc::now(), Utc::now()).is_err());
    }

    fn subscription() -> Subscription {
        use adgenius_core::billing::{
            BillingInformation, BillingInterval, OverageRates, Plan, PlanLimits, SubscriptionStatus,
            UsageMetrics,
        };
        let now = Utc::now();
        let end = BillingInterval::Monthly.period_end(now);
        Subscription {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            plan_id: "starter".into(),
            status: SubscriptionStatus::Active,
            current_period_start: now,
            current_period_end: end,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
            plan: Plan {
                id: "starter".into(),
                name: "Starter".into(),
                description: String::new(),
                price: 29.0,
                currency: "USD".into(),
                interval: BillingInterval::Monthly,
                limits: PlanLimits {
                    campaigns: 5,
                    creatives_per_month: 50,
                    ai_generations_per_month: 100,
                    storage_mb: 1024,
                    api_calls_per_month: 10_000,
                    users: 2,
                    advanced_analytics: false,
                    priority_support: false,
                    white_label: false,
                },
                overage_rates: OverageRates::default(),
                features: Vec::new(),
            },
            usage: UsageMetrics::new(now, end),
            billing_info: BillingInformation::with_days_until_due(30),
        }
    }

    fn usage(tenant_id: Uuid, quantity: i64) -> UsageRecord {
        UsageRecord {
            id: Uuid::new_v4(),
            tenant_id,
            resource_type: ResourceType::Creative,
            quantity,
            resource_ref: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_logged_update_moves_counters_and_log_together() {
        let store = store();
        let sub = subscription();
        let (id, tenant_id) = (sub.id, sub.tenant_id);
        store.insert_subscription(sub).unwrap();

        store
            .update_active_subscription_logged(|sub| {
                sub.usage.used.add(ResourceType::Creative, 2);
                ((), vec![usage(tenant_id, 2)])
            })
            .unwrap()
            .unwrap();
        store
            .update_subscription_logged(id, |sub| {
                sub.usage.used.add(ResourceType::Creative, 1);
                ((), vec![usage(tenant_id, 1)])
            })
            .unwrap()
            .unwrap();

        let used = store.get_subscription(id).unwrap().unwrap().usage.used.get(ResourceType::Creative);
        let logged: i64 = store.usage.read().iter().map(|r| r.quantity).sum();
        assert_eq!(used, 3);
        assert_eq!(logged, used);
    }

    #[test]
    fn test_logged_update_on_closed_store_changes_nothing() {
        let store = store();
        let sub = subscription();
        let (id, tenant_id) = (sub.id, sub.tenant_id);
        store.insert_subscription(sub).unwrap();
        store.close();

        let err = store
            .update_active_subscription_logged(|sub| {
                sub.usage.used.add(ResourceType::Creative, 1);
                ((), vec![usage(tenant_id, 1)])
            })
            .unwrap_err();
        assert!(matches!(err, AdGeniusError::StoreError(_)));
        assert!(store.usage.read().is_empty());
        let counters = store.subscriptions.get(&id).unwrap().usage.used;
        assert_eq!(counters.get(ResourceType::Creative), 0);
    }

    #[test]
    fn test_failed_performance_update_keeps_previous_counters() {
        let store = store();
        let creative = generating_creative();
        let id = creative.id;
        store.insert_creative(creative).unwrap();
        store
            .update_creative_performance(id, |perf| {
                perf.impressions = 10;
                Ok(())
            })
            .unwrap();

        let err = store
            .update_creative_performance(id, |perf| {
                perf.impressions = 99;
                Err(AdGeniusError::Validation("overflow".into()))
            })
            .unwrap_err();
        assert!(matches!(err, AdGeniusError::Validation(_)));
        assert_eq!(store.get_creative(id).unwrap().unwrap().performance.impressions, 10);
    }

    #[test]
    fn test_daily_metrics_saturate() {
        let store = store();
        let campaign_id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        for _ in 0..2 {
            store
                .add_daily_metrics(DailyMetricRecord {
                    campaign_id,
                    date,
                    impressions: i64::MAX,
                    clicks: 1,
                    conversions: 0,
                    spend: 0.0,
                    revenue: 0.0,
                })
                .unwrap();
        }
        let buckets = store.daily_metrics(campaign_id, date, date).unwrap();
        assert_eq!(buckets[0].impressions, i64::MAX);
        assert_eq!(buckets[0].clicks, 2);
    }

    #[test]
    fn test_update_active_without_subscription_is_none() {
        let store = store();
        assert!(store.update_active_subscription(|_| ()).unwrap().is_none());
    }
}
