//! Campaign and creative reads and writes scoped to one tenant store.

use adgenius_analytics::formulas;
use adgenius_billing::UsageMeter;
use adgenius_core::billing::ResourceType;
use adgenius_core::campaign::{
    BrandAsset, Budget, Campaign, CampaignStatus, Creative, DailyMetricRecord, TargetAudience,
};
use adgenius_core::{AdGeniusError, AdGeniusResult};
use adgenius_tenancy::TenantContext;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCampaign {
    pub owner_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub budget: Budget,
    #[serde(default)]
    pub target_audience: TargetAudience,
    #[serde(default)]
    pub brand_assets: Vec<BrandAsset>,
}

/// Counters reported for one creative since the previous report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceUpdate {
    #[serde(default)]
    pub impressions: i64,
    #[serde(default)]
    pub clicks: i64,
    #[serde(default)]
    pub conversions: i64,
    #[serde(default)]
    pub spend: f64,
    #[serde(default)]
    pub revenue: f64,
    /// Day the counters belong to; today when absent.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

fn add_count(total: i64, delta: i64, field: &str) -> AdGeniusResult<i64> {
    total
        .checked_add(delta)
        .ok_or_else(|| AdGeniusError::Validation(format!("{field} total out of range")))
}

impl PerformanceUpdate {
    fn validate(&self) -> AdGeniusResult<()> {
        let counts_ok = self.impressions >= 0 && self.clicks >= 0 && self.conversions >= 0;
        let money_ok = self.spend >= 0.0 && self.revenue >= 0.0 && self.spend.is_finite() && self.revenue.is_finite();
        if counts_ok && money_ok {
            Ok(())
        } else {
            Err(AdGeniusError::Validation(
                "performance counters must be non-negative".into(),
            ))
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct CampaignService {
    meter: UsageMeter,
}

impl CampaignService {
    pub fn new(meter: UsageMeter) -> Self {
        Self { meter }
    }

    /// Admits against the plan's campaign limit, stores the draft and records usage.
    pub fn create_campaign(&self, ctx: &TenantContext, new: NewCampaign) -> AdGeniusResult<Campaign> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(AdGeniusError::Validation("campaign name is required".into()));
        }
        if new.budget.total_amount < 0.0 || new.budget.daily_amount < 0.0 {
            return Err(AdGeniusError::Validation("budget must be non-negative".into()));
        }

        let reservation = self.meter.reserve(ctx, &[(ResourceType::Campaign, 1)])?;
        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            name: name.to_string(),
            description: new.description,
            status: CampaignStatus::Draft,
            budget: new.budget,
            target_audience: new.target_audience,
            brand_assets: new.brand_assets,
            created_at: now,
            updated_at: now,
            launched_at: None,
        };

        if let Err(e) = ctx.store.insert_campaign(campaign.clone()) {
            if let Err(release_err) = self.meter.release(ctx, reservation) {
                warn!(tenant_id = %ctx.tenant_id(), error = %release_err, "Failed to release campaign reservation");
            }
            return Err(e);
        }
        self.meter.commit(ctx, reservation, Some(campaign.id))?;

        info!(tenant_id = %ctx.tenant_id(), campaign_id = %campaign.id, "Campaign created");
        Ok(campaign)
    }

    pub fn get_campaign(&self, ctx: &TenantContext, id: Uuid) -> AdGeniusResult<Campaign> {
        ctx.store
            .get_campaign(id)?
            .ok_or(AdGeniusError::CampaignNotFound(id))
    }

    pub fn list_campaigns(
        &self,
        ctx: &TenantContext,
        owner_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> AdGeniusResult<Vec<Campaign>> {
        ctx.store.list_campaigns(owner_id, limit, offset)
    }

    /// Moves the campaign along its lifecycle; illegal moves fail with `Conflict`.
    pub fn update_campaign_status(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        next: CampaignStatus,
    ) -> AdGeniusResult<Campaign> {
        let campaign = ctx.store.update_campaign(id, |campaign| {
            if !campaign.status.can_transition_to(next) {
                return Err(AdGeniusError::Conflict(format!(
                    "campaign cannot move from {:?} to {:?}",
                    campaign.status, next
                )));
            }
            campaign.status = next;
            if next == CampaignStatus::Active && campaign.launched_at.is_none() {
                campaign.launched_at = Some(Utc::now());
            }
            Ok(())
        })?;
        info!(
            tenant_id = %ctx.tenant_id(),
            campaign_id = %id,
            status = ?next,
            "Campaign status updated"
        );
        Ok(campaign)
    }

    pub fn get_creative(&self, ctx: &TenantContext, id: Uuid) -> AdGeniusResult<Creative> {
        ctx.store
            .get_creative(id)?
            .ok_or(AdGeniusError::CreativeNotFound(id))
    }

    pub fn list_creatives(
        &self,
        ctx: &TenantContext,
        campaign_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> AdGeniusResult<Vec<Creative>> {
        self.get_campaign(ctx, campaign_id)?;
        ctx.store.list_creatives(campaign_id, limit, offset)
    }

    /// Adds reported counters to the creative's snapshot and its campaign's daily bucket.
    pub fn update_creative_performance(
        &self,
        ctx: &TenantContext,
        creative_id: Uuid,
        update: PerformanceUpdate,
    ) -> AdGeniusResult<Creative> {
        update.validate()?;
        let creative = ctx.store.update_creative_performance(creative_id, |perf| {
            perf.impressions = add_count(perf.impressions, update.impressions, "impressions")?;
            perf.clicks = add_count(perf.clicks, update.clicks, "clicks")?;
            perf.conversions = add_count(perf.conversions, update.conversions, "conversions")?;
            perf.spend += update.spend;
            perf.revenue += update.revenue;
            if !perf.spend.is_finite() || !perf.revenue.is_finite() {
                return Err(AdGeniusError::Validation("performance totals out of range".into()));
            }
            perf.ctr = formulas::ctr(perf.clicks, perf.impressions);
            perf.conversion_rate = formulas::conversion_rate(perf.conversions, perf.clicks);
            perf.last_updated = Some(Utc::now());
            Ok(())
        })?;

        ctx.store.add_daily_metrics(DailyMetricRecord {
            campaign_id: creative.campaign_id,
            date: update.date.unwrap_or_else(|| Utc::now().date_naive()),
            impressions: update.impressions,
            clicks: update.clicks,
            conversions: update.conversions,
            spend: update.spend,
            revenue: update.revenue,
        })?;
        Ok(creative)
    }
}
