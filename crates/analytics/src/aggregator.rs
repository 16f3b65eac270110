//! On-demand campaign analytics with a short-TTL result cache.
//!
//! Cached results are never invalidated when creative performance changes;
//! readers may see figures up to one cache TTL old.

use crate::formulas::{self, CampaignMetrics, PerformanceTier};
use crate::recommendations::{recommend, Recommendation};
use crate::trends::{build_trends, TrendAnalysis};
use adgenius_cache::JsonCache;
use adgenius_core::campaign::{Creative, CreativeStatus, CreativeType};
use adgenius_core::config::AnalyticsConfig;
use adgenius_core::{AdGeniusError, AdGeniusResult};
use adgenius_tenancy::TenantContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Inclusive time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AdGeniusResult<Self> {
        if end < start {
            return Err(AdGeniusError::Validation(format!(
                "range end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeStats {
    pub creative_id: Uuid,
    pub campaign_id: Uuid,
    pub kind: CreativeType,
    pub status: CreativeStatus,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend: f64,
    pub ctr: f64,
    pub conversion_rate: f64,
    pub tier: PerformanceTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignAnalytics {
    pub campaign_id: Uuid,
    pub campaign_name: String,
    pub range: DateRange,
    pub metrics: CampaignMetrics,
    pub creatives: Vec<CreativeStats>,
    pub trends: TrendAnalysis,
    pub recommendations: Vec<Recommendation>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedCampaign {
    pub campaign_id: Uuid,
    pub error: String,
}

/// Batch result: every campaign either produced analytics or was skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiCampaignAnalytics {
    pub campaigns: Vec<CampaignAnalytics>,
    pub skipped: Vec<SkippedCampaign>,
}

pub struct AnalyticsAggregator {
    cache: JsonCache,
    config: AnalyticsConfig,
}

impl AnalyticsAggregator {
    pub fn new(cache: JsonCache, config: AnalyticsConfig) -> Self {
        Self { cache, config }
    }

    fn cache_key(tenant_id: Uuid, campaign_id: Uuid, range: &DateRange) -> String {
        format!(
            "analytics:{tenant_id}:{campaign_id}:{}:{}",
            range.start.timestamp(),
            range.end.timestamp()
        )
    }

    fn creative_stats(&self, creative: &Creative) -> CreativeStats {
        let perf = &creative.performance;
        let ctr = formulas::ctr(perf.clicks, perf.impressions);
        CreativeStats {
            creative_id: creative.id,
            campaign_id: creative.campaign_id,
            kind: creative.kind,
            status: creative.status,
            impressions: perf.impressions,
            clicks: perf.clicks,
            conversions: perf.conversions,
            spend: perf.spend,
            ctr,
            conversion_rate: formulas::conversion_rate(perf.conversions, perf.clicks),
            tier: PerformanceTier::classify(
                ctr,
                self.config.high_ctr_threshold,
                self.config.medium_ctr_threshold,
            ),
        }
    }

    pub async fn get_campaign_analytics(
        &self,
        ctx: &TenantContext,
        campaign_id: Uuid,
        range: DateRange,
    ) -> AdGeniusResult<CampaignAnalytics> {
        let key = Self::cache_key(ctx.tenant_id(), campaign_id, &range);
        if let Some(cached) = self.cache.get::<CampaignAnalytics>(&key).await {
            metrics::counter!("analytics.cache.hit").increment(1);
            return Ok(cached);
        }
        metrics::counter!("analytics.cache.miss").increment(1);
        let started = Instant::now();

        let campaign = ctx
            .store
            .get_campaign(campaign_id)?
            .ok_or(AdGeniusError::CampaignNotFound(campaign_id))?;

        let creatives: Vec<Creative> = ctx
            .store
            .creatives_for_campaign(campaign_id)?
            .into_iter()
            .filter(|c| range.contains(c.created_at))
            .collect();

        let (mut impressions, mut clicks, mut conversions) = (0i64, 0i64, 0i64);
        let (mut spend, mut revenue) = (0.0f64, 0.0f64);
        for c in &creatives {
            impressions = impressions.saturating_add(c.performance.impressions);
            clicks = clicks.saturating_add(c.performance.clicks);
            conversions = conversions.saturating_add(c.performance.conversions);
            spend += c.performance.spend;
            revenue += c.performance.revenue;
        }
        let totals = CampaignMetrics::from_totals(impressions, clicks, conversions, spend, revenue);
        if !totals.is_finite() {
            return Err(AdGeniusError::AggregationError(format!(
                "campaign {campaign_id} produced non-finite metrics"
            )));
        }

        let daily = ctx.store.daily_metrics(
            campaign_id,
            range.start.date_naive(),
            range.end.date_naive(),
        )?;

        let analytics = CampaignAnalytics {
            campaign_id,
            campaign_name: campaign.name,
            range,
            creatives: creatives.iter().map(|c| self.creative_stats(c)).collect(),
            trends: build_trends(&daily),
            recommendations: recommend(&totals, &self.config),
            metrics: totals,
            generated_at: Utc::now(),
        };

        self.cache.set(&key, &analytics).await;
        metrics::histogram!("analytics.aggregation.latency_ms")
            .record(started.elapsed().as_secs_f64() * 1000.0);
        debug!(
            tenant_id = %ctx.tenant_id(),
            campaign_id = %campaign_id,
            creatives = analytics.creatives.len(),
            "Campaign analytics computed"
        );
        Ok(analytics)
    }

    /// A campaign that fails to aggregate is skipped, not fatal.
    pub async fn get_multi_campaign_analytics(
        &self,
        ctx: &TenantContext,
        campaign_ids: &[Uuid],
        range: DateRange,
    ) -> MultiCampaignAnalytics {
        let mut campaigns = Vec::with_capacity(campaign_ids.len());
        let mut skipped = Vec::new();
        for &campaign_id in campaign_ids {
            match self.get_campaign_analytics(ctx, campaign_id, range).await {
                Ok(analytics) => campaigns.push(analytics),
                Err(e) => {
                    warn!(
                        tenant_id = %ctx.tenant_id(),
                        campaign_id = %campaign_id,
                        error = %e,
                        "Skipping campaign in batch analytics"
                    );
                    metrics::counter!("analytics.batch.skipped").increment(1);
                    skipped.push(SkippedCampaign {
                        campaign_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        MultiCampaignAnalytics { campaigns, skipped }
    }

    /// Creatives across the owner's campaigns, highest CTR first.
    pub fn get_top_performing_creatives(
        &self,
        ctx: &TenantContext,
        owner_id: Uuid,
        limit: Option<usize>,
    ) -> AdGeniusResult<Vec<CreativeStats>> {
        let limit = limit.unwrap_or(self.config.default_top_creatives);
        let mut stats = Vec::new();
        for campaign in ctx.store.list_campaigns(owner_id, usize::MAX, 0)? {
            for creative in ctx.store.creatives_for_campaign(campaign.id)? {
                if creative.performance.impressions > 0 {
                    stats.push(self.creative_stats(&creative));
                }
            }
        }
        stats.sort_by(|a, b| {
            b.ctr
                .total_cmp(&a.ctr)
                .then_with(|| b.impressions.cmp(&a.impressions))
        });
        stats.truncate(limit);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adgenius_cache::LocalCache;
    use adgenius_core::campaign::{
        Budget, Campaign, CampaignStatus, DailyMetricRecord, PerformanceMetrics, TargetAudience,
    };
    use adgenius_store::StoreCluster;
    use adgenius_tenancy::{TenantRegistry, TenantStoreRouter};
    use chrono::{Duration, NaiveDate};
    use std::sync::Arc;

    async fn tenant() -> (TenantContext, Arc<StoreCluster>) {
        let cluster = Arc::new(StoreCluster::new("cp"));
        let cache = JsonCache::new(Arc::new(LocalCache::new(900, 64)), std::time::Duration::from_secs(900));
        let registry = Arc::new(TenantRegistry::new(cluster.clone(), cache));
        let router = TenantStoreRouter::new(registry, cluster.clone(), 16);
        let tenant = router.registry().create_tenant("Acme", "acme.io", "starter").unwrap();
        (router.resolve(tenant.id).await.unwrap(), cluster)
    }

    fn aggregator() -> AnalyticsAggregator {
        AnalyticsAggregator::new(
            JsonCache::new(Arc::new(LocalCache::new(3600, 64)), std::time::Duration::from_secs(3600)),
            AnalyticsConfig::default(),
        )
    }

    fn campaign(ctx: &TenantContext, owner_id: Uuid) -> Uuid {
        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            owner_id,
            name: "Spring Launch".into(),
            description: String::new(),
            status: CampaignStatus::Active,
            budget: Budget::default(),
            target_audience: TargetAudience::default(),
            brand_assets: Vec::new(),
            created_at: now,
            updated_at: now,
            launched_at: Some(now),
        };
        let id = campaign.id;
        ctx.store.insert_campaign(campaign).unwrap();
        id
    }

    fn creative(ctx: &TenantContext, campaign_id: Uuid, impressions: i64, clicks: i64) -> Uuid {
        let now = Utc::now();
        let creative = Creative {
            id: Uuid::new_v4(),
            campaign_id,
            kind: CreativeType::Image,
            source_prompt: "hero shot".into(),
            status: CreativeStatus::Completed,
            content: None,
            failure_reason: None,
            performance: PerformanceMetrics {
                impressions,
                clicks,
                ctr: formulas::ctr(clicks, impressions),
                ..Default::default()
            },
            created_at: now,
            updated_at: now,
        };
        let id = creative.id;
        ctx.store.insert_creative(creative).unwrap();
        id
    }

    fn last_day() -> DateRange {
        DateRange::new(Utc::now() - Duration::days(1), Utc::now() + Duration::minutes(5)).unwrap()
    }

    #[tokio::test]
    async fn test_two_creatives_low_ctr() {
        let (ctx, _) = tenant().await;
        let campaign_id = campaign(&ctx, Uuid::new_v4());
        creative(&ctx, campaign_id, 1000, 10);
        creative(&ctx, campaign_id, 2000, 15);

        let analytics = aggregator()
            .get_campaign_analytics(&ctx, campaign_id, last_day())
            .await
            .unwrap();
        assert_eq!(analytics.metrics.impressions, 3000);
        assert_eq!(analytics.metrics.clicks, 25);
        assert!((analytics.metrics.ctr - 0.8333).abs() < 1e-3);
        assert_eq!(analytics.recommendations[0].title, "Improve Creative Performance");
        assert!(analytics
            .creatives
            .iter()
            .all(|c| c.tier == PerformanceTier::Low));
    }

    #[tokio::test]
    async fn test_creatives_outside_range_are_excluded() {
        let (ctx, _) = tenant().await;
        let campaign_id = campaign(&ctx, Uuid::new_v4());
        creative(&ctx, campaign_id, 1000, 30);

        let past = DateRange::new(Utc::now() - Duration::days(30), Utc::now() - Duration::days(20)).unwrap();
        let analytics = aggregator()
            .get_campaign_analytics(&ctx, campaign_id, past)
            .await
            .unwrap();
        assert!(analytics.creatives.is_empty());
        assert_eq!(analytics.metrics, CampaignMetrics::default());
        assert!(analytics.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_cached_result_served_until_expiry() {
        let (ctx, _) = tenant().await;
        let campaign_id = campaign(&ctx, Uuid::new_v4());
        let creative_id = creative(&ctx, campaign_id, 1000, 10);
        let aggregator = aggregator();
        let range = last_day();

        let first = aggregator.get_campaign_analytics(&ctx, campaign_id, range).await.unwrap();
        ctx.store
            .set_creative_performance(
                creative_id,
                PerformanceMetrics {
                    impressions: 5000,
                    clicks: 500,
                    ..Default::default()
                },
            )
            .unwrap();
        let second = aggregator.get_campaign_analytics(&ctx, campaign_id, range).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_daily_buckets_drive_trends() {
        let (ctx, _) = tenant().await;
        let campaign_id = campaign(&ctx, Uuid::new_v4());
        let today = Utc::now().date_naive();
        let yesterday = today - Duration::days(1);
        for (date, impressions) in [(yesterday, 100), (today, 150)] {
            ctx.store
                .add_daily_metrics(DailyMetricRecord {
                    campaign_id,
                    date,
                    impressions,
                    clicks: 2,
                    conversions: 0,
                    spend: 1.0,
                    revenue: 0.0,
                })
                .unwrap();
        }
        // Outside the requested window.
        ctx.store
            .add_daily_metrics(DailyMetricRecord {
                campaign_id,
                date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                impressions: 1,
                clicks: 0,
                conversions: 0,
                spend: 0.0,
                revenue: 0.0,
            })
            .unwrap();

        let range = DateRange::new(Utc::now() - Duration::days(1), Utc::now()).unwrap();
        let analytics = aggregator()
            .get_campaign_analytics(&ctx, campaign_id, range)
            .await
            .unwrap();
        assert_eq!(analytics.trends.daily.len(), 2);
        assert!((analytics.trends.growth.impressions - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_campaign() {
        let (ctx, _) = tenant().await;
        let missing = Uuid::new_v4();
        assert!(matches!(
            aggregator().get_campaign_analytics(&ctx, missing, last_day()).await,
            Err(AdGeniusError::CampaignNotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn test_batch_skips_failures() {
        let (ctx, _) = tenant().await;
        let good = campaign(&ctx, Uuid::new_v4());
        creative(&ctx, good, 100, 5);
        let missing = Uuid::new_v4();

        let batch = aggregator()
            .get_multi_campaign_analytics(&ctx, &[missing, good], last_day())
            .await;
        assert_eq!(batch.campaigns.len(), 1);
        assert_eq!(batch.campaigns[0].campaign_id, good);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].campaign_id, missing);
    }

    #[tokio::test]
    async fn test_top_creatives_sorted_by_ctr() {
        let (ctx, _) = tenant().await;
        let owner = Uuid::new_v4();
        let a = campaign(&ctx, owner);
        let b = campaign(&ctx, owner);
        let other_owner = campaign(&ctx, Uuid::new_v4());
        let mid = creative(&ctx, a, 1000, 15);
        let best = creative(&ctx, b, 1000, 30);
        creative(&ctx, a, 1000, 5);
        creative(&ctx, a, 0, 0);
        creative(&ctx, other_owner, 1000, 900);

        let top = aggregator().get_top_performing_creatives(&ctx, owner, Some(2)).unwrap();
        let ids: Vec<Uuid> = top.iter().map(|s| s.creative_id).collect();
        assert_eq!(ids, [best, mid]);
        assert_eq!(top[0].tier, PerformanceTier::High);
        assert_eq!(top[1].tier, PerformanceTier::Medium);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let (ctx, cluster) = tenant().await;
        let campaign_id = campaign(&ctx, Uuid::new_v4());
        cluster.drop_database(ctx.store.name());
        assert!(matches!(
            aggregator().get_campaign_analytics(&ctx, campaign_id, last_day()).await,
            Err(AdGeniusError::StoreError(_))
        ));
    }
}
