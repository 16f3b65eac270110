//! End-to-end flows across tenancy, billing, creative generation and analytics.

use adgenius_analytics::{AnalyticsAggregator, DateRange};
use adgenius_billing::{BillingEngine, OnboardingEngine, PlanCatalog, UsageMeter};
use adgenius_cache::{JsonCache, LocalCache};
use adgenius_core::billing::ResourceType;
use adgenius_core::campaign::{Budget, CampaignStatus, CreativeStatus, TargetAudience};
use adgenius_core::config::{AnalyticsConfig, BillingConfig, GenerationConfig};
use adgenius_core::AdGeniusError;
use adgenius_creative::{
    CampaignService, CreativeGenerator, CreativeOrchestrator, CreativeParams, GenerateCreative, NewCampaign,
    PerformanceUpdate, SimulatedGenerator,
};
use adgenius_store::StoreCluster;
use adgenius_tenancy::{TenantContext, TenantRegistry, TenantStoreRouter};
use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

struct Platform {
    router: Arc<TenantStoreRouter>,
    billing: Arc<BillingEngine>,
    onboarding: OnboardingEngine,
    campaigns: CampaignService,
    orchestrator: Arc<CreativeOrchestrator>,
    analytics: AnalyticsAggregator,
}

fn platform(generator: Arc<dyn CreativeGenerator>) -> Platform {
    let cluster = Arc::new(StoreCluster::new("adgenius_public"));
    let metadata = JsonCache::new(Arc::new(LocalCache::new(900, 1024)), Duration::from_secs(900));
    let registry = Arc::new(TenantRegistry::new(cluster.clone(), metadata));
    let router = Arc::new(TenantStoreRouter::new(registry, cluster, 64));

    let builtin = PlanCatalog::builtin("USD");
    let mut trial = builtin.get("starter").unwrap();
    trial.id = "trial".into();
    trial.limits.creatives_per_month = 2;
    let billing = Arc::new(BillingEngine::new(
        Arc::new(builtin.with_plan(trial)),
        BillingConfig::default(),
    ));

    let meter = UsageMeter::new();
    Platform {
        onboarding: OnboardingEngine::new(router.clone(), billing.clone()),
        billing,
        campaigns: CampaignService::new(meter.clone()),
        orchestrator: Arc::new(CreativeOrchestrator::new(generator, meter, &GenerationConfig::default())),
        analytics: AnalyticsAggregator::new(
            JsonCache::new(Arc::new(LocalCache::new(3600, 1024)), Duration::from_secs(3600)),
            AnalyticsConfig::default(),
        ),
        router,
    }
}

async fn onboard(platform: &Platform, name: &str, domain: &str, plan: &str) -> TenantContext {
    platform.onboarding.onboard(name, domain, plan).await.unwrap();
    platform.router.resolve_domain(domain).await.unwrap()
}

fn campaign(name: &str, owner_id: Uuid) -> NewCampaign {
    NewCampaign {
        owner_id,
        name: name.into(),
        description: "spring push".into(),
        budget: Budget {
            total_amount: 1000.0,
            ..Default::default()
        },
        target_audience: TargetAudience::default(),
        brand_assets: Vec::new(),
    }
}

fn image(campaign_id: Uuid, prompt: &str) -> GenerateCreative {
    GenerateCreative {
        campaign_id,
        prompt: prompt.into(),
        style: None,
        params: CreativeParams::Image {
            aspect_ratio: "1:1".into(),
        },
    }
}

#[tokio::test]
async fn test_acme_third_creative_is_denied_and_left_failed() {
    let platform = platform(Arc::new(SimulatedGenerator::new(Duration::ZERO)));
    let ctx = onboard(&platform, "Acme", "acme.io", "trial").await;
    let campaign = platform
        .campaigns
        .create_campaign(&ctx, campaign("Launch", Uuid::new_v4()))
        .unwrap();

    for prompt in ["first", "second"] {
        let creative = platform
            .orchestrator
            .generate_creative(&ctx, image(campaign.id, prompt))
            .await
            .unwrap();
        assert_eq!(creative.status, CreativeStatus::Completed);
    }

    let err = platform
        .orchestrator
        .generate_creative(&ctx, image(campaign.id, "third"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AdGeniusError::UsageLimitExceeded {
            resource: ResourceType::Creative,
            limit: 2,
            used: 2,
            requested: 1,
        }
    ));
    assert!(err.is_user_facing());

    let creatives = ctx.store.creatives_for_campaign(campaign.id).unwrap();
    assert_eq!(creatives.len(), 3);
    let third = creatives.iter().find(|c| c.source_prompt == "third").unwrap();
    assert_eq!(third.status, CreativeStatus::Failed);
    assert!(creatives.iter().all(|c| c.status != CreativeStatus::Generating));

    let sub = ctx.store.active_subscription().unwrap().unwrap();
    assert_eq!(sub.usage.used.get(ResourceType::Creative), 2);
    assert_eq!(sub.usage.used.get(ResourceType::AiGeneration), 2);
    assert_eq!(sub.usage.reserved.get(ResourceType::Creative), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_generations_never_overrun_the_plan() {
    let platform = platform(Arc::new(SimulatedGenerator::new(Duration::from_millis(20))));
    let ctx = onboard(&platform, "Acme", "acme.io", "trial").await;
    let campaign = platform
        .campaigns
        .create_campaign(&ctx, campaign("Launch", Uuid::new_v4()))
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let orchestrator = platform.orchestrator.clone();
        let ctx = ctx.clone();
        let request = image(campaign.id, &format!("variant {i}"));
        handles.push(tokio::spawn(async move {
            orchestrator.generate_creative(&ctx, request).await
        }));
    }
    let mut completed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => completed += 1,
            Err(AdGeniusError::UsageLimitExceeded { .. }) => {}
            Err(e) => panic!("unexpected error {e}"),
        }
    }
    assert_eq!(completed, 2);

    let creatives = ctx.store.creatives_for_campaign(campaign.id).unwrap();
    let done = creatives.iter().filter(|c| c.status == CreativeStatus::Completed).count();
    assert_eq!(done, 2);
    assert_eq!(creatives.len(), 20);
}

#[tokio::test]
async fn test_plan_change_mid_generation_charges_new_subscription() {
    let platform = platform(Arc::new(SimulatedGenerator::new(Duration::from_millis(300))));
    let ctx = onboard(&platform, "Acme", "acme.io", "starter").await;
    let campaign = platform
        .campaigns
        .create_campaign(&ctx, campaign("Launch", Uuid::new_v4()))
        .unwrap();

    let orchestrator = platform.orchestrator.clone();
    let generating_ctx = ctx.clone();
    let request = image(campaign.id, "upgrade race");
    let generation = tokio::spawn(async move { orchestrator.generate_creative(&generating_ctx, request).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let upgraded = platform.billing.create_subscription(&ctx, "professional").unwrap();

    let creative = generation.await.unwrap().unwrap();
    assert_eq!(creative.status, CreativeStatus::Completed);

    let active = ctx.store.active_subscription().unwrap().unwrap();
    assert_eq!(active.id, upgraded.id);
    assert_eq!(active.usage.used.get(ResourceType::Creative), 1);
    assert_eq!(active.usage.used.get(ResourceType::AiGeneration), 1);

    let records = ctx
        .store
        .usage_between(Utc::now() - ChronoDuration::hours(1), Utc::now() + ChronoDuration::hours(1))
        .unwrap();
    assert!(records
        .iter()
        .any(|r| r.resource_ref == Some(creative.id) && r.resource_type == ResourceType::Creative));
}

#[tokio::test]
async fn test_low_ctr_campaign_gets_creative_recommendation() {
    let platform = platform(Arc::new(SimulatedGenerator::new(Duration::ZERO)));
    let ctx = onboard(&platform, "Acme", "acme.io", "professional").await;
    let owner = Uuid::new_v4();
    let campaign = platform.campaigns.create_campaign(&ctx, campaign("Launch", owner)).unwrap();
    platform
        .campaigns
        .update_campaign_status(&ctx, campaign.id, CampaignStatus::Active)
        .unwrap();

    for (impressions, clicks) in [(1000, 10), (2000, 15)] {
        let creative = platform
            .orchestrator
            .generate_creative(&ctx, image(campaign.id, "hero"))
            .await
            .unwrap();
        platform
            .campaigns
            .update_creative_performance(
                &ctx,
                creative.id,
                PerformanceUpdate {
                    impressions,
                    clicks,
                    ..Default::default()
                },
            )
            .unwrap();
    }

    let range = DateRange::new(Utc::now() - ChronoDuration::days(1), Utc::now() + ChronoDuration::minutes(1)).unwrap();
    let analytics = platform
        .analytics
        .get_campaign_analytics(&ctx, campaign.id, range)
        .await
        .unwrap();
    assert_eq!(analytics.metrics.impressions, 3000);
    assert_eq!(analytics.metrics.clicks, 25);
    assert!((analytics.metrics.ctr - 25.0 / 3000.0 * 100.0).abs() < 1e-9);
    assert!(analytics
        .recommendations
        .iter()
        .any(|r| r.title == "Improve Creative Performance"));

    let top = platform
        .analytics
        .get_top_performing_creatives(&ctx, owner, Some(1))
        .unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].impressions, 1000);
}

#[tokio::test]
async fn test_impressions_growth_between_first_and_last_day() {
    let platform = platform(Arc::new(SimulatedGenerator::new(Duration::ZERO)));
    let ctx = onboard(&platform, "Acme", "acme.io", "professional").await;
    let campaign = platform
        .campaigns
        .create_campaign(&ctx, campaign("Launch", Uuid::new_v4()))
        .unwrap();
    let creative = platform
        .orchestrator
        .generate_creative(&ctx, image(campaign.id, "hero"))
        .await
        .unwrap();

    let first = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
    for (offset, impressions) in [(0, 100), (1, 130), (2, 150)] {
        platform
            .campaigns
            .update_creative_performance(
                &ctx,
                creative.id,
                PerformanceUpdate {
                    impressions,
                    clicks: 2,
                    date: Some(first + ChronoDuration::days(offset)),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    // Window covers the daily buckets and today's creative.
    let start = Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0).unwrap());
    let range = DateRange::new(start, Utc::now() + ChronoDuration::minutes(1)).unwrap();
    let analytics = platform
        .analytics
        .get_campaign_analytics(&ctx, campaign.id, range)
        .await
        .unwrap();
    assert_eq!(analytics.trends.daily.len(), 3);
    assert!((analytics.trends.growth.impressions - 50.0).abs() < 1e-9);
    assert_eq!(analytics.metrics.impressions, 380);
}

#[tokio::test]
async fn test_tenants_never_see_each_other() {
    let platform = platform(Arc::new(SimulatedGenerator::new(Duration::ZERO)));
    let acme = onboard(&platform, "Acme", "acme.io", "starter").await;
    let globex = onboard(&platform, "Globex", "globex.io", "starter").await;
    assert_ne!(acme.tenant.store_name, globex.tenant.store_name);

    let owner = Uuid::new_v4();
    let campaign = platform.campaigns.create_campaign(&acme, campaign("Acme only", owner)).unwrap();

    assert!(matches!(
        platform.campaigns.get_campaign(&globex, campaign.id),
        Err(AdGeniusError::CampaignNotFound(_))
    ));
    assert!(platform.campaigns.list_campaigns(&globex, owner, 10, 0).unwrap().is_empty());
    assert!(matches!(
        platform
            .orchestrator
            .generate_creative(&globex, image(campaign.id, "steal"))
            .await,
        Err(AdGeniusError::CampaignNotFound(_))
    ));

    let globex_usage = globex.store.active_subscription().unwrap().unwrap().usage;
    assert_eq!(globex_usage.used.get(ResourceType::Campaign), 0);
}
