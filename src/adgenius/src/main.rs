//! AdGenius: multi-tenant AI advertising platform.
//!
//! Main entry point that wires the tenancy, billing, analytics and creative
//! services together and starts the API server.

use adgenius_analytics::AnalyticsAggregator;
use adgenius_api::{ApiServer, AppState};
use adgenius_billing::{BillingEngine, OnboardingEngine, PlanCatalog, UsageMeter};
use adgenius_cache::{CacheBackend, JsonCache, LocalCache, RedisCache};
use adgenius_core::config::AppConfig;
use adgenius_creative::{CampaignService, CreativeOrchestrator, OrphanSweeper, SimulatedGenerator};
use adgenius_store::StoreCluster;
use adgenius_tenancy::{TenantRegistry, TenantStoreRouter};
use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "adgenius")]
#[command(about = "Multi-tenant AI advertising platform")]
#[command(version)]
struct Cli {
    /// HTTP port (overrides config)
    #[arg(long, env = "ADGENIUS__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Prometheus exporter port (overrides config)
    #[arg(long, env = "ADGENIUS__METRICS__PORT")]
    metrics_port: Option<u16>,

    /// Creative generation timeout in seconds (overrides config)
    #[arg(long, env = "ADGENIUS__GENERATION__TIMEOUT_SECS")]
    generation_timeout_secs: Option<u64>,

    /// Do not run the orphaned-creative sweeper
    #[arg(long, default_value_t = false)]
    no_sweeper: bool,
}

/// Redis when enabled and reachable, otherwise an in-process cache.
async fn cache_backend(config: &AppConfig) -> Arc<dyn CacheBackend> {
    if config.redis.enabled {
        match RedisCache::new(&config.redis).await {
            Ok(redis) => return Arc::new(redis),
            Err(e) => error!(error = %e, "Failed to connect to Redis, falling back to local cache"),
        }
    }
    Arc::new(LocalCache::new(
        config.analytics.cache_ttl_secs.max(config.tenancy.metadata_cache_ttl_secs),
        100_000,
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adgenius=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("AdGenius starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }
    if let Some(secs) = cli.generation_timeout_secs {
        config.generation.timeout_secs = secs;
    }

    info!(
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        redis = config.redis.enabled,
        generation_timeout_secs = config.generation.timeout_secs,
        "Configuration loaded"
    );

    // Storage and tenancy
    let backend = cache_backend(&config).await;
    let cluster = Arc::new(StoreCluster::new(config.tenancy.control_plane_name.clone()));
    let registry = Arc::new(TenantRegistry::new(
        cluster.clone(),
        JsonCache::new(
            backend.clone(),
            Duration::from_secs(config.tenancy.metadata_cache_ttl_secs),
        ),
    ));
    let router = Arc::new(TenantStoreRouter::new(
        registry,
        cluster,
        config.tenancy.handle_cache_max_entries,
    ));

    // Billing
    let billing = Arc::new(BillingEngine::new(
        Arc::new(PlanCatalog::builtin(&config.billing.currency)),
        config.billing.clone(),
    ));
    let meter = UsageMeter::new();

    // Creative generation
    warn!("No external generation engine configured, using the simulated generator");
    let orchestrator = Arc::new(CreativeOrchestrator::new(
        Arc::new(SimulatedGenerator::default()),
        meter.clone(),
        &config.generation,
    ));

    let analytics = Arc::new(AnalyticsAggregator::new(
        JsonCache::new(backend.clone(), Duration::from_secs(config.analytics.cache_ttl_secs)),
        config.analytics.clone(),
    ));

    let state = AppState {
        onboarding: Arc::new(OnboardingEngine::new(router.clone(), billing.clone())),
        router: router.clone(),
        billing,
        meter: meter.clone(),
        campaigns: CampaignService::new(meter),
        orchestrator,
        analytics,
        default_plan: config.billing.default_plan.clone(),
        start_time: Instant::now(),
    };

    let api_server = ApiServer::new(config.clone(), state);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    // Spawn cache maintenance task
    let cache_for_maintenance = backend.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cache_for_maintenance.maintenance().await;
        }
    });

    if cli.no_sweeper {
        info!("Orphaned-creative sweeper disabled");
    } else {
        let sweeper = Arc::new(OrphanSweeper::new(
            router,
            Duration::from_secs(config.generation.orphan_after_secs),
        ));
        sweeper.spawn(Duration::from_secs(config.generation.sweeper_interval_secs.max(1)));
        info!(
            interval_secs = config.generation.sweeper_interval_secs,
            orphan_after_secs = config.generation.orphan_after_secs,
            "Orphaned-creative sweeper started"
        );
    }

    info!("AdGenius is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
