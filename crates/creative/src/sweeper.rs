//! Fails creatives left in `generating` by a crash or a lost generation task.

use adgenius_core::{AdGeniusError, AdGeniusResult};
use adgenius_store::CreativeTransition;
use adgenius_tenancy::TenantStoreRouter;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const ORPHAN_REASON: &str = "orphaned";

pub struct OrphanSweeper {
    router: Arc<TenantStoreRouter>,
    orphan_after: Duration,
}

impl OrphanSweeper {
    pub fn new(router: Arc<TenantStoreRouter>, orphan_after: Duration) -> Self {
        Self {
            router,
            orphan_after,
        }
    }

    /// One pass over every active tenant. Returns how many creatives were failed.
    ///
    /// A tenant whose store cannot be read is skipped; the next pass retries it.
    pub async fn sweep_once(&self) -> AdGeniusResult<usize> {
        let orphan_after = chrono::Duration::from_std(self.orphan_after)
            .map_err(|e| AdGeniusError::Config(format!("orphan_after out of range: {e}")))?;
        let cutoff = Utc::now() - orphan_after;
        let mut swept = 0;

        for tenant in self.router.registry().list_tenants(usize::MAX, 0) {
            if !tenant.is_active {
                continue;
            }
            let ctx = match self.router.resolve(tenant.id).await {
                Ok(ctx) => ctx,
                Err(e) => {
                    warn!(tenant_id = %tenant.id, error = %e, "Sweeper could not resolve tenant");
                    continue;
                }
            };
            let orphans = match ctx.store.generating_before(cutoff) {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(tenant_id = %tenant.id, error = %e, "Sweeper could not scan creatives");
                    continue;
                }
            };
            for creative_id in orphans {
                match ctx
                    .store
                    .transition_creative(creative_id, CreativeTransition::Failed(ORPHAN_REASON.into()))
                {
                    Ok(_) => {
                        swept += 1;
                        info!(tenant_id = %tenant.id, creative_id = %creative_id, "Orphaned creative failed");
                    }
                    // Finished between the scan and the transition.
                    Err(AdGeniusError::Conflict(_)) => {}
                    Err(e) => warn!(creative_id = %creative_id, error = %e, "Sweeper transition failed"),
                }
            }
        }

        if swept > 0 {
            metrics::counter!("creative.sweeper.failed").increment(swept as u64);
        }
        debug!(swept = swept, "Orphan sweep complete");
        Ok(swept)
    }

    pub fn spawn(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = self.sweep_once().await {
                    warn!(error = %e, "Orphan sweep failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adgenius_cache::{JsonCache, LocalCache};
    use adgenius_core::campaign::{Creative, CreativeStatus, CreativeType, PerformanceMetrics};
    use adgenius_store::StoreCluster;
    use adgenius_tenancy::{TenantContext, TenantRegistry};
    use uuid::Uuid;

    fn router() -> Arc<TenantStoreRouter> {
        let cluster = Arc::new(StoreCluster::new("cp"));
        let cache = JsonCache::new(Arc::new(LocalCache::new(900, 64)), Duration::from_secs(900));
        let registry = Arc::new(TenantRegistry::new(cluster.clone(), cache));
        Arc::new(TenantStoreRouter::new(registry, cluster, 16))
    }

    fn generating(ctx: &TenantContext, age: chrono::Duration) -> Uuid {
        let created = Utc::now() - age;
        let creative = Creative {
            id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            kind: CreativeType::Image,
            source_prompt: "p".into(),
            status: CreativeStatus::Generating,
            content: None,
            failure_reason: None,
            performance: PerformanceMetrics::default(),
            created_at: created,
            updated_at: created,
        };
        let id = creative.id;
        ctx.store.insert_creative(creative).unwrap();
        id
    }

    #[tokio::test]
    async fn test_only_stale_generating_creatives_are_failed() {
        let router = router();
        let a = router.registry().create_tenant("Acme", "acme.io", "starter").unwrap();
        let b = router.registry().create_tenant("Globex", "globex.io", "starter").unwrap();
        let ctx_a = router.resolve(a.id).await.unwrap();
        let ctx_b = router.resolve(b.id).await.unwrap();

        let stale_a = generating(&ctx_a, chrono::Duration::hours(1));
        let fresh_a = generating(&ctx_a, chrono::Duration::seconds(5));
        let stale_b = generating(&ctx_b, chrono::Duration::hours(2));

        let sweeper = OrphanSweeper::new(router.clone(), Duration::from_secs(900));
        assert_eq!(sweeper.sweep_once().await.unwrap(), 2);

        let status = |ctx: &TenantContext, id| ctx.store.get_creative(id).unwrap().unwrap();
        assert_eq!(status(&ctx_a, stale_a).status, CreativeStatus::Failed);
        assert_eq!(status(&ctx_a, stale_a).failure_reason.as_deref(), Some(ORPHAN_REASON));
        assert_eq!(status(&ctx_a, fresh_a).status, CreativeStatus::Generating);
        assert_eq!(status(&ctx_b, stale_b).status, CreativeStatus::Failed);

        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_inactive_tenants_are_skipped() {
        let router = router();
        let tenant = router.registry().create_tenant("Acme", "acme.io", "starter").unwrap();
        let ctx = router.resolve(tenant.id).await.unwrap();
        let stale = generating(&ctx, chrono::Duration::hours(1));
        router.deactivate(tenant.id).await.unwrap();

        let sweeper = OrphanSweeper::new(router, Duration::from_secs(60));
        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
        assert_eq!(
            ctx.store.get_creative(stale).unwrap().unwrap().status,
            CreativeStatus::Generating
        );
    }
}
