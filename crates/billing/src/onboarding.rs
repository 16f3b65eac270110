//! Onboarding: tenant provisioning plus the first subscription, in one flow.

use crate::billing::BillingEngine;
use adgenius_core::billing::{Plan, Subscription};
use adgenius_core::tenant::{Tenant, TenantSettingsUpdate};
use adgenius_core::{AdGeniusError, AdGeniusResult};
use adgenius_tenancy::TenantStoreRouter;
use std::sync::Arc;
use tracing::{error, info};

pub struct OnboardingEngine {
    router: Arc<TenantStoreRouter>,
    billing: Arc<BillingEngine>,
}

impl OnboardingEngine {
    pub fn new(router: Arc<TenantStoreRouter>, billing: Arc<BillingEngine>) -> Self {
        Self { router, billing }
    }

    /// Validates the plan before anything is written, provisions the tenant,
    /// opens its subscription and derives feature flags from the plan.
    ///
    /// Any failure after provisioning discards the new tenant, so the same
    /// name and domain can be onboarded again.
    pub async fn onboard(
        &self,
        name: &str,
        domain: &str,
        plan_id: &str,
    ) -> AdGeniusResult<(Tenant, Subscription)> {
        let plan = self.billing.catalog().get(plan_id)?;
        let tenant = self.router.registry().create_tenant(name, domain, &plan.id)?;

        match self.activate(&tenant, &plan).await {
            Ok((tenant, subscription)) => {
                info!(
                    tenant_id = %tenant.id,
                    plan_id = %plan.id,
                    subscription_id = %subscription.id,
                    "Tenant onboarded"
                );
                Ok((tenant, subscription))
            }
            Err(e) => Err(self.roll_back(&tenant, e).await),
        }
    }

    async fn activate(&self, tenant: &Tenant, plan: &Plan) -> AdGeniusResult<(Tenant, Subscription)> {
        let ctx = self.router.resolve(tenant.id).await?;
        let subscription = self.billing.create_subscription(&ctx, &plan.id)?;
        let tenant = self
            .router
            .update_tenant_settings(
                tenant.id,
                TenantSettingsUpdate {
                    features: Some(plan.features.clone()),
                    white_label: Some(plan.limits.white_label),
                    ..Default::default()
                },
            )
            .await?;
        Ok((tenant, subscription))
    }

    /// Discards a half-onboarded tenant and hands back the error that stopped it.
    async fn roll_back(&self, tenant: &Tenant, cause: AdGeniusError) -> AdGeniusError {
        error!(tenant_id = %tenant.id, error = %cause, "Onboarding failed after provisioning, discarding tenant");
        metrics::counter!("billing.onboarding.rolled_back").increment(1);
        if let Err(e) = self.router.discard(tenant.id).await {
            error!(tenant_id = %tenant.id, error = %e, "Failed to discard half-onboarded tenant");
        }
        cause
    }
}
