//! Billing engine: subscription lifecycle, invoice generation and period close.
//! Documents are stored in the tenant's isolated store; swap the store for a
//! payment-provider integration (Stripe, Chargebee) in production.

use crate::plans::PlanCatalog;
use adgenius_core::billing::{
    BillingEvent, BillingInformation, Invoice, InvoiceLineItem, InvoiceStatus, LineItemKind,
    ResourceType, Subscription, SubscriptionStatus, UsageMetrics,
};
use adgenius_core::config::BillingConfig;
use adgenius_core::{AdGeniusError, AdGeniusResult};
use adgenius_tenancy::TenantContext;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Builds the invoice for a subscription snapshot.
///
/// `subtotal` is the plan price. Each resource used beyond a finite limit adds
/// one overage line. `total = subtotal + overage_total + tax`.
pub fn build_invoice(subscription: &Subscription, tax_rate: f64, issued_at: DateTime<Utc>) -> Invoice {
    let plan = &subscription.plan;
    let subtotal = round_cents(plan.price);

    let mut line_items = vec![InvoiceLineItem {
        description: format!("{} Plan", plan.name),
        resource: None,
        quantity: 1,
        unit_price: plan.price,
        amount: subtotal,
        kind: LineItemKind::Subscription,
    }];

    for resource in ResourceType::ALL {
        if plan.limits.is_unlimited(resource) {
            continue;
        }
        let limit = plan.limits.limit_for(resource);
        let used = subscription.usage.used.get(resource);
        if used <= limit {
            continue;
        }
        let quantity = used - limit;
        let unit_price = plan.overage_rates.rate_for(resource);
        line_items.push(InvoiceLineItem {
            description: resource.overage_label().to_string(),
            resource: Some(resource),
            quantity,
            unit_price,
            amount: round_cents(quantity as f64 * unit_price),
            kind: LineItemKind::Overage,
        });
    }

    let overage_total: f64 = line_items
        .iter()
        .filter(|li| li.kind == LineItemKind::Overage)
        .map(|li| li.amount)
        .sum();
    let tax = round_cents((subtotal + overage_total) * tax_rate);
    let total = subtotal + overage_total + tax;
    let days_until_due = subscription.billing_info.invoice_settings.days_until_due;

    Invoice {
        id: Uuid::new_v4(),
        tenant_id: subscription.tenant_id,
        subscription_id: subscription.id,
        invoice_number: format!(
            "INV-{}-{}",
            issued_at.format("%Y%m%d"),
            &Uuid::new_v4().simple().to_string()[..8].to_uppercase()
        ),
        status: InvoiceStatus::Open,
        subtotal,
        line_items,
        overage_total,
        tax_rate,
        tax,
        total,
        amount_paid: 0.0,
        amount_due: total,
        currency: plan.currency.clone(),
        period_start: subscription.usage.current_period_start,
        period_end: subscription.usage.current_period_end,
        issued_at,
        due_date: issued_at + Duration::days(i64::from(days_until_due)),
    }
}

/// Subscription and invoice operations scoped to one tenant's store.
pub struct BillingEngine {
    catalog: Arc<PlanCatalog>,
    config: BillingConfig,
}

impl BillingEngine {
    pub fn new(catalog: Arc<PlanCatalog>, config: BillingConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &Arc<PlanCatalog> {
        &self.catalog
    }

    /// Starts a subscription on `plan_id`, cancelling the current one first.
    pub fn create_subscription(&self, ctx: &TenantContext, plan_id: &str) -> AdGeniusResult<Subscription> {
        let plan = self.catalog.get(plan_id)?;
        let tenant_id = ctx.tenant_id();

        let previous = ctx.store.active_subscription()?;
        if let Some(prev) = &previous {
            self.cancel(ctx, prev.id)?;
        }

        let now = Utc::now();
        let period_end = plan.interval.period_end(now);
        let subscription = Subscription {
            id: Uuid::new_v4(),
            tenant_id,
            plan_id: plan.id.clone(),
            status: SubscriptionStatus::Active,
            current_period_start: now,
            current_period_end: period_end,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
            plan,
            usage: UsageMetrics::new(now, period_end),
            billing_info: BillingInformation::with_days_until_due(self.config.default_days_until_due),
        };
        ctx.store.insert_subscription(subscription.clone())?;

        self.record_event(
            ctx,
            "subscription_created",
            serde_json::json!({
                "subscription_id": subscription.id,
                "plan_id": subscription.plan_id,
                "previous_subscription_id": previous.map(|p| p.id),
            }),
        )?;
        info!(
            tenant_id = %tenant_id,
            subscription_id = %subscription.id,
            plan_id = %subscription.plan_id,
            "Subscription created"
        );
        metrics::counter!("billing.subscriptions.created").increment(1);
        Ok(subscription)
    }

    /// The tenant's active subscription.
    pub fn get_subscription(&self, ctx: &TenantContext) -> AdGeniusResult<Subscription> {
        ctx.store
            .active_subscription()?
            .ok_or(AdGeniusError::SubscriptionNotFound(ctx.tenant_id()))
    }

    pub fn cancel_subscription(&self, ctx: &TenantContext) -> AdGeniusResult<Subscription> {
        let active = self.get_subscription(ctx)?;
        let cancelled = self.cancel(ctx, active.id)?;
        self.record_event(
            ctx,
            "subscription_cancelled",
            serde_json::json!({ "subscription_id": cancelled.id }),
        )?;
        info!(tenant_id = %ctx.tenant_id(), subscription_id = %cancelled.id, "Subscription cancelled");
        Ok(cancelled)
    }

    fn cancel(&self, ctx: &TenantContext, subscription_id: Uuid) -> AdGeniusResult<Subscription> {
        ctx.store
            .update_subscription(subscription_id, |sub| {
                sub.status = SubscriptionStatus::Cancelled;
                sub.cancelled_at = Some(Utc::now());
                sub.clone()
            })?
            .ok_or(AdGeniusError::SubscriptionNotFound(subscription_id))
    }

    /// Issues an invoice from the subscription's current snapshot.
    pub fn generate_invoice(&self, ctx: &TenantContext, subscription_id: Uuid) -> AdGeniusResult<Invoice> {
        let subscription = ctx
            .store
            .get_subscription(subscription_id)?
            .ok_or(AdGeniusError::SubscriptionNotFound(subscription_id))?;
        self.issue(ctx, &subscription)
    }

    /// Issues the period invoice and rolls the subscription into its next period.
    ///
    /// The usage snapshot and the counter reset happen in one update, so usage
    /// tracked concurrently lands either on this invoice or in the next period.
    pub fn close_period(&self, ctx: &TenantContext, subscription_id: Uuid) -> AdGeniusResult<Invoice> {
        let snapshot = ctx
            .store
            .update_subscription(subscription_id, |sub| {
                let snapshot = sub.clone();
                let start = sub.current_period_end;
                let end = sub.plan.interval.period_end(start);
                sub.current_period_start = start;
                sub.current_period_end = end;
                let reserved = sub.usage.reserved;
                sub.usage = UsageMetrics::new(start, end);
                sub.usage.reserved = reserved;
                snapshot
            })?
            .ok_or(AdGeniusError::SubscriptionNotFound(subscription_id))?;

        let invoice = self.issue(ctx, &snapshot)?;
        info!(
            tenant_id = %ctx.tenant_id(),
            subscription_id = %subscription_id,
            invoice_number = %invoice.invoice_number,
            "Billing period closed"
        );
        Ok(invoice)
    }

    pub fn list_invoices(&self, ctx: &TenantContext, limit: usize, offset: usize) -> AdGeniusResult<Vec<Invoice>> {
        ctx.store.list_invoices(limit, offset)
    }

    fn issue(&self, ctx: &TenantContext, subscription: &Subscription) -> AdGeniusResult<Invoice> {
        let invoice = build_invoice(subscription, self.config.tax_rate, Utc::now());
        ctx.store.insert_invoice(invoice.clone())?;
        self.record_event(
            ctx,
            "invoice_created",
            serde_json::json!({
                "invoice_id": invoice.id,
                "invoice_number": invoice.invoice_number,
                "total": invoice.total,
            }),
        )?;
        metrics::counter!("billing.invoices.issued").increment(1);
        Ok(invoice)
    }

    fn record_event(&self, ctx: &TenantContext, event_type: &str, data: serde_json::Value) -> AdGeniusResult<()> {
        ctx.store.append_billing_event(BillingEvent {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id(),
            event_type: event_type.to_string(),
            data,
            created_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metering::UsageMeter;
    use adgenius_cache::{JsonCache, LocalCache};
    use adgenius_store::StoreCluster;
    use adgenius_tenancy::{TenantRegistry, TenantStoreRouter};

    async fn tenant() -> TenantContext {
        let cluster = Arc::new(StoreCluster::new("cp"));
        let cache = JsonCache::new(Arc::new(LocalCache::new(900, 64)), std::time::Duration::from_secs(900));
        let registry = Arc::new(TenantRegistry::new(cluster.clone(), cache));
        let router = TenantStoreRouter::new(registry, cluster, 16);
        let tenant = router.registry().create_tenant("Acme", "acme.io", "starter").unwrap();
        router.resolve(tenant.id).await.unwrap()
    }

    fn engine() -> BillingEngine {
        BillingEngine::new(Arc::new(PlanCatalog::builtin("USD")), BillingConfig::default())
    }

    fn assert_total_identity(invoice: &Invoice) {
        let overage: f64 = invoice.overage_items().map(|li| li.amount).sum();
        assert!((invoice.total - (invoice.subtotal + invoice.tax + overage)).abs() < 1e-9);
        assert!((invoice.amount_due - invoice.total).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_invoice_without_overage() {
        let ctx = tenant().await;
        let engine = engine();
        let sub = engine.create_subscription(&ctx, "starter").unwrap();

        let invoice = engine.generate_invoice(&ctx, sub.id).unwrap();
        assert_eq!(invoice.overage_items().count(), 0);
        assert!((invoice.subtotal - 29.99).abs() < 1e-9);
        assert!((invoice.tax - 3.0).abs() < 1e-9);
        assert_total_identity(&invoice);
        assert_eq!(invoice.status, InvoiceStatus::Open);
        assert_eq!((invoice.due_date - invoice.issued_at).num_days(), 30);
        assert!(invoice.invoice_number.starts_with("INV-"));
        assert_eq!(invoice.invoice_number.len(), "INV-20260101-ABCDEF12".len());
    }

    #[tokio::test]
    async fn test_overage_lines_only_above_limit() {
        let ctx = tenant().await;
        let engine = engine();
        let meter = UsageMeter::new();
        let sub = engine.create_subscription(&ctx, "starter").unwrap();

        // Exactly at the creative limit, 10 over the AI generation limit.
        meter.track_usage(&ctx, ResourceType::Creative, 50, None).unwrap();
        meter.track_usage(&ctx, ResourceType::AiGeneration, 110, None).unwrap();

        let invoice = engine.generate_invoice(&ctx, sub.id).unwrap();
        let overages: Vec<&InvoiceLineItem> = invoice.overage_items().collect();
        assert_eq!(overages.len(), 1);
        assert_eq!(overages[0].resource, Some(ResourceType::AiGeneration));
        assert_eq!(overages[0].quantity, 10);
        assert!((overages[0].amount - 1.0).abs() < 1e-9);
        assert!((invoice.overage_total - 1.0).abs() < 1e-9);
        assert!((invoice.tax - 3.10).abs() < 1e-9);
        assert_total_identity(&invoice);
    }

    #[tokio::test]
    async fn test_total_identity_across_usage_levels() {
        let ctx = tenant().await;
        let engine = engine();
        let meter = UsageMeter::new();
        let sub = engine.create_subscription(&ctx, "starter").unwrap();

        for step in 1..=5 {
            meter.track_usage(&ctx, ResourceType::ApiCall, 377 * step, None).unwrap();
            meter.track_usage(&ctx, ResourceType::Campaign, step, None).unwrap();
            meter.track_usage(&ctx, ResourceType::StorageMb, 333 * step, None).unwrap();
            let invoice = engine.generate_invoice(&ctx, sub.id).unwrap();
            assert_total_identity(&invoice);
            for item in invoice.overage_items() {
                let resource = item.resource.unwrap();
                assert!(
                    ctx.store.active_subscription().unwrap().unwrap().usage.used.get(resource)
                        > sub.plan.limits.limit_for(resource)
                );
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_plan_fails_without_side_effects() {
        let ctx = tenant().await;
        let err = engine().create_subscription(&ctx, "gold").unwrap_err();
        assert!(matches!(err, AdGeniusError::InvalidPlan(_)));
        assert!(ctx.store.active_subscription().unwrap().is_none());
        assert!(ctx.store.billing_events().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_plan_change_keeps_single_active_subscription() {
        let ctx = tenant().await;
        let engine = engine();
        let first = engine.create_subscription(&ctx, "starter").unwrap();
        let second = engine.create_subscription(&ctx, "professional").unwrap();

        let active = engine.get_subscription(&ctx).unwrap();
        assert_eq!(active.id, second.id);
        let old = ctx.store.get_subscription(first.id).unwrap().unwrap();
        assert_eq!(old.status, SubscriptionStatus::Cancelled);
        assert!(old.cancelled_at.is_some());

        let events: Vec<String> = ctx
            .store
            .billing_events()
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(events, ["subscription_created", "subscription_created"]);
    }

    #[tokio::test]
    async fn test_cancel_leaves_no_active_subscription() {
        let ctx = tenant().await;
        let engine = engine();
        engine.create_subscription(&ctx, "starter").unwrap();
        engine.cancel_subscription(&ctx).unwrap();
        assert!(matches!(
            engine.get_subscription(&ctx),
            Err(AdGeniusError::SubscriptionNotFound(_))
        ));
        assert!(matches!(
            UsageMeter::new().track_usage(&ctx, ResourceType::ApiCall, 1, None),
            Err(AdGeniusError::SubscriptionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_close_period_resets_usage_and_advances() {
        let ctx = tenant().await;
        let engine = engine();
        let meter = UsageMeter::new();
        let sub = engine.create_subscription(&ctx, "starter").unwrap();
        meter.track_usage(&ctx, ResourceType::Creative, 60, None).unwrap();

        let invoice = engine.close_period(&ctx, sub.id).unwrap();
        assert_eq!(invoice.overage_items().count(), 1);
        assert_eq!(invoice.period_end, sub.current_period_end);

        let rolled = engine.get_subscription(&ctx).unwrap();
        assert_eq!(rolled.current_period_start, sub.current_period_end);
        assert!(rolled.current_period_end > rolled.current_period_start);
        assert_eq!(rolled.usage.used.get(ResourceType::Creative), 0);
        assert_eq!(engine.list_invoices(&ctx, 10, 0).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_subscription_invoice() {
        let ctx = tenant().await;
        let missing = Uuid::new_v4();
        assert!(matches!(
            engine().generate_invoice(&ctx, missing),
            Err(AdGeniusError::SubscriptionNotFound(id)) if id == missing
        ));
    }
}
