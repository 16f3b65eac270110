//! Usage metering: tracking, limit checks, reservations and usage reports.
//!
//! All counter changes go through the store's subscription update primitives,
//! which apply the change (and append any usage records) while holding the
//! subscription document's lock.
//! Admission for chargeable operations uses reservations: capacity is held
//! atomically up front, then either committed to `used` or released.

use adgenius_core::billing::{ResourceType, Subscription, UsageRecord};
use adgenius_core::{AdGeniusError, AdGeniusResult};
use adgenius_tenancy::TenantContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Largest quantity accepted by a single track, check or reserve call.
pub const MAX_USAGE_QUANTITY: i64 = 1_000_000_000;

/// Capacity held against the active subscription by an in-flight operation.
///
/// Must be passed to [`UsageMeter::commit`] or [`UsageMeter::release`].
#[must_use = "a reservation holds plan capacity until committed or released"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub tenant_id: Uuid,
    pub subscription_id: Uuid,
    pub items: Vec<(ResourceType, i64)>,
}

/// Usage of one resource in the current period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub resource: ResourceType,
    pub used: i64,
    pub reserved: i64,
    /// Negative when unlimited.
    pub limit: i64,
    /// `None` when unlimited.
    pub remaining: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSummary {
    pub tenant_id: Uuid,
    pub subscription_id: Uuid,
    pub plan_id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub resources: Vec<ResourceUsage>,
}

/// Outcome of checking `requested` more units of `resource` against the plan.
fn admit(subscription: &Subscription, resource: ResourceType, requested: i64) -> AdGeniusResult<()> {
    let limits = &subscription.plan.limits;
    if limits.is_unlimited(resource) {
        return Ok(());
    }
    let limit = limits.limit_for(resource);
    let used = subscription
        .usage
        .used
        .get(resource)
        .saturating_add(subscription.usage.reserved.get(resource));
    match used.checked_add(requested) {
        Some(total) if total <= limit => Ok(()),
        _ => Err(AdGeniusError::UsageLimitExceeded {
            resource,
            limit,
            used,
            requested,
        }),
    }
}

fn validate_quantity(quantity: i64) -> AdGeniusResult<()> {
    if quantity <= 0 {
        return Err(AdGeniusError::Validation(format!(
            "usage quantity must be positive, got {quantity}"
        )));
    }
    if quantity > MAX_USAGE_QUANTITY {
        return Err(AdGeniusError::Validation(format!(
            "usage quantity {quantity} exceeds the per-call maximum of {MAX_USAGE_QUANTITY}"
        )));
    }
    Ok(())
}

fn usage_records(tenant_id: Uuid, items: &[(ResourceType, i64)], resource_ref: Option<Uuid>) -> Vec<UsageRecord> {
    items
        .iter()
        .map(|(resource, quantity)| usage_record(tenant_id, *resource, *quantity, resource_ref))
        .collect()
}

fn usage_record(tenant_id: Uuid, resource: ResourceType, quantity: i64, resource_ref: Option<Uuid>) -> UsageRecord {
    UsageRecord {
        id: Uuid::new_v4(),
        tenant_id,
        resource_type: resource,
        quantity,
        resource_ref,
        timestamp: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Meter
// ---------------------------------------------------------------------------

/// Stateless: every call operates on the caller's resolved tenant store.
#[derive(Debug, Default, Clone)]
pub struct UsageMeter;

impl UsageMeter {
    pub fn new() -> Self {
        Self
    }

    /// Increments the active subscription's counter and appends the usage record
    /// in one store step. Does not enforce limits.
    pub fn track_usage(
        &self,
        ctx: &TenantContext,
        resource: ResourceType,
        quantity: i64,
        resource_ref: Option<Uuid>,
    ) -> AdGeniusResult<()> {
        validate_quantity(quantity)?;
        let tenant_id = ctx.tenant_id();

        ctx.store
            .update_active_subscription_logged(|sub| {
                sub.usage.used.add(resource, quantity);
                sub.usage.last_updated = Utc::now();
                ((), vec![usage_record(tenant_id, resource, quantity, resource_ref)])
            })?
            .ok_or(AdGeniusError::SubscriptionNotFound(tenant_id))?;

        metrics::counter!("billing.usage.tracked", "resource" => resource.as_str())
            .increment(quantity as u64);
        debug!(tenant_id = %tenant_id, resource = %resource, quantity = quantity, "Usage tracked");
        Ok(())
    }

    /// Read-only admission check. Held reservations count as used.
    pub fn check_usage_limits(
        &self,
        ctx: &TenantContext,
        resource: ResourceType,
        requested: i64,
    ) -> AdGeniusResult<bool> {
        match self.ensure_within_limits(ctx, resource, requested) {
            Ok(()) => Ok(true),
            Err(AdGeniusError::UsageLimitExceeded { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Like [`check_usage_limits`](Self::check_usage_limits) but reports the denial detail.
    pub fn ensure_within_limits(
        &self,
        ctx: &TenantContext,
        resource: ResourceType,
        requested: i64,
    ) -> AdGeniusResult<()> {
        validate_quantity(requested)?;
        let subscription = ctx
            .store
            .active_subscription()?
            .ok_or(AdGeniusError::SubscriptionNotFound(ctx.tenant_id()))?;
        admit(&subscription, resource, requested)
    }

    /// Atomically checks every item and holds capacity for all of them, or none.
    pub fn reserve(
        &self,
        ctx: &TenantContext,
        items: &[(ResourceType, i64)],
    ) -> AdGeniusResult<Reservation> {
        for (_, quantity) in items {
            validate_quantity(*quantity)?;
        }
        let tenant_id = ctx.tenant_id();

        let outcome = ctx
            .store
            .update_active_subscription(|sub| -> AdGeniusResult<Uuid> {
                for (resource, quantity) in items {
                    admit(sub, *resource, *quantity)?;
                }
                for (resource, quantity) in items {
                    sub.usage.reserved.add(*resource, *quantity);
                }
                Ok(sub.id)
            })?
            .ok_or(AdGeniusError::SubscriptionNotFound(tenant_id))?;

        match outcome {
            Ok(subscription_id) => Ok(Reservation {
                tenant_id,
                subscription_id,
                items: items.to_vec(),
            }),
            Err(e) => {
                if let AdGeniusError::UsageLimitExceeded { resource, limit, used, .. } = &e {
                    metrics::counter!("billing.admission.denied", "resource" => resource.as_str())
                        .increment(1);
                    info!(
                        tenant_id = %tenant_id,
                        resource = %resource,
                        limit = limit,
                        used = used,
                        "Admission denied"
                    );
                }
                Err(e)
            }
        }
    }

    /// Converts held capacity into usage and appends one usage record per item.
    ///
    /// Usage is charged to whichever subscription is active at commit time. When
    /// the plan changed while the operation ran, the hold on the old subscription
    /// is dropped and the new one is charged. With no active subscription left,
    /// the subscription that granted the hold is charged.
    pub fn commit(
        &self,
        ctx: &TenantContext,
        reservation: Reservation,
        resource_ref: Option<Uuid>,
    ) -> AdGeniusResult<()> {
        let tenant_id = ctx.tenant_id();
        let held_by = reservation.subscription_id;
        let items = &reservation.items;

        let charged = ctx.store.update_active_subscription_logged(|sub| {
            let holds = sub.id == held_by;
            for (resource, quantity) in items {
                if holds {
                    sub.usage.reserved.sub(*resource, *quantity);
                }
                sub.usage.used.add(*resource, *quantity);
            }
            sub.usage.last_updated = Utc::now();
            ((sub.id, holds), usage_records(tenant_id, items, resource_ref))
        })?;

        match charged {
            Some((_, true)) => {}
            Some((active_id, false)) => {
                warn!(
                    tenant_id = %tenant_id,
                    held_by = %held_by,
                    charged = %active_id,
                    "Subscription changed mid-flight, charging the active subscription"
                );
                self.release(ctx, reservation.clone())?;
            }
            None => {
                warn!(tenant_id = %tenant_id, held_by = %held_by, "No active subscription, charging the reserving subscription");
                ctx.store
                    .update_subscription_logged(held_by, |sub| {
                        for (resource, quantity) in items {
                            sub.usage.reserved.sub(*resource, *quantity);
                            sub.usage.used.add(*resource, *quantity);
                        }
                        sub.usage.last_updated = Utc::now();
                        ((), usage_records(tenant_id, items, resource_ref))
                    })?
                    .ok_or(AdGeniusError::SubscriptionNotFound(held_by))?;
            }
        }

        for (resource, quantity) in &reservation.items {
            metrics::counter!("billing.usage.tracked", "resource" => resource.as_str())
                .increment(*quantity as u64);
        }
        Ok(())
    }

    /// Returns held capacity without recording usage.
    pub fn release(&self, ctx: &TenantContext, reservation: Reservation) -> AdGeniusResult<()> {
        ctx.store.update_subscription(reservation.subscription_id, |sub| {
            for (resource, quantity) in &reservation.items {
                sub.usage.reserved.sub(*resource, *quantity);
            }
        })?;
        debug!(tenant_id = %reservation.tenant_id, "Reservation released");
        Ok(())
    }

    /// Sum of usage records in `[start, end)` by resource type.
    pub fn usage_report(
        &self,
        ctx: &TenantContext,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AdGeniusResult<BTreeMap<ResourceType, i64>> {
        if end <= start {
            return Err(AdGeniusError::Validation("report range end must be after start".into()));
        }
        let mut report = BTreeMap::new();
        for record in ctx.store.usage_between(start, end)? {
            let total = report.entry(record.resource_type).or_insert(0i64);
            *total = total.saturating_add(record.quantity);
        }
        Ok(report)
    }

    pub fn usage_summary(&self, ctx: &TenantContext) -> AdGeniusResult<UsageSummary> {
        let sub = ctx
            .store
            .active_subscription()?
            .ok_or(AdGeniusError::SubscriptionNotFound(ctx.tenant_id()))?;
        let resources = ResourceType::ALL
            .iter()
            .map(|&resource| {
                let used = sub.usage.used.get(resource);
                let reserved = sub.usage.reserved.get(resource);
                let limit = sub.plan.limits.limit_for(resource);
                let remaining = (!sub.plan.limits.is_unlimited(resource))
                    .then(|| limit.saturating_sub(used).saturating_sub(reserved).max(0));
                ResourceUsage {
                    resource,
                    used,
                    reserved,
                    limit,
                    remaining,
                }
            })
            .collect();
        Ok(UsageSummary {
            tenant_id: ctx.tenant_id(),
            subscription_id: sub.id,
            plan_id: sub.plan_id.clone(),
            period_start: sub.usage.current_period_start,
            period_end: sub.usage.current_period_end,
            resources,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
