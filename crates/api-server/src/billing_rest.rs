//! Plans, subscriptions, usage metering and invoices.

use crate::error::ApiResult;
use crate::extract::Tenant;
use crate::rest::{AppState, Page};
use adgenius_billing::metering::UsageSummary;
use adgenius_core::billing::{Invoice, Plan, ResourceType, Subscription};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub plan_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TrackUsageRequest {
    pub resource_type: ResourceType,
    pub quantity: i64,
    #[serde(default)]
    pub resource_ref: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UsageReportQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct LimitCheckQuery {
    pub resource: ResourceType,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Serialize)]
pub struct LimitCheckResponse {
    pub resource: ResourceType,
    pub quantity: i64,
    pub allowed: bool,
}

#[derive(Serialize)]
pub struct UsageReportResponse {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub usage: BTreeMap<ResourceType, i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceRequest {
    /// Defaults to the active subscription.
    #[serde(default)]
    pub subscription_id: Option<Uuid>,
    /// Also roll the subscription into its next billing period.
    #[serde(default)]
    pub close_period: bool,
}

/// GET /api/v1/billing/plans
pub async fn handle_list_plans(State(state): State<AppState>) -> Json<Vec<Plan>> {
    Json(state.billing.catalog().list())
}

/// GET /api/v1/billing/subscription
pub async fn handle_get_subscription(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
) -> ApiResult<Json<Subscription>> {
    Ok(Json(state.billing.get_subscription(&ctx)?))
}

/// POST /api/v1/billing/subscription: Subscribe or change plan.
pub async fn handle_create_subscription(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Json(request): Json<SubscribeRequest>,
) -> ApiResult<(StatusCode, Json<Subscription>)> {
    let subscription = state.billing.create_subscription(&ctx, &request.plan_id)?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// DELETE /api/v1/billing/subscription
pub async fn handle_cancel_subscription(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
) -> ApiResult<Json<Subscription>> {
    Ok(Json(state.billing.cancel_subscription(&ctx)?))
}

/// POST /api/v1/billing/usage: Record usage without admission.
pub async fn handle_track_usage(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Json(request): Json<TrackUsageRequest>,
) -> ApiResult<StatusCode> {
    state
        .meter
        .track_usage(&ctx, request.resource_type, request.quantity, request.resource_ref)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/billing/usage?start=&end=: Usage log totals, current period by default.
pub async fn handle_usage_report(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Query(query): Query<UsageReportQuery>,
) -> ApiResult<Json<UsageReportResponse>> {
    let (start, end) = match (query.start, query.end) {
        (Some(start), Some(end)) => (start, end),
        (start, end) => {
            let sub = state.billing.get_subscription(&ctx)?;
            (
                start.unwrap_or(sub.current_period_start),
                end.unwrap_or_else(|| Utc::now() + Duration::seconds(1)),
            )
        }
    };
    let usage = state.meter.usage_report(&ctx, start, end)?;
    Ok(Json(UsageReportResponse { start, end, usage }))
}

/// GET /api/v1/billing/usage/summary
pub async fn handle_usage_summary(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
) -> ApiResult<Json<UsageSummary>> {
    Ok(Json(state.meter.usage_summary(&ctx)?))
}

/// GET /api/v1/billing/usage/check?resource=&quantity=
pub async fn handle_check_limits(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Query(query): Query<LimitCheckQuery>,
) -> ApiResult<Json<LimitCheckResponse>> {
    let allowed = state.meter.check_usage_limits(&ctx, query.resource, query.quantity)?;
    Ok(Json(LimitCheckResponse {
        resource: query.resource,
        quantity: query.quantity,
        allowed,
    }))
}

/// POST /api/v1/billing/invoices
pub async fn handle_generate_invoice(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Json(request): Json<InvoiceRequest>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let subscription_id = match request.subscription_id {
        Some(id) => id,
        None => state.billing.get_subscription(&ctx)?.id,
    };
    let invoice = if request.close_period {
        state.billing.close_period(&ctx, subscription_id)?
    } else {
        state.billing.generate_invoice(&ctx, subscription_id)?
    };
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// GET /api/v1/billing/invoices
pub async fn handle_list_invoices(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<Invoice>>> {
    Ok(Json(state.billing.list_invoices(&ctx, page.limit(), page.offset())?))
}
