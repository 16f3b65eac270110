//! Campaign and creative endpoints, scoped to the caller's tenant.

use crate::error::ApiResult;
use crate::extract::Tenant;
use crate::rest::{AppState, Page};
use adgenius_core::campaign::{Campaign, CampaignStatus, Creative};
use adgenius_creative::{GenerateCreative, NewCampaign, PerformanceUpdate};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListCampaignsQuery {
    pub owner_id: Uuid,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: CampaignStatus,
}

/// POST /api/v1/campaigns
pub async fn handle_create_campaign(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Json(request): Json<NewCampaign>,
) -> ApiResult<(StatusCode, Json<Campaign>)> {
    let campaign = state.campaigns.create_campaign(&ctx, request)?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

/// GET /api/v1/campaigns?owner_id=
pub async fn handle_list_campaigns(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Query(query): Query<ListCampaignsQuery>,
) -> ApiResult<Json<Vec<Campaign>>> {
    let page = Page {
        limit: query.limit,
        offset: query.offset,
    };
    Ok(Json(state.campaigns.list_campaigns(
        &ctx,
        query.owner_id,
        page.limit(),
        page.offset(),
    )?))
}

/// GET /api/v1/campaigns/:id
pub async fn handle_get_campaign(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(state.campaigns.get_campaign(&ctx, id)?))
}

/// PUT /api/v1/campaigns/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(state.campaigns.update_campaign_status(&ctx, id, request.status)?))
}

/// GET /api/v1/campaigns/:id/creatives
pub async fn handle_list_creatives(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Path(campaign_id): Path<Uuid>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<Creative>>> {
    Ok(Json(state.campaigns.list_creatives(
        &ctx,
        campaign_id,
        page.limit(),
        page.offset(),
    )?))
}

/// POST /api/v1/creatives: Generate a creative. Blocks until the engine answers or times out.
pub async fn handle_generate_creative(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Json(request): Json<GenerateCreative>,
) -> ApiResult<(StatusCode, Json<Creative>)> {
    let creative = state.orchestrator.generate_creative(&ctx, request).await?;
    metrics::counter!("api.creatives.generated").increment(1);
    Ok((StatusCode::CREATED, Json(creative)))
}

/// GET /api/v1/creatives/:id
pub async fn handle_get_creative(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Creative>> {
    Ok(Json(state.campaigns.get_creative(&ctx, id)?))
}

/// POST /api/v1/creatives/:id/performance: Report counters for a creative.
pub async fn handle_report_performance(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Path(id): Path<Uuid>,
    Json(update): Json<PerformanceUpdate>,
) -> ApiResult<Json<Creative>> {
    Ok(Json(state.campaigns.update_creative_performance(&ctx, id, update)?))
}
