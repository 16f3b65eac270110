//! Campaign analytics endpoints.

use crate::error::ApiResult;
use crate::extract::Tenant;
use crate::rest::{AppState, MAX_PAGE_SIZE};
use adgenius_analytics::{CampaignAnalytics, CreativeStats, DateRange, MultiCampaignAnalytics};
use adgenius_core::AdGeniusError;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

const DEFAULT_WINDOW_DAYS: i64 = 30;
const MAX_BATCH: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl RangeQuery {
    /// Defaults to the trailing 30 days.
    fn resolve(&self) -> Result<DateRange, AdGeniusError> {
        let end = self.end.unwrap_or_else(Utc::now);
        let start = self.start.unwrap_or(end - Duration::days(DEFAULT_WINDOW_DAYS));
        DateRange::new(start, end)
    }
}

#[derive(Debug, Deserialize)]
pub struct MultiCampaignRequest {
    pub campaign_ids: Vec<Uuid>,
    #[serde(flatten)]
    pub range: RangeQuery,
}

#[derive(Debug, Deserialize)]
pub struct TopCreativesQuery {
    pub owner_id: Uuid,
    pub limit: Option<usize>,
}

/// GET /api/v1/analytics/campaigns/:id?start=&end=
pub async fn handle_campaign_analytics(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Path(campaign_id): Path<Uuid>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Json<CampaignAnalytics>> {
    let range = range.resolve()?;
    Ok(Json(
        state
            .analytics
            .get_campaign_analytics(&ctx, campaign_id, range)
            .await?,
    ))
}

/// POST /api/v1/analytics/campaigns: Batch analytics; failed campaigns are reported, not fatal.
pub async fn handle_multi_campaign_analytics(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Json(request): Json<MultiCampaignRequest>,
) -> ApiResult<Json<MultiCampaignAnalytics>> {
    if request.campaign_ids.is_empty() || request.campaign_ids.len() > MAX_BATCH {
        return Err(AdGeniusError::Validation(format!(
            "campaign_ids must contain between 1 and {MAX_BATCH} ids"
        ))
        .into());
    }
    let range = request.range.resolve()?;
    Ok(Json(
        state
            .analytics
            .get_multi_campaign_analytics(&ctx, &request.campaign_ids, range)
            .await,
    ))
}

/// GET /api/v1/analytics/top-creatives?owner_id=&limit=
pub async fn handle_top_creatives(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Query(query): Query<TopCreativesQuery>,
) -> ApiResult<Json<Vec<CreativeStats>>> {
    Ok(Json(state.analytics.get_top_performing_creatives(
        &ctx,
        query.owner_id,
        query.limit.map(|limit| limit.min(MAX_PAGE_SIZE)),
    )?))
}
