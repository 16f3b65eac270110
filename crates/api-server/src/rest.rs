//! Shared handler state and operational endpoints.

use adgenius_analytics::AnalyticsAggregator;
use adgenius_billing::{BillingEngine, OnboardingEngine, UsageMeter};
use adgenius_creative::{CampaignService, CreativeOrchestrator};
use adgenius_tenancy::TenantStoreRouter;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Largest page any list endpoint returns.
pub const MAX_PAGE_SIZE: usize = 200;
const DEFAULT_PAGE_SIZE: usize = 50;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<TenantStoreRouter>,
    pub onboarding: Arc<OnboardingEngine>,
    pub billing: Arc<BillingEngine>,
    pub meter: UsageMeter,
    pub campaigns: CampaignService,
    pub orchestrator: Arc<CreativeOrchestrator>,
    pub analytics: Arc<AnalyticsAggregator>,
    pub default_plan: String,
    pub start_time: Instant,
}

#[derive(Debug, Default, Deserialize)]
pub struct Page {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Page {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        tenant_handles: state.router.cached_handles(),
    })
}

/// GET /live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub tenant_handles: usize,
}
