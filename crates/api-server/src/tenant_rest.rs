//! Tenant administration endpoints (control plane).

use crate::error::ApiResult;
use crate::rest::{AppState, Page};
use adgenius_core::billing::Subscription;
use adgenius_core::tenant::{Tenant, TenantSettingsUpdate};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    pub domain: String,
    /// Falls back to the configured default plan.
    pub plan_id: Option<String>,
}

#[derive(Serialize)]
pub struct CreateTenantResponse {
    pub tenant: Tenant,
    pub subscription: Subscription,
}

/// POST /api/v1/tenants: Provision a tenant and its first subscription.
pub async fn handle_create_tenant(
    State(state): State<AppState>,
    Json(request): Json<CreateTenantRequest>,
) -> ApiResult<(StatusCode, Json<CreateTenantResponse>)> {
    let plan_id = request.plan_id.as_deref().unwrap_or(&state.default_plan);
    let (tenant, subscription) = state
        .onboarding
        .onboard(&request.name, &request.domain, plan_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateTenantResponse {
            tenant,
            subscription,
        }),
    ))
}

/// GET /api/v1/tenants
pub async fn handle_list_tenants(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Json<Vec<Tenant>> {
    Json(state.router.registry().list_tenants(page.limit(), page.offset()))
}

/// GET /api/v1/tenants/:id
pub async fn handle_get_tenant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.router.registry().get_tenant_by_id(id).await?))
}

/// PATCH /api/v1/tenants/:id/settings
pub async fn handle_update_settings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<TenantSettingsUpdate>,
) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.router.update_tenant_settings(id, update).await?))
}

/// POST /api/v1/tenants/:id/deactivate
pub async fn handle_deactivate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.router.deactivate(id).await?))
}
