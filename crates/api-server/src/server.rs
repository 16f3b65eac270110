//! API server: REST routes plus the Prometheus exporter.

use crate::rest::{self, AppState};
use crate::{analytics_rest, billing_rest, campaign_rest, tenant_rest};
use adgenius_core::config::AppConfig;
use axum::routing::{get, patch, post, put};
use axum::Router;
use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Every route, with state applied. Tenant-scoped routes resolve the
    /// tenant from `X-Tenant-ID` or `Host`.
    pub fn router(&self) -> Router {
        let api = Router::new()
            // Tenants
            .route(
                "/tenants",
                post(tenant_rest::handle_create_tenant).get(tenant_rest::handle_list_tenants),
            )
            .route("/tenants/:id", get(tenant_rest::handle_get_tenant))
            .route("/tenants/:id/settings", patch(tenant_rest::handle_update_settings))
            .route("/tenants/:id/deactivate", post(tenant_rest::handle_deactivate))
            // Campaigns & creatives
            .route(
                "/campaigns",
                post(campaign_rest::handle_create_campaign).get(campaign_rest::handle_list_campaigns),
            )
            .route("/campaigns/:id", get(campaign_rest::handle_get_campaign))
            .route("/campaigns/:id/status", put(campaign_rest::handle_update_status))
            .route("/campaigns/:id/creatives", get(campaign_rest::handle_list_creatives))
            .route("/creatives", post(campaign_rest::handle_generate_creative))
            .route("/creatives/:id", get(campaign_rest::handle_get_creative))
            .route(
                "/creatives/:id/performance",
                post(campaign_rest::handle_report_performance),
            )
            // Analytics
            .route(
                "/analytics/campaigns",
                post(analytics_rest::handle_multi_campaign_analytics),
            )
            .route(
                "/analytics/campaigns/:id",
                get(analytics_rest::handle_campaign_analytics),
            )
            .route("/analytics/top-creatives", get(analytics_rest::handle_top_creatives))
            // Billing
            .route("/billing/plans", get(billing_rest::handle_list_plans))
            .route(
                "/billing/subscription",
                get(billing_rest::handle_get_subscription)
                    .post(billing_rest::handle_create_subscription)
                    .delete(billing_rest::handle_cancel_subscription),
            )
            .route(
                "/billing/usage",
                post(billing_rest::handle_track_usage).get(billing_rest::handle_usage_report),
            )
            .route("/billing/usage/summary", get(billing_rest::handle_usage_summary))
            .route("/billing/usage/check", get(billing_rest::handle_check_limits))
            .route(
                "/billing/invoices",
                post(billing_rest::handle_generate_invoice).get(billing_rest::handle_list_invoices),
            );

        Router::new()
            .nest("/api/v1", api)
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/live", get(rest::liveness))
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = self.router();
        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}
