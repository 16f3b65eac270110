//! Per-request tenant resolution.

use crate::error::ApiError;
use crate::rest::AppState;
use adgenius_core::AdGeniusError;
use adgenius_tenancy::TenantContext;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::HOST;
use axum::http::request::Parts;
use uuid::Uuid;

pub const TENANT_HEADER: &str = "x-tenant-id";

/// The caller's tenant, resolved from `X-Tenant-ID` or else the `Host` domain.
pub struct Tenant(pub TenantContext);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Host header without its port.
fn host_domain(host: &str) -> &str {
    host.rsplit_once(':').map_or(host, |(domain, _)| domain)
}

#[async_trait]
impl FromRequestParts<AppState> for Tenant {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(raw) = header(parts, TENANT_HEADER) {
            let id = Uuid::parse_str(raw)
                .map_err(|_| AdGeniusError::Validation(format!("invalid {TENANT_HEADER} header")))?;
            return Ok(Self(state.router.resolve(id).await?));
        }
        if let Some(host) = header(parts, HOST.as_str()) {
            return Ok(Self(state.router.resolve_domain(host_domain(host)).await?));
        }
        Err(AdGeniusError::Validation(format!("missing {TENANT_HEADER} or Host header")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_port_is_stripped() {
        assert_eq!(host_domain("acme.io:8080"), "acme.io");
        assert_eq!(host_domain("acme.io"), "acme.io");
    }
}
