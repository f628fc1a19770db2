//! HTTP facade over the realm registry.
//!
//! Every request path is routed through the registry. A resolved tenant is
//! answered with a summary of its deployment; a failed resolution is answered
//! with a status code derived from the failure kind.
//!
//! | Kind                | Status                      |
//! |---------------------|-----------------------------|
//! | `no_tenant_context` | 400 Bad Request             |
//! | `invalid_tenant`    | 400 Bad Request             |
//! | `tenant_unknown`    | 404 Not Found               |
//! | `build_failed`      | 502 Bad Gateway             |

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::RealmRegistry;
use crate::auth::{RealmDeployment, SslRequired};
use crate::error::{ErrorKind, ResolveError};

/// State shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Registry resolving tenants to deployments.
    pub registry: Arc<RealmRegistry>,
}

/// Build the router serving tenant resolution for every path.
pub fn router(state: AppState) -> Router {
    Router::new().fallback(resolve_handler).with_state(state)
}

/// Public view of a deployment. Client secrets are never exposed.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DeploymentSummary {
    pub realm: String,
    pub auth_server_url: Option<String>,
    pub realm_url: Option<String>,
    pub resource: Option<String>,
    pub ssl_required: SslRequired,
    pub public_client: bool,
    pub bearer_only: bool,
    pub has_realm_public_key: bool,
}

impl From<&RealmDeployment> for DeploymentSummary {
    fn from(deployment: &RealmDeployment) -> Self {
        Self {
            realm: deployment.realm.clone(),
            auth_server_url: deployment.auth_server_url.clone(),
            realm_url: deployment.realm_url(),
            resource: deployment.resource.clone(),
            ssl_required: deployment.ssl_required,
            public_client: deployment.public_client,
            bearer_only: deployment.bearer_only,
            has_realm_public_key: deployment.realm_public_key.is_some(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// HTTP status for a failure kind.
#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NoTenantContext | ErrorKind::InvalidTenant => StatusCode::BAD_REQUEST,
        ErrorKind::TenantUnknown => StatusCode::NOT_FOUND,
        ErrorKind::BuildFailed => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let body = ErrorBody {
            error: kind.as_str(),
            message: self.to_string(),
        };
        (status_for(kind), Json(body)).into_response()
    }
}

fn deployment_response(deployment: &RealmDeployment) -> Response {
    (StatusCode::OK, Json(DeploymentSummary::from(deployment))).into_response()
}

/// Resolve the tenant named in the request path.
///
/// Cached tenants are answered in place. A cache miss may block on the record
/// store, so it is resolved on the blocking pool.
#[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
pub async fn resolve_handler(State(state): State<AppState>, uri: Uri) -> Response {
    tracing::debug!("resolving tenant for {}", uri.path());

    let path = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string);

    if let Some(deployment) = state.registry.peek_path(&path) {
        return deployment_response(&deployment);
    }

    let registry = Arc::clone(&state.registry);
    let result = tokio::task::spawn_blocking(move || registry.resolve_path(&path)).await;

    match result {
        Ok(Ok(deployment)) => deployment_response(&deployment),
        Ok(Err(e)) => e.into_response(),
        Err(e) => {
            tracing::error!("tenant resolution task failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JsonDeploymentBuilder;
    use crate::provider::{InMemoryProvider, TenantRecord};
    use crate::tenant_path::PathExtractor;

    fn state_with(records: Vec<TenantRecord>) -> AppState {
        AppState {
            registry: Arc::new(RealmRegistry::new(
                PathExtractor::new("/tenants"),
                Arc::new(InMemoryProvider::with_records(records)),
                Arc::new(JsonDeploymentBuilder::new()),
            )),
        }
    }

    async fn call(state: AppState, uri: &'static str) -> (StatusCode, serde_json::Value) {
        let response = resolve_handler(State(state), Uri::from_static(uri)).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = serde_json::from_slice(&bytes).expect("JSON body");
        (status, body)
    }

    #[tokio::test]
    async fn test_handler_resolves_tenant() {
        let state = state_with(vec![TenantRecord::new(
            "acme",
            r#"{"realm":"acme","auth-server-url":"https://sso.example.com/auth","credentials":{"secret":"s3cr3t"}}"#,
        )]);

        let (status, body) = call(state, "/app/tenants/acme/login?next=%2F").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["realm"], "acme");
        assert_eq!(body["realm_url"], "https://sso.example.com/auth/realms/acme");
        assert_eq!(body["ssl_required"], "external");
        assert!(body.get("client_secret").is_none());
        assert!(!body.to_string().contains("s3cr3t"));
    }

    #[tokio::test]
    #[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
    async fn test_handler_serves_cached_tenant_without_refetch() {
        let provider = Arc::new(InMemoryProvider::with_records(vec![TenantRecord::new(
            "acme",
            r#"{"realm":"acme","resource":"v1"}"#,
        )]));
        let state = AppState {
            registry: Arc::new(RealmRegistry::new(
                PathExtractor::new("/tenants"),
                Arc::clone(&provider) as _,
                Arc::new(JsonDeploymentBuilder::new()),
            )),
        };

        let (status, body) = call(state.clone(), "/tenants/acme/login").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resource"], "v1");

        // A changed record is not observed once the tenant is cached.
        provider.upsert(TenantRecord::new("acme", r#"{"realm":"acme","resource":"v2"}"#));
        assert!(state.registry.peek_path("/tenants/acme").is_some());

        let (status, body) = call(state.clone(), "/tenants/acme/home?token=abc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resource"], "v1");
        assert_eq!(state.registry.len(), 1);
    }

    #[tokio::test]
    async fn test_handler_without_tenant_context() {
        let (status, body) = call(state_with(vec![]), "/app/login").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "no_tenant_context");
    }

    #[tokio::test]
    async fn test_handler_empty_tenant() {
        let (status, body) = call(state_with(vec![]), "/app/tenants/?x=1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_tenant");
    }

    #[tokio::test]
    async fn test_handler_unknown_tenant() {
        let (status, body) = call(state_with(vec![]), "/tenants/acme").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "tenant_unknown");
    }

    #[tokio::test]
    async fn test_handler_build_failure() {
        let state = state_with(vec![TenantRecord::new("acme", "{}")]);
        let (status, body) = call(state, "/tenants/acme").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "build_failed");
        assert!(body["message"].as_str().is_some_and(|m| m.contains("realm")));
    }

    #[test]
    fn test_status_for_kinds() {
        assert_eq!(status_for(ErrorKind::NoTenantContext), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::InvalidTenant), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::TenantUnknown), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::BuildFailed), StatusCode::BAD_GATEWAY);
    }
}
