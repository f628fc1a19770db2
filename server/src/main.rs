#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code to prevent panics on bad configuration.
// Test code is allowed to use unwrap() for convenience.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::net::SocketAddr;
use std::sync::Arc;

use realm_server::{
    RealmRegistry,
    auth::JsonDeploymentBuilder,
    config::ServerConfig,
    http::{AppState, router},
    provider::DirectoryProvider,
    tenant_path::PathExtractor,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "realm_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: tenant_path_marker={}, tenant_directory={}, listen_port={}",
        config.tenant_path_marker,
        config.tenant_directory.display(),
        config.listen_port
    );

    if !config.tenant_directory.is_dir() {
        tracing::warn!(
            "Tenant directory {} does not exist; every tenant will be unknown until it is created",
            config.tenant_directory.display()
        );
    }

    // Deployments are built on first use per tenant and cached for the process lifetime
    let extractor = PathExtractor::new(&config.tenant_path_marker);
    let registry = Arc::new(RealmRegistry::new(
        extractor,
        Arc::new(DirectoryProvider::new(config.tenant_directory.clone())),
        Arc::new(JsonDeploymentBuilder::new()),
    ));

    let app = router(AppState { registry });

    let addr = SocketAddr::from(([127, 0, 0, 1], config.listen_port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    });
}
