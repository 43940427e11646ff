use std::sync::Arc;

use anyhow::Context;
use kube::config::{KubeConfigOptions, Kubeconfig};
use pod_orchestrator::{
    config::{AppConfig, KubernetesConfig},
    grpc::GrpcService,
    http,
    service::PodService,
    state::AppState,
    storage::{DeploymentStore, PodStore},
};
use proto::pod::orchestrator::v1::pod_service_server::PodServiceServer;
use tower::ServiceBuilder;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(&config.server.log_level)
            }),
        )
        .init();

    info!("Starting Pod Orchestrator (gRPC + gRPC-Web)");
    info!("Configuration loaded:");
    info!("  Server: {}:{}", config.server.host, config.server.port);
    info!("  Log level: {}", config.server.log_level);
    info!("  Max concurrent requests: {}", config.server.max_concurrent_requests);
    info!("  Database: {}", config.database.url);
    if let Some(ctx) = &config.kubernetes.context {
        info!("  Kubernetes context: {}", ctx);
    }
    if let Some(path) = &config.kubernetes.kubeconfig {
        info!("  Kubeconfig: {}", path.display());
    }

    let kube_client = kube_client(&config.kubernetes)
        .await
        .context("Failed to initialize Kubernetes client")?;
    info!("Kubernetes client initialized");

    let pod_store = PodStore::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    if config.database.migrate {
        info!("Migrating database schema");
        pod_store
            .migrate()
            .await
            .context("Failed to migrate database schema")?;
    }
    info!("Database ready");

    let pod_service = PodService::new(
        Arc::new(pod_store.clone()),
        Arc::new(DeploymentStore::new(kube_client)),
    );
    let state = AppState {
        pod_service,
        pod_store,
    };

    let grpc_server = PodServiceServer::new(GrpcService::new(state.clone()));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    let grpc_service_with_web = ServiceBuilder::new()
        .layer(GlobalConcurrencyLimitLayer::new(
            config.server.max_concurrent_requests,
        ))
        .layer(tonic_web::GrpcWebLayer::new())
        .service(grpc_server);

    let app = http::router()
        .with_state(state)
        .fallback_service(grpc_service_with_web);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {} (HTTP + gRPC-Web)", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.layer(cors))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn kube_client(config: &KubernetesConfig) -> anyhow::Result<kube::Client> {
    if config.context.is_none() && config.kubeconfig.is_none() {
        return Ok(kube::Client::try_default().await?);
    }

    let options = KubeConfigOptions {
        context: config.context.clone(),
        ..Default::default()
    };
    let kube_config = match &config.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &options).await?
        }
        None => kube::Config::from_kubeconfig(&options).await?,
    };
    Ok(kube::Client::try_from(kube_config)?)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
