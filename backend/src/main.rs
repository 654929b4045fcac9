//! Main entry point for the login service.
//!
//! This file initializes tracing, the database pool and the account
//! directory, registers the instance with the naming service, and serves
//! the authentication routes until a shutdown signal arrives.

mod api;
mod auth;
mod config;
mod database;
mod errors;
mod repositories;
mod services;
mod utils;

use crate::api::common::ApiResponse;
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    http::{HeaderName, HeaderValue, Method, header},
    response::Json,
    routing::get,
};
use config::Config;
use database::Database;
use repositories::account_repository::AccountRepository;
use services::account_directory::AccountDirectory;
use services::registry_client::{NacosRegistry, ServiceInstance};
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use utils::token::OsRngTokenGenerator;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "login_service=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let db = Database::new(&config).await?;

    let directory = Arc::new(AccountDirectory::new(
        Arc::new(AccountRepository::new(db.pool().clone())),
        Arc::new(OsRngTokenGenerator),
    ));

    let registry = match &config.nacos_server_addr {
        Some(addr) => {
            let registry = Arc::new(NacosRegistry::new(
                addr.clone(),
                ServiceInstance::from_config(&config),
            ));
            registry
                .register()
                .await
                .context("failed to register service instance")?;
            Some(registry)
        }
        None => {
            info!("NACOS_SERVER_ADDR not set, skipping service registration");
            None
        }
    };
    let heartbeat = registry.clone().map(NacosRegistry::spawn_heartbeat);

    let app = build_router(directory, cors_layer(&config.cors_allowed_origins)?);

    let bind_address = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;

    info!("Starting login service on port {}", config.server_port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(heartbeat) = heartbeat {
        heartbeat.abort();
    }
    if let Some(registry) = registry {
        if let Err(e) = registry.deregister().await {
            warn!(error = %e, "Failed to deregister service instance");
        }
    }
    db.close().await;

    info!("Login service stopped");
    Ok(())
}

fn build_router(directory: Arc<AccountDirectory>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(root_handler))
        .merge(auth::routes::auth_router())
        .layer(Extension(directory))
        .layer(cors)
}

/// Cross-origin policy for the browser front end.
fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin {}", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-user-id"),
        ]))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}

async fn root_handler() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        serde_json::json!({
            "service": "login-service",
            "version": env!("CARGO_PKG_VERSION")
        }),
        "Welcome to the login service",
    ))
}
