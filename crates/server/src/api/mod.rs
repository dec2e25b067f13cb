//! HTTP surface of the alert engine.
//!
//! - `alerts` - Alert intake and acknowledgement (/api/alerts/*)
//! - `health` - Health check endpoint (/healthz)
//! - `openapi` - OpenAPI/Utoipa configuration

pub mod alerts;
pub mod health;
pub mod openapi;

pub use alerts::{ALERTS_TAG, AlertAppState};
pub use health::MISC_TAG;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// Assembles the router with API docs, CORS and request tracing.
pub fn app(alert_state: AlertAppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .merge(alerts::router(alert_state))
        .routes(routes!(health::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    router.merge(Redoc::with_url("/api-docs", api))
}

/// Starts the web server on `listen_addr`.
#[tracing::instrument(skip(alert_state))]
pub async fn start_webserver(alert_state: AlertAppState, listen_addr: &str) -> color_eyre::Result<()> {
    let router = app(alert_state);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(
        name = "api.server.listening",
        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
        addr = %listen_addr,
        message = "Server running"
    );
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
