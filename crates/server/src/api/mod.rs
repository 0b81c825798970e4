//! API module providing HTTP endpoints for the classroom notifier.
//!
//! This module is organized into submodules:
//! - `notifications` - Notification dispatch trigger (/notifications/*)
//! - `verification` - Verification code endpoints (/verification/*)
//! - `health` - Health check endpoint (/healthz)
//! - `openapi` - OpenAPI/Utoipa configuration

pub mod health;
pub mod notifications;
pub mod openapi;
pub mod verification;

// Re-export commonly used items
pub use health::MISC_TAG;
pub use notifications::NOTIFICATIONS_TAG;
pub use verification::VERIFICATION_TAG;

use crate::AppResources;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// Starts the web server with all configured routes.
#[tracing::instrument(skip(app_resources))]
pub async fn start_webserver(app_resources: AppResources) -> color_eyre::Result<()> {
    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .nest("/notifications", notifications::router())
        .nest("/verification", verification::router())
        .routes(routes!(health::health))
        // Attach application resources, CORS and the standard TraceLayer.
        .layer(axum::Extension(app_resources))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    let router = router.merge(Redoc::with_url("/api-docs", api));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info_span!("Server running", addr = "0.0.0.0:8080");
    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
