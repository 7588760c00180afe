mod assistant;
mod cache_validator;
mod circuit_breaker;
mod config;
mod errors;
mod handlers;
mod llm_client;
mod models;
mod prompts;
mod quote;
mod report;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Serves the OpenAPI specification YAML file.
///
/// Reads `openapi.yml` from the filesystem and serves it with the
/// appropriate content type; 404 when the file is missing.
async fn serve_openapi_spec() -> impl IntoResponse {
    match tokio::fs::read_to_string("openapi.yml").await {
        Ok(content) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/yaml")],
            content,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "OpenAPI spec not found").into_response(),
    }
}

/// Serves the Swagger UI HTML page.
///
/// Returns an HTML shell that embeds Swagger UI, configured to load the
/// spec served by `serve_openapi_spec`.
async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Preventivatore API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.yml",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}

/// Main entry point for the application.
///
/// Initializes logging, configuration, the turn cache, the model client and
/// the HTTP routes (CORS, rate limiting, body limits), then starts the Axum
/// server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "preventivatore_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Turn cache: identical (message, profile) pairs within the TTL reuse
    // the validated model turn instead of paying for a second call.
    let turn_cache = Cache::builder()
        .time_to_live(Duration::from_secs(3600))
        .max_capacity(10_000)
        .build();
    tracing::info!("Turn cache initialized (1h TTL, 10k capacity)");

    // Initialize the Gemini client. A broken configuration leaves the
    // service up: chat turns degrade to the fallback reply.
    let llm = match llm_client::GeminiClient::new(
        config.gemini_base_url.clone(),
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    ) {
        Ok(client) => {
            tracing::info!(
                "✓ Gemini client initialized: {} ({})",
                config.gemini_base_url,
                config.gemini_model
            );
            Some(client)
        }
        Err(e) => {
            tracing::error!("Failed to initialize Gemini client: {}", e);
            None
        }
    };

    // Build application state
    let app_state = Arc::new(handlers::AppState {
        config: config.clone(),
        llm,
        llm_breaker: circuit_breaker::create_llm_circuit_breaker(),
        turn_cache,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        // API Documentation
        .route("/docs", get(serve_swagger_ui))
        .route("/api-docs/openapi.yml", get(serve_openapi_spec))
        // API endpoints
        .route("/api/v1/chat", post(handlers::chat_turn))
        .route("/api/v1/quote", post(handlers::compute_quote))
        .route("/api/v1/quote/document", post(handlers::quote_document))
        .route(
            "/api/v1/recommendations",
            post(handlers::recommendations),
        )
        .layer(
            ServiceBuilder::new()
                // Request size limit: 1MB max payload (chat turns are small)
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
