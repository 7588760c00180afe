use crate::assistant;
use crate::circuit_breaker::LlmCircuitBreaker;
use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::GeminiClient;
use crate::models::*;
use crate::quote;
use crate::report;
use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    extract::State,
    Json,
};
use chrono::Utc;
use moka::future::Cache;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the hosted model (optional; turns degrade to the
    /// fallback reply when absent).
    pub llm: Option<GeminiClient>,
    /// Circuit breaker guarding every model call.
    pub llm_breaker: LlmCircuitBreaker,
    /// Turn cache (1 hour TTL): checksummed, validated model turns keyed by
    /// SHA-256 of (message, profile).
    pub turn_cache: Cache<String, String>,
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "preventivatore-api",
            "version": "0.1.0"
        })),
    )
}

/// POST /api/v1/chat
///
/// Processes one chat turn: forwards the message to the model, merges the
/// extracted fields into the profile carried by the client, and attaches a
/// quote once the profile has enough data.
///
/// # Returns
///
/// * `Result<Json<ChatTurnResponse>, AppError>` - The assistant turn plus
///   the merged profile; 200 even when the model call degraded to the
///   fallback reply.
pub async fn chat_turn(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatTurnRequest>,
) -> Result<Json<ChatTurnResponse>, AppError> {
    require_api_key(&state, &headers)?;
    tracing::info!("POST /chat - message length: {}", payload.message.len());

    let prior = payload.profile.unwrap_or_default();
    let outcome = assistant::run_chat_turn(&state, &payload.message, prior).await?;

    tracing::info!(
        "Chat turn complete: intent={:?}, quote_attached={}",
        outcome.turn.user_intent,
        outcome.quote.is_some()
    );

    Ok(Json(ChatTurnResponse {
        turn: outcome.turn,
        profile: outcome.profile,
        quote: outcome.quote,
    }))
}

/// POST /api/v1/quote
///
/// Direct access to the deterministic calculator, no model involved.
/// A profile with neither consumption nor bill yields the all-zero
/// estimate, not an error.
pub async fn compute_quote(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(profile): Json<CustomerProfile>,
) -> Result<Json<quote::QuoteEstimate>, AppError> {
    require_api_key(&state, &headers)?;
    tracing::info!("POST /quote - profile: {:?}", profile);

    Ok(Json(quote::estimate(&profile)))
}

/// POST /api/v1/quote/document
///
/// Renders the downloadable quote document. The quote is recomputed from
/// the profile when the client does not supply one.
pub async fn quote_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<QuoteDocumentRequest>,
) -> Result<Response, AppError> {
    require_api_key(&state, &headers)?;

    let quote = payload
        .quote
        .unwrap_or_else(|| quote::estimate(&payload.profile));

    if quote.is_zero() {
        return Err(AppError::BadRequest(
            "Not enough data for a quote document: provide monthly_kwh or bill_eur".to_string(),
        ));
    }

    let reference = Uuid::new_v4();
    let document = report::render_quote_document(&payload.profile, &quote, Utc::now(), reference);
    tracing::info!(
        "Rendered quote document ({} chars, ref {})",
        document.len(),
        reference
    );

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                "text/markdown; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"preventivo-fotovoltaico.md\"".to_string(),
            ),
        ],
        document,
    )
        .into_response())
}

/// POST /api/v1/recommendations
///
/// Personalized follow-up action labels for the last turn. A model failure
/// degrades to an empty list; the UI simply shows no buttons.
pub async fn recommendations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(turn): Json<AssistantTurn>,
) -> Result<Json<Vec<String>>, AppError> {
    require_api_key(&state, &headers)?;

    match assistant::fetch_recommendations(&state, &turn).await {
        Ok(actions) => Ok(Json(actions)),
        Err(e) => {
            tracing::warn!("Recommendations degraded to empty list: {}", e);
            Ok(Json(vec![]))
        }
    }
}

/// Validates the `X-Api-Key` header when a key is configured.
///
/// Skipped entirely when `CHAT_API_KEY` is unset (open instance).
fn require_api_key(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(ref expected_key) = state.config.chat_api_key else {
        return Ok(());
    };

    let provided = headers
        .get("X-Api-Key")
        .or_else(|| headers.get("x-api-key"))
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing X-Api-Key header".to_string()))?;

    // Constant-time comparison to prevent timing attacks
    if !constant_time_compare(provided, expected_key) {
        tracing::warn!("Invalid API key received");
        return Err(AppError::Unauthorized("Invalid API key".to_string()));
    }

    Ok(())
}

/// Constant-time string comparison (basic implementation)
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
