/// Shared turn-processing logic for the chat and recommendations handlers.
///
/// This module owns the per-turn workflow:
/// 1. Validate the incoming message
/// 2. Look up the turn cache (checksummed entries)
/// 3. Call the hosted model through the circuit breaker
/// 4. Parse and coerce the model JSON into a typed turn
/// 5. Merge extracted fields into the running profile
/// 6. Attach the deterministic quote once enough data is present
///
/// Any model-side failure degrades to a fixed Italian fallback turn; the
/// chat endpoint never surfaces a 5xx for a broken model call.
use crate::cache_validator::ChecksummedEntry;
use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::{AssistantTurn, Confidence, CustomerProfile, UserIntent};
use crate::prompts;
use crate::quote::{self, QuoteEstimate};
use failsafe::futures::CircuitBreaker;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Reply served when the model call fails, matching the tone of the
/// assistant's normal Italian replies.
pub const FALLBACK_REPLY: &str =
    "Mi dispiace, si è verificato un errore. Per favore, riprova più tardi.";

/// UI button labels are capped regardless of what the model suggests.
pub const MAX_SUGGEST_ACTIONS: usize = 3;

/// Result of one processed chat turn.
#[derive(Debug)]
pub struct ChatTurnOutcome {
    pub turn: AssistantTurn,
    pub profile: CustomerProfile,
    pub quote: Option<QuoteEstimate>,
}

/// The degraded turn used when the model is unreachable or answers garbage.
///
/// Intent is `OUT_OF_SCOPE` and the parsed fragment is empty, so merging it
/// into the profile is a no-op.
pub fn fallback_turn() -> AssistantTurn {
    AssistantTurn {
        parsed: CustomerProfile::default(),
        user_intent: UserIntent::OutOfScope,
        reply: FALLBACK_REPLY.to_string(),
        next_missing_field: None,
        ask: None,
        suggest_actions: vec![],
        confidence: Confidence::Bassa,
        notes: vec!["An error occurred on the server.".to_string()],
    }
}

/// Normalizes a CAP the way the prompt demands: digits only, 4-5 of them,
/// truncated to 5. Anything else is dropped.
pub fn normalize_cap(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }
    Some(digits[..digits.len().min(5)].to_string())
}

/// Applies the defensive coercions to a freshly parsed turn.
///
/// The prompt states these rules, but the model occasionally violates them:
/// over-long CAPs, negative quantities, more than three suggested actions.
pub fn sanitize_turn(turn: &mut AssistantTurn) {
    turn.parsed.cap = turn.parsed.cap.as_deref().and_then(normalize_cap);
    turn.parsed.monthly_kwh = turn.parsed.monthly_kwh.filter(|v| v.is_finite() && *v > 0.0);
    turn.parsed.bill_eur = turn.parsed.bill_eur.filter(|v| v.is_finite() && *v > 0.0);
    turn.suggest_actions.truncate(MAX_SUGGEST_ACTIONS);
}

/// Strips a surrounding markdown code fence, if any.
///
/// Models wrap JSON in ```json fences no matter how firmly the prompt says
/// not to.
pub fn extract_json_payload(raw: &str) -> String {
    let fence = Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").unwrap();
    match fence.captures(raw) {
        Some(caps) => caps[1].to_string(),
        None => raw.trim().to_string(),
    }
}

/// Parses the model's raw answer into a validated, sanitized turn.
pub fn parse_assistant_turn(raw: &str) -> Result<AssistantTurn, AppError> {
    let payload = extract_json_payload(raw);
    let mut turn: AssistantTurn = serde_json::from_str(&payload).map_err(|e| {
        AppError::InvalidModelOutput(format!("Turn contract violation: {}", e))
    })?;
    sanitize_turn(&mut turn);
    Ok(turn)
}

/// Cache key for one (message, profile) pair.
///
/// The prior profile is part of the key: the same message yields a different
/// prompt (and so a different turn) depending on what is already collected.
pub fn turn_cache_key(message: &str, profile: &CustomerProfile) -> String {
    let snapshot = serde_json::to_string(profile).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    hasher.update(b"\n");
    hasher.update(snapshot.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether the response should carry a quote estimate.
///
/// The profile must have usable energy data, and either the model reports
/// nothing left to ask or the user is explicitly asking for the quote.
pub fn should_attach_quote(turn: &AssistantTurn, merged: &CustomerProfile) -> bool {
    merged.has_energy_data()
        && (turn.next_missing_field.is_none() || turn.user_intent == UserIntent::GetQuote)
}

/// Complete workflow for one chat turn.
///
/// Errors only on caller mistakes (blank message); model-side failures
/// degrade to [`fallback_turn`] so the conversation keeps flowing.
pub async fn run_chat_turn(
    state: &Arc<AppState>,
    message: &str,
    prior: CustomerProfile,
) -> Result<ChatTurnOutcome, AppError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("message cannot be empty".to_string()));
    }

    let cache_key = turn_cache_key(message, &prior);

    let cached_turn = match state.turn_cache.get(&cache_key).await {
        Some(serialized) => ChecksummedEntry::open(&serialized)
            .and_then(|payload| serde_json::from_str::<AssistantTurn>(&payload).ok()),
        None => None,
    };

    let turn = match cached_turn {
        Some(turn) => {
            tracing::debug!("Turn cache HIT (validated)");
            turn
        }
        None => match fetch_turn_from_model(state, message, &prior).await {
            Ok(turn) => {
                // Cache only turns that came back well-formed.
                if let Ok(payload) = serde_json::to_string(&turn) {
                    let entry = ChecksummedEntry::seal(payload);
                    state.turn_cache.insert(cache_key, entry.serialize()).await;
                }
                turn
            }
            Err(e) => {
                tracing::error!("Chat turn degraded to fallback: {}", e);
                fallback_turn()
            }
        },
    };

    let profile = prior.merge(&turn.parsed);
    let quote = should_attach_quote(&turn, &profile).then(|| quote::estimate(&profile));

    Ok(ChatTurnOutcome {
        turn,
        profile,
        quote,
    })
}

/// Renders the extraction prompt and runs it through breaker + model.
async fn fetch_turn_from_model(
    state: &Arc<AppState>,
    message: &str,
    prior: &CustomerProfile,
) -> Result<AssistantTurn, AppError> {
    let prompt = prompts::build_extraction_prompt(message, Some(prior));
    let raw = call_model(state, &prompt).await?;
    parse_assistant_turn(&raw)
}

/// Personalized follow-up actions for a completed turn.
///
/// Returns at most [`MAX_SUGGEST_ACTIONS`] Italian labels. The caller is
/// expected to degrade to an empty list on error.
pub async fn fetch_recommendations(
    state: &Arc<AppState>,
    turn: &AssistantTurn,
) -> Result<Vec<String>, AppError> {
    let prompt = prompts::build_recommendations_prompt(turn);
    let raw = call_model(state, &prompt).await?;

    let payload = extract_json_payload(&raw);
    let mut actions: Vec<String> = serde_json::from_str(&payload).map_err(|e| {
        AppError::InvalidModelOutput(format!("Recommendations contract violation: {}", e))
    })?;
    actions.retain(|a| !a.trim().is_empty());
    actions.truncate(MAX_SUGGEST_ACTIONS);
    Ok(actions)
}

/// One breaker-guarded model call.
///
/// A rejected call (breaker open) is reported as an external API error so
/// callers treat it exactly like a failed HTTP request.
async fn call_model(state: &Arc<AppState>, prompt: &str) -> Result<String, AppError> {
    let client = state.llm.as_ref().ok_or_else(|| {
        AppError::ExternalApiError("Assistant model client not configured".to_string())
    })?;

    state
        .llm_breaker
        .call(client.generate(prompt))
        .await
        .map_err(|e| match e {
            failsafe::Error::Inner(inner) => inner,
            failsafe::Error::Rejected => AppError::ExternalApiError(
                "Assistant temporarily unavailable (circuit open)".to_string(),
            ),
        })
}
