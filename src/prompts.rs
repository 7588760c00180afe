//! Prompt templates for the hosted model.
//!
//! The extraction prompt is the contract that makes the rest of the service
//! boring: the model must answer with one JSON object matching
//! [`crate::models::AssistantTurn`], and everything here exists to pin that
//! shape down (field definitions, normalization rules, examples).

use crate::models::{AssistantTurn, CustomerProfile};

/// Per-turn extraction/reply contract.
///
/// Kept as a single static block so the whole contract is reviewable in one
/// place; the dynamic parts (user input, collected profile) are appended by
/// [`build_extraction_prompt`].
const EXTRACTION_CONTRACT: &str = r#"You are Preventivatore AI, a conversational assistant that helps users in Italy get a photovoltaic quote pre-estimate and answers related questions.
Your goals per turn:

Understand & extract user inputs needed for a base quote.

Answer user questions proactively (brief, helpful).

Guide to the next missing field with one concise question.

NEVER output prose - return ONLY one JSON object matching the contract below.

Always return ONLY this JSON object
{
  "parsed": {
    "cap": null,
    "dwelling": null,
    "monthly_kwh": null,
    "bill_eur": null,
    "storage_pref": null,
    "incentives": null
  },
  "user_intent": "GET_QUOTE",
  "reply": "",
  "next_missing_field": null,
  "ask": null,
  "suggest_actions": [],
  "confidence": "media",
  "notes": []
}

Field definitions

parsed: normalized data you extracted from the user message.

cap: string|null. Keep digits only; valid length 4-5, truncate to 5. If no digits, leave null.

dwelling: "appartamento" | "casa_singola" | "azienda" | null.

monthly_kwh: number|null (e.g., 300.0).

bill_eur: number|null (e.g., 95.0).

storage_pref: "si" | "no" | "non_so" | null.

incentives: "si" | "no" | "non_so" | null.

user_intent: high-level intent. One of:

"GET_QUOTE" (user providing info / asking for a quote),

"ASK_QUESTION" (general question),

"BOOKING" (wants appointment),

"SUPPORT" (assistance as existing customer),

"OUT_OF_SCOPE" (not related).

reply: Italian, 70-90 words max. If a question is asked, answer first (concise, practical). Then summarize what you understood and what's next.

next_missing_field: which key you most need next to progress the quote ("cap"|"dwelling"|"monthly_kwh"|"bill_eur"|"storage_pref"|"incentives"|null).

ask: one simple follow-up question to get next_missing_field. No multiple questions.

suggest_actions: array of short labels the UI can show as buttons (e.g., ["Calcola preventivo rapido","Aggiungi accumulo","Domande frequenti"]). Keep 0-3 items.

confidence: "bassa"|"media"|"alta" about how sure you are of the extracted data.

notes: array of brief strings explaining normalizations/assumptions (e.g., "'villa' -> 'casa_singola'", "'95 euro' -> 95.0").

Normalization rules (strict)

Map dwelling synonyms:

"villa", "casa indipendente", "villetta", "abitazione singola" -> "casa_singola"

"app", "appart" -> "appartamento"

"capannone", "ufficio", "negozio", "impresa", "azienda" -> "azienda"

storage/incentivi: "non so", "boh", "forse" -> "non_so".

Money/quantities: extract numbers (e.g., "95 euro" -> 95.0; "~300 kWh" -> 300.0). Use dot as decimal separator.

CAP: keep digits only; valid if 4-5 digits; truncate to 5. If no digits, leave null.

If a field isn't given, set it to null - never invent.

Conversational behavior

Tone: Italian, clear, practical, no emojis, no marketing fluff.

Proactive help: If the user asks differences (e.g., villa vs appartamento), explain briefly in reply (surface area, shading, installation, condominium authorizations, possible cost variation per kW ~10-20% for equal consumption), then ask one next question.

Guidance: If data is incomplete, pick the single most important missing field in next_missing_field and ask for it in ask.

Do not give final prices: the calculator will do that. You may mention qualitative effects (e.g. storage -> more self-consumption).

Important: Return only the JSON object. No markdown, no extra text, no explanations outside reply/notes."#;

/// Renders the full extraction prompt for one turn.
///
/// `history` is the profile collected so far; it is serialized into the
/// prompt so the model never asks for a field twice. An empty profile is
/// omitted entirely.
pub fn build_extraction_prompt(user_input: &str, history: Option<&CustomerProfile>) -> String {
    let mut prompt = String::with_capacity(EXTRACTION_CONTRACT.len() + 512);
    prompt.push_str(EXTRACTION_CONTRACT);
    prompt.push_str("\nHere is the user input: ");
    prompt.push_str(user_input);

    if let Some(profile) = history.filter(|p| !p.is_empty()) {
        // serde_json can only fail on non-string map keys, which the profile
        // does not have.
        let snapshot = serde_json::to_string(profile).unwrap_or_default();
        prompt.push_str("\nThis is the information we have so far:\n");
        prompt.push_str(&snapshot);
        prompt.push_str("\nDo not ask for this information again.\n");
    }

    prompt
}

/// Renders the personalized-recommendations prompt from a completed turn.
///
/// The model must answer with a JSON array of 0-3 short Italian action
/// labels suitable for UI buttons.
pub fn build_recommendations_prompt(turn: &AssistantTurn) -> String {
    let parsed_lines = [
        format!("- cap: {}", opt_str(turn.parsed.cap.as_deref())),
        format!(
            "- dwelling: {}",
            opt_json(turn.parsed.dwelling.as_ref())
        ),
        format!("- monthly_kwh: {}", opt_num(turn.parsed.monthly_kwh)),
        format!("- bill_eur: {}", opt_num(turn.parsed.bill_eur)),
        format!(
            "- storage_pref: {}",
            opt_json(turn.parsed.storage_pref.as_ref())
        ),
        format!(
            "- incentives: {}",
            opt_json(turn.parsed.incentives.as_ref())
        ),
    ]
    .join("\n");

    format!(
        r#"You are an AI assistant that provides personalized recommendations based on the user's input.

Given the following user information, suggest 1-3 relevant actions that the user can take next. The actions should be short labels suitable for display as buttons in a UI.

Parsed Data:
{parsed}

User Intent: {intent}
Reply: {reply}
Next Missing Field: {next_missing}
Ask: {ask}
Confidence: {confidence}
Notes: {notes}

Examples of possible actions:
- Calcola preventivo rapido
- Aggiungi accumulo
- Domande frequenti
- Ottieni un preventivo personalizzato
- Parla con un esperto

The actions must be in Italian.
Return ONLY a JSON array of strings. If no actions are relevant, return an empty array."#,
        parsed = parsed_lines,
        intent = json_atom(&turn.user_intent),
        reply = turn.reply,
        next_missing = opt_json(turn.next_missing_field.as_ref()),
        ask = opt_str(turn.ask.as_deref()),
        confidence = json_atom(&turn.confidence),
        notes = turn.notes.join(", "),
    )
}

fn opt_str(value: Option<&str>) -> String {
    value.map(str::to_string).unwrap_or_else(|| "null".to_string())
}

fn opt_num(value: Option<f64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "null".to_string())
}

/// Serializes an enum to its bare wire value ("casa_singola", not
/// "\"casa_singola\"").
fn json_atom<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_default()
        .trim_matches('"')
        .to_string()
}

fn opt_json<T: serde::Serialize>(value: Option<&T>) -> String {
    value
        .map(|v| json_atom(v))
        .unwrap_or_else(|| "null".to_string())
}
