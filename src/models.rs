use crate::quote::QuoteEstimate;
use serde::{Deserialize, Serialize};

// ============ Domain Enumerations ============

/// Type of dwelling the installation is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dwelling {
    Appartamento,
    CasaSingola,
    Azienda,
}

impl Dwelling {
    /// Human-readable Italian label, used in the quote document.
    pub fn label(&self) -> &'static str {
        match self {
            Dwelling::Appartamento => "Appartamento",
            Dwelling::CasaSingola => "Casa Singola",
            Dwelling::Azienda => "Azienda",
        }
    }
}

/// Three-state answer for storage/incentives questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preference {
    Si,
    No,
    NonSo,
}

/// High-level intent of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserIntent {
    GetQuote,
    AskQuestion,
    Booking,
    Support,
    OutOfScope,
}

/// Model's self-reported confidence about the extracted fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Bassa,
    Media,
    Alta,
}

/// Profile fields the assistant can still ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Cap,
    Dwelling,
    MonthlyKwh,
    BillEur,
    StoragePref,
    Incentives,
}

// ============ Customer Profile ============

/// The profile accumulated across chat turns.
///
/// Every field is optional: each turn contributes a fragment and the fold in
/// [`CustomerProfile::merge`] combines fragments into the running state. The
/// caller carries the profile between requests; the service holds nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    /// Postal code, digits only, length 4-5.
    pub cap: Option<String>,
    /// Type of dwelling.
    pub dwelling: Option<Dwelling>,
    /// Monthly energy consumption in kWh.
    pub monthly_kwh: Option<f64>,
    /// Monthly bill amount in EUR.
    pub bill_eur: Option<f64>,
    /// Storage preference.
    pub storage_pref: Option<Preference>,
    /// Incentives preference.
    pub incentives: Option<Preference>,
}

impl CustomerProfile {
    /// Folds an incoming fragment into this profile.
    ///
    /// Non-null incoming fields overwrite, null fields preserve the prior
    /// value. Returns the merged profile; neither input is mutated.
    pub fn merge(&self, incoming: &CustomerProfile) -> CustomerProfile {
        CustomerProfile {
            cap: incoming.cap.clone().or_else(|| self.cap.clone()),
            dwelling: incoming.dwelling.or(self.dwelling),
            monthly_kwh: incoming.monthly_kwh.or(self.monthly_kwh),
            bill_eur: incoming.bill_eur.or(self.bill_eur),
            storage_pref: incoming.storage_pref.or(self.storage_pref),
            incentives: incoming.incentives.or(self.incentives),
        }
    }

    /// True when the calculator can produce a non-trivial estimate.
    ///
    /// Zero is deliberately treated the same as absent, matching the
    /// derivation rules of the quote calculator.
    pub fn has_energy_data(&self) -> bool {
        self.monthly_kwh.is_some_and(|v| v > 0.0) || self.bill_eur.is_some_and(|v| v > 0.0)
    }

    /// True when no field is set at all.
    pub fn is_empty(&self) -> bool {
        self.cap.is_none()
            && self.dwelling.is_none()
            && self.monthly_kwh.is_none()
            && self.bill_eur.is_none()
            && self.storage_pref.is_none()
            && self.incentives.is_none()
    }

    /// Fields still missing from the profile, in asking order.
    pub fn missing_fields(&self) -> Vec<ProfileField> {
        let mut missing = Vec::new();
        if self.cap.is_none() {
            missing.push(ProfileField::Cap);
        }
        if self.dwelling.is_none() {
            missing.push(ProfileField::Dwelling);
        }
        if self.monthly_kwh.is_none() {
            missing.push(ProfileField::MonthlyKwh);
        }
        if self.bill_eur.is_none() {
            missing.push(ProfileField::BillEur);
        }
        if self.storage_pref.is_none() {
            missing.push(ProfileField::StoragePref);
        }
        if self.incentives.is_none() {
            missing.push(ProfileField::Incentives);
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

// ============ Assistant Turn (model boundary contract) ============

/// One validated turn of the assistant, as returned by the hosted model.
///
/// This is the JSON contract the extraction prompt demands; parsing is strict
/// (unknown enum values are rejected) and tolerable deviations are coerced
/// afterwards, see `assistant::sanitize_turn`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantTurn {
    /// Extracted and normalized data from the user message.
    pub parsed: CustomerProfile,
    /// The intent of the user.
    pub user_intent: UserIntent,
    /// A reply to the user in Italian.
    pub reply: String,
    /// The next missing field to progress the quote.
    #[serde(default)]
    pub next_missing_field: Option<ProfileField>,
    /// A follow-up question to get the next missing field.
    #[serde(default)]
    pub ask: Option<String>,
    /// Short labels for UI buttons, at most three.
    #[serde(default)]
    pub suggest_actions: Vec<String>,
    /// Confidence level of extracted data.
    pub confidence: Confidence,
    /// Notes explaining normalizations/assumptions.
    #[serde(default)]
    pub notes: Vec<String>,
}

// ============ API Request/Response Models ============

/// Request payload for one chat turn.
#[derive(Debug, Deserialize)]
pub struct ChatTurnRequest {
    /// The raw user message.
    pub message: String,
    /// Profile collected so far, absent on the first turn.
    #[serde(default)]
    pub profile: Option<CustomerProfile>,
}

/// Response payload for one chat turn.
#[derive(Debug, Serialize)]
pub struct ChatTurnResponse {
    /// The assistant turn (reply, extraction, follow-up question).
    #[serde(flatten)]
    pub turn: AssistantTurn,
    /// The merged profile the client should carry into the next turn.
    pub profile: CustomerProfile,
    /// Attached once the profile carries enough data for an estimate.
    pub quote: Option<QuoteEstimate>,
}

/// Request payload for quote document rendering.
#[derive(Debug, Deserialize)]
pub struct QuoteDocumentRequest {
    pub profile: CustomerProfile,
    /// Recomputed from the profile when absent.
    #[serde(default)]
    pub quote: Option<QuoteEstimate>,
}
