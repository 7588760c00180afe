use crate::errors::AppError;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Client for the Gemini `generateContent` REST endpoint.
///
/// The only outbound dependency of the service. One prompt in, one text
/// candidate out; everything else (JSON contract enforcement, caching,
/// breaker) lives in the `assistant` module.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

// ============ Response payload (typed, partial) ============
//
// Only the fields we consume; the API returns much more (safety ratings,
// usage metadata) which serde ignores.

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    /// Creates a new `GeminiClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API origin, e.g. `https://generativelanguage.googleapis.com`.
    /// * `api_key` - The API key, sent as the `key` query parameter.
    /// * `model` - Model identifier, e.g. `gemini-2.5-flash`.
    pub fn new(base_url: String, api_key: String, model: String) -> Result<Self, AppError> {
        // Validate up front so a bad env var fails at startup, not per turn.
        url::Url::parse(&base_url)
            .map_err(|e| AppError::ExternalApiError(format!("Invalid Gemini base URL: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create Gemini client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    /// Sends one prompt and returns the first candidate's text.
    ///
    /// # Arguments
    ///
    /// * `prompt` - The fully rendered prompt for this turn.
    pub async fn generate(&self, prompt: &str) -> Result<String, AppError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        tracing::debug!("Calling Gemini model '{}' (key=[REDACTED])", self.model);

        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Gemini returned {}: {}",
                status, error_text
            )));
        }

        let payload: GenerateContentResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Gemini response: {}", e))
        })?;

        let text = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                AppError::InvalidModelOutput("Gemini response contained no candidates".to_string())
            })?;

        tracing::debug!("Gemini candidate length: {} chars", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GeminiClient::new(
            "https://example.com".to_string(),
            "key".to_string(),
            "gemini-2.5-flash".to_string(),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_rejects_invalid_base_url() {
        let client = GeminiClient::new(
            "not a url".to_string(),
            "key".to_string(),
            "gemini-2.5-flash".to_string(),
        );
        assert!(client.is_err());
    }

    #[test]
    fn test_response_parsing_extracts_first_candidate() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"ok\":true}"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.candidates.len(), 2);
        let text: String = parsed.candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts
            .iter()
            .map(|p| p.text.clone())
            .collect();
        assert_eq!(text, r#"{"ok":true}"#);
    }
}
