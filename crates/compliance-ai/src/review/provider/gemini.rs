use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{
    compliance_prompt, locate_findings, parse_findings, status_error, transport_error,
    ComplianceProvider, ProviderError,
};
use crate::review::domain::{ComplianceReference, Document, Issue};

const BACKEND: &str = "gemini";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Adapter for the Google Generative Language API. The multimodal model
/// consumes the document text directly and returns structured findings as
/// JSON, which are then anchored to byte offsets locally.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_base: String,
}

impl GeminiProvider {
    /// Credentials come from the adapter's own environment namespace:
    /// `GEMINI_API_KEY`, optional `GEMINI_MODEL` and `GEMINI_API_BASE`.
    pub fn from_env() -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: env::var("GEMINI_API_KEY").ok().filter(|key| !key.is_empty()),
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            api_base: env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
        }
    }

    async fn generate(&self, prompt: String) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| ProviderError::Internal {
            backend: BACKEND,
            detail: "GEMINI_API_KEY is not configured".to_string(),
        })?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0,
                "responseMimeType": "application/json",
            },
        });

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .timeout(CALL_TIMEOUT)
            .send()
            .await
            .map_err(|err| transport_error(BACKEND, err))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|err| transport_error(BACKEND, err))?;
        if !status.is_success() {
            return Err(status_error(BACKEND, status, &payload));
        }

        let reply: GenerateContentResponse =
            serde_json::from_str(&payload).map_err(|err| ProviderError::UpstreamRejected {
                backend: BACKEND,
                detail: format!("malformed generateContent response: {err}"),
            })?;

        let text = reply
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::UpstreamRejected {
                backend: BACKEND,
                detail: "response carried no candidate text".to_string(),
            });
        }

        Ok(text)
    }
}

#[async_trait]
impl ComplianceProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn analyze(
        &self,
        document: &Document,
        reference: &ComplianceReference,
    ) -> Result<Vec<Issue>, ProviderError> {
        if document.content.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = compliance_prompt(&document.content, reference);
        let reply = self.generate(prompt).await?;
        let findings = parse_findings(BACKEND, &reply)?;
        Ok(locate_findings(BACKEND, &document.content, findings))
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}
