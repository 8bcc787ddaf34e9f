use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{
    compliance_prompt, locate_findings, parse_findings, status_error, transport_error,
    ComplianceProvider, ProviderError,
};
use crate::review::domain::{ComplianceReference, Document, Issue};

const BACKEND: &str = "azure";
const DEFAULT_OPENAI_API_VERSION: &str = "2024-06-01";
const DEFAULT_DEPLOYMENT: &str = "gpt-4o";
const DOCINTEL_API_VERSION: &str = "2024-07-31-preview";
const CALL_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_secs(1);
const POLL_ATTEMPTS: u32 = 20;

/// Formats whose `content` is carried as a base64 payload and must go
/// through text extraction before analysis.
const BINARY_FORMATS: [&str; 6] = ["pdf", "png", "jpg", "jpeg", "tiff", "docx"];

/// Adapter for the Azure stack: Document Intelligence `prebuilt-read` for
/// text extraction of binary payloads, Azure OpenAI chat completions for
/// the compare step.
pub struct AzureProvider {
    http: reqwest::Client,
    analysis: Option<AnalysisConfig>,
    extraction: Option<ExtractionConfig>,
}

struct AnalysisConfig {
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
}

struct ExtractionConfig {
    endpoint: String,
    api_key: String,
}

impl AzureProvider {
    /// Credentials come from the adapter's own environment namespaces:
    /// `AZURE_OPENAI_*` for the compare step, `AZURE_DOCINTEL_*` for the
    /// extraction step. Construction never fails; missing credentials
    /// surface as `Internal` errors at call time.
    pub fn from_env() -> Self {
        let analysis = match (
            env::var("AZURE_OPENAI_ENDPOINT").ok().filter(|v| !v.is_empty()),
            env::var("AZURE_OPENAI_API_KEY").ok().filter(|v| !v.is_empty()),
        ) {
            (Some(endpoint), Some(api_key)) => Some(AnalysisConfig {
                endpoint,
                api_key,
                deployment: env::var("AZURE_OPENAI_DEPLOYMENT")
                    .unwrap_or_else(|_| DEFAULT_DEPLOYMENT.to_string()),
                api_version: env::var("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|_| DEFAULT_OPENAI_API_VERSION.to_string()),
            }),
            _ => None,
        };

        let extraction = match (
            env::var("AZURE_DOCINTEL_ENDPOINT").ok().filter(|v| !v.is_empty()),
            env::var("AZURE_DOCINTEL_API_KEY").ok().filter(|v| !v.is_empty()),
        ) {
            (Some(endpoint), Some(api_key)) => Some(ExtractionConfig { endpoint, api_key }),
            _ => None,
        };

        Self {
            http: reqwest::Client::new(),
            analysis,
            extraction,
        }
    }

    /// Extract text from a base64 payload with `prebuilt-read`. The
    /// operation is asynchronous on the Azure side: submit, then poll the
    /// Operation-Location until it succeeds or the bounded attempts run out.
    async fn extract_text(&self, base64_content: &str) -> Result<String, ProviderError> {
        let extraction = self.extraction.as_ref().ok_or_else(|| ProviderError::Internal {
            backend: BACKEND,
            detail: "AZURE_DOCINTEL_ENDPOINT/AZURE_DOCINTEL_API_KEY are not configured".to_string(),
        })?;

        let url = format!(
            "{}/documentintelligence/documentModels/prebuilt-read:analyze?api-version={}",
            extraction.endpoint.trim_end_matches('/'),
            DOCINTEL_API_VERSION
        );
        let response = self
            .http
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &extraction.api_key)
            .json(&json!({ "base64Source": base64_content }))
            .timeout(CALL_TIMEOUT)
            .send()
            .await
            .map_err(|err| transport_error(BACKEND, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(BACKEND, status, &body));
        }

        let operation_url = response
            .headers()
            .get("operation-location")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::UpstreamRejected {
                backend: BACKEND,
                detail: "analyze accepted without an Operation-Location header".to_string(),
            })?;

        for attempt in 0..POLL_ATTEMPTS {
            tokio::time::sleep(POLL_INTERVAL).await;

            let response = self
                .http
                .get(&operation_url)
                .header("Ocp-Apim-Subscription-Key", &extraction.api_key)
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

            let operation: AnalyzeOperation =
                serde_json::from_str(&payload).map_err(|err| ProviderError::UpstreamRejected {
                    backend: BACKEND,
                    detail: format!("malformed analyze operation payload: {err}"),
                })?;

            match operation.status.as_str() {
                "succeeded" => {
                    let content = operation
                        .analyze_result
                        .map(|result| result.content)
                        .unwrap_or_default();
                    debug!(attempt, extracted_len = content.len(), "document text extracted");
                    return Ok(content);
                }
                "failed" => {
                    return Err(ProviderError::UpstreamRejected {
                        backend: BACKEND,
                        detail: "document analysis reported failure".to_string(),
                    })
                }
                _ => {}
            }
        }

        Err(ProviderError::UpstreamUnavailable {
            backend: BACKEND,
            detail: "document analysis did not finish within the polling window".to_string(),
        })
    }

    async fn complete(&self, prompt: String) -> Result<String, ProviderError> {
        let analysis = self.analysis.as_ref().ok_or_else(|| ProviderError::Internal {
            backend: BACKEND,
            detail: "AZURE_OPENAI_ENDPOINT/AZURE_OPENAI_API_KEY are not configured".to_string(),
        })?;

        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            analysis.endpoint.trim_end_matches('/'),
            analysis.deployment,
            analysis.api_version
        );
        let body = json!({
            "messages": [
                { "role": "system", "content": "You review clinical documents for compliance and answer with JSON only." },
                { "role": "user", "content": prompt },
            ],
            "temperature": 0,
            "response_format": { "type": "json_object" },
        });

        let response = self
            .http
            .post(&url)
            .header("api-key", &analysis.api_key)
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

        let reply: ChatCompletionResponse =
            serde_json::from_str(&payload).map_err(|err| ProviderError::UpstreamRejected {
                backend: BACKEND,
                detail: format!("malformed chat completion response: {err}"),
            })?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProviderError::UpstreamRejected {
                backend: BACKEND,
                detail: "completion carried no message content".to_string(),
            })
    }
}

#[async_trait]
impl ComplianceProvider for AzureProvider {
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

        // Binary payloads go through extraction first; the compare step then
        // runs over the extracted text. Quotes are anchored against the
        // submitted content in either case, so a finding that only exists in
        // the extracted text is dropped rather than mis-anchored.
        let analysis_text = if is_binary_format(document.metadata.format.as_deref()) {
            self.extract_text(&document.content).await?
        } else {
            document.content.clone()
        };

        let prompt = compliance_prompt(&analysis_text, reference);
        let reply = self.complete(prompt).await?;
        let findings = parse_findings(BACKEND, &reply)?;
        Ok(locate_findings(BACKEND, &document.content, findings))
    }
}

fn is_binary_format(format: Option<&str>) -> bool {
    format.is_some_and(|format| {
        let normalized = format.trim().trim_start_matches('.').to_ascii_lowercase();
        BINARY_FORMATS.contains(&normalized.as_str())
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: String,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResult {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::is_binary_format;

    #[test]
    fn recognises_binary_formats_case_insensitively() {
        assert!(is_binary_format(Some("PDF")));
        assert!(is_binary_format(Some(".docx")));
        assert!(!is_binary_format(Some("txt")));
        assert!(!is_binary_format(None));
    }
}
