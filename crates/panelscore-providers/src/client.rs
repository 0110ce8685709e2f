//! HTTP completion client shared by every provider.
//!
//! Providers differ only in endpoint path, auth headers and request body
//! shape, which [`ProviderFormat`] encodes. The response body is returned
//! unparsed; envelope handling belongs to the extractor.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use panelscore_core::error::ProviderError;
use panelscore_core::traits::{CompletionClient, CompletionRequest, CompletionResponse};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Wire format of a completion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderFormat {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "deepseek")]
    DeepSeek,
    /// Reasoning model; may answer only in `reasoning_content`.
    #[serde(rename = "deepseek-thinking")]
    DeepSeekThinking,
    #[serde(rename = "anthropic")]
    Anthropic,
    /// Self-hosted OpenAI-compatible server. API key optional.
    #[serde(rename = "local")]
    Local,
}

impl ProviderFormat {
    pub const ALL: [ProviderFormat; 5] = [
        ProviderFormat::OpenAi,
        ProviderFormat::DeepSeek,
        ProviderFormat::DeepSeekThinking,
        ProviderFormat::Anthropic,
        ProviderFormat::Local,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProviderFormat::OpenAi => "openai",
            ProviderFormat::DeepSeek => "deepseek",
            ProviderFormat::DeepSeekThinking => "deepseek-thinking",
            ProviderFormat::Anthropic => "anthropic",
            ProviderFormat::Local => "local",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderFormat::OpenAi => "https://api.openai.com",
            ProviderFormat::DeepSeek | ProviderFormat::DeepSeekThinking => {
                "https://api.deepseek.com"
            }
            ProviderFormat::Anthropic => "https://api.anthropic.com",
            ProviderFormat::Local => "http://localhost:8000",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderFormat::OpenAi => "gpt-4.1",
            ProviderFormat::DeepSeek => "deepseek-chat",
            ProviderFormat::DeepSeekThinking => "deepseek-reasoner",
            ProviderFormat::Anthropic => "claude-sonnet-4-20250514",
            ProviderFormat::Local => "local-model",
        }
    }

    fn path(self) -> &'static str {
        match self {
            ProviderFormat::Anthropic => "/v1/messages",
            _ => "/v1/chat/completions",
        }
    }

    fn requires_key(self) -> bool {
        !matches!(self, ProviderFormat::Local)
    }

    fn body(self, request: &CompletionRequest, model: &str) -> serde_json::Result<serde_json::Value> {
        match self {
            ProviderFormat::Anthropic => serde_json::to_value(AnthropicRequest {
                model,
                max_tokens: request.max_tokens,
                temperature: request.temperature,
                system: request.system_prompt.as_deref(),
                messages: vec![ChatMessage {
                    role: "user",
                    content: &request.prompt,
                }],
            }),
            _ => {
                let mut messages = Vec::with_capacity(2);
                if let Some(system) = request.system_prompt.as_deref() {
                    messages.push(ChatMessage {
                        role: "system",
                        content: system,
                    });
                }
                messages.push(ChatMessage {
                    role: "user",
                    content: &request.prompt,
                });
                // Reasoning models reject sampling parameters and JSON mode.
                let thinking = self == ProviderFormat::DeepSeekThinking;
                let json_mode = matches!(self, ProviderFormat::OpenAi | ProviderFormat::DeepSeek);
                serde_json::to_value(ChatRequest {
                    model,
                    messages,
                    max_tokens: request.max_tokens,
                    temperature: (!thinking).then_some(request.temperature),
                    response_format: json_mode.then_some(ResponseFormat { kind: "json_object" }),
                })
            }
        }
    }
}

impl std::fmt::Display for ProviderFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ProviderFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderFormat::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown provider type: {s}"))
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
}

/// The one client used for every completion provider.
pub struct ExternalCompletionClient {
    name: String,
    format: ProviderFormat,
    api_key: String,
    base_url: String,
    default_model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for ExternalCompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalCompletionClient")
            .field("name", &self.name)
            .field("format", &self.format)
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl ExternalCompletionClient {
    pub fn new(
        format: ProviderFormat,
        api_key: &str,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Result<Self, ProviderError> {
        if format.requires_key() && api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(format!(
                "{format} requires an API key"
            )));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            name: format.name().to_string(),
            format,
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or_else(|| format.default_base_url().to_string())
                .trim_end_matches('/')
                .to_string(),
            default_model: model.unwrap_or_else(|| format.default_model().to_string()),
            client,
        })
    }

    /// Rename the client; the name becomes the AI rater id.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn format(&self) -> ProviderFormat {
        self.format
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.format.path())
    }

    async fn send(&self, request: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let start = Instant::now();
        let model = if request.model.is_empty() {
            self.default_model.as_str()
        } else {
            request.model.as_str()
        };
        let body = self.format.body(request, model).map_err(|e| {
            ProviderError::Configuration(format!("failed to encode request: {e}"))
        })?;

        let mut req = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json");
        req = match self.format {
            ProviderFormat::Anthropic => req
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            _ if self.api_key.is_empty() => req,
            _ => req.header("Authorization", format!("Bearer {}", self.api_key)),
        };

        let response = req.json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(request.timeout.as_millis() as u64)
            } else {
                ProviderError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
                * 1000;
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry_after,
            });
        }
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthenticationFailed(body));
        }
        if status == 404 {
            return Err(ProviderError::ModelNotFound(model.to_string()));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError(format!("failed to read body: {e}")))?;

        Ok(CompletionResponse {
            status,
            body,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[async_trait]
impl CompletionClient for ExternalCompletionClient {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, request), fields(provider = %self.format, model = %request.model))]
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let deadline: Duration = request.timeout;
        match tokio::time::timeout(deadline, self.send(request)).await {
            Ok(result) => {
                if let Ok(response) = &result {
                    tracing::debug!(latency_ms = response.latency_ms, "completion finished");
                }
                result
            }
            Err(_) => {
                tracing::warn!("completion timed out after {}ms", deadline.as_millis());
                Err(ProviderError::Timeout(deadline.as_millis() as u64))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CompletionRequest {
        CompletionRequest::new("Rate the candidate").with_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn openai_compatible_request_shape() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"scores\": {}}"}}]
        });

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "deepseek-chat",
                "response_format": {"type": "json_object"},
                "messages": [{"role": "user", "content": "Rate the candidate"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client =
            ExternalCompletionClient::new(ProviderFormat::DeepSeek, "test-key", Some(server.uri()), None)
                .unwrap();
        let response = client.complete(&request()).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.contains("choices"));
    }

    #[test]
    fn thinking_format_omits_sampling_parameters() {
        let client =
            ExternalCompletionClient::new(ProviderFormat::DeepSeekThinking, "k", None, None).unwrap();
        let body = client
            .format()
            .body(&request(), "deepseek-reasoner")
            .unwrap();
        assert!(body.get("temperature").is_none());
        assert!(body.get("response_format").is_none());
        assert_eq!(body["model"], "deepseek-reasoner");
    }

    #[tokio::test]
    async fn anthropic_request_shape() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "content": [{"type": "text", "text": "{\"scores\": {}}"}],
            "stop_reason": "end_turn"
        });

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "ant-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = ExternalCompletionClient::new(
            ProviderFormat::Anthropic,
            "ant-key",
            Some(server.uri()),
            Some("claude-test".into()),
        )
        .unwrap();
        let response = client.complete(&request()).await.unwrap();
        assert!(response.body.contains("end_turn"));
    }

    #[tokio::test]
    async fn status_codes_map_to_typed_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
            .mount(&server)
            .await;
        let client =
            ExternalCompletionClient::new(ProviderFormat::OpenAi, "k", Some(server.uri()), None)
                .unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert_eq!(err.retry_after_ms(), Some(2000));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;
        let client =
            ExternalCompletionClient::new(ProviderFormat::OpenAi, "k", Some(server.uri()), None)
                .unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(err.is_permanent());

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;
        let client =
            ExternalCompletionClient::new(ProviderFormat::OpenAi, "k", Some(server.uri()), None)
                .unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status: 500, .. }));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client =
            ExternalCompletionClient::new(ProviderFormat::Local, "", Some(server.uri()), None)
                .unwrap();
        let request = CompletionRequest::new("x").with_timeout(Duration::from_millis(100));
        let err = client.complete(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(100)));
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let err = ExternalCompletionClient::new(ProviderFormat::OpenAi, " ", None, None).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(ExternalCompletionClient::new(ProviderFormat::Local, "", None, None).is_ok());
    }

    #[test]
    fn debug_masks_api_key() {
        let client =
            ExternalCompletionClient::new(ProviderFormat::OpenAi, "sk-secret", None, None).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn provider_format_parses_names() {
        for format in ProviderFormat::ALL {
            assert_eq!(format.name().parse::<ProviderFormat>().unwrap(), format);
        }
        assert!("cohere".parse::<ProviderFormat>().is_err());
    }
}
