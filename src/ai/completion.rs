//! Structured-output completion backends.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::config::GeminiSettings;
use crate::error::GatewayError;

/// Base64 image data sent alongside a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Standard base64, no data-URI prefix
    pub data: String,
}

/// A prompt plus the JSON shape the answer must take.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Name of the calling flow, for logs
    pub flow: &'static str,
    pub prompt: String,
    pub images: Vec<InlineImage>,
    /// Schema in the completion service's OpenAPI subset
    pub response_schema: Value,
}

/// A model that answers prompts with JSON.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete_json(&self, request: &CompletionRequest) -> Result<Value, GatewayError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    candidate_count: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Gemini `generateContent` with a JSON response schema.
#[derive(Clone)]
pub struct GeminiCompletion {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiCompletion {
    pub fn new(settings: &GeminiSettings) -> Self {
        Self {
            client: Client::new(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    fn build(request: &CompletionRequest) -> GenerateRequest {
        let mut parts = vec![Part::Text {
            text: request.prompt.clone(),
        }];
        parts.extend(request.images.iter().map(|img| Part::InlineData {
            inline_data: Blob {
                mime_type: img.mime_type.clone(),
                data: img.data.clone(),
            },
        }));

        GenerateRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: request.response_schema.clone(),
                candidate_count: 1,
            },
        }
    }

    fn extract_text(response: GenerateResponse) -> Result<String, GatewayError> {
        if let Some(err) = response.error {
            return Err(GatewayError::Service(err.message));
        }
        let text: String = response
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| match p {
                        Part::Text { text } => Some(text),
                        Part::InlineData { .. } => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GatewayError::EmptyOutput);
        }
        Ok(text)
    }
}

#[async_trait]
impl CompletionService for GeminiCompletion {
    #[instrument(skip(self, request), fields(flow = request.flow, model = %self.model))]
    async fn complete_json(&self, request: &CompletionRequest) -> Result<Value, GatewayError> {
        if self.api_key.is_empty() {
            return Err(GatewayError::Service("gemini api key is not configured".into()));
        }

        debug!("sending generateContent request");
        let response = self
            .client
            .post(self.url())
            .json(&Self::build(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(status = %status, "gemini request failed");
            let message = serde_json::from_str::<GenerateResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .map_or(body, |e| e.message);
            return Err(GatewayError::Service(format!("{status}: {message}")));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::MalformedOutput(e.to_string()))?;
        let text = Self::extract_text(parsed)?;
        serde_json::from_str(&text).map_err(|e| GatewayError::MalformedOutput(e.to_string()))
    }
}

/// Canned completion service.
///
/// Replies are handed out in order; once they run out the last one repeats.
#[derive(Clone, Default)]
pub struct MockCompletion {
    replies: Arc<Mutex<VecDeque<Result<Value, String>>>>,
    last: Arc<Mutex<Option<Result<Value, String>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockCompletion {
    pub fn returning(value: Value) -> Self {
        Self::with_sequence(vec![Ok(value)])
    }

    /// Every call fails with a service error.
    pub fn failing(message: &str) -> Self {
        Self::with_sequence(vec![Err(message.to_string())])
    }

    pub fn with_sequence(replies: Vec<Result<Value, String>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            ..Self::default()
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests().len()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete_json(&self, request: &CompletionRequest) -> Result<Value, GatewayError> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request.clone());
        }

        let next = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        let reply = match next {
            Some(reply) => {
                if let Ok(mut last) = self.last.lock() {
                    *last = Some(reply.clone());
                }
                reply
            }
            None => self
                .last
                .lock()
                .ok()
                .and_then(|l| l.clone())
                .unwrap_or(Err("no reply configured".to_string())),
        };
        reply.map_err(GatewayError::Service)
    }
}
