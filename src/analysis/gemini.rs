//! `generateContent` client for the Gemini API.
//!
//! Request building and response parsing are plain functions so they can be
//! exercised without a network.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{AnalysisEndpoint, AnalysisRequest, Part};
use crate::config::LensConfig;
use crate::error::{LensError, LensResult};

const OPERATION: &str = "generate_content";
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    thinking_budget: i32,
}

impl GeminiClient {
    pub fn new(config: &LensConfig, api_key: impl Into<String>) -> LensResult<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LensError::external("reqwest", e))?;
        Ok(Self {
            http,
            endpoint: config.endpoint_url(),
            api_key: api_key.into(),
            thinking_budget: config.thinking_budget,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnalysisEndpoint for GeminiClient {
    async fn analyze(&self, request: &AnalysisRequest) -> LensResult<String> {
        request.ensure_sendable()?;
        let body = build_request_body(request, self.thinking_budget);

        info!(
            endpoint = %self.endpoint,
            first = request.first.len(),
            second = request.second.len(),
            "sending comparison request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        debug!(status, bytes = text.len(), "received response");

        parse_response(status, &text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// JSON body for `generateContent`.
pub fn build_request_body(request: &AnalysisRequest, thinking_budget: i32) -> Value {
    let parts: Vec<Value> = request
        .parts()
        .into_iter()
        .map(|part| match part {
            Part::Text(text) => json!({ "text": text }),
            Part::Inline { media_type, data } => json!({
                "inline_data": { "mime_type": media_type, "data": data }
            }),
        })
        .collect();

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "thinkingConfig": { "thinkingBudget": thinking_budget }
        }
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Turn an HTTP status and body into report text or a classified error.
pub fn parse_response(status: u16, body: &str) -> LensResult<String> {
    if !(200..300).contains(&status) {
        return Err(status_error(status, body));
    }

    let response: GenerateContentResponse = serde_json::from_str(body)?;

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        warn!(reason, "prompt blocked");
        return Err(blocked(reason));
    }

    let Some(candidate) = response.candidates.first() else {
        return Err(empty_response());
    };

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if matches!(reason, "SAFETY" | "BLOCKED" | "PROHIBITED_CONTENT" | "BLOCKLIST") {
            warn!(reason, "candidate blocked");
            return Err(blocked(reason));
        }
    }

    let text: String = candidate
        .content
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .collect();

    if text.trim().is_empty() {
        return Err(empty_response());
    }
    Ok(text)
}

fn status_error(status: u16, body: &str) -> LensError {
    let api = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let message = api
        .as_ref()
        .map(|e| e.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect());

    // An unknown key comes back as 400 INVALID_ARGUMENT
    let bad_key = api
        .as_ref()
        .map(|e| e.status == "INVALID_ARGUMENT" && e.message.contains("API key"))
        .unwrap_or(false);

    if status == 401 || status == 403 || bad_key {
        return LensError::auth(OPERATION, message)
            .with_recovery_suggestion("Check the API key with `difflens key set`");
    }

    LensError::http_status(OPERATION, status).with_context(message)
}

fn blocked(reason: &str) -> LensError {
    LensError::analysis(OPERATION, format!("blocked ({})", reason))
        .with_recovery_suggestion("Remove sensitive content from the documents and retry")
}

fn empty_response() -> LensError {
    LensError::analysis(OPERATION, "empty response")
}
