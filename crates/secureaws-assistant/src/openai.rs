use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GenerationError;
use crate::provider::{GeneratedAnswer, GenerationProvider, GenerationRequest, HistoryRole};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

const MAX_TOKENS: u32 = 1500;
const TEMPERATURE: f32 = 0.7;

/// OpenAI error codes that mean "out of capacity" rather than "broken request".
const QUOTA_ERROR_CODES: &[&str] = &["insufficient_quota", "rate_limit_exceeded"];

/// Chat-completions client that asks for a JSON object answer.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ApiErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_endpoint(api_key, DEFAULT_BASE_URL.to_string(), DEFAULT_MODEL.to_string())
    }

    pub fn with_endpoint(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request<'a>(&'a self, request: &GenerationRequest<'a>) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(ChatMessage {
            role: "system",
            content: request.system_instruction,
        });
        for turn in request.history {
            messages.push(ChatMessage {
                role: match turn.role {
                    HistoryRole::User => "user",
                    HistoryRole::Assistant => "assistant",
                },
                content: &turn.content,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.utterance,
        });

        ChatRequest {
            model: &self.model,
            messages,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GeneratedAnswer, GenerationError> {
        let body = self.build_request(&request);
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    GenerationError::Unavailable(e.to_string())
                } else {
                    GenerationError::Other(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Other(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(classify_error(status, &text));
        }

        debug!("openai responded {} ({} bytes)", status, text.len());
        parse_completion(&text)
    }
}

/// Map a non-2xx response onto the generation error taxonomy.
fn classify_error(status: StatusCode, body: &str) -> GenerationError {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let detail = if envelope.error.message.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, envelope.error.message)
    };

    let quota_code = envelope
        .error
        .code
        .as_deref()
        .is_some_and(|code| QUOTA_ERROR_CODES.contains(&code));

    if quota_code || status == StatusCode::TOO_MANY_REQUESTS {
        GenerationError::QuotaExceeded(detail)
    } else if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::BAD_GATEWAY {
        GenerationError::Unavailable(detail)
    } else {
        GenerationError::Other(detail)
    }
}

/// The model is asked for `{"content": "...", "sources": [...]}` inside the
/// first choice's message.
fn parse_completion(body: &str) -> Result<GeneratedAnswer, GenerationError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::Other(format!("malformed completion: {}", e)))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| GenerationError::Other("completion has no content".to_string()))?;

    serde_json::from_str(&content)
        .map_err(|e| GenerationError::Other(format!("answer is not the expected JSON object: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::HistoryTurn;
    use secureaws_types::models::Source;

    #[test]
    fn insufficient_quota_is_a_quota_failure() {
        let body = r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota","code":"insufficient_quota"}}"#;
        let err = classify_error(StatusCode::TOO_MANY_REQUESTS, body);
        assert!(matches!(err, GenerationError::QuotaExceeded(ref m) if m.contains("current quota")));
    }

    #[test]
    fn quota_code_wins_even_without_429() {
        let body = r#"{"error":{"message":"quota","code":"insufficient_quota"}}"#;
        assert!(matches!(
            classify_error(StatusCode::FORBIDDEN, body),
            GenerationError::QuotaExceeded(_)
        ));
    }

    #[test]
    fn overload_is_unavailable_and_auth_is_other() {
        assert!(matches!(
            classify_error(StatusCode::SERVICE_UNAVAILABLE, "upstream overloaded"),
            GenerationError::Unavailable(_)
        ));
        let body = r#"{"error":{"message":"Incorrect API key provided","code":"invalid_api_key"}}"#;
        let err = classify_error(StatusCode::UNAUTHORIZED, body);
        assert!(matches!(err, GenerationError::Other(ref m) if m.contains("Incorrect API key")));
    }

    #[test]
    fn parses_answer_with_sources() {
        let answer = serde_json::json!({
            "content": "<p>Use private subnets</p>",
            "sources": [{ "name": "AWS WAF", "color": "blue", "type": "aws_waf" }]
        });
        let body = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": answer.to_string() } }]
        });

        let parsed = parse_completion(&body.to_string()).unwrap();
        assert_eq!(parsed.content, "<p>Use private subnets</p>");
        assert_eq!(parsed.sources, Some(vec![Source::aws_waf()]));
    }

    #[test]
    fn parses_answer_without_sources() {
        let body = serde_json::json!({
            "choices": [{ "message": { "content": r#"{"content":"<p>hi</p>"}"# } }]
        });
        let parsed = parse_completion(&body.to_string()).unwrap();
        assert_eq!(parsed.sources, None);
    }

    #[test]
    fn non_json_answer_is_other() {
        let body = serde_json::json!({ "choices": [{ "message": { "content": "plain text" } }] });
        assert!(matches!(parse_completion(&body.to_string()), Err(GenerationError::Other(_))));

        let empty = serde_json::json!({ "choices": [] });
        assert!(matches!(parse_completion(&empty.to_string()), Err(GenerationError::Other(_))));
    }

    #[test]
    fn request_orders_system_history_then_utterance() {
        let provider = OpenAiProvider::new("sk-test".into());
        let history = vec![
            HistoryTurn { role: HistoryRole::User, content: "What is IAM?".into() },
            HistoryTurn { role: HistoryRole::Assistant, content: "<p>Identity...</p>".into() },
        ];
        let request = GenerationRequest {
            system_instruction: "be helpful",
            history: &history,
            utterance: "And roles?",
        };

        let json = serde_json::to_value(provider.build_request(&request)).unwrap();
        let roles: Vec<&str> = json["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(json["messages"][3]["content"], "And roles?");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["max_tokens"], 1500);
    }

    #[test]
    fn custom_endpoint_keeps_model_and_trims_base_url() {
        let provider = OpenAiProvider::with_endpoint(
            "sk-test".into(),
            "http://localhost:8080/v1/".into(),
            "gpt-4o-mini".into(),
        );
        assert_eq!(provider.model(), "gpt-4o-mini");
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn unknown_source_category_in_answer_is_rejected() {
        let body = serde_json::json!({
            "choices": [{ "message": { "content": r#"{"content":"x","sources":[{"name":"n","color":"c","type":"blog"}]}"# } }]
        });
        assert!(parse_completion(&body.to_string()).is_err());
    }
}
