//! LLM integration for coaching cues
//!
//! This module handles communication with the Claude API for generating
//! rationale and coaching cues around a rule-engine suggestion. It never
//! decides the recommendation itself.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";
const COACHING_MAX_TOKENS: u32 = 600;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Serialize)]
pub enum LlmError {
  #[error("API key not configured")]
  MissingApiKey,

  #[error("Request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),
}

/// ---------------------------------------------------------------------------
/// Claude API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ClaudeRequest {
  model: String,
  max_tokens: u32,
  system: String,
  messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
  role: String,
  content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
  content: Vec<ContentBlock>,
  usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
  #[serde(rename = "type")]
  content_type: String,
  text: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage {
  pub input_tokens: u32,
  pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorResponse {
  error: ClaudeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorDetail {
  message: String,
}

/// ---------------------------------------------------------------------------
/// Coaching Response (from Claude)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingResponse {
  /// One or two sentences explaining the recommendation
  pub rationale: String,
  /// Short, actionable cues for the next session
  pub coaching_cues: Vec<String>,
}

/// ---------------------------------------------------------------------------
/// Claude Client
/// ---------------------------------------------------------------------------

pub struct ClaudeClient {
  client: Client,
  api_key: String,
  api_url: String,
}

impl ClaudeClient {
  pub fn new(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
    Self {
      client: Client::new(),
      api_key: api_key.into(),
      api_url: api_url.into(),
    }
  }

  /// Create a new Claude client, loading API key (and optional URL override) from environment
  pub fn from_env() -> Result<Self, LlmError> {
    let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| LlmError::MissingApiKey)?;
    let api_url = std::env::var("ANTHROPIC_API_URL").unwrap_or_else(|_| CLAUDE_API_URL.to_string());
    Ok(Self::new(api_key, api_url))
  }

  /// Call Claude with a system prompt and user message
  pub async fn complete(
    &self,
    system_prompt: &str,
    user_message: &str,
    max_tokens: u32,
  ) -> Result<(String, Usage), LlmError> {
    let request = ClaudeRequest {
      model: CLAUDE_MODEL.to_string(),
      max_tokens,
      system: system_prompt.to_string(),
      messages: vec![ClaudeMessage {
        role: "user".to_string(),
        content: user_message.to_string(),
      }],
    };

    let response = self
      .client
      .post(&self.api_url)
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", API_VERSION)
      .header("content-type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    if !status.is_success() {
      if let Ok(error_resp) = serde_json::from_str::<ClaudeErrorResponse>(&body) {
        return Err(LlmError::Api(error_resp.error.message));
      }
      return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
    }

    let claude_response: ClaudeResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

    let text = claude_response
      .content
      .iter()
      .find(|c| c.content_type == "text")
      .and_then(|c| c.text.clone())
      .ok_or_else(|| LlmError::Parse("No text content in response".to_string()))?;

    Ok((text, claude_response.usage))
  }

  /// Ask for rationale and cues around an already-decided suggestion
  pub async fn coaching_cues(&self, context_json: &str) -> Result<(CoachingResponse, Usage), LlmError> {
    let system_prompt = include_str!("prompts/coaching_cues.txt");

    let user_message = format!(
      r#"Write coaching cues for this strength-training suggestion.

SUGGESTION AND TREND:
{}

Respond with valid JSON in this exact format:
{{
  "rationale": "1-2 sentences explaining the recommendation using the numbers provided",
  "coaching_cues": ["cue 1", "cue 2", "cue 3"]
}}"#,
      context_json
    );

    let (response_text, usage) = self.complete(system_prompt, &user_message, COACHING_MAX_TOKENS).await?;

    let json_str = extract_json(&response_text)?;
    let coaching: CoachingResponse =
      serde_json::from_str(&json_str).map_err(|e| LlmError::Parse(format!("{}: {}", e, json_str)))?;

    if coaching.coaching_cues.iter().all(|c| c.trim().is_empty()) {
      return Err(LlmError::Parse("Response contained no coaching cues".to_string()));
    }

    Ok((coaching, usage))
  }
}

/// Extract JSON from Claude's response (handles markdown code blocks)
fn extract_json(text: &str) -> Result<String, LlmError> {
  if text.trim().starts_with('{') {
    return Ok(text.trim().to_string());
  }

  if let Some(start) = text.find("```json") {
    let start = start + 7;
    if let Some(end) = text[start..].find("```") {
      return Ok(text[start..start + end].trim().to_string());
    }
  }

  if let Some(start) = text.find("```") {
    let start = start + 3;
    // Skip language identifier if present
    let content_start = text[start..]
      .find('\n')
      .map(|i| start + i + 1)
      .unwrap_or(start);
    if let Some(end) = text[content_start..].find("```") {
      return Ok(text[content_start..content_start + end].trim().to_string());
    }
  }

  if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
    if start < end {
      return Ok(text[start..=end].to_string());
    }
  }

  Err(LlmError::Parse("Could not extract JSON from response".to_string()))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  fn claude_body(text: &str) -> String {
    serde_json::json!({
      "content": [{ "type": "text", "text": text }],
      "model": "claude-sonnet-4-20250514",
      "stop_reason": "end_turn",
      "usage": { "input_tokens": 120, "output_tokens": 45 }
    })
    .to_string()
  }

  #[test]
  fn test_extract_json_direct() {
    let input = r#"{"rationale": "test", "coaching_cues": []}"#;
    let result = extract_json(input).unwrap();
    assert!(result.contains("rationale"));
  }

  #[test]
  fn test_extract_json_code_block() {
    let input = r#"Here are the cues:

```json
{"rationale": "Good progress", "coaching_cues": ["Brace hard"]}
```

Hope that helps!"#;
    let result = extract_json(input).unwrap();
    assert!(result.contains("Good progress"));
  }

  #[test]
  fn test_extract_json_fallback() {
    let input = r#"The cues are {"rationale": "test"} as shown."#;
    let result = extract_json(input).unwrap();
    assert!(result.contains("rationale"));
  }

  #[test]
  fn test_extract_json_none() {
    assert!(extract_json("no json here").is_err());
  }

  #[test]
  fn test_from_env_requires_key() {
    temp_env::with_var("ANTHROPIC_API_KEY", None::<&str>, || {
      assert!(matches!(ClaudeClient::from_env(), Err(LlmError::MissingApiKey)));
    });
  }

  #[tokio::test]
  async fn test_coaching_cues_parses_response() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/v1/messages")
      .match_header("x-api-key", "test-key")
      .with_status(200)
      .with_body(claude_body(
        r#"{"rationale": "Volume is climbing steadily.", "coaching_cues": ["Brace before each rep", "Control the eccentric"]}"#,
      ))
      .create_async()
      .await;

    let client = ClaudeClient::new("test-key", format!("{}/v1/messages", server.url()));
    let (coaching, usage) = client.coaching_cues("{}").await.unwrap();

    assert_eq!(coaching.coaching_cues.len(), 2);
    assert_eq!(usage.output_tokens, 45);
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_coaching_cues_surfaces_api_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("POST", "/v1/messages")
      .with_status(529)
      .with_body(r#"{"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}"#)
      .create_async()
      .await;

    let client = ClaudeClient::new("test-key", format!("{}/v1/messages", server.url()));
    let err = client.coaching_cues("{}").await.unwrap_err();

    assert!(matches!(err, LlmError::Api(ref msg) if msg == "Overloaded"));
  }

  #[tokio::test]
  async fn test_coaching_cues_rejects_empty_cues() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("POST", "/v1/messages")
      .with_status(200)
      .with_body(claude_body(r#"{"rationale": "ok", "coaching_cues": []}"#))
      .create_async()
      .await;

    let client = ClaudeClient::new("test-key", format!("{}/v1/messages", server.url()));
    assert!(matches!(client.coaching_cues("{}").await, Err(LlmError::Parse(_))));
  }
}
