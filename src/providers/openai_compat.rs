//! OpenAI-compatible API provider.
//!
//! Calls OpenAI-compatible chat completions endpoints directly via reqwest.
//! Supports Gemini (OpenAI-compat surface), OpenRouter, OpenAI, and any other
//! provider that implements the chat completions API format.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use backon::Retryable;
use reqwest::Client;
use tracing::{debug, warn};

use super::base::{LLMProvider, LLMResponse, ToolCallRequest};
use super::retry::{adjust_for_rate_limit, provider_backoff};
use crate::config::schema::LlmConfig;
use crate::errors::ProviderError;

/// Gemini's OpenAI-compatibility endpoint, the default for this system.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// An LLM provider that talks to any OpenAI-compatible chat completions endpoint.
pub struct OpenAICompatProvider {
    api_key: String,
    api_base: String,
    default_model: String,
    client: Client,
    retries: usize,
}

/// Resolve the endpoint base from an explicit setting, else from the shape of
/// the credential and the model name.
///
/// - Explicit `api_base` always wins (trailing slash trimmed).
/// - `AIza...` keys and `gemini-*` models → Gemini's OpenAI-compat surface.
/// - `sk-or-...` keys → OpenRouter.
/// - `sk-...` keys with a non-routed model name → OpenAI direct.
/// - Fallback: OpenRouter (supports routed names like `google/gemini-...`).
fn resolve_api_base(api_key: &str, api_base: Option<&str>, model: &str) -> String {
    if let Some(base) = api_base {
        return base.trim_end_matches('/').to_string();
    }
    if api_key.starts_with("AIza") || model.starts_with("gemini") {
        return GEMINI_API_BASE.to_string();
    }
    if api_key.starts_with("sk-or-") {
        return "https://openrouter.ai/api/v1".to_string();
    }
    if api_key.starts_with("sk-") && !model.contains('/') {
        return "https://api.openai.com/v1".to_string();
    }
    "https://openrouter.ai/api/v1".to_string()
}

/// Build the chat completions request body.
fn build_body(
    model: &str,
    messages: &[serde_json::Value],
    tools: Option<&[serde_json::Value]>,
    max_tokens: u32,
    temperature: f64,
    seed: Option<u64>,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": model,
        "messages": messages,
        "max_tokens": max_tokens,
        "temperature": temperature,
        "stream": false,
    });
    if let Some(tool_defs) = tools {
        if !tool_defs.is_empty() {
            body["tools"] = serde_json::Value::Array(tool_defs.to_vec());
            body["tool_choice"] = serde_json::json!("auto");
        }
    }
    if let Some(seed) = seed {
        body["seed"] = serde_json::json!(seed);
    }
    body
}

/// Parse a `Retry-After` header value (delta-seconds form) into milliseconds.
fn parse_retry_after_ms(value: Option<&str>) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs * 1000)
        .unwrap_or(1000)
}

impl OpenAICompatProvider {
    /// Create a new provider.
    pub fn new(api_key: &str, api_base: Option<&str>, default_model: Option<&str>) -> Self {
        let default_model = default_model.unwrap_or("gemini-2.5-flash").to_string();
        let api_base = resolve_api_base(api_key, api_base, &default_model);
        Self {
            api_key: api_key.to_string(),
            api_base,
            default_model,
            client: Client::new(),
            retries: 0,
        }
    }

    /// Create a provider from the loaded configuration, with the request
    /// timeout owned by the HTTP client and retry budget from config.
    pub fn from_config(cfg: &LlmConfig, api_key: &str) -> Self {
        let api_base = resolve_api_base(api_key, cfg.api_base.as_deref(), &cfg.model);
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            api_key: api_key.to_string(),
            api_base,
            default_model: cfg.model.clone(),
            client,
            retries: cfg.retries,
        }
    }

    /// One HTTP round-trip. Classifies failures into [`ProviderError`] so the
    /// retry layer can distinguish transient from final.
    async fn send_once(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::ResponseReadError(e.to_string()))?;

        if !status.is_success() {
            let code = status.as_u16();
            return Err(match code {
                429 => ProviderError::RateLimited {
                    status: code,
                    retry_after_ms: parse_retry_after_ms(retry_after.as_deref()),
                },
                401 | 403 => ProviderError::AuthError { status: code, message: text },
                500..=599 => ProviderError::ServerError { status: code, message: text },
                _ => ProviderError::BadRequest { status: code, message: text },
            });
        }

        serde_json::from_str(&text).map_err(|e| ProviderError::JsonParseError(e.to_string()))
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatProvider {
    async fn chat(
        &self,
        messages: &[serde_json::Value],
        tools: Option<&[serde_json::Value]>,
        model: Option<&str>,
        max_tokens: u32,
        temperature: f64,
        seed: Option<u64>,
    ) -> Result<LLMResponse> {
        let model = model.unwrap_or(&self.default_model);
        let url = format!("{}/chat/completions", self.api_base);
        let body = build_body(model, messages, tools, max_tokens, temperature, seed);

        debug!("chat: api_base={} model={}", self.api_base, model);

        let result = (|| async { self.send_once(&url, &body).await })
            .retry(provider_backoff(self.retries))
            .when(|e: &ProviderError| e.is_retryable())
            .adjust(adjust_for_rate_limit)
            .await;

        match result {
            Ok(data) => parse_response(&data),
            Err(e) => {
                warn!("LLM call failed (base={}): {}", self.api_base, e);
                Ok(LLMResponse::error(format!("Error calling LLM: {}", e)))
            }
        }
    }

    fn get_default_model(&self) -> &str {
        &self.default_model
    }
}

/// Parse a chat completions response body into an [`LLMResponse`].
fn parse_response(data: &serde_json::Value) -> Result<LLMResponse> {
    let choices = data
        .get("choices")
        .and_then(|c| c.as_array())
        .cloned()
        .unwrap_or_default();

    if choices.is_empty() {
        return Ok(LLMResponse::error(
            "Error: No choices in LLM response".to_string(),
        ));
    }

    let choice = &choices[0];
    let message = choice.get("message").cloned().unwrap_or_default();
    let finish_reason = choice
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .unwrap_or("stop")
        .to_string();

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    // Extract tool calls.
    let mut tool_calls = Vec::new();
    if let Some(tc_array) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for tc in tc_array {
            let id = tc
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let function = tc.get("function").cloned().unwrap_or_default();
            let name = function
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            // Arguments come as a JSON string that we need to parse.
            let arguments_raw = function
                .get("arguments")
                .cloned()
                .unwrap_or(serde_json::Value::String("{}".to_string()));

            let arguments: HashMap<String, serde_json::Value> =
                if let Some(s) = arguments_raw.as_str() {
                    match serde_json::from_str(s) {
                        Ok(map) => map,
                        Err(_) => {
                            let mut m = HashMap::new();
                            m.insert("raw".to_string(), serde_json::Value::String(s.to_string()));
                            m
                        }
                    }
                } else if let Some(obj) = arguments_raw.as_object() {
                    obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
                } else {
                    HashMap::new()
                };

            tool_calls.push(ToolCallRequest { id, name, arguments });
        }
    }

    // Extract usage.
    let mut usage = HashMap::new();
    if let Some(usage_obj) = data.get("usage").and_then(|v| v.as_object()) {
        for (key, value) in usage_obj {
            if let Some(n) = value.as_i64() {
                usage.insert(key.clone(), n);
            }
        }
    }

    Ok(LLMResponse {
        content,
        tool_calls,
        finish_reason,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Response parsing tests ────────────────────────────────────

    #[test]
    fn test_parse_response_text_only() {
        let data = serde_json::json!({
            "choices": [{
                "message": { "content": "  Here you go.  " },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 4 }
        });

        let resp = parse_response(&data).expect("parse should succeed");
        assert_eq!(resp.content.as_deref(), Some("Here you go."));
        assert_eq!(resp.finish_reason, "stop");
        assert!(resp.tool_calls.is_empty());
        assert_eq!(resp.usage.get("prompt_tokens"), Some(&10));
    }

    #[test]
    fn test_parse_response_empty_choices_is_in_band_error() {
        let data = serde_json::json!({ "choices": [] });
        let resp = parse_response(&data).expect("parse should succeed");
        assert!(resp.is_error());
        assert!(resp.content.unwrap().contains("No choices"));
    }

    #[test]
    fn test_parse_response_tool_call_string_args() {
        let data = serde_json::json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "search_products",
                            "arguments": "{\"query\": \"phone\", \"limit\": 20}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let resp = parse_response(&data).expect("parse should succeed");
        assert!(resp.content.is_none());
        assert_eq!(resp.tool_calls.len(), 1);
        let call = &resp.tool_calls[0];
        assert_eq!(call.id, "call_abc");
        assert_eq!(call.name, "search_products");
        assert_eq!(call.arguments.get("query"), Some(&serde_json::json!("phone")));
        assert_eq!(call.arguments.get("limit"), Some(&serde_json::json!(20)));
    }

    #[test]
    fn test_parse_response_tool_call_object_args() {
        // Some gateways send arguments as an object instead of a string.
        let data = serde_json::json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "id": "call_1",
                        "function": {
                            "name": "get_product",
                            "arguments": { "id": 7 }
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let resp = parse_response(&data).expect("parse should succeed");
        assert_eq!(resp.tool_calls[0].arguments.get("id"), Some(&serde_json::json!(7)));
    }

    #[test]
    fn test_parse_response_malformed_args_kept_raw() {
        let data = serde_json::json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "id": "call_2",
                        "function": { "name": "search_products", "arguments": "{not json" }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let resp = parse_response(&data).expect("parse should succeed");
        assert_eq!(
            resp.tool_calls[0].arguments.get("raw"),
            Some(&serde_json::json!("{not json"))
        );
    }

    #[test]
    fn test_parse_response_empty_content_is_none() {
        let data = serde_json::json!({
            "choices": [{
                "message": { "content": "   " },
                "finish_reason": "stop"
            }]
        });
        let resp = parse_response(&data).expect("parse should succeed");
        assert!(resp.content.is_none());
    }

    // ── Provider creation / detection tests ───────────────────────

    #[test]
    fn test_new_gemini_by_key_prefix() {
        let provider = OpenAICompatProvider::new("AIzaSyExample", None, None);
        assert_eq!(provider.api_base, GEMINI_API_BASE);
        assert_eq!(provider.default_model, "gemini-2.5-flash");
    }

    #[test]
    fn test_new_gemini_by_model_name() {
        let provider = OpenAICompatProvider::new("some-key", None, Some("gemini-2.5-flash"));
        assert_eq!(provider.api_base, GEMINI_API_BASE);
    }

    #[test]
    fn test_new_openrouter_by_key_prefix() {
        let provider = OpenAICompatProvider::new("sk-or-my-key", None, Some("meta-llama/llama-3-70b"));
        assert_eq!(provider.api_base, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn test_new_openai_key_with_bare_model() {
        let provider = OpenAICompatProvider::new("sk-abc123", None, Some("gpt-4o"));
        assert_eq!(provider.api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn test_new_explicit_api_base_takes_precedence() {
        let provider = OpenAICompatProvider::new(
            "AIzaSyExample",
            Some("http://localhost:8000/v1/"),
            Some("my-local-model"),
        );
        // Trailing slash should be trimmed.
        assert_eq!(provider.api_base, "http://localhost:8000/v1");
    }

    #[test]
    fn test_from_config_carries_retries() {
        let cfg = LlmConfig { retries: 3, ..LlmConfig::default() };
        let provider = OpenAICompatProvider::from_config(&cfg, "AIzaSyExample");
        assert_eq!(provider.retries, 3);
        assert_eq!(provider.get_default_model(), "gemini-2.5-flash");
    }

    // ── Request body tests ────────────────────────────────────────

    #[test]
    fn test_build_body_basic() {
        let messages = vec![serde_json::json!({"role": "user", "content": "hi"})];
        let body = build_body("gemini-2.5-flash", &messages, None, 1024, 0.4, None);
        assert_eq!(body["model"], "gemini-2.5-flash");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["stream"], false);
        assert!(body.get("tools").is_none());
        assert!(body.get("seed").is_none());
    }

    #[test]
    fn test_build_body_with_tools_and_seed() {
        let messages = vec![serde_json::json!({"role": "user", "content": "hi"})];
        let tools = vec![serde_json::json!({"type": "function", "function": {"name": "t"}})];
        let body = build_body("gpt-4o", &messages, Some(&tools), 512, 0.0, Some(7));
        assert_eq!(body["tools"].as_array().unwrap().len(), 1);
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["seed"], 7);
    }

    #[test]
    fn test_build_body_empty_tools_omitted() {
        let messages = vec![serde_json::json!({"role": "user", "content": "hi"})];
        let tools: Vec<serde_json::Value> = vec![];
        let body = build_body("gpt-4o", &messages, Some(&tools), 512, 0.0, None);
        assert!(body.get("tools").is_none());
    }

    // ── Retry-After parsing ───────────────────────────────────────

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after_ms(Some("5")), 5000);
        assert_eq!(parse_retry_after_ms(Some(" 2 ")), 2000);
    }

    #[test]
    fn test_parse_retry_after_missing_or_http_date() {
        assert_eq!(parse_retry_after_ms(None), 1000);
        // HTTP-date form is not parsed; fall back to the default.
        assert_eq!(parse_retry_after_ms(Some("Wed, 21 Oct 2026 07:28:00 GMT")), 1000);
    }
}
