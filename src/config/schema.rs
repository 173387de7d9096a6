//! Configuration schema for shopbot.
//!
//! All structs use `#[serde(rename_all = "camelCase")]` so that the JSON config
//! file can use camelCase keys while Rust code uses snake_case fields.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LLM config
// ---------------------------------------------------------------------------

/// Language-model invocation settings shared by all three roles.
///
/// The API key is deliberately absent: credentials are environment-only and
/// resolved at startup by [`crate::config::loader::resolve_api_key`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// OpenAI-compatible endpoint base. When `None` the provider infers one
    /// from the credential shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: usize,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Deterministic sampling seed. Advisory; forwarded when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Streaming is accepted for config compatibility but responses are
    /// always buffered.
    #[serde(default)]
    pub stream: bool,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_retries() -> usize {
    2
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f64 {
    0.4
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: None,
            timeout_secs: default_llm_timeout_secs(),
            retries: default_retries(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            seed: None,
            stream: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog config
// ---------------------------------------------------------------------------

/// Remote product catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,
    /// Page size used by searches and by `get_all` pagination.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default = "default_catalog_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_catalog_base_url() -> String {
    "https://dummyjson.com/products".to_string()
}

fn default_page_limit() -> u32 {
    30
}

fn default_catalog_timeout_secs() -> u64 {
    15
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            page_limit: default_page_limit(),
            timeout_secs: default_catalog_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Advisor config
// ---------------------------------------------------------------------------

/// Pipeline tuning: exchange bounds and candidate caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorConfig {
    /// Maximum role↔bridge turns per search exchange.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Maximum tool invocations across one exchange before the bridge stops
    /// auto-responding.
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,
    /// Maximum candidate products rendered into the analyzer prompt.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// When set, raw search text that failed product parsing is dumped here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_dump_path: Option<PathBuf>,
}

fn default_max_turns() -> u32 {
    8
}

fn default_max_tool_calls() -> u32 {
    10
}

fn default_max_candidates() -> usize {
    15
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_tool_calls: default_max_tool_calls(),
            max_candidates: default_max_candidates(),
            debug_dump_path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
}
