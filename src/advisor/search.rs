//! Search stage: a bounded tool-mediated exchange with the search role.
//!
//! The role and the tool bridge alternate turns until the role emits a
//! message recognized as final, the per-exchange tool budget runs out, or the
//! turn budget is exhausted. The stage then scans the whole exchange history
//! in reverse for the freshest message carrying candidate JSON, from any
//! participant, since a tool result may hold the payload even when the role
//! never echoed it.

use anyhow::Result;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::bridge::ToolBridge;
use super::extract::{extract_json_block, parse_products};
use super::roles::Role;
use super::tools::ToolRegistry;
use crate::catalog::{Product, SearchResult};
use crate::config::schema::{AdvisorConfig, LlmConfig};
use crate::errors::PipelineError;
use crate::providers::base::LLMProvider;

/// Reminder injected when the role replies with prose instead of the final
/// fenced JSON block.
const FORMAT_NUDGE: &str =
    "Reply with the final ```json block containing \"products\", \"total\", and \"query\".";

/// Run one search exchange for a user request.
pub async fn run_search(
    provider: &dyn LLMProvider,
    role: &Role,
    registry: &ToolRegistry,
    llm: &LlmConfig,
    advisor: &AdvisorConfig,
    user_request: &str,
) -> Result<SearchResult> {
    let tool_defs = registry.get_definitions();
    let mut bridge = ToolBridge::new(registry, advisor.max_tool_calls);

    let directive = format!(
        "User wants:\n{}\n\nUse a good keyword, search for products, and return JSON as specified.",
        user_request
    );
    let mut messages = vec![
        json!({ "role": "system", "content": role.instructions }),
        json!({ "role": "user", "content": directive }),
    ];

    for turn in 0..advisor.max_turns {
        let response = provider
            .chat(
                &messages,
                Some(&tool_defs),
                None,
                llm.max_tokens,
                llm.temperature,
                llm.seed,
            )
            .await?;

        if response.is_error() {
            // In-band provider failure: keep it in the history for
            // diagnostics and end the exchange. Result extraction below may
            // still salvage candidates from earlier tool results.
            warn!("search exchange got provider error on turn {}", turn);
            if let Some(content) = response.content {
                messages.push(json!({ "role": "assistant", "content": content }));
            }
            break;
        }

        if response.has_tool_calls() {
            let calls_json: Vec<Value> =
                response.tool_calls.iter().map(|c| c.to_openai_json()).collect();
            messages.push(json!({
                "role": "assistant",
                "content": response.content,
                "tool_calls": calls_json,
            }));
            bridge.respond(&response.tool_calls, &mut messages).await;
            if bridge.budget_exhausted() {
                debug!("search exchange ended: tool budget exhausted");
                break;
            }
            continue;
        }

        let content = response.content.unwrap_or_default();
        let done = is_final_message(&content);
        messages.push(json!({ "role": "assistant", "content": content }));
        if done {
            debug!("search exchange ended: final message on turn {}", turn);
            break;
        }
        // Prose without a parsable product list: remind the role of the
        // output contract and spend another turn.
        messages.push(json!({ "role": "user", "content": FORMAT_NUDGE }));
    }

    extract_search_result(&messages, user_request)
}

/// A message is final when it both mentions products and round-trips through
/// the extractor into at least one product. The substring test is the cheap
/// pre-filter; the round-trip is what actually decides.
fn is_final_message(content: &str) -> bool {
    content.contains("\"products\"") && !parse_products(content).is_empty()
}

/// Reverse-scan the exchange for the freshest candidate payload.
fn extract_search_result(
    messages: &[Value],
    fallback_query: &str,
) -> Result<SearchResult> {
    let candidate = messages
        .iter()
        .rev()
        .filter_map(|m| m.get("content").and_then(Value::as_str))
        .find(|content| content.contains("\"products\""));

    let Some(text) = candidate else {
        return Err(PipelineError::NoResults.into());
    };

    let raw_products = parse_products(text);
    if raw_products.is_empty() {
        return Err(PipelineError::UnparsableResult { raw: text.to_string() }.into());
    }

    let products: Vec<Product> = raw_products.iter().map(Product::from_value).collect();

    // total and query ride along in the recovered JSON when the role followed
    // its format; otherwise fall back to what we know.
    let meta: Value =
        serde_json::from_str(&extract_json_block(text)).unwrap_or(Value::Null);
    let total = meta
        .get("total")
        .and_then(Value::as_u64)
        .unwrap_or(products.len() as u64)
        .max(products.len() as u64);
    let query = meta
        .get("query")
        .and_then(Value::as_str)
        .unwrap_or(fallback_query)
        .to_string();

    Ok(SearchResult { products, total, query })
}
