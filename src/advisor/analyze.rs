//! Analysis stage: rank candidates against the user's constraints.
//!
//! A single request/response exchange with no tool access. Candidates are
//! rendered one per line (ordinal, title, brand, price, rating) with the
//! later fields elided on purpose to bound prompt size.

use anyhow::{bail, Result};
use serde_json::json;
use tracing::debug;

use super::roles::Role;
use crate::catalog::Product;
use crate::config::schema::LlmConfig;
use crate::errors::PipelineError;
use crate::providers::base::LLMProvider;

/// Terminal output when the search produced nothing to rank. A legitimate
/// outcome, not a failure: no provider call is spent on an empty list.
const NO_CANDIDATES_REPLY: &str = "I cannot recommend any products for this request: \
the search returned no candidates to evaluate.\n\
Try relaxing a constraint (a higher budget, a different brand, or a broader \
category) and ask again.";

/// Render candidates for the analyzer, one line each, capped at `max_items`.
pub fn format_candidates(products: &[Product], max_items: usize) -> String {
    products
        .iter()
        .take(max_items)
        .enumerate()
        .map(|(i, p)| {
            format!(
                "{}) {} | Brand: {} | Price: {} | Rating: {}",
                i + 1,
                p.title,
                p.brand,
                p.price_label(),
                p.rating_label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run the analysis exchange. Returns the analyzer's raw text output.
pub async fn run_analysis(
    provider: &dyn LLMProvider,
    role: &Role,
    llm: &LlmConfig,
    user_request: &str,
    products: &[Product],
    max_candidates: usize,
) -> Result<String> {
    if products.is_empty() {
        debug!("analysis short-circuit: no candidates");
        return Ok(NO_CANDIDATES_REPLY.to_string());
    }

    let prompt = format!(
        "USER REQUEST:\n{}\n\nCANDIDATE PRODUCTS:\n{}\n\n\
         Based on the above, recommend 2-3 products following your output format.",
        user_request,
        format_candidates(products, max_candidates)
    );
    let messages = vec![
        json!({ "role": "system", "content": role.instructions }),
        json!({ "role": "user", "content": prompt }),
    ];

    let response = provider
        .chat(&messages, None, None, llm.max_tokens, llm.temperature, llm.seed)
        .await?;

    if response.is_error() {
        bail!(
            "analysis stage failed: {}",
            response.content.unwrap_or_else(|| "unknown provider error".to_string())
        );
    }

    let text = response.content.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(PipelineError::EmptyAnalysis.into());
    }
    Ok(text.trim().to_string())
}
