//! Critique stage: advisory review of the analyzer's recommendations.
//!
//! A single request/response exchange with no tool access, judged only from
//! the user request and the analysis text. Terminal for the turn: a
//! rejection is surfaced to the user, it does not re-run the analysis.

use anyhow::{bail, Result};
use serde_json::json;

use super::roles::Role;
use crate::config::schema::LlmConfig;
use crate::providers::base::LLMProvider;

/// The critic's judgment tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictTag {
    Approved,
    Rejected,
}

/// A parsed critic verdict.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub tag: VerdictTag,
    pub justification: String,
}

/// The critique stage's output: the raw critic text plus the verdict parsed
/// from it, when one could be recognized.
#[derive(Debug, Clone)]
pub struct CritiqueOutcome {
    pub verdict: Option<Verdict>,
    pub raw: String,
}

/// Run the critique exchange.
pub async fn run_critique(
    provider: &dyn LLMProvider,
    role: &Role,
    llm: &LlmConfig,
    user_request: &str,
    analysis: &str,
) -> Result<CritiqueOutcome> {
    let prompt = format!(
        "User request:\n{}\n\nAnalyzer recommendations:\n{}\n\n\
         Evaluate them according to your system message.",
        user_request, analysis
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
            "critique stage failed: {}",
            response.content.unwrap_or_else(|| "unknown provider error".to_string())
        );
    }

    let raw = response.content.unwrap_or_default().trim().to_string();
    Ok(CritiqueOutcome { verdict: parse_verdict(&raw), raw })
}

/// Parse a verdict from critic text.
///
/// The verdict token is expected on the first non-empty line; when both
/// tokens somehow appear there, the earlier one wins. The justification is
/// everything after the token (leading colon stripped). Text with no token
/// yields `None` so the caller can print a placeholder instead of guessing.
pub fn parse_verdict(text: &str) -> Option<Verdict> {
    let first_line = text.lines().find(|l| !l.trim().is_empty())?;

    let approved = first_line.find("APPROVED");
    let rejected = first_line.find("REJECTED");
    let (tag, pos, token_len) = match (approved, rejected) {
        (Some(a), Some(r)) if a <= r => (VerdictTag::Approved, a, "APPROVED".len()),
        (Some(_), Some(r)) => (VerdictTag::Rejected, r, "REJECTED".len()),
        (Some(a), None) => (VerdictTag::Approved, a, "APPROVED".len()),
        (None, Some(r)) => (VerdictTag::Rejected, r, "REJECTED".len()),
        (None, None) => return None,
    };

    // Locate the token within the full text so the justification keeps any
    // following lines.
    let line_start = text.find(first_line).unwrap_or(0);
    let after = &text[line_start + pos + token_len..];
    let justification = after
        .trim_start_matches([':', ' ', '\t'])
        .trim()
        .to_string();

    Some(Verdict { tag, justification })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::base::LLMResponse;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct OneShotProvider {
        reply: Mutex<Option<LLMResponse>>,
    }

    #[async_trait]
    impl LLMProvider for OneShotProvider {
        async fn chat(
            &self,
            messages: &[Value],
            tools: Option<&[Value]>,
            _model: Option<&str>,
            _max_tokens: u32,
            _temperature: f64,
            _seed: Option<u64>,
        ) -> Result<LLMResponse> {
            assert!(tools.is_none());
            // The critic sees both of its inputs verbatim.
            let user = messages[1]["content"].as_str().unwrap();
            assert!(user.contains("User request:"));
            assert!(user.contains("Analyzer recommendations:"));
            Ok(self.reply.lock().unwrap().take().expect("single call expected"))
        }

        fn get_default_model(&self) -> &str {
            "one-shot"
        }
    }

    fn text(content: &str) -> LLMResponse {
        LLMResponse {
            content: Some(content.to_string()),
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
            usage: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_critique_parses_approval() {
        let provider = OneShotProvider {
            reply: Mutex::new(Some(text("APPROVED: relevant picks, honest tradeoffs."))),
        };
        let role = Role::new("InternalCritic", "critique");
        let out = run_critique(
            &provider,
            &role,
            &LlmConfig::default(),
            "phone under 200",
            "PRODUCT #1 ...",
        )
        .await
        .unwrap();

        let verdict = out.verdict.unwrap();
        assert_eq!(verdict.tag, VerdictTag::Approved);
        assert_eq!(verdict.justification, "relevant picks, honest tradeoffs.");
        assert!(out.raw.starts_with("APPROVED"));
    }

    #[tokio::test]
    async fn test_critique_unrecognized_reply_has_no_verdict() {
        let provider = OneShotProvider {
            reply: Mutex::new(Some(text("These all look fine to me."))),
        };
        let role = Role::new("InternalCritic", "critique");
        let out = run_critique(&provider, &role, &LlmConfig::default(), "r", "a")
            .await
            .unwrap();
        assert!(out.verdict.is_none());
        assert_eq!(out.raw, "These all look fine to me.");
    }

    // ── parse_verdict ─────────────────────────────────────────────

    #[test]
    fn test_parse_verdict_rejected_multiline_justification() {
        let v = parse_verdict("REJECTED: price exceeds the budget.\nSuggest cheaper models.")
            .unwrap();
        assert_eq!(v.tag, VerdictTag::Rejected);
        assert!(v.justification.contains("price exceeds"));
        assert!(v.justification.contains("Suggest cheaper models."));
    }

    #[test]
    fn test_parse_verdict_token_mid_line() {
        let v = parse_verdict("Verdict: APPROVED — good coverage of the budget.").unwrap();
        assert_eq!(v.tag, VerdictTag::Approved);
        assert!(v.justification.contains("good coverage"));
    }

    #[test]
    fn test_parse_verdict_skips_leading_blank_lines() {
        let v = parse_verdict("\n\nAPPROVED: fine.").unwrap();
        assert_eq!(v.tag, VerdictTag::Approved);
        assert_eq!(v.justification, "fine.");
    }

    #[test]
    fn test_parse_verdict_none_for_plain_text() {
        assert!(parse_verdict("Looks good to me!").is_none());
        assert!(parse_verdict("").is_none());
        // Lowercase is not a verdict token.
        assert!(parse_verdict("approved: fine").is_none());
    }

    #[test]
    fn test_parse_verdict_earlier_token_wins() {
        let v = parse_verdict("REJECTED, not APPROVED: missing ratings").unwrap();
        assert_eq!(v.tag, VerdictTag::Rejected);
    }
}
