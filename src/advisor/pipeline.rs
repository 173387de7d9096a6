//! Turn orchestration: Search → Analysis → Critique, strictly sequential.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use super::analyze::run_analysis;
use super::critic::{run_critique, CritiqueOutcome};
use super::roles::RoleSet;
use super::search::run_search;
use super::tools::ToolRegistry;
use crate::catalog::SearchResult;
use crate::config::schema::{AdvisorConfig, LlmConfig};
use crate::errors::PipelineError;
use crate::providers::base::LLMProvider;

/// The finished product of one user turn.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub search: SearchResult,
    pub analysis: String,
    pub critique: CritiqueOutcome,
}

/// The assembled pipeline: provider, roles, tool registry, and tuning.
///
/// Built once at startup; every field is read-only afterwards, so one
/// instance can serve any number of sequential turns.
pub struct Advisor {
    provider: Arc<dyn LLMProvider>,
    roles: RoleSet,
    registry: ToolRegistry,
    llm: LlmConfig,
    cfg: AdvisorConfig,
}

impl Advisor {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        roles: RoleSet,
        registry: ToolRegistry,
        llm: LlmConfig,
        cfg: AdvisorConfig,
    ) -> Self {
        Self { provider, roles, registry, llm, cfg }
    }

    /// Stage 1: tool-mediated search for candidates.
    pub async fn search(&self, user_request: &str) -> Result<SearchResult> {
        let result = run_search(
            self.provider.as_ref(),
            &self.roles.searcher,
            &self.registry,
            &self.llm,
            &self.cfg,
            user_request,
        )
        .await;

        if let Err(err) = &result {
            self.maybe_dump_raw(err);
        }
        result
    }

    /// Stage 2: rank candidates against the request.
    pub async fn analyze(&self, user_request: &str, search: &SearchResult) -> Result<String> {
        run_analysis(
            self.provider.as_ref(),
            &self.roles.analyzer,
            &self.llm,
            user_request,
            &search.products,
            self.cfg.max_candidates,
        )
        .await
    }

    /// Stage 3: advisory critique of the analysis text.
    pub async fn critique(&self, user_request: &str, analysis: &str) -> Result<CritiqueOutcome> {
        run_critique(
            self.provider.as_ref(),
            &self.roles.critic,
            &self.llm,
            user_request,
            analysis,
        )
        .await
    }

    /// Run a full turn. Any stage failure abandons the turn; later stages do
    /// not execute.
    pub async fn run_turn(&self, user_request: &str) -> Result<TurnReport> {
        let search = self.search(user_request).await?;
        debug!(
            "search stage done: {} candidates (query '{}')",
            search.products.len(),
            search.query
        );

        let analysis = self.analyze(user_request, &search).await?;
        debug!("analysis stage done: {} chars", analysis.len());

        let critique = self.critique(user_request, &analysis).await?;
        debug!("critique stage done: verdict present = {}", critique.verdict.is_some());

        Ok(TurnReport { search, analysis, critique })
    }

    /// Diagnostic aid: when configured, dump the raw text behind an
    /// unparsable search result to a local file.
    fn maybe_dump_raw(&self, err: &anyhow::Error) {
        let Some(path) = &self.cfg.debug_dump_path else { return };
        if let Some(PipelineError::UnparsableResult { raw }) =
            err.downcast_ref::<PipelineError>()
        {
            if let Err(io_err) = std::fs::write(path, raw) {
                warn!("failed to write debug dump to {}: {}", path.display(), io_err);
            }
        }
    }
}
