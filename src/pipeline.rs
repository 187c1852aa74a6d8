//! End-to-end advisory pipeline.
//!
//! # Flow
//!
//! ```ascii
//!  ModelOutputs ──► build_query_terms
//!                         │
//!                         ▼
//!        LexicalRetriever::retrieve (multiplier × top_k)
//!                         │
//!                         ▼
//!          EvidenceReranker::rerank (top_k)
//!                         │
//!                         ▼
//!           EvidenceWeighter::weight (top_k)
//!                         │
//!                         ▼
//!  IndividualProfile ─► build_structured_prompt ─► GenerationClient
//! ```
//!
//! Every stage is owned by the pipeline; nothing is global. One pipeline can
//! serve concurrent queries behind an `Arc`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{EngineConfig, GenerationConfig, GenerationProvider};
use crate::corpus::{EvidenceFragment, EvidenceStore};
use crate::error::Result;
use crate::generation::{build_generation_client, GenerationClient, OpenAICompatibleClient};
use crate::prompt::{build_structured_prompt, IndividualProfile};
use crate::query::{build_query_terms, ModelOutputs};
use crate::rerank::{
    EvidenceReranker, GenerativeRelevanceModel, RelevanceModel, RerankMode, RerankSettings,
};
use crate::retrieval::{LexicalRetriever, RetrievalMode};
use crate::weighting::{current_year, EvidenceWeighter, WeightedCandidate};

/// Per-pipeline limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Evidence fragments kept after weighting.
    pub top_k: usize,
    /// Lexical candidates fetched per final slot.
    pub candidate_multiplier: usize,
    /// Output budget handed to the generator.
    pub max_tokens: usize,
    /// Fixed "current year" for recency; the clock is used when unset.
    pub current_year: Option<i32>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            top_k: 20,
            candidate_multiplier: 5,
            max_tokens: 512,
            current_year: None,
        }
    }
}

/// What happened while ranking evidence for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingDiagnostics {
    pub retrieval_mode: RetrievalMode,
    pub rerank_mode: RerankMode,
    pub query_terms: usize,
    /// Candidates returned by lexical retrieval.
    pub lexical_candidates: usize,
    /// Relevance judgments that failed.
    pub rerank_failures: usize,
    /// Fragments kept after weighting.
    pub selected: usize,
    pub current_year: i32,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Weighted evidence for one query.
#[derive(Debug, Clone)]
pub struct RankedEvidence<'a> {
    /// Query terms derived from the model outputs.
    pub query_terms: Vec<String>,
    /// Best first, at most `top_k`.
    pub evidence: Vec<WeightedCandidate<'a>>,
    pub diagnostics: RankingDiagnostics,
}

impl<'a> RankedEvidence<'a> {
    /// The selected fragments in rank order.
    pub fn fragments(&self) -> Vec<&'a EvidenceFragment> {
        self.evidence.iter().map(|c| c.fragment).collect()
    }
}

/// A generation-ready prompt plus the evidence behind it.
#[derive(Debug, Clone, Serialize)]
pub struct AssembledPrompt {
    pub text: String,
    pub evidence: Vec<EvidenceFragment>,
    pub diagnostics: RankingDiagnostics,
}

/// Generated advice and the prompt that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Advice {
    pub text: String,
    pub prompt: AssembledPrompt,
}

/// Retrieval, reranking, weighting, prompt assembly and generation.
pub struct AdvisoryPipeline {
    retriever: LexicalRetriever,
    reranker: EvidenceReranker,
    weighter: EvidenceWeighter,
    generator: Arc<dyn GenerationClient>,
    options: PipelineOptions,
}

impl std::fmt::Debug for AdvisoryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvisoryPipeline")
            .field("retrieval_mode", &self.retriever.mode())
            .field("rerank_mode", &self.reranker.mode())
            .field("generator", &self.generator.name())
            .field("options", &self.options)
            .finish()
    }
}

impl AdvisoryPipeline {
    /// Assemble a pipeline from its stages with default options.
    pub fn new(
        retriever: LexicalRetriever,
        reranker: EvidenceReranker,
        generator: Arc<dyn GenerationClient>,
    ) -> Self {
        Self {
            retriever,
            reranker,
            weighter: EvidenceWeighter::new(),
            generator,
            options: PipelineOptions::default(),
        }
    }

    /// Override the limits.
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Override the weighter.
    pub fn with_weighter(mut self, weighter: EvidenceWeighter) -> Self {
        self.weighter = weighter;
        self
    }

    /// Build every stage from configuration over `fragments`.
    ///
    /// # Errors
    ///
    /// Invalid configuration, duplicate fragment ids, or a generation client
    /// that cannot be constructed.
    pub fn from_config(config: &EngineConfig, fragments: Vec<EvidenceFragment>) -> Result<Self> {
        config.validate()?;

        let store = EvidenceStore::new(fragments)?;
        let retriever = LexicalRetriever::with_strategy(
            store,
            config.retrieval.strategy,
            config.retrieval.bm25_params(),
        );

        let settings = RerankSettings {
            relevance_bonus: config.rerank.relevance_bonus,
            candidate_multiplier: config.retrieval.candidate_multiplier,
            concurrency: config.rerank.concurrency,
        };
        let reranker = if config.rerank.enabled {
            EvidenceReranker::from_optional(relevance_model(config)?)
        } else {
            info!("Reranking disabled by configuration");
            EvidenceReranker::pass_through()
        }
        .with_settings(settings);

        let weighter =
            EvidenceWeighter::new().with_recency_coefficient(config.weighting.recency_coefficient);
        let generator = build_generation_client(&config.generation)?;

        let options = PipelineOptions {
            top_k: config.pipeline.top_k,
            candidate_multiplier: config.retrieval.candidate_multiplier,
            max_tokens: config.generation.max_tokens,
            current_year: config.weighting.current_year,
        };

        info!(
            "Advisory pipeline ready: {} fragments, retrieval={}, rerank={}, top_k={}",
            retriever.store().len(),
            retriever.mode(),
            reranker.mode(),
            options.top_k
        );

        Ok(Self::new(retriever, reranker, generator)
            .with_weighter(weighter)
            .with_options(options))
    }

    /// Limits in effect.
    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// The lexical retriever.
    pub fn retriever(&self) -> &LexicalRetriever {
        &self.retriever
    }

    /// The reranker.
    pub fn reranker(&self) -> &EvidenceReranker {
        &self.reranker
    }

    /// Retrieve, rerank and weight evidence for one individual's outputs.
    pub async fn rank_evidence(&self, outputs: &ModelOutputs) -> RankedEvidence<'_> {
        let started = Instant::now();
        let top_k = self.options.top_k;
        let year = self.options.current_year.unwrap_or_else(current_year);

        let query_terms = build_query_terms(outputs);
        let pool = top_k.saturating_mul(self.options.candidate_multiplier.max(1));
        let candidates = self.retriever.retrieve(&query_terms, pool);
        let lexical_candidates = candidates.len();

        let query = query_terms.join(" ");
        let reranked = self.reranker.rerank(candidates, &query, top_k).await;

        let mut evidence = self.weighter.weight(reranked.candidates, year);
        evidence.truncate(top_k);

        let diagnostics = RankingDiagnostics {
            retrieval_mode: self.retriever.mode(),
            rerank_mode: self.reranker.mode(),
            query_terms: query_terms.len(),
            lexical_candidates,
            rerank_failures: reranked.failures,
            selected: evidence.len(),
            current_year: year,
            elapsed: started.elapsed(),
        };
        debug!(
            "Ranked evidence: {} terms, {} lexical, {} selected in {:?}",
            diagnostics.query_terms,
            diagnostics.lexical_candidates,
            diagnostics.selected,
            diagnostics.elapsed
        );

        RankedEvidence {
            query_terms,
            evidence,
            diagnostics,
        }
    }

    /// Rank evidence and render the generation prompt.
    pub async fn assemble_prompt(
        &self,
        profile: &IndividualProfile,
        outputs: &ModelOutputs,
    ) -> AssembledPrompt {
        let ranked = self.rank_evidence(outputs).await;
        let fragments = ranked.fragments();
        let text = build_structured_prompt(profile, outputs, &fragments);

        AssembledPrompt {
            text,
            evidence: fragments.into_iter().cloned().collect(),
            diagnostics: ranked.diagnostics,
        }
    }

    /// Produce advice for one individual.
    ///
    /// # Errors
    ///
    /// Whatever the generation client returns, unchanged. The pipeline does
    /// not retry.
    pub async fn advise(&self, profile: &IndividualProfile, outputs: &ModelOutputs) -> Result<Advice> {
        let prompt = self.assemble_prompt(profile, outputs).await;
        debug!(
            "Generating with {} ({} prompt chars, max_tokens={})",
            self.generator.model(),
            prompt.text.len(),
            self.options.max_tokens
        );
        let text = self
            .generator
            .generate(&prompt.text, self.options.max_tokens)
            .await?;
        Ok(Advice { text, prompt })
    }
}

/// Relevance model described by `[rerank]`, if an endpoint is configured.
fn relevance_model(config: &EngineConfig) -> Result<Option<Arc<dyn RelevanceModel>>> {
    let Some(base_url) = &config.rerank.base_url else {
        return Ok(None);
    };
    let endpoint = GenerationConfig {
        provider: GenerationProvider::OpenAICompatible,
        base_url: base_url.clone(),
        model: config.rerank.model.clone(),
        api_key_env: config.rerank.api_key_env.clone(),
        max_tokens: 2,
        temperature: Some(0.0),
        timeout_secs: config.generation.timeout_secs,
        retry_transient: config.generation.retry_transient,
    };
    let client = OpenAICompatibleClient::from_config(&endpoint)?;
    let model = GenerativeRelevanceModel::new(Arc::new(client))
        .with_max_document_chars(config.rerank.max_document_chars);
    Ok(Some(Arc::new(model)))
}
