//! Longevity RAG - Evidence Retrieval and Ranking for Health Advisory Prompts
//!
//! This crate turns the output of an upstream causal model (proteins, disease
//! pathways, modifiable traits) into a ranked set of literature fragments and
//! a structured prompt for a text-generation model:
//!
//! - Lexical retrieval (BM25 with a term-frequency fallback)
//! - Binary-relevance reranking (monoT5-style, pass-through when degraded)
//! - Evidence weighting by recency, journal impact and study hierarchy
//! - Prompt assembly with a fixed, validator-checked section layout
//! - Generation through any OpenAI-compatible endpoint
//!
//! # Degraded modes
//!
//! | Stage | Primary | Degraded | Chosen |
//! |-------|---------|----------|--------|
//! | Retrieval | BM25 | term frequency | at construction |
//! | Reranking | relevance model | pass-through | at construction |
//!
//! Both are observable through [`RetrievalMode`] and [`RerankMode`].
//!
//! # Example
//!
//! ```ignore
//! use longevity_rag::{AdvisoryPipeline, EngineConfig, IndividualProfile, ModelOutputs};
//!
//! let config = EngineConfig::load()?;
//! let pipeline = AdvisoryPipeline::from_config(&config, fragments)?;
//! let advice = pipeline
//!     .advise(&IndividualProfile::new(profile_json), &ModelOutputs::from_value(&outputs_json))
//!     .await?;
//! println!("{}", advice.text);
//! ```
//!
//! # See Also
//!
//! - [`crate::pipeline`] for the end-to-end flow
//! - [`crate::retrieval`] for the lexical scorers
//! - [`crate::generation`] for generation clients

pub mod config;
pub mod corpus;
pub mod error;
pub mod generation;
pub mod pipeline;
pub mod prompt;
pub mod query;
pub mod rerank;
pub mod retrieval;
pub mod retry;
pub mod weighting;

pub use config::{
    ConfigError, EngineConfig, GenerationConfig, GenerationProvider, PipelineConfig,
    RerankConfig, RetrievalConfig, WeightingConfig,
};
pub use corpus::{tokenize, CandidateScore, EvidenceFragment, EvidenceStore};
pub use error::{AdvisoryError, Result, RetryStrategy};
pub use generation::{
    build_generation_client, GenerationClient, MockGenerationClient, OpenAICompatibleClient,
};
pub use pipeline::{
    AdvisoryPipeline, Advice, AssembledPrompt, PipelineOptions, RankedEvidence,
    RankingDiagnostics,
};
pub use prompt::{build_structured_prompt, format_fragments, IndividualProfile};
pub use query::{build_query_terms, ModelOutputs};
pub use rerank::{
    EvidenceReranker, GenerativeRelevanceModel, MockRelevanceModel, RelevanceModel, RerankMode,
    RerankOutcome, RerankSettings,
};
pub use retrieval::{Bm25Index, Bm25Params, LexicalRetriever, RetrievalMode, RetrievalStrategy};
pub use retry::RetryExecutor;
pub use weighting::{EvidenceWeighter, WeightBreakdown, WeightedCandidate};
