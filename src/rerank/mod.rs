//! Second-pass reranking of lexical candidates.
//!
//! # Architecture
//!
//! ```ascii
//!   lexical candidates (≤ multiplier × top_k)
//!                  │
//!                  ▼
//!     ┌──────────────────────────┐
//!     │     EvidenceReranker     │
//!     └────────────┬─────────────┘
//!          ┌───────┴────────┐
//!          ▼                ▼
//!   RerankMode::Model   RerankMode::PassThrough
//!   judge each doc      first top_k unchanged
//!   +bonus if relevant
//!   stable re-sort
//!          │
//!          ▼
//!      top_k candidates
//! ```
//!
//! A judgment that fails counts as "not relevant" for that candidate only;
//! the rest of the batch is unaffected.

mod relevance;

pub use relevance::{
    is_positive_judgment, relevance_prompt, GenerativeRelevanceModel, MockRelevanceModel,
    RelevanceModel, DEFAULT_MAX_DOCUMENT_CHARS,
};

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::corpus::CandidateScore;

/// Reranking behaviour in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankMode {
    /// Candidates are judged by a relevance model.
    Model,
    /// Degraded identity pass-through.
    PassThrough,
}

impl std::fmt::Display for RerankMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RerankMode::Model => write!(f, "model"),
            RerankMode::PassThrough => write!(f, "pass_through"),
        }
    }
}

/// Tunables for the model-backed mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankSettings {
    /// Score added to a candidate judged relevant.
    pub relevance_bonus: f64,
    /// At most `candidate_multiplier × top_k` candidates are judged.
    pub candidate_multiplier: usize,
    /// Judgments in flight at once.
    pub concurrency: usize,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self {
            relevance_bonus: 1.0,
            candidate_multiplier: 5,
            concurrency: 4,
        }
    }
}

/// Reranked candidates plus what happened along the way.
#[derive(Debug, Clone)]
pub struct RerankOutcome<'a> {
    /// At most `top_k` candidates, best first.
    pub candidates: Vec<CandidateScore<'a>>,
    /// Judgments requested.
    pub judged: usize,
    /// Judgments that came back relevant.
    pub relevant: usize,
    /// Judgments that failed and were treated as not relevant.
    pub failures: usize,
}

/// Reranks lexical candidates with an optional relevance model.
#[derive(Clone)]
pub struct EvidenceReranker {
    model: Option<Arc<dyn RelevanceModel>>,
    settings: RerankSettings,
}

impl std::fmt::Debug for EvidenceReranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceReranker")
            .field("model", &self.model.as_ref().map(|m| m.name().to_string()))
            .field("settings", &self.settings)
            .finish()
    }
}

impl EvidenceReranker {
    /// Reranker backed by a relevance model.
    pub fn new(model: Arc<dyn RelevanceModel>) -> Self {
        Self {
            model: Some(model),
            settings: RerankSettings::default(),
        }
    }

    /// Reranker in degraded pass-through mode.
    pub fn pass_through() -> Self {
        Self {
            model: None,
            settings: RerankSettings::default(),
        }
    }

    /// Model-backed when a model is available, pass-through otherwise.
    pub fn from_optional(model: Option<Arc<dyn RelevanceModel>>) -> Self {
        match model {
            Some(model) => Self::new(model),
            None => {
                warn!("No relevance model available; reranking degrades to pass-through");
                Self::pass_through()
            }
        }
    }

    /// Override the settings.
    pub fn with_settings(mut self, settings: RerankSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Settings in effect.
    pub fn settings(&self) -> RerankSettings {
        self.settings
    }

    /// Mode in effect.
    pub fn mode(&self) -> RerankMode {
        if self.model.is_some() {
            RerankMode::Model
        } else {
            RerankMode::PassThrough
        }
    }

    /// Rerank `candidates` against `query` and keep the best `top_k`.
    ///
    /// Never fails: a failed judgment contributes no bonus.
    pub async fn rerank<'a>(
        &self,
        mut candidates: Vec<CandidateScore<'a>>,
        query: &str,
        top_k: usize,
    ) -> RerankOutcome<'a> {
        let Some(model) = &self.model else {
            candidates.truncate(top_k);
            return RerankOutcome {
                candidates,
                judged: 0,
                relevant: 0,
                failures: 0,
            };
        };

        if top_k == 0 {
            return RerankOutcome {
                candidates: Vec::new(),
                judged: 0,
                relevant: 0,
                failures: 0,
            };
        }

        let limit = top_k.saturating_mul(self.settings.candidate_multiplier.max(1));
        if candidates.len() > limit {
            debug!(
                "Reranker received {} candidates, judging the first {}",
                candidates.len(),
                limit
            );
            candidates.truncate(limit);
        }

        let judgment_futures: Vec<_> = candidates
            .iter()
            .map(|c| async move {
                model
                    .judge(query, &c.fragment.text)
                    .await
                    .map_err(|e| (c.fragment.fragment_id.as_str(), e))
            })
            .collect();
        let judgments: Vec<_> = stream::iter(judgment_futures)
            .buffered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let mut relevant = 0;
        let mut failures = 0;
        let mut rescored: Vec<CandidateScore<'a>> = candidates
            .iter()
            .zip(judgments)
            .map(|(c, judgment)| match judgment {
                Ok(true) => {
                    relevant += 1;
                    c.with_score(c.score + self.settings.relevance_bonus)
                }
                Ok(false) => *c,
                Err((fragment_id, e)) => {
                    failures += 1;
                    warn!(
                        "Relevance judgment failed for fragment {}, using lexical score: {}",
                        fragment_id, e
                    );
                    *c
                }
            })
            .collect();

        rescored.sort_by(|a, b| b.score.total_cmp(&a.score));
        rescored.truncate(top_k);

        debug!(
            "Reranked {} candidates with {}: {} relevant, {} failed",
            candidates.len(),
            model.name(),
            relevant,
            failures
        );

        RerankOutcome {
            candidates: rescored,
            judged: candidates.len(),
            relevant,
            failures,
        }
    }
}
