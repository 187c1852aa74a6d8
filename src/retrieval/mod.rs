//! Lexical retrieval over the evidence store.
//!
//! # Architecture
//!
//! ```ascii
//!                 ┌──────────────────────────┐
//!                 │  query terms (lowercased) │
//!                 └────────────┬─────────────┘
//!                              ▼
//!              ┌───────────────────────────────┐
//!              │       LexicalRetriever        │
//!              │  strategy fixed at build time │
//!              └───────┬───────────────┬───────┘
//!                      ▼               ▼
//!              ┌──────────────┐ ┌──────────────────┐
//!              │  Bm25Index   │ │  term frequency  │
//!              │  (primary)   │ │  (fallback)      │
//!              └──────┬───────┘ └────────┬─────────┘
//!                     └────────┬─────────┘
//!                              ▼
//!                     select_top_k (heap)
//! ```
//!
//! # Mode asymmetry
//!
//! The BM25 path returns the `top_k` best fragments whatever their score,
//! including zero. The term-frequency fallback drops fragments with zero
//! query-token hits, so it can return fewer than `top_k` items even on a
//! large corpus.

mod bm25;
mod topk;

pub use bm25::{Bm25Index, Bm25Params};
pub use topk::select_top_k;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::corpus::{CandidateScore, EvidenceStore};

/// Requested retrieval strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// BM25 when it can be built, term frequency otherwise.
    #[default]
    Auto,
    /// BM25; still falls back if the index cannot be built.
    Bm25,
    /// Always use the term-frequency fallback.
    TermFrequency,
}

/// Ranking strategy actually in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// BM25 scoring.
    Bm25,
    /// Degraded raw term-count scoring.
    TermFrequency,
}

impl std::fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalMode::Bm25 => write!(f, "bm25"),
            RetrievalMode::TermFrequency => write!(f, "term_frequency"),
        }
    }
}

#[derive(Debug, Clone)]
enum Ranking {
    Bm25(Bm25Index),
    TermFrequency,
}

/// Scores the whole corpus against a query and keeps the best `top_k`.
#[derive(Debug, Clone)]
pub struct LexicalRetriever {
    store: EvidenceStore,
    ranking: Ranking,
}

impl LexicalRetriever {
    /// BM25 with default parameters, falling back if the index cannot be built.
    pub fn new(store: EvidenceStore) -> Self {
        Self::with_strategy(store, RetrievalStrategy::Auto, Bm25Params::default())
    }

    /// Retriever that always uses the term-frequency fallback.
    pub fn term_frequency(store: EvidenceStore) -> Self {
        Self::with_strategy(store, RetrievalStrategy::TermFrequency, Bm25Params::default())
    }

    /// Build with an explicit strategy and BM25 parameters.
    ///
    /// The effective [`RetrievalMode`] is decided here once and never
    /// re-evaluated per query.
    pub fn with_strategy(
        store: EvidenceStore,
        strategy: RetrievalStrategy,
        params: Bm25Params,
    ) -> Self {
        let ranking = match strategy {
            RetrievalStrategy::TermFrequency => {
                info!("Lexical retrieval configured for term-frequency scoring");
                Ranking::TermFrequency
            }
            RetrievalStrategy::Auto | RetrievalStrategy::Bm25 => {
                match Bm25Index::build(store.tokens(), params) {
                    Ok(index) => {
                        info!(
                            "BM25 index built: {} documents, k1={}, b={}",
                            index.len(),
                            params.k1,
                            params.b
                        );
                        Ranking::Bm25(index)
                    }
                    Err(e) => {
                        warn!("BM25 unavailable, degrading to term-frequency retrieval: {}", e);
                        Ranking::TermFrequency
                    }
                }
            }
        };

        Self { store, ranking }
    }

    /// The ranking strategy in effect.
    pub fn mode(&self) -> RetrievalMode {
        match self.ranking {
            Ranking::Bm25(_) => RetrievalMode::Bm25,
            Ranking::TermFrequency => RetrievalMode::TermFrequency,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &EvidenceStore {
        &self.store
    }

    /// Return at most `top_k` fragments ranked by relevance to `query_terms`.
    ///
    /// Query terms are lower-cased but not re-tokenized. Results are sorted by
    /// descending score with ties in corpus order.
    pub fn retrieve<S: AsRef<str>>(&self, query_terms: &[S], top_k: usize) -> Vec<CandidateScore<'_>> {
        let top_k = top_k.min(self.store.len());
        if top_k == 0 {
            return Vec::new();
        }

        let terms: Vec<String> = query_terms
            .iter()
            .map(|t| t.as_ref().to_lowercase())
            .collect();

        let selected = match &self.ranking {
            Ranking::Bm25(index) => {
                let scores = index.scores(&terms);
                select_top_k(scores.into_iter().enumerate(), top_k)
            }
            Ranking::TermFrequency => {
                let hits = self.store.tokens().iter().enumerate().filter_map(|(pos, tokens)| {
                    let count: usize = terms
                        .iter()
                        .map(|t| tokens.iter().filter(|tok| *tok == t).count())
                        .sum();
                    (count > 0).then_some((pos, count as f64))
                });
                select_top_k(hits, top_k)
            }
        };

        debug!(
            "Lexical retrieval ({}): {} terms, {} of {} fragments selected",
            self.mode(),
            terms.len(),
            selected.len(),
            self.store.len()
        );

        let fragments = self.store.fragments();
        selected
            .into_iter()
            .map(|(pos, score)| CandidateScore::new(&fragments[pos], pos, score))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::EvidenceFragment;

    fn store(texts: &[&str]) -> EvidenceStore {
        EvidenceStore::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| EvidenceFragment::new(format!("f{}", i), *t, 2020))
                .collect(),
        )
        .unwrap()
    }

    fn ids(results: &[CandidateScore<'_>]) -> Vec<String> {
        results
            .iter()
            .map(|c| c.fragment.fragment_id.clone())
            .collect()
    }

    #[test]
    fn test_fallback_scenario_orders_by_hits_and_drops_zero() {
        let retriever = LexicalRetriever::term_frequency(store(&[
            "Diet quality and diet patterns.",
            "Sleep and mortality.",
            "A diet intervention trial.",
        ]));
        assert_eq!(retriever.mode(), RetrievalMode::TermFrequency);

        let results = retriever.retrieve(&["diet"], 2);
        assert_eq!(ids(&results), vec!["f0", "f2"]);
        assert_eq!(results[0].score, 2.0);
        assert_eq!(results[1].score, 1.0);
    }

    #[test]
    fn test_fallback_never_returns_zero_hit_fragments() {
        let retriever = LexicalRetriever::term_frequency(store(&["sleep", "exercise", "diet"]));
        let results = retriever.retrieve(&["DIET"], 10);
        assert_eq!(ids(&results), vec!["f2"]);
        assert!(results.iter().all(|c| c.score > 0.0));
    }

    #[test]
    fn test_bm25_keeps_zero_score_fragments_within_top_k() {
        let retriever = LexicalRetriever::new(store(&["sleep", "exercise", "diet"]));
        assert_eq!(retriever.mode(), RetrievalMode::Bm25);

        let results = retriever.retrieve(&["diet"], 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].fragment.fragment_id, "f2");
        assert_eq!(results[1].score, 0.0);
        // Zero scores tie; corpus order decides.
        assert_eq!(ids(&results[1..]), vec!["f0", "f1"]);
    }

    #[test]
    fn test_result_bounded_and_sorted() {
        let retriever = LexicalRetriever::new(store(&[
            "diet", "diet diet exercise", "exercise", "diet sleep", "sleep",
        ]));
        for top_k in 0..7 {
            let results = retriever.retrieve(&["diet", "exercise"], top_k);
            assert!(results.len() <= top_k.min(5));
            assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[test]
    fn test_huge_top_k_clamped_to_corpus() {
        let texts = ["diet", "sleep diet", "exercise"];
        for retriever in [
            LexicalRetriever::new(store(&texts)),
            LexicalRetriever::term_frequency(store(&texts)),
        ] {
            let all = retriever.retrieve(&["diet"], usize::MAX);
            let large = retriever.retrieve(&["diet"], 1 << 40);
            assert_eq!(ids(&all), ids(&large));
            match retriever.mode() {
                RetrievalMode::Bm25 => assert_eq!(all.len(), 3),
                RetrievalMode::TermFrequency => assert_eq!(ids(&all), vec!["f0", "f1"]),
            }
        }
    }

    #[test]
    fn test_empty_corpus_degrades_and_returns_nothing() {
        let retriever = LexicalRetriever::new(store(&[]));
        assert_eq!(retriever.mode(), RetrievalMode::TermFrequency);
        assert!(retriever.retrieve(&["diet"], 5).is_empty());
    }

    #[test]
    fn test_tokenless_corpus_degrades() {
        let retriever = LexicalRetriever::with_strategy(
            store(&["...", "!!"]),
            RetrievalStrategy::Bm25,
            Bm25Params::default(),
        );
        assert_eq!(retriever.mode(), RetrievalMode::TermFrequency);
    }

    #[test]
    fn test_positions_point_into_corpus() {
        let retriever = LexicalRetriever::new(store(&["sleep", "diet"]));
        let results = retriever.retrieve(&["diet"], 1);
        assert_eq!(results[0].position, 1);
        assert_eq!(
            retriever.store().get(results[0].position).unwrap().fragment_id,
            "f1"
        );
    }
}
