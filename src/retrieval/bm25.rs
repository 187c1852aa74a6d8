//! BM25 (Okapi) index over the tokenized evidence corpus.
//!
//! # Algorithm
//!
//! ```ascii
//! score(D, Q) = Σ_{q ∈ Q} IDF(q) × f(q,D)×(k1+1) / (f(q,D) + k1×(1-b+b×|D|/avgdl))
//!
//! IDF(q) = ln(N - n(q) + 0.5) - ln(n(q) + 0.5)
//! ```
//!
//! Terms occurring in more than half the corpus get a negative IDF; those are
//! replaced by `epsilon × mean(IDF)` so very common terms still contribute a
//! small amount. Query terms are summed per occurrence, so a term repeated in
//! the query counts repeatedly.
//!
//! # References
//!
//! - Robertson, S., Zaragoza, H. (2009). The Probabilistic Relevance Framework

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AdvisoryError, Result};

/// BM25 tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation.
    pub k1: f64,
    /// Length normalization. 0 = none, 1 = full.
    pub b: f64,
    /// Floor factor for negative IDF values.
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

impl Bm25Params {
    /// Create with custom parameters, clamped to sane ranges.
    pub fn new(k1: f64, b: f64, epsilon: f64) -> Self {
        Self {
            k1: k1.clamp(0.0, 3.0),
            b: b.clamp(0.0, 1.0),
            epsilon: epsilon.max(0.0),
        }
    }
}

/// Inverted BM25 index.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    params: Bm25Params,
    /// term -> [(document position, term frequency)]
    postings: HashMap<String, Vec<(usize, u32)>>,
    idf: HashMap<String, f64>,
    doc_lengths: Vec<f64>,
    avgdl: f64,
}

impl Bm25Index {
    /// Build the index from tokenized documents.
    ///
    /// # Errors
    ///
    /// [`AdvisoryError::BackendUnavailable`] when the corpus is empty or has
    /// no tokens at all, since average document length and mean IDF are
    /// undefined.
    pub fn build(documents: &[Vec<String>], params: Bm25Params) -> Result<Self> {
        if documents.is_empty() {
            return Err(AdvisoryError::BackendUnavailable(
                "BM25 index requires at least one document".to_string(),
            ));
        }

        let total_len: usize = documents.iter().map(Vec::len).sum();
        if total_len == 0 {
            return Err(AdvisoryError::BackendUnavailable(
                "BM25 index requires a non-empty vocabulary".to_string(),
            ));
        }

        let mut postings: HashMap<String, Vec<(usize, u32)>> = HashMap::new();
        for (position, tokens) in documents.iter().enumerate() {
            let mut frequencies: HashMap<&str, u32> = HashMap::new();
            for token in tokens {
                *frequencies.entry(token.as_str()).or_insert(0) += 1;
            }
            for (term, tf) in frequencies {
                postings
                    .entry(term.to_string())
                    .or_default()
                    .push((position, tf));
            }
        }

        let n = documents.len() as f64;
        let mut idf = HashMap::with_capacity(postings.len());
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (term, docs) in &postings {
            let df = docs.len() as f64;
            let value = (n - df + 0.5).ln() - (df + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term.clone(), value);
        }

        let floor = params.epsilon * (idf_sum / idf.len() as f64);
        for term in negative {
            idf.insert(term, floor);
        }

        Ok(Self {
            params,
            postings,
            idf,
            doc_lengths: documents.iter().map(|d| d.len() as f64).collect(),
            avgdl: total_len as f64 / n,
        })
    }

    /// Parameters the index was built with.
    pub fn params(&self) -> Bm25Params {
        self.params
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.doc_lengths.len()
    }

    /// Whether the index holds no documents. Always false for a built index.
    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }

    /// IDF of a term, or `None` if the term is not in the vocabulary.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    /// Score every document against already lower-cased query terms.
    ///
    /// Returns one score per document in corpus order. Documents sharing no
    /// term with the query score 0.0.
    pub fn scores<S: AsRef<str>>(&self, query_terms: &[S]) -> Vec<f64> {
        let Bm25Params { k1, b, .. } = self.params;
        let mut scores = vec![0.0; self.doc_lengths.len()];

        for term in query_terms {
            let term = term.as_ref();
            let (Some(docs), Some(idf)) = (self.postings.get(term), self.idf.get(term)) else {
                continue;
            };
            for &(position, tf) in docs {
                let tf = tf as f64;
                let length_norm = 1.0 - b + b * self.doc_lengths[position] / self.avgdl;
                scores[position] += idf * (tf * (k1 + 1.0)) / (tf + k1 * length_norm);
            }
        }

        scores
    }
}
