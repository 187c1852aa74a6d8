//! Immutable in-memory evidence corpus.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use super::fragment::EvidenceFragment;
use crate::error::{AdvisoryError, Result};

/// Tokenize text into lower-cased word tokens.
///
/// A token is a maximal run of Unicode alphanumerics or `_`. No stemming,
/// stop-word removal or minimum length is applied, so "A" and "I25" survive.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// The evidence corpus and its tokenized form.
///
/// Built once and shared read-only for the process lifetime. Cloning is
/// cheap; clones share the same fragments.
#[derive(Debug, Clone)]
pub struct EvidenceStore {
    fragments: Arc<[EvidenceFragment]>,
    tokens: Arc<[Vec<String>]>,
}

impl EvidenceStore {
    /// Build a store from an ordered collection of fragments.
    ///
    /// # Errors
    ///
    /// [`AdvisoryError::InvalidCorpus`] if two fragments share an identifier.
    pub fn new(fragments: Vec<EvidenceFragment>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(fragments.len());
        for fragment in &fragments {
            if !seen.insert(fragment.fragment_id.as_str()) {
                return Err(AdvisoryError::InvalidCorpus(format!(
                    "duplicate fragment id '{}'",
                    fragment.fragment_id
                )));
            }
        }

        let tokens: Vec<Vec<String>> = fragments.iter().map(|f| tokenize(&f.text)).collect();
        let total_tokens: usize = tokens.iter().map(Vec::len).sum();
        info!(
            "Evidence store loaded: {} fragments, {} tokens",
            fragments.len(),
            total_tokens
        );

        Ok(Self {
            fragments: fragments.into(),
            tokens: tokens.into(),
        })
    }

    /// Number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// All fragments in corpus order.
    pub fn fragments(&self) -> &[EvidenceFragment] {
        &self.fragments
    }

    /// Tokenized text of every fragment, aligned with [`fragments`](Self::fragments).
    pub fn tokens(&self) -> &[Vec<String>] {
        &self.tokens
    }

    /// Fragment at a corpus position.
    pub fn get(&self, position: usize) -> Option<&EvidenceFragment> {
        self.fragments.get(position)
    }

    /// Look up a fragment by identifier.
    pub fn find(&self, fragment_id: &str) -> Option<&EvidenceFragment> {
        self.fragments.iter().find(|f| f.fragment_id == fragment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        assert_eq!(
            tokenize("Mediterranean DIET, reduced I25-risk (HR=0.7)."),
            vec!["mediterranean", "diet", "reduced", "i25", "risk", "hr", "0", "7"]
        );
    }

    #[test]
    fn test_tokenize_keeps_underscores_and_single_chars() {
        assert_eq!(tokenize("a b_c"), vec!["a", "b_c"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("  ,.; ").is_empty());
    }

    #[test]
    fn test_store_rejects_duplicate_ids() {
        let fragments = vec![
            EvidenceFragment::new("f1", "one", 2020),
            EvidenceFragment::new("f1", "two", 2021),
        ];
        let err = EvidenceStore::new(fragments).unwrap_err();
        assert!(matches!(err, AdvisoryError::InvalidCorpus(_)));
    }

    #[test]
    fn test_store_keeps_order_and_tokens() {
        let store = EvidenceStore::new(vec![
            EvidenceFragment::new("f1", "Diet matters", 2020),
            EvidenceFragment::new("f2", "Sleep too", 2021),
        ])
        .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().fragment_id, "f2");
        assert_eq!(store.tokens()[0], vec!["diet", "matters"]);
        assert_eq!(store.find("f2").unwrap().pub_year, 2021);
        assert!(store.find("missing").is_none());
    }

    #[test]
    fn test_empty_store() {
        let store = EvidenceStore::new(vec![]).unwrap();
        assert!(store.is_empty());
        assert!(store.tokens().is_empty());
    }
}
