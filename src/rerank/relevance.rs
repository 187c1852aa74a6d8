//! Binary relevance models used by the evidence reranker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AdvisoryError, Result};
use crate::generation::GenerationClient;

/// Default document budget for a relevance judgment, roughly 512 tokens.
pub const DEFAULT_MAX_DOCUMENT_CHARS: usize = 2048;

/// Decides whether a document is relevant to a query.
///
/// Shared across concurrent queries, so implementations must not race on
/// internal state.
#[async_trait]
pub trait RelevanceModel: Send + Sync {
    /// Model identifier.
    fn name(&self) -> &str;

    /// `true` if `document` is relevant to `query`.
    async fn judge(&self, query: &str, document: &str) -> Result<bool>;
}

/// Build the monoT5-style judgment input.
///
/// The document is cut to `max_document_chars` characters on a char boundary.
pub fn relevance_prompt(query: &str, document: &str, max_document_chars: usize) -> String {
    let document = match document.char_indices().nth(max_document_chars) {
        Some((cut, _)) => &document[..cut],
        None => document,
    };
    format!("Query: {} Document: {} Relevant:", query, document)
}

/// Whether a sequence-to-sequence output means "relevant".
pub fn is_positive_judgment(output: &str) -> bool {
    output.trim().to_lowercase().starts_with("true")
}

/// Relevance model backed by a text-generation endpoint serving a
/// sequence-to-sequence reranker such as monoT5.
pub struct GenerativeRelevanceModel {
    client: Arc<dyn GenerationClient>,
    max_document_chars: usize,
}

impl GenerativeRelevanceModel {
    /// Wrap a generation client.
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            client,
            max_document_chars: DEFAULT_MAX_DOCUMENT_CHARS,
        }
    }

    /// Override the document character budget.
    pub fn with_max_document_chars(mut self, max_chars: usize) -> Self {
        self.max_document_chars = max_chars;
        self
    }
}

#[async_trait]
impl RelevanceModel for GenerativeRelevanceModel {
    fn name(&self) -> &str {
        self.client.model()
    }

    async fn judge(&self, query: &str, document: &str) -> Result<bool> {
        let prompt = relevance_prompt(query, document, self.max_document_chars);
        let output = self
            .client
            .generate(&prompt, 2)
            .await
            .map_err(|e| AdvisoryError::RelevanceModel(e.to_string()))?;
        Ok(is_positive_judgment(&output))
    }
}

/// Rule-based relevance model for tests.
///
/// A document is relevant if it contains any relevance marker and the
/// judgment fails if it contains any failure marker. Matching is
/// case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct MockRelevanceModel {
    relevant_markers: Vec<String>,
    failing_markers: Vec<String>,
    calls: Arc<AtomicUsize>,
}

impl MockRelevanceModel {
    /// Model that judges nothing relevant.
    pub fn new() -> Self {
        Self::default()
    }

    /// Judge documents containing `marker` relevant.
    pub fn relevant_when_contains(mut self, marker: impl Into<String>) -> Self {
        self.relevant_markers.push(marker.into().to_lowercase());
        self
    }

    /// Fail judgments of documents containing `marker`.
    pub fn failing_when_contains(mut self, marker: impl Into<String>) -> Self {
        self.failing_markers.push(marker.into().to_lowercase());
        self
    }

    /// Number of judgments requested.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelevanceModel for MockRelevanceModel {
    fn name(&self) -> &str {
        "mock-relevance"
    }

    async fn judge(&self, _query: &str, document: &str) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let document = document.to_lowercase();
        if self.failing_markers.iter().any(|m| document.contains(m)) {
            return Err(AdvisoryError::RelevanceModel(
                "mock judgment failure".to_string(),
            ));
        }
        Ok(self.relevant_markers.iter().any(|m| document.contains(m)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::MockGenerationClient;

    #[test]
    fn test_relevance_prompt_format() {
        assert_eq!(
            relevance_prompt("diet I25", "Diet lowers risk.", 100),
            "Query: diet I25 Document: Diet lowers risk. Relevant:"
        );
    }

    #[test]
    fn test_relevance_prompt_truncates_on_char_boundary() {
        let prompt = relevance_prompt("q", "ééééé", 3);
        assert_eq!(prompt, "Query: q Document: ééé Relevant:");
    }

    #[test]
    fn test_positive_judgment() {
        assert!(is_positive_judgment("true"));
        assert!(is_positive_judgment(" True"));
        assert!(!is_positive_judgment("false"));
        assert!(!is_positive_judgment(""));
    }

    #[tokio::test]
    async fn test_generative_model_uses_two_tokens() {
        let client = MockGenerationClient::new();
        client.add_response("true").await;
        client.add_response("false").await;
        let model = GenerativeRelevanceModel::new(Arc::new(client.clone()));

        assert!(model.judge("diet", "diet doc").await.unwrap());
        assert!(!model.judge("diet", "other doc").await.unwrap());

        let prompts = client.prompts().await;
        assert_eq!(prompts[0].1, 2);
        assert!(prompts[0].0.starts_with("Query: diet Document: diet doc"));
    }

    #[tokio::test]
    async fn test_generative_model_wraps_errors() {
        let client = MockGenerationClient::new();
        client.add_error(AdvisoryError::Timeout).await;
        let model = GenerativeRelevanceModel::new(Arc::new(client));

        let err = model.judge("q", "d").await.unwrap_err();
        assert!(matches!(err, AdvisoryError::RelevanceModel(_)));
    }

    #[tokio::test]
    async fn test_mock_model_rules() {
        let model = MockRelevanceModel::new()
            .relevant_when_contains("Diet")
            .failing_when_contains("corrupt");

        assert!(model.judge("q", "a DIET study").await.unwrap());
        assert!(!model.judge("q", "sleep").await.unwrap());
        assert!(model.judge("q", "corrupt diet").await.is_err());
        assert_eq!(model.calls(), 3);
    }
}
