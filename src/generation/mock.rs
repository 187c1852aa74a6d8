//! Mock generation client for testing.
//!
//! Responses are served from a FIFO queue; queued errors are returned as-is so
//! tests can check that failures propagate. With an empty queue the client
//! echoes the start of the prompt.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::GenerationClient;
use crate::error::{AdvisoryError, Result};

/// Deterministic generation client. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockGenerationClient {
    responses: Arc<Mutex<Vec<Result<String>>>>,
    prompts: Arc<Mutex<Vec<(String, usize)>>>,
}

impl MockGenerationClient {
    /// Create a client with an empty response queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub async fn add_response(&self, response: impl Into<String>) {
        self.responses.lock().await.push(Ok(response.into()));
    }

    /// Queue an error.
    pub async fn add_error(&self, error: AdvisoryError) {
        self.responses.lock().await.push(Err(error));
    }

    /// Every `(prompt, max_tokens)` pair received so far.
    pub async fn prompts(&self) -> Vec<(String, usize)> {
        self.prompts.lock().await.clone()
    }

    /// Number of calls received.
    pub async fn call_count(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String> {
        self.prompts
            .lock()
            .await
            .push((prompt.to_string(), max_tokens));

        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            let preview: String = prompt.chars().take(200).collect();
            Ok(format!("[mock output]\n{}...", preview))
        } else {
            responses.remove(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_order() {
        let client = MockGenerationClient::new();
        client.add_response("first").await;
        client.add_response("second").await;

        assert_eq!(client.generate("p", 10).await.unwrap(), "first");
        assert_eq!(client.generate("p", 10).await.unwrap(), "second");
        assert!(client.generate("p", 10).await.unwrap().starts_with("[mock output]"));
        assert_eq!(client.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_queued_error_returned() {
        let client = MockGenerationClient::new();
        client.add_error(AdvisoryError::Timeout).await;
        assert!(matches!(
            client.generate("p", 1).await,
            Err(AdvisoryError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_records_prompts() {
        let client = MockGenerationClient::new();
        client.generate("hello", 42).await.unwrap();
        assert_eq!(client.prompts().await, vec![("hello".to_string(), 42)]);
    }

    #[tokio::test]
    async fn test_default_echo_is_char_safe() {
        let client = MockGenerationClient::new();
        let prompt = "é".repeat(300);
        let out = client.generate(&prompt, 8).await.unwrap();
        assert!(out.contains(&"é".repeat(200)));
    }
}
