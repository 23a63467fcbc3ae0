//! Resilient LLM client wrapper with exponential backoff retry
//!
//! Wraps any LlmPort implementation with retry logic to handle transient
//! failures, so an unresponsive model endpoint cannot permanently block
//! moderation.

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::ports::{LlmError, LlmPort, LlmRequest, LlmResponse};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries, just the initial attempt)
    pub max_retries: u32,
    /// Base delay in milliseconds before first retry
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,
    /// Jitter factor (0.0-1.0) for randomizing delays to prevent thundering herd
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            jitter_factor: 0.2,
        }
    }
}

/// Wrapper that adds retry logic to any LLM client
pub struct ResilientLlmClient {
    inner: Arc<dyn LlmPort>,
    config: RetryConfig,
}

impl ResilientLlmClient {
    pub fn new(inner: Arc<dyn LlmPort>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Calculate delay for a given attempt number using exponential backoff with jitter
    fn calculate_delay(&self, attempt: u32) -> u64 {
        let base = self.config.base_delay_ms;
        let exponential = base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        let capped = exponential.min(self.config.max_delay_ms);

        let jitter_range = (capped as f64 * self.config.jitter_factor) as i64;
        if jitter_range > 0 {
            let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            (capped as i64 + jitter).max(0) as u64
        } else {
            capped
        }
    }

    /// Determine if an error is retryable
    fn is_retryable(error: &LlmError) -> bool {
        match error {
            // Network/request failures are typically transient, but auth
            // errors and bad requests will not fix themselves
            LlmError::RequestFailed(msg) => {
                !msg.contains("401")
                    && !msg.contains("403")
                    && !msg.contains("400")
                    && !msg.contains("Invalid")
            }
            // Malformed responses can be transient (truncated body)
            LlmError::InvalidResponse(_) => true,
        }
    }
}

#[async_trait]
impl LlmPort for ResilientLlmClient {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.inner.generate(request.clone()).await {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::info!(attempt = attempt + 1, "LLM request succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) => {
                    let retryable = Self::is_retryable(&e);

                    if attempt < self.config.max_retries && retryable {
                        let delay = self.calculate_delay(attempt + 1);
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_retries = self.config.max_retries,
                            delay_ms = delay,
                            error = %e,
                            "LLM request failed, retrying..."
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    } else if !retryable {
                        tracing::error!(error = %e, "LLM request failed with non-retryable error");
                        return Err(e);
                    }

                    last_error = Some(e);
                }
            }
        }

        let error =
            last_error.unwrap_or_else(|| LlmError::RequestFailed("Unknown error".to_string()));
        tracing::error!(
            attempts = self.config.max_retries + 1,
            error = %error,
            "LLM request failed after all retry attempts"
        );
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// LLM that fails a configurable number of times before succeeding
    struct FailingLlm {
        failures_remaining: AtomicU32,
        error_message: String,
    }

    impl FailingLlm {
        fn new(failure_count: u32, error_message: &str) -> Self {
            Self {
                failures_remaining: AtomicU32::new(failure_count),
                error_message: error_message.to_string(),
            }
        }
    }

    #[async_trait]
    impl LlmPort for FailingLlm {
        async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
            let remaining = self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
            if remaining > 0 {
                Err(LlmError::RequestFailed(self.error_message.clone()))
            } else {
                Ok(LlmResponse {
                    content: "[]".to_string(),
                })
            }
        }
    }

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay_ms: 1,
            max_delay_ms: 10,
            jitter_factor: 0.0,
        }
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let client = ResilientLlmClient::new(
            Arc::new(FailingLlm::new(0, "unused")),
            RetryConfig::default(),
        );
        let result = client.generate(LlmRequest::new(vec![])).await;
        assert_eq!(result.expect("success").content, "[]");
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let client =
            ResilientLlmClient::new(Arc::new(FailingLlm::new(2, "timeout")), fast_config(3));
        assert!(client.generate(LlmRequest::new(vec![])).await.is_ok());
    }

    #[tokio::test]
    async fn fails_after_max_retries() {
        let client =
            ResilientLlmClient::new(Arc::new(FailingLlm::new(10, "timeout")), fast_config(2));
        assert!(client.generate(LlmRequest::new(vec![])).await.is_err());
    }

    #[tokio::test]
    async fn auth_errors_are_not_retried() {
        let inner = Arc::new(FailingLlm::new(10, "401 Unauthorized"));
        let client = ResilientLlmClient::new(inner.clone(), fast_config(3));

        assert!(client.generate(LlmRequest::new(vec![])).await.is_err());
        // Single attempt only.
        assert_eq!(inner.failures_remaining.load(Ordering::SeqCst), 9);
    }

    #[test]
    fn backoff_grows_exponentially_to_the_cap() {
        let client = ResilientLlmClient::new(
            Arc::new(FailingLlm::new(0, "")),
            RetryConfig {
                max_retries: 5,
                base_delay_ms: 1000,
                max_delay_ms: 30000,
                jitter_factor: 0.0,
            },
        );
        assert_eq!(client.calculate_delay(1), 1000);
        assert_eq!(client.calculate_delay(2), 2000);
        assert_eq!(client.calculate_delay(3), 4000);
        assert_eq!(client.calculate_delay(6), 30000);
    }
}
