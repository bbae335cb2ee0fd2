use async_trait::async_trait;
use tokio::time::{sleep, timeout, Duration};

pub mod fake;
pub mod openai;

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u32,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionError {
    #[error("completion request timed out after {0}s")]
    Timeout(u64),
    #[error("completion transport error: {0}")]
    Transport(String),
    #[error("completion API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl CompletionError {
    /// Timeouts, transport failures, rate limits and server errors are
    /// worth another attempt; other API rejections are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Timeout(_) | CompletionError::Transport(_) => true,
            CompletionError::Api { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<Completion, CompletionError>;
    fn provider_name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            timeout_seconds: 60,
        }
    }
}

/// One completion call with an explicit timeout and bounded exponential
/// backoff. Only retryable failures are retried; the last error is
/// returned once attempts are exhausted.
pub async fn complete_with_retry(
    client: &dyn CompletionClient,
    prompt: &str,
    max_output_tokens: u32,
    policy: &RetryPolicy,
) -> Result<Completion, CompletionError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut delay_ms = policy.base_delay_ms;
    let mut last_err = CompletionError::Transport("no attempts made".into());

    for attempt in 1..=max_attempts {
        let fut = client.complete(prompt, max_output_tokens);
        let result = match timeout(Duration::from_secs(policy.timeout_seconds), fut).await {
            Ok(r) => r,
            Err(_) => Err(CompletionError::Timeout(policy.timeout_seconds)),
        };

        match result {
            Ok(c) => return Ok(c),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    event = "attest.completion.retry",
                    provider = client.provider_name(),
                    attempt,
                    error = %e,
                );
                sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = delay_ms.saturating_mul(2);
                last_err = e;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(CompletionError::Timeout(30).is_retryable());
        assert!(CompletionError::Transport("connection reset".into()).is_retryable());
        assert!(CompletionError::Api {
            status: 429,
            message: "rate limited".into()
        }
        .is_retryable());
        assert!(CompletionError::Api {
            status: 503,
            message: "overloaded".into()
        }
        .is_retryable());
        assert!(!CompletionError::Api {
            status: 401,
            message: "bad key".into()
        }
        .is_retryable());
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let client = fake::FakeClient::scripted(vec![
            Err(CompletionError::Transport("reset".into())),
            Ok(Completion {
                text: "{}".into(),
                tokens_used: 1,
            }),
        ]);
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            timeout_seconds: 5,
        };
        let out = complete_with_retry(&client, "p", 100, &policy).await.unwrap();
        assert_eq!(out.tokens_used, 1);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn does_not_retry_non_retryable() {
        let client = fake::FakeClient::scripted(vec![Err(CompletionError::Api {
            status: 400,
            message: "bad request".into(),
        })]);
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            timeout_seconds: 5,
        };
        let err = complete_with_retry(&client, "p", 100, &policy)
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(client.calls(), 1);
    }
}
