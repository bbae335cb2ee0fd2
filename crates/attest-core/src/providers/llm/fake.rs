use super::{Completion, CompletionClient, CompletionError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Scripted completion client for tests: pops one reply per call, and
/// keeps repeating the final reply once the script is exhausted.
pub struct FakeClient {
    script: Mutex<VecDeque<Result<Completion, CompletionError>>>,
    last: Mutex<Option<Result<Completion, CompletionError>>>,
    calls: AtomicU32,
}

impl FakeClient {
    pub fn scripted(replies: Vec<Result<Completion, CompletionError>>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_text(text: &str) -> Self {
        Self::scripted(vec![Ok(Completion {
            text: text.to_string(),
            tokens_used: (text.len() / 4) as u32,
        })])
    }

    pub fn failing(err: CompletionError) -> Self {
        Self::scripted(vec![Err(err)])
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for FakeClient {
    async fn complete(
        &self,
        _prompt: &str,
        _max_output_tokens: u32,
    ) -> Result<Completion, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        match script.pop_front() {
            Some(reply) => {
                *self.last.lock().unwrap() = Some(reply.clone());
                reply
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(CompletionError::Transport("script exhausted".into()))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
