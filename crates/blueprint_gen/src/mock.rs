//! Scripted text generator for testing.
//!
//! Returns predefined replies in order and captures every prompt, so the
//! pipeline can be exercised without an LLM.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{GenError, GenResult};
use crate::llm::TextGenerator;

/// Predefined reply for one generation call.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Failure(String),
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedPrompt {
    pub prompt: String,
    pub max_tokens: u32,
}

/// Mock text generator.
#[derive(Clone, Default)]
pub struct MockGenerator {
    /// Replies handed out in order.
    replies: Arc<RwLock<Vec<MockReply>>>,
    /// Index of next reply to return.
    reply_index: Arc<AtomicUsize>,
    /// Captured calls for verification.
    captured: Arc<RwLock<Vec<CapturedPrompt>>>,
    /// Artificial latency per call.
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a successful reply.
    pub fn add_response(self, text: impl Into<String>) -> Self {
        self.replies.write().push(MockReply::Text(text.into()));
        self
    }

    /// Add a failing reply.
    pub fn add_failure(self, message: impl Into<String>) -> Self {
        self.replies.write().push(MockReply::Failure(message.into()));
        self
    }

    /// Delay every call by `delay`.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write() = Some(delay);
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedPrompt> {
        self.captured.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured.read().len()
    }

    fn next_reply(&self) -> Option<MockReply> {
        let index = self.reply_index.fetch_add(1, Ordering::SeqCst);
        self.replies.read().get(index).cloned()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> GenResult<String> {
        self.captured.write().push(CapturedPrompt {
            prompt: prompt.to_string(),
            max_tokens,
        });

        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_reply() {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Failure(message)) => Err(GenError::Llm(message)),
            None => Err(GenError::Llm("No scripted reply left".to_string())),
        }
    }
}
