//! A [`Provider`] that replays canned responses.
//!
//! Used by dry runs and tests in place of a live model. Every request is
//! kept so callers can inspect what was asked.

use async_trait::async_trait;
use murmur_core::error::ProviderError;
use murmur_core::message::Message;
use murmur_core::provider::{Provider, ProviderRequest, ProviderResponse};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Script {
    queue: VecDeque<Result<ProviderResponse, ProviderError>>,
    last: Option<ProviderResponse>,
    requests: Vec<ProviderRequest>,
}

/// Returns the scripted responses in order.
///
/// Once the script runs out it either repeats the last response (with
/// [`ScriptedProvider::repeat_last`]) or fails with `InvalidResponse`.
pub struct ScriptedProvider {
    script: Mutex<Script>,
    repeat_last: bool,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            script: Mutex::new(Script {
                queue: responses.into_iter().map(Ok).collect(),
                ..Script::default()
            }),
            repeat_last: false,
        }
    }

    /// One plain-text reply per call.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(text_response).collect())
    }

    /// Keep answering with the final response after the script is exhausted.
    pub fn repeat_last(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    /// Queue a failure at the current end of the script.
    pub fn then_fail(self, error: ProviderError) -> Self {
        self.lock().queue.push_back(Err(error));
        self
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.lock().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }
}

/// A text-only response.
pub fn text_response(text: impl Into<String>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: None,
        model: "scripted".into(),
        images: Vec::new(),
        citations: 0,
    }
}

/// A response carrying one generated image.
pub fn image_response(data_uri: impl Into<String>) -> ProviderResponse {
    ProviderResponse {
        images: vec![data_uri.into()],
        ..text_response("")
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut script = self.lock();
        script.requests.push(request);
        match script.queue.pop_front() {
            Some(Ok(response)) => {
                script.last = Some(response.clone());
                Ok(response)
            }
            Some(Err(e)) => Err(e),
            None => match (&script.last, self.repeat_last) {
                (Some(last), true) => Ok(last.clone()),
                _ => Err(ProviderError::InvalidResponse("script exhausted".into())),
            },
        }
    }
}
