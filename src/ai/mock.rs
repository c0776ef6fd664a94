use super::{CompletionService, DescribeService, ProviderError};
use crate::models::DescribeRequest;
use crate::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Recorded system/user pair sent to a [`MockCompletionClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCompletion {
    pub system_prompt: String,
    pub user_prompt: String,
}

pub struct MockCompletionClient {
    responses: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<ProviderError>>>,
    requests: Arc<Mutex<Vec<RecordedCompletion>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_response(self, response: String) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    /// Fail every call with the given provider error.
    pub fn with_failure(self, failure: ProviderError) -> Self {
        *self.failure.lock().unwrap() = Some(failure);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn recorded_requests(&self) -> Vec<RecordedCompletion> {
        self.requests.lock().unwrap().clone()
    }

    /// Handle sharing this mock's counters, usable after the mock itself has
    /// been boxed into an app.
    pub fn handle(&self) -> Self {
        Self {
            responses: Arc::clone(&self.responses),
            failure: Arc::clone(&self.failure),
            requests: Arc::clone(&self.requests),
            call_count: Arc::clone(&self.call_count),
        }
    }
}

impl Default for MockCompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionService for MockCompletionClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let count = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };

        self.requests.lock().unwrap().push(RecordedCompletion {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
        });

        if let Some(failure) = self.failure.lock().unwrap().clone() {
            return Err(failure.into());
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Default mock response
            Ok(format!("An expanded prompt for {}", user_prompt))
        } else {
            let index = (count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

pub struct MockDescribeClient {
    responses: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<ProviderError>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockDescribeClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_response(self, response: String) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    pub fn with_failure(self, failure: ProviderError) -> Self {
        *self.failure.lock().unwrap() = Some(failure);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn handle(&self) -> Self {
        Self {
            responses: Arc::clone(&self.responses),
            failure: Arc::clone(&self.failure),
            call_count: Arc::clone(&self.call_count),
        }
    }
}

impl Default for MockDescribeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DescribeService for MockDescribeClient {
    async fn describe(&self, _request: &DescribeRequest) -> Result<String> {
        let count = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };

        if let Some(failure) = self.failure.lock().unwrap().clone() {
            return Err(failure.into());
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("A described scene".to_string())
        } else {
            let index = (count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}
