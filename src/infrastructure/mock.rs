use crate::domain::errors::QuoteError;
use crate::domain::ports::JsonTransport;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMethod {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub method: MockMethod,
    pub url: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct MockState {
    queued: HashMap<String, VecDeque<Result<Value, QuoteError>>>,
    sticky: HashMap<String, Value>,
    delays: HashMap<String, Duration>,
    calls: Vec<MockCall>,
}

/// Scripted `JsonTransport` for tests.
///
/// Replies are matched on the exact URL: queued replies are consumed first,
/// then the sticky reply (if any) is returned on every call. A URL with
/// nothing scripted fails with a transport error, like an unreachable host.
#[derive(Default)]
pub struct MockJsonTransport {
    state: Mutex<MockState>,
}

impl MockJsonTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, url: &str, body: Value) {
        self.push(url, Ok(body));
    }

    pub fn push_err(&self, url: &str, error: QuoteError) {
        self.push(url, Err(error));
    }

    /// Replies with `body` on every call once the queue for `url` is drained.
    pub fn always(&self, url: &str, body: Value) {
        if let Ok(mut state) = self.state.lock() {
            state.sticky.insert(url.to_string(), body);
        }
    }

    /// Delays every reply for `url`, e.g. to trigger attempt timeouts.
    pub fn delay(&self, url: &str, delay: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.delays.insert(url.to_string(), delay);
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    pub fn posted_bodies(&self) -> Vec<Value> {
        self.calls().into_iter().filter_map(|c| c.body).collect()
    }

    fn push(&self, url: &str, reply: Result<Value, QuoteError>) {
        if let Ok(mut state) = self.state.lock() {
            state
                .queued
                .entry(url.to_string())
                .or_default()
                .push_back(reply);
        }
    }

    async fn reply(&self, method: MockMethod, url: &str, body: Option<&Value>) -> Result<Value, QuoteError> {
        let (delay, reply) = {
            let mut state = self.state.lock().map_err(|e| QuoteError::Transport {
                url: url.to_string(),
                reason: format!("mock state poisoned: {}", e),
            })?;
            state.calls.push(MockCall {
                method,
                url: url.to_string(),
                body: body.cloned(),
            });
            let delay = state.delays.get(url).copied();
            let queued = state.queued.get_mut(url).and_then(VecDeque::pop_front);
            let reply = match queued {
                Some(reply) => reply,
                None => match state.sticky.get(url) {
                    Some(value) => Ok(value.clone()),
                    None => Err(QuoteError::Transport {
                        url: url.to_string(),
                        reason: "connection refused".to_string(),
                    }),
                },
            };
            (delay, reply)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        debug!("MockJsonTransport: {:?} {} -> ok={}", method, url, reply.is_ok());
        reply
    }
}

#[async_trait]
impl JsonTransport for MockJsonTransport {
    async fn get_json(&self, url: &str) -> Result<Value, QuoteError> {
        self.reply(MockMethod::Get, url, None).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, QuoteError> {
        self.reply(MockMethod::Post, url, Some(body)).await
    }
}
