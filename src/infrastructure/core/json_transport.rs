use super::http_client_factory::HttpClientFactory;
use crate::domain::errors::QuoteError;
use crate::domain::ports::JsonTransport;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// `JsonTransport` over reqwest with the retry middleware stack.
pub struct HttpJsonTransport {
    client: ClientWithMiddleware,
    timeout: Duration,
}

impl HttpJsonTransport {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            client: HttpClientFactory::create_client(timeout, max_retries),
            timeout,
        }
    }

    fn classify(&self, url: &str, error: reqwest_middleware::Error) -> QuoteError {
        match &error {
            reqwest_middleware::Error::Reqwest(inner) if inner.is_timeout() => QuoteError::Timeout {
                url: url.to_string(),
                duration_ms: self.timeout.as_millis() as u64,
            },
            _ => QuoteError::Transport {
                url: url.to_string(),
                reason: error.to_string(),
            },
        }
    }

    async fn read_json(&self, url: &str, response: reqwest::Response) -> Result<Value, QuoteError> {
        let status = response.status();
        if !status.is_success() {
            return Err(QuoteError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                QuoteError::Timeout {
                    url: url.to_string(),
                    duration_ms: self.timeout.as_millis() as u64,
                }
            } else {
                QuoteError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        serde_json::from_str(&body).map_err(|e| QuoteError::MalformedResponse {
            url: url.to_string(),
            reason: format!("invalid JSON: {}", e),
        })
    }
}

#[async_trait]
impl JsonTransport for HttpJsonTransport {
    async fn get_json(&self, url: &str) -> Result<Value, QuoteError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;
        self.read_json(url, response).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, QuoteError> {
        debug!("POST {}", url);
        let payload = serde_json::to_vec(body).map_err(|e| QuoteError::Transport {
            url: url.to_string(),
            reason: format!("failed to encode request body: {}", e),
        })?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;
        self.read_json(url, response).await
    }
}
