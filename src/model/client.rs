//! HTTP adapter for the generative-model service.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tokio::time::Duration;

use super::retry::{retry_async, RetryConfig};
use super::{CounselModel, ModelRequest};
use crate::errors::{EngineError, TransportKind};

pub struct HttpCounselModel {
    client: Client,
    base: String,
    api_key: String,
    retry: RetryConfig,
}

impl HttpCounselModel {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base: std::env::var("MODEL_BASE")
                .unwrap_or_else(|_| "https://api.mootcourt.dev".to_string()),
            api_key,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn post_once(&self, req: &ModelRequest) -> Result<Value, EngineError> {
        let url = format!("{}/v1/generate", self.base);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await
            .map_err(|e| EngineError::Transport {
                kind: if e.is_timeout() {
                    TransportKind::Timeout
                } else {
                    TransportKind::Network
                },
                detail: e.to_string(),
            })?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| EngineError::Transport {
            kind: TransportKind::Network,
            detail: format!("read body failed: {}", e),
        })?;

        if !(200..300).contains(&status) {
            return Err(EngineError::Transport {
                kind: TransportKind::from_status(status),
                detail: format!("status {}: {}", status, body),
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| EngineError::Validation(format!("response is not JSON: {}", e)))
    }
}

#[async_trait]
impl CounselModel for HttpCounselModel {
    async fn complete(&self, req: ModelRequest) -> Result<Value, EngineError> {
        retry_async(&self.retry, "model.complete", || self.post_once(&req)).await
    }
}
