//! Generative-model seam.
//!
//! The engine talks to the counsel/judge model through one narrow trait so
//! tests can script responses without a network. The HTTP adapter lives
//! behind it; payload parsing and structural validation live in
//! [`payloads`], and nothing past that boundary sees raw model output.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::errors::EngineError;

pub mod client;
pub mod payloads;
pub mod retry;

pub use client::HttpCounselModel;

#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub user_prompt: String,
}

#[async_trait]
pub trait CounselModel: Send + Sync {
    /// One phase-shaped JSON object per call. Transport failures arrive
    /// already retried and classified.
    async fn complete(&self, req: ModelRequest) -> Result<Value, EngineError>;
}
