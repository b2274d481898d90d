//! Transport seam
//!
//! The reconciliation engine never talks to reqwest directly; every remote
//! call goes through [`Transport`].

use crate::error::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `body` (if any) to `url` and return the decoded JSON response.
    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value>;
}
