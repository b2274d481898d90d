//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication
//! and HTTP functionality.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use super::transport::Transport;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

/// Authenticated GCP REST client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
}

impl GcpClient {
    /// Create a client authenticated with Application Default Credentials
    pub async fn new() -> anyhow::Result<Self> {
        let credentials = GcpCredentials::new().await?;
        Ok(Self::with_credentials(credentials)?)
    }

    /// Create a client that sends a fixed access token
    pub fn with_access_token(token: impl Into<String>) -> Result<Self> {
        Self::with_credentials(GcpCredentials::from_access_token(token))
    }

    fn with_credentials(credentials: GcpCredentials) -> Result<Self> {
        Ok(Self {
            credentials,
            http: GcpHttpClient::new()?,
        })
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials
            .get_token()
            .await
            .map_err(|e| Error::transport(None, format!("{e:#}")))
    }
}

#[async_trait]
impl Transport for GcpClient {
    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.send(method, url, &token, body).await
    }
}
