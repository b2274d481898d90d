//! Provider context
//!
//! Built once at startup and shared read-only by every lifecycle call.

use super::template::FieldMap;
use crate::gcp::auth::region_from_zone;
use crate::gcp::transport::Transport;
use std::sync::Arc;
use std::time::Duration;

/// Compute Engine v1 REST root
pub const DEFAULT_COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1/";

/// Ambient defaults applied when a declared state leaves an identity field unset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defaults {
    pub project: Option<String>,
    pub region: Option<String>,
    pub zone: Option<String>,
}

#[derive(Clone)]
pub struct ProviderContext {
    transport: Arc<dyn Transport>,
    defaults: Defaults,
    compute_endpoint: String,
    operation_timeout: Option<Duration>,
    poll_interval: Option<Duration>,
}

impl ProviderContext {
    pub fn new(transport: Arc<dyn Transport>, defaults: Defaults) -> Self {
        Self {
            transport,
            defaults,
            compute_endpoint: DEFAULT_COMPUTE_ENDPOINT.to_string(),
            operation_timeout: None,
            poll_interval: None,
        }
    }

    /// Point Compute API calls somewhere else (e.g. a mock server)
    pub fn with_compute_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let mut endpoint = endpoint.into();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        self.compute_endpoint = endpoint;
        self
    }

    /// Override every resource kind's operation timeout
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Override every resource kind's minimum poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn project(&self) -> Option<&str> {
        self.defaults.project.as_deref()
    }

    /// Default region, falling back to the region of the default zone
    pub fn region(&self) -> Option<String> {
        self.defaults
            .region
            .clone()
            .or_else(|| self.defaults.zone.as_deref().and_then(region_from_zone))
    }

    pub fn zone(&self) -> Option<&str> {
        self.defaults.zone.as_deref()
    }

    /// Defaults as a field map, for filling in unresolved template fields
    pub fn default_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        if let Some(project) = self.project() {
            fields.insert("project".to_string(), project.to_string());
        }
        if let Some(region) = self.region() {
            fields.insert("region".to_string(), region);
        }
        if let Some(zone) = self.zone() {
            fields.insert("zone".to_string(), zone.to_string());
        }
        fields
    }

    /// Build an absolute Compute API URL from a relative path
    pub fn compute_url(&self, path: &str) -> String {
        format!("{}{}", self.compute_endpoint, path.trim_start_matches('/'))
    }

    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.operation_timeout.unwrap_or(default)
    }

    pub fn poll_interval_or(&self, default: Duration) -> Duration {
        self.poll_interval.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use reqwest::Method;
    use serde_json::Value;

    struct NoTransport;

    #[async_trait]
    impl Transport for NoTransport {
        async fn send(&self, _: Method, _: &str, _: Option<&Value>) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    fn context(defaults: Defaults) -> ProviderContext {
        ProviderContext::new(Arc::new(NoTransport), defaults)
    }

    #[test]
    fn test_region_falls_back_to_zone() {
        let ctx = context(Defaults {
            project: Some("my-project".to_string()),
            region: None,
            zone: Some("us-east1-b".to_string()),
        });
        assert_eq!(ctx.region().as_deref(), Some("us-east1"));
        assert_eq!(ctx.default_fields().get("region").map(String::as_str), Some("us-east1"));
    }

    #[test]
    fn test_compute_url_joins_cleanly() {
        let ctx =
            context(Defaults::default()).with_compute_endpoint("http://127.0.0.1:9000/compute/v1");
        assert_eq!(
            ctx.compute_url("/projects/p/global/routes"),
            "http://127.0.0.1:9000/compute/v1/projects/p/global/routes"
        );
    }
}
