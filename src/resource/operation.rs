//! Compute operations
//!
//! Every mutating Compute call returns an [`Operation`]. The
//! [`OperationWaiter`] polls it until it is done or the caller's deadline
//! passes:
//!
//! ```text
//! Submitted -> Polling -> Succeeded
//!                      -> Failed     (server-reported error)
//!                      -> TimedOut   (remote state unknown)
//! ```
//!
//! A timeout is never folded into success or failure, and the waiter never
//! retries on its own beyond the poll loop.

use super::context::ProviderContext;
use super::reference::name_from_self_link;
use crate::error::{Error, OperationError, Result};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

/// Upper bound for the backed-off poll interval
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    #[default]
    Pending,
    Running,
    Done,
    #[serde(other)]
    Unknown,
}

/// Where an operation is in its lifecycle, as seen by the waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

/// Operation handle as returned by the Compute API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Operation {
    pub name: String,
    pub status: OperationStatus,
    pub operation_type: Option<String>,
    pub target_link: Option<String>,
    pub self_link: Option<String>,
    pub zone: Option<String>,
    pub region: Option<String>,
    pub error: Option<OperationError>,
}

impl Operation {
    /// Decode a mutating call's response. An empty body means the server
    /// finished the work synchronously.
    pub fn from_response(response: Value) -> Result<Self> {
        if response.is_null() {
            return Ok(Self {
                status: OperationStatus::Done,
                ..Self::default()
            });
        }
        serde_json::from_value(response)
            .map_err(|e| Error::transport(None, format!("unexpected operation response: {e}")))
    }

    pub fn state(&self) -> OperationState {
        match (self.status, &self.error) {
            (OperationStatus::Done, Some(_)) => OperationState::Failed,
            (OperationStatus::Done, None) => OperationState::Succeeded,
            _ => OperationState::Polling,
        }
    }

    /// Relative path of this operation's GET endpoint
    fn poll_path(&self, project: &str) -> Result<String> {
        if self.name.is_empty() {
            return Err(Error::transport(None, "operation has no name and cannot be polled"));
        }
        let path = match (self.zone.as_deref(), self.region.as_deref()) {
            (Some(zone), _) => format!(
                "projects/{}/zones/{}/operations/{}",
                project,
                name_from_self_link(zone),
                self.name
            ),
            (None, Some(region)) => format!(
                "projects/{}/regions/{}/operations/{}",
                project,
                name_from_self_link(region),
                self.name
            ),
            (None, None) => format!("projects/{}/global/operations/{}", project, self.name),
        };
        Ok(path)
    }
}

/// Polls one operation to a terminal state
pub struct OperationWaiter<'a> {
    ctx: &'a ProviderContext,
    project: &'a str,
    description: String,
    timeout: Duration,
    min_interval: Duration,
}

impl<'a> OperationWaiter<'a> {
    pub fn new(
        ctx: &'a ProviderContext,
        project: &'a str,
        description: impl Into<String>,
        timeout: Duration,
        min_interval: Duration,
    ) -> Self {
        Self {
            ctx,
            project,
            description: description.into(),
            timeout,
            min_interval,
        }
    }

    /// Wait for `op` to finish.
    ///
    /// Returns the final operation on success, [`Error::Operation`] when the
    /// server reports a failure and [`Error::Timeout`] once the deadline
    /// passes. Each poll request is itself bounded by the remaining time.
    pub async fn wait(&self, op: Operation) -> Result<Operation> {
        let start = Instant::now();
        let deadline = start + self.timeout;
        let mut interval = self.min_interval;
        let mut op = op;
        let mut state = OperationState::Submitted;

        loop {
            let next = op.state();
            if next != state {
                tracing::debug!(
                    "{}: operation {:?} {:?} -> {:?}",
                    self.description,
                    op.name,
                    state,
                    next
                );
                state = next;
            }

            match state {
                OperationState::Succeeded => {
                    tracing::info!(
                        "{}: {} done in {:?}",
                        self.description,
                        op.operation_type.as_deref().unwrap_or("operation"),
                        start.elapsed()
                    );
                    return Ok(op);
                },
                OperationState::Failed => {
                    let err = op.error.take().unwrap_or_default();
                    tracing::error!("{}: {}", self.description, err);
                    return Err(Error::Operation(err));
                },
                _ => {},
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out(start));
            }
            tokio::time::sleep(interval.min(deadline - now)).await;

            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out(start));
            }

            let url = self.ctx.compute_url(&op.poll_path(self.project)?);
            let request = self.ctx.transport().send(Method::GET, &url, None);
            let response = match tokio::time::timeout(deadline - now, request).await {
                Ok(Err(e)) if e.is_not_found() => {
                    tracing::error!(
                        "{}: operation {:?} disappeared while polling",
                        self.description,
                        op.name
                    );
                    return Err(Error::transport(
                        Some(404),
                        format!("operation {} disappeared while polling", op.name),
                    ));
                },
                Ok(response) => response?,
                Err(_) => return Err(self.timed_out(start)),
            };
            op = Operation::from_response(response)?;

            interval = (interval * 2).min(MAX_POLL_INTERVAL.max(self.min_interval));
        }
    }

    fn timed_out(&self, start: Instant) -> Error {
        tracing::warn!(
            "{}: gave up after {:?}, remote state unknown",
            self.description,
            start.elapsed()
        );
        Error::Timeout {
            description: self.description.clone(),
            elapsed: start.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::transport::Transport;
    use crate::resource::context::Defaults;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replies to polls from a fixed script and records the URLs it saw
    struct Script {
        replies: Mutex<VecDeque<Result<Value>>>,
        seen: Mutex<Vec<String>>,
    }

    impl Script {
        fn new(replies: Vec<Result<Value>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for Script {
        async fn send(&self, _: Method, url: &str, _: Option<&Value>) -> Result<Value> {
            self.seen.lock().unwrap().push(url.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"name": "op-1", "status": "RUNNING"})))
        }
    }

    fn context(script: Arc<Script>) -> ProviderContext {
        ProviderContext::new(script, Defaults::default())
            .with_compute_endpoint("http://compute.test/compute/v1/")
    }

    fn running(extra: Value) -> Operation {
        let mut op = json!({"name": "op-1", "status": "RUNNING"});
        if let (Some(op), Some(extra)) = (op.as_object_mut(), extra.as_object()) {
            op.extend(extra.clone());
        }
        Operation::from_response(op).unwrap()
    }

    #[test]
    fn test_states_from_status() {
        assert_eq!(running(json!({})).state(), OperationState::Polling);
        let done = Operation::from_response(json!({"name": "op", "status": "DONE"})).unwrap();
        assert_eq!(done.state(), OperationState::Succeeded);
        let failed = Operation::from_response(json!({
            "name": "op",
            "status": "DONE",
            "error": {"errors": [{"code": "RESOURCE_IN_USE", "message": "in use"}]}
        }))
        .unwrap();
        assert_eq!(failed.state(), OperationState::Failed);
        let empty = Operation::from_response(Value::Null).unwrap();
        assert_eq!(empty.state(), OperationState::Succeeded);
    }

    #[tokio::test]
    async fn test_done_operation_is_not_polled() {
        let script = Script::new(vec![]);
        let ctx = context(script.clone());
        let waiter = OperationWaiter::new(
            &ctx,
            "p1",
            "Creating Route",
            Duration::from_secs(1),
            Duration::from_millis(1),
        );
        let done = Operation::from_response(json!({"name": "op-1", "status": "DONE"})).unwrap();

        waiter.wait(done).await.unwrap();
        assert!(script.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_polls_regional_operation_until_done() {
        let script = Script::new(vec![
            Ok(json!({"name": "op-1", "status": "RUNNING"})),
            Ok(json!({"name": "op-1", "status": "DONE", "targetLink": "x"})),
        ]);
        let ctx = context(script.clone());
        let waiter = OperationWaiter::new(
            &ctx,
            "p1",
            "Creating Address",
            Duration::from_secs(5),
            Duration::from_millis(1),
        );
        let region = "https://www.googleapis.com/compute/v1/projects/p1/regions/us-central1";
        let op = running(json!({ "region": region }));

        let done = waiter.wait(op).await.unwrap();
        assert_eq!(done.target_link.as_deref(), Some("x"));

        let seen = script.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[0],
            "http://compute.test/compute/v1/projects/p1/regions/us-central1/operations/op-1"
        );
    }

    #[tokio::test]
    async fn test_failed_operation_surfaces_server_error() {
        let script = Script::new(vec![Ok(json!({
            "name": "op-1",
            "status": "DONE",
            "error": {"errors": [{"code": "QUOTA_EXCEEDED", "message": "no quota"}]}
        }))]);
        let ctx = context(script);
        let waiter = OperationWaiter::new(
            &ctx,
            "p1",
            "Creating Route",
            Duration::from_secs(5),
            Duration::from_millis(1),
        );

        match waiter.wait(running(json!({}))).await {
            Err(Error::Operation(err)) => assert_eq!(err.errors[0].code, "QUOTA_EXCEEDED"),
            other => panic!("expected operation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_times_out_instead_of_polling_forever() {
        let script = Script::new(vec![]);
        let ctx = context(script.clone());
        let waiter = OperationWaiter::new(
            &ctx,
            "p1",
            "Deleting Route",
            Duration::from_millis(50),
            Duration::from_millis(5),
        );

        let err = waiter.wait(running(json!({}))).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        let polls = script.seen.lock().unwrap().len();
        assert!(polls >= 1 && polls < 20, "unexpected poll count {}", polls);
    }

    #[tokio::test]
    async fn test_poll_transport_error_is_surfaced() {
        let script = Script::new(vec![Err(Error::transport(Some(503), "backend unavailable"))]);
        let ctx = context(script);
        let waiter = OperationWaiter::new(
            &ctx,
            "p1",
            "Creating Route",
            Duration::from_secs(5),
            Duration::from_millis(1),
        );

        let err = waiter.wait(running(json!({}))).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_vanished_operation_is_not_reported_as_not_found() {
        let script = Script::new(vec![Err(Error::NotFound {
            url: "http://compute.test/compute/v1/projects/p1/global/operations/op-1".to_string(),
        })]);
        let ctx = context(script);
        let waiter = OperationWaiter::new(
            &ctx,
            "p1",
            "Deleting Route",
            Duration::from_secs(5),
            Duration::from_millis(1),
        );

        match waiter.wait(running(json!({}))).await {
            Err(Error::Transport { status, message }) => {
                assert_eq!(status, Some(404));
                assert!(message.contains("op-1"));
            },
            other => panic!("expected transport error, got {:?}", other),
        }
    }
}
