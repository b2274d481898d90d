//! Resource controller
//!
//! One generic Create/Read/Delete/Import state machine shared by every
//! resource kind. A kind only supplies its templates, timeouts and field
//! codec through [`ResourceKind`].
//!
//! Identity lifecycle: `Absent -> Creating -> Present -> Deleting -> Absent`.
//! A Read that finds nothing moves `Present -> Absent` directly.

use super::context::ProviderContext;
use super::import;
use super::operation::{Operation, OperationWaiter};
use super::template::{FieldMap, Template};
use super::value::WirePayload;
use crate::error::{Error, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Per-kind operation deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub delete: Duration,
    pub min_poll_interval: Duration,
}

/// What a resource kind plugs into the controller
pub trait ResourceKind: Send + Sync {
    /// Declared state, keyed by schema field names when serialized
    type State: Clone + Default + fmt::Debug + Serialize + DeserializeOwned + Send + Sync;

    /// Name used in logs and operation descriptions, e.g. `Address`
    const NAME: &'static str;
    /// Durable id, e.g. `{project}/{region}/{name}`
    const ID: Template;
    /// Relative path of the collection new objects are POSTed to
    const COLLECTION_PATH: Template;
    /// Relative path of one object
    const SELF_PATH: Template;
    /// Import id patterns, most specific first
    const IMPORT_PATTERNS: &'static [&'static str];
    const TIMEOUTS: Timeouts;

    /// Identity fields of a declared state, context defaults applied
    fn identity(&self, state: &Self::State, ctx: &ProviderContext) -> Result<FieldMap>;

    /// Build the insert payload (config -> wire)
    fn expand(&self, state: &Self::State, ctx: &ProviderContext) -> Result<WirePayload>;

    /// Hydrate declared state from the server's representation (wire -> config)
    fn flatten(&self, remote: &Value, identity: &FieldMap) -> Result<Self::State>;

    /// State holding only the identity fields an import resolved
    fn seed(&self, identity: &FieldMap) -> Self::State;
}

/// Persisted record: the flat field map plus the id handle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceData<S> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub state: S,
}

impl<S> ResourceData<S> {
    /// A record for a declared state that doesn't exist yet
    pub fn desired(state: S) -> Self {
        Self { id: None, state }
    }

    pub fn is_present(&self) -> bool {
        self.id.is_some()
    }
}

/// Result of a Read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The object exists and the record was hydrated from it
    Present,
    /// The object is gone; the record's id has been dropped
    Absent,
}

fn with_request_id(url: String) -> String {
    format!("{}?requestId={}", url, Uuid::new_v4())
}

pub struct ResourceController<K> {
    kind: K,
}

impl<K: ResourceKind> ResourceController<K> {
    pub fn new(kind: K) -> Self {
        Self { kind }
    }

    fn identity_from_id(&self, id: &str) -> Result<FieldMap> {
        K::ID.parse(id).ok_or_else(|| {
            Error::validation(
                "id",
                format!("{:?} doesn't match the {} id format {:?}", id, K::NAME, K::ID.as_str()),
            )
        })
    }

    fn require_id<'d>(&self, data: &'d ResourceData<K::State>) -> Result<&'d str> {
        data.id
            .as_deref()
            .ok_or_else(|| Error::validation("id", format!("{} has no id", K::NAME)))
    }

    fn waiter<'a>(
        &self,
        ctx: &'a ProviderContext,
        identity: &'a FieldMap,
        verb: &str,
        timeout: Duration,
    ) -> OperationWaiter<'a> {
        OperationWaiter::new(
            ctx,
            identity.get("project").map(String::as_str).unwrap_or_default(),
            format!("{} {}", verb, K::NAME),
            ctx.timeout_or(timeout),
            ctx.poll_interval_or(K::TIMEOUTS.min_poll_interval),
        )
    }

    /// Create the declared object and hydrate `data` from the result.
    ///
    /// `data.id` is only set once the insert was accepted, and is cleared
    /// again if the operation fails or times out.
    pub async fn create(
        &self,
        ctx: &ProviderContext,
        data: &mut ResourceData<K::State>,
    ) -> Result<String> {
        let identity = self.kind.identity(&data.state, ctx)?;
        let payload = self.kind.expand(&data.state, ctx)?;
        let id = K::ID.render(&identity)?;
        let url = with_request_id(ctx.compute_url(&K::COLLECTION_PATH.render(&identity)?));

        tracing::debug!("Creating new {}: {:?}", K::NAME, payload);
        let response = ctx
            .transport()
            .send(Method::POST, &url, Some(&payload.into_value()))
            .await
            .map_err(|e| {
                tracing::error!("Error creating {} {:?}: {}", K::NAME, id, e);
                e
            })?;

        data.id = Some(id.clone());

        let waited = match Operation::from_response(response) {
            Ok(op) => self.waiter(ctx, &identity, "Creating", K::TIMEOUTS.create).wait(op).await,
            Err(e) => Err(e),
        };
        if let Err(e) = waited {
            // The resource didn't actually create, or we can't tell
            data.id = None;
            return Err(e);
        }

        tracing::info!("Finished creating {} {:?}", K::NAME, id);

        if self.read(ctx, data).await? == ReadOutcome::Absent {
            tracing::warn!("{} {:?} vanished right after creation", K::NAME, id);
        }
        Ok(id)
    }

    /// Refresh `data` from the remote object named by `data.id`
    pub async fn read(
        &self,
        ctx: &ProviderContext,
        data: &mut ResourceData<K::State>,
    ) -> Result<ReadOutcome> {
        let id = self.require_id(data)?.to_string();
        let identity = self.identity_from_id(&id)?;
        let url = ctx.compute_url(&K::SELF_PATH.render(&identity)?);

        match ctx.transport().send(Method::GET, &url, None).await {
            Ok(remote) => {
                data.state = self.kind.flatten(&remote, &identity)?;
                Ok(ReadOutcome::Present)
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!("Removing {} {:?} because it's gone", K::NAME, id);
                data.id = None;
                Ok(ReadOutcome::Absent)
            },
            Err(e) => Err(e),
        }
    }

    /// Delete the remote object named by `data.id`.
    ///
    /// An object that is already gone counts as deleted. On any other
    /// failure `data.id` is left in place so the delete can be retried.
    pub async fn delete(
        &self,
        ctx: &ProviderContext,
        data: &mut ResourceData<K::State>,
    ) -> Result<()> {
        let id = self.require_id(data)?.to_string();
        let identity = self.identity_from_id(&id)?;
        let url = with_request_id(ctx.compute_url(&K::SELF_PATH.render(&identity)?));

        tracing::debug!("Deleting {} {:?}", K::NAME, id);
        let response = match ctx.transport().send(Method::DELETE, &url, None).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                tracing::info!("{} {:?} was already deleted", K::NAME, id);
                data.id = None;
                return Ok(());
            },
            Err(e) => return Err(e),
        };

        let op = Operation::from_response(response)?;
        self.waiter(ctx, &identity, "Deleting", K::TIMEOUTS.delete).wait(op).await?;

        tracing::info!("Finished deleting {} {:?}", K::NAME, id);
        data.id = None;
        Ok(())
    }

    /// Turn a user-supplied import id into a record ready for Read.
    ///
    /// Only identity fields are seeded; the caller follows up with
    /// [`read`](Self::read) to hydrate the rest.
    pub fn import(&self, ctx: &ProviderContext, import_id: &str) -> Result<ResourceData<K::State>> {
        let fields = import::resolve(import_id, K::IMPORT_PATTERNS, &ctx.default_fields())?;
        let id = K::ID.render(&fields)?;
        tracing::info!("Importing {} {:?} as {:?}", K::NAME, import_id, id);

        Ok(ResourceData {
            id: Some(id),
            state: self.kind.seed(&fields),
        })
    }
}
