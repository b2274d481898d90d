//! Compute Address
//!
//! A regional static IP address, identified by `{project}/{region}/{name}`.
//! Every field is immutable once created.

use super::context::ProviderContext;
use super::controller::{ResourceKind, Timeouts};
use super::reference::{convert_self_link_to_v1, name_from_self_link, resolve_reference, Scope};
use super::template::{FieldMap, Template};
use super::value::{scalar, wire_str, wire_str_list, WirePayload};
use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;

/// What the server assumes when `addressType` is left out
pub const DEFAULT_ADDRESS_TYPE: &str = "EXTERNAL";

const ADDRESS_TYPES: &[&str] = &["INTERNAL", "EXTERNAL", ""];
const NETWORK_TIERS: &[&str] = &["PREMIUM", "STANDARD", ""];

static NAME_RE: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

fn name_regex() -> Result<&'static Regex> {
    NAME_RE
        .get_or_init(|| Regex::new(r"^(?:[a-z](?:[-a-z0-9]{0,61}[a-z0-9])?)$"))
        .as_ref()
        .map_err(|e| Error::validation("name", e.to_string()))
}

/// Declared state of an address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressState {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnetwork: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    // Server-computed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

fn one_of(field: &str, value: Option<&str>, allowed: &[&str]) -> Result<()> {
    match value {
        Some(v) if !allowed.contains(&v) => Err(Error::validation(
            field,
            format!("{:?} must be one of {:?}", v, allowed),
        )),
        _ => Ok(()),
    }
}

/// An absent or empty type reads back as the server's implicit default
pub fn flatten_address_type(v: Option<&Value>) -> String {
    v.and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_ADDRESS_TYPE)
        .to_string()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeAddress;

impl ResourceKind for ComputeAddress {
    type State = AddressState;

    const NAME: &'static str = "Address";
    const ID: Template = Template::new("{project}/{region}/{name}");
    const COLLECTION_PATH: Template =
        Template::new("projects/{project}/regions/{region}/addresses");
    const SELF_PATH: Template =
        Template::new("projects/{project}/regions/{region}/addresses/{name}");
    const IMPORT_PATTERNS: &'static [&'static str] = &[
        "projects/(?P<project>[^/]+)/regions/(?P<region>[^/]+)/addresses/(?P<name>[^/]+)",
        "(?P<project>[^/]+)/(?P<region>[^/]+)/(?P<name>[^/]+)",
        "(?P<name>[^/]+)",
    ];
    const TIMEOUTS: Timeouts = Timeouts {
        create: Duration::from_secs(240),
        delete: Duration::from_secs(240),
        min_poll_interval: Duration::from_secs(2),
    };

    fn identity(&self, state: &AddressState, ctx: &ProviderContext) -> Result<FieldMap> {
        if !name_regex()?.is_match(&state.name) {
            return Err(Error::validation(
                "name",
                format!(
                    "{:?} must be 1-63 lowercase letters, digits or hyphens, \
                     starting with a letter",
                    state.name
                ),
            ));
        }
        let project = state
            .project
            .clone()
            .or_else(|| ctx.project().map(str::to_string))
            .ok_or_else(|| {
                Error::validation("project", "not declared and no default project is configured")
            })?;
        let region = state
            .region
            .as_deref()
            .map(name_from_self_link)
            .or_else(|| ctx.region())
            .ok_or_else(|| {
                Error::validation("region", "not declared and no default region is configured")
            })?;

        Ok(FieldMap::from([
            ("project".to_string(), project),
            ("region".to_string(), region),
            ("name".to_string(), state.name.clone()),
        ]))
    }

    fn expand(&self, state: &AddressState, ctx: &ProviderContext) -> Result<WirePayload> {
        one_of("address_type", state.address_type.as_deref(), ADDRESS_TYPES)?;
        one_of("network_tier", state.network_tier.as_deref(), NETWORK_TIERS)?;

        let identity = self.identity(state, ctx)?;
        let project = identity.get("project").map(String::as_str);
        let region = identity.get("region").map(String::as_str);

        let mut obj = WirePayload::new();
        obj.put("address", state.address.as_deref(), None, scalar)?;
        obj.put("addressType", state.address_type.as_deref(), Some(DEFAULT_ADDRESS_TYPE), scalar)?;
        obj.put("description", state.description.as_deref(), None, scalar)?;
        obj.put("name", Some(state.name.as_str()), None, scalar)?;
        obj.put("networkTier", state.network_tier.as_deref(), None, scalar)?;
        obj.put("subnetwork", state.subnetwork.as_deref(), None, |v| {
            let r = resolve_reference(
                "subnetwork",
                v,
                "subnetworks",
                Scope::Regional,
                project,
                region,
            )?;
            Ok(Value::String(r.relative_link()))
        })?;
        obj.put("region", state.region.as_deref(), None, |v| {
            let r = resolve_reference("region", v, "regions", Scope::Project, project, None)?;
            Ok(Value::String(r.relative_link()))
        })?;
        Ok(obj)
    }

    fn flatten(&self, res: &Value, identity: &FieldMap) -> Result<AddressState> {
        Ok(AddressState {
            name: wire_str(res, "name")
                .or_else(|| identity.get("name").cloned())
                .unwrap_or_default(),
            address: wire_str(res, "address"),
            address_type: Some(flatten_address_type(res.get("addressType"))),
            description: wire_str(res, "description"),
            network_tier: wire_str(res, "networkTier"),
            region: wire_str(res, "region")
                .map(|r| name_from_self_link(&r))
                .or_else(|| identity.get("region").cloned()),
            subnetwork: wire_str(res, "subnetwork").map(|s| name_from_self_link(&s)),
            project: identity.get("project").cloned(),
            creation_timestamp: wire_str(res, "creationTimestamp"),
            users: wire_str_list(res, "users"),
            self_link: wire_str(res, "selfLink").map(|s| convert_self_link_to_v1(&s)),
        })
    }

    fn seed(&self, identity: &FieldMap) -> AddressState {
        AddressState {
            name: identity.get("name").cloned().unwrap_or_default(),
            project: identity.get("project").cloned(),
            region: identity.get("region").cloned(),
            ..AddressState::default()
        }
    }
}
