//! Compute Route
//!
//! A global route in a VPC network, identified by `{project}/{name}`.

use super::context::ProviderContext;
use super::controller::{ResourceKind, Timeouts};
use super::reference::{convert_self_link_to_v1, name_from_self_link, resolve_reference, Scope};
use super::template::{FieldMap, Template};
use super::value::{scalar, wire_i64, wire_str, wire_str_list, WirePayload};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;

/// Priority the server assigns when none is sent
pub const DEFAULT_PRIORITY: i64 = 1000;

/// Declared state of a route
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteState {
    pub name: String,
    pub dest_range: String,
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hop_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hop_instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hop_instance_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hop_gateway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hop_network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// Instance tags the route applies to; a set, so order and duplicates
    /// never produce a diff
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

impl RouteState {
    fn next_hops(&self) -> Vec<&'static str> {
        [
            ("next_hop_ip", &self.next_hop_ip),
            ("next_hop_instance", &self.next_hop_instance),
            ("next_hop_gateway", &self.next_hop_gateway),
            ("next_hop_network", &self.next_hop_network),
        ]
        .into_iter()
        .filter(|(_, v)| v.as_deref().is_some_and(|v| !v.is_empty()))
        .map(|(field, _)| field)
        .collect()
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [("dest_range", &self.dest_range), ("network", &self.network)] {
            if value.is_empty() {
                return Err(Error::validation(field, "required"));
            }
        }
        if let Some(priority) = self.priority {
            if !(0..=65535).contains(&priority) {
                let message = format!("{} is outside 0-65535", priority);
                return Err(Error::validation("priority", message));
            }
        }
        match self.next_hops().as_slice() {
            [_] => Ok(()),
            [] => Err(Error::validation(
                "next_hop_*",
                "one of next_hop_ip, next_hop_instance, next_hop_gateway or next_hop_network \
                 is required",
            )),
            many => Err(Error::validation(
                "next_hop_*",
                format!("only one next hop may be set, got {}", many.join(", ")),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeRoute;

impl ResourceKind for ComputeRoute {
    type State = RouteState;

    const NAME: &'static str = "Route";
    const ID: Template = Template::new("{project}/{name}");
    const COLLECTION_PATH: Template = Template::new("projects/{project}/global/routes");
    const SELF_PATH: Template = Template::new("projects/{project}/global/routes/{name}");
    const IMPORT_PATTERNS: &'static [&'static str] = &[
        "projects/(?P<project>[^/]+)/global/routes/(?P<name>[^/]+)",
        "(?P<project>[^/]+)/(?P<name>[^/]+)",
        "(?P<name>[^/]+)",
    ];
    const TIMEOUTS: Timeouts = Timeouts {
        create: Duration::from_secs(120),
        delete: Duration::from_secs(120),
        min_poll_interval: Duration::from_secs(1),
    };

    fn identity(&self, state: &RouteState, ctx: &ProviderContext) -> Result<FieldMap> {
        if state.name.is_empty() {
            return Err(Error::validation("name", "required"));
        }
        let project = state
            .project
            .clone()
            .or_else(|| ctx.project().map(str::to_string))
            .ok_or_else(|| {
                Error::validation("project", "not declared and no default project is configured")
            })?;

        Ok(FieldMap::from([
            ("project".to_string(), project),
            ("name".to_string(), state.name.clone()),
        ]))
    }

    fn expand(&self, state: &RouteState, ctx: &ProviderContext) -> Result<WirePayload> {
        state.validate()?;
        let identity = self.identity(state, ctx)?;
        let project = identity.get("project").map(String::as_str);
        let zone = state.next_hop_instance_zone.as_deref().or(ctx.zone());

        let global = |field: &'static str, collection: &'static str| {
            move |v: &str| -> Result<Value> {
                let r = resolve_reference(field, v, collection, Scope::Global, project, None)?;
                Ok(Value::String(r.relative_link()))
            }
        };

        let mut obj = WirePayload::new();
        obj.put("name", Some(state.name.as_str()), None, scalar)?;
        obj.put("description", state.description.as_deref(), None, scalar)?;
        obj.put("destRange", Some(state.dest_range.as_str()), None, scalar)?;
        obj.put("network", Some(state.network.as_str()), None, global("network", "networks"))?;
        obj.put("nextHopIp", state.next_hop_ip.as_deref(), None, scalar)?;
        obj.put("nextHopInstance", state.next_hop_instance.as_deref(), None, |v| {
            let r = resolve_reference(
                "next_hop_instance",
                v,
                "instances",
                Scope::Zonal,
                project,
                zone,
            )?;
            Ok(Value::String(r.relative_link()))
        })?;
        obj.put(
            "nextHopGateway",
            state.next_hop_gateway.as_deref(),
            None,
            global("next_hop_gateway", "gateways"),
        )?;
        obj.put(
            "nextHopNetwork",
            state.next_hop_network.as_deref(),
            None,
            global("next_hop_network", "networks"),
        )?;
        obj.put("priority", state.priority.as_ref(), Some(&DEFAULT_PRIORITY), scalar)?;
        obj.put("tags", Some(&state.tags).filter(|t| !t.is_empty()), None, scalar)?;
        Ok(obj)
    }

    fn flatten(&self, res: &Value, identity: &FieldMap) -> Result<RouteState> {
        let next_hop_instance = wire_str(res, "nextHopInstance");
        let next_hop_instance_zone = next_hop_instance.as_deref().and_then(|link| {
            resolve_reference("next_hop_instance", link, "instances", Scope::Zonal, None, None)
                .ok()
                .and_then(|r| r.location)
        });

        Ok(RouteState {
            name: wire_str(res, "name")
                .or_else(|| identity.get("name").cloned())
                .unwrap_or_default(),
            dest_range: wire_str(res, "destRange").unwrap_or_default(),
            network: wire_str(res, "network")
                .map(|n| name_from_self_link(&n))
                .unwrap_or_default(),
            description: wire_str(res, "description"),
            next_hop_ip: wire_str(res, "nextHopIp"),
            next_hop_instance: next_hop_instance.map(|i| name_from_self_link(&i)),
            next_hop_instance_zone,
            next_hop_gateway: wire_str(res, "nextHopGateway").map(|g| name_from_self_link(&g)),
            next_hop_network: wire_str(res, "nextHopNetwork").map(|n| name_from_self_link(&n)),
            priority: wire_i64(res, "priority"),
            tags: wire_str_list(res, "tags").into_iter().collect(),
            project: identity.get("project").cloned(),
            self_link: wire_str(res, "selfLink").map(|s| convert_self_link_to_v1(&s)),
        })
    }

    fn seed(&self, identity: &FieldMap) -> RouteState {
        RouteState {
            name: identity.get("name").cloned().unwrap_or_default(),
            project: identity.get("project").cloned(),
            ..RouteState::default()
        }
    }
}
