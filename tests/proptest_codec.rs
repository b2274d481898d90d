//! Property-based tests using proptest
//!
//! These tests verify the field codec, reference resolution and id handling
//! using randomized inputs.

use gcpsync::gcp::client::GcpClient;
use gcpsync::resource::reference::{resolve_reference, Scope};
use gcpsync::resource::template::FieldMap;
use gcpsync::resource::{
    AddressState, ComputeAddress, ComputeRoute, Defaults, ProviderContext, ResourceController,
    ResourceKind, RouteState,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

const API_ROOT: &str = "https://www.googleapis.com/compute/v1/";

fn ctx() -> ProviderContext {
    let client = GcpClient::with_access_token("unused").expect("client should build");
    ProviderContext::new(
        Arc::new(client),
        Defaults {
            project: Some("p1".to_string()),
            region: Some("us-central1".to_string()),
            zone: Some("us-central1-a".to_string()),
        },
    )
}

/// Names the Compute API accepts
fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,20}[a-z0-9]"
}

fn arb_region() -> impl Strategy<Value = String> {
    "[a-z]{2,6}-[a-z]{3,8}[0-9]"
}

fn arb_address() -> impl Strategy<Value = AddressState> {
    (
        arb_name(),
        prop_oneof![
            Just(None),
            Just(Some("INTERNAL")),
            Just(Some("EXTERNAL")),
            Just(Some("")),
        ],
        prop::option::of("[a-z ]{0,12}"),
        prop::option::of(arb_name()),
    )
        .prop_map(|(name, address_type, description, subnetwork)| AddressState {
            name,
            address_type: address_type.map(str::to_string),
            description,
            subnetwork,
            ..AddressState::default()
        })
}

/// Echo a payload the way the server stores it: relative links come back as
/// full self-links and the region is always present
fn server_echo(payload: Value, region: &str) -> Value {
    let mut obj = payload.as_object().cloned().unwrap_or_default();
    for key in ["region", "subnetwork"] {
        if let Some(Value::String(link)) = obj.get(key).cloned() {
            obj.insert(key.to_string(), Value::String(format!("{API_ROOT}{link}")));
        }
    }
    obj.entry("region")
        .or_insert_with(|| Value::String(format!("{API_ROOT}projects/p1/regions/{region}")));
    Value::Object(obj)
}

/// A global reference in one of its accepted spellings, with its short name
fn arb_global_ref(collection: &'static str) -> impl Strategy<Value = (String, String)> {
    (arb_name(), 0..4usize).prop_map(move |(name, form)| {
        let declared = match form {
            0 => name.clone(),
            1 => format!("global/{collection}/{name}"),
            2 => format!("projects/p1/global/{collection}/{name}"),
            _ => format!("{API_ROOT}projects/p1/global/{collection}/{name}"),
        };
        (declared, name)
    })
}

#[derive(Debug, Clone)]
enum NextHop {
    Ip(String),
    Gateway { declared: String, name: String },
    Network { declared: String, name: String },
    Instance {
        declared: String,
        zone: Option<String>,
        name: String,
        effective_zone: String,
    },
}

fn arb_next_hop() -> impl Strategy<Value = NextHop> {
    prop_oneof![
        "10\\.[0-9]{1,2}\\.0\\.[1-9]".prop_map(NextHop::Ip),
        arb_global_ref("gateways").prop_map(|(declared, name)| NextHop::Gateway { declared, name }),
        arb_global_ref("networks").prop_map(|(declared, name)| NextHop::Network { declared, name }),
        (
            arb_name(),
            0..3usize,
            prop::option::of(Just("europe-west1-b".to_string())),
        )
            .prop_map(|(name, form, zone)| {
                let effective_zone = zone.clone().unwrap_or_else(|| "us-central1-a".to_string());
                let declared = match form {
                    0 => name.clone(),
                    1 => format!("zones/{effective_zone}/instances/{name}"),
                    _ => format!("{API_ROOT}projects/p1/zones/{effective_zone}/instances/{name}"),
                };
                NextHop::Instance {
                    declared,
                    zone,
                    name,
                    effective_zone,
                }
            }),
    ]
}

/// Echo a route payload the way the server stores it: links come back as
/// full self-links and an unset priority is filled in
fn server_echo_route(payload: Value) -> Value {
    let mut obj = payload.as_object().cloned().unwrap_or_default();
    for key in ["network", "nextHopInstance", "nextHopGateway", "nextHopNetwork"] {
        if let Some(Value::String(link)) = obj.get(key).cloned() {
            obj.insert(key.to_string(), Value::String(format!("{API_ROOT}{link}")));
        }
    }
    obj.entry("priority").or_insert_with(|| json!(1000));
    Value::Object(obj)
}

proptest! {
    /// Every accepted spelling of a subnetwork reference resolves to the same link
    #[test]
    fn subnetwork_spellings_resolve_identically(
        project in arb_name(),
        region in arb_region(),
        subnet in arb_name(),
    ) {
        let canonical = format!("projects/{project}/regions/{region}/subnetworks/{subnet}");
        let spellings = [
            subnet.clone(),
            format!("regions/{region}/subnetworks/{subnet}"),
            canonical.clone(),
            format!("{API_ROOT}{canonical}"),
        ];

        for spelling in &spellings {
            let resolved = resolve_reference(
                "subnetwork",
                spelling,
                "subnetworks",
                Scope::Regional,
                Some(&project),
                Some(&region),
            )
            .unwrap();
            prop_assert_eq!(resolved.relative_link(), canonical.clone());
        }
    }

    /// Reading back what was created yields the canonical declared state
    #[test]
    fn address_round_trip_is_canonical(declared in arb_address()) {
        let ctx = ctx();
        let identity = ComputeAddress.identity(&declared, &ctx).unwrap();
        let payload = ComputeAddress.expand(&declared, &ctx).unwrap();
        let remote = server_echo(payload.into_value(), "us-central1");

        let state = ComputeAddress.flatten(&remote, &identity).unwrap();

        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        prop_assert_eq!(&state.name, &declared.name);
        prop_assert_eq!(
            state.address_type,
            Some(non_empty(&declared.address_type).unwrap_or_else(|| "EXTERNAL".to_string()))
        );
        prop_assert_eq!(state.description, non_empty(&declared.description));
        prop_assert_eq!(state.subnetwork, declared.subnetwork.clone());
        prop_assert_eq!(state.region.as_deref(), Some("us-central1"));
        prop_assert_eq!(state.project.as_deref(), Some("p1"));
    }

    /// Reading back a created route yields its canonical form: references as
    /// short names, the instance zone filled in, tags as a set and the
    /// server's default priority
    #[test]
    fn route_round_trip_is_canonical(
        name in arb_name(),
        (network, network_name) in arb_global_ref("networks"),
        hop in arb_next_hop(),
        priority in prop::option::of(0i64..=65535),
        tags in prop::collection::vec("[a-z][a-z0-9-]{0,8}", 0..5),
        description in prop::option::of("[a-z ]{0,12}"),
    ) {
        let ctx = ctx();
        let mut declared = RouteState {
            name: name.clone(),
            dest_range: "10.20.0.0/16".to_string(),
            network,
            description: description.clone(),
            priority,
            tags: tags.iter().cloned().collect(),
            ..RouteState::default()
        };
        match &hop {
            NextHop::Ip(ip) => declared.next_hop_ip = Some(ip.clone()),
            NextHop::Gateway { declared: g, .. } => declared.next_hop_gateway = Some(g.clone()),
            NextHop::Network { declared: n, .. } => declared.next_hop_network = Some(n.clone()),
            NextHop::Instance { declared: i, zone, .. } => {
                declared.next_hop_instance = Some(i.clone());
                declared.next_hop_instance_zone = zone.clone();
            },
        }

        let identity = ComputeRoute.identity(&declared, &ctx).unwrap();
        let payload = ComputeRoute.expand(&declared, &ctx).unwrap();
        let remote = server_echo_route(payload.into_value());
        let state = ComputeRoute.flatten(&remote, &identity).unwrap();

        prop_assert_eq!(&state.name, &name);
        prop_assert_eq!(&state.network, &network_name);
        prop_assert_eq!(state.priority, Some(priority.unwrap_or(1000)));
        prop_assert_eq!(&state.tags, &tags.into_iter().collect::<BTreeSet<_>>());
        prop_assert_eq!(state.description.clone(), description.filter(|d| !d.is_empty()));
        prop_assert_eq!(state.project.as_deref(), Some("p1"));

        match hop {
            NextHop::Ip(ip) => {
                prop_assert_eq!(state.next_hop_ip, Some(ip));
            },
            NextHop::Gateway { name, .. } => {
                prop_assert_eq!(state.next_hop_gateway, Some(name));
            },
            NextHop::Network { name, .. } => {
                prop_assert_eq!(state.next_hop_network, Some(name));
            },
            NextHop::Instance { name, effective_zone, .. } => {
                prop_assert_eq!(state.next_hop_instance, Some(name));
                prop_assert_eq!(state.next_hop_instance_zone, Some(effective_zone));
            },
        }
    }

    /// Importing a resource's own id hands back the same id
    #[test]
    fn address_import_preserves_id(
        project in arb_name(),
        region in arb_region(),
        name in arb_name(),
    ) {
        let ctx = ctx();
        let declared = AddressState {
            name: name.clone(),
            project: Some(project.clone()),
            region: Some(region.clone()),
            ..AddressState::default()
        };
        let id = ComputeAddress::ID
            .render(&ComputeAddress.identity(&declared, &ctx).unwrap())
            .unwrap();

        let controller = ResourceController::new(ComputeAddress);
        let short = controller.import(&ctx, &id).unwrap();
        let long = controller
            .import(&ctx, &format!("projects/{project}/regions/{region}/addresses/{name}"))
            .unwrap();

        prop_assert_eq!(short.id.as_deref(), Some(id.as_str()));
        prop_assert_eq!(long.id.as_deref(), Some(id.as_str()));
        prop_assert_eq!(short.state, long.state);
    }

    /// A bare name imports under the configured defaults
    #[test]
    fn route_import_of_bare_name_uses_defaults(name in arb_name()) {
        let ctx = ctx();
        let data = ResourceController::new(ComputeRoute).import(&ctx, &name).unwrap();

        prop_assert_eq!(data.id, Some(format!("p1/{name}")));
        prop_assert_eq!(data.state.project.as_deref(), Some("p1"));
        prop_assert_eq!(data.state.name, name);
    }

    /// Rendering an id and parsing it back gives the same fields
    #[test]
    fn id_template_parse_inverts_render(
        project in arb_name(),
        region in arb_region(),
        name in arb_name(),
    ) {
        let fields = FieldMap::from([
            ("project".to_string(), project),
            ("region".to_string(), region),
            ("name".to_string(), name),
        ]);
        let id = ComputeAddress::ID.render(&fields).unwrap();
        prop_assert_eq!(ComputeAddress::ID.parse(&id), Some(fields));
    }
}
