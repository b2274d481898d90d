//! Reference-typed fields
//!
//! A reference (network, subnetwork, region, instance...) may be declared as a
//! full URL, a `projects/...` relative link, a scope-relative path or a bare
//! name. Expansion resolves all of these to one canonical relative link;
//! flattening turns server self-links back into short names.

use crate::error::{Error, Result};
use url::Url;

/// Where a referenced collection lives inside a project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Directly under the project, e.g. `projects/P/regions/R`
    Project,
    /// `projects/P/global/...`
    Global,
    /// `projects/P/regions/R/...`
    Regional,
    /// `projects/P/zones/Z/...`
    Zonal,
}

impl Scope {
    fn location_segment(self) -> Option<&'static str> {
        match self {
            Scope::Regional => Some("regions"),
            Scope::Zonal => Some("zones"),
            Scope::Project | Scope::Global => None,
        }
    }
}

/// A fully resolved reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldReference {
    pub project: String,
    /// Region or zone for regional/zonal collections
    pub location: Option<String>,
    pub collection: &'static str,
    pub name: String,
    pub scope: Scope,
}

impl FieldReference {
    pub fn relative_link(&self) -> String {
        match (self.scope, self.location.as_deref()) {
            (Scope::Project, _) => {
                format!("projects/{}/{}/{}", self.project, self.collection, self.name)
            },
            (Scope::Global, _) => format!(
                "projects/{}/global/{}/{}",
                self.project, self.collection, self.name
            ),
            (scope, Some(location)) => format!(
                "projects/{}/{}/{}/{}/{}",
                self.project,
                scope.location_segment().unwrap_or_default(),
                location,
                self.collection,
                self.name
            ),
            // Regional/zonal references are only constructed with a location
            (_, None) => {
                format!("projects/{}/{}/{}", self.project, self.collection, self.name)
            },
        }
    }
}

/// Everything from `projects/` onwards, for full URLs; other inputs unchanged
fn strip_url(field: &str, value: &str) -> Result<String> {
    if !(value.starts_with("https://") || value.starts_with("http://")) {
        return Ok(value.to_string());
    }

    let url = Url::parse(value)
        .map_err(|e| Error::validation(field, format!("{value:?} is not a valid URL: {e}")))?;
    let path = url.path();
    match path.find("/projects/") {
        Some(idx) => Ok(path[idx + 1..].trim_end_matches('/').to_string()),
        None => Err(Error::InvalidReference {
            field: field.to_string(),
            value: value.to_string(),
            expected: "a URL containing projects/{project}/...".to_string(),
        }),
    }
}

fn accepted_shapes(collection: &str, scope: Scope) -> String {
    let shapes = match scope {
        Scope::Project => vec![
            format!("projects/{{project}}/{collection}/{{name}}"),
            "{name}".to_string(),
        ],
        Scope::Global => vec![
            format!("projects/{{project}}/global/{collection}/{{name}}"),
            format!("global/{collection}/{{name}}"),
            "{name}".to_string(),
        ],
        Scope::Regional => vec![
            format!("projects/{{project}}/regions/{{region}}/{collection}/{{name}}"),
            format!("regions/{{region}}/{collection}/{{name}}"),
            "{name}".to_string(),
        ],
        Scope::Zonal => vec![
            format!("projects/{{project}}/zones/{{zone}}/{collection}/{{name}}"),
            format!("zones/{{zone}}/{collection}/{{name}}"),
            "{name}".to_string(),
        ],
    };
    shapes.join(", ")
}

/// Resolve a declared reference.
///
/// `project` and `location` are the fallbacks for shapes that leave them out;
/// the caller picks them from its ordered candidates (declared field first,
/// then context defaults).
pub fn resolve_reference(
    field: &str,
    value: &str,
    collection: &'static str,
    scope: Scope,
    project: Option<&str>,
    location: Option<&str>,
) -> Result<FieldReference> {
    let relative = strip_url(field, value)?;
    let parts: Vec<&str> = relative.split('/').collect();

    let invalid = || Error::InvalidReference {
        field: field.to_string(),
        value: value.to_string(),
        expected: accepted_shapes(collection, scope),
    };
    let missing = |what: &str| {
        Error::validation(
            field,
            format!("{value:?} needs a {what}, but none is declared or configured"),
        )
    };

    if parts.iter().any(|p| p.is_empty()) {
        return Err(invalid());
    }

    let loc_segment = scope.location_segment();
    let (p, loc, name): (Option<&str>, Option<&str>, &str) = match (scope, parts.as_slice()) {
        (Scope::Project, ["projects", p, c, n]) if *c == collection => (Some(*p), None, *n),
        (Scope::Global, ["projects", p, "global", c, n]) if *c == collection => {
            (Some(*p), None, *n)
        },
        (Scope::Global, ["global", c, n]) if *c == collection => (None, None, *n),
        (Scope::Regional | Scope::Zonal, ["projects", p, s, l, c, n])
            if Some(*s) == loc_segment && *c == collection =>
        {
            (Some(*p), Some(*l), *n)
        },
        (Scope::Regional | Scope::Zonal, [s, l, c, n])
            if Some(*s) == loc_segment && *c == collection =>
        {
            (None, Some(*l), *n)
        },
        (_, [n]) => (None, None, *n),
        _ => return Err(invalid()),
    };

    let project = p.or(project).ok_or_else(|| missing("project"))?;
    let location = match scope {
        Scope::Regional => Some(loc.or(location).ok_or_else(|| missing("region"))?),
        Scope::Zonal => Some(loc.or(location).ok_or_else(|| missing("zone"))?),
        Scope::Project | Scope::Global => None,
    };

    Ok(FieldReference {
        project: project.to_string(),
        location: location.map(str::to_string),
        collection,
        name: name.to_string(),
        scope,
    })
}

/// Last path segment of a self-link (`.../regions/us-central1` -> `us-central1`)
pub fn name_from_self_link(link: &str) -> String {
    link.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(link)
        .to_string()
}

/// Rewrite a self-link from any API version to v1
pub fn convert_self_link_to_v1(link: &str) -> String {
    let Some(compute_idx) = link.find("/compute/") else {
        return link.to_string();
    };
    let version_start = compute_idx + "/compute/".len();
    let rest = &link[version_start..];
    match rest.find("/projects/") {
        Some(version_len) if !rest[..version_len].contains('/') => {
            format!("{}v1{}", &link[..version_start], &rest[version_len..])
        },
        _ => link.to_string(),
    }
}
