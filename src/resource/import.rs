//! Import id resolution
//!
//! An import id is matched against a resource kind's id patterns, most
//! specific first. The first pattern matching the whole id wins.

use super::template::FieldMap;
use crate::error::{Error, Result};
use regex::Regex;

/// Match `import_id` against `patterns` in order.
///
/// Capture names used by any pattern but absent from the winning match are
/// taken from `defaults` when present, and otherwise left unset.
pub fn resolve(import_id: &str, patterns: &[&str], defaults: &FieldMap) -> Result<FieldMap> {
    let compiled = patterns
        .iter()
        .map(|p| {
            Regex::new(&format!("^(?:{})$", p))
                .map_err(|e| Error::validation("import pattern", format!("{p:?}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let Some((re, caps)) = compiled
        .iter()
        .find_map(|re| re.captures(import_id).map(|caps| (re, caps)))
    else {
        return Err(Error::NoPatternMatched {
            id: import_id.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        });
    };

    let mut fields: FieldMap = re
        .capture_names()
        .flatten()
        .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
        .collect();

    tracing::debug!("import id {:?} matched {:?}", import_id, re.as_str());

    for name in compiled.iter().flat_map(|re| re.capture_names().flatten()) {
        if fields.contains_key(name) {
            continue;
        }
        if let Some(value) = defaults.get(name) {
            fields.insert(name.to_string(), value.clone());
        }
    }

    Ok(fields)
}
