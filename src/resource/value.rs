//! Declared and wire values
//!
//! [`IsZero`] is the emptiness predicate the field codecs use to keep
//! defaulted or no-op fields out of a [`WirePayload`].

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Whether a value is its type's zero/empty value
pub trait IsZero {
    fn is_zero(&self) -> bool;
}

impl IsZero for str {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl IsZero for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl IsZero for i64 {
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl IsZero for bool {
    fn is_zero(&self) -> bool {
        !*self
    }
}

impl<T> IsZero for Vec<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsZero for BTreeSet<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: IsZero> IsZero for Option<T> {
    fn is_zero(&self) -> bool {
        self.as_ref().map_or(true, IsZero::is_zero)
    }
}

impl IsZero for Value {
    fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => b.is_zero(),
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.is_zero(),
            Value::Array(a) => a.is_zero(),
            Value::Object(o) => o.is_empty(),
        }
    }
}

/// Serialize a declared scalar as-is (the identity expander)
pub fn scalar<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::validation("value", e.to_string()))
}

/// Request body under construction, keyed by camelCase wire names
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WirePayload(Map<String, Value>);

impl WirePayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand one declared field into the payload.
    ///
    /// `declared` is what the user wrote; `default` is the schema default
    /// used when the user wrote nothing. The expanded value is sent only if
    /// it is non-empty and either explicitly declared or changed by
    /// expansion. An empty value is sent only when the user explicitly set
    /// it to something other than the default.
    pub fn put<T, F>(
        &mut self,
        key: &str,
        declared: Option<&T>,
        default: Option<&T>,
        expand: F,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&T) -> Result<Value>,
    {
        let explicit = declared.is_some();
        let Some(raw) = declared.or(default) else {
            return Ok(());
        };
        let expanded = expand(raw)?;

        let send = if expanded.is_zero() {
            match default {
                Some(default) => explicit && scalar(default)? != expanded,
                None => false,
            }
        } else {
            explicit || scalar(raw)? != expanded
        };

        if send {
            self.0.insert(key.to_string(), expanded);
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Read a string field from a wire object; empty strings read as absent
pub fn wire_str(remote: &Value, key: &str) -> Option<String> {
    remote
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Read an integer field; the API encodes some int64 fields as strings
pub fn wire_i64(remote: &Value, key: &str) -> Option<i64> {
    match remote.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Read a list of strings, skipping non-string entries
pub fn wire_str_list(remote: &Value, key: &str) -> Vec<String> {
    remote
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_zero_predicates() {
        assert!("".is_zero());
        assert!(!"x".is_zero());
        assert!(0i64.is_zero());
        assert!(Vec::<String>::new().is_zero());
        assert!(BTreeSet::<String>::new().is_zero());
        assert!(Option::<String>::None.is_zero());
        assert!(json!(null).is_zero());
        assert!(json!([]).is_zero());
        assert!(!json!(["a"]).is_zero());
        assert!(!json!(1000).is_zero());
    }

    #[test]
    fn test_put_skips_unset_fields() {
        let mut payload = WirePayload::new();
        payload.put::<str, _>("region", None, None, scalar).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_put_skips_untouched_default() {
        let mut payload = WirePayload::new();
        payload
            .put("addressType", None, Some("EXTERNAL"), scalar)
            .unwrap();
        assert!(!payload.contains_key("addressType"));
    }

    #[test]
    fn test_put_sends_explicit_value() {
        let mut payload = WirePayload::new();
        payload
            .put("addressType", Some("INTERNAL"), Some("EXTERNAL"), scalar)
            .unwrap();
        assert_eq!(payload.get("addressType"), Some(&json!("INTERNAL")));
    }

    #[test]
    fn test_put_skips_explicit_empty_without_default() {
        let mut payload = WirePayload::new();
        payload.put("description", Some(""), None, scalar).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_put_sends_explicit_zero_that_differs_from_default() {
        let mut payload = WirePayload::new();
        payload.put("priority", Some(&0i64), Some(&1000i64), scalar).unwrap();
        assert_eq!(payload.get("priority"), Some(&json!(0)));
    }

    #[test]
    fn test_put_sends_default_changed_by_expansion() {
        let mut payload = WirePayload::new();
        payload
            .put("network", None, Some("default"), |_| {
                Ok(json!("projects/p/global/networks/default"))
            })
            .unwrap();
        assert_eq!(
            payload.get("network"),
            Some(&json!("projects/p/global/networks/default"))
        );
    }

    #[test]
    fn test_put_propagates_expand_errors() {
        let mut payload = WirePayload::new();
        let err = payload
            .put("subnetwork", Some("a/b/c/d/e"), None, |_| {
                Err(Error::validation("subnetwork", "bad"))
            })
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        assert!(payload.is_empty());
    }

    #[test]
    fn test_wire_readers() {
        let remote = json!({"priority": "900", "name": "", "tags": ["a", 1, "b"]});
        assert_eq!(wire_i64(&remote, "priority"), Some(900));
        assert_eq!(wire_str(&remote, "name"), None);
        assert_eq!(wire_str_list(&remote, "tags"), vec!["a", "b"]);
    }
}
