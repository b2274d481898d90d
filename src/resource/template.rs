//! `{field}` templates for resource ids and API paths

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::BTreeMap;

/// Resolved identity fields, keyed by declared schema name
pub type FieldMap = BTreeMap<String, String>;

/// A path template such as `{project}/{region}/{name}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template(&'static str);

enum Segment<'a> {
    Literal(&'a str),
    Field(&'a str),
}

impl Template {
    pub const fn new(template: &'static str) -> Self {
        Self(template)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    fn segments(&self) -> Vec<Segment<'static>> {
        let mut segments = Vec::new();
        let mut rest = self.0;
        while let Some(start) = rest.find('{') {
            if start > 0 {
                segments.push(Segment::Literal(&rest[..start]));
            }
            match rest[start..].find('}') {
                Some(len) => {
                    segments.push(Segment::Field(&rest[start + 1..start + len]));
                    rest = &rest[start + len + 1..];
                },
                None => {
                    segments.push(Segment::Literal(&rest[start..]));
                    rest = "";
                },
            }
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest));
        }
        segments
    }

    /// Substitute every `{field}`; a missing or empty field is an error
    pub fn render(&self, fields: &FieldMap) -> Result<String> {
        let mut out = String::with_capacity(self.0.len() + 32);
        for segment in self.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => match fields.get(name).filter(|v| !v.is_empty()) {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(Error::validation(
                            name,
                            format!("required to build {:?} but not set", self.0),
                        ))
                    },
                },
            }
        }
        Ok(out)
    }

    /// Inverse of [`render`](Self::render): recover the fields from a
    /// rendered string. Field values never contain `/`.
    pub fn parse(&self, rendered: &str) -> Option<FieldMap> {
        let mut pattern = String::from("^");
        for segment in self.segments() {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Field(name) => pattern.push_str(&format!("(?P<{}>[^/]+)", name)),
            }
        }
        pattern.push('$');

        let re = Regex::new(&pattern).ok()?;
        let caps = re.captures(rendered)?;
        Some(
            re.capture_names()
                .flatten()
                .filter_map(|name| {
                    caps.name(name).map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}
