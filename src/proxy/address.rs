//! Address templates.
//!
//! A template pairs a *source* pattern, describing where the fields of a
//! remote address live in an inbound request, with a *destination* pattern
//! describing the remote WebSocket URL. Fields are written as `$name` in both.
//!
//! Two extraction modes exist, picked by the first character of the source:
//! - `/model/$server/$port/$uuid/model-api` matches the request path.
//! - `?model=$server:$port&uuid=$uuid` reads named query parameters.

use hyper::Uri;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use thiserror::Error;

/// Errors raised while building a template at startup.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("source pattern must start with '/' or '?': {0:?}")]
    Mode(String),
    #[error("invalid query pair {0:?} in source pattern")]
    QueryPair(String),
    #[error("field ${field} is used by the destination but never captured by the source")]
    Unresolvable { field: String },
    #[error("cannot compile pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors raised while resolving a single request. Always local to that
/// request.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("missing field {0}")]
    MissingField(String),
    #[error("malformed value {value:?} for query parameter {param}")]
    Malformed { param: String, value: String },
    #[error("path {0:?} does not match the address template")]
    NoMatch(String),
    #[error("cannot parse query: {0}")]
    Query(#[from] serde_urlencoded::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Field(String),
}

/// Split a pattern into literal runs and `$name` fields. A `$` not followed
/// by an identifier stays literal.
fn parts(pattern: &str) -> Vec<Part> {
    let mut out = Vec::new();
    let mut literal = String::new();
    let mut rest = pattern;
    while let Some(pos) = rest.find('$') {
        literal.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let len = after.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).unwrap_or(after.len());
        if len == 0 || after.starts_with(|c: char| c.is_ascii_digit()) {
            literal.push('$');
            rest = after;
            continue;
        }
        if !literal.is_empty() {
            out.push(Part::Literal(std::mem::take(&mut literal)));
        }
        out.push(Part::Field(after[..len].to_string()));
        rest = &after[len..];
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        out.push(Part::Literal(literal));
    }
    out
}

fn field_names(parts: &[Part]) -> impl Iterator<Item = &str> {
    parts.iter().filter_map(|p| match p {
        Part::Field(name) => Some(name.as_str()),
        Part::Literal(_) => None,
    })
}

/// Compile a pattern into an anchored regex with one named group per field.
fn compile(pattern: &str, class: fn(&str) -> &'static str) -> Result<Regex, TemplateError> {
    let mut re = String::from("^");
    for part in parts(pattern) {
        match part {
            Part::Literal(text) => re.push_str(&regex::escape(&text)),
            Part::Field(name) => {
                let _ = write!(re, "(?P<{name}>{})", class(&name));
            }
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|source| TemplateError::Pattern { pattern: pattern.to_string(), source })
}

fn path_class(name: &str) -> &'static str {
    if name == "port" { r"\d+" } else { "[^/]+" }
}

fn query_class(name: &str) -> &'static str {
    if name == "port" { r"\d+" } else { ".+" }
}

#[derive(Debug, Clone)]
enum Extraction {
    Path(Regex),
    Query(Vec<(String, Regex)>),
}

/// A source/destination pattern pair, plus optional per-field defaults used
/// when a request leaves a field out.
#[derive(Debug, Clone)]
pub struct AddressTemplate {
    source: String,
    extraction: Extraction,
    destination: Vec<Part>,
    defaults: BTreeMap<String, String>,
}

impl AddressTemplate {
    pub fn new(source: &str, destination: &str) -> Result<Self, TemplateError> {
        let (extraction, captured): (Extraction, BTreeSet<String>) = if source.starts_with('/') {
            let captured = field_names(&parts(source)).map(str::to_string).collect();
            (Extraction::Path(compile(source, path_class)?), captured)
        } else if let Some(query) = source.strip_prefix('?') {
            let mut params = Vec::new();
            let mut captured = BTreeSet::new();
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').ok_or_else(|| TemplateError::QueryPair(pair.to_string()))?;
                if key.is_empty() {
                    return Err(TemplateError::QueryPair(pair.to_string()));
                }
                captured.extend(field_names(&parts(value)).map(str::to_string));
                params.push((key.to_string(), compile(value, query_class)?));
            }
            (Extraction::Query(params), captured)
        } else {
            return Err(TemplateError::Mode(source.to_string()));
        };

        let destination = parts(destination);
        if let Some(field) = field_names(&destination).find(|f| !captured.contains(*f)) {
            return Err(TemplateError::Unresolvable { field: field.to_string() });
        }

        Ok(Self { source: source.to_string(), extraction, destination, defaults: BTreeMap::new() })
    }

    /// Value used for `field` when the request does not carry it.
    pub fn with_default(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Compute the remote address for a request path and optional raw query.
    pub fn resolve(&self, path: &str, query: Option<&str>) -> Result<String, ResolveError> {
        let fields = self.extract(path, query)?;
        let mut target = String::new();
        for part in &self.destination {
            match part {
                Part::Literal(text) => target.push_str(text),
                Part::Field(name) => match fields.get(name) {
                    Some(value) if !value.is_empty() => target.push_str(value),
                    _ => return Err(ResolveError::MissingField(name.clone())),
                },
            }
        }
        Ok(target)
    }

    pub fn resolve_uri(&self, uri: &Uri) -> Result<String, ResolveError> {
        self.resolve(uri.path(), uri.query())
    }

    fn extract(&self, path: &str, query: Option<&str>) -> Result<BTreeMap<String, String>, ResolveError> {
        let mut fields = self.defaults.clone();
        match &self.extraction {
            Extraction::Path(re) => {
                let caps = re.captures(path).ok_or_else(|| ResolveError::NoMatch(path.to_string()))?;
                for name in re.capture_names().flatten() {
                    if let Some(m) = caps.name(name) {
                        fields.insert(name.to_string(), m.as_str().to_string());
                    }
                }
            }
            Extraction::Query(params) => {
                let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query.unwrap_or(""))?;
                for (key, re) in params {
                    let Some((_, value)) = pairs.iter().find(|(k, _)| k == key) else {
                        continue;
                    };
                    if value.is_empty() {
                        return Err(ResolveError::MissingField(key.clone()));
                    }
                    let caps = re
                        .captures(value)
                        .ok_or_else(|| ResolveError::Malformed { param: key.clone(), value: value.clone() })?;
                    for name in re.capture_names().flatten() {
                        if let Some(m) = caps.name(name) {
                            fields.insert(name.to_string(), m.as_str().to_string());
                        }
                    }
                }
            }
        }
        Ok(fields)
    }
}
