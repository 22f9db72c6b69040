//! Path template compilation and matching.
//!
//! A template is a `/`-separated list of segments:
//!
//! - literal segments match themselves
//! - `{name}` captures exactly one path component under `name` (kebab-case)
//! - a trailing `/*` captures the rest of the path under [`WILDCARD`]
//!
//! Templates compile to an anchored regex once, at registration. A compiled
//! [`PathTemplate`] holds no mutable state and is shared freely across requests.

use std::sync::Arc;

use regex::Regex;
use smallvec::SmallVec;

use crate::error::ConfigError;
use crate::params::case::is_kebab;

/// Reserved capture name of a trailing `/*`.
pub const WILDCARD: &str = "*";

/// Captured `(name, value)` pairs in template order.
///
/// Most templates capture fewer than four values, so they stay on the stack.
pub type Captures = SmallVec<[(Arc<str>, String); 4]>;

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    regex: Regex,
    names: Vec<Arc<str>>,
}

impl PathTemplate {
    /// Compile a template such as `/users/{id}/posts` or `/files/*`.
    ///
    /// # Errors
    ///
    /// - the template does not start with `/`
    /// - a capture name is not kebab-case or appears twice
    /// - a segment contains braces without being exactly `{name}`
    /// - `*` appears anywhere but the final segment
    pub fn compile(template: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let Some(rest) = template.strip_prefix('/') else {
            return Err(invalid("must start with `/`"));
        };

        let mut pattern = String::with_capacity(template.len() + 8);
        pattern.push('^');
        let mut names: Vec<Arc<str>> = Vec::with_capacity(template.matches('{').count() + 1);

        let segments: Vec<&str> = rest.split('/').collect();
        let last = segments.len() - 1;

        for (i, segment) in segments.iter().enumerate() {
            pattern.push('/');
            if *segment == WILDCARD {
                if i != last {
                    return Err(invalid("`*` is only allowed as the last segment"));
                }
                pattern.push_str("(.*)");
                names.push(Arc::from(WILDCARD));
            } else if let Some(name) = segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
            {
                if !is_kebab(name) {
                    return Err(ConfigError::NonKebabCapture {
                        name: name.to_string(),
                    });
                }
                if names.iter().any(|n| &**n == name) {
                    return Err(ConfigError::DuplicateCapture {
                        template: template.to_string(),
                        name: name.to_string(),
                    });
                }
                pattern.push_str("([^/]+)");
                names.push(Arc::from(name));
            } else if segment.contains(['{', '}']) {
                return Err(invalid("a capture must span a whole segment"));
            } else if segment.contains('*') {
                return Err(invalid("`*` is only allowed as the whole last segment"));
            } else {
                pattern.push_str(&regex::escape(segment));
            }
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            raw: template.to_string(),
            regex,
            names,
        })
    }

    /// The template as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Capture names in template order, including [`WILDCARD`] when present.
    #[must_use]
    pub fn names(&self) -> &[Arc<str>] {
        &self.names
    }

    #[must_use]
    pub fn has_capture(&self, name: &str) -> bool {
        self.names.iter().any(|n| &**n == name)
    }

    /// Match a request path, returning one percent-decoded value per capture.
    ///
    /// Returns `None` on a literal mismatch, a segment-count mismatch, or when the
    /// template ends in `/*` and the path stops before that slash.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<Captures> {
        let caps = self.regex.captures(path)?;
        let mut out = Captures::new();
        for (i, name) in self.names.iter().enumerate() {
            let raw = caps.get(i + 1).map_or("", |m| m.as_str());
            let value = urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            out.push((Arc::clone(name), value));
        }
        Some(out)
    }

    /// Fill the template from `(name, value)` pairs; the inverse of [`matches`](Self::matches)
    /// for values that contain no `/` (except the wildcard) and need no escaping.
    ///
    /// Returns `None` if a capture has no value.
    #[must_use]
    pub fn render(&self, values: &[(&str, &str)]) -> Option<String> {
        let lookup = |name: &str| values.iter().find(|(n, _)| *n == name).map(|(_, v)| *v);
        let mut out = String::with_capacity(self.raw.len());
        for segment in self.raw[1..].split('/') {
            out.push('/');
            if segment == WILDCARD {
                out.push_str(lookup(WILDCARD)?);
            } else if let Some(name) = segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
            {
                out.push_str(lookup(name)?);
            } else {
                out.push_str(segment);
            }
        }
        Some(out)
    }
}

/// Look up a capture by name.
#[must_use]
pub fn capture<'a>(captures: &'a Captures, name: &str) -> Option<&'a str> {
    captures
        .iter()
        .find(|(n, _)| &**n == name)
        .map(|(_, v)| v.as_str())
}
