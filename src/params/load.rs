//! Request-time parameter loading.
//!
//! The url loader and the header loader share one algorithm: both read a
//! [`Bag`] of multi-valued strings, headers simply being projected into a bag
//! first. Each field's value is decoded, defaulted and validated, then written
//! into a JSON object at the field's origin path, and the finished object is
//! deserialized into the handler's input type.

use std::collections::HashMap;

use http::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use tracing::debug;

use super::classify::{short_type_name, ParsedField};
use crate::error::BindError;
use crate::router::path::{capture, Captures};
use crate::validator::CompiledSchema;

type Values = SmallVec<[String; 1]>;

/// A multi-valued, string-keyed collection of request values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bag {
    entries: HashMap<String, Values>,
}

impl Bag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut bag = Self::new();
        for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
            bag.add(&k, v.into_owned());
        }
        bag
    }

    /// Project headers into a bag keyed by lowercase header name.
    ///
    /// Values that are not visible ASCII are skipped.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut bag = Self::new();
        for (name, value) in headers {
            match value.to_str() {
                Ok(v) => bag.add(name.as_str(), v.to_string()),
                Err(_) => debug!(header = %name, "Skipping non-text header value"),
            }
        }
        bag
    }

    pub fn add(&mut self, key: &str, value: String) {
        self.entries.entry(key.to_string()).or_default().push(value);
    }

    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    #[must_use]
    pub fn all(&self, key: &str) -> &[String] {
        self.entries.get(key).map_or(&[], |v| v.as_slice())
    }
}

fn insert_at(root: &mut Map<String, Value>, origin: &[String], value: Value) {
    let Some((last, parents)) = origin.split_last() else {
        return;
    };
    let mut cur = root;
    for key in parents {
        let slot = cur
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        cur = next;
    }
    cur.insert(last.clone(), value);
}

#[derive(Clone, Copy)]
enum Source {
    Url,
    Header,
}

fn location(field: &ParsedField, source: Source) -> &'static str {
    match source {
        Source::Header => "header",
        Source::Url if field.in_path() => "url path",
        Source::Url => "url query",
    }
}

fn decode(field: &ParsedField, source: Source, raw: &str) -> Result<Value, BindError> {
    (field.decode)(raw).map_err(|e| BindError::Parse {
        location: location(field, source),
        name: field.name().to_string(),
        reason: format!("{e:#}"),
    })
}

fn field_value(
    field: &ParsedField,
    source: Source,
    captures: Option<&Captures>,
    bag: &Bag,
) -> Result<Value, BindError> {
    if field.in_path() {
        let raw = captures
            .and_then(|c| capture(c, field.name()))
            .ok_or_else(|| BindError::Missing {
                location: "url path",
                name: field.name().to_string(),
            })?;
        return decode(field, source, raw);
    }

    if field.is_repeated() {
        let raws = bag.all(field.name());
        if raws.is_empty() {
            return Ok(field
                .default()
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new())));
        }
        return raws
            .iter()
            .map(|raw| decode(field, source, raw))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }

    match bag.first(field.name()) {
        Some(raw) => decode(field, source, raw),
        None if field.is_required() => Err(BindError::Missing {
            location: location(field, source),
            name: field.name().to_string(),
        }),
        None => Ok(field.default().cloned().unwrap_or(Value::Null)),
    }
}

fn load_fields<T: DeserializeOwned>(
    type_name: &str,
    fields: &[ParsedField],
    source: Source,
    captures: Option<&Captures>,
    bag: &Bag,
) -> Result<T, BindError> {
    let mut root = Map::new();
    for field in fields {
        let value = field_value(field, source, captures, bag)?;
        field
            .schema()
            .validate(&value)
            .map_err(|details| BindError::Invalid {
                name: field.name().to_string(),
                details,
            })?;
        insert_at(&mut root, field.origin(), value);
    }
    T::deserialize(Value::Object(root)).map_err(|e| BindError::Assemble {
        params: short_type_name(type_name).to_string(),
        reason: e.to_string(),
    })
}

/// Load a url-bag input from path captures and the query bag.
///
/// # Errors
///
/// A [`BindError`] naming the first field that is missing, malformed or invalid.
pub fn load_url<T: DeserializeOwned>(
    type_name: &str,
    fields: &[ParsedField],
    captures: &Captures,
    query: &Bag,
) -> Result<T, BindError> {
    load_fields(type_name, fields, Source::Url, Some(captures), query)
}

/// Load a header-bag input.
///
/// # Errors
///
/// A [`BindError`] naming the first field that is missing, malformed or invalid.
pub fn load_header<T: DeserializeOwned>(
    type_name: &str,
    fields: &[ParsedField],
    headers: &HeaderMap,
) -> Result<T, BindError> {
    load_fields(
        type_name,
        fields,
        Source::Header,
        None,
        &Bag::from_headers(headers),
    )
}

/// Decode a JSON body into `T`, then validate it against the body schema.
///
/// # Errors
///
/// [`BindError::BodyTooLarge`], [`BindError::Body`] for malformed JSON or a
/// document that does not fit `T`, [`BindError::InvalidBody`] for schema violations.
pub fn load_body<T: DeserializeOwned>(
    schema: &CompiledSchema,
    body: &[u8],
    limit: usize,
) -> Result<T, BindError> {
    if body.len() > limit {
        return Err(BindError::BodyTooLarge { limit });
    }
    let value: Value = serde_json::from_slice(body).map_err(|e| BindError::Body(e.to_string()))?;
    let typed = T::deserialize(&value).map_err(|e| BindError::Body(e.to_string()))?;
    schema.validate(&value).map_err(BindError::InvalidBody)?;
    Ok(typed)
}
