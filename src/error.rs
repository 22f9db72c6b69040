//! Error types shared by registration and dispatch.
//!
//! Three families live here:
//!
//! - [`ConfigError`] - raised while registering operations. These are programmer
//!   mistakes (bad templates, conflicting response fields, path fields that are
//!   optional) and are meant to abort startup.
//! - [`BindError`] - raised while loading handler inputs from a live request. These
//!   become `400` responses carrying an [`ApiError`] with code `invalid_param`.
//! - [`ApiError`] - the structured error object written inside the `{"error": ...}`
//!   envelope. Handlers can return it from their own `error` fields as well.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Registration-time failure. Every message names the offending field, capture or type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid path template `{template}`: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("path parameter must be in kebab-case: {name}")]
    NonKebabCapture { name: String },

    #[error("duplicate path parameter `{name}` in `{template}`")]
    DuplicateCapture { template: String, name: String },

    #[error("path parameter cannot have a default, param: {field}")]
    PathFieldDefault { field: String },

    #[error("path parameter cannot be a slice, param: {field}")]
    PathFieldSlice { field: String },

    #[error("path parameter cannot be optional, param: {field}")]
    PathFieldOptional { field: String },

    #[error("expect to have path parameter for {{{capture}}} in {params}")]
    MissingPathField { capture: String, params: String },

    #[error("failed to parse `default` of `{field}`: {reason}")]
    MalformedDefault { field: String, reason: String },

    #[error("failed to parse `example` of `{field}`: {reason}")]
    MalformedExample { field: String, reason: String },

    #[error("invalid schema for `{field}`: {reason}")]
    InvalidSchema { field: String, reason: String },

    #[error("duplicate param name `{name}` in {params}")]
    DuplicateField { name: String, params: String },

    #[error("embedding too deep at `{field}` in {params}")]
    EmbedTooDeep { field: String, params: String },

    #[error("response {response} declares `{field}` more than once")]
    DuplicateResponseField { response: String, field: &'static str },

    #[error("response Data field should not exist when Error field exists: {response}")]
    DataWithError { response: String },

    #[error("response Meta field should not exist when Error field exists: {response}")]
    MetaWithError { response: String },

    #[error("response Meta field requires Data field: {response}")]
    MetaWithoutData { response: String },

    #[error("response Meta field cannot exist when Data field is a DataStream: {response}")]
    MetaWithStream { response: String },

    #[error("response {response} has an invalid status code {status}")]
    InvalidStatus { response: String, status: u16 },

    #[error("group prefix `{prefix}` {reason}")]
    InvalidPrefix { prefix: String, reason: &'static str },
}

/// Request-time failure while loading a handler input.
///
/// All variants are reported to the client as `400` with code `invalid_param`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("missing {location} param `{name}`")]
    Missing { location: &'static str, name: String },

    #[error("failed to parse {location} param `{name}`: {reason}")]
    Parse {
        location: &'static str,
        name: String,
        reason: String,
    },

    #[error("param `{name}` is invalid: [{details}]")]
    Invalid { name: String, details: String },

    #[error("failed to parse json body: {0}")]
    Body(String),

    #[error("request body is invalid: [{0}]")]
    InvalidBody(String),

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to bind {params}: {reason}")]
    Assemble { params: String, reason: String },
}

/// Machine-readable error codes emitted by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotFound,
    InvalidParam,
    InternalError,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::InvalidParam => "invalid_param",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

/// The error object carried by `{"error": ...}` bodies.
///
/// Empty members are omitted on the wire, so `ApiError::with_code("bad-request")`
/// serializes to `{"code":"bad-request"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ApiError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub innererror: Option<Value>,
}

impl ApiError {
    #[must_use]
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_str().to_string(),
            message: message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    #[must_use]
    pub fn innererror(mut self, inner: Value) -> Self {
        self.innererror = Some(inner);
        self
    }

    /// The standard not-found object for an unmatched `method path`.
    #[must_use]
    pub fn not_found(method: &str, path: &str) -> Self {
        Self::new(
            ErrorCode::NotFound,
            format!("path not found: {method} {path}"),
        )
        .target(path)
        .innererror(Value::Array(vec![
            Value::String(method.to_string()),
            Value::String(path.to_string()),
        ]))
    }
}

impl From<&BindError> for ApiError {
    fn from(err: &BindError) -> Self {
        ApiError::new(ErrorCode::InvalidParam, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_members_are_omitted() {
        let v = serde_json::to_value(ApiError::with_code("bad-request")).unwrap();
        assert_eq!(v, json!({"code": "bad-request"}));
    }

    #[test]
    fn test_not_found_names_method_and_path() {
        let v = serde_json::to_value(ApiError::not_found("GET", "/unknown")).unwrap();
        assert_eq!(
            v,
            json!({
                "code": "not_found",
                "message": "path not found: GET /unknown",
                "target": "/unknown",
                "innererror": ["GET", "/unknown"],
            })
        );
    }

    #[test]
    fn test_config_error_messages_name_the_field() {
        let e = ConfigError::PathFieldOptional {
            field: "id".into(),
        };
        assert_eq!(e.to_string(), "path parameter cannot be optional, param: id");
        let e = ConfigError::MissingPathField {
            capture: "id".into(),
            params: "GetUser".into(),
        };
        assert_eq!(e.to_string(), "expect to have path parameter for {id} in GetUser");
    }

    #[test]
    fn test_bind_error_messages() {
        let e = BindError::Missing {
            location: "url query",
            name: "id".into(),
        };
        assert_eq!(e.to_string(), "missing url query param `id`");
        let api = ApiError::from(&e);
        assert_eq!(api.code, "invalid_param");
    }
}
