//! Read-only introspection of registered operations.
//!
//! [`Router::describe`](crate::Router::describe) flattens the classification
//! tables into serialisable records, one per operation. They carry everything an
//! OpenAPI document needs about parameters and responses; assembling the document
//! itself is left to the caller.

use serde::Serialize;
use serde_json::Value;

use crate::dispatcher::Declared;
use crate::params::classify::short_type_name;
use crate::params::{ParsedField, ParsedParam};
use crate::response::ParsedResponse;
use crate::router::{Operation, Router};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDoc {
    pub name: String,
    /// `path`, `query` or `header`.
    #[serde(rename = "in")]
    pub location: &'static str,
    pub required: bool,
    pub repeated: bool,
    pub schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyDoc {
    pub type_name: String,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseDoc {
    pub status: u16,
    pub type_name: String,
    pub header: bool,
    pub data: bool,
    pub meta: bool,
    pub error: bool,
    /// `data` is written without the `{"data": ...}` envelope.
    pub direct: bool,
    /// `data` is streamed as `application/octet-stream`.
    pub binary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationDoc {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub operation_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<String>,
    /// Raw overrides have no parameter or response documentation.
    pub raw: bool,
    pub params: Vec<ParamDoc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyDoc>,
    pub responses: Vec<ResponseDoc>,
}

fn param_doc(field: &ParsedField, header: bool) -> ParamDoc {
    let location = match (header, field.in_path()) {
        (true, _) => "header",
        (false, true) => "path",
        (false, false) => "query",
    };
    ParamDoc {
        name: field.name().to_string(),
        location,
        required: field.is_required(),
        repeated: field.is_repeated(),
        schema: field.schema().schema().clone(),
        default: field.default().cloned(),
        example: field.example().cloned(),
        description: field.description().map(str::to_string),
    }
}

impl From<&ParsedResponse> for ResponseDoc {
    fn from(shape: &ParsedResponse) -> Self {
        Self {
            status: shape.status(),
            type_name: short_type_name(shape.type_name()).to_string(),
            header: shape.has_header(),
            data: shape.has_data(),
            meta: shape.has_meta(),
            error: shape.has_error(),
            direct: shape.is_direct(),
            binary: shape.is_binary(),
        }
    }
}

impl OperationDoc {
    fn build(op: &Operation, router: &Router) -> Self {
        let mut params = Vec::new();
        let mut body = None;
        for param in op.params() {
            match param {
                ParsedParam::Url { fields, .. } => {
                    params.extend(fields.iter().map(|f| param_doc(f, false)));
                }
                ParsedParam::Header { fields, .. } => {
                    params.extend(fields.iter().map(|f| param_doc(f, true)));
                }
                ParsedParam::Body { type_name, schema } => {
                    body = Some(BodyDoc {
                        type_name: short_type_name(type_name).to_string(),
                        schema: schema.schema().clone(),
                    });
                }
                ParsedParam::Context | ParsedParam::Request => {}
            }
        }

        let responses = match op.response() {
            Some(Declared::Concrete(shape)) => vec![ResponseDoc::from(shape)],
            Some(Declared::Capability { id, .. }) => router
                .variants()
                .members_of(*id)
                .iter()
                .map(ResponseDoc::from)
                .collect(),
            None => Vec::new(),
        };

        let meta = op.meta();
        Self {
            method: op.method().to_string(),
            path: op.template().as_str().to_string(),
            operation_id: meta.operation_id.clone(),
            summary: meta.summary.clone(),
            description: meta.description.clone(),
            tags: meta.tags.clone(),
            security: meta.security.clone(),
            raw: op.is_raw(),
            params,
            body,
            responses,
        }
    }
}

impl Router {
    /// One [`OperationDoc`] per registered operation, in registration order.
    ///
    /// Capability-typed operations list the variants registered so far.
    #[must_use]
    pub fn describe(&self) -> Vec<OperationDoc> {
        self.operations()
            .iter()
            .map(|op| OperationDoc::build(op, self))
            .collect()
    }
}
