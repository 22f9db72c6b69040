//! Field classification: declared fields -> [`ParsedField`] tables.
//!
//! Runs once per handler input at registration. Every check that can be done
//! without a request happens here (name resolution, path binding rules, default
//! and example literals, schema compilation) so the loader only reads tables.

use serde_json::{json, Map, Value};
use tracing::debug;

use super::case::{to_kebab, to_snake};
use super::fields::{Arity, FieldDecl, FieldSet, Fields};
use super::{ParamLocation, Params};
use crate::error::ConfigError;
use crate::router::path::{PathTemplate, WILDCARD};
use crate::validator::{CompiledSchema, FormatRegistry};

/// A classified field of a header or url bag.
#[derive(Debug, Clone)]
pub struct ParsedField {
    origin: Vec<String>,
    name: String,
    item_type: &'static str,
    arity: Arity,
    in_path: bool,
    required: bool,
    default: Option<Value>,
    example: Option<Value>,
    description: Option<String>,
    pub(crate) decode: fn(&str) -> anyhow::Result<Value>,
    schema: CompiledSchema,
}

impl ParsedField {
    /// Wire name after case conversion and overrides.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifiers from the handler input down to this field.
    #[must_use]
    pub fn origin(&self) -> &[String] {
        &self.origin
    }

    #[must_use]
    pub fn item_type(&self) -> &'static str {
        self.item_type
    }

    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.arity == Arity::Optional
    }

    #[must_use]
    pub fn is_repeated(&self) -> bool {
        self.arity == Arity::Repeated
    }

    /// Bound to a path capture rather than the query string.
    #[must_use]
    pub fn in_path(&self) -> bool {
        self.in_path
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    #[must_use]
    pub fn example(&self) -> Option<&Value> {
        self.example.as_ref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }
}

/// Describes one handler input.
#[derive(Debug, Clone)]
pub enum ParsedParam {
    /// Fields read from request headers.
    Header {
        type_name: &'static str,
        fields: Vec<ParsedField>,
    },
    /// Fields read from path captures and the query string.
    Url {
        type_name: &'static str,
        fields: Vec<ParsedField>,
    },
    /// The whole JSON body.
    Body {
        type_name: &'static str,
        schema: CompiledSchema,
    },
    /// The ambient [`Context`](crate::server::Context), passed through untouched.
    Context,
    /// The raw [`Request`](crate::server::Request).
    Request,
}

impl ParsedParam {
    #[must_use]
    pub fn location(&self) -> Option<ParamLocation> {
        match self {
            ParsedParam::Header { .. } => Some(ParamLocation::Header),
            ParsedParam::Url { .. } => Some(ParamLocation::Url),
            ParsedParam::Body { .. } => Some(ParamLocation::Body),
            ParsedParam::Context | ParsedParam::Request => None,
        }
    }

    #[must_use]
    pub fn fields(&self) -> &[ParsedField] {
        match self {
            ParsedParam::Header { fields, .. } | ParsedParam::Url { fields, .. } => fields,
            _ => &[],
        }
    }
}

/// Last path segment of a type name, for messages (`my_app::GetUser` -> `GetUser`).
pub(crate) fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(i) => &full[i + 2..],
        None => full,
    }
}

fn wire_name(decl: &FieldDecl, location: ParamLocation) -> String {
    match (&decl.name, location) {
        (Some(name), ParamLocation::Header) => return name.to_ascii_lowercase(),
        (Some(name), _) => return name.clone(),
        (None, _) => {}
    }
    match location {
        ParamLocation::Header => to_kebab(decl.ident()),
        ParamLocation::Url => to_snake(decl.ident()),
        ParamLocation::Body => decl.ident().to_string(),
    }
}

/// The standalone schema of one field: item type, constraints, then the
/// optional/repeated wrapping.
fn field_schema(decl: &FieldDecl) -> Value {
    let mut item = (decl.item_schema)();
    if let Value::Object(obj) = &mut item {
        for (k, v) in &decl.constraints {
            obj.insert(k.clone(), v.clone());
        }
    }
    let mut schema = match decl.arity {
        Arity::Plain => item,
        Arity::Repeated => json!({"type": "array", "items": item}),
        Arity::Optional => json!({"anyOf": [item, {"type": "null"}]}),
    };
    if let (Some(text), Value::Object(obj)) = (&decl.description, &mut schema) {
        obj.insert("description".into(), Value::String(text.clone()));
    }
    schema
}

/// The object schema of a body struct: one property per top-level field,
/// plain fields required.
#[must_use]
pub fn object_schema<F: Fields + ?Sized>() -> Value {
    let set = FieldSet::shallow::<F>();
    let mut properties = Map::new();
    let mut required = Vec::new();
    for decl in set.decls() {
        let name = wire_name(decl, ParamLocation::Body);
        if decl.arity == Arity::Plain {
            required.push(Value::String(name.clone()));
        }
        properties.insert(name, field_schema(decl));
    }
    json!({"type": "object", "properties": properties, "required": required})
}

fn parse_literal(
    decl: &FieldDecl,
    literal: &str,
    schema: &CompiledSchema,
) -> Result<Value, String> {
    let value: Value = serde_json::from_str(literal).map_err(|e| e.to_string())?;
    (decl.check)(&value).map_err(|e| e.to_string())?;
    schema.validate(&value)?;
    Ok(value)
}

/// Classify the flattened fields of a header or url bag.
///
/// # Errors
///
/// Any [`ConfigError`] about names, path binding, literals or schemas, naming the field.
pub fn classify_fields(
    type_name: &'static str,
    location: ParamLocation,
    set: FieldSet,
    template: Option<&PathTemplate>,
    formats: &FormatRegistry,
) -> Result<Vec<ParsedField>, ConfigError> {
    let params = short_type_name(type_name).to_string();
    let (decls, too_deep) = set.into_parts();
    if let Some(field) = too_deep {
        return Err(ConfigError::EmbedTooDeep { field, params });
    }

    let mut out: Vec<ParsedField> = Vec::with_capacity(decls.len());
    for decl in decls {
        let ident = decl.ident().to_string();

        let mut in_path = false;
        let name = match (location, template) {
            (ParamLocation::Url, Some(t)) => {
                let candidate = decl.name.clone().unwrap_or_else(|| to_kebab(&ident));
                if t.has_capture(&candidate) {
                    in_path = true;
                    candidate
                } else {
                    wire_name(&decl, location)
                }
            }
            _ => wire_name(&decl, location),
        };

        if in_path {
            if decl.default.is_some() {
                return Err(ConfigError::PathFieldDefault { field: ident });
            }
            match decl.arity {
                Arity::Repeated => return Err(ConfigError::PathFieldSlice { field: ident }),
                Arity::Optional => return Err(ConfigError::PathFieldOptional { field: ident }),
                Arity::Plain => {}
            }
        }

        if out.iter().any(|f| f.name == name) {
            return Err(ConfigError::DuplicateField { name, params });
        }

        let schema = formats
            .compile(field_schema(&decl))
            .map_err(|reason| ConfigError::InvalidSchema {
                field: ident.clone(),
                reason,
            })?;

        let default = match &decl.default {
            Some(lit) => Some(parse_literal(&decl, lit, &schema).map_err(|reason| {
                ConfigError::MalformedDefault {
                    field: ident.clone(),
                    reason,
                }
            })?),
            None => None,
        };
        let example = match &decl.example {
            Some(lit) => Some(parse_literal(&decl, lit, &schema).map_err(|reason| {
                ConfigError::MalformedExample {
                    field: ident.clone(),
                    reason,
                }
            })?),
            None => None,
        };

        let required = decl.arity == Arity::Plain && default.is_none();
        debug!(
            params = %params,
            field = %ident,
            name = %name,
            in_path,
            required,
            "Classified field"
        );

        out.push(ParsedField {
            origin: decl.origin,
            name,
            item_type: decl.item_type,
            arity: decl.arity,
            in_path,
            required,
            default,
            example,
            description: decl.description,
            decode: decl.decode,
            schema,
        });
    }

    if let (ParamLocation::Url, Some(t)) = (location, template) {
        for capture in t.names().iter().filter(|c| &***c != WILDCARD) {
            if !out.iter().any(|f| f.in_path && f.name == **capture) {
                return Err(ConfigError::MissingPathField {
                    capture: capture.to_string(),
                    params,
                });
            }
        }
    }

    Ok(out)
}

/// Classify a [`Params`] type for an operation mounted at `template`.
///
/// # Errors
///
/// See [`classify_fields`]; body params fail only when their schema does not compile.
pub fn classify<P: Params>(
    template: &PathTemplate,
    formats: &FormatRegistry,
) -> Result<ParsedParam, ConfigError> {
    let type_name = std::any::type_name::<P>();
    match P::LOCATION {
        ParamLocation::Header => Ok(ParsedParam::Header {
            type_name,
            fields: classify_fields(
                type_name,
                ParamLocation::Header,
                FieldSet::of::<P>(),
                None,
                formats,
            )?,
        }),
        ParamLocation::Url => Ok(ParsedParam::Url {
            type_name,
            fields: classify_fields(
                type_name,
                ParamLocation::Url,
                FieldSet::of::<P>(),
                Some(template),
                formats,
            )?,
        }),
        ParamLocation::Body => {
            let schema = formats.compile(object_schema::<P>()).map_err(|reason| {
                ConfigError::InvalidSchema {
                    field: short_type_name(type_name).to_string(),
                    reason,
                }
            })?;
            Ok(ParsedParam::Body { type_name, schema })
        }
    }
}
