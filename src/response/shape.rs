//! Response shape declaration and classification.

use std::any::TypeId;
use std::fmt;
use std::io::Read;

use serde::Serialize;
use serde_json::Value;

use super::status::FixedStatus;
use crate::error::ConfigError;
use crate::params::classify::short_type_name;

/// How the `data` field is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// Inside the `{"data": ...}` envelope.
    Enveloped,
    /// As the whole body, without an envelope.
    Direct,
    /// Streamed verbatim as `application/octet-stream`.
    Stream,
}

/// The fields a response type declares, in the order it declared them.
#[derive(Debug, Default)]
pub struct ShapeDecl {
    header: Option<&'static str>,
    data: Option<(DataKind, &'static str)>,
    meta: Option<&'static str>,
    error: Option<&'static str>,
    duplicate: Option<&'static str>,
}

impl ShapeDecl {
    fn note<T>(slot: &mut Option<T>, duplicate: &mut Option<&'static str>, field: &'static str, value: T) {
        if slot.is_some() && duplicate.is_none() {
            *duplicate = Some(field);
        }
        *slot = Some(value);
    }

    /// A struct whose fields become response headers.
    pub fn header<T: Serialize>(&mut self) {
        Self::note(
            &mut self.header,
            &mut self.duplicate,
            "header",
            std::any::type_name::<T>(),
        );
    }

    pub fn data<T: Serialize>(&mut self) {
        Self::note(
            &mut self.data,
            &mut self.duplicate,
            "data",
            (DataKind::Enveloped, std::any::type_name::<T>()),
        );
    }

    pub fn data_direct<T: Serialize>(&mut self) {
        Self::note(
            &mut self.data,
            &mut self.duplicate,
            "data",
            (DataKind::Direct, std::any::type_name::<T>()),
        );
    }

    pub fn data_stream(&mut self) {
        Self::note(
            &mut self.data,
            &mut self.duplicate,
            "data",
            (DataKind::Stream, std::any::type_name::<DataStream>()),
        );
    }

    pub fn meta<T: Serialize>(&mut self) {
        Self::note(
            &mut self.meta,
            &mut self.duplicate,
            "meta",
            std::any::type_name::<T>(),
        );
    }

    pub fn error<T: Serialize>(&mut self) {
        Self::note(
            &mut self.error,
            &mut self.duplicate,
            "error",
            std::any::type_name::<T>(),
        );
    }
}

/// A byte source written verbatim as the response body.
///
/// The reader is dropped once copied, which closes files and sockets.
pub struct DataStream(Box<dyn Read + Send>);

impl DataStream {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self(Box::new(reader))
    }

    pub(crate) fn into_reader(self) -> Box<dyn Read + Send> {
        self.0
    }
}

impl fmt::Debug for DataStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DataStream")
    }
}

impl From<Vec<u8>> for DataStream {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(std::io::Cursor::new(bytes))
    }
}

/// A value already converted to JSON, or the reason it could not be.
pub type Encoded = Result<Value, serde_json::Error>;

/// The `data` part of a returned value.
#[derive(Debug)]
pub enum DataPart {
    Json(Encoded),
    Stream(DataStream),
}

/// A returned value split into its declared parts.
#[derive(Debug, Default)]
pub struct ResponseParts {
    pub header: Option<Encoded>,
    pub data: Option<DataPart>,
    pub meta: Option<Encoded>,
    pub error: Option<Encoded>,
}

impl ResponseParts {
    /// Convert one field to JSON.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Encoded {
        serde_json::to_value(value)
    }
}

/// A type that can be returned from a handler.
///
/// The status code is fixed by [`Status`](Self::Status); the body and headers are
/// fixed by the declared fields. `#[derive(Response)]` implements this trait:
///
/// ```rust
/// use typeroute::response::status::StatusOk;
/// use typeroute::Response;
///
/// #[derive(Response)]
/// #[response(status = StatusOk)]
/// struct Listed {
///     data: Vec<String>,
///     meta: u64,
/// }
/// ```
pub trait Response: Send + 'static {
    type Status: FixedStatus;

    fn describe(shape: &mut ShapeDecl);

    fn into_parts(self) -> ResponseParts;
}

/// The classified shape of one response type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    type_id: TypeId,
    type_name: &'static str,
    status: u16,
    header: Option<&'static str>,
    data: Option<(DataKind, &'static str)>,
    meta: Option<&'static str>,
    error: Option<&'static str>,
}

impl ParsedResponse {
    /// Classify `R`, enforcing the field combination rules.
    ///
    /// # Errors
    ///
    /// - `data` together with `error`
    /// - `meta` together with `error`, without `data`, or next to a [`DataStream`]
    /// - a field declared twice, or a status outside `100..=999`
    pub fn classify<R: Response>() -> Result<Self, ConfigError> {
        let type_name = std::any::type_name::<R>();
        let response = short_type_name(type_name).to_string();
        let mut decl = ShapeDecl::default();
        R::describe(&mut decl);

        let status = <R::Status as FixedStatus>::CODE;
        if http::StatusCode::from_u16(status).is_err() {
            return Err(ConfigError::InvalidStatus { response, status });
        }
        if let Some(field) = decl.duplicate {
            return Err(ConfigError::DuplicateResponseField { response, field });
        }
        if decl.data.is_some() && decl.error.is_some() {
            return Err(ConfigError::DataWithError { response });
        }
        if decl.meta.is_some() && decl.error.is_some() {
            return Err(ConfigError::MetaWithError { response });
        }
        if decl.meta.is_some() && decl.data.is_none() {
            return Err(ConfigError::MetaWithoutData { response });
        }
        if decl.meta.is_some() && matches!(decl.data, Some((DataKind::Stream, _))) {
            return Err(ConfigError::MetaWithStream { response });
        }

        Ok(Self {
            type_id: TypeId::of::<R>(),
            type_name,
            status,
            header: decl.header,
            data: decl.data,
            meta: decl.meta,
            error: decl.error,
        })
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn has_header(&self) -> bool {
        self.header.is_some()
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    #[must_use]
    pub fn has_meta(&self) -> bool {
        self.meta.is_some()
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    #[must_use]
    pub fn is_direct(&self) -> bool {
        matches!(self.data, Some((DataKind::Direct, _)))
    }

    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self.data, Some((DataKind::Stream, _)))
    }

    /// Type names of the declared `header`, `data`, `meta` and `error` fields.
    #[must_use]
    pub fn field_types(&self) -> [(&'static str, Option<&'static str>); 4] {
        [
            ("header", self.header),
            ("data", self.data.map(|(_, t)| t)),
            ("meta", self.meta),
            ("error", self.error),
        ]
    }
}
