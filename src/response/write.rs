//! Writing a shaped response to a [`ResponseWriter`].

use std::io;

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::shape::{DataPart, ParsedResponse, ResponseParts};
use crate::params::case::to_kebab;
use crate::server::response::{BodyWriter, ResponseWriter, JSON_CONTENT_TYPE};

/// Default content type of a streamed body.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// The returned value could not be encoded. Nothing has been written yet.
#[derive(Debug, Error)]
#[error("failed to encode response {response}: {reason}")]
pub struct EncodeError {
    pub response: &'static str,
    pub reason: String,
}

fn encode_err(parsed: &ParsedResponse, reason: impl ToString) -> EncodeError {
    EncodeError {
        response: parsed.type_name(),
        reason: reason.to_string(),
    }
}

/// Project the header block into `(name, value)` pairs with kebab-case names.
fn header_pairs(
    parsed: &ParsedResponse,
    header: Value,
) -> Result<Vec<(HeaderName, HeaderValue)>, EncodeError> {
    let Value::Object(fields) = header else {
        return Err(encode_err(parsed, "header block must serialize to an object"));
    };
    let mut out = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            other => other.to_string(),
        };
        let name = HeaderName::from_bytes(to_kebab(&key).as_bytes())
            .map_err(|e| encode_err(parsed, format!("header `{key}`: {e}")))?;
        let value = HeaderValue::from_str(&text)
            .map_err(|e| encode_err(parsed, format!("header `{key}`: {e}")))?;
        out.push((name, value));
    }
    Ok(out)
}

/// Write `parts` shaped by `parsed`.
///
/// Order: header block, then either the stream or the JSON payload. Every
/// encoding step happens before the first byte is written, so an
/// [`EncodeError`] leaves `w` untouched and the caller can still answer 500.
///
/// # Errors
///
/// [`EncodeError`] when a part fails to serialize or a header is not valid HTTP.
pub fn write_response(
    parsed: &ParsedResponse,
    parts: ResponseParts,
    w: &mut dyn ResponseWriter,
) -> Result<(), EncodeError> {
    let status = StatusCode::from_u16(parsed.status())
        .map_err(|e| encode_err(parsed, e))?;

    let headers = match parts.header {
        Some(header) if parsed.has_header() => {
            header_pairs(parsed, header.map_err(|e| encode_err(parsed, e))?)?
        }
        _ => Vec::new(),
    };

    if parsed.is_binary() {
        let Some(DataPart::Stream(stream)) = parts.data else {
            return Err(encode_err(parsed, "binary response without a stream"));
        };
        for (name, value) in headers {
            w.headers_mut().insert(name, value);
        }
        if !w.headers_mut().contains_key(CONTENT_TYPE) {
            w.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
        }
        w.write_head(status);
        let mut reader = stream.into_reader();
        match io::copy(&mut reader, &mut BodyWriter(w)) {
            Ok(bytes) => debug!(response = parsed.type_name(), bytes, "Streamed response body"),
            Err(e) => warn!(response = parsed.type_name(), error = %e, "Response stream aborted"),
        }
        return Ok(());
    }

    let data = match parts.data {
        Some(DataPart::Json(v)) => Some(v.map_err(|e| encode_err(parsed, e))?),
        Some(DataPart::Stream(_)) => {
            return Err(encode_err(parsed, "stream data on a non-binary response"))
        }
        None => None,
    };
    let meta = parts
        .meta
        .transpose()
        .map_err(|e| encode_err(parsed, e))?;
    let error = parts
        .error
        .transpose()
        .map_err(|e| encode_err(parsed, e))?;

    let payload = if parsed.is_direct() {
        data
    } else if let Some(error) = error.filter(|_| parsed.has_error()) {
        Some(Value::Object(Map::from_iter([("error".to_string(), error)])))
    } else if let (Some(data), Some(meta)) = (data.clone(), meta.filter(|_| parsed.has_meta())) {
        Some(Value::Object(Map::from_iter([
            ("data".to_string(), data),
            ("meta".to_string(), meta),
        ])))
    } else {
        data.map(|data| Value::Object(Map::from_iter([("data".to_string(), data)])))
    };

    let body = payload
        .map(|p| serde_json::to_vec(&p))
        .transpose()
        .map_err(|e| encode_err(parsed, e))?;

    for (name, value) in headers {
        w.headers_mut().insert(name, value);
    }
    match body {
        Some(bytes) => {
            if !parsed.is_direct() || !w.headers_mut().contains_key(CONTENT_TYPE) {
                w.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            }
            w.write_head(status);
            if let Err(e) = w.write_body(&bytes) {
                warn!(response = parsed.type_name(), error = %e, "Failed to write response body");
            }
        }
        None => w.write_head(status),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::shape::{DataStream, Response, ShapeDecl};
    use crate::response::status::{StatusBadRequest, StatusCreated, StatusNoContent, StatusOk};
    use crate::server::response::BufferedResponse;
    use crate::ApiError;
    use serde::ser::{Serialize, Serializer};
    use serde::Serialize as DeriveSerialize;

    fn write<R: Response>(value: R) -> Result<BufferedResponse, EncodeError> {
        let parsed = ParsedResponse::classify::<R>().unwrap();
        let mut res = BufferedResponse::new();
        write_response(&parsed, value.into_parts(), &mut res)?;
        Ok(res)
    }

    struct WithMeta(String, i64);
    impl Response for WithMeta {
        type Status = StatusOk;
        fn describe(s: &mut ShapeDecl) {
            s.data::<String>();
            s.meta::<i64>();
        }
        fn into_parts(self) -> ResponseParts {
            ResponseParts {
                data: Some(DataPart::Json(ResponseParts::encode(&self.0))),
                meta: Some(ResponseParts::encode(&self.1)),
                ..ResponseParts::default()
            }
        }
    }

    #[test]
    fn test_data_and_meta_envelope() {
        let res = write(WithMeta("x".into(), 7)).unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), br#"{"data":"x","meta":7}"#);
        assert_eq!(res.header("content-type"), Some(JSON_CONTENT_TYPE));
    }

    struct Failed(ApiError);
    impl Response for Failed {
        type Status = StatusBadRequest;
        fn describe(s: &mut ShapeDecl) {
            s.error::<ApiError>();
        }
        fn into_parts(self) -> ResponseParts {
            ResponseParts {
                error: Some(ResponseParts::encode(&self.0)),
                ..ResponseParts::default()
            }
        }
    }

    #[test]
    fn test_error_envelope() {
        let res = write(Failed(ApiError::with_code("bad-request"))).unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(res.body(), br#"{"error":{"code":"bad-request"}}"#);
    }

    #[derive(DeriveSerialize)]
    struct Location {
        location: String,
        x_rate_limit: u32,
        skipped: Option<String>,
    }

    struct Created(Location, u64);
    impl Response for Created {
        type Status = StatusCreated;
        fn describe(s: &mut ShapeDecl) {
            s.header::<Location>();
            s.data_direct::<u64>();
        }
        fn into_parts(self) -> ResponseParts {
            ResponseParts {
                header: Some(ResponseParts::encode(&self.0)),
                data: Some(DataPart::Json(ResponseParts::encode(&self.1))),
                ..ResponseParts::default()
            }
        }
    }

    #[test]
    fn test_headers_and_direct_data() {
        let res = write(Created(
            Location {
                location: "/items/9".into(),
                x_rate_limit: 10,
                skipped: None,
            },
            9,
        ))
        .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.header("location"), Some("/items/9"));
        assert_eq!(res.header("x-rate-limit"), Some("10"));
        assert!(res.headers().get("skipped").is_none());
        assert_eq!(res.body(), b"9");
    }

    struct Download(Vec<u8>);
    impl Response for Download {
        type Status = StatusOk;
        fn describe(s: &mut ShapeDecl) {
            s.data_stream();
        }
        fn into_parts(self) -> ResponseParts {
            ResponseParts {
                data: Some(DataPart::Stream(DataStream::from(self.0))),
                ..ResponseParts::default()
            }
        }
    }

    #[test]
    fn test_stream_is_written_verbatim() {
        let res = write(Download(vec![0, 1, 2, 255])).unwrap();
        assert_eq!(res.body(), &[0, 1, 2, 255]);
        assert_eq!(res.header("content-type"), Some(OCTET_STREAM));
    }

    struct Nothing;
    impl Response for Nothing {
        type Status = StatusNoContent;
        fn describe(_s: &mut ShapeDecl) {}
        fn into_parts(self) -> ResponseParts {
            ResponseParts::default()
        }
    }

    #[test]
    fn test_no_body() {
        let res = write(Nothing).unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(res.body().is_empty());
        assert!(res.header("content-type").is_none());
    }

    struct Unencodable;
    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _s: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("unsupported type"))
        }
    }

    struct Broken;
    impl Response for Broken {
        type Status = StatusOk;
        fn describe(s: &mut ShapeDecl) {
            s.data::<Unencodable>();
        }
        fn into_parts(self) -> ResponseParts {
            ResponseParts {
                data: Some(DataPart::Json(ResponseParts::encode(&Unencodable))),
                ..ResponseParts::default()
            }
        }
    }

    #[test]
    fn test_encoding_failure_writes_nothing() {
        let parsed = ParsedResponse::classify::<Broken>().unwrap();
        let mut res = BufferedResponse::new();
        let err = write_response(&parsed, Broken.into_parts(), &mut res).unwrap_err();
        assert!(err.to_string().contains("unsupported type"));
        assert!(res.body().is_empty());
        assert!(res.headers().is_empty());
    }
}
