//! # Response Module
//!
//! Turns a handler's return value into status, headers and body, based only on
//! the *shape* of its type.
//!
//! ## Shapes
//!
//! A response type declares up to four fields:
//!
//! | field    | effect |
//! |----------|--------|
//! | `header` | a struct whose fields become headers (kebab-case names) |
//! | `data`   | the payload; `{"data": ...}` unless marked direct or a [`DataStream`] |
//! | `meta`   | paging or other metadata, written as `{"data": ..., "meta": ...}` |
//! | `error`  | the error object, written as `{"error": ...}` |
//!
//! and a status marker from [`status`]. Registration rejects `error` next to
//! `data` or `meta`, `meta` without `data`, and `meta` next to a stream.
//!
//! ```rust
//! use serde::Serialize;
//! use typeroute::response::status::StatusCreated;
//! use typeroute::Response;
//!
//! #[derive(Serialize)]
//! struct Headers {
//!     location: String,
//! }
//!
//! #[derive(Response)]
//! #[response(status = StatusCreated)]
//! struct Created {
//!     header: Headers,
//!     #[response(direct)]
//!     data: u64,
//! }
//! ```

pub mod shape;
pub mod status;
pub mod write;

pub use shape::{DataKind, DataPart, DataStream, Encoded, ParsedResponse, Response, ResponseParts, ShapeDecl};
pub use status::FixedStatus;
pub use write::{write_response, EncodeError, OCTET_STREAM};
