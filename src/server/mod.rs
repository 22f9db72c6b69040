//! Transport-facing request and response types.
//!
//! The engine does not own a listener. A transport converts its requests into
//! [`Request`] and either passes a [`ResponseWriter`] to
//! [`Router::dispatch`](crate::Router::dispatch) or collects a
//! [`BufferedResponse`] from [`Router::handle`](crate::Router::handle).

pub mod request;
pub mod response;

pub use request::{Context, Request};
pub use response::{BufferedResponse, ResponseWriter, JSON_CONTENT_TYPE};
