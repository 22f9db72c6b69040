//! # Router Module
//!
//! The operation registry and the request dispatcher.
//!
//! ## Overview
//!
//! Operations are registered at startup with a method, a path template and a
//! handler function. Registration classifies the handler's inputs and response
//! type once; any misconfiguration is reported then, never per request.
//!
//! ```rust
//! use serde::Deserialize;
//! use typeroute::response::status::StatusOk;
//! use typeroute::{Params, Response, Router};
//!
//! #[derive(Deserialize, Params)]
//! #[params(url)]
//! struct GetUser {
//!     id: i64,
//! }
//!
//! #[derive(Response)]
//! #[response(status = StatusOk)]
//! struct User {
//!     data: i64,
//! }
//!
//! fn get_user(p: GetUser) -> User {
//!     User { data: p.id }
//! }
//!
//! let mut router = Router::new();
//! router.group("/api").get("/users/{id}", get_user).tag("users");
//!
//! let res = router.handle(typeroute::Request::get("/api/users/7"));
//! assert_eq!(res.status(), 200);
//! ```
//!
//! ## Matching
//!
//! Templates are compiled to anchored regular expressions (see [`path`]).
//! Requests are matched against the operations registered for their method,
//! newest registration first, so a later registration shadows an earlier one
//! with an overlapping template.

mod core;
pub mod path;

pub use core::{Group, Operation, OperationMeta, Router};
pub use path::{Captures, PathTemplate};
