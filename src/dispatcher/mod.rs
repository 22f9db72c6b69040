//! # Dispatcher Module
//!
//! Glue between plain Rust functions and the request pipeline.
//!
//! ## Overview
//!
//! Any function whose arguments implement [`Input`] and whose result implements
//! [`Reply`] is a [`Handler`]:
//!
//! - `Params` structs (`#[derive(Params)]`) load from the path, query, headers or body
//! - [`Context`](crate::server::Context) is the ambient request context, passed through
//! - [`Request`](crate::server::Request) is the raw request
//!
//! Results are either one concrete [`Response`](crate::response::Response) type or
//! [`OneOf<C>`](crate::OneOf) for handlers returning several shapes.
//!
//! ## Registration vs. Request Time
//!
//! [`Handler::parse_inputs`] runs once when the operation is registered and
//! produces one [`ParsedParam`](crate::params::ParsedParam) per argument.
//! [`Handler::invoke`] runs per request: it loads the arguments in order and
//! stops at the first binding error, so the function is never called with a
//! partially bound request.
//!
//! ```rust
//! use serde::Deserialize;
//! use typeroute::response::status::StatusOk;
//! use typeroute::{Context, Params, Response, Router};
//!
//! #[derive(Deserialize, Params)]
//! #[params(url)]
//! struct Hello {
//!     name: String,
//! }
//!
//! #[derive(Response)]
//! #[response(status = StatusOk)]
//! struct Greeting {
//!     data: String,
//! }
//!
//! fn hello(_cx: Context, p: Hello) -> Greeting {
//!     Greeting { data: format!("hello {}", p.name) }
//! }
//!
//! let mut router = Router::new();
//! router.get("/hello/{name}", hello);
//! ```

mod core;

pub use core::{Declared, Handler, Input, LoadContext, RawHandler, Reply, ReplyValue};

pub(crate) use core::{erase, BoxedHandler};
