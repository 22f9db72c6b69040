//! # typeroute
//!
//! **typeroute** binds plain Rust functions to HTTP operations. A handler declares
//! *what* it needs through its argument types and *what* it returns through its
//! result type; the engine does the rest:
//!
//! - matches the request against `/users/{user-id}/posts` style templates
//! - loads path captures, query values, headers and the JSON body into typed structs
//! - validates every value against a JSON Schema derived from the declaration
//! - writes the result as `{"data": ...}`, `{"data": ..., "meta": ...}`,
//!   `{"error": ...}`, a bare value or a byte stream, with a status fixed by the type
//!
//! ## Architecture
//!
//! - **[`router`]** - path templates, operation registry, dispatch
//! - **[`params`]** - field classification and parameter loading
//! - **[`response`]** - response shapes, status markers, encoding
//! - **[`variants`]** - handlers returning one of several response types
//! - **[`dispatcher`]** - the `Handler`/`Input`/`Reply` traits behind registration
//! - **[`middleware`]** - before/after hooks around dispatch
//! - **[`server`]** - transport-facing request and response types
//! - **[`docs`]** - serialisable descriptions of registered operations
//!
//! Configuration lives in [`runtime_config`], logging setup in [`logging`].
//!
//! ## Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use typeroute::response::status::{StatusNotFound, StatusOk};
//! use typeroute::{ApiError, OneOf, Params, Request, Response, Router};
//!
//! #[derive(Deserialize, Params)]
//! #[params(url)]
//! struct GetPet {
//!     id: u64,
//!     #[param(default = "false")]
//!     verbose: bool,
//! }
//!
//! #[derive(Serialize)]
//! struct Pet {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[derive(Response)]
//! #[response(status = StatusOk)]
//! struct Found {
//!     data: Pet,
//! }
//!
//! #[derive(Response)]
//! #[response(status = StatusNotFound)]
//! struct Missing {
//!     error: ApiError,
//! }
//!
//! fn get_pet(p: GetPet) -> OneOf<GetPet> {
//!     if p.id == 1 {
//!         OneOf::new(Found { data: Pet { id: 1, name: "Rex".into() } })
//!     } else {
//!         OneOf::new(Missing { error: ApiError::with_code("not_found") })
//!     }
//! }
//!
//! let mut router = Router::new();
//! router.variant::<GetPet, Found>().variant::<GetPet, Missing>();
//! router.get("/pets/{id}", get_pet);
//!
//! let res = router.handle(Request::get("/pets/1"));
//! assert_eq!(res.status(), 200);
//! assert_eq!(res.body_json().unwrap()["data"]["name"], "Rex");
//!
//! let res = router.handle(Request::get("/pets/2"));
//! assert_eq!(res.status(), 404);
//! ```
//!
//! ## Failure Modes
//!
//! Misconfiguration (a path capture with no field, a default that fails its own
//! schema, `error` next to `data`) is a [`ConfigError`] at registration. The
//! panicking `get`/`post`/... helpers turn it into a startup panic; `try_register`
//! returns it. Bad client input is a [`BindError`], answered with `400` and an
//! [`ApiError`] body.

extern crate self as typeroute;

pub mod dispatcher;
pub mod docs;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod params;
pub mod response;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod validator;
pub mod variants;

pub use docs::OperationDoc;
pub use error::{ApiError, BindError, ConfigError, ErrorCode};
pub use ids::RequestId;
pub use params::{ParamLocation, Params};
pub use response::{DataStream, Response};
pub use router::{Group, Operation, OperationMeta, Router};
pub use runtime_config::RuntimeConfig;
pub use server::{BufferedResponse, Context, Request, ResponseWriter};
pub use variants::{OneOf, VariantSet};

pub use typeroute_macros::{Params, Response};

#[doc(hidden)]
pub mod __private {
    //! Items referenced by derive-generated code.

    pub use serde_json::Value;

    /// A JSON literal, or the text itself as a string when it is not JSON.
    #[must_use]
    pub fn literal_value(text: &str) -> Value {
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}
