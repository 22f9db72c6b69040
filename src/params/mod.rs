//! # Params Module
//!
//! Binding of handler inputs from the request: path captures, the query string,
//! headers and the JSON body.
//!
//! ## Overview
//!
//! A handler input type declares where it is read from ([`ParamLocation`]) and
//! which fields it has ([`Fields`]). Usually both come from `#[derive(Params)]`:
//!
//! ```rust
//! use serde::Deserialize;
//! use typeroute::Params;
//!
//! #[derive(Deserialize, Params)]
//! #[params(url)]
//! struct ListPosts {
//!     id: i64,
//!     #[param(default = r#""all""#)]
//!     keyword: String,
//!     tag: Vec<String>,
//!     cursor: Option<String>,
//! }
//! ```
//!
//! At registration the declaration is classified into [`ParsedField`] tables
//! ([`classify`]); at request time the tables drive the loaders in [`load`].
//!
//! ## Naming
//!
//! | location | default wire name |
//! |----------|-------------------|
//! | path     | kebab-case (`user-id`) |
//! | query    | snake_case (`page_size`) |
//! | header   | kebab-case (`x-request-id`) |
//! | body     | the field identifier |
//!
//! `#[param(name = "...")]` overrides all of them. A url field whose name matches a
//! template capture is bound to the path and must be a plain, non-defaulted value.

pub mod case;
pub mod classify;
pub mod fields;
pub mod load;
pub mod value;

pub use classify::{classify, object_schema, ParsedField, ParsedParam};
pub use fields::{Arity, FieldDecl, FieldSet, Fields};
pub use load::Bag;
pub use value::{literal, textual, ParamValue};

use serde::de::DeserializeOwned;

/// Where a handler input is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamLocation {
    Header,
    /// Path captures and the query string.
    Url,
    Body,
}

impl ParamLocation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ParamLocation::Header => "header",
            ParamLocation::Url => "url",
            ParamLocation::Body => "body",
        }
    }
}

/// A struct bound from one request location.
pub trait Params: Fields + DeserializeOwned + Send + 'static {
    const LOCATION: ParamLocation;
}
