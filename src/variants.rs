//! # Variant Registry
//!
//! Some handlers return one of several response shapes. They declare an open
//! *capability* marker type `C` and return [`OneOf<C>`]; every concrete shape
//! that may appear behind `C` must be registered on the router's [`VariantSet`]
//! during setup:
//!
//! ```rust
//! use typeroute::response::status::{StatusNotFound, StatusOk};
//! use typeroute::{ApiError, OneOf, Response, Router};
//!
//! struct GetPet;
//!
//! #[derive(Response)]
//! #[response(status = StatusOk)]
//! struct Found {
//!     data: String,
//! }
//!
//! #[derive(Response)]
//! #[response(status = StatusNotFound)]
//! struct Missing {
//!     error: ApiError,
//! }
//!
//! let mut router = Router::new();
//! router.variant::<GetPet, Found>().variant::<GetPet, Missing>();
//! assert_eq!(router.variants().members::<GetPet>().len(), 2);
//!
//! let _reply: OneOf<GetPet> = OneOf::new(Found { data: "rex".into() });
//! ```
//!
//! Returning an unregistered shape is a programming error: dispatch panics with
//! a message naming both types.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use crate::error::ConfigError;
use crate::params::classify::short_type_name;
use crate::response::{ParsedResponse, Response, ResponseParts};

/// A response with its concrete type erased.
pub(crate) trait ErasedResponse: Send {
    fn response_type(&self) -> TypeId;
    fn response_name(&self) -> &'static str;
    fn into_parts_boxed(self: Box<Self>) -> ResponseParts;
}

impl<R: Response> ErasedResponse for R {
    fn response_type(&self) -> TypeId {
        TypeId::of::<R>()
    }

    fn response_name(&self) -> &'static str {
        std::any::type_name::<R>()
    }

    fn into_parts_boxed(self: Box<Self>) -> ResponseParts {
        (*self).into_parts()
    }
}

/// One of the shapes registered for capability `C`.
pub struct OneOf<C: 'static> {
    pub(crate) value: Box<dyn ErasedResponse>,
    _capability: PhantomData<fn() -> C>,
}

impl<C: 'static> OneOf<C> {
    pub fn new<R: Response>(value: R) -> Self {
        Self {
            value: Box::new(value),
            _capability: PhantomData,
        }
    }

    /// Type name of the wrapped value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.value.response_name()
    }
}

impl<C: 'static> fmt::Debug for OneOf<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OneOf").field(&self.type_name()).finish()
    }
}

#[derive(Debug, Clone)]
struct Members {
    name: &'static str,
    shapes: Vec<ParsedResponse>,
}

/// Capability -> registered response shapes.
///
/// Filled during setup, read-only while serving.
#[derive(Debug, Clone, Default)]
pub struct VariantSet {
    capabilities: HashMap<TypeId, Members>,
    order: Vec<TypeId>,
}

impl VariantSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `R` as a member of `C`. Registering the same pair twice is a no-op.
    ///
    /// # Errors
    ///
    /// The [`ConfigError`] from classifying `R`.
    pub fn add<C: 'static, R: Response>(&mut self) -> Result<(), ConfigError> {
        let parsed = ParsedResponse::classify::<R>()?;
        let capability = TypeId::of::<C>();
        let order = &mut self.order;
        let entry = self.capabilities.entry(capability).or_insert_with(|| {
            order.push(capability);
            Members {
                name: std::any::type_name::<C>(),
                shapes: Vec::new(),
            }
        });
        if entry.shapes.iter().all(|s| s.type_id() != parsed.type_id()) {
            debug!(
                capability = short_type_name(entry.name),
                member = short_type_name(parsed.type_name()),
                status = parsed.status(),
                "Registered response variant"
            );
            entry.shapes.push(parsed);
        }
        Ok(())
    }

    /// Members of `C` in registration order.
    #[must_use]
    pub fn members<C: 'static>(&self) -> &[ParsedResponse] {
        self.members_of(TypeId::of::<C>())
    }

    #[must_use]
    pub fn members_of(&self, capability: TypeId) -> &[ParsedResponse] {
        self.capabilities
            .get(&capability)
            .map_or(&[], |m| m.shapes.as_slice())
    }

    /// The shape of `member` when it is registered under `capability`.
    #[must_use]
    pub fn resolve(&self, capability: TypeId, member: TypeId) -> Option<&ParsedResponse> {
        self.members_of(capability)
            .iter()
            .find(|s| s.type_id() == member)
    }

    /// `(capability name, members)` for every capability in the order the
    /// capabilities were first registered.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[ParsedResponse])> {
        self.order
            .iter()
            .filter_map(|id| self.capabilities.get(id))
            .map(|m| (m.name, m.shapes.as_slice()))
    }
}
