//! Handler traits and the arity expansion that turns ordinary functions into
//! type-erased, request-driven callables.

use std::any::TypeId;
use std::sync::Arc;

use crate::error::{BindError, ConfigError};
use crate::params::load::{load_body, load_header, load_url};
use crate::params::{classify, Bag, ParsedParam, Params};
use crate::response::{ParsedResponse, Response};
use crate::router::path::{Captures, PathTemplate};
use crate::server::{Context, Request, ResponseWriter};
use crate::validator::FormatRegistry;
use crate::variants::{ErasedResponse, OneOf};

/// Everything an input needs to load itself from one request.
pub struct LoadContext<'a> {
    pub request: &'a Request,
    pub captures: &'a Captures,
    pub query: &'a Bag,
    pub max_body_bytes: usize,
}

/// A value a handler can take as an argument.
pub trait Input: Sized + Send + 'static {
    /// Build the registration-time descriptor of this input.
    ///
    /// # Errors
    ///
    /// A [`ConfigError`] when the input cannot be bound at `template`.
    fn parse(template: &PathTemplate, formats: &FormatRegistry) -> Result<ParsedParam, ConfigError>;

    /// Produce the value for one request.
    ///
    /// # Errors
    ///
    /// A [`BindError`] when the request does not carry a valid value.
    fn load(param: &ParsedParam, cx: &LoadContext<'_>) -> Result<Self, BindError>;
}

impl<P: Params> Input for P {
    fn parse(template: &PathTemplate, formats: &FormatRegistry) -> Result<ParsedParam, ConfigError> {
        classify::<P>(template, formats)
    }

    fn load(param: &ParsedParam, cx: &LoadContext<'_>) -> Result<Self, BindError> {
        match param {
            ParsedParam::Url { type_name, fields } => {
                load_url(type_name, fields, cx.captures, cx.query)
            }
            ParsedParam::Header { type_name, fields } => {
                load_header(type_name, fields, cx.request.headers())
            }
            ParsedParam::Body { schema, .. } => {
                load_body(schema, cx.request.body_bytes(), cx.max_body_bytes)
            }
            ParsedParam::Context | ParsedParam::Request => Err(BindError::Assemble {
                params: std::any::type_name::<P>().to_string(),
                reason: "descriptor does not describe a params struct".into(),
            }),
        }
    }
}

impl Input for Context {
    fn parse(_: &PathTemplate, _: &FormatRegistry) -> Result<ParsedParam, ConfigError> {
        Ok(ParsedParam::Context)
    }

    fn load(_: &ParsedParam, cx: &LoadContext<'_>) -> Result<Self, BindError> {
        Ok(cx.request.context())
    }
}

impl Input for Request {
    fn parse(_: &PathTemplate, _: &FormatRegistry) -> Result<ParsedParam, ConfigError> {
        Ok(ParsedParam::Request)
    }

    fn load(_: &ParsedParam, cx: &LoadContext<'_>) -> Result<Self, BindError> {
        Ok(cx.request.clone())
    }
}

/// The response type an operation declares.
#[derive(Debug, Clone)]
pub enum Declared {
    /// One concrete shape, classified at registration.
    Concrete(ParsedResponse),
    /// An open capability, resolved against the variant set per response.
    Capability { id: TypeId, name: &'static str },
}

/// A handler's return value with its concrete type erased.
pub struct ReplyValue {
    pub(crate) value: Box<dyn ErasedResponse>,
}

/// A value a handler can return.
pub trait Reply: Send + 'static {
    /// # Errors
    ///
    /// The classification error of a concrete response shape.
    fn declare() -> Result<Declared, ConfigError>;

    fn into_reply(self) -> ReplyValue;
}

impl<R: Response> Reply for R {
    fn declare() -> Result<Declared, ConfigError> {
        ParsedResponse::classify::<R>().map(Declared::Concrete)
    }

    fn into_reply(self) -> ReplyValue {
        ReplyValue {
            value: Box::new(self),
        }
    }
}

impl<C: 'static> Reply for OneOf<C> {
    fn declare() -> Result<Declared, ConfigError> {
        Ok(Declared::Capability {
            id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
        })
    }

    fn into_reply(self) -> ReplyValue {
        ReplyValue { value: self.value }
    }
}

/// A function usable as an operation handler.
///
/// Implemented for every `Fn(A1, .., An) -> R` with up to eight [`Input`]
/// arguments and a [`Reply`] result.
pub trait Handler<Args>: Send + Sync + 'static {
    type Output: Reply;

    /// One descriptor per argument, in argument order.
    ///
    /// # Errors
    ///
    /// The first argument's [`ConfigError`].
    fn parse_inputs(
        template: &PathTemplate,
        formats: &FormatRegistry,
    ) -> Result<Vec<ParsedParam>, ConfigError>;

    /// Load every argument in order and call the function.
    ///
    /// # Errors
    ///
    /// The first argument's [`BindError`]; the function is not called.
    fn invoke(&self, params: &[ParsedParam], cx: &LoadContext<'_>) -> Result<Self::Output, BindError>;
}

fn next_param<'a>(
    it: &mut std::slice::Iter<'a, ParsedParam>,
) -> Result<&'a ParsedParam, BindError> {
    it.next().ok_or_else(|| BindError::Assemble {
        params: "handler".into(),
        reason: "fewer descriptors than arguments".into(),
    })
}

macro_rules! impl_handler {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> Handler<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: Reply,
            $($arg: Input,)*
        {
            type Output = R;

            fn parse_inputs(
                _template: &PathTemplate,
                _formats: &FormatRegistry,
            ) -> Result<Vec<ParsedParam>, ConfigError> {
                Ok(vec![$($arg::parse(_template, _formats)?),*])
            }

            #[allow(non_snake_case)]
            fn invoke(
                &self,
                _params: &[ParsedParam],
                _cx: &LoadContext<'_>,
            ) -> Result<R, BindError> {
                let mut _it = _params.iter();
                $(let $arg = $arg::load(next_param(&mut _it)?, _cx)?;)*
                Ok((self)($($arg),*))
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
impl_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8);

/// A registered handler with its argument types erased.
pub(crate) type BoxedHandler =
    Arc<dyn Fn(&[ParsedParam], &LoadContext<'_>) -> Result<ReplyValue, BindError> + Send + Sync>;

/// A raw override: receives the request untouched and writes its own response.
pub type RawHandler = Arc<dyn Fn(&Request, &mut dyn ResponseWriter) + Send + Sync>;

pub(crate) fn erase<H, Args>(handler: H) -> BoxedHandler
where
    H: Handler<Args>,
{
    Arc::new(move |params: &[ParsedParam], cx: &LoadContext<'_>| {
        handler.invoke(params, cx).map(Reply::into_reply)
    })
}
