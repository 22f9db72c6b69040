use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::{Method, StatusCode};
use tracing::{debug, error, info, warn};

use super::path::{Captures, PathTemplate};
use crate::dispatcher::{erase, BoxedHandler, Declared, Handler, LoadContext, RawHandler, Reply};
use crate::error::{ApiError, ConfigError, ErrorCode};
use crate::middleware::Middleware;
use crate::params::case::to_kebab;
use crate::params::classify::short_type_name;
use crate::params::ParsedParam;
use crate::response::{write_response, ParsedResponse, Response};
use crate::runtime_config::RuntimeConfig;
use crate::server::{BufferedResponse, Request, ResponseWriter};
use crate::validator::FormatRegistry;
use crate::variants::VariantSet;

/// Documentation metadata of an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationMeta {
    pub summary: String,
    pub description: String,
    pub operation_id: String,
    pub tags: Vec<String>,
    /// Security requirement names, e.g. `["bearer"]`.
    pub security: Vec<String>,
}

pub(crate) enum Binding {
    Bound {
        handler: BoxedHandler,
        params: Vec<ParsedParam>,
        response: Declared,
    },
    Raw(RawHandler),
}

/// One registered `(method, template, handler)`.
pub struct Operation {
    method: Method,
    template: PathTemplate,
    handler_name: &'static str,
    binding: Binding,
    meta: OperationMeta,
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("method", &self.method)
            .field("template", &self.template.as_str())
            .field("handler", &self.handler_name)
            .field("raw", &self.is_raw())
            .finish_non_exhaustive()
    }
}

impl Operation {
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// Type name of the handler function or closure.
    #[must_use]
    pub fn handler_name(&self) -> &'static str {
        self.handler_name
    }

    /// Input descriptors in argument order; empty for raw overrides.
    #[must_use]
    pub fn params(&self) -> &[ParsedParam] {
        match &self.binding {
            Binding::Bound { params, .. } => params,
            Binding::Raw(_) => &[],
        }
    }

    /// The declared response, or `None` for raw overrides.
    #[must_use]
    pub fn response(&self) -> Option<&Declared> {
        match &self.binding {
            Binding::Bound { response, .. } => Some(response),
            Binding::Raw(_) => None,
        }
    }

    #[must_use]
    pub fn is_raw(&self) -> bool {
        matches!(self.binding, Binding::Raw(_))
    }

    #[must_use]
    pub fn meta(&self) -> &OperationMeta {
        &self.meta
    }

    pub fn summary(&mut self, text: &str) -> &mut Self {
        self.meta.summary = text.to_string();
        self
    }

    pub fn description(&mut self, text: &str) -> &mut Self {
        self.meta.description = text.to_string();
        self
    }

    pub fn operation_id(&mut self, id: &str) -> &mut Self {
        self.meta.operation_id = id.to_string();
        self
    }

    pub fn tag(&mut self, tag: &str) -> &mut Self {
        self.meta.tags.push(tag.to_string());
        self
    }

    pub fn security(&mut self, scheme: &str) -> &mut Self {
        self.meta.security.push(scheme.to_string());
        self
    }
}

/// The default operation id: the kebab-cased function name, or empty for closures.
fn default_operation_id(handler_name: &str) -> String {
    let last = handler_name.rsplit("::").next().unwrap_or(handler_name);
    if last.contains('{') || handler_name.contains("{{closure}}") {
        String::new()
    } else {
        to_kebab(last)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

fn write_error(w: &mut dyn ResponseWriter, status: StatusCode, error: &ApiError) {
    let res = BufferedResponse::error(status, error);
    for (name, value) in res.headers() {
        w.headers_mut().insert(name.clone(), value.clone());
    }
    w.write_head(status);
    if let Err(e) = w.write_body(res.body()) {
        warn!(error = %e, "Failed to write error response");
    }
}

/// Registry of operations and the request dispatcher.
///
/// Build it single-threaded at startup, then share it (`Arc<Router>`) with the
/// transport. Nothing inside changes while requests are served.
pub struct Router {
    operations: Vec<Operation>,
    variants: VariantSet,
    formats: FormatRegistry,
    middlewares: Vec<Arc<dyn Middleware>>,
    config: RuntimeConfig,
}

impl Default for Router {
    fn default() -> Self {
        Self::with_config(RuntimeConfig::default())
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("operations", &self.operations)
            .field("variants", &self.variants)
            .field("formats", &self.formats)
            .field("middlewares", &self.middlewares.len())
            .field("config", &self.config)
            .finish()
    }
}

macro_rules! method_shortcuts {
    ($($name:ident => $method:ident),*) => {$(
        #[doc = concat!("Register a `", stringify!($method), "` operation. Panics on misconfiguration.")]
        pub fn $name<H, Args>(&mut self, path: &str, handler: H) -> &mut Operation
        where
            H: Handler<Args>,
        {
            self.register(Method::$method, path, handler)
        }
    )*};
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            operations: Vec::new(),
            variants: VariantSet::new(),
            formats: FormatRegistry::default(),
            middlewares: Vec::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Register a custom string format for `#[param(format = "...")]`.
    ///
    /// Only operations registered afterwards can use it.
    pub fn add_format<F>(&mut self, name: &str, check: F) -> &mut Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.formats.add(name, Arc::new(check));
        self
    }

    /// Install a middleware; hooks run in installation order.
    pub fn with_middleware(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Register `R` as a member of capability `C`.
    ///
    /// # Errors
    ///
    /// The classification error of `R`.
    pub fn try_variant<C: 'static, R: Response>(&mut self) -> Result<&mut Self, ConfigError> {
        self.variants.add::<C, R>()?;
        Ok(self)
    }

    /// Register `R` as a member of capability `C`. Panics if `R` is not a valid shape.
    pub fn variant<C: 'static, R: Response>(&mut self) -> &mut Self {
        if let Err(e) = self.variants.add::<C, R>() {
            panic!("invalid response variant {}: {e}", std::any::type_name::<R>());
        }
        self
    }

    #[must_use]
    pub fn variants(&self) -> &VariantSet {
        &self.variants
    }

    /// Registered operations in registration order.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    fn push(&mut self, op: Operation) -> &mut Operation {
        self.operations.push(op);
        let last = self.operations.len() - 1;
        &mut self.operations[last]
    }

    /// Classify `handler` and register it.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from the template, the inputs or the response type.
    pub fn try_register<H, Args>(
        &mut self,
        method: Method,
        path: &str,
        handler: H,
    ) -> Result<&mut Operation, ConfigError>
    where
        H: Handler<Args>,
    {
        let template = PathTemplate::compile(path)?;
        let params = H::parse_inputs(&template, &self.formats)?;
        let response = <H::Output as Reply>::declare()?;
        let handler_name = std::any::type_name::<H>();

        info!(
            method = %method,
            path = %path,
            handler = short_type_name(handler_name),
            params = params.len(),
            "Operation registered"
        );

        Ok(self.push(Operation {
            method,
            template,
            handler_name,
            meta: OperationMeta {
                operation_id: default_operation_id(handler_name),
                ..OperationMeta::default()
            },
            binding: Binding::Bound {
                handler: erase(handler),
                params,
                response,
            },
        }))
    }

    /// Register `handler`, panicking with the route and cause on misconfiguration.
    pub fn register<H, Args>(&mut self, method: Method, path: &str, handler: H) -> &mut Operation
    where
        H: Handler<Args>,
    {
        let route = format!("{method} {path}");
        match self.try_register(method, path, handler) {
            Ok(op) => op,
            Err(e) => panic!("invalid operation `{route}`: {e}"),
        }
    }

    method_shortcuts!(
        get => GET,
        post => POST,
        put => PUT,
        patch => PATCH,
        delete => DELETE,
        head => HEAD,
        options => OPTIONS
    );

    /// Register a raw override that bypasses parameter binding and response shaping.
    ///
    /// # Errors
    ///
    /// An invalid path template.
    pub fn try_raw<F>(&mut self, method: Method, path: &str, handler: F) -> Result<&mut Operation, ConfigError>
    where
        F: Fn(&Request, &mut dyn ResponseWriter) + Send + Sync + 'static,
    {
        let template = PathTemplate::compile(path)?;
        let handler_name = std::any::type_name::<F>();
        info!(method = %method, path = %path, "Raw operation registered");
        Ok(self.push(Operation {
            method,
            template,
            handler_name,
            meta: OperationMeta {
                operation_id: default_operation_id(handler_name),
                ..OperationMeta::default()
            },
            binding: Binding::Raw(Arc::new(handler)),
        }))
    }

    /// Panicking form of [`try_raw`](Self::try_raw).
    pub fn raw<F>(&mut self, method: Method, path: &str, handler: F) -> &mut Operation
    where
        F: Fn(&Request, &mut dyn ResponseWriter) + Send + Sync + 'static,
    {
        let route = format!("{method} {path}");
        match self.try_raw(method, path, handler) {
            Ok(op) => op,
            Err(e) => panic!("invalid operation `{route}`: {e}"),
        }
    }

    /// Operations registered through the returned group share `prefix`.
    ///
    /// # Errors
    ///
    /// The prefix does not start with `/`, ends with `/`, or contains braces.
    pub fn try_group(&mut self, prefix: &str) -> Result<Group<'_>, ConfigError> {
        let invalid = |reason| ConfigError::InvalidPrefix {
            prefix: prefix.to_string(),
            reason,
        };
        if !prefix.starts_with('/') {
            return Err(invalid("must start with `/`"));
        }
        if prefix.ends_with('/') {
            return Err(invalid("must not end with `/`"));
        }
        if prefix.contains(['{', '}']) {
            return Err(invalid("must not contain path parameters"));
        }
        Ok(Group {
            router: self,
            prefix: prefix.to_string(),
        })
    }

    /// Panicking form of [`try_group`](Self::try_group).
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        let owned = prefix.to_string();
        match self.try_group(prefix) {
            Ok(group) => group,
            Err(e) => panic!("invalid group `{owned}`: {e}"),
        }
    }

    /// The operation serving `method path`, newest registration first.
    #[must_use]
    pub fn find(&self, method: &Method, path: &str) -> Option<(&Operation, Captures)> {
        self.operations
            .iter()
            .rev()
            .filter(|op| op.method == *method)
            .find_map(|op| op.template.matches(path).map(|c| (op, c)))
    }

    /// Serve one request into `w`.
    ///
    /// Unmatched requests get `404 not_found`, binding failures `400 invalid_param`,
    /// encoding failures `500 internal_error`. A handler returning an unregistered
    /// variant panics.
    pub fn dispatch(&self, req: &Request, w: &mut dyn ResponseWriter) {
        let Some((op, captures)) = self.find(req.method(), req.path()) else {
            debug!(method = %req.method(), path = %req.path(), "No operation matched");
            write_error(
                w,
                StatusCode::NOT_FOUND,
                &ApiError::not_found(req.method().as_str(), req.path()),
            );
            return;
        };

        let (handler, params, response) = match &op.binding {
            Binding::Raw(raw) => {
                debug!(path = %req.path(), template = op.template.as_str(), "Raw operation");
                raw(req, w);
                return;
            }
            Binding::Bound {
                handler,
                params,
                response,
            } => (handler, params, response),
        };

        let query = req.query_bag();
        let cx = LoadContext {
            request: req,
            captures: &captures,
            query: &query,
            max_body_bytes: self.config.max_body_bytes,
        };

        let reply = match handler(params.as_slice(), &cx) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    request_id = %req.request_id(),
                    template = op.template.as_str(),
                    error = %e,
                    "Request binding failed"
                );
                write_error(w, StatusCode::BAD_REQUEST, &ApiError::from(&e));
                return;
            }
        };

        let parsed: &ParsedResponse = match response {
            Declared::Concrete(parsed) => parsed,
            Declared::Capability { id, name } => {
                let member = reply.value.response_type();
                match self.variants.resolve(*id, member) {
                    Some(parsed) => parsed,
                    None => panic!(
                        "{}: {} is not a registered variant of {}; register it with Router::variant",
                        req.path(),
                        reply.value.response_name(),
                        name
                    ),
                }
            }
        };

        if let Err(e) = write_response(parsed, reply.value.into_parts_boxed(), w) {
            error!(
                request_id = %req.request_id(),
                template = op.template.as_str(),
                error = %e,
                "Response encoding failed"
            );
            write_error(
                w,
                StatusCode::INTERNAL_SERVER_ERROR,
                &ApiError::new(ErrorCode::InternalError, format!("{} {e}", req.path())),
            );
        }
    }

    fn dispatch_buffered(&self, req: &Request) -> BufferedResponse {
        if !self.config.recover_panics {
            let mut res = BufferedResponse::new();
            self.dispatch(req, &mut res);
            return res;
        }
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut res = BufferedResponse::new();
            self.dispatch(req, &mut res);
            res
        }));
        match outcome {
            Ok(res) => res,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    request_id = %req.request_id(),
                    method = %req.method(),
                    path = %req.path(),
                    panic_message = %message,
                    "Handler panicked"
                );
                BufferedResponse::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &ApiError::new(ErrorCode::InternalError, message),
                )
            }
        }
    }

    /// Run middleware and dispatch, buffering the response.
    #[must_use]
    pub fn handle(&self, mut req: Request) -> BufferedResponse {
        let mut early: Option<BufferedResponse> = None;
        for mw in &self.middlewares {
            let res = mw.before(&mut req);
            if early.is_none() {
                early = res;
            }
        }

        let (mut res, latency) = match early {
            Some(res) => (res, Duration::ZERO),
            None => {
                let start = Instant::now();
                let res = self.dispatch_buffered(&req);
                (res, start.elapsed())
            }
        };

        for mw in &self.middlewares {
            mw.after(&req, &mut res, latency);
        }
        res
    }

    /// [`handle`](Self::handle) for `http` crate types.
    #[must_use]
    pub fn call(&self, req: http::Request<Vec<u8>>) -> http::Response<Vec<u8>> {
        self.handle(Request::from(req)).into_http()
    }
}

/// Registers operations under a common path prefix.
pub struct Group<'a> {
    router: &'a mut Router,
    prefix: String,
}

macro_rules! group_shortcuts {
    ($($name:ident => $method:ident),*) => {$(
        #[doc = concat!("Register a `", stringify!($method), "` operation under the prefix.")]
        pub fn $name<H, Args>(&mut self, path: &str, handler: H) -> &mut Operation
        where
            H: Handler<Args>,
        {
            self.register(Method::$method, path, handler)
        }
    )*};
}

impl Group<'_> {
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// A nested group; `prefix` is appended to this group's prefix.
    ///
    /// # Errors
    ///
    /// See [`Router::try_group`].
    pub fn try_group(&mut self, prefix: &str) -> Result<Group<'_>, ConfigError> {
        let full = format!("{}{prefix}", self.prefix);
        self.router.try_group(&full)
    }

    /// # Errors
    ///
    /// See [`Router::try_register`].
    pub fn try_register<H, Args>(
        &mut self,
        method: Method,
        path: &str,
        handler: H,
    ) -> Result<&mut Operation, ConfigError>
    where
        H: Handler<Args>,
    {
        let full = format!("{}{path}", self.prefix);
        self.router.try_register(method, &full, handler)
    }

    pub fn register<H, Args>(&mut self, method: Method, path: &str, handler: H) -> &mut Operation
    where
        H: Handler<Args>,
    {
        let full = format!("{}{path}", self.prefix);
        self.router.register(method, &full, handler)
    }

    pub fn raw<F>(&mut self, method: Method, path: &str, handler: F) -> &mut Operation
    where
        F: Fn(&Request, &mut dyn ResponseWriter) + Send + Sync + 'static,
    {
        let full = format!("{}{path}", self.prefix);
        self.router.raw(method, &full, handler)
    }

    group_shortcuts!(
        get => GET,
        post => POST,
        put => PUT,
        patch => PATCH,
        delete => DELETE,
        head => HEAD,
        options => OPTIONS
    );
}
