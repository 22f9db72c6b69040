use http::header::{HeaderName, HeaderValue};
use http::{Extensions, HeaderMap, Method};
use tracing::{debug, warn};

use crate::ids::RequestId;
use crate::params::Bag;

/// An incoming request as seen by the dispatcher.
///
/// The transport owns reading; by the time a `Request` exists its body is fully
/// buffered. Typed values can be attached to [`extensions`](Self::extensions_mut)
/// by middleware and are handed to handlers through [`Context`].
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: String,
    headers: HeaderMap,
    body: Vec<u8>,
    extensions: Extensions,
    request_id: RequestId,
}

impl Request {
    /// A request for `target`, which may carry a query string (`/users?limit=10`).
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };
        Self {
            method,
            path: if path.is_empty() { "/".into() } else { path.into() },
            query: query.into(),
            headers: HeaderMap::new(),
            body: Vec::new(),
            extensions: Extensions::new(),
            request_id: RequestId::new(),
        }
    }

    #[must_use]
    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    #[must_use]
    pub fn post(target: &str) -> Self {
        Self::new(Method::POST, target)
    }

    /// Add a header. Names or values that are not valid HTTP are dropped with a warning.
    #[must_use]
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        HeaderValue: TryFrom<V>,
    {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                if name == crate::ids::REQUEST_ID_HEADER {
                    self.request_id = RequestId::from_header_or_new(value.to_str().ok());
                }
                self.headers.append(name, value);
            }
            _ => warn!("Dropping invalid request header"),
        }
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string without the leading `?`.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn query_bag(&self) -> Bag {
        let bag = Bag::from_query(&self.query);
        debug!(query = %self.query, "Query params parsed");
        bag
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    #[must_use]
    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// The ambient context handed to handlers that ask for it.
    #[must_use]
    pub fn context(&self) -> Context {
        Context {
            request_id: self.request_id,
            extensions: self.extensions.clone(),
        }
    }
}

impl From<http::Request<Vec<u8>>> for Request {
    fn from(req: http::Request<Vec<u8>>) -> Self {
        let (parts, body) = req.into_parts();
        let request_id = RequestId::from_headers(&parts.headers);
        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().unwrap_or("").to_string(),
            headers: parts.headers,
            body,
            extensions: parts.extensions,
            request_id,
        }
    }
}

/// Request-scoped values passed through to handlers verbatim.
///
/// The engine never inspects the extensions; cancellation tokens, deadlines or
/// authenticated principals placed there by middleware reach the handler as-is.
#[derive(Debug, Clone)]
pub struct Context {
    request_id: RequestId,
    extensions: Extensions,
}

impl Context {
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }
}
