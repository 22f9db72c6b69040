use std::time::Duration;

use tracing::{debug, info};

use super::Middleware;
use crate::server::{BufferedResponse, Request};

/// Logs one line per request with its outcome and latency.
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before(&self, req: &mut Request) -> Option<BufferedResponse> {
        debug!(
            request_id = %req.request_id(),
            method = %req.method(),
            path = %req.path(),
            "Request received"
        );
        None
    }

    fn after(&self, req: &Request, res: &mut BufferedResponse, latency: Duration) {
        info!(
            request_id = %req.request_id(),
            method = %req.method(),
            path = %req.path(),
            status = res.status().as_u16(),
            latency_ms = latency.as_millis() as u64,
            "Request completed"
        );
    }
}
