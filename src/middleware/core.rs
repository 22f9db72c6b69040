use std::time::Duration;

use crate::server::{BufferedResponse, Request};

/// Hooks run around [`Router::handle`](crate::Router::handle).
///
/// Every `before` hook runs in installation order and may attach extensions to the
/// request; the first one returning a response short-circuits dispatch. Every
/// `after` hook then runs, in the same order, on whichever response was produced.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &mut Request) -> Option<BufferedResponse> {
        None
    }
    fn after(&self, _req: &Request, _res: &mut BufferedResponse, _latency: Duration) {}
}
