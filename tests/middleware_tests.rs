//! Tests for the middleware hooks around [`Router::handle`].
//!
//! # Test Coverage
//!
//! - `before` hooks can attach extensions that handlers read through `Context`
//! - The first early response short-circuits dispatch; every `after` still runs
//! - `TracingMiddleware` logs one completion line per request

use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::StatusCode;
use serde_json::json;
use typeroute::middleware::{Middleware, TracingMiddleware};
use typeroute::response::status::StatusOk;
use typeroute::{ApiError, BufferedResponse, Context, ErrorCode, Request, Response, Router};

mod tracing_util;
use tracing_util::TestTracing;

#[derive(Response)]
#[response(status = StatusOk)]
struct Whoami {
    data: serde_json::Value,
}

fn whoami(cx: Context) -> Whoami {
    Whoami {
        data: json!(cx.get::<User>().map(|u| u.0.clone())),
    }
}

#[derive(Clone)]
struct User(String);

struct Authenticate;

impl Middleware for Authenticate {
    fn before(&self, req: &mut Request) -> Option<BufferedResponse> {
        let token = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        match token {
            Some(user) => {
                req.extensions_mut().insert(User(user));
                None
            }
            None => Some(BufferedResponse::error(
                StatusCode::UNAUTHORIZED,
                &ApiError::with_code("unauthorized"),
            )),
        }
    }
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(String, u16, Duration)>>,
}

impl Middleware for Recorder {
    fn after(&self, req: &Request, res: &mut BufferedResponse, latency: Duration) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((req.path().to_string(), res.status().as_u16(), latency));
        }
    }
}

#[test]
fn test_before_hook_feeds_context() {
    let mut router = Router::new();
    router.with_middleware(Arc::new(Authenticate));
    router.get("/whoami", whoami);

    let res = router.handle(Request::get("/whoami").header("authorization", "Bearer ann"));
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body_json().unwrap(), json!({"data": "ann"}));
}

#[test]
fn test_early_response_skips_dispatch_but_runs_after_hooks() {
    let recorder = Arc::new(Recorder::default());
    let mut router = Router::new();
    router
        .with_middleware(Arc::new(Authenticate))
        .with_middleware(Arc::clone(&recorder) as Arc<dyn Middleware>);
    router.get("/whoami", whoami);

    let res = router.handle(Request::get("/whoami"));
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        res.body_json().unwrap(),
        json!({"error": {"code": "unauthorized"}})
    );

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "/whoami");
    assert_eq!(seen[0].1, 401);
    assert_eq!(seen[0].2, Duration::ZERO);
}

#[test]
fn test_after_hook_sees_not_found() {
    let recorder = Arc::new(Recorder::default());
    let mut router = Router::new();
    router.with_middleware(Arc::clone(&recorder) as Arc<dyn Middleware>);

    let res = router.handle(Request::get("/nowhere"));
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        res.body_json().unwrap()["error"]["code"],
        ErrorCode::NotFound.as_str()
    );
    assert_eq!(recorder.seen.lock().unwrap()[0].1, 404);
}

#[test]
fn test_tracing_middleware_logs_completion() {
    let tracing = TestTracing::init();
    let mut router = Router::new();
    router.with_middleware(Arc::new(TracingMiddleware));
    router.get("/whoami", whoami);

    let res = router.handle(
        Request::get("/whoami").header("x-request-id", "01ARZ3NDEKTSV4RRFFQ69G5FAV"),
    );
    assert_eq!(res.status(), StatusCode::OK);

    let completed = tracing.find("Request completed");
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0]["fields"]["status"], 200);
    assert_eq!(completed[0]["fields"]["path"], "/whoami");
    assert_eq!(
        completed[0]["fields"]["request_id"],
        "01ARZ3NDEKTSV4RRFFQ69G5FAV"
    );
}

#[test]
fn test_binding_failure_is_logged() {
    #[derive(serde::Deserialize, typeroute::Params)]
    #[params(url)]
    struct Page {
        n: u32,
    }

    let tracing = TestTracing::init();
    let mut router = Router::new();
    router.get("/page", |p: Page| Whoami { data: json!(p.n) });

    let res = router.handle(Request::get("/page?n=-1"));
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let failed = tracing.find("Request binding failed");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["level"], "WARN");
}
