//! Tests for registration-time validation.
//!
//! # Test Coverage
//!
//! - Path fields cannot be defaulted, repeated or optional
//! - Every template capture needs a url field
//! - Defaults and examples must satisfy their own schema
//! - Malformed templates and group prefixes
//! - Response shape rules at registration
//! - Panicking registration names the route and the cause
//! - Groups, operation metadata and custom formats

use http::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use typeroute::response::status::StatusOk;
use typeroute::{ApiError, ConfigError, Params, Request, Response, Router};

#[derive(Response)]
#[response(status = StatusOk)]
struct Done {
    data: serde_json::Value,
}

#[derive(Deserialize, Params)]
#[params(url)]
struct DefaultedPath {
    #[param(default = "1")]
    id: i64,
}

#[derive(Deserialize, Params)]
#[params(url)]
struct RepeatedPath {
    id: Vec<i64>,
}

#[derive(Deserialize, Params)]
#[params(url)]
struct OptionalPath {
    id: Option<i64>,
}

#[derive(Deserialize, Params)]
#[params(url)]
struct NoPath {
    name: String,
}

#[test]
fn test_path_field_rules() {
    let mut router = Router::new();

    let err = router
        .try_register(Method::GET, "/users/{id}", |_: DefaultedPath| Done { data: json!(null) })
        .unwrap_err();
    assert_eq!(err.to_string(), "path parameter cannot have a default, param: id");

    let err = router
        .try_register(Method::GET, "/users/{id}", |_: RepeatedPath| Done { data: json!(null) })
        .unwrap_err();
    assert_eq!(err, ConfigError::PathFieldSlice { field: "id".into() });

    let err = router
        .try_register(Method::GET, "/users/{id}", |_: OptionalPath| Done { data: json!(null) })
        .unwrap_err();
    assert_eq!(err, ConfigError::PathFieldOptional { field: "id".into() });

    let err = router
        .try_register(Method::GET, "/users/{id}", |_: NoPath| Done { data: json!(null) })
        .unwrap_err();
    assert_eq!(err.to_string(), "expect to have path parameter for {id} in NoPath");

    assert!(router.operations().is_empty());
}

#[derive(Deserialize, Params)]
#[params(url)]
struct UserId {
    #[param(name = "user-id")]
    uid: u64,
}

#[test]
fn test_renamed_path_field() {
    let mut router = Router::new();
    router.get("/users/{user-id}", |p: UserId| Done { data: json!(p.uid) });
    let res = router.handle(Request::get("/users/12"));
    assert_eq!(res.body_json().unwrap()["data"], 12);
}

#[derive(Deserialize, Params)]
#[params(url)]
struct BadDefault {
    #[param(default = "500", maximum = 100)]
    limit: u32,
}

#[derive(Deserialize, Params)]
#[params(url)]
struct BadExample {
    #[param(example = "\"many\"")]
    limit: u32,
}

#[test]
fn test_defaults_and_examples_are_checked() {
    let mut router = Router::new();
    let err = router
        .try_register(Method::GET, "/items", |_: BadDefault| Done { data: json!(null) })
        .unwrap_err();
    assert!(matches!(err, ConfigError::MalformedDefault { ref field, .. } if field == "limit"));
    assert!(err.to_string().starts_with("failed to parse `default` of `limit`"));

    let err = router
        .try_register(Method::GET, "/items", |_: BadExample| Done { data: json!(null) })
        .unwrap_err();
    assert!(matches!(err, ConfigError::MalformedExample { ref field, .. } if field == "limit"));
}

#[test]
fn test_malformed_templates() {
    let mut router = Router::new();
    for template in ["users", "/users/{userId}", "/a/*/b", "/x/{id}/{id}"] {
        assert!(
            router
                .try_register(Method::GET, template, || Done { data: json!(null) })
                .is_err(),
            "{template} should be rejected"
        );
    }
}

#[test]
#[should_panic(expected = "invalid operation `GET /users/{id}`: path parameter cannot be optional, param: id")]
fn test_register_panics_with_route_and_cause() {
    let mut router = Router::new();
    router.get("/users/{id}", |_: OptionalPath| Done { data: json!(null) });
}

#[derive(Response)]
#[response(status = StatusOk)]
struct MetaOnly {
    meta: u32,
}

#[derive(Response)]
#[response(status = StatusOk)]
struct MetaAndError {
    error: ApiError,
    meta: u32,
}

#[derive(Response)]
#[response(status = StatusOk)]
struct StreamWithMeta {
    data: typeroute::DataStream,
    meta: u32,
}

#[test]
fn test_response_shape_rules() {
    let mut router = Router::new();
    let err = router
        .try_register(Method::GET, "/a", || MetaOnly { meta: 1 })
        .unwrap_err();
    assert!(matches!(err, ConfigError::MetaWithoutData { .. }));

    let err = router
        .try_register(Method::GET, "/b", || MetaAndError {
            error: ApiError::default(),
            meta: 1,
        })
        .unwrap_err();
    assert!(matches!(err, ConfigError::MetaWithError { .. }));

    let err = router
        .try_register(Method::GET, "/c", || StreamWithMeta {
            data: typeroute::DataStream::from(Vec::<u8>::new()),
            meta: 1,
        })
        .unwrap_err();
    assert!(matches!(err, ConfigError::MetaWithStream { .. }));
}

fn list_users() -> Done {
    Done { data: json!([]) }
}

#[test]
fn test_groups_and_metadata() {
    let mut router = Router::new();
    {
        let mut api = router.group("/api");
        api.get("/users", list_users)
            .summary("List users")
            .tag("users")
            .security("bearer");
        let mut v2 = api.try_group("/v2").unwrap();
        v2.get("/users", list_users).operation_id("list-users-v2");
    }

    let ops = router.operations();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].template().as_str(), "/api/users");
    assert_eq!(ops[0].meta().operation_id, "list-users");
    assert_eq!(ops[0].meta().summary, "List users");
    assert_eq!(ops[0].meta().tags, vec!["users".to_string()]);
    assert_eq!(ops[1].template().as_str(), "/api/v2/users");
    assert_eq!(ops[1].meta().operation_id, "list-users-v2");

    assert_eq!(router.handle(Request::get("/api/v2/users")).status(), StatusCode::OK);
    assert_eq!(router.handle(Request::get("/users")).status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_invalid_group_prefixes() {
    let mut router = Router::new();
    for prefix in ["api", "/api/", "/api/{v}"] {
        let err = router.try_group(prefix).err().unwrap();
        assert!(matches!(err, ConfigError::InvalidPrefix { .. }), "{prefix}");
    }
}

#[test]
fn test_closure_has_no_operation_id() {
    let mut router = Router::new();
    let op = router.get("/x", || Done { data: json!(null) });
    assert!(op.meta().operation_id.is_empty());
}

#[derive(Deserialize, Params)]
#[params(url)]
struct Sku {
    #[param(format = "sku")]
    code: String,
}

#[test]
fn test_custom_format() {
    let mut router = Router::new();
    router.add_format("sku", |s| s.len() == 6 && s.starts_with("SK"));
    router.get("/sku", |p: Sku| Done { data: json!(p.code) });

    assert_eq!(router.handle(Request::get("/sku?code=SK1234")).status(), StatusCode::OK);
    assert_eq!(
        router.handle(Request::get("/sku?code=XX1234")).status(),
        StatusCode::BAD_REQUEST
    );
}
