//! Tests for handlers returning one of several response shapes.
//!
//! # Test Coverage
//!
//! - Dispatch resolves each registered variant to its own status and envelope
//! - An unregistered variant is a programming error (panic, `500` under recovery)
//! - Invalid shapes are rejected when registered as variants
//! - The variant set lists members per capability

use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use typeroute::response::status::{StatusAccepted, StatusNotFound, StatusOk};
use typeroute::{ApiError, ConfigError, OneOf, Params, Request, Response, Router};

/// Capability marker for `GET /pets/{id}`.
struct PetReply;

#[derive(Response)]
#[response(status = StatusOk)]
struct Found {
    data: String,
}

#[derive(Response)]
#[response(status = StatusNotFound)]
struct Missing {
    error: ApiError,
}

#[derive(Response)]
#[response(status = StatusAccepted)]
struct Pending {
    #[response(direct)]
    data: u32,
}

#[derive(Deserialize, Params)]
#[params(url)]
struct PetId {
    id: u32,
}

fn get_pet(p: PetId) -> OneOf<PetReply> {
    match p.id {
        1 => OneOf::new(Found { data: "rex".into() }),
        2 => OneOf::new(Pending { data: 2 }),
        _ => OneOf::new(Missing {
            error: ApiError::with_code("pet-not-found"),
        }),
    }
}

#[test]
fn test_each_variant_keeps_its_shape() {
    let mut router = Router::new();
    router.variant::<PetReply, Found>().variant::<PetReply, Missing>();
    router.variant::<PetReply, Pending>();
    router.get("/pets/{id}", get_pet);

    let res = router.handle(Request::get("/pets/1"));
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body_json().unwrap(), json!({"data": "rex"}));

    let res = router.handle(Request::get("/pets/2"));
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    assert_eq!(res.body_json().unwrap(), json!(2));

    let res = router.handle(Request::get("/pets/9"));
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        res.body_json().unwrap(),
        json!({"error": {"code": "pet-not-found"}})
    );
}

#[test]
fn test_unregistered_variant_is_500_under_recovery() {
    let mut router = Router::new();
    router.variant::<PetReply, Found>();
    router.get("/pets/{id}", get_pet);

    let res = router.handle(Request::get("/pets/9"));
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = res.body_json().unwrap()["error"]["message"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.contains("Missing"), "{message}");
    assert!(message.contains("PetReply"), "{message}");

    let res = router.handle(Request::get("/pets/1"));
    assert_eq!(res.status(), StatusCode::OK);
}

#[test]
#[should_panic(expected = "is not a registered variant of")]
fn test_unregistered_variant_panics_in_dispatch() {
    let mut router = Router::new();
    router.get("/pets/{id}", get_pet);
    let mut res = typeroute::BufferedResponse::new();
    router.dispatch(&Request::get("/pets/1"), &mut res);
}

#[derive(Response)]
#[response(status = StatusOk)]
struct Broken {
    data: String,
    error: ApiError,
}

#[test]
fn test_invalid_variant_shape_is_rejected() {
    let mut router = Router::new();
    let err = router.try_variant::<PetReply, Broken>().unwrap_err();
    assert!(matches!(err, ConfigError::DataWithError { .. }));
    assert!(router.variants().members::<PetReply>().is_empty());
}

#[test]
fn test_members_are_listed_once() {
    let mut router = Router::new();
    router
        .variant::<PetReply, Found>()
        .variant::<PetReply, Missing>()
        .variant::<PetReply, Found>();
    let members = router.variants().members::<PetReply>();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].status(), 200);
    assert_eq!(members[1].status(), 404);
    assert!(router.variants().members::<PetId>().is_empty());
}
