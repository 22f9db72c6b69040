//! Tests for [`Router::describe`].

use http::Method;
use serde::Deserialize;
use serde_json::json;
use typeroute::response::status::{StatusNotFound, StatusOk};
use typeroute::{ApiError, OneOf, Params, Request, Response, ResponseWriter, Router};

#[derive(Deserialize, Params)]
#[params(url)]
struct ListPosts {
    id: i64,
    /// Full-text filter.
    #[param(default = r#""all""#, example = r#""rust""#)]
    keyword: String,
    tag: Vec<String>,
}

#[derive(Deserialize, Params)]
#[params(header)]
struct Tracing {
    x_request_id: Option<String>,
}

#[derive(Deserialize, Params)]
#[params(body)]
struct Filter {
    since: Option<String>,
}

#[derive(Response)]
#[response(status = StatusOk)]
struct Posts {
    data: Vec<String>,
    meta: u32,
}

fn list_posts(_: ListPosts, _: Tracing, _: Filter) -> Posts {
    Posts {
        data: Vec::new(),
        meta: 0,
    }
}

struct PostReply;

#[derive(Response)]
#[response(status = StatusOk)]
struct Post {
    data: String,
}

#[derive(Response)]
#[response(status = StatusNotFound)]
struct NoPost {
    error: ApiError,
}

fn get_post() -> OneOf<PostReply> {
    OneOf::new(Post { data: String::new() })
}

#[test]
fn test_describe_params_and_body() {
    let mut router = Router::new();
    router
        .post("/users/{id}/posts", list_posts)
        .summary("Search posts")
        .tag("posts");

    let docs = router.describe();
    assert_eq!(docs.len(), 1);
    let doc = &docs[0];
    assert_eq!(doc.method, "POST");
    assert_eq!(doc.path, "/users/{id}/posts");
    assert_eq!(doc.operation_id, "list-posts");
    assert!(!doc.raw);

    let names: Vec<(&str, &str, bool)> = doc
        .params
        .iter()
        .map(|p| (p.name.as_str(), p.location, p.required))
        .collect();
    assert_eq!(
        names,
        vec![
            ("id", "path", true),
            ("keyword", "query", false),
            ("tag", "query", false),
            ("x-request-id", "header", false),
        ]
    );

    let keyword = &doc.params[1];
    assert_eq!(keyword.default, Some(json!("all")));
    assert_eq!(keyword.example, Some(json!("rust")));
    assert_eq!(keyword.description.as_deref(), Some("Full-text filter."));
    assert!(doc.params[2].repeated);

    let body = doc.body.as_ref().unwrap();
    assert_eq!(body.type_name, "Filter");
    assert_eq!(body.schema["type"], "object");
    assert_eq!(body.schema["required"], json!([]));

    assert_eq!(doc.responses.len(), 1);
    assert_eq!(doc.responses[0].status, 200);
    assert!(doc.responses[0].data && doc.responses[0].meta);

    let value = serde_json::to_value(doc).unwrap();
    assert_eq!(value["params"][0]["in"], "path");
    assert_eq!(value["tags"], json!(["posts"]));
    assert!(value.get("security").is_none());
}

#[test]
fn test_describe_variants_and_raw() {
    let mut router = Router::new();
    router
        .variant::<PostReply, Post>()
        .variant::<PostReply, NoPost>();
    router.get("/posts/latest", get_post);
    router.raw(Method::GET, "/health", |_: &Request, w: &mut dyn ResponseWriter| {
        w.write_head(http::StatusCode::OK);
    });

    let docs = router.describe();
    let statuses: Vec<u16> = docs[0].responses.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![200, 404]);
    assert!(docs[0].responses[1].error);

    assert!(docs[1].raw);
    assert!(docs[1].params.is_empty());
    assert!(docs[1].responses.is_empty());
}
