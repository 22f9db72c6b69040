use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use serde::Deserialize;
use typeroute::response::status::StatusOk;
use typeroute::router::PathTemplate;
use typeroute::{Params, Request, Response, Router};

#[derive(Deserialize, Params)]
#[params(url)]
struct AnimalToy {
    id: u64,
    toy_id: u64,
    #[param(default = "10", maximum = 100)]
    limit: u32,
    tag: Vec<String>,
}

#[derive(Response)]
#[response(status = StatusOk)]
struct Toy {
    data: u64,
    meta: u32,
}

fn animal_toy(p: AnimalToy) -> Toy {
    Toy {
        data: p.id + p.toy_id + p.tag.len() as u64,
        meta: p.limit,
    }
}

fn noop() -> Toy {
    Toy { data: 0, meta: 0 }
}

fn zoo_router() -> Router {
    let mut router = Router::new();
    for path in [
        "/",
        "/zoo/animals",
        "/zoo/animals/{id}",
        "/zoo/{category}/animals/{id}/habitats/{habitat-id}",
        "/zoo/keepers/{keeper-id}/shifts",
    ] {
        router.get(path, noop);
    }
    router.get("/zoo/animals/{id}/toys/{toy-id}", animal_toy);
    router
}

fn bench_template_match(c: &mut Criterion) {
    let template = PathTemplate::compile("/zoo/{category}/animals/{id}/habitats/{habitat-id}")
        .unwrap_or_else(|e| panic!("{e}"));
    c.bench_function("template_match", |b| {
        b.iter(|| template.matches(black_box("/zoo/mammals/animals/42/habitats/7")))
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let router = zoo_router();
    c.bench_function("dispatch_bound", |b| {
        b.iter(|| {
            router.handle(black_box(Request::get(
                "/zoo/animals/42/toys/7?tag=ball&tag=rope&limit=5",
            )))
        })
    });
    c.bench_function("dispatch_not_found", |b| {
        b.iter(|| router.handle(black_box(Request::get("/aquarium/fish"))))
    });
}

criterion_group!(benches, bench_template_match, bench_dispatch);
criterion_main!(benches);
