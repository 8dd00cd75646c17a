//! Benchmarks for spec-to-descriptor translation
//!
//! This benchmark measures:
//! - GET query merging for structured and raw params
//! - JSON body serialization
//! - Form field flattening
//! - Registry validation overhead for a full batch

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use multi_http_batch::registry::TaskRegistry;
use multi_http_batch::request::RequestBuilder;
use multi_http_batch::RequestSpec;

fn create_get_fields() -> RequestSpec {
    RequestSpec::get("http://trade.local/internal_service/get_trade_list?no_check=1").with_params(
        serde_json::json!({
            "type": 6,
            "seller_uid": 97947,
            "collection_id": 7,
            "tags": ["new", "paid"],
        }),
    )
}

fn create_get_raw() -> RequestSpec {
    RequestSpec::get("http://trade.local/internal_service/get_trade_list")
        .with_params("no_check=1&type=6&seller_uid=97947&collection_id=7")
}

fn create_json_post() -> RequestSpec {
    let items: Vec<_> = (0..20)
        .map(|i| serde_json::json!({"sku": format!("sku-{}", i), "path": "/catalog/items", "qty": i}))
        .collect();
    RequestSpec::post("http://order.local/trade/get_order_list")
        .with_params(serde_json::json!({"seller_uid": 97947, "start": 100, "items": items}))
        .json()
        .header("X-Trace: bench")
}

fn create_form_post() -> RequestSpec {
    RequestSpec::post("http://order.local/upload")
        .with_params(serde_json::json!({
            "seller_uid": 97947,
            "filter": {"status": "open", "archived": false},
            "ids": [1, 2, 3, 4, 5],
        }))
        .form()
}

fn bench_build(c: &mut Criterion) {
    let builder = RequestBuilder::new();
    let mut group = c.benchmark_group("request_building");

    for (name, spec) in [
        ("get_fields", create_get_fields()),
        ("get_raw", create_get_raw()),
        ("post_json", create_json_post()),
        ("post_form", create_form_post()),
    ] {
        group.bench_with_input(BenchmarkId::new("build", name), &spec, |b, spec| {
            b.iter(|| builder.build(black_box(spec)).unwrap())
        });
    }

    group.finish();
}

fn bench_registry_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_add");

    for size in [10usize, 100] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("unnamed", size), &size, |b, &size| {
            b.iter(|| {
                let mut reg = TaskRegistry::new();
                for _ in 0..size {
                    reg.add(create_json_post(), None).unwrap();
                }
                black_box(reg.len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_registry_add);
criterion_main!(benches);
