//! Resolution throughput for a typical customer pair.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fieldsync_resolve::{Resolver, SyncContext};
use fieldsync_schema::{MetadataRegistry, TargetTree};
use fieldsync_types::Record;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const FIELDS: usize = 40;

fn resolver() -> Resolver {
    let targets = Arc::new(TargetTree::from_value(&json!({ "api": null })).unwrap());
    let mut handles = Map::new();
    for i in 0..FIELDS {
        let comparison = ["default", "phone", "url", "markup"][i % 4];
        handles.insert(
            format!("field{i}"),
            json!({ "path": format!("f{i}"), "sync": "normal", "comparison": comparison }),
        );
    }
    let registry = MetadataRegistry::from_value("customer", targets, &Value::Object(handles)).unwrap();
    let ctx = SyncContext {
        master_target: Some("api".into()),
        slave_target: Some("api".into()),
        ..SyncContext::default()
    };
    Resolver::new(Arc::new(registry), ctx).unwrap()
}

fn records(differ_every: usize) -> (Record, Record) {
    let mut master = Map::new();
    let mut slave = Map::new();
    master.insert("modtime".into(), json!("2024-01-03T00:00:00Z"));
    slave.insert("modtime".into(), json!("2024-01-02T00:00:00Z"));
    for i in 0..FIELDS {
        master.insert(format!("field{i}"), json!(format!("Value {i}")));
        let theirs = if i % differ_every == 0 {
            format!("Other {i}")
        } else {
            format!("value  {i}")
        };
        slave.insert(format!("field{i}"), json!(theirs));
    }
    (master, slave)
}

fn bench_resolve(c: &mut Criterion) {
    let resolver = resolver();

    let (master, slave) = records(FIELDS + 1);
    c.bench_function("resolve_similar_pair", |b| {
        b.iter(|| {
            let update = resolver
                .resolve(black_box(master.clone()), black_box(slave.clone()), None)
                .unwrap();
            black_box(update.passes().len())
        })
    });

    let (master, slave) = records(3);
    c.bench_function("resolve_and_patch", |b| {
        b.iter(|| {
            let update = resolver
                .resolve(black_box(master.clone()), black_box(slave.clone()), None)
                .unwrap();
            black_box(update.get_slave_patch().unwrap())
        })
    });
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
