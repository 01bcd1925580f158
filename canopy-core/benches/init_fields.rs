use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

use canopy_core::component::Component;
use canopy_core::config::EngineConfig;
use canopy_core::fields::init_fields;
use canopy_core::meta::{ComponentMeta, ComponentParams, FieldSpec};
use canopy_core::reactive::Data;

/// A meta with `count` independent fields.
fn flat(count: usize) -> ComponentMeta {
    let mut meta = ComponentMeta::new("BFlat", ComponentParams::default());
    for i in 0..count {
        meta.insert_field(format!("f{i}"), FieldSpec::new().default_value(json!(i)));
    }
    meta
}

/// A meta where every field waits for the next one, declared in reverse.
fn chain(count: usize) -> ComponentMeta {
    let mut meta = ComponentMeta::new("BChain", ComponentParams::default());
    for i in 0..count {
        let spec = FieldSpec::new().init(move |cx| {
            let prev = cx.get(&format!("f{}", i + 1)).and_then(|v| v.as_u64()).unwrap_or(0);
            Some(json!(prev + 1))
        });
        let spec = if i + 1 < count { spec.after([format!("f{}", i + 1)]) } else { spec };
        meta.insert_field(format!("f{i}"), spec);
    }
    meta
}

fn bench_init(c: &mut Criterion, name: &str, build: fn(usize) -> ComponentMeta) {
    let mut group = c.benchmark_group(name);

    for size in [8, 64, 256] {
        let meta = Arc::new(build(size));
        let ctx = Component::new(&meta, Arc::new(EngineConfig::default()));

        group.bench_with_input(BenchmarkId::from_parameter(size), &ctx, |b, ctx| {
            b.iter(|| {
                let fields = ctx.meta().fields();
                init_fields(black_box(&fields), ctx, ctx.instance(), Data::new()).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_flat(c: &mut Criterion) {
    bench_init(c, "init_fields_flat", flat);
}

fn bench_chain(c: &mut Criterion) {
    bench_init(c, "init_fields_chain", chain);
}

criterion_group!(benches, bench_flat, bench_chain);
criterion_main!(benches);
