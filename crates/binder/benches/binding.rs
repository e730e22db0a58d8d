// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Binding performance benchmarks
//!
//! Measures a full boot over domains of growing size.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ormbind_binder::MetadataBuilder;
use ormbind_source::StaticAnnotationSource;
use ormbind_test_utils::MappingFixtures;

fn bench_order_domain(c: &mut Criterion) {
    let source = MappingFixtures::order_domain();

    c.bench_function("binding/order_domain", |b| {
        b.iter(|| {
            let metadata = MetadataBuilder::new(&source).build();
            black_box(metadata.is_ok());
        });
    });
}

fn bench_wide_hierarchy(c: &mut Criterion) {
    let mut group = c.benchmark_group("binding/wide_hierarchy");
    for subclasses in [10usize, 100, 500] {
        let source = MappingFixtures::wide_hierarchy(subclasses);
        group.bench_with_input(BenchmarkId::from_parameter(subclasses), &source, |b, source| {
            b.iter(|| {
                let metadata = MetadataBuilder::new(source).build();
                black_box(metadata.is_ok());
            });
        });
    }
    group.finish();
}

fn bench_yaml_load(c: &mut Criterion) {
    c.bench_function("binding/yaml_load", |b| {
        b.iter(|| {
            let source = StaticAnnotationSource::from_yaml_str(MappingFixtures::order_domain_yaml());
            black_box(source.is_ok());
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = bench_order_domain, bench_wide_hierarchy, bench_yaml_load
);

criterion_main!(benches);
