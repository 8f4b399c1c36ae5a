//! Performance benchmarks for the data-preparation and forward-pass hot
//! paths.
//!
//! Run with: cargo bench --bench pipeline_benchmarks

use connectome_core::data::{embed_all, triangle_len};
use connectome_core::{AdamOptimizer, ConnectomeNet, NetworkConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};

fn bench_embedding(c: &mut Criterion) {
    let mut group = c.benchmark_group("embed_all");

    for &n_node in [90usize, 246].iter() {
        let features = Array2::from_shape_fn((32, triangle_len(n_node)), |(r, c)| {
            ((r * 31 + c) % 97) as f32 * 0.01
        });

        group.bench_with_input(BenchmarkId::from_parameter(n_node), &features, |b, f| {
            b.iter(|| black_box(embed_all(f, n_node).unwrap()));
        });
    }

    group.finish();
}

fn bench_forward_pass(c: &mut Criterion) {
    let n_node = 90;
    let config = NetworkConfig {
        conv1_filters: 100,
        conv2_filters: 200,
        fc1_units: 100,
        dropout: 0.4,
        num_classes: 2,
    };
    let mut net = ConnectomeNet::new(n_node, &config, 42);

    let features = Array2::from_shape_fn((20, triangle_len(n_node)), |(r, c)| {
        ((r * 13 + c) % 89) as f32 * 0.01
    });
    let matrices = embed_all(&features, n_node).unwrap();

    c.bench_function("forward_batch_20", |b| {
        b.iter(|| black_box(net.predict_proba(matrices.view())));
    });
}

fn bench_train_step(c: &mut Criterion) {
    let n_node = 90;
    let config = NetworkConfig {
        conv1_filters: 100,
        conv2_filters: 200,
        fc1_units: 100,
        dropout: 0.4,
        num_classes: 2,
    };
    let mut net = ConnectomeNet::new(n_node, &config, 42);
    let mut optimizer = AdamOptimizer::new(1e-4);

    let features = Array2::from_shape_fn((20, triangle_len(n_node)), |(r, c)| {
        ((r * 13 + c) % 89) as f32 * 0.01
    });
    let matrices = embed_all(&features, n_node).unwrap();
    let labels = Array1::from_iter((0..20).map(|i| (i % 2) as u8));

    c.bench_function("train_batch_20", |b| {
        b.iter(|| black_box(net.train_batch(matrices.view(), labels.view(), &mut optimizer)));
    });
}

criterion_group!(
    benches,
    bench_embedding,
    bench_forward_pass,
    bench_train_step
);
criterion_main!(benches);
