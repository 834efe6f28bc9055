use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use glam::DVec2;
use sqt_cubesphere::Face;
use sqt_lod::*;
use sqt_mesh::NullSink;
use sqt_terrain::{BuildError, BuildRequest, BuildResult, CancelToken, MeshBuilder};

/// Accepts every request and never finishes one.
struct DiscardBuilder;

impl MeshBuilder for DiscardBuilder {
    fn submit(&self, _request: BuildRequest) -> Result<CancelToken, BuildError> {
        Ok(CancelToken::new())
    }

    fn cancel(&self, _key: u64) {}

    fn drain_results(&self) -> Vec<BuildResult> {
        Vec::new()
    }

    fn in_flight_count(&self) -> u64 {
        0
    }
}

fn context(max_depth: u8) -> Context {
    Context::new(Constants {
        max_depth,
        resolution: 9,
        desired_screen_space_length: 10.0,
    })
    .expect("valid constants")
}

fn bench_cold_reconcile(c: &mut Criterion) {
    let ctx = context(12);
    let builder = DiscardBuilder;
    let data = ReconciliationData {
        face: Face::Forward,
        desired_length: ctx.depth(12).approximate_size,
        point_in_plane: DVec2::new(0.71, -0.33),
    };

    c.bench_function("reconcile_cold_depth12", |bencher| {
        bencher.iter_batched(
            || QuadTree::new(ctx.max_depth()),
            |mut tree| {
                let mut sink = NullSink;
                let mut reconciler = Reconciler::new(&ctx, &mut tree, &builder, &mut sink);
                black_box(reconciler.reconcile(black_box(&data)))
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_steady_reconcile(c: &mut Criterion) {
    let ctx = context(12);
    let builder = DiscardBuilder;
    let mut tree = QuadTree::new(ctx.max_depth());
    let mut sink = NullSink;
    let data = ReconciliationData {
        face: Face::Up,
        desired_length: ctx.depth(12).approximate_size,
        point_in_plane: DVec2::new(-0.2, 0.45),
    };
    Reconciler::new(&ctx, &mut tree, &builder, &mut sink).reconcile(&data);

    c.bench_function("reconcile_steady_depth12", |bencher| {
        bencher.iter(|| {
            let mut reconciler = Reconciler::new(&ctx, &mut tree, &builder, &mut sink);
            black_box(reconciler.reconcile(black_box(&data)))
        })
    });
}

criterion_group!(benches, bench_cold_reconcile, bench_steady_reconcile);
criterion_main!(benches);
