use criterion::{Criterion, black_box, criterion_group, criterion_main};
use glam::DVec2;
use sqt_cubesphere::Face;
use sqt_mesh::*;

fn bench_build_tables(c: &mut Criterion) {
    for resolution in [5u32, 13, 33] {
        c.bench_function(&format!("triangulation_tables_r{resolution}"), |bencher| {
            bencher.iter(|| black_box(TriangulationTables::new(black_box(resolution))))
        });
    }
}

fn bench_generate_grid(c: &mut Criterion) {
    c.bench_function("grid_generate_r13", |bencher| {
        bencher.iter(|| {
            black_box(GridBuffers::generate(
                Face::Forward,
                black_box(DVec2::new(0.25, -0.75)),
                0.125,
                13,
            ))
        })
    });
}

fn bench_interleave(c: &mut Criterion) {
    let grid = GridBuffers::generate(Face::Up, DVec2::ZERO, 1.0, 33);
    c.bench_function("grid_interleave_r33", |bencher| {
        bencher.iter(|| black_box(grid.vertices()))
    });
}

criterion_group!(
    benches,
    bench_build_tables,
    bench_generate_grid,
    bench_interleave
);
criterion_main!(benches);
