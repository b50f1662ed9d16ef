//! Benchmarks for octree marches over a few sampler mixes

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use isocrate_core::{MaterialState, Point3f, TriangleBuffer, Vector3f, Vector4f};
use isocrate_samplers::{Halfspace, Heightmap, Sphere};
use isocrate_volume::{MainThreadQueue, OctreeVolume, ThreadPool, ThreadPoolConfig, VolumeConfig};
use std::sync::Arc;

fn create_volume(pool: &Arc<ThreadPool>, size: i32) -> OctreeVolume<TriangleBuffer> {
    let consumers = (0..pool.size()).map(|_| TriangleBuffer::new()).collect();
    OctreeVolume::new(
        VolumeConfig::new(size, 4),
        pool.clone(),
        Arc::new(MainThreadQueue::new()),
        consumers,
    )
    .unwrap()
}

fn bench_sphere(c: &mut Criterion) {
    let pool = Arc::new(ThreadPool::new(ThreadPoolConfig::default()).unwrap());
    let material = MaterialState::new(Vector4f::new(0.7, 0.7, 0.7, 1.0));
    let mut group = c.benchmark_group("sphere");

    for &size in &[32, 64, 128] {
        let mut volume = create_volume(&pool, size);
        let center = size as f32 * 0.5;
        volume.add(Sphere::additive(Point3f::new(center, center, center), center * 0.6, material));
        volume.add(Sphere::subtractive(Point3f::new(center, center * 1.4, center), center * 0.3));

        group.bench_with_input(BenchmarkId::new("march", size), &size, |b, _| {
            b.iter(|| black_box(volume.march(None).unwrap()));
        });
    }
    group.finish();
}

fn bench_terrain(c: &mut Criterion) {
    let pool = Arc::new(ThreadPool::new(ThreadPoolConfig::default()).unwrap());
    let material = MaterialState::new(Vector4f::new(0.3, 0.6, 0.2, 1.0));
    let mut volume = create_volume(&pool, 64);
    volume.add(
        Heightmap::from_fn(Point3f::new(1.0, 1.0, 1.0), 2.0, 32, 32, material, |x, z| {
            8.0 + 6.0 * ((x as f32 * 0.4).sin() * (z as f32 * 0.3).cos())
        })
        .unwrap(),
    );
    volume.add(Halfspace::subtractive(Point3f::new(0.0, 0.0, 40.0), Vector3f::new(0.2, 0.0, -1.0)));

    c.bench_function("terrain_march", |b| {
        b.iter(|| black_box(volume.march(None).unwrap()));
    });
}

criterion_group!(benches, bench_sphere, bench_terrain);
criterion_main!(benches);
