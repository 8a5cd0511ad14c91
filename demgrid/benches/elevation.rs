use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use demgrid::{BatchPoint, ElevationGrid, ElevationService, GridHeader};

/// Build a 1000x1000 service over [35,36]x[139,140] with a simple gradient.
fn create_service() -> ElevationService {
    let header = GridHeader {
        width: 1000,
        height: 1000,
        min_lat: 35.0,
        max_lat: 36.0,
        min_lon: 139.0,
        max_lon: 140.0,
        grid_size: 0.001,
    };
    let cells: Vec<i16> = (0..header.cell_count())
        .map(|i| ((i / 1000 + i % 1000) % 4000) as i16)
        .collect();
    let grid = ElevationGrid::from_cells(header, cells).unwrap();
    ElevationService::from_grid(grid)
}

fn bench_single_cold(c: &mut Criterion) {
    let service = create_service();
    let mut i = 0u64;

    // Walks through fresh keys so most lookups miss the cache
    c.bench_function("single_cold", |b| {
        b.iter(|| {
            i += 1;
            let lat = 35.0 + (i % 10_000) as f64 * 0.0001;
            let lon = 139.0 + (i / 10_000 % 10_000) as f64 * 0.0001;
            black_box(service.get_elevation(black_box(lat), black_box(lon)).unwrap());
        });
    });
}

fn bench_single_cached(c: &mut Criterion) {
    let service = create_service();

    // Warm the cache
    let _ = service.get_elevation(35.6812, 139.7671);

    c.bench_function("single_cached", |b| {
        b.iter(|| {
            black_box(
                service
                    .get_elevation(black_box(35.6812), black_box(139.7671))
                    .unwrap(),
            );
        });
    });
}

fn bench_batch(c: &mut Criterion) {
    let service = create_service();
    let points: Vec<BatchPoint> = (0..100)
        .map(|i| BatchPoint {
            lat: 35.0 + (i % 50) as f64 * 0.01,
            lon: 139.0 + (i % 50) as f64 * 0.01,
        })
        .collect();

    c.bench_function("batch_100", |b| {
        b.iter(|| {
            black_box(service.get_batch(black_box(&points)));
        });
    });
}

fn bench_parallel(c: &mut Criterion) {
    let service = Arc::new(create_service());
    let threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);

    c.bench_function("parallel_1000_per_thread", |b| {
        b.iter(|| {
            std::thread::scope(|scope| {
                for t in 0..threads {
                    let service = Arc::clone(&service);
                    scope.spawn(move || {
                        for i in 0..1000 {
                            let lat = 35.0 + (i % 100) as f64 * 0.01;
                            let lon = 139.0 + (t % 100) as f64 * 0.01;
                            black_box(service.get_elevation(lat, lon).unwrap());
                        }
                    });
                }
            });
        });
    });
}

criterion_group!(
    benches,
    bench_single_cold,
    bench_single_cached,
    bench_batch,
    bench_parallel
);
criterion_main!(benches);
