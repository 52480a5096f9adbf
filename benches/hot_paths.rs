use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fluxmap::canvas::PixelCanvas;
use fluxmap::color::{Domain, SequentialScale};
use fluxmap::grid::Grid;
use fluxmap::map::heightfield::HeightField;
use fluxmap::map::projection::{Projector, NATIVE_HEIGHT, NATIVE_WIDTH};
use fluxmap::map::raster::paint_flux;

fn bytes(vals: &[f32]) -> Vec<u8> {
    vals.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// 1-degree synthetic grid with a deterministic mix of valid and no-data
/// cells, roughly matching real land/ocean coverage.
fn synthetic_grid() -> Grid {
    let lats: Vec<f32> = (0..180).map(|i| -89.5 + i as f32).collect();
    let lons: Vec<f32> = (0..360).map(|j| -179.5 + j as f32).collect();
    let values: Vec<f32> = (0..180 * 360)
        .map(|i| {
            if i % 3 == 0 {
                -99.0
            } else {
                -12.0 + (i % 97) as f32 * 0.1
            }
        })
        .collect();
    Grid::from_payloads(&bytes(&lats), &bytes(&lons), &bytes(&values)).unwrap()
}

fn bench_paint_flux(c: &mut Criterion) {
    let grid = synthetic_grid();
    let scale = SequentialScale::new(Domain::from_values(grid.values()).unwrap());
    let projector = Projector::fitted(NATIVE_WIDTH, NATIVE_HEIGHT);
    let mut surface = PixelCanvas::new(NATIVE_WIDTH, NATIVE_HEIGHT);

    c.bench_function("paint_flux_1deg", |b| {
        b.iter(|| {
            let stats = paint_flux(black_box(&mut surface), &grid, &scale, &projector);
            black_box(stats)
        })
    });
}

fn bench_height_field(c: &mut Criterion) {
    let grid = synthetic_grid();
    let scale = SequentialScale::new(Domain::from_values(grid.values()).unwrap());

    c.bench_function("height_field_stride2", |b| {
        b.iter(|| black_box(HeightField::build(&grid, &scale, 2).unwrap()))
    });
}

criterion_group!(benches, bench_paint_flux, bench_height_field);
criterion_main!(benches);
