use criterion::{black_box, criterion_group, criterion_main, Criterion};
use geo::{LineString, MultiPolygon, Polygon};
use season_map::config::Config;
use season_map::context::RenderContext;
use season_map::data::{Dataset, GeoFeature, SeasonalMetricRow};
use season_map::join::join;
use season_map::map::{MapRenderer, Viewport};
use season_map::season::{Season, Target};
use std::f64::consts::TAU;
use std::sync::Arc;

/// A 10x5 grid of 64-vertex "states" covering the 960x600 frame
fn synthetic_dataset() -> Dataset {
    let mut features = Vec::new();
    let mut rows = Vec::new();
    for i in 0..50 {
        let (cx, cy) = (48.0 + (i % 10) as f64 * 90.0, 60.0 + (i / 10) as f64 * 110.0);
        let ring: LineString<f64> = (0..=64)
            .map(|j| {
                let a = j as f64 / 64.0 * TAU;
                (cx + 40.0 * a.cos(), cy + 50.0 * a.sin())
            })
            .collect();
        let name = format!("State {i}");
        features.push(GeoFeature {
            id: Some(i.to_string()),
            name: name.clone(),
            geometry: MultiPolygon::new(vec![Polygon::new(ring, vec![])]),
        });
        let fields = Season::ALL
            .iter()
            .map(|s| (s.field().to_string(), format!("{:.4}", 0.001 * (i + 1) as f64)))
            .collect();
        rows.push(SeasonalMetricRow {
            state: name,
            abbreviation: format!("S{i}"),
            fields,
        });
    }
    Dataset { features, rows }
}

fn bench_join(c: &mut Criterion) {
    let dataset = synthetic_dataset();
    c.bench_function("join_50_states", |b| {
        b.iter(|| join(black_box(&dataset.features), black_box(&dataset.rows), "spring_rate"))
    });
}

fn bench_render(c: &mut Criterion) {
    let config = Config::default();
    let palette = config.map.palette().expect("default palette");
    let dataset = Arc::new(synthetic_dataset());
    let context = RenderContext::build(dataset, Target::season(Season::Spring), &config, palette);
    let renderer = MapRenderer::new();
    let (cols, rows) = (200, 60);
    let viewport = Viewport::new(&config.map, cols * 2, rows * 4);

    c.bench_function("render_200x60", |b| {
        b.iter(|| renderer.render(black_box(&context), black_box(&viewport), cols, rows, true))
    });

    let mut zoomed = viewport.clone();
    zoomed.zoom_at(200.0, 120.0, 4.0);
    c.bench_function("render_200x60_zoomed", |b| {
        b.iter(|| renderer.render(black_box(&context), black_box(&zoomed), cols, rows, false))
    });
}

criterion_group!(benches, bench_join, bench_render);
criterion_main!(benches);
