//! Criterion benchmarks for the fill and stroke pipelines: a spiky star
//! polygon and a stroked, dashed cubic wave, both rendered through a
//! reused context so the steady-state (allocation-free) path is what gets
//! measured.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sable::basics::{Bounds, PathElement, WindingRule};
use sable::config::Settings;
use sable::context::RendererContext;
use sable::engine::{rasterize_fill, rasterize_stroke, DashParams};
use sable::stroker::{Cap, Join, StrokeParams};

fn star(cx: f32, cy: f32, r_out: f32, r_in: f32, points: usize) -> Vec<PathElement> {
    let mut path = Vec::with_capacity(points * 2 + 2);
    for i in 0..points * 2 {
        let r = if i % 2 == 0 { r_out } else { r_in };
        let a = std::f32::consts::PI * i as f32 / points as f32;
        let x = cx + r * a.cos();
        let y = cy + r * a.sin();
        path.push(if i == 0 {
            PathElement::MoveTo { x, y }
        } else {
            PathElement::LineTo { x, y }
        });
    }
    path.push(PathElement::ClosePath);
    path
}

fn wave(width: f32, amplitude: f32, cycles: usize) -> Vec<PathElement> {
    let mut path = vec![PathElement::MoveTo {
        x: 0.0,
        y: amplitude,
    }];
    let step = width / cycles as f32;
    for i in 0..cycles {
        let x0 = i as f32 * step;
        path.push(PathElement::CurveTo {
            c1x: x0 + step * 0.33,
            c1y: 0.0,
            c2x: x0 + step * 0.66,
            c2y: 2.0 * amplitude,
            x: x0 + step,
            y: amplitude,
        });
    }
    path
}

fn bench_fill(c: &mut Criterion) {
    let mut ctx = RendererContext::new(Settings::default());
    let path = star(128.0, 128.0, 120.0, 50.0, 24);
    c.bench_function("fill_star_256", |b| {
        b.iter(|| {
            let mask = rasterize_fill(
                &mut ctx,
                path.iter().copied(),
                None,
                WindingRule::NonZero,
                Bounds::new(0, 0, 256, 256),
            );
            black_box(mask)
        })
    });
}

fn bench_stroke(c: &mut Criterion) {
    let mut ctx = RendererContext::new(Settings::default());
    let path = wave(256.0, 40.0, 8);
    let stroke = StrokeParams::new(5.0, Cap::Round, Join::Round, 4.0).unwrap();
    c.bench_function("stroke_wave_256", |b| {
        b.iter(|| {
            let mask = rasterize_stroke(
                &mut ctx,
                path.iter().copied(),
                None,
                &stroke,
                None,
                Bounds::new(0, 0, 256, 96),
            );
            black_box(mask)
        })
    });
}

fn bench_dashed_stroke(c: &mut Criterion) {
    let mut ctx = RendererContext::new(Settings::default());
    let path = wave(256.0, 40.0, 8);
    let stroke = StrokeParams::new(3.0, Cap::Butt, Join::Bevel, 4.0).unwrap();
    c.bench_function("dashed_stroke_wave_256", |b| {
        b.iter(|| {
            let mask = rasterize_stroke(
                &mut ctx,
                path.iter().copied(),
                None,
                &stroke,
                Some(DashParams {
                    dash: &[9.0, 4.0],
                    phase: 0.0,
                }),
                Bounds::new(0, 0, 256, 96),
            );
            black_box(mask)
        })
    });
}

criterion_group!(benches, bench_fill, bench_stroke, bench_dashed_stroke);
criterion_main!(benches);
