use cfgview::config::Config;
use cfgview::ir::Graph;
use cfgview::parser::parse_graph;
use cfgview::provider::{DebugContentProvider, EmptyContentProvider, sample_graph};
use cfgview::render::{GraphRenderer, render_svg};
use cfgview::surface::{MonospaceMeasurer, RecordingSurface};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

/// Ladder of diamonds with a switch every `switch_every` levels and a latch back to the top.
fn ladder_source(levels: usize, switch_every: usize) -> String {
    let mut out = String::from("{\n  vertices: [\n");
    let mut edges = Vec::new();
    let mut next = 1usize;
    let mut head = 0usize;
    out.push_str("    { id: 0, lines: [[\"entry\"]] },\n");
    for level in 0..levels {
        let fan = if switch_every > 0 && level % switch_every == switch_every - 1 {
            5
        } else {
            2
        };
        let join = next + fan;
        for arm in 0..fan {
            let id = next + arm;
            out.push_str(&format!(
                "    {{ id: {id}, lines: [[\"mov\", \" r{arm}, r{level}\"], [\"add\", \" r{arm}, {level}\"]] }},\n"
            ));
            edges.push((head, id));
            edges.push((id, join));
        }
        out.push_str(&format!("    {{ id: {join}, lines: [[\"cmp\", \" r0, {level}\"]] }},\n"));
        head = join;
        next = join + 1;
    }
    edges.push((head, 1));
    out.push_str("  ],\n  edges: [\n");
    for (source, target) in edges {
        out.push_str(&format!("    {{ source: {source}, target: {target} }},\n"));
    }
    out.push_str("  ],\n}\n");
    out
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.render.fast_text = true;
    config
}

fn graph_for(size: usize) -> Graph {
    parse_graph(&ladder_source(size, 3), Box::new(EmptyContentProvider)).expect("parse failed")
}

const SIZES: [usize; 4] = [4, 16, 64, 128];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for size in SIZES {
        let source = ladder_source(size, 3);
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, data| {
            b.iter(|| {
                let graph = parse_graph(black_box(data), Box::new(EmptyContentProvider))
                    .expect("parse failed");
                black_box(graph.vertex_count());
            });
        });
    }
    group.finish();
}

fn bench_preprocess(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocess");
    let config = fast_config();
    let measurer = MonospaceMeasurer::default();
    for size in SIZES {
        let mut graph = graph_for(size);
        group.bench_function(BenchmarkId::from_parameter(size), |b| {
            b.iter(|| {
                let mut renderer = GraphRenderer::new(&config);
                renderer.preprocess(&measurer, black_box(&mut graph));
                black_box(renderer.edge_routes().len());
            });
        });
    }
    group.finish();
}

fn bench_paint(c: &mut Criterion) {
    let mut group = c.benchmark_group("paint");
    let config = fast_config();
    let measurer = MonospaceMeasurer::default();
    for size in SIZES {
        let mut graph = graph_for(size);
        let mut renderer = GraphRenderer::new(&config);
        renderer.preprocess(&measurer, &mut graph);
        group.bench_with_input(BenchmarkId::from_parameter(size), &graph, |b, data| {
            b.iter(|| {
                let mut surface = RecordingSurface::new(1200.0, 800.0);
                renderer.render(&mut surface, black_box(data), 1.0);
                black_box(surface.commands().len());
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let config = fast_config();
    group.bench_function("sample", |b| {
        b.iter(|| {
            let mut graph = sample_graph(Box::new(DebugContentProvider::new(7)));
            let svg = render_svg(&mut graph, &config, None);
            black_box(svg.len());
        });
    });
    for size in [16usize, 64] {
        let source = ladder_source(size, 3);
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, data| {
            b.iter(|| {
                let mut graph =
                    parse_graph(black_box(data), Box::new(EmptyContentProvider)).expect("parse failed");
                let svg = render_svg(&mut graph, &config, None);
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_parse, bench_preprocess, bench_paint, bench_end_to_end
);
criterion_main!(benches);
