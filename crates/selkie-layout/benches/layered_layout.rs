use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use selkie_graph::{Direction, Edge, Graph};
use selkie_layout::{DeterministicTextMeasurer, LayoutOptions, layout};
use std::hint::black_box;
use std::time::Duration;

/// A spine plus forward fan-out edges and a few cycle-closing edges.
fn build_graph(node_count: usize, fanout: usize) -> Graph {
    let ids: Vec<String> = (0..node_count).map(|i| format!("n{i}")).collect();
    let mut g = Graph::new(Direction::TB);
    for pair in ids.windows(2) {
        g.add_edge(Edge::new(pair[0].as_str(), pair[1].as_str()));
    }
    for i in 0..node_count {
        for k in 2..fanout + 2 {
            let j = i + k * 3;
            if j < node_count {
                g.add_edge(Edge::new(ids[i].as_str(), ids[j].as_str()));
            }
        }
        if i % 17 == 16 {
            g.add_edge(Edge::new(ids[i].as_str(), ids[i - 10].as_str()));
        }
    }
    g
}

fn bench_layered_layout(c: &mut Criterion) {
    let measurer = DeterministicTextMeasurer::default();
    let options = LayoutOptions::default();

    let mut group = c.benchmark_group("layered_layout");
    group.measurement_time(Duration::from_secs(5));
    for (node_count, fanout) in [(50usize, 2usize), (200, 2), (500, 3)] {
        let g = build_graph(node_count, fanout);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{node_count}x{fanout}")),
            &g,
            |b, g| {
                b.iter_batched(
                    || g.clone(),
                    |mut g| {
                        let extent = layout(&mut g, &measurer, &options).ok();
                        black_box((g, extent))
                    },
                    BatchSize::SmallInput,
                )
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_layered_layout);
criterion_main!(benches);
