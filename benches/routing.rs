use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use flowgram::{Diagram, EdgeSpec, FixedMetrics, FlowConfig, Theme, compute_layout};
use std::hint::black_box;

/// A dense grid of tiers with chained and skipping edges — the shape that
/// stresses face spreading and tier spacing the most.
fn dense_diagram(tiers: usize, per_tier: usize) -> Diagram {
    let mut diagram = Diagram::new();
    for tier in 0..tiers {
        for slot in 0..per_tier {
            let id = format!("n{tier}_{slot}");
            diagram.node(
                &id,
                format!("Stage {tier}\nUnit {slot}"),
                slot as f32 * 4.0,
                tier as f32 * 1.5,
                "#f5f5f5",
                "#323034",
            );
        }
    }
    for tier in 0..tiers.saturating_sub(1) {
        for slot in 0..per_tier {
            let src = format!("n{tier}_{slot}");
            let dst = format!("n{}_{}", tier + 1, slot);
            diagram.edge(EdgeSpec::new(&src, dst).label("flow"));
            // fan every tier head into the next tier for shared-face load
            let head = format!("n{}_0", tier + 1);
            if slot > 0 {
                diagram.edge(EdgeSpec::new(src, head));
            }
        }
    }
    diagram
}

fn bench_layout(c: &mut Criterion) {
    let theme = Theme::light();
    let config = FlowConfig::default();
    let metrics = FixedMetrics::default();

    let mut group = c.benchmark_group("layout");
    for (tiers, per_tier) in [(2usize, 3usize), (4, 6), (8, 10)] {
        let diagram = dense_diagram(tiers, per_tier);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{tiers}x{per_tier}")),
            &diagram,
            |b, diagram| {
                b.iter(|| {
                    let layout =
                        compute_layout(black_box(diagram), &theme, &config, &metrics).unwrap();
                    black_box(layout.routes.len())
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_layout);
criterion_main!(benches);
