//! Benchmarks for the edge operators.
//!
//! Run with: `cargo bench --bench edge_flux_bench`
//!
//! Compares the per-edge cost of the convective and viscous schemes, with
//! and without Jacobian blocks.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use incflow::equations::{PrimitiveBuilder, PrimitiveLayout};
use incflow::flux::{
    DissipationCoefficients, DissipationInputs, EdgeContext, EdgeOperator, EdgeOperatorKind,
    EdgeResidual, OperatorConfig, StandardEdgeOperator,
};
use incflow::types::{GradientBlock, MAX_DIM, MAX_VAR};

struct EdgeSample {
    normal: [f64; 2],
    edge_vector: [f64; 2],
    v_i: Vec<f64>,
    v_j: Vec<f64>,
    grad_i: GradientBlock,
    grad_j: GradientBlock,
}

/// Generate edge states with smoothly varying flow.
fn generate_edges(n: usize) -> Vec<EdgeSample> {
    let layout = PrimitiveLayout::new(2).unwrap();
    let state = |phase: f64| {
        PrimitiveBuilder::new(layout)
            .pressure(100.0 + 10.0 * phase.sin())
            .velocity(&[1.0 + 0.3 * phase.cos(), 0.2 * phase.sin()])
            .temperature(300.0 + 5.0 * phase.cos())
            .density(1.2)
            .beta2(8.0)
            .viscosity(1.8e-5, 0.0)
            .conductivity(0.026)
            .heat_capacity(1005.0, 718.0)
            .build()
    };

    (0..n)
        .map(|i| {
            let phase = i as f64 * 0.1;
            let angle = phase * 0.5;
            let mut grad = [[0.0; MAX_DIM]; MAX_VAR];
            grad[0] = [phase.sin(), phase.cos(), 0.0];
            grad[3] = [10.0 * phase.cos(), 0.0, 0.0];
            EdgeSample {
                normal: [0.1 * angle.cos(), 0.1 * angle.sin()],
                edge_vector: [0.1 * angle.cos(), 0.1 * angle.sin()],
                v_i: state(phase),
                v_j: state(phase + 0.2),
                grad_i: grad,
                grad_j: grad,
            }
        })
        .collect()
}

fn run(op: &StandardEdgeOperator, edges: &[EdgeSample], out: &mut EdgeResidual) -> f64 {
    let lapl = [0.0; 4];
    let mut total = 0.0;
    for edge in edges {
        let ctx = EdgeContext::new(&edge.normal, &edge.v_i, &edge.v_j)
            .with_edge_vector(&edge.edge_vector)
            .with_gradients(&edge.grad_i, &edge.grad_j)
            .with_dissipation(DissipationInputs {
                und_lapl: (Some(&lapl), Some(&lapl)),
                sensor: (0.01, 0.02),
                lambda: (0.5, 0.6),
                neighbors: (4, 4),
            });
        op.compute(black_box(&ctx), out);
        total += out.residual[0];
    }
    total
}

/// Benchmark every operator kind.
fn bench_edge_operators(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_operators");
    let edges = generate_edges(1000);

    for kind in [
        EdgeOperatorKind::Upwind,
        EdgeOperatorKind::CenteredJst,
        EdgeOperatorKind::CenteredLax,
        EdgeOperatorKind::ViscousAvgGrad,
        EdgeOperatorKind::ViscousAvgGradCorrected,
    ] {
        for implicit in [false, true] {
            let config = OperatorConfig::new(2).with_implicit(implicit);
            let op = StandardEdgeOperator::from_kind(kind, config, &DissipationCoefficients::default());
            let mut out = EdgeResidual::new(config.n_var());
            let label = if implicit { "implicit" } else { "explicit" };
            group.bench_with_input(BenchmarkId::new(op.name(), label), &implicit, |b, _| {
                b.iter(|| run(&op, &edges, &mut out));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_edge_operators);
criterion_main!(benches);
