//! Benchmarks for residual and Jacobian assembly.
//!
//! Run with: `cargo bench --bench assembly_bench`
//! Parallel edge passes: `cargo bench --bench assembly_bench --features parallel`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use incflow::boundary::{BoundarySet, MarkerConfig, MarkerKind};
use incflow::equations::{ConstantDensity, PrimitiveLayout, TransportModel};
use incflow::flux::{EdgeOperatorKind, OperatorConfig};
use incflow::mesh::DualMesh;
use incflow::parallel::SerialHalo;
use incflow::solver::{FlowState, ResidualAssembler, SchemeSetup};

/// Differentially heated cavity with a perturbed initial field.
fn setup_problem(n: usize, convective: EdgeOperatorKind, implicit: bool) -> (DualMesh, FlowState, ResidualAssembler) {
    let mesh = DualMesh::structured_rectangle(n, n, 1.0, 1.0).unwrap();
    let layout = PrimitiveLayout::new(2).unwrap();
    let mut state = FlowState::new(
        layout,
        mesh.n_point(),
        ConstantDensity::new(1.2, 1005.0).into(),
        TransportModel::new(1.8e-5, Default::default()),
    );
    for p in 0..mesh.n_point() {
        let x = mesh.coord(p);
        let (s, c) = ((6.0 * x[0]).sin(), (6.0 * x[1]).cos());
        state.set_solution(p, &[s * c, 0.5 + 0.1 * c, 0.1 * s, 300.0 + s]);
    }

    let markers = vec![
        MarkerConfig::new("left", MarkerKind::IsothermalWall { temperature: 310.0 }),
        MarkerConfig::new("right", MarkerKind::IsothermalWall { temperature: 290.0 }),
        MarkerConfig::new("bottom", MarkerKind::HeatFluxWall { heat_flux: 0.0, integrated: false }),
        MarkerConfig::new("top", MarkerKind::Symmetry),
    ];
    let boundaries = BoundarySet::new(&mesh, &markers, None).unwrap();
    let scheme = SchemeSetup {
        convective,
        viscous: Some(EdgeOperatorKind::ViscousAvgGradCorrected),
        ..SchemeSetup::default()
    };
    let config = OperatorConfig::new(2).with_implicit(implicit);
    let assembler = ResidualAssembler::new(&mesh, config, &scheme, Vec::new(), boundaries)
        .unwrap();
    (mesh, state, assembler)
}

/// Benchmark assembly across mesh sizes.
fn bench_assembly_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("assembly_scaling");
    group.sample_size(30);

    for n in [16, 32, 64] {
        for implicit in [false, true] {
            let (mesh, mut state, mut assembler) = setup_problem(n, EdgeOperatorKind::Upwind, implicit);
            let label = format!("{}x{}_{}", n, n, if implicit { "implicit" } else { "explicit" });
            group.bench_with_input(BenchmarkId::new("upwind", label), &n, |b, _| {
                b.iter(|| {
                    assembler
                        .compute_residual(&mesh, &mut state, &SerialHalo)
                        .unwrap()
                });
            });
        }
    }

    group.finish();
}

/// Benchmark the convective schemes on one mesh.
fn bench_assembly_schemes(c: &mut Criterion) {
    let mut group = c.benchmark_group("assembly_schemes");
    group.sample_size(30);

    for convective in [
        EdgeOperatorKind::Upwind,
        EdgeOperatorKind::CenteredJst,
        EdgeOperatorKind::CenteredLax,
    ] {
        let (mesh, mut state, mut assembler) = setup_problem(32, convective, true);
        let name = assembler.convective().kind();
        group.bench_function(format!("{name:?}"), |b| {
            b.iter(|| {
                assembler
                    .compute_residual(&mesh, &mut state, &SerialHalo)
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_assembly_scaling, bench_assembly_schemes);
criterion_main!(benches);
