//! Differentially heated square cavity.
//!
//! Natural convection of air in a closed box with:
//! - Hot left wall, cold right wall, adiabatic top and bottom
//! - Boussinesq buoyancy about the mean wall temperature
//! - JST convection with second-order dual time stepping
//!
//! Prints the wall heat fluxes after each block of physical steps; at
//! steady state the hot and cold wall fluxes balance.

use incflow::config::{LinearSolverConfig, SolverConfig};
use incflow::flux::EdgeOperatorKind;
use incflow::time::{ImplicitEuler, MarchingControl, TimeMarching, run_unsteady};
use incflow::{DualMesh, MarkerConfig, MarkerKind, SerialHalo};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parameters
    let side: f64 = 0.1;
    let n = 24;
    let (t_hot, t_cold) = (305.0, 295.0);
    let t_mean = 0.5 * (t_hot + t_cold);
    let n_blocks = 5;

    let mut config = SolverConfig::default();
    config.numerics.convective = EdgeOperatorKind::CenteredJst;
    config.numerics.viscous = Some(EdgeOperatorKind::ViscousAvgGradCorrected);
    config.fluid.density = 1.177;
    config.fluid.cp = 1006.4;
    config.fluid.laminar_viscosity = 1.846e-5;
    config.fluid.reference_velocity = 0.05;
    config.reference.freestream_temperature = t_mean;
    config.reference.thermal_expansion = 1.0 / t_mean;
    config.reference.boussinesq = true;
    config.time.cfl = 50.0;
    config.time.marching = TimeMarching::DualTime2nd;
    config.time.unsteady_dt = 0.05;
    config.linear_solver = LinearSolverConfig::BiCgStab {
        tolerance: 1e-8,
        max_iterations: 300,
    };
    config.markers = vec![
        MarkerConfig::new("left", MarkerKind::IsothermalWall { temperature: t_hot }).monitored(),
        MarkerConfig::new("right", MarkerKind::IsothermalWall { temperature: t_cold }).monitored(),
        MarkerConfig::new("bottom", MarkerKind::HeatFluxWall { heat_flux: 0.0, integrated: false }),
        MarkerConfig::new("top", MarkerKind::HeatFluxWall { heat_flux: 0.0, integrated: false }),
    ];
    config.validate()?;

    // Ra = g β ΔT L³ Pr ρ² / μ²
    let (rho, mu) = (config.fluid.density, config.fluid.laminar_viscosity);
    let prandtl = 0.72;
    let rayleigh = 9.81 * config.reference.thermal_expansion * (t_hot - t_cold) * side.powi(3) * prandtl
        * rho
        * rho
        / (mu * mu);

    println!("Buoyant cavity");
    println!("==============");
    println!("Side: {} m, points: {} x {}", side, n + 1, n + 1);
    println!("Rayleigh number: {:.3e}", rayleigh);
    println!("Physical time step: {} s", config.time.unsteady_dt);
    println!();

    let mesh = DualMesh::structured_rectangle(n, n, side, side)?;
    let mut state = config.initial_state(&mesh)?;
    let mut assembler = config.assembler(&mesh, None)?;
    let integrator = ImplicitEuler::new(config.linear_solver.build());
    let control = MarchingControl {
        max_iterations: 30,
        orders: 3.0,
        physical_steps: 10,
        log_every: 0,
    };

    println!("{:>8} {:>14} {:>14} {:>12}", "time", "q_hot", "q_cold", "max |v|");
    for block in 1..=n_blocks {
        run_unsteady(
            &mesh,
            &mut state,
            &mut assembler,
            &integrator,
            &config.time,
            &control,
            &SerialHalo,
        )?;

        let report = assembler.heat_fluxes(&mesh, &state, &SerialHalo);
        let q = |tag: &str| report.marker(tag).map_or(0.0, |m| m.heat_flux);
        let max_v = (0..mesh.n_point())
            .map(|p| state.solution(p)[2].abs())
            .fold(0.0, f64::max);
        let time = (block * control.physical_steps) as f64 * config.time.unsteady_dt;
        println!("{:>8.2} {:>14.6e} {:>14.6e} {:>12.4e}", time, q("left"), q("right"), max_v);
    }

    Ok(())
}
