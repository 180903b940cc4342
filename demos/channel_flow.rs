//! Laminar channel flow.
//!
//! Solves steady incompressible flow between two parallel plates with:
//! - Uniform velocity inlet at the left, pressure outlet at the right
//! - A heated isothermal bottom wall and an adiabatic top wall
//! - Upwind FDS convection, corrected average-gradient diffusion
//! - Implicit Euler pseudo-time stepping with BiCGSTAB
//!
//! The outlet velocity profile develops towards the parabolic Poiseuille
//! profile with peak velocity 1.5 × the inlet velocity.

use incflow::config::{LinearSolverConfig, SolverConfig};
use incflow::flux::EdgeOperatorKind;
use incflow::io::write_restart;
use incflow::time::{ImplicitEuler, run_steady};
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
    let (length, height): (f64, f64) = (4.0, 1.0);
    let (nx, ny) = (40, 12);
    let inlet_velocity = 0.1;

    let mut config = SolverConfig::default();
    config.numerics.convective = EdgeOperatorKind::Upwind;
    config.numerics.viscous = Some(EdgeOperatorKind::ViscousAvgGradCorrected);
    config.fluid.density = 1.0;
    config.fluid.cp = 1005.0;
    config.fluid.laminar_viscosity = 0.01; // Re = 10
    config.fluid.reference_velocity = inlet_velocity;
    config.reference.freestream_velocity = vec![inlet_velocity, 0.0];
    config.reference.freestream_temperature = 300.0;
    config.time.cfl = 200.0;
    config.control.max_iterations = 400;
    config.control.orders = 5.0;
    config.linear_solver = LinearSolverConfig::BiCgStab {
        tolerance: 1e-8,
        max_iterations: 200,
    };
    config.markers = vec![
        MarkerConfig::new(
            "left",
            MarkerKind::Inlet {
                velocity_magnitude: inlet_velocity,
                flow_direction: vec![1.0, 0.0],
                temperature: 300.0,
            },
        ),
        MarkerConfig::new("right", MarkerKind::Outlet { pressure: 0.0 }),
        MarkerConfig::new("bottom", MarkerKind::IsothermalWall { temperature: 320.0 }).monitored(),
        MarkerConfig::new(
            "top",
            MarkerKind::HeatFluxWall {
                heat_flux: 0.0,
                integrated: false,
            },
        ),
    ];
    config.validate()?;

    println!("Laminar channel flow");
    println!("====================");
    println!("Domain: {} x {}", length, height);
    println!("Points: {} x {}", nx + 1, ny + 1);
    println!("Inlet velocity: {}", inlet_velocity);
    println!();

    let mesh = DualMesh::structured_rectangle(nx, ny, length, height)?;
    let mut state = config.initial_state(&mesh)?;
    let mut assembler = config.assembler(&mesh, None)?;
    let integrator = ImplicitEuler::new(config.linear_solver.build());

    let history = run_steady(
        &mesh,
        &mut state,
        &mut assembler,
        &integrator,
        &config.time,
        &config.control,
        &SerialHalo,
    )?;
    println!("Iterations: {}", history.len());
    println!("Pressure residual drop: {:.1} orders", history.orders_dropped(0));
    println!();

    // Velocity profile one channel height upstream of the outlet
    let x_probe = length - height;
    let mut profile: Vec<(f64, f64)> = (0..mesh.n_point())
        .filter(|&p| (mesh.coord(p)[0] - x_probe).abs() < 1e-9)
        .map(|p| (mesh.coord(p)[1], state.solution(p)[1]))
        .collect();
    profile.sort_by(|a, b| a.0.total_cmp(&b.0));

    println!("Profile at x = {}:", x_probe);
    println!("{:>8} {:>12} {:>12}", "y", "u", "u_exact");
    for (y, u) in &profile {
        let exact = 6.0 * inlet_velocity * y * (height - y) / (height * height);
        println!("{:>8.4} {:>12.6} {:>12.6}", y, u, exact);
    }
    println!();

    let report = assembler.heat_fluxes(&mesh, &state, &SerialHalo);
    println!("Heat flux into the fluid: {:.4e} W/m", report.total_heat_flux);

    let path = std::env::temp_dir().join("channel_flow_restart.dat");
    write_restart(&path, &mesh, &state)?;
    println!("Restart written to {}", path.display());

    Ok(())
}
