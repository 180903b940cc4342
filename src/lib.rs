//! # incflow
//!
//! Edge-based finite-volume core for the incompressible (variable-density)
//! Navier–Stokes equations on unstructured median-dual meshes.
//!
//! The unknowns per point are pressure, velocity and temperature, closed by
//! artificial compressibility and low-speed preconditioning. This crate
//! provides the spatial discretization and its pseudo-time drivers:
//! - Fluid models (constant density, incompressible ideal gas)
//! - Edge operators (upwind FDS, JST, Lax, average-gradient viscous fluxes)
//! - Point sources (body force, Boussinesq buoyancy, axisymmetry)
//! - Boundary conditions (walls, inlet, outlet, symmetry, conjugate heat transfer)
//! - Residual and Jacobian assembly into a block-sparse linear system
//! - Local and dual time stepping with explicit and implicit Euler
//! - ASCII restart files and JSON configuration
//!
//! ## Example
//!
//! ```no_run
//! use incflow::{DualMesh, SolverConfig, ImplicitEuler, SerialHalo, run_steady};
//!
//! let config = SolverConfig::from_file("cavity.json")?;
//! let mesh = DualMesh::structured_rectangle(32, 32, 1.0, 1.0)?;
//! let mut state = config.initial_state(&mesh)?;
//! let mut assembler = config.assembler(&mesh, None)?;
//! let integrator = ImplicitEuler::new(config.linear_solver.build());
//! run_steady(&mesh, &mut state, &mut assembler, &integrator, &config.time, &config.control, &SerialHalo)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Features
//! - `parallel`: edge passes run color by color on the rayon thread pool

pub mod adjoint;
pub mod boundary;
pub mod config;
pub mod equations;
pub mod error;
pub mod flux;
pub mod io;
pub mod linalg;
pub mod mesh;
pub mod operators;
pub mod parallel;
pub mod solver;
pub mod source;
pub mod time;
pub mod types;

// Re-export main types for convenience
pub use adjoint::{AdjointTape, RecordingTape, Registration};
pub use boundary::{BoundarySet, ChtMode, ConjugateHeatProvider, MarkerConfig, MarkerKind};
pub use config::{ConfigError, SolverConfig};
pub use equations::{
    ConstantDensity, FluidModel, IncIdealGas, PrimitiveLayout, StandardFluidModel, TransportModel,
};
pub use error::{Result, SolverError};
pub use flux::{EdgeOperator, EdgeOperatorKind, OperatorConfig, StandardEdgeOperator};
pub use io::{RestartError, read_restart, write_restart};
pub use linalg::{BiCgStabSolver, BlockCsrMatrix, BlockVector, DenseLuSolver, LinearSolver};
pub use mesh::{DualMesh, EdgeColoring};
pub use operators::GradientMethod;
pub use parallel::{HaloExchange, SerialHalo};
pub use solver::{ConvergenceHistory, FlowState, ResidualAssembler, ResidualNorms, SchemeSetup};
pub use source::{PointSource, StandardSource};
pub use time::{
    DualTime, ExplicitEuler, ImplicitEuler, MarchingControl, PseudoTimeIntegrator, TimeConfig,
    TimeMarching, run_steady, run_unsteady,
};
