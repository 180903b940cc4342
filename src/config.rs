//! Solver configuration.
//!
//! [`SolverConfig`] is loaded from JSON, validated once, and then turned into
//! the immutable pieces the solver is built from: an [`OperatorConfig`], a
//! [`SchemeSetup`], the fluid and transport models, the point sources and the
//! boundary set.
//!
//! ```json
//! {
//!   "numerics": { "convective": "centered_jst", "viscous": "viscous_avg_grad_corrected" },
//!   "fluid": { "density_model": "constant", "density": 998.2, "cp": 4182.0 },
//!   "time": { "cfl": 50.0 },
//!   "markers": [
//!     { "tag": "left", "kind": "isothermal_wall", "temperature": 310.0 }
//!   ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::boundary::{BoundarySet, ConjugateHeatProvider, MarkerConfig};
use crate::equations::{
    ConductivityModel, ConstantDensity, IncIdealGas, PrimitiveLayout, StandardFluidModel,
    TransportModel,
};
use crate::error::Result;
use crate::flux::{DissipationCoefficients, EdgeOperatorKind, OperatorConfig};
use crate::linalg::{BiCgStabSolver, DenseLuSolver, LinearSolver};
use crate::mesh::DualMesh;
use crate::operators::GradientMethod;
use crate::solver::{FlowState, ResidualAssembler, SchemeSetup};
use crate::source::{Axisymmetric, BodyForce, Boussinesq, StandardSource};
use crate::time::{MarchingControl, TimeConfig, TimeMarching};

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// A value outside its admissible range
    #[error("Invalid value for {key}: {value} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// A required entry is absent
    #[error("Missing configuration entry: {0}")]
    Missing(String),
}

fn invalid(key: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Discretization choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericsConfig {
    /// Convective scheme
    #[serde(default)]
    pub convective: EdgeOperatorKind,
    /// Viscous scheme; absent for inviscid runs
    #[serde(default)]
    pub viscous: Option<EdgeOperatorKind>,
    /// Gradient reconstruction
    #[serde(default)]
    pub gradient_method: GradientMethod,
    /// Centered-scheme dissipation
    #[serde(default)]
    pub dissipation: DissipationCoefficients,
    /// Assemble Jacobians
    #[serde(default = "default_true")]
    pub implicit: bool,
    /// Solve the energy equation
    #[serde(default = "default_true")]
    pub energy: bool,
    /// Axisymmetric meridional plane (2D only)
    #[serde(default)]
    pub axisymmetric: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NumericsConfig {
    fn default() -> Self {
        Self {
            convective: EdgeOperatorKind::default(),
            viscous: None,
            gradient_method: GradientMethod::default(),
            dissipation: DissipationCoefficients::default(),
            implicit: true,
            energy: true,
            axisymmetric: false,
        }
    }
}

/// How density follows from temperature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityModel {
    /// ρ fixed
    #[default]
    Constant,
    /// ρ = p_op / (R·T)
    IncIdealGas,
}

/// Fluid properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluidConfig {
    /// Density model
    #[serde(default)]
    pub density_model: DensityModel,
    /// Density of the constant model (kg/m³)
    #[serde(default = "default_density")]
    pub density: f64,
    /// Operating pressure of the ideal-gas model (Pa)
    #[serde(default = "default_operating_pressure")]
    pub operating_pressure: f64,
    /// Specific gas constant (J/(kg·K))
    #[serde(default = "default_gas_constant")]
    pub gas_constant: f64,
    /// Specific heat at constant pressure (J/(kg·K))
    #[serde(default = "default_cp")]
    pub cp: f64,
    /// Laminar viscosity (Pa·s); zero for inviscid runs
    #[serde(default)]
    pub laminar_viscosity: f64,
    /// Thermal conductivity
    #[serde(default)]
    pub conductivity: ConductivityModel,
    /// β² = factor · max(|u|², u_ref²)
    #[serde(default = "default_beta_factor")]
    pub beta_factor: f64,
    /// u_ref of the artificial compressibility
    #[serde(default = "default_reference_velocity")]
    pub reference_velocity: f64,
}

fn default_density() -> f64 {
    1.2
}
fn default_operating_pressure() -> f64 {
    101_325.0
}
fn default_gas_constant() -> f64 {
    287.058
}
fn default_cp() -> f64 {
    1004.703
}
fn default_beta_factor() -> f64 {
    4.1
}
fn default_reference_velocity() -> f64 {
    1.0
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            density_model: DensityModel::default(),
            density: default_density(),
            operating_pressure: default_operating_pressure(),
            gas_constant: default_gas_constant(),
            cp: default_cp(),
            laminar_viscosity: 0.0,
            conductivity: ConductivityModel::default(),
            beta_factor: default_beta_factor(),
            reference_velocity: default_reference_velocity(),
        }
    }
}

/// Reference values, free stream and body forces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Force nondimensionalization
    #[serde(default = "default_one")]
    pub force_ref: f64,
    /// Free-stream density (hydrostatic reference of the body force)
    #[serde(default = "default_density")]
    pub freestream_density: f64,
    /// Free-stream gauge pressure (Pa), the initial pressure
    #[serde(default)]
    pub freestream_pressure: f64,
    /// Free-stream velocity, the initial velocity; zero when empty
    #[serde(default)]
    pub freestream_velocity: Vec<f64>,
    /// Free-stream temperature (K), initial and Boussinesq reference
    #[serde(default = "default_temperature")]
    pub freestream_temperature: f64,
    /// Thermal expansion coefficient (1/K)
    #[serde(default = "default_thermal_expansion")]
    pub thermal_expansion: f64,
    /// Body force per unit mass; absent disables the source
    #[serde(default)]
    pub body_force: Option<Vec<f64>>,
    /// Boussinesq buoyancy
    #[serde(default)]
    pub boussinesq: bool,
}

fn default_one() -> f64 {
    1.0
}
fn default_temperature() -> f64 {
    288.15
}
fn default_thermal_expansion() -> f64 {
    1.0 / 288.15
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            force_ref: 1.0,
            freestream_density: default_density(),
            freestream_pressure: 0.0,
            freestream_velocity: Vec::new(),
            freestream_temperature: default_temperature(),
            thermal_expansion: default_thermal_expansion(),
            body_force: None,
            boussinesq: false,
        }
    }
}

/// Linear solver selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinearSolverConfig {
    /// Block-Jacobi preconditioned BiCGSTAB
    BiCgStab {
        #[serde(default = "default_linear_tolerance")]
        tolerance: f64,
        #[serde(default = "default_linear_iterations")]
        max_iterations: usize,
    },
    /// Dense LU, small meshes only
    DenseLu,
}

fn default_linear_tolerance() -> f64 {
    BiCgStabSolver::default().tolerance
}
fn default_linear_iterations() -> usize {
    BiCgStabSolver::default().max_iterations
}

impl Default for LinearSolverConfig {
    fn default() -> Self {
        Self::BiCgStab {
            tolerance: default_linear_tolerance(),
            max_iterations: default_linear_iterations(),
        }
    }
}

impl LinearSolverConfig {
    /// Build the solver.
    pub fn build(&self) -> Box<dyn LinearSolver> {
        match *self {
            Self::BiCgStab {
                tolerance,
                max_iterations,
            } => Box::new(BiCgStabSolver {
                tolerance,
                max_iterations,
            }),
            Self::DenseLu => Box::new(DenseLuSolver),
        }
    }
}

// =============================================================================
// Top level
// =============================================================================

/// Complete solver configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Discretization
    #[serde(default)]
    pub numerics: NumericsConfig,
    /// Fluid properties
    #[serde(default)]
    pub fluid: FluidConfig,
    /// Reference values
    #[serde(default)]
    pub reference: ReferenceConfig,
    /// Time stepping
    #[serde(default)]
    pub time: TimeConfig,
    /// Iteration limits
    #[serde(default)]
    pub control: MarchingControl,
    /// Linear solver of implicit runs
    #[serde(default)]
    pub linear_solver: LinearSolverConfig,
    /// Boundary markers
    #[serde(default)]
    pub markers: Vec<MarkerConfig>,
}

impl SolverConfig {
    /// Load and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&content)?;
        info!(path = %path.as_ref().display(), markers = config.markers.len(), "configuration loaded");
        Ok(config)
    }

    /// Parse and validate a JSON string.
    pub fn from_json_str(json: &str) -> std::result::Result<Self, ConfigError> {
        let config: SolverConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty-printed JSON.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> std::result::Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Check ranges and cross-section consistency.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let numerics = &self.numerics;
        if !numerics.convective.is_convective() {
            return Err(invalid(
                "numerics.convective",
                format!("{:?}", numerics.convective),
                "not a convective scheme",
            ));
        }
        if let Some(kind) = numerics.viscous {
            if !kind.is_viscous() {
                return Err(invalid("numerics.viscous", format!("{kind:?}"), "not a viscous scheme"));
            }
            if self.fluid.laminar_viscosity <= 0.0 {
                return Err(invalid(
                    "fluid.laminar_viscosity",
                    self.fluid.laminar_viscosity,
                    "viscous runs need a positive viscosity",
                ));
            }
        }
        let kappas = &numerics.dissipation;
        for (key, value) in [
            ("numerics.dissipation.kappa_1st", kappas.kappa_1st),
            ("numerics.dissipation.kappa_2nd", kappas.kappa_2nd),
            ("numerics.dissipation.kappa_4th", kappas.kappa_4th),
        ] {
            if value < 0.0 {
                return Err(invalid(key, value, "must be non-negative"));
            }
        }

        let fluid = &self.fluid;
        for (key, value) in [
            ("fluid.density", fluid.density),
            ("fluid.operating_pressure", fluid.operating_pressure),
            ("fluid.gas_constant", fluid.gas_constant),
            ("fluid.cp", fluid.cp),
            ("fluid.beta_factor", fluid.beta_factor),
            ("fluid.reference_velocity", fluid.reference_velocity),
        ] {
            if !(value > 0.0) {
                return Err(invalid(key, value, "must be positive"));
            }
        }
        if fluid.laminar_viscosity < 0.0 {
            return Err(invalid("fluid.laminar_viscosity", fluid.laminar_viscosity, "must be non-negative"));
        }

        let reference = &self.reference;
        if !(reference.force_ref > 0.0) {
            return Err(invalid("reference.force_ref", reference.force_ref, "must be positive"));
        }
        if !(reference.freestream_temperature > 0.0) {
            return Err(invalid(
                "reference.freestream_temperature",
                reference.freestream_temperature,
                "must be positive",
            ));
        }
        if let Some(force) = &reference.body_force {
            if !(2..=3).contains(&force.len()) {
                return Err(invalid("reference.body_force", format!("{force:?}"), "needs 2 or 3 components"));
            }
        }

        let time = &self.time;
        if !(time.cfl > 0.0) {
            return Err(invalid("time.cfl", time.cfl, "must be positive"));
        }
        if !(time.max_dt > 0.0) {
            return Err(invalid("time.max_dt", time.max_dt, "must be positive"));
        }
        if time.marching.is_dual_time() && !(time.unsteady_dt > 0.0) {
            return Err(invalid("time.unsteady_dt", time.unsteady_dt, "dual time stepping needs a physical step"));
        }
        if time.marching == TimeMarching::TimeStepping && time.unsteady_dt < 0.0 {
            return Err(invalid("time.unsteady_dt", time.unsteady_dt, "must be non-negative"));
        }

        for (i, marker) in self.markers.iter().enumerate() {
            if self.markers[..i].iter().any(|m| m.tag == marker.tag) {
                return Err(invalid("markers.tag", &marker.tag, "duplicate marker"));
            }
        }
        Ok(())
    }

    /// Operator flags for an `n_dim` mesh.
    pub fn operator_config(&self, n_dim: usize) -> OperatorConfig {
        OperatorConfig::new(n_dim)
            .with_implicit(self.numerics.implicit)
            .with_energy(self.numerics.energy)
            .with_variable_density(self.fluid.density_model == DensityModel::IncIdealGas)
    }

    /// Scheme selection.
    pub fn scheme_setup(&self) -> SchemeSetup {
        SchemeSetup {
            convective: self.numerics.convective,
            viscous: self.numerics.viscous,
            dissipation: self.numerics.dissipation,
            gradient_method: self.numerics.gradient_method,
        }
    }

    pub fn fluid_model(&self) -> StandardFluidModel {
        let fluid = &self.fluid;
        match fluid.density_model {
            DensityModel::Constant => ConstantDensity::new(fluid.density, fluid.cp).into(),
            DensityModel::IncIdealGas => {
                IncIdealGas::new(fluid.gas_constant, fluid.operating_pressure, fluid.cp).into()
            }
        }
    }

    pub fn transport_model(&self) -> TransportModel {
        if self.numerics.viscous.is_none() {
            TransportModel::inviscid()
        } else {
            TransportModel::new(self.fluid.laminar_viscosity, self.fluid.conductivity)
        }
    }

    /// Point sources enabled by the configuration.
    pub fn sources(&self, config: OperatorConfig) -> Result<Vec<StandardSource>> {
        let reference = &self.reference;
        let mut sources = Vec::new();
        if let Some(force) = &reference.body_force {
            if force.len() != config.n_dim {
                return Err(invalid(
                    "reference.body_force",
                    format!("{force:?}"),
                    "length differs from the mesh dimension",
                )
                .into());
            }
            sources.push(StandardSource::BodyForce(BodyForce::new(
                config,
                force,
                reference.freestream_density,
                reference.force_ref,
            )));
        }
        if reference.boussinesq {
            sources.push(StandardSource::Boussinesq(Boussinesq::new(
                config,
                reference.thermal_expansion,
                reference.freestream_temperature,
                reference.force_ref,
            )));
        }
        if self.numerics.axisymmetric {
            sources.push(StandardSource::Axisymmetric(Axisymmetric::new(
                config,
                self.numerics.viscous.is_some(),
            )?));
        }
        Ok(sources)
    }

    /// Free-stream state on every point of `mesh`.
    pub fn initial_state(&self, mesh: &DualMesh) -> Result<FlowState> {
        let n_dim = mesh.n_dim();
        let layout = PrimitiveLayout::new(n_dim)?;
        let reference = &self.reference;
        if !reference.freestream_velocity.is_empty() && reference.freestream_velocity.len() != n_dim {
            return Err(invalid(
                "reference.freestream_velocity",
                format!("{:?}", reference.freestream_velocity),
                "length differs from the mesh dimension",
            )
            .into());
        }

        let mut values = vec![0.0; layout.n_var()];
        values[0] = reference.freestream_pressure;
        for (dst, src) in values[1..=n_dim].iter_mut().zip(&reference.freestream_velocity) {
            *dst = *src;
        }
        values[n_dim + 1] = reference.freestream_temperature;

        let mut state = FlowState::new(layout, mesh.n_point(), self.fluid_model(), self.transport_model())
            .with_artificial_compressibility(self.fluid.beta_factor, self.fluid.reference_velocity);
        state.set_uniform(&values);
        state.update_primitives();
        Ok(state)
    }

    /// Assembler with sources and boundaries bound to `mesh`.
    pub fn assembler(
        &self,
        mesh: &DualMesh,
        conjugate: Option<Arc<dyn ConjugateHeatProvider>>,
    ) -> Result<ResidualAssembler> {
        let config = self.operator_config(mesh.n_dim());
        let boundaries = BoundarySet::new(mesh, &self.markers, conjugate)?;
        ResidualAssembler::new(mesh, config, &self.scheme_setup(), self.sources(config)?, boundaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::MarkerKind;
    use crate::solver::FlowState;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_defaults_validate() {
        let config = SolverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.numerics.convective, EdgeOperatorKind::Upwind);
        assert!(config.numerics.implicit);
        assert!((config.fluid.beta_factor - 4.1).abs() < TOL);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "numerics": { "convective": "centered_jst", "viscous": "viscous_avg_grad" },
            "fluid": { "laminar_viscosity": 1.8e-5 },
            "markers": [
                { "tag": "wall", "kind": "isothermal_wall", "temperature": 300.0 },
                { "tag": "out", "kind": "outlet", "pressure": 0.0 }
            ]
        }"#;
        let config = SolverConfig::from_json_str(json).unwrap();
        assert_eq!(config.numerics.convective, EdgeOperatorKind::CenteredJst);
        assert_eq!(config.numerics.viscous, Some(EdgeOperatorKind::ViscousAvgGrad));
        assert!((config.numerics.dissipation.kappa_4th - 0.02).abs() < TOL);
        assert!((config.fluid.cp - 1004.703).abs() < TOL);
        assert_eq!(config.markers.len(), 2);
        assert_eq!(
            config.markers[0].kind,
            MarkerKind::IsothermalWall { temperature: 300.0 }
        );
    }

    #[test]
    fn test_rejects_misplaced_scheme() {
        let mut config = SolverConfig::default();
        config.numerics.convective = EdgeOperatorKind::ViscousAvgGrad;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "numerics.convective"
        ));
    }

    #[test]
    fn test_viscous_needs_viscosity() {
        let mut config = SolverConfig::default();
        config.numerics.viscous = Some(EdgeOperatorKind::ViscousAvgGradCorrected);
        assert!(config.validate().is_err());
        config.fluid.laminar_viscosity = 1e-3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dual_time_needs_physical_step() {
        let mut config = SolverConfig::default();
        config.time.marching = TimeMarching::DualTime2nd;
        assert!(config.validate().is_err());
        config.time.unsteady_dt = 1e-3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_marker_rejected() {
        let mut config = SolverConfig::default();
        config.markers = vec![
            MarkerConfig::new("wall", MarkerKind::Symmetry),
            MarkerConfig::new("wall", MarkerKind::Symmetry),
        ];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let result = SolverConfig::from_json_str("{ \"numerics\": ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_operator_config_follows_density_model() {
        let mut config = SolverConfig::default();
        assert!(!config.operator_config(2).variable_density);
        config.fluid.density_model = DensityModel::IncIdealGas;
        let op = config.operator_config(3);
        assert!(op.variable_density);
        assert_eq!(op.n_var(), 5);
    }

    #[test]
    fn test_sources_from_reference() {
        let mut config = SolverConfig::default();
        config.reference.body_force = Some(vec![0.0, -9.81]);
        config.reference.boussinesq = true;
        config.numerics.axisymmetric = true;
        let sources = config.sources(config.operator_config(2)).unwrap();
        assert_eq!(sources.len(), 3);
        assert!(matches!(sources[0], StandardSource::BodyForce(_)));

        // 2-component force on a 3D mesh
        config.numerics.axisymmetric = false;
        assert!(config.sources(config.operator_config(3)).is_err());
    }

    #[test]
    fn test_initial_state() {
        let mesh = DualMesh::periodic_rectangle(3, 3, 1.0, 1.0).unwrap();
        let mut config = SolverConfig::default();
        config.reference.freestream_velocity = vec![2.0, 0.0];
        config.reference.freestream_pressure = 5.0;
        let state: FlowState = config.initial_state(&mesh).unwrap();
        let layout = state.layout();
        let v = state.primitive(4);
        assert!((v[0] - 5.0).abs() < TOL);
        assert!((v[1] - 2.0).abs() < TOL);
        assert!((v[layout.temperature()] - 288.15).abs() < TOL);
        assert!((v[layout.density()] - 1.2).abs() < TOL);
        // β² = 4.1 · max(|u|², 1)
        assert!((state.beta2() - 16.4).abs() < 1e-10);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = SolverConfig::default();
        config.numerics.convective = EdgeOperatorKind::CenteredLax;
        config.linear_solver = LinearSolverConfig::DenseLu;
        config.markers.push(MarkerConfig::new("top", MarkerKind::Symmetry));
        config.save_to_file(&path).unwrap();

        let loaded = SolverConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.linear_solver.build().name(), DenseLuSolver.name());
    }
}
