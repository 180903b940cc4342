//! Trait-based edge operator abstraction.
//!
//! An edge operator maps the two endpoint states of a dual-mesh edge, the
//! area-weighted face normal and the scheme parameters to a local residual
//! and the two Jacobian blocks `∂R/∂V_i`, `∂R/∂V_j`. The assembler scatters
//! the result; operators never touch global storage.
//!
//! Scratch storage is the [`EdgeResidual`] passed in by the caller plus
//! stack-local fixed blocks, so one operator can be shared by any number of
//! threads.
//!
//! # Example
//! ```
//! use incflow::equations::{PrimitiveBuilder, PrimitiveLayout};
//! use incflow::flux::{CenteredLax, EdgeContext, EdgeOperator, EdgeResidual, OperatorConfig};
//!
//! let layout = PrimitiveLayout::new(2).unwrap();
//! let v = PrimitiveBuilder::new(layout)
//!     .pressure(101325.0)
//!     .velocity(&[10.0, 0.0])
//!     .temperature(300.0)
//!     .density(1.2)
//!     .beta2(400.0)
//!     .heat_capacity(1004.7, 1004.7)
//!     .build();
//!
//! let config = OperatorConfig::new(2);
//! let lax = CenteredLax::new(config, 0.15);
//! let ctx = EdgeContext::new(&[1.0, 0.0], &v, &v);
//! let mut out = EdgeResidual::new(layout.n_var());
//! lax.compute(&ctx, &mut out);
//!
//! // Identical states carry no dissipation: the physical flux remains
//! let h = 1004.7 * 300.0;
//! assert!((out.residual[0] - 1.2 * 10.0).abs() < 1e-12);
//! assert!((out.residual[1] - (1.2 * 100.0 + 101325.0)).abs() < 1e-9);
//! assert_eq!(out.residual[2], 0.0);
//! assert!((out.residual[3] - 1.2 * h * 10.0).abs() < 1e-6);
//! ```

use serde::{Deserialize, Serialize};

use crate::equations::PrimitiveLayout;
use crate::types::{GradientBlock, JacBlock, MAX_DIM, VarBlock};

// =============================================================================
// Operator configuration
// =============================================================================

/// Immutable flags captured when an operator is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Spatial dimension (2 or 3)
    pub n_dim: usize,
    /// Whether Jacobian blocks are produced
    pub implicit: bool,
    /// Whether the energy equation is solved
    pub energy: bool,
    /// Whether density depends on temperature
    pub variable_density: bool,
}

impl OperatorConfig {
    /// Implicit, energy on, constant density.
    pub fn new(n_dim: usize) -> Self {
        Self {
            n_dim,
            implicit: true,
            energy: true,
            variable_density: false,
        }
    }

    /// Set the implicit flag.
    pub fn with_implicit(mut self, implicit: bool) -> Self {
        self.implicit = implicit;
        self
    }

    /// Set the energy flag.
    pub fn with_energy(mut self, energy: bool) -> Self {
        self.energy = energy;
        self
    }

    /// Set the variable-density flag.
    pub fn with_variable_density(mut self, variable_density: bool) -> Self {
        self.variable_density = variable_density;
        self
    }

    /// Number of solved variables.
    #[inline]
    pub fn n_var(&self) -> usize {
        self.n_dim + 2
    }

    /// Row/column of the energy equation.
    #[inline]
    pub fn energy_index(&self) -> usize {
        self.n_dim + 1
    }

    /// Primitive layout for this dimension.
    #[inline]
    pub fn layout(&self) -> PrimitiveLayout {
        PrimitiveLayout::from_dim(self.n_dim)
    }
}

// =============================================================================
// Edge inputs
// =============================================================================

/// Per-point quantities read by the centered schemes.
#[derive(Clone, Copy, Debug)]
pub struct DissipationInputs<'a> {
    /// Undivided Laplacians of the solved variables (None = zero)
    pub und_lapl: (Option<&'a [f64]>, Option<&'a [f64]>),
    /// Pressure sensors
    pub sensor: (f64, f64),
    /// Integrated inviscid spectral radii; non-positive values mean
    /// "unavailable" and give a unit stretching factor
    pub lambda: (f64, f64),
    /// Neighbor counts
    pub neighbors: (usize, usize),
}

impl Default for DissipationInputs<'_> {
    fn default() -> Self {
        Self {
            und_lapl: (None, None),
            sensor: (0.0, 0.0),
            lambda: (0.0, 0.0),
            neighbors: (1, 1),
        }
    }
}

/// Everything an edge operator may read for one edge.
#[derive(Clone, Copy, Debug)]
pub struct EdgeContext<'a> {
    /// Area-weighted normal, oriented from i to j
    pub normal: &'a [f64],
    /// Primitive vector at i
    pub v_i: &'a [f64],
    /// Primitive vector at j
    pub v_j: &'a [f64],
    /// Vector from point i to point j
    pub edge_vector: [f64; MAX_DIM],
    /// Gradients of the solved variables at i and j
    pub gradients: Option<(&'a GradientBlock, &'a GradientBlock)>,
    /// Turbulent kinetic energy at i and j
    pub turb_ke: (f64, f64),
    /// Centered-scheme inputs
    pub dissipation: DissipationInputs<'a>,
}

impl<'a> EdgeContext<'a> {
    /// Context with the minimum inputs of a convective operator.
    pub fn new(normal: &'a [f64], v_i: &'a [f64], v_j: &'a [f64]) -> Self {
        Self {
            normal,
            v_i,
            v_j,
            edge_vector: [0.0; MAX_DIM],
            gradients: None,
            turb_ke: (0.0, 0.0),
            dissipation: DissipationInputs::default(),
        }
    }

    /// Set the i → j edge vector.
    pub fn with_edge_vector(mut self, edge_vector: &[f64]) -> Self {
        self.edge_vector = [0.0; MAX_DIM];
        self.edge_vector[..edge_vector.len()].copy_from_slice(edge_vector);
        self
    }

    /// Set the edge vector from point coordinates.
    pub fn with_coords(mut self, coord_i: &[f64], coord_j: &[f64]) -> Self {
        self.edge_vector = [0.0; MAX_DIM];
        for (d, e) in self.edge_vector.iter_mut().enumerate().take(coord_i.len()) {
            *e = coord_j[d] - coord_i[d];
        }
        self
    }

    /// Set the point gradients.
    pub fn with_gradients(mut self, grad_i: &'a GradientBlock, grad_j: &'a GradientBlock) -> Self {
        self.gradients = Some((grad_i, grad_j));
        self
    }

    /// Set turbulent kinetic energy.
    pub fn with_turb_ke(mut self, k_i: f64, k_j: f64) -> Self {
        self.turb_ke = (k_i, k_j);
        self
    }

    /// Set the centered-scheme inputs.
    pub fn with_dissipation(mut self, dissipation: DissipationInputs<'a>) -> Self {
        self.dissipation = dissipation;
        self
    }
}

// =============================================================================
// Edge output
// =============================================================================

/// Local residual and Jacobian blocks for one edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeResidual {
    /// Residual contribution (added at i, subtracted at j for convection)
    pub residual: VarBlock,
    /// ∂R/∂V_i
    pub jac_i: JacBlock,
    /// ∂R/∂V_j
    pub jac_j: JacBlock,
}

impl EdgeResidual {
    /// Zeroed output for `n_var` variables.
    pub fn new(n_var: usize) -> Self {
        Self {
            residual: VarBlock::zeros(n_var),
            jac_i: JacBlock::zeros(n_var),
            jac_j: JacBlock::zeros(n_var),
        }
    }

    /// Zero everything.
    pub fn reset(&mut self) {
        self.residual.set_zero();
        self.jac_i.set_zero();
        self.jac_j.set_zero();
    }

    /// Remove the energy equation: zero the residual entry and the energy
    /// row and column of both Jacobians.
    #[inline]
    pub fn decouple_energy(&mut self, energy_index: usize) {
        self.residual[energy_index] = 0.0;
        self.jac_i.zero_row(energy_index);
        self.jac_i.zero_col(energy_index);
        self.jac_j.zero_row(energy_index);
        self.jac_j.zero_col(energy_index);
    }

    /// True when the residual and both blocks are finite.
    pub fn is_finite(&self) -> bool {
        self.residual.is_finite() && self.jac_i.is_finite() && self.jac_j.is_finite()
    }
}

// =============================================================================
// Edge operator trait
// =============================================================================

/// Per-edge flux and Jacobian functor.
///
/// # Implementation Notes
///
/// - Conservative: `R(V_i, V_j; n) = −R(V_j, V_i; −n)`
/// - `compute` overwrites `out` completely and must not allocate
/// - When `config().implicit` is false the Jacobian blocks are left zero
/// - When `config().energy` is false the energy row/column is exactly zero
pub trait EdgeOperator: Send + Sync {
    /// Compute the edge residual and Jacobians.
    fn compute(&self, ctx: &EdgeContext<'_>, out: &mut EdgeResidual);

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Flags captured at construction.
    fn config(&self) -> &OperatorConfig;

    /// Whether the operator reads point gradients.
    fn needs_gradients(&self) -> bool {
        false
    }

    /// Whether the operator reads undivided Laplacians and sensors.
    fn needs_laplacian(&self) -> bool {
        false
    }

    /// Whether the operator reads spectral radii and neighbor counts.
    fn needs_spectral_radius(&self) -> bool {
        false
    }
}

// =============================================================================
// Standard operator enum
// =============================================================================

/// Convective and viscous scheme selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOperatorKind {
    /// Preconditioned flux-difference splitting
    #[default]
    Upwind,
    /// Jameson–Schmidt–Turkel centered scheme
    CenteredJst,
    /// Lax–Friedrichs centered scheme
    CenteredLax,
    /// Average-gradient viscous flux
    ViscousAvgGrad,
    /// Edge-corrected average-gradient viscous flux
    ViscousAvgGradCorrected,
}

impl EdgeOperatorKind {
    /// True for the convective kinds.
    pub fn is_convective(self) -> bool {
        matches!(self, Self::Upwind | Self::CenteredJst | Self::CenteredLax)
    }

    /// True for the viscous kinds.
    pub fn is_viscous(self) -> bool {
        !self.is_convective()
    }
}

/// Artificial dissipation coefficients for the centered schemes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DissipationCoefficients {
    /// κ for the Lax scheme
    #[serde(default = "default_kappa_1st")]
    pub kappa_1st: f64,
    /// κ⁽²⁾ for JST
    #[serde(default = "default_kappa_2nd")]
    pub kappa_2nd: f64,
    /// κ⁽⁴⁾ for JST
    #[serde(default = "default_kappa_4th")]
    pub kappa_4th: f64,
}

fn default_kappa_1st() -> f64 {
    0.15
}
fn default_kappa_2nd() -> f64 {
    0.5
}
fn default_kappa_4th() -> f64 {
    0.02
}

impl Default for DissipationCoefficients {
    fn default() -> Self {
        Self {
            kappa_1st: default_kappa_1st(),
            kappa_2nd: default_kappa_2nd(),
            kappa_4th: default_kappa_4th(),
        }
    }
}

/// Closed set of edge operators, resolved once at setup and dispatched by
/// `match` in the edge loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StandardEdgeOperator {
    /// Upwind FDS
    Upwind(super::UpwindFds),
    /// Centered JST
    CenteredJst(super::CenteredJst),
    /// Centered Lax
    CenteredLax(super::CenteredLax),
    /// Average-gradient viscous
    ViscousAvgGrad(super::AvgGrad),
    /// Corrected average-gradient viscous
    ViscousAvgGradCorrected(super::AvgGradCorrected),
}

impl StandardEdgeOperator {
    /// Build the operator of the requested kind.
    pub fn from_kind(
        kind: EdgeOperatorKind,
        config: OperatorConfig,
        coefficients: &DissipationCoefficients,
    ) -> Self {
        match kind {
            EdgeOperatorKind::Upwind => Self::Upwind(super::UpwindFds::new(config)),
            EdgeOperatorKind::CenteredJst => Self::CenteredJst(super::CenteredJst::new(
                config,
                coefficients.kappa_2nd,
                coefficients.kappa_4th,
            )),
            EdgeOperatorKind::CenteredLax => {
                Self::CenteredLax(super::CenteredLax::new(config, coefficients.kappa_1st))
            }
            EdgeOperatorKind::ViscousAvgGrad => Self::ViscousAvgGrad(super::AvgGrad::new(config)),
            EdgeOperatorKind::ViscousAvgGradCorrected => {
                Self::ViscousAvgGradCorrected(super::AvgGradCorrected::new(config))
            }
        }
    }

    /// Kind of this operator.
    pub fn kind(&self) -> EdgeOperatorKind {
        match self {
            Self::Upwind(_) => EdgeOperatorKind::Upwind,
            Self::CenteredJst(_) => EdgeOperatorKind::CenteredJst,
            Self::CenteredLax(_) => EdgeOperatorKind::CenteredLax,
            Self::ViscousAvgGrad(_) => EdgeOperatorKind::ViscousAvgGrad,
            Self::ViscousAvgGradCorrected(_) => EdgeOperatorKind::ViscousAvgGradCorrected,
        }
    }
}

impl EdgeOperator for StandardEdgeOperator {
    #[inline]
    fn compute(&self, ctx: &EdgeContext<'_>, out: &mut EdgeResidual) {
        match self {
            Self::Upwind(op) => op.compute(ctx, out),
            Self::CenteredJst(op) => op.compute(ctx, out),
            Self::CenteredLax(op) => op.compute(ctx, out),
            Self::ViscousAvgGrad(op) => op.compute(ctx, out),
            Self::ViscousAvgGradCorrected(op) => op.compute(ctx, out),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Upwind(op) => op.name(),
            Self::CenteredJst(op) => op.name(),
            Self::CenteredLax(op) => op.name(),
            Self::ViscousAvgGrad(op) => op.name(),
            Self::ViscousAvgGradCorrected(op) => op.name(),
        }
    }

    fn config(&self) -> &OperatorConfig {
        match self {
            Self::Upwind(op) => op.config(),
            Self::CenteredJst(op) => op.config(),
            Self::CenteredLax(op) => op.config(),
            Self::ViscousAvgGrad(op) => op.config(),
            Self::ViscousAvgGradCorrected(op) => op.config(),
        }
    }

    fn needs_gradients(&self) -> bool {
        self.kind().is_viscous()
    }

    fn needs_laplacian(&self) -> bool {
        matches!(self, Self::CenteredJst(_))
    }

    fn needs_spectral_radius(&self) -> bool {
        matches!(self, Self::CenteredJst(_) | Self::CenteredLax(_))
    }
}
