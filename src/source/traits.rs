//! Point source abstraction.
//!
//! Sources are evaluated once per owned point and added to the residual
//! (`res_i += R`) with their Jacobian on the diagonal block (`J_ii += ∂R/∂V`).

use crate::error::Result;
use crate::flux::OperatorConfig;
use crate::types::{GradientBlock, JacBlock, VarBlock};

/// Inputs of a source at one point.
#[derive(Clone, Copy, Debug)]
pub struct SourceContext<'a> {
    /// Primitive vector
    pub v: &'a [f64],
    /// Point coordinates
    pub coord: &'a [f64],
    /// Dual-cell volume
    pub volume: f64,
    /// Gradients of the solved variables
    pub gradient: Option<&'a GradientBlock>,
    /// Gradient of the auxiliary scalar `μ_tot·v/y` (axisymmetric only)
    pub aux_gradient: Option<&'a [f64]>,
}

impl<'a> SourceContext<'a> {
    /// Context without gradients.
    pub fn new(v: &'a [f64], coord: &'a [f64], volume: f64) -> Self {
        Self {
            v,
            coord,
            volume,
            gradient: None,
            aux_gradient: None,
        }
    }

    /// Set the point gradient.
    pub fn with_gradient(mut self, gradient: &'a GradientBlock) -> Self {
        self.gradient = Some(gradient);
        self
    }

    /// Set the auxiliary gradient.
    pub fn with_aux_gradient(mut self, aux_gradient: &'a [f64]) -> Self {
        self.aux_gradient = Some(aux_gradient);
        self
    }
}

/// Residual and diagonal Jacobian block of a point source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceResidual {
    /// Residual contribution
    pub residual: VarBlock,
    /// ∂R/∂V_i
    pub jacobian: JacBlock,
}

impl SourceResidual {
    /// Zeroed output for `n_var` variables.
    pub fn new(n_var: usize) -> Self {
        Self {
            residual: VarBlock::zeros(n_var),
            jacobian: JacBlock::zeros(n_var),
        }
    }

    /// Zero everything.
    pub fn reset(&mut self) {
        self.residual.set_zero();
        self.jacobian.set_zero();
    }

    /// Zero the energy entry and the energy row/column of the Jacobian.
    pub fn decouple_energy(&mut self, energy_index: usize) {
        self.residual[energy_index] = 0.0;
        self.jacobian.zero_row(energy_index);
        self.jacobian.zero_col(energy_index);
    }
}

/// Per-point source functor.
pub trait PointSource: Send + Sync {
    /// Compute the residual and diagonal Jacobian.
    fn compute(&self, ctx: &SourceContext<'_>, out: &mut SourceResidual);

    /// Name for logging.
    fn name(&self) -> &'static str;

    /// Flags captured at construction.
    fn config(&self) -> &OperatorConfig;

    /// Whether the source reads point gradients.
    fn needs_gradients(&self) -> bool {
        false
    }

    /// Whether the source reads the auxiliary gradient.
    fn needs_aux_gradient(&self) -> bool {
        false
    }
}

/// Closed set of point sources.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StandardSource {
    /// Gravity / body force
    BodyForce(super::BodyForce),
    /// Boussinesq buoyancy
    Boussinesq(super::Boussinesq),
    /// Axisymmetric terms
    Axisymmetric(super::Axisymmetric),
}

impl StandardSource {
    /// Validate that the source is usable in `n_dim` dimensions.
    pub fn check_dimension(&self, n_dim: usize) -> Result<()> {
        match self {
            Self::Axisymmetric(_) => super::Axisymmetric::check_dimension(n_dim),
            _ => Ok(()),
        }
    }
}

impl PointSource for StandardSource {
    #[inline]
    fn compute(&self, ctx: &SourceContext<'_>, out: &mut SourceResidual) {
        match self {
            Self::BodyForce(s) => s.compute(ctx, out),
            Self::Boussinesq(s) => s.compute(ctx, out),
            Self::Axisymmetric(s) => s.compute(ctx, out),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::BodyForce(s) => s.name(),
            Self::Boussinesq(s) => s.name(),
            Self::Axisymmetric(s) => s.name(),
        }
    }

    fn config(&self) -> &OperatorConfig {
        match self {
            Self::BodyForce(s) => s.config(),
            Self::Boussinesq(s) => s.config(),
            Self::Axisymmetric(s) => s.config(),
        }
    }

    fn needs_gradients(&self) -> bool {
        match self {
            Self::Axisymmetric(s) => s.needs_gradients(),
            _ => false,
        }
    }

    fn needs_aux_gradient(&self) -> bool {
        match self {
            Self::Axisymmetric(s) => s.needs_aux_gradient(),
            _ => false,
        }
    }
}
