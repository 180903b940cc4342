//! Equations of state for incompressible flow.
//!
//! The incompressible formulation never derives pressure from density. The
//! fluid model only maps temperature (at a fixed operating pressure) to
//! density and heat capacities:
//!
//! - [`ConstantDensity`]: ρ is fixed; the energy equation evolves T
//!   independently because ρ does not depend on it.
//! - [`IncIdealGas`]: ρ = P₀ / (R·T) with a constant operating pressure P₀
//!   that is decoupled from the momentum equations. Used for buoyancy-driven
//!   flows where density must follow temperature.
//!
//! Both models use the γ = 1 convention (Cp = Cv).
//!
//! # Preconditions
//!
//! Temperatures passed to [`FluidModel::evaluate`] must be strictly positive.
//! This is the caller's responsibility and is not checked.

use serde::{Deserialize, Serialize};

/// Thermodynamic state produced by a fluid model at one temperature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluidState {
    /// Density (kg/m³)
    pub density: f64,
    /// Temperature (K)
    pub temperature: f64,
    /// Operating pressure (Pa); zero for constant density
    pub pressure: f64,
    /// Specific heat at constant pressure (J/(kg·K))
    pub cp: f64,
    /// Specific heat at constant volume (J/(kg·K))
    pub cv: f64,
    /// Ratio of specific heats (always 1 here)
    pub gamma: f64,
    /// Derivative of density with respect to temperature at constant pressure
    pub d_rho_d_t: f64,
}

/// Equation of state contract.
///
/// Implementations are stateless in the sense that [`FluidModel::evaluate`]
/// depends only on the model parameters and the input temperature, so one
/// model is shared read-only by every edge operator during a residual pass.
pub trait FluidModel: Send + Sync {
    /// Evaluate the thermodynamic state at temperature `t`.
    fn evaluate(&self, t: f64) -> FluidState;

    /// Whether density varies with temperature.
    fn is_variable_density(&self) -> bool;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;
}

// =============================================================================
// Constant density
// =============================================================================

/// Constant-density fluid.
///
/// `set_td_state_t` only stores the temperature; density and heat capacities
/// are fixed.
///
/// # Example
/// ```
/// use incflow::equations::{ConstantDensity, FluidModel};
///
/// let mut water = ConstantDensity::new(998.2, 4182.0);
/// water.set_td_state_t(293.15);
/// assert_eq!(water.density(), 998.2);
/// assert_eq!(water.temperature(), 293.15);
/// assert_eq!(water.cp(), water.cv());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantDensity {
    density: f64,
    cp: f64,
    temperature: f64,
}

impl ConstantDensity {
    /// Create a constant-density model.
    pub fn new(density: f64, cp: f64) -> Self {
        Self {
            density,
            cp,
            temperature: 0.0,
        }
    }

    /// Store the temperature. Density and capacities do not change.
    pub fn set_td_state_t(&mut self, t: f64) {
        self.temperature = t;
    }

    /// Density (kg/m³).
    pub fn density(&self) -> f64 {
        self.density
    }

    /// Last temperature set.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Specific heat at constant pressure.
    pub fn cp(&self) -> f64 {
        self.cp
    }

    /// Specific heat at constant volume (equal to Cp).
    pub fn cv(&self) -> f64 {
        self.cp
    }
}

impl FluidModel for ConstantDensity {
    #[inline]
    fn evaluate(&self, t: f64) -> FluidState {
        FluidState {
            density: self.density,
            temperature: t,
            pressure: 0.0,
            cp: self.cp,
            cv: self.cp,
            gamma: 1.0,
            d_rho_d_t: 0.0,
        }
    }

    fn is_variable_density(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "constant_density"
    }
}

// =============================================================================
// Incompressible ideal gas
// =============================================================================

/// Incompressible ideal gas: ρ = P₀ / (R·T) at a fixed operating pressure.
///
/// # Example
/// ```
/// use incflow::equations::IncIdealGas;
///
/// let mut air = IncIdealGas::new(287.0, 101325.0, 1004.7);
/// air.set_td_state_t(300.0);
/// assert_eq!(air.density(), 101325.0 / (287.0 * 300.0));
/// assert_eq!(air.gamma(), 1.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IncIdealGas {
    gas_constant: f64,
    pressure: f64,
    cp: f64,
    density: f64,
    temperature: f64,
}

impl IncIdealGas {
    /// Create an ideal-gas model with specific gas constant `R`,
    /// operating pressure `P₀` and specific heat `cp`.
    pub fn new(gas_constant: f64, pressure: f64, cp: f64) -> Self {
        Self {
            gas_constant,
            pressure,
            cp,
            density: 0.0,
            temperature: 0.0,
        }
    }

    /// Set the temperature and update the density from the ideal-gas law.
    pub fn set_td_state_t(&mut self, t: f64) {
        self.temperature = t;
        self.density = self.pressure / (self.gas_constant * t);
    }

    /// Density at the last temperature set.
    pub fn density(&self) -> f64 {
        self.density
    }

    /// Last temperature set.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Operating pressure.
    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    /// Specific gas constant.
    pub fn gas_constant(&self) -> f64 {
        self.gas_constant
    }

    /// Specific heat at constant pressure.
    pub fn cp(&self) -> f64 {
        self.cp
    }

    /// Specific heat at constant volume (equal to Cp).
    pub fn cv(&self) -> f64 {
        self.cp
    }

    /// Ratio of specific heats.
    pub fn gamma(&self) -> f64 {
        1.0
    }
}

impl FluidModel for IncIdealGas {
    #[inline]
    fn evaluate(&self, t: f64) -> FluidState {
        let density = self.pressure / (self.gas_constant * t);
        FluidState {
            density,
            temperature: t,
            pressure: self.pressure,
            cp: self.cp,
            cv: self.cp,
            gamma: 1.0,
            d_rho_d_t: -density / t,
        }
    }

    fn is_variable_density(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "inc_ideal_gas"
    }
}

// =============================================================================
// Standard fluid model enum
// =============================================================================

/// Closed set of built-in fluid models, dispatched by `match`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StandardFluidModel {
    /// Constant density
    ConstantDensity(ConstantDensity),
    /// Incompressible ideal gas
    IncIdealGas(IncIdealGas),
}

impl FluidModel for StandardFluidModel {
    #[inline]
    fn evaluate(&self, t: f64) -> FluidState {
        match self {
            Self::ConstantDensity(m) => m.evaluate(t),
            Self::IncIdealGas(m) => m.evaluate(t),
        }
    }

    fn is_variable_density(&self) -> bool {
        match self {
            Self::ConstantDensity(m) => m.is_variable_density(),
            Self::IncIdealGas(m) => m.is_variable_density(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::ConstantDensity(m) => m.name(),
            Self::IncIdealGas(m) => m.name(),
        }
    }
}

impl From<ConstantDensity> for StandardFluidModel {
    fn from(m: ConstantDensity) -> Self {
        Self::ConstantDensity(m)
    }
}

impl From<IncIdealGas> for StandardFluidModel {
    fn from(m: IncIdealGas) -> Self {
        Self::IncIdealGas(m)
    }
}
