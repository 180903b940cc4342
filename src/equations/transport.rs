//! Molecular transport properties.
//!
//! Laminar viscosity is constant. Thermal conductivity either follows from
//! Prandtl numbers, `k = Cp·μ/Pr + Cp·μₜ/Prₜ`, or is a fixed value.

use serde::{Deserialize, Serialize};

/// Thermal conductivity model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConductivityModel {
    /// From laminar and turbulent Prandtl numbers
    Prandtl {
        /// Laminar Prandtl number
        laminar: f64,
        /// Turbulent Prandtl number
        turbulent: f64,
    },
    /// Fixed conductivity
    Constant {
        /// k (W/(m·K))
        conductivity: f64,
    },
}

impl Default for ConductivityModel {
    fn default() -> Self {
        Self::Prandtl {
            laminar: 0.72,
            turbulent: 0.9,
        }
    }
}

/// Viscosity and conductivity of the fluid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransportModel {
    /// Laminar dynamic viscosity (Pa·s)
    pub laminar_viscosity: f64,
    /// Conductivity model
    #[serde(default)]
    pub conductivity: ConductivityModel,
}

impl TransportModel {
    /// Constant viscosity with Prandtl-number conductivity.
    pub fn new(laminar_viscosity: f64, conductivity: ConductivityModel) -> Self {
        Self {
            laminar_viscosity,
            conductivity,
        }
    }

    /// Inviscid fluid.
    pub fn inviscid() -> Self {
        Self {
            laminar_viscosity: 0.0,
            conductivity: ConductivityModel::Constant { conductivity: 0.0 },
        }
    }

    /// Thermal conductivity for a given Cp and eddy viscosity.
    #[inline]
    pub fn thermal_conductivity(&self, cp: f64, eddy_viscosity: f64) -> f64 {
        match self.conductivity {
            ConductivityModel::Prandtl { laminar, turbulent } => {
                cp * self.laminar_viscosity / laminar + cp * eddy_viscosity / turbulent
            }
            ConductivityModel::Constant { conductivity } => conductivity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prandtl_conductivity() {
        let t = TransportModel::new(
            1.8e-5,
            ConductivityModel::Prandtl {
                laminar: 0.72,
                turbulent: 0.9,
            },
        );
        let k = t.thermal_conductivity(1004.5, 0.0);
        assert!((k - 1004.5 * 1.8e-5 / 0.72).abs() < 1e-12);
        let k_turb = t.thermal_conductivity(1004.5, 9.0e-5);
        assert!((k_turb - k - 1004.5 * 9.0e-5 / 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_constant_conductivity_serde() {
        let json = r#"{"laminar_viscosity":1e-3,"conductivity":{"kind":"constant","conductivity":0.6}}"#;
        let t: TransportModel = serde_json::from_str(json).unwrap();
        assert_eq!(t.thermal_conductivity(4182.0, 1.0), 0.6);
    }
}
