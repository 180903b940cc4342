//! Per-marker boundary configuration.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Coupling mode of a conjugate heat transfer interface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChtMode {
    /// Wall temperature imposed from the coupled solver
    #[default]
    Temperature,
    /// Heat flux from the coupled conductance and temperature
    HeatFlux,
}

/// Boundary condition kind and its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerKind {
    /// No-slip wall with prescribed heat flux into the fluid (W/m²)
    HeatFluxWall {
        heat_flux: f64,
        /// Interpret `heat_flux` as a total (W) spread over the marker area
        #[serde(default)]
        integrated: bool,
    },
    /// No-slip wall at fixed temperature
    IsothermalWall { temperature: f64 },
    /// Velocity inlet
    Inlet {
        velocity_magnitude: f64,
        flow_direction: Vec<f64>,
        temperature: f64,
    },
    /// Pressure outlet
    Outlet { pressure: f64 },
    /// Slip wall
    Symmetry,
    /// Conjugate heat transfer interface
    ChtInterface {
        #[serde(default)]
        mode: ChtMode,
    },
}

impl MarkerKind {
    /// True for no-slip walls (including CHT interfaces).
    pub fn is_wall(&self) -> bool {
        matches!(
            self,
            Self::HeatFluxWall { .. } | Self::IsothermalWall { .. } | Self::ChtInterface { .. }
        )
    }
}

/// Configuration of one boundary marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Mesh marker tag
    pub tag: String,
    /// Condition
    #[serde(flatten)]
    pub kind: MarkerKind,
    /// Include in heat flux totals
    #[serde(default)]
    pub monitored: bool,
}

impl MarkerConfig {
    /// Create an unmonitored marker.
    pub fn new(tag: impl Into<String>, kind: MarkerKind) -> Self {
        Self {
            tag: tag.into(),
            kind,
            monitored: false,
        }
    }

    /// Include this marker in heat flux totals.
    pub fn monitored(mut self) -> Self {
        self.monitored = true;
        self
    }

    /// Check parameters against the mesh dimension.
    pub fn validate(&self, n_dim: usize) -> Result<(), ConfigError> {
        let invalid = |field: &str, value: String, reason: &str| ConfigError::InvalidValue {
            key: format!("markers.{}.{}", self.tag, field),
            value,
            reason: reason.to_string(),
        };
        let positive = |field: &str, value: f64| {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(invalid(field, value.to_string(), "must be positive and finite"))
            }
        };

        match &self.kind {
            MarkerKind::HeatFluxWall { heat_flux, .. } => {
                if !heat_flux.is_finite() {
                    return Err(invalid("heat_flux", heat_flux.to_string(), "must be finite"));
                }
            }
            MarkerKind::IsothermalWall { temperature } => positive("temperature", *temperature)?,
            MarkerKind::Inlet {
                velocity_magnitude,
                flow_direction,
                temperature,
            } => {
                positive("temperature", *temperature)?;
                if !velocity_magnitude.is_finite() {
                    return Err(invalid(
                        "velocity_magnitude",
                        velocity_magnitude.to_string(),
                        "must be finite",
                    ));
                }
                if flow_direction.len() != n_dim {
                    return Err(invalid(
                        "flow_direction",
                        format!("{flow_direction:?}"),
                        "length must equal the mesh dimension",
                    ));
                }
                let norm: f64 = flow_direction.iter().map(|d| d * d).sum::<f64>().sqrt();
                if !(norm > 0.0 && norm.is_finite()) {
                    return Err(invalid(
                        "flow_direction",
                        format!("{flow_direction:?}"),
                        "must be a nonzero finite vector",
                    ));
                }
            }
            MarkerKind::Outlet { pressure } => {
                if !pressure.is_finite() {
                    return Err(invalid("pressure", pressure.to_string(), "must be finite"));
                }
            }
            MarkerKind::Symmetry | MarkerKind::ChtInterface { .. } => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_serde_flattened() {
        let json = r#"{"tag":"inlet","kind":"inlet","velocity_magnitude":2.0,"flow_direction":[1.0,0.0],"temperature":300.0}"#;
        let marker: MarkerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(marker.tag, "inlet");
        assert!(!marker.monitored);
        assert!(matches!(marker.kind, MarkerKind::Inlet { .. }));
        marker.validate(2).unwrap();

        let cht: MarkerConfig =
            serde_json::from_str(r#"{"tag":"solid","kind":"cht_interface","monitored":true}"#).unwrap();
        assert_eq!(cht.kind, MarkerKind::ChtInterface { mode: ChtMode::Temperature });
        assert!(cht.kind.is_wall());
    }

    #[test]
    fn test_validate_inlet_direction() {
        let marker = MarkerConfig::new(
            "inlet",
            MarkerKind::Inlet {
                velocity_magnitude: 1.0,
                flow_direction: vec![0.0, 0.0],
                temperature: 300.0,
            },
        );
        assert!(matches!(
            marker.validate(2),
            Err(ConfigError::InvalidValue { .. })
        ));
        let wrong_len = MarkerConfig::new(
            "inlet",
            MarkerKind::Inlet {
                velocity_magnitude: 1.0,
                flow_direction: vec![1.0, 0.0, 0.0],
                temperature: 300.0,
            },
        );
        assert!(wrong_len.validate(2).is_err());
    }

    #[test]
    fn test_validate_wall_temperature() {
        let marker = MarkerConfig::new("wall", MarkerKind::IsothermalWall { temperature: -1.0 });
        let err = marker.validate(2).unwrap_err();
        assert!(err.to_string().contains("markers.wall.temperature"));
    }
}
