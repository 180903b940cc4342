//! Wall heat flux monitoring.

use serde::{Deserialize, Serialize};

/// Integrated heat flux of one wall marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerHeatFlux {
    /// Marker tag
    pub tag: String,
    /// `Σ k·∂T/∂n·A` into the fluid (W, or W/m in 2D)
    pub heat_flux: f64,
    /// Area-weighted wall temperature, for heat-flux walls
    pub average_temperature: Option<f64>,
    /// Owned wall area
    pub area: f64,
}

/// Heat flux of every wall marker plus totals over the monitored ones.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatFluxReport {
    /// Per-marker values
    pub markers: Vec<MarkerHeatFlux>,
    /// Sum over monitored markers
    pub total_heat_flux: f64,
    /// Maximum absolute marker heat flux over monitored markers
    pub max_heat_flux: f64,
    /// Area-weighted temperature over monitored heat-flux walls
    pub average_temperature: Option<f64>,
    #[serde(skip)]
    temperature_area: (f64, f64),
}

impl HeatFluxReport {
    /// Add a marker result.
    pub fn push(&mut self, marker: MarkerHeatFlux, monitored: bool) {
        if monitored {
            self.total_heat_flux += marker.heat_flux;
            self.max_heat_flux = self.max_heat_flux.max(marker.heat_flux.abs());
            if let Some(t) = marker.average_temperature {
                let (weighted, area) = &mut self.temperature_area;
                *weighted += t * marker.area;
                *area += marker.area;
                self.average_temperature = (*area > 0.0).then(|| *weighted / *area);
            }
        }
        self.markers.push(marker);
    }

    /// Look up a marker by tag.
    pub fn marker(&self, tag: &str) -> Option<&MarkerHeatFlux> {
        self.markers.iter().find(|m| m.tag == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(tag: &str, q: f64, t: Option<f64>, area: f64) -> MarkerHeatFlux {
        MarkerHeatFlux {
            tag: tag.to_string(),
            heat_flux: q,
            average_temperature: t,
            area,
        }
    }

    #[test]
    fn test_totals_only_count_monitored() {
        let mut report = HeatFluxReport::default();
        report.push(wall("hot", 10.0, Some(320.0), 1.0), true);
        report.push(wall("cold", -4.0, None, 1.0), true);
        report.push(wall("side", 100.0, Some(500.0), 3.0), false);
        report.push(wall("warm", 1.0, Some(300.0), 3.0), true);

        assert_eq!(report.markers.len(), 4);
        assert!((report.total_heat_flux - 7.0).abs() < 1e-12);
        assert_eq!(report.max_heat_flux, 10.0);
        let t = report.average_temperature.unwrap();
        assert!((t - (320.0 + 900.0) / 4.0).abs() < 1e-12);
        assert_eq!(report.marker("side").unwrap().heat_flux, 100.0);
    }
}
