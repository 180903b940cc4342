//! Primitive-variable layout for the incompressible system.
//!
//! Every point carries a primitive vector `V` of length `nDim + 9`:
//!
//! | index      | quantity                         |
//! |------------|----------------------------------|
//! | 0          | pressure p                       |
//! | 1..=nDim   | velocity components              |
//! | nDim + 1   | temperature T                    |
//! | nDim + 2   | density ρ                        |
//! | nDim + 3   | artificial compressibility β²    |
//! | nDim + 4   | laminar viscosity μ              |
//! | nDim + 5   | eddy viscosity μₜ                |
//! | nDim + 6   | thermal conductivity k           |
//! | nDim + 7   | specific heat Cp                 |
//! | nDim + 8   | specific heat Cv                 |
//!
//! The solved unknowns are the first `nVar = nDim + 2` entries (p, u, T),
//! so primitive differences over `0..nVar` are differences of unknowns.

use crate::error::{Result, SolverError};

/// Index map for the primitive vector of a given dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrimitiveLayout {
    n_dim: usize,
}

impl PrimitiveLayout {
    /// Layout for `n_dim` spatial dimensions (2 or 3).
    pub fn new(n_dim: usize) -> Result<Self> {
        if n_dim == 2 || n_dim == 3 {
            Ok(Self { n_dim })
        } else {
            Err(SolverError::UnsupportedDimension(n_dim))
        }
    }

    /// Layout without the dimension check, for dimensions validated upstream.
    #[inline]
    pub(crate) const fn from_dim(n_dim: usize) -> Self {
        Self { n_dim }
    }

    /// Spatial dimension.
    #[inline]
    pub const fn n_dim(&self) -> usize {
        self.n_dim
    }

    /// Number of solved variables.
    #[inline]
    pub const fn n_var(&self) -> usize {
        self.n_dim + 2
    }

    /// Length of the primitive vector.
    #[inline]
    pub const fn n_prim(&self) -> usize {
        self.n_dim + 9
    }

    /// Pressure index.
    #[inline]
    pub const fn pressure(&self) -> usize {
        0
    }

    /// Velocity component index.
    #[inline]
    pub const fn velocity(&self, dim: usize) -> usize {
        1 + dim
    }

    /// Temperature index (also the energy row of residuals and Jacobians).
    #[inline]
    pub const fn temperature(&self) -> usize {
        self.n_dim + 1
    }

    /// Density index.
    #[inline]
    pub const fn density(&self) -> usize {
        self.n_dim + 2
    }

    /// β² index.
    #[inline]
    pub const fn beta2(&self) -> usize {
        self.n_dim + 3
    }

    /// Laminar viscosity index.
    #[inline]
    pub const fn laminar_viscosity(&self) -> usize {
        self.n_dim + 4
    }

    /// Eddy viscosity index.
    #[inline]
    pub const fn eddy_viscosity(&self) -> usize {
        self.n_dim + 5
    }

    /// Thermal conductivity index.
    #[inline]
    pub const fn conductivity(&self) -> usize {
        self.n_dim + 6
    }

    /// Cp index.
    #[inline]
    pub const fn cp(&self) -> usize {
        self.n_dim + 7
    }

    /// Cv index.
    #[inline]
    pub const fn cv(&self) -> usize {
        self.n_dim + 8
    }

    /// Velocity slice of a primitive vector.
    #[inline]
    pub fn velocity_slice<'a>(&self, v: &'a [f64]) -> &'a [f64] {
        &v[1..=self.n_dim]
    }

    /// Velocity projected on `normal`.
    #[inline]
    pub fn projected_velocity(&self, v: &[f64], normal: &[f64]) -> f64 {
        self.velocity_slice(v)
            .iter()
            .zip(normal)
            .map(|(u, n)| u * n)
            .sum()
    }

    /// Squared velocity magnitude.
    #[inline]
    pub fn velocity_sq(&self, v: &[f64]) -> f64 {
        self.velocity_slice(v).iter().map(|u| u * u).sum()
    }

    /// Check that a primitive vector has the right length.
    pub fn check(&self, v: &[f64]) -> Result<()> {
        if v.len() == self.n_prim() {
            Ok(())
        } else {
            Err(SolverError::LengthMismatch {
                what: "primitive vector",
                expected: self.n_prim(),
                found: v.len(),
            })
        }
    }
}

/// Values needed to fill one primitive vector.
///
/// A builder for tests, demos and boundary ghost states.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveBuilder {
    layout: PrimitiveLayout,
    values: Vec<f64>,
}

impl PrimitiveBuilder {
    /// Start from a zero vector.
    pub fn new(layout: PrimitiveLayout) -> Self {
        Self {
            layout,
            values: vec![0.0; layout.n_prim()],
        }
    }

    /// Set pressure.
    pub fn pressure(mut self, p: f64) -> Self {
        self.values[self.layout.pressure()] = p;
        self
    }

    /// Set velocity (length must match `nDim`).
    pub fn velocity(mut self, vel: &[f64]) -> Self {
        for (d, &u) in vel.iter().enumerate().take(self.layout.n_dim()) {
            self.values[self.layout.velocity(d)] = u;
        }
        self
    }

    /// Set temperature.
    pub fn temperature(mut self, t: f64) -> Self {
        self.values[self.layout.temperature()] = t;
        self
    }

    /// Set density.
    pub fn density(mut self, rho: f64) -> Self {
        self.values[self.layout.density()] = rho;
        self
    }

    /// Set β².
    pub fn beta2(mut self, beta2: f64) -> Self {
        self.values[self.layout.beta2()] = beta2;
        self
    }

    /// Set laminar and eddy viscosity.
    pub fn viscosity(mut self, mu_lam: f64, mu_eddy: f64) -> Self {
        self.values[self.layout.laminar_viscosity()] = mu_lam;
        self.values[self.layout.eddy_viscosity()] = mu_eddy;
        self
    }

    /// Set thermal conductivity.
    pub fn conductivity(mut self, k: f64) -> Self {
        self.values[self.layout.conductivity()] = k;
        self
    }

    /// Set Cp and Cv.
    pub fn heat_capacity(mut self, cp: f64, cv: f64) -> Self {
        self.values[self.layout.cp()] = cp;
        self.values[self.layout.cv()] = cv;
        self
    }

    /// Finish.
    pub fn build(self) -> Vec<f64> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_2d() {
        let l = PrimitiveLayout::new(2).unwrap();
        assert_eq!(l.n_var(), 4);
        assert_eq!(l.n_prim(), 11);
        assert_eq!(l.temperature(), 3);
        assert_eq!(l.density(), 4);
        assert_eq!(l.cp(), 9);
    }

    #[test]
    fn test_layout_rejects_1d() {
        assert!(matches!(
            PrimitiveLayout::new(1),
            Err(SolverError::UnsupportedDimension(1))
        ));
    }

    #[test]
    fn test_builder() {
        let l = PrimitiveLayout::new(3).unwrap();
        let v = PrimitiveBuilder::new(l)
            .pressure(1.0)
            .velocity(&[2.0, 3.0, 4.0])
            .temperature(300.0)
            .density(1.2)
            .build();
        assert_eq!(v.len(), 12);
        assert_eq!(v[0], 1.0);
        assert_eq!(l.velocity_slice(&v), &[2.0, 3.0, 4.0]);
        assert_eq!(v[l.temperature()], 300.0);
        assert_eq!(l.projected_velocity(&v, &[1.0, 0.0, 1.0]), 6.0);
        assert!(l.check(&v).is_ok());
        assert!(l.check(&v[..5]).is_err());
    }
}
