//! Per-point flow state.
//!
//! The solved unknowns (p, u, T) are stored as the leading `nVar` entries of
//! each point's primitive vector, so the solution and the primitive state
//! never disagree on them. The remaining entries (ρ, β², μ, μₜ, k, Cp, Cv)
//! are refreshed by [`FlowState::update_primitives`].
//!
//! Solution history for dual time stepping is kept as two extra copies of
//! the unknowns (`n` and `n − 1`).

use crate::equations::{FluidModel, PrimitiveLayout, StandardFluidModel, TransportModel};
use crate::mesh::DualMesh;
use crate::operators::{GradientMethod, compute_gradients};
use crate::parallel::HaloExchange;
use crate::source::AXIS_TOLERANCE;
use crate::types::{GradientBlock, MAX_DIM, MAX_VAR};

/// Lower bound on β².
const BETA2_MIN: f64 = 1e-10;

/// Primitive variables, gradients and time levels of every point.
#[derive(Clone, Debug)]
pub struct FlowState {
    layout: PrimitiveLayout,
    n_point: usize,
    primitive: Vec<f64>,
    solution_n: Vec<f64>,
    solution_n1: Vec<f64>,
    gradient: Vec<GradientBlock>,
    aux_gradient: Vec<[f64; MAX_DIM]>,
    fluid: StandardFluidModel,
    transport: TransportModel,
    beta_factor: f64,
    reference_velocity: f64,
    beta2: f64,
}

impl FlowState {
    /// Zero state for `n_point` points.
    pub fn new(
        layout: PrimitiveLayout,
        n_point: usize,
        fluid: StandardFluidModel,
        transport: TransportModel,
    ) -> Self {
        let n_var = layout.n_var();
        Self {
            layout,
            n_point,
            primitive: vec![0.0; n_point * layout.n_prim()],
            solution_n: vec![0.0; n_point * n_var],
            solution_n1: vec![0.0; n_point * n_var],
            gradient: vec![[[0.0; MAX_DIM]; MAX_VAR]; n_point],
            aux_gradient: vec![[0.0; MAX_DIM]; n_point],
            fluid,
            transport,
            beta_factor: 4.1,
            reference_velocity: 1.0,
            beta2: 1.0,
        }
    }

    /// Set the artificial compressibility parameters.
    ///
    /// `β² = factor · max(max|u|², u_ref²)`, refreshed with the primitives.
    pub fn with_artificial_compressibility(mut self, factor: f64, reference_velocity: f64) -> Self {
        self.beta_factor = factor;
        self.reference_velocity = reference_velocity;
        self
    }

    /// Primitive layout.
    #[inline]
    pub fn layout(&self) -> PrimitiveLayout {
        self.layout
    }

    /// Number of points.
    #[inline]
    pub fn n_point(&self) -> usize {
        self.n_point
    }

    /// Fluid model.
    #[inline]
    pub fn fluid(&self) -> &StandardFluidModel {
        &self.fluid
    }

    /// Transport model.
    #[inline]
    pub fn transport(&self) -> &TransportModel {
        &self.transport
    }

    /// Current β².
    #[inline]
    pub fn beta2(&self) -> f64 {
        self.beta2
    }

    /// Primitive vector of a point.
    #[inline]
    pub fn primitive(&self, point: usize) -> &[f64] {
        let stride = self.layout.n_prim();
        &self.primitive[point * stride..(point + 1) * stride]
    }

    /// All primitive vectors, point-major.
    #[inline]
    pub fn primitives(&self) -> &[f64] {
        &self.primitive
    }

    /// All primitive vectors, mutable (tape registration).
    pub fn primitives_mut(&mut self) -> &mut [f64] {
        &mut self.primitive
    }

    /// Unknowns (p, u, T) of a point.
    #[inline]
    pub fn solution(&self, point: usize) -> &[f64] {
        &self.primitive(point)[..self.layout.n_var()]
    }

    /// Overwrite the unknowns of a point.
    pub fn set_solution(&mut self, point: usize, values: &[f64]) {
        let stride = self.layout.n_prim();
        let n_var = self.layout.n_var();
        self.primitive[point * stride..point * stride + n_var].copy_from_slice(&values[..n_var]);
    }

    /// Overwrite one unknown.
    #[inline]
    pub fn set_variable(&mut self, point: usize, var: usize, value: f64) {
        self.primitive[point * self.layout.n_prim() + var] = value;
    }

    /// Add an increment to the unknowns of a point.
    pub fn add_to_solution(&mut self, point: usize, delta: &[f64]) {
        let stride = self.layout.n_prim();
        let n_var = self.layout.n_var();
        for (x, d) in self.primitive[point * stride..point * stride + n_var]
            .iter_mut()
            .zip(delta)
        {
            *x += d;
        }
    }

    /// Set the same unknowns everywhere.
    pub fn set_uniform(&mut self, values: &[f64]) {
        for p in 0..self.n_point {
            self.set_solution(p, values);
        }
    }

    /// Gradient of the unknowns at a point.
    #[inline]
    pub fn gradient(&self, point: usize) -> &GradientBlock {
        &self.gradient[point]
    }

    /// All gradients.
    #[inline]
    pub fn gradients(&self) -> &[GradientBlock] {
        &self.gradient
    }

    /// All gradients, mutable.
    #[inline]
    pub fn gradients_mut(&mut self) -> &mut [GradientBlock] {
        &mut self.gradient
    }

    /// Recompute the gradients of the unknowns.
    pub fn compute_gradients(&mut self, mesh: &DualMesh, method: GradientMethod) {
        let stride = self.layout.n_prim();
        let primitive = &self.primitive;
        compute_gradients(
            mesh,
            method,
            self.layout.n_var(),
            |p, k| primitive[p * stride + k],
            &mut self.gradient,
        );
    }

    /// Recompute the gradient of `μ_tot·v/y`, zero on the axis.
    pub fn compute_aux_gradient(&mut self, mesh: &DualMesh, method: GradientMethod) {
        let layout = self.layout;
        let stride = layout.n_prim();
        let primitive = &self.primitive;
        let aux = |p: usize, _: usize| {
            let y = mesh.coord(p)[1];
            if y <= AXIS_TOLERANCE {
                return 0.0;
            }
            let v = &primitive[p * stride..(p + 1) * stride];
            let mu = v[layout.laminar_viscosity()] + v[layout.eddy_viscosity()];
            mu * v[layout.velocity(1)] / y
        };
        let mut scratch = vec![[[0.0; MAX_DIM]; MAX_VAR]; self.n_point];
        compute_gradients(mesh, method, 1, aux, &mut scratch);
        for (dst, src) in self.aux_gradient.iter_mut().zip(&scratch) {
            *dst = src[0];
        }
    }

    /// Refresh halo copies of the primitives and gradients.
    pub fn exchange(&mut self, halo: &dyn HaloExchange) {
        halo.exchange(&mut self.primitive, self.layout.n_prim());

        const GRAD_LEN: usize = MAX_VAR * MAX_DIM;
        let mut flat: Vec<f64> = self.gradient.iter().flatten().flatten().copied().collect();
        halo.exchange(&mut flat, GRAD_LEN);
        for (block, chunk) in self.gradient.iter_mut().zip(flat.chunks_exact(GRAD_LEN)) {
            for (row, values) in block.iter_mut().zip(chunk.chunks_exact(MAX_DIM)) {
                row.copy_from_slice(values);
            }
        }
    }

    /// Refresh halo copies of the unknowns only.
    pub fn exchange_solution(&mut self, halo: &dyn HaloExchange) {
        halo.exchange(&mut self.primitive, self.layout.n_prim());
    }

    /// Gradient of the auxiliary scalar at a point.
    #[inline]
    pub fn aux_gradient(&self, point: usize) -> &[f64; MAX_DIM] {
        &self.aux_gradient[point]
    }

    /// Auxiliary gradients, mutable.
    #[inline]
    pub fn aux_gradients_mut(&mut self) -> &mut [[f64; MAX_DIM]] {
        &mut self.aux_gradient
    }

    /// Unknowns at time level n.
    #[inline]
    pub fn solution_time_n(&self, point: usize) -> &[f64] {
        let n_var = self.layout.n_var();
        &self.solution_n[point * n_var..(point + 1) * n_var]
    }

    /// Unknowns at time level n − 1.
    #[inline]
    pub fn solution_time_n1(&self, point: usize) -> &[f64] {
        let n_var = self.layout.n_var();
        &self.solution_n1[point * n_var..(point + 1) * n_var]
    }

    /// Copy the current unknowns to time level n.
    pub fn set_solution_time_n(&mut self) {
        let n_var = self.layout.n_var();
        for p in 0..self.n_point {
            let src = &self.primitive[p * self.layout.n_prim()..][..n_var];
            self.solution_n[p * n_var..(p + 1) * n_var].copy_from_slice(src);
        }
    }

    /// Copy time level n to time level n − 1.
    pub fn set_solution_time_n1(&mut self) {
        self.solution_n1.copy_from_slice(&self.solution_n);
    }

    /// Refresh β² and the thermodynamic and transport entries.
    ///
    /// Returns the number of points with a non-physical temperature; those
    /// points keep their previous properties.
    pub fn update_primitives(&mut self) -> usize {
        let layout = self.layout;
        let stride = layout.n_prim();

        let max_vel2 = (0..self.n_point)
            .map(|p| layout.velocity_sq(self.primitive(p)))
            .fold(0.0, f64::max);
        let ref2 = self.reference_velocity * self.reference_velocity;
        self.beta2 = (self.beta_factor * max_vel2.max(ref2)).max(BETA2_MIN);

        let mut non_physical = 0;
        for p in 0..self.n_point {
            let v = &mut self.primitive[p * stride..(p + 1) * stride];
            v[layout.beta2()] = self.beta2;

            let t = v[layout.temperature()];
            if !(t > 0.0 && t.is_finite()) {
                non_physical += 1;
                continue;
            }
            let state = self.fluid.evaluate(t);
            v[layout.density()] = state.density;
            v[layout.cp()] = state.cp;
            v[layout.cv()] = state.cv;
            v[layout.laminar_viscosity()] = self.transport.laminar_viscosity;
            v[layout.eddy_viscosity()] = 0.0;
            v[layout.conductivity()] = self.transport.thermal_conductivity(state.cp, 0.0);
        }
        non_physical
    }

    /// Primitive vector of a boundary ghost state.
    ///
    /// Thermodynamic and transport entries are evaluated at `temperature`;
    /// β² is the current field value.
    pub fn ghost_state(&self, pressure: f64, velocity: &[f64], temperature: f64) -> Vec<f64> {
        let layout = self.layout;
        let mut v = vec![0.0; layout.n_prim()];
        let state = self.fluid.evaluate(temperature);
        v[layout.pressure()] = pressure;
        for (d, u) in velocity.iter().enumerate().take(layout.n_dim()) {
            v[layout.velocity(d)] = *u;
        }
        v[layout.temperature()] = temperature;
        v[layout.density()] = state.density;
        v[layout.beta2()] = self.beta2;
        v[layout.laminar_viscosity()] = self.transport.laminar_viscosity;
        v[layout.conductivity()] = self.transport.thermal_conductivity(state.cp, 0.0);
        v[layout.cp()] = state.cp;
        v[layout.cv()] = state.cv;
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equations::{ConductivityModel, ConstantDensity, IncIdealGas};

    fn air() -> TransportModel {
        TransportModel::new(
            1.8e-5,
            ConductivityModel::Prandtl {
                laminar: 0.72,
                turbulent: 0.9,
            },
        )
    }

    #[test]
    fn test_update_primitives_constant_density() {
        let layout = PrimitiveLayout::new(2).unwrap();
        let fluid = ConstantDensity::new(1.2, 1000.0).into();
        let mut state = FlowState::new(layout, 3, fluid, air()).with_artificial_compressibility(4.0, 1.0);
        state.set_uniform(&[0.0, 2.0, 0.0, 300.0]);
        assert_eq!(state.update_primitives(), 0);

        let v = state.primitive(1);
        assert_eq!(v[layout.density()], 1.2);
        assert_eq!(v[layout.beta2()], 16.0);
        assert!((v[layout.conductivity()] - 1000.0 * 1.8e-5 / 0.72).abs() < 1e-12);
        assert_eq!(state.solution(1), &[0.0, 2.0, 0.0, 300.0]);
    }

    #[test]
    fn test_reference_velocity_bounds_beta() {
        let layout = PrimitiveLayout::new(2).unwrap();
        let fluid = ConstantDensity::new(1.0, 1.0).into();
        let mut state = FlowState::new(layout, 2, fluid, air()).with_artificial_compressibility(2.0, 3.0);
        state.set_uniform(&[0.0, 0.1, 0.0, 1.0]);
        state.update_primitives();
        assert_eq!(state.beta2(), 18.0);
    }

    #[test]
    fn test_non_physical_temperature_is_counted() {
        let layout = PrimitiveLayout::new(2).unwrap();
        let fluid = IncIdealGas::new(287.0, 101325.0, 1004.5).into();
        let mut state = FlowState::new(layout, 2, fluid, air());
        state.set_uniform(&[0.0, 0.0, 0.0, 300.0]);
        state.set_variable(1, layout.temperature(), -5.0);
        assert_eq!(state.update_primitives(), 1);
        let rho = state.primitive(0)[layout.density()];
        assert!((rho - 101325.0 / (287.0 * 300.0)).abs() < 1e-12);
    }

    #[test]
    fn test_time_levels() {
        let layout = PrimitiveLayout::new(2).unwrap();
        let fluid = ConstantDensity::new(1.0, 1.0).into();
        let mut state = FlowState::new(layout, 1, fluid, air());
        state.set_uniform(&[1.0, 2.0, 3.0, 4.0]);
        state.set_solution_time_n();
        state.add_to_solution(0, &[1.0, 1.0, 1.0, 1.0]);
        state.set_solution_time_n1();
        state.set_solution_time_n();
        assert_eq!(state.solution_time_n(0), &[2.0, 3.0, 4.0, 5.0]);
        assert_eq!(state.solution_time_n1(0), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_ghost_state() {
        let layout = PrimitiveLayout::new(2).unwrap();
        let fluid = ConstantDensity::new(1.2, 1000.0).into();
        let state = FlowState::new(layout, 1, fluid, air());
        let g = state.ghost_state(5.0, &[1.0, 0.0], 310.0);
        assert_eq!(g[layout.pressure()], 5.0);
        assert_eq!(g[layout.velocity(0)], 1.0);
        assert_eq!(g[layout.density()], 1.2);
        assert_eq!(g[layout.cp()], 1000.0);
    }
}
