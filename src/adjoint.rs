//! Registration contract with a reverse-mode differentiation tape.
//!
//! The residual assembly is a pure function of the flow state, the mesh and
//! the configuration. A discrete-adjoint driver marks the state as input
//! before assembly and the residual as output afterwards; nothing else in the
//! assembly reads or writes hidden state.

/// External tape that records differentiation inputs and outputs.
pub trait AdjointTape {
    /// Mark `values` as independent variables.
    fn register_input(&mut self, values: &mut [f64]);

    /// Mark `values` as dependent variables.
    fn register_output(&mut self, values: &mut [f64]);
}

/// Kind of a recorded registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// Independent variables
    Input(usize),
    /// Dependent variables
    Output(usize),
}

/// Tape that only records what was registered, in order.
#[derive(Clone, Debug, Default)]
pub struct RecordingTape {
    events: Vec<Registration>,
}

impl RecordingTape {
    /// Empty tape.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registrations so far.
    pub fn events(&self) -> &[Registration] {
        &self.events
    }

    /// Total number of registered inputs.
    pub fn n_inputs(&self) -> usize {
        self.events
            .iter()
            .map(|e| match e {
                Registration::Input(n) => *n,
                Registration::Output(_) => 0,
            })
            .sum()
    }

    /// Total number of registered outputs.
    pub fn n_outputs(&self) -> usize {
        self.events
            .iter()
            .map(|e| match e {
                Registration::Output(n) => *n,
                Registration::Input(_) => 0,
            })
            .sum()
    }
}

impl AdjointTape for RecordingTape {
    fn register_input(&mut self, values: &mut [f64]) {
        self.events.push(Registration::Input(values.len()));
    }

    fn register_output(&mut self, values: &mut [f64]) {
        self.events.push(Registration::Output(values.len()));
    }
}
