//! Component models and their MNA stamps.
//!
//! Supported kinds: Resistor, VoltageSource, CurrentSource, Capacitor,
//! Inductor, Diode, Transformer. Each kind stamps additive contributions
//! into the coefficient matrix and source vector; reactive elements carry
//! Backward Euler companion state across steps and the diode carries its
//! Newton linearization point.

mod diode;
mod passive;
mod sources;
mod transformer;

pub use diode::Diode;
pub use passive::{Capacitor, Inductor, Resistor};
pub use sources::{CurrentSource, VoltageSource};
pub use transformer::Transformer;

use nalgebra::DVector;

use crate::circuit::NodeId;
use crate::mna::MnaSystem;

/// Behavioral contract every component kind implements.
///
/// `stamp` must write additive contributions only, and must declare its
/// flags truthfully: a component whose stamp depends on the present
/// solution without `requires_iteration`, or on `dt`/mutable parameters
/// without `requires_per_step_restamp`, will be served stale stamps.
pub trait Stamp {
    /// Emit this component's contribution to A and z for one assembly
    /// pass at timestep `dt` (seconds; 0 selects DC semantics).
    fn stamp(&self, system: &mut MnaSystem, dt: f64);

    /// Re-linearize from the freshly published solution. Called once per
    /// Newton iteration; linear components ignore it.
    fn update_operating_point(&mut self, _x: &DVector<f64>) {}

    /// Advance transient history after an accepted solve. Not called when
    /// the solve fails.
    fn update_state(&mut self, _x: &DVector<f64>, _dt: f64) {}

    /// Whether this component owns an auxiliary row in the system.
    fn has_extra_equation(&self) -> bool {
        false
    }

    /// Whether the stamp depends on the present solution, forcing the
    /// Newton loop to run.
    fn requires_iteration(&self) -> bool {
        false
    }

    /// Whether the stamp must be re-emitted on every solve because it
    /// depends on `dt` or on mutable public parameters.
    fn requires_per_step_restamp(&self) -> bool {
        false
    }

    /// Auxiliary row index, assigned during system build; `None` until
    /// then and forever for components without an extra equation.
    fn matrix_index(&self) -> Option<usize> {
        None
    }

    /// Record the auxiliary row index. No-op for components without an
    /// extra equation.
    fn assign_matrix_index(&mut self, _index: usize) {}
}

/// A circuit component.
#[derive(Debug, Clone)]
pub enum Component {
    Resistor(Resistor),
    VoltageSource(VoltageSource),
    CurrentSource(CurrentSource),
    Capacitor(Capacitor),
    Inductor(Inductor),
    Diode(Diode),
    Transformer(Transformer),
}

impl Component {
    pub fn resistor(n1: NodeId, n2: NodeId, resistance: f64) -> Self {
        Component::Resistor(Resistor::new(n1, n2, resistance))
    }

    pub fn voltage_source(n1: NodeId, n2: NodeId, voltage: f64) -> Self {
        Component::VoltageSource(VoltageSource::new(n1, n2, voltage))
    }

    pub fn current_source(n1: NodeId, n2: NodeId, current: f64) -> Self {
        Component::CurrentSource(CurrentSource::new(n1, n2, current))
    }

    pub fn capacitor(n1: NodeId, n2: NodeId, capacitance: f64) -> Self {
        Component::Capacitor(Capacitor::new(n1, n2, capacitance))
    }

    pub fn inductor(n1: NodeId, n2: NodeId, inductance: f64) -> Self {
        Component::Inductor(Inductor::new(n1, n2, inductance))
    }

    pub fn diode(n1: NodeId, n2: NodeId) -> Self {
        Component::Diode(Diode::new(n1, n2))
    }

    pub fn transformer(n1: NodeId, n2: NodeId, n3: NodeId, n4: NodeId, ratio: f64) -> Self {
        Component::Transformer(Transformer::new(n1, n2, n3, n4, ratio))
    }
}

/// Forward a method call to the inner component struct.
macro_rules! dispatch {
    ($self:expr, $method:ident($($args:expr),*)) => {
        match $self {
            Component::Resistor(c) => c.$method($($args),*),
            Component::VoltageSource(c) => c.$method($($args),*),
            Component::CurrentSource(c) => c.$method($($args),*),
            Component::Capacitor(c) => c.$method($($args),*),
            Component::Inductor(c) => c.$method($($args),*),
            Component::Diode(c) => c.$method($($args),*),
            Component::Transformer(c) => c.$method($($args),*),
        }
    };
}

impl Stamp for Component {
    fn stamp(&self, system: &mut MnaSystem, dt: f64) {
        dispatch!(self, stamp(system, dt))
    }

    fn update_operating_point(&mut self, x: &DVector<f64>) {
        dispatch!(self, update_operating_point(x))
    }

    fn update_state(&mut self, x: &DVector<f64>, dt: f64) {
        dispatch!(self, update_state(x, dt))
    }

    fn has_extra_equation(&self) -> bool {
        dispatch!(self, has_extra_equation())
    }

    fn requires_iteration(&self) -> bool {
        dispatch!(self, requires_iteration())
    }

    fn requires_per_step_restamp(&self) -> bool {
        dispatch!(self, requires_per_step_restamp())
    }

    fn matrix_index(&self) -> Option<usize> {
        dispatch!(self, matrix_index())
    }

    fn assign_matrix_index(&mut self, index: usize) {
        dispatch!(self, assign_matrix_index(index))
    }
}

/// Voltage between two nodes read from a solution vector. Row indices
/// coincide with node ids and the ground row is pinned to zero, so this
/// is a plain subtraction.
pub(crate) fn branch_voltage(x: &DVector<f64>, n1: NodeId, n2: NodeId) -> f64 {
    x[n1.0] - x[n2.0]
}
