//! Linear passive components: resistor, capacitor, inductor.
//!
//! The reactive elements use Backward Euler companion models: for one
//! step the capacitor becomes G_eq = C/dt in parallel with a current
//! source G_eq·V_prev, and the inductor becomes G_eq = dt/L in parallel
//! with a current source carrying its previous current.

use nalgebra::DVector;

use super::{branch_voltage, Stamp};
use crate::circuit::NodeId;
use crate::mna::MnaSystem;

/// Conductance standing in for an inductor at dt = 0: a near-short that
/// keeps the DC system free of extra auxiliary rows.
const INDUCTOR_DC_CONDUCTANCE: f64 = 1.0 / 1e-9;

/// An ideal resistor between two nodes.
#[derive(Debug, Clone)]
pub struct Resistor {
    pub n1: NodeId,
    pub n2: NodeId,
    /// Resistance in ohms. Mutable between solves; takes effect on the
    /// next assembly pass.
    pub resistance: f64,
}

impl Resistor {
    pub fn new(n1: NodeId, n2: NodeId, resistance: f64) -> Self {
        Resistor { n1, n2, resistance }
    }

    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }
}

impl Stamp for Resistor {
    fn stamp(&self, system: &mut MnaSystem, _dt: f64) {
        system.stamp_conductance(self.n1, self.n2, self.conductance());
    }
}

/// A capacitor between two nodes, open at DC.
#[derive(Debug, Clone)]
pub struct Capacitor {
    pub n1: NodeId,
    pub n2: NodeId,
    /// Capacitance in farads.
    pub capacitance: f64,
    /// Voltage across from the previous accepted step.
    v_prev: f64,
}

impl Capacitor {
    pub fn new(n1: NodeId, n2: NodeId, capacitance: f64) -> Self {
        Capacitor {
            n1,
            n2,
            capacitance,
            v_prev: 0.0,
        }
    }

    /// Voltage across from the previous accepted step.
    pub fn voltage(&self) -> f64 {
        self.v_prev
    }
}

impl Stamp for Capacitor {
    fn stamp(&self, system: &mut MnaSystem, dt: f64) {
        // I = C·(V - V_prev)/dt = G_eq·V - G_eq·V_prev; the constant term
        // moves to the RHS as a companion current source. At dt <= 0 the
        // capacitor is an open circuit and contributes nothing.
        if dt <= 0.0 {
            return;
        }
        let g_eq = self.capacitance / dt;
        let i_eq = g_eq * self.v_prev;
        system.stamp_conductance(self.n1, self.n2, g_eq);
        system.stamp_current_source(self.n2, self.n1, i_eq);
    }

    fn update_state(&mut self, x: &DVector<f64>, dt: f64) {
        if dt > 0.0 {
            self.v_prev = branch_voltage(x, self.n1, self.n2);
        }
    }

    fn requires_per_step_restamp(&self) -> bool {
        true
    }
}

/// An inductor between two nodes, a near-short at DC.
#[derive(Debug, Clone)]
pub struct Inductor {
    pub n1: NodeId,
    pub n2: NodeId,
    /// Inductance in henries.
    pub inductance: f64,
    /// Current through from the previous accepted step, flowing n1 -> n2.
    i_prev: f64,
}

impl Inductor {
    pub fn new(n1: NodeId, n2: NodeId, inductance: f64) -> Self {
        Inductor {
            n1,
            n2,
            inductance,
            i_prev: 0.0,
        }
    }

    /// Current through from the previous accepted step.
    pub fn current(&self) -> f64 {
        self.i_prev
    }
}

impl Stamp for Inductor {
    fn stamp(&self, system: &mut MnaSystem, dt: f64) {
        if dt > 0.0 {
            let g_eq = dt / self.inductance;
            system.stamp_conductance(self.n1, self.n2, g_eq);
            system.stamp_current_source(self.n1, self.n2, self.i_prev);
        } else if dt == 0.0 {
            system.stamp_conductance(self.n1, self.n2, INDUCTOR_DC_CONDUCTANCE);
        }
    }

    fn update_state(&mut self, x: &DVector<f64>, dt: f64) {
        // Backward Euler: I_n = I_{n-1} + (dt/L)·V_n.
        if dt > 0.0 {
            self.i_prev += dt / self.inductance * branch_voltage(x, self.n1, self.n2);
        }
    }

    fn requires_per_step_restamp(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn system() -> MnaSystem {
        let mut sys = MnaSystem::new();
        sys.resize(3, 0);
        sys
    }

    #[test]
    fn test_resistor_stamp_block() {
        let mut sys = system();
        let r = Resistor::new(NodeId(1), NodeId(2), 100.0);
        r.stamp(&mut sys, 0.0);

        let m = sys.compressed();
        assert_eq!(m.get(1, 1), Some(&0.01));
        assert_eq!(m.get(2, 2), Some(&0.01));
        assert_eq!(m.get(1, 2), Some(&-0.01));
        assert_eq!(m.get(2, 1), Some(&-0.01));
    }

    #[test]
    fn test_capacitor_open_at_dc() {
        let mut sys = system();
        let c = Capacitor::new(NodeId(1), NodeId(0), 1e-6);
        c.stamp(&mut sys, 0.0);
        assert!(sys.triplets().is_empty());
        assert_eq!(sys.rhs()[1], 0.0);
    }

    #[test]
    fn test_capacitor_companion_model() {
        let mut sys = system();
        let mut c = Capacitor::new(NodeId(1), NodeId(0), 1e-6);

        // Seed one step of history: V across = 2 V.
        let mut x = DVector::zeros(3);
        x[1] = 2.0;
        c.update_state(&x, 1e-4);
        assert_relative_eq!(c.voltage(), 2.0);

        c.stamp(&mut sys, 1e-4);
        let g_eq = 1e-6 / 1e-4;
        assert_relative_eq!(sys.rhs()[1], g_eq * 2.0);
        let m = sys.compressed();
        assert_relative_eq!(*m.get(1, 1).unwrap(), g_eq);
    }

    #[test]
    fn test_inductor_near_short_at_dc() {
        let mut sys = system();
        let l = Inductor::new(NodeId(1), NodeId(2), 1e-3);
        l.stamp(&mut sys, 0.0);

        let m = sys.compressed();
        assert_relative_eq!(*m.get(1, 1).unwrap(), 1e9);
    }

    #[test]
    fn test_inductor_contributes_nothing_for_negative_dt() {
        let mut sys = system();
        let l = Inductor::new(NodeId(1), NodeId(2), 1e-3);
        l.stamp(&mut sys, -1.0);
        assert!(sys.triplets().is_empty());
    }

    #[test]
    fn test_inductor_backward_euler_update() {
        let mut l = Inductor::new(NodeId(1), NodeId(0), 1e-3);
        let mut x = DVector::zeros(3);
        x[1] = 5.0;

        l.update_state(&x, 1e-4);
        assert_relative_eq!(l.current(), 1e-4 / 1e-3 * 5.0);

        l.update_state(&x, 1e-4);
        assert_relative_eq!(l.current(), 2.0 * (1e-4 / 1e-3) * 5.0);
    }
}
