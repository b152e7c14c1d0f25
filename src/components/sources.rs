//! Independent voltage and current sources.

use log::warn;

use super::Stamp;
use crate::circuit::NodeId;
use crate::mna::MnaSystem;

/// An ideal voltage source enforcing V(n1) - V(n2) = `voltage`.
///
/// The auxiliary unknown at its matrix index is the branch current
/// flowing n1 -> n2 through the source, observable for power accounting.
#[derive(Debug, Clone)]
pub struct VoltageSource {
    pub n1: NodeId,
    pub n2: NodeId,
    /// Source voltage in volts. Mutable between solves.
    pub voltage: f64,
    matrix_index: Option<usize>,
}

impl VoltageSource {
    pub fn new(n1: NodeId, n2: NodeId, voltage: f64) -> Self {
        VoltageSource {
            n1,
            n2,
            voltage,
            matrix_index: None,
        }
    }
}

impl Stamp for VoltageSource {
    fn stamp(&self, system: &mut MnaSystem, _dt: f64) {
        let Some(branch) = self.matrix_index else {
            warn!("voltage source stamped before its auxiliary row was assigned; skipping");
            return;
        };
        system.stamp_voltage_source(self.n1, self.n2, branch, self.voltage);
    }

    fn has_extra_equation(&self) -> bool {
        true
    }

    fn requires_per_step_restamp(&self) -> bool {
        true
    }

    fn matrix_index(&self) -> Option<usize> {
        self.matrix_index
    }

    fn assign_matrix_index(&mut self, index: usize) {
        self.matrix_index = Some(index);
    }
}

/// An ideal current source driving `current` amps from n1 through the
/// source into n2.
#[derive(Debug, Clone)]
pub struct CurrentSource {
    pub n1: NodeId,
    pub n2: NodeId,
    /// Source current in amps. Mutable between solves.
    pub current: f64,
}

impl CurrentSource {
    pub fn new(n1: NodeId, n2: NodeId, current: f64) -> Self {
        CurrentSource { n1, n2, current }
    }
}

impl Stamp for CurrentSource {
    fn stamp(&self, system: &mut MnaSystem, _dt: f64) {
        system.stamp_current_source(self.n1, self.n2, self.current);
    }

    fn requires_per_step_restamp(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voltage_source_skips_without_index() {
        let mut sys = MnaSystem::new();
        sys.resize(2, 1);
        let vs = VoltageSource::new(NodeId(1), NodeId(0), 5.0);
        vs.stamp(&mut sys, 0.0);
        assert!(sys.triplets().is_empty());
    }

    #[test]
    fn test_voltage_source_stamps_assigned_row() {
        let mut sys = MnaSystem::new();
        sys.resize(2, 1);
        let mut vs = VoltageSource::new(NodeId(1), NodeId(0), 5.0);
        vs.assign_matrix_index(2);
        vs.stamp(&mut sys, 0.0);
        assert_eq!(sys.rhs()[2], 5.0);
    }

    #[test]
    fn test_current_source_rhs_only() {
        let mut sys = MnaSystem::new();
        sys.resize(3, 0);
        let cs = CurrentSource::new(NodeId(1), NodeId(2), 0.5);
        cs.stamp(&mut sys, 0.0);

        assert!(sys.triplets().is_empty());
        assert_eq!(sys.rhs()[1], -0.5);
        assert_eq!(sys.rhs()[2], 0.5);
    }
}
