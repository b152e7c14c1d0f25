//! Ideal 4-terminal transformer.
//!
//! Enforces (V(n1) - V(n2)) - (1/n)·(V(n3) - V(n4)) = 0 with the primary
//! current as auxiliary unknown; the secondary carries -(1/n) times the
//! primary current. Lossless: primary and secondary power balance exactly.

use log::warn;

use super::Stamp;
use crate::circuit::NodeId;
use crate::mna::MnaSystem;

/// An ideal transformer with primary winding n1-n2 and secondary n3-n4.
#[derive(Debug, Clone)]
pub struct Transformer {
    pub n1: NodeId,
    pub n2: NodeId,
    pub n3: NodeId,
    pub n4: NodeId,
    /// Turns ratio n = Ns/Np. Must be nonzero.
    pub ratio: f64,
    matrix_index: Option<usize>,
}

impl Transformer {
    /// Create an ideal transformer. `ratio` must be nonzero; a zero
    /// ratio produces a division by zero during stamping.
    pub fn new(n1: NodeId, n2: NodeId, n3: NodeId, n4: NodeId, ratio: f64) -> Self {
        Transformer {
            n1,
            n2,
            n3,
            n4,
            ratio,
            matrix_index: None,
        }
    }
}

impl Stamp for Transformer {
    fn stamp(&self, system: &mut MnaSystem, _dt: f64) {
        let Some(k) = self.matrix_index else {
            warn!("transformer stamped before its auxiliary row was assigned; skipping");
            return;
        };
        let inv = 1.0 / self.ratio;

        // Winding voltage constraint on row k.
        system.add(k, self.n1.0, 1.0);
        system.add(k, self.n2.0, -1.0);
        system.add(k, self.n3.0, -inv);
        system.add(k, self.n4.0, inv);

        // Primary current into n1, out of n2; the secondary sees -(1/n)
        // of it.
        system.add(self.n1.0, k, 1.0);
        system.add(self.n2.0, k, -1.0);
        system.add(self.n3.0, k, -inv);
        system.add(self.n4.0, k, inv);
    }

    fn has_extra_equation(&self) -> bool {
        true
    }

    fn matrix_index(&self) -> Option<usize> {
        self.matrix_index
    }

    fn assign_matrix_index(&mut self, index: usize) {
        self.matrix_index = Some(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_shape() {
        let mut sys = MnaSystem::new();
        sys.resize(3, 1);
        let mut t = Transformer::new(NodeId(1), NodeId(0), NodeId(2), NodeId(0), 2.0);
        t.assign_matrix_index(3);
        t.stamp(&mut sys, 0.0);

        let m = sys.compressed();
        assert_eq!(m.get(3, 1), Some(&1.0));
        assert_eq!(m.get(3, 2), Some(&-0.5));
        assert_eq!(m.get(1, 3), Some(&1.0));
        assert_eq!(m.get(2, 3), Some(&-0.5));
        // Ground-side halves are suppressed.
        assert_eq!(m.get(3, 0), None);
        assert_eq!(m.get(0, 3), None);
    }

    #[test]
    fn test_skips_without_index() {
        let mut sys = MnaSystem::new();
        sys.resize(3, 1);
        let t = Transformer::new(NodeId(1), NodeId(0), NodeId(2), NodeId(0), 2.0);
        t.stamp(&mut sys, 0.0);
        assert!(sys.triplets().is_empty());
    }
}
