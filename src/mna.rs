//! MNA system storage: [A][x] = [z].
//!
//! The coefficient matrix is accumulated as coordinate triplets during
//! stamping and converted on demand to compressed-column form for the
//! sparse solver path and the residual check. Duplicate triplets at the
//! same coordinate accumulate additively; every stamp is written assuming
//! accumulation.
//!
//! Row and column indices coincide with node ids, with auxiliary branch
//! rows appended after the nodes. Row 0 is the ground anchor V(0) = 0;
//! the stamp helpers suppress every write into row 0 or column 0 so the
//! anchor survives assembly intact.

use nalgebra::DVector;
use sprs::{CsMat, TriMat};

use crate::circuit::NodeId;

/// Shunt conductance added to every non-ground node diagonal.
///
/// Large enough to keep otherwise-floating subgraphs out of the null
/// space, small enough to be invisible next to any realistic conductance.
pub const GMIN: f64 = 1e-12;

/// The assembled MNA system for one circuit.
#[derive(Debug, Clone)]
pub struct MnaSystem {
    /// Coordinate-form coefficient entries, accumulated by stamping.
    triplets: Vec<(usize, usize, f64)>,
    /// Source vector z.
    rhs: DVector<f64>,
    /// Solution vector x (node voltages, then auxiliary branch currents).
    solution: DVector<f64>,
    /// Memoized compressed-column copy of the triplets.
    compressed: Option<CsMat<f64>>,
    /// Scratch for the residual mat-vec.
    residual: Vec<f64>,
    size: usize,
    num_nodes: usize,
}

impl MnaSystem {
    pub fn new() -> Self {
        MnaSystem {
            triplets: Vec::new(),
            rhs: DVector::zeros(0),
            solution: DVector::zeros(0),
            compressed: None,
            residual: Vec::new(),
            size: 0,
            num_nodes: 0,
        }
    }

    /// Size the system to `num_nodes` node rows plus `num_extra` auxiliary
    /// rows, reusing buffers when the total is unchanged.
    pub fn resize(&mut self, num_nodes: usize, num_extra: usize) {
        let size = num_nodes + num_extra;
        if size != self.size {
            self.rhs = DVector::zeros(size);
            self.solution = DVector::zeros(size);
            self.residual = vec![0.0; size];
            self.size = size;
        }
        self.num_nodes = num_nodes;
        self.triplets.clear();
        self.compressed = None;
    }

    /// Clear A and z for a fresh stamp pass. The memoized compressed copy
    /// is kept; callers invalidate it separately when the restamp can
    /// change matrix values.
    pub fn clear(&mut self) {
        self.triplets.clear();
        self.rhs.fill(0.0);
    }

    /// Drop the memoized compressed copy.
    pub fn invalidate_compressed(&mut self) {
        self.compressed = None;
    }

    /// Write the ground anchor: A[0,0] = 1, z[0] = 0. The identity row
    /// pins V(0) = 0; stamps never touch row or column 0.
    pub fn anchor_ground(&mut self) {
        self.triplets.push((0, 0, 1.0));
        self.rhs[0] = 0.0;
    }

    /// Add the gmin shunt to every non-ground node diagonal.
    pub fn apply_gmin(&mut self) {
        for i in 1..self.num_nodes {
            self.triplets.push((i, i, GMIN));
        }
    }

    /// Accumulate into A[row, col], suppressing writes into the ground
    /// row and column.
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        if row == 0 || col == 0 {
            return;
        }
        self.triplets.push((row, col, value));
    }

    /// Accumulate into z[row], suppressing writes into the ground row.
    pub fn add_rhs(&mut self, row: usize, value: f64) {
        if row == 0 {
            return;
        }
        self.rhs[row] += value;
    }

    /// Stamp a conductance `g` between two nodes:
    ///   A[n1,n1] += g, A[n2,n2] += g, A[n1,n2] -= g, A[n2,n1] -= g
    pub fn stamp_conductance(&mut self, n1: NodeId, n2: NodeId, g: f64) {
        self.add(n1.0, n1.0, g);
        self.add(n2.0, n2.0, g);
        self.add(n1.0, n2.0, -g);
        self.add(n2.0, n1.0, -g);
    }

    /// Stamp a current source driving `current` from `n1` through the
    /// source into `n2`.
    pub fn stamp_current_source(&mut self, n1: NodeId, n2: NodeId, current: f64) {
        self.add_rhs(n1.0, -current);
        self.add_rhs(n2.0, current);
    }

    /// Stamp a voltage constraint V(n1) - V(n2) = `voltage` with its
    /// branch current as auxiliary unknown `branch`.
    pub fn stamp_voltage_source(&mut self, n1: NodeId, n2: NodeId, branch: usize, voltage: f64) {
        self.add(n1.0, branch, 1.0);
        self.add(branch, n1.0, 1.0);
        self.add(n2.0, branch, -1.0);
        self.add(branch, n2.0, -1.0);
        self.add_rhs(branch, voltage);
    }

    /// Compressed-column form of the current triplets, built on first use
    /// and reused until invalidated.
    pub fn compressed(&mut self) -> &CsMat<f64> {
        if self.compressed.is_none() {
            let mut tri = TriMat::new((self.size, self.size));
            for &(row, col, value) in &self.triplets {
                tri.add_triplet(row, col, value);
            }
            self.compressed = Some(tri.to_csc());
        }
        self.compressed.as_ref().expect("compressed form just built")
    }

    /// Infinity norm of A·x - z over the compressed form.
    pub fn residual_inf_norm(&mut self) -> f64 {
        self.compressed();
        let matrix = self.compressed.as_ref().expect("compressed form just built");
        self.residual.fill(0.0);
        for (value, (row, col)) in matrix.iter() {
            self.residual[row] += value * self.solution[col];
        }
        let mut norm = 0.0f64;
        for (i, r) in self.residual.iter().enumerate() {
            norm = norm.max((r - self.rhs[i]).abs());
        }
        norm
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub(crate) fn triplets(&self) -> &[(usize, usize, f64)] {
        &self.triplets
    }

    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    pub fn solution(&self) -> &DVector<f64> {
        &self.solution
    }

    pub(crate) fn solution_mut(&mut self) -> &mut DVector<f64> {
        &mut self.solution
    }
}

impl Default for MnaSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system(nodes: usize, extra: usize) -> MnaSystem {
        let mut sys = MnaSystem::new();
        sys.resize(nodes, extra);
        sys
    }

    #[test]
    fn test_duplicate_triplets_accumulate() {
        let mut sys = system(3, 0);
        sys.add(1, 1, 0.5);
        sys.add(1, 1, 0.25);
        sys.add(1, 2, -0.5);

        let m = sys.compressed();
        assert_eq!(m.get(1, 1), Some(&0.75));
        assert_eq!(m.get(1, 2), Some(&-0.5));
    }

    #[test]
    fn test_ground_row_and_column_suppressed() {
        let mut sys = system(2, 0);
        sys.anchor_ground();
        sys.stamp_conductance(NodeId(1), NodeId(0), 0.01);
        sys.add_rhs(0, 123.0);

        let m = sys.compressed();
        assert_eq!(m.get(0, 0), Some(&1.0));
        assert_eq!(m.get(0, 1), None);
        assert_eq!(m.get(1, 0), None);
        assert_eq!(m.get(1, 1), Some(&0.01));
        assert_eq!(sys.rhs()[0], 0.0);
    }

    #[test]
    fn test_voltage_source_stamp_shape() {
        let mut sys = system(2, 1);
        sys.stamp_voltage_source(NodeId(1), NodeId(0), 2, 5.0);

        let m = sys.compressed();
        assert_eq!(m.get(1, 2), Some(&1.0));
        assert_eq!(m.get(2, 1), Some(&1.0));
        // Ground half of the constraint is suppressed.
        assert_eq!(m.get(0, 2), None);
        assert_eq!(m.get(2, 0), None);
        assert_eq!(sys.rhs()[2], 5.0);
    }

    #[test]
    fn test_residual_norm() {
        let mut sys = system(2, 0);
        sys.anchor_ground();
        sys.add(1, 1, 2.0);
        sys.add_rhs(1, 4.0);
        sys.solution_mut()[1] = 1.0;

        // A·x - z = 2·1 - 4 = -2 on row 1.
        assert_eq!(sys.residual_inf_norm(), 2.0);
    }
}
