//! Linear solve of the assembled MNA system.
//!
//! Two paths share the work: a dense in-place LU with partial row
//! pivoting over a reusable buffer, and a sparse LU through faer. The
//! path is chosen per solve from the system size and fill ratio; small
//! or dense matrices amortize better through contiguous dense
//! elimination than through sparse bookkeeping.

use faer::prelude::*;
use faer::sparse::{SparseColMat, Triplet};
use log::debug;
use nalgebra::DMatrix;

use crate::error::{CircuitError, Result};
use crate::mna::MnaSystem;

/// Systems at or below this size always take the dense path.
pub const DENSE_SIZE_CUTOFF: usize = 96;

/// Fill ratio at or above which the dense path wins regardless of size.
pub const DENSE_DENSITY_CUTOFF: f64 = 0.18;

/// Dense pivots below this magnitude are treated as structural zeros.
const PIVOT_EPSILON: f64 = 1e-15;

type SparseLu = faer::sparse::linalg::solvers::Lu<usize, f64>;

/// Direct solver with reusable dense scratch and an optional cached
/// sparse factorization for static linear circuits.
pub struct LinearSolver {
    dense: DMatrix<f64>,
    pivots: Vec<usize>,
    cached_lu: Option<SparseLu>,
}

impl LinearSolver {
    pub fn new() -> Self {
        LinearSolver {
            dense: DMatrix::zeros(0, 0),
            pivots: Vec::new(),
            cached_lu: None,
        }
    }

    /// Drop the cached sparse factorization. Called whenever the matrix
    /// values may have changed since it was computed.
    pub fn invalidate(&mut self) {
        self.cached_lu = None;
    }

    /// Solve A·x = z in place, leaving x in the system's solution vector.
    ///
    /// `cache_factorization` is set only for circuits that neither iterate
    /// nor restamp, where the factorization stays valid across solves.
    pub fn solve(&mut self, system: &mut MnaSystem, cache_factorization: bool) -> Result<()> {
        let n = system.size();
        let nnz = system.compressed().nnz();
        let density = nnz as f64 / (n * n) as f64;

        if n <= DENSE_SIZE_CUTOFF || density >= DENSE_DENSITY_CUTOFF {
            debug!("dense solve: {n}x{n}, {nnz} nonzeros");
            self.solve_dense(system)
        } else {
            debug!("sparse solve: {n}x{n}, {nnz} nonzeros (density {density:.4})");
            self.solve_sparse(system, cache_factorization)
        }
    }

    /// In-place Doolittle LU with partial row pivoting over the reused
    /// dense buffer, then forward and back substitution into x.
    fn solve_dense(&mut self, system: &mut MnaSystem) -> Result<()> {
        let n = system.size();
        if self.dense.nrows() != n {
            self.dense = DMatrix::zeros(n, n);
            self.pivots = vec![0; n];
        } else {
            self.dense.fill(0.0);
        }

        for (value, (row, col)) in system.compressed().iter() {
            self.dense[(row, col)] += *value;
        }

        for (i, p) in self.pivots.iter_mut().enumerate() {
            *p = i;
        }

        for k in 0..n {
            let mut max_val = self.dense[(k, k)].abs();
            let mut max_row = k;
            for i in (k + 1)..n {
                let val = self.dense[(i, k)].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val < PIVOT_EPSILON {
                return Err(CircuitError::SingularMatrix);
            }

            if max_row != k {
                self.pivots.swap(k, max_row);
                self.dense.swap_rows(k, max_row);
            }

            let pivot = self.dense[(k, k)];
            for i in (k + 1)..n {
                let factor = self.dense[(i, k)] / pivot;
                self.dense[(i, k)] = factor;
                for j in (k + 1)..n {
                    self.dense[(i, j)] -= factor * self.dense[(k, j)];
                }
            }
        }

        // Permute z, then L·y = Pz and U·x = y.
        let rhs = system.rhs().clone();
        let x = system.solution_mut();
        for i in 0..n {
            x[i] = rhs[self.pivots[i]];
        }
        for i in 0..n {
            for j in 0..i {
                let y = x[j];
                x[i] -= self.dense[(i, j)] * y;
            }
        }
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                let y = x[j];
                x[i] -= self.dense[(i, j)] * y;
            }
            x[i] /= self.dense[(i, i)];
        }

        Ok(())
    }

    /// Sparse LU through faer, reusing the cached factorization when one
    /// is available.
    fn solve_sparse(&mut self, system: &mut MnaSystem, cache_factorization: bool) -> Result<()> {
        let n = system.size();

        let lu = match self.cached_lu.take() {
            Some(lu) => lu,
            None => {
                let triplets: Vec<_> = system
                    .triplets()
                    .iter()
                    .map(|&(row, col, value)| Triplet::new(row, col, value))
                    .collect();

                let matrix = SparseColMat::<usize, f64>::try_new_from_triplets(n, n, &triplets)
                    .map_err(|_| CircuitError::SingularMatrix)?;

                matrix.sp_lu().map_err(|_| CircuitError::SingularMatrix)?
            }
        };

        let rhs = Col::<f64>::from_fn(n, |i| system.rhs()[i]);
        let x = lu.solve(&rhs);

        let solution = system.solution_mut();
        for i in 0..n {
            solution[i] = x[i];
        }

        if cache_factorization {
            self.cached_lu = Some(lu);
        }

        Ok(())
    }
}

impl Default for LinearSolver {
    fn default() -> Self {
        Self::new()
    }
}
