//! Error types for the simulation engine.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CircuitError>;

/// Errors surfaced by [`Circuit::solve`](crate::Circuit::solve).
///
/// Both variants are synchronous and fatal to the current solve only; the
/// circuit remains usable and a later solve may succeed after the caller
/// adjusts tolerances, the timestep, or the offending topology.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CircuitError {
    /// The Newton loop exhausted its iteration budget without satisfying
    /// both the step and residual criteria.
    #[error("Newton iteration did not converge after {iterations} iterations (step norm {step_norm:.3e}, residual norm {residual_norm:.3e})")]
    NonConvergence {
        iterations: usize,
        step_norm: f64,
        residual_norm: f64,
    },

    /// LU factorization failed. Usually a topology defect the gmin shunts
    /// cannot compensate for, such as conflicting ideal sources.
    #[error("singular system matrix - circuit may contain conflicting or shorted ideal sources")]
    SingularMatrix,
}
