//! Shockley diode, linearized for Newton-Raphson.
//!
//! I = Is·(exp(V/(n·Vt)) - 1), linearized around the stored operating
//! point V_d into a conductance G_eq = dI/dV plus a companion current
//! source. The operating point is clamped to [-5.0, 0.9] V; the upper
//! clamp bounds the exponential argument and doubles as SPICE-style
//! junction limiting between iterations.

use nalgebra::DVector;

use super::{branch_voltage, Stamp};
use crate::circuit::NodeId;
use crate::mna::MnaSystem;

/// Saturation current Is, in amps.
const SATURATION_CURRENT: f64 = 1e-12;

/// Thermal voltage Vt at room temperature, in volts.
const THERMAL_VOLTAGE: f64 = 0.026;

/// Emission coefficient n.
const EMISSION_COEFFICIENT: f64 = 1.0;

/// Clamp bounds for the linearization point.
const V_CLAMP_MIN: f64 = -5.0;
const V_CLAMP_MAX: f64 = 0.9;

/// Hard cap on the exponential argument.
const MAX_EXP_ARG: f64 = 40.0;

/// A diode with anode n1 and cathode n2.
#[derive(Debug, Clone)]
pub struct Diode {
    pub n1: NodeId,
    pub n2: NodeId,
    /// Linearization point, seeded near a silicon forward drop.
    v_d: f64,
}

impl Diode {
    pub fn new(n1: NodeId, n2: NodeId) -> Self {
        Diode { n1, n2, v_d: 0.6 }
    }

    /// Linearized model at the clamped operating point: conductance G_eq
    /// and companion current I_eq such that I = G_eq·V + I_eq.
    fn linearize(&self) -> (f64, f64) {
        let n_vt = EMISSION_COEFFICIENT * THERMAL_VOLTAGE;
        let v_d = self.v_d.clamp(V_CLAMP_MIN, V_CLAMP_MAX);
        let e = (v_d / n_vt).min(MAX_EXP_ARG).exp();
        let g_eq = SATURATION_CURRENT / n_vt * e;
        let i_d = SATURATION_CURRENT * (e - 1.0);
        let i_eq = i_d - g_eq * v_d;
        (g_eq, i_eq)
    }
}

impl Stamp for Diode {
    fn stamp(&self, system: &mut MnaSystem, _dt: f64) {
        let (g_eq, i_eq) = self.linearize();
        system.stamp_conductance(self.n1, self.n2, g_eq);
        system.stamp_current_source(self.n1, self.n2, i_eq);
    }

    fn update_operating_point(&mut self, x: &DVector<f64>) {
        self.v_d = branch_voltage(x, self.n1, self.n2).clamp(V_CLAMP_MIN, V_CLAMP_MAX);
    }

    fn requires_iteration(&self) -> bool {
        true
    }

    fn requires_per_step_restamp(&self) -> bool {
        true
    }
}
