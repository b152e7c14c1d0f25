//! A modified nodal analysis circuit simulation engine.
//!
//! Build a [`Circuit`] out of nodes and components, then call
//! [`Circuit::solve`] once per step: `solve(0.0)` computes the DC
//! operating point, `solve(dt)` with a positive timestep advances one
//! Backward Euler transient step. Nonlinear devices are resolved by
//! damped Newton-Raphson iteration inside each step.
//!
//! ```
//! use nodal::{Circuit, Component};
//!
//! let mut circuit = Circuit::new();
//! let n1 = circuit.add_node();
//! let n2 = circuit.add_node();
//! let gnd = circuit.ground();
//!
//! circuit.add_component(Component::voltage_source(n1, gnd, 10.0));
//! circuit.add_component(Component::resistor(n1, n2, 100.0));
//! circuit.add_component(Component::resistor(n2, gnd, 100.0));
//!
//! circuit.solve(0.0).unwrap();
//! assert!((circuit.voltage(n2) - 5.0).abs() < 1e-9);
//! ```

pub mod circuit;
pub mod components;
pub mod error;
pub mod mna;
pub mod solver;

// Re-export commonly used types
pub use circuit::{Circuit, ComponentId, Node, NodeId};
pub use components::{
    Capacitor, Component, CurrentSource, Diode, Inductor, Resistor, Stamp, Transformer,
    VoltageSource,
};
pub use error::{CircuitError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
