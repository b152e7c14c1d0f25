//! Circuit graph and the solve engine.
//!
//! A circuit owns an append-only node table (node 0 is ground, injected
//! at construction) and an append-only component list. `solve` assembles
//! the MNA system, runs damped Newton-Raphson when any component needs
//! it, publishes node voltages, and advances component transient history
//! on acceptance.

use log::debug;
use nalgebra::DVector;

use crate::components::{Component, Stamp};
use crate::error::{CircuitError, Result};
use crate::mna::MnaSystem;
use crate::solver::LinearSolver;

/// Dense node identifier. Id 0 is always ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The ground node, pinned to 0 V.
    pub const GROUND: NodeId = NodeId(0);
}

/// Handle to a component, valid for the lifetime of its circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(pub usize);

/// A node in the circuit. Voltage is written by the engine after every
/// solve and is read-only to callers.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    voltage: f64,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn voltage(&self) -> f64 {
        self.voltage
    }
}

/// A circuit and its solver state.
pub struct Circuit {
    nodes: Vec<Node>,
    components: Vec<Component>,
    system: MnaSystem,
    solver: LinearSolver,
    x_prev: DVector<f64>,
    num_extra: usize,
    dirty: bool,
    stamp_version: u64,
    requires_iteration: bool,
    requires_per_step_restamp: bool,
    /// (dt, stamp version) of the last accepted solve.
    last_solve: Option<(f64, u64)>,
    last_iterations: usize,
    /// Relative tolerance for the Newton step and residual criteria.
    pub convergence_tolerance: f64,
    /// Newton iteration budget for circuits that require iteration.
    pub max_iterations: usize,
}

impl Circuit {
    pub fn new() -> Self {
        Circuit {
            nodes: vec![Node {
                id: NodeId::GROUND,
                voltage: 0.0,
            }],
            components: Vec::new(),
            system: MnaSystem::new(),
            solver: LinearSolver::new(),
            x_prev: DVector::zeros(0),
            num_extra: 0,
            dirty: true,
            stamp_version: 0,
            requires_iteration: false,
            requires_per_step_restamp: false,
            last_solve: None,
            last_iterations: 0,
            convergence_tolerance: 1e-6,
            max_iterations: 50,
        }
    }

    /// Append a node and return its id.
    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { id, voltage: 0.0 });
        self.dirty = true;
        id
    }

    /// Append a component and return its handle. The circuit is marked
    /// dirty; the next solve rebuilds the system layout.
    pub fn add_component(&mut self, component: Component) -> ComponentId {
        let id = ComponentId(self.components.len());
        self.requires_iteration |= component.requires_iteration();
        self.requires_per_step_restamp |= component.requires_per_step_restamp();
        self.components.push(component);
        self.dirty = true;
        id
    }

    pub fn ground(&self) -> NodeId {
        NodeId::GROUND
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id.0]
    }

    /// Mutable access for parameter updates between solves (source
    /// values, switched resistances). Structural changes still require
    /// adding components, which rebuilds the system.
    pub fn component_mut(&mut self, id: ComponentId) -> &mut Component {
        &mut self.components[id.0]
    }

    /// Voltage at a node after the last solve.
    pub fn voltage(&self, node: NodeId) -> f64 {
        self.nodes[node.0].voltage
    }

    /// Auxiliary branch current of a voltage-defined component, or `None`
    /// for components without an extra equation.
    pub fn branch_current(&self, id: ComponentId) -> Option<f64> {
        self.components[id.0]
            .matrix_index()
            .map(|k| self.system.solution()[k])
    }

    /// Newton iterations spent by the last solve; 0 when the static fast
    /// path was taken.
    pub fn last_iterations(&self) -> usize {
        self.last_iterations
    }

    /// Assign auxiliary rows, size the buffers, and run the initial stamp
    /// pass at an implicit dt of zero.
    pub fn build_system(&mut self) {
        let num_nodes = self.nodes.len();
        let mut next_index = num_nodes;
        for component in self.components.iter_mut() {
            if component.has_extra_equation() {
                component.assign_matrix_index(next_index);
                next_index += 1;
            }
        }
        self.num_extra = next_index - num_nodes;

        self.system.resize(num_nodes, self.num_extra);
        if self.x_prev.len() != self.system.size() {
            self.x_prev = DVector::zeros(self.system.size());
        }
        self.solver.invalidate();

        self.requires_iteration = self.components.iter().any(|c| c.requires_iteration());
        self.requires_per_step_restamp = self
            .components
            .iter()
            .any(|c| c.requires_per_step_restamp());

        self.assemble(0.0);

        self.dirty = false;
        self.stamp_version += 1;
        debug!(
            "built system: {} nodes + {} auxiliary rows (iterate: {}, restamp: {})",
            num_nodes, self.num_extra, self.requires_iteration, self.requires_per_step_restamp
        );
    }

    /// One stamp pass: ground anchor, gmin shunts, then every component
    /// in insertion order.
    fn assemble(&mut self, dt: f64) {
        self.system.anchor_ground();
        self.system.apply_gmin();
        for component in &self.components {
            component.stamp(&mut self.system, dt);
        }
    }

    fn publish_voltages(&mut self) {
        let solution = self.system.solution();
        for (node, value) in self.nodes.iter_mut().zip(solution.iter()) {
            node.voltage = *value;
        }
    }

    /// Solve the circuit for one step of `dt` seconds. `dt` = 0 selects
    /// DC semantics (capacitors open, inductors near-shorts).
    ///
    /// On success node voltages hold the accepted solution and component
    /// transient history has advanced. On failure the error escapes, node
    /// voltages reflect the last published iteration, and history is not
    /// advanced.
    pub fn solve(&mut self, dt: f64) -> Result<()> {
        if self.dirty {
            self.build_system();
        }

        let iterate = self.requires_iteration;
        let is_static = !iterate && !self.requires_per_step_restamp;

        // Static linear circuits re-solved unchanged are a no-op.
        if is_static && self.last_solve == Some((dt, self.stamp_version)) {
            self.publish_voltages();
            self.last_iterations = 0;
            debug!("static circuit unchanged; republishing cached solution");
            return Ok(());
        }

        let max_iterations = if iterate { self.max_iterations } else { 1 };
        let tolerance = self.convergence_tolerance;

        let mut step_norm = f64::INFINITY;
        let mut residual_norm = f64::INFINITY;
        let mut accepted = false;

        for k in 0..max_iterations {
            self.system.clear();
            if !is_static {
                self.system.invalidate_compressed();
                self.solver.invalidate();
            }
            self.assemble(dt);

            self.solver.solve(&mut self.system, is_static)?;
            self.publish_voltages();

            for component in self.components.iter_mut() {
                component.update_operating_point(self.system.solution());
            }

            if !iterate {
                self.last_iterations = k + 1;
                accepted = true;
                break;
            }

            if k >= 1 {
                step_norm = self
                    .system
                    .solution()
                    .iter()
                    .zip(self.x_prev.iter())
                    .map(|(x, p)| (x - p).abs())
                    .fold(0.0, f64::max);
                residual_norm = self.system.residual_inf_norm();

                let step_limit = tolerance * (1.0 + self.system.solution().amax());
                let residual_limit = tolerance * (1.0 + self.system.rhs().amax());
                debug!(
                    "iteration {k}: step {step_norm:.3e} (limit {step_limit:.3e}), \
                     residual {residual_norm:.3e} (limit {residual_limit:.3e})"
                );

                if step_norm < step_limit && residual_norm < residual_limit {
                    self.last_iterations = k + 1;
                    accepted = true;
                    break;
                }
            }

            self.x_prev.copy_from(self.system.solution());
        }

        if !accepted {
            return Err(CircuitError::NonConvergence {
                iterations: max_iterations,
                step_norm,
                residual_norm,
            });
        }

        for component in self.components.iter_mut() {
            component.update_state(self.system.solution(), dt);
        }
        self.last_solve = Some((dt, self.stamp_version));
        Ok(())
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}
