use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nodal::{Circuit, Component, NodeId};

/// V1(10V) - R(100) - R(100) - ground; small enough to stay on the
/// dense solver path.
fn build_divider() -> Circuit {
    let mut circuit = Circuit::new();
    let n1 = circuit.add_node();
    let n2 = circuit.add_node();
    let gnd = circuit.ground();
    circuit.add_component(Component::voltage_source(n1, gnd, 10.0));
    circuit.add_component(Component::resistor(n1, n2, 100.0));
    circuit.add_component(Component::resistor(n2, gnd, 100.0));
    circuit
}

/// Series ladder of 2-ohm sections, large enough for the sparse path.
fn build_ladder(sections: usize) -> Circuit {
    let mut circuit = Circuit::new();
    let gnd = circuit.ground();
    let nodes: Vec<NodeId> = (0..sections).map(|_| circuit.add_node()).collect();
    circuit.add_component(Component::voltage_source(nodes[0], gnd, 12.0));
    for i in 0..sections - 1 {
        circuit.add_component(Component::resistor(nodes[i], nodes[i + 1], 2.0));
    }
    circuit.add_component(Component::resistor(nodes[sections - 1], gnd, 2.0));
    circuit
}

fn bench_operating_point(c: &mut Criterion) {
    let mut group = c.benchmark_group("operating_point");

    group.bench_function("divider_dense", |b| {
        let mut circuit = build_divider();
        b.iter(|| circuit.solve(0.0).unwrap());
    });

    for sections in [100, 200, 400] {
        group.bench_with_input(
            BenchmarkId::new("ladder_sparse", sections),
            &sections,
            |b, &sections| {
                let mut circuit = build_ladder(sections);
                b.iter(|| circuit.solve(0.0).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_transient(c: &mut Criterion) {
    let mut group = c.benchmark_group("transient");

    group.bench_function("rc_100_steps", |b| {
        let mut circuit = Circuit::new();
        let n1 = circuit.add_node();
        let n2 = circuit.add_node();
        let gnd = circuit.ground();
        circuit.add_component(Component::voltage_source(n1, gnd, 10.0));
        circuit.add_component(Component::resistor(n1, n2, 1000.0));
        circuit.add_component(Component::capacitor(n2, gnd, 1e-6));

        b.iter(|| {
            for _ in 0..100 {
                circuit.solve(1e-4).unwrap();
            }
        });
    });

    group.bench_function("diode_clipper", |b| {
        let mut circuit = Circuit::new();
        let n1 = circuit.add_node();
        let n2 = circuit.add_node();
        let gnd = circuit.ground();
        circuit.add_component(Component::voltage_source(n1, gnd, 10.0));
        circuit.add_component(Component::resistor(n1, n2, 1000.0));
        circuit.add_component(Component::diode(n2, gnd));

        b.iter(|| circuit.solve(0.0).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_operating_point, bench_transient);
criterion_main!(benches);
