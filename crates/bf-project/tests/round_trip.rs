//! Initial-condition round-trip: restoring a captured state reproduces the
//! trajectory exactly.

use bf_core::units::constants::CP_WATER;
use bf_core::units::s;
use bf_elements::{Dissipator, Kind, Storage};
use bf_graph::PhysicalDomain;
use bf_handlers::{Handler, Mix, ScalarKind, ThermalCoupled};
use bf_project::InitialConditions;
use bf_solver::{ModelBuilder, Network, Solver};

/// Circulating tank warming against a hotter ambient through its coupled
/// thermal surface; the temperature trajectory moves every step.
fn build_loop(tank_t: f64) -> (Network, Solver, bf_core::ElemId) {
    let mut b = ModelBuilder::new();
    let outlet = b.add_node("out", PhysicalDomain::HeatFluid);
    let inlet = b.add_node("in", PhysicalDomain::HeatFluid);
    let surface = b.add_node("surface", PhysicalDomain::Thermal);
    let ambient_node = b.add_node("ambient", PhysicalDomain::Thermal);

    let mut storage = Storage::new(1.0);
    storage.set_state_value(2e5);
    let tank = b
        .add_element("tank", PhysicalDomain::HeatFluid, Kind::Capacitance(storage))
        .unwrap();
    let mut coupled = ThermalCoupled::new(ScalarKind::Temperature { cp: CP_WATER });
    coupled.inner.set_inner_mass(50.0).unwrap();
    coupled.inner.set_initial(tank_t);
    b.set_handler(tank, Handler::ThermalCoupled(coupled)).unwrap();

    let pump = b
        .add_element(
            "pump",
            PhysicalDomain::HeatFluid,
            Kind::FlowSource { flow: 5.0 },
        )
        .unwrap();
    b.set_handler(pump, Handler::Mix(Mix::new(ScalarKind::Temperature { cp: CP_WATER })))
        .unwrap();

    let t_src = b
        .add_element(
            "surface-source",
            PhysicalDomain::Thermal,
            Kind::EffortSource { effort: tank_t },
        )
        .unwrap();
    let conduction = b
        .add_element(
            "conduction",
            PhysicalDomain::Thermal,
            Kind::Dissipator(Dissipator::linear(1e-3).unwrap()),
        )
        .unwrap();
    let ambient = b
        .add_element(
            "ambient",
            PhysicalDomain::Thermal,
            Kind::Origin {
                effort: 350.0,
                accepts_external: false,
            },
        )
        .unwrap();

    b.connect_between(tank, outlet, inlet).unwrap();
    b.connect_between(pump, outlet, inlet).unwrap();
    b.connect(t_src, surface).unwrap();
    b.connect_between(conduction, surface, ambient_node).unwrap();
    b.connect(ambient, ambient_node).unwrap();
    b.attach_thermal_source(tank, t_src).unwrap();
    b.set_step_time(s(0.1)).unwrap();

    let net = b.finish().unwrap();
    let mut solver = Solver::new();
    solver.add_network(&net, outlet);
    solver.add_network(&net, surface);
    (net, solver, tank)
}

fn run_and_trace(
    net: &mut Network,
    solver: &mut Solver,
    tank: bf_core::ElemId,
    steps: usize,
) -> Vec<f64> {
    let mut trace = Vec::new();
    for _ in 0..steps {
        solver.prepare(net).unwrap();
        solver.step_once(net).unwrap();
        trace.push(net.element(tank).handler().unwrap().get_value().unwrap());
    }
    trace
}

#[test]
fn apply_of_capture_is_identity() {
    let (mut net, mut solver, _tank) = build_loop(310.0);
    solver.prepare(&mut net).unwrap();
    solver.step_once(&mut net).unwrap();
    solver.prepare(&mut net).unwrap();

    let snapshot = InitialConditions::capture(&net);
    snapshot.apply(&mut net).unwrap();
    let again = InitialConditions::capture(&net);
    assert_eq!(snapshot.records, again.records);
}

#[test]
fn restored_state_replays_the_same_trajectory() {
    // Run one instance, capture at a committed point, seed a fresh instance
    // from the capture: both must produce bit-identical temperatures.
    let (mut net_a, mut solver_a, tank_a) = build_loop(298.15);
    run_and_trace(&mut net_a, &mut solver_a, tank_a, 3);
    solver_a.prepare(&mut net_a).unwrap();
    let snapshot = InitialConditions::capture(&net_a);

    let trace_a = run_and_trace(&mut net_a, &mut solver_a, tank_a, 5);
    assert!(
        trace_a.windows(2).all(|w| w[1] > w[0]),
        "the fixture must actually move"
    );

    let (mut net_b, mut solver_b, tank_b) = build_loop(298.15);
    snapshot.apply(&mut net_b).unwrap();
    let trace_b = run_and_trace(&mut net_b, &mut solver_b, tank_b, 5);

    assert_eq!(trace_a, trace_b);
}

#[test]
fn serialization_round_trips_both_formats() {
    let (mut net, mut solver, _tank) = build_loop(320.0);
    solver.prepare(&mut net).unwrap();
    solver.step_once(&mut net).unwrap();

    let snapshot = InitialConditions::capture(&net);

    let json = snapshot.to_json().unwrap();
    let from_json = InitialConditions::from_json(&json).unwrap();
    assert_eq!(snapshot.records, from_json.records);

    let yaml = snapshot.to_yaml().unwrap();
    let from_yaml = InitialConditions::from_yaml(&yaml).unwrap();
    assert_eq!(snapshot.records, from_yaml.records);
}

#[test]
fn applying_a_record_for_a_missing_element_fails() {
    let (mut net, _solver, _tank) = build_loop(300.0);
    let mut snapshot = InitialConditions::capture(&net);
    let stray = bf_project::StateRecord::Storage {
        element_name: "ghost".into(),
        state_value: 1.0,
    };
    snapshot.insert(stray);
    assert!(snapshot.apply(&mut net).is_err());
}
